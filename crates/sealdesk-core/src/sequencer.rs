//! Field sequencer: walks the signer through their own fields in page order.

use serde::{Deserialize, Serialize};

use crate::completion::field_satisfied;
use crate::field::{Field, FieldId, FieldType};
use crate::page::PageNumber;
use crate::store::sort_page_order;

/// What the shell does when a field becomes current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusAction {
    /// Open the signature / initials capture surface.
    OpenCapture,
    /// Focus the inline text input.
    FocusInput,
    /// Only scroll the field into view.
    ScrollOnly,
}

impl FocusAction {
    pub fn for_type(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Signature | FieldType::Initial => Self::OpenCapture,
            FieldType::Text => Self::FocusInput,
            FieldType::Date | FieldType::Checkbox => Self::ScrollOnly,
        }
    }
}

/// One position in the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerStop {
    pub field_id: FieldId,
    pub field_type: FieldType,
    pub page: PageNumber,
    pub action: FocusAction,
}

impl SequencerStop {
    fn of(field: &Field) -> Self {
        Self {
            field_id: field.id,
            field_type: field.field_type,
            page: field.page(),
            action: FocusAction::for_type(field.field_type),
        }
    }
}

/// Cursor over the acting recipient's fields (page, then top, then left).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSequencer {
    stops: Vec<SequencerStop>,
    current: Option<usize>,
}

impl FieldSequencer {
    /// Builds the sequence from the signer's owned fields, in any order.
    pub fn new(owned: &[Field]) -> Self {
        let mut sorted = owned.to_vec();
        sort_page_order(&mut sorted);
        Self {
            stops: sorted.iter().map(SequencerStop::of).collect(),
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn stops(&self) -> &[SequencerStop] {
        &self.stops
    }

    pub fn current(&self) -> Option<SequencerStop> {
        self.current.and_then(|i| self.stops.get(i)).copied()
    }

    /// Zero-based index of the current stop.
    pub fn position(&self) -> Option<usize> {
        self.current
    }

    /// Moves to the first field that still needs input, skipping Date fields.
    ///
    /// `owned` supplies current values; returns `None` (cursor unchanged)
    /// when nothing is left to fill.
    pub fn start_signing(&mut self, owned: &[Field]) -> Option<SequencerStop> {
        let index = self.stops.iter().position(|stop| {
            stop.field_type != FieldType::Date
                && owned
                    .iter()
                    .find(|f| f.id == stop.field_id)
                    .is_some_and(|f| !field_satisfied(f))
        })?;
        self.current = Some(index);
        tracing::debug!(field_id = %self.stops[index].field_id, "Signing started");
        self.current()
    }

    /// Advances one stop; stays put on the last one.
    pub fn next(&mut self) -> Option<SequencerStop> {
        if self.stops.is_empty() {
            return None;
        }
        let last = self.stops.len() - 1;
        self.current = Some(self.current.map_or(0, |i| (i + 1).min(last)));
        self.current()
    }

    /// Steps back one stop; stays put on the first one.
    pub fn previous(&mut self) -> Option<SequencerStop> {
        if self.stops.is_empty() {
            return None;
        }
        self.current = Some(self.current.map_or(0, |i| i.saturating_sub(1)));
        self.current()
    }

    /// Makes `field_id` current (the signer clicked it directly).
    pub fn jump_to(&mut self, field_id: FieldId) -> Option<SequencerStop> {
        let index = self.stops.iter().position(|s| s.field_id == field_id)?;
        self.current = Some(index);
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValue;
    use crate::test_utils::{field_at, two_recipients};

    fn owned_fields() -> Vec<Field> {
        let (alice, _) = two_recipients();
        vec![
            field_at(FieldType::Checkbox, alice.id, 2, 10.0, 10.0),
            field_at(FieldType::Date, alice.id, 1, 10.0, 10.0),
            field_at(FieldType::Text, alice.id, 1, 300.0, 200.0),
            field_at(FieldType::Signature, alice.id, 1, 10.0, 200.0),
        ]
    }

    #[test]
    fn test_page_order() {
        let fields = owned_fields();
        let seq = FieldSequencer::new(&fields);
        let types: Vec<FieldType> = seq.stops().iter().map(|s| s.field_type).collect();
        assert_eq!(
            types,
            vec![FieldType::Date, FieldType::Signature, FieldType::Text, FieldType::Checkbox]
        );
    }

    #[test]
    fn test_start_signing_skips_dates_and_filled() {
        let mut fields = owned_fields();
        let mut seq = FieldSequencer::new(&fields);
        let first = seq.start_signing(&fields).unwrap();
        assert_eq!(first.field_type, FieldType::Signature);
        assert_eq!(first.action, FocusAction::OpenCapture);

        fields[3].value = Some(FieldValue::text("data:image/png;base64,AAA"));
        let first = seq.start_signing(&fields).unwrap();
        assert_eq!(first.field_type, FieldType::Text);
        assert_eq!(first.action, FocusAction::FocusInput);
    }

    #[test]
    fn test_start_signing_with_nothing_left() {
        let (alice, _) = two_recipients();
        let fields = vec![
            field_at(FieldType::Date, alice.id, 1, 10.0, 10.0),
            field_at(FieldType::Checkbox, alice.id, 1, 10.0, 50.0).with_value(FieldValue::Bool(true)),
        ];
        let mut seq = FieldSequencer::new(&fields);
        assert!(seq.start_signing(&fields).is_none());
        assert!(seq.current().is_none());
    }

    #[test]
    fn test_next_previous_are_noops_at_ends() {
        let fields = owned_fields();
        let mut seq = FieldSequencer::new(&fields);
        assert_eq!(seq.previous().map(|s| s.field_type), Some(FieldType::Date));
        assert_eq!(seq.previous().map(|s| s.field_type), Some(FieldType::Date));
        seq.next();
        seq.next();
        let last = seq.next().unwrap();
        assert_eq!(last.field_type, FieldType::Checkbox);
        assert_eq!(last.action, FocusAction::ScrollOnly);
        assert_eq!(seq.next(), Some(last));
        assert_eq!(seq.position(), Some(3));
    }

    #[test]
    fn test_jump_to() {
        let fields = owned_fields();
        let mut seq = FieldSequencer::new(&fields);
        let target = fields[2].id;
        assert_eq!(seq.jump_to(target).map(|s| s.field_id), Some(target));
        assert_eq!(seq.position(), Some(2));
        assert!(seq.jump_to(FieldId::nil()).is_none());
        assert_eq!(seq.position(), Some(2));
    }

    #[test]
    fn test_empty_sequence() {
        let mut seq = FieldSequencer::new(&[]);
        assert!(seq.is_empty());
        assert!(seq.next().is_none());
        assert!(seq.previous().is_none());
    }
}
