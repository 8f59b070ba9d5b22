//! Field store: committed fields, committed geometry overrides and the
//! transient transform of the gesture in progress.
//!
//! Committed geometry only changes through [`FieldStore::commit_geometry`],
//! once per finished gesture. Live gestures write to the transient slot,
//! which renderers read through [`FieldStore::effective_geometry`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::backend::FieldValueUpdate;
use crate::field::{Field, FieldGeometry, FieldId, FieldType, FieldValue, RecipientId};

/// Errors from value and layout writes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("Field not found: {0}")]
    NotFound(FieldId),

    #[error("Field {0} belongs to another recipient")]
    NotOwner(FieldId),

    #[error("Field {0} is finalized and can no longer be edited")]
    Locked(FieldId),

    #[error("Value does not match field type {expected:?} for field {field}")]
    TypeMismatch { field: FieldId, expected: FieldType },
}

/// In-flight gesture overlay. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransientTransform {
    pub field_id: FieldId,
    /// Canonical offset from the committed top-left.
    pub dx: f32,
    pub dy: f32,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl TransientTransform {
    /// A pure translation.
    pub fn offset(field_id: FieldId, dx: f32, dy: f32) -> Self {
        Self {
            field_id,
            dx,
            dy,
            width: None,
            height: None,
        }
    }

    /// Applies the overlay on top of committed geometry.
    pub fn apply(&self, geometry: FieldGeometry) -> FieldGeometry {
        FieldGeometry {
            page: geometry.page,
            x: geometry.x + self.dx,
            y: geometry.y + self.dy,
            width: self.width.unwrap_or(geometry.width),
            height: self.height.unwrap_or(geometry.height),
        }
    }
}

/// Single-writer store for one local session.
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    fields: Vec<Field>,
    overrides: HashMap<FieldId, FieldGeometry>,
    transient: Option<TransientTransform>,
    locked: HashSet<FieldId>,
}

impl FieldStore {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.fields.iter().any(|f| f.id == id)
    }

    /// Committed field (geometry override applied).
    pub fn get(&self, id: FieldId) -> Option<Field> {
        self.fields
            .iter()
            .find(|f| f.id == id)
            .map(|f| self.committed_view(f))
    }

    /// Committed geometry of a field.
    pub fn geometry(&self, id: FieldId) -> Option<FieldGeometry> {
        if let Some(geometry) = self.overrides.get(&id) {
            return Some(*geometry);
        }
        self.fields.iter().find(|f| f.id == id).map(|f| f.geometry)
    }

    /// Committed geometry with the transient overlay on top, for rendering.
    pub fn effective_geometry(&self, id: FieldId) -> Option<FieldGeometry> {
        let committed = self.geometry(id)?;
        match self.transient {
            Some(t) if t.field_id == id => Some(t.apply(committed)),
            _ => Some(committed),
        }
    }

    /// All committed fields, in insertion order.
    pub fn committed(&self) -> Vec<Field> {
        self.fields.iter().map(|f| self.committed_view(f)).collect()
    }

    /// Committed fields owned by `recipient`, in page order
    /// (page, then top to bottom, then left to right).
    pub fn owned_by(&self, recipient: RecipientId) -> Vec<Field> {
        let mut owned: Vec<Field> = self
            .fields
            .iter()
            .filter(|f| f.owner == recipient)
            .map(|f| self.committed_view(f))
            .collect();
        sort_page_order(&mut owned);
        owned
    }

    /// Adds a field (preparation).
    pub fn insert(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Removes a field (preparation, before send).
    pub fn remove(&mut self, id: FieldId) -> Option<Field> {
        let index = self.fields.iter().position(|f| f.id == id)?;
        self.overrides.remove(&id);
        self.locked.remove(&id);
        if self.transient.is_some_and(|t| t.field_id == id) {
            self.transient = None;
        }
        Some(self.fields.remove(index))
    }

    /// Removes every field owned by `recipient`.
    pub fn remove_owned_by(&mut self, recipient: RecipientId) -> usize {
        let ids: Vec<FieldId> = self
            .fields
            .iter()
            .filter(|f| f.owner == recipient)
            .map(|f| f.id)
            .collect();
        for id in &ids {
            self.remove(*id);
        }
        ids.len()
    }

    /// Writes a value on behalf of `actor`.
    ///
    /// Rejected when the field belongs to someone else, is locked, or the
    /// value's shape does not match the field type. `None` clears the value.
    pub fn set_value(
        &mut self,
        actor: RecipientId,
        id: FieldId,
        value: Option<FieldValue>,
    ) -> Result<(), FieldError> {
        let locked = self.locked.contains(&id);
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(FieldError::NotFound(id))?;

        if field.owner != actor {
            tracing::debug!(field_id = %id, actor = %actor, "Rejected write to foreign field");
            return Err(FieldError::NotOwner(id));
        }
        if locked {
            tracing::debug!(field_id = %id, "Rejected write to locked field");
            return Err(FieldError::Locked(id));
        }
        if let Some(value) = &value {
            if !field.field_type.accepts(value) {
                return Err(FieldError::TypeMismatch {
                    field: id,
                    expected: field.field_type,
                });
            }
        }

        field.value = value;
        Ok(())
    }

    /// Replaces a field's committed geometry. Called once per finished gesture.
    pub fn commit_geometry(
        &mut self,
        id: FieldId,
        geometry: FieldGeometry,
    ) -> Result<(), FieldError> {
        if self.locked.contains(&id) {
            return Err(FieldError::Locked(id));
        }
        if !self.contains(id) {
            return Err(FieldError::NotFound(id));
        }
        tracing::debug!(
            field_id = %id,
            page = geometry.page,
            x = geometry.x,
            y = geometry.y,
            width = geometry.width,
            height = geometry.height,
            "Geometry committed"
        );
        self.overrides.insert(id, geometry);
        Ok(())
    }

    /// Geometry committed since load, keyed by field.
    pub fn geometry_overrides(&self) -> &HashMap<FieldId, FieldGeometry> {
        &self.overrides
    }

    pub fn transient(&self) -> Option<TransientTransform> {
        self.transient
    }

    /// Publishes the overlay for the gesture in progress.
    pub fn publish_transient(&mut self, transform: TransientTransform) {
        self.transient = Some(transform);
    }

    /// Drops the overlay; committed geometry is untouched.
    pub fn clear_transient(&mut self) {
        self.transient = None;
    }

    pub fn is_locked(&self, id: FieldId) -> bool {
        self.locked.contains(&id)
    }

    /// Locks one field against further edits.
    pub fn lock(&mut self, id: FieldId) {
        self.locked.insert(id);
    }

    /// Locks every field (after a successful submission).
    pub fn lock_all(&mut self) {
        self.locked.extend(self.fields.iter().map(|f| f.id));
        self.transient = None;
    }

    /// Every field's `{fieldId, value}`, in insertion order.
    pub fn final_values(&self) -> Vec<FieldValueUpdate> {
        self.fields
            .iter()
            .map(|f| FieldValueUpdate {
                field_id: f.id,
                value: f.value.clone(),
            })
            .collect()
    }

    fn committed_view(&self, field: &Field) -> Field {
        match self.overrides.get(&field.id) {
            Some(geometry) => Field {
                geometry: *geometry,
                ..field.clone()
            },
            None => field.clone(),
        }
    }
}

/// Sorts fields by page, then top edge, then left edge.
pub fn sort_page_order(fields: &mut [Field]) {
    fields.sort_by(|a, b| {
        a.geometry
            .page
            .cmp(&b.geometry.page)
            .then(a.geometry.y.total_cmp(&b.geometry.y))
            .then(a.geometry.x.total_cmp(&b.geometry.x))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{field_at, two_recipients};

    #[test]
    fn test_set_value_owner_only() {
        let (alice, bob) = two_recipients();
        let f = field_at(FieldType::Text, alice.id, 1, 10.0, 10.0);
        let id = f.id;
        let mut store = FieldStore::new(vec![f]);

        assert_eq!(
            store.set_value(bob.id, id, Some(FieldValue::text("x"))),
            Err(FieldError::NotOwner(id))
        );
        assert!(store.get(id).unwrap().value.is_none());

        store.set_value(alice.id, id, Some(FieldValue::text("x"))).unwrap();
        assert_eq!(store.get(id).unwrap().value, Some(FieldValue::text("x")));
    }

    #[test]
    fn test_set_value_type_checked() {
        let (alice, _) = two_recipients();
        let f = field_at(FieldType::Checkbox, alice.id, 1, 10.0, 10.0);
        let id = f.id;
        let mut store = FieldStore::new(vec![f]);
        assert!(matches!(
            store.set_value(alice.id, id, Some(FieldValue::text("yes"))),
            Err(FieldError::TypeMismatch { .. })
        ));
        store.set_value(alice.id, id, Some(FieldValue::Bool(true))).unwrap();
    }

    #[test]
    fn test_locked_field_rejects_writes() {
        let (alice, _) = two_recipients();
        let f = field_at(FieldType::Text, alice.id, 1, 10.0, 10.0);
        let id = f.id;
        let mut store = FieldStore::new(vec![f]);
        store.lock_all();
        assert_eq!(
            store.set_value(alice.id, id, Some(FieldValue::text("late"))),
            Err(FieldError::Locked(id))
        );
    }

    #[test]
    fn test_transient_does_not_touch_committed() {
        let (alice, _) = two_recipients();
        let f = field_at(FieldType::Text, alice.id, 1, 10.0, 10.0);
        let id = f.id;
        let mut store = FieldStore::new(vec![f]);

        store.publish_transient(TransientTransform::offset(id, 25.0, 5.0));
        let effective = store.effective_geometry(id).unwrap();
        assert!((effective.x - 35.0).abs() < f32::EPSILON);
        assert!((store.get(id).unwrap().geometry.x - 10.0).abs() < f32::EPSILON);

        store.clear_transient();
        assert_eq!(store.effective_geometry(id), store.geometry(id));
    }

    #[test]
    fn test_commit_geometry_overrides() {
        let (alice, _) = two_recipients();
        let f = field_at(FieldType::Text, alice.id, 1, 10.0, 10.0);
        let id = f.id;
        let mut store = FieldStore::new(vec![f]);
        let moved = FieldGeometry::new(2, 40.0, 50.0, 200.0, 30.0);
        store.commit_geometry(id, moved).unwrap();
        assert_eq!(store.get(id).unwrap().geometry, moved);
        assert_eq!(store.geometry_overrides().get(&id), Some(&moved));
    }

    #[test]
    fn test_owned_by_page_order() {
        let (alice, bob) = two_recipients();
        let late = field_at(FieldType::Text, alice.id, 2, 10.0, 10.0);
        let low = field_at(FieldType::Text, alice.id, 1, 10.0, 300.0);
        let high = field_at(FieldType::Text, alice.id, 1, 10.0, 20.0);
        let foreign = field_at(FieldType::Text, bob.id, 1, 10.0, 0.0);
        let expected = vec![high.id, low.id, late.id];
        let store = FieldStore::new(vec![late, low, high, foreign]);

        let ids: Vec<FieldId> = store.owned_by(alice.id).iter().map(|f| f.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_final_values_cover_every_field() {
        let (alice, bob) = two_recipients();
        let mine = field_at(FieldType::Text, alice.id, 1, 10.0, 10.0);
        let theirs = field_at(FieldType::Text, bob.id, 1, 10.0, 100.0)
            .with_value(FieldValue::text("Bob"));
        let mine_id = mine.id;
        let mut store = FieldStore::new(vec![mine, theirs]);
        store.set_value(alice.id, mine_id, Some(FieldValue::text("Alice"))).unwrap();

        let values = store.final_values();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].value, Some(FieldValue::text("Alice")));
        assert_eq!(values[1].value, Some(FieldValue::text("Bob")));
    }
}
