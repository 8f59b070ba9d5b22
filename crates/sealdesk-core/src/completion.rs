//! Completion gate: whether a signer may submit.

use serde::{Deserialize, Serialize};

use crate::field::{Field, FieldType, FieldValue};

/// Whether one field carries an acceptable value.
///
/// Date fields are filled automatically and always count as satisfied.
pub fn field_satisfied(field: &Field) -> bool {
    match (field.field_type, &field.value) {
        (FieldType::Date, _) => true,
        (FieldType::Signature | FieldType::Initial, Some(FieldValue::Text(text))) => {
            !text.is_empty()
        }
        (FieldType::Text, Some(FieldValue::Text(text))) => !text.trim().is_empty(),
        (FieldType::Checkbox, Some(FieldValue::Bool(checked))) => *checked,
        _ => false,
    }
}

/// True when the signer name is non-blank and every owned field is satisfied.
pub fn can_submit(signer_name: &str, owned: &[Field]) -> bool {
    !signer_name.trim().is_empty() && owned.iter().all(field_satisfied)
}

/// Required-field progress for the signing UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub required: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.completed == self.required
    }
}

/// Counts the owned fields a signer must fill (Date excluded).
pub fn progress(owned: &[Field]) -> Progress {
    let required: Vec<&Field> = owned
        .iter()
        .filter(|f| f.field_type != FieldType::Date)
        .collect();
    Progress {
        completed: required.iter().filter(|f| field_satisfied(f)).count(),
        required: required.len(),
    }
}
