//! Ownership & visibility resolution.
//!
//! Decides, per field, what the acting party sees: an editable control, a
//! filled read-only value, a dimmed placeholder, or nothing at all.

use serde::{Deserialize, Serialize};

use crate::envelope::EnvelopeStatus;
use crate::field::{Field, RecipientId};

/// What the acting party is doing with the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Owner laying out fields before send.
    Prepare,
    /// A recipient filling in their own fields.
    #[default]
    Signing,
    /// Viewing only.
    ReadOnly,
}

/// Rendering class for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Editable,
    ReadOnlyFilled,
    /// Dimmed box naming the type and the responsible recipient.
    HiddenPlaceholder,
    /// Not rendered.
    Suppressed,
}

impl Visibility {
    pub fn is_editable(self) -> bool {
        self == Self::Editable
    }

    pub fn is_rendered(self) -> bool {
        self != Self::Suppressed
    }
}

/// Classifies `field` for `actor` in `mode`.
///
/// - `ReadOnly`: filled fields show their value, empty ones are suppressed.
/// - `Signing`, someone else's field: value if filled, placeholder otherwise.
/// - `Signing`, own field: editable, filled or not.
/// - `Prepare`: every field is editable layout.
pub fn classify(field: &Field, actor: Option<RecipientId>, mode: ViewMode) -> Visibility {
    match mode {
        ViewMode::Prepare => Visibility::Editable,
        ViewMode::ReadOnly => {
            if field.has_value() {
                Visibility::ReadOnlyFilled
            } else {
                Visibility::Suppressed
            }
        }
        ViewMode::Signing => {
            if actor == Some(field.owner) {
                Visibility::Editable
            } else if field.has_value() {
                Visibility::ReadOnlyFilled
            } else {
                Visibility::HiddenPlaceholder
            }
        }
    }
}

/// Downgrades a requested mode when the envelope no longer accepts input.
///
/// A finalized or expired envelope, or a recipient who already submitted,
/// only ever gets `ReadOnly`.
pub fn effective_mode(
    requested: ViewMode,
    status: EnvelopeStatus,
    is_expired: bool,
    already_submitted: bool,
) -> ViewMode {
    if requested == ViewMode::Signing
        && (status != EnvelopeStatus::Sent || is_expired || already_submitted)
    {
        ViewMode::ReadOnly
    } else {
        requested
    }
}
