//! Collaborator traits: the PDF renderer and the envelope persistence service.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::envelope::{Document, EnvelopeStatus, Recipient};
use crate::field::{Field, FieldId, FieldValue, RecipientId};
use crate::geometry::Size;
use crate::page::PageNumber;

/// Errors reported by a collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Envelope not found")]
    NotFound,
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Unknown page: {0}")]
    UnknownPage(PageNumber),
}

impl BackendError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Page geometry provider (the PDF renderer).
///
/// Bitmap rendering stays with the shell; the engine only needs sizes.
pub trait PageSource {
    fn page_count(&self) -> u32;

    /// Size of a 1-based page at `scale`.
    fn page_dimensions(&self, page: PageNumber, scale: f32) -> Result<Size, BackendError>;
}

impl PageSource for Document {
    fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    fn page_dimensions(&self, page: PageNumber, scale: f32) -> Result<Size, BackendError> {
        page.checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.pages.get(i))
            .map(|size| size.scale(scale))
            .ok_or(BackendError::UnknownPage(page))
    }
}

/// Everything a signing session needs, as returned for one access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedEnvelope {
    pub envelope_id: Uuid,
    pub document: Document,
    pub recipients: Vec<Recipient>,
    pub fields: Vec<Field>,
    /// Recipient the token was issued to.
    pub current_signer_id: RecipientId,
    pub is_expired: bool,
    pub status: EnvelopeStatus,
    /// The current signer already completed their part.
    #[serde(default)]
    pub signer_submitted: bool,
}

/// One field's final value, as persisted on submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValueUpdate {
    pub field_id: FieldId,
    pub value: Option<FieldValue>,
}

/// Submission payload: every field's value plus the typed signer name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub signer_name: String,
    pub values: Vec<FieldValueUpdate>,
}

/// Envelope persistence, keyed by access token.
pub trait EnvelopeBackend {
    fn load_envelope(&self, token: &str) -> Result<LoadedEnvelope, BackendError>;

    fn save_field_values(&self, token: &str, request: &SubmitRequest) -> Result<(), BackendError>;

    fn decline(&self, token: &str, reason: &str) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_page_dimensions() {
        let doc = Document::new("nda.pdf", vec![Size::new(612.0, 792.0), Size::new(792.0, 612.0)]);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_dimensions(2, 1.0), Ok(Size::new(792.0, 612.0)));
        assert_eq!(doc.page_dimensions(1, 0.5), Ok(Size::new(306.0, 396.0)));
        assert_eq!(doc.page_dimensions(0, 1.0), Err(BackendError::UnknownPage(0)));
        assert_eq!(doc.page_dimensions(3, 1.0), Err(BackendError::UnknownPage(3)));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(BackendError::Unavailable("timeout".to_string()).is_retryable());
        assert!(!BackendError::NotFound.is_retryable());
        assert!(!BackendError::Rejected("gate".to_string()).is_retryable());
    }

    #[test]
    fn test_submit_request_json() {
        let id = Uuid::nil();
        let request = SubmitRequest {
            signer_name: "Ada".to_string(),
            values: vec![
                FieldValueUpdate { field_id: id, value: Some(FieldValue::Bool(true)) },
                FieldValueUpdate { field_id: id, value: None },
            ],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["signer_name"], "Ada");
        assert_eq!(json["values"][0]["value"], true);
        assert!(json["values"][1]["value"].is_null());
        let back: SubmitRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }
}
