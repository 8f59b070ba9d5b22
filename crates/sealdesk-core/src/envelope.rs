//! Envelope model: a document, its recipients and their fields, sent for
//! signature.
//!
//! An envelope is created atomically at send and afterwards only accepts
//! field-value submissions and a decline, each authorised by a per-recipient
//! access token.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::backend::{BackendError, LoadedEnvelope, SubmitRequest};
use crate::completion;
use crate::config::FieldSizeLimits;
use crate::field::{Color, Field, FieldId, FieldValue, RecipientId};
use crate::geometry::{self, Size};
use crate::page::PageNumber;

/// Errors raised while creating or updating an envelope.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    #[error("Envelope has no recipients")]
    NoRecipients,
    #[error("Recipient {0} has no fields")]
    RecipientWithoutFields(RecipientId),
    #[error("Field {field} references unknown recipient {recipient}")]
    UnknownRecipient {
        field: FieldId,
        recipient: RecipientId,
    },
    #[error("Field {field} references unknown page {page}")]
    UnknownPage { field: FieldId, page: PageNumber },
    #[error("Field {0} already carries a value")]
    PrefilledValue(FieldId),
    #[error("Field {field} is {width}x{height}, outside the limits for its type")]
    InvalidSize {
        field: FieldId,
        width: f32,
        height: f32,
    },
    #[error("Invalid access token")]
    InvalidToken,
    #[error("Envelope expired")]
    Expired,
    #[error("Envelope is {0:?} and no longer accepts input")]
    NotAccepting(EnvelopeStatus),
    #[error("Recipient already submitted")]
    AlreadySubmitted,
    #[error("Unknown field: {0}")]
    UnknownField(FieldId),
    #[error("Field {0} belongs to another recipient")]
    NotOwner(FieldId),
    #[error("Value does not match the type of field {0}")]
    TypeMismatch(FieldId),
    #[error("Required fields or signer name missing")]
    Incomplete,
}

impl From<EnvelopeError> for BackendError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::InvalidToken => BackendError::NotFound,
            other => BackendError::Rejected(other.to_string()),
        }
    }
}

/// A party asked to sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub name: String,
    pub email: String,
    /// Rank in the signing order, starting at 1.
    pub signing_order: u32,
    pub color: Color,
}

impl Recipient {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        signing_order: u32,
        color: Color,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            signing_order,
            color,
        }
    }
}

/// The PDF being signed, reduced to what placement needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    /// Canonical page sizes, page 1 first.
    pub pages: Vec<Size>,
}

impl Document {
    pub fn new(name: impl Into<String>, pages: Vec<Size>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            pages,
        }
    }

    pub fn page_size(&self, page: PageNumber) -> Option<Size> {
        let index = usize::try_from(page.checked_sub(1)?).ok()?;
        self.pages.get(index).copied()
    }
}

/// Envelope lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    /// Out for signature; some recipients may already have completed.
    Sent,
    /// Every recipient submitted.
    Signed,
    /// A recipient declined.
    Rejected,
}

impl EnvelopeStatus {
    pub fn is_final(self) -> bool {
        self != Self::Sent
    }
}

/// Why and when an envelope was declined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub recipient: RecipientId,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// A sent envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub document: Document,
    pub recipients: Vec<Recipient>,
    pub fields: Vec<Field>,
    pub status: EnvelopeStatus,
    /// Access token → recipient it was issued to.
    pub tokens: HashMap<String, RecipientId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Recipients that submitted, with their submission time.
    pub completed: HashMap<RecipientId, DateTime<Utc>>,
    pub rejection: Option<Rejection>,
}

impl Envelope {
    /// Validates a prepared layout and creates the envelope with one fresh
    /// token per recipient.
    ///
    /// Fields must be blank and sized within `limits`. Boxes are then fitted
    /// and clamped into their pages.
    pub fn create(
        document: Document,
        recipients: Vec<Recipient>,
        mut fields: Vec<Field>,
        limits: &FieldSizeLimits,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, EnvelopeError> {
        if recipients.is_empty() {
            return Err(EnvelopeError::NoRecipients);
        }
        for field in &mut fields {
            if !recipients.iter().any(|r| r.id == field.owner) {
                return Err(EnvelopeError::UnknownRecipient {
                    field: field.id,
                    recipient: field.owner,
                });
            }
            let Some(page) = document.page_size(field.page()) else {
                return Err(EnvelopeError::UnknownPage {
                    field: field.id,
                    page: field.page(),
                });
            };
            if field.value.is_some() {
                return Err(EnvelopeError::PrefilledValue(field.id));
            }
            // Pages smaller than a type minimum lower the minimum to the page.
            let bounds = limits.get(field.field_type);
            let g = &mut field.geometry;
            if !within(g.width, bounds.min.width.min(page.width), bounds.max.width)
                || !within(g.height, bounds.min.height.min(page.height), bounds.max.height)
            {
                return Err(EnvelopeError::InvalidSize {
                    field: field.id,
                    width: g.width,
                    height: g.height,
                });
            }
            let size = limits.fit(field.field_type, g.size(), Some(page));
            (g.width, g.height) = (size.width, size.height);
            (g.x, g.y) = geometry::clamp(g.x, g.y, g.width, g.height, page.width, page.height);
        }
        if let Some(idle) = recipients
            .iter()
            .find(|r| !fields.iter().any(|f| f.owner == r.id))
        {
            return Err(EnvelopeError::RecipientWithoutFields(idle.id));
        }

        let tokens = recipients
            .iter()
            .map(|r| (Uuid::new_v4().simple().to_string(), r.id))
            .collect();

        let envelope = Self {
            id: Uuid::new_v4(),
            document,
            recipients,
            fields,
            status: EnvelopeStatus::Sent,
            tokens,
            created_at: now,
            expires_at,
            completed: HashMap::new(),
            rejection: None,
        };
        tracing::info!(
            envelope_id = %envelope.id,
            recipients = envelope.recipients.len(),
            fields = envelope.fields.len(),
            "Envelope created"
        );
        Ok(envelope)
    }

    pub fn recipient(&self, id: RecipientId) -> Option<&Recipient> {
        self.recipients.iter().find(|r| r.id == id)
    }

    /// Recipient an access token was issued to.
    pub fn recipient_for_token(&self, token: &str) -> Result<RecipientId, EnvelopeError> {
        self.tokens
            .get(token)
            .copied()
            .ok_or(EnvelopeError::InvalidToken)
    }

    pub fn token_for(&self, recipient: RecipientId) -> Option<&str> {
        self.tokens
            .iter()
            .find(|(_, id)| **id == recipient)
            .map(|(token, _)| token.as_str())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn has_completed(&self, recipient: RecipientId) -> bool {
        self.completed.contains_key(&recipient)
    }

    /// Envelope as seen through one recipient's token.
    pub fn loaded_for(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<LoadedEnvelope, EnvelopeError> {
        let signer = self.recipient_for_token(token)?;
        Ok(LoadedEnvelope {
            envelope_id: self.id,
            document: self.document.clone(),
            recipients: self.recipients.clone(),
            fields: self.fields.clone(),
            current_signer_id: signer,
            is_expired: self.is_expired(now),
            status: self.status,
            signer_submitted: self.has_completed(signer),
        })
    }

    /// Applies one recipient's submission.
    ///
    /// The payload carries every field; entries for other recipients' fields
    /// must echo the stored value. Ownership, value types and the completion
    /// gate are checked again before anything is written.
    pub fn apply_submission(
        &mut self,
        token: &str,
        request: &SubmitRequest,
        now: DateTime<Utc>,
    ) -> Result<(), EnvelopeError> {
        let signer = self.accepting_recipient(token, now)?;

        let mut owned_values: HashMap<FieldId, Option<FieldValue>> = HashMap::new();
        for update in &request.values {
            let Some(field) = self.fields.iter().find(|f| f.id == update.field_id) else {
                return Err(EnvelopeError::UnknownField(update.field_id));
            };
            if field.owner != signer {
                if update.value != field.value {
                    tracing::debug!(field_id = %field.id, signer = %signer, "Submission touched a foreign field");
                    return Err(EnvelopeError::NotOwner(field.id));
                }
                continue;
            }
            if let Some(value) = &update.value {
                if !field.field_type.accepts(value) {
                    return Err(EnvelopeError::TypeMismatch(field.id));
                }
            }
            owned_values.insert(field.id, update.value.clone());
        }

        let owned: Vec<Field> = self
            .fields
            .iter()
            .filter(|f| f.owner == signer)
            .map(|f| Field {
                value: owned_values.get(&f.id).cloned().unwrap_or_else(|| f.value.clone()),
                ..f.clone()
            })
            .collect();
        if !completion::can_submit(&request.signer_name, &owned) {
            return Err(EnvelopeError::Incomplete);
        }

        for field in &mut self.fields {
            if let Some(value) = owned_values.remove(&field.id) {
                field.value = value;
            }
        }
        self.completed.insert(signer, now);
        if self.recipients.iter().all(|r| self.completed.contains_key(&r.id)) {
            self.status = EnvelopeStatus::Signed;
        }
        tracing::info!(
            envelope_id = %self.id,
            signer = %signer,
            status = ?self.status,
            "Submission applied"
        );
        Ok(())
    }

    /// Declines the envelope on behalf of the token's recipient.
    pub fn decline(
        &mut self,
        token: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EnvelopeError> {
        let signer = self.accepting_recipient(token, now)?;
        self.status = EnvelopeStatus::Rejected;
        self.rejection = Some(Rejection {
            recipient: signer,
            reason: reason.trim().to_string(),
            at: now,
        });
        tracing::info!(envelope_id = %self.id, signer = %signer, "Envelope declined");
        Ok(())
    }

    /// Resolves the token's recipient, provided they may still act.
    fn accepting_recipient(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RecipientId, EnvelopeError> {
        let signer = self.recipient_for_token(token)?;
        if self.status.is_final() {
            return Err(EnvelopeError::NotAccepting(self.status));
        }
        if self.is_expired(now) {
            return Err(EnvelopeError::Expired);
        }
        if self.has_completed(signer) {
            return Err(EnvelopeError::AlreadySubmitted);
        }
        Ok(signer)
    }
}

fn within(value: f32, min: f32, max: f32) -> bool {
    const EPS: f32 = 1e-3;
    value.is_finite() && value >= min - EPS && value <= max + EPS
}
