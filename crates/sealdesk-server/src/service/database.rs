use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sealdesk_core::{
    BackendError, Envelope, EnvelopeBackend, EnvelopeError, LoadedEnvelope, SubmitRequest,
};
use serde_json::json;
use thiserror::Error;

#[derive(Default)]
struct Tables {
    envelopes: HashMap<uuid::Uuid, Envelope>,
    /// Access token → envelope it opens.
    tokens: HashMap<String, uuid::Uuid>,
}

/// In-memory envelope storage, shared across request handlers.
#[derive(Clone, Default)]
pub struct Database {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("Envelope not found")]
    EnvelopeNotFound,

    #[error("Invalid access token")]
    TokenNotFound,

    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl DatabaseError {
    pub fn to_status(&self) -> StatusCode {
        match self {
            DatabaseError::Envelope(err) => match err {
                EnvelopeError::NoRecipients
                | EnvelopeError::RecipientWithoutFields(_)
                | EnvelopeError::UnknownRecipient { .. }
                | EnvelopeError::UnknownPage { .. }
                | EnvelopeError::PrefilledValue(_)
                | EnvelopeError::InvalidSize { .. }
                | EnvelopeError::UnknownField(_)
                | EnvelopeError::TypeMismatch(_) => StatusCode::BAD_REQUEST,
                EnvelopeError::InvalidToken => StatusCode::NOT_FOUND,
                EnvelopeError::Expired => StatusCode::GONE,
                EnvelopeError::NotAccepting(_) | EnvelopeError::AlreadySubmitted => {
                    StatusCode::CONFLICT
                }
                EnvelopeError::NotOwner(_) => StatusCode::FORBIDDEN,
                EnvelopeError::Incomplete => StatusCode::UNPROCESSABLE_ENTITY,
            },
            DatabaseError::EnvelopeNotFound | DatabaseError::TokenNotFound => StatusCode::NOT_FOUND,
            DatabaseError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for DatabaseError {
    fn into_response(self) -> Response {
        let status = self.to_status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<DatabaseError> for BackendError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Envelope(err) => err.into(),
            DatabaseError::EnvelopeNotFound | DatabaseError::TokenNotFound => BackendError::NotFound,
            DatabaseError::InvalidArgument(msg) => BackendError::Rejected(msg.to_string()),
        }
    }
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_envelope(&self, envelope: Envelope) {
        let mut tables = self.tables.write();
        for token in envelope.tokens.keys() {
            tables.tokens.insert(token.clone(), envelope.id);
        }
        tables.envelopes.insert(envelope.id, envelope);
    }

    pub fn get_envelope(&self, envelope_id: &uuid::Uuid) -> Result<Envelope, DatabaseError> {
        let tables = self.tables.read();
        tables
            .envelopes
            .get(envelope_id)
            .cloned()
            .ok_or(DatabaseError::EnvelopeNotFound)
    }

    /// The envelope as seen by the token's recipient.
    pub fn load(&self, token: &str, now: DateTime<Utc>) -> Result<LoadedEnvelope, DatabaseError> {
        let tables = self.tables.read();
        let Some(envelope_id) = tables.tokens.get(token) else {
            return Err(DatabaseError::TokenNotFound);
        };
        let Some(envelope) = tables.envelopes.get(envelope_id) else {
            return Err(DatabaseError::EnvelopeNotFound);
        };
        Ok(envelope.loaded_for(token, now)?)
    }

    /// Applies a submission under a single write lock.
    pub fn submit(
        &self,
        token: &str,
        request: &SubmitRequest,
        now: DateTime<Utc>,
    ) -> Result<Envelope, DatabaseError> {
        self.with_envelope_mut(token, |envelope| {
            envelope.apply_submission(token, request, now)
        })
    }

    pub fn decline(
        &self,
        token: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Envelope, DatabaseError> {
        self.with_envelope_mut(token, |envelope| envelope.decline(token, reason, now))
    }

    fn with_envelope_mut(
        &self,
        token: &str,
        apply: impl FnOnce(&mut Envelope) -> Result<(), EnvelopeError>,
    ) -> Result<Envelope, DatabaseError> {
        let mut tables = self.tables.write();
        let Some(envelope_id) = tables.tokens.get(token).copied() else {
            return Err(DatabaseError::TokenNotFound);
        };
        let Some(envelope) = tables.envelopes.get_mut(&envelope_id) else {
            return Err(DatabaseError::EnvelopeNotFound);
        };
        apply(envelope)?;
        Ok(envelope.clone())
    }
}

impl EnvelopeBackend for Database {
    fn load_envelope(&self, token: &str) -> Result<LoadedEnvelope, BackendError> {
        Ok(self.load(token, Utc::now())?)
    }

    fn save_field_values(&self, token: &str, request: &SubmitRequest) -> Result<(), BackendError> {
        self.submit(token, request, Utc::now())?;
        Ok(())
    }

    fn decline(&self, token: &str, reason: &str) -> Result<(), BackendError> {
        Database::decline(self, token, reason, Utc::now())?;
        Ok(())
    }
}
