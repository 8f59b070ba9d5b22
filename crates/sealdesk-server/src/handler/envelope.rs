use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Duration, Utc};
use sealdesk_core::{
    Document, Envelope, EnvelopeStatus, Field, LoadedEnvelope, Recipient, RecipientId, Rejection,
    SubmitRequest,
};
use serde::{Deserialize, Serialize};

use crate::{
    handler::AppState,
    service::database::DatabaseError,
    util::{self, required_str},
};

#[derive(Debug, Deserialize)]
pub struct CreateEnvelopeRequest {
    pub document: Document,
    pub recipients: Vec<Recipient>,
    pub fields: Vec<Field>,
    /// Overrides the server's default lifetime.
    #[serde(default)]
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipientToken {
    pub recipient_id: RecipientId,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEnvelopeResponse {
    pub envelope_id: uuid::Uuid,
    pub expires_at: Option<DateTime<Utc>>,
    pub tokens: Vec<RecipientToken>,
}

#[derive(Debug, Deserialize)]
pub struct DeclineRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnvelopeSummary {
    pub envelope_id: uuid::Uuid,
    pub document_name: String,
    pub status: EnvelopeStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Recipients that submitted, in signing order.
    pub completed: Vec<RecipientId>,
    pub pending: Vec<RecipientId>,
    pub rejection: Option<Rejection>,
}

impl From<&Envelope> for EnvelopeSummary {
    fn from(envelope: &Envelope) -> Self {
        let mut recipients: Vec<&Recipient> = envelope.recipients.iter().collect();
        recipients.sort_by_key(|r| r.signing_order);
        let (completed, pending): (Vec<&Recipient>, Vec<&Recipient>) = recipients
            .into_iter()
            .partition(|r| envelope.has_completed(r.id));
        Self {
            envelope_id: envelope.id,
            document_name: envelope.document.name.clone(),
            status: envelope.status,
            created_at: envelope.created_at,
            expires_at: envelope.expires_at,
            completed: completed.iter().map(|r| r.id).collect(),
            pending: pending.iter().map(|r| r.id).collect(),
            rejection: envelope.rejection.clone(),
        }
    }
}

pub async fn create_envelope(
    State(state): State<AppState>,
    Json(req): Json<CreateEnvelopeRequest>,
) -> Result<(StatusCode, Json<CreateEnvelopeResponse>), DatabaseError> {
    for recipient in &req.recipients {
        required_str(&recipient.name, "Recipient name is required")?;
        required_str(&recipient.email, "Recipient email is required")?;
    }

    let now = Utc::now();
    let ttl = req
        .expires_in_days
        .map_or(state.config.envelope_ttl, |days| {
            Duration::days(util::clamp(days, 1, 365))
        });
    let envelope = Envelope::create(
        req.document,
        req.recipients,
        req.fields,
        &state.config.size_limits,
        Some(now + ttl),
        now,
    )?;

    let response = CreateEnvelopeResponse {
        envelope_id: envelope.id,
        expires_at: envelope.expires_at,
        tokens: envelope
            .recipients
            .iter()
            .filter_map(|r| {
                envelope.token_for(r.id).map(|token| RecipientToken {
                    recipient_id: r.id,
                    email: r.email.clone(),
                    token: token.to_string(),
                })
            })
            .collect(),
    };
    state.database.add_envelope(envelope);

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_envelope(
    State(state): State<AppState>,
    Path(envelope_id): Path<uuid::Uuid>,
) -> Result<Json<EnvelopeSummary>, DatabaseError> {
    let envelope = state.database.get_envelope(&envelope_id)?;
    Ok(Json(EnvelopeSummary::from(&envelope)))
}

pub async fn load_for_signing(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<LoadedEnvelope>, DatabaseError> {
    let loaded = state.database.load(&token, Utc::now())?;
    tracing::info!(envelope_id = %loaded.envelope_id, signer = %loaded.current_signer_id, "Envelope loaded for signing");
    Ok(Json(loaded))
}

pub async fn submit(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<EnvelopeSummary>, DatabaseError> {
    let envelope = state.database.submit(&token, &req, Utc::now())?;
    Ok(Json(EnvelopeSummary::from(&envelope)))
}

pub async fn decline(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<DeclineRequest>,
) -> Result<Json<EnvelopeSummary>, DatabaseError> {
    let envelope = state.database.decline(&token, &req.reason, Utc::now())?;
    Ok(Json(EnvelopeSummary::from(&envelope)))
}
