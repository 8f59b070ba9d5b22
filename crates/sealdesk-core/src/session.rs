//! Signing session: one recipient filling in their own fields.
//!
//! Submission is two-phase so the shell can await the network in between:
//!
//! ```text
//! Idle ──begin_submit──▶ InFlight ──complete_submit(Ok)──▶ Submitted
//!                          │
//!                          └──complete_submit(Err)──▶ Failed ──begin_submit──▶ InFlight
//! ```

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::backend::{BackendError, EnvelopeBackend, LoadedEnvelope, SubmitRequest};
use crate::completion::{self, Progress};
use crate::config::EngineConfig;
use crate::envelope::{Document, EnvelopeStatus, Recipient};
use crate::field::{Field, FieldId, FieldType, FieldValue, RecipientId};
use crate::geometry::Point;
use crate::gesture::{GestureController, GestureOutcome, GestureTarget};
use crate::page::{PageNumber, PageRegistry};
use crate::render::{PositionedField, render_model};
use crate::sequencer::{FieldSequencer, SequencerStop};
use crate::store::{FieldError, FieldStore};
use crate::view::ViewContext;
use crate::visibility::{ViewMode, effective_mode};

/// Format used for auto-populated Date fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised by session lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    #[error("Token was issued to unknown recipient {0}")]
    UnknownSigner(RecipientId),

    #[error("Required fields or signer name missing")]
    Incomplete,

    #[error("A submission is already in flight")]
    InFlight,

    #[error("Already submitted")]
    AlreadySubmitted,

    #[error("Envelope is read-only")]
    ReadOnly,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SubmitError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// Where the session's submission stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitState {
    Idle,
    InFlight,
    Submitted,
    Declined,
    /// Last attempt failed; local values are kept for a retry.
    Failed { retryable: bool },
}

/// Signing state for the recipient an access token was issued to.
#[derive(Debug, Clone)]
pub struct SigningSession {
    config: EngineConfig,
    token: String,
    envelope_id: Uuid,
    document: Document,
    recipients: Vec<Recipient>,
    signer: RecipientId,
    status: EnvelopeStatus,
    is_expired: bool,
    registry: PageRegistry,
    store: FieldStore,
    gestures: GestureController,
    sequencer: FieldSequencer,
    ctx: ViewContext,
    signer_name: String,
    submit_state: SubmitState,
    notification: Option<String>,
}

impl SigningSession {
    /// Fetches the envelope for `token` and opens a session dated today.
    pub fn load(
        backend: &dyn EnvelopeBackend,
        token: &str,
        config: EngineConfig,
    ) -> Result<Self, SubmitError> {
        let loaded = backend.load_envelope(token)?;
        Self::open(token, loaded, config, Utc::now().date_naive())
    }

    /// Opens a session from an already loaded envelope.
    ///
    /// Finalized or expired envelopes, and signers who already submitted,
    /// get a read-only session. Otherwise the signer's empty Date fields are
    /// filled with `today`.
    pub fn open(
        token: impl Into<String>,
        loaded: LoadedEnvelope,
        config: EngineConfig,
        today: NaiveDate,
    ) -> Result<Self, SubmitError> {
        let signer = loaded.current_signer_id;
        if !loaded.recipients.iter().any(|r| r.id == signer) {
            return Err(SubmitError::UnknownSigner(signer));
        }

        let mut registry = PageRegistry::from_source(&loaded.document)?;
        registry.stack_vertically(1.0, config.page_gap_px);

        let mode = effective_mode(
            ViewMode::Signing,
            loaded.status,
            loaded.is_expired,
            loaded.signer_submitted,
        );
        let ctx = match mode {
            ViewMode::Signing => ViewContext::signing(signer),
            _ => ViewContext::read_only(Some(signer)),
        };

        let mut store = FieldStore::new(loaded.fields);
        if mode == ViewMode::Signing {
            let date = today.format(DATE_FORMAT).to_string();
            for field in store.owned_by(signer) {
                if field.field_type == FieldType::Date && !field.has_value() {
                    if let Err(err) =
                        store.set_value(signer, field.id, Some(FieldValue::text(date.clone())))
                    {
                        tracing::warn!(field_id = %field.id, %err, "Date auto-fill rejected");
                    }
                }
            }
        } else {
            store.lock_all();
        }

        let sequencer = FieldSequencer::new(&store.owned_by(signer));
        let submit_state = if loaded.signer_submitted {
            SubmitState::Submitted
        } else {
            SubmitState::Idle
        };

        tracing::info!(
            envelope_id = %loaded.envelope_id,
            signer = %signer,
            ?mode,
            fields = store.len(),
            "Signing session opened"
        );

        Ok(Self {
            gestures: GestureController::new(config.clone()),
            config,
            token: token.into(),
            envelope_id: loaded.envelope_id,
            document: loaded.document,
            recipients: loaded.recipients,
            signer,
            status: loaded.status,
            is_expired: loaded.is_expired,
            registry,
            store,
            sequencer,
            ctx,
            signer_name: String::new(),
            submit_state,
            notification: None,
        })
    }

    pub fn envelope_id(&self) -> Uuid {
        self.envelope_id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn signer(&self) -> RecipientId {
        self.signer
    }

    pub fn signer_recipient(&self) -> Option<&Recipient> {
        self.recipients.iter().find(|r| r.id == self.signer)
    }

    pub fn status(&self) -> EnvelopeStatus {
        self.status
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired
    }

    pub fn mode(&self) -> ViewMode {
        self.ctx.mode
    }

    pub fn is_editable(&self) -> bool {
        self.ctx.mode == ViewMode::Signing
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    pub fn registry(&self) -> &PageRegistry {
        &self.registry
    }

    /// Lets the shell report real page anchors after layout.
    pub fn registry_mut(&mut self) -> &mut PageRegistry {
        &mut self.registry
    }

    pub fn context(&self) -> &ViewContext {
        &self.ctx
    }

    pub fn submit_state(&self) -> &SubmitState {
        &self.submit_state
    }

    /// Message for the shell to surface (success, or a retryable failure).
    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    /// Sets the zoom and re-stacks the pages.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.ctx.set_zoom(zoom, &self.config);
        self.registry
            .stack_vertically(self.ctx.zoom(), self.config.page_gap_px);
    }

    pub fn set_scroll(&mut self, scroll: Point) {
        self.ctx.viewport.scroll = scroll;
    }

    pub fn set_current_page(&mut self, page: Option<PageNumber>) {
        self.ctx.current_page = page;
    }

    pub fn signer_name(&self) -> &str {
        &self.signer_name
    }

    pub fn set_signer_name(&mut self, name: impl Into<String>) {
        self.signer_name = name.into();
    }

    /// Writes one of the signer's own fields.
    pub fn set_value(&mut self, field_id: FieldId, value: Option<FieldValue>) -> Result<(), FieldError> {
        if self.submit_state == SubmitState::InFlight {
            return Err(FieldError::Locked(field_id));
        }
        self.store.set_value(self.signer, field_id, value)
    }

    /// The signer's fields in page order.
    pub fn owned_fields(&self) -> Vec<Field> {
        self.store.owned_by(self.signer)
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        self.is_editable()
            && matches!(
                self.submit_state,
                SubmitState::Idle | SubmitState::Failed { .. }
            )
            && completion::can_submit(&self.signer_name, &self.owned_fields())
    }

    pub fn progress(&self) -> Progress {
        completion::progress(&self.owned_fields())
    }

    /// Focuses the first field that still needs input.
    pub fn start_signing(&mut self) -> Option<SequencerStop> {
        let owned = self.owned_fields();
        self.sequencer.start_signing(&owned)
    }

    pub fn next_field(&mut self) -> Option<SequencerStop> {
        self.sequencer.next()
    }

    pub fn previous_field(&mut self) -> Option<SequencerStop> {
        self.sequencer.previous()
    }

    pub fn jump_to(&mut self, field_id: FieldId) -> Option<SequencerStop> {
        self.sequencer.jump_to(field_id)
    }

    pub fn current_field(&self) -> Option<SequencerStop> {
        self.sequencer.current()
    }

    pub fn pointer_down(&mut self, target: GestureTarget, client: Point, time_ms: u64) -> bool {
        self.gestures
            .pointer_down(target, client, time_ms, &self.ctx, &self.registry, &self.store)
    }

    pub fn pointer_move(&mut self, client: Point) {
        self.gestures.pointer_move(client, &self.ctx, &mut self.store);
    }

    /// Ends a press; a tap makes the tapped field current.
    pub fn pointer_up(&mut self, client: Point, time_ms: u64) -> GestureOutcome {
        let outcome = self
            .gestures
            .pointer_up(client, time_ms, &self.ctx, &self.registry, &mut self.store);
        if let GestureOutcome::Tap { field_id } = outcome {
            self.sequencer.jump_to(field_id);
        }
        outcome
    }

    pub fn touch_start(&mut self, field_id: FieldId, touches: &[Point], time_ms: u64) -> bool {
        self.gestures
            .touch_start(
                field_id,
                touches,
                time_ms,
                &self.ctx,
                &self.registry,
                &mut self.store,
            )
    }

    pub fn touch_move(&mut self, touches: &[Point]) {
        self.gestures.touch_move(touches, &self.ctx, &mut self.store);
    }

    pub fn touch_end(&mut self, remaining: &[Point], time_ms: u64) -> GestureOutcome {
        let outcome = self
            .gestures
            .touch_end(remaining, time_ms, &self.ctx, &self.registry, &mut self.store);
        if let GestureOutcome::Tap { field_id } = outcome {
            self.sequencer.jump_to(field_id);
        }
        outcome
    }

    pub fn cancel_gesture(&mut self) -> GestureOutcome {
        self.gestures.cancel(&mut self.store)
    }

    pub fn render(&self) -> Vec<PositionedField> {
        render_model(&self.store, &self.recipients, &self.registry, &self.ctx)
    }

    /// Starts a submission and returns its payload: every field's value plus
    /// the trimmed signer name.
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, SubmitError> {
        match self.submit_state {
            SubmitState::InFlight => return Err(SubmitError::InFlight),
            SubmitState::Submitted => return Err(SubmitError::AlreadySubmitted),
            SubmitState::Declined => return Err(SubmitError::ReadOnly),
            SubmitState::Idle | SubmitState::Failed { .. } => {}
        }
        if !self.is_editable() {
            return Err(SubmitError::ReadOnly);
        }
        if !completion::can_submit(&self.signer_name, &self.owned_fields()) {
            return Err(SubmitError::Incomplete);
        }

        self.gestures.cancel(&mut self.store);
        self.submit_state = SubmitState::InFlight;
        self.notification = None;
        tracing::info!(envelope_id = %self.envelope_id, signer = %self.signer, "Submission started");
        Ok(SubmitRequest {
            signer_name: self.signer_name.trim().to_string(),
            values: self.store.final_values(),
        })
    }

    /// Finishes the submission started by [`Self::begin_submit`].
    ///
    /// On success every field is locked and the session turns read-only. On
    /// failure local state is kept and a retry is allowed.
    pub fn complete_submit(&mut self, result: Result<(), BackendError>) -> Result<(), SubmitError> {
        if self.submit_state != SubmitState::InFlight {
            return Ok(());
        }
        match result {
            Ok(()) => {
                self.store.lock_all();
                self.ctx.mode = ViewMode::ReadOnly;
                self.submit_state = SubmitState::Submitted;
                self.notification = Some("Document submitted".to_string());
                tracing::info!(envelope_id = %self.envelope_id, signer = %self.signer, "Submission completed");
                Ok(())
            }
            Err(err) => {
                let retryable = err.is_retryable();
                self.submit_state = SubmitState::Failed { retryable };
                self.notification = Some(format!("Submission failed: {err}"));
                tracing::warn!(envelope_id = %self.envelope_id, %err, retryable, "Submission failed");
                Err(err.into())
            }
        }
    }

    /// Runs both submission phases against `backend`.
    pub fn submit(&mut self, backend: &dyn EnvelopeBackend) -> Result<(), SubmitError> {
        let request = self.begin_submit()?;
        let result = backend.save_field_values(&self.token, &request);
        self.complete_submit(result)
    }

    /// Declines the envelope; the session becomes read-only.
    pub fn decline(&mut self, backend: &dyn EnvelopeBackend, reason: &str) -> Result<(), SubmitError> {
        if self.submit_state == SubmitState::InFlight {
            return Err(SubmitError::InFlight);
        }
        if !self.is_editable() {
            return Err(SubmitError::ReadOnly);
        }
        if let Err(err) = backend.decline(&self.token, reason) {
            tracing::warn!(envelope_id = %self.envelope_id, %err, "Decline failed");
            self.notification = Some(format!("Decline failed: {err}"));
            return Err(err.into());
        }

        self.gestures.cancel(&mut self.store);
        self.store.lock_all();
        self.ctx.mode = ViewMode::ReadOnly;
        self.status = EnvelopeStatus::Rejected;
        self.submit_state = SubmitState::Declined;
        self.notification = Some("Document declined".to_string());
        tracing::info!(envelope_id = %self.envelope_id, signer = %self.signer, "Envelope declined");
        Ok(())
    }
}
