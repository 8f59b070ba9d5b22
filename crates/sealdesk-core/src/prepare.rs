//! Preparation: the document owner adds recipients, places and lays out
//! fields, then sends the envelope.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::envelope::{Document, Envelope, EnvelopeError, Recipient};
use crate::field::{Color, Field, FieldGeometry, FieldId, FieldType, RecipientId};
use crate::geometry::{self, Point};
use crate::gesture::{GestureController, GestureOutcome, GestureTarget};
use crate::page::{PageNumber, PageRegistry};
use crate::render::{PositionedField, render_model};
use crate::store::FieldStore;
use crate::view::ViewContext;

/// Errors raised while preparing an envelope.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrepareError {
    #[error("No field type selected")]
    NoTool,

    #[error("No recipient selected")]
    NoRecipient,

    #[error("Unknown recipient: {0}")]
    UnknownRecipient(RecipientId),

    #[error("Unknown field: {0}")]
    UnknownField(FieldId),

    #[error("Unknown page: {0}")]
    UnknownPage(PageNumber),

    #[error("Point is not on any page")]
    OffPage,

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Owner-side editing state for one document.
#[derive(Debug, Clone)]
pub struct Preparation {
    config: EngineConfig,
    document: Document,
    registry: PageRegistry,
    recipients: Vec<Recipient>,
    store: FieldStore,
    gestures: GestureController,
    ctx: ViewContext,
    selected_recipient: Option<RecipientId>,
    colors_assigned: usize,
}

impl Preparation {
    /// Starts an empty layout; pages are stacked at zoom 1.
    pub fn new(document: Document, config: EngineConfig) -> Self {
        let mut registry = PageRegistry::new(document.pages.iter().copied());
        registry.stack_vertically(1.0, config.page_gap_px);
        Self {
            gestures: GestureController::new(config.clone()),
            config,
            document,
            registry,
            recipients: Vec::new(),
            store: FieldStore::default(),
            ctx: ViewContext::prepare(),
            selected_recipient: None,
            colors_assigned: 0,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
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

    pub fn selected_recipient(&self) -> Option<RecipientId> {
        self.selected_recipient
    }

    /// Adds a recipient at the end of the signing order.
    ///
    /// The first recipient added becomes the selected one.
    pub fn add_recipient(&mut self, name: impl Into<String>, email: impl Into<String>) -> RecipientId {
        let order = u32::try_from(self.recipients.len() + 1).unwrap_or(u32::MAX);
        let recipient = Recipient::new(name, email, order, Color::for_index(self.colors_assigned));
        self.colors_assigned += 1;
        let id = recipient.id;
        tracing::debug!(recipient_id = %id, order, "Recipient added");
        self.recipients.push(recipient);
        if self.selected_recipient.is_none() {
            self.selected_recipient = Some(id);
        }
        id
    }

    /// Removes a recipient together with every field assigned to them.
    ///
    /// Returns the number of fields removed.
    pub fn remove_recipient(&mut self, id: RecipientId) -> Result<usize, PrepareError> {
        let index = self
            .recipients
            .iter()
            .position(|r| r.id == id)
            .ok_or(PrepareError::UnknownRecipient(id))?;
        self.recipients.remove(index);
        for (recipient, order) in self.recipients.iter_mut().zip(1..) {
            recipient.signing_order = order;
        }
        if self.selected_recipient == Some(id) {
            self.selected_recipient = self.recipients.first().map(|r| r.id);
        }
        let removed = self.store.remove_owned_by(id);
        tracing::debug!(recipient_id = %id, removed, "Recipient removed");
        Ok(removed)
    }

    /// Arms (or disarms) the placement tool.
    pub fn select_tool(&mut self, tool: Option<FieldType>) {
        self.ctx.tool = tool;
    }

    pub fn select_recipient(&mut self, id: RecipientId) -> Result<(), PrepareError> {
        if !self.recipients.iter().any(|r| r.id == id) {
            return Err(PrepareError::UnknownRecipient(id));
        }
        self.selected_recipient = Some(id);
        Ok(())
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

    /// Places one field of the active type for the selected recipient,
    /// centred on a canonical page point and clamped into the page.
    pub fn place_field(&mut self, page: PageNumber, at: Point) -> Result<FieldId, PrepareError> {
        let field_type = self.ctx.tool.ok_or(PrepareError::NoTool)?;
        let owner = self.selected_recipient.ok_or(PrepareError::NoRecipient)?;
        let page_size = self
            .registry
            .size(page)
            .ok_or(PrepareError::UnknownPage(page))?;

        let size = self
            .config
            .size_limits
            .fit(field_type, field_type.default_size(), Some(page_size));
        let (x, y) = geometry::clamp(
            at.x - size.width / 2.0,
            at.y - size.height / 2.0,
            size.width,
            size.height,
            page_size.width,
            page_size.height,
        );
        let field = Field::new(
            field_type,
            owner,
            FieldGeometry::new(page, x, y, size.width, size.height),
        );
        let id = field.id;
        tracing::debug!(field_id = %id, ?field_type, page, "Field placed");
        self.store.insert(field);
        Ok(id)
    }

    /// Places a field where the user clicked in the viewer.
    pub fn place_field_at_client(&mut self, client: Point) -> Result<FieldId, PrepareError> {
        let page = self
            .registry
            .locate_page(client, &self.ctx.viewport)
            .ok_or(PrepareError::OffPage)?;
        let at = self
            .registry
            .to_page_local(page, client, &self.ctx.viewport)
            .ok_or(PrepareError::UnknownPage(page))?;
        self.place_field(page, at)
    }

    pub fn remove_field(&mut self, id: FieldId) -> Result<Field, PrepareError> {
        if self.gestures.active_field() == Some(id) {
            self.gestures.cancel(&mut self.store);
        }
        self.store.remove(id).ok_or(PrepareError::UnknownField(id))
    }

    pub fn pointer_down(&mut self, target: GestureTarget, client: Point, time_ms: u64) -> bool {
        self.gestures
            .pointer_down(target, client, time_ms, &self.ctx, &self.registry, &self.store)
    }

    pub fn pointer_move(&mut self, client: Point) {
        self.gestures.pointer_move(client, &self.ctx, &mut self.store);
    }

    pub fn pointer_up(&mut self, client: Point, time_ms: u64) -> GestureOutcome {
        self.gestures
            .pointer_up(client, time_ms, &self.ctx, &self.registry, &mut self.store)
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
        self.gestures
            .touch_end(remaining, time_ms, &self.ctx, &self.registry, &mut self.store)
    }

    pub fn cancel_gesture(&mut self) -> GestureOutcome {
        self.gestures.cancel(&mut self.store)
    }

    pub fn render(&self) -> Vec<PositionedField> {
        render_model(&self.store, &self.recipients, &self.registry, &self.ctx)
    }

    /// Validates the layout and creates the envelope.
    pub fn send(&self, expires_at: Option<DateTime<Utc>>) -> Result<Envelope, PrepareError> {
        let envelope = Envelope::create(
            self.document.clone(),
            self.recipients.clone(),
            self.store.committed(),
            &self.config.size_limits,
            expires_at,
            Utc::now(),
        )?;
        Ok(envelope)
    }
}
