//! Shared fixtures for unit tests.

use std::cell::{Cell, RefCell};

use chrono::Utc;

use crate::backend::{BackendError, EnvelopeBackend, LoadedEnvelope, SubmitRequest};
use crate::config::FieldSizeLimits;
use crate::envelope::{Document, Envelope, Recipient};
use crate::field::{Color, Field, FieldGeometry, FieldType, RecipientId};
use crate::geometry::Size;
use crate::page::{PageNumber, PageRegistry};

pub fn two_recipients() -> (Recipient, Recipient) {
    (
        Recipient::new("Alice Example", "alice@example.com", 1, Color::for_index(0)),
        Recipient::new("Bob Example", "bob@example.com", 2, Color::for_index(1)),
    )
}

/// Field of the type's default size.
pub fn field_at(
    field_type: FieldType,
    owner: RecipientId,
    page: PageNumber,
    x: f32,
    y: f32,
) -> Field {
    let size = field_type.default_size();
    field_sized(field_type, owner, page, x, y, size.width, size.height)
}

pub fn field_sized(
    field_type: FieldType,
    owner: RecipientId,
    page: PageNumber,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
) -> Field {
    Field::new(field_type, owner, FieldGeometry::new(page, x, y, width, height))
}

/// `count` pages of 600x800, stacked 20px apart at `zoom`.
pub fn stacked_registry(count: usize, zoom: f32) -> PageRegistry {
    let mut registry = PageRegistry::new(vec![Size::new(600.0, 800.0); count]);
    registry.stack_vertically(zoom, 20.0);
    registry
}

/// US Letter pages.
pub fn letter_document(pages: usize) -> Document {
    Document::new("agreement.pdf", vec![Size::new(612.0, 792.0); pages])
}

/// Envelope backend over one in-memory envelope.
///
/// `fail_saves` makes submissions fail as if the service were down.
pub struct MemoryBackend {
    pub envelope: RefCell<Envelope>,
    pub fail_saves: Cell<bool>,
}

impl MemoryBackend {
    pub fn new(envelope: Envelope) -> Self {
        Self {
            envelope: RefCell::new(envelope),
            fail_saves: Cell::new(false),
        }
    }
}

impl EnvelopeBackend for MemoryBackend {
    fn load_envelope(&self, token: &str) -> Result<LoadedEnvelope, BackendError> {
        Ok(self.envelope.borrow().loaded_for(token, Utc::now())?)
    }

    fn save_field_values(&self, token: &str, request: &SubmitRequest) -> Result<(), BackendError> {
        if self.fail_saves.get() {
            return Err(BackendError::Unavailable("connection reset".to_string()));
        }
        Ok(self
            .envelope
            .borrow_mut()
            .apply_submission(token, request, Utc::now())?)
    }

    fn decline(&self, token: &str, reason: &str) -> Result<(), BackendError> {
        Ok(self.envelope.borrow_mut().decline(token, reason, Utc::now())?)
    }
}

/// Sent envelope: Alice owns a signature, a date and a text field on page 1,
/// Bob owns a checkbox on page 2.
pub fn sent_envelope() -> (Envelope, Recipient, Recipient) {
    let (alice, bob) = two_recipients();
    let fields = vec![
        field_at(FieldType::Signature, alice.id, 1, 50.0, 600.0),
        field_at(FieldType::Date, alice.id, 1, 300.0, 600.0),
        field_at(FieldType::Text, alice.id, 1, 50.0, 100.0),
        field_at(FieldType::Checkbox, bob.id, 2, 50.0, 50.0),
    ];
    let envelope = Envelope::create(
        letter_document(2),
        vec![alice.clone(), bob.clone()],
        fields,
        &FieldSizeLimits::default(),
        None,
        Utc::now(),
    )
    .unwrap();
    (envelope, alice, bob)
}
