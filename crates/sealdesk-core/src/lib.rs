//! Sealdesk Core Library
//!
//! Field placement and per-recipient signing engine.
//!
//! The crate is UI-framework agnostic. A shell feeds it pointer/touch events,
//! page dimensions from a PDF renderer and an access token, and paints the
//! positioned field list it gets back:
//! - Preparation: the document owner places and lays out fields for recipients
//! - Signing: a recipient fills only their own fields, then submits once

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod backend;
pub mod completion;
pub mod config;
pub mod envelope;
pub mod field;
pub mod geometry;
pub mod gesture;
pub mod page;
pub mod prepare;
pub mod render;
pub mod sequencer;
pub mod session;
pub mod store;
pub mod view;
pub mod visibility;

#[cfg(test)]
pub(crate) mod test_utils;

pub use backend::{
    BackendError, EnvelopeBackend, FieldValueUpdate, LoadedEnvelope, PageSource, SubmitRequest,
};
pub use completion::{Progress, can_submit, field_satisfied};
pub use config::{ConfigError, EngineConfig, FieldSizeLimits, SizeLimits};
pub use envelope::{Document, Envelope, EnvelopeError, EnvelopeStatus, Recipient, Rejection};
pub use field::{Color, Field, FieldGeometry, FieldId, FieldType, FieldValue, RecipientId};
pub use geometry::{Point, Rect, Size};
pub use gesture::{GestureController, GestureOutcome, GesturePhase, GestureTarget, ResizeHandle};
pub use page::{PageInfo, PageNumber, PageRegistry};
pub use prepare::{PrepareError, Preparation};
pub use render::{PositionedField, render_model};
pub use sequencer::{FieldSequencer, FocusAction, SequencerStop};
pub use session::{SigningSession, SubmitError, SubmitState};
pub use store::{FieldError, FieldStore, TransientTransform};
pub use view::{ViewContext, Viewport};
pub use visibility::{ViewMode, Visibility, classify};
