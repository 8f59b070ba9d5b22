//! Explicit view state passed into geometry, gesture and render calls.
//!
//! Zoom, scroll, current page, active tool and acting party all live here
//! instead of in ambient state, so gesture math can be driven from tests
//! without a live viewport.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::field::{FieldType, RecipientId};
use crate::geometry::{self, Point};
use crate::page::PageNumber;
use crate::visibility::ViewMode;

/// Scroll position and zoom of the document viewer.
///
/// Pointer positions handed to the engine are relative to the viewer's
/// visible top-left corner; adding `scroll` yields content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll: Point,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scroll: Point::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(scroll: Point, zoom: f32) -> Self {
        Self {
            scroll,
            zoom: geometry::clamp_zoom(zoom),
        }
    }

    /// Viewer-relative pointer position → scrollable content position.
    pub fn to_content(&self, client: Point) -> Point {
        client + self.scroll
    }
}

/// Everything about the current view a pure engine call may need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewContext {
    pub viewport: Viewport,
    /// Restricts rendering to one page when set.
    pub current_page: Option<PageNumber>,
    /// Field type placed on the next click (preparation only).
    pub tool: Option<FieldType>,
    pub mode: ViewMode,
    /// Signing recipient; `None` for the document owner and for viewers.
    pub actor: Option<RecipientId>,
}

impl ViewContext {
    /// Document owner laying out fields.
    pub fn prepare() -> Self {
        Self {
            viewport: Viewport::default(),
            current_page: None,
            tool: None,
            mode: ViewMode::Prepare,
            actor: None,
        }
    }

    /// Recipient filling their own fields.
    pub fn signing(actor: RecipientId) -> Self {
        Self {
            mode: ViewMode::Signing,
            actor: Some(actor),
            ..Self::prepare()
        }
    }

    /// Anyone viewing a finalized or inaccessible envelope.
    pub fn read_only(actor: Option<RecipientId>) -> Self {
        Self {
            mode: ViewMode::ReadOnly,
            actor,
            ..Self::prepare()
        }
    }

    pub fn zoom(&self) -> f32 {
        self.viewport.zoom
    }

    /// Sets the zoom, clamped into the configured range.
    pub fn set_zoom(&mut self, zoom: f32, config: &EngineConfig) {
        self.viewport.zoom = config.clamp_zoom(zoom);
    }

    #[must_use]
    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.viewport.zoom = geometry::clamp_zoom(zoom);
        self
    }

    #[must_use]
    pub fn with_scroll(mut self, scroll: Point) -> Self {
        self.viewport.scroll = scroll;
        self
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Option<FieldType>) -> Self {
        self.tool = tool;
        self
    }

    #[must_use]
    pub fn on_page(mut self, page: Option<PageNumber>) -> Self {
        self.current_page = page;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_zoom_clamps() {
        let mut ctx = ViewContext::prepare();
        ctx.set_zoom(8.0, &EngineConfig::default());
        assert!((ctx.zoom() - 3.0).abs() < f32::EPSILON);
        ctx.set_zoom(0.01, &EngineConfig::default());
        assert!((ctx.zoom() - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_to_content_adds_scroll() {
        let viewport = Viewport::new(Point::new(0.0, 400.0), 1.0);
        assert_eq!(viewport.to_content(Point::new(5.0, 5.0)), Point::new(5.0, 405.0));
    }
}
