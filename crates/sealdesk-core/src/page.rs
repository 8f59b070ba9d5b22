//! Page registry: page sizes plus where each page sits on screen.
//!
//! Sizes are captured once from the renderer at scale 1.0. Anchors are the
//! top-left corners of the rendered pages in the viewer's content space at the
//! current zoom, refreshed by the shell whenever the layout reflows.

use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, PageSource};
use crate::geometry::{self, Point, Rect, Size};
use crate::view::Viewport;

/// 1-based page number.
pub type PageNumber = u32;

/// One page of the loaded document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub number: PageNumber,
    /// Canonical size (scale 1.0).
    pub size: Size,
    /// Rendered top-left corner in viewer content space.
    pub anchor: Point,
}

impl PageInfo {
    /// On-screen rectangle of the page at `zoom`, in content space.
    pub fn rendered_rect(&self, zoom: f32) -> Rect {
        Rect::from_origin_size(self.anchor, self.size.scale(zoom))
    }
}

/// Ordered list of document pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRegistry {
    pages: Vec<PageInfo>,
}

impl PageRegistry {
    /// Creates a registry from canonical page sizes, in page order.
    ///
    /// All anchors start at the origin; call [`Self::stack_vertically`] or
    /// [`Self::set_anchor`] before hit testing.
    pub fn new(sizes: impl IntoIterator<Item = Size>) -> Self {
        let pages = sizes
            .into_iter()
            .zip(1..)
            .map(|(size, number)| PageInfo {
                number,
                size,
                anchor: Point::ZERO,
            })
            .collect();
        Self { pages }
    }

    /// Queries the renderer for every page's size at scale 1.0.
    pub fn from_source(source: &dyn PageSource) -> Result<Self, BackendError> {
        let count = source.page_count();
        let mut sizes = Vec::with_capacity(count as usize);
        for page in 1..=count {
            sizes.push(source.page_dimensions(page, 1.0)?);
        }
        tracing::debug!(pages = count, "Page registry loaded");
        Ok(Self::new(sizes))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn pages(&self) -> &[PageInfo] {
        &self.pages
    }

    pub fn page(&self, number: PageNumber) -> Option<&PageInfo> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.pages.get(index)
    }

    /// Canonical size of a page.
    pub fn size(&self, number: PageNumber) -> Option<Size> {
        self.page(number).map(|p| p.size)
    }

    /// Records where a page is rendered. Returns false for unknown pages.
    pub fn set_anchor(&mut self, number: PageNumber, anchor: Point) -> bool {
        let Some(index) = number.checked_sub(1).and_then(|i| usize::try_from(i).ok()) else {
            return false;
        };
        match self.pages.get_mut(index) {
            Some(page) => {
                page.anchor = anchor;
                true
            }
            None => false,
        }
    }

    /// Lays pages out in a single column, `gap` pixels apart, at `zoom`.
    pub fn stack_vertically(&mut self, zoom: f32, gap: f32) {
        let mut top = 0.0;
        for page in &mut self.pages {
            page.anchor = Point::new(0.0, top);
            top += page.size.height * zoom + gap;
        }
    }

    /// Page whose rendered rectangle contains a content-space point.
    pub fn locate_content(&self, content: Point, zoom: f32) -> Option<PageNumber> {
        self.pages
            .iter()
            .find(|page| page.rendered_rect(zoom).contains(content))
            .map(|page| page.number)
    }

    /// Page under a viewer-relative screen point, honoring scroll offset.
    pub fn locate_page(&self, client: Point, viewport: &Viewport) -> Option<PageNumber> {
        self.locate_content(viewport.to_content(client), viewport.zoom)
    }

    /// Converts a content-space point to canonical coordinates of `page`.
    pub fn content_to_page_local(
        &self,
        page: PageNumber,
        content: Point,
        zoom: f32,
    ) -> Option<Point> {
        let info = self.page(page)?;
        Some(geometry::to_canonical(content - info.anchor, zoom))
    }

    /// Converts canonical coordinates of `page` to content space.
    pub fn page_local_to_content(
        &self,
        page: PageNumber,
        canonical: Point,
        zoom: f32,
    ) -> Option<Point> {
        let info = self.page(page)?;
        Some(info.anchor + geometry::to_screen(canonical, zoom))
    }

    /// Converts a viewer-relative point to canonical coordinates of `page`.
    pub fn to_page_local(
        &self,
        page: PageNumber,
        client: Point,
        viewport: &Viewport,
    ) -> Option<Point> {
        self.content_to_page_local(page, viewport.to_content(client), viewport.zoom)
    }
}
