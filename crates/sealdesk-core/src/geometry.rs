//! Canonical page-space ↔ screen-space conversion.
//!
//! Canonical units are page-relative coordinates at PDF scale 1.0 with the
//! origin at the top-left corner of the page. Screen units are CSS pixels at
//! the current zoom. Everything persisted is canonical; screen values only
//! exist for the duration of a frame or a gesture.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Smallest zoom factor the viewer allows.
pub const MIN_ZOOM: f32 = 0.25;

/// Largest zoom factor the viewer allows.
pub const MAX_ZOOM: f32 = 3.0;

/// Default grid-snap interval in canonical units.
pub const DEFAULT_GRID_SIZE: f32 = 10.0;

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point::new(0.0, 0.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length of the vector from the origin to this point.
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f32 {
        (self - other).length()
    }

    /// Midpoint between two points (pinch centre).
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width divided by height. Zero-height sizes report a ratio of 1.
    pub fn aspect_ratio(self) -> f32 {
        if self.height.abs() < f32::EPSILON {
            1.0
        } else {
            self.width / self.height
        }
    }

    /// Uniformly scales both sides.
    pub fn scale(self, factor: f32) -> Size {
        Size::new(self.width * factor, self.height * factor)
    }
}

/// An axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Half-open containment test: the left/top edges are inside, the
    /// right/bottom edges belong to whatever comes next.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn translate(&self, offset: Point) -> Rect {
        Rect::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }
}

/// Clamps a zoom factor into `[MIN_ZOOM, MAX_ZOOM]`.
///
/// Non-finite input falls back to the minimum so a bad pinch never produces
/// an infinite canvas.
pub fn clamp_zoom(zoom: f32) -> f32 {
    clamp_zoom_to(zoom, MIN_ZOOM, MAX_ZOOM)
}

/// Clamps a zoom factor into a caller-provided range.
///
/// Reversed bounds are swapped; non-finite bounds fall back to
/// `[MIN_ZOOM, MAX_ZOOM]`.
pub fn clamp_zoom_to(zoom: f32, min: f32, max: f32) -> f32 {
    let (min, max) = if !(min.is_finite() && max.is_finite()) {
        (MIN_ZOOM, MAX_ZOOM)
    } else if min > max {
        (max, min)
    } else {
        (min, max)
    };
    if zoom.is_finite() {
        zoom.clamp(min, max)
    } else {
        min
    }
}

/// Canonical → screen.
pub fn to_screen(canonical: Point, zoom: f32) -> Point {
    Point::new(canonical.x * zoom, canonical.y * zoom)
}

/// Screen → canonical.
///
/// Callers keep zoom positive; a zero, negative or non-finite zoom is read as
/// `MIN_ZOOM` instead of dividing by it.
pub fn to_canonical(screen: Point, zoom: f32) -> Point {
    let zoom = safe_zoom(zoom);
    Point::new(screen.x / zoom, screen.y / zoom)
}

/// Scalar screen length → canonical length.
pub fn length_to_canonical(screen: f32, zoom: f32) -> f32 {
    screen / safe_zoom(zoom)
}

/// Canonical rectangle → screen rectangle.
pub fn rect_to_screen(rect: Rect, zoom: f32) -> Rect {
    Rect::new(
        rect.x * zoom,
        rect.y * zoom,
        rect.width * zoom,
        rect.height * zoom,
    )
}

fn safe_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() && zoom > 0.0 {
        zoom
    } else {
        MIN_ZOOM
    }
}

/// Rounds to the nearest multiple of `grid_size`.
///
/// A non-positive grid disables snapping.
pub fn snap(value: f32, grid_size: f32) -> f32 {
    if grid_size <= 0.0 {
        return value;
    }
    (value / grid_size).round() * grid_size
}

/// Constrains a top-left corner so that the whole `width × height` box stays
/// inside a `page_width × page_height` page.
///
/// Boxes larger than the page are pinned to the origin.
pub fn clamp(
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    page_width: f32,
    page_height: f32,
) -> (f32, f32) {
    let x = x.min(page_width - width).max(0.0);
    let y = y.min(page_height - height).max(0.0);
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_roundtrip() {
        let p = Point::new(123.5, 77.25);
        for zoom in [0.25, 0.5, 1.0, 1.75, 3.0] {
            let back = to_canonical(to_screen(p, zoom), zoom);
            assert!((back.x - p.x).abs() < 1e-3);
            assert!((back.y - p.y).abs() < 1e-3);
        }
    }

    #[test]
    fn test_to_canonical_guards_zero_zoom() {
        let p = to_canonical(Point::new(10.0, 20.0), 0.0);
        assert!(p.x.is_finite() && p.y.is_finite());
        assert!((p.x - 40.0).abs() < 1e-4);
    }

    #[test]
    fn test_snap() {
        assert!((snap(14.0, 10.0) - 10.0).abs() < 1e-4);
        assert!((snap(15.0, 10.0) - 20.0).abs() < 1e-4);
        assert!((snap(-4.0, 10.0)).abs() < 1e-4);
        assert!((snap(13.3, 0.0) - 13.3).abs() < 1e-4);
    }

    #[test]
    fn test_clamp_keeps_box_inside_page() {
        assert_eq!(clamp(-5.0, -5.0, 50.0, 30.0, 600.0, 800.0), (0.0, 0.0));
        assert_eq!(clamp(580.0, 790.0, 50.0, 30.0, 600.0, 800.0), (550.0, 770.0));
        assert_eq!(clamp(100.0, 100.0, 50.0, 30.0, 600.0, 800.0), (100.0, 100.0));
    }

    #[test]
    fn test_clamp_oversized_box_pins_to_origin() {
        assert_eq!(clamp(40.0, 40.0, 700.0, 900.0, 600.0, 800.0), (0.0, 0.0));
    }

    #[test]
    fn test_clamp_zoom() {
        assert!((clamp_zoom(10.0) - MAX_ZOOM).abs() < f32::EPSILON);
        assert!((clamp_zoom(0.0) - MIN_ZOOM).abs() < f32::EPSILON);
        assert!((clamp_zoom(f32::NAN) - MIN_ZOOM).abs() < f32::EPSILON);
    }

    #[test]
    fn test_clamp_zoom_to_tolerates_bad_bounds() {
        assert!((clamp_zoom_to(5.0, 2.0, 0.5) - 2.0).abs() < f32::EPSILON);
        assert!((clamp_zoom_to(0.1, 2.0, 0.5) - 0.5).abs() < f32::EPSILON);
        assert!((clamp_zoom_to(10.0, f32::NAN, 2.0) - MAX_ZOOM).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rect_contains_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Point::new(0.0, 0.0)));
        assert!(!r.contains(Point::new(10.0, 5.0)));
        assert!(r.contains(Point::new(9.99, 9.99)));
    }
}
