//! Property-based invariant tests for placement geometry and gestures.
//!
//! 1. Screen/canonical conversion round-trips at any zoom in range.
//! 2. A committed drag always leaves the field inside its page.
//! 3. Corner and pinch resizes of aspect-locked fields keep the aspect ratio,
//!    up to grid rounding, even where the page caps the type maximum.
//! 4. A blank signer name always blocks submission.
//! 5. Page lookup agrees with the stacked page rectangles.

use proptest::prelude::*;
use sealdesk_core::geometry::{self, Point, Size};
use sealdesk_core::{
    EngineConfig, Field, FieldGeometry, FieldStore, FieldType, FieldValue, GestureController,
    GestureOutcome, GestureTarget, PageRegistry, ResizeHandle, ViewContext, Viewport, can_submit,
};
use uuid::Uuid;

// ── Helpers ─────────────────────────────────────────────────────────────

const PAGE: Size = Size::new(600.0, 800.0);

fn registry(zoom: f32) -> PageRegistry {
    let mut registry = PageRegistry::new(vec![PAGE; 3]);
    registry.stack_vertically(zoom, 16.0);
    registry
}

fn field_type_strategy() -> impl Strategy<Value = FieldType> {
    prop::sample::select(FieldType::ALL.to_vec())
}

fn zoom_strategy() -> impl Strategy<Value = f32> {
    geometry::MIN_ZOOM..=geometry::MAX_ZOOM
}

fn aspect_locked_strategy() -> impl Strategy<Value = FieldType> {
    prop::sample::select(vec![FieldType::Signature, FieldType::Initial, FieldType::Checkbox])
}

/// Pages from smaller than every type maximum up to larger than all of them.
fn page_strategy() -> impl Strategy<Value = Size> {
    (80.0f32..700.0, 80.0f32..900.0).prop_map(|(width, height)| Size::new(width, height))
}

fn handle_strategy() -> impl Strategy<Value = ResizeHandle> {
    prop::sample::select(vec![
        ResizeHandle::TopLeft,
        ResizeHandle::TopRight,
        ResizeHandle::BottomLeft,
        ResizeHandle::BottomRight,
    ])
}

fn single_page(page: Size) -> PageRegistry {
    let mut registry = PageRegistry::new(vec![page]);
    registry.stack_vertically(1.0, 16.0);
    registry
}

/// Aspect-locked field sized within its limits, centered on a `page` page.
fn fitted_field(field_type: FieldType, width: f32, height: f32, page: Size) -> Field {
    let size = EngineConfig::default()
        .size_limits
        .fit(field_type, Size::new(width, height), Some(page));
    Field::new(
        field_type,
        Uuid::new_v4(),
        FieldGeometry::new(
            1,
            (page.width - size.width) / 2.0,
            (page.height - size.height) / 2.0,
            size.width,
            size.height,
        ),
    )
}

/// Largest `|width - height * ratio|` that independent grid rounding of both
/// sides can introduce, with headroom for the page-cap rescale after it.
fn rounding_tolerance(ratio: f32) -> f32 {
    EngineConfig::default().grid_size / 2.0 * (1.0 + ratio) * 1.1 + 1e-2
}

/// Field of the type's default size somewhere on page 1.
fn placed_field(field_type: FieldType, x: f32, y: f32) -> Field {
    let size = field_type.default_size();
    let x = x.min(PAGE.width - size.width);
    let y = y.min(PAGE.height - size.height);
    Field::new(
        field_type,
        Uuid::new_v4(),
        FieldGeometry::new(1, x, y, size.width, size.height),
    )
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Round-trip through screen space
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn canonical_screen_round_trip(
        x in -2000.0f32..2000.0,
        y in -2000.0f32..2000.0,
        zoom in zoom_strategy(),
    ) {
        let p = Point::new(x, y);
        let back = geometry::to_canonical(geometry::to_screen(p, zoom), zoom);
        prop_assert!((back.x - p.x).abs() <= 1e-3 * (1.0 + p.x.abs()), "x drifted: {:?} → {:?}", p, back);
        prop_assert!((back.y - p.y).abs() <= 1e-3 * (1.0 + p.y.abs()), "y drifted: {:?} → {:?}", p, back);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Drag commits stay in-page
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn drag_commit_stays_in_page(
        field_type in field_type_strategy(),
        x in 0.0f32..600.0,
        y in 0.0f32..800.0,
        dx in -900.0f32..900.0,
        dy in -1200.0f32..2400.0,
        zoom in zoom_strategy(),
    ) {
        let field = placed_field(field_type, x, y);
        let id = field.id;
        let mut store = FieldStore::new(vec![field.clone()]);
        let registry = registry(zoom);
        let ctx = ViewContext::prepare().with_zoom(zoom);
        let mut gestures = GestureController::new(EngineConfig::default());

        let start = geometry::to_screen(field.geometry.rect().center(), zoom);
        prop_assert!(gestures.pointer_down(GestureTarget::Body(id), start, 0, &ctx, &registry, &store));
        gestures.pointer_move(Point::new(start.x + dx / 2.0, start.y + dy / 2.0), &ctx, &mut store);
        let outcome = gestures.pointer_up(Point::new(start.x + dx, start.y + dy), 500, &ctx, &registry, &mut store);

        let committed = store.geometry(id).unwrap();
        let page = registry.size(committed.page).unwrap();
        prop_assert!(committed.fits_within(page), "{:?} escaped page {:?} ({:?})", committed, page, outcome);
        prop_assert!(store.transient().is_none());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Aspect-locked resize keeps its ratio
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn handle_resize_preserves_aspect(
        field_type in aspect_locked_strategy(),
        page in page_strategy(),
        width in 50.0f32..400.0,
        shape in 0.5f32..5.0,
        handle in handle_strategy(),
        dx in -400.0f32..400.0,
        dy in -400.0f32..400.0,
    ) {
        let field = fitted_field(field_type, width, width / shape, page);
        let id = field.id;
        let start = field.geometry;
        let ratio = start.width / start.height;
        let mut store = FieldStore::new(vec![field]);
        let registry = single_page(page);
        let ctx = ViewContext::prepare();
        let mut gestures = GestureController::new(EngineConfig::default());

        let corner = Point::new(start.x, start.y);
        prop_assert!(gestures.pointer_down(GestureTarget::Handle(id, handle), corner, 0, &ctx, &registry, &store));
        gestures.pointer_move(Point::new(corner.x + dx / 2.0, corner.y + dy / 2.0), &ctx, &mut store);
        if let Some(live) = store.effective_geometry(id) {
            prop_assert!(live.width <= page.width + 1e-2 && live.height <= page.height + 1e-2);
            prop_assert!((live.width - live.height * ratio).abs() <= 1e-2 * (1.0 + live.width));
        }
        let outcome = gestures.pointer_up(Point::new(corner.x + dx, corner.y + dy), 300, &ctx, &registry, &mut store);

        if let GestureOutcome::Resized { geometry, .. } = outcome {
            prop_assert!(
                (geometry.width - geometry.height * ratio).abs() <= rounding_tolerance(ratio),
                "{:?} {}x{} drifted from ratio {} on page {:?}",
                field_type, geometry.width, geometry.height, ratio, page
            );
            prop_assert!(geometry.fits_within(page), "{:?} escaped page {:?}", geometry, page);
        }
    }
}

proptest! {
    #[test]
    fn pinch_resize_preserves_aspect(
        field_type in aspect_locked_strategy(),
        page in page_strategy(),
        width in 50.0f32..400.0,
        shape in 0.5f32..5.0,
        initial_distance in 20.0f32..200.0,
        scale in 0.2f32..4.0,
    ) {
        let field = fitted_field(field_type, width, width / shape, page);
        let id = field.id;
        let start = field.geometry;
        let ratio = start.width / start.height;
        let mut store = FieldStore::new(vec![field]);
        let registry = single_page(page);
        let ctx = ViewContext::prepare();
        let mut gestures = GestureController::new(EngineConfig::default());

        let anchor = Point::new(start.x, start.y);
        let second = Point::new(anchor.x + initial_distance, anchor.y);
        prop_assert!(gestures.touch_start(id, &[anchor, second], 0, &ctx, &registry, &mut store));
        gestures.touch_move(&[anchor, Point::new(anchor.x + initial_distance * scale, anchor.y)], &ctx, &mut store);
        let outcome = gestures.touch_end(&[], 300, &ctx, &registry, &mut store);

        if let GestureOutcome::Resized { geometry, .. } = outcome {
            prop_assert!(
                (geometry.width - geometry.height * ratio).abs() <= rounding_tolerance(ratio),
                "{:?} {}x{} drifted from ratio {} on page {:?}",
                field_type, geometry.width, geometry.height, ratio, page
            );
            prop_assert!(geometry.fits_within(page), "{:?} escaped page {:?}", geometry, page);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Blank signer names never submit
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn blank_signer_name_blocks_submit(name in "[ \t\n]{0,8}") {
        let owner = Uuid::new_v4();
        let fields = vec![
            Field::new(FieldType::Checkbox, owner, FieldGeometry::new(1, 0.0, 0.0, 30.0, 30.0))
                .with_value(FieldValue::Bool(true)),
        ];
        prop_assert!(!can_submit(&name, &fields));
        let padded = format!("{name}A{name}");
        prop_assert!(can_submit(&padded, &fields));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Page lookup matches the layout
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn locate_page_matches_rendered_rects(
        x in -50.0f32..1900.0,
        y in -50.0f32..7500.0,
        scroll_y in 0.0f32..2000.0,
        zoom in zoom_strategy(),
    ) {
        let registry = registry(zoom);
        let viewport = Viewport::new(Point::new(0.0, scroll_y), zoom);
        let client = Point::new(x, y - scroll_y);
        let content = viewport.to_content(client);
        let expected = registry
            .pages()
            .iter()
            .find(|p| p.rendered_rect(zoom).contains(content))
            .map(|p| p.number);
        prop_assert_eq!(registry.locate_page(client, &viewport), expected);
    }
}
