//! Gesture controller.
//!
//! One explicit state machine turns pointer and touch streams into field
//! moves and resizes:
//!
//! ```text
//! Idle ──down on body──▶ Dragging ──up──▶ Idle   (tap, or snap + relocate + clamp + commit)
//! Idle ──down on handle / two fingers──▶ Resizing ──up──▶ Idle   (snap + clamp + commit)
//! any ──cancel──▶ Idle   (transient discarded)
//! ```
//!
//! While a gesture is live only the store's transient overlay changes; the
//! committed geometry is written once, on release.

use std::mem;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::field::{Field, FieldGeometry, FieldId, FieldType};
use crate::geometry::{self, Point, Size};
use crate::page::PageRegistry;
use crate::store::{FieldStore, TransientTransform};
use crate::view::ViewContext;
use crate::visibility::{ViewMode, classify};

/// Corner handle of a field's selection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeHandle {
    /// Direction in which a positive pointer delta grows the box, per axis.
    fn signs(self) -> (f32, f32) {
        match self {
            Self::TopLeft => (-1.0, -1.0),
            Self::TopRight => (1.0, -1.0),
            Self::BottomLeft => (-1.0, 1.0),
            Self::BottomRight => (1.0, 1.0),
        }
    }

    fn moves_left_edge(self) -> bool {
        matches!(self, Self::TopLeft | Self::BottomLeft)
    }

    fn moves_top_edge(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight)
    }
}

/// What the pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureTarget {
    Body(FieldId),
    Handle(FieldId, ResizeHandle),
}

impl GestureTarget {
    pub fn field_id(self) -> FieldId {
        match self {
            Self::Body(id) | Self::Handle(id, _) => id,
        }
    }
}

/// Externally visible controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GesturePhase {
    Idle,
    Dragging,
    Resizing,
}

/// Result of ending (or abandoning) a gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Nothing happened: ignored input, long press, or a pinned field.
    None,
    /// Short press without movement; the shell opens the field's input.
    Tap { field_id: FieldId },
    Moved {
        field_id: FieldId,
        geometry: FieldGeometry,
        page_changed: bool,
    },
    Resized {
        field_id: FieldId,
        geometry: FieldGeometry,
    },
    /// Pointer capture lost; committed geometry unchanged.
    Cancelled { field_id: FieldId },
}

#[derive(Debug, Clone)]
struct DragState {
    field_id: FieldId,
    field_type: FieldType,
    start: FieldGeometry,
    /// Pointer at gesture start, content space.
    start_pointer: Point,
    /// Last viewer-relative pointer, for touch ends that carry no position.
    last_client: Point,
    started_at_ms: u64,
    max_travel: f32,
    dragged: bool,
    /// False for signing-mode presses: tap detection only, geometry pinned.
    movable: bool,
}

#[derive(Debug, Clone, Copy)]
enum ResizeSource {
    Handle {
        handle: ResizeHandle,
        start_pointer: Point,
    },
    Pinch {
        initial_distance: f32,
    },
}

#[derive(Debug, Clone)]
struct ResizeState {
    field_id: FieldId,
    field_type: FieldType,
    start: FieldGeometry,
    source: ResizeSource,
    /// Size of the field's page, capping the live size as well as the commit.
    page: Option<Size>,
    /// Live, unsnapped geometry.
    current: FieldGeometry,
    changed: bool,
}

#[derive(Debug, Clone, Default)]
enum State {
    #[default]
    Idle,
    Dragging(DragState),
    Resizing(ResizeState),
}

/// Drives move/resize gestures for at most one field at a time.
#[derive(Debug, Clone, Default)]
pub struct GestureController {
    config: EngineConfig,
    state: State,
}

impl GestureController {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: State::Idle,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> GesturePhase {
        match self.state {
            State::Idle => GesturePhase::Idle,
            State::Dragging(_) => GesturePhase::Dragging,
            State::Resizing(_) => GesturePhase::Resizing,
        }
    }

    /// Field targeted by the live gesture.
    pub fn active_field(&self) -> Option<FieldId> {
        match &self.state {
            State::Idle => None,
            State::Dragging(drag) => Some(drag.field_id),
            State::Resizing(resize) => Some(resize.field_id),
        }
    }

    /// Whether the live gesture has travelled past the tap threshold.
    ///
    /// Click handlers (opening the signature pad) must not fire while this is
    /// true.
    pub fn is_dragged(&self) -> bool {
        match &self.state {
            State::Idle => false,
            State::Dragging(drag) => drag.dragged,
            State::Resizing(resize) => resize.changed,
        }
    }

    /// Pointer-down (mouse) or single touch-start on a field.
    ///
    /// Returns true if a gesture started.
    pub fn pointer_down(
        &mut self,
        target: GestureTarget,
        client: Point,
        time_ms: u64,
        ctx: &ViewContext,
        registry: &PageRegistry,
        store: &FieldStore,
    ) -> bool {
        if !matches!(self.state, State::Idle) {
            return false;
        }
        let Some(field) = store.get(target.field_id()) else {
            return false;
        };
        if !can_press(&field, ctx, store) {
            return false;
        }
        let movable = can_manipulate(&field, ctx, store);
        let pointer = ctx.viewport.to_content(client);

        match target {
            GestureTarget::Body(field_id) => {
                self.state = State::Dragging(DragState {
                    field_id,
                    field_type: field.field_type,
                    start: field.geometry,
                    start_pointer: pointer,
                    last_client: client,
                    started_at_ms: time_ms,
                    max_travel: 0.0,
                    dragged: false,
                    movable,
                });
                tracing::debug!(field_id = %field_id, movable, "Drag started");
            }
            GestureTarget::Handle(field_id, handle) => {
                if !movable {
                    return false;
                }
                self.state = State::Resizing(ResizeState {
                    field_id,
                    field_type: field.field_type,
                    start: field.geometry,
                    source: ResizeSource::Handle {
                        handle,
                        start_pointer: pointer,
                    },
                    page: registry.size(field.geometry.page),
                    current: field.geometry,
                    changed: false,
                });
                tracing::debug!(field_id = %field_id, ?handle, "Resize started");
            }
        }
        true
    }

    /// Pointer-move. Publishes the transient overlay; never snaps or clamps
    /// position, so the field can rubber-band past a page edge.
    pub fn pointer_move(&mut self, client: Point, ctx: &ViewContext, store: &mut FieldStore) {
        let pointer = ctx.viewport.to_content(client);
        let zoom = ctx.zoom();

        match &mut self.state {
            State::Idle => {}
            State::Dragging(drag) => {
                drag.last_client = client;
                let delta = pointer - drag.start_pointer;
                drag.max_travel = drag.max_travel.max(delta.length());
                if drag.max_travel > self.config.tap_distance_px {
                    drag.dragged = true;
                }
                if drag.dragged && drag.movable {
                    let d = geometry::to_canonical(delta, zoom);
                    store.publish_transient(TransientTransform::offset(drag.field_id, d.x, d.y));
                }
            }
            State::Resizing(resize) => {
                let ResizeSource::Handle {
                    handle,
                    start_pointer,
                } = resize.source
                else {
                    return;
                };
                let screen_delta = pointer - start_pointer;
                if screen_delta.length() > self.config.tap_distance_px {
                    resize.changed = true;
                }
                let delta = geometry::to_canonical(screen_delta, zoom);
                resize.current = handle_resize(
                    resize.field_type,
                    resize.start,
                    handle,
                    delta,
                    resize.page,
                    &self.config,
                );
                store.publish_transient(transient_between(
                    resize.field_id,
                    resize.start,
                    resize.current,
                ));
            }
        }
    }

    /// Pointer-up: ends the gesture and commits if it moved anything.
    pub fn pointer_up(
        &mut self,
        client: Point,
        time_ms: u64,
        ctx: &ViewContext,
        registry: &PageRegistry,
        store: &mut FieldStore,
    ) -> GestureOutcome {
        let state = mem::take(&mut self.state);
        store.clear_transient();

        match state {
            State::Idle => GestureOutcome::None,
            State::Dragging(drag) => self.finish_drag(&drag, client, time_ms, ctx, registry, store),
            State::Resizing(mut resize) => {
                if let ResizeSource::Handle {
                    handle,
                    start_pointer,
                } = resize.source
                {
                    let screen_delta = ctx.viewport.to_content(client) - start_pointer;
                    if screen_delta.length() > self.config.tap_distance_px {
                        resize.changed = true;
                    }
                    resize.current = handle_resize(
                        resize.field_type,
                        resize.start,
                        handle,
                        geometry::to_canonical(screen_delta, ctx.zoom()),
                        resize.page,
                        &self.config,
                    );
                }
                self.finish_resize(&resize, registry, store)
            }
        }
    }

    /// Touch-start with the current touch list.
    ///
    /// One finger behaves like a mouse press on the field body. A second
    /// finger on the field being dragged turns the gesture into a pinch.
    pub fn touch_start(
        &mut self,
        field_id: FieldId,
        touches: &[Point],
        time_ms: u64,
        ctx: &ViewContext,
        registry: &PageRegistry,
        store: &mut FieldStore,
    ) -> bool {
        match touches {
            [] => false,
            [single] => self.pointer_down(
                GestureTarget::Body(field_id),
                *single,
                time_ms,
                ctx,
                registry,
                store,
            ),
            [a, b, ..] => self.begin_pinch(field_id, *a, *b, ctx, registry, store),
        }
    }

    /// Touch-move with the current touch list.
    pub fn touch_move(&mut self, touches: &[Point], ctx: &ViewContext, store: &mut FieldStore) {
        if matches!(self.state, State::Dragging(_)) {
            if let [single] = touches {
                self.pointer_move(*single, ctx, store);
            }
            return;
        }

        let State::Resizing(resize) = &mut self.state else {
            return;
        };
        let ResizeSource::Pinch { initial_distance } = resize.source else {
            return;
        };
        let [a, b, ..] = touches else {
            return;
        };

        let ratio = a.distance(*b) / initial_distance;
        if (ratio - 1.0).abs() > f32::EPSILON {
            resize.changed = true;
        }
        resize.current = pinch_resize(
            resize.field_type,
            resize.start,
            ratio,
            resize.page,
            &self.config,
        );
        store.publish_transient(transient_between(
            resize.field_id,
            resize.start,
            resize.current,
        ));
    }

    /// Touch-end with the touches still down.
    pub fn touch_end(
        &mut self,
        remaining: &[Point],
        time_ms: u64,
        ctx: &ViewContext,
        registry: &PageRegistry,
        store: &mut FieldStore,
    ) -> GestureOutcome {
        let last_drag_point = match &self.state {
            State::Dragging(drag) if remaining.is_empty() => Some(drag.last_client),
            _ => None,
        };
        if let Some(last) = last_drag_point {
            return self.pointer_up(last, time_ms, ctx, registry, store);
        }

        let pinch_released = matches!(
            &self.state,
            State::Resizing(resize)
                if matches!(resize.source, ResizeSource::Pinch { .. }) && remaining.len() < 2
        );
        if !pinch_released {
            return GestureOutcome::None;
        }
        let State::Resizing(resize) = mem::take(&mut self.state) else {
            return GestureOutcome::None;
        };
        store.clear_transient();
        self.finish_resize(&resize, registry, store)
    }

    /// Abandons the live gesture (pointer capture lost, window blur).
    pub fn cancel(&mut self, store: &mut FieldStore) -> GestureOutcome {
        let state = mem::take(&mut self.state);
        store.clear_transient();
        match state {
            State::Idle => GestureOutcome::None,
            State::Dragging(DragState { field_id, .. })
            | State::Resizing(ResizeState { field_id, .. }) => {
                tracing::debug!(field_id = %field_id, "Gesture cancelled");
                GestureOutcome::Cancelled { field_id }
            }
        }
    }

    fn begin_pinch(
        &mut self,
        field_id: FieldId,
        a: Point,
        b: Point,
        ctx: &ViewContext,
        registry: &PageRegistry,
        store: &mut FieldStore,
    ) -> bool {
        match &self.state {
            State::Idle => {}
            State::Dragging(drag) if drag.field_id == field_id => {}
            _ => return false,
        }
        let Some(field) = store.get(field_id) else {
            return false;
        };
        if !can_manipulate(&field, ctx, store) {
            return false;
        }
        let initial_distance = a.distance(b);
        if initial_distance < self.config.pinch_min_distance_px {
            return false;
        }

        // The drag that preceded the second finger is discarded, not committed.
        store.clear_transient();
        self.state = State::Resizing(ResizeState {
            field_id,
            field_type: field.field_type,
            start: field.geometry,
            source: ResizeSource::Pinch { initial_distance },
            page: registry.size(field.geometry.page),
            current: field.geometry,
            changed: false,
        });
        tracing::debug!(field_id = %field_id, initial_distance, "Pinch started");
        true
    }

    fn finish_drag(
        &self,
        drag: &DragState,
        client: Point,
        time_ms: u64,
        ctx: &ViewContext,
        registry: &PageRegistry,
        store: &mut FieldStore,
    ) -> GestureOutcome {
        let delta = ctx.viewport.to_content(client) - drag.start_pointer;
        let travel = drag.max_travel.max(delta.length());
        let dragged = drag.dragged || travel > self.config.tap_distance_px;

        if !dragged {
            let elapsed = time_ms.saturating_sub(drag.started_at_ms);
            if elapsed <= self.config.tap_max_ms {
                tracing::debug!(field_id = %drag.field_id, elapsed, "Tap");
                return GestureOutcome::Tap {
                    field_id: drag.field_id,
                };
            }
            return GestureOutcome::None;
        }
        if !drag.movable {
            return GestureOutcome::None;
        }

        let d = geometry::to_canonical(delta, ctx.zoom());
        let moved = FieldGeometry {
            x: drag.start.x + d.x,
            y: drag.start.y + d.y,
            ..drag.start
        };
        let relocated = relocate(moved, ctx.zoom(), registry);
        let settled = self.settle(relocated, drag.field_type, false, registry);

        if let Err(err) = store.commit_geometry(drag.field_id, settled) {
            tracing::warn!(field_id = %drag.field_id, %err, "Drag commit rejected");
            return GestureOutcome::None;
        }
        GestureOutcome::Moved {
            field_id: drag.field_id,
            geometry: settled,
            page_changed: settled.page != drag.start.page,
        }
    }

    fn finish_resize(
        &self,
        resize: &ResizeState,
        registry: &PageRegistry,
        store: &mut FieldStore,
    ) -> GestureOutcome {
        if !resize.changed {
            return GestureOutcome::None;
        }
        let settled = self.settle(resize.current, resize.field_type, true, registry);
        if let Err(err) = store.commit_geometry(resize.field_id, settled) {
            tracing::warn!(field_id = %resize.field_id, %err, "Resize commit rejected");
            return GestureOutcome::None;
        }
        GestureOutcome::Resized {
            field_id: resize.field_id,
            geometry: settled,
        }
    }

    /// Commit-time normalization: snap to the grid, then clamp into the page.
    ///
    /// Size limits, page cap included, go through `FieldSizeLimits::fit`, so
    /// aspect-locked types are scaled uniformly rather than per axis.
    fn settle(
        &self,
        geometry: FieldGeometry,
        field_type: FieldType,
        snap_size: bool,
        registry: &PageRegistry,
    ) -> FieldGeometry {
        let grid = self.config.grid_size;
        let page = registry.size(geometry.page);

        let size = if snap_size {
            let snapped = Size::new(
                geometry::snap(geometry.width, grid),
                geometry::snap(geometry.height, grid),
            );
            self.config.size_limits.fit(field_type, snapped, page)
        } else {
            self.config
                .size_limits
                .fit(field_type, geometry.size(), page)
        };

        let x = geometry::snap(geometry.x, grid);
        let y = geometry::snap(geometry.y, grid);
        let (x, y) = match page {
            Some(page) => geometry::clamp(x, y, size.width, size.height, page.width, page.height),
            None => (x.max(0.0), y.max(0.0)),
        };

        FieldGeometry {
            page: geometry.page,
            x,
            y,
            width: size.width,
            height: size.height,
        }
    }
}

/// Whether the actor may start any gesture on the field (tap included).
fn can_press(field: &Field, ctx: &ViewContext, store: &FieldStore) -> bool {
    match ctx.mode {
        ViewMode::Prepare => true,
        ViewMode::Signing => {
            !store.is_locked(field.id) && classify(field, ctx.actor, ctx.mode).is_editable()
        }
        ViewMode::ReadOnly => false,
    }
}

/// Whether the actor may change the field's geometry.
///
/// Layout belongs to preparation; once sent, fields are pinned.
fn can_manipulate(field: &Field, ctx: &ViewContext, store: &FieldStore) -> bool {
    ctx.mode == ViewMode::Prepare && !store.is_locked(field.id)
}

/// Corner-handle resize from a canonical pointer delta.
///
/// Aspect-locked types scale both sides by the ratio of whichever axis moved
/// further; the corner opposite the handle stays put.
fn handle_resize(
    field_type: FieldType,
    start: FieldGeometry,
    handle: ResizeHandle,
    delta: Point,
    page: Option<Size>,
    config: &EngineConfig,
) -> FieldGeometry {
    let (sx, sy) = handle.signs();
    let raw = Size::new(start.width + sx * delta.x, start.height + sy * delta.y);

    let size = if field_type.preserves_aspect() {
        let factor = if delta.x.abs() >= delta.y.abs() {
            ratio(raw.width, start.width)
        } else {
            ratio(raw.height, start.height)
        };
        start.size().scale(factor.max(0.01))
    } else {
        raw
    };
    let size = config.size_limits.fit(field_type, size, page);

    let x = if handle.moves_left_edge() {
        start.x + start.width - size.width
    } else {
        start.x
    };
    let y = if handle.moves_top_edge() {
        start.y + start.height - size.height
    } else {
        start.y
    };
    FieldGeometry {
        page: start.page,
        x,
        y,
        width: size.width,
        height: size.height,
    }
}

/// Two-finger resize: scale the gesture-start size by the finger-distance
/// ratio, keeping the top-left corner.
fn pinch_resize(
    field_type: FieldType,
    start: FieldGeometry,
    ratio: f32,
    page: Option<Size>,
    config: &EngineConfig,
) -> FieldGeometry {
    let size = config
        .size_limits
        .fit(field_type, start.size().scale(ratio.max(0.01)), page);
    FieldGeometry {
        width: size.width,
        height: size.height,
        ..start
    }
}

fn ratio(value: f32, base: f32) -> f32 {
    if base > 0.0 { value / base } else { 1.0 }
}

fn transient_between(
    field_id: FieldId,
    start: FieldGeometry,
    current: FieldGeometry,
) -> TransientTransform {
    TransientTransform {
        field_id,
        dx: current.x - start.x,
        dy: current.y - start.y,
        width: Some(current.width),
        height: Some(current.height),
    }
}

/// Moves a dragged field to whichever page its centroid now sits on.
///
/// A centroid outside every page keeps the field on its original page.
fn relocate(moved: FieldGeometry, zoom: f32, registry: &PageRegistry) -> FieldGeometry {
    let centroid = moved.rect().center();
    let Some(content) = registry.page_local_to_content(moved.page, centroid, zoom) else {
        return moved;
    };
    match registry.locate_content(content, zoom) {
        Some(page) if page != moved.page => {
            let Some(local) = registry.content_to_page_local(page, content, zoom) else {
                return moved;
            };
            tracing::debug!(from = moved.page, to = page, "Field dragged across pages");
            FieldGeometry {
                page,
                x: local.x - moved.width / 2.0,
                y: local.y - moved.height / 2.0,
                ..moved
            }
        }
        _ => moved,
    }
}
