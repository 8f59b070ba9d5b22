//! Render model: the positioned field list a shell paints.

use serde::{Deserialize, Serialize};

use crate::envelope::Recipient;
use crate::field::{Color, FieldGeometry, FieldId, FieldType, FieldValue, RecipientId};
use crate::geometry::{self, Rect};
use crate::page::{PageNumber, PageRegistry};
use crate::store::FieldStore;
use crate::view::ViewContext;
use crate::visibility::{Visibility, classify};

/// One field, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedField {
    pub field_id: FieldId,
    pub field_type: FieldType,
    pub page: PageNumber,
    pub visibility: Visibility,
    /// Screen rectangle relative to the rendered page's top-left corner.
    pub rect: Rect,
    /// Screen rectangle in viewer content space, if the page is known.
    pub content_rect: Option<Rect>,
    pub value: Option<FieldValue>,
    pub owner: RecipientId,
    pub owner_name: String,
    pub color: Color,
    /// The field is the target of the live gesture.
    pub active: bool,
}

/// Projects the store for the given view.
///
/// Live gestures are reflected through the transient overlay. Suppressed
/// fields are omitted; with `current_page` set only that page is returned.
pub fn render_model(
    store: &FieldStore,
    recipients: &[Recipient],
    registry: &PageRegistry,
    ctx: &ViewContext,
) -> Vec<PositionedField> {
    let zoom = ctx.zoom();
    let active = store.transient().map(|t| t.field_id);

    store
        .committed()
        .into_iter()
        .filter_map(|field| {
            let geometry: FieldGeometry = store.effective_geometry(field.id)?;
            if ctx.current_page.is_some_and(|page| page != geometry.page) {
                return None;
            }
            let visibility = classify(&field, ctx.actor, ctx.mode);
            if !visibility.is_rendered() {
                return None;
            }

            let owner = recipients.iter().position(|r| r.id == field.owner);
            let owner_name = owner
                .map(|i| recipients[i].name.clone())
                .unwrap_or_default();
            let color = field
                .color
                .or_else(|| owner.map(|i| recipients[i].color))
                .unwrap_or_else(|| Color::for_index(0));

            let rect = geometry::rect_to_screen(geometry.rect(), zoom);
            let content_rect = registry
                .page(geometry.page)
                .map(|page| rect.translate(page.anchor));

            Some(PositionedField {
                field_id: field.id,
                field_type: field.field_type,
                page: geometry.page,
                visibility,
                rect,
                content_rect,
                value: field.value,
                owner: field.owner,
                owner_name,
                color,
                active: active == Some(field.id),
            })
        })
        .collect()
}
