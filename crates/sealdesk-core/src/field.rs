//! Field model: typed, owned annotations placed on a document page.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Point, Rect, Size};
use crate::page::PageNumber;

/// Unique identifier for a field.
pub type FieldId = Uuid;

/// Unique identifier for a recipient.
pub type RecipientId = Uuid;

/// Kind of input a field collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Signature,
    Initial,
    Date,
    Text,
    Checkbox,
}

impl FieldType {
    pub const ALL: [FieldType; 5] = [
        FieldType::Signature,
        FieldType::Initial,
        FieldType::Date,
        FieldType::Text,
        FieldType::Checkbox,
    ];

    /// Whether resizing keeps width:height fixed.
    pub fn preserves_aspect(self) -> bool {
        matches!(self, Self::Signature | Self::Initial | Self::Checkbox)
    }

    /// Whether the value is a captured image/drawing rather than typed input.
    pub fn uses_capture_surface(self) -> bool {
        matches!(self, Self::Signature | Self::Initial)
    }

    /// Whether the value is a boolean.
    pub fn is_boolean(self) -> bool {
        matches!(self, Self::Checkbox)
    }

    /// Size given to a freshly placed field, in canonical units.
    pub fn default_size(self) -> Size {
        match self {
            Self::Signature => Size::new(200.0, 60.0),
            Self::Initial => Size::new(80.0, 50.0),
            Self::Date => Size::new(120.0, 30.0),
            Self::Text => Size::new(200.0, 30.0),
            Self::Checkbox => Size::new(30.0, 30.0),
        }
    }

    /// Human readable label used on placeholders.
    pub fn label(self) -> &'static str {
        match self {
            Self::Signature => "Signature",
            Self::Initial => "Initial",
            Self::Date => "Date",
            Self::Text => "Text",
            Self::Checkbox => "Checkbox",
        }
    }

    /// Returns true if `value` has the shape this type stores.
    pub fn accepts(self, value: &FieldValue) -> bool {
        match value {
            FieldValue::Bool(_) => self.is_boolean(),
            FieldValue::Text(_) => !self.is_boolean(),
        }
    }
}

/// A field's value.
///
/// Signature and Initial values hold an encoded image (data URL) or the typed
/// name; Date and Text hold plain strings; Checkbox holds a boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Empty string or unchecked box.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bool(checked) => !checked,
            Self::Text(text) => text.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(checked) => Some(*checked),
            Self::Text(_) => None,
        }
    }
}

/// RGBA color representation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const BLUE: Color = Color::rgb(37, 99, 235);
    pub const GREEN: Color = Color::rgb(22, 163, 74);
    pub const ORANGE: Color = Color::rgb(234, 88, 12);
    pub const PURPLE: Color = Color::rgb(147, 51, 234);
    pub const PINK: Color = Color::rgb(219, 39, 119);
    pub const TEAL: Color = Color::rgb(13, 148, 136);
    pub const YELLOW: Color = Color::rgb(202, 138, 4);
    pub const RED: Color = Color::rgb(220, 38, 38);

    /// Recipient colors, assigned in order of addition.
    pub fn palette() -> Vec<Color> {
        vec![
            Self::BLUE,
            Self::GREEN,
            Self::ORANGE,
            Self::PURPLE,
            Self::PINK,
            Self::TEAL,
            Self::YELLOW,
            Self::RED,
        ]
    }

    /// Palette color for the `index`-th recipient, wrapping around.
    pub fn for_index(index: usize) -> Color {
        let palette = Self::palette();
        palette[index % palette.len()]
    }
}

/// Placement of a field: page plus canonical top-left and size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldGeometry {
    /// 1-based page number.
    pub page: PageNumber,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FieldGeometry {
    pub fn new(page: PageNumber, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            page,
            x,
            y,
            width,
            height,
        }
    }

    /// Canonical rectangle relative to the field's page.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Returns true if the box lies fully inside a page of the given size.
    pub fn fits_within(&self, page: Size) -> bool {
        const EPS: f32 = 1e-3;
        self.x >= -EPS
            && self.y >= -EPS
            && self.x + self.width <= page.width + EPS
            && self.y + self.height <= page.height + EPS
    }
}

/// A placed, typed annotation assigned to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// The only recipient allowed to set `value`.
    pub owner: RecipientId,
    #[serde(flatten)]
    pub geometry: FieldGeometry,
    #[serde(default)]
    pub value: Option<FieldValue>,
    /// Overrides the owner's palette color when set.
    #[serde(default)]
    pub color: Option<Color>,
}

impl Field {
    /// Creates an empty field.
    pub fn new(field_type: FieldType, owner: RecipientId, geometry: FieldGeometry) -> Self {
        Self {
            id: Uuid::new_v4(),
            field_type,
            owner,
            geometry,
            value: None,
            color: None,
        }
    }

    /// Builder-style value setter (fixtures, loading).
    #[must_use]
    pub fn with_value(mut self, value: FieldValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Returns true if the field carries a non-empty value.
    pub fn has_value(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_empty())
    }

    pub fn page(&self) -> PageNumber {
        self.geometry.page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_shape_matches_type() {
        assert!(FieldType::Checkbox.accepts(&FieldValue::Bool(true)));
        assert!(!FieldType::Checkbox.accepts(&FieldValue::text("x")));
        for t in [
            FieldType::Signature,
            FieldType::Initial,
            FieldType::Date,
            FieldType::Text,
        ] {
            assert!(t.accepts(&FieldValue::text("x")));
            assert!(!t.accepts(&FieldValue::Bool(true)));
        }
    }

    #[test]
    fn test_unchecked_box_has_no_value() {
        let owner = Uuid::new_v4();
        let field = Field::new(
            FieldType::Checkbox,
            owner,
            FieldGeometry::new(1, 0.0, 0.0, 30.0, 30.0),
        )
        .with_value(FieldValue::Bool(false));
        assert!(!field.has_value());
    }

    #[test]
    fn test_field_json_shape() {
        let owner = Uuid::new_v4();
        let field = Field::new(
            FieldType::Text,
            owner,
            FieldGeometry::new(2, 10.0, 20.0, 200.0, 30.0),
        )
        .with_value(FieldValue::text("ACME Corp"));

        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["page"], 2);
        assert_eq!(json["value"], "ACME Corp");

        let back: Field = serde_json::from_value(json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(Color::for_index(0), Color::BLUE);
        assert_eq!(Color::for_index(Color::palette().len()), Color::BLUE);
    }
}
