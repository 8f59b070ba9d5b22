//! Engine configuration.
//!
//! Every field has a default, so a shell can deserialize a partial JSON
//! object and get sensible behavior for the rest.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::FieldType;
use crate::geometry::{self, Size};

/// Minimum and maximum size for one field type, in canonical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeLimits {
    pub min: Size,
    pub max: Size,
}

impl SizeLimits {
    pub const fn new(min: Size, max: Size) -> Self {
        Self { min, max }
    }

    /// Clamps each axis into `[min, max]`, with `max` further capped by `page`.
    pub fn clamp_axes(&self, size: Size, page: Option<Size>) -> Size {
        let (max_w, max_h) = self.upper(page);
        Size::new(
            size.width.max(self.min.width).min(max_w),
            size.height.max(self.min.height).min(max_h),
        )
    }

    /// Uniformly rescales `size` so both axes satisfy the limits.
    ///
    /// When the minimum and the maximum cannot both hold, the maximum wins so
    /// the field still fits its page.
    pub fn fit_uniform(&self, size: Size, page: Option<Size>) -> Size {
        if size.width <= 0.0 || size.height <= 0.0 {
            return self.clamp_axes(size, page);
        }
        let (max_w, max_h) = self.upper(page);
        let lower = (self.min.width / size.width).max(self.min.height / size.height);
        let upper = (max_w / size.width).min(max_h / size.height);
        let mut factor: f32 = 1.0;
        if factor < lower {
            factor = lower;
        }
        if factor > upper {
            factor = upper;
        }
        size.scale(factor)
    }

    fn upper(&self, page: Option<Size>) -> (f32, f32) {
        match page {
            Some(page) => (
                self.max.width.min(page.width),
                self.max.height.min(page.height),
            ),
            None => (self.max.width, self.max.height),
        }
    }
}

/// Size limits per field type.
///
/// One maximum per type, applied to corner-handle resizes, pinch resizes and
/// placement alike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSizeLimits {
    pub signature: SizeLimits,
    pub initial: SizeLimits,
    pub date: SizeLimits,
    pub text: SizeLimits,
    pub checkbox: SizeLimits,
}

impl Default for FieldSizeLimits {
    fn default() -> Self {
        Self {
            signature: SizeLimits::new(Size::new(50.0, 30.0), Size::new(400.0, 300.0)),
            initial: SizeLimits::new(Size::new(50.0, 30.0), Size::new(200.0, 150.0)),
            date: SizeLimits::new(Size::new(50.0, 30.0), Size::new(400.0, 100.0)),
            text: SizeLimits::new(Size::new(50.0, 30.0), Size::new(400.0, 300.0)),
            checkbox: SizeLimits::new(Size::new(20.0, 20.0), Size::new(150.0, 150.0)),
        }
    }
}

impl FieldSizeLimits {
    pub fn get(&self, field_type: FieldType) -> SizeLimits {
        match field_type {
            FieldType::Signature => self.signature,
            FieldType::Initial => self.initial,
            FieldType::Date => self.date,
            FieldType::Text => self.text,
            FieldType::Checkbox => self.checkbox,
        }
    }

    /// Applies the limits for `field_type`, uniformly for aspect-locked types.
    pub fn fit(&self, field_type: FieldType, size: Size, page: Option<Size>) -> Size {
        let limits = self.get(field_type);
        if field_type.preserves_aspect() {
            limits.fit_uniform(size, page)
        } else {
            limits.clamp_axes(size, page)
        }
    }
}

/// Tunables for geometry, gestures and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Grid-snap interval in canonical units, applied on gesture commit.
    pub grid_size: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Pointer travel (screen px) at or below which a press is not a drag.
    pub tap_distance_px: f32,
    /// Longest press (ms) still classified as a tap.
    pub tap_max_ms: u64,
    /// Initial finger distance (screen px) below which a pinch is ignored.
    pub pinch_min_distance_px: f32,
    /// Vertical gap between stacked pages (screen px).
    pub page_gap_px: f32,
    pub size_limits: FieldSizeLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_size: geometry::DEFAULT_GRID_SIZE,
            min_zoom: geometry::MIN_ZOOM,
            max_zoom: geometry::MAX_ZOOM,
            tap_distance_px: 3.0,
            tap_max_ms: 150,
            pinch_min_distance_px: 10.0,
            page_gap_px: 16.0,
            size_limits: FieldSizeLimits::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid zoom range: min {min} must be positive and at most max {max}")]
    ZoomRange { min: f32, max: f32 },
}

impl EngineConfig {
    /// Parses a (possibly partial) JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.min_zoom, self.max_zoom);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(ConfigError::ZoomRange { min, max });
        }
        Ok(())
    }

    /// Clamps a zoom factor into the configured range.
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        geometry::clamp_zoom_to(zoom, self.min_zoom, self.max_zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "grid_size": 5.0 }"#).unwrap();
        assert!((config.grid_size - 5.0).abs() < f32::EPSILON);
        assert_eq!(config.tap_max_ms, 150);
        assert_eq!(config.size_limits, FieldSizeLimits::default());
    }

    #[test]
    fn test_reversed_zoom_range_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "min_zoom": 2.0, "max_zoom": 0.5 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZoomRange { .. }));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "min_zoom": 0.0 }"#),
            Err(ConfigError::ZoomRange { .. })
        ));
        assert!(matches!(
            EngineConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_clamp_zoom_survives_hand_built_range() {
        let config = EngineConfig {
            min_zoom: 2.0,
            max_zoom: 0.5,
            ..EngineConfig::default()
        };
        assert!((config.clamp_zoom(5.0) - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fit_uniform_preserves_ratio() {
        let limits = FieldSizeLimits::default().checkbox;
        let fitted = limits.fit_uniform(Size::new(10.0, 5.0), None);
        assert!((fitted.aspect_ratio() - 2.0).abs() < 1e-4);
        assert!(fitted.height >= limits.min.height - 1e-4);

        let fitted = limits.fit_uniform(Size::new(400.0, 200.0), None);
        assert!((fitted.aspect_ratio() - 2.0).abs() < 1e-4);
        assert!(fitted.width <= limits.max.width + 1e-4);
    }

    #[test]
    fn test_page_caps_maximum() {
        let limits = FieldSizeLimits::default().text;
        let fitted = limits.clamp_axes(Size::new(390.0, 40.0), Some(Size::new(300.0, 400.0)));
        assert!((fitted.width - 300.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_text_axes_are_independent() {
        let limits = FieldSizeLimits::default();
        let fitted = limits.fit(FieldType::Text, Size::new(10.0, 100.0), None);
        assert!((fitted.width - 50.0).abs() < f32::EPSILON);
        assert!((fitted.height - 100.0).abs() < f32::EPSILON);
    }
}
