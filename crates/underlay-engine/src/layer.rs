//! Text layers and the properties that can be edited on them.
//!
//! Every write goes through [`LayerProperty::apply`], which clamps numeric
//! values into their documented domains, so a [`TextLayer`] held by the
//! document is always within range.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Color;

pub const MIN_SIZE: f64 = 10.0;
pub const MAX_SIZE: f64 = 400.0;
pub const DEFAULT_SIZE: f64 = 40.0;

pub const MIN_ROTATION: f64 = -180.0;
pub const MAX_ROTATION: f64 = 180.0;

pub const MAX_SHADOW_BLUR: f64 = 50.0;
pub const MAX_SHADOW_OFFSET: f64 = 50.0;

pub const DEFAULT_CONTENT: &str = "edit";
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// Suffix appended to the content of a duplicated layer.
pub const COPY_SUFFIX: &str = " (Copy)";

/// Position nudge (in percent on each axis) applied to duplicates.
pub const DUPLICATE_OFFSET: f64 = 5.0;

/// Identifier of a text layer, unique within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A position as percentages (0-100) of the surface width and height.
///
/// Resolution independent: the same value maps to the same relative spot
/// on the preview and on the full-resolution export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPosition {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPosition {
    pub const CENTER: Self = Self { x: 50.0, y: 50.0 };

    /// Create a position, clamping both axes into `0..=100`.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: clamp_percent(x),
            y: clamp_percent(y),
        }
    }

    /// Offset by the given percentages, clamping the result.
    #[must_use]
    pub fn nudged(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl Default for NormalizedPosition {
    fn default() -> Self {
        Self::CENTER
    }
}

fn clamp_percent(v: f64) -> f64 {
    if v.is_nan() { 50.0 } else { v.clamp(0.0, 100.0) }
}

/// Clamp `v` into `lo..=hi`, mapping NaN to `fallback`.
pub(crate) fn clamp_or(v: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if v.is_nan() { fallback } else { v.clamp(lo, hi) }
}

/// Horizontal alignment of a layer's text relative to its anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// The anchor is the leading edge.
    Left,
    /// The anchor is the horizontal midpoint.
    #[default]
    Center,
    /// The anchor is the trailing edge.
    Right,
}

impl TextAlign {
    pub const ALL: [Self; 3] = [Self::Left, Self::Center, Self::Right];

    /// Horizontal offset of the text start from the anchor, given the
    /// measured text width.
    #[must_use]
    pub fn start_offset(self, width: f64) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => -width / 2.0,
            Self::Right => -width,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Drop shadow behind a layer's glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextShadow {
    pub enabled: bool,
    pub color: Color,
    /// Blur radius in preview pixels.
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for TextShadow {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color::rgba(0, 0, 0, 204),
            blur: 4.0,
            offset_x: 2.0,
            offset_y: 2.0,
        }
    }
}

/// Vertical two-stop gradient fill replacing the solid color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    pub enabled: bool,
    /// Color at the top of the em box.
    pub color1: Color,
    /// Color at the bottom of the em box.
    pub color2: Color,
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            enabled: false,
            color1: Color::rgb(255, 0, 0),
            color2: Color::rgb(0, 0, 255),
        }
    }
}

/// One styled string positioned on the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextLayer {
    pub id: LayerId,
    pub content: String,
    pub color: Color,
    /// Font size in preview pixels.
    pub size: f64,
    /// Rotation in degrees, clockwise, about the anchor.
    pub rotation: f64,
    pub position: NormalizedPosition,
    /// CSS-style font family list, e.g. `"Impact, sans-serif"`.
    pub font_family: String,
    pub text_align: TextAlign,
    pub is_bold: bool,
    pub is_italic: bool,
    pub is_underlined: bool,
    pub opacity: f64,
    pub text_shadow: TextShadow,
    pub gradient: Gradient,
}

impl TextLayer {
    /// A layer with the editor's default styling.
    #[must_use]
    pub fn new(id: LayerId) -> Self {
        Self {
            id,
            content: DEFAULT_CONTENT.to_owned(),
            color: Color::WHITE,
            size: DEFAULT_SIZE,
            rotation: 0.0,
            position: NormalizedPosition::CENTER,
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
            text_align: TextAlign::Center,
            is_bold: false,
            is_italic: false,
            is_underlined: false,
            opacity: 1.0,
            text_shadow: TextShadow::default(),
            gradient: Gradient::default(),
        }
    }

    /// A copy of this layer under a new id, marked as a copy and nudged
    /// down and to the right.
    #[must_use]
    pub fn duplicate_as(&self, id: LayerId) -> Self {
        Self {
            id,
            content: format!("{}{COPY_SUFFIX}", self.content),
            position: self
                .position
                .nudged(DUPLICATE_OFFSET, DUPLICATE_OFFSET),
            ..self.clone()
        }
    }

    /// Clamp every numeric field into its domain.
    ///
    /// Used on layers that arrive from outside the editor (deserialized
    /// documents) rather than through [`LayerProperty::apply`].
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.size = clamp_or(self.size, MIN_SIZE, MAX_SIZE, DEFAULT_SIZE);
        self.rotation = clamp_or(self.rotation, MIN_ROTATION, MAX_ROTATION, 0.0);
        self.opacity = clamp_or(self.opacity, 0.0, 1.0, 1.0);
        self.position = NormalizedPosition::new(self.position.x, self.position.y);
        self.text_shadow.blur = clamp_or(self.text_shadow.blur, 0.0, MAX_SHADOW_BLUR, 0.0);
        self.text_shadow.offset_x = clamp_offset(self.text_shadow.offset_x);
        self.text_shadow.offset_y = clamp_offset(self.text_shadow.offset_y);
        self
    }
}

impl Default for TextLayer {
    fn default() -> Self {
        Self::new(LayerId(1))
    }
}

fn clamp_offset(v: f64) -> f64 {
    clamp_or(v, -MAX_SHADOW_OFFSET, MAX_SHADOW_OFFSET, 0.0)
}

/// Partial update of a layer's position. `None` leaves an axis unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Partial update of a layer's shadow.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShadowPatch {
    pub enabled: Option<bool>,
    pub color: Option<Color>,
    pub blur: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
}

/// Partial update of a layer's gradient.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GradientPatch {
    pub enabled: Option<bool>,
    pub color1: Option<Color>,
    pub color2: Option<Color>,
}

/// A single property write on a [`TextLayer`].
///
/// Object-valued properties carry patches that are merged shallowly into
/// the existing value.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerProperty {
    Content(String),
    Color(Color),
    Size(f64),
    Rotation(f64),
    Position(PositionPatch),
    FontFamily(String),
    TextAlign(TextAlign),
    Bold(bool),
    Italic(bool),
    Underlined(bool),
    Opacity(f64),
    Shadow(ShadowPatch),
    Gradient(GradientPatch),
}

/// Which field a [`LayerProperty`] writes.
///
/// Consecutive live edits of the same key on the same layer coalesce into
/// one history step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Content,
    Color,
    Size,
    Rotation,
    Position,
    FontFamily,
    TextAlign,
    Bold,
    Italic,
    Underlined,
    Opacity,
    Shadow,
    Gradient,
}

impl LayerProperty {
    /// Convenience constructor for moving a layer to an absolute position.
    #[must_use]
    pub const fn position(x: f64, y: f64) -> Self {
        Self::Position(PositionPatch {
            x: Some(x),
            y: Some(y),
        })
    }

    #[must_use]
    pub const fn key(&self) -> PropertyKey {
        match self {
            Self::Content(_) => PropertyKey::Content,
            Self::Color(_) => PropertyKey::Color,
            Self::Size(_) => PropertyKey::Size,
            Self::Rotation(_) => PropertyKey::Rotation,
            Self::Position(_) => PropertyKey::Position,
            Self::FontFamily(_) => PropertyKey::FontFamily,
            Self::TextAlign(_) => PropertyKey::TextAlign,
            Self::Bold(_) => PropertyKey::Bold,
            Self::Italic(_) => PropertyKey::Italic,
            Self::Underlined(_) => PropertyKey::Underlined,
            Self::Opacity(_) => PropertyKey::Opacity,
            Self::Shadow(_) => PropertyKey::Shadow,
            Self::Gradient(_) => PropertyKey::Gradient,
        }
    }

    /// Write this property into `layer`, clamping into range.
    pub fn apply(self, layer: &mut TextLayer) {
        match self {
            Self::Content(content) => layer.content = content,
            Self::Color(color) => layer.color = color,
            Self::Size(size) => layer.size = clamp_or(size, MIN_SIZE, MAX_SIZE, layer.size),
            Self::Rotation(deg) => {
                layer.rotation = clamp_or(deg, MIN_ROTATION, MAX_ROTATION, layer.rotation);
            }
            Self::Position(patch) => {
                layer.position = NormalizedPosition::new(
                    patch.x.unwrap_or(layer.position.x),
                    patch.y.unwrap_or(layer.position.y),
                );
            }
            Self::FontFamily(family) => layer.font_family = family,
            Self::TextAlign(align) => layer.text_align = align,
            Self::Bold(on) => layer.is_bold = on,
            Self::Italic(on) => layer.is_italic = on,
            Self::Underlined(on) => layer.is_underlined = on,
            Self::Opacity(o) => layer.opacity = clamp_or(o, 0.0, 1.0, layer.opacity),
            Self::Shadow(patch) => {
                let shadow = &mut layer.text_shadow;
                if let Some(enabled) = patch.enabled {
                    shadow.enabled = enabled;
                }
                if let Some(color) = patch.color {
                    shadow.color = color;
                }
                if let Some(blur) = patch.blur {
                    shadow.blur = clamp_or(blur, 0.0, MAX_SHADOW_BLUR, shadow.blur);
                }
                if let Some(dx) = patch.offset_x {
                    shadow.offset_x = clamp_offset(dx);
                }
                if let Some(dy) = patch.offset_y {
                    shadow.offset_y = clamp_offset(dy);
                }
            }
            Self::Gradient(patch) => {
                let gradient = &mut layer.gradient;
                if let Some(enabled) = patch.enabled {
                    gradient.enabled = enabled;
                }
                if let Some(c) = patch.color1 {
                    gradient.color1 = c;
                }
                if let Some(c) = patch.color2 {
                    gradient.color2 = c;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_editor_starter_layer() {
        let layer = TextLayer::new(LayerId(1));
        assert_eq!(layer.content, "edit");
        assert_eq!(layer.color, Color::WHITE);
        assert!((layer.size - 40.0).abs() < f64::EPSILON);
        assert_eq!(layer.position, NormalizedPosition::CENTER);
        assert_eq!(layer.text_align, TextAlign::Center);
        assert!(!layer.text_shadow.enabled);
        assert_eq!(layer.text_shadow.color, Color::rgba(0, 0, 0, 204));
        assert!(!layer.gradient.enabled);
    }

    #[test]
    fn size_is_clamped() {
        let mut layer = TextLayer::default();
        LayerProperty::Size(1000.0).apply(&mut layer);
        assert!((layer.size - MAX_SIZE).abs() < f64::EPSILON);
        LayerProperty::Size(1.0).apply(&mut layer);
        assert!((layer.size - MIN_SIZE).abs() < f64::EPSILON);
    }

    #[test]
    fn nan_writes_are_ignored() {
        let mut layer = TextLayer::default();
        LayerProperty::Opacity(f64::NAN).apply(&mut layer);
        assert!((layer.opacity - 1.0).abs() < f64::EPSILON);
        LayerProperty::Rotation(f64::NAN).apply(&mut layer);
        assert!(layer.rotation.abs() < f64::EPSILON);
    }

    #[test]
    fn rotation_and_opacity_are_clamped() {
        let mut layer = TextLayer::default();
        LayerProperty::Rotation(270.0).apply(&mut layer);
        assert!((layer.rotation - 180.0).abs() < f64::EPSILON);
        LayerProperty::Opacity(-0.5).apply(&mut layer);
        assert!(layer.opacity.abs() < f64::EPSILON);
    }

    #[test]
    fn position_patch_updates_one_axis() {
        let mut layer = TextLayer::default();
        LayerProperty::Position(PositionPatch {
            x: Some(120.0),
            y: None,
        })
        .apply(&mut layer);
        assert!((layer.position.x - 100.0).abs() < f64::EPSILON);
        assert!((layer.position.y - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn shadow_patch_merges_shallowly() {
        let mut layer = TextLayer::default();
        LayerProperty::Shadow(ShadowPatch {
            enabled: Some(true),
            offset_x: Some(-80.0),
            ..ShadowPatch::default()
        })
        .apply(&mut layer);
        assert!(layer.text_shadow.enabled);
        assert!((layer.text_shadow.offset_x + 50.0).abs() < f64::EPSILON);
        assert!((layer.text_shadow.offset_y - 2.0).abs() < f64::EPSILON);
        assert!((layer.text_shadow.blur - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gradient_patch_merges_shallowly() {
        let mut layer = TextLayer::default();
        LayerProperty::Gradient(GradientPatch {
            color2: Some(Color::BLACK),
            ..GradientPatch::default()
        })
        .apply(&mut layer);
        assert!(!layer.gradient.enabled);
        assert_eq!(layer.gradient.color1, Color::rgb(255, 0, 0));
        assert_eq!(layer.gradient.color2, Color::BLACK);
    }

    #[test]
    fn duplicate_copies_and_nudges() {
        let mut layer = TextLayer::new(LayerId(3));
        layer.position = NormalizedPosition::new(97.0, 10.0);
        layer.is_bold = true;
        let copy = layer.duplicate_as(LayerId(8));
        assert_eq!(copy.id, LayerId(8));
        assert_eq!(copy.content, "edit (Copy)");
        assert!(copy.is_bold);
        assert!((copy.position.x - 100.0).abs() < f64::EPSILON);
        assert!((copy.position.y - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn text_align_start_offsets() {
        assert!(TextAlign::Left.start_offset(100.0).abs() < f64::EPSILON);
        assert!((TextAlign::Center.start_offset(100.0) + 50.0).abs() < f64::EPSILON);
        assert!((TextAlign::Right.start_offset(100.0) + 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn layer_json_uses_camel_case_and_fills_defaults() {
        let json = r##"{"id": 4, "content": "hi", "fontFamily": "Impact, sans-serif",
            "textAlign": "right", "isBold": true, "size": 900,
            "gradient": {"enabled": true, "color1": "#00ff00", "color2": "#000"}}"##;
        let layer: TextLayer = serde_json::from_str::<TextLayer>(json).unwrap().clamped();
        assert_eq!(layer.id, LayerId(4));
        assert_eq!(layer.text_align, TextAlign::Right);
        assert!(layer.is_bold);
        assert!((layer.size - MAX_SIZE).abs() < f64::EPSILON);
        assert_eq!(layer.gradient.color1, Color::rgb(0, 255, 0));
        assert!((layer.opacity - 1.0).abs() < f64::EPSILON);

        let out = serde_json::to_value(&layer).unwrap();
        assert_eq!(out["fontFamily"], "Impact, sans-serif");
        assert_eq!(out["textShadow"]["offsetX"], 2.0);
    }

    #[test]
    fn property_keys_distinguish_fields() {
        assert_eq!(LayerProperty::Size(12.0).key(), PropertyKey::Size);
        assert_eq!(LayerProperty::position(1.0, 2.0).key(), PropertyKey::Position);
        assert_ne!(
            LayerProperty::Bold(true).key(),
            LayerProperty::Italic(true).key()
        );
    }
}
