//! Text-upon-image mode: one bold string whose fill is hidden wherever it
//! crosses the subject, leaving only its stroke outline there.
//!
//! The effect is an explicit per-pixel composition of four buffers (see
//! [`compose_priority`]) rather than a sequence of blend modes.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use tiny_skia::{Paint, Path, Pixmap, Stroke, Transform};

use crate::font::FontBook;
use crate::layer::{NormalizedPosition, TextAlign, clamp_or};
use crate::mask::SubjectMask;
use crate::raster::{new_pixmap, rgba_from_pixmap};
use crate::render::{paint_run, solid_paint};
use crate::text::{FontStyle, layout_line};
use crate::types::{Color, Dimensions, EngineError, RgbaImage};

pub const DEFAULT_TEXT: &str = "TEXT";
pub const DEFAULT_FONT_SIZE: f64 = 100.0;
pub const MIN_FONT_SIZE: f64 = 20.0;
pub const MAX_FONT_SIZE: f64 = 600.0;
pub const DEFAULT_FONT_FAMILY: &str = "Impact";
pub const DEFAULT_OUTLINE_WIDTH: f64 = 4.0;
pub const MAX_OUTLINE_WIDTH: f64 = 20.0;

/// Settings for [`render_text_upon`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayConfig {
    pub text: String,
    pub font_size: f64,
    pub color: Color,
    pub font_family: String,
    pub bold: bool,
    pub text_align: TextAlign,
    pub position: NormalizedPosition,
    /// Stroke width of the outline shown over the subject. Zero disables
    /// it.
    pub outline_width: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_owned(),
            font_size: DEFAULT_FONT_SIZE,
            color: Color::WHITE,
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
            bold: true,
            text_align: TextAlign::Center,
            position: NormalizedPosition::CENTER,
            outline_width: DEFAULT_OUTLINE_WIDTH,
        }
    }
}

impl OverlayConfig {
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.font_size = clamp_or(self.font_size, MIN_FONT_SIZE, MAX_FONT_SIZE, DEFAULT_FONT_SIZE);
        self.outline_width = clamp_or(self.outline_width, 0.0, MAX_OUTLINE_WIDTH, DEFAULT_OUTLINE_WIDTH);
        self.position = NormalizedPosition::new(self.position.x, self.position.y);
        self
    }
}

/// Render `config.text` over `image`, tucked behind the subject of
/// `mask` except for its outline.
///
/// The mask is resampled to the image if the sizes differ.
///
/// # Errors
///
/// Returns [`EngineError::Surface`] if the text buffers cannot be
/// allocated.
#[allow(clippy::cast_possible_truncation)]
pub fn render_text_upon(
    image: &RgbaImage,
    mask: &SubjectMask,
    config: &OverlayConfig,
    fonts: &FontBook,
) -> Result<RgbaImage, EngineError> {
    let config = config.clone().clamped();
    let dims = Dimensions::of(image);
    if config.text.is_empty() {
        return Ok(image.clone());
    }
    let _span = tracing::debug_span!("render_text_upon", %dims, text = %config.text).entered();

    let face = fonts.resolve(&config.font_family);
    let run = layout_line(
        face.as_ref(),
        &config.text,
        config.font_size as f32,
        config.text_align,
        FontStyle {
            bold: config.bold,
            italic: false,
        },
    );
    let anchor_x = (f64::from(dims.width) * config.position.x / 100.0).round();
    let anchor_y = (f64::from(dims.height) * config.position.y / 100.0).round();
    let transform = Transform::from_translate(anchor_x as f32, anchor_y as f32);
    let paint = solid_paint(config.color.to_skia());

    let mut fill = new_pixmap(dims)?;
    paint_run(&mut fill, &run, &paint, &paint, false, transform);

    let mut outline = new_pixmap(dims)?;
    if config.outline_width > 0.0
        && let Some(path) = &run.path
    {
        stroke_outline(&mut outline, path, &paint, config.outline_width as f32, transform);
    }

    let mask = if mask.dimensions() == dims {
        Cow::Borrowed(mask)
    } else {
        Cow::Owned(mask.resized(dims))
    };
    compose_priority(image, &mask, &rgba_from_pixmap(&fill), &rgba_from_pixmap(&outline))
}

fn stroke_outline(
    target: &mut Pixmap,
    path: &Path,
    paint: &Paint<'_>,
    width: f32,
    transform: Transform,
) {
    let stroke = Stroke {
        width,
        ..Stroke::default()
    };
    target.stroke_path(path, paint, &stroke, transform, None);
}

/// Merge the four buffers pixel by pixel.
///
/// Priority, per pixel:
///
/// - inside the subject and covered by the outline: outline color;
/// - inside the subject and covered by the fill only: original pixel;
/// - outside the subject and covered by the fill: fill color;
/// - otherwise: original pixel.
///
/// Any non-zero alpha counts as coverage; covered pixels come out opaque.
///
/// # Errors
///
/// Returns [`EngineError::MaskMismatch`] if any buffer differs in size
/// from `original`.
pub fn compose_priority(
    original: &RgbaImage,
    mask: &SubjectMask,
    text: &RgbaImage,
    outline: &RgbaImage,
) -> Result<RgbaImage, EngineError> {
    let dims = Dimensions::of(original);
    for other in [mask.dimensions(), Dimensions::of(text), Dimensions::of(outline)] {
        if other != dims {
            return Err(EngineError::MaskMismatch {
                expected: dims.pixel_count(),
                actual: other.pixel_count(),
            });
        }
    }

    let mut out = original.clone();
    let pixels = out
        .pixels_mut()
        .zip(mask.data())
        .zip(text.pixels().zip(outline.pixels()));
    for ((px, &m), (t, o)) in pixels {
        let in_subject = m == crate::mask::SUBJECT;
        let in_text = t.0[3] > 0;
        let in_outline = o.0[3] > 0;
        let source = match (in_subject, in_outline, in_text) {
            (true, true, _) => Some(o),
            (false, _, true) => Some(t),
            _ => None,
        };
        if let Some(src) = source {
            px.0 = [src.0[0], src.0[1], src.0[2], 255];
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgba;

    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    #[test]
    fn priority_rule_per_pixel() {
        // Columns: 0 subject+outline, 1 subject+text, 2 text, 3 outline only, 4 nothing.
        let original = RgbaImage::from_pixel(5, 1, RED);
        let mask = SubjectMask::from_fn(Dimensions::new(5, 1), |x, _| x < 2);
        let text = RgbaImage::from_fn(5, 1, |x, _| if (1..=2).contains(&x) || x == 0 { GREEN } else { CLEAR });
        let outline = RgbaImage::from_fn(5, 1, |x, _| if x == 0 || x == 3 { BLUE } else { CLEAR });

        let out = compose_priority(&original, &mask, &text, &outline).unwrap();
        assert_eq!(*out.get_pixel(0, 0), BLUE);
        assert_eq!(*out.get_pixel(1, 0), RED);
        assert_eq!(*out.get_pixel(2, 0), GREEN);
        assert_eq!(*out.get_pixel(3, 0), RED);
        assert_eq!(*out.get_pixel(4, 0), RED);
    }

    #[test]
    fn partial_coverage_is_opaque() {
        let original = RgbaImage::from_pixel(1, 1, RED);
        let text = RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 10]));
        let out = compose_priority(
            &original,
            &SubjectMask::empty(Dimensions::new(1, 1)),
            &text,
            &RgbaImage::new(1, 1),
        )
        .unwrap();
        assert_eq!(*out.get_pixel(0, 0), GREEN);
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let original = RgbaImage::new(2, 2);
        let result = compose_priority(
            &original,
            &SubjectMask::empty(Dimensions::new(2, 2)),
            &RgbaImage::new(3, 2),
            &RgbaImage::new(2, 2),
        );
        assert!(matches!(result, Err(EngineError::MaskMismatch { .. })));
    }

    #[test]
    fn text_hides_behind_subject_except_outline() {
        let image = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 255]));
        // Left half is the subject.
        let mask = SubjectMask::from_fn(Dimensions::new(200, 100), |x, _| x < 100);
        let config = OverlayConfig {
            font_size: 40.0,
            ..OverlayConfig::default()
        };
        let out = render_text_upon(&image, &mask, &config, &FontBook::new()).unwrap();

        // "TEXT" in block glyphs spans x 52..148, glyph boxes y 34..62.
        assert_eq!(out.get_pixel(64, 48).0, [0, 0, 0, 255], "fill hidden by subject");
        assert_eq!(out.get_pixel(54, 48).0, [255, 255, 255, 255], "outline over subject");
        assert_eq!(out.get_pixel(136, 48).0, [255, 255, 255, 255], "fill over background");
        assert_eq!(out.get_pixel(10, 10).0, [0, 0, 0, 255]);
    }

    #[test]
    fn defaults_follow_the_editor() {
        let config = OverlayConfig::default();
        assert_eq!(config.text, "TEXT");
        assert!((config.font_size - 100.0).abs() < f64::EPSILON);
        assert!(config.bold);
        assert!((config.outline_width - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clamping_bounds_size_and_outline() {
        let config = OverlayConfig {
            font_size: 5.0,
            outline_width: 99.0,
            ..OverlayConfig::default()
        }
        .clamped();
        assert!((config.font_size - MIN_FONT_SIZE).abs() < f64::EPSILON);
        assert!((config.outline_width - MAX_OUTLINE_WIDTH).abs() < f64::EPSILON);
    }
}
