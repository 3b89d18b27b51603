//! Text-along-border mode: repeat a short string around the subject's
//! outline.

use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, Transform};

use crate::contour::{ContourTracer, GreedyBoundaryTracer, PlacementParams, SilhouetteError, place_text};
use crate::font::FontBook;
use crate::layer::{TextAlign, clamp_or};
use crate::mask::SubjectMask;
use crate::raster::{pixmap_from_rgba, rgba_from_pixmap};
use crate::render::solid_paint;
use crate::text::{FontStyle, layout_line, measure};
use crate::types::{Color, Dimensions, RgbaImage};

pub const DEFAULT_TEXT: &str = "NEYMAR";
pub const DEFAULT_FONT_SIZE: f64 = 24.0;
pub const MIN_FONT_SIZE: f64 = 10.0;
pub const MAX_FONT_SIZE: f64 = 40.0;
pub const DEFAULT_FONT_FAMILY: &str = "Arial Black";
pub const DEFAULT_SPACING: f64 = 15.0;
pub const MIN_SPACING: f64 = 5.0;
pub const MAX_SPACING: f64 = 30.0;
pub const DEFAULT_DISTANCE: f64 = 20.0;
pub const MIN_DISTANCE: f64 = 10.0;
pub const MAX_DISTANCE: f64 = 50.0;

/// Settings for [`render_silhouette`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SilhouetteConfig {
    pub text: String,
    pub font_size: f64,
    pub color: Color,
    pub font_family: String,
    /// Extra gap between characters along the outline, in pixels.
    pub spacing: f64,
    /// Gap between the outline and the text, in pixels.
    pub distance: f64,
    /// Rotate each character to follow the outline.
    pub rotate: bool,
}

impl Default for SilhouetteConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_owned(),
            font_size: DEFAULT_FONT_SIZE,
            color: Color::WHITE,
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
            spacing: DEFAULT_SPACING,
            distance: DEFAULT_DISTANCE,
            rotate: true,
        }
    }
}

impl SilhouetteConfig {
    /// Clamp numeric fields into their slider ranges. NaN falls back to
    /// the default.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.font_size = clamp_or(self.font_size, MIN_FONT_SIZE, MAX_FONT_SIZE, DEFAULT_FONT_SIZE);
        self.spacing = clamp_or(self.spacing, MIN_SPACING, MAX_SPACING, DEFAULT_SPACING);
        self.distance = clamp_or(self.distance, MIN_DISTANCE, MAX_DISTANCE, DEFAULT_DISTANCE);
        self
    }

    const fn placement(&self) -> PlacementParams {
        PlacementParams {
            font_size: self.font_size,
            spacing: self.spacing,
            distance: self.distance,
            rotate: self.rotate,
        }
    }
}

/// Draw `config.text` repeatedly around the subject of `mask` on top of
/// `image`.
///
/// The mask is resampled to the image if needed and refined before
/// tracing. Empty text returns the image unchanged.
///
/// # Errors
///
/// Returns [`SilhouetteError::OutlineNotFound`] or
/// [`SilhouetteError::OutlineTooSmall`] when the subject cannot carry
/// text, and [`SilhouetteError::Engine`] if the image surface cannot be
/// allocated.
#[allow(clippy::cast_possible_truncation)]
pub fn render_silhouette(
    image: &RgbaImage,
    mask: &SubjectMask,
    config: &SilhouetteConfig,
    fonts: &FontBook,
) -> Result<RgbaImage, SilhouetteError> {
    let config = config.clone().clamped();
    if config.text.is_empty() {
        return Ok(image.clone());
    }
    let dims = Dimensions::of(image);
    let refined = if mask.dimensions() == dims {
        mask.refined()
    } else {
        mask.resized(dims).refined()
    };
    let _span = tracing::debug_span!("render_silhouette", %dims, text = %config.text).entered();

    let outline = GreedyBoundaryTracer::default().trace(&refined)?;
    let face = fonts.resolve(&config.font_family);
    let size = config.font_size as f32;
    let text_width = f64::from(measure(face.as_ref(), &config.text, size));
    let slots = place_text(&outline, &refined, &config.text, text_width, &config.placement());
    tracing::debug!(slots = slots.len(), perimeter = outline.perimeter(), "placed border text");

    let mut pixmap = pixmap_from_rgba(image)?;
    let paint = solid_paint(config.color.to_skia());
    let mut glyph = [0u8; 4];
    for slot in &slots {
        let run = layout_line(
            face.as_ref(),
            slot.ch.encode_utf8(&mut glyph),
            size,
            TextAlign::Left,
            FontStyle::default(),
        );
        let Some(path) = run.path else {
            continue;
        };
        let transform = Transform::from_translate(slot.position.x as f32, slot.position.y as f32)
            .pre_concat(Transform::from_rotate(slot.angle.to_degrees() as f32));
        pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
    }
    Ok(rgba_from_pixmap(&pixmap))
}
