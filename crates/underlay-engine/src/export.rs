//! Full-resolution export.
//!
//! Re-renders a [`SceneSnapshot`] at the background's native size. Every
//! preview-space magnitude is multiplied by the preview-to-native scale
//! factor, so the export matches the preview.

use crate::adjust::apply_adjustments;
use crate::coords::{CoordinateMapper, Surface};
use crate::document::SceneSnapshot;
use crate::font::FontBook;
use crate::raster::encode_png;
use crate::render::{Frame, RenderPlan, render_frame};
use crate::types::{Asset, Dimensions, EngineError, RgbaImage};

/// Download name used by the editor.
pub const EXPORT_FILENAME: &str = "edited-image.png";

/// An encoded export ready to be saved or downloaded.
#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub png: Vec<u8>,
    pub dimensions: Dimensions,
    pub filename: String,
}

/// Renders snapshots at native resolution.
#[derive(Debug, Clone)]
pub struct ExportRenderer<'a> {
    fonts: &'a FontBook,
    plan: RenderPlan,
}

impl<'a> ExportRenderer<'a> {
    #[must_use]
    pub fn new(fonts: &'a FontBook) -> Self {
        Self {
            fonts,
            plan: RenderPlan::export(),
        }
    }

    /// Use a custom pass order.
    #[must_use]
    pub fn with_plan(mut self, plan: RenderPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Render `snapshot` at the background's native size.
    ///
    /// `preview` is the surface the layers were authored on; it sets the
    /// scale factor. An unmeasured preview renders at scale 1.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoImage`] without a background,
    /// [`EngineError::AssetDecode`] if the background or cutout cannot be
    /// decoded, and [`EngineError::Surface`] if the target cannot be
    /// allocated.
    pub fn render(&self, snapshot: &SceneSnapshot, preview: Surface) -> Result<RgbaImage, EngineError> {
        let background = snapshot
            .background
            .as_ref()
            .ok_or(EngineError::NoImage)?
            .decode(Asset::Background)?;
        let cutout = snapshot
            .cutout
            .as_ref()
            .map(|c| c.decode(Asset::Foreground))
            .transpose()?;

        let dims = Dimensions::of(background.as_ref());
        let mapper = CoordinateMapper::new(preview, Surface::from(dims));
        let _span = tracing::info_span!("export", %dims, scale = mapper.scale_factor()).entered();

        let adjusted = apply_adjustments(&background, &snapshot.adjustments, mapper.scale_factor());
        let frame = Frame {
            background: Some(&adjusted),
            cutout: cutout.as_deref(),
            layers: &snapshot.layers,
            selected: None,
            mapper,
        };
        let rendered = render_frame(&frame, &self.plan, self.fonts)?;
        tracing::debug!(layers = snapshot.layers.len(), "export rendered");
        Ok(rendered.image)
    }

    /// Render and PNG-encode `snapshot`.
    ///
    /// # Errors
    ///
    /// Everything [`Self::render`] returns, plus [`EngineError::Encode`].
    pub fn export(&self, snapshot: &SceneSnapshot, preview: Surface) -> Result<ExportedImage, EngineError> {
        let image = self.render(snapshot, preview)?;
        let png = encode_png(&image)?;
        tracing::info!(bytes = png.len(), "export encoded");
        Ok(ExportedImage {
            png,
            dimensions: Dimensions::of(&image),
            filename: EXPORT_FILENAME.to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::adjust::Adjustments;
    use crate::decode::ImageAsset;
    use crate::layer::{LayerId, TextLayer};
    use crate::mask::{Subject, SubjectMask};
    use crate::types::Color;

    const RED: [u8; 4] = [255, 0, 0, 255];

    fn photo() -> RgbaImage {
        RgbaImage::from_fn(400, 300, |x, y| Rgba([(x % 251) as u8, (y % 241) as u8, 90, 255]))
    }

    fn snapshot(background: RgbaImage, subject: Option<Subject>, layers: Vec<TextLayer>) -> SceneSnapshot {
        SceneSnapshot {
            background: Some(ImageAsset::from_image(background)),
            cutout: subject.and_then(|s| s.cutout().cloned()),
            layers,
            selected: None,
            adjustments: Adjustments::default(),
        }
    }

    fn red_x() -> TextLayer {
        TextLayer {
            content: "X".to_owned(),
            size: 10.0,
            color: Color::rgb(255, 0, 0),
            ..TextLayer::new(LayerId(1))
        }
    }

    const PREVIEW: Surface = Surface::new(40.0, 30.0);

    #[test]
    fn neutral_export_without_layers_is_identity() {
        let bg = photo();
        let fonts = FontBook::new();
        let out = ExportRenderer::new(&fonts)
            .render(&snapshot(bg.clone(), None, Vec::new()), PREVIEW)
            .unwrap();
        assert_eq!(out, bg);
    }

    #[test]
    fn empty_mask_keeps_text_visible() {
        let bg = photo();
        let subject = Subject::none(Dimensions::of(&bg));
        let fonts = FontBook::new();
        let out = ExportRenderer::new(&fonts)
            .render(&snapshot(bg, Some(subject), vec![red_x()]), PREVIEW)
            .unwrap();
        assert_eq!(out.get_pixel(200, 150).0, RED);
    }

    #[test]
    fn text_scales_with_export_size() {
        // Size 10 on a 40x30 preview becomes 100 on 400x300: the block
        // glyph spans x -25..25 around the anchor.
        let fonts = FontBook::new();
        let out = ExportRenderer::new(&fonts)
            .render(&snapshot(photo(), None, vec![red_x()]), PREVIEW)
            .unwrap();
        assert_eq!(out.get_pixel(220, 150).0, RED);
        assert_ne!(out.get_pixel(230, 150).0, RED);
    }

    #[test]
    fn subject_cutout_hides_text() {
        let bg = photo();
        let mask = SubjectMask::from_fn(Dimensions::of(&bg), |x, _| x >= 200);
        let subject = Subject::from_mask(&bg, mask).unwrap();
        let fonts = FontBook::new();
        let out = ExportRenderer::new(&fonts)
            .render(&snapshot(bg.clone(), Some(subject), vec![red_x()]), PREVIEW)
            .unwrap();
        assert_eq!(out.get_pixel(210, 150), bg.get_pixel(210, 150));
        assert_eq!(out.get_pixel(190, 150).0, RED);
    }

    #[test]
    fn corrupt_cutout_aborts_export() {
        let mut snap = snapshot(photo(), None, Vec::new());
        snap.cutout = Some(ImageAsset::from_bytes(vec![1, 2, 3, 4]));
        let fonts = FontBook::new();
        let result = ExportRenderer::new(&fonts).render(&snap, PREVIEW);
        assert!(matches!(
            result,
            Err(EngineError::AssetDecode {
                asset: Asset::Foreground,
                ..
            })
        ));
    }

    #[test]
    fn missing_background_is_an_error() {
        let mut snap = snapshot(photo(), None, Vec::new());
        snap.background = None;
        let fonts = FontBook::new();
        assert!(matches!(
            ExportRenderer::new(&fonts).render(&snap, PREVIEW),
            Err(EngineError::NoImage)
        ));
    }

    #[test]
    fn adjustments_apply_at_export() {
        let bg = RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 255]));
        let mut snap = snapshot(bg, None, Vec::new());
        snap.adjustments.brightness = 50.0;
        let fonts = FontBook::new();
        let out = ExportRenderer::new(&fonts).render(&snap, Surface::new(8.0, 8.0)).unwrap();
        assert_eq!(out.get_pixel(3, 3).0, [100, 50, 25, 255]);
    }

    #[test]
    fn export_encodes_png_with_default_name() {
        let fonts = FontBook::new();
        let exported = ExportRenderer::new(&fonts)
            .export(&snapshot(photo(), None, vec![red_x()]), PREVIEW)
            .unwrap();
        assert_eq!(exported.filename, "edited-image.png");
        assert_eq!(exported.dimensions, Dimensions::new(400, 300));
        let decoded = image::load_from_memory(&exported.png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(200, 150).0, RED);
    }
}
