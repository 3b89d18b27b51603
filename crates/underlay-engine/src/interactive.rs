//! Preview rendering.
//!
//! The preview re-renders on every document change, so the expensive
//! parts that only depend on the images (decode, resize, filter) are
//! cached under a fingerprint of everything they depend on.

use std::hash::Hasher;

use siphasher::sip::SipHasher13;

use crate::adjust::{Adjustments, apply_adjustments};
use crate::coords::{CoordinateMapper, Surface};
use crate::decode::ImageAsset;
use crate::document::SceneSnapshot;
use crate::font::FontBook;
use crate::layer::{LayerId, NormalizedPosition};
use crate::raster::fit_to;
use crate::render::{Frame, RenderPlan, render_frame};
use crate::text::LayerBounds;
use crate::types::{Asset, Dimensions, EngineError, Point, RgbaImage};

/// Background and cutout prepared for one surface size.
#[derive(Debug, Clone)]
struct PreparedAssets {
    fingerprint: u64,
    background: Option<RgbaImage>,
    cutout: Option<RgbaImage>,
}

/// Renders the editor preview and answers hit-test queries against the
/// last frame.
#[derive(Debug, Clone)]
pub struct InteractiveRenderer {
    plan: RenderPlan,
    prepared: Option<PreparedAssets>,
    rebuilds: usize,
    mapper: Option<CoordinateMapper>,
    layer_bounds: Vec<(LayerId, LayerBounds)>,
}

impl Default for InteractiveRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractiveRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_plan(RenderPlan::interactive())
    }

    #[must_use]
    pub const fn with_plan(plan: RenderPlan) -> Self {
        Self {
            plan,
            prepared: None,
            rebuilds: 0,
            mapper: None,
            layer_bounds: Vec::new(),
        }
    }

    /// Render `snapshot` onto a `surface`-sized preview.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Surface`] for an unmeasured surface and
    /// [`EngineError::AssetDecode`] if an image cannot be decoded.
    pub fn render(
        &mut self,
        snapshot: &SceneSnapshot,
        surface: Surface,
        fonts: &FontBook,
    ) -> Result<RgbaImage, EngineError> {
        if !surface.is_measured() {
            return Err(EngineError::Surface(Dimensions::new(0, 0)));
        }
        let dims = surface.pixel_dimensions();
        let fingerprint = fingerprint(snapshot, dims);
        if self.prepared.as_ref().is_none_or(|p| p.fingerprint != fingerprint) {
            tracing::debug!(%dims, "preparing preview assets");
            self.prepared = Some(prepare(snapshot, dims, fingerprint)?);
            self.rebuilds += 1;
        }
        let prepared = self.prepared.as_ref().ok_or(EngineError::NoImage)?;

        let mapper = CoordinateMapper::identity(surface);
        let frame = Frame {
            background: prepared.background.as_ref(),
            cutout: prepared.cutout.as_ref(),
            layers: &snapshot.layers,
            selected: snapshot.selected,
            mapper,
        };
        let rendered = render_frame(&frame, &self.plan, fonts)?;
        self.mapper = Some(mapper);
        self.layer_bounds = rendered.layer_bounds;
        Ok(rendered.image)
    }

    /// How many times the cached assets were rebuilt.
    #[must_use]
    pub const fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Topmost layer whose bounds contain `point` in the last frame.
    #[must_use]
    pub fn layer_at(&self, point: Point) -> Option<LayerId> {
        self.layer_bounds
            .iter()
            .rev()
            .find(|(_, bounds)| bounds.contains(point))
            .map(|(id, _)| *id)
    }

    /// Bounds of `id` in the last frame.
    #[must_use]
    pub fn bounds_of(&self, id: LayerId) -> Option<&LayerBounds> {
        self.layer_bounds.iter().find(|(l, _)| *l == id).map(|(_, b)| b)
    }

    /// Normalized position of a preview pixel, for dragging.
    #[must_use]
    pub fn to_normalized(&self, point: Point) -> Option<NormalizedPosition> {
        self.mapper.map(|m| m.to_normalized(point))
    }
}

fn fingerprint(snapshot: &SceneSnapshot, dims: Dimensions) -> u64 {
    let mut hasher = SipHasher13::new();
    let identity = |asset: Option<&ImageAsset>| asset.map_or(0, ImageAsset::identity);
    hasher.write_usize(identity(snapshot.background.as_ref()));
    hasher.write_usize(identity(snapshot.cutout.as_ref()));
    let Adjustments {
        brightness,
        contrast,
        sharpness,
    } = snapshot.adjustments;
    for v in [brightness, contrast, sharpness] {
        hasher.write_u64(v.to_bits());
    }
    hasher.write_u32(dims.width);
    hasher.write_u32(dims.height);
    hasher.finish()
}

fn prepare(snapshot: &SceneSnapshot, dims: Dimensions, fingerprint: u64) -> Result<PreparedAssets, EngineError> {
    let background = snapshot
        .background
        .as_ref()
        .map(|bg| -> Result<RgbaImage, EngineError> {
            let image = bg.decode(Asset::Background)?;
            let fitted = fit_to(&image, dims);
            Ok(apply_adjustments(&fitted, &snapshot.adjustments, 1.0))
        })
        .transpose()?;
    let cutout = snapshot
        .cutout
        .as_ref()
        .map(|c| -> Result<RgbaImage, EngineError> {
            let image = c.decode(Asset::Foreground)?;
            Ok(fit_to(&image, dims).into_owned())
        })
        .transpose()?;
    Ok(PreparedAssets {
        fingerprint,
        background,
        cutout,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::document::Document;
    use crate::layer::{LayerProperty, TextLayer};

    fn document() -> Document {
        let mut doc = Document::with_starter_layer();
        doc.set_background(
            ImageAsset::from_image(RgbaImage::from_pixel(400, 300, Rgba([0, 0, 0, 255]))),
            Dimensions::new(400, 300),
        );
        doc
    }

    const SURFACE: Surface = Surface::new(200.0, 150.0);

    #[test]
    fn unchanged_assets_are_not_rebuilt() {
        let mut doc = document();
        let fonts = FontBook::new();
        let mut renderer = InteractiveRenderer::new();
        renderer.render(&doc.snapshot(), SURFACE, &fonts).unwrap();
        doc.update_layer_property(LayerId(1), LayerProperty::Size(60.0));
        renderer.render(&doc.snapshot(), SURFACE, &fonts).unwrap();
        assert_eq!(renderer.rebuilds(), 1);

        doc.set_adjustments(Adjustments {
            brightness: 150.0,
            ..Adjustments::default()
        });
        renderer.render(&doc.snapshot(), SURFACE, &fonts).unwrap();
        assert_eq!(renderer.rebuilds(), 2);

        renderer.render(&doc.snapshot(), Surface::new(100.0, 75.0), &fonts).unwrap();
        assert_eq!(renderer.rebuilds(), 3);
    }

    #[test]
    fn preview_is_rendered_at_surface_size() {
        let fonts = FontBook::new();
        let out = InteractiveRenderer::new().render(&document().snapshot(), SURFACE, &fonts).unwrap();
        assert_eq!(Dimensions::of(&out), Dimensions::new(200, 150));
    }

    #[test]
    fn selection_outline_is_drawn() {
        let fonts = FontBook::new();
        let mut renderer = InteractiveRenderer::new();
        let out = renderer.render(&document().snapshot(), SURFACE, &fonts).unwrap();
        let bounds = renderer.bounds_of(LayerId(1)).unwrap();
        // Indigo: strongly blue, unlike the black background or white text.
        let has_outline = out.pixels().any(|p| p.0[2] > 200 && p.0[0] < 150);
        assert!(has_outline);
        assert!(bounds.contains(Point::new(100.0, 75.0)));
    }

    #[test]
    fn hit_test_prefers_topmost_layer() {
        let mut doc = document();
        let second = doc.create_layer();
        let fonts = FontBook::new();
        let mut renderer = InteractiveRenderer::new();
        renderer.render(&doc.snapshot(), SURFACE, &fonts).unwrap();
        assert_eq!(renderer.layer_at(Point::new(100.0, 75.0)), Some(second));
        assert_eq!(renderer.layer_at(Point::new(2.0, 2.0)), None);
    }

    #[test]
    fn drag_positions_map_back_to_percentages() {
        let fonts = FontBook::new();
        let mut renderer = InteractiveRenderer::new();
        assert!(renderer.to_normalized(Point::new(50.0, 50.0)).is_none());
        renderer.render(&document().snapshot(), SURFACE, &fonts).unwrap();
        let pos = renderer.to_normalized(Point::new(50.0, 75.0)).unwrap();
        assert!((pos.x - 25.0).abs() < 1e-9 && (pos.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn unmeasured_surface_is_rejected() {
        let fonts = FontBook::new();
        let result = InteractiveRenderer::new().render(&document().snapshot(), Surface::new(0.0, 0.0), &fonts);
        assert!(matches!(result, Err(EngineError::Surface(_))));
    }

    #[test]
    fn layers_render_without_a_background() {
        let mut doc = Document::new();
        doc.replace_layers(vec![TextLayer {
            content: "X".to_owned(),
            ..TextLayer::new(LayerId(1))
        }]);
        let fonts = FontBook::new();
        let out = InteractiveRenderer::with_plan(RenderPlan::export())
            .render(&doc.snapshot(), SURFACE, &fonts)
            .unwrap();
        assert_eq!(out.get_pixel(100, 75).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(2, 2).0, [0, 0, 0, 0]);
    }
}
