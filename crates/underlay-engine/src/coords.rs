//! Mapping between normalized layer positions and surface pixels.
//!
//! Layer geometry is authored against the preview surface. Exports
//! render at the image's native size, so every magnitude (font size,
//! shadow blur and offsets, underline width) is multiplied by a single
//! scale factor: the larger of the two axis ratios.

use serde::{Deserialize, Serialize};

use crate::layer::NormalizedPosition;
use crate::types::{Dimensions, Point};

/// Size of a drawing surface in (possibly fractional) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
}

impl Surface {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// `false` for a preview that has not been laid out yet.
    #[must_use]
    pub fn is_measured(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Whole-pixel size for allocating a raster, at least 1x1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel_dimensions(&self) -> Dimensions {
        let px = |v: f64| if v.is_finite() { v.round().max(1.0) as u32 } else { 1 };
        Dimensions::new(px(self.width), px(self.height))
    }
}

impl From<Dimensions> for Surface {
    fn from(d: Dimensions) -> Self {
        Self::new(f64::from(d.width), f64::from(d.height))
    }
}

/// Preview aspect ratios offered by the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "4:3")]
    FourThree,
    #[serde(rename = "16:9")]
    SixteenNine,
    #[serde(rename = "3:2")]
    ThreeTwo,
}

impl AspectRatio {
    pub const ALL: [Self; 4] = [
        Self::Square,
        Self::FourThree,
        Self::SixteenNine,
        Self::ThreeTwo,
    ];

    /// Width divided by height.
    #[must_use]
    pub const fn ratio(self) -> f64 {
        match self {
            Self::Square => 1.0,
            Self::FourThree => 4.0 / 3.0,
            Self::SixteenNine => 16.0 / 9.0,
            Self::ThreeTwo => 3.0 / 2.0,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::FourThree => "4:3",
            Self::SixteenNine => "16:9",
            Self::ThreeTwo => "3:2",
        }
    }

    /// Parse a `"w:h"` label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.label() == label.trim())
    }
}

/// The preview box for a container of the given width: its height is
/// `width / ratio`.
#[must_use]
pub fn preview_surface_for(container_width: f64, aspect: AspectRatio) -> Surface {
    Surface::new(container_width, container_width / aspect.ratio())
}

/// Largest surface with the image's aspect ratio that fits inside `max`.
#[must_use]
pub fn fit_within(image: Dimensions, max: Surface) -> Surface {
    if image.is_empty() || !max.is_measured() {
        return max;
    }
    let w = f64::from(image.width);
    let h = f64::from(image.height);
    let scale = (max.width / w).min(max.height / h);
    Surface::new(w * scale, h * scale)
}

/// Export-to-preview scale factor: `max(export_w / preview_w,
/// export_h / preview_h)`, or `1.0` when the preview is unmeasured.
#[must_use]
pub fn scale_factor(preview: Surface, export: Surface) -> f64 {
    if !preview.is_measured() || !export.is_measured() {
        return 1.0;
    }
    (export.width / preview.width).max(export.height / preview.height)
}

/// Maps normalized positions and preview magnitudes onto a target surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    target: Surface,
    scale: f64,
}

impl CoordinateMapper {
    /// Mapper for rendering onto `target` with geometry authored on
    /// `preview`.
    #[must_use]
    pub fn new(preview: Surface, target: Surface) -> Self {
        Self {
            target,
            scale: scale_factor(preview, target),
        }
    }

    /// Mapper for rendering directly on the preview surface (scale 1).
    #[must_use]
    pub const fn identity(surface: Surface) -> Self {
        Self {
            target: surface,
            scale: 1.0,
        }
    }

    #[must_use]
    pub const fn target(&self) -> Surface {
        self.target
    }

    #[must_use]
    pub const fn scale_factor(&self) -> f64 {
        self.scale
    }

    /// Pixel location of a normalized position on the target surface.
    #[must_use]
    pub fn to_pixels(&self, position: NormalizedPosition) -> Point {
        Point::new(
            position.x / 100.0 * self.target.width,
            position.y / 100.0 * self.target.height,
        )
    }

    /// Normalized position of a pixel location on the target surface,
    /// clamped into range. Used for dragging layers on the preview.
    #[must_use]
    pub fn to_normalized(&self, point: Point) -> NormalizedPosition {
        if !self.target.is_measured() {
            return NormalizedPosition::CENTER;
        }
        NormalizedPosition::new(
            point.x / self.target.width * 100.0,
            point.y / self.target.height * 100.0,
        )
    }

    /// Scale a preview-space magnitude to the target surface.
    #[must_use]
    pub fn scale(&self, magnitude: f64) -> f64 {
        magnitude * self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn center_maps_to_center_on_both_surfaces() {
        let preview = Surface::new(800.0, 600.0);
        let export = Surface::new(4000.0, 3000.0);
        let pos = NormalizedPosition::CENTER;

        let on_preview = CoordinateMapper::identity(preview).to_pixels(pos);
        assert!(approx(on_preview.x, 400.0) && approx(on_preview.y, 300.0));

        let mapper = CoordinateMapper::new(preview, export);
        let on_export = mapper.to_pixels(pos);
        assert!(approx(on_export.x, 2000.0) && approx(on_export.y, 1500.0));
        assert!(approx(mapper.scale_factor(), 5.0));
        assert!(approx(mapper.scale(40.0), 200.0));
    }

    #[test]
    fn scale_factor_uses_larger_axis() {
        let s = scale_factor(Surface::new(800.0, 450.0), Surface::new(1600.0, 1200.0));
        assert!(approx(s, 1200.0 / 450.0));
    }

    #[test]
    fn unmeasured_preview_scales_by_one() {
        assert!(approx(
            scale_factor(Surface::new(0.0, 0.0), Surface::new(4000.0, 3000.0)),
            1.0
        ));
    }

    #[test]
    fn to_normalized_inverts_to_pixels() {
        let mapper = CoordinateMapper::identity(Surface::new(640.0, 480.0));
        let pos = NormalizedPosition::new(25.0, 75.0);
        let back = mapper.to_normalized(mapper.to_pixels(pos));
        assert!(approx(back.x, 25.0) && approx(back.y, 75.0));
    }

    #[test]
    fn to_normalized_clamps_outside_points() {
        let mapper = CoordinateMapper::identity(Surface::new(100.0, 100.0));
        let pos = mapper.to_normalized(Point::new(-20.0, 250.0));
        assert!(approx(pos.x, 0.0) && approx(pos.y, 100.0));
    }

    #[test]
    fn preview_height_follows_aspect_ratio() {
        let s = preview_surface_for(800.0, AspectRatio::SixteenNine);
        assert!(approx(s.height, 450.0));
        let s = preview_surface_for(600.0, AspectRatio::Square);
        assert!(approx(s.height, 600.0));
    }

    #[test]
    fn fit_within_preserves_image_aspect() {
        let s = fit_within(Dimensions::new(4000, 2000), Surface::new(800.0, 600.0));
        assert!(approx(s.width, 800.0) && approx(s.height, 400.0));
    }

    #[test]
    fn aspect_labels_round_trip() {
        for r in AspectRatio::ALL {
            assert_eq!(AspectRatio::from_label(r.label()), Some(r));
        }
        assert_eq!(AspectRatio::from_label("5:4"), None);
    }

    #[test]
    fn pixel_dimensions_rounds_and_floors_at_one() {
        assert_eq!(
            Surface::new(799.6, 0.2).pixel_dimensions(),
            Dimensions::new(800, 1)
        );
    }
}
