//! Background adjustments: brightness, contrast, and sharpness.
//!
//! Mirrors the CSS filter chain the editor previews with:
//! `brightness(b%) contrast(c%) blur((100 - sharpness) / 50 px)`.
//! The blur step reuses the per-channel Gaussian approach: split the RGBA
//! image into four grayscale planes, blur each, reassemble.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::types::RgbaImage;

pub const NEUTRAL: f64 = 100.0;
pub const MIN_ADJUSTMENT: f64 = 0.0;
pub const MAX_ADJUSTMENT: f64 = 200.0;

/// Percentage adjustments applied to the background image.
///
/// 100 is neutral for all three; sharpness below 100 blurs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    pub brightness: f64,
    pub contrast: f64,
    pub sharpness: f64,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: NEUTRAL,
            contrast: NEUTRAL,
            sharpness: NEUTRAL,
        }
    }
}

impl Adjustments {
    /// All three values clamped into `0..=200`.
    #[must_use]
    pub fn clamped(self) -> Self {
        let c = |v: f64| {
            if v.is_nan() {
                NEUTRAL
            } else {
                v.clamp(MIN_ADJUSTMENT, MAX_ADJUSTMENT)
            }
        };
        Self {
            brightness: c(self.brightness),
            contrast: c(self.contrast),
            sharpness: c(self.sharpness),
        }
    }

    /// `true` when applying the filters would leave every pixel unchanged.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        (self.brightness - NEUTRAL).abs() < f64::EPSILON
            && (self.contrast - NEUTRAL).abs() < f64::EPSILON
            && self.blur_radius() <= 0.0
    }

    /// Blur radius in preview pixels: `(100 - sharpness) / 50`, never
    /// negative. Monotonically non-increasing in sharpness.
    #[must_use]
    pub fn blur_radius(&self) -> f64 {
        ((NEUTRAL - self.sharpness) / 50.0).max(0.0)
    }
}

/// Apply `adjustments` to `image`.
///
/// `scale` multiplies the blur radius so an export at `scale`x the
/// preview resolution looks the same as the preview. Neutral adjustments
/// return an exact copy.
#[must_use = "returns the adjusted image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn apply_adjustments(image: &RgbaImage, adjustments: &Adjustments, scale: f64) -> RgbaImage {
    let adjustments = adjustments.clamped();
    if adjustments.is_neutral() {
        return image.clone();
    }

    let brightness = adjustments.brightness / 100.0;
    let contrast = adjustments.contrast / 100.0;
    let lut: [u8; 256] = std::array::from_fn(|v| {
        let lit = v as f64 / 255.0 * brightness;
        let out = (lit - 0.5).mul_add(contrast, 0.5);
        (out * 255.0).round().clamp(0.0, 255.0) as u8
    });

    let mut adjusted = image.clone();
    for pixel in adjusted.pixels_mut() {
        for c in 0..3 {
            pixel.0[c] = lut[usize::from(pixel.0[c])];
        }
    }

    let sigma = (adjustments.blur_radius() * scale) as f32;
    gaussian_blur_rgba(&adjusted, sigma)
}

/// Blur each channel of an RGBA image independently.
///
/// Non-positive sigma returns the image unchanged (`imageproc` panics on
/// `sigma <= 0.0`).
#[must_use = "returns the blurred RGBA image"]
pub fn gaussian_blur_rgba(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 || !sigma.is_finite() {
        return image.clone();
    }

    let (w, h) = image.dimensions();
    let channels: [GrayImage; 4] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]))
    });
    let blurred: [GrayImage; 4] =
        std::array::from_fn(|c| imageproc::filter::gaussian_blur_f32(&channels[c], sigma));

    RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
            blurred[3].get_pixel(x, y).0[0],
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image() -> RgbaImage {
        RgbaImage::from_fn(16, 4, |x, _| image::Rgba([(x * 16) as u8, 100, 200, 255]))
    }

    #[test]
    fn neutral_is_identity() {
        let img = gradient_image();
        assert!(Adjustments::default().is_neutral());
        assert_eq!(apply_adjustments(&img, &Adjustments::default(), 5.0), img);
    }

    #[test]
    fn sharpness_above_neutral_does_not_blur() {
        let adj = Adjustments {
            sharpness: 180.0,
            ..Adjustments::default()
        };
        assert!(adj.blur_radius().abs() < f64::EPSILON);
        assert!(adj.is_neutral());
    }

    #[test]
    fn blur_radius_is_monotone_in_sharpness() {
        let mut last = f64::INFINITY;
        for s in (0..=200).step_by(10) {
            let r = Adjustments {
                sharpness: f64::from(s),
                ..Adjustments::default()
            }
            .blur_radius();
            assert!(r <= last);
            assert!(r >= 0.0);
            last = r;
        }
        let zero = Adjustments {
            sharpness: 0.0,
            ..Adjustments::default()
        };
        assert!((zero.blur_radius() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn brightness_scales_channels() {
        let img = RgbaImage::from_pixel(2, 2, image::Rgba([100, 50, 200, 255]));
        let adj = Adjustments {
            brightness: 50.0,
            ..Adjustments::default()
        };
        let out = apply_adjustments(&img, &adj, 1.0);
        assert_eq!(out.get_pixel(0, 0).0, [50, 25, 100, 255]);
    }

    #[test]
    fn zero_contrast_collapses_to_mid_gray() {
        let img = gradient_image();
        let adj = Adjustments {
            contrast: 0.0,
            ..Adjustments::default()
        };
        let out = apply_adjustments(&img, &adj, 1.0);
        for p in out.pixels() {
            assert_eq!(&p.0[..3], &[128, 128, 128]);
            assert_eq!(p.0[3], 255);
        }
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let adj = Adjustments {
            brightness: 900.0,
            contrast: -5.0,
            sharpness: f64::NAN,
        }
        .clamped();
        assert!((adj.brightness - 200.0).abs() < f64::EPSILON);
        assert!(adj.contrast.abs() < f64::EPSILON);
        assert!((adj.sharpness - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn low_sharpness_softens_edges() {
        let img = RgbaImage::from_fn(20, 20, |x, _| {
            if x < 10 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let adj = Adjustments {
            sharpness: 0.0,
            ..Adjustments::default()
        };
        let out = apply_adjustments(&img, &adj, 1.0);
        let left = out.get_pixel(9, 10).0[0];
        let right = out.get_pixel(10, 10).0[0];
        assert!(left > 0);
        assert!(right < 255);
    }

    #[test]
    fn blur_rgba_zero_sigma_is_identity() {
        let img = gradient_image();
        assert_eq!(gaussian_blur_rgba(&img, 0.0), img);
    }
}
