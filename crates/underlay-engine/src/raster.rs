//! Conversions between `image` buffers and `tiny-skia` pixmaps, and PNG
//! encoding.
//!
//! `RgbaImage` is straight alpha; `Pixmap` is premultiplied. Every
//! crossing between the two goes through this module.

use std::borrow::Cow;

use tiny_skia::{IntSize, Pixmap, PixmapPaint, Transform};

use crate::adjust::gaussian_blur_rgba;
use crate::types::{Dimensions, EngineError, RgbaImage};

/// Allocate a transparent pixmap.
///
/// # Errors
///
/// Returns [`EngineError::Surface`] for zero-sized or oversized surfaces.
pub fn new_pixmap(dimensions: Dimensions) -> Result<Pixmap, EngineError> {
    Pixmap::new(dimensions.width, dimensions.height).ok_or(EngineError::Surface(dimensions))
}

/// Premultiply a straight-alpha image into a pixmap.
///
/// # Errors
///
/// Returns [`EngineError::Surface`] if the image is zero-sized.
#[allow(clippy::cast_possible_truncation)]
pub fn pixmap_from_rgba(image: &RgbaImage) -> Result<Pixmap, EngineError> {
    let dims = Dimensions::of(image);
    let size = IntSize::from_wh(dims.width, dims.height).ok_or(EngineError::Surface(dims))?;
    let mut data = image.as_raw().clone();
    for px in data.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
    Pixmap::from_vec(data, size).ok_or(EngineError::Surface(dims))
}

/// Un-premultiply a pixmap into a straight-alpha image.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn rgba_from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut data = pixmap.data().to_vec();
    for px in data.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px.copy_from_slice(&[0, 0, 0, 0]);
        } else if a < 255 {
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
    }
    RgbaImage::from_raw(width, height, data).unwrap_or_else(|| RgbaImage::new(width, height))
}

/// `image` at exactly `target` size, resampling only when needed.
#[must_use]
pub fn fit_to(image: &RgbaImage, target: Dimensions) -> Cow<'_, RgbaImage> {
    if Dimensions::of(image) == target {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(image::imageops::resize(
            image,
            target.width,
            target.height,
            image::imageops::FilterType::Triangle,
        ))
    }
}

/// Draw `image` over `target`, stretched to cover it.
///
/// When `target` is still fully transparent and the sizes match, the
/// pixels are copied exactly.
///
/// # Errors
///
/// Returns [`EngineError::Surface`] if the intermediate pixmap cannot be
/// allocated.
pub fn draw_image(target: &mut Pixmap, image: &RgbaImage) -> Result<(), EngineError> {
    let dims = Dimensions::new(target.width(), target.height());
    let fitted = fit_to(image, dims);
    let source = pixmap_from_rgba(&fitted)?;
    if target.data().iter().all(|&b| b == 0) {
        target.data_mut().copy_from_slice(source.data());
    } else {
        target.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
    Ok(())
}

/// Gaussian-blur a premultiplied pixmap.
///
/// Blurring premultiplied data is a linear operation on each channel, so
/// the result stays premultiplied; color channels are clamped to alpha to
/// absorb rounding.
#[must_use]
pub fn blur_pixmap(pixmap: &Pixmap, sigma: f32) -> Pixmap {
    if sigma <= 0.0 {
        return pixmap.clone();
    }
    let Some(raw) = RgbaImage::from_raw(pixmap.width(), pixmap.height(), pixmap.data().to_vec())
    else {
        return pixmap.clone();
    };
    let mut blurred = gaussian_blur_rgba(&raw, sigma).into_raw();
    for px in blurred.chunks_exact_mut(4) {
        let a = px[3];
        for c in &mut px[..3] {
            *c = (*c).min(a);
        }
    }
    IntSize::from_wh(pixmap.width(), pixmap.height())
        .and_then(|size| Pixmap::from_vec(blurred, size))
        .unwrap_or_else(|| pixmap.clone())
}

/// Encode an image as PNG.
///
/// # Errors
///
/// Returns [`EngineError::Encode`] if the encoder fails.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, EngineError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )
    .map_err(|e| EngineError::Encode(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn opaque_round_trip_is_exact() {
        let img = RgbaImage::from_fn(5, 3, |x, y| image::Rgba([x as u8 * 40, y as u8 * 80, 7, 255]));
        let back = rgba_from_pixmap(&pixmap_from_rgba(&img).unwrap());
        assert_eq!(back, img);
    }

    #[test]
    fn translucent_round_trip_is_close() {
        let img = RgbaImage::from_pixel(2, 2, image::Rgba([200, 100, 50, 128]));
        let back = rgba_from_pixmap(&pixmap_from_rgba(&img).unwrap());
        let p = back.get_pixel(0, 0).0;
        assert_eq!(p[3], 128);
        for (got, want) in p[..3].iter().zip([200u8, 100, 50]) {
            assert!(got.abs_diff(want) <= 2);
        }
    }

    #[test]
    fn zero_sized_surface_is_an_error() {
        assert!(matches!(
            new_pixmap(Dimensions::new(0, 10)),
            Err(EngineError::Surface(_))
        ));
    }

    #[test]
    fn draw_image_onto_blank_target_copies_exactly() {
        let img = RgbaImage::from_fn(4, 4, |x, y| image::Rgba([x as u8, y as u8, 9, 255]));
        let mut target = new_pixmap(Dimensions::new(4, 4)).unwrap();
        draw_image(&mut target, &img).unwrap();
        assert_eq!(rgba_from_pixmap(&target), img);
    }

    #[test]
    fn draw_image_stretches_to_target() {
        let img = RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let mut target = new_pixmap(Dimensions::new(8, 6)).unwrap();
        draw_image(&mut target, &img).unwrap();
        assert_eq!(rgba_from_pixmap(&target).get_pixel(7, 5).0, [255, 0, 0, 255]);
    }

    #[test]
    fn blur_spreads_coverage() {
        let mut pixmap = new_pixmap(Dimensions::new(21, 21)).unwrap();
        pixmap.fill_rect(
            tiny_skia::Rect::from_xywh(8.0, 8.0, 5.0, 5.0).unwrap(),
            &tiny_skia::Paint::default(),
            Transform::identity(),
            None,
        );
        let blurred = blur_pixmap(&pixmap, 2.0);
        let alpha_at = |p: &Pixmap, x: u32, y: u32| p.pixel(x, y).unwrap().alpha();
        assert_eq!(alpha_at(&pixmap, 5, 10), 0);
        assert!(alpha_at(&blurred, 5, 10) > 0);
    }

    #[test]
    fn png_encodes_and_decodes() {
        let img = RgbaImage::from_pixel(3, 3, image::Rgba([1, 2, 3, 255]));
        let png = encode_png(&img).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        assert_eq!(image::load_from_memory(&png).unwrap().to_rgba8(), img);
    }
}
