//! Upload validation and image decoding.
//!
//! Raw bytes in, [`RgbaImage`] out. Document assets are held as
//! [`ImageAsset`] values that may still be encoded; they are decoded on
//! demand by the renderers so a corrupt asset surfaces as
//! [`EngineError::AssetDecode`] at render time rather than at upload.

use std::fmt;
use std::sync::Arc;

use crate::types::{Asset, Dimensions, EngineError, RgbaImage};

/// File extensions accepted by the upload control, with their MIME types.
pub const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
];

/// Guess a MIME type from a filename's extension.
///
/// Returns `None` for names without a recognized image extension.
#[must_use]
pub fn mime_for_filename(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
}

/// Reject uploads whose declared type is not an image.
///
/// # Errors
///
/// Returns [`EngineError::UnsupportedType`] unless `mime` starts with
/// `image/`.
pub fn validate_mime(mime: &str) -> Result<(), EngineError> {
    if mime.trim().to_ascii_lowercase().starts_with("image/") {
        Ok(())
    } else {
        Err(EngineError::UnsupportedType(mime.to_owned()))
    }
}

/// Decode raw image bytes into straight RGBA.
///
/// # Errors
///
/// Returns [`EngineError::EmptyInput`] if `bytes` is empty.
/// Returns [`EngineError::ImageDecode`] if the format is unrecognized or
/// the data is corrupt.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// An image held by the document, either still encoded or decoded.
///
/// Cloning is cheap: both variants share their data through an [`Arc`].
#[derive(Clone)]
pub enum ImageAsset {
    /// Encoded bytes (PNG, JPEG, ...) as received from a provider.
    Encoded(Arc<[u8]>),
    /// Decoded straight-RGBA pixels.
    Decoded(Arc<RgbaImage>),
}

impl ImageAsset {
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::Encoded(bytes.into())
    }

    #[must_use]
    pub fn from_image(image: RgbaImage) -> Self {
        Self::Decoded(Arc::new(image))
    }

    /// Decode (or share) the pixels of this asset.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AssetDecode`] tagged with `asset` when the
    /// encoded bytes cannot be decoded.
    pub fn decode(&self, asset: Asset) -> Result<Arc<RgbaImage>, EngineError> {
        match self {
            Self::Decoded(image) => Ok(Arc::clone(image)),
            Self::Encoded(bytes) => image::load_from_memory(bytes)
                .map(|img| Arc::new(img.to_rgba8()))
                .map_err(|source| EngineError::AssetDecode { asset, source }),
        }
    }

    /// Dimensions, when known without decoding.
    #[must_use]
    pub fn known_dimensions(&self) -> Option<Dimensions> {
        match self {
            Self::Decoded(image) => Some(Dimensions::of(image.as_ref())),
            Self::Encoded(_) => None,
        }
    }

    /// Identity of the shared buffer, used in render cache keys.
    ///
    /// Two clones of the same asset share an identity; a freshly
    /// uploaded or re-detected asset gets a new one.
    #[must_use]
    pub fn identity(&self) -> usize {
        match self {
            Self::Encoded(bytes) => bytes.as_ptr() as usize,
            Self::Decoded(image) => Arc::as_ptr(image) as usize,
        }
    }
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoded(bytes) => write!(f, "ImageAsset::Encoded({} bytes)", bytes.len()),
            Self::Decoded(image) => write!(
                f,
                "ImageAsset::Decoded({}x{})",
                image.width(),
                image.height()
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn mime_for_known_extensions() {
        assert_eq!(mime_for_filename("photo.JPG"), Some("image/jpeg"));
        assert_eq!(mime_for_filename("a.b.png"), Some("image/png"));
        assert_eq!(mime_for_filename("notes.txt"), None);
        assert_eq!(mime_for_filename("no_extension"), None);
    }

    #[test]
    fn validate_mime_accepts_images_only() {
        assert!(validate_mime("image/png").is_ok());
        assert!(validate_mime("IMAGE/webp").is_ok());
        assert!(matches!(
            validate_mime("application/pdf"),
            Err(EngineError::UnsupportedType(t)) if t == "application/pdf"
        ));
        assert!(validate_mime("").is_err());
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode_image(&[]), Err(EngineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_return_decode_error() {
        assert!(matches!(
            decode_image(&[0xFF, 0xFE, 0x00, 0x01]),
            Err(EngineError::ImageDecode(_))
        ));
    }

    #[test]
    fn valid_png_decodes() {
        let img = RgbaImage::from_fn(3, 2, |x, _| image::Rgba([x as u8 * 50, 0, 0, 255]));
        let decoded = decode_image(&png_bytes(&img)).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn encoded_asset_decodes_lazily() {
        let img = RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 4]));
        let asset = ImageAsset::from_bytes(png_bytes(&img));
        assert_eq!(asset.known_dimensions(), None);
        assert_eq!(*asset.decode(Asset::Foreground).unwrap(), img);
    }

    #[test]
    fn corrupt_asset_reports_which_asset() {
        let asset = ImageAsset::from_bytes(vec![0, 1, 2, 3]);
        let err = asset.decode(Asset::Background).unwrap_err();
        assert!(matches!(
            err,
            EngineError::AssetDecode {
                asset: Asset::Background,
                ..
            }
        ));
    }

    #[test]
    fn clones_share_identity() {
        let asset = ImageAsset::from_image(RgbaImage::new(1, 1));
        let other = ImageAsset::from_image(RgbaImage::new(1, 1));
        assert_eq!(asset.identity(), asset.clone().identity());
        assert_ne!(asset.identity(), other.identity());
    }
}
