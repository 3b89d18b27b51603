//! Raster image encoding and Blob URL creation.
//!
//! Converts rendered previews to browser-displayable Blob URLs by
//! encoding to PNG and creating object URLs via the Web API.

use underlay_engine::RgbaImage;
use underlay_engine::raster::encode_png;
use wasm_bindgen::JsValue;
use web_sys::BlobPropertyBag;

/// Errors that can occur during raster-to-Blob-URL conversion.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    PngEncode(String),

    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),
}

impl From<JsValue> for RasterError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

impl From<underlay_engine::EngineError> for RasterError {
    fn from(err: underlay_engine::EngineError) -> Self {
        Self::PngEncode(err.to_string())
    }
}

/// Encode an RGBA image as a PNG Blob URL for use as an `<img src>`.
///
/// The returned URL must be revoked via [`revoke_blob_url`] when no
/// longer needed to avoid memory leaks.
///
/// # Errors
///
/// Returns [`RasterError::PngEncode`] if PNG encoding fails.
/// Returns [`RasterError::JsError`] if Blob or URL creation fails.
pub fn rgba_image_to_blob_url(image: &RgbaImage) -> Result<String, RasterError> {
    let png_bytes = encode_png(image)?;
    png_bytes_to_blob_url(&png_bytes)
}

/// Wrap already-encoded PNG bytes in a Blob URL.
///
/// # Errors
///
/// Returns [`RasterError::JsError`] if Blob or URL creation fails.
pub fn png_bytes_to_blob_url(png_bytes: &[u8]) -> Result<String, RasterError> {
    bytes_to_blob_url(png_bytes, "image/png")
}

/// Wrap encoded bytes of the given MIME type in a Blob URL.
///
/// # Errors
///
/// Returns [`RasterError::JsError`] if Blob or URL creation fails.
pub fn bytes_to_blob_url(bytes: &[u8], mime: &str) -> Result<String, RasterError> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(bytes));

    let opts = BlobPropertyBag::new();
    opts.set_type(mime);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &opts)?;

    Ok(web_sys::Url::create_object_url_with_blob(&blob)?)
}

/// Revoke a Blob URL previously created by this module.
///
/// Failures are ignored; a stale URL only costs memory.
pub fn revoke_blob_url(url: &str) {
    let _ = web_sys::Url::revoke_object_url(url);
}
