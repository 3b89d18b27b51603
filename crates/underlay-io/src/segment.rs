//! Bridge to the host page's subject segmentation hook.
//!
//! The segmentation model runs in JavaScript. The host page installs
//! `window.underlaySegment(bytes: Uint8Array): Promise<Uint8Array |
//! ArrayBuffer>`, which resolves to a PNG cutout of the subject (alpha 0
//! outside it) at the input's resolution. The mask is the cutout's alpha
//! channel.
//!
//! Any failure here is recoverable: the editor continues with an empty
//! mask and text renders over the whole image.

use underlay_engine::MaskError;
use underlay_engine::RgbaImage;
use underlay_engine::decode::decode_image;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

/// Name of the global the host page installs.
pub const SEGMENT_HOOK: &str = "underlaySegment";

/// Errors from calling the segmentation hook.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No hook is installed on `window`.
    #[error("subject detection is not available in this page")]
    HookMissing,

    /// The hook threw or its promise rejected.
    #[error("subject detection failed: {0}")]
    Rejected(String),

    /// The hook resolved to something other than image bytes.
    #[error("subject detection returned {0}")]
    BadResponse(String),

    /// The returned bytes are not a decodable image.
    #[error("subject cutout could not be decoded: {0}")]
    Decode(#[from] underlay_engine::EngineError),
}

impl From<ProviderError> for MaskError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::HookMissing => Self::Unavailable(err.to_string()),
            ProviderError::Rejected(reason) => Self::Failed(reason),
            ProviderError::BadResponse(_) | ProviderError::Decode(_) => {
                Self::InvalidOutput(err.to_string())
            }
        }
    }
}

fn js_message(value: &JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}

fn hook() -> Result<js_sys::Function, ProviderError> {
    let window = web_sys::window().ok_or(ProviderError::HookMissing)?;
    js_sys::Reflect::get(&window, &JsValue::from_str(SEGMENT_HOOK))
        .ok()
        .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
        .ok_or(ProviderError::HookMissing)
}

/// Whether the host page installed a segmentation hook.
#[must_use]
pub fn is_available() -> bool {
    hook().is_ok()
}

/// Run the hook on encoded image bytes and return the raw cutout bytes.
///
/// # Errors
///
/// See [`ProviderError`].
#[allow(clippy::future_not_send)] // WASM is single-threaded; Send is not needed
pub async fn request_cutout_bytes(image_bytes: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let hook = hook()?;
    let input = js_sys::Uint8Array::from(image_bytes);
    let returned = hook
        .call1(&JsValue::NULL, &input)
        .map_err(|e| ProviderError::Rejected(js_message(&e)))?;

    // Accept both a promise and a plain value.
    let resolved = JsFuture::from(js_sys::Promise::resolve(&returned))
        .await
        .map_err(|e| ProviderError::Rejected(js_message(&e)))?;

    if resolved.is_instance_of::<js_sys::Uint8Array>()
        || resolved.is_instance_of::<js_sys::ArrayBuffer>()
    {
        Ok(js_sys::Uint8Array::new(&resolved).to_vec())
    } else {
        Err(ProviderError::BadResponse(
            resolved
                .js_typeof()
                .as_string()
                .unwrap_or_else(|| "an unknown value".to_owned()),
        ))
    }
}

/// Segment an uploaded image, returning the subject cutout.
///
/// The result is shaped for `EditorSession::complete_cutout`, which
/// degrades to an empty mask on error.
///
/// # Errors
///
/// Returns a [`MaskError`] converted from the [`ProviderError`] that
/// stopped detection.
#[allow(clippy::future_not_send)]
pub async fn detect_cutout(image_bytes: &[u8]) -> Result<RgbaImage, MaskError> {
    let run = async {
        let bytes = request_cutout_bytes(image_bytes).await?;
        Ok::<_, ProviderError>(decode_image(&bytes)?)
    };
    run.await.map_err(|e| {
        web_sys::console::warn_1(&format!("segmentation hook: {e}").into());
        MaskError::from(e)
    })
}
