//! Font loading for the browser.
//!
//! Canvas text in the editor is rasterised by the engine, not the browser,
//! so font files have to be fetched as bytes and registered in a
//! [`FontBook`]. Families that fail to load fall back through the book's
//! generic families to the built-in block face.

use underlay_engine::FontBook;
use underlay_engine::font::GenericFamily;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

/// A font file served alongside the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSource {
    /// Family name as it appears in font lists.
    pub family: &'static str,
    /// URL relative to the page.
    pub url: &'static str,
    /// Generic family this face should also answer for.
    pub generic: Option<GenericFamily>,
}

/// Errors from fetching a font.
#[derive(Debug, thiserror::Error)]
pub enum FontLoadError {
    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// The bytes are not a usable font.
    #[error(transparent)]
    Parse(#[from] underlay_engine::font::FontError),
}

impl From<JsValue> for FontLoadError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

/// Fetch a URL and return the response body.
///
/// # Errors
///
/// Returns [`FontLoadError::JsError`] if the request fails and
/// [`FontLoadError::Status`] for non-2xx responses.
#[allow(clippy::future_not_send)] // WASM is single-threaded; Send is not needed
pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, FontLoadError> {
    let window =
        web_sys::window().ok_or_else(|| FontLoadError::JsError("no global window".into()))?;
    let response: web_sys::Response = JsFuture::from(window.fetch_with_str(url))
        .await?
        .dyn_into()
        .map_err(|e| FontLoadError::JsError(format!("not a Response: {e:?}")))?;
    if !response.ok() {
        return Err(FontLoadError::Status {
            url: url.to_owned(),
            status: response.status(),
        });
    }
    let buffer = JsFuture::from(response.array_buffer()?).await?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

/// Fetch every source into a new book.
///
/// Failures are logged to the console and skipped; the book still
/// resolves every family through its fallbacks.
#[allow(clippy::future_not_send)]
pub async fn load_fonts(sources: &[FontSource]) -> FontBook {
    let mut book = FontBook::new();
    for source in sources {
        let loaded = async {
            let bytes = fetch_bytes(source.url).await?;
            book.register_bytes(source.family, bytes)?;
            Ok::<_, FontLoadError>(())
        };
        match loaded.await {
            Ok(()) => {
                if let Some(generic) = source.generic {
                    let _ = book.set_generic(generic, source.family);
                }
            }
            Err(e) => {
                web_sys::console::warn_1(
                    &format!("font {} unavailable: {e}", source.family).into(),
                );
            }
        }
    }
    tracing::info!(faces = book.len(), "fonts loaded");
    book
}
