//! Saving exports to the user's machine.
//!
//! The browser has no "save file" call, so an export is wrapped in a
//! Blob URL and handed to a temporary `<a download>` that is clicked and
//! removed again. Requires a browser environment.

use underlay_engine::ExportedImage;
use underlay_engine::decode::mime_for_filename;
use wasm_bindgen::JsCast;

use crate::raster::{RasterError, bytes_to_blob_url, revoke_blob_url};

/// Why an export could not be handed to the browser.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("no document to attach the download link to")]
    NoDocument,

    #[error("could not create the download file: {0}")]
    Blob(#[from] RasterError),

    #[error("download link failed: {0}")]
    Link(String),
}

/// Content type announced for an export, from its filename.
#[must_use]
pub fn content_type(exported: &ExportedImage) -> &'static str {
    mime_for_filename(&exported.filename).unwrap_or("application/octet-stream")
}

/// Offer `exported` as a download under its own filename.
///
/// # Errors
///
/// Returns [`DownloadError::NoDocument`] outside a page,
/// [`DownloadError::Blob`] if the file cannot be created, and
/// [`DownloadError::Link`] if the link cannot be inserted.
pub fn download_export(exported: &ExportedImage) -> Result<(), DownloadError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or(DownloadError::NoDocument)?;
    let body = document.body().ok_or(DownloadError::NoDocument)?;

    let url = bytes_to_blob_url(&exported.png, content_type(exported))?;
    let clicked = document
        .create_element("a")
        .map_err(|e| DownloadError::Link(format!("{e:?}")))
        .and_then(|el| {
            el.dyn_into::<web_sys::HtmlAnchorElement>()
                .map_err(|_| DownloadError::Link("not an anchor element".to_owned()))
        })
        .and_then(|anchor| {
            anchor.set_href(&url);
            anchor.set_download(&exported.filename);
            body.append_child(&anchor)
                .map_err(|e| DownloadError::Link(format!("{e:?}")))?;
            anchor.click();
            let _ = body.remove_child(&anchor);
            Ok(())
        });
    revoke_blob_url(&url);
    tracing::info!(
        filename = %exported.filename,
        bytes = exported.png.len(),
        dimensions = %exported.dimensions,
        "export downloaded"
    );
    clicked
}
