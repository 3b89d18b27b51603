//! underlay-engine: document model and compositing renderers (sans-IO).
//!
//! Places styled text behind a photo's subject, over it, or along its
//! outline:
//!
//! background -> adjustments -> text layers -> subject cutout -> PNG
//!
//! This crate has **no I/O dependencies**. Images arrive as bytes or
//! decoded buffers, subject masks come from a [`MaskProvider`], and
//! exports leave as PNG bytes. All browser/filesystem interaction lives
//! in `underlay-io` and the binaries.

pub mod adjust;
pub mod contour;
pub mod coords;
pub mod decode;
pub mod document;
pub mod export;
pub mod font;
pub mod history;
pub mod interactive;
pub mod layer;
pub mod mask;
pub mod overlay;
pub mod raster;
pub mod render;
pub mod session;
pub mod silhouette;
pub mod text;
pub mod types;

pub use adjust::Adjustments;
pub use contour::{ContourTracer, GreedyBoundaryTracer, SilhouetteError};
pub use coords::{AspectRatio, CoordinateMapper, Surface};
pub use decode::ImageAsset;
pub use document::{Document, SceneSnapshot};
pub use export::{EXPORT_FILENAME, ExportRenderer, ExportedImage};
pub use font::{FONT_FAMILIES, FontBook, Typeface};
pub use interactive::InteractiveRenderer;
pub use layer::{LayerId, LayerProperty, NormalizedPosition, TextAlign, TextLayer};
pub use mask::{MaskError, MaskProvider, Subject, SubjectMask, SubjectOutcome};
pub use overlay::OverlayConfig;
pub use render::{RenderPass, RenderPlan};
pub use session::{EditorSession, EditorState, EditorTab, UiFlags, UploadTicket};
pub use silhouette::SilhouetteConfig;
pub use types::{Color, Dimensions, EngineError, Point, Polyline, RgbaImage};

/// Render and encode a snapshot at full resolution.
///
/// `preview` is the surface the layers were positioned on; magnitudes
/// are scaled from it to the background's native size.
///
/// # Errors
///
/// Returns [`EngineError::NoImage`] without a background,
/// [`EngineError::AssetDecode`] if an image asset is corrupt, and
/// [`EngineError::Encode`] if PNG encoding fails.
pub fn export_png(
    snapshot: &SceneSnapshot,
    preview: Surface,
    fonts: &FontBook,
) -> Result<ExportedImage, EngineError> {
    ExportRenderer::new(fonts).export(snapshot, preview)
}
