//! Dioxus UI components for underlay.
//!
//! Provides the upload zone, the interactive canvas, the Text and Image
//! tab panels, the mode selector with its settings, the export panel,
//! and page chrome.

mod adjustments;
mod canvas;
mod chrome;
mod controls;
mod export;
mod layers;
mod modes;
mod upload;

pub use adjustments::AdjustmentsPanel;
pub use canvas::{EditorCanvas, FALLBACK_WIDTH};
pub use chrome::{Banner, Navbar, Onboarding};
pub use export::ExportPanel;
pub use layers::{LayerEdit, LayerPanel};
pub use modes::{ModePreview, ModeTabs, OverlayControls, SilhouetteControls};
pub use upload::{FileUpload, UploadedFile};
