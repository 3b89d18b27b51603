//! underlay-io: Browser I/O and Dioxus component library.
//!
//! Handles file uploads, the bridge to the page's segmentation hook,
//! font fetching, Blob downloads, and provides the UI components for the
//! underlay web application.

pub mod account;
pub mod components;
pub mod download;
pub mod fonts;
pub mod mode;
pub mod raster;
pub mod segment;

pub use account::Session;
pub use components::{
    AdjustmentsPanel, Banner, EditorCanvas, ExportPanel, FileUpload, LayerEdit, LayerPanel,
    ModePreview, ModeTabs, Navbar, Onboarding, OverlayControls, SilhouetteControls, UploadedFile,
};
pub use mode::CompositeMode;
pub use segment::ProviderError;
