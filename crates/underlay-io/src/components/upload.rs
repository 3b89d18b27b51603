//! File upload component with drag-and-drop and file picker.

use dioxus::html::{FileData, HasFileData};
use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::LdUpload;
use underlay_engine::decode::{IMAGE_EXTENSIONS, mime_for_filename};

/// MIME type reported for files without a recognized image extension.
/// The editor rejects it, so the user sees an "unsupported type" error.
const UNKNOWN_MIME: &str = "application/octet-stream";

/// A file the user picked, read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub name: String,
    pub mime: String,
}

/// Props for the [`FileUpload`] component.
#[derive(Props, Clone, PartialEq)]
pub struct FileUploadProps {
    /// Called when a file has been chosen, before its bytes are read.
    on_start: EventHandler<()>,
    /// Called with the file once its bytes are read.
    on_upload: EventHandler<UploadedFile>,
    /// Called when reading the file fails.
    on_error: EventHandler<String>,
    /// Compact single-button rendering for use once an image is loaded.
    #[props(default)]
    compact: bool,
}

/// A drag-and-drop zone with a file picker button.
///
/// Type validation happens in the editor session; this component only
/// derives the MIME type from the file extension.
#[component]
pub fn FileUpload(props: FileUploadProps) -> Element {
    let mut dragging = use_signal(|| false);

    let process_files = move |files: Vec<FileData>| async move {
        if let Some(file) = files.first() {
            let name = file.name();
            props.on_start.call(());
            match file.read_bytes().await {
                Ok(bytes) => {
                    let mime = mime_for_filename(&name).unwrap_or(UNKNOWN_MIME).to_owned();
                    props.on_upload.call(UploadedFile {
                        bytes: bytes.to_vec(),
                        name,
                        mime,
                    });
                }
                Err(e) => {
                    props.on_error.call(format!("Failed to read file: {e}"));
                }
            }
        }
    };

    let handle_files = move |evt: FormEvent| async move {
        process_files(evt.files()).await;
    };

    let handle_drop = move |evt: DragEvent| async move {
        evt.prevent_default();
        dragging.set(false);
        process_files(evt.files()).await;
    };

    let accept = IMAGE_EXTENSIONS
        .iter()
        .map(|(ext, _)| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",");

    let picker = rsx! {
        label {
            class: "inline-flex items-center gap-2 px-4 py-2 bg-[var(--btn-primary)] hover:bg-[var(--btn-primary-hover)] rounded cursor-pointer text-white font-medium transition-colors",
            input {
                r#type: "file",
                accept: "{accept}",
                class: "hidden",
                onchange: handle_files,
            }
            Icon { width: 16, height: 16, icon: LdUpload }
            if props.compact { "Change Image" } else { "Upload Image" }
        }
    };

    if props.compact {
        return picker;
    }

    let border_class = if dragging() {
        "border-[var(--border-accent)] bg-[var(--surface-active)]"
    } else {
        "border-[var(--border-muted)] bg-[var(--surface)]"
    };

    rsx! {
        div {
            class: "border-2 border-dashed rounded-lg p-10 text-center transition-colors {border_class}",
            ondragover: move |evt| {
                evt.prevent_default();
                dragging.set(true);
            },
            ondragleave: move |_| {
                dragging.set(false);
            },
            ondrop: handle_drop,

            p { class: "text-[var(--text-secondary)] mb-3",
                "Drop a photo here or "
            }
            {picker}
            p { class: "text-[var(--muted)] text-sm mt-2",
                "PNG, JPEG, BMP, WebP, GIF"
            }
        }
    }
}
