//! Export panel with the download button.

use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::LdDownload;
use underlay_engine::EXPORT_FILENAME;

/// Props for the [`ExportPanel`] component.
#[derive(Props, Clone, PartialEq)]
pub struct ExportPanelProps {
    /// An image is loaded and can be exported.
    enabled: bool,
    /// An export is being rendered.
    exporting: bool,
    /// Error from the last export attempt.
    error: Option<String>,
    on_export: EventHandler<()>,
}

/// Renders the composition at full resolution and downloads it as
/// `edited-image.png`.
#[component]
pub fn ExportPanel(props: ExportPanelProps) -> Element {
    let active = props.enabled && !props.exporting;

    let enabled_class = "inline-flex items-center gap-2 px-4 py-2 bg-[var(--btn-primary)] hover:bg-[var(--btn-primary-hover)] rounded text-white font-medium transition-colors cursor-pointer";
    let disabled_class = "inline-flex items-center gap-2 px-4 py-2 bg-[var(--btn-disabled)] rounded text-[var(--text-disabled)] cursor-not-allowed";

    rsx! {
        div { class: "space-y-3",
            h3 { class: "text-lg font-semibold text-[var(--text-heading)]", "Export" }

            if let Some(ref err) = props.error {
                p { class: "text-[var(--text-error)] text-sm", "{err}" }
            }

            button {
                class: if active { enabled_class } else { disabled_class },
                disabled: !active,
                onclick: move |_| props.on_export.call(()),
                Icon { width: 16, height: 16, icon: LdDownload }
                if props.exporting { "Exporting..." } else { "Download PNG" }
            }

            p { class: "text-[var(--muted)] text-xs",
                "Saved as {EXPORT_FILENAME} at the photo's full resolution."
            }
        }
    }
}
