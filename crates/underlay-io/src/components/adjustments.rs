//! Image tab: background adjustments, aspect ratio, and re-detection.

use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::{LdRotateCcw, LdScanFace};
use underlay_engine::adjust::{MAX_ADJUSTMENT, MIN_ADJUSTMENT};
use underlay_engine::{Adjustments, AspectRatio};

use super::controls::{render_select, render_slider};

/// Props for the [`AdjustmentsPanel`] component.
#[derive(Props, Clone, PartialEq)]
pub struct AdjustmentsPanelProps {
    adjustments: Adjustments,
    aspect_ratio: AspectRatio,
    /// Subject detection is running.
    detecting: bool,
    on_adjust: EventHandler<Adjustments>,
    on_aspect_ratio: EventHandler<AspectRatio>,
    on_redetect: EventHandler<()>,
}

/// Brightness/contrast/sharpness sliders, the preview aspect ratio, and
/// a button to run subject detection again.
#[component]
pub fn AdjustmentsPanel(props: AdjustmentsPanelProps) -> Element {
    let adj = props.adjustments;
    let on_adjust = props.on_adjust;
    let ratio_options: Vec<(&str, &str)> = AspectRatio::ALL
        .iter()
        .map(|r| (r.label(), r.label()))
        .collect();

    rsx! {
        div { class: "space-y-3",
            {render_slider("brightness", "Brightness", adj.brightness, MIN_ADJUSTMENT, MAX_ADJUSTMENT, 1.0, 0, move |v| {
                on_adjust.call(Adjustments { brightness: v, ..adj });
            })}
            {render_slider("contrast", "Contrast", adj.contrast, MIN_ADJUSTMENT, MAX_ADJUSTMENT, 1.0, 0, move |v| {
                on_adjust.call(Adjustments { contrast: v, ..adj });
            })}
            {render_slider("sharpness", "Sharpness", adj.sharpness, MIN_ADJUSTMENT, MAX_ADJUSTMENT, 1.0, 0, move |v| {
                on_adjust.call(Adjustments { sharpness: v, ..adj });
            })}
            div { class: "flex gap-2",
                button {
                    class: "inline-flex items-center gap-1 px-3 py-1 text-sm rounded border border-[var(--border)] hover:bg-[var(--surface-active)] disabled:opacity-40",
                    disabled: adj.is_neutral(),
                    onclick: move |_| on_adjust.call(Adjustments::default()),
                    Icon { width: 14, height: 14, icon: LdRotateCcw }
                    "Reset"
                }
                button {
                    class: "inline-flex items-center gap-1 px-3 py-1 text-sm rounded border border-[var(--border)] hover:bg-[var(--surface-active)] disabled:opacity-40",
                    disabled: props.detecting,
                    onclick: move |_| props.on_redetect.call(()),
                    Icon { width: 14, height: 14, icon: LdScanFace }
                    if props.detecting { "Detecting..." } else { "Detect Subject Again" }
                }
            }
            {render_select(
                "aspect_ratio",
                "Aspect Ratio",
                &ratio_options,
                props.aspect_ratio.label(),
                move |v| {
                    if let Some(ratio) = AspectRatio::from_label(&v) {
                        props.on_aspect_ratio.call(ratio);
                    }
                },
            )}
        }
    }
}
