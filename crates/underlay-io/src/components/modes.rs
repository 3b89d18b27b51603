//! Mode selector and the settings panels for the single-string modes.

use std::rc::Rc;

use dioxus::prelude::*;
use underlay_engine::overlay::{MAX_FONT_SIZE as UPON_MAX, MAX_OUTLINE_WIDTH, MIN_FONT_SIZE as UPON_MIN};
use underlay_engine::silhouette::{
    MAX_DISTANCE, MAX_FONT_SIZE as BORDER_MAX, MAX_SPACING, MIN_DISTANCE,
    MIN_FONT_SIZE as BORDER_MIN, MIN_SPACING,
};
use underlay_engine::{FONT_FAMILIES, OverlayConfig, RgbaImage, SilhouetteConfig};

use super::controls::{render_color, render_select, render_slider, render_text_input, render_toggle};
use crate::mode::CompositeMode;
use crate::raster;

/// Props for the [`ModeTabs`] component.
#[derive(Props, Clone, PartialEq)]
pub struct ModeTabsProps {
    selected: CompositeMode,
    on_select: EventHandler<CompositeMode>,
}

/// Segmented control switching between composition modes.
#[component]
pub fn ModeTabs(props: ModeTabsProps) -> Element {
    rsx! {
        div { class: "flex rounded border border-[var(--border)] overflow-hidden",
            for mode in CompositeMode::ALL {
                button {
                    key: "{mode:?}",
                    class: if mode == props.selected {
                        "flex-1 px-3 py-2 text-sm bg-[var(--btn-primary)] text-white"
                    } else {
                        "flex-1 px-3 py-2 text-sm hover:bg-[var(--surface-active)]"
                    },
                    title: mode.description(),
                    onclick: move |_| props.on_select.call(mode),
                    "{mode}"
                }
            }
        }
    }
}

fn family_options() -> Vec<(&'static str, &'static str)> {
    FONT_FAMILIES.iter().map(|(label, list)| (*list, *label)).collect()
}

/// Props for the [`OverlayControls`] component.
#[derive(Props, Clone, PartialEq)]
pub struct OverlayControlsProps {
    config: OverlayConfig,
    on_change: EventHandler<OverlayConfig>,
}

/// Settings for the text-upon-image mode.
#[component]
pub fn OverlayControls(props: OverlayControlsProps) -> Element {
    let config = props.config.clone();
    let on_change = props.on_change;
    let families = family_options();
    let config_text = config.clone();
    let config_font = config.clone();
    let config_color = config.clone();
    let config_size = config.clone();
    let config_outline = config.clone();
    let config_x = config.clone();
    let config_y = config.clone();
    let config_bold = config.clone();

    rsx! {
        div { class: "space-y-3",
            {render_text_input("upon_text", "Text", &config.text, move |v| {
                on_change.call(OverlayConfig { text: v, ..config_text.clone() });
            })}
            {render_select("upon_font", "Font", &families, &config.font_family, move |v| {
                on_change.call(OverlayConfig { font_family: v, ..config_font.clone() });
            })}
            {render_color("upon_color", "Color", config.color, move |c| {
                on_change.call(OverlayConfig { color: c, ..config_color.clone() });
            })}
            {render_slider("upon_size", "Size", config.font_size, UPON_MIN, UPON_MAX, 1.0, 0, move |v| {
                on_change.call(OverlayConfig { font_size: v, ..config_size.clone() });
            })}
            {render_slider("upon_outline", "Outline", config.outline_width, 0.0, MAX_OUTLINE_WIDTH, 1.0, 0, move |v| {
                on_change.call(OverlayConfig { outline_width: v, ..config_outline.clone() });
            })}
            {render_slider("upon_x", "Horizontal", config.position.x, 0.0, 100.0, 0.5, 1, move |v| {
                let mut next = config_x.clone();
                next.position.x = v;
                on_change.call(next);
            })}
            {render_slider("upon_y", "Vertical", config.position.y, 0.0, 100.0, 0.5, 1, move |v| {
                let mut next = config_y.clone();
                next.position.y = v;
                on_change.call(next);
            })}
            {render_toggle("upon_bold", "Bold", config.bold, move |v| {
                on_change.call(OverlayConfig { bold: v, ..config_bold.clone() });
            })}
        }
    }
}

/// Props for the [`SilhouetteControls`] component.
#[derive(Props, Clone, PartialEq)]
pub struct SilhouetteControlsProps {
    config: SilhouetteConfig,
    on_change: EventHandler<SilhouetteConfig>,
}

/// Settings for the text-border mode.
#[component]
pub fn SilhouetteControls(props: SilhouetteControlsProps) -> Element {
    let config = props.config.clone();
    let on_change = props.on_change;
    let families = family_options();
    let config_text = config.clone();
    let config_font = config.clone();
    let config_color = config.clone();
    let config_size = config.clone();
    let config_spacing = config.clone();
    let config_distance = config.clone();
    let config_rotate = config.clone();

    rsx! {
        div { class: "space-y-3",
            {render_text_input("border_text", "Text", &config.text, move |v| {
                on_change.call(SilhouetteConfig { text: v, ..config_text.clone() });
            })}
            {render_select("border_font", "Font", &families, &config.font_family, move |v| {
                on_change.call(SilhouetteConfig { font_family: v, ..config_font.clone() });
            })}
            {render_color("border_color", "Color", config.color, move |c| {
                on_change.call(SilhouetteConfig { color: c, ..config_color.clone() });
            })}
            {render_slider("border_size", "Font Size", config.font_size, BORDER_MIN, BORDER_MAX, 1.0, 0, move |v| {
                on_change.call(SilhouetteConfig { font_size: v, ..config_size.clone() });
            })}
            {render_slider("border_spacing", "Spacing", config.spacing, MIN_SPACING, MAX_SPACING, 1.0, 0, move |v| {
                on_change.call(SilhouetteConfig { spacing: v, ..config_spacing.clone() });
            })}
            {render_slider("border_distance", "Distance", config.distance, MIN_DISTANCE, MAX_DISTANCE, 1.0, 0, move |v| {
                on_change.call(SilhouetteConfig { distance: v, ..config_distance.clone() });
            })}
            {render_toggle("border_rotate", "Rotate Along Border", config.rotate, move |v| {
                on_change.call(SilhouetteConfig { rotate: v, ..config_rotate.clone() });
            })}
        }
    }
}

/// Props for the [`ModePreview`] component.
#[derive(Props, Clone)]
pub struct ModePreviewProps {
    /// The rendered composition, or the error that prevented it.
    result: Rc<Result<RgbaImage, String>>,
}

impl PartialEq for ModePreviewProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.result, &other.result)
    }
}

/// Shows a finished full-resolution composition scaled to fit.
#[component]
pub fn ModePreview(props: ModePreviewProps) -> Element {
    let mut prev_blob_url: Signal<Option<String>> = use_signal(|| None);

    use_drop(move || {
        if let Some(ref url) = *prev_blob_url.peek() {
            raster::revoke_blob_url(url);
        }
    });

    if let Some(ref prev) = prev_blob_url.take() {
        raster::revoke_blob_url(prev);
    }

    match props.result.as_ref() {
        Ok(image) => match raster::rgba_image_to_blob_url(image) {
            Ok(url) => {
                prev_blob_url.set(Some(url.clone()));
                rsx! {
                    img {
                        src: "{url}",
                        class: "w-full h-auto max-h-[70vh] rounded object-contain bg-[var(--preview-bg)]",
                        alt: "Composition preview",
                    }
                }
            }
            Err(e) => rsx! {
                p { class: "text-[var(--text-error)] text-sm", "Preview failed: {e}" }
            },
        },
        Err(e) => rsx! {
            p { class: "text-[var(--text-error)] text-sm", "{e}" }
        },
    }
}
