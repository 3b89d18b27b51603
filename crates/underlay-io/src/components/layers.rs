//! Text tab: layer list and per-layer style controls.

use dioxus::prelude::*;
use dioxus_free_icons::Icon;
use dioxus_free_icons::icons::ld_icons::{LdCopy, LdPlus, LdRedo2, LdTrash2, LdUndo2};
use underlay_engine::FONT_FAMILIES;
use underlay_engine::layer::{
    GradientPatch, MAX_ROTATION, MAX_SHADOW_BLUR, MAX_SHADOW_OFFSET, MAX_SIZE, MIN_ROTATION,
    MIN_SIZE, PositionPatch, ShadowPatch,
};
use underlay_engine::{LayerId, LayerProperty, TextAlign, TextLayer};

use super::controls::{render_color, render_select, render_slider, render_text_input, render_toggle};

/// A property write addressed to a layer.
pub type LayerEdit = (LayerId, LayerProperty);

/// Props for the [`LayerPanel`] component.
#[derive(Props, Clone, PartialEq)]
pub struct LayerPanelProps {
    layers: Vec<TextLayer>,
    /// The layer whose controls are shown.
    selected: TextLayer,
    can_undo: bool,
    can_redo: bool,
    on_select: EventHandler<LayerId>,
    on_create: EventHandler<()>,
    on_duplicate: EventHandler<LayerId>,
    on_delete: EventHandler<LayerId>,
    on_undo: EventHandler<()>,
    on_redo: EventHandler<()>,
    /// Discrete edits (toggles, selects); each is one undo step.
    on_change: EventHandler<LayerEdit>,
    /// Continuous edits (sliders, typing, color drags); coalesced into
    /// one undo step once input pauses.
    on_live: EventHandler<LayerEdit>,
}

/// Layer list with add/duplicate/delete and undo/redo, followed by the
/// selected layer's style controls.
#[component]
#[allow(clippy::too_many_lines)]
pub fn LayerPanel(props: LayerPanelProps) -> Element {
    let layer = props.selected.clone();
    let id = layer.id;
    let live = props.on_live;
    let change = props.on_change;

    let icon_button = "p-2 rounded hover:bg-[var(--surface-active)] disabled:opacity-40 disabled:cursor-not-allowed";

    let family_options: Vec<(&str, &str)> = FONT_FAMILIES
        .iter()
        .map(|(label, list)| (*list, *label))
        .collect();
    let align_options: Vec<(&str, &str)> = TextAlign::ALL
        .iter()
        .map(|a| (a.label(), a.label()))
        .collect();

    rsx! {
        div { class: "space-y-4",
            div { class: "flex items-center gap-1",
                button {
                    class: "{icon_button}",
                    title: "Add text",
                    onclick: move |_| props.on_create.call(()),
                    Icon { width: 16, height: 16, icon: LdPlus }
                }
                button {
                    class: "{icon_button}",
                    title: "Duplicate",
                    disabled: props.layers.is_empty(),
                    onclick: move |_| props.on_duplicate.call(id),
                    Icon { width: 16, height: 16, icon: LdCopy }
                }
                button {
                    class: "{icon_button}",
                    title: "Delete",
                    disabled: props.layers.is_empty(),
                    onclick: move |_| props.on_delete.call(id),
                    Icon { width: 16, height: 16, icon: LdTrash2 }
                }
                div { class: "flex-1" }
                button {
                    class: "{icon_button}",
                    title: "Undo",
                    disabled: !props.can_undo,
                    onclick: move |_| props.on_undo.call(()),
                    Icon { width: 16, height: 16, icon: LdUndo2 }
                }
                button {
                    class: "{icon_button}",
                    title: "Redo",
                    disabled: !props.can_redo,
                    onclick: move |_| props.on_redo.call(()),
                    Icon { width: 16, height: 16, icon: LdRedo2 }
                }
            }

            ul { class: "space-y-1 max-h-40 overflow-y-auto",
                for l in props.layers.iter() {
                    {
                        let lid = l.id;
                        let active = lid == id;
                        let class = if active {
                            "bg-[var(--surface-active)] text-[var(--text-heading)]"
                        } else {
                            "hover:bg-[var(--surface)] text-[var(--text-secondary)]"
                        };
                        rsx! {
                            li {
                                key: "{lid}",
                                class: "px-2 py-1 rounded cursor-pointer truncate {class}",
                                onclick: move |_| props.on_select.call(lid),
                                "{l.content}"
                            }
                        }
                    }
                }
            }

            if props.layers.is_empty() {
                p { class: "text-sm text-[var(--text-secondary)] italic",
                    "No text yet. Add some to get started."
                }
            } else {
                div { class: "space-y-3",
                    {render_text_input("layer_content", "Text", &layer.content, move |v| {
                        live.call((id, LayerProperty::Content(v)));
                    })}
                    {render_select(
                        "layer_font",
                        "Font",
                        &family_options,
                        &layer.font_family,
                        move |v| change.call((id, LayerProperty::FontFamily(v))),
                    )}
                    {render_color("layer_color", "Color", layer.color, move |c| {
                        live.call((id, LayerProperty::Color(c)));
                    })}
                    {render_slider("layer_size", "Size", layer.size, MIN_SIZE, MAX_SIZE, 1.0, 0, move |v| {
                        live.call((id, LayerProperty::Size(v)));
                    })}
                    {render_slider(
                        "layer_rotation",
                        "Rotation",
                        layer.rotation,
                        MIN_ROTATION,
                        MAX_ROTATION,
                        1.0,
                        0,
                        move |v| live.call((id, LayerProperty::Rotation(v))),
                    )}
                    {render_slider("layer_x", "Horizontal", layer.position.x, 0.0, 100.0, 0.5, 1, move |v| {
                        live.call((id, LayerProperty::Position(PositionPatch { x: Some(v), y: None })));
                    })}
                    {render_slider("layer_y", "Vertical", layer.position.y, 0.0, 100.0, 0.5, 1, move |v| {
                        live.call((id, LayerProperty::Position(PositionPatch { x: None, y: Some(v) })));
                    })}
                    {render_slider("layer_opacity", "Opacity", layer.opacity, 0.0, 1.0, 0.01, 2, move |v| {
                        live.call((id, LayerProperty::Opacity(v)));
                    })}
                    {render_select(
                        "layer_align",
                        "Alignment",
                        &align_options,
                        layer.text_align.label(),
                        move |v| {
                            if let Some(align) = TextAlign::ALL.into_iter().find(|a| a.label() == v) {
                                change.call((id, LayerProperty::TextAlign(align)));
                            }
                        },
                    )}
                    div { class: "grid grid-cols-3 gap-2",
                        {render_toggle("layer_bold", "Bold", layer.is_bold, move |v| {
                            change.call((id, LayerProperty::Bold(v)));
                        })}
                        {render_toggle("layer_italic", "Italic", layer.is_italic, move |v| {
                            change.call((id, LayerProperty::Italic(v)));
                        })}
                        {render_toggle("layer_underline", "Underline", layer.is_underlined, move |v| {
                            change.call((id, LayerProperty::Underlined(v)));
                        })}
                    }

                    div { class: "pt-2 border-t border-[var(--border)] space-y-2",
                        {render_toggle("shadow_enabled", "Shadow", layer.text_shadow.enabled, move |v| {
                            change.call((id, LayerProperty::Shadow(ShadowPatch { enabled: Some(v), ..ShadowPatch::default() })));
                        })}
                        if layer.text_shadow.enabled {
                            {render_color("shadow_color", "Shadow Color", layer.text_shadow.color, move |c| {
                                live.call((id, LayerProperty::Shadow(ShadowPatch { color: Some(c), ..ShadowPatch::default() })));
                            })}
                            {render_slider("shadow_blur", "Shadow Blur", layer.text_shadow.blur, 0.0, MAX_SHADOW_BLUR, 1.0, 0, move |v| {
                                live.call((id, LayerProperty::Shadow(ShadowPatch { blur: Some(v), ..ShadowPatch::default() })));
                            })}
                            {render_slider("shadow_x", "Shadow X", layer.text_shadow.offset_x, -MAX_SHADOW_OFFSET, MAX_SHADOW_OFFSET, 1.0, 0, move |v| {
                                live.call((id, LayerProperty::Shadow(ShadowPatch { offset_x: Some(v), ..ShadowPatch::default() })));
                            })}
                            {render_slider("shadow_y", "Shadow Y", layer.text_shadow.offset_y, -MAX_SHADOW_OFFSET, MAX_SHADOW_OFFSET, 1.0, 0, move |v| {
                                live.call((id, LayerProperty::Shadow(ShadowPatch { offset_y: Some(v), ..ShadowPatch::default() })));
                            })}
                        }
                    }

                    div { class: "pt-2 border-t border-[var(--border)] space-y-2",
                        {render_toggle("gradient_enabled", "Gradient", layer.gradient.enabled, move |v| {
                            change.call((id, LayerProperty::Gradient(GradientPatch { enabled: Some(v), ..GradientPatch::default() })));
                        })}
                        if layer.gradient.enabled {
                            {render_color("gradient_top", "Top", layer.gradient.color1, move |c| {
                                live.call((id, LayerProperty::Gradient(GradientPatch { color1: Some(c), ..GradientPatch::default() })));
                            })}
                            {render_color("gradient_bottom", "Bottom", layer.gradient.color2, move |c| {
                                live.call((id, LayerProperty::Gradient(GradientPatch { color2: Some(c), ..GradientPatch::default() })));
                            })}
                        }
                    }
                }
            }
        }
    }
}
