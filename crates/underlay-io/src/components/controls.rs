//! Labeled input helpers shared by the control panels.

use dioxus::prelude::*;
use underlay_engine::Color;

/// Render a labeled range slider with a formatted value readout.
#[allow(clippy::too_many_arguments)]
pub(crate) fn render_slider(
    id: &str,
    label: &str,
    value: f64,
    min: f64,
    max: f64,
    step: f64,
    decimals: usize,
    on_input: impl Fn(f64) + 'static,
) -> Element {
    let display = format!("{value:.decimals$}");
    let id = id.to_string();
    let label = label.to_string();

    rsx! {
        div { class: "flex flex-col gap-1",
            div { class: "flex justify-between text-sm",
                label { r#for: "{id}",
                    class: "text-[var(--text-heading)] font-medium",
                    "{label}"
                }
                span { class: "text-[var(--text-secondary)] tabular-nums",
                    "{display}"
                }
            }
            input {
                r#type: "range",
                id: "{id}",
                min: "{min}",
                max: "{max}",
                step: "{step}",
                value: "{value}",
                class: "w-full accent-[var(--btn-primary)]",
                oninput: move |e| {
                    match e.value().parse::<f64>() {
                        Ok(v) => on_input(v),
                        Err(err) => {
                            web_sys::console::warn_1(
                                &format!("slider parse failure: {err:?} from {:?}", e.value())
                                    .into(),
                            );
                        }
                    }
                },
            }
        }
    }
}

/// Render a labeled checkbox.
pub(crate) fn render_toggle(
    id: &str,
    label: &str,
    checked: bool,
    on_change: impl Fn(bool) + 'static,
) -> Element {
    let id = id.to_string();
    let label = label.to_string();

    rsx! {
        div { class: "flex items-center justify-between",
            label { r#for: "{id}",
                class: "text-sm text-[var(--text-heading)] font-medium",
                "{label}"
            }
            input {
                r#type: "checkbox",
                id: "{id}",
                checked: checked,
                class: "w-5 h-5 accent-[var(--btn-primary)]",
                onchange: move |e| {
                    on_change(e.checked());
                },
            }
        }
    }
}

/// Render a labeled `<select>` from `(value, label)` pairs.
pub(crate) fn render_select(
    id: &str,
    label: &str,
    options: &[(&str, &str)],
    selected: &str,
    on_change: impl Fn(String) + 'static,
) -> Element {
    let id = id.to_string();
    let label = label.to_string();
    let options: Vec<(String, String, bool)> = options
        .iter()
        .map(|(value, text)| ((*value).to_string(), (*text).to_string(), *value == selected))
        .collect();

    rsx! {
        div { class: "flex flex-col gap-1",
            label { r#for: "{id}",
                class: "text-sm text-[var(--text-heading)] font-medium",
                "{label}"
            }
            select {
                id: "{id}",
                class: "w-full px-2 py-1 rounded bg-[var(--surface)] border border-[var(--border)] text-[var(--text)]",
                onchange: move |e| on_change(e.value()),
                for (value, text, is_selected) in options {
                    option { value: "{value}", selected: is_selected, "{text}" }
                }
            }
        }
    }
}

/// Render a labeled color picker. Unparseable input is logged and
/// dropped.
pub(crate) fn render_color(
    id: &str,
    label: &str,
    color: Color,
    on_input: impl Fn(Color) + 'static,
) -> Element {
    let id = id.to_string();
    let label = label.to_string();
    let hex = color.to_hex();

    rsx! {
        div { class: "flex items-center justify-between",
            label { r#for: "{id}",
                class: "text-sm text-[var(--text-heading)] font-medium",
                "{label}"
            }
            input {
                r#type: "color",
                id: "{id}",
                value: "{hex}",
                class: "w-10 h-8 rounded cursor-pointer",
                oninput: move |e| {
                    match e.value().parse::<Color>() {
                        Ok(c) => on_input(c),
                        Err(err) => {
                            web_sys::console::warn_1(&format!("{err}").into());
                        }
                    }
                },
            }
        }
    }
}

/// Render a labeled single-line text input.
pub(crate) fn render_text_input(
    id: &str,
    label: &str,
    value: &str,
    on_input: impl Fn(String) + 'static,
) -> Element {
    let id = id.to_string();
    let label = label.to_string();
    let value = value.to_string();

    rsx! {
        div { class: "flex flex-col gap-1",
            label { r#for: "{id}",
                class: "text-sm text-[var(--text-heading)] font-medium",
                "{label}"
            }
            input {
                r#type: "text",
                id: "{id}",
                value: "{value}",
                class: "w-full px-2 py-1 rounded bg-[var(--surface)] border border-[var(--border)] text-[var(--text)]",
                oninput: move |e| on_input(e.value()),
            }
        }
    }
}
