use std::rc::Rc;

use dioxus::prelude::*;
use underlay_engine::coords::preview_surface_for;
use underlay_engine::font::GenericFamily;
use underlay_engine::layer::PositionPatch;
use underlay_engine::raster::encode_png;
use underlay_engine::types::Asset;
use underlay_engine::{
    Dimensions, EXPORT_FILENAME, EditorSession, EditorState, EditorTab, EngineError, ExportedImage,
    FontBook, LayerId, LayerProperty, NormalizedPosition, OverlayConfig, RgbaImage, SceneSnapshot,
    SilhouetteConfig, UploadTicket,
};
use underlay_io::components::FALLBACK_WIDTH;
use underlay_io::fonts::{FontSource, load_fonts};
use underlay_io::{
    AdjustmentsPanel, Banner, CompositeMode, EditorCanvas, ExportPanel, FileUpload, LayerPanel,
    ModePreview, ModeTabs, Navbar, Onboarding, OverlayControls, SilhouetteControls, UploadedFile,
    account, download, segment,
};

/// How often the debounce clock is checked for settled live edits.
const POLL_INTERVAL_MS: u32 = 50;

/// Font files served next to the app. Missing files fall back to the
/// built-in block face.
const FONT_SOURCES: &[FontSource] = &[
    FontSource {
        family: "Roboto",
        url: "assets/fonts/Roboto-Regular.ttf",
        generic: Some(GenericFamily::SansSerif),
    },
    FontSource {
        family: "Impact",
        url: "assets/fonts/Anton-Regular.ttf",
        generic: None,
    },
    FontSource {
        family: "Arial Black",
        url: "assets/fonts/ArchivoBlack-Regular.ttf",
        generic: None,
    },
    FontSource {
        family: "Georgia",
        url: "assets/fonts/Lora-Regular.ttf",
        generic: Some(GenericFamily::Serif),
    },
    FontSource {
        family: "Courier New",
        url: "assets/fonts/CourierPrime-Regular.ttf",
        generic: Some(GenericFamily::Monospace),
    },
];

fn main() {
    dioxus::launch(app);
}

/// Render the single-string modes at the photo's native resolution.
fn compose_single(
    snapshot: &SceneSnapshot,
    mode: CompositeMode,
    overlay: &OverlayConfig,
    silhouette: &SilhouetteConfig,
    fonts: &FontBook,
) -> Result<RgbaImage, String> {
    let image = snapshot
        .background
        .as_ref()
        .ok_or(EngineError::NoImage)
        .and_then(|bg| bg.decode(Asset::Background))
        .map_err(|e| e.to_string())?;
    let mask = snapshot
        .subject_mask(Dimensions::of(image.as_ref()))
        .map_err(|e| e.to_string())?;
    match mode {
        CompositeMode::Upon => {
            underlay_engine::overlay::render_text_upon(&image, &mask, overlay, fonts)
                .map_err(|e| e.to_string())
        }
        CompositeMode::Border => {
            underlay_engine::silhouette::render_silhouette(&image, &mask, silhouette, fonts)
                .map_err(|e| e.to_string())
        }
        CompositeMode::Behind => Ok(image.as_ref().clone()),
    }
}

/// Root application component.
///
/// Holds the [`EditorSession`] in a signal and wires the upload zone,
/// canvas, tab panels, and export to it. Subject detection and export
/// run in spawned tasks; upload tickets discard results that arrive
/// after a newer upload.
#[allow(clippy::too_many_lines)]
fn app() -> Element {
    // --- Application state ---
    let mut session = use_signal(EditorSession::new);
    let mut upload_bytes = use_signal(|| Option::<Rc<Vec<u8>>>::None);
    let mut fonts = use_signal(|| Rc::new(FontBook::new()));
    let mut mode = use_signal(CompositeMode::default);
    let mut overlay = use_signal(OverlayConfig::default);
    let mut silhouette = use_signal(SilhouetteConfig::default);
    let mut preview_width = use_signal(|| FALLBACK_WIDTH);
    let mut export_error = use_signal(|| Option::<String>::None);
    let account = use_hook(account::current_session);

    // --- Font loading ---
    use_future(move || async move {
        let book = load_fonts(FONT_SOURCES).await;
        fonts.set(Rc::new(book));
    });

    // --- Debounced commit of live edits ---
    // Only write the signal when something is pending so idle ticks do
    // not re-render.
    use_future(move || async move {
        loop {
            gloo_timers::future::TimeoutFuture::new(POLL_INTERVAL_MS).await;
            if session.peek().has_pending_edit() {
                session.write().poll();
            }
        }
    });

    // --- Subject detection ---
    let run_detection = move |ticket: UploadTicket, bytes: Rc<Vec<u8>>| {
        spawn(async move {
            let result = segment::detect_cutout(&bytes).await;
            if !session.write().complete_cutout(ticket, result) {
                web_sys::console::info_1(&"ignored detection result for an older upload".into());
            }
        });
    };

    // --- File upload handlers ---
    let on_start = move |()| {
        session.write().mark_uploading();
    };

    let on_upload = move |file: UploadedFile| {
        export_error.set(None);
        let ticket = session.write().begin_upload(&file.mime, &file.bytes);
        if let Ok(ticket) = ticket {
            let bytes = Rc::new(file.bytes);
            upload_bytes.set(Some(Rc::clone(&bytes)));
            run_detection(ticket, bytes);
        }
    };

    let on_upload_error = move |message: String| {
        web_sys::console::warn_1(&message.clone().into());
        session.write().report_error(&message);
    };

    let on_redetect = move |()| {
        let Some(bytes) = upload_bytes() else {
            return;
        };
        if let Some(ticket) = session.write().begin_redetect() {
            run_detection(ticket, bytes);
        }
    };

    // --- Export ---
    let on_export = move |()| {
        let current_mode = mode();
        let snapshot = match session.write().begin_export() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                export_error.set(Some(e.to_string()));
                return;
            }
        };
        let surface = preview_surface_for(preview_width(), session.peek().document().aspect_ratio());
        let book = fonts();
        let overlay_cfg = overlay();
        let silhouette_cfg = silhouette();
        spawn(async move {
            // Let the "Exporting..." state paint before the heavy render.
            gloo_timers::future::TimeoutFuture::new(0).await;

            let exported = if current_mode == CompositeMode::Behind {
                underlay_engine::export_png(&snapshot, surface, &book).map_err(|e| e.to_string())
            } else {
                compose_single(
                    &snapshot,
                    current_mode,
                    &overlay_cfg,
                    &silhouette_cfg,
                    &book,
                )
                .and_then(|image| {
                    let png = encode_png(&image).map_err(|e| e.to_string())?;
                    Ok(ExportedImage {
                        png,
                        dimensions: Dimensions::of(&image),
                        filename: EXPORT_FILENAME.to_owned(),
                    })
                })
            };
            // Render failures surface through the session's error banner.
            session.write().finish_export(&exported);
            if let Ok(exported) = exported {
                if let Err(e) = download::download_export(&exported) {
                    export_error.set(Some(format!("Download failed: {e}")));
                } else {
                    export_error.set(None);
                }
            }
        });
    };

    // --- Keyboard shortcuts ---
    let on_keydown = move |evt: KeyboardEvent| {
        let modifiers = evt.modifiers();
        let shortcut = modifiers.ctrl() || modifiers.meta();
        if !shortcut || !mode().uses_layers() || !session.peek().can_edit() {
            return;
        }
        if let Key::Character(c) = evt.key() {
            match c.to_ascii_lowercase().as_str() {
                "z" if modifiers.shift() => {
                    session.write().redo();
                }
                "z" => {
                    session.write().undo();
                }
                "y" => {
                    session.write().redo();
                }
                _ => return,
            }
            evt.prevent_default();
        }
    };

    // --- Derived view state ---
    let current = session.read();
    let state = current.state();
    let can_edit = current.can_edit();
    let has_image = current.document().background().is_some();
    let ui = *current.ui();
    let snapshot = Rc::new(current.snapshot());
    let layers = current.document().layers().to_vec();
    let selected_layer = current.document().selected_layer().clone();
    let can_undo = current.can_undo();
    let can_redo = current.can_redo();
    let adjustments = current.document().adjustments();
    let aspect_ratio = current.document().aspect_ratio();
    let error = current.error().map(str::to_owned);
    let notice = current.notice().map(str::to_owned);
    drop(current);

    let single_result = if has_image && !mode().uses_layers() && state != EditorState::MaskPending {
        Some(Rc::new(compose_single(
            &snapshot,
            mode(),
            &overlay.read(),
            &silhouette.read(),
            &fonts.read(),
        )))
    } else {
        None
    };

    let tab_class = |tab: EditorTab| {
        if ui.active_tab == tab {
            "flex-1 px-3 py-2 text-sm font-medium border-b-2 border-[var(--btn-primary)]"
        } else {
            "flex-1 px-3 py-2 text-sm text-[var(--text-secondary)] border-b-2 border-transparent"
        }
    };

    // --- Layout ---
    rsx! {
        style { dangerous_inner_html: include_str!("../assets/theme.css") }
        // Tailwind's browser build compiles utility classes at runtime.
        script { src: "https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4" }

        div {
            class: "min-h-screen bg-(--bg) text-(--text) flex flex-col outline-none",
            tabindex: "0",
            onkeydown: on_keydown,

            Navbar { session: account.clone() }

            div { class: "flex-1 flex flex-col lg:flex-row gap-6 p-6",
                // Left column: canvas and status
                div { class: "flex-1 flex flex-col gap-4",
                    if let Some(ref err) = error {
                        Banner {
                            message: err.clone(),
                            error: true,
                            on_dismiss: move |()| session.write().clear_error(),
                        }
                    }
                    if let Some(ref warning) = notice {
                        Banner {
                            message: warning.clone(),
                            on_dismiss: move |()| session.write().dismiss_notice(),
                        }
                    }

                    if !has_image {
                        if state == EditorState::Uploading {
                            div { class: "flex-1 flex items-center justify-center",
                                p { class: "text-(--text-secondary) text-lg animate-pulse",
                                    "Loading image..."
                                }
                            }
                        } else {
                            FileUpload {
                                on_start: on_start,
                                on_upload: on_upload,
                                on_error: on_upload_error,
                            }
                        }
                    } else {
                        ModeTabs {
                            selected: mode(),
                            on_select: move |m: CompositeMode| {
                                session.write().commit_pending();
                                mode.set(m);
                            },
                        }

                        if state == EditorState::MaskPending {
                            p { class: "text-sm text-(--text-secondary) animate-pulse",
                                "Finding the subject..."
                            }
                        }

                        if let Some(result) = single_result {
                            ModePreview { result }
                        } else {
                            EditorCanvas {
                                snapshot: Rc::clone(&snapshot),
                                fonts: fonts(),
                                aspect_ratio,
                                on_measure: move |w: f64| preview_width.set(w),
                                on_select: move |id| {
                                    session.write().set_selected(id);
                                },
                                on_drag: move |(id, position): (LayerId, NormalizedPosition)| {
                                    if !session.peek().can_edit() {
                                        return;
                                    }
                                    session.write().update_layer_live(
                                        id,
                                        LayerProperty::Position(PositionPatch {
                                            x: Some(position.x),
                                            y: Some(position.y),
                                        }),
                                    );
                                },
                                on_drag_end: move |()| session.write().commit_pending(),
                            }
                            if ui.onboarding_visible {
                                Onboarding {
                                    on_dismiss: move |()| session.write().ui_mut().onboarding_visible = false,
                                }
                            }
                        }

                        div { class: "flex gap-2",
                            FileUpload {
                                compact: true,
                                on_start: on_start,
                                on_upload: on_upload,
                                on_error: on_upload_error,
                            }
                            button {
                                class: "px-4 py-2 rounded border border-(--border) hover:bg-(--surface-active)",
                                onclick: move |_| {
                                    session.write().reset();
                                    upload_bytes.set(None);
                                    export_error.set(None);
                                },
                                "Start Over"
                            }
                        }
                    }
                }

                // Right sidebar: controls and export
                if has_image {
                    div { class: "lg:w-80 flex-shrink-0 space-y-6",
                        button {
                            class: "lg:hidden text-sm text-(--text-secondary) underline",
                            onclick: move |_| {
                                let visible = session.peek().ui().controls_visible;
                                session.write().ui_mut().controls_visible = !visible;
                            },
                            if ui.controls_visible { "Hide controls" } else { "Show controls" }
                        }

                        if ui.controls_visible {
                            // Controls stay visible but inert until the subject is known.
                            fieldset { class: "contents", disabled: !can_edit,
                                {match mode() {
                                    CompositeMode::Behind => rsx! {
                                        div { class: "flex border-b border-(--border)",
                                            for tab in EditorTab::ALL {
                                                button {
                                                    key: "{tab.label()}",
                                                    class: tab_class(tab),
                                                    onclick: move |_| session.write().ui_mut().active_tab = tab,
                                                    "{tab.label()}"
                                                }
                                            }
                                        }
                                        {match ui.active_tab {
                                            EditorTab::Text => rsx! {
                                                LayerPanel {
                                                    layers: layers.clone(),
                                                    selected: selected_layer.clone(),
                                                    can_undo,
                                                    can_redo,
                                                    on_select: move |id| {
                                                        session.write().set_selected(id);
                                                    },
                                                    on_create: move |()| {
                                                        session.write().create_layer();
                                                    },
                                                    on_duplicate: move |id| {
                                                        session.write().duplicate_layer(id);
                                                    },
                                                    on_delete: move |id| {
                                                        session.write().delete_layer(id);
                                                    },
                                                    on_undo: move |()| {
                                                        session.write().undo();
                                                    },
                                                    on_redo: move |()| {
                                                        session.write().redo();
                                                    },
                                                    on_change: move |(id, property)| {
                                                        session.write().update_layer_property(id, property);
                                                    },
                                                    on_live: move |(id, property)| {
                                                        session.write().update_layer_live(id, property);
                                                    },
                                                }
                                            },
                                            EditorTab::Image => rsx! {
                                                AdjustmentsPanel {
                                                    adjustments,
                                                    aspect_ratio,
                                                    detecting: state == EditorState::MaskPending,
                                                    on_adjust: move |a| session.write().set_adjustments(a),
                                                    on_aspect_ratio: move |r| session.write().set_aspect_ratio(r),
                                                    on_redetect: on_redetect,
                                                }
                                            },
                                        }}
                                    },
                                    CompositeMode::Upon => rsx! {
                                        OverlayControls {
                                            config: overlay(),
                                            on_change: move |c| overlay.set(c),
                                        }
                                    },
                                    CompositeMode::Border => rsx! {
                                        SilhouetteControls {
                                            config: silhouette(),
                                            on_change: move |c| silhouette.set(c),
                                        }
                                    },
                                }}
                            }
                        }

                        ExportPanel {
                            enabled: has_image,
                            exporting: state == EditorState::Exporting,
                            error: export_error(),
                            on_export: on_export,
                        }
                    }
                }
            }
        }
    }
}
