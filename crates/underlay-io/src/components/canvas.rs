//! Interactive preview of the layered composition.
//!
//! Renders the document through an [`InteractiveRenderer`] into a Blob
//! URL `<img>` sized to the preview surface. Pointer events are hit
//! tested against the last rendered frame: pressing on a layer selects
//! it, dragging moves it, releasing commits the move.

use std::cell::RefCell;
use std::rc::Rc;

use dioxus::prelude::*;
use underlay_engine::coords::preview_surface_for;
use underlay_engine::{
    AspectRatio, FontBook, InteractiveRenderer, LayerId, NormalizedPosition, Point, SceneSnapshot,
};

use crate::raster;

/// Container width used until the real one has been measured.
pub const FALLBACK_WIDTH: f64 = 640.0;

/// Props for the [`EditorCanvas`] component.
#[derive(Props, Clone)]
pub struct EditorCanvasProps {
    snapshot: Rc<SceneSnapshot>,
    fonts: Rc<FontBook>,
    aspect_ratio: AspectRatio,
    /// Fired with the preview width once the container is measured.
    on_measure: EventHandler<f64>,
    on_select: EventHandler<LayerId>,
    /// Fired continuously while a layer is dragged.
    on_drag: EventHandler<(LayerId, NormalizedPosition)>,
    /// Fired when a drag ends.
    on_drag_end: EventHandler<()>,
}

impl PartialEq for EditorCanvasProps {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.snapshot, &other.snapshot)
            && Rc::ptr_eq(&self.fonts, &other.fonts)
            && self.aspect_ratio == other.aspect_ratio
    }
}

/// The editor's main preview surface.
#[component]
pub fn EditorCanvas(props: EditorCanvasProps) -> Element {
    // The renderer keeps its asset cache across renders; it is not
    // reactive state.
    let renderer = use_hook(|| Rc::new(RefCell::new(InteractiveRenderer::new())));
    let mut width = use_signal(|| FALLBACK_WIDTH);
    let mut dragging = use_signal(|| Option::<LayerId>::None);
    let mut prev_blob_url: Signal<Option<String>> = use_signal(|| None);

    use_drop(move || {
        if let Some(ref url) = *prev_blob_url.peek() {
            raster::revoke_blob_url(url);
        }
    });

    let surface = preview_surface_for(width(), props.aspect_ratio);
    let rendered = renderer
        .borrow_mut()
        .render(&props.snapshot, surface, &props.fonts);

    if let Some(ref prev) = prev_blob_url.take() {
        raster::revoke_blob_url(prev);
    }

    let body = match rendered.map_err(raster::RasterError::from).and_then(|image| {
        raster::rgba_image_to_blob_url(&image)
    }) {
        Ok(url) => {
            prev_blob_url.set(Some(url.clone()));
            rsx! {
                img {
                    src: "{url}",
                    width: "{surface.width}",
                    height: "{surface.height}",
                    class: "block select-none",
                    draggable: false,
                    alt: "Composition preview",
                }
            }
        }
        Err(e) => rsx! {
            p { class: "text-[var(--text-error)] text-sm p-4", "Preview failed: {e}" }
        },
    };

    let down_renderer = Rc::clone(&renderer);
    let move_renderer = Rc::clone(&renderer);

    rsx! {
        div {
            class: "relative w-full overflow-hidden rounded bg-[var(--preview-bg)] cursor-move",
            style: "height: {surface.height}px",
            onmounted: move |evt: MountedEvent| async move {
                if let Ok(rect) = evt.get_client_rect().await {
                    let measured = rect.width();
                    if measured > 0.0 {
                        width.set(measured);
                        props.on_measure.call(measured);
                    }
                }
            },
            onmousedown: move |evt: MouseEvent| {
                let p = evt.element_coordinates();
                let hit = down_renderer.borrow().layer_at(Point::new(p.x, p.y));
                if let Some(id) = hit {
                    props.on_select.call(id);
                    dragging.set(Some(id));
                }
            },
            onmousemove: move |evt: MouseEvent| {
                let Some(id) = dragging() else {
                    return;
                };
                let p = evt.element_coordinates();
                let position = move_renderer.borrow().to_normalized(Point::new(p.x, p.y));
                if let Some(position) = position {
                    props.on_drag.call((id, position));
                }
            },
            onmouseup: move |_| {
                if dragging.take().is_some() {
                    props.on_drag_end.call(());
                }
            },
            onmouseleave: move |_| {
                if dragging.take().is_some() {
                    props.on_drag_end.call(());
                }
            },
            {body}
        }
    }
}
