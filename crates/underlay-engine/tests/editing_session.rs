//! Integration test: upload a synthetic photo, detect a subject, edit
//! text layers with undo, and export at native resolution.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use underlay_engine::mask::PrecomputedMask;
use underlay_engine::raster::encode_png;
use underlay_engine::{
    Dimensions, EditorSession, EditorState, FontBook, LayerId, LayerProperty, RgbaImage,
    SubjectMask, Surface, export_png,
};

const GREEN: [u8; 4] = [0, 200, 0, 255];
const GRAY: [u8; 4] = [60, 60, 60, 255];
const YELLOW: [u8; 4] = [255, 255, 0, 255];

/// A 400x300 gray photo with a green "subject" occupying the right half.
fn photo() -> RgbaImage {
    RgbaImage::from_fn(400, 300, |x, _| image::Rgba(if x >= 200 { GREEN } else { GRAY }))
}

#[test]
fn text_behind_subject_survives_undo_and_export() {
    let mut session = EditorSession::new();
    session.mark_uploading();
    assert_eq!(session.state(), EditorState::Uploading);

    let png = encode_png(&photo()).unwrap();
    session.begin_upload("image/png", &png).expect("upload should succeed");
    assert_eq!(session.state(), EditorState::MaskPending);

    let mask = SubjectMask::from_fn(Dimensions::new(400, 300), |x, _| x >= 200);
    assert!(session.detect_with(&PrecomputedMask(mask)));
    assert_eq!(session.state(), EditorState::Editing);
    assert!(session.notice().is_none());

    // Preview is 200x150, export 400x300: everything scales by 2.
    let id = LayerId(1);
    session.update_layer_property(id, LayerProperty::Content("XXXXXXXX".into()));
    session.update_layer_property(id, LayerProperty::Color("#ffff00".parse().unwrap()));
    session.update_layer_property(id, LayerProperty::Size(20.0));
    session.update_layer_property(id, LayerProperty::Size(90.0));
    assert!(session.undo());
    assert!((session.document().layer(id).unwrap().size - 20.0).abs() < f64::EPSILON);

    let snapshot = session.begin_export().unwrap();
    let fonts = FontBook::new();
    let exported = export_png(&snapshot, Surface::new(200.0, 150.0), &fonts);
    session.finish_export(&exported);
    assert_eq!(session.state(), EditorState::Editing);

    let exported = exported.unwrap();
    assert_eq!(exported.dimensions, Dimensions::new(400, 300));
    let image = image::load_from_memory(&exported.png).unwrap().to_rgba8();

    // Text spans both halves; it shows over the background and hides
    // behind the subject.
    assert_eq!(image.get_pixel(180, 150).0, YELLOW);
    assert_eq!(image.get_pixel(220, 150).0, GREEN);
    assert_eq!(image.get_pixel(20, 20).0, GRAY);
}

#[test]
fn failed_detection_still_exports_text_everywhere() {
    let mut session = EditorSession::new();
    let png = encode_png(&photo()).unwrap();
    let ticket = session.begin_upload("image/png", &png).unwrap();
    session.complete_mask(
        ticket,
        Err(underlay_engine::MaskError::Failed("model crashed".into())),
    );
    assert!(session.notice().unwrap().contains("model crashed"));

    session.update_layer_property(LayerId(1), LayerProperty::Content("XXXXXXXX".into()));
    session.update_layer_property(LayerId(1), LayerProperty::Size(20.0));
    let snapshot = session.begin_export().unwrap();
    let image = underlay_engine::ExportRenderer::new(&FontBook::new())
        .render(&snapshot, Surface::new(200.0, 150.0))
        .unwrap();
    assert_eq!(image.get_pixel(220, 150).0, [255, 255, 255, 255]);
}
