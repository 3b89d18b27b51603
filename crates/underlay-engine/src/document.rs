//! The editable document: background, subject, text layers, adjustments.
//!
//! Pure data with no history of its own. The editor session wraps the
//! layer operations here with undo/redo bookkeeping.

use std::sync::LazyLock;

use crate::adjust::Adjustments;
use crate::coords::AspectRatio;
use crate::decode::ImageAsset;
use crate::layer::{LayerId, LayerProperty, TextLayer};
use crate::mask::{Subject, SubjectMask};
use crate::types::{Asset, Dimensions, EngineError};

/// Returned by [`Document::selected_layer`] when there are no layers, so
/// controls always have something to display.
static SENTINEL_LAYER: LazyLock<TextLayer> = LazyLock::new(TextLayer::default);

#[derive(Debug, Clone, Default)]
pub struct Document {
    background: Option<ImageAsset>,
    dimensions: Option<Dimensions>,
    subject: Option<Subject>,
    layers: Vec<TextLayer>,
    selected: Option<LayerId>,
    adjustments: Adjustments,
    aspect_ratio: AspectRatio,
}

impl Document {
    /// An empty document with no layers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A document holding the editor's starter layer, selected.
    #[must_use]
    pub fn with_starter_layer() -> Self {
        let mut doc = Self::new();
        doc.create_layer();
        doc
    }

    // --- assets ---

    #[must_use]
    pub const fn background(&self) -> Option<&ImageAsset> {
        self.background.as_ref()
    }

    /// Native dimensions of the background image.
    #[must_use]
    pub const fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    /// Replace the background. Any previous subject no longer matches and
    /// is dropped.
    pub fn set_background(&mut self, background: ImageAsset, dimensions: Dimensions) {
        self.background = Some(background);
        self.dimensions = Some(dimensions);
        self.subject = None;
    }

    #[must_use]
    pub const fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    /// Replace mask and cutout together.
    pub fn set_subject(&mut self, subject: Subject) {
        self.subject = Some(subject);
    }

    pub fn clear_subject(&mut self) {
        self.subject = None;
    }

    #[must_use]
    pub const fn adjustments(&self) -> Adjustments {
        self.adjustments
    }

    pub fn set_adjustments(&mut self, adjustments: Adjustments) {
        self.adjustments = adjustments.clamped();
    }

    #[must_use]
    pub const fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.aspect_ratio = aspect_ratio;
    }

    // --- layers ---

    #[must_use]
    pub fn layers(&self) -> &[TextLayer] {
        &self.layers
    }

    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<&TextLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    #[must_use]
    pub const fn selected_id(&self) -> Option<LayerId> {
        self.selected
    }

    /// The selected layer, or a default-valued sentinel when the
    /// collection is empty.
    #[must_use]
    pub fn selected_layer(&self) -> &TextLayer {
        self.selected
            .and_then(|id| self.layer(id))
            .unwrap_or_else(|| &*SENTINEL_LAYER)
    }

    /// `max(existing ids, 0) + 1`.
    #[must_use]
    pub fn next_id(&self) -> LayerId {
        LayerId(self.layers.iter().map(|l| l.id.0).max().unwrap_or(0) + 1)
    }

    /// Append a default layer and select it.
    pub fn create_layer(&mut self) -> LayerId {
        let id = self.next_id();
        self.layers.push(TextLayer::new(id));
        self.selected = Some(id);
        id
    }

    /// Append a copy of `id` and select it. `None` if `id` is unknown.
    pub fn duplicate_layer(&mut self, id: LayerId) -> Option<LayerId> {
        let copy = self.layer(id)?.duplicate_as(self.next_id());
        let new_id = copy.id;
        self.layers.push(copy);
        self.selected = Some(new_id);
        Some(new_id)
    }

    /// Remove `id`. If it was selected, the first remaining layer (or
    /// nothing) becomes selected. Returns `false` if `id` is unknown.
    pub fn delete_layer(&mut self, id: LayerId) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        if self.layers.len() == before {
            return false;
        }
        if self.selected == Some(id) {
            self.selected = self.layers.first().map(|l| l.id);
        }
        true
    }

    /// Apply one property write. Returns `false` if `id` is unknown.
    pub fn update_layer_property(&mut self, id: LayerId, property: LayerProperty) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                property.apply(layer);
                true
            }
            None => false,
        }
    }

    /// Select `id`. Returns `false` (selection unchanged) if `id` is
    /// unknown.
    pub fn set_selected(&mut self, id: LayerId) -> bool {
        if self.layer(id).is_none() {
            return false;
        }
        self.selected = Some(id);
        true
    }

    /// Replace the whole layer list (undo/redo, loading a document).
    ///
    /// The selection is kept when the selected id survives; otherwise it
    /// falls back to the first layer.
    pub fn replace_layers(&mut self, layers: Vec<TextLayer>) {
        self.layers = layers;
        let still_there = self.selected.is_some_and(|id| self.layer(id).is_some());
        if !still_there {
            self.selected = self.layers.first().map(|l| l.id);
        }
    }

    /// Immutable copy of everything an export needs. Images are shared,
    /// not copied.
    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            background: self.background.clone(),
            cutout: self.subject.as_ref().and_then(|s| s.cutout().cloned()),
            layers: self.layers.clone(),
            selected: self.selected,
            adjustments: self.adjustments,
        }
    }
}

/// Frozen view of a document, safe to render while editing continues.
#[derive(Debug, Clone)]
pub struct SceneSnapshot {
    pub background: Option<ImageAsset>,
    pub cutout: Option<ImageAsset>,
    pub layers: Vec<TextLayer>,
    pub selected: Option<LayerId>,
    pub adjustments: Adjustments,
}

impl SceneSnapshot {
    /// Subject mask at `dimensions`, recovered from the cutout's alpha.
    /// Without a cutout nothing is subject.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AssetDecode`] if the cutout is corrupt.
    pub fn subject_mask(&self, dimensions: Dimensions) -> Result<SubjectMask, EngineError> {
        let Some(cutout) = &self.cutout else {
            return Ok(SubjectMask::empty(dimensions));
        };
        let cutout = cutout.decode(Asset::Foreground)?;
        Ok(SubjectMask::from_alpha(&cutout).resized(dimensions))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::layer::NormalizedPosition;

    fn doc_with_ids(ids: &[u32]) -> Document {
        let mut doc = Document::new();
        doc.replace_layers(ids.iter().map(|&i| TextLayer::new(LayerId(i))).collect());
        doc
    }

    #[test]
    fn starter_document_has_one_selected_layer() {
        let doc = Document::with_starter_layer();
        assert_eq!(doc.layers().len(), 1);
        assert_eq!(doc.selected_id(), Some(LayerId(1)));
        assert_eq!(doc.selected_layer().content, "edit");
    }

    #[test]
    fn duplicate_takes_next_id_and_delete_falls_back_to_first() {
        let mut doc = doc_with_ids(&[1, 3, 7]);
        doc.set_selected(LayerId(3));
        let copy = doc.duplicate_layer(LayerId(3)).unwrap();
        assert_eq!(copy, LayerId(8));
        assert_eq!(doc.selected_id(), Some(LayerId(8)));
        assert_eq!(doc.layer(copy).unwrap().content, "edit (Copy)");
        assert_eq!(
            doc.layer(copy).unwrap().position,
            NormalizedPosition::new(55.0, 55.0)
        );

        assert!(doc.delete_layer(copy));
        assert_eq!(doc.selected_id(), Some(LayerId(1)));
    }

    #[test]
    fn deleting_unselected_layer_keeps_selection() {
        let mut doc = doc_with_ids(&[1, 2]);
        doc.set_selected(LayerId(2));
        assert!(doc.delete_layer(LayerId(1)));
        assert_eq!(doc.selected_id(), Some(LayerId(2)));
    }

    #[test]
    fn empty_collection_returns_sentinel_and_ignores_destructive_ops() {
        let mut doc = Document::new();
        assert_eq!(doc.selected_layer(), &TextLayer::default());
        assert!(!doc.delete_layer(LayerId(1)));
        assert_eq!(doc.duplicate_layer(LayerId(1)), None);
        assert!(doc.layers().is_empty());
    }

    #[test]
    fn deleting_last_layer_clears_selection() {
        let mut doc = Document::with_starter_layer();
        assert!(doc.delete_layer(LayerId(1)));
        assert_eq!(doc.selected_id(), None);
        assert_eq!(doc.selected_layer().id, LayerId(1));
    }

    #[test]
    fn create_uses_max_plus_one() {
        let mut doc = doc_with_ids(&[4, 2]);
        assert_eq!(doc.create_layer(), LayerId(5));
        assert_eq!(Document::new().next_id(), LayerId(1));
    }

    #[test]
    fn set_selected_rejects_unknown_ids() {
        let mut doc = doc_with_ids(&[1]);
        assert!(!doc.set_selected(LayerId(9)));
        assert_eq!(doc.selected_id(), Some(LayerId(1)));
    }

    #[test]
    fn update_unknown_layer_is_noop() {
        let mut doc = doc_with_ids(&[1]);
        assert!(!doc.update_layer_property(LayerId(2), LayerProperty::Bold(true)));
        assert!(doc.update_layer_property(LayerId(1), LayerProperty::Bold(true)));
        assert!(doc.layer(LayerId(1)).unwrap().is_bold);
    }

    #[test]
    fn replace_layers_repairs_selection() {
        let mut doc = doc_with_ids(&[1, 2]);
        doc.set_selected(LayerId(2));
        doc.replace_layers(vec![TextLayer::new(LayerId(5))]);
        assert_eq!(doc.selected_id(), Some(LayerId(5)));
    }

    #[test]
    fn new_background_drops_subject() {
        let mut doc = Document::new();
        doc.set_subject(Subject::none(Dimensions::new(2, 2)));
        doc.set_background(
            ImageAsset::from_image(crate::types::RgbaImage::new(2, 2)),
            Dimensions::new(2, 2),
        );
        assert!(doc.subject().is_none());
        assert_eq!(doc.dimensions(), Some(Dimensions::new(2, 2)));
    }

    #[test]
    fn snapshot_mask_follows_frozen_subject() {
        let dims = Dimensions::new(6, 4);
        let image = crate::types::RgbaImage::from_pixel(6, 4, image::Rgba([50, 60, 70, 255]));
        let mut doc = Document::new();
        doc.set_background(ImageAsset::from_image(image.clone()), dims);
        assert!(doc.snapshot().subject_mask(dims).unwrap().is_empty());

        let mask = SubjectMask::from_fn(dims, |x, _| x < 3);
        doc.set_subject(Subject::from_mask(&image, mask.clone()).unwrap());
        let snapshot = doc.snapshot();
        doc.set_subject(Subject::none(dims));
        assert_eq!(snapshot.subject_mask(dims).unwrap(), mask);
    }

    #[test]
    fn adjustments_are_clamped_on_write() {
        let mut doc = Document::new();
        doc.set_adjustments(Adjustments {
            brightness: 500.0,
            ..Adjustments::default()
        });
        assert!((doc.adjustments().brightness - 200.0).abs() < f64::EPSILON);
    }
}
