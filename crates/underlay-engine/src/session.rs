//! The editor session: document, history, and the upload/mask/export
//! lifecycle.
//!
//! All document mutations from the UI go through [`EditorSession`] so
//! that history bookkeeping happens in one place. Continuous inputs
//! (sliders, drags, typing) are applied immediately as a *pending* edit
//! and committed to history once they settle (see [`COMMIT_DELAY`]).

use std::fmt;

use web_time::Instant;

use crate::adjust::Adjustments;
use crate::coords::AspectRatio;
use crate::decode::{ImageAsset, decode_image, validate_mime};
use crate::document::{Document, SceneSnapshot};
use crate::history::{COMMIT_DELAY, Clock, History, SystemClock};
use crate::layer::{LayerId, LayerProperty, PropertyKey, TextLayer};
use crate::mask::{MaskError, MaskProvider, SubjectMask, SubjectOutcome, resolve_cutout, resolve_subject};
use crate::types::{Asset, Dimensions, EngineError, RgbaImage};

/// Where the editor is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditorState {
    /// No image yet.
    #[default]
    Idle,
    /// Reading the selected file.
    Uploading,
    /// Image loaded; waiting for the mask provider.
    MaskPending,
    Editing,
    /// An export is running. Reported over the lifecycle state, which
    /// resumes when the export finishes.
    Exporting,
    /// The last operation failed; see [`EditorSession::error`].
    Error,
}

/// Editor control tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EditorTab {
    #[default]
    Text,
    Image,
}

impl EditorTab {
    pub const ALL: [Self; 2] = [Self::Text, Self::Image];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Image => "Image",
        }
    }
}

/// Transient view state. Never part of history or exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiFlags {
    pub active_tab: EditorTab,
    pub controls_visible: bool,
    pub color_picker_open: bool,
    pub onboarding_visible: bool,
}

impl Default for UiFlags {
    fn default() -> Self {
        Self {
            active_tab: EditorTab::Text,
            controls_visible: true,
            color_picker_open: false,
            onboarding_visible: true,
        }
    }
}

/// Identifies the upload (or re-detection) a mask result belongs to.
///
/// Results carrying an outdated ticket are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadTicket {
    generation: u64,
}

impl UploadTicket {
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

/// A live edit applied to the document but not yet in history.
#[derive(Debug, Clone)]
struct PendingEdit {
    layer: LayerId,
    key: PropertyKey,
    before: Vec<TextLayer>,
    last_input: Instant,
}

pub struct EditorSession {
    document: Document,
    history: History<Vec<TextLayer>>,
    pending: Option<PendingEdit>,
    /// Lifecycle state; never [`EditorState::Exporting`].
    state: EditorState,
    exporting: bool,
    error: Option<String>,
    notice: Option<String>,
    generation: u64,
    ui: UiFlags,
    clock: Box<dyn Clock>,
}

impl fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorSession")
            .field("document", &self.document)
            .field("history", &self.history.len())
            .field("pending", &self.pending.as_ref().map(|p| (p.layer, p.key)))
            .field("state", &self.state)
            .field("exporting", &self.exporting)
            .field("error", &self.error)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    /// A fresh session on the wall clock, holding the starter layer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    /// A fresh session on an injected clock.
    #[must_use]
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            document: Document::with_starter_layer(),
            history: History::new(),
            pending: None,
            state: EditorState::Idle,
            exporting: false,
            error: None,
            notice: None,
            generation: 0,
            ui: UiFlags::default(),
            clock,
        }
    }

    // --- accessors ---

    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub const fn state(&self) -> EditorState {
        match self.state {
            EditorState::Error => EditorState::Error,
            _ if self.exporting => EditorState::Exporting,
            state => state,
        }
    }

    /// Last user-facing error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        if self.state == EditorState::Error {
            self.state = self.resting_state();
        }
    }

    /// Non-fatal warning, e.g. that subject detection was unavailable.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    #[must_use]
    pub const fn ui(&self) -> &UiFlags {
        &self.ui
    }

    pub const fn ui_mut(&mut self) -> &mut UiFlags {
        &mut self.ui
    }

    /// `true` once an image is loaded and its subject detection has
    /// finished. A running export does not block editing.
    #[must_use]
    pub fn can_edit(&self) -> bool {
        self.document.background().is_some() && self.state == EditorState::Editing
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.pending.is_some() || self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.pending.is_none() && self.history.can_redo()
    }

    /// `true` while a live edit is waiting to be committed.
    #[must_use]
    pub const fn has_pending_edit(&self) -> bool {
        self.pending.is_some()
    }

    /// A loaded image without a subject is still waiting for detection.
    fn resting_state(&self) -> EditorState {
        match (self.document.background(), self.document.subject()) {
            (None, _) => EditorState::Idle,
            (Some(_), None) => EditorState::MaskPending,
            (Some(_), Some(_)) => EditorState::Editing,
        }
    }

    fn fail(&mut self, error: &impl fmt::Display) {
        tracing::warn!(%error, state = ?self.state, "editor operation failed");
        self.error = Some(error.to_string());
        self.state = EditorState::Error;
    }

    /// Record a failure that happened outside the session, such as a
    /// file that could not be read.
    pub fn report_error(&mut self, message: &str) {
        self.fail(&message);
    }

    // --- upload and subject detection ---

    /// The user picked a file; its bytes are being read.
    pub fn mark_uploading(&mut self) {
        self.state = EditorState::Uploading;
        self.error = None;
    }

    /// Validate and decode an uploaded file and make it the background.
    ///
    /// On success the previous subject is dropped, the state becomes
    /// [`EditorState::MaskPending`], and the returned ticket must
    /// accompany the mask result.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnsupportedType`] for non-image MIME types
    /// and [`EngineError::EmptyInput`] / [`EngineError::ImageDecode`] for
    /// unreadable data. The document is left unchanged and the error is
    /// also recorded in [`Self::error`].
    pub fn begin_upload(&mut self, mime: &str, bytes: &[u8]) -> Result<UploadTicket, EngineError> {
        let decoded = validate_mime(mime).and_then(|()| decode_image(bytes));
        let image = match decoded {
            Ok(image) => image,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };
        let dims = Dimensions::of(&image);
        tracing::info!(%dims, mime, "image uploaded");
        self.document.set_background(ImageAsset::from_image(image), dims);
        self.error = None;
        self.notice = None;
        Ok(self.next_ticket())
    }

    /// Re-run subject detection on the current image.
    ///
    /// Returns `None` when there is no image.
    pub fn begin_redetect(&mut self) -> Option<UploadTicket> {
        self.document.background()?;
        self.document.clear_subject();
        Some(self.next_ticket())
    }

    fn next_ticket(&mut self) -> UploadTicket {
        self.generation += 1;
        self.state = EditorState::MaskPending;
        UploadTicket {
            generation: self.generation,
        }
    }

    const fn is_current(&self, ticket: UploadTicket) -> bool {
        ticket.generation == self.generation
    }

    fn background_image(&self) -> Result<std::sync::Arc<RgbaImage>, EngineError> {
        self.document
            .background()
            .ok_or(EngineError::NoImage)?
            .decode(Asset::Background)
    }

    /// Deliver a mask for the upload identified by `ticket`.
    ///
    /// Provider failures degrade to "no subject" with a notice. Returns
    /// `false` (and changes nothing) when the ticket is stale.
    pub fn complete_mask(&mut self, ticket: UploadTicket, result: Result<SubjectMask, MaskError>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale mask result"
            );
            return false;
        }
        match self.background_image() {
            Ok(image) => {
                let outcome = resolve_subject(&image, result);
                self.apply_outcome(outcome);
            }
            Err(e) => self.fail(&e),
        }
        true
    }

    /// Deliver a provider cutout (the mask is its alpha channel) for the
    /// upload identified by `ticket`. Stale tickets are ignored.
    pub fn complete_cutout(&mut self, ticket: UploadTicket, result: Result<RgbaImage, MaskError>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale cutout result"
            );
            return false;
        }
        let Some(dims) = self.document.dimensions() else {
            self.fail(&EngineError::NoImage);
            return true;
        };
        self.apply_outcome(resolve_cutout(dims, result));
        true
    }

    fn apply_outcome(&mut self, outcome: SubjectOutcome) {
        self.notice = outcome.warning();
        let subject = outcome.into_subject();
        let components = subject.mask().component_count();
        if components > 1 {
            tracing::debug!(components, "subject mask has several islands");
            if self.notice.is_none() {
                self.notice = Some(islands_notice(components));
            }
        }
        self.document.set_subject(subject);
        self.state = EditorState::Editing;
    }

    /// Run `provider` synchronously for the current image.
    ///
    /// Returns `false` if there is no image.
    pub fn detect_with(&mut self, provider: &dyn MaskProvider) -> bool {
        let image = match self.background_image() {
            Ok(image) => image,
            Err(e) => {
                self.fail(&e);
                return false;
            }
        };
        let ticket = UploadTicket {
            generation: self.generation,
        };
        self.complete_mask(ticket, provider.segment(&image))
    }

    // --- layer edits ---

    /// Run `mutate` against the document and record a history step if
    /// the layer list changed.
    fn committed<R>(&mut self, mutate: impl FnOnce(&mut Document) -> R) -> R {
        self.commit_pending();
        let before = self.document.layers().to_vec();
        let result = mutate(&mut self.document);
        if self.document.layers() != before.as_slice() {
            self.history.record(before, self.document.layers().to_vec());
        }
        result
    }

    /// Append a default layer and select it.
    pub fn create_layer(&mut self) -> LayerId {
        self.committed(Document::create_layer)
    }

    /// Copy a layer (see [`Document::duplicate_layer`]).
    pub fn duplicate_layer(&mut self, id: LayerId) -> Option<LayerId> {
        self.committed(|doc| doc.duplicate_layer(id))
    }

    pub fn delete_layer(&mut self, id: LayerId) -> bool {
        self.committed(|doc| doc.delete_layer(id))
    }

    /// Apply a discrete property change as one history step.
    pub fn update_layer_property(&mut self, id: LayerId, property: LayerProperty) -> bool {
        self.committed(|doc| doc.update_layer_property(id, property))
    }

    /// Apply a continuous property change immediately, deferring the
    /// history step until input settles.
    ///
    /// Consecutive writes to the same property of the same layer coalesce
    /// into one step; a write to anything else commits the previous one
    /// first.
    pub fn update_layer_live(&mut self, id: LayerId, property: LayerProperty) -> bool {
        if self.document.layer(id).is_none() {
            return false;
        }
        let key = property.key();
        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.layer != id || p.key != key)
        {
            self.commit_pending();
        }
        let now = self.clock.now();
        match &mut self.pending {
            Some(pending) => pending.last_input = now,
            None => {
                self.pending = Some(PendingEdit {
                    layer: id,
                    key,
                    before: self.document.layers().to_vec(),
                    last_input: now,
                });
            }
        }
        self.document.update_layer_property(id, property)
    }

    /// Commit the pending edit if input has been quiet for
    /// [`COMMIT_DELAY`]. Returns `true` if a commit happened.
    pub fn poll(&mut self) -> bool {
        let settled = self
            .pending
            .as_ref()
            .is_some_and(|p| self.clock.now().duration_since(p.last_input) >= COMMIT_DELAY);
        if settled {
            self.commit_pending();
        }
        settled
    }

    /// Commit the pending edit now, if any.
    pub fn commit_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if self.document.layers() != pending.before.as_slice() {
            tracing::trace!(layer = %pending.layer, key = ?pending.key, "committing live edit");
            self.history.record(pending.before, self.document.layers().to_vec());
        }
    }

    /// Restore the previous layer list. Returns `false` at the oldest
    /// entry.
    pub fn undo(&mut self) -> bool {
        self.commit_pending();
        match self.history.undo() {
            Some(layers) => {
                self.document.replace_layers(layers);
                true
            }
            None => false,
        }
    }

    /// Re-apply an undone layer list. Returns `false` at the newest entry.
    pub fn redo(&mut self) -> bool {
        self.commit_pending();
        match self.history.redo() {
            Some(layers) => {
                self.document.replace_layers(layers);
                true
            }
            None => false,
        }
    }

    // --- non-history state ---

    pub fn set_selected(&mut self, id: LayerId) -> bool {
        self.document.set_selected(id)
    }

    pub fn set_adjustments(&mut self, adjustments: Adjustments) {
        self.document.set_adjustments(adjustments);
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.document.set_aspect_ratio(aspect_ratio);
    }

    /// Current document state for rendering.
    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        self.document.snapshot()
    }

    // --- export ---

    /// Freeze the document for export. Pending edits are committed first
    /// so the export matches what the user sees.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoImage`] when nothing has been uploaded.
    pub fn begin_export(&mut self) -> Result<SceneSnapshot, EngineError> {
        if self.document.background().is_none() {
            return Err(EngineError::NoImage);
        }
        self.commit_pending();
        self.exporting = true;
        Ok(self.document.snapshot())
    }

    /// Record how an export ended. The document is never modified, and
    /// the lifecycle state (including a detection that finished or is
    /// still running meanwhile) carries on.
    pub fn finish_export<T, E: fmt::Display>(&mut self, result: &Result<T, E>) {
        self.exporting = false;
        if let Err(e) = result {
            self.fail(e);
        }
    }

    /// Back to the upload screen with a fresh document and history.
    pub fn reset(&mut self) {
        let clock = std::mem::replace(&mut self.clock, Box::new(SystemClock));
        *self = Self::with_clock(clock);
    }
}

fn islands_notice(components: u32) -> String {
    format!(
        "The subject was found in {components} separate pieces. \
         Text along the border treats them as one outline."
    )
}
