//! Subject masks, foreground cutouts, and the mask provider seam.
//!
//! A [`SubjectMask`] is a binary raster (0 = background, 255 = subject)
//! at the image's native resolution. The [`Subject`] pairs a mask with
//! the cutout derived from it so the two are always replaced together.
//!
//! Segmentation itself is external. [`MaskProvider`] is the seam; when a
//! provider is unavailable or fails, [`resolve_subject`] degrades to an
//! all-background mask so text stays visible and editing continues.

use image::Luma;
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::decode::ImageAsset;
use crate::types::{Dimensions, EngineError, GrayImage, RgbaImage};

/// Mask value for subject pixels.
pub const SUBJECT: u8 = 255;
/// Mask value for background pixels.
pub const BACKGROUND: u8 = 0;

/// A background pixel with at least this many subject 8-neighbours joins
/// the subject during refinement.
const DILATE_NEIGHBOURS: usize = 3;
/// A subject pixel with at least this many background 8-neighbours (after
/// dilation) leaves the subject during refinement.
const ERODE_NEIGHBOURS: usize = 5;

const NEIGHBOURS_8: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Binary subject mask at native image resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectMask {
    dimensions: Dimensions,
    data: Vec<u8>,
}

impl SubjectMask {
    /// Wrap raw mask bytes. Any non-zero value counts as subject and is
    /// normalized to [`SUBJECT`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MaskMismatch`] if `data.len()` is not
    /// `width * height`.
    pub fn new(dimensions: Dimensions, mut data: Vec<u8>) -> Result<Self, EngineError> {
        let expected = dimensions.pixel_count();
        if data.len() != expected {
            return Err(EngineError::MaskMismatch {
                expected,
                actual: data.len(),
            });
        }
        for v in &mut data {
            *v = if *v > 0 { SUBJECT } else { BACKGROUND };
        }
        Ok(Self { dimensions, data })
    }

    /// All-background mask: "no subject detected".
    #[must_use]
    pub fn empty(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            data: vec![BACKGROUND; dimensions.pixel_count()],
        }
    }

    /// Build a mask from a predicate over pixel coordinates.
    #[must_use]
    pub fn from_fn(dimensions: Dimensions, f: impl Fn(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(dimensions.pixel_count());
        for y in 0..dimensions.height {
            for x in 0..dimensions.width {
                data.push(if f(x, y) { SUBJECT } else { BACKGROUND });
            }
        }
        Self { dimensions, data }
    }

    /// Subject wherever the cutout has any opacity.
    #[must_use]
    pub fn from_alpha(cutout: &RgbaImage) -> Self {
        Self {
            dimensions: Dimensions::of(cutout),
            data: cutout
                .pixels()
                .map(|p| if p.0[3] > 0 { SUBJECT } else { BACKGROUND })
                .collect(),
        }
    }

    /// Subject wherever a grayscale mask image is at least mid-gray.
    #[must_use]
    pub fn from_gray(gray: &GrayImage) -> Self {
        Self {
            dimensions: Dimensions::of(gray),
            data: gray
                .pixels()
                .map(|p| if p.0[0] >= 128 { SUBJECT } else { BACKGROUND })
                .collect(),
        }
    }

    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Raw row-major mask bytes, each 0 or 255.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// `true` if `(x, y)` is inside the image and marked as subject.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= i64::from(self.dimensions.width) || y >= i64::from(self.dimensions.height) {
            return false;
        }
        let idx = y as usize * self.dimensions.width as usize + x as usize;
        self.data[idx] == SUBJECT
    }

    /// `true` when no pixel is marked as subject.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == BACKGROUND)
    }

    #[must_use]
    pub fn subject_pixel_count(&self) -> usize {
        self.data.iter().filter(|&&v| v == SUBJECT).count()
    }

    /// The mask as a grayscale image (for display and for `imageproc`).
    #[must_use]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_raw(self.dimensions.width, self.dimensions.height, self.data.clone())
            .unwrap_or_else(|| GrayImage::new(self.dimensions.width, self.dimensions.height))
    }

    /// Nearest-neighbour resample to `target`. Providers that segment a
    /// downscaled copy return masks at the wrong size.
    #[must_use]
    pub fn resized(&self, target: Dimensions) -> Self {
        if target == self.dimensions {
            return self.clone();
        }
        let resized = image::imageops::resize(
            &self.to_gray_image(),
            target.width,
            target.height,
            image::imageops::FilterType::Nearest,
        );
        Self::from_gray(&resized)
    }

    /// Close pinholes and shave single-pixel spurs before tracing.
    ///
    /// A background pixel with at least three subject 8-neighbours
    /// becomes subject; then, in the dilated mask, an interior subject
    /// pixel with at least five background 8-neighbours becomes
    /// background. The one-pixel frame keeps its input values, so a
    /// subject cut off by the image edge stays attached to it.
    #[must_use]
    pub fn refined(&self) -> Self {
        let Dimensions { width, height } = self.dimensions;
        let (w, h) = (i64::from(width), i64::from(height));

        let count = |mask: &Self, x: i64, y: i64, subject: bool| {
            NEIGHBOURS_8
                .iter()
                .map(|(dx, dy)| (x + dx, y + dy))
                .filter(|&(nx, ny)| (0..w).contains(&nx) && (0..h).contains(&ny))
                .filter(|&(nx, ny)| mask.contains(nx, ny) == subject)
                .count()
        };

        let mut dilated = Self::empty(self.dimensions);
        for y in 0..h {
            for x in 0..w {
                if self.contains(x, y) || count(self, x, y, true) >= DILATE_NEIGHBOURS {
                    dilated.set(x, y);
                }
            }
        }

        let mut refined = self.clone();
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let keep = dilated.contains(x, y) && count(&dilated, x, y, false) < ERODE_NEIGHBOURS;
                refined.assign(x, y, keep);
            }
        }
        refined
    }

    /// Number of 8-connected subject islands.
    ///
    /// The contour tracer treats every island as one boundary set, so the
    /// UI warns when this is greater than one.
    #[must_use]
    pub fn component_count(&self) -> u32 {
        let labels = connected_components(&self.to_gray_image(), Connectivity::Eight, Luma([BACKGROUND]));
        labels.pixels().map(|p| p.0[0]).max().unwrap_or(0)
    }

    fn set(&mut self, x: i64, y: i64) {
        self.assign(x, y, true);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn assign(&mut self, x: i64, y: i64, subject: bool) {
        let idx = y as usize * self.dimensions.width as usize + x as usize;
        self.data[idx] = if subject { SUBJECT } else { BACKGROUND };
    }
}

/// Copy of `image` with every background pixel made fully transparent.
///
/// # Errors
///
/// Returns [`EngineError::MaskMismatch`] when the mask and image sizes
/// differ.
pub fn derive_cutout(image: &RgbaImage, mask: &SubjectMask) -> Result<RgbaImage, EngineError> {
    let dims = Dimensions::of(image);
    if dims != mask.dimensions() {
        return Err(EngineError::MaskMismatch {
            expected: dims.pixel_count(),
            actual: mask.dimensions().pixel_count(),
        });
    }
    let mut cutout = image.clone();
    for (pixel, &m) in cutout.pixels_mut().zip(mask.data()) {
        if m == BACKGROUND {
            pixel.0 = [0, 0, 0, 0];
        }
    }
    Ok(cutout)
}

/// The detected subject: mask plus the foreground cutout drawn over text.
///
/// `cutout` is `None` when the mask is empty; there is nothing to draw.
#[derive(Debug, Clone)]
pub struct Subject {
    mask: SubjectMask,
    cutout: Option<ImageAsset>,
}

impl Subject {
    /// No subject: an all-background mask and no foreground.
    #[must_use]
    pub fn none(dimensions: Dimensions) -> Self {
        Self {
            mask: SubjectMask::empty(dimensions),
            cutout: None,
        }
    }

    /// Derive the cutout from `image` and `mask`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MaskMismatch`] when the sizes differ.
    pub fn from_mask(image: &RgbaImage, mask: SubjectMask) -> Result<Self, EngineError> {
        if mask.is_empty() {
            return Ok(Self::none(mask.dimensions()));
        }
        let cutout = derive_cutout(image, &mask)?;
        Ok(Self {
            mask,
            cutout: Some(ImageAsset::from_image(cutout)),
        })
    }

    /// Pair a provider-supplied cutout with the mask derived from it.
    #[must_use]
    pub fn from_parts(mask: SubjectMask, cutout: ImageAsset) -> Self {
        if mask.is_empty() {
            return Self::none(mask.dimensions());
        }
        Self {
            mask,
            cutout: Some(cutout),
        }
    }

    #[must_use]
    pub const fn mask(&self) -> &SubjectMask {
        &self.mask
    }

    #[must_use]
    pub const fn cutout(&self) -> Option<&ImageAsset> {
        self.cutout.as_ref()
    }
}

/// Failure of an external mask provider. Always recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaskError {
    /// No segmentation backend is available.
    #[error("subject detection is unavailable: {0}")]
    Unavailable(String),

    /// The backend ran but failed.
    #[error("subject detection failed: {0}")]
    Failed(String),

    /// The backend returned something that is not a usable mask.
    #[error("subject detection returned an invalid mask: {0}")]
    InvalidOutput(String),
}

/// Produces a subject mask for an image.
pub trait MaskProvider {
    /// Segment `image` into subject and background.
    ///
    /// # Errors
    ///
    /// Returns a [`MaskError`] when segmentation is unavailable or fails.
    fn segment(&self, image: &RgbaImage) -> Result<SubjectMask, MaskError>;
}

/// Treats the image's own alpha channel as the mask. Suitable for inputs
/// that are already cut out.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaMaskProvider;

impl MaskProvider for AlphaMaskProvider {
    fn segment(&self, image: &RgbaImage) -> Result<SubjectMask, MaskError> {
        Ok(SubjectMask::from_alpha(image))
    }
}

/// Returns a mask computed ahead of time (e.g. loaded from a file).
#[derive(Debug, Clone)]
pub struct PrecomputedMask(pub SubjectMask);

impl MaskProvider for PrecomputedMask {
    fn segment(&self, image: &RgbaImage) -> Result<SubjectMask, MaskError> {
        Ok(self.0.resized(Dimensions::of(image)))
    }
}

/// A provider that never has a backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMaskProvider;

impl MaskProvider for NoMaskProvider {
    fn segment(&self, _image: &RgbaImage) -> Result<SubjectMask, MaskError> {
        Err(MaskError::Unavailable("no segmentation backend configured".to_owned()))
    }
}

/// Result of resolving a provider's output into a [`Subject`].
#[derive(Debug, Clone)]
pub enum SubjectOutcome {
    /// The provider succeeded.
    Detected(Subject),
    /// The provider failed; the subject is empty and text renders over
    /// the whole image.
    Degraded { subject: Subject, reason: MaskError },
}

impl SubjectOutcome {
    #[must_use]
    pub const fn subject(&self) -> &Subject {
        match self {
            Self::Detected(subject) | Self::Degraded { subject, .. } => subject,
        }
    }

    #[must_use]
    pub fn into_subject(self) -> Subject {
        match self {
            Self::Detected(subject) | Self::Degraded { subject, .. } => subject,
        }
    }

    /// User-facing warning for a degraded outcome.
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Detected(_) => None,
            Self::Degraded { reason, .. } => Some(format!(
                "{reason}. Text will be drawn over the whole image."
            )),
        }
    }
}

/// Turn a provider result into a subject, degrading on any failure.
#[must_use]
pub fn resolve_subject(image: &RgbaImage, result: Result<SubjectMask, MaskError>) -> SubjectOutcome {
    let dims = Dimensions::of(image);
    let degraded = |reason: MaskError| {
        tracing::warn!(%reason, "subject mask unavailable, continuing without one");
        SubjectOutcome::Degraded {
            subject: Subject::none(dims),
            reason,
        }
    };
    match result {
        Ok(mask) if mask.dimensions() != dims => degraded(MaskError::InvalidOutput(format!(
            "mask is {} but the image is {dims}",
            mask.dimensions()
        ))),
        Ok(mask) => match Subject::from_mask(image, mask) {
            Ok(subject) => SubjectOutcome::Detected(subject),
            Err(e) => degraded(MaskError::InvalidOutput(e.to_string())),
        },
        Err(reason) => degraded(reason),
    }
}

/// Turn a provider-supplied cutout into a subject, degrading on any
/// failure. The mask is the cutout's alpha channel.
#[must_use]
pub fn resolve_cutout(dimensions: Dimensions, result: Result<RgbaImage, MaskError>) -> SubjectOutcome {
    let degraded = |reason: MaskError| {
        tracing::warn!(%reason, "subject cutout unavailable, continuing without one");
        SubjectOutcome::Degraded {
            subject: Subject::none(dimensions),
            reason,
        }
    };
    match result {
        Ok(cutout) if Dimensions::of(&cutout) != dimensions => {
            degraded(MaskError::InvalidOutput(format!(
                "cutout is {} but the image is {dimensions}",
                Dimensions::of(&cutout)
            )))
        }
        Ok(cutout) => {
            let mask = SubjectMask::from_alpha(&cutout);
            SubjectOutcome::Detected(Subject::from_parts(mask, ImageAsset::from_image(cutout)))
        }
        Err(reason) => degraded(reason),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn disc(size: u32, radius: f64) -> SubjectMask {
        let c = f64::from(size) / 2.0;
        SubjectMask::from_fn(Dimensions::new(size, size), |x, y| {
            let dx = f64::from(x) - c;
            let dy = f64::from(y) - c;
            dx.mul_add(dx, dy * dy) <= radius * radius
        })
    }

    #[test]
    fn new_rejects_wrong_length() {
        let err = SubjectMask::new(Dimensions::new(2, 2), vec![0; 3]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MaskMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn new_normalizes_to_binary() {
        let m = SubjectMask::new(Dimensions::new(3, 1), vec![0, 1, 200]).unwrap();
        assert_eq!(m.data(), &[0, 255, 255]);
    }

    #[test]
    fn contains_is_false_out_of_bounds() {
        let m = SubjectMask::from_fn(Dimensions::new(2, 2), |_, _| true);
        assert!(m.contains(1, 1));
        assert!(!m.contains(-1, 0));
        assert!(!m.contains(2, 0));
    }

    #[test]
    fn from_alpha_thresholds_at_any_opacity() {
        let img = RgbaImage::from_fn(3, 1, |x, _| image::Rgba([9, 9, 9, [0, 1, 255][x as usize]]));
        assert_eq!(SubjectMask::from_alpha(&img).data(), &[0, 255, 255]);
    }

    #[test]
    fn cutout_is_transparent_outside_subject() {
        let img = RgbaImage::from_pixel(4, 1, image::Rgba([10, 20, 30, 255]));
        let mask = SubjectMask::from_fn(Dimensions::new(4, 1), |x, _| x >= 2);
        let cutout = derive_cutout(&img, &mask).unwrap();
        assert_eq!(cutout.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(cutout.get_pixel(3, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn cutout_rejects_size_mismatch() {
        let img = RgbaImage::new(4, 4);
        let mask = SubjectMask::empty(Dimensions::new(2, 2));
        assert!(derive_cutout(&img, &mask).is_err());
    }

    #[test]
    fn refine_fills_pinholes_and_keeps_frame() {
        let mut mask = SubjectMask::from_fn(Dimensions::new(9, 9), |_, _| true);
        mask.data[4 * 9 + 4] = BACKGROUND;
        let refined = mask.refined();
        assert!(refined.contains(4, 4));
        assert!(refined.contains(0, 4));
        assert!(refined.contains(8, 8));
    }

    #[test]
    fn refine_leaves_edge_touching_subject_attached() {
        // Left third is subject, running off the image edge.
        let mask = SubjectMask::from_fn(Dimensions::new(9, 9), |x, _| x < 3);
        let refined = mask.refined();
        for y in 0..9 {
            assert!(refined.contains(0, y));
            assert!(refined.contains(1, y));
        }
        assert!(!refined.contains(8, 4));
    }

    #[test]
    fn refine_passes_thin_masks_through() {
        let mask = SubjectMask::from_fn(Dimensions::new(5, 2), |x, _| x == 1);
        assert_eq!(mask.refined(), mask);
    }

    #[test]
    fn refine_removes_isolated_pixel() {
        let mask = SubjectMask::from_fn(Dimensions::new(7, 7), |x, y| x == 3 && y == 3);
        assert!(mask.refined().is_empty());
    }

    #[test]
    fn component_count_counts_islands() {
        let two = SubjectMask::from_fn(Dimensions::new(10, 4), |x, y| (1..=2).contains(&y) && (x <= 2 || x >= 7));
        assert_eq!(two.component_count(), 2);
        assert_eq!(disc(20, 6.0).component_count(), 1);
        assert_eq!(SubjectMask::empty(Dimensions::new(5, 5)).component_count(), 0);
    }

    #[test]
    fn resize_keeps_binary_values() {
        let mask = disc(10, 3.0).resized(Dimensions::new(20, 20));
        assert_eq!(mask.dimensions(), Dimensions::new(20, 20));
        assert!(mask.data().iter().all(|&v| v == 0 || v == 255));
        assert!(mask.contains(10, 10));
    }

    #[test]
    fn empty_mask_subject_has_no_cutout() {
        let img = RgbaImage::new(3, 3);
        let subject = Subject::from_mask(&img, SubjectMask::empty(Dimensions::new(3, 3))).unwrap();
        assert!(subject.cutout().is_none());
        assert!(subject.mask().is_empty());
    }

    #[test]
    fn provider_failure_degrades_to_empty_mask() {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));
        let outcome = resolve_subject(&img, NoMaskProvider.segment(&img));
        assert!(matches!(outcome, SubjectOutcome::Degraded { .. }));
        assert!(outcome.warning().is_some());
        assert!(outcome.subject().mask().is_empty());
        assert!(outcome.subject().cutout().is_none());
    }

    #[test]
    fn wrong_size_mask_degrades() {
        let img = RgbaImage::new(4, 4);
        let outcome = resolve_subject(&img, Ok(SubjectMask::empty(Dimensions::new(2, 2))));
        assert!(matches!(
            outcome,
            SubjectOutcome::Degraded {
                reason: MaskError::InvalidOutput(_),
                ..
            }
        ));
    }

    #[test]
    fn alpha_provider_detects_opaque_region() {
        let img = RgbaImage::from_fn(4, 4, |x, _| image::Rgba([5, 5, 5, if x < 2 { 255 } else { 0 }]));
        let outcome = resolve_subject(&img, AlphaMaskProvider.segment(&img));
        assert!(matches!(outcome, SubjectOutcome::Detected(_)));
        let subject = outcome.into_subject();
        assert_eq!(subject.mask().subject_pixel_count(), 8);
        assert!(subject.cutout().is_some());
    }

    #[test]
    fn precomputed_mask_is_resampled_to_image() {
        let provider = PrecomputedMask(disc(8, 3.0));
        let mask = provider.segment(&RgbaImage::new(16, 16)).unwrap();
        assert_eq!(mask.dimensions(), Dimensions::new(16, 16));
    }

    #[test]
    fn cutout_alpha_becomes_the_mask() {
        let cutout = RgbaImage::from_fn(4, 4, |x, _| image::Rgba([9, 9, 9, if x < 2 { 255 } else { 0 }]));
        let outcome = resolve_cutout(Dimensions::new(4, 4), Ok(cutout));
        assert!(outcome.warning().is_none());
        assert_eq!(outcome.subject().mask().subject_pixel_count(), 8);
        assert!(outcome.subject().cutout().is_some());
    }

    #[test]
    fn wrong_size_cutout_degrades() {
        let outcome = resolve_cutout(Dimensions::new(4, 4), Ok(RgbaImage::new(2, 2)));
        assert!(outcome.warning().is_some());
        assert!(outcome.subject().cutout().is_none());
    }
}
