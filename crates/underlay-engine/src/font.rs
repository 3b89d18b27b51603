//! Typefaces and CSS-style font family resolution.
//!
//! Glyphs are emitted as vector outlines into a `tiny-skia`
//! [`PathBuilder`], so text can be filled with solid colors or gradients,
//! stroked for synthetic bold, and transformed without resampling.
//!
//! Real faces come from TrueType/OpenType data via `ab_glyph`. When no
//! font data is registered for a family (or at all), [`BlockFace`] draws
//! one box per visible character so text never silently disappears.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ab_glyph::{Font, FontArc, OutlineCurve, PxScale, ScaleFont};
use tiny_skia::PathBuilder;

/// Font choices offered by the editor: `(label, CSS family list)`.
pub const FONT_FAMILIES: &[(&str, &str)] = &[
    ("Arial", "Arial, sans-serif"),
    ("Helvetica", "Helvetica, sans-serif"),
    ("Verdana", "Verdana, sans-serif"),
    ("Tahoma", "Tahoma, sans-serif"),
    ("Trebuchet MS", "Trebuchet MS, sans-serif"),
    ("Times New Roman", "Times New Roman, serif"),
    ("Georgia", "Georgia, serif"),
    ("Garamond", "Garamond, serif"),
    ("Courier New", "Courier New, monospace"),
    ("Monaco", "Monaco, monospace"),
    ("Brush Script", "Brush Script MT, cursive"),
    ("Lucida Sans", "Lucida Sans, sans-serif"),
    ("Palatino", "Palatino Linotype, serif"),
    ("Book Antiqua", "Book Antiqua, serif"),
    ("Impact", "Impact, sans-serif"),
    ("Comic Sans", "Comic Sans MS, cursive"),
    ("Futura", "Futura, sans-serif"),
    ("Roboto", "Roboto, sans-serif"),
    ("Open Sans", "Open Sans, sans-serif"),
    ("Lato", "Lato, sans-serif"),
    ("Montserrat", "Montserrat, sans-serif"),
    ("Poppins", "Poppins, sans-serif"),
];

/// Vertical metrics at a given size, in pixels. `descent` is negative
/// (below the baseline).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMetrics {
    pub ascent: f32,
    pub descent: f32,
}

/// A face that can measure characters and emit their outlines.
pub trait Typeface: Send + Sync + fmt::Debug {
    /// Family name the face was registered under.
    fn family(&self) -> &str;

    fn metrics(&self, size: f32) -> VerticalMetrics;

    /// Horizontal advance of `ch` at `size` pixels per em.
    fn advance(&self, ch: char, size: f32) -> f32;

    /// Kerning adjustment between two consecutive characters.
    fn kern(&self, _prev: char, _next: char, _size: f32) -> f32 {
        0.0
    }

    /// Append the outline of `ch` with its origin at `(x, baseline)` in a
    /// y-down coordinate system.
    fn append_glyph(&self, ch: char, size: f32, x: f32, baseline: f32, builder: &mut PathBuilder);
}

/// Error registering font data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("font data for {family:?} is not a valid TrueType/OpenType font")]
pub struct FontError {
    pub family: String,
}

/// A TrueType/OpenType face loaded through `ab_glyph`.
#[derive(Clone)]
pub struct OutlineFace {
    family: String,
    font: FontArc,
}

impl OutlineFace {
    /// Parse font data.
    ///
    /// # Errors
    ///
    /// Returns [`FontError`] if the bytes are not a parseable font.
    pub fn from_bytes(family: impl Into<String>, bytes: Vec<u8>) -> Result<Self, FontError> {
        let family = family.into();
        match FontArc::try_from_vec(bytes) {
            Ok(font) => Ok(Self { family, font }),
            Err(_) => Err(FontError { family }),
        }
    }

    /// `size` is CSS pixels per em. `ab_glyph` scales by the
    /// ascent-to-descent height instead, so rescale by height / em.
    fn px_scale(&self, size: f32) -> PxScale {
        match self.font.units_per_em() {
            Some(upem) if upem > 0.0 => PxScale::from(size * self.font.height_unscaled() / upem),
            _ => PxScale::from(size),
        }
    }
}

impl fmt::Debug for OutlineFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineFace")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

impl Typeface for OutlineFace {
    fn family(&self) -> &str {
        &self.family
    }

    fn metrics(&self, size: f32) -> VerticalMetrics {
        let scaled = self.font.as_scaled(self.px_scale(size));
        VerticalMetrics {
            ascent: scaled.ascent(),
            descent: scaled.descent(),
        }
    }

    fn advance(&self, ch: char, size: f32) -> f32 {
        let scaled = self.font.as_scaled(self.px_scale(size));
        scaled.h_advance(scaled.glyph_id(ch))
    }

    fn kern(&self, prev: char, next: char, size: f32) -> f32 {
        let scaled = self.font.as_scaled(self.px_scale(size));
        scaled.kern(scaled.glyph_id(prev), scaled.glyph_id(next))
    }

    fn append_glyph(&self, ch: char, size: f32, x: f32, baseline: f32, builder: &mut PathBuilder) {
        let scaled = self.font.as_scaled(self.px_scale(size));
        let Some(outline) = self.font.outline(scaled.glyph_id(ch)) else {
            return;
        };
        let sx = scaled.h_scale_factor();
        let sy = scaled.v_scale_factor();
        let map = |p: ab_glyph::Point| (x + p.x * sx, baseline - p.y * sy);

        let mut pen: Option<ab_glyph::Point> = None;
        for curve in &outline.curves {
            let start = match curve {
                OutlineCurve::Line(p0, _) | OutlineCurve::Quad(p0, _, _) | OutlineCurve::Cubic(p0, _, _, _) => *p0,
            };
            if pen != Some(start) {
                if pen.is_some() {
                    builder.close();
                }
                let (mx, my) = map(start);
                builder.move_to(mx, my);
            }
            let end = match *curve {
                OutlineCurve::Line(_, p1) => {
                    let (x1, y1) = map(p1);
                    builder.line_to(x1, y1);
                    p1
                }
                OutlineCurve::Quad(_, c, p1) => {
                    let (cx, cy) = map(c);
                    let (x1, y1) = map(p1);
                    builder.quad_to(cx, cy, x1, y1);
                    p1
                }
                OutlineCurve::Cubic(_, c0, c1, p1) => {
                    let (ax, ay) = map(c0);
                    let (bx, by) = map(c1);
                    let (x1, y1) = map(p1);
                    builder.cubic_to(ax, ay, bx, by, x1, y1);
                    p1
                }
            };
            pen = Some(end);
        }
        if pen.is_some() {
            builder.close();
        }
    }
}

/// Built-in face that draws a solid box for every non-whitespace
/// character. Deterministic metrics make it the face of choice in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockFace;

impl BlockFace {
    pub const FAMILY: &'static str = "block";
    /// Advance as a fraction of the em size.
    pub const ADVANCE: f32 = 0.6;
    pub const ASCENT: f32 = 0.8;
    pub const DESCENT: f32 = -0.2;
    /// Box height as a fraction of the em size.
    const CAP_HEIGHT: f32 = 0.7;
    const SIDE_BEARING: f32 = 0.05;
}

impl Typeface for BlockFace {
    fn family(&self) -> &str {
        Self::FAMILY
    }

    fn metrics(&self, size: f32) -> VerticalMetrics {
        VerticalMetrics {
            ascent: Self::ASCENT * size,
            descent: Self::DESCENT * size,
        }
    }

    fn advance(&self, _ch: char, size: f32) -> f32 {
        Self::ADVANCE * size
    }

    fn append_glyph(&self, ch: char, size: f32, x: f32, baseline: f32, builder: &mut PathBuilder) {
        if ch.is_whitespace() {
            return;
        }
        let left = Self::SIDE_BEARING.mul_add(size, x);
        let right = (Self::ADVANCE - Self::SIDE_BEARING).mul_add(size, x);
        let top = Self::CAP_HEIGHT.mul_add(-size, baseline);
        builder.move_to(left, top);
        builder.line_to(right, top);
        builder.line_to(right, baseline);
        builder.line_to(left, baseline);
        builder.close();
    }
}

/// CSS generic family keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericFamily {
    SansSerif,
    Serif,
    Monospace,
    Cursive,
    Fantasy,
}

impl GenericFamily {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sans-serif" | "system-ui" => Some(Self::SansSerif),
            "serif" => Some(Self::Serif),
            "monospace" => Some(Self::Monospace),
            "cursive" => Some(Self::Cursive),
            "fantasy" => Some(Self::Fantasy),
            _ => None,
        }
    }
}

/// Registered faces, looked up by CSS family lists.
#[derive(Debug, Clone)]
pub struct FontBook {
    faces: HashMap<String, Arc<dyn Typeface>>,
    generics: HashMap<GenericFamily, String>,
    /// Family of the first registered face, used when nothing in a list
    /// matches and no sans-serif default is set.
    first: Option<String>,
    fallback: Arc<dyn Typeface>,
}

impl Default for FontBook {
    fn default() -> Self {
        Self {
            faces: HashMap::new(),
            generics: HashMap::new(),
            first: None,
            fallback: Arc::new(BlockFace),
        }
    }
}

impl FontBook {
    /// An empty book. Every lookup resolves to [`BlockFace`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a face under its family name (case-insensitive).
    pub fn register(&mut self, face: Arc<dyn Typeface>) {
        let key = normalize(face.family());
        tracing::debug!(family = face.family(), "registered font face");
        if self.first.is_none() {
            self.first = Some(key.clone());
        }
        self.faces.insert(key, face);
    }

    /// Parse and register font data under `family`.
    ///
    /// # Errors
    ///
    /// Returns [`FontError`] if the bytes are not a parseable font.
    pub fn register_bytes(&mut self, family: &str, bytes: Vec<u8>) -> Result<(), FontError> {
        let face = OutlineFace::from_bytes(family, bytes)?;
        self.register(Arc::new(face));
        Ok(())
    }

    /// Map a generic keyword (`sans-serif`, ...) to a registered family.
    /// Returns `false` if `family` is not registered.
    pub fn set_generic(&mut self, generic: GenericFamily, family: &str) -> bool {
        let key = normalize(family);
        if !self.faces.contains_key(&key) {
            return false;
        }
        self.generics.insert(generic, key);
        true
    }

    #[must_use]
    pub fn contains(&self, family: &str) -> bool {
        self.faces.contains_key(&normalize(family))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Resolve a CSS family list such as `"Impact, sans-serif"`.
    ///
    /// Entries are tried in order, generic keywords through their
    /// mapping; then the sans-serif default, the first registered face,
    /// and finally [`BlockFace`].
    #[must_use]
    pub fn resolve(&self, families: &str) -> Arc<dyn Typeface> {
        for entry in families.split(',') {
            let name = normalize(entry);
            if name.is_empty() {
                continue;
            }
            if let Some(face) = self.faces.get(&name) {
                return Arc::clone(face);
            }
            if let Some(face) = GenericFamily::parse(&name)
                .and_then(|g| self.generics.get(&g))
                .and_then(|key| self.faces.get(key))
            {
                return Arc::clone(face);
            }
        }
        self.generics
            .get(&GenericFamily::SansSerif)
            .or(self.first.as_ref())
            .and_then(|key| self.faces.get(key))
            .map_or_else(|| Arc::clone(&self.fallback), Arc::clone)
    }
}

fn normalize(name: &str) -> String {
    name.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_ascii_lowercase()
}
