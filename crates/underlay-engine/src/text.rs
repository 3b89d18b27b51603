//! Single-line text layout.
//!
//! A [`TextRun`] is laid out around an anchor at the origin: horizontally
//! according to [`TextAlign`], vertically centered on the em box (the
//! canvas "middle" baseline). Renderers place the run by translating to
//! the layer's anchor and rotating.

use tiny_skia::{Path, PathBuilder, Rect, Transform};

use crate::font::Typeface;
use crate::layer::TextAlign;
use crate::types::Point;

/// Synthetic bold strokes the outline with this fraction of the size.
pub const BOLD_STROKE_RATIO: f32 = 1.0 / 30.0;

/// Horizontal skew of synthetic italic, in degrees.
pub const ITALIC_SKEW_DEGREES: f32 = 12.0;

/// Underline offset below the middle baseline, as a fraction of the size.
pub const UNDERLINE_OFFSET_RATIO: f32 = 0.1;

/// Underline thickness as a fraction of the size.
pub const UNDERLINE_WIDTH_RATIO: f32 = 0.05;

/// Synthetic style flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
}

/// Total advance of `text` at `size`, including kerning.
#[must_use]
pub fn measure(face: &dyn Typeface, text: &str, size: f32) -> f32 {
    let mut width = 0.0;
    let mut prev: Option<char> = None;
    for ch in text.chars() {
        if let Some(p) = prev {
            width += face.kern(p, ch, size);
        }
        width += face.advance(ch, size);
        prev = Some(ch);
    }
    width
}

/// A laid-out line of text in anchor-relative coordinates.
#[derive(Debug, Clone)]
pub struct TextRun {
    /// Glyph outlines; `None` when nothing is visible (empty or
    /// whitespace-only text).
    pub path: Option<Path>,
    /// Left edge of the run relative to the anchor.
    pub start_x: f32,
    /// Measured advance width.
    pub width: f32,
    pub size: f32,
    pub style: FontStyle,
}

impl TextRun {
    /// Stroke width for synthetic bold, or `None` when not bold.
    #[must_use]
    pub fn bold_stroke_width(&self) -> Option<f32> {
        self.style.bold.then(|| self.size * BOLD_STROKE_RATIO)
    }

    /// The em box of the run: full measured width, `size` tall, centered
    /// vertically on the anchor.
    #[must_use]
    pub fn em_box(&self) -> Option<Rect> {
        Rect::from_xywh(self.start_x, -self.size / 2.0, self.width.max(1.0), self.size.max(1.0))
    }

    /// Underline segment `(from, to)` in anchor-relative coordinates.
    #[must_use]
    pub fn underline(&self) -> ((f32, f32), (f32, f32)) {
        let y = self.size * UNDERLINE_OFFSET_RATIO;
        ((self.start_x, y), (self.start_x + self.width, y))
    }

    #[must_use]
    pub fn underline_width(&self) -> f32 {
        self.size * UNDERLINE_WIDTH_RATIO
    }
}

/// Lay out `text` as one line around the origin.
#[must_use]
pub fn layout_line(
    face: &dyn Typeface,
    text: &str,
    size: f32,
    align: TextAlign,
    style: FontStyle,
) -> TextRun {
    let width = measure(face, text, size);
    #[allow(clippy::cast_possible_truncation)]
    let start_x = align.start_offset(f64::from(width)) as f32;
    let metrics = face.metrics(size);
    let baseline = (metrics.ascent + metrics.descent) / 2.0;

    let mut builder = PathBuilder::new();
    let mut pen = 0.0;
    let mut prev: Option<char> = None;
    for ch in text.chars() {
        if let Some(p) = prev {
            pen += face.kern(p, ch, size);
        }
        face.append_glyph(ch, size, pen, 0.0, &mut builder);
        pen += face.advance(ch, size);
        prev = Some(ch);
    }

    let placement = Transform::from_translate(start_x, baseline);
    let transform = if style.italic {
        placement.pre_concat(italic_skew())
    } else {
        placement
    };
    let path = builder.finish().and_then(|p| p.transform(transform));

    TextRun {
        path,
        start_x,
        width,
        size,
        style,
    }
}

/// Skew about the baseline: glyph tops lean right.
fn italic_skew() -> Transform {
    let k = ITALIC_SKEW_DEGREES.to_radians().tan();
    Transform::from_row(1.0, 0.0, -k, 1.0, 0.0, 0.0)
}

/// A rotated rectangle in surface pixels: the on-screen footprint of a
/// layer, used for the selection outline and for hit testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerBounds {
    /// Corners in order: top-left, top-right, bottom-right, bottom-left
    /// (before rotation).
    pub corners: [Point; 4],
}

impl LayerBounds {
    /// Map an anchor-relative rectangle through `transform`.
    #[must_use]
    pub fn from_rect(rect: Rect, transform: Transform) -> Self {
        let corner = |x: f32, y: f32| {
            let mut p = [tiny_skia::Point::from_xy(x, y)];
            transform.map_points(&mut p);
            Point::new(f64::from(p[0].x), f64::from(p[0].y))
        };
        Self {
            corners: [
                corner(rect.left(), rect.top()),
                corner(rect.right(), rect.top()),
                corner(rect.right(), rect.bottom()),
                corner(rect.left(), rect.bottom()),
            ],
        }
    }

    /// `true` if `p` lies inside (or on the edge of) the quad.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        let mut sign = 0.0_f64;
        for i in 0..4 {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            let cross = (b.x - a.x).mul_add(p.y - a.y, -((b.y - a.y) * (p.x - a.x)));
            if cross.abs() < 1e-9 {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }

    /// Closed outline path for stroking.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_path(&self) -> Option<Path> {
        let mut pb = PathBuilder::new();
        let [first, rest @ ..] = &self.corners;
        pb.move_to(first.x as f32, first.y as f32);
        for c in rest {
            pb.line_to(c.x as f32, c.y as f32);
        }
        pb.close();
        pb.finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::font::BlockFace;

    #[test]
    fn measure_sums_advances() {
        assert!((measure(&BlockFace, "abcd", 10.0) - 24.0).abs() < 1e-4);
        assert!(measure(&BlockFace, "", 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn center_aligned_run_is_symmetric_about_anchor() {
        let run = layout_line(&BlockFace, "ab", 100.0, TextAlign::Center, FontStyle::default());
        assert!((run.start_x + 60.0).abs() < 1e-3);
        let b = run.path.unwrap().bounds();
        assert!((b.left() + 55.0).abs() < 1e-3);
        assert!((b.right() - 55.0).abs() < 1e-3);
    }

    #[test]
    fn glyphs_are_vertically_centered() {
        let run = layout_line(&BlockFace, "a", 100.0, TextAlign::Left, FontStyle::default());
        let b = run.path.unwrap().bounds();
        // Baseline sits at (ascent + descent) / 2 = 30; boxes are 70 tall.
        assert!((b.bottom() - 30.0).abs() < 1e-3);
        assert!((b.top() + 40.0).abs() < 1e-3);
    }

    #[test]
    fn right_aligned_run_ends_at_anchor() {
        let run = layout_line(&BlockFace, "abc", 10.0, TextAlign::Right, FontStyle::default());
        assert!((run.start_x + run.width).abs() < 1e-4);
    }

    #[test]
    fn italic_leans_glyph_tops_right() {
        let upright = layout_line(&BlockFace, "a", 100.0, TextAlign::Left, FontStyle::default());
        let italic = layout_line(
            &BlockFace,
            "a",
            100.0,
            TextAlign::Left,
            FontStyle {
                italic: true,
                bold: false,
            },
        );
        let (u, i) = (upright.path.unwrap().bounds(), italic.path.unwrap().bounds());
        assert!(i.right() > u.right());
        assert!((i.left() - u.left()).abs() < 1e-3);
    }

    #[test]
    fn whitespace_only_has_no_path() {
        let run = layout_line(&BlockFace, "   ", 20.0, TextAlign::Center, FontStyle::default());
        assert!(run.path.is_none());
        assert!(run.width > 0.0);
    }

    #[test]
    fn bold_stroke_is_a_thirtieth_of_size() {
        let run = layout_line(
            &BlockFace,
            "a",
            60.0,
            TextAlign::Left,
            FontStyle {
                bold: true,
                italic: false,
            },
        );
        assert!((run.bold_stroke_width().unwrap() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn underline_sits_below_middle() {
        let run = layout_line(&BlockFace, "ab", 40.0, TextAlign::Left, FontStyle::default());
        let ((x0, y0), (x1, y1)) = run.underline();
        assert!(x0.abs() < 1e-4 && (x1 - 48.0).abs() < 1e-4);
        assert!((y0 - 4.0).abs() < 1e-4 && (y1 - 4.0).abs() < 1e-4);
        assert!((run.underline_width() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn bounds_contain_rotated_points() {
        let rect = Rect::from_xywh(-50.0, -10.0, 100.0, 20.0).unwrap();
        let bounds = LayerBounds::from_rect(
            rect,
            Transform::from_translate(100.0, 100.0).pre_concat(Transform::from_rotate(90.0)),
        );
        assert!(bounds.contains(Point::new(100.0, 140.0)));
        assert!(!bounds.contains(Point::new(140.0, 100.0)));
        assert!(bounds.to_path().is_some());
    }
}
