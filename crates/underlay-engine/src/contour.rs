//! Subject outline tracing and arc-length text placement.
//!
//! The tracer turns a subject mask into one closed, smoothed outline:
//!
//! 1. **Boundary extraction**: subject pixels with at least one
//!    4-connected background neighbour (the one-pixel frame is skipped).
//! 2. **Greedy ordering**: start at the first boundary pixel in row-major
//!    order and repeatedly hop to the nearest unvisited one. An R-tree
//!    answers the nearest-neighbour queries; exact distance ties go to
//!    the lowest row-major index so the result is deterministic.
//! 3. **Smoothing**: each point becomes the mean of a circular window of
//!    ±[`SMOOTHING_RADIUS`] neighbours.
//!
//! Masks with several islands are traced as one boundary set; the greedy
//! walk jumps between islands. [`SubjectMask::component_count`] lets
//! callers detect and report this.

use std::f64::consts::FRAC_PI_2;

use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::mask::SubjectMask;
use crate::types::{EngineError, Point, Polyline};

/// Half-width of the circular moving-average window.
pub const SMOOTHING_RADIUS: usize = 10;

/// Outlines with fewer boundary points than this are rejected.
pub const MIN_OUTLINE_POINTS: usize = 5;

/// Errors specific to silhouette (text-along-border) rendering.
#[derive(Debug, thiserror::Error)]
pub enum SilhouetteError {
    /// The mask has no subject boundary at all.
    #[error("no subject outline found; try an image with a clearer subject")]
    OutlineNotFound,

    /// The boundary is too short to carry text.
    #[error("subject outline is too small ({0} points)")]
    OutlineTooSmall(usize),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A closed outline with its precomputed perimeter.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    polyline: Polyline,
    perimeter: f64,
}

impl Outline {
    #[must_use]
    pub fn new(polyline: Polyline) -> Self {
        let perimeter = polyline.closed_length();
        Self {
            polyline,
            perimeter,
        }
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        self.polyline.points()
    }

    #[must_use]
    pub const fn polyline(&self) -> &Polyline {
        &self.polyline
    }

    /// Closed length, including the segment back to the start.
    #[must_use]
    pub const fn perimeter(&self) -> f64 {
        self.perimeter
    }
}

/// Strategy for turning a mask into an outline.
pub trait ContourTracer {
    /// Trace the subject outline of `mask`.
    ///
    /// # Errors
    ///
    /// Returns [`SilhouetteError::OutlineNotFound`] when there is no
    /// boundary and [`SilhouetteError::OutlineTooSmall`] when it has
    /// fewer than [`MIN_OUTLINE_POINTS`] points.
    fn trace(&self, mask: &SubjectMask) -> Result<Outline, SilhouetteError>;
}

/// Boundary scan + greedy nearest-neighbour ordering + smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreedyBoundaryTracer {
    pub smoothing_radius: usize,
}

impl Default for GreedyBoundaryTracer {
    fn default() -> Self {
        Self {
            smoothing_radius: SMOOTHING_RADIUS,
        }
    }
}

impl ContourTracer for GreedyBoundaryTracer {
    fn trace(&self, mask: &SubjectMask) -> Result<Outline, SilhouetteError> {
        let boundary = boundary_pixels(mask);
        match boundary.len() {
            0 => return Err(SilhouetteError::OutlineNotFound),
            n if n < MIN_OUTLINE_POINTS => return Err(SilhouetteError::OutlineTooSmall(n)),
            _ => {}
        }
        let ordered = order_nearest_neighbor(&boundary);
        let smoothed = smooth_closed(&ordered, self.smoothing_radius);
        tracing::debug!(
            boundary = boundary.len(),
            components = mask.component_count(),
            "traced subject outline"
        );
        Ok(Outline::new(Polyline::new(smoothed)))
    }
}

/// Subject pixels with a 4-connected background neighbour, in row-major
/// order. The outermost row and column on each side are not scanned.
#[must_use]
pub fn boundary_pixels(mask: &SubjectMask) -> Vec<Point> {
    let dims = mask.dimensions();
    let (w, h) = (i64::from(dims.width), i64::from(dims.height));
    let mut points = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            if !mask.contains(x, y) {
                continue;
            }
            let edge = !mask.contains(x, y - 1)
                || !mask.contains(x + 1, y)
                || !mask.contains(x, y + 1)
                || !mask.contains(x - 1, y);
            if edge {
                #[allow(clippy::cast_precision_loss)]
                points.push(Point::new(x as f64, y as f64));
            }
        }
    }
    points
}

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Greedy nearest-neighbour ordering starting at `points[0]`.
///
/// Ties on exact distance are broken by the lowest index into `points`.
#[must_use]
pub fn order_nearest_neighbor(points: &[Point]) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    let mut tree: RTree<IndexedPoint> = RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, p)| GeomWithData::new([p.x, p.y], i))
            .collect(),
    );

    let mut ordered = Vec::with_capacity(points.len());
    ordered.push(first);
    let mut current = first;

    while tree.size() > 0 {
        let mut best: Option<(f64, IndexedPoint)> = None;
        for (candidate, d2) in tree.nearest_neighbor_iter_with_distance_2(&[current.x, current.y]) {
            match best {
                None => best = Some((d2, *candidate)),
                Some((best_d2, best_item)) => {
                    if d2 > best_d2 {
                        break;
                    }
                    if candidate.data < best_item.data {
                        best = Some((d2, *candidate));
                    }
                }
            }
        }
        let Some((_, next)) = best else {
            break;
        };
        tree.remove(&next);
        current = points[next.data];
        ordered.push(current);
    }
    ordered
}

/// Circular moving average with a window of `±radius` points.
///
/// The window always spans `2 * radius + 1` samples and wraps around the
/// closed outline, visiting points more than once on short outlines.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn smooth_closed(points: &[Point], radius: usize) -> Vec<Point> {
    let n = points.len();
    if n < 3 || radius == 0 {
        return points.to_vec();
    }
    let window = (2 * radius + 1) as f64;
    let back = n - radius % n;
    (0..n)
        .map(|i| {
            let (sx, sy) = (0..=2 * radius).fold((0.0, 0.0), |(sx, sy), k| {
                let p = points[(i + k + back) % n];
                (sx + p.x, sy + p.y)
            });
            Point::new(sx / window, sy / window)
        })
        .collect()
}

/// Text-along-border layout parameters, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementParams {
    pub font_size: f64,
    /// Gap between consecutive characters along the outline.
    pub spacing: f64,
    /// Gap between the outline and the glyph edge.
    pub distance: f64,
    /// Rotate glyphs to follow the outline's tangent.
    pub rotate: bool,
}

/// One character placed along an outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphSlot {
    pub ch: char,
    /// Index of the outline point this slot was sampled from.
    pub sample: usize,
    pub position: Point,
    /// Rotation in radians (0 when rotation is off).
    pub angle: f64,
}

/// Distribute copies of `text` evenly around `outline`.
///
/// The pitch is the average character advance (`text_width / chars`)
/// plus `spacing`; `floor(perimeter / pitch)` slots are placed, cycling
/// through the text. Each glyph sits `distance + font_size / 2` along the
/// normal; the side is flipped whenever the first choice lands inside the
/// subject, so glyphs end up outside it.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn place_text(
    outline: &Outline,
    mask: &SubjectMask,
    text: &str,
    text_width: f64,
    params: &PlacementParams,
) -> Vec<GlyphSlot> {
    let chars: Vec<char> = text.chars().collect();
    let points = outline.points();
    let n = points.len();
    if chars.is_empty() || n < 2 {
        return Vec::new();
    }
    let pitch = text_width / chars.len() as f64 + params.spacing;
    if pitch <= 0.0 || !pitch.is_finite() {
        return Vec::new();
    }
    let total = (outline.perimeter() / pitch).floor() as usize;
    if total == 0 {
        return Vec::new();
    }

    let step = n as f64 / total as f64;
    let offset = params.font_size.mul_add(0.5, params.distance);
    (0..total)
        .map(|i| {
            let sample = ((i as f64 * step).floor() as usize) % n;
            let here = points[sample];
            let angle = here.angle_to(points[(sample + 1) % n]);
            let normal = angle + FRAC_PI_2;
            let (ny, nx) = normal.sin_cos();
            let outward = Point::new(offset.mul_add(nx, here.x), offset.mul_add(ny, here.y));
            let inside = mask.contains(outward.x.round() as i64, outward.y.round() as i64);
            let position = if inside {
                Point::new(offset.mul_add(-nx, here.x), offset.mul_add(-ny, here.y))
            } else {
                outward
            };
            GlyphSlot {
                ch: chars[i % chars.len()],
                sample,
                position,
                angle: if params.rotate { angle } else { 0.0 },
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::PI;

    use super::*;
    use crate::types::Dimensions;

    fn disc(size: u32, radius: f64) -> SubjectMask {
        let c = f64::from(size) / 2.0;
        SubjectMask::from_fn(Dimensions::new(size, size), |x, y| {
            let dx = f64::from(x) - c;
            let dy = f64::from(y) - c;
            dx.mul_add(dx, dy * dy) <= radius * radius
        })
    }

    fn params() -> PlacementParams {
        PlacementParams {
            font_size: 24.0,
            spacing: 15.0,
            distance: 20.0,
            rotate: true,
        }
    }

    #[test]
    fn empty_mask_has_no_outline() {
        let mask = SubjectMask::empty(Dimensions::new(20, 20));
        assert!(matches!(
            GreedyBoundaryTracer::default().trace(&mask),
            Err(SilhouetteError::OutlineNotFound)
        ));
    }

    #[test]
    fn tiny_subject_is_too_small() {
        let mask = SubjectMask::from_fn(Dimensions::new(10, 10), |x, y| (4..=5).contains(&x) && y == 4);
        assert!(matches!(
            GreedyBoundaryTracer::default().trace(&mask),
            Err(SilhouetteError::OutlineTooSmall(2))
        ));
    }

    #[test]
    fn boundary_excludes_interior_and_frame() {
        let mask = SubjectMask::from_fn(Dimensions::new(7, 7), |x, y| (1..=5).contains(&x) && (1..=5).contains(&y));
        let boundary = boundary_pixels(&mask);
        // 5x5 square: 16 edge pixels, interior 3x3 excluded.
        assert_eq!(boundary.len(), 16);
        assert!(!boundary.contains(&Point::new(3.0, 3.0)));
        assert_eq!(boundary[0], Point::new(1.0, 1.0));
    }

    #[test]
    fn greedy_order_ties_go_to_lowest_index() {
        // From the origin, points 1 and 2 are equidistant; index 1 wins.
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(-1.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(5.0, 0.0),
        ];
        let ordered = order_nearest_neighbor(&pts);
        assert_eq!(ordered[1], Point::new(-1.0, 0.0));
        assert_eq!(ordered[2], Point::new(1.0, 0.0));
        assert_eq!(ordered.len(), 4);
    }

    #[test]
    fn greedy_order_visits_every_point_once() {
        let boundary = boundary_pixels(&disc(60, 20.0));
        let ordered = order_nearest_neighbor(&boundary);
        assert_eq!(ordered.len(), boundary.len());
        let mut sorted = ordered.clone();
        sorted.sort_by(|a, b| (a.y, a.x).partial_cmp(&(b.y, b.x)).unwrap());
        sorted.dedup();
        assert_eq!(sorted.len(), boundary.len());
    }

    #[test]
    fn smoothing_preserves_straight_lines() {
        let line: Vec<Point> = (0..30).map(|i| Point::new(f64::from(i), 0.0)).collect();
        let smoothed = smooth_closed(&line, 3);
        assert!((smoothed[10].x - 10.0).abs() < 1e-9);
        assert_eq!(smoothed.len(), 30);
    }

    #[test]
    fn smoothing_wraps_full_window_on_short_outlines() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        // Offsets -10..=10 around point 0 hit point 2 six times and the
        // others five times each.
        let smoothed = smooth_closed(&square, SMOOTHING_RADIUS);
        assert_eq!(smoothed.len(), 4);
        assert!((smoothed[0].x - 22.0 / 21.0).abs() < 1e-9);
        assert!((smoothed[0].y - 22.0 / 21.0).abs() < 1e-9);
    }

    #[test]
    fn circle_perimeter_is_close_to_two_pi_r() {
        let radius = 60.0;
        let mask = disc(200, radius);
        let outline = GreedyBoundaryTracer::default().trace(&mask).unwrap();
        let expected = 2.0 * PI * radius;
        let rel = (outline.perimeter() - expected).abs() / expected;
        assert!(rel < 0.06, "perimeter {} vs {expected}", outline.perimeter());
    }

    #[test]
    fn placement_fills_whole_slots_only() {
        let mask = disc(200, 60.0);
        let outline = GreedyBoundaryTracer::default().trace(&mask).unwrap();
        let text = "NEYMAR";
        let text_width = 6.0 * 14.4;
        let p = params();
        let slots = place_text(&outline, &mask, text, text_width, &p);

        let pitch = text_width / 6.0 + p.spacing;
        let max_slots = (outline.perimeter() / pitch).floor() as usize;
        assert!(!slots.is_empty());
        assert!(slots.len() <= max_slots);
        for pair in slots.windows(2) {
            assert!(pair[1].sample > pair[0].sample);
        }
        assert_eq!(slots[0].ch, 'N');
        assert_eq!(slots[6].ch, 'N');
    }

    #[test]
    fn glyphs_land_outside_the_subject() {
        let mask = disc(200, 60.0);
        let outline = GreedyBoundaryTracer::default().trace(&mask).unwrap();
        let p = params();
        let slots = place_text(&outline, &mask, "AB", 30.0, &p);
        let center = Point::new(100.0, 100.0);
        for slot in &slots {
            assert!(!mask.contains(slot.position.x.round() as i64, slot.position.y.round() as i64));
            // About distance + size / 2 = 32 beyond the edge.
            let r = slot.position.distance(center);
            assert!(r > 75.0 && r < 100.0, "r = {r}");
        }
    }

    #[test]
    fn rotation_off_zeroes_angles() {
        let mask = disc(100, 30.0);
        let outline = GreedyBoundaryTracer::default().trace(&mask).unwrap();
        let p = PlacementParams {
            rotate: false,
            ..params()
        };
        assert!(place_text(&outline, &mask, "X", 10.0, &p).iter().all(|s| s.angle == 0.0));
    }

    #[test]
    fn empty_text_places_nothing() {
        let mask = disc(100, 30.0);
        let outline = GreedyBoundaryTracer::default().trace(&mask).unwrap();
        assert!(place_text(&outline, &mask, "", 10.0, &params()).is_empty());
    }
}
