//! Scene composition shared by the interactive and export renderers.
//!
//! A frame is an ordered [`RenderPlan`] of [`RenderPass`]es. The
//! "text behind subject" effect is nothing more than the order of the
//! passes: text layers are drawn after the background and before the
//! opaque subject cutout.

use tiny_skia::{
    Color as SkColor, FillRule, GradientStop, LineCap, LinearGradient, Paint, PathBuilder, Pixmap,
    PixmapPaint, Shader, SpreadMode, Stroke, Transform,
};

use crate::coords::CoordinateMapper;
use crate::font::FontBook;
use crate::layer::{LayerId, TextLayer};
use crate::raster::{blur_pixmap, draw_image, new_pixmap, rgba_from_pixmap};
use crate::text::{FontStyle, LayerBounds, TextRun, layout_line};
use crate::types::{Color, Dimensions, EngineError, RgbaImage};

/// Selection outline color (indigo).
pub const SELECTION_COLOR: Color = Color::rgb(99, 102, 241);
/// Selection outline width in surface pixels.
pub const SELECTION_WIDTH: f32 = 2.0;
/// Padding between a layer's em box and its selection outline.
pub const SELECTION_PADDING: f32 = 4.0;

/// One drawing step of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPass {
    /// The adjusted background image, stretched over the surface.
    Background,
    /// Every text layer, in collection order (later layers on top).
    TextLayers,
    /// The subject cutout, opaque over everything drawn before it.
    SubjectCutout,
    /// An outline around the selected layer. Preview only.
    SelectionOutline,
}

/// Ordered list of passes making up a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan(Vec<RenderPass>);

impl RenderPlan {
    /// Background, text, then the subject on top.
    #[must_use]
    pub fn export() -> Self {
        Self(vec![
            RenderPass::Background,
            RenderPass::TextLayers,
            RenderPass::SubjectCutout,
        ])
    }

    /// The export plan plus the selection outline.
    #[must_use]
    pub fn interactive() -> Self {
        let mut plan = Self::export();
        plan.0.push(RenderPass::SelectionOutline);
        plan
    }

    /// A custom ordering.
    #[must_use]
    pub const fn with_passes(passes: Vec<RenderPass>) -> Self {
        Self(passes)
    }

    #[must_use]
    pub fn passes(&self) -> &[RenderPass] {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, pass: RenderPass) -> bool {
        self.0.contains(&pass)
    }
}

/// Inputs for one frame.
///
/// `background` should already be adjusted; both images are stretched to
/// the mapper's target surface.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub background: Option<&'a RgbaImage>,
    pub cutout: Option<&'a RgbaImage>,
    pub layers: &'a [TextLayer],
    pub selected: Option<LayerId>,
    pub mapper: CoordinateMapper,
}

/// A rendered frame plus where each layer landed.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub image: RgbaImage,
    pub layer_bounds: Vec<(LayerId, LayerBounds)>,
}

/// Compose `frame` according to `plan`.
///
/// # Errors
///
/// Returns [`EngineError::Surface`] if the target cannot be allocated.
pub fn render_frame(
    frame: &Frame<'_>,
    plan: &RenderPlan,
    fonts: &FontBook,
) -> Result<RenderedFrame, EngineError> {
    let dims = frame.mapper.target().pixel_dimensions();
    let _span = tracing::debug_span!("render_frame", %dims, layers = frame.layers.len()).entered();
    let mut pixmap = new_pixmap(dims)?;
    let mut layer_bounds = Vec::with_capacity(frame.layers.len());

    for pass in plan.passes() {
        match pass {
            RenderPass::Background => {
                if let Some(bg) = frame.background {
                    draw_image(&mut pixmap, bg)?;
                }
            }
            RenderPass::TextLayers => {
                for layer in frame.layers {
                    let bounds = draw_text_layer(&mut pixmap, layer, &frame.mapper, fonts)?;
                    layer_bounds.push((layer.id, bounds));
                }
            }
            RenderPass::SubjectCutout => {
                if let Some(cutout) = frame.cutout {
                    draw_image(&mut pixmap, cutout)?;
                }
            }
            RenderPass::SelectionOutline => {
                let selected = frame.selected.and_then(|id| {
                    frame.layers.iter().find(|l| l.id == id).map(|layer| {
                        layer_geometry(layer, &frame.mapper, fonts).outline_bounds()
                    })
                });
                if let Some(bounds) = selected {
                    draw_selection(&mut pixmap, &bounds);
                }
            }
        }
    }

    Ok(RenderedFrame {
        image: rgba_from_pixmap(&pixmap),
        layer_bounds,
    })
}

/// Laid-out run plus its placement on the surface.
struct LayerGeometry {
    run: TextRun,
    transform: Transform,
}

impl LayerGeometry {
    fn bounds(&self) -> LayerBounds {
        self.run.em_box().map_or(
            LayerBounds {
                corners: [crate::types::Point::new(
                    f64::from(self.transform.tx),
                    f64::from(self.transform.ty),
                ); 4],
            },
            |rect| LayerBounds::from_rect(rect, self.transform),
        )
    }

    fn outline_bounds(&self) -> LayerBounds {
        let pad = SELECTION_PADDING;
        self.run
            .em_box()
            .and_then(|r| tiny_skia::Rect::from_ltrb(r.left() - pad, r.top() - pad, r.right() + pad, r.bottom() + pad))
            .map_or_else(|| self.bounds(), |rect| LayerBounds::from_rect(rect, self.transform))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn layer_geometry(layer: &TextLayer, mapper: &CoordinateMapper, fonts: &FontBook) -> LayerGeometry {
    let face = fonts.resolve(&layer.font_family);
    let size = mapper.scale(layer.size) as f32;
    let run = layout_line(
        face.as_ref(),
        &layer.content,
        size,
        layer.text_align,
        FontStyle {
            bold: layer.is_bold,
            italic: layer.is_italic,
        },
    );
    let anchor = mapper.to_pixels(layer.position);
    let transform = Transform::from_translate(anchor.x as f32, anchor.y as f32)
        .pre_concat(Transform::from_rotate(layer.rotation as f32));
    LayerGeometry { run, transform }
}

/// Paint for the glyph fill: the vertical gradient over the em box when
/// enabled, otherwise the solid layer color.
fn fill_paint(layer: &TextLayer, run: &TextRun) -> Paint<'static> {
    let mut paint = Paint {
        anti_alias: true,
        ..Paint::default()
    };
    let half = run.size / 2.0;
    let gradient = layer
        .gradient
        .enabled
        .then(|| {
            LinearGradient::new(
                tiny_skia::Point::from_xy(0.0, -half),
                tiny_skia::Point::from_xy(0.0, half),
                vec![
                    GradientStop::new(0.0, layer.gradient.color1.to_skia()),
                    GradientStop::new(1.0, layer.gradient.color2.to_skia()),
                ],
                SpreadMode::Pad,
                Transform::identity(),
            )
        })
        .flatten();
    match gradient {
        Some(shader) => paint.shader = shader,
        None => paint.set_color(layer.color.to_skia()),
    }
    paint
}

pub(crate) fn solid_paint(color: SkColor) -> Paint<'static> {
    Paint {
        shader: Shader::SolidColor(color),
        anti_alias: true,
        ..Paint::default()
    }
}

/// Fill, bold stroke, and underline of one run with the given paints.
pub(crate) fn paint_run(
    target: &mut Pixmap,
    run: &TextRun,
    fill: &Paint<'_>,
    underline: &Paint<'_>,
    underlined: bool,
    transform: Transform,
) {
    if let Some(path) = &run.path {
        target.fill_path(path, fill, FillRule::Winding, transform, None);
        if let Some(width) = run.bold_stroke_width() {
            let stroke = Stroke {
                width,
                ..Stroke::default()
            };
            target.stroke_path(path, fill, &stroke, transform, None);
        }
    }
    if underlined && run.width > 0.0 {
        let ((x0, y0), (x1, y1)) = run.underline();
        let mut pb = PathBuilder::new();
        pb.move_to(x0, y0);
        pb.line_to(x1, y1);
        if let Some(line) = pb.finish() {
            let stroke = Stroke {
                width: run.underline_width(),
                line_cap: LineCap::Butt,
                ..Stroke::default()
            };
            target.stroke_path(&line, underline, &stroke, transform, None);
        }
    }
}

/// Draw one text layer: shadow, fill, synthetic bold, underline, all at
/// the layer's opacity.
///
/// Returns the layer's rotated em-box bounds on the surface.
///
/// # Errors
///
/// Returns [`EngineError::Surface`] if an intermediate surface cannot be
/// allocated.
#[allow(clippy::cast_possible_truncation)]
pub fn draw_text_layer(
    target: &mut Pixmap,
    layer: &TextLayer,
    mapper: &CoordinateMapper,
    fonts: &FontBook,
) -> Result<LayerBounds, EngineError> {
    let geometry = layer_geometry(layer, mapper, fonts);
    let bounds = geometry.bounds();
    if layer.opacity <= 0.0 || (geometry.run.path.is_none() && !layer.is_underlined) {
        return Ok(bounds);
    }

    let underline_color = if layer.gradient.enabled {
        layer.gradient.color1
    } else {
        layer.color
    };
    let fill = fill_paint(layer, &geometry.run);
    let underline = solid_paint(underline_color.to_skia());

    let opaque = layer.opacity >= 1.0;
    let mut group = if opaque {
        None
    } else {
        Some(new_pixmap(Dimensions::new(target.width(), target.height()))?)
    };
    let canvas = group.as_mut().unwrap_or(&mut *target);

    if layer.text_shadow.enabled {
        draw_shadow(canvas, layer, &geometry, mapper)?;
    }
    paint_run(
        canvas,
        &geometry.run,
        &fill,
        &underline,
        layer.is_underlined,
        geometry.transform,
    );

    if let Some(group) = group {
        target.draw_pixmap(
            0,
            0,
            group.as_ref(),
            &PixmapPaint {
                opacity: layer.opacity as f32,
                ..PixmapPaint::default()
            },
            Transform::identity(),
            None,
        );
    }
    Ok(bounds)
}

/// Render the layer's silhouette in the shadow color into a tight
/// offscreen surface, blur it, and composite it at the shadow offset.
///
/// A canvas `shadowBlur` of `b` corresponds to a Gaussian of sigma `b / 2`.
#[allow(clippy::cast_possible_truncation)]
fn draw_shadow(
    target: &mut Pixmap,
    layer: &TextLayer,
    geometry: &LayerGeometry,
    mapper: &CoordinateMapper,
) -> Result<(), EngineError> {
    let shadow = &layer.text_shadow;
    let sigma = (mapper.scale(shadow.blur) / 2.0) as f32;
    let dx = mapper.scale(shadow.offset_x) as f32;
    let dy = mapper.scale(shadow.offset_y) as f32;

    let Some(rect) = geometry.run.em_box() else {
        return Ok(());
    };
    let footprint = LayerBounds::from_rect(rect, geometry.transform);
    let pad = 3.0f32.mul_add(sigma, geometry.run.size * 0.5).ceil();
    let xs = footprint.corners.map(|p| p.x as f32 + dx);
    let ys = footprint.corners.map(|p| p.y as f32 + dy);
    let left = (xs.iter().copied().fold(f32::INFINITY, f32::min) - pad).floor();
    let top = (ys.iter().copied().fold(f32::INFINITY, f32::min) - pad).floor();
    let right = (xs.iter().copied().fold(f32::NEG_INFINITY, f32::max) + pad).ceil();
    let bottom = (ys.iter().copied().fold(f32::NEG_INFINITY, f32::max) + pad).ceil();

    #[allow(clippy::cast_sign_loss)]
    let dims = Dimensions::new((right - left).max(1.0) as u32, (bottom - top).max(1.0) as u32);
    let mut offscreen = new_pixmap(dims)?;
    let color = solid_paint(shadow.color.to_skia());
    let transform = geometry.transform.post_translate(dx - left, dy - top);
    paint_run(
        &mut offscreen,
        &geometry.run,
        &color,
        &color,
        layer.is_underlined,
        transform,
    );
    let blurred = blur_pixmap(&offscreen, sigma);
    target.draw_pixmap(
        left as i32,
        top as i32,
        blurred.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(())
}

fn draw_selection(target: &mut Pixmap, bounds: &LayerBounds) {
    let Some(path) = bounds.to_path() else {
        return;
    };
    let paint = solid_paint(SELECTION_COLOR.to_skia());
    let stroke = Stroke {
        width: SELECTION_WIDTH,
        ..Stroke::default()
    };
    target.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}
