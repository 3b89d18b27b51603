//! Render a photo with text behind, over, or around its subject, using
//! the same engine as the browser editor.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use underlay_engine::coords::preview_surface_for;
use underlay_engine::decode::decode_image;
use underlay_engine::mask::resolve_cutout;
use underlay_engine::overlay::{DEFAULT_OUTLINE_WIDTH, render_text_upon};
use underlay_engine::silhouette::{DEFAULT_DISTANCE, DEFAULT_SPACING, render_silhouette};
use underlay_engine::{
    Adjustments, AspectRatio, Color, Dimensions, Document, ExportRenderer, FontBook, ImageAsset,
    NormalizedPosition, OverlayConfig, RgbaImage, SilhouetteConfig, Subject, SubjectMask, Surface,
    TextLayer,
};

/// Render a photo with text behind, over, or around its subject.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input photo path.
    input: PathBuf,

    /// Output image path (PNG recommended).
    #[arg(short, long)]
    output: PathBuf,

    /// How text is combined with the subject.
    #[arg(long, value_enum, default_value_t = Mode::Behind)]
    mode: Mode,

    /// Subject mask image; pixels at or above mid-gray are subject.
    #[arg(long, value_name = "PATH", conflicts_with = "cutout")]
    mask: Option<PathBuf>,

    /// Subject cutout image; non-transparent pixels are subject.
    #[arg(long, value_name = "PATH")]
    cutout: Option<PathBuf>,

    /// Document JSON with `layers`, `adjustments`, `aspectRatio` and
    /// `previewWidth` (behind mode).
    #[arg(long, value_name = "PATH")]
    document: Option<PathBuf>,

    /// Register a font file under a family name. Repeatable; the first
    /// font also answers for `sans-serif`.
    #[arg(long = "font", value_name = "FAMILY=PATH")]
    fonts: Vec<String>,

    /// Text for the upon and border modes.
    #[arg(long)]
    text: Option<String>,

    /// Font size in pixels for the upon and border modes.
    #[arg(long)]
    font_size: Option<f64>,

    /// CSS color for the upon and border modes.
    #[arg(long)]
    color: Option<String>,

    /// Font family list for the upon and border modes.
    #[arg(long)]
    font_family: Option<String>,

    /// Text position as "X,Y" percentages (upon mode).
    #[arg(long, value_name = "X,Y", default_value = "50,50")]
    position: String,

    /// Outline width over the subject in pixels; 0 disables it (upon mode).
    #[arg(long, default_value_t = DEFAULT_OUTLINE_WIDTH)]
    outline_width: f64,

    /// Extra gap between characters (border mode).
    #[arg(long, default_value_t = DEFAULT_SPACING)]
    spacing: f64,

    /// Gap between the outline and the text (border mode).
    #[arg(long, default_value_t = DEFAULT_DISTANCE)]
    distance: f64,

    /// Keep characters upright instead of following the outline (border
    /// mode).
    #[arg(long)]
    no_rotate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Text layers drawn between the background and the subject.
    Behind,
    /// One outlined string over the image.
    Upon,
    /// Text along the subject's outline.
    Border,
}

// ---------------------------------------------------------------------------
// Document file
// ---------------------------------------------------------------------------

/// The subset of editor state a document file carries.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocumentFile {
    layers: Vec<TextLayer>,
    adjustments: Adjustments,
    aspect_ratio: AspectRatio,
    /// Width of the preview the layers were authored on. Absent means
    /// the layers are in native pixels.
    preview_width: Option<f64>,
}

impl DocumentFile {
    fn parse(json: &str) -> Result<Self, String> {
        let file: Self = serde_json::from_str(json).map_err(|e| format!("invalid document: {e}"))?;
        let mut seen = HashSet::new();
        if let Some(dup) = file.layers.iter().find(|l| !seen.insert(l.id)) {
            return Err(format!("duplicate layer id {}", dup.id));
        }
        Ok(file)
    }

    fn preview_surface(&self, native: Dimensions) -> Surface {
        self.preview_width
            .filter(|w| *w > 0.0)
            .map_or_else(|| Surface::from(native), |w| preview_surface_for(w, self.aspect_ratio))
    }
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

/// Split `FAMILY=PATH`.
fn parse_font_arg(arg: &str) -> Result<(&str, &Path), String> {
    let (family, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("font must be 'FAMILY=PATH', got: '{arg}'"))?;
    let family = family.trim();
    if family.is_empty() || path.is_empty() {
        return Err(format!("font must be 'FAMILY=PATH', got: '{arg}'"));
    }
    Ok((family, Path::new(path)))
}

/// Parse `"X,Y"` percentages.
fn parse_position(s: &str) -> Result<NormalizedPosition, String> {
    let (x_str, y_str) = s
        .split_once(',')
        .ok_or_else(|| format!("position must be 'X,Y', got: '{s}'"))?;
    let x: f64 = x_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid position X '{x_str}': {e}"))?;
    let y: f64 = y_str
        .trim()
        .parse()
        .map_err(|e| format!("invalid position Y '{y_str}': {e}"))?;
    Ok(NormalizedPosition::new(x, y))
}

fn parse_color(s: Option<&str>) -> Result<Option<Color>, String> {
    s.map(|c| c.parse::<Color>().map_err(|e| e.to_string()))
        .transpose()
}

fn overlay_config(args: &Args) -> Result<OverlayConfig, String> {
    let mut config = OverlayConfig::default();
    if let Some(text) = &args.text {
        config.text.clone_from(text);
    }
    if let Some(size) = args.font_size {
        config.font_size = size;
    }
    if let Some(color) = parse_color(args.color.as_deref())? {
        config.color = color;
    }
    if let Some(family) = &args.font_family {
        config.font_family.clone_from(family);
    }
    config.position = parse_position(&args.position).map_err(|e| format!("--position: {e}"))?;
    config.outline_width = args.outline_width;
    Ok(config.clamped())
}

fn silhouette_config(args: &Args) -> Result<SilhouetteConfig, String> {
    let mut config = SilhouetteConfig::default();
    if let Some(text) = &args.text {
        config.text.clone_from(text);
    }
    if let Some(size) = args.font_size {
        config.font_size = size;
    }
    if let Some(color) = parse_color(args.color.as_deref())? {
        config.color = color;
    }
    if let Some(family) = &args.font_family {
        config.font_family.clone_from(family);
    }
    config.spacing = args.spacing;
    config.distance = args.distance;
    config.rotate = !args.no_rotate;
    Ok(config.clamped())
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

fn load_fonts(specs: &[String]) -> Result<FontBook, Box<dyn std::error::Error>> {
    let mut book = FontBook::new();
    for arg in specs {
        let (family, path) = parse_font_arg(arg).map_err(|e| format!("--font: {e}"))?;
        book.register_bytes(family, std::fs::read(path)?)?;
        tracing::info!(family, path = %path.display(), "registered font");
    }
    Ok(book)
}

/// The subject from `--mask` or `--cutout`, or an empty one.
fn load_subject(args: &Args, image: &RgbaImage) -> Result<Subject, Box<dyn std::error::Error>> {
    let dims = Dimensions::of(image);
    if let Some(path) = &args.mask {
        let gray = image::open(path)?.to_luma8();
        let mask = SubjectMask::from_gray(&gray).resized(dims);
        return Ok(Subject::from_mask(image, mask)?);
    }
    if let Some(path) = &args.cutout {
        let cutout = decode_image(&std::fs::read(path)?)?;
        let outcome = resolve_cutout(dims, Ok(cutout));
        if let Some(warning) = outcome.warning() {
            tracing::warn!("{warning}");
        }
        return Ok(outcome.into_subject());
    }
    tracing::info!("no mask given; text is drawn over the whole image");
    Ok(Subject::none(dims))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!(path = %args.input.display(), "reading photo");
    let image = decode_image(&std::fs::read(&args.input)?)?;
    let dims = Dimensions::of(&image);
    let fonts = load_fonts(&args.fonts)?;
    let subject = load_subject(&args, &image)?;

    let rendered = match args.mode {
        Mode::Behind => {
            let file = match &args.document {
                Some(path) => DocumentFile::parse(&std::fs::read_to_string(path)?)?,
                None => DocumentFile {
                    layers: vec![TextLayer::default()],
                    ..DocumentFile::default()
                },
            };
            let preview = file.preview_surface(dims);
            tracing::info!(layers = file.layers.len(), %dims, "rendering text behind subject");

            let mut document = Document::new();
            document.set_background(ImageAsset::from_image(image), dims);
            document.set_subject(subject);
            document.replace_layers(file.layers.into_iter().map(TextLayer::clamped).collect());
            document.set_adjustments(file.adjustments.clamped());
            ExportRenderer::new(&fonts).render(&document.snapshot(), preview)?
        }
        Mode::Upon => {
            let config = overlay_config(&args)?;
            tracing::info!(text = %config.text, "rendering text upon image");
            render_text_upon(&image, subject.mask(), &config, &fonts)?
        }
        Mode::Border => {
            let config = silhouette_config(&args)?;
            tracing::info!(text = %config.text, "rendering text along subject border");
            render_silhouette(&image, subject.mask(), &config, &fonts)?
        }
    };

    tracing::info!(path = %args.output.display(), "saving");
    rendered.save(&args.output)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn font_arg_splits_on_first_equals() {
        let (family, path) = parse_font_arg("Open Sans=fonts/a=b.ttf").unwrap();
        assert_eq!(family, "Open Sans");
        assert_eq!(path, Path::new("fonts/a=b.ttf"));
        assert!(parse_font_arg("nofile").is_err());
        assert!(parse_font_arg("=x.ttf").is_err());
    }

    #[test]
    fn position_is_clamped() {
        let p = parse_position("25, 140").unwrap();
        assert!((p.x - 25.0).abs() < f64::EPSILON);
        assert!((p.y - 100.0).abs() < f64::EPSILON);
        assert!(parse_position("10").is_err());
    }

    #[test]
    fn document_file_defaults_and_preview() {
        let file = DocumentFile::parse(
            r#"{"layers":[{"id":1,"content":"hi"}],"aspectRatio":"1:1","previewWidth":100}"#,
        )
        .unwrap();
        assert_eq!(file.layers[0].content, "hi");
        assert!((file.layers[0].size - 40.0).abs() < f64::EPSILON);
        let preview = file.preview_surface(Dimensions::new(400, 400));
        assert!((preview.width - 100.0).abs() < f64::EPSILON);
        assert!((preview.height - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn document_without_preview_renders_natively() {
        let file = DocumentFile::parse("{}").unwrap();
        let preview = file.preview_surface(Dimensions::new(30, 20));
        assert!((preview.width - 30.0).abs() < f64::EPSILON);
        assert!((preview.height - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn duplicate_layer_ids_are_rejected() {
        let err = DocumentFile::parse(r#"{"layers":[{"id":2},{"id":2}]}"#).unwrap_err();
        assert!(err.contains("duplicate layer id 2"));
    }

    #[test]
    fn mode_flags_override_defaults() {
        let args = Args::parse_from([
            "underlay-render",
            "in.png",
            "-o",
            "out.png",
            "--text",
            "HELLO",
            "--color",
            "#ff0000",
            "--font-size",
            "9999",
            "--no-rotate",
        ]);
        let border = silhouette_config(&args).unwrap();
        assert_eq!(border.text, "HELLO");
        assert_eq!(border.color, Color::rgb(255, 0, 0));
        assert!((border.font_size - 40.0).abs() < f64::EPSILON);
        assert!(!border.rotate);

        let upon = overlay_config(&args).unwrap();
        assert!((upon.font_size - 600.0).abs() < f64::EPSILON);
        assert!((upon.position.x - 50.0).abs() < f64::EPSILON);
    }
}
