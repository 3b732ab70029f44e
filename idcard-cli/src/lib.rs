//! # IdCard CLI
//!
//! Renders one identity card and writes the exported artifact to disk.
//!
//! ## Usage
//!
//! ```bash
//! idcard --name "Ada Lovelace" --event "Analytical Engines Expo" \
//!     --photo ada.jpg --zoom 1.6 --dpr 2 --format pdf
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `CardConfig` - Resolved configuration: card fields, crop, output
//! - `run` - Drives `idcard_renderer::CardEngine` and writes the export

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use idcard_core::{CardFields, CardState, Color};
use idcard_renderer::{
    CardEngine, DocumentExport, EngineConfig, ExportedFile, FontBook, RasterFormat,
};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// PNG image.
    #[default]
    Png,
    /// JPEG image.
    Jpeg,
    /// Single-page PDF (falls back to PNG when unavailable).
    Pdf,
}

/// Command-line arguments for idcard.
#[derive(Debug, Clone, Parser)]
#[command(name = "idcard")]
#[command(about = "Render an event identity card to PNG, JPEG or PDF")]
#[command(version)]
pub struct CliArgs {
    /// Card JSON file (camelCase `CardState`); flags override its fields
    #[arg(long)]
    pub card: Option<PathBuf>,

    /// Holder name
    #[arg(long, env = "IDCARD_NAME")]
    pub name: Option<String>,

    /// Event title shown in the header band
    #[arg(long, env = "IDCARD_EVENT")]
    pub event: Option<String>,

    /// Header band color (#rgb, #rrggbb or #rrggbbaa)
    #[arg(long)]
    pub header_color: Option<Color>,

    /// Card background color
    #[arg(long)]
    pub background: Option<Color>,

    /// Photo file path or `data:` URI
    #[arg(long)]
    pub photo: Option<String>,

    /// Photo zoom, 1.0 to 3.0
    #[arg(long, requires = "photo")]
    pub zoom: Option<f32>,

    /// Horizontal crop center as a fraction of the photo width
    #[arg(long, requires = "photo")]
    pub center_x: Option<f32>,

    /// Vertical crop center as a fraction of the photo height
    #[arg(long, requires = "photo")]
    pub center_y: Option<f32>,

    /// Device pixel ratio of the exported raster
    #[arg(long, env = "IDCARD_DPR", default_value = "2")]
    pub dpr: f32,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
    pub format: OutputFormat,

    /// Output file (default: derived from the name, in the current directory)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Regular font file (TTF/OTF); system fonts are used otherwise
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Bold font file (TTF/OTF)
    #[arg(long, requires = "font")]
    pub bold_font: Option<PathBuf>,
}

/// Resolved host configuration.
#[derive(Debug, Clone)]
pub struct CardConfig {
    /// Card file to start from.
    pub card_file: Option<PathBuf>,
    /// Name override.
    pub name: Option<String>,
    /// Event title override.
    pub event_title: Option<String>,
    /// Header color override.
    pub header_color: Option<Color>,
    /// Background override.
    pub background: Option<Color>,
    /// Photo path or data URI.
    pub photo: Option<String>,
    /// Zoom.
    pub zoom: Option<f32>,
    /// Absolute crop center; missing axes stay centered.
    pub center: (Option<f32>, Option<f32>),
    /// Engine settings.
    pub engine: EngineConfig,
    /// Output format.
    pub format: OutputFormat,
    /// Output path.
    pub output: Option<PathBuf>,
    /// Regular font file.
    pub font: Option<PathBuf>,
    /// Bold font file.
    pub bold_font: Option<PathBuf>,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CardConfig {
    /// Configuration that renders the default card as PNG.
    #[must_use]
    pub fn new() -> Self {
        Self {
            card_file: None,
            name: None,
            event_title: None,
            header_color: None,
            background: None,
            photo: None,
            zoom: None,
            center: (None, None),
            engine: EngineConfig::default(),
            format: OutputFormat::Png,
            output: None,
            font: None,
            bold_font: None,
        }
    }

    /// Card state: the card file if given, with flag overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the card file cannot be read or parsed.
    pub fn card_state(&self) -> anyhow::Result<CardState> {
        let mut state = match &self.card_file {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read card file {}", path.display()))?;
                CardState::from_json(&json)
                    .with_context(|| format!("Invalid card file {}", path.display()))?
            }
            None => CardState::new(),
        };

        if let Some(name) = &self.name {
            state.name.clone_from(name);
        }
        if let Some(title) = &self.event_title {
            state.event_title.clone_from(title);
        }
        if let Some(color) = self.header_color {
            state.header_color = color;
        }
        if let Some(color) = self.background {
            state.card_background = color;
        }
        Ok(state)
    }

    /// Fonts: explicit files, else system fonts, else approximate metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit font file cannot be read or parsed.
    pub fn fonts(&self) -> anyhow::Result<FontBook> {
        let Some(regular) = &self.font else {
            return Ok(FontBook::system());
        };

        let regular = fs::read(regular)
            .with_context(|| format!("Failed to read font {}", regular.display()))?;
        let bold = self
            .bold_font
            .as_ref()
            .map(|path| {
                fs::read(path).with_context(|| format!("Failed to read font {}", path.display()))
            })
            .transpose()?;
        Ok(FontBook::from_bytes(regular, bold)?)
    }
}

impl From<CliArgs> for CardConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            card_file: args.card,
            name: args.name,
            event_title: args.event,
            header_color: args.header_color,
            background: args.background,
            photo: args.photo,
            zoom: args.zoom,
            center: (args.center_x, args.center_y),
            engine: EngineConfig {
                device_pixel_ratio: args.dpr,
                ..EngineConfig::default()
            },
            format: args.format,
            output: args.output,
            font: args.font,
            bold_font: args.bold_font,
        }
    }
}

/// What [`run`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// File written.
    pub path: PathBuf,
    /// MIME type of the file.
    pub mime: &'static str,
    /// Set when a PDF was requested but a PNG was written instead.
    pub fallback_reason: Option<String>,
}

/// Build the card described by `config` and write the export.
///
/// # Errors
///
/// Returns an error if an input cannot be read, the photo cannot be decoded,
/// rendering fails or the output cannot be written.
pub fn run(config: &CardConfig) -> anyhow::Result<RunSummary> {
    let fonts = config.fonts()?;
    let mut engine = CardEngine::new(config.engine.clone(), fonts)?;

    let state = config.card_state()?;
    engine.set_card_fields(CardFields::from(&state))?;

    if let Some(photo) = &config.photo {
        let info = if photo.starts_with("data:") {
            engine.load_image_data_uri(photo)?
        } else {
            let bytes =
                fs::read(photo).with_context(|| format!("Failed to read photo {photo}"))?;
            engine.load_image(&bytes)?
        };
        tracing::info!(
            "Loaded photo {}",
            serde_json::to_string(&info).unwrap_or_default()
        );

        let current = engine.crop().center();
        let (cx, cy) = config.center;
        let delta = (cx.is_some() || cy.is_some()).then(|| {
            (
                cx.map_or(0.0, |x| x - current.x),
                cy.map_or(0.0, |y| y - current.y),
            )
        });
        engine.set_crop(config.zoom, delta)?;
    } else if config.zoom.is_some() || config.center != (None, None) {
        tracing::warn!("Zoom and crop center need a photo, ignoring them");
    }

    let (file, fallback_reason) = match config.format {
        OutputFormat::Png => (engine.export_raster_as(RasterFormat::Png)?, None),
        OutputFormat::Jpeg => (engine.export_jpeg()?, None),
        OutputFormat::Pdf => match engine.export_document()? {
            DocumentExport::Document(file) => (file, None),
            DocumentExport::Fallback { image, reason } => {
                tracing::warn!("PDF unavailable ({reason}), writing {} instead", image.filename);
                (image, Some(reason))
            }
        },
    };

    let path = output_path(config.output.as_deref(), &file);
    fs::write(&path, &file.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {} ({} bytes)", path.display(), file.bytes.len());

    Ok(RunSummary {
        path,
        mime: file.mime,
        fallback_reason,
    })
}

/// Where to write `file`: the requested path (with the extension of the file
/// actually produced) or the suggested filename.
fn output_path(requested: Option<&Path>, file: &ExportedFile) -> PathBuf {
    match requested {
        Some(path) => match Path::new(&file.filename).extension() {
            Some(ext) if path.extension() != Some(ext) && path.extension().is_some() => {
                path.with_extension(ext)
            }
            _ => path.to_path_buf(),
        },
        None => PathBuf::from(&file.filename),
    }
}
