//! Font selection and text metrics.
//!
//! Faces come from explicit font bytes or from the system font database.
//! When neither is available the book falls back to fixed average advances
//! so layout stays deterministic; glyphs are then not rasterized.

use std::fmt;

use rusttype::{point, Font, Scale};

use crate::error::{RenderError, RenderResult};

/// Average advance per char, in em, when no face is available.
const APPROX_ADVANCE_REGULAR: f32 = 0.55;
const APPROX_ADVANCE_BOLD: f32 = 0.6;
const APPROX_ASCENT: f32 = 0.8;
const APPROX_DESCENT: f32 = -0.2;

/// Font weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    /// Normal text.
    Regular,
    /// Bold text.
    Bold,
}

/// Size and weight of a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    /// Font size in logical pixels.
    pub size_px: f32,
    /// Weight.
    pub weight: FontWeight,
}

impl FontSpec {
    /// Regular text at `size_px`.
    #[must_use]
    pub const fn regular(size_px: f32) -> Self {
        Self {
            size_px,
            weight: FontWeight::Regular,
        }
    }

    /// Bold text at `size_px`.
    #[must_use]
    pub const fn bold(size_px: f32) -> Self {
        Self {
            size_px,
            weight: FontWeight::Bold,
        }
    }
}

/// Where a [`FontBook`]'s faces came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    /// Caller-supplied font files.
    Explicit,
    /// System font database, with the chosen family name.
    System(String),
    /// No face; fixed average advances.
    Approximate,
}

/// Vertical metrics in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    /// Distance from baseline to the top of the em box (positive).
    pub ascent: f32,
    /// Distance from baseline to the bottom of the em box (negative).
    pub descent: f32,
}

/// Regular and bold faces used for card text.
#[derive(Clone)]
pub struct FontBook {
    regular: Option<Font<'static>>,
    bold: Option<Font<'static>>,
    source: FontSource,
}

impl fmt::Debug for FontBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontBook")
            .field("source", &self.source)
            .field("has_regular", &self.regular.is_some())
            .field("has_bold", &self.bold.is_some())
            .finish()
    }
}

impl FontBook {
    /// A book with no faces; text is measured with fixed average advances.
    #[must_use]
    pub fn approximate() -> Self {
        Self {
            regular: None,
            bold: None,
            source: FontSource::Approximate,
        }
    }

    /// Build from TTF/OTF bytes. Without a bold face, bold text uses the regular one.
    ///
    /// # Errors
    ///
    /// Returns an error if either font cannot be parsed.
    pub fn from_bytes(regular: Vec<u8>, bold: Option<Vec<u8>>) -> RenderResult<Self> {
        let parse = |bytes: Vec<u8>, what: &str| {
            Font::try_from_vec(bytes)
                .ok_or_else(|| RenderError::Surface(format!("Failed to parse {what} font")))
        };

        let regular = parse(regular, "regular")?;
        let bold = bold.map(|b| parse(b, "bold")).transpose()?;

        Ok(Self {
            regular: Some(regular),
            bold,
            source: FontSource::Explicit,
        })
    }

    /// Discover a sans-serif family in the system font database.
    ///
    /// Falls back to [`FontBook::approximate`] when nothing usable is installed.
    #[must_use]
    pub fn system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let families = [
            fontdb::Family::Name("DejaVu Sans"),
            fontdb::Family::Name("Liberation Sans"),
            fontdb::Family::Name("Noto Sans"),
            fontdb::Family::Name("Helvetica"),
            fontdb::Family::Name("Arial"),
            fontdb::Family::SansSerif,
        ];

        let find = |weight: fontdb::Weight| {
            db.query(&fontdb::Query {
                families: &families,
                weight,
                ..fontdb::Query::default()
            })
            .or_else(|| db.faces().next().map(|face| face.id))
        };

        let load = |id: fontdb::ID| {
            db.with_face_data(id, |data, index| {
                Font::try_from_vec_and_index(data.to_vec(), index)
            })
            .flatten()
        };

        let Some(regular_id) = find(fontdb::Weight::NORMAL) else {
            tracing::warn!("No system fonts found, card text will use approximate metrics");
            return Self::approximate();
        };
        let Some(regular) = load(regular_id) else {
            tracing::warn!("System font could not be parsed, card text will use approximate metrics");
            return Self::approximate();
        };

        let bold = find(fontdb::Weight::BOLD)
            .filter(|id| *id != regular_id)
            .and_then(load);

        let family = db
            .face(regular_id)
            .and_then(|face| face.families.first())
            .map_or_else(|| "unknown".to_string(), |(name, _)| name.clone());
        tracing::debug!("Using system font family {family} (bold face: {})", bold.is_some());

        Self {
            regular: Some(regular),
            bold,
            source: FontSource::System(family),
        }
    }

    /// Where the faces came from.
    #[must_use]
    pub fn source(&self) -> &FontSource {
        &self.source
    }

    /// Whether glyphs can be rasterized.
    #[must_use]
    pub fn has_faces(&self) -> bool {
        self.regular.is_some()
    }

    /// The face for a weight; bold falls back to regular.
    #[must_use]
    pub fn face(&self, weight: FontWeight) -> Option<&Font<'static>> {
        match weight {
            FontWeight::Bold => self.bold.as_ref().or(self.regular.as_ref()),
            FontWeight::Regular => self.regular.as_ref(),
        }
    }

    /// Advance width of `text` in logical pixels.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn measure(&self, text: &str, spec: FontSpec) -> f32 {
        if text.is_empty() {
            return 0.0;
        }

        match self.face(spec.weight) {
            Some(font) => {
                let scale = Scale::uniform(spec.size_px);
                font.layout(text, scale, point(0.0, 0.0))
                    .last()
                    .map_or(0.0, |g| {
                        g.position().x + g.unpositioned().h_metrics().advance_width
                    })
            }
            None => {
                let advance = match spec.weight {
                    FontWeight::Regular => APPROX_ADVANCE_REGULAR,
                    FontWeight::Bold => APPROX_ADVANCE_BOLD,
                };
                text.chars().count() as f32 * spec.size_px * advance
            }
        }
    }

    /// Ascent and descent at the given size.
    #[must_use]
    pub fn line_metrics(&self, spec: FontSpec) -> LineMetrics {
        match self.face(spec.weight) {
            Some(font) => {
                let v = font.v_metrics(Scale::uniform(spec.size_px));
                LineMetrics {
                    ascent: v.ascent,
                    descent: v.descent,
                }
            }
            None => LineMetrics {
                ascent: spec.size_px * APPROX_ASCENT,
                descent: spec.size_px * APPROX_DESCENT,
            },
        }
    }
}

impl Default for FontBook {
    fn default() -> Self {
        Self::approximate()
    }
}
