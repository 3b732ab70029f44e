//! Auto-fit text layout.
//!
//! Text first shrinks in fixed steps until it fits on one line. If it still
//! overflows at the floor size it is greedily word-wrapped at that size.
//! Layout is a pure function of the text, the parameters and the supplied
//! measurement function.

use serde::{Deserialize, Serialize};

use crate::geometry::{BASE_FONT_PX, FONT_STEP_PX, LINE_HEIGHT_FACTOR, MIN_FONT_PX};

/// Parameters for [`layout_text`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextLayoutParams {
    /// Maximum line width in logical pixels.
    pub max_width_px: f32,
    /// Starting font size.
    pub base_font_px: f32,
    /// Floor font size.
    pub min_font_px: f32,
    /// Shrink step.
    pub step_px: f32,
}

impl TextLayoutParams {
    /// Default sizes with the given maximum width.
    #[must_use]
    pub fn with_max_width(max_width_px: f32) -> Self {
        Self {
            max_width_px,
            ..Self::default()
        }
    }
}

impl Default for TextLayoutParams {
    fn default() -> Self {
        Self {
            max_width_px: crate::geometry::NAME_MAX_WIDTH,
            base_font_px: BASE_FONT_PX,
            min_font_px: MIN_FONT_PX,
            step_px: FONT_STEP_PX,
        }
    }
}

/// A laid-out block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    /// Lines in drawing order. Never empty.
    pub lines: Vec<String>,
    /// Font size every line is drawn at.
    pub font_size_px: f32,
    /// Distance between consecutive baselines.
    pub line_height_px: f32,
}

impl TextBlock {
    /// Number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Whether the layout had to wrap.
    #[must_use]
    pub fn is_wrapped(&self) -> bool {
        self.lines.len() > 1
    }

    /// Vertical position below the block: `base_y + lines * line_height + padding`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn offset_below(&self, base_y: f32, padding: f32) -> f32 {
        base_y + self.lines.len() as f32 * self.line_height_px + padding
    }
}

/// Lay out `text` so it fits within `params.max_width_px`.
///
/// `measure(text, font_px)` returns the advance width of `text` at the given
/// font size. Lines produced by wrapping fit at the floor size; a word too
/// wide for a line on its own is broken between characters.
pub fn layout_text<M>(text: &str, params: &TextLayoutParams, measure: M) -> TextBlock
where
    M: Fn(&str, f32) -> f32,
{
    let max_width = params.max_width_px;
    let floor = params.min_font_px.min(params.base_font_px);
    let step = if params.step_px > 0.0 { params.step_px } else { FONT_STEP_PX };

    let mut font = params.base_font_px;
    while measure(text, font) > max_width && font > floor {
        font = (font - step).max(floor);
    }

    let lines = if measure(text, font) <= max_width {
        vec![text.to_string()]
    } else {
        wrap_words(text, font, max_width, &measure)
    };

    tracing::trace!(
        lines = lines.len(),
        font_px = font,
        "Laid out text block of {} chars",
        text.chars().count()
    );

    TextBlock {
        lines,
        font_size_px: font,
        line_height_px: (font * LINE_HEIGHT_FACTOR).round(),
    }
}

/// Greedy word wrap at a fixed font size.
fn wrap_words<M>(text: &str, font: f32, max_width: f32, measure: &M) -> Vec<String>
where
    M: Fn(&str, f32) -> f32,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if measure(&candidate, font) > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        } else {
            current = candidate;
        }

        if measure(&current, font) > max_width {
            let mut pieces = break_word(&current, font, max_width, measure);
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split a single overlong word into chunks that each fit, one char minimum.
fn break_word<M>(word: &str, font: f32, max_width: f32, measure: &M) -> Vec<String>
where
    M: Fn(&str, f32) -> f32,
{
    let mut pieces = Vec::new();
    let mut chunk = String::new();

    for ch in word.chars() {
        chunk.push(ch);
        if measure(&chunk, font) > max_width && chunk.chars().count() > 1 {
            chunk.pop();
            pieces.push(std::mem::take(&mut chunk));
            chunk.push(ch);
        }
    }
    pieces.push(chunk);
    pieces
}
