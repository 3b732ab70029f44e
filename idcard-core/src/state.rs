//! Card and crop state.

use serde::{Deserialize, Serialize};

use crate::crop::{crop_rect, CropRect};
use crate::Color;

/// Smallest preview scale.
pub const MIN_PREVIEW_SCALE: f32 = 0.5;
/// Largest preview scale.
pub const MAX_PREVIEW_SCALE: f32 = 1.2;

/// Smallest zoom the slider allows.
pub const MIN_ZOOM: f32 = 1.0;
/// Largest zoom the slider allows.
pub const MAX_ZOOM: f32 = 3.0;
/// Zoom applied whenever a new image is loaded.
pub const DEFAULT_ZOOM: f32 = 1.2;

/// Text fields and style choices for the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardState {
    /// Holder name.
    pub name: String,
    /// Event title shown in the header band.
    pub event_title: String,
    /// Header band color.
    pub header_color: Color,
    /// Card body color.
    pub card_background: Color,
    /// On-screen preview scale in `[0.5, 1.2]`. Does not affect exports.
    pub preview_scale: f32,
}

impl CardState {
    /// Create a card state with default fields.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::new(),
            event_title: String::new(),
            header_color: Color::rgb(0x1E, 0x40, 0xAF),
            card_background: Color::WHITE,
            preview_scale: 1.0,
        }
    }

    /// Replace every field, clamping the preview scale into range.
    pub fn apply(&mut self, fields: CardFields) {
        self.name = fields.name;
        self.event_title = fields.event_title;
        self.header_color = fields.header_color;
        self.card_background = fields.card_background;
        self.set_preview_scale(fields.preview_scale);
    }

    /// Set the preview scale, clamped to `[0.5, 1.2]`. Non-finite values are ignored.
    pub fn set_preview_scale(&mut self, scale: f32) {
        if scale.is_finite() {
            self.preview_scale = scale.clamp(MIN_PREVIEW_SCALE, MAX_PREVIEW_SCALE);
        } else {
            tracing::debug!("Ignoring non-finite preview scale");
        }
    }

    /// Parse a card state from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a color is invalid.
    pub fn from_json(json: &str) -> crate::CardResult<Self> {
        let mut state: Self = serde_json::from_str(json)?;
        let scale = state.preview_scale;
        state.preview_scale = 1.0;
        state.set_preview_scale(scale);
        Ok(state)
    }
}

impl Default for CardState {
    fn default() -> Self {
        Self::new()
    }
}

/// The full set of user-editable card fields, applied at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardFields {
    /// Holder name.
    pub name: String,
    /// Event title.
    pub event_title: String,
    /// Header band color.
    pub header_color: Color,
    /// Card body color.
    pub card_background: Color,
    /// On-screen preview scale.
    pub preview_scale: f32,
}

impl From<&CardState> for CardFields {
    fn from(state: &CardState) -> Self {
        Self {
            name: state.name.clone(),
            event_title: state.event_title.clone(),
            header_color: state.header_color,
            card_background: state.card_background,
            preview_scale: state.preview_scale,
        }
    }
}

/// A decoded bitmap the crop state can own.
pub trait Bitmap {
    /// Width in pixels.
    fn width(&self) -> u32;
    /// Height in pixels.
    fn height(&self) -> u32;
}

/// Fractional point of the image the crop window is centered on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropCenter {
    /// Horizontal fraction in `[0, 1]`.
    pub x: f32,
    /// Vertical fraction in `[0, 1]`.
    pub y: f32,
}

impl CropCenter {
    /// The image center.
    pub const MIDDLE: Self = Self { x: 0.5, y: 0.5 };

    /// Clamp both coordinates to `[0, 1]`; NaN maps to the middle.
    #[must_use]
    pub fn clamped(self) -> Self {
        let clamp = |v: f32| if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) };
        Self {
            x: clamp(self.x),
            y: clamp(self.y),
        }
    }

    /// Move by a fractional delta, clamping to the unit square.
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        let dx = if dx.is_finite() { dx } else { 0.0 };
        let dy = if dy.is_finite() { dy } else { 0.0 };
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
        .clamped()
    }
}

impl Default for CropCenter {
    fn default() -> Self {
        Self::MIDDLE
    }
}

/// Pan/zoom state over an optional source image.
///
/// The state owns the bitmap; replacing it drops the previous one.
#[derive(Debug, Clone)]
pub struct CropState<B> {
    source: Option<B>,
    zoom: f32,
    center: CropCenter,
}

impl<B: Bitmap> CropState<B> {
    /// Create an empty crop state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            zoom: DEFAULT_ZOOM,
            center: CropCenter::MIDDLE,
        }
    }

    /// Install a new source image and reset zoom and center.
    ///
    /// Returns the previous image, if any, so the caller can release it
    /// explicitly; dropping the return value is enough.
    pub fn replace_image(&mut self, image: B) -> Option<B> {
        tracing::debug!(
            "Installing {}x{} source image, crop reset",
            image.width(),
            image.height()
        );
        self.zoom = DEFAULT_ZOOM;
        self.center = CropCenter::MIDDLE;
        self.source.replace(image)
    }

    /// Remove the source image.
    pub fn clear_image(&mut self) -> Option<B> {
        self.zoom = DEFAULT_ZOOM;
        self.center = CropCenter::MIDDLE;
        self.source.take()
    }

    /// The source image, if one is loaded.
    #[must_use]
    pub fn source(&self) -> Option<&B> {
        self.source.as_ref()
    }

    /// Whether an image is loaded.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.source.is_some()
    }

    /// Current zoom.
    #[must_use]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom, clamped to the slider range `[1, 3]`. Leaves the center alone.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        } else {
            tracing::debug!("Ignoring non-finite zoom");
        }
    }

    /// Current center.
    #[must_use]
    pub fn center(&self) -> CropCenter {
        self.center
    }

    /// Set the center, clamped to the unit square.
    pub fn set_center(&mut self, center: CropCenter) {
        self.center = center.clamped();
    }

    /// Move the center by a fractional delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.center = self.center.offset(dx, dy);
    }

    /// The current crop rectangle, if an image is loaded.
    #[must_use]
    pub fn crop_rect(&self) -> Option<CropRect> {
        self.source
            .as_ref()
            .map(|image| crop_rect(image.width(), image.height(), self.zoom, self.center))
    }
}

impl<B: Bitmap> Default for CropState<B> {
    fn default() -> Self {
        Self::new()
    }
}
