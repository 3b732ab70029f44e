//! Card engine.
//!
//! Owns the card and crop state, re-renders after every mutation and serves
//! exports from the latest surface.

use std::fmt;

use serde::{Deserialize, Serialize};

use idcard_core::geometry::{CARD_HEIGHT, CARD_WIDTH, CROP_PREVIEW_SIZE};
use idcard_core::{
    CardFields, CardState, CropState, DragController, DragOutcome, DragState, NoCapture,
    PointerCapture, PointerEvent,
};

use crate::error::{RenderError, RenderResult};
use crate::export::{
    export_document, export_raster, BackendSlot, DocumentExport, ExportedFile, RasterFormat,
    DEFAULT_JPEG_QUALITY,
};
use crate::font::FontBook;
use crate::photo::{load_image_from_bytes, load_image_from_data_uri, DecodedImage, ImageInfo};
use crate::pipeline::{display_title, render, render_crop_preview, CardLayout, RenderedSurface};

/// Callback invoked with every freshly rendered surface.
pub type ChangeListener = Box<dyn FnMut(&RenderedSurface)>;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Device pixel ratio for the rendered surface.
    pub device_pixel_ratio: f32,
    /// Side of the square crop preview, in logical pixels.
    pub crop_preview_size: f32,
    /// Quality for [`CardEngine::export_jpeg`].
    pub jpeg_quality: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            crop_preview_size: CROP_PREVIEW_SIZE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Interactive card composition engine.
pub struct CardEngine {
    config: EngineConfig,
    card: CardState,
    crop: CropState<DecodedImage>,
    drag: DragController,
    capture: Box<dyn PointerCapture>,
    fonts: FontBook,
    backend: BackendSlot,
    surface: RenderedSurface,
    layout: CardLayout,
    on_change: Option<ChangeListener>,
}

impl fmt::Debug for CardEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardEngine")
            .field("config", &self.config)
            .field("card", &self.card)
            .field("crop", &self.crop)
            .field("drag", &self.drag)
            .field("fonts", &self.fonts)
            .field("backend", &self.backend)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl CardEngine {
    /// Create an engine with default card state and render it once.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured device pixel ratio is invalid.
    pub fn new(config: EngineConfig, fonts: FontBook) -> RenderResult<Self> {
        let card = CardState::new();
        let crop = CropState::new();
        let (surface, layout) = render(&card, &crop, config.device_pixel_ratio, &fonts)?;
        tracing::debug!(
            "Card engine ready at {}x with {:?} fonts",
            config.device_pixel_ratio,
            fonts.source()
        );

        Ok(Self {
            drag: DragController::new(config.crop_preview_size),
            config,
            card,
            crop,
            capture: Box::new(NoCapture),
            fonts,
            backend: BackendSlot::new(),
            surface,
            layout,
            on_change: None,
        })
    }

    /// Engine with default configuration and approximate font metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be allocated.
    pub fn with_defaults() -> RenderResult<Self> {
        Self::new(EngineConfig::default(), FontBook::approximate())
    }

    /// Use `slot` for document exports.
    #[must_use]
    pub fn with_document_backend(mut self, slot: BackendSlot) -> Self {
        self.backend = slot;
        self
    }

    /// Use `capture` for pointer capture during drags.
    #[must_use]
    pub fn with_pointer_capture(mut self, capture: Box<dyn PointerCapture>) -> Self {
        self.capture = capture;
        self
    }

    /// Register a listener called after every render.
    pub fn set_on_change(&mut self, listener: impl FnMut(&RenderedSurface) + 'static) {
        self.on_change = Some(Box::new(listener));
    }

    /// Remove the change listener.
    pub fn clear_on_change(&mut self) {
        self.on_change = None;
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Replace the card fields and re-render.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be rendered.
    pub fn set_card_fields(&mut self, fields: CardFields) -> RenderResult<()> {
        self.card.apply(fields);
        tracing::debug!("Card fields updated");
        self.rerender()
    }

    /// Decode and install a photo, resetting zoom and center.
    ///
    /// On a decode error the current photo and crop are kept.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ImageDecode`] if the bytes are not an image.
    pub fn load_image(&mut self, bytes: &[u8]) -> RenderResult<ImageInfo> {
        let image = load_image_from_bytes(bytes)?;
        self.install_image(image)
    }

    /// Decode and install a photo from a `data:` URI.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ImageDecode`] if the URI is malformed or not an image.
    pub fn load_image_data_uri(&mut self, uri: &str) -> RenderResult<ImageInfo> {
        let image = load_image_from_data_uri(uri)?;
        self.install_image(image)
    }

    fn install_image(&mut self, image: DecodedImage) -> RenderResult<ImageInfo> {
        let info = image.info();
        // The previous bitmap is dropped here.
        drop(self.crop.replace_image(image));
        self.drag.reset();
        tracing::debug!("Loaded {}x{} {:?} photo", info.width, info.height, info.format);
        self.rerender()?;
        Ok(info)
    }

    /// Remove the photo and show the placeholder.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be rendered.
    pub fn clear_image(&mut self) -> RenderResult<()> {
        drop(self.crop.clear_image());
        self.drag.reset();
        self.rerender()
    }

    /// Optionally set the zoom and optionally shift the center by a fraction
    /// of the image.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be rendered.
    pub fn set_crop(&mut self, zoom: Option<f32>, center_delta: Option<(f32, f32)>) -> RenderResult<()> {
        if zoom.is_none() && center_delta.is_none() {
            return Ok(());
        }
        if let Some(zoom) = zoom {
            self.crop.set_zoom(zoom);
        }
        if let Some((dx, dy)) = center_delta {
            self.crop.pan_by(dx, dy);
        }
        tracing::debug!(
            "Crop set to zoom {} center {:?}",
            self.crop.zoom(),
            self.crop.center()
        );
        self.rerender()
    }

    /// Set the zoom (clamped to `[1, 3]`).
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be rendered.
    pub fn set_zoom(&mut self, zoom: f32) -> RenderResult<()> {
        self.set_crop(Some(zoom), None)
    }

    /// Feed a pointer event from the crop preview to the drag controller.
    /// Re-renders when the crop center moved.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be rendered.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> RenderResult<DragOutcome> {
        let outcome = self
            .drag
            .handle(&event, &mut self.crop, self.capture.as_mut());
        if outcome.changed_crop() {
            self.rerender()?;
        }
        Ok(outcome)
    }

    /// Change the device pixel ratio and re-render. Invalid values are
    /// rejected and leave the engine unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidScale`] if `dpr` is not a positive finite number.
    pub fn set_device_pixel_ratio(&mut self, dpr: f32) -> RenderResult<()> {
        if !(dpr.is_finite() && dpr > 0.0) {
            return Err(RenderError::InvalidScale(dpr));
        }
        self.rerender_at(dpr)?;
        self.config.device_pixel_ratio = dpr;
        Ok(())
    }

    fn rerender(&mut self) -> RenderResult<()> {
        self.rerender_at(self.config.device_pixel_ratio)
    }

    /// Render at `dpr`; the previous surface stays in place on failure.
    fn rerender_at(&mut self, dpr: f32) -> RenderResult<()> {
        let (surface, layout) = render(&self.card, &self.crop, dpr, &self.fonts)?;
        self.surface = surface;
        self.layout = layout;

        if let Some(listener) = self.on_change.as_mut() {
            listener(&self.surface);
        }
        Ok(())
    }

    // ========================================================================
    // Exports
    // ========================================================================

    /// PNG export of the current surface.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Export`] if encoding fails.
    pub fn export_raster(&self) -> RenderResult<ExportedFile> {
        self.export_raster_as(RasterFormat::Png)
    }

    /// Raster export in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Export`] if encoding fails.
    pub fn export_raster_as(&self, format: RasterFormat) -> RenderResult<ExportedFile> {
        export_raster(&self.surface, &self.card.name, format)
    }

    /// JPEG export at the configured quality.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Export`] if encoding fails.
    pub fn export_jpeg(&self) -> RenderResult<ExportedFile> {
        self.export_raster_as(RasterFormat::Jpeg {
            quality: self.config.jpeg_quality,
        })
    }

    /// One-page document export, falling back to PNG when no backend works.
    ///
    /// # Errors
    ///
    /// Returns an error only if the PNG fallback cannot be encoded.
    pub fn export_document(&mut self) -> RenderResult<DocumentExport> {
        let title = display_title(&self.card).to_string();
        export_document(&self.surface, &self.card.name, &title, &mut self.backend)
    }

    /// Render the crop preview for the current crop state.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be allocated.
    pub fn render_crop_preview(&self) -> RenderResult<RenderedSurface> {
        render_crop_preview(
            &self.crop,
            self.config.crop_preview_size,
            self.config.device_pixel_ratio,
            &self.fonts,
        )
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Card fields.
    #[must_use]
    pub fn card(&self) -> &CardState {
        &self.card
    }

    /// Crop state.
    #[must_use]
    pub fn crop(&self) -> &CropState<DecodedImage> {
        &self.crop
    }

    /// Latest rendered surface.
    #[must_use]
    pub fn surface(&self) -> &RenderedSurface {
        &self.surface
    }

    /// Layout of the latest render.
    #[must_use]
    pub fn layout(&self) -> &CardLayout {
        &self.layout
    }

    /// Current drag session state.
    #[must_use]
    pub fn drag_state(&self) -> DragState {
        self.drag.state()
    }

    /// Current device pixel ratio.
    #[must_use]
    pub fn device_pixel_ratio(&self) -> f32 {
        self.config.device_pixel_ratio
    }

    /// On-screen preview size: card size times the preview scale.
    #[must_use]
    pub fn preview_size(&self) -> (f32, f32) {
        let scale = self.card.preview_scale;
        (CARD_WIDTH * scale, CARD_HEIGHT * scale)
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Document backend slot.
    #[must_use]
    pub fn document_backend(&self) -> &BackendSlot {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idcard_core::Color;
    use std::cell::Cell;
    use std::rc::Rc;

    fn fields(name: &str) -> CardFields {
        CardFields {
            name: name.to_string(),
            event_title: "RustConf".to_string(),
            header_color: Color::rgb(0x1E, 0x40, 0xAF),
            card_background: Color::WHITE,
            preview_scale: 0.5,
        }
    }

    #[test]
    fn test_engine_renders_on_creation() {
        let engine = CardEngine::with_defaults().expect("engine");
        assert_eq!(engine.surface().physical_size(), (600, 360));
        assert_eq!(engine.drag_state(), DragState::Idle);
        assert!(!engine.document_backend().is_resolved());
    }

    #[test]
    fn test_invalid_dpr_rejected_without_change() {
        let mut engine = CardEngine::with_defaults().expect("engine");
        assert!(matches!(
            engine.set_device_pixel_ratio(0.0),
            Err(RenderError::InvalidScale(_))
        ));
        assert!((engine.device_pixel_ratio() - 1.0).abs() < f32::EPSILON);

        let config = EngineConfig {
            device_pixel_ratio: f32::INFINITY,
            ..EngineConfig::default()
        };
        assert!(CardEngine::new(config, FontBook::approximate()).is_err());
    }

    #[test]
    fn test_unallocatable_dpr_keeps_engine_usable() {
        let mut engine = CardEngine::with_defaults().expect("engine");
        assert!(matches!(
            engine.set_device_pixel_ratio(1e6),
            Err(RenderError::Surface(_))
        ));
        assert!((engine.device_pixel_ratio() - 1.0).abs() < f32::EPSILON);
        assert_eq!(engine.surface().physical_size(), (600, 360));

        engine.set_card_fields(fields("Ada")).expect("fields");
        assert_eq!(engine.card().name, "Ada");
        engine.set_device_pixel_ratio(2.0).expect("dpr");
        assert_eq!(engine.surface().physical_size(), (1200, 720));
    }

    #[test]
    fn test_listener_sees_every_render() {
        let mut engine = CardEngine::with_defaults().expect("engine");
        let renders = Rc::new(Cell::new(0));
        let seen = Rc::clone(&renders);
        engine.set_on_change(move |_| seen.set(seen.get() + 1));

        engine.set_card_fields(fields("Ada")).expect("fields");
        engine.set_zoom(2.0).expect("zoom");
        engine.set_crop(None, None).expect("no-op");
        assert_eq!(renders.get(), 2);

        engine.clear_on_change();
        engine.set_zoom(1.5).expect("zoom");
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn test_preview_size_follows_scale() {
        let mut engine = CardEngine::with_defaults().expect("engine");
        engine.set_card_fields(fields("Ada")).expect("fields");
        assert_eq!(engine.preview_size(), (300.0, 180.0));
    }

    #[test]
    fn test_bad_image_keeps_state() {
        let mut engine = CardEngine::with_defaults().expect("engine");
        engine.set_zoom(2.5).expect("zoom");
        assert!(matches!(
            engine.load_image(b"nope"),
            Err(RenderError::ImageDecode(_))
        ));
        assert!(!engine.crop().has_image());
        assert!((engine.crop().zoom() - 2.5).abs() < f32::EPSILON);
    }
}
