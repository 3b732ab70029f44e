//! Integration tests for the card engine (idcard-renderer).
//!
//! Drives the engine the way a host would: load a photo, edit fields, drag
//! the crop preview and export.

use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use idcard_core::{CardFields, Color, CropCenter, DragOutcome, PointerCaptureError, PointerEvent};
use idcard_core::{PointerCapture, PointerPhase};
use idcard_renderer::export::PageGeometry;
use idcard_renderer::{
    render, AvatarSource, BackendSlot, CardEngine, DocumentExport, EngineConfig, FontBook,
    RasterFormat, RenderError,
};

/// Encode a gradient photo as PNG bytes.
fn photo_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        let r = u8::try_from(x % 256).unwrap_or(0);
        let g = u8::try_from(y % 256).unwrap_or(0);
        image::Rgba([r, g, 128, 255])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

fn fields(name: &str, title: &str) -> CardFields {
    CardFields {
        name: name.to_string(),
        event_title: title.to_string(),
        header_color: Color::rgb(0x1E, 0x40, 0xAF),
        card_background: Color::WHITE,
        preview_scale: 1.0,
    }
}

fn engine_at(dpr: f32) -> CardEngine {
    let config = EngineConfig {
        device_pixel_ratio: dpr,
        ..EngineConfig::default()
    };
    CardEngine::new(config, FontBook::approximate()).expect("engine")
}

#[derive(Debug, Default)]
struct CaptureLog {
    calls: Vec<String>,
}

/// Records capture calls; rejects releases to check they are ignored.
struct LoggingCapture(Rc<RefCell<CaptureLog>>);

impl PointerCapture for LoggingCapture {
    fn capture(&mut self, pointer_id: u32) -> Result<(), PointerCaptureError> {
        self.0.borrow_mut().calls.push(format!("capture {pointer_id}"));
        Ok(())
    }

    fn release(&mut self, pointer_id: u32) -> Result<(), PointerCaptureError> {
        self.0.borrow_mut().calls.push(format!("release {pointer_id}"));
        Err(PointerCaptureError::NotActive(pointer_id))
    }
}

// ==========================================================================
// Rendering
// ==========================================================================

#[test]
fn test_render_is_deterministic() {
    let mut engine = engine_at(1.0);
    engine.load_image(&photo_png(64, 48)).expect("load");
    engine
        .set_card_fields(fields("Ada Lovelace", "Analytical Engines Expo"))
        .expect("fields");

    let (first, _) = render(
        engine.card(),
        engine.crop(),
        1.0,
        &FontBook::approximate(),
    )
    .expect("render");
    let (second, _) = render(
        engine.card(),
        engine.crop(),
        1.0,
        &FontBook::approximate(),
    )
    .expect("render");

    assert_eq!(first.data(), second.data());
    assert_eq!(first.data(), engine.surface().data());
}

#[test]
fn test_dpr_2_surface_and_page() {
    let engine = engine_at(2.0);
    let surface = engine.surface();
    assert_eq!(surface.physical_size(), (1200, 720));
    assert_eq!(surface.logical_size(), (600.0, 360.0));

    let page = PageGeometry::for_surface(surface);
    assert_eq!((page.width_pt, page.height_pt), (450.0, 270.0));
}

#[test]
fn test_changing_dpr_rerenders() {
    let mut engine = engine_at(1.0);
    engine.set_device_pixel_ratio(1.5).expect("dpr");
    assert_eq!(engine.surface().physical_size(), (900, 540));
    assert!(matches!(
        engine.set_device_pixel_ratio(f32::NAN),
        Err(RenderError::InvalidScale(_))
    ));
    assert_eq!(engine.surface().physical_size(), (900, 540));
}

// ==========================================================================
// Photo loading and crop
// ==========================================================================

#[test]
fn test_load_photo_and_zoom() {
    let mut engine = engine_at(1.0);
    let info = engine.load_image(&photo_png(800, 600)).expect("load");
    assert_eq!((info.width, info.height), (800, 600));
    assert!((engine.crop().zoom() - 1.2).abs() < f32::EPSILON);

    engine.set_zoom(2.0).expect("zoom");
    let rect = engine.crop().crop_rect().expect("rect");
    assert_eq!((rect.sx, rect.sy, rect.sw, rect.sh), (200, 150, 400, 300));
    assert_eq!(engine.layout().avatar, AvatarSource::Cropped(rect));
}

#[test]
fn test_zoom_is_clamped_and_keeps_center() {
    let mut engine = engine_at(1.0);
    engine.load_image(&photo_png(100, 100)).expect("load");
    engine.set_crop(None, Some((0.2, -0.1))).expect("pan");
    let center = engine.crop().center();

    engine.set_zoom(10.0).expect("zoom");
    assert!((engine.crop().zoom() - 3.0).abs() < f32::EPSILON);
    engine.set_zoom(0.1).expect("zoom");
    assert!((engine.crop().zoom() - 1.0).abs() < f32::EPSILON);
    assert_eq!(engine.crop().center(), center);
}

#[test]
fn test_new_photo_resets_crop() {
    let mut engine = engine_at(1.0);
    engine.load_image(&photo_png(100, 100)).expect("load");
    engine.set_crop(Some(2.5), Some((0.3, 0.3))).expect("crop");

    engine.load_image(&photo_png(50, 80)).expect("reload");
    assert!((engine.crop().zoom() - 1.2).abs() < f32::EPSILON);
    assert_eq!(engine.crop().center(), CropCenter::MIDDLE);
}

#[test]
fn test_load_photo_from_data_uri() {
    use base64::Engine;

    let mut engine = engine_at(1.0);
    let encoded = base64::engine::general_purpose::STANDARD.encode(photo_png(10, 20));
    let info = engine
        .load_image_data_uri(&format!("data:image/png;base64,{encoded}"))
        .expect("load");
    assert_eq!((info.width, info.height), (10, 20));
    assert!(engine.crop().has_image());
}

// ==========================================================================
// Dragging
// ==========================================================================

#[test]
fn test_drag_half_preview_moves_center_to_edge() {
    let log = Rc::new(RefCell::new(CaptureLog::default()));
    let mut engine =
        engine_at(1.0).with_pointer_capture(Box::new(LoggingCapture(Rc::clone(&log))));
    engine.load_image(&photo_png(200, 200)).expect("load");

    let renders = Rc::new(RefCell::new(0usize));
    let counter = Rc::clone(&renders);
    engine.set_on_change(move |_| *counter.borrow_mut() += 1);

    assert_eq!(
        engine.handle_pointer(PointerEvent::down(10.0, 10.0)).expect("down"),
        DragOutcome::Started
    );
    assert_eq!(
        engine.handle_pointer(PointerEvent::moved(130.0, 10.0)).expect("move"),
        DragOutcome::Moved
    );
    // A second pointer does not steal the drag.
    let intruder = PointerEvent::new(7, PointerPhase::Move, 500.0, 500.0);
    assert_eq!(
        engine.handle_pointer(intruder).expect("move"),
        DragOutcome::Ignored
    );
    assert_eq!(
        engine.handle_pointer(PointerEvent::up(130.0, 10.0)).expect("up"),
        DragOutcome::Ended
    );

    let center = engine.crop().center();
    assert!((center.x - 1.0).abs() < 1e-6);
    assert!((center.y - 0.5).abs() < 1e-6);
    assert_eq!(*renders.borrow(), 1);

    let pointer = PointerEvent::down(0.0, 0.0).pointer_id;
    assert_eq!(
        log.borrow().calls,
        vec![format!("capture {pointer}"), format!("release {pointer}")]
    );
}

#[test]
fn test_drag_without_photo_is_ignored() {
    let mut engine = engine_at(1.0);
    assert_eq!(
        engine.handle_pointer(PointerEvent::down(0.0, 0.0)).expect("down"),
        DragOutcome::Ignored
    );
    assert_eq!(
        engine.handle_pointer(PointerEvent::moved(50.0, 0.0)).expect("move"),
        DragOutcome::Ignored
    );
    assert_eq!(engine.crop().center(), CropCenter::MIDDLE);
}

#[test]
fn test_crop_preview_matches_config() {
    let mut engine = engine_at(2.0);
    engine.load_image(&photo_png(64, 64)).expect("load");
    let preview = engine.render_crop_preview().expect("preview");
    assert_eq!(preview.physical_size(), (480, 480));
}

// ==========================================================================
// Exports
// ==========================================================================

#[test]
fn test_raster_exports_named_after_holder() {
    let mut engine = engine_at(2.0);
    engine
        .set_card_fields(fields("  Grace   Brewster Hopper ", "Compilers"))
        .expect("fields");

    let png = engine.export_raster().expect("png");
    assert_eq!(png.filename, "Grace_Brewster_Hopper.png");
    let decoded = image::load_from_memory(&png.bytes).expect("decode");
    assert_eq!((decoded.width(), decoded.height()), (1200, 720));

    let jpeg = engine.export_jpeg().expect("jpeg");
    assert_eq!(jpeg.filename, "Grace_Brewster_Hopper.jpg");

    let low = engine
        .export_raster_as(RasterFormat::Jpeg { quality: 10 })
        .expect("jpeg");
    assert!(low.bytes.len() < jpeg.bytes.len());
}

#[test]
fn test_blank_name_uses_fallback_filename() {
    let engine = engine_at(1.0);
    assert_eq!(engine.export_raster().expect("png").filename, "id-card.png");
}

#[test]
fn test_document_export_falls_back_when_unavailable() {
    let mut engine =
        engine_at(1.0).with_document_backend(BackendSlot::unavailable("printing disabled"));
    engine.set_card_fields(fields("Ada", "Expo")).expect("fields");

    match engine.export_document().expect("export") {
        DocumentExport::Fallback { image, reason } => {
            assert_eq!(image.filename, "Ada.png");
            assert_eq!(image.mime, "image/png");
            assert!(reason.contains("printing disabled"));
        }
        DocumentExport::Document(_) => panic!("expected raster fallback"),
    }
}

#[cfg(feature = "pdf")]
#[test]
fn test_document_export_produces_pdf() {
    let mut engine = engine_at(2.0);
    engine.set_card_fields(fields("Ada", "Expo")).expect("fields");

    let export = engine.export_document().expect("export");
    assert!(!export.is_fallback());
    let file = export.file();
    assert_eq!(file.filename, "Ada.pdf");
    assert!(file.bytes.starts_with(b"%PDF"));
    assert!(file
        .bytes
        .windows(b"MediaBox[0 0 450 270]".len())
        .any(|w| w == b"MediaBox[0 0 450 270]"));
    assert!(engine.document_backend().is_resolved());
}
