//! Card Core Integration Tests
//!
//! Exercises the public API the renderer relies on:
//! - Crop rectangle scenarios
//! - Name layout against the card geometry
//! - Drag sessions feeding the crop state

use idcard_core::geometry::{CROP_PREVIEW_SIZE, NAME_BASE_Y, NAME_MAX_WIDTH, CAPTION_PADDING};
use idcard_core::{
    crop_rect, layout_text, Bitmap, CropCenter, CropRect, CropState, DragController, DragOutcome,
    NoCapture, PointerEvent, TextLayoutParams,
};

struct Photo {
    width: u32,
    height: u32,
}

impl Bitmap for Photo {
    fn width(&self) -> u32 {
        self.width
    }
    fn height(&self) -> u32 {
        self.height
    }
}

/// Proportional-ish measure: wide letters count double.
#[allow(clippy::cast_precision_loss)]
fn measure(text: &str, font: f32) -> f32 {
    text.chars()
        .map(|c| if matches!(c, 'm' | 'w' | 'M' | 'W') { 0.9 } else { 0.5 })
        .sum::<f32>()
        * font
}

#[test]
fn test_crop_scenario_800_by_600_zoom_two() {
    let rect = crop_rect(800, 600, 2.0, CropCenter::MIDDLE);
    assert_eq!(
        rect,
        CropRect {
            sx: 200,
            sy: 150,
            sw: 400,
            sh: 300
        }
    );
}

#[test]
fn test_crop_state_tracks_loaded_image() {
    let mut crop = CropState::new();
    crop.replace_image(Photo {
        width: 800,
        height: 600,
    });
    crop.set_zoom(2.0);
    crop.set_center(CropCenter::MIDDLE);

    let rect = crop.crop_rect().expect("image loaded");
    assert_eq!((rect.sx, rect.sy, rect.sw, rect.sh), (200, 150, 400, 300));
}

#[test]
fn test_name_scenario_never_exceeds_width() {
    let params = TextLayoutParams::with_max_width(300.0);
    let block = layout_text("Alexandra Constantinopoulos", &params, measure);

    assert!(block.font_size_px >= 14.0);
    assert!(block.font_size_px <= 28.0);
    // Shrinks in steps of two from 28.
    assert!(((28.0 - block.font_size_px) % 2.0).abs() < f32::EPSILON);

    if block.lines.len() == 1 {
        assert!(measure(&block.lines[0], block.font_size_px) <= 300.0);
    } else {
        assert!((block.font_size_px - 14.0).abs() < f32::EPSILON);
    }
    for line in &block.lines {
        assert!(measure(line, block.font_size_px) <= 300.0, "{line:?}");
    }
}

#[test]
fn test_caption_follows_wrapped_name() {
    let params = TextLayoutParams::with_max_width(NAME_MAX_WIDTH);
    let name = "Maximilian Wolfgang Montgomery Worthington-Williamson";
    let block = layout_text(name, &params, measure);

    assert!(block.is_wrapped());
    let caption_y = block.offset_below(NAME_BASE_Y, CAPTION_PADDING);
    #[allow(clippy::cast_precision_loss)]
    let expected = NAME_BASE_Y + block.lines.len() as f32 * block.line_height_px + CAPTION_PADDING;
    assert!((caption_y - expected).abs() < f32::EPSILON);
}

#[test]
fn test_drag_session_end_to_end() {
    let mut crop = CropState::new();
    crop.replace_image(Photo {
        width: 1024,
        height: 768,
    });
    let mut drag = DragController::new(CROP_PREVIEW_SIZE);

    let outcomes: Vec<DragOutcome> = [
        PointerEvent::moved(5.0, 5.0),
        PointerEvent::down(100.0, 100.0),
        PointerEvent::moved(100.0 + CROP_PREVIEW_SIZE / 2.0, 100.0),
        PointerEvent::up(0.0, 0.0),
        PointerEvent::moved(0.0, 0.0),
    ]
    .iter()
    .map(|event| drag.handle(event, &mut crop, &mut NoCapture))
    .collect();

    assert_eq!(
        outcomes,
        vec![
            DragOutcome::Ignored,
            DragOutcome::Started,
            DragOutcome::Moved,
            DragOutcome::Ended,
            DragOutcome::Ignored,
        ]
    );
    assert_eq!(crop.center(), CropCenter { x: 1.0, y: 0.5 });

    let rect = crop.crop_rect().expect("image loaded");
    assert_eq!(rect.sx + rect.sw, 1024);
}
