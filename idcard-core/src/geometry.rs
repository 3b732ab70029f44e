//! Fixed card geometry, in logical units.
//!
//! These values define the card's visual format. Changing any of them
//! changes every exported artifact.

/// Card width.
pub const CARD_WIDTH: f32 = 600.0;
/// Card height.
pub const CARD_HEIGHT: f32 = 360.0;

/// Height of the colored header band.
pub const HEADER_HEIGHT: f32 = 72.0;
/// Left edge of the header title.
pub const HEADER_TEXT_X: f32 = 24.0;
/// Header title font size (fixed, never auto-fit).
pub const HEADER_FONT_PX: f32 = 22.0;

/// Avatar left edge.
pub const AVATAR_X: f32 = 36.0;
/// Avatar top edge.
pub const AVATAR_Y: f32 = 110.0;
/// Avatar width and height.
pub const AVATAR_SIZE: f32 = 120.0;
/// Right edge of the avatar.
pub const AVATAR_RIGHT: f32 = AVATAR_X + AVATAR_SIZE;

/// Space reserved right of the avatar when computing the name width.
pub const NAME_RIGHT_PADDING: f32 = 60.0;
/// Left edge of the name block.
pub const NAME_X: f32 = AVATAR_RIGHT + 24.0;
/// Baseline of the first name line.
pub const NAME_BASE_Y: f32 = 140.0;
/// Maximum width available to the name block.
pub const NAME_MAX_WIDTH: f32 = CARD_WIDTH - (AVATAR_RIGHT + NAME_RIGHT_PADDING);

/// Name font size before shrinking.
pub const BASE_FONT_PX: f32 = 28.0;
/// Smallest font size the name shrinks to.
pub const MIN_FONT_PX: f32 = 14.0;
/// Shrink step.
pub const FONT_STEP_PX: f32 = 2.0;
/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Caption font size.
pub const CAPTION_FONT_PX: f32 = 16.0;
/// Gap between the last name line and the caption baseline.
pub const CAPTION_PADDING: f32 = 10.0;

/// Divider rule vertical position.
pub const DIVIDER_Y: f32 = 300.0;
/// Divider rule left edge.
pub const DIVIDER_X0: f32 = 24.0;
/// Divider rule right edge.
pub const DIVIDER_X1: f32 = CARD_WIDTH - 24.0;
/// Footer baseline.
pub const FOOTER_Y: f32 = 328.0;
/// Footer font size.
pub const FOOTER_FONT_PX: f32 = 12.0;

/// Side of the square crop preview the drag controller operates on.
pub const CROP_PREVIEW_SIZE: f32 = 240.0;

/// Points per CSS pixel (72 pt per inch / 96 px per inch).
pub const PT_PER_PX: f32 = 72.0 / 96.0;

/// Convert CSS pixels to whole PDF points: `round(px * 72 / 96)`.
#[must_use]
pub fn pt_from_px(px: f32) -> f32 {
    (px * PT_PER_PX).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pt_conversion_is_exact_for_card_size() {
        assert!((pt_from_px(CARD_WIDTH) - 450.0).abs() < f32::EPSILON);
        assert!((pt_from_px(CARD_HEIGHT) - 270.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pt_conversion_rounds() {
        assert!((pt_from_px(1.0) - 1.0).abs() < f32::EPSILON);
        assert!((pt_from_px(2.0) - 2.0).abs() < f32::EPSILON);
        assert!((pt_from_px(10.0) - 8.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_name_width_leaves_room_right_of_avatar() {
        assert!((NAME_MAX_WIDTH - 384.0).abs() < f32::EPSILON);
        assert!(NAME_X + NAME_MAX_WIDTH <= CARD_WIDTH);
    }
}
