//! Crop transform: maps a pan/zoom state to a source sub-rectangle.
//!
//! The crop window covers `1/zoom` of each image dimension and is centered
//! on a fractional point of the image, then clamped so it never leaves the
//! image. Clamping is always possible because the window is never larger
//! than the image once `zoom >= 1`.

use serde::{Deserialize, Serialize};

use crate::state::CropCenter;

/// Integer source rectangle in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge.
    pub sx: u32,
    /// Top edge.
    pub sy: u32,
    /// Width (at least 1).
    pub sw: u32,
    /// Height (at least 1).
    pub sh: u32,
}

impl CropRect {
    /// Whether the rectangle lies entirely within a `width x height` image.
    #[must_use]
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.sw >= 1
            && self.sh >= 1
            && u64::from(self.sx) + u64::from(self.sw) <= u64::from(width)
            && u64::from(self.sy) + u64::from(self.sh) <= u64::from(height)
    }
}

/// Floating-point sample region, the common form handed to drawing backends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceRegion {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl From<CropRect> for SourceRegion {
    #[allow(clippy::cast_precision_loss)]
    fn from(rect: CropRect) -> Self {
        Self {
            x: rect.sx as f32,
            y: rect.sy as f32,
            width: rect.sw as f32,
            height: rect.sh as f32,
        }
    }
}

/// Compute the crop rectangle for an image of `width x height`.
///
/// `zoom` below 1 (or not finite) is treated as 1. The center is clamped to
/// the unit square first. Zero-sized images produce a 1x1 rectangle at the
/// origin, which callers detect with [`CropRect::is_within`].
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn crop_rect(width: u32, height: u32, zoom: f32, center: CropCenter) -> CropRect {
    let zoom = if zoom.is_finite() { zoom.max(1.0) } else { 1.0 };
    let center = center.clamped();
    let w = f64::from(width);
    let h = f64::from(height);
    let s = f64::from(zoom);

    let sw = (w / s).round().max(1.0);
    let sh = (h / s).round().max(1.0);

    let sx = clamp_origin((f64::from(center.x) * w - sw / 2.0).round(), w - sw);
    let sy = clamp_origin((f64::from(center.y) * h - sh / 2.0).round(), h - sh);

    CropRect {
        sx: sx as u32,
        sy: sy as u32,
        sw: sw as u32,
        sh: sh as u32,
    }
}

/// Clamp to `[0, max]`; a negative `max` only happens for empty images.
fn clamp_origin(value: f64, max: f64) -> f64 {
    value.min(max).max(0.0)
}

/// Fallback sampling that covers a `dest x dest` square with the centered
/// largest square of the source.
///
/// `ratio = max(D/W, D/H)` and the sampled side is `D/ratio`, which is the
/// shorter image side.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fit_crop(width: u32, height: u32, dest: f32) -> SourceRegion {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    let ratio = (dest / w).max(dest / h);
    // Equal to the shorter side up to rounding; never let it exceed it.
    let side = (dest / ratio).min(w.min(h));

    SourceRegion {
        x: (w - side) / 2.0,
        y: (h - side) / 2.0,
        width: side,
        height: side,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn center(x: f32, y: f32) -> CropCenter {
        CropCenter { x, y }
    }

    #[test]
    fn test_zoom_two_centered() {
        let rect = crop_rect(800, 600, 2.0, center(0.5, 0.5));
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
    fn test_zoom_one_is_whole_image() {
        let rect = crop_rect(640, 480, 1.0, center(0.9, 0.1));
        assert_eq!(
            rect,
            CropRect {
                sx: 0,
                sy: 0,
                sw: 640,
                sh: 480
            }
        );
    }

    #[test]
    fn test_corner_centers_clamp() {
        let rect = crop_rect(800, 600, 2.0, center(0.0, 1.0));
        assert_eq!(rect.sx, 0);
        assert_eq!(rect.sy, 300);
        assert!(rect.is_within(800, 600));

        let rect = crop_rect(800, 600, 3.0, center(1.0, 0.0));
        assert_eq!(rect.sx + rect.sw, 800);
        assert_eq!(rect.sy, 0);
    }

    #[test]
    fn test_zoom_below_one_treated_as_one() {
        let rect = crop_rect(100, 50, 0.25, center(0.5, 0.5));
        assert_eq!((rect.sw, rect.sh), (100, 50));
        let rect = crop_rect(100, 50, f32::NAN, center(0.5, 0.5));
        assert_eq!((rect.sw, rect.sh), (100, 50));
    }

    #[test]
    fn test_tiny_image_keeps_one_pixel() {
        let rect = crop_rect(1, 1, 3.0, center(0.5, 0.5));
        assert_eq!(
            rect,
            CropRect {
                sx: 0,
                sy: 0,
                sw: 1,
                sh: 1
            }
        );
    }

    #[test]
    fn test_fit_crop_landscape() {
        let region = fit_crop(800, 600, 120.0);
        assert!((region.width - 600.0).abs() < 1e-3);
        assert!((region.height - 600.0).abs() < 1e-3);
        assert!((region.x - 100.0).abs() < 1e-3);
        assert!(region.y.abs() < 1e-3);
    }

    #[test]
    fn test_fit_crop_portrait() {
        let region = fit_crop(300, 900, 120.0);
        assert!((region.width - 300.0).abs() < 1e-3);
        assert!(region.x.abs() < 1e-3);
        assert!((region.y - 300.0).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn prop_crop_rect_always_within_image(
            width in 1u32..5000,
            height in 1u32..5000,
            zoom in 1.0f32..8.0,
            cx in 0.0f32..=1.0,
            cy in 0.0f32..=1.0,
        ) {
            let rect = crop_rect(width, height, zoom, center(cx, cy));
            prop_assert!(rect.sw >= 1);
            prop_assert!(rect.sh >= 1);
            prop_assert!(rect.sx + rect.sw <= width, "{:?} in {}x{}", rect, width, height);
            prop_assert!(rect.sy + rect.sh <= height, "{:?} in {}x{}", rect, width, height);
        }

        #[test]
        fn prop_fit_crop_within_image(
            width in 1u32..5000,
            height in 1u32..5000,
            dest in 1.0f32..1000.0,
        ) {
            let region = fit_crop(width, height, dest);
            prop_assert!(region.x >= -1e-2);
            prop_assert!(region.y >= -1e-2);
            prop_assert!(region.x + region.width <= width as f32 + 1e-2);
            prop_assert!(region.y + region.height <= height as f32 + 1e-2);
        }
    }
}
