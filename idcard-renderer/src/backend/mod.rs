//! Drawing surfaces the card pipeline draws on.
//!
//! The pipeline only speaks this trait, so any raster backend that can fill
//! shapes, clip to a circle, sample an image region and draw text can host it.

pub mod pixmap;
pub mod recording;

use idcard_core::{Color, SourceRegion};

use crate::error::SurfaceResult;
use crate::font::FontSpec;
use crate::photo::DecodedImage;

pub use pixmap::PixmapSurface;
pub use recording::{DrawOp, RecordingSurface};

/// A rectangle in logical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicalRect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl LogicalRect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Vertical anchor for [`DrawingSurface::draw_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    /// `y` is the alphabetic baseline.
    Alphabetic,
    /// `y` is the middle of the em box.
    Middle,
}

/// Minimal 2D drawing interface, in logical units.
pub trait DrawingSurface {
    /// Logical width and height.
    fn logical_size(&self) -> (f32, f32);

    /// Fill a rectangle.
    ///
    /// # Errors
    ///
    /// Returns an error if the rectangle is empty or not finite.
    fn fill_rect(&mut self, rect: LogicalRect, color: Color) -> SurfaceResult<()>;

    /// Stroke a rectangle outline.
    ///
    /// # Errors
    ///
    /// Returns an error if the rectangle is empty or not finite.
    fn stroke_rect(&mut self, rect: LogicalRect, color: Color, width: f32) -> SurfaceResult<()>;

    /// Fill a circle.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is not positive.
    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) -> SurfaceResult<()>;

    /// Stroke a circle outline.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is not positive.
    fn stroke_circle(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        color: Color,
        width: f32,
    ) -> SurfaceResult<()>;

    /// Draw a straight line.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinates are not finite.
    fn draw_line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        color: Color,
        width: f32,
    ) -> SurfaceResult<()>;

    /// Push the current clip onto the state stack.
    fn save(&mut self);

    /// Pop the clip saved by the matching [`save`](Self::save).
    fn restore(&mut self);

    /// Intersect the current clip with a circle.
    ///
    /// # Errors
    ///
    /// Returns an error if the clip mask cannot be built.
    fn clip_circle(&mut self, cx: f32, cy: f32, radius: f32) -> SurfaceResult<()>;

    /// Sample `src` (image pixels) into `dst` (logical units), honoring the clip.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SurfaceError::DegenerateRegion`] if `src` has no area
    /// or leaves the image.
    fn draw_image_region(
        &mut self,
        image: &DecodedImage,
        src: SourceRegion,
        dst: LogicalRect,
    ) -> SurfaceResult<()>;

    /// Advance width of `text`.
    fn measure_text(&self, text: &str, font: FontSpec) -> f32;

    /// Draw `text` with its left edge at `x`.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is not finite.
    fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: FontSpec,
        color: Color,
        baseline: TextBaseline,
    ) -> SurfaceResult<()>;
}

/// Check that a source region has area and lies within a `width x height` image.
pub(crate) fn validate_source(
    src: SourceRegion,
    width: u32,
    height: u32,
) -> SurfaceResult<()> {
    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (width as f32, height as f32);
    let finite = [src.x, src.y, src.width, src.height]
        .iter()
        .all(|v| v.is_finite());
    // Allow a hair of float slack on the far edges.
    let inside = src.x >= 0.0
        && src.y >= 0.0
        && src.x + src.width <= w + 1e-3
        && src.y + src.height <= h + 1e-3;

    if finite && src.width > 0.0 && src.height > 0.0 && inside {
        Ok(())
    } else {
        Err(crate::SurfaceError::DegenerateRegion(format!(
            "{src:?} in {width}x{height} image"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idcard_core::{crop_rect, fit_crop, CropCenter};
    use proptest::prelude::*;

    #[test]
    fn test_validate_source_rejects_degenerate() {
        let region = |x, y, width, height| SourceRegion {
            x,
            y,
            width,
            height,
        };
        assert!(validate_source(region(0.0, 0.0, 10.0, 10.0), 10, 10).is_ok());
        assert!(validate_source(region(0.0, 0.0, 0.0, 10.0), 10, 10).is_err());
        assert!(validate_source(region(-1.0, 0.0, 5.0, 5.0), 10, 10).is_err());
        assert!(validate_source(region(6.0, 0.0, 5.0, 5.0), 10, 10).is_err());
        assert!(validate_source(region(f32::NAN, 0.0, 5.0, 5.0), 10, 10).is_err());
    }

    proptest! {
        #[test]
        fn prop_crop_and_fit_regions_are_drawable(
            width in 1u32..4000,
            height in 1u32..4000,
            zoom in 1.0f32..3.0,
            cx in 0.0f32..=1.0,
            cy in 0.0f32..=1.0,
        ) {
            let rect = crop_rect(width, height, zoom, CropCenter { x: cx, y: cy });
            prop_assert!(validate_source(rect.into(), width, height).is_ok());

            let fit = fit_crop(width, height, 120.0);
            prop_assert!(validate_source(fit, width, height).is_ok(), "{:?}", fit);
        }
    }
}
