//! Recording surface.
//!
//! Captures draw calls instead of rasterizing them. Used to inspect what the
//! pipeline draws and to inject image-draw failures.

use idcard_core::{Color, SourceRegion};

use super::{validate_source, DrawingSurface, LogicalRect, TextBaseline};
use crate::error::{SurfaceError, SurfaceResult};
use crate::font::{FontBook, FontSpec};
use crate::photo::DecodedImage;

/// One captured drawing call.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect {
        rect: LogicalRect,
        color: Color,
    },
    StrokeRect {
        rect: LogicalRect,
        color: Color,
        width: f32,
    },
    FillCircle {
        cx: f32,
        cy: f32,
        radius: f32,
        color: Color,
    },
    StrokeCircle {
        cx: f32,
        cy: f32,
        radius: f32,
        color: Color,
        width: f32,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Color,
        width: f32,
    },
    Save,
    Restore,
    ClipCircle {
        cx: f32,
        cy: f32,
        radius: f32,
    },
    Image {
        src: SourceRegion,
        dst: LogicalRect,
    },
    Text {
        text: String,
        x: f32,
        y: f32,
        font: FontSpec,
        color: Color,
        baseline: TextBaseline,
    },
}

/// A [`DrawingSurface`] that records every successful call.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f32,
    height: f32,
    fonts: FontBook,
    ops: Vec<DrawOp>,
    failing_image_draws: usize,
    depth: usize,
}

impl RecordingSurface {
    /// Create a recorder with approximate text metrics.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self::with_fonts(width, height, FontBook::approximate())
    }

    /// Create a recorder measuring text with `fonts`.
    #[must_use]
    pub fn with_fonts(width: f32, height: f32, fonts: FontBook) -> Self {
        Self {
            width,
            height,
            fonts,
            ops: Vec::new(),
            failing_image_draws: 0,
            depth: 0,
        }
    }

    /// Make the next `count` image draws fail with [`SurfaceError::DegenerateRegion`].
    #[must_use]
    pub fn failing_image_draws(mut self, count: usize) -> Self {
        self.failing_image_draws = count;
        self
    }

    /// Recorded calls, in order.
    #[must_use]
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Recorded image draws.
    pub fn image_draws(&self) -> impl Iterator<Item = (SourceRegion, LogicalRect)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Image { src, dst } => Some((*src, *dst)),
            _ => None,
        })
    }

    /// Recorded text runs.
    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Current save depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Drop everything recorded so far.
    pub fn clear(&mut self) {
        self.ops.clear();
        self.depth = 0;
    }

    fn check_rect(rect: LogicalRect) -> SurfaceResult<()> {
        let finite = [rect.x, rect.y, rect.width, rect.height]
            .iter()
            .all(|v| v.is_finite());
        if finite && rect.width > 0.0 && rect.height > 0.0 {
            Ok(())
        } else {
            Err(SurfaceError::InvalidGeometry(format!("{rect:?}")))
        }
    }

    fn check_circle(cx: f32, cy: f32, radius: f32) -> SurfaceResult<()> {
        if cx.is_finite() && cy.is_finite() && radius.is_finite() && radius > 0.0 {
            Ok(())
        } else {
            Err(SurfaceError::InvalidGeometry(format!(
                "circle ({cx}, {cy}) r={radius}"
            )))
        }
    }
}

impl DrawingSurface for RecordingSurface {
    fn logical_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn fill_rect(&mut self, rect: LogicalRect, color: Color) -> SurfaceResult<()> {
        Self::check_rect(rect)?;
        self.ops.push(DrawOp::FillRect { rect, color });
        Ok(())
    }

    fn stroke_rect(&mut self, rect: LogicalRect, color: Color, width: f32) -> SurfaceResult<()> {
        Self::check_rect(rect)?;
        self.ops.push(DrawOp::StrokeRect { rect, color, width });
        Ok(())
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) -> SurfaceResult<()> {
        Self::check_circle(cx, cy, radius)?;
        self.ops.push(DrawOp::FillCircle {
            cx,
            cy,
            radius,
            color,
        });
        Ok(())
    }

    fn stroke_circle(
        &mut self,
        cx: f32,
        cy: f32,
        radius: f32,
        color: Color,
        width: f32,
    ) -> SurfaceResult<()> {
        Self::check_circle(cx, cy, radius)?;
        self.ops.push(DrawOp::StrokeCircle {
            cx,
            cy,
            radius,
            color,
            width,
        });
        Ok(())
    }

    fn draw_line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        color: Color,
        width: f32,
    ) -> SurfaceResult<()> {
        if ![from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite()) {
            return Err(SurfaceError::InvalidGeometry(format!(
                "line {from:?} -> {to:?}"
            )));
        }
        self.ops.push(DrawOp::Line {
            from,
            to,
            color,
            width,
        });
        Ok(())
    }

    fn save(&mut self) {
        self.depth += 1;
        self.ops.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.ops.push(DrawOp::Restore);
    }

    fn clip_circle(&mut self, cx: f32, cy: f32, radius: f32) -> SurfaceResult<()> {
        Self::check_circle(cx, cy, radius)
            .map_err(|e| SurfaceError::InvalidClip(e.to_string()))?;
        self.ops.push(DrawOp::ClipCircle { cx, cy, radius });
        Ok(())
    }

    fn draw_image_region(
        &mut self,
        image: &DecodedImage,
        src: SourceRegion,
        dst: LogicalRect,
    ) -> SurfaceResult<()> {
        if self.failing_image_draws > 0 {
            self.failing_image_draws -= 1;
            return Err(SurfaceError::DegenerateRegion(format!(
                "injected failure for {src:?}"
            )));
        }
        validate_source(src, image.pixmap().width(), image.pixmap().height())?;
        Self::check_rect(dst).map_err(|e| SurfaceError::DegenerateRegion(e.to_string()))?;
        self.ops.push(DrawOp::Image { src, dst });
        Ok(())
    }

    fn measure_text(&self, text: &str, font: FontSpec) -> f32 {
        self.fonts.measure(text, font)
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: FontSpec,
        color: Color,
        baseline: TextBaseline,
    ) -> SurfaceResult<()> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(SurfaceError::InvalidGeometry(format!("text at ({x}, {y})")));
        }
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            font,
            color,
            baseline,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let mut s = RecordingSurface::new(10.0, 10.0);
        s.save();
        s.fill_rect(LogicalRect::new(0.0, 0.0, 1.0, 1.0), Color::BLACK)
            .expect("fill");
        s.restore();

        assert_eq!(s.ops().len(), 3);
        assert_eq!(s.ops()[0], DrawOp::Save);
        assert_eq!(s.ops()[2], DrawOp::Restore);
        assert_eq!(s.depth(), 0);
    }

    #[test]
    fn test_invalid_geometry_not_recorded() {
        let mut s = RecordingSurface::new(10.0, 10.0);
        assert!(s
            .fill_rect(LogicalRect::new(0.0, 0.0, 0.0, 1.0), Color::BLACK)
            .is_err());
        assert!(s.fill_circle(0.0, 0.0, -1.0, Color::BLACK).is_err());
        assert!(s.ops().is_empty());
    }

    #[test]
    fn test_injected_image_failures() {
        let image = DecodedImage::from_rgba(2, 2, vec![255; 16]).expect("image");
        let src = SourceRegion {
            x: 0.0,
            y: 0.0,
            width: 2.0,
            height: 2.0,
        };
        let dst = LogicalRect::new(0.0, 0.0, 4.0, 4.0);
        let mut s = RecordingSurface::new(10.0, 10.0).failing_image_draws(1);

        assert!(s.draw_image_region(&image, src, dst).is_err());
        assert!(s.draw_image_region(&image, src, dst).is_ok());
        assert_eq!(s.image_draws().count(), 1);
    }
}
