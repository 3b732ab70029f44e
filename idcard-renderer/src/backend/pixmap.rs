//! tiny-skia raster surface.
//!
//! Owns a physical pixmap of `logical * dpr` pixels. Shapes are drawn under a
//! uniform `dpr` scale transform; glyphs are rasterized by rusttype directly
//! at physical size and blended into the premultiplied buffer.

use idcard_core::{Color, SourceRegion};
use rusttype::{point, Scale};
use tiny_skia::{
    FillRule, FilterQuality, Mask, Paint, PathBuilder, Pattern, Pixmap, PremultipliedColorU8,
    Rect, SpreadMode, Stroke, Transform,
};

use super::{validate_source, DrawingSurface, LogicalRect, TextBaseline};
use crate::error::{RenderError, RenderResult, SurfaceError, SurfaceResult};
use crate::font::{FontBook, FontSpec};
use crate::photo::DecodedImage;

/// Raster surface backed by a tiny-skia [`Pixmap`].
pub struct PixmapSurface<'f> {
    pixmap: Pixmap,
    logical_width: f32,
    logical_height: f32,
    scale: f32,
    fonts: &'f FontBook,
    clip: Option<Mask>,
    clip_stack: Vec<Option<Mask>>,
}

impl<'f> PixmapSurface<'f> {
    /// Allocate a transparent surface of `logical * dpr` physical pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if `dpr` is not a positive finite number or the
    /// buffer cannot be allocated.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(
        logical_width: f32,
        logical_height: f32,
        device_pixel_ratio: f32,
        fonts: &'f FontBook,
    ) -> RenderResult<Self> {
        if !(device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0) {
            return Err(RenderError::InvalidScale(device_pixel_ratio));
        }

        let physical_w = (logical_width * device_pixel_ratio).round().max(1.0) as u32;
        let physical_h = (logical_height * device_pixel_ratio).round().max(1.0) as u32;

        let pixmap = Pixmap::new(physical_w, physical_h).ok_or_else(|| {
            RenderError::Surface(format!("Failed to create {physical_w}x{physical_h} pixmap"))
        })?;

        tracing::trace!(
            "Allocated {physical_w}x{physical_h} surface for {logical_width}x{logical_height} @ {device_pixel_ratio}x"
        );

        Ok(Self {
            pixmap,
            logical_width,
            logical_height,
            scale: device_pixel_ratio,
            fonts,
            clip: None,
            clip_stack: Vec::new(),
        })
    }

    /// Device pixel ratio.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Finish drawing and hand back the pixels.
    #[must_use]
    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    fn transform(&self) -> Transform {
        Transform::from_scale(self.scale, self.scale)
    }

    fn solid(color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;
        paint
    }

    fn rect(rect: LogicalRect) -> SurfaceResult<Rect> {
        Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
            .ok_or_else(|| SurfaceError::InvalidGeometry(format!("{rect:?}")))
    }

    fn stroke(width: f32) -> Stroke {
        Stroke {
            width,
            ..Stroke::default()
        }
    }

    fn circle(cx: f32, cy: f32, radius: f32) -> SurfaceResult<tiny_skia::Path> {
        PathBuilder::from_circle(cx, cy, radius).ok_or_else(|| {
            SurfaceError::InvalidGeometry(format!("circle ({cx}, {cy}) r={radius}"))
        })
    }
}

impl DrawingSurface for PixmapSurface<'_> {
    fn logical_size(&self) -> (f32, f32) {
        (self.logical_width, self.logical_height)
    }

    fn fill_rect(&mut self, rect: LogicalRect, color: Color) -> SurfaceResult<()> {
        let rect = Self::rect(rect)?;
        let ts = self.transform();
        self.pixmap
            .fill_rect(rect, &Self::solid(color), ts, self.clip.as_ref());
        Ok(())
    }

    fn stroke_rect(&mut self, rect: LogicalRect, color: Color, width: f32) -> SurfaceResult<()> {
        let path = PathBuilder::from_rect(Self::rect(rect)?);
        let ts = self.transform();
        self.pixmap.stroke_path(
            &path,
            &Self::solid(color),
            &Self::stroke(width),
            ts,
            self.clip.as_ref(),
        );
        Ok(())
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) -> SurfaceResult<()> {
        let path = Self::circle(cx, cy, radius)?;
        let ts = self.transform();
        self.pixmap.fill_path(
            &path,
            &Self::solid(color),
            FillRule::Winding,
            ts,
            self.clip.as_ref(),
        );
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
        let path = Self::circle(cx, cy, radius)?;
        let ts = self.transform();
        self.pixmap.stroke_path(
            &path,
            &Self::solid(color),
            &Self::stroke(width),
            ts,
            self.clip.as_ref(),
        );
        Ok(())
    }

    fn draw_line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        color: Color,
        width: f32,
    ) -> SurfaceResult<()> {
        let mut pb = PathBuilder::new();
        pb.move_to(from.0, from.1);
        pb.line_to(to.0, to.1);
        let path = pb
            .finish()
            .ok_or_else(|| SurfaceError::InvalidGeometry(format!("line {from:?} -> {to:?}")))?;
        let ts = self.transform();
        self.pixmap.stroke_path(
            &path,
            &Self::solid(color),
            &Self::stroke(width),
            ts,
            self.clip.as_ref(),
        );
        Ok(())
    }

    fn save(&mut self) {
        self.clip_stack.push(self.clip.clone());
    }

    fn restore(&mut self) {
        if let Some(clip) = self.clip_stack.pop() {
            self.clip = clip;
        }
    }

    fn clip_circle(&mut self, cx: f32, cy: f32, radius: f32) -> SurfaceResult<()> {
        let path = Self::circle(cx, cy, radius)
            .map_err(|e| SurfaceError::InvalidClip(e.to_string()))?;
        let ts = self.transform();

        match self.clip.as_mut() {
            Some(mask) => mask.intersect_path(&path, FillRule::Winding, true, ts),
            None => {
                let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())
                    .ok_or_else(|| SurfaceError::InvalidClip("mask allocation".to_string()))?;
                mask.fill_path(&path, FillRule::Winding, true, ts);
                self.clip = Some(mask);
            }
        }
        Ok(())
    }

    fn draw_image_region(
        &mut self,
        image: &DecodedImage,
        src: SourceRegion,
        dst: LogicalRect,
    ) -> SurfaceResult<()> {
        validate_source(src, image.pixmap().width(), image.pixmap().height())?;
        let dst_rect = Rect::from_xywh(dst.x, dst.y, dst.width, dst.height)
            .ok_or_else(|| SurfaceError::DegenerateRegion(format!("destination {dst:?}")))?;

        let sx = dst.width / src.width;
        let sy = dst.height / src.height;
        let shader_ts = Transform::from_row(sx, 0.0, 0.0, sy, dst.x - src.x * sx, dst.y - src.y * sy);

        let paint = Paint {
            shader: Pattern::new(
                image.pixmap().as_ref(),
                SpreadMode::Pad,
                FilterQuality::Bicubic,
                1.0,
                shader_ts,
            ),
            anti_alias: true,
            ..Paint::default()
        };

        let ts = self.transform();
        self.pixmap
            .fill_rect(dst_rect, &paint, ts, self.clip.as_ref());
        Ok(())
    }

    fn measure_text(&self, text: &str, font: FontSpec) -> f32 {
        self.fonts.measure(text, font)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: FontSpec,
        color: Color,
        baseline: TextBaseline,
    ) -> SurfaceResult<()> {
        if !(x.is_finite() && y.is_finite() && font.size_px.is_finite()) {
            return Err(SurfaceError::InvalidGeometry(format!("text at ({x}, {y})")));
        }

        let fonts = self.fonts;
        let Some(face) = fonts.face(font.weight) else {
            tracing::trace!("No font face, skipping glyphs for {text:?}");
            return Ok(());
        };

        let scale = Scale::uniform(font.size_px * self.scale);
        let baseline_y = match baseline {
            TextBaseline::Alphabetic => y * self.scale,
            TextBaseline::Middle => {
                let metrics = fonts.line_metrics(font);
                (y + (metrics.ascent + metrics.descent) / 2.0) * self.scale
            }
        };

        let pixmap = &mut self.pixmap;
        let clip = self.clip.as_ref();
        for glyph in face.layout(text, scale, point(x * self.scale, baseline_y)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                blend_coverage(pixmap, clip, bb.min.x + gx as i32, bb.min.y + gy as i32, coverage, color);
            });
        }
        Ok(())
    }
}

/// Source-over blend of a solid color at `coverage` into one physical pixel.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
fn blend_coverage(
    pixmap: &mut Pixmap,
    clip: Option<&Mask>,
    x: i32,
    y: i32,
    coverage: f32,
    color: Color,
) {
    let (w, h) = (pixmap.width(), pixmap.height());
    if x < 0 || y < 0 || x as u32 >= w || y as u32 >= h {
        return;
    }
    let idx = (y as u32 * w + x as u32) as usize;

    let mut alpha = coverage.clamp(0.0, 1.0) * f32::from(color.a) / 255.0;
    if let Some(mask) = clip {
        alpha *= f32::from(mask.data()[idx]) / 255.0;
    }
    if alpha <= 0.0 {
        return;
    }

    let pixels = pixmap.pixels_mut();
    let dst = pixels[idx];
    let inv = 1.0 - alpha;
    let channel = |src: u8, dst: u8| (f32::from(src) * alpha + f32::from(dst) * inv).round() as u8;

    if let Some(out) = PremultipliedColorU8::from_rgba(
        channel(color.r, dst.red()),
        channel(color.g, dst.green()),
        channel(color.b, dst.blue()),
        channel(0xFF, dst.alpha()),
    ) {
        pixels[idx] = out;
    }
}
