//! Card render pipeline.
//!
//! Draws the fixed card layout on any [`DrawingSurface`]. Individual drawing
//! failures are logged and skipped so a render always completes; only
//! allocating the surface can fail.

use idcard_core::geometry::{
    AVATAR_SIZE, AVATAR_X, AVATAR_Y, BASE_FONT_PX, CAPTION_FONT_PX, CAPTION_PADDING, CARD_HEIGHT,
    CARD_WIDTH, DIVIDER_X0, DIVIDER_X1, DIVIDER_Y, FONT_STEP_PX, FOOTER_FONT_PX, FOOTER_Y,
    HEADER_FONT_PX, HEADER_HEIGHT, HEADER_TEXT_X, MIN_FONT_PX, NAME_BASE_Y, NAME_MAX_WIDTH,
    NAME_X,
};
use idcard_core::{
    fit_crop, layout_text, Bitmap, CardState, Color, CropRect, CropState, SourceRegion, TextBlock,
    TextLayoutParams,
};
use tiny_skia::{Pixmap, PremultipliedColorU8};

use crate::backend::{DrawingSurface, LogicalRect, PixmapSurface, TextBaseline};
use crate::error::{RenderResult, SurfaceResult};
use crate::font::{FontBook, FontSpec};
use crate::photo::DecodedImage;

/// Name shown when the name field is blank.
pub const DEFAULT_NAME: &str = "Your Name";
/// Header title shown when the event title is blank.
pub const DEFAULT_EVENT_TITLE: &str = "Event Title";
/// Caption below the name block.
pub const CAPTION_TEXT: &str = "Role: Guest";
/// Footer attribution.
pub const FOOTER_TEXT: &str = "Issued by the event organizer";

const BORDER_COLOR: Color = Color::rgb(0xE5, 0xE7, 0xEB);
const HEADER_TEXT_COLOR: Color = Color::WHITE;
const PLACEHOLDER_COLOR: Color = Color::rgb(0xD1, 0xD5, 0xDB);
const AVATAR_RING_COLOR: Color = Color::rgb(0xE5, 0xE7, 0xEB);
const NAME_COLOR: Color = Color::rgb(0x11, 0x18, 0x27);
const CAPTION_COLOR: Color = Color::rgb(0x4B, 0x55, 0x63);
const FOOTER_COLOR: Color = Color::rgb(0x6B, 0x72, 0x80);
const PREVIEW_BACKGROUND: Color = Color::rgb(0xF3, 0xF4, 0xF6);
const PREVIEW_GUIDE_COLOR: Color = Color::rgba(0xFF, 0xFF, 0xFF, 0xCC);

/// What ended up inside the avatar circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvatarSource {
    /// No image loaded, or every sample attempt failed.
    Placeholder,
    /// The crop rectangle was sampled.
    Cropped(CropRect),
    /// The crop sample failed and the centered fit crop was used.
    FitCrop(SourceRegion),
}

/// Summary of what the pipeline laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    /// Auto-fit name block.
    pub name: TextBlock,
    /// Caption baseline.
    pub caption_y: f32,
    /// Avatar content.
    pub avatar: AvatarSource,
    /// Drawing calls that failed and were skipped.
    pub skipped_draws: usize,
}

/// A rendered card at physical resolution.
#[derive(Debug, Clone)]
pub struct RenderedSurface {
    pixmap: Pixmap,
    logical_width: f32,
    logical_height: f32,
    device_pixel_ratio: f32,
}

impl RenderedSurface {
    /// Logical size (600x360 for cards).
    #[must_use]
    pub fn logical_size(&self) -> (f32, f32) {
        (self.logical_width, self.logical_height)
    }

    /// Physical size in pixels.
    #[must_use]
    pub fn physical_size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    /// Device pixel ratio the surface was rendered at.
    #[must_use]
    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    /// Premultiplied RGBA8 bytes, row-major.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// The underlying pixmap.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// One physical pixel.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<PremultipliedColorU8> {
        self.pixmap.pixel(x, y)
    }
}

/// Name with the blank-field default applied.
#[must_use]
pub fn display_name(card: &CardState) -> &str {
    non_blank(&card.name).unwrap_or(DEFAULT_NAME)
}

/// Event title with the blank-field default applied.
#[must_use]
pub fn display_title(card: &CardState) -> &str {
    non_blank(&card.event_title).unwrap_or(DEFAULT_EVENT_TITLE)
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Layout parameters for the name block.
#[must_use]
pub fn name_layout_params() -> TextLayoutParams {
    TextLayoutParams {
        max_width_px: NAME_MAX_WIDTH,
        base_font_px: BASE_FONT_PX,
        min_font_px: MIN_FONT_PX,
        step_px: FONT_STEP_PX,
    }
}

/// Tracks failed draw calls for one render.
struct Absorb {
    skipped: usize,
}

impl Absorb {
    fn check(&mut self, result: SurfaceResult<()>, what: &str) {
        if let Err(e) = result {
            tracing::warn!("Skipping {what}: {e}");
            self.skipped += 1;
        }
    }
}

/// Draw the card on `surface` in logical units.
///
/// Reads `card` and `crop` only.
pub fn draw_card<S>(surface: &mut S, card: &CardState, crop: &CropState<DecodedImage>) -> CardLayout
where
    S: DrawingSurface + ?Sized,
{
    let mut absorb = Absorb { skipped: 0 };

    // Background and border
    absorb.check(
        surface.fill_rect(
            LogicalRect::new(0.0, 0.0, CARD_WIDTH, CARD_HEIGHT),
            card.card_background,
        ),
        "background",
    );
    absorb.check(
        surface.stroke_rect(
            LogicalRect::new(0.5, 0.5, CARD_WIDTH - 1.0, CARD_HEIGHT - 1.0),
            BORDER_COLOR,
            1.0,
        ),
        "border",
    );

    // Header band. The title is drawn at a fixed size and may overflow the
    // band; only the name block auto-fits.
    absorb.check(
        surface.fill_rect(
            LogicalRect::new(0.0, 0.0, CARD_WIDTH, HEADER_HEIGHT),
            card.header_color,
        ),
        "header band",
    );
    absorb.check(
        surface.draw_text(
            display_title(card),
            HEADER_TEXT_X,
            HEADER_HEIGHT / 2.0,
            FontSpec::bold(HEADER_FONT_PX),
            HEADER_TEXT_COLOR,
            TextBaseline::Middle,
        ),
        "header title",
    );

    let avatar = draw_avatar(surface, crop, &mut absorb);

    // Name block
    let name = {
        let measured: &S = surface;
        layout_text(display_name(card), &name_layout_params(), |text, px| {
            measured.measure_text(text, FontSpec::bold(px))
        })
    };
    for (i, line) in name.lines.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let y = NAME_BASE_Y + i as f32 * name.line_height_px;
        absorb.check(
            surface.draw_text(
                line,
                NAME_X,
                y,
                FontSpec::bold(name.font_size_px),
                NAME_COLOR,
                TextBaseline::Alphabetic,
            ),
            "name line",
        );
    }

    let caption_y = name.offset_below(NAME_BASE_Y, CAPTION_PADDING);
    absorb.check(
        surface.draw_text(
            CAPTION_TEXT,
            NAME_X,
            caption_y,
            FontSpec::regular(CAPTION_FONT_PX),
            CAPTION_COLOR,
            TextBaseline::Alphabetic,
        ),
        "caption",
    );

    // Divider and footer
    absorb.check(
        surface.draw_line(
            (DIVIDER_X0, DIVIDER_Y),
            (DIVIDER_X1, DIVIDER_Y),
            BORDER_COLOR,
            1.0,
        ),
        "divider",
    );
    absorb.check(
        surface.draw_text(
            FOOTER_TEXT,
            DIVIDER_X0,
            FOOTER_Y,
            FontSpec::regular(FOOTER_FONT_PX),
            FOOTER_COLOR,
            TextBaseline::Alphabetic,
        ),
        "footer",
    );

    tracing::trace!(
        lines = name.line_count(),
        font_px = name.font_size_px,
        skipped = absorb.skipped,
        "Card drawn"
    );

    CardLayout {
        name,
        caption_y,
        avatar,
        skipped_draws: absorb.skipped,
    }
}

fn draw_avatar<S>(surface: &mut S, crop: &CropState<DecodedImage>, absorb: &mut Absorb) -> AvatarSource
where
    S: DrawingSurface + ?Sized,
{
    let radius = AVATAR_SIZE / 2.0;
    let (cx, cy) = (AVATAR_X + radius, AVATAR_Y + radius);
    let dst = LogicalRect::new(AVATAR_X, AVATAR_Y, AVATAR_SIZE, AVATAR_SIZE);

    let source = match (crop.source(), crop.crop_rect()) {
        (Some(image), Some(rect)) => {
            surface.save();
            absorb.check(surface.clip_circle(cx, cy, radius), "avatar clip");
            let source = sample_with_fallback(surface, image, rect, dst, AVATAR_SIZE);
            if source == AvatarSource::Placeholder {
                absorb.skipped += 1;
                absorb.check(
                    surface.fill_circle(cx, cy, radius, PLACEHOLDER_COLOR),
                    "avatar placeholder",
                );
            }
            surface.restore();
            source
        }
        _ => {
            absorb.check(
                surface.fill_circle(cx, cy, radius, PLACEHOLDER_COLOR),
                "avatar placeholder",
            );
            AvatarSource::Placeholder
        }
    };

    absorb.check(
        surface.stroke_circle(cx, cy, radius, AVATAR_RING_COLOR, 2.0),
        "avatar ring",
    );
    source
}

/// Sample the crop rectangle into `dst`, falling back to the fit crop.
fn sample_with_fallback<S>(
    surface: &mut S,
    image: &DecodedImage,
    rect: CropRect,
    dst: LogicalRect,
    dest_size: f32,
) -> AvatarSource
where
    S: DrawingSurface + ?Sized,
{
    match surface.draw_image_region(image, rect.into(), dst) {
        Ok(()) => AvatarSource::Cropped(rect),
        Err(e) => {
            tracing::warn!("Crop sample {rect:?} failed ({e}), using fit crop");
            let fit = fit_crop(image.width(), image.height(), dest_size);
            match surface.draw_image_region(image, fit, dst) {
                Ok(()) => AvatarSource::FitCrop(fit),
                Err(e) => {
                    tracing::warn!("Fit crop failed too ({e}), showing placeholder");
                    AvatarSource::Placeholder
                }
            }
        }
    }
}

/// Render the card at `device_pixel_ratio`.
///
/// # Errors
///
/// Returns an error only if the surface cannot be allocated (for example an
/// invalid device pixel ratio).
pub fn render(
    card: &CardState,
    crop: &CropState<DecodedImage>,
    device_pixel_ratio: f32,
    fonts: &FontBook,
) -> RenderResult<(RenderedSurface, CardLayout)> {
    let mut surface = PixmapSurface::new(CARD_WIDTH, CARD_HEIGHT, device_pixel_ratio, fonts)?;
    let layout = draw_card(&mut surface, card, crop);

    let rendered = RenderedSurface {
        pixmap: surface.into_pixmap(),
        logical_width: CARD_WIDTH,
        logical_height: CARD_HEIGHT,
        device_pixel_ratio,
    };
    tracing::debug!(
        "Rendered card {:?} @ {device_pixel_ratio}x ({:?} avatar)",
        rendered.physical_size(),
        layout.avatar
    );
    Ok((rendered, layout))
}

/// Draw the crop preview on `surface`: the crop rectangle filling a
/// `size x size` square with a circular guide, or a placeholder.
pub fn draw_crop_preview<S>(surface: &mut S, crop: &CropState<DecodedImage>, size: f32) -> AvatarSource
where
    S: DrawingSurface + ?Sized,
{
    let mut absorb = Absorb { skipped: 0 };
    let square = LogicalRect::new(0.0, 0.0, size, size);
    absorb.check(surface.fill_rect(square, PREVIEW_BACKGROUND), "preview background");

    let half = size / 2.0;
    let source = match (crop.source(), crop.crop_rect()) {
        (Some(image), Some(rect)) => sample_with_fallback(surface, image, rect, square, size),
        _ => {
            absorb.check(
                surface.fill_circle(half, half, half - 1.0, PLACEHOLDER_COLOR),
                "preview placeholder",
            );
            AvatarSource::Placeholder
        }
    };

    absorb.check(
        surface.stroke_circle(half, half, half - 1.0, PREVIEW_GUIDE_COLOR, 2.0),
        "preview guide",
    );
    source
}

/// Render the crop preview square at `device_pixel_ratio`.
///
/// # Errors
///
/// Returns an error if the surface cannot be allocated.
pub fn render_crop_preview(
    crop: &CropState<DecodedImage>,
    size: f32,
    device_pixel_ratio: f32,
    fonts: &FontBook,
) -> RenderResult<RenderedSurface> {
    let mut surface = PixmapSurface::new(size, size, device_pixel_ratio, fonts)?;
    let source = draw_crop_preview(&mut surface, crop, size);
    tracing::trace!("Rendered crop preview ({source:?})");

    Ok(RenderedSurface {
        pixmap: surface.into_pixmap(),
        logical_width: size,
        logical_height: size,
        device_pixel_ratio,
    })
}
