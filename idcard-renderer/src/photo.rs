//! Photo decoding.
//!
//! Supports raw encoded bytes and base64 data URIs. Decoded photos are kept
//! as premultiplied tiny-skia pixmaps so they can be sampled directly.

use idcard_core::Bitmap;
use serde::{Deserialize, Serialize};
use tiny_skia::{IntSize, Pixmap};

use crate::error::{RenderError, RenderResult};

/// Encoded formats recognized by magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// GIF (first frame).
    Gif,
    /// Windows bitmap.
    Bmp,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        if data.starts_with(b"BM") {
            return Self::Bmp;
        }

        Self::Unknown
    }
}

/// Size and format of a freshly decoded photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Detected encoded format.
    pub format: ImageFormat,
}

/// A decoded photo, ready for sampling.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixmap: Pixmap,
    format: ImageFormat,
}

impl DecodedImage {
    /// Build from straight (non-premultiplied) RGBA8 pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is zero or the buffer length does not match.
    pub fn from_rgba(width: u32, height: u32, mut rgba: Vec<u8>) -> RenderResult<Self> {
        let size = IntSize::from_wh(width, height)
            .ok_or_else(|| RenderError::ImageDecode(format!("empty image {width}x{height}")))?;

        for px in rgba.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a < 255 {
                for c in &mut px[..3] {
                    #[allow(clippy::cast_possible_truncation)]
                    let premultiplied = ((u16::from(*c) * a + 127) / 255) as u8;
                    *c = premultiplied;
                }
            }
        }

        let pixmap = Pixmap::from_vec(rgba, size).ok_or_else(|| {
            RenderError::ImageDecode(format!("pixel buffer does not match {width}x{height}"))
        })?;

        Ok(Self {
            pixmap,
            format: ImageFormat::Unknown,
        })
    }

    /// The premultiplied pixels.
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Format the photo was decoded from.
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Size and format summary.
    #[must_use]
    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            width: self.pixmap.width(),
            height: self.pixmap.height(),
            format: self.format,
        }
    }
}

impl Bitmap for DecodedImage {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }
}

/// Decode an image from raw bytes.
///
/// # Errors
///
/// Returns [`RenderError::ImageDecode`] if the image cannot be decoded.
pub fn load_image_from_bytes(data: &[u8]) -> RenderResult<DecodedImage> {
    let format = ImageFormat::from_magic_bytes(data);

    let img = image::load_from_memory(data)
        .map_err(|e| RenderError::ImageDecode(e.to_string()))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut decoded = DecodedImage::from_rgba(width, height, rgba.into_raw())?;
    decoded.format = format;
    tracing::debug!("Decoded {width}x{height} {format:?} image");
    Ok(decoded)
}

/// Decode an image from a data URI.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns an error if the data URI is malformed or the image cannot be decoded.
pub fn load_image_from_data_uri(uri: &str) -> RenderResult<DecodedImage> {
    let uri_data = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::ImageDecode("Not a data URI".to_string()))?;

    let (metadata, encoded_data) = uri_data
        .split_once(',')
        .ok_or_else(|| RenderError::ImageDecode("Invalid data URI: missing comma".to_string()))?;

    let bytes = if metadata.contains(";base64") {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(encoded_data.trim())
            .map_err(|e| RenderError::ImageDecode(format!("Failed to decode base64: {e}")))?
    } else {
        percent_decode(encoded_data)?
    };

    load_image_from_bytes(&bytes)
}

/// Percent-decoding for non-base64 data URIs.
fn percent_decode(input: &str) -> RenderResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| RenderError::ImageDecode("Invalid URL encoding".to_string()))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}
