//! Card export to image and document formats.
//!
//! Raster exports encode the rendered surface directly. Document exports go
//! through a [`DocumentBackend`] resolved lazily on first use; when none is
//! available the raster image is handed back instead.

use std::fmt;

use idcard_core::geometry::pt_from_px;
use image::ImageEncoder;

use crate::error::{RenderError, RenderResult};
use crate::pipeline::RenderedSurface;

/// Filename stem used when the name is blank.
pub const FALLBACK_STEM: &str = "id-card";
/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Raster output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterFormat {
    /// Lossless PNG with alpha.
    #[default]
    Png,
    /// JPEG, alpha composited over white.
    Jpeg {
        /// Quality 1-100.
        quality: u8,
    },
}

impl RasterFormat {
    /// JPEG at [`DEFAULT_JPEG_QUALITY`].
    #[must_use]
    pub const fn jpeg() -> Self {
        Self::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }

    /// MIME type.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }
}

/// An encoded export ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Suggested filename.
    pub filename: String,
    /// MIME type.
    pub mime: &'static str,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
}

/// Result of a document export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentExport {
    /// The document was produced.
    Document(ExportedFile),
    /// No document could be produced; the raster image is offered instead
    /// for manual print-to-file.
    Fallback {
        /// The raster image.
        image: ExportedFile,
        /// Why the document path failed.
        reason: String,
    },
}

impl DocumentExport {
    /// Whether this is the degraded raster result.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// The file to hand to the user, whichever path produced it.
    #[must_use]
    pub fn file(&self) -> &ExportedFile {
        match self {
            Self::Document(file) | Self::Fallback { image: file, .. } => file,
        }
    }
}

/// Filename stem: trimmed name with whitespace runs replaced by underscores.
#[must_use]
pub fn file_stem(name: &str) -> String {
    let stem = name.split_whitespace().collect::<Vec<_>>().join("_");
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

/// Full filename for `name` with `extension`.
#[must_use]
pub fn export_filename(name: &str, extension: &str) -> String {
    format!("{}.{extension}", file_stem(name))
}

/// Encode the physical buffer.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if encoding fails.
pub fn encode_raster(surface: &RenderedSurface, format: RasterFormat) -> RenderResult<Vec<u8>> {
    match format {
        RasterFormat::Png => surface
            .pixmap()
            .encode_png()
            .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}"))),
        RasterFormat::Jpeg { quality } => {
            let (width, height) = surface.physical_size();
            let rgb = flatten_over_white(surface.data());

            let mut buf = std::io::Cursor::new(Vec::new());
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            encoder
                .write_image(&rgb, width, height, image::ExtendedColorType::Rgb8)
                .map_err(|e| RenderError::Export(format!("JPEG encoding failed: {e}")))?;
            Ok(buf.into_inner())
        }
    }
}

/// Export the surface as a raster file named after `name`.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if encoding fails.
pub fn export_raster(
    surface: &RenderedSurface,
    name: &str,
    format: RasterFormat,
) -> RenderResult<ExportedFile> {
    let bytes = encode_raster(surface, format)?;
    let filename = export_filename(name, format.extension());
    tracing::debug!("Exported {filename} ({} bytes)", bytes.len());
    Ok(ExportedFile {
        filename,
        mime: format.mime(),
        bytes,
    })
}

/// Composite premultiplied RGBA8 over white into RGB8.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn flatten_over_white(premultiplied: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(premultiplied.len() / 4 * 3);
    for px in premultiplied.chunks_exact(4) {
        let inv = 255.0 - f32::from(px[3]);
        for &c in &px[..3] {
            rgb.push((f32::from(c) + inv).round().min(255.0) as u8);
        }
    }
    rgb
}

/// Page size of a document export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Logical width (`physical / dpr`).
    pub width_px: f32,
    /// Logical height (`physical / dpr`).
    pub height_px: f32,
    /// Page width in whole points.
    pub width_pt: f32,
    /// Page height in whole points.
    pub height_pt: f32,
}

impl PageGeometry {
    /// Page geometry for a rendered surface.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn for_surface(surface: &RenderedSurface) -> Self {
        let (pw, ph) = surface.physical_size();
        let dpr = surface.device_pixel_ratio();
        let width_px = pw as f32 / dpr;
        let height_px = ph as f32 / dpr;
        Self {
            width_px,
            height_px,
            width_pt: pt_from_px(width_px),
            height_pt: pt_from_px(height_px),
        }
    }

    /// Whether the page is wider than tall.
    #[must_use]
    pub fn is_landscape(&self) -> bool {
        self.width_pt >= self.height_pt
    }
}

/// Something that can write a one-page document around a raster image.
pub trait DocumentBackend: fmt::Debug {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Produce a single page of `page` size with `surface` filling it at the
    /// origin, without margins.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be produced.
    fn render_page(
        &self,
        surface: &RenderedSurface,
        page: PageGeometry,
        title: &str,
    ) -> RenderResult<Vec<u8>>;
}

/// Points per millimetre as used by `printpdf` for `Mm` to `Pt`.
#[cfg(feature = "pdf")]
const PT_PER_MM: f32 = 2.834_646;

/// PDF backend built on `printpdf`.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintPdfBackend;

#[cfg(feature = "pdf")]
impl DocumentBackend for PrintPdfBackend {
    fn name(&self) -> &str {
        "printpdf"
    }

    #[allow(clippy::cast_precision_loss)]
    fn render_page(
        &self,
        surface: &RenderedSurface,
        page: PageGeometry,
        title: &str,
    ) -> RenderResult<Vec<u8>> {
        // Divide by the factor printpdf multiplies by when writing the
        // MediaBox so whole-point pages come out as whole points.
        let page_width_mm = page.width_pt / PT_PER_MM;
        let page_height_mm = page.height_pt / PT_PER_MM;

        let (doc, page1, layer1) = printpdf::PdfDocument::new(
            title,
            printpdf::Mm(page_width_mm),
            printpdf::Mm(page_height_mm),
            "Layer 1",
        );
        let current_layer = doc.get_page(page1).get_layer(layer1);

        let (width, height) = surface.physical_size();
        let rgb = printpdf::image_crate::RgbImage::from_raw(
            width,
            height,
            flatten_over_white(surface.data()),
        )
        .ok_or_else(|| RenderError::Export("Pixel buffer size mismatch".to_string()))?;
        let pdf_image =
            printpdf::Image::from_dynamic_image(&printpdf::image_crate::DynamicImage::ImageRgb8(rgb));

        // At 96 * dpr the image spans the unrounded logical size in points;
        // scale the remainder so it covers the rounded page exactly.
        let dpi = 96.0 * surface.device_pixel_ratio();
        let pt_per_px = idcard_core::geometry::PT_PER_PX;
        let transform = printpdf::ImageTransform {
            translate_x: Some(printpdf::Mm(0.0)),
            translate_y: Some(printpdf::Mm(0.0)),
            dpi: Some(dpi),
            scale_x: Some(page.width_pt / (page.width_px * pt_per_px)),
            scale_y: Some(page.height_pt / (page.height_px * pt_per_px)),
            ..Default::default()
        };
        pdf_image.add_to_layer(current_layer, transform);

        doc.save_to_bytes()
            .map_err(|e| RenderError::Export(format!("PDF save failed: {e}")))
    }
}

/// Lazily resolved document backend.
#[derive(Debug, Default)]
pub enum BackendSlot {
    /// Not looked up yet.
    #[default]
    Unresolved,
    /// Resolved and usable.
    Ready(Box<dyn DocumentBackend>),
    /// Resolution was attempted and failed.
    Unavailable(String),
}

impl BackendSlot {
    /// A slot that resolves on first use.
    #[must_use]
    pub fn new() -> Self {
        Self::Unresolved
    }

    /// A slot holding `backend`.
    #[must_use]
    pub fn with_backend(backend: Box<dyn DocumentBackend>) -> Self {
        Self::Ready(backend)
    }

    /// A slot that will never produce documents.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Whether resolution has been attempted.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }

    /// Resolve the backend, looking it up only the first time.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DocumentBackendUnavailable`] if no backend exists.
    pub fn resolve(&mut self) -> RenderResult<&dyn DocumentBackend> {
        if let Self::Unresolved = self {
            *self = Self::detect();
        }

        match self {
            Self::Ready(backend) => Ok(&**backend),
            Self::Unavailable(reason) => {
                Err(RenderError::DocumentBackendUnavailable(reason.clone()))
            }
            Self::Unresolved => Err(RenderError::DocumentBackendUnavailable(
                "backend was not resolved".to_string(),
            )),
        }
    }

    #[cfg(feature = "pdf")]
    fn detect() -> Self {
        tracing::debug!("Resolved document backend: printpdf");
        Self::Ready(Box::new(PrintPdfBackend))
    }

    #[cfg(not(feature = "pdf"))]
    fn detect() -> Self {
        let reason = "built without the `pdf` feature".to_string();
        tracing::warn!("No document backend: {reason}");
        Self::Unavailable(reason)
    }
}

/// Export the surface as a one-page document, or fall back to PNG.
///
/// # Errors
///
/// Returns an error only if the PNG fallback itself cannot be encoded.
pub fn export_document(
    surface: &RenderedSurface,
    name: &str,
    title: &str,
    slot: &mut BackendSlot,
) -> RenderResult<DocumentExport> {
    let page = PageGeometry::for_surface(surface);
    let produced = slot
        .resolve()
        .and_then(|backend| {
            tracing::debug!(
                "Writing {}x{} pt page with {}",
                page.width_pt,
                page.height_pt,
                backend.name()
            );
            backend.render_page(surface, page, title)
        });

    match produced {
        Ok(bytes) => Ok(DocumentExport::Document(ExportedFile {
            filename: export_filename(name, "pdf"),
            mime: "application/pdf",
            bytes,
        })),
        Err(e) => {
            tracing::warn!("Document export failed, offering raster image instead: {e}");
            let image = export_raster(surface, name, RasterFormat::Png)?;
            Ok(DocumentExport::Fallback {
                image,
                reason: e.to_string(),
            })
        }
    }
}
