//! # IdCard Renderer
//!
//! Draws the identity card on a tiny-skia surface and exports it.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐    ┌───────────────────┐    ┌──────────────────┐
//! │ CardEngine   │───▶│ draw_card         │───▶│ RenderedSurface  │
//! │ (state,      │    │ (DrawingSurface:  │    │ (physical pixels)│
//! │  drag, dpr)  │    │  pixmap/recorder) │    └────────┬─────────┘
//! └──────────────┘    └───────────────────┘             │
//!                                          ┌────────────┴────────────┐
//!                                          │ PNG / JPEG │ PDF backend │
//!                                          │            │ or fallback │
//!                                          └─────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod engine;
pub mod error;
pub mod export;
pub mod font;
pub mod photo;
pub mod pipeline;

pub use backend::{DrawingSurface, LogicalRect, PixmapSurface, RecordingSurface, TextBaseline};
pub use engine::{CardEngine, EngineConfig};
pub use error::{RenderError, RenderResult, SurfaceError, SurfaceResult};
#[cfg(feature = "pdf")]
pub use export::PrintPdfBackend;
pub use export::{
    BackendSlot, DocumentBackend, DocumentExport, ExportedFile, PageGeometry, RasterFormat,
};
pub use font::{FontBook, FontSource, FontSpec, FontWeight};
pub use photo::{DecodedImage, ImageFormat, ImageInfo};
pub use pipeline::{render, render_crop_preview, AvatarSource, CardLayout, RenderedSurface};

/// Renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
