//! # IdCard Core
//!
//! Pure card logic for the identity card engine. Nothing in this crate
//! touches pixels; the renderer crate drives it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 idcard-core                 │
//! ├─────────────────────────────────────────────┤
//! │  State           │  Input Handler           │
//! │  - CardState     │  - Pointer events        │
//! │  - CropState     │  - Drag controller       │
//! ├─────────────────────────────────────────────┤
//! │  Crop Transform  │  Text Layout Engine      │
//! │  - Crop rect     │  - Auto-shrink           │
//! │  - Fit crop      │  - Greedy word-wrap      │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod color;
pub mod crop;
pub mod error;
pub mod event;
pub mod geometry;
pub mod interaction;
pub mod state;
pub mod text;

pub use color::Color;
pub use crop::{crop_rect, fit_crop, CropRect, SourceRegion};
pub use error::{CardError, CardResult, PointerCaptureError};
pub use event::{PointerEvent, PointerPhase};
pub use interaction::{DragController, DragOutcome, DragState, NoCapture, PointerCapture};
pub use state::{Bitmap, CardFields, CardState, CropCenter, CropState};
pub use text::{layout_text, TextBlock, TextLayoutParams};

/// Card core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
