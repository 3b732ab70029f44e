//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while rendering or exporting a card.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The supplied bytes are not a decodable image.
    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    /// The pixel buffer could not be allocated.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Device pixel ratio is not a positive finite number.
    #[error("Invalid device pixel ratio: {0}")]
    InvalidScale(f32),

    /// Encoding an export failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// No document backend could be resolved.
    #[error("Document backend unavailable: {0}")]
    DocumentBackendUnavailable(String),
}

/// Result type for single drawing calls.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// A single drawing call that could not be carried out.
///
/// The render pipeline absorbs these; they never fail a render.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    /// Source or destination region has no area, is not finite, or leaves the image.
    #[error("Degenerate region: {0}")]
    DegenerateRegion(String),

    /// A clip path could not be built.
    #[error("Invalid clip: {0}")]
    InvalidClip(String),

    /// A shape could not be built (zero size or non-finite coordinates).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}
