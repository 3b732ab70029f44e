//! Error types for card operations.

use thiserror::Error;

/// Result type for card operations.
pub type CardResult<T> = Result<T, CardError>;

/// Errors that can occur in card operations.
#[derive(Debug, Error)]
pub enum CardError {
    /// A color string could not be parsed.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Card serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure to capture or release a pointer.
///
/// Hosts report these from [`crate::PointerCapture`]; the drag controller
/// never surfaces them to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerCaptureError {
    /// The pointer is no longer active (already lifted or released).
    #[error("Pointer {0} is not active")]
    NotActive(u32),

    /// The host refused the capture request.
    #[error("Pointer capture rejected: {0}")]
    Rejected(String),
}
