//! Pointer events delivered to the crop preview.

use serde::{Deserialize, Serialize};

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed / finger down.
    Down,
    /// Pointer moved.
    Move,
    /// Button released / finger up.
    Up,
    /// Pointer capture lost or gesture cancelled by the host.
    Cancel,
}

/// A pointer event in crop-preview coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    /// Pointer identifier (for multi-pointer hosts).
    pub pointer_id: u32,
    /// Phase of this event.
    pub phase: PointerPhase,
    /// X position in preview pixels.
    pub x: f32,
    /// Y position in preview pixels.
    pub y: f32,
    /// Timestamp in milliseconds since session start.
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl PointerEvent {
    /// Create a new pointer event.
    #[must_use]
    pub fn new(pointer_id: u32, phase: PointerPhase, x: f32, y: f32) -> Self {
        Self {
            pointer_id,
            phase,
            x,
            y,
            timestamp_ms: 0,
        }
    }

    /// Pointer-down for the primary pointer.
    #[must_use]
    pub fn down(x: f32, y: f32) -> Self {
        Self::new(0, PointerPhase::Down, x, y)
    }

    /// Pointer-move for the primary pointer.
    #[must_use]
    pub fn moved(x: f32, y: f32) -> Self {
        Self::new(0, PointerPhase::Move, x, y)
    }

    /// Pointer-up for the primary pointer.
    #[must_use]
    pub fn up(x: f32, y: f32) -> Self {
        Self::new(0, PointerPhase::Up, x, y)
    }

    /// Attach a timestamp.
    #[must_use]
    pub fn at(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }
}
