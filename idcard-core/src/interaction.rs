//! Drag-to-pan on the crop preview.
//!
//! A drag session begins on pointer-down (only while an image is loaded),
//! converts every pointer move into a center shift of `delta / preview_size`,
//! and ends on pointer-up or cancel. Events outside a session are dropped.

use serde::{Deserialize, Serialize};

use crate::event::{PointerEvent, PointerPhase};
use crate::geometry::CROP_PREVIEW_SIZE;
use crate::state::{Bitmap, CropState};
use crate::PointerCaptureError;

/// Host capability for routing a pointer's events to the preview.
pub trait PointerCapture {
    /// Start capturing `pointer_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot capture the pointer.
    fn capture(&mut self, pointer_id: u32) -> Result<(), PointerCaptureError>;

    /// Stop capturing `pointer_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pointer was already released.
    fn release(&mut self, pointer_id: u32) -> Result<(), PointerCaptureError>;
}

/// Capture implementation for hosts without pointer capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl PointerCapture for NoCapture {
    fn capture(&mut self, _pointer_id: u32) -> Result<(), PointerCaptureError> {
        Ok(())
    }

    fn release(&mut self, _pointer_id: u32) -> Result<(), PointerCaptureError> {
        Ok(())
    }
}

/// Drag session state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DragState {
    /// No drag in progress.
    Idle,
    /// A pointer is dragging the crop window.
    Dragging {
        /// Pointer that owns the session.
        pointer_id: u32,
        /// Last seen X.
        last_x: f32,
        /// Last seen Y.
        last_y: f32,
    },
}

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// A drag session started.
    Started,
    /// The crop center moved.
    Moved,
    /// The drag session ended.
    Ended,
    /// The event was not relevant in the current state.
    Ignored,
}

impl DragOutcome {
    /// Whether the crop state changed and the card needs re-rendering.
    #[must_use]
    pub fn changed_crop(self) -> bool {
        self == Self::Moved
    }
}

/// Turns pointer drags on a `P x P` crop preview into crop center updates.
#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    preview_size: f32,
}

impl DragController {
    /// Create a controller for a preview of `preview_size` pixels per side.
    #[must_use]
    pub fn new(preview_size: f32) -> Self {
        let preview_size = if preview_size.is_finite() && preview_size > 0.0 {
            preview_size
        } else {
            CROP_PREVIEW_SIZE
        };
        Self {
            state: DragState::Idle,
            preview_size,
        }
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> DragState {
        self.state
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Preview side length.
    #[must_use]
    pub fn preview_size(&self) -> f32 {
        self.preview_size
    }

    /// Dispatch an event to [`begin`](Self::begin), [`update`](Self::update)
    /// or [`end`](Self::end) according to its phase.
    pub fn handle<B, C>(
        &mut self,
        event: &PointerEvent,
        crop: &mut CropState<B>,
        capture: &mut C,
    ) -> DragOutcome
    where
        B: Bitmap,
        C: PointerCapture + ?Sized,
    {
        match event.phase {
            PointerPhase::Down => self.begin(event, crop, capture),
            PointerPhase::Move => self.update(event, crop),
            PointerPhase::Up | PointerPhase::Cancel => self.end(event, capture),
        }
    }

    /// Start a drag session. Only valid while idle and with an image loaded.
    pub fn begin<B, C>(
        &mut self,
        event: &PointerEvent,
        crop: &CropState<B>,
        capture: &mut C,
    ) -> DragOutcome
    where
        B: Bitmap,
        C: PointerCapture + ?Sized,
    {
        if self.is_dragging() || !crop.has_image() {
            return DragOutcome::Ignored;
        }

        if let Err(e) = capture.capture(event.pointer_id) {
            tracing::debug!("Pointer capture failed, dragging without it: {e}");
        }

        self.state = DragState::Dragging {
            pointer_id: event.pointer_id,
            last_x: event.x,
            last_y: event.y,
        };
        tracing::debug!("Drag started at ({}, {})", event.x, event.y);
        DragOutcome::Started
    }

    /// Apply a pointer move to the crop center.
    pub fn update<B: Bitmap>(&mut self, event: &PointerEvent, crop: &mut CropState<B>) -> DragOutcome {
        let DragState::Dragging {
            pointer_id,
            last_x,
            last_y,
        } = self.state
        else {
            return DragOutcome::Ignored;
        };

        if pointer_id != event.pointer_id {
            return DragOutcome::Ignored;
        }

        let dx = event.x - last_x;
        let dy = event.y - last_y;
        crop.pan_by(dx / self.preview_size, dy / self.preview_size);

        self.state = DragState::Dragging {
            pointer_id,
            last_x: event.x,
            last_y: event.y,
        };
        tracing::trace!(dx, dy, "Drag moved crop center to {:?}", crop.center());
        DragOutcome::Moved
    }

    /// End the drag session and release capture. Release errors are ignored.
    pub fn end<C>(&mut self, event: &PointerEvent, capture: &mut C) -> DragOutcome
    where
        C: PointerCapture + ?Sized,
    {
        let DragState::Dragging { pointer_id, .. } = self.state else {
            return DragOutcome::Ignored;
        };

        if pointer_id != event.pointer_id {
            return DragOutcome::Ignored;
        }

        if let Err(e) = capture.release(pointer_id) {
            tracing::trace!("Ignoring pointer release error: {e}");
        }

        self.state = DragState::Idle;
        tracing::debug!("Drag ended");
        DragOutcome::Ended
    }

    /// Abort any session without touching capture (e.g. when the image is replaced).
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
    }
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(CROP_PREVIEW_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CropCenter;

    struct Dims(u32, u32);

    impl Bitmap for Dims {
        fn width(&self) -> u32 {
            self.0
        }
        fn height(&self) -> u32 {
            self.1
        }
    }

    /// Capture that records calls and fails releases, like a host whose
    /// pointer was already released.
    #[derive(Default)]
    struct FlakyCapture {
        captured: Vec<u32>,
        releases: usize,
    }

    impl PointerCapture for FlakyCapture {
        fn capture(&mut self, pointer_id: u32) -> Result<(), PointerCaptureError> {
            self.captured.push(pointer_id);
            Ok(())
        }

        fn release(&mut self, pointer_id: u32) -> Result<(), PointerCaptureError> {
            self.releases += 1;
            Err(PointerCaptureError::NotActive(pointer_id))
        }
    }

    fn loaded_crop() -> CropState<Dims> {
        let mut crop = CropState::new();
        crop.replace_image(Dims(800, 600));
        crop
    }

    #[test]
    fn test_half_preview_drag_reaches_right_edge() {
        let mut crop = loaded_crop();
        let mut drag = DragController::new(240.0);

        assert_eq!(
            drag.handle(&PointerEvent::down(10.0, 10.0), &mut crop, &mut NoCapture),
            DragOutcome::Started
        );
        assert_eq!(
            drag.handle(&PointerEvent::moved(130.0, 10.0), &mut crop, &mut NoCapture),
            DragOutcome::Moved
        );
        assert_eq!(crop.center(), CropCenter { x: 1.0, y: 0.5 });
    }

    #[test]
    fn test_moves_accumulate_from_last_position() {
        let mut crop = loaded_crop();
        let mut drag = DragController::new(100.0);

        drag.handle(&PointerEvent::down(50.0, 50.0), &mut crop, &mut NoCapture);
        drag.handle(&PointerEvent::moved(60.0, 40.0), &mut crop, &mut NoCapture);
        drag.handle(&PointerEvent::moved(70.0, 30.0), &mut crop, &mut NoCapture);

        let c = crop.center();
        assert!((c.x - 0.7).abs() < 1e-5);
        assert!((c.y - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_down_without_image_is_ignored() {
        let mut crop: CropState<Dims> = CropState::new();
        let mut drag = DragController::default();

        assert_eq!(
            drag.handle(&PointerEvent::down(1.0, 1.0), &mut crop, &mut NoCapture),
            DragOutcome::Ignored
        );
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_move_while_idle_is_noop() {
        let mut crop = loaded_crop();
        let mut drag = DragController::default();

        let outcome = drag.handle(&PointerEvent::moved(200.0, 200.0), &mut crop, &mut NoCapture);
        assert_eq!(outcome, DragOutcome::Ignored);
        assert_eq!(crop.center(), CropCenter::MIDDLE);
    }

    #[test]
    fn test_late_move_after_up_is_noop() {
        let mut crop = loaded_crop();
        let mut drag = DragController::default();

        drag.handle(&PointerEvent::down(0.0, 0.0), &mut crop, &mut NoCapture);
        drag.handle(&PointerEvent::up(0.0, 0.0), &mut crop, &mut NoCapture);
        let outcome = drag.handle(&PointerEvent::moved(100.0, 0.0), &mut crop, &mut NoCapture);

        assert_eq!(outcome, DragOutcome::Ignored);
        assert_eq!(crop.center(), CropCenter::MIDDLE);
    }

    #[test]
    fn test_release_errors_are_swallowed() {
        let mut crop = loaded_crop();
        let mut drag = DragController::default();
        let mut capture = FlakyCapture::default();

        drag.handle(&PointerEvent::new(7, PointerPhase::Down, 0.0, 0.0), &mut crop, &mut capture);
        assert_eq!(capture.captured, vec![7]);

        let outcome = drag.handle(
            &PointerEvent::new(7, PointerPhase::Cancel, 0.0, 0.0),
            &mut crop,
            &mut capture,
        );
        assert_eq!(outcome, DragOutcome::Ended);
        assert_eq!(capture.releases, 1);
        assert_eq!(drag.state(), DragState::Idle);
    }

    #[test]
    fn test_other_pointer_cannot_steer_drag() {
        let mut crop = loaded_crop();
        let mut drag = DragController::default();

        drag.handle(&PointerEvent::new(1, PointerPhase::Down, 0.0, 0.0), &mut crop, &mut NoCapture);
        let outcome = drag.handle(
            &PointerEvent::new(2, PointerPhase::Move, 50.0, 50.0),
            &mut crop,
            &mut NoCapture,
        );
        assert_eq!(outcome, DragOutcome::Ignored);
        assert!(drag.is_dragging());
        assert_eq!(crop.center(), CropCenter::MIDDLE);
    }

    #[test]
    fn test_zoom_change_mid_drag_keeps_center() {
        let mut crop = loaded_crop();
        let mut drag = DragController::new(100.0);

        drag.handle(&PointerEvent::down(0.0, 0.0), &mut crop, &mut NoCapture);
        drag.handle(&PointerEvent::moved(10.0, 0.0), &mut crop, &mut NoCapture);
        let before = crop.center();
        crop.set_zoom(2.8);
        assert_eq!(crop.center(), before);
    }

    #[test]
    fn test_invalid_preview_size_uses_default() {
        assert!((DragController::new(0.0).preview_size() - CROP_PREVIEW_SIZE).abs() < f32::EPSILON);
        assert!((DragController::new(f32::NAN).preview_size() - CROP_PREVIEW_SIZE).abs() < f32::EPSILON);
    }
}
