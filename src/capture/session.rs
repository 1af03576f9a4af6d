//! Interactive region selection over a frozen-screen overlay.
//!
//! The overlay itself (a full-screen, topmost, semi-transparent surface) is
//! provided by the host toolkit through the [`Overlay`] trait. This module
//! owns the gesture state machine that turns its pointer events into a
//! validated [`Rectangle`] or a cancellation.

use super::geometry::Rectangle;
use super::CaptureError;
use image::DynamicImage;

/// Instruction shown at the top of the overlay.
pub const OVERLAY_HINT: &str = "Click and drag to select region. Press ESC to cancel.";

/// Input reported by the overlay, in overlay-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayEvent {
    PointerDown { x: f64, y: f64 },
    PointerDrag { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
    Escape,
}

/// The host-provided selection surface.
pub trait Overlay {
    /// Shows the overlay over a snapshot of the current display.
    fn open(&mut self, snapshot: &DynamicImage) -> Result<(), CaptureError>;

    /// Blocks until the next input event. `None` means the overlay went away
    /// without a gesture (window closed by the system).
    fn next_event(&mut self) -> Option<OverlayEvent>;

    /// Redraws the selection outline.
    fn draw_selection(&mut self, rect: Rectangle);

    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState {
    Pending,
    Dragging { origin: (f64, f64) },
    Resolved(Rectangle),
    Cancelled,
}

/// One selection gesture. Terminal states ignore further input.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    state: SessionState,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Pending,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            SessionState::Resolved(_) | SessionState::Cancelled
        )
    }

    /// Feeds one event into the state machine.
    ///
    /// Returns the rectangle the overlay should draw, if the event moved the
    /// selection outline.
    pub fn handle(&mut self, event: OverlayEvent) -> Option<Rectangle> {
        match (self.state, event) {
            (SessionState::Resolved(_) | SessionState::Cancelled, _) => None,
            (_, OverlayEvent::Escape) => {
                self.state = SessionState::Cancelled;
                None
            }
            (SessionState::Pending, OverlayEvent::PointerDown { x, y }) => {
                self.state = SessionState::Dragging { origin: (x, y) };
                Some(Rectangle::from_corners(x, y, x, y))
            }
            (SessionState::Dragging { origin }, OverlayEvent::PointerDrag { x, y }) => {
                Some(Rectangle::from_corners(origin.0, origin.1, x, y))
            }
            (SessionState::Dragging { origin }, OverlayEvent::PointerUp { x, y }) => {
                let rect = Rectangle::from_corners(origin.0, origin.1, x, y);
                self.state = if rect.is_valid() {
                    SessionState::Resolved(rect)
                } else {
                    SessionState::Cancelled
                };
                None
            }
            // Drag/up without a press, or a second press mid-drag.
            _ => None,
        }
    }

    /// Ends the session as cancelled unless it already resolved.
    pub fn abandon(&mut self) {
        if !self.is_terminal() {
            self.state = SessionState::Cancelled;
        }
    }

    pub fn result(&self) -> Option<Rectangle> {
        match self.state {
            SessionState::Resolved(rect) => Some(rect),
            _ => None,
        }
    }
}

/// Runs one selection gesture to completion.
///
/// Blocks until the user resolves or cancels. The overlay is always torn
/// down before returning; a cancelled gesture yields `Ok(None)` and the
/// caller may simply try again.
pub fn select_region<O: Overlay + ?Sized>(
    overlay: &mut O,
    snapshot: &DynamicImage,
) -> Result<Option<Rectangle>, CaptureError> {
    if let Err(e) = overlay.open(snapshot) {
        overlay.close();
        return Err(e);
    }

    let mut session = CaptureSession::new();
    while !session.is_terminal() {
        match overlay.next_event() {
            Some(event) => {
                if let Some(rect) = session.handle(event) {
                    overlay.draw_selection(rect);
                }
            }
            None => session.abandon(),
        }
    }

    overlay.close();

    let selected = session.result();
    match selected {
        Some(rect) => log::info!(
            "[REGION] Selected {}x{} at ({}, {})",
            rect.width,
            rect.height,
            rect.left,
            rect.top
        ),
        None => log::info!("[REGION] Selection cancelled"),
    }

    Ok(selected)
}
