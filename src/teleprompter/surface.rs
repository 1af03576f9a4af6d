//! The scrollable, taggable text widget the teleprompter drives.
//!
//! The widget belongs to the host toolkit; the engine only needs these
//! commands. Any call may fail once the widget has been torn down.

use super::words::WordSpan;

pub trait TextSurface {
    /// Replaces the displayed text.
    fn set_text(&mut self, text: &str) -> Result<(), SurfaceError>;

    /// Fraction of the content scrolled past the top edge, in `[0, 1]`.
    ///
    /// `Ok(None)` while the widget has not been laid out yet.
    fn scroll_fraction(&self) -> Result<Option<f64>, SurfaceError>;

    fn set_scroll_fraction(&mut self, fraction: f64) -> Result<(), SurfaceError>;

    /// Removes the highlight decoration from the whole text.
    fn clear_highlight(&mut self) -> Result<(), SurfaceError>;

    /// Applies the highlight decoration to one word.
    fn highlight(&mut self, span: WordSpan) -> Result<(), SurfaceError>;

    fn set_font_size(&mut self, points: u32) -> Result<(), SurfaceError>;

    fn set_controls_visible(&mut self, visible: bool) -> Result<(), SurfaceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Text surface has been destroyed")]
    Destroyed,

    #[error("Text surface command failed: {0}")]
    Command(String),
}

impl<S: TextSurface + ?Sized> TextSurface for Box<S> {
    fn set_text(&mut self, text: &str) -> Result<(), SurfaceError> {
        (**self).set_text(text)
    }

    fn scroll_fraction(&self) -> Result<Option<f64>, SurfaceError> {
        (**self).scroll_fraction()
    }

    fn set_scroll_fraction(&mut self, fraction: f64) -> Result<(), SurfaceError> {
        (**self).set_scroll_fraction(fraction)
    }

    fn clear_highlight(&mut self) -> Result<(), SurfaceError> {
        (**self).clear_highlight()
    }

    fn highlight(&mut self, span: WordSpan) -> Result<(), SurfaceError> {
        (**self).highlight(span)
    }

    fn set_font_size(&mut self, points: u32) -> Result<(), SurfaceError> {
        (**self).set_font_size(points)
    }

    fn set_controls_visible(&mut self, visible: bool) -> Result<(), SurfaceError> {
        (**self).set_controls_visible(visible)
    }
}
