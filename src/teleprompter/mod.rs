//! Teleprompter playback engine.
//!
//! Two independently clocked animations over one text surface: a smooth
//! scroll and a word-by-word highlight, both paced by a single [`Rate`] and
//! started/stopped together by the [`PlaybackController`].

mod controller;
mod highlight;
mod scroll;
mod surface;
mod words;

pub use controller::{
    PlaybackConfig, PlaybackController, PlaybackTimer, DEFAULT_FONT_SIZE, MAX_FONT_SIZE,
    MIN_FONT_SIZE, PLACEHOLDER_TEXT,
};
pub use highlight::{word_delay, HighlightAnimator, HighlightStep};
pub use scroll::{ScrollAnimator, ScrollStep, ScrollTuning};
pub use surface::{SurfaceError, TextSurface};
pub use words::{WordIndex, WordSpan};

/// The user's speed setting: `0.0..=10.0` in half steps. Higher is faster
/// for both scrolling and highlighting.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Rate(f64);

impl Rate {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 10.0;
    pub const STEP: f64 = 0.5;

    /// Clamps into range and snaps to the nearest half step.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::default();
        }
        let clamped = value.clamp(Self::MIN, Self::MAX);
        Self((clamped / Self::STEP).round() * Self::STEP)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self(3.0)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_snaps_to_half_steps() {
        assert_eq!(Rate::new(3.3).value(), 3.5);
        assert_eq!(Rate::new(3.2).value(), 3.0);
        assert_eq!(Rate::new(7.5).value(), 7.5);
    }

    #[test]
    fn rate_is_clamped() {
        assert_eq!(Rate::new(-4.0).value(), 0.0);
        assert_eq!(Rate::new(42.0).value(), 10.0);
        assert_eq!(Rate::new(f64::NAN), Rate::default());
    }
}
