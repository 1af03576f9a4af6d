//! Word-by-word highlight cursor.

use super::surface::{SurfaceError, TextSurface};
use super::words::{WordIndex, WordSpan};
use super::Rate;
use std::time::Duration;

/// Per-word dwell time at rate 0.
const BASE_DELAY_MS: f64 = 600.0;
/// Dwell time shaved off per unit of rate.
const DELAY_PER_RATE_MS: f64 = 50.0;
/// Fastest allowed cadence.
const MIN_DELAY_MS: u64 = 80;

/// How long one word stays highlighted at `rate`.
pub fn word_delay(rate: Rate) -> Duration {
    let ms = (BASE_DELAY_MS - rate.value() * DELAY_PER_RATE_MS) as i64;
    Duration::from_millis(ms.max(MIN_DELAY_MS as i64) as u64)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HighlightStep {
    /// Highlighted `span`; the next word is due after `next_in`.
    Highlighted { span: WordSpan, next_in: Duration },
    /// Every word has been shown. Nothing more to schedule.
    Exhausted,
}

#[derive(Debug, Clone, Default)]
pub struct HighlightAnimator {
    cursor: usize,
    last: Option<WordSpan>,
}

impl HighlightAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next word to highlight.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Most recently highlighted word, if any since the last reset.
    pub fn last_highlighted(&self) -> Option<WordSpan> {
        self.last
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.last = None;
    }

    pub fn tick<S: TextSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        words: &WordIndex,
        rate: Rate,
    ) -> Result<HighlightStep, SurfaceError> {
        let Some(span) = words.get(self.cursor) else {
            return Ok(HighlightStep::Exhausted);
        };

        surface.clear_highlight()?;
        surface.highlight(span)?;

        self.cursor += 1;
        self.last = Some(span);

        Ok(HighlightStep::Highlighted {
            span,
            next_in: word_delay(rate),
        })
    }
}
