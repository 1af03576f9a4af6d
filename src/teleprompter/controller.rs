//! Playback controller: play/pause/reset over both animators.
//!
//! The controller owns the single "active" flag and at most one pending
//! timer per animator. Starting or stopping always affects both animators
//! together, so one can never keep running while the other is stopped.

use super::highlight::{HighlightAnimator, HighlightStep};
use super::scroll::{ScrollAnimator, ScrollStep, ScrollTuning};
use super::surface::{SurfaceError, TextSurface};
use super::words::{WordIndex, WordSpan};
use super::Rate;
use crate::timer::{Scheduler, TimerHandle};
use std::time::Duration;

/// Shown when the teleprompter opens before any answer exists.
pub const PLACEHOLDER_TEXT: &str =
    "No response available yet.\n\nAnalyze a screen to see the results here.";

pub const MIN_FONT_SIZE: u32 = 12;
pub const MAX_FONT_SIZE: u32 = 48;
pub const DEFAULT_FONT_SIZE: u32 = 24;

/// Timer events owned by the teleprompter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackTimer {
    Scroll,
    Highlight,
    AutoStart,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    pub scroll: ScrollTuning,
    /// Delay between opening the window and starting playback on its own.
    pub auto_start_after: Duration,
    pub font_size: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            scroll: ScrollTuning::default(),
            auto_start_after: Duration::from_secs(5),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

#[derive(Debug)]
pub struct PlaybackController<S> {
    surface: S,
    words: WordIndex,
    rate: Rate,
    active: bool,
    scroll: ScrollAnimator,
    highlight: HighlightAnimator,
    scroll_timer: Option<TimerHandle>,
    highlight_timer: Option<TimerHandle>,
    auto_start_timer: Option<TimerHandle>,
    font_size: u32,
    controls_visible: bool,
    auto_start_after: Duration,
}

impl<S: TextSurface> PlaybackController<S> {
    /// Loads `answer` into `surface` and indexes its words.
    ///
    /// An empty answer shows a placeholder and indexes nothing, so playback
    /// has nothing to step through.
    pub fn new(mut surface: S, answer: &str, config: PlaybackConfig) -> Result<Self, SurfaceError> {
        let answer = answer.trim();
        let words = if answer.is_empty() {
            surface.set_text(PLACEHOLDER_TEXT)?;
            WordIndex::default()
        } else {
            surface.set_text(answer)?;
            WordIndex::build(answer)
        };

        let font_size = config.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        surface.set_font_size(font_size)?;

        log::info!("[TELEPROMPTER] Loaded {} words", words.len());

        Ok(Self {
            surface,
            words,
            rate: Rate::default(),
            active: false,
            scroll: ScrollAnimator::new(config.scroll),
            highlight: HighlightAnimator::new(),
            scroll_timer: None,
            highlight_timer: None,
            auto_start_timer: None,
            font_size,
            controls_visible: true,
            auto_start_after: config.auto_start_after,
        })
    }

    /// Arms the one-shot auto-start. Call once when the window is shown.
    pub fn on_shown<T: Scheduler<PlaybackTimer>>(&mut self, timers: &mut T) {
        if let Some(old) = self.auto_start_timer.take() {
            timers.cancel(old);
        }
        self.auto_start_timer = Some(timers.schedule(self.auto_start_after, PlaybackTimer::AutoStart));
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn words(&self) -> &WordIndex {
        &self.words
    }

    pub fn current_word_index(&self) -> usize {
        self.highlight.cursor()
    }

    pub fn last_highlighted(&self) -> Option<WordSpan> {
        self.highlight.last_highlighted()
    }

    pub fn grace_ticks_elapsed(&self) -> u32 {
        self.scroll.grace_elapsed()
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn set_rate(&mut self, rate: Rate) {
        self.rate = rate;
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Pending timer handles, for invariant checks.
    pub fn pending_timers(&self) -> impl Iterator<Item = TimerHandle> + '_ {
        [self.scroll_timer, self.highlight_timer, self.auto_start_timer]
            .into_iter()
            .flatten()
    }

    pub fn toggle_playback<T: Scheduler<PlaybackTimer>>(&mut self, timers: &mut T) {
        if self.active {
            self.deactivate(timers);
        } else {
            self.activate(timers);
        }
    }

    /// Stops playback and rewinds to the first word at the top.
    pub fn reset<T: Scheduler<PlaybackTimer>>(&mut self, timers: &mut T) {
        if self.active {
            self.deactivate(timers);
        }

        self.highlight.reset();
        self.scroll.reset();

        let rewound = self
            .surface
            .clear_highlight()
            .and_then(|_| self.surface.set_scroll_fraction(0.0));
        if let Err(e) = rewound {
            log::warn!("[TELEPROMPTER] Reset could not update surface: {}", e);
        }
    }

    /// Replaces the displayed text. Any previous highlight progress is lost.
    pub fn replace_text<T: Scheduler<PlaybackTimer>>(
        &mut self,
        answer: &str,
        timers: &mut T,
    ) -> Result<(), SurfaceError> {
        if self.active {
            self.deactivate(timers);
        }

        let answer = answer.trim();
        self.words = WordIndex::build(answer);
        self.highlight.reset();
        self.scroll.reset();

        self.surface.set_text(if answer.is_empty() { PLACEHOLDER_TEXT } else { answer })?;
        self.surface.set_scroll_fraction(0.0)
    }

    pub fn adjust_font_size(&mut self, delta: i32) {
        let size = (self.font_size as i64 + delta as i64)
            .clamp(MIN_FONT_SIZE as i64, MAX_FONT_SIZE as i64) as u32;
        if size == self.font_size {
            return;
        }
        match self.surface.set_font_size(size) {
            Ok(()) => self.font_size = size,
            Err(e) => log::warn!("[TELEPROMPTER] Font change failed: {}", e),
        }
    }

    pub fn set_controls_visible(&mut self, visible: bool) {
        match self.surface.set_controls_visible(visible) {
            Ok(()) => self.controls_visible = visible,
            Err(e) => log::warn!("[TELEPROMPTER] Controls toggle failed: {}", e),
        }
    }

    /// Routes a fired timer back into the animator that scheduled it.
    pub fn on_timer<T: Scheduler<PlaybackTimer>>(&mut self, timer: PlaybackTimer, timers: &mut T) {
        match timer {
            PlaybackTimer::Scroll => {
                self.scroll_timer = None;
                self.scroll_tick(timers);
            }
            PlaybackTimer::Highlight => {
                self.highlight_timer = None;
                self.highlight_tick(timers);
            }
            PlaybackTimer::AutoStart => {
                self.auto_start_timer = None;
                if !self.active && !self.words.is_empty() {
                    log::info!("[TELEPROMPTER] Auto-starting playback");
                    self.activate(timers);
                }
            }
        }
    }

    /// Cancels everything still pending. The controller is dropped after.
    pub fn close<T: Scheduler<PlaybackTimer>>(mut self, timers: &mut T) {
        self.active = false;
        for handle in self.pending_timers().collect::<Vec<_>>() {
            timers.cancel(handle);
        }
        log::info!("[TELEPROMPTER] Closed");
    }

    fn activate<T: Scheduler<PlaybackTimer>>(&mut self, timers: &mut T) {
        self.active = true;
        self.scroll.reset();
        log::info!("[TELEPROMPTER] Playback started at rate {}", self.rate.value());

        self.scroll_tick(timers);
        self.highlight_tick(timers);
    }

    fn deactivate<T: Scheduler<PlaybackTimer>>(&mut self, timers: &mut T) {
        self.active = false;
        if let Some(handle) = self.scroll_timer.take() {
            timers.cancel(handle);
        }
        if let Some(handle) = self.highlight_timer.take() {
            timers.cancel(handle);
        }
        log::info!("[TELEPROMPTER] Playback paused");
    }

    fn scroll_tick<T: Scheduler<PlaybackTimer>>(&mut self, timers: &mut T) {
        if !self.active {
            return;
        }

        match self.scroll.tick(&mut self.surface, self.rate) {
            Ok(ScrollStep::Unsettled { retry_in: next_in })
            | Ok(ScrollStep::Holding { next_in })
            | Ok(ScrollStep::Advanced { next_in, .. }) => {
                self.arm(PlaybackTimer::Scroll, next_in, timers);
            }
            Ok(ScrollStep::ReachedEnd) => {
                log::info!("[TELEPROMPTER] Reached end of text");
                self.deactivate(timers);
            }
            Err(e) => {
                log::warn!("[TELEPROMPTER] Scroll stopped: {}", e);
                self.deactivate(timers);
            }
        }
    }

    fn highlight_tick<T: Scheduler<PlaybackTimer>>(&mut self, timers: &mut T) {
        if !self.active {
            return;
        }

        match self.highlight.tick(&mut self.surface, &self.words, self.rate) {
            Ok(HighlightStep::Highlighted { next_in, .. }) => {
                self.arm(PlaybackTimer::Highlight, next_in, timers);
            }
            Ok(HighlightStep::Exhausted) => {}
            // Only the highlight chain ends; scrolling carries on.
            Err(e) => log::warn!("[TELEPROMPTER] Highlight stopped: {}", e),
        }
    }

    fn arm<T: Scheduler<PlaybackTimer>>(&mut self, timer: PlaybackTimer, delay: Duration, timers: &mut T) {
        let slot = match timer {
            PlaybackTimer::Scroll => &mut self.scroll_timer,
            PlaybackTimer::Highlight => &mut self.highlight_timer,
            PlaybackTimer::AutoStart => &mut self.auto_start_timer,
        };
        debug_assert!(slot.is_none(), "{timer:?} already has a pending tick");
        if let Some(stale) = slot.take() {
            timers.cancel(stale);
        }
        *slot = Some(timers.schedule(delay, timer));
    }
}
