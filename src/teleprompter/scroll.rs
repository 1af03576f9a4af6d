//! Continuous smooth scroll.
//!
//! Each tick reads where the text currently sits and decides what happens
//! next: wait for layout, stop at the end, hold during the grace period, or
//! nudge the view down by a rate-derived increment.

use super::surface::{SurfaceError, TextSurface};
use super::Rate;
use std::time::Duration;

/// Scroll timing knobs. The defaults reproduce the shipped feel; none of
/// them has a derivation beyond "looked right".
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollTuning {
    /// Scroll fraction at which playback stops by itself.
    pub near_end: f64,
    /// Ticks to hold still after activation before moving.
    pub grace_ticks: u32,
    /// Tick period while holding, and while the widget is not laid out.
    pub grace_interval: Duration,
    /// Tick period once scrolling.
    pub scroll_interval: Duration,
    /// Increment per tick at rate 0.
    pub base_increment: f64,
    /// Extra increment per tick per unit of rate.
    pub rate_increment: f64,
}

impl Default for ScrollTuning {
    fn default() -> Self {
        Self {
            near_end: 0.95,
            grace_ticks: 60,
            grace_interval: Duration::from_millis(50),
            scroll_interval: Duration::from_millis(100),
            base_increment: 0.00009,
            rate_increment: 0.0001,
        }
    }
}

impl ScrollTuning {
    pub fn increment(&self, rate: Rate) -> f64 {
        self.base_increment + rate.value() * self.rate_increment
    }
}

/// What one scroll tick decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollStep {
    /// Position unreadable or out of range; try again later.
    Unsettled { retry_in: Duration },
    /// Still inside the grace period.
    Holding { next_in: Duration },
    /// Moved to `fraction`.
    Advanced { fraction: f64, next_in: Duration },
    /// Reached the end; playback should stop.
    ReachedEnd,
}

#[derive(Debug, Clone, Default)]
pub struct ScrollAnimator {
    tuning: ScrollTuning,
    grace_elapsed: u32,
}

impl ScrollAnimator {
    pub fn new(tuning: ScrollTuning) -> Self {
        Self {
            tuning,
            grace_elapsed: 0,
        }
    }

    pub fn tuning(&self) -> &ScrollTuning {
        &self.tuning
    }

    /// Ticks spent in the current grace period.
    pub fn grace_elapsed(&self) -> u32 {
        self.grace_elapsed
    }

    /// Restarts the grace period.
    pub fn reset(&mut self) {
        self.grace_elapsed = 0;
    }

    pub fn tick<S: TextSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        rate: Rate,
    ) -> Result<ScrollStep, SurfaceError> {
        let fraction = match surface.scroll_fraction()? {
            Some(f) if (0.0..=1.0).contains(&f) => f,
            _ => {
                return Ok(ScrollStep::Unsettled {
                    retry_in: self.tuning.grace_interval,
                })
            }
        };

        if fraction >= self.tuning.near_end {
            return Ok(ScrollStep::ReachedEnd);
        }

        if self.grace_elapsed < self.tuning.grace_ticks {
            self.grace_elapsed += 1;
            return Ok(ScrollStep::Holding {
                next_in: self.tuning.grace_interval,
            });
        }

        let target = fraction + self.tuning.increment(rate);
        surface.set_scroll_fraction(target)?;
        Ok(ScrollStep::Advanced {
            fraction: target,
            next_in: self.tuning.scroll_interval,
        })
    }
}
