//! Unattended capture-and-ask on a fixed period.
//!
//! Cycles are chained: each cycle schedules the next one after it has
//! dispatched its analysis, so a slow answer delays rather than overlaps
//! the following capture. Analyses already dispatched are never aborted.

use crate::capture::{CaptureError, CapturedImage};
use crate::timer::{Scheduler, TimerHandle};
use std::time::Duration;

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Where captures come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    FullScreen,
    Window,
    /// A fresh drag gesture per capture.
    Region,
    /// The previously selected fixed region.
    Fixed,
}

impl CaptureMode {
    /// Whether a capture can happen without a human present.
    pub fn is_unattended(self) -> bool {
        !matches!(self, CaptureMode::Region)
    }
}

/// Timer event for the next monitoring cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorTick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
}

/// What a cycle needs from the application.
pub trait CycleSource {
    /// Captures per the current mode. `Ok(None)` when nothing can be
    /// captured right now (for example no window selected).
    fn capture_for_cycle(&mut self) -> Result<Option<CapturedImage>, CaptureError>;

    /// The question to ask, if one has been entered.
    fn question(&self) -> Option<String>;
}

/// Work handed to a background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisJob {
    pub image_base64: String,
    pub question: String,
    pub origin: JobOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOrigin {
    Manual,
    Monitor,
}

/// Result of one monitoring cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Not running; nothing happened and nothing was scheduled.
    Stopped,
    /// No image or no question this time.
    Skipped,
    Dispatched(AnalysisJob),
    CaptureFailed(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Please initialize the analyzer first.")]
    AnalyzerNotReady,

    #[error("Continuous monitoring is not available with 'Select Region' mode. Use 'Fixed Region' instead.")]
    NeedsUnattendedMode,
}

#[derive(Debug)]
pub struct MonitoringLoop {
    state: MonitorState,
    period: Duration,
    timer: Option<TimerHandle>,
    last_payload: Option<String>,
    last_question: Option<String>,
}

impl Default for MonitoringLoop {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD)
    }
}

impl MonitoringLoop {
    pub fn new(period: Duration) -> Self {
        Self {
            state: MonitorState::Idle,
            period,
            timer: None,
            last_payload: None,
            last_question: None,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Running
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn pending_timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn last_payload(&self) -> Option<&str> {
        self.last_payload.as_deref()
    }

    pub fn last_question(&self) -> Option<&str> {
        self.last_question.as_deref()
    }

    /// Enters `Running` and performs the first cycle right away.
    ///
    /// Rejected requests leave the loop idle and schedule nothing.
    pub fn start<C, T>(
        &mut self,
        mode: CaptureMode,
        analyzer_ready: bool,
        source: &mut C,
        timers: &mut T,
    ) -> Result<CycleOutcome, MonitorError>
    where
        C: CycleSource + ?Sized,
        T: Scheduler<MonitorTick>,
    {
        if !analyzer_ready {
            return Err(MonitorError::AnalyzerNotReady);
        }
        if !mode.is_unattended() {
            log::warn!("[MONITOR] Refused to start in ad-hoc region mode");
            return Err(MonitorError::NeedsUnattendedMode);
        }
        if self.is_running() {
            return Ok(CycleOutcome::Skipped);
        }

        self.state = MonitorState::Running;
        log::info!(
            "[MONITOR] Started ({:?}, every {}s)",
            mode,
            self.period.as_secs()
        );
        Ok(self.run_cycle(source, timers))
    }

    pub fn stop<T: Scheduler<MonitorTick>>(&mut self, timers: &mut T) {
        if let Some(handle) = self.timer.take() {
            timers.cancel(handle);
        }
        if self.is_running() {
            log::info!("[MONITOR] Stopped");
        }
        self.state = MonitorState::Idle;
    }

    /// Handles a fired [`MonitorTick`].
    pub fn on_tick<C, T>(&mut self, source: &mut C, timers: &mut T) -> CycleOutcome
    where
        C: CycleSource + ?Sized,
        T: Scheduler<MonitorTick>,
    {
        self.timer = None;
        self.run_cycle(source, timers)
    }

    fn run_cycle<C, T>(&mut self, source: &mut C, timers: &mut T) -> CycleOutcome
    where
        C: CycleSource + ?Sized,
        T: Scheduler<MonitorTick>,
    {
        if !self.is_running() {
            return CycleOutcome::Stopped;
        }

        let outcome = match source.capture_for_cycle() {
            Ok(Some(captured)) => {
                self.last_payload = Some(captured.base64_png.clone());
                match source.question() {
                    Some(question) => {
                        self.last_question = Some(question.clone());
                        CycleOutcome::Dispatched(AnalysisJob {
                            image_base64: captured.base64_png,
                            question,
                            origin: JobOrigin::Monitor,
                        })
                    }
                    None => CycleOutcome::Skipped,
                }
            }
            Ok(None) => CycleOutcome::Skipped,
            Err(e) => {
                log::warn!("[MONITOR] Capture failed: {}", e);
                CycleOutcome::CaptureFailed(e.to_string())
            }
        };

        if let Some(stale) = self.timer.take() {
            timers.cancel(stale);
        }
        self.timer = Some(timers.schedule(self.period, MonitorTick));

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerQueue;
    use image::{DynamicImage, RgbaImage};

    struct FakeSource {
        captures: usize,
        image: bool,
        question: Option<String>,
        fail: bool,
    }

    impl FakeSource {
        fn ready() -> Self {
            Self {
                captures: 0,
                image: true,
                question: Some("What changed?".to_string()),
                fail: false,
            }
        }
    }

    impl CycleSource for FakeSource {
        fn capture_for_cycle(&mut self) -> Result<Option<CapturedImage>, CaptureError> {
            self.captures += 1;
            if self.fail {
                return Err(CaptureError::CaptureFailed("display asleep".to_string()));
            }
            if !self.image {
                return Ok(None);
            }
            Ok(Some(CapturedImage {
                image: DynamicImage::ImageRgba8(RgbaImage::new(2, 2)),
                base64_png: format!("payload-{}", self.captures),
            }))
        }

        fn question(&self) -> Option<String> {
            self.question.clone()
        }
    }

    type Queue = TimerQueue<MonitorTick>;

    fn drive(monitor: &mut MonitoringLoop, source: &mut FakeSource, queue: &mut Queue, until: u64) -> Vec<(u64, CycleOutcome)> {
        let mut seen = Vec::new();
        while let Some((_, MonitorTick)) = queue.pop_due(until) {
            let at = queue.now_ms();
            seen.push((at, monitor.on_tick(source, queue)));
        }
        seen
    }

    #[test]
    fn ad_hoc_region_mode_is_rejected() {
        let mut monitor = MonitoringLoop::default();
        let mut source = FakeSource::ready();
        let mut queue = Queue::new();

        let result = monitor.start(CaptureMode::Region, true, &mut source, &mut queue);
        assert_eq!(result, Err(MonitorError::NeedsUnattendedMode));
        assert_eq!(monitor.state(), MonitorState::Idle);
        assert_eq!(queue.pending_count(), 0);
        assert_eq!(source.captures, 0);
    }

    #[test]
    fn requires_analyzer() {
        let mut monitor = MonitoringLoop::default();
        let mut queue = Queue::new();
        let result = monitor.start(CaptureMode::FullScreen, false, &mut FakeSource::ready(), &mut queue);
        assert_eq!(result, Err(MonitorError::AnalyzerNotReady));
        assert!(!monitor.is_running());
    }

    #[test]
    fn first_cycle_runs_immediately_then_every_period() {
        let mut monitor = MonitoringLoop::default();
        let mut source = FakeSource::ready();
        let mut queue = Queue::new();

        let first = monitor.start(CaptureMode::Fixed, true, &mut source, &mut queue).unwrap();
        assert!(matches!(first, CycleOutcome::Dispatched(ref job) if job.origin == JobOrigin::Monitor));
        assert_eq!(queue.next_deadline(), Some(60_000));

        let cycles = drive(&mut monitor, &mut source, &mut queue, 180_000);
        let times: Vec<u64> = cycles.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![60_000, 120_000, 180_000]);
        assert_eq!(monitor.last_payload(), Some("payload-4"));
        assert_eq!(monitor.last_question(), Some("What changed?"));
    }

    #[test]
    fn slow_analysis_does_not_shift_the_schedule() {
        // The next cycle is scheduled when the previous one dispatched, not
        // when its answer arrives, so a 5s analysis still sees 60s spacing.
        let mut monitor = MonitoringLoop::default();
        let mut source = FakeSource::ready();
        let mut queue = Queue::new();
        monitor.start(CaptureMode::FullScreen, true, &mut source, &mut queue).unwrap();

        // Answer arrives at 5s; nothing to do for the loop.
        assert!(drive(&mut monitor, &mut source, &mut queue, 5_000).is_empty());
        let cycles = drive(&mut monitor, &mut source, &mut queue, 65_000);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].0, 60_000);
    }

    #[test]
    fn stop_cancels_next_cycle() {
        let mut monitor = MonitoringLoop::default();
        let mut source = FakeSource::ready();
        let mut queue = Queue::new();
        monitor.start(CaptureMode::FullScreen, true, &mut source, &mut queue).unwrap();

        monitor.stop(&mut queue);
        assert_eq!(monitor.state(), MonitorState::Idle);
        assert_eq!(queue.pending_count(), 0);

        // A tick delivered late anyway is ignored.
        assert_eq!(monitor.on_tick(&mut source, &mut queue), CycleOutcome::Stopped);
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn missing_image_skips_but_keeps_running() {
        let mut monitor = MonitoringLoop::default();
        let mut source = FakeSource::ready();
        source.image = false;
        let mut queue = Queue::new();

        let first = monitor.start(CaptureMode::Window, true, &mut source, &mut queue).unwrap();
        assert_eq!(first, CycleOutcome::Skipped);
        assert!(monitor.is_running());
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn missing_question_captures_without_dispatch() {
        let mut monitor = MonitoringLoop::default();
        let mut source = FakeSource::ready();
        source.question = None;
        let mut queue = Queue::new();

        let first = monitor.start(CaptureMode::FullScreen, true, &mut source, &mut queue).unwrap();
        assert_eq!(first, CycleOutcome::Skipped);
        assert_eq!(monitor.last_payload(), Some("payload-1"));
    }

    #[test]
    fn capture_failure_is_reported_and_loop_continues() {
        let mut monitor = MonitoringLoop::default();
        let mut source = FakeSource::ready();
        source.fail = true;
        let mut queue = Queue::new();

        let first = monitor.start(CaptureMode::FullScreen, true, &mut source, &mut queue).unwrap();
        assert_eq!(
            first,
            CycleOutcome::CaptureFailed("Screen capture failed: display asleep".to_string())
        );

        source.fail = false;
        let cycles = drive(&mut monitor, &mut source, &mut queue, 60_000);
        assert!(matches!(cycles[0].1, CycleOutcome::Dispatched(_)));
    }

    #[test]
    fn starting_twice_keeps_one_pending_cycle() {
        let mut monitor = MonitoringLoop::default();
        let mut source = FakeSource::ready();
        let mut queue = Queue::new();
        monitor.start(CaptureMode::FullScreen, true, &mut source, &mut queue).unwrap();
        monitor.start(CaptureMode::FullScreen, true, &mut source, &mut queue).unwrap();
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(source.captures, 1);
    }
}
