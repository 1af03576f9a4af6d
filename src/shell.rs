//! UI-thread event loop.
//!
//! The shell owns the application session, the timer queue and the open
//! teleprompter, and is the only place state changes. Analyses run on tokio
//! worker tasks and post their results back over a channel; the loop
//! applies them between timer firings, so no locking is needed.

use crate::analysis::Analyzer;
use crate::app::{AnalysisOutcome, App, AppError};
use crate::capture::ScreenCapturer;
use crate::monitor::{AnalysisJob, MonitorTick};
use crate::teleprompter::{PlaybackConfig, PlaybackController, PlaybackTimer, Rate, SurfaceError, TextSurface};
use crate::timer::TimerQueue;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Every timer event the shell routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppTimer {
    Playback(PlaybackTimer),
    Monitor(MonitorTick),
}

impl From<PlaybackTimer> for AppTimer {
    fn from(timer: PlaybackTimer) -> Self {
        AppTimer::Playback(timer)
    }
}

impl From<MonitorTick> for AppTimer {
    fn from(tick: MonitorTick) -> Self {
        AppTimer::Monitor(tick)
    }
}

/// Longest the loop sleeps when no timer is pending.
const IDLE_WAIT: Duration = Duration::from_secs(3600);

enum LoopEvent {
    Stop,
    Result(Option<AnalysisOutcome>),
    Timer,
}

/// The teleprompter as the shell holds it; the widget type is up to the host.
pub type Teleprompter = PlaybackController<Box<dyn TextSurface>>;

pub struct Shell<C, A> {
    app: App<C, A>,
    timers: TimerQueue<AppTimer>,
    teleprompter: Option<Teleprompter>,
    results_tx: mpsc::UnboundedSender<AnalysisOutcome>,
    results_rx: mpsc::UnboundedReceiver<AnalysisOutcome>,
    started: Instant,
}

impl<C, A> Shell<C, A>
where
    C: ScreenCapturer,
    A: Analyzer,
{
    pub fn new(app: App<C, A>) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            app,
            timers: TimerQueue::new(),
            teleprompter: None,
            results_tx,
            results_rx,
            started: Instant::now(),
        }
    }

    pub fn app(&self) -> &App<C, A> {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App<C, A> {
        &mut self.app
    }

    pub fn timers(&self) -> &TimerQueue<AppTimer> {
        &self.timers
    }

    pub fn teleprompter(&self) -> Option<&Teleprompter> {
        self.teleprompter.as_ref()
    }

    /// Opens the teleprompter on the current answer. An already open one is
    /// left as it is, playback included.
    pub fn open_teleprompter<S: TextSurface + 'static>(
        &mut self,
        surface: S,
        config: PlaybackConfig,
    ) -> Result<(), SurfaceError> {
        if self.teleprompter.is_some() {
            log::debug!("[TELEPROMPTER] Already open; keeping current playback");
            return Ok(());
        }
        let surface: Box<dyn TextSurface> = Box::new(surface);
        let mut controller = PlaybackController::new(surface, self.app.answer(), config)?;
        controller.on_shown(&mut self.timers);
        self.teleprompter = Some(controller);
        Ok(())
    }

    /// Closes the teleprompter. Its progress is discarded.
    pub fn close_teleprompter(&mut self) {
        if let Some(controller) = self.teleprompter.take() {
            controller.close(&mut self.timers);
        }
    }

    /// Loads the latest answer into the open teleprompter.
    pub fn refresh_teleprompter(&mut self) -> Result<(), SurfaceError> {
        match self.teleprompter.as_mut() {
            Some(controller) => controller.replace_text(self.app.answer(), &mut self.timers),
            None => Ok(()),
        }
    }

    pub fn toggle_playback(&mut self) {
        if let Some(controller) = self.teleprompter.as_mut() {
            controller.toggle_playback(&mut self.timers);
        }
    }

    pub fn reset_playback(&mut self) {
        if let Some(controller) = self.teleprompter.as_mut() {
            controller.reset(&mut self.timers);
        }
    }

    pub fn set_rate(&mut self, rate: Rate) {
        if let Some(controller) = self.teleprompter.as_mut() {
            controller.set_rate(rate);
        }
    }

    pub fn adjust_font_size(&mut self, delta: i32) {
        if let Some(controller) = self.teleprompter.as_mut() {
            controller.adjust_font_size(delta);
        }
    }

    pub fn set_controls_visible(&mut self, visible: bool) {
        if let Some(controller) = self.teleprompter.as_mut() {
            controller.set_controls_visible(visible);
        }
    }

    /// Validates and dispatches a manual analysis.
    pub fn analyze(&mut self) -> Result<(), AppError> {
        let job = self.app.analyze()?;
        self.dispatch(job);
        Ok(())
    }

    pub fn start_monitoring(&mut self) -> Result<(), AppError> {
        if let Some(job) = self.app.start_monitoring(&mut self.timers)? {
            self.dispatch(job);
        }
        Ok(())
    }

    pub fn stop_monitoring(&mut self) {
        self.app.stop_monitoring(&mut self.timers);
    }

    /// Fires every timer due at or before `now_ms`. Returns how many fired.
    pub fn fire_due(&mut self, now_ms: u64) -> usize {
        let mut fired = 0;
        while let Some((_, timer)) = self.timers.pop_due(now_ms) {
            fired += 1;
            match timer {
                AppTimer::Playback(timer) => {
                    if let Some(controller) = self.teleprompter.as_mut() {
                        controller.on_timer(timer, &mut self.timers);
                    }
                }
                AppTimer::Monitor(MonitorTick) => {
                    if let Some(job) = self.app.on_monitor_tick(&mut self.timers) {
                        self.dispatch(job);
                    }
                }
            }
        }
        fired
    }

    /// Applies a worker result and returns the text now shown.
    pub fn deliver(&mut self, outcome: AnalysisOutcome) -> &str {
        self.app.complete_analysis(outcome)
    }

    /// Waits for the next worker result.
    pub async fn next_result(&mut self) -> Option<AnalysisOutcome> {
        self.results_rx.recv().await
    }

    /// Runs the loop until `stop` resolves, calling `on_answer` with the
    /// answer text each time a result is applied.
    pub async fn run_until<F, H>(&mut self, stop: F, mut on_answer: H)
    where
        F: Future<Output = ()>,
        H: FnMut(&str),
    {
        tokio::pin!(stop);
        log::info!("[SHELL] Event loop running");

        loop {
            let now = self.elapsed_ms();
            self.fire_due(now);

            let wait = self
                .timers
                .next_deadline()
                .map(|deadline| Duration::from_millis(deadline.saturating_sub(now)))
                .unwrap_or(IDLE_WAIT);

            let event = tokio::select! {
                _ = &mut stop => LoopEvent::Stop,
                outcome = self.results_rx.recv() => LoopEvent::Result(outcome),
                _ = tokio::time::sleep(wait) => LoopEvent::Timer,
            };

            match event {
                LoopEvent::Stop => break,
                LoopEvent::Result(Some(outcome)) => on_answer(self.deliver(outcome)),
                LoopEvent::Result(None) | LoopEvent::Timer => {}
            }
        }

        self.stop_monitoring();
        self.close_teleprompter();
        log::info!("[SHELL] Event loop stopped");
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn dispatch(&self, job: AnalysisJob) {
        let Some(analyzer) = self.app.analyzer() else {
            log::warn!("[SHELL] Dropped analysis job: analyzer not initialized");
            return;
        };
        let tx = self.results_tx.clone();

        log::info!("[ANALYZE] Dispatching {:?} analysis", job.origin);
        tokio::spawn(async move {
            let result = analyzer.analyze(&job.image_base64, &job.question).await;
            // The loop may have shut down; the result is simply dropped then.
            let _ = tx.send(AnalysisOutcome {
                origin: job.origin,
                result,
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisError;
    use crate::capture::{CaptureError, Overlay, OverlayEvent, Rectangle, WindowInfo};
    use crate::monitor::{CaptureMode, JobOrigin, MonitoringLoop};
    use crate::teleprompter::testing::FakeSurface;
    use image::{DynamicImage, RgbaImage};
    use std::path::Path;

    struct BlankScreen;

    impl ScreenCapturer for BlankScreen {
        fn capture_rectangle(&self, rect: Rectangle) -> Result<DynamicImage, CaptureError> {
            Ok(DynamicImage::ImageRgba8(RgbaImage::new(
                rect.width as u32,
                rect.height as u32,
            )))
        }

        fn capture_whole_screen(&self, _monitor_index: usize) -> Result<DynamicImage, CaptureError> {
            Ok(DynamicImage::ImageRgba8(RgbaImage::new(40, 30)))
        }

        fn capture_window(&self, handle: u32) -> Result<DynamicImage, CaptureError> {
            Err(CaptureError::NoSuchWindow(handle))
        }

        fn list_windows(&self) -> Result<Vec<WindowInfo>, CaptureError> {
            Ok(Vec::new())
        }

        fn supports_windows(&self) -> bool {
            false
        }
    }

    /// Full-screen captures never open the overlay.
    struct NoOverlay;

    impl Overlay for NoOverlay {
        fn open(&mut self, _snapshot: &DynamicImage) -> Result<(), CaptureError> {
            Ok(())
        }
        fn next_event(&mut self) -> Option<OverlayEvent> {
            None
        }
        fn draw_selection(&mut self, _rect: Rectangle) {}
        fn close(&mut self) {}
    }

    struct Echo;

    impl Analyzer for Echo {
        fn connect(_api_key: &str) -> Result<Self, AnalysisError> {
            Ok(Echo)
        }

        fn describe(&self) -> String {
            "Echo".to_string()
        }

        async fn analyze(&self, _image_base64: &str, question: &str) -> Result<String, AnalysisError> {
            Ok(format!("answer to {question}"))
        }
    }

    fn shell(dir: &Path) -> Shell<BlankScreen, Echo> {
        let app = App::new(BlankScreen, dir.join("config.json"))
            .with_monitor(MonitoringLoop::new(Duration::from_secs(60)));
        Shell::new(app)
    }

    fn outcome(text: &str) -> AnalysisOutcome {
        AnalysisOutcome {
            origin: JobOrigin::Manual,
            result: Ok(text.to_string()),
        }
    }

    #[test]
    fn teleprompter_auto_starts_through_the_shared_queue() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(dir.path());
        shell.deliver(outcome("one two three"));

        shell
            .open_teleprompter(FakeSurface::new(), PlaybackConfig::default())
            .unwrap();
        assert_eq!(shell.timers().pending_count(), 1);

        shell.fire_due(4_999);
        assert!(!shell.teleprompter().unwrap().is_active());

        shell.fire_due(5_000);
        let prompter = shell.teleprompter().unwrap();
        assert!(prompter.is_active());
        assert_eq!(prompter.current_word_index(), 1);
    }

    #[test]
    fn closing_the_teleprompter_cancels_its_timers() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(dir.path());
        shell.deliver(outcome("alpha beta"));
        shell
            .open_teleprompter(FakeSurface::new(), PlaybackConfig::default())
            .unwrap();
        shell.toggle_playback();
        assert!(shell.timers().pending_count() >= 2);

        shell.close_teleprompter();
        assert!(shell.teleprompter().is_none());
        assert_eq!(shell.timers().pending_count(), 0);
    }

    #[test]
    fn opening_twice_keeps_the_running_teleprompter() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(dir.path());
        shell.deliver(outcome("one two three four"));
        shell
            .open_teleprompter(FakeSurface::new(), PlaybackConfig::default())
            .unwrap();
        shell.toggle_playback();
        shell.fire_due(1_000);
        let position = shell.teleprompter().unwrap().current_word_index();
        let pending: Vec<_> = shell.teleprompter().unwrap().pending_timers().collect();

        shell
            .open_teleprompter(FakeSurface::new(), PlaybackConfig::default())
            .unwrap();
        let controller = shell.teleprompter().unwrap();
        assert!(controller.is_active());
        assert_eq!(controller.current_word_index(), position);
        assert_eq!(controller.pending_timers().collect::<Vec<_>>(), pending);
    }

    #[test]
    fn refresh_loads_the_latest_answer() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(dir.path());
        shell
            .open_teleprompter(FakeSurface::new(), PlaybackConfig::default())
            .unwrap();
        assert!(shell.teleprompter().unwrap().words().is_empty());

        shell.deliver(outcome("fresh words here"));
        shell.refresh_teleprompter().unwrap();
        assert_eq!(shell.teleprompter().unwrap().words().len(), 3);
    }

    #[test]
    fn playback_commands_without_a_teleprompter_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(dir.path());
        shell.toggle_playback();
        shell.reset_playback();
        shell.adjust_font_size(4);
        assert!(shell.refresh_teleprompter().is_ok());
        assert_eq!(shell.timers().pending_count(), 0);
    }

    #[tokio::test]
    async fn manual_analysis_comes_back_over_the_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(dir.path());
        shell.app_mut().initialize("key", false).unwrap();
        shell.app_mut().capture(&mut NoOverlay).unwrap();
        shell.app_mut().set_question("what?");

        shell.analyze().unwrap();
        let outcome = shell.next_result().await.unwrap();
        assert_eq!(outcome.origin, JobOrigin::Manual);
        assert_eq!(shell.deliver(outcome), "answer to what?");
    }

    #[tokio::test]
    async fn monitoring_cycles_dispatch_on_the_tick() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(dir.path());
        shell.app_mut().initialize("key", false).unwrap();
        shell.app_mut().set_mode(CaptureMode::FullScreen);
        shell.app_mut().set_question("status?");

        shell.start_monitoring().unwrap();
        let first = shell.next_result().await.unwrap();
        assert_eq!(first.origin, JobOrigin::Monitor);

        assert_eq!(shell.fire_due(59_999), 0);
        assert_eq!(shell.fire_due(60_000), 1);
        let second = shell.next_result().await.unwrap();
        assert_eq!(second.result.unwrap(), "answer to status?");

        shell.stop_monitoring();
        assert_eq!(shell.timers().pending_count(), 0);
    }

    #[tokio::test]
    async fn run_until_stops_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(dir.path());
        shell.app_mut().initialize("key", false).unwrap();
        shell.app_mut().set_question("status?");
        shell.start_monitoring().unwrap();

        let mut answers = Vec::new();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        stop_tx.send(()).unwrap();
        shell
            .run_until(
                async {
                    let _ = stop_rx.await;
                },
                |answer| answers.push(answer.to_string()),
            )
            .await;

        assert!(!shell.app().monitor().is_running());
        assert_eq!(shell.timers().pending_count(), 0);
    }
}
