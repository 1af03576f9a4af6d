//! The application session: everything the main window holds between
//! user actions.
//!
//! One explicit object instead of ambient globals. It owns the capturer,
//! the analyzer once initialized, the current capture and answer, and the
//! monitoring loop. All methods run on the UI thread; the only work that
//! leaves it is an [`AnalysisJob`], whose result comes back through
//! [`App::complete_analysis`].

use crate::analysis::{AnalysisError, Analyzer};
use crate::capture::{
    self, CaptureError, CapturedImage, CropError, Overlay, Rectangle, ScreenCapturer, WindowInfo,
    PRIMARY_MONITOR,
};
use crate::config::{self, AppConfig};
use crate::monitor::{
    AnalysisJob, CaptureMode, CycleOutcome, CycleSource, JobOrigin, MonitorError, MonitorTick,
    MonitoringLoop,
};
use crate::timer::Scheduler;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ANALYZING_TEXT: &str = "Analyzing... Please wait...";

/// Errors reported straight back to the user. None of them change state.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Please initialize the analyzer first.")]
    NotInitialized,

    #[error("Please capture a screen first.")]
    NoCapture,

    #[error("Please enter a question.")]
    NoQuestion,

    #[error("Please set a fixed region first using 'Set Fixed Region'.")]
    NoFixedRegion,

    #[error("Please select a window to capture.")]
    NoWindowSelected,

    #[error("Window capture is only supported on Windows and macOS.")]
    WindowCaptureUnsupported,

    #[error("Region selection cancelled.")]
    SelectionCancelled,

    #[error("Region {}x{} is too small to capture.", .0.width, .0.height)]
    RegionTooSmall(Rectangle),

    #[error("Analysis is paused while monitoring is active.")]
    MonitoringActive,

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("Failed to capture: {0}")]
    Capture(#[from] CaptureError),

    #[error("Failed to initialize: {0}")]
    Analysis(#[from] AnalysisError),
}

impl From<CropError> for AppError {
    fn from(e: CropError) -> Self {
        AppError::Capture(CaptureError::Image(e))
    }
}

/// A finished analysis, as delivered back from the worker.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub origin: JobOrigin,
    pub result: Result<String, AnalysisError>,
}

/// `[HH:MM:SS] text` using local wall-clock time.
pub fn stamp(text: &str, at: chrono::NaiveTime) -> String {
    format!("[{}] {}", at.format("%H:%M:%S"), text)
}

fn local_time() -> chrono::NaiveTime {
    chrono::Local::now().time()
}

pub struct App<C, A> {
    capturer: C,
    analyzer: Option<Arc<A>>,
    config: AppConfig,
    config_path: PathBuf,
    mode: CaptureMode,
    fixed_region: Option<Rectangle>,
    windows: Vec<WindowInfo>,
    selected_window: Option<usize>,
    current: Option<CapturedImage>,
    question: String,
    answer: String,
    status: String,
    monitor: MonitoringLoop,
}

impl<C: ScreenCapturer, A: Analyzer> App<C, A> {
    /// Creates the session with the config stored at `config_path`.
    pub fn new(capturer: C, config_path: PathBuf) -> Self {
        let config = AppConfig::load_from(&config_path);
        Self {
            capturer,
            analyzer: None,
            config,
            config_path,
            mode: CaptureMode::default(),
            fixed_region: None,
            windows: Vec::new(),
            selected_window: None,
            current: None,
            question: String::new(),
            answer: String::new(),
            status: "Status: Not initialized".to_string(),
            monitor: MonitoringLoop::default(),
        }
    }

    pub fn with_monitor(mut self, monitor: MonitoringLoop) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn analyzer(&self) -> Option<Arc<A>> {
        self.analyzer.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.analyzer.is_some()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn current_capture(&self) -> Option<&CapturedImage> {
        self.current.as_ref()
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CaptureMode) {
        self.mode = mode;
    }

    pub fn fixed_region(&self) -> Option<Rectangle> {
        self.fixed_region
    }

    pub fn set_question(&mut self, question: &str) {
        self.question = question.to_string();
    }

    pub fn monitor(&self) -> &MonitoringLoop {
        &self.monitor
    }

    pub fn windows(&self) -> &[WindowInfo] {
        &self.windows
    }

    /// Initializes from whatever key is already available (saved config or
    /// environment). Returns `false` if there is none.
    pub fn auto_initialize(&mut self) -> bool {
        self.auto_initialize_with(config::env_api_key())
    }

    /// The saved key wins over `env_key`. Neither is written back; an
    /// environment key never ends up in the config file.
    fn auto_initialize_with(&mut self, env_key: Option<String>) -> bool {
        let Some(key) = self.config.saved_api_key().or(env_key) else {
            return false;
        };
        match self.connect(&key) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("[CONFIG] Available key rejected: {}", e);
                false
            }
        }
    }

    /// Connects the analyzer with a user-entered key and, on success, saves
    /// the config.
    pub fn initialize(&mut self, api_key: &str, remember: bool) -> Result<(), AppError> {
        self.connect(api_key)?;
        self.config = AppConfig {
            api_key: api_key.trim().to_string(),
            remember_key: remember,
        };
        self.config.save_to(&self.config_path);
        Ok(())
    }

    fn connect(&mut self, api_key: &str) -> Result<(), AppError> {
        match A::connect(api_key) {
            Ok(analyzer) => {
                self.status = format!("Status: Initialized ({})", analyzer.describe());
                self.analyzer = Some(Arc::new(analyzer));
                log::info!("[CONFIG] Analyzer initialized");
                Ok(())
            }
            Err(e) => {
                self.status = "Status: Initialization failed".to_string();
                Err(e.into())
            }
        }
    }

    /// Re-lists capturable windows. Unsupported platforms get a warning
    /// and an empty list.
    pub fn refresh_windows(&mut self) -> Result<&[WindowInfo], AppError> {
        if !self.capturer.supports_windows() {
            self.windows.clear();
            self.selected_window = None;
            return Err(AppError::WindowCaptureUnsupported);
        }
        self.windows = self.capturer.list_windows()?;
        self.selected_window = None;
        Ok(&self.windows)
    }

    pub fn select_window(&mut self, index: usize) -> Result<(), AppError> {
        if index >= self.windows.len() {
            return Err(AppError::NoWindowSelected);
        }
        self.selected_window = Some(index);
        Ok(())
    }

    /// Lets the user drag out the rectangle used by [`CaptureMode::Fixed`].
    pub fn set_fixed_region<O: Overlay + ?Sized>(
        &mut self,
        overlay: &mut O,
    ) -> Result<Rectangle, AppError> {
        let rect = self.select_on_overlay(overlay)?;
        self.fixed_region = Some(rect);
        log::info!(
            "[REGION] Fixed region set: {}x{} at ({}, {})",
            rect.width,
            rect.height,
            rect.left,
            rect.top
        );
        Ok(rect)
    }

    /// Sets the fixed region directly, without an overlay.
    pub fn set_fixed_region_to(&mut self, rect: Rectangle) -> Result<(), AppError> {
        if !rect.is_valid() {
            return Err(AppError::RegionTooSmall(rect));
        }
        self.fixed_region = Some(rect);
        Ok(())
    }

    /// Captures per the current mode and keeps the result as the current
    /// capture. The overlay is only used in [`CaptureMode::Region`].
    pub fn capture<O: Overlay + ?Sized>(&mut self, overlay: &mut O) -> Result<&CapturedImage, AppError> {
        let image = match self.mode {
            CaptureMode::FullScreen => self.capturer.capture_whole_screen(PRIMARY_MONITOR)?,
            CaptureMode::Window => self.capture_selected_window()?,
            CaptureMode::Region => {
                let rect = self.select_on_overlay(overlay)?;
                self.capturer.capture_rectangle(rect)?
            }
            CaptureMode::Fixed => {
                let rect = self.fixed_region.ok_or(AppError::NoFixedRegion)?;
                self.capturer.capture_rectangle(rect)?
            }
        };

        Ok(self.current.insert(CapturedImage::encode(image)?))
    }

    pub fn save_screenshot(&self, dir: &Path) -> Result<PathBuf, AppError> {
        let current = self.current.as_ref().ok_or(AppError::NoCapture)?;
        Ok(capture::save_screenshot(&current.image, dir)?)
    }

    /// Validates and prepares a manual analysis of the current capture.
    pub fn analyze(&mut self) -> Result<AnalysisJob, AppError> {
        if self.analyzer.is_none() {
            return Err(AppError::NotInitialized);
        }
        if self.monitor.is_running() {
            return Err(AppError::MonitoringActive);
        }
        let current = self.current.as_ref().ok_or(AppError::NoCapture)?;
        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::NoQuestion);
        }

        let job = AnalysisJob {
            image_base64: current.base64_png.clone(),
            question: question.to_string(),
            origin: JobOrigin::Manual,
        };
        self.answer = ANALYZING_TEXT.to_string();
        Ok(job)
    }

    /// Applies a worker result to the answer area.
    ///
    /// Results are applied in arrival order; a slow older answer can
    /// overwrite a newer one.
    pub fn complete_analysis(&mut self, outcome: AnalysisOutcome) -> &str {
        self.complete_analysis_at(outcome, local_time())
    }

    pub fn complete_analysis_at(&mut self, outcome: AnalysisOutcome, at: chrono::NaiveTime) -> &str {
        self.answer = match (outcome.result, outcome.origin) {
            (Ok(answer), JobOrigin::Monitor) => stamp(&answer, at),
            (Ok(answer), JobOrigin::Manual) => answer,
            (Err(e), _) => {
                log::warn!("[ANALYZE] Failed: {}", e);
                format!("Error: {}", e)
            }
        };
        &self.answer
    }

    pub fn start_monitoring<T: Scheduler<MonitorTick>>(
        &mut self,
        timers: &mut T,
    ) -> Result<Option<AnalysisJob>, AppError> {
        let mode = self.mode;
        let ready = self.analyzer.is_some();
        let mut monitor = std::mem::take(&mut self.monitor);
        let started = monitor.start(mode, ready, self, timers);
        self.monitor = monitor;
        Ok(self.apply_cycle(started?))
    }

    pub fn stop_monitoring<T: Scheduler<MonitorTick>>(&mut self, timers: &mut T) {
        self.monitor.stop(timers);
    }

    pub fn toggle_monitoring<T: Scheduler<MonitorTick>>(
        &mut self,
        timers: &mut T,
    ) -> Result<Option<AnalysisJob>, AppError> {
        if self.monitor.is_running() {
            self.stop_monitoring(timers);
            Ok(None)
        } else {
            self.start_monitoring(timers)
        }
    }

    /// Handles a fired monitoring timer. Returns a job to dispatch, if any.
    pub fn on_monitor_tick<T: Scheduler<MonitorTick>>(&mut self, timers: &mut T) -> Option<AnalysisJob> {
        let mut monitor = std::mem::take(&mut self.monitor);
        let outcome = monitor.on_tick(self, timers);
        self.monitor = monitor;
        self.apply_cycle(outcome)
    }

    fn apply_cycle(&mut self, outcome: CycleOutcome) -> Option<AnalysisJob> {
        match outcome {
            CycleOutcome::Dispatched(job) => {
                self.answer = stamp(ANALYZING_TEXT, local_time());
                Some(job)
            }
            CycleOutcome::CaptureFailed(message) => {
                self.answer = format!("Error during auto-capture: {}", message);
                None
            }
            CycleOutcome::Skipped | CycleOutcome::Stopped => None,
        }
    }

    fn capture_selected_window(&self) -> Result<image::DynamicImage, AppError> {
        if !self.capturer.supports_windows() {
            return Err(AppError::WindowCaptureUnsupported);
        }
        let window = self
            .selected_window
            .and_then(|i| self.windows.get(i))
            .ok_or(AppError::NoWindowSelected)?;
        Ok(self.capturer.capture_window(window.handle)?)
    }

    fn select_on_overlay<O: Overlay + ?Sized>(&self, overlay: &mut O) -> Result<Rectangle, AppError> {
        let snapshot = self.capturer.capture_whole_screen(PRIMARY_MONITOR)?;
        capture::select_region(overlay, &snapshot)?.ok_or(AppError::SelectionCancelled)
    }
}

impl<C: ScreenCapturer, A: Analyzer> CycleSource for App<C, A> {
    fn capture_for_cycle(&mut self) -> Result<Option<CapturedImage>, CaptureError> {
        let image = match self.mode {
            CaptureMode::FullScreen => self.capturer.capture_whole_screen(PRIMARY_MONITOR)?,
            CaptureMode::Window => {
                let Some(window) = self.selected_window.and_then(|i| self.windows.get(i)) else {
                    return Ok(None);
                };
                if !self.capturer.supports_windows() {
                    return Ok(None);
                }
                self.capturer.capture_window(window.handle)?
            }
            CaptureMode::Fixed => match self.fixed_region {
                Some(rect) => self.capturer.capture_rectangle(rect)?,
                None => return Ok(None),
            },
            CaptureMode::Region => return Ok(None),
        };

        let captured = CapturedImage::encode(image)?;
        self.current = Some(captured.clone());
        Ok(Some(captured))
    }

    fn question(&self) -> Option<String> {
        let question = self.question.trim();
        (!question.is_empty()).then(|| question.to_string())
    }
}
