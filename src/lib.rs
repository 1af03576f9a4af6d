//! Answer Lens: ask a vision model about what is on screen.
//!
//! This is the crate root that wires together:
//! - Screen capture and region selection (capture/)
//! - Remote analysis (analysis/)
//! - Unattended monitoring on a fixed period (monitor.rs)
//! - The teleprompter playback engine (teleprompter/)
//! - The session and the event loop joining them (app.rs, shell.rs)

pub mod analysis;
pub mod app;
pub mod capture;
pub mod config;
pub mod monitor;
pub mod shell;
pub mod teleprompter;
pub mod timer;

use analysis::GeminiAnalyzer;
use app::App;
use capture::{Rectangle, XcapCapturer};
use monitor::CaptureMode;
use shell::Shell;

/// Environment variable selecting a fixed capture region as
/// `left,top,width,height`. Without it the primary screen is captured.
pub const REGION_ENV: &str = "ANSWER_LENS_REGION";

/// Entry point for the headless monitor: asks the question given on the
/// command line about the screen every cycle and prints each answer.
pub fn run() {
    env_logger::init();
    if let Err(e) = dotenvy::dotenv() {
        log::debug!("[CONFIG] No .env file loaded: {}", e);
    }

    log::info!("Answer Lens starting up");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            return;
        }
    };

    if let Err(message) = runtime.block_on(monitor_headless()) {
        log::error!("{}", message);
        eprintln!("{}", message);
    }
}

async fn monitor_headless() -> Result<(), String> {
    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if question.trim().is_empty() {
        return Err("Usage: answer-lens <question>".to_string());
    }

    let mut app: App<XcapCapturer, GeminiAnalyzer> = App::new(XcapCapturer::new(), config::config_path());

    match std::env::var(REGION_ENV) {
        Ok(raw) => {
            let rect: Rectangle = raw.parse()?;
            app.set_fixed_region_to(rect).map_err(|e| e.to_string())?;
            app.set_mode(CaptureMode::Fixed);
        }
        Err(_) => app.set_mode(CaptureMode::FullScreen),
    }

    if !app.auto_initialize() {
        return Err(analysis::AnalysisError::MissingApiKey.to_string());
    }
    log::info!("{}", app.status());
    app.set_question(&question);

    let mut shell = Shell::new(app);
    shell.start_monitoring().map_err(|e| e.to_string())?;

    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    shell.run_until(stop, |answer| println!("{}\n", answer)).await;

    Ok(())
}
