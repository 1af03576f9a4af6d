//! Screen capture domain: public API.
//!
//! This module owns everything between "the user wants pixels" and "here is
//! an image ready to upload": rectangle normalization, the overlay gesture,
//! OS capture, and image shaping. External code should only use the items
//! exported here.

mod geometry;
mod region;
mod screenshot;
mod session;

pub use geometry::{normalize, Rectangle, MIN_SELECTION_EXTENT};
pub use region::{
    crop, encode_for_upload, encode_png, fit_within, save_screenshot, screenshot_filename,
    CropError, UPLOAD_MAX_DIMENSION,
};
pub use screenshot::XcapCapturer;
pub use session::{select_region, CaptureSession, Overlay, OverlayEvent, SessionState, OVERLAY_HINT};

use image::DynamicImage;

/// Index of the primary monitor for [`ScreenCapturer::capture_whole_screen`].
pub const PRIMARY_MONITOR: usize = 0;

/// A top-level window that can be captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub handle: u32,
    pub title: String,
}

/// The raw pixel source. Window operations are capability-gated: callers
/// check [`ScreenCapturer::supports_windows`] before offering them.
pub trait ScreenCapturer {
    /// Captures a rectangle in virtual-desktop coordinates.
    fn capture_rectangle(&self, rect: Rectangle) -> Result<DynamicImage, CaptureError>;

    /// Captures a whole monitor; index 0 is the primary.
    fn capture_whole_screen(&self, monitor_index: usize) -> Result<DynamicImage, CaptureError>;

    fn capture_window(&self, handle: u32) -> Result<DynamicImage, CaptureError>;

    fn list_windows(&self) -> Result<Vec<WindowInfo>, CaptureError>;

    fn supports_windows(&self) -> bool;
}

/// A capture held between "capture" and "analyze", with its upload payload.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub image: DynamicImage,
    pub base64_png: String,
}

impl CapturedImage {
    pub fn encode(image: DynamicImage) -> Result<Self, CaptureError> {
        let base64_png = encode_for_upload(&image)?;
        Ok(Self { image, base64_png })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to enumerate monitors: {0}")]
    MonitorEnumeration(String),

    #[error("No primary monitor found")]
    NoPrimaryMonitor,

    #[error("Monitor {index} does not exist ({count} connected)")]
    NoSuchMonitor { index: usize, count: usize },

    #[error("Failed to enumerate windows: {0}")]
    WindowEnumeration(String),

    #[error("Window {0} is no longer available")]
    NoSuchWindow(u32),

    #[error("Window capture is not supported on this platform")]
    WindowsUnsupported,

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("Overlay failed: {0}")]
    Overlay(String),

    #[error(transparent)]
    Image(#[from] CropError),
}
