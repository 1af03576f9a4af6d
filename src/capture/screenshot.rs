//! Screen, monitor and window capture using the `xcap` crate.
//!
//! This is the infrastructure layer; it talks to the OS.

use super::geometry::Rectangle;
use super::region;
use super::{CaptureError, ScreenCapturer, WindowInfo};
use image::DynamicImage;
use xcap::{Monitor, Window};

/// The real capturer, backed by `xcap`.
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapCapturer;

impl XcapCapturer {
    pub fn new() -> Self {
        Self
    }
}

/// Monitors ordered primary-first, then in enumeration order.
fn ordered_monitors() -> Result<Vec<Monitor>, CaptureError> {
    let mut monitors =
        Monitor::all().map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
    if monitors.is_empty() {
        return Err(CaptureError::NoPrimaryMonitor);
    }
    // Stable sort keeps the remaining monitors in their original order.
    monitors.sort_by_key(|m| !m.is_primary().unwrap_or(false));
    Ok(monitors)
}

fn capture_monitor(monitor: &Monitor) -> Result<DynamicImage, CaptureError> {
    let image = monitor
        .capture_image()
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
    Ok(DynamicImage::ImageRgba8(image))
}

impl ScreenCapturer for XcapCapturer {
    fn capture_whole_screen(&self, monitor_index: usize) -> Result<DynamicImage, CaptureError> {
        let start = std::time::Instant::now();

        let monitors = ordered_monitors()?;
        let count = monitors.len();
        let monitor = monitors
            .into_iter()
            .nth(monitor_index)
            .ok_or(CaptureError::NoSuchMonitor {
                index: monitor_index,
                count,
            })?;

        let image = capture_monitor(&monitor)?;
        log::info!(
            "[CAPTURE] Monitor {} captured ({}x{}) in {}ms",
            monitor_index,
            image.width(),
            image.height(),
            start.elapsed().as_millis()
        );
        Ok(image)
    }

    fn capture_rectangle(&self, rect: Rectangle) -> Result<DynamicImage, CaptureError> {
        let start = std::time::Instant::now();

        let monitor = Monitor::from_point(rect.left, rect.top)
            .map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
        let origin_x = monitor
            .x()
            .map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
        let origin_y = monitor
            .y()
            .map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;

        let full = capture_monitor(&monitor)?;
        let local = Rectangle::new(
            rect.left.saturating_sub(origin_x),
            rect.top.saturating_sub(origin_y),
            rect.width,
            rect.height,
        );
        let image = region::crop(&full, local)?;

        log::info!(
            "[CAPTURE] Region {}x{} at ({}, {}) captured in {}ms",
            rect.width,
            rect.height,
            rect.left,
            rect.top,
            start.elapsed().as_millis()
        );
        Ok(image)
    }

    fn capture_window(&self, handle: u32) -> Result<DynamicImage, CaptureError> {
        if !self.supports_windows() {
            return Err(CaptureError::WindowsUnsupported);
        }

        let windows =
            Window::all().map_err(|e| CaptureError::WindowEnumeration(e.to_string()))?;
        let window = windows
            .into_iter()
            .find(|w| w.id().map(|id| id == handle).unwrap_or(false))
            .ok_or(CaptureError::NoSuchWindow(handle))?;

        let image = window
            .capture_image()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        Ok(DynamicImage::ImageRgba8(image))
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>, CaptureError> {
        if !self.supports_windows() {
            return Err(CaptureError::WindowsUnsupported);
        }

        let windows =
            Window::all().map_err(|e| CaptureError::WindowEnumeration(e.to_string()))?;

        let listed: Vec<WindowInfo> = windows
            .iter()
            .filter(|w| !w.is_minimized().unwrap_or(true))
            .filter_map(|w| {
                let handle = w.id().ok()?;
                let title = w.title().ok()?;
                (!title.trim().is_empty()).then_some(WindowInfo { handle, title })
            })
            .collect();

        log::info!("[CAPTURE] Listed {} windows", listed.len());
        Ok(listed)
    }

    fn supports_windows(&self) -> bool {
        cfg!(any(target_os = "windows", target_os = "macos"))
    }
}
