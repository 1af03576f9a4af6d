//! Pure image shaping: functional core.
//!
//! This module has zero infrastructure dependencies.
//! It takes pixel data in, returns pixel data (or encoded bytes) out.

use super::geometry::Rectangle;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Longest side, in pixels, of an image sent for analysis.
pub const UPLOAD_MAX_DIMENSION: u32 = 1024;

/// Crops `image` to `rect`, where `rect` is expressed relative to the
/// image's top-left corner.
///
/// Parts of the rectangle hanging off the image are clipped. A rectangle
/// with nothing left after clipping is an error.
pub fn crop(image: &DynamicImage, rect: Rectangle) -> Result<DynamicImage, CropError> {
    if rect.width <= 0 || rect.height <= 0 {
        return Err(CropError::ZeroDimension);
    }

    let (img_width, img_height) = (image.width() as i64, image.height() as i64);

    let left = (rect.left as i64).clamp(0, img_width);
    let top = (rect.top as i64).clamp(0, img_height);
    let right = rect.right().clamp(0, img_width);
    let bottom = rect.bottom().clamp(0, img_height);

    if right <= left || bottom <= top {
        return Err(CropError::OutOfBounds {
            requested: (rect.left, rect.top, rect.width, rect.height),
            image_size: (image.width(), image.height()),
        });
    }

    Ok(image.crop_imm(
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

/// PNG-encodes an image.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CropError> {
    let mut png_bytes: Vec<u8> = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| CropError::EncodingFailed(e.to_string()))?;
    Ok(png_bytes)
}

/// Shrinks `image` so its longest side is at most `max_dimension`,
/// preserving aspect ratio. Smaller images are returned untouched.
pub fn fit_within(image: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let longest = image.width().max(image.height());
    if longest <= max_dimension {
        return image.clone();
    }

    let ratio = max_dimension as f64 / longest as f64;
    let width = ((image.width() as f64 * ratio) as u32).max(1);
    let height = ((image.height() as f64 * ratio) as u32).max(1);
    image.resize_exact(width, height, FilterType::Lanczos3)
}

/// Prepares a capture for the analysis service: downscale, PNG, base64.
pub fn encode_for_upload(image: &DynamicImage) -> Result<String, CropError> {
    let start = std::time::Instant::now();

    let fitted = fit_within(image, UPLOAD_MAX_DIMENSION);
    let png_bytes = encode_png(&fitted)?;
    let encoded = STANDARD.encode(&png_bytes);

    log::info!(
        "[CAPTURE] Encoded {}x{} upload in {}ms ({} bytes)",
        fitted.width(),
        fitted.height(),
        start.elapsed().as_millis(),
        png_bytes.len()
    );

    Ok(encoded)
}

/// `screenshot_<YYYYMMDD_HHMMSS>.png` for the given local time.
pub fn screenshot_filename(at: chrono::NaiveDateTime) -> String {
    format!("screenshot_{}.png", at.format("%Y%m%d_%H%M%S"))
}

/// Writes `image` into `dir` using the screenshot naming convention.
pub fn save_screenshot(image: &DynamicImage, dir: &Path) -> Result<PathBuf, CropError> {
    let name = screenshot_filename(chrono::Local::now().naive_local());
    let path = dir.join(name);
    image
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|e| CropError::SaveFailed(e.to_string()))?;
    log::info!("[CAPTURE] Screenshot saved to {}", path.display());
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Crop rectangle has zero width or height")]
    ZeroDimension,

    #[error(
        "Crop rectangle ({},{},{},{}) lies outside the image ({}x{})",
        requested.0, requested.1, requested.2, requested.3,
        image_size.0, image_size.1
    )]
    OutOfBounds {
        requested: (i32, i32, i32, i32),
        image_size: (u32, u32),
    },

    #[error("PNG encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Failed to save screenshot: {0}")]
    SaveFailed(String),
}
