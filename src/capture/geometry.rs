//! Rectangle normalization for drag gestures: functional core.
//!
//! Two arbitrary corner points in, one canonical rectangle out.

use serde::{Deserialize, Serialize};

/// Selections this small (or smaller) on either axis count as "no selection".
pub const MIN_SELECTION_EXTENT: i32 = 10;

/// A pixel area of a display. `left`/`top` may be negative on
/// multi-monitor setups where a monitor sits left of or above the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Builds the canonical rectangle spanned by two corner points.
    ///
    /// Coordinates are truncated to whole pixels first, then ordered, so the
    /// result never has a negative extent. Points beyond the `i32` range are
    /// pinned to it and extents saturate at `i32::MAX`.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let (x1, y1, x2, y2) = (to_pixel(x1), to_pixel(y1), to_pixel(x2), to_pixel(y2));
        let left = x1.min(x2);
        let top = y1.min(y2);
        Self {
            left: left as i32,
            top: top as i32,
            width: saturate(x1.max(x2) - left),
            height: saturate(y1.max(y2) - top),
        }
    }

    /// Whether this rectangle is large enough to be a real selection.
    pub fn is_valid(&self) -> bool {
        self.width > MIN_SELECTION_EXTENT && self.height > MIN_SELECTION_EXTENT
    }

    pub fn right(&self) -> i64 {
        i64::from(self.left) + i64::from(self.width)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.top) + i64::from(self.height)
    }
}

fn to_pixel(v: f64) -> i64 {
    (v as i64).clamp(i64::from(i32::MIN), i64::from(i32::MAX))
}

fn saturate(v: i64) -> i32 {
    v.min(i64::from(i32::MAX)) as i32
}

impl std::str::FromStr for Rectangle {
    type Err = String;

    /// Parses `left,top,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid region '{}': {}", s, e))?;

        match parts.as_slice() {
            &[left, top, width, height] => {
                if width < 0 || height < 0 {
                    return Err(format!("invalid region '{}': negative size", s));
                }
                if left.checked_add(width).is_none() || top.checked_add(height).is_none() {
                    return Err(format!("invalid region '{}': extends past the coordinate range", s));
                }
                Ok(Self::new(left, top, width, height))
            }
            _ => Err(format!("invalid region '{}': expected left,top,width,height", s)),
        }
    }
}

/// Normalizes a drag into a rectangle, or `None` when it is too small.
pub fn normalize(x1: f64, y1: f64, x2: f64, y2: f64) -> Option<Rectangle> {
    let rect = Rectangle::from_corners(x1, y1, x2, y2);
    rect.is_valid().then_some(rect)
}
