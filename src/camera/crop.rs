//! Sensor crop region and the control interface that applies it

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropError {
    #[error("crop region {region} exceeds sensor {width}x{height}")]
    OutOfBounds {
        region: CropRegion,
        width: u32,
        height: u32,
    },

    #[error("crop control unavailable: {0}")]
    Unavailable(String),
}

/// Rectangle on the sensor's native pixel array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// The whole sensor, no offset
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Centered region `1/factor` the size of the full sensor in each dimension.
    ///
    /// Floors both the size and the offset. A factor of zero is treated as 1.
    pub fn centered(full_width: u32, full_height: u32, factor: u32) -> Self {
        let factor = factor.max(1);
        let width = full_width / factor;
        let height = full_height / factor;
        Self {
            x: (full_width - width) / 2,
            y: (full_height - height) / 2,
            width,
            height,
        }
    }

    /// `[offset_x, offset_y, width, height]`
    pub fn as_array(&self) -> [u32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Whether the region lies entirely inside a `width` x `height` array
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height)
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[x: {}, y: {}, w: {}, h: {}]",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Camera-side crop control.
///
/// Implemented by the capture pipeline; coordinates are in sensor pixels.
pub trait CropControl: Send + Sync {
    /// Native (width, height) the crop coordinates refer to
    fn pixel_array_size(&self) -> (u32, u32);

    fn set_crop(&self, region: CropRegion) -> Result<(), CropError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_region() {
        let region = CropRegion::full(1920, 1080);
        assert_eq!(region.as_array(), [0, 0, 1920, 1080]);
        assert_eq!(CropRegion::centered(1920, 1080, 1), region);
    }

    #[test]
    fn test_centered_floors_size_and_offset() {
        let region = CropRegion::centered(1920, 1080, 2);
        assert_eq!(region.as_array(), [480, 270, 960, 540]);

        // 1080 / 7 = 154, (1080 - 154) / 2 = 463
        let region = CropRegion::centered(1920, 1080, 7);
        assert_eq!(region.as_array(), [823, 463, 274, 154]);

        // odd remainder: (3281 - 1093) / 2 = 1094
        let region = CropRegion::centered(3281, 2464, 3);
        assert_eq!(region.as_array(), [1094, 821, 1093, 821]);
    }

    #[test]
    fn test_fits_within() {
        assert!(CropRegion::centered(640, 480, 5).fits_within(640, 480));
        assert!(!CropRegion::full(641, 480).fits_within(640, 480));
        assert!(!CropRegion::full(0, 480).fits_within(640, 480));
        let overflow = CropRegion {
            x: u32::MAX,
            y: 0,
            width: 10,
            height: 10,
        };
        assert!(!overflow.fits_within(640, 480));
    }

    #[test]
    fn test_display() {
        let region = CropRegion::centered(1920, 1080, 2);
        assert_eq!(region.to_string(), "[x: 480, y: 270, w: 960, h: 540]");
    }
}
