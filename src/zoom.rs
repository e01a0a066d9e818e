//! Discrete digital zoom on top of the camera crop control

use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::camera::{CropControl, CropError, CropRegion};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid zoom level {0:?}, expected 1-5")]
pub struct InvalidZoomLevel(pub String);

/// Zoom factor relative to the full sensor, 1 (no zoom) through 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoomLevel(u8);

impl ZoomLevel {
    pub const MIN: ZoomLevel = ZoomLevel(1);
    pub const MAX: ZoomLevel = ZoomLevel(5);

    pub fn factor(self) -> u32 {
        u32::from(self.0)
    }

    /// Crop for this level, always computed from the native resolution
    pub fn crop_region(self, full_width: u32, full_height: u32) -> CropRegion {
        CropRegion::centered(full_width, full_height, self.factor())
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u32> for ZoomLevel {
    type Error = InvalidZoomLevel;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1..=5 => Ok(ZoomLevel(value as u8)),
            _ => Err(InvalidZoomLevel(value.to_string())),
        }
    }
}

impl FromStr for ZoomLevel {
    type Err = InvalidZoomLevel;

    /// Only the exact values the control page sends are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(ZoomLevel(1)),
            "2" => Ok(ZoomLevel(2)),
            "3" => Ok(ZoomLevel(3)),
            "4" => Ok(ZoomLevel(4)),
            "5" => Ok(ZoomLevel(5)),
            _ => Err(InvalidZoomLevel(s.to_string())),
        }
    }
}

impl fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Applies zoom requests to the camera one at a time.
///
/// The native resolution is read once at construction; every level is an
/// absolute factor of it, so levels never compound.
pub struct ZoomController {
    control: Arc<dyn CropControl>,
    full_size: (u32, u32),
    current: Mutex<ZoomLevel>,
}

impl ZoomController {
    pub fn new(control: Arc<dyn CropControl>) -> Self {
        let full_size = control.pixel_array_size();
        info!(
            width = full_size.0,
            height = full_size.1,
            "Zoom controller using native resolution"
        );
        Self {
            control,
            full_size,
            current: Mutex::new(ZoomLevel::default()),
        }
    }

    pub fn current(&self) -> ZoomLevel {
        *self.current.lock()
    }

    /// Crop the camera to `level` and return the region sent.
    ///
    /// The lock is held across the control call so concurrent requests
    /// cannot interleave their crop updates.
    pub fn apply_zoom(&self, level: ZoomLevel) -> Result<CropRegion, CropError> {
        let (width, height) = self.full_size;
        let region = level.crop_region(width, height);

        let mut current = self.current.lock();
        self.control.set_crop(region)?;
        *current = level;

        info!(level = %level, crop = %region, "Zoom applied");
        Ok(region)
    }

    /// Apply a zoom value as received from the control page.
    ///
    /// Anything that is not a level 1-5 is logged and dropped; crop failures
    /// are logged too. Returns the level now in effect.
    pub fn apply_requested(&self, raw: &str) -> ZoomLevel {
        match raw.parse::<ZoomLevel>() {
            Ok(level) => {
                if let Err(e) = self.apply_zoom(level) {
                    warn!(level = %level, error = %e, "Failed to apply zoom");
                }
            }
            Err(e) => {
                debug!(error = %e, "Ignoring zoom request");
            }
        }
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every crop it is asked to apply
    struct RecordingCrop {
        size: (u32, u32),
        applied: Mutex<Vec<CropRegion>>,
    }

    impl RecordingCrop {
        fn new(width: u32, height: u32) -> Arc<Self> {
            Arc::new(Self {
                size: (width, height),
                applied: Mutex::new(Vec::new()),
            })
        }
    }

    impl CropControl for RecordingCrop {
        fn pixel_array_size(&self) -> (u32, u32) {
            self.size
        }

        fn set_crop(&self, region: CropRegion) -> Result<(), CropError> {
            self.applied.lock().push(region);
            Ok(())
        }
    }

    struct FailingCrop;

    impl CropControl for FailingCrop {
        fn pixel_array_size(&self) -> (u32, u32) {
            (640, 480)
        }

        fn set_crop(&self, _region: CropRegion) -> Result<(), CropError> {
            Err(CropError::Unavailable("pipeline stopped".into()))
        }
    }

    #[test]
    fn test_parse_levels() {
        for (raw, factor) in [("1", 1), ("2", 2), ("3", 3), ("4", 4), ("5", 5)] {
            assert_eq!(raw.parse::<ZoomLevel>().unwrap().factor(), factor);
        }
        for raw in [
            "0", "6", "", "abc", "-1", "+2", " 3", "2.5", "99999999999", "01", "002", "0005",
        ] {
            assert!(raw.parse::<ZoomLevel>().is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_zoom_one_is_full_frame() {
        let crop = RecordingCrop::new(1920, 1080);
        let zoom = ZoomController::new(crop.clone());

        let region = zoom.apply_zoom(ZoomLevel::MIN).unwrap();
        assert_eq!(region.as_array(), [0, 0, 1920, 1080]);
        assert_eq!(crop.applied.lock().as_slice(), &[region]);
    }

    #[test]
    fn test_zoom_levels_from_native_resolution() {
        let crop = RecordingCrop::new(1920, 1080);
        let zoom = ZoomController::new(crop.clone());

        for factor in 2..=5u32 {
            let level = ZoomLevel::try_from(factor).unwrap();
            let region = zoom.apply_zoom(level).unwrap();
            let (w, h) = (1920 / factor, 1080 / factor);
            assert_eq!(region.as_array(), [(1920 - w) / 2, (1080 - h) / 2, w, h]);
        }

        let x2 = crop.applied.lock()[0];
        assert_eq!(x2.as_array(), [480, 270, 960, 540]);
    }

    #[test]
    fn test_levels_do_not_compound() {
        let crop = RecordingCrop::new(1920, 1080);
        let zoom = ZoomController::new(crop.clone());

        zoom.apply_requested("2");
        zoom.apply_requested("2");
        zoom.apply_requested("4");
        zoom.apply_requested("2");

        let applied = crop.applied.lock();
        assert_eq!(applied[0], applied[1]);
        assert_eq!(applied[0], applied[3]);
        assert_eq!(applied[2].as_array(), [720, 405, 480, 270]);
    }

    #[test]
    fn test_invalid_requests_leave_crop_unchanged() {
        let crop = RecordingCrop::new(1920, 1080);
        let zoom = ZoomController::new(crop.clone());
        zoom.apply_requested("3");

        for raw in ["0", "6", "zoom", "", "01", "002", "0005"] {
            assert_eq!(zoom.apply_requested(raw).factor(), 3);
        }
        assert_eq!(crop.applied.lock().len(), 1);
    }

    #[test]
    fn test_crop_failure_keeps_previous_level() {
        let zoom = ZoomController::new(Arc::new(FailingCrop));
        assert!(zoom.apply_zoom(ZoomLevel::MAX).is_err());
        assert_eq!(zoom.apply_requested("5"), ZoomLevel::MIN);
    }

    #[test]
    fn test_concurrent_requests_serialized() {
        let crop = RecordingCrop::new(1920, 1080);
        let zoom = Arc::new(ZoomController::new(crop.clone()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let zoom = Arc::clone(&zoom);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        zoom.apply_requested(&((i % 5) + 1).to_string());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let applied = crop.applied.lock();
        assert_eq!(applied.len(), 400);
        let last = *applied.last().unwrap();
        assert_eq!(zoom.current().crop_region(1920, 1080), last);
    }
}
