//! Camera side: capture pipeline, crop control and platform selection

#[cfg(feature = "gst")]
mod capture;
mod crop;
pub mod pipeline;
pub mod platform;

#[cfg(feature = "gst")]
pub use capture::{Capture, CaptureError, CaptureStats};
pub use crop::{CropControl, CropError, CropRegion};
pub use platform::PlatformInfo;
