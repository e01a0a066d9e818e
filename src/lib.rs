//! MJPEG-over-HTTP camera streaming for Raspberry Pi with digital zoom
//!
//! One capture pipeline publishes JPEG frames into a single latest-frame slot;
//! any number of browsers read it concurrently through a
//! `multipart/x-mixed-replace` response. A small control page posts zoom
//! levels 1-5, which become centered crops on the camera.
//!
//! # Example
//!
//! ```no_run
//! use rpi_mjpeg_streamer::streaming::{Frame, FrameBuffer};
//!
//! # async fn run() {
//! let frames = FrameBuffer::new();
//! frames.publish(Frame::new(vec![0xFF, 0xD8, 0xFF, 0xD9]));
//! let (frame, generation) = frames.wait_for_next(0).await;
//! # }
//! ```

pub mod camera;
pub mod config;
pub mod streaming;
pub mod web;
pub mod zoom;

// Re-exports for convenience
pub use config::Config;
pub use streaming::{Frame, FrameBuffer, FrameSink, StreamStats};
pub use web::AppState;
pub use zoom::{ZoomController, ZoomLevel};
