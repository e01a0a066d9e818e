//! Shared fixtures for the HTTP tests

#![allow(dead_code)]

use parking_lot::Mutex;
use rpi_mjpeg_streamer::camera::{CropControl, CropError, CropRegion};
use rpi_mjpeg_streamer::streaming::{FrameBuffer, StreamStats};
use rpi_mjpeg_streamer::web::AppState;
use rpi_mjpeg_streamer::zoom::ZoomController;
use std::sync::Arc;

pub const SENSOR: (u32, u32) = (1920, 1080);

/// Crop control that records every region instead of touching a camera
#[derive(Default)]
pub struct RecordingCrop {
    pub applied: Mutex<Vec<CropRegion>>,
}

impl RecordingCrop {
    pub fn applied(&self) -> Vec<CropRegion> {
        self.applied.lock().clone()
    }
}

impl CropControl for RecordingCrop {
    fn pixel_array_size(&self) -> (u32, u32) {
        SENSOR
    }

    fn set_crop(&self, region: CropRegion) -> Result<(), CropError> {
        self.applied.lock().push(region);
        Ok(())
    }
}

pub struct Fixture {
    pub state: AppState,
    pub frames: Arc<FrameBuffer>,
    pub stats: Arc<StreamStats>,
    pub crop: Arc<RecordingCrop>,
}

pub fn fixture() -> Fixture {
    let frames = Arc::new(FrameBuffer::new());
    let stats = Arc::new(StreamStats::new());
    let crop = Arc::new(RecordingCrop::default());
    let zoom = Arc::new(ZoomController::new(crop.clone()));

    Fixture {
        state: AppState::new(frames.clone(), zoom, stats.clone()),
        frames,
        stats,
        crop,
    }
}

/// Incremental parser for a `multipart/x-mixed-replace; boundary=FRAME` body
#[derive(Default)]
pub struct PartReader {
    buf: Vec<u8>,
}

impl PartReader {
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pops the next complete JPEG part, checking its framing on the way
    pub fn next_part(&mut self) -> Option<Vec<u8>> {
        let header_end = find(&self.buf, b"\r\n\r\n")?;
        let headers = std::str::from_utf8(&self.buf[..header_end]).ok()?;

        let mut lines = headers.split("\r\n");
        assert_eq!(lines.next(), Some("--FRAME"));
        assert_eq!(lines.next(), Some("Content-Type: image/jpeg"));
        let len: usize = lines
            .next()
            .and_then(|l| l.strip_prefix("Content-Length: "))
            .and_then(|n| n.parse().ok())
            .expect("part must carry Content-Length");

        let body_start = header_end + 4;
        if self.buf.len() < body_start + len + 2 {
            return None;
        }
        assert_eq!(&self.buf[body_start + len..body_start + len + 2], b"\r\n");

        let jpeg = self.buf[body_start..body_start + len].to_vec();
        self.buf.drain(..body_start + len + 2);
        Some(jpeg)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
