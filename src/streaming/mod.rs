//! Frame fan-out from the capture pipeline to HTTP clients

mod frame_buffer;
mod stats;

pub use frame_buffer::{Frame, FrameBuffer, FrameSink};
pub use stats::{StatsSnapshot, StreamStats};

use bytes::Bytes;
use std::sync::Arc;

/// Capture-side sink that publishes into the shared buffer and counts frames
pub struct PublishingSink {
    frames: Arc<FrameBuffer>,
    stats: Arc<StreamStats>,
}

impl PublishingSink {
    pub fn new(frames: Arc<FrameBuffer>, stats: Arc<StreamStats>) -> Self {
        Self { frames, stats }
    }
}

impl FrameSink for PublishingSink {
    fn write_frame(&self, jpeg: Bytes) {
        self.frames.publish(Frame::new(jpeg));
        self.stats.record_publish();
    }
}
