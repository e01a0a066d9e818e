//! `multipart/x-mixed-replace` encoding and per-client stream sessions

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::streaming::{Frame, FrameBuffer, StreamStats};

/// Boundary separating JPEG parts. Browsers only need it to be consistent
/// with the response content type.
pub const BOUNDARY: &str = "FRAME";

pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=FRAME";

/// Serialize one frame as a multipart part:
/// boundary line, part headers, blank line, JPEG bytes, trailing CRLF.
pub fn encode_part(frame: &Frame) -> Bytes {
    let header = format!(
        "--{boundary}\r\n\
         Content-Type: image/jpeg\r\n\
         Content-Length: {len}\r\n\
         \r\n",
        boundary = BOUNDARY,
        len = frame.len()
    );

    let mut part = BytesMut::with_capacity(header.len() + frame.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(frame.data());
    part.extend_from_slice(b"\r\n");
    part.freeze()
}

/// State of one open `/stream.mjpg` connection.
///
/// Lives exactly as long as the response body: when the connection fails to
/// write a part, the body is dropped and so is the session.
pub struct ClientSession {
    addr: SocketAddr,
    frames: Arc<FrameBuffer>,
    stats: Arc<StreamStats>,
    last_seen: u64,
    frames_sent: u64,
    bytes_sent: u64,
    started: Instant,
}

impl ClientSession {
    pub fn new(addr: SocketAddr, frames: Arc<FrameBuffer>, stats: Arc<StreamStats>) -> Self {
        stats.client_connected();
        info!(
            client = %addr,
            active = stats.active_clients(),
            "Streaming client connected"
        );

        Self {
            addr,
            frames,
            stats,
            last_seen: 0,
            frames_sent: 0,
            bytes_sent: 0,
            started: Instant::now(),
        }
    }

    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    /// Wait for a frame newer than the last one sent and encode it
    pub async fn next_part(&mut self) -> Bytes {
        let (frame, generation) = self.frames.wait_for_next(self.last_seen).await;

        let skipped = generation.saturating_sub(self.last_seen + 1);
        if skipped > 0 && self.last_seen > 0 {
            debug!(client = %self.addr, skipped, "Client skipped frames");
        }
        self.last_seen = generation;

        let part = encode_part(&frame);
        self.frames_sent += 1;
        self.bytes_sent += part.len() as u64;
        self.stats.record_part(part.len());
        part
    }

    /// Endless body stream of multipart parts for this client
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        stream::unfold(self, |mut session| async move {
            let part = session.next_part().await;
            Some((Ok(part), session))
        })
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.stats.client_disconnected();
        warn!(
            client = %self.addr,
            cause = "connection closed or write failed",
            frames = self.frames_sent,
            bytes = self.bytes_sent,
            duration_secs = self.started.elapsed().as_secs(),
            active = self.stats.active_clients(),
            "Removed streaming client"
        );
    }
}
