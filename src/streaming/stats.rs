//! Streaming statistics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Live counters shared by the capture sink and every client session
#[derive(Debug, Default)]
pub struct StreamStats {
    frames_published: AtomicU64,
    clients_connected: AtomicU64,
    clients_active: AtomicUsize,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl StreamStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_publish(&self) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_connected(&self) {
        self.clients_connected.fetch_add(1, Ordering::Relaxed);
        self.clients_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_disconnected(&self) {
        self.clients_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_part(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn active_clients(&self) -> usize {
        self.clients_active.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_published: self.frames_published.load(Ordering::Relaxed),
            clients_connected: self.clients_connected.load(Ordering::Relaxed),
            clients_active: self.clients_active.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`StreamStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames handed over by the capture pipeline
    pub frames_published: u64,

    /// Stream clients accepted since startup
    pub clients_connected: u64,

    /// Stream clients currently attached
    pub clients_active: usize,

    /// Multipart frame parts written across all clients
    pub frames_sent: u64,

    /// Total bytes written across all clients
    pub bytes_sent: u64,
}

impl StatsSnapshot {
    /// Capture frame rate based on delta
    pub fn calculate_fps(&self, previous: &Self, elapsed_secs: f64) -> f64 {
        if elapsed_secs == 0.0 {
            return 0.0;
        }

        let frames_delta = self.frames_published.saturating_sub(previous.frames_published);
        frames_delta as f64 / elapsed_secs
    }

    /// Outgoing bitrate in kbps based on delta, summed over all clients
    pub fn calculate_bitrate_kbps(&self, previous: &Self, elapsed_secs: f64) -> f64 {
        if elapsed_secs == 0.0 {
            return 0.0;
        }

        let bytes_delta = self.bytes_sent.saturating_sub(previous.bytes_sent);
        (bytes_delta as f64 * 8.0) / elapsed_secs / 1000.0
    }
}
