/// Latest-frame slot shared between the capture pipeline and HTTP clients
///
/// The capture side publishes every encoded JPEG here; each streaming client
/// waits for a generation newer than the last one it wrote. Nothing is queued:
/// a slow client simply skips to whatever is newest when it wakes up.
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

/// One JPEG-encoded image.
///
/// Backed by `Bytes`, so handing the same frame to every client only bumps a
/// reference count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
}

impl Frame {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Receiver side of the capture pipeline.
///
/// Called from the encoder's streaming thread once per encoded frame.
pub trait FrameSink: Send + Sync {
    fn write_frame(&self, jpeg: Bytes);
}

struct Slot {
    frame: Option<Frame>,
    generation: u64,
}

/// Single-slot broadcast of the most recent frame.
///
/// Generation 0 means nothing has been published yet; every publish bumps it
/// by one, so `generation != last_seen` is the only "new frame" test readers
/// need.
pub struct FrameBuffer {
    slot: Mutex<Slot>,
    notify: Notify,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                frame: None,
                generation: 0,
            }),
            notify: Notify::new(),
        }
    }

    /// Replace the current frame and wake every waiting client.
    ///
    /// Returns the new generation. Never waits on readers: the lock is only
    /// ever held for a pointer swap or a comparison.
    pub fn publish(&self, frame: Frame) -> u64 {
        let generation = {
            let mut slot = self.slot.lock();
            slot.frame = Some(frame);
            slot.generation += 1;
            slot.generation
        };
        self.notify.notify_waiters();
        trace!(generation, "frame published");
        generation
    }

    /// Wait until a frame newer than `last_seen` is available.
    ///
    /// Interest in the notification is registered before the generation is
    /// checked, so a publish landing between the check and the await still
    /// wakes this caller. Waits forever if the producer stops.
    pub async fn wait_for_next(&self, last_seen: u64) -> (Frame, u64) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(latest) = self.newer_than(last_seen) {
                return latest;
            }

            notified.await;
        }
    }

    /// Current frame and generation, if anything has been published.
    pub fn latest(&self) -> Option<(Frame, u64)> {
        self.newer_than(0)
    }

    pub fn generation(&self) -> u64 {
        self.slot.lock().generation
    }

    fn newer_than(&self, last_seen: u64) -> Option<(Frame, u64)> {
        let slot = self.slot.lock();
        if slot.generation == last_seen {
            return None;
        }
        slot.frame.clone().map(|frame| (frame, slot.generation))
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for FrameBuffer {
    fn write_frame(&self, jpeg: Bytes) {
        self.publish(Frame::new(jpeg));
    }
}
