//! Bounded audio channel between the emulation loop and the output callback
//!
//! One mutex and one condition variable guard the byte ring. The producer
//! (the emulation loop, once per frame) is the only party that ever blocks;
//! the consumer (the platform audio engine's callback thread) never does.
//! The channel is owned by the session context rather than living in
//! process-wide state, and exposes both a blocking send and a lossy
//! non-blocking send for fast-forward operation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use parking_lot::{Condvar, Mutex};

use super::ring_buffer::{ByteRing, RING_CAPACITY};

/// How long the consumer waits for the lock before delivering silence
/// instead of stalling the platform's realtime audio thread.
const FILL_LOCK_TIMEOUT: Duration = Duration::from_millis(1);

/// Producer behavior when the ring has no room left for the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushMode {
    /// Wait for the consumer to drain (normal play). Backpressure from the
    /// output callback is what paces the emulation loop in this mode.
    Blocking,
    /// Discard whatever does not fit (fast-forward, or throttle-paced play
    /// where sleeping replaces audio-driven pacing). Accepted audio
    /// degradation in exchange for maximum emulation speed.
    NonBlocking,
}

/// Delivery and drop counters, readable from any thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Bytes accepted into the ring by the producer.
    pub pushed_bytes: u64,
    /// Bytes silently discarded on the non-blocking path.
    pub dropped_bytes: u64,
    /// Bytes handed to the output callback.
    pub delivered_bytes: u64,
}

/// Bounded byte channel with blocking backpressure.
///
/// Bytes come out in exactly the order they were pushed (strict FIFO); no
/// reordering or priority is ever applied.
pub struct AudioChannel {
    ring: Mutex<ByteRing>,
    space_available: Condvar,
    active: AtomicBool,
    pushed_bytes: AtomicU64,
    dropped_bytes: AtomicU64,
    delivered_bytes: AtomicU64,
}

impl AudioChannel {
    /// Create an active channel with `capacity` usable ring bytes.
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(AudioChannel {
            ring: Mutex::new(ByteRing::new(capacity)),
            space_available: Condvar::new(),
            active: AtomicBool::new(true),
            pushed_bytes: AtomicU64::new(0),
            dropped_bytes: AtomicU64::new(0),
            delivered_bytes: AtomicU64::new(0),
        })
    }

    /// Create a channel with the default ring capacity.
    pub fn with_default_capacity() -> Arc<Self> {
        Self::new(RING_CAPACITY)
    }

    /// Whether the session is still feeding this channel.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Push one frame's audio into the ring, observing backpressure.
    ///
    /// In [`PushMode::Blocking`] the call writes what fits, then waits on
    /// the consumer signaling freed space, until the whole frame is in. In
    /// [`PushMode::NonBlocking`] it writes what fits and discards the rest
    /// without ever waiting. Returns the number of bytes actually written.
    ///
    /// A producer blocked here is woken by [`close`](Self::close) on
    /// session teardown and returns early with a partial count.
    pub fn push_frame(&self, frame: &[u8], mode: PushMode) -> usize {
        if frame.is_empty() {
            return 0;
        }

        let mut ring = self.ring.lock();
        let mut offset = 0;

        // Phase 1: the remainder does not fit into the current free space.
        // Fill the ring completely, then either wait for the consumer or
        // bail out, dropping the tail.
        while frame.len() - offset >= ring.free() {
            let take = ring.free();
            ring.write(&frame[offset..offset + take]);
            offset += take;

            if !self.is_active() || mode == PushMode::NonBlocking {
                drop(ring);
                let dropped = frame.len() - offset;
                if dropped > 0 {
                    self.dropped_bytes.fetch_add(dropped as u64, Ordering::Relaxed);
                    debug!("audio ring full, dropped {dropped} bytes");
                }
                self.pushed_bytes.fetch_add(offset as u64, Ordering::Relaxed);
                return offset;
            }
            self.space_available.wait(&mut ring);
        }

        // Phase 2: the final chunk fits as-is.
        ring.write(&frame[offset..]);
        drop(ring);
        self.pushed_bytes.fetch_add(frame.len() as u64, Ordering::Relaxed);
        frame.len()
    }

    /// Drain buffered audio into `dst`: the output callback.
    ///
    /// Invoked by the platform audio engine on its own thread. Never
    /// blocks: the lock acquisition is bounded, the request is clamped to
    /// what is buffered, and an underrun simply returns fewer bytes than
    /// requested (the engine substitutes silence for the rest). Returns the
    /// number of bytes delivered.
    pub fn fill(&self, dst: &mut [u8]) -> usize {
        if dst.is_empty() || !self.is_active() {
            return 0;
        }

        let Some(mut ring) = self.ring.try_lock_for(FILL_LOCK_TIMEOUT) else {
            return 0;
        };
        let len = dst.len().min(ring.used());
        ring.read(&mut dst[..len]);
        self.space_available.notify_one();
        drop(ring);

        self.delivered_bytes.fetch_add(len as u64, Ordering::Relaxed);
        len
    }

    /// Bytes currently buffered.
    pub fn used(&self) -> usize {
        self.ring.lock().used()
    }

    /// Bytes the producer could write right now without waiting.
    pub fn free(&self) -> usize {
        self.ring.lock().free()
    }

    /// Snapshot of the delivery counters.
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            pushed_bytes: self.pushed_bytes.load(Ordering::Relaxed),
            dropped_bytes: self.dropped_bytes.load(Ordering::Relaxed),
            delivered_bytes: self.delivered_bytes.load(Ordering::Relaxed),
        }
    }

    /// Shut the channel down and wake any producer blocked mid-frame.
    ///
    /// After this, `push_frame` never waits and `fill` delivers nothing.
    pub fn close(&self) {
        // Flip the flag under the lock so a producer between its free-space
        // check and its wait cannot miss the wakeup.
        let _ring = self.ring.lock();
        self.active.store(false, Ordering::Release);
        self.space_available.notify_all();
    }
}
