//! Rewind snapshot ring
//!
//! Fixed-depth circular log of full machine-state images, written every few
//! pacing ticks and poppable on demand. Newest-in, newest-out: a restore
//! pops the most recent snapshot, and once the ring is full each new save
//! evicts the oldest entry. Everything here runs on the main emulation
//! thread; snapshots are copied in and out synchronously and no reference
//! into emulator-owned memory outlives a call.

use log::info;

use crate::Result;

/// Default number of retained snapshots.
pub const DEFAULT_REWIND_DEPTH: usize = 8;

/// Default per-slot image size in bytes.
pub const DEFAULT_SLOT_SIZE: usize = 400_000;

/// Emulation-core boundary for whole-machine state images.
///
/// Images are opaque to this crate and fixed-size per emulated platform;
/// they live only in memory and vanish with the session.
pub trait StateSnapshot {
    /// Serialize the full machine state into `out`.
    fn save_state(&self, out: &mut [u8]) -> Result<()>;

    /// Restore the machine from a previously saved image.
    fn load_state(&mut self, data: &[u8]) -> Result<()>;
}

/// Bounded ring of machine-state snapshots with oldest-first eviction.
pub struct RewindRing {
    slots: Vec<Box<[u8]>>,
    write_pos: usize,
    oldest_pos: usize,
    stored: usize,
    interval_ticks: u32,
    ticks_since_snapshot: u32,
    save_pending: bool,
}

impl RewindRing {
    /// Create a ring of `depth` slots of `slot_size` bytes each, snapshotting
    /// every `interval_ticks` pacing ticks. All slot memory is allocated up
    /// front. Zero parameters are lifted to 1; disabling rewind entirely is
    /// the configuration layer's job.
    pub fn new(depth: usize, slot_size: usize, interval_ticks: u32) -> Self {
        let depth = depth.max(1);
        let slot_size = slot_size.max(1);
        RewindRing {
            slots: (0..depth)
                .map(|_| vec![0u8; slot_size].into_boxed_slice())
                .collect(),
            write_pos: 0,
            oldest_pos: 0,
            stored: 0,
            interval_ticks: interval_ticks.max(1),
            ticks_since_snapshot: 0,
            save_pending: false,
        }
    }

    /// Per-tick accounting: once `interval_ticks` ticks have elapsed, flag
    /// a pending save and restart the count. Returns whether a save is now
    /// pending. The save itself happens later, outside the timing window,
    /// via [`save`](Self::save).
    pub fn tick(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.interval_ticks {
            self.ticks_since_snapshot = 0;
            self.save_pending = true;
        }
        self.save_pending
    }

    /// Whether [`tick`](Self::tick) has flagged a save since the last one.
    pub fn save_pending(&self) -> bool {
        self.save_pending
    }

    /// Serialize `state` into the next slot. On success the newest write
    /// evicts the oldest entry once the ring is at capacity; on failure the
    /// cursors are untouched (the pending flag clears either way).
    pub fn save<S: StateSnapshot + ?Sized>(&mut self, state: &S) -> Result<()> {
        self.save_pending = false;
        let depth = self.slots.len();
        state.save_state(&mut self.slots[self.write_pos])?;
        if self.stored == depth {
            self.oldest_pos = (self.oldest_pos + 1) % depth;
        } else {
            self.stored += 1;
        }
        self.write_pos = (self.write_pos + 1) % depth;
        Ok(())
    }

    /// Pop the most recent snapshot back into `state`.
    ///
    /// Returns `Ok(false)` without touching anything when the ring is
    /// empty; an exhausted rewind history is a normal condition, not an
    /// error.
    pub fn restore<S: StateSnapshot + ?Sized>(&mut self, state: &mut S) -> Result<bool> {
        if self.stored == 0 {
            info!("rewind requested with no snapshots stored");
            return Ok(false);
        }
        let depth = self.slots.len();
        let pos = (self.write_pos + depth - 1) % depth;
        state.load_state(&self.slots[pos])?;
        self.write_pos = pos;
        self.stored -= 1;
        self.ticks_since_snapshot = 0;
        Ok(true)
    }

    /// Number of snapshots currently stored.
    pub fn len(&self) -> usize {
        self.stored
    }

    /// Whether no snapshots are stored.
    pub fn is_empty(&self) -> bool {
        self.stored == 0
    }

    /// Number of slots in the ring.
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Bytes held by the preallocated slot storage.
    pub fn memory_usage(&self) -> usize {
        self.slots.iter().map(|s| s.len()).sum()
    }

    /// Stored snapshot images, oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &[u8]> {
        let depth = self.slots.len();
        (0..self.stored).map(move |i| &*self.slots[(self.oldest_pos + i) % depth])
    }

    /// Forget all stored snapshots and restart the interval count.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.oldest_pos = 0;
        self.stored = 0;
        self.ticks_since_snapshot = 0;
        self.save_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Machine whose whole state is one counter byte.
    struct Counter {
        value: u8,
    }

    impl StateSnapshot for Counter {
        fn save_state(&self, out: &mut [u8]) -> Result<()> {
            out[0] = self.value;
            Ok(())
        }

        fn load_state(&mut self, data: &[u8]) -> Result<()> {
            self.value = data[0];
            Ok(())
        }
    }

    struct FailingMachine;

    impl StateSnapshot for FailingMachine {
        fn save_state(&self, _out: &mut [u8]) -> Result<()> {
            Err(crate::PlaysyncError::SnapshotError("save failed".into()))
        }

        fn load_state(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_tick_flags_save_at_interval() {
        let mut ring = RewindRing::new(8, 16, 6);
        for _ in 0..5 {
            assert!(!ring.tick());
        }
        assert!(ring.tick());
        assert!(ring.save_pending());
    }

    #[test]
    fn test_ninth_save_evicts_first() {
        let mut ring = RewindRing::new(8, 16, 1);
        let mut machine = Counter { value: 0 };

        for value in 1..=9 {
            machine.value = value;
            ring.save(&machine).unwrap();
        }
        assert_eq!(ring.len(), 8);

        // Save #1 was evicted: the oldest surviving image is save #2.
        let oldest = ring.snapshots().next().unwrap();
        assert_eq!(oldest[0], 2);

        // A restore pops exactly the 9th save.
        let mut restored = Counter { value: 0 };
        assert!(ring.restore(&mut restored).unwrap());
        assert_eq!(restored.value, 9);
        assert_eq!(ring.len(), 7);
    }

    #[test]
    fn test_restore_pops_newest_first() {
        let mut ring = RewindRing::new(8, 16, 1);
        let mut machine = Counter { value: 0 };
        for value in 1..=3 {
            machine.value = value;
            ring.save(&machine).unwrap();
        }

        for expected in (1..=3).rev() {
            assert!(ring.restore(&mut machine).unwrap());
            assert_eq!(machine.value, expected);
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_empty_restore_is_noop() {
        let mut ring = RewindRing::new(8, 16, 1);
        let mut machine = Counter { value: 42 };
        assert!(!ring.restore(&mut machine).unwrap());
        assert_eq!(machine.value, 42);
    }

    #[test]
    fn test_failed_save_leaves_cursors_alone() {
        let mut ring = RewindRing::new(8, 16, 1);
        ring.tick();
        assert!(ring.save_pending());

        assert!(ring.save(&FailingMachine).is_err());
        assert_eq!(ring.len(), 0);
        // The pending flag clears even on failure.
        assert!(!ring.save_pending());
    }

    #[test]
    fn test_restore_resets_interval_count() {
        let mut ring = RewindRing::new(8, 16, 6);
        let mut machine = Counter { value: 1 };
        ring.save(&machine).unwrap();

        for _ in 0..5 {
            ring.tick();
        }
        ring.restore(&mut machine).unwrap();
        // The partial interval restarted: five more ticks are not enough.
        for _ in 0..5 {
            assert!(!ring.tick());
        }
        assert!(ring.tick());
    }

    #[test]
    fn test_memory_usage_counts_all_slots() {
        let ring = RewindRing::new(4, 100, 1);
        assert_eq!(ring.memory_usage(), 400);
        assert_eq!(ring.depth(), 4);
    }
}
