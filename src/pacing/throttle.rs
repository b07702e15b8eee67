//! Fixed-rate throttle
//!
//! Caps emulation speed at a configured percentage of native speed by
//! sleeping off the surplus at the end of each measurement window. The
//! sleep is an OS-granularity delay, not a busy wait, and is skipped
//! entirely during fast-forward.

use std::time::Duration;

use super::WINDOW_FRAMES;

/// Wall-clock baseline of the current throttle window.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleTimer {
    last_micros: u64,
}

impl ThrottleTimer {
    /// Start a window at `now_micros`.
    pub fn new(now_micros: u64) -> Self {
        ThrottleTimer { last_micros: now_micros }
    }

    /// Window budget in microseconds for running at `percent` of native
    /// speed: one window of frames at the native rate, scaled by the
    /// target multiplier.
    pub fn target_micros(frame_rate: u32, percent: u32) -> u64 {
        debug_assert!(frame_rate > 0 && percent > 0);
        (WINDOW_FRAMES as u64 * 1_000_000 * 100) / (frame_rate as u64 * percent as u64)
    }

    /// How far the window finished ahead of its budget; zero when the
    /// emulation is at or behind target. Never negative.
    pub fn deficit(&self, now_micros: u64, target_micros: u64) -> Duration {
        let elapsed = now_micros.saturating_sub(self.last_micros);
        Duration::from_micros(target_micros.saturating_sub(elapsed))
    }

    /// Restart the window. Called with a fresh clock reading taken after
    /// any throttle sleep, so the sleep itself is not charged to the next
    /// window.
    pub fn rebaseline(&mut self, now_micros: u64) {
        self.last_micros = now_micros;
    }
}
