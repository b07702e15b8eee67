//! Auto-frameskip controller
//!
//! Damped integral controller over the measured emulation speed: a single
//! slow or fast window never moves the skip level; the accumulator has to
//! drift across a threshold first, which keeps the level from oscillating
//! between adjacent values.

/// Highest number of frames skipped between rendered frames.
pub const MAX_SKIP_LEVEL: u32 = 9;

/// Speed percentage at and above which the window counts as full native
/// speed.
const SPEED_FULL_PERCENT: i64 = 98;

/// Below this speed the accumulator drains faster the worse the lag.
const SPEED_LAG_PERCENT: i64 = 80;

/// Consecutive full-speed windows required before rendering more frames.
const RELAX_WINDOWS: i64 = 3;

/// Accumulator floor that triggers one more skipped frame.
const RAISE_THRESHOLD: i64 = -2;

/// Reference speed of the lag-weighted drain term.
const LAG_REFERENCE_PERCENT: i64 = 90;

/// Divisor of the lag-weighted drain term.
const LAG_DRAIN_DIVISOR: i64 = 5;

/// Skip-level controller state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipController {
    level: u32,
    adjust: i64,
}

impl SkipController {
    /// Create a controller starting at skip level 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current skip level, always in `[0, MAX_SKIP_LEVEL]`.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Feed one window's measured speed (percent of native, 100 = full).
    pub fn update(&mut self, speed_percent: u32) {
        let speed = speed_percent as i64;
        if speed >= SPEED_FULL_PERCENT {
            self.adjust += 1;
            if self.adjust >= RELAX_WINDOWS {
                self.adjust = 0;
                self.level = self.level.saturating_sub(1);
            }
        } else {
            if speed < SPEED_LAG_PERCENT {
                self.adjust -= (LAG_REFERENCE_PERCENT - speed) / LAG_DRAIN_DIVISOR;
            } else if self.level < MAX_SKIP_LEVEL {
                self.adjust -= 1;
            }
            if self.adjust <= RAISE_THRESHOLD {
                self.adjust -= RAISE_THRESHOLD;
                if self.level < MAX_SKIP_LEVEL {
                    self.level += 1;
                }
            }
        }
    }

    /// Reset to level 0 with a drained accumulator.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
