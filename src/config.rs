//! Synchronization configuration
//!
//! Host-facing knobs for the audio channel, the frame pacer and the rewind
//! ring. Out-of-range values are clamped to safe defaults by
//! [`SyncConfig::sanitize`] before any component sees them; reading and
//! writing an actual configuration file is the host shell's job.

use serde::{Deserialize, Serialize};

use crate::audio::SoundQuality;
use crate::pacing::PacerConfig;
use crate::rewind::{DEFAULT_REWIND_DEPTH, DEFAULT_SLOT_SIZE};

/// Valid throttle targets in percent of native speed.
pub const THROTTLE_RANGE: std::ops::RangeInclusive<u32> = 5..=1000;

/// Longest accepted rewind snapshot interval in seconds.
pub const MAX_REWIND_INTERVAL_SECS: u32 = 600;

/// Pacing ticks (ten-frame windows) per second of native-speed emulation.
const TICKS_PER_SECOND: u32 = 6;

/// Playback synchronization settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Output sample rate tier.
    pub quality: SoundQuality,
    /// Native frame rate of the emulated machine.
    pub frame_rate: u32,
    /// Enable the adaptive frameskip controller.
    pub auto_frameskip: bool,
    /// Speed cap in percent of native speed; 0 disables throttling.
    pub throttle_percent: u32,
    /// Seconds between rewind snapshots; 0 disables rewind.
    pub rewind_interval_secs: u32,
    /// Snapshots retained before the oldest is evicted.
    pub rewind_depth: usize,
    /// Size of one serialized machine-state image in bytes.
    pub rewind_slot_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            quality: SoundQuality::Full,
            frame_rate: 60,
            auto_frameskip: true,
            throttle_percent: 0,
            rewind_interval_secs: 0,
            rewind_depth: DEFAULT_REWIND_DEPTH,
            rewind_slot_size: DEFAULT_SLOT_SIZE,
        }
    }
}

impl SyncConfig {
    /// Clamp out-of-range values to safe defaults.
    ///
    /// A throttle outside [`THROTTLE_RANGE`] is disabled, a rewind interval
    /// beyond [`MAX_REWIND_INTERVAL_SECS`] disables rewind, a zero frame
    /// rate falls back to 60, and a rewind ring with no slots or zero-size
    /// slots is disabled outright.
    pub fn sanitize(mut self) -> Self {
        if !THROTTLE_RANGE.contains(&self.throttle_percent) {
            self.throttle_percent = 0;
        }
        if self.rewind_interval_secs > MAX_REWIND_INTERVAL_SECS {
            self.rewind_interval_secs = 0;
        }
        if self.rewind_depth == 0 || self.rewind_slot_size == 0 {
            self.rewind_interval_secs = 0;
        }
        if self.frame_rate == 0 {
            self.frame_rate = 60;
        }
        self
    }

    /// Whether rewind snapshotting is enabled.
    pub fn rewind_enabled(&self) -> bool {
        self.rewind_interval_secs > 0
    }

    /// Snapshot interval converted to pacing ticks.
    pub fn rewind_interval_ticks(&self) -> u32 {
        self.rewind_interval_secs * TICKS_PER_SECOND
    }

    /// The pacing subset of this configuration.
    pub fn pacer_config(&self) -> PacerConfig {
        PacerConfig {
            frame_rate: self.frame_rate,
            auto_frameskip: self.auto_frameskip,
            throttle_percent: self.throttle_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_throttle_is_disabled() {
        let config = SyncConfig {
            throttle_percent: 4,
            ..SyncConfig::default()
        }
        .sanitize();
        assert_eq!(config.throttle_percent, 0);

        let config = SyncConfig {
            throttle_percent: 1001,
            ..SyncConfig::default()
        }
        .sanitize();
        assert_eq!(config.throttle_percent, 0);

        let config = SyncConfig {
            throttle_percent: 150,
            ..SyncConfig::default()
        }
        .sanitize();
        assert_eq!(config.throttle_percent, 150);
    }

    #[test]
    fn test_rewind_interval_clamps() {
        let config = SyncConfig {
            rewind_interval_secs: 601,
            ..SyncConfig::default()
        }
        .sanitize();
        assert!(!config.rewind_enabled());

        let config = SyncConfig {
            rewind_interval_secs: 10,
            ..SyncConfig::default()
        }
        .sanitize();
        assert!(config.rewind_enabled());
        assert_eq!(config.rewind_interval_ticks(), 60);
    }

    #[test]
    fn test_degenerate_rewind_ring_disables_rewind() {
        let config = SyncConfig {
            rewind_interval_secs: 10,
            rewind_slot_size: 0,
            ..SyncConfig::default()
        }
        .sanitize();
        assert!(!config.rewind_enabled());
    }

    #[test]
    fn test_zero_frame_rate_falls_back() {
        let config = SyncConfig {
            frame_rate: 0,
            ..SyncConfig::default()
        }
        .sanitize();
        assert_eq!(config.frame_rate, 60);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"throttle_percent": 200, "quality": "Half"}"#).unwrap();
        assert_eq!(config.throttle_percent, 200);
        assert_eq!(config.quality, SoundQuality::Half);
        assert_eq!(config.frame_rate, 60);
        assert_eq!(config.rewind_depth, DEFAULT_REWIND_DEPTH);
    }
}
