//! Playback synchronization core for soft-real-time emulators
//!
//! Keeps an emulation loop synchronized with an asynchronously invoked audio
//! output callback and with wall-clock time. Three mechanisms share one
//! per-frame tick from the main loop:
//! - a bounded audio ring with blocking backpressure ([`audio`])
//! - an adaptive frame pacer combining auto-frameskip and fixed-rate
//!   throttling ([`pacing`])
//! - a fixed-depth rewind snapshot ring ([`rewind`])
//!
//! All three tolerate skipped, paused and fast-forwarded frames, trading
//! strict determinism for real-time behavior: the producer blocks under
//! normal play, drops audio under fast-forward, and the pacer re-baselines
//! after a pause instead of charging the gap as lag.
//!
//! # Crate feature flags
//! - `streaming` (opt-in): rodio-backed audio device output (enables the
//!   optional `rodio` dep)
//!
//! # Quick start
//! ```no_run
//! use playsync::rewind::StateSnapshot;
//! use playsync::{PlaybackSession, Result, SyncConfig};
//!
//! struct Machine {
//!     ram: Vec<u8>,
//! }
//!
//! impl StateSnapshot for Machine {
//!     fn save_state(&self, out: &mut [u8]) -> Result<()> {
//!         out[..self.ram.len()].copy_from_slice(&self.ram);
//!         Ok(())
//!     }
//!     fn load_state(&mut self, data: &[u8]) -> Result<()> {
//!         let len = self.ram.len();
//!         self.ram.copy_from_slice(&data[..len]);
//!         Ok(())
//!     }
//! }
//!
//! let mut machine = Machine { ram: vec![0; 1024] };
//! let mut session = PlaybackSession::new(SyncConfig::default());
//! let audio_frame = vec![0u8; session.frame_bytes()];
//! loop {
//!     // run one frame of emulation, synthesize one audio frame ...
//!     session.frame_tick(&mut machine, &audio_frame).unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod audio;
pub mod config;
pub mod pacing;
pub mod rewind;
pub mod session;

/// Error types for playback synchronization operations
#[derive(thiserror::Error, Debug)]
pub enum PlaysyncError {
    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Snapshot serialization or restore error
    #[error("Snapshot error: {0}")]
    SnapshotError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for PlaysyncError {
    /// Converts a String into `PlaysyncError::Other`.
    ///
    /// Convenience conversion for generic string errors. Prefer the specific
    /// variant constructors where the error class is known:
    /// - `PlaysyncError::AudioDeviceError(msg)` for device initialization
    /// - `PlaysyncError::SnapshotError(msg)` for state save/restore failures
    /// - `PlaysyncError::ConfigError(msg)` for invalid configuration
    fn from(msg: String) -> Self {
        PlaysyncError::Other(msg)
    }
}

impl From<&str> for PlaysyncError {
    /// Converts a string slice into `PlaysyncError::Other`.
    fn from(msg: &str) -> Self {
        PlaysyncError::Other(msg.to_string())
    }
}

/// Result type for playback synchronization operations
pub type Result<T> = std::result::Result<T, PlaysyncError>;

// Public API exports
pub use audio::{AudioChannel, ByteRing, ChannelStats, PushMode, SoundQuality, StreamParams};
pub use config::SyncConfig;
pub use pacing::{Clock, FramePacer, PacerConfig, WallClock, WindowReport};
pub use rewind::{RewindRing, StateSnapshot};
pub use session::PlaybackSession;

#[cfg(feature = "streaming")]
pub use audio::AudioDevice;
