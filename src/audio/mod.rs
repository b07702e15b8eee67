//! Buffered audio output
//!
//! The producer side runs on the emulation thread and pushes one frame's
//! worth of freshly synthesized samples per emulated frame; the consumer
//! side is the platform audio engine's callback, draining on its own thread
//! at a cadence outside this crate's control. A bounded byte channel with a
//! blocking send and a non-blocking (lossy) send sits between the two.

pub mod channel;
#[cfg(feature = "streaming")]
pub mod output;
pub mod ring_buffer;

pub use channel::{AudioChannel, ChannelStats, PushMode};
#[cfg(feature = "streaming")]
pub use output::AudioDevice;
pub use ring_buffer::{ByteRing, RING_ALIGN, RING_CAPACITY};

use serde::{Deserialize, Serialize};

/// Samples delivered per audio engine callback.
pub const CALLBACK_SAMPLES: u16 = 1024;

/// Channel count of the negotiated stream (interleaved stereo).
pub const STREAM_CHANNELS: u16 = 2;

/// Bytes per sample of the negotiated stream (16-bit signed).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Supported output sample rates.
///
/// Each rate is bound to a fixed per-frame byte quantum: the number of bytes
/// of interleaved 16-bit stereo audio the emulation core synthesizes per
/// native frame and hands to [`AudioChannel::push_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundQuality {
    /// 44100 Hz
    Full,
    /// 22050 Hz
    Half,
    /// 11025 Hz
    Quarter,
}

impl SoundQuality {
    /// Sample rate of the output stream in Hz.
    pub fn sample_rate(self) -> u32 {
        match self {
            SoundQuality::Full => 44_100,
            SoundQuality::Half => 22_050,
            SoundQuality::Quarter => 11_025,
        }
    }

    /// Bytes of audio produced per emulated frame at this rate.
    pub fn frame_bytes(self) -> usize {
        match self {
            SoundQuality::Full => 2940,
            SoundQuality::Half => 1472,
            SoundQuality::Quarter => 736,
        }
    }
}

impl Default for SoundQuality {
    fn default() -> Self {
        SoundQuality::Full
    }
}

/// Negotiated parameters of the output stream.
#[derive(Debug, Clone, Copy)]
pub struct StreamParams {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Usable ring capacity in bytes
    pub ring_capacity: usize,
}

impl StreamParams {
    /// Stream parameters for a given quality tier.
    pub fn for_quality(quality: SoundQuality) -> Self {
        StreamParams {
            sample_rate: quality.sample_rate(),
            channels: STREAM_CHANNELS,
            ring_capacity: RING_CAPACITY,
        }
    }

    /// Worst-case buffering latency in milliseconds.
    pub fn latency_ms(&self) -> f32 {
        let bytes_per_second =
            self.sample_rate as f32 * self.channels as f32 * BYTES_PER_SAMPLE as f32;
        (self.ring_capacity as f32 / bytes_per_second) * 1000.0
    }
}

impl Default for StreamParams {
    fn default() -> Self {
        Self::for_quality(SoundQuality::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_quantum_per_rate() {
        assert_eq!(SoundQuality::Full.frame_bytes(), 2940);
        assert_eq!(SoundQuality::Half.frame_bytes(), 1472);
        assert_eq!(SoundQuality::Quarter.frame_bytes(), 736);
    }

    #[test]
    fn test_stream_params_latency() {
        let params = StreamParams::for_quality(SoundQuality::Full);
        // 8192 bytes at 44.1kHz stereo s16 ≈ 46 ms
        let latency = params.latency_ms();
        assert!(latency > 40.0 && latency < 50.0, "latency {latency}");
    }
}
