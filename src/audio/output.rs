//! Audio device output using rodio
//!
//! Adapts the playback channel's pull callback to a rodio source. The
//! device owns no threads of its own; rodio's backend thread drains the
//! channel in fixed callback-sized blocks at whatever cadence the platform
//! dictates, substituting silence for whatever the channel cannot deliver.

use std::sync::Arc;
use std::time::Duration;

use log::warn;
use rodio::{OutputStream, Sink, Source};

use crate::{PlaysyncError, Result};

use super::channel::AudioChannel;
use super::{StreamParams, BYTES_PER_SAMPLE, CALLBACK_SAMPLES};

/// Pull-model source draining the channel one callback block at a time.
struct ChannelSource {
    channel: Arc<AudioChannel>,
    params: StreamParams,
    block: Vec<u8>,
    block_pos: usize,
}

impl ChannelSource {
    fn new(channel: Arc<AudioChannel>, params: StreamParams) -> Self {
        let block_len = CALLBACK_SAMPLES as usize * params.channels as usize * BYTES_PER_SAMPLE;
        ChannelSource {
            channel,
            params,
            block: vec![0u8; block_len],
            block_pos: block_len,
        }
    }

    fn refill(&mut self) {
        let got = self.channel.fill(&mut self.block);
        // Underrun: the unfilled remainder plays as silence.
        self.block[got..].fill(0);
        self.block_pos = 0;
    }
}

impl Iterator for ChannelSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.block_pos >= self.block.len() {
            if !self.channel.is_active() {
                // Session shut down: end the stream instead of playing
                // silence forever.
                return None;
            }
            self.refill();
        }

        let sample = i16::from_ne_bytes([self.block[self.block_pos], self.block[self.block_pos + 1]]);
        self.block_pos += 2;
        Some(sample)
    }
}

impl Source for ChannelSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.params.channels
    }

    fn sample_rate(&self) -> u32 {
        self.params.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Audio playback device.
///
/// Keeps the OS output stream alive while it exists; dropping the device
/// stops playback.
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
}

impl AudioDevice {
    /// Open the default output device and start draining `channel`.
    pub fn new(params: StreamParams, channel: Arc<AudioChannel>) -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default().map_err(|e| {
            PlaysyncError::AudioDeviceError(format!("failed to open output stream: {e}"))
        })?;

        let sink = Sink::try_new(&stream_handle).map_err(|e| {
            PlaysyncError::AudioDeviceError(format!("failed to create audio sink: {e}"))
        })?;

        sink.append(ChannelSource::new(channel, params));

        Ok(AudioDevice {
            _stream: stream,
            sink,
        })
    }

    /// Open the default output device, degrading to silent operation when
    /// none is usable (device busy, unsupported format). The failure is
    /// reported once and is never fatal to emulation.
    pub fn open_or_silent(params: StreamParams, channel: Arc<AudioChannel>) -> Option<Self> {
        match Self::new(params, channel) {
            Ok(device) => Some(device),
            Err(e) => {
                warn!("audio output unavailable, continuing without sound: {e}");
                None
            }
        }
    }

    /// Pause playback (the channel keeps buffering).
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback after a pause.
    pub fn resume(&self) {
        self.sink.play();
    }
}
