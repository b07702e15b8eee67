//! Session context owning the playback synchronization pieces
//!
//! One [`PlaybackSession`] per emulation session ties the audio channel,
//! the frame pacer and the rewind ring to a single per-frame entry point,
//! replacing what would otherwise be a set of process-wide globals. The
//! main loop calls [`frame_tick`](PlaybackSession::frame_tick) once per
//! emulated frame; the audio engine drains the channel handle on its own
//! thread.

use std::sync::Arc;

use crate::audio::{AudioChannel, PushMode};
use crate::config::SyncConfig;
use crate::pacing::{Clock, FramePacer, WallClock, WindowReport, WINDOW_FRAMES};
use crate::rewind::{RewindRing, StateSnapshot};
use crate::Result;

/// Per-session playback synchronization state.
///
/// Owned by the main emulation thread. The only piece shared with another
/// thread is the audio channel, handed out through
/// [`channel`](Self::channel).
pub struct PlaybackSession<C: Clock = WallClock> {
    channel: Arc<AudioChannel>,
    pacer: FramePacer,
    rewind: Option<RewindRing>,
    clock: C,
    config: SyncConfig,
    frame_in_window: u32,
    paused: bool,
    last_report: WindowReport,
}

impl PlaybackSession<WallClock> {
    /// Create a session from `config` (sanitized first) using the wall
    /// clock.
    pub fn new(config: SyncConfig) -> Self {
        Self::with_clock(config, WallClock::new())
    }
}

impl<C: Clock> PlaybackSession<C> {
    /// Create a session driven by an explicit clock.
    pub fn with_clock(config: SyncConfig, clock: C) -> Self {
        let config = config.sanitize();
        let rewind = config.rewind_enabled().then(|| {
            RewindRing::new(
                config.rewind_depth,
                config.rewind_slot_size,
                config.rewind_interval_ticks(),
            )
        });
        let pacer = FramePacer::new(config.pacer_config(), &clock);
        PlaybackSession {
            channel: AudioChannel::with_default_capacity(),
            pacer,
            rewind,
            clock,
            config,
            frame_in_window: 0,
            paused: false,
            last_report: WindowReport::default(),
        }
    }

    /// Handle for the consumer side: the platform audio engine (or the
    /// rodio device) drains this from its own thread.
    pub fn channel(&self) -> Arc<AudioChannel> {
        Arc::clone(&self.channel)
    }

    /// The sanitized configuration this session runs with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Bytes of audio the emulation core must synthesize per frame.
    pub fn frame_bytes(&self) -> usize {
        self.config.quality.frame_bytes()
    }

    /// Per-frame entry point, called from the main loop after one frame of
    /// emulation: window accounting and throttle sleep every
    /// [`WINDOW_FRAMES`] frames, a rewind snapshot when one is due, then
    /// the frame's audio into the channel.
    ///
    /// Under normal play the audio push blocks on the consumer draining;
    /// with fast-forward engaged or throttle pacing configured it drops
    /// whatever does not fit instead.
    pub fn frame_tick<S: StateSnapshot + ?Sized>(
        &mut self,
        machine: &mut S,
        audio_frame: &[u8],
    ) -> Result<()> {
        self.frame_in_window += 1;
        if self.frame_in_window >= WINDOW_FRAMES {
            self.frame_in_window = 0;
            self.last_report = self.pacer.end_of_window(&self.clock);
            if let Some(rewind) = &mut self.rewind {
                rewind.tick();
            }
        }

        if let Some(rewind) = &mut self.rewind {
            if rewind.save_pending() {
                rewind.save(machine)?;
            }
        }

        self.channel.push_frame(audio_frame, self.push_mode());
        Ok(())
    }

    /// Whether the upcoming frame should be rendered at the current skip
    /// level.
    pub fn should_render(&mut self) -> bool {
        self.pacer.should_render()
    }

    /// Pop the most recent rewind snapshot back into the machine. Returns
    /// `Ok(false)` when rewind is disabled or no snapshot is stored.
    pub fn rewind<S: StateSnapshot + ?Sized>(&mut self, machine: &mut S) -> Result<bool> {
        match &mut self.rewind {
            Some(ring) => ring.restore(machine),
            None => Ok(false),
        }
    }

    /// Number of rewind snapshots currently available.
    pub fn rewind_len(&self) -> usize {
        self.rewind.as_ref().map_or(0, RewindRing::len)
    }

    /// Pause or resume. The paused interval is not charged to the pacer's
    /// measurement window.
    pub fn pause(&mut self, paused: bool) {
        self.paused = paused;
        if paused {
            self.pacer.note_paused();
        }
    }

    /// Whether the session is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Engage or release fast-forward: audio stops blocking and the
    /// throttle stops sleeping.
    pub fn set_fast_forward(&mut self, on: bool) {
        self.pacer.set_fast_forward(on);
    }

    /// Whether fast-forward is engaged.
    pub fn fast_forward(&self) -> bool {
        self.pacer.fast_forward()
    }

    /// Mutable access to the pacer for runtime setting changes.
    pub fn pacer_mut(&mut self) -> &mut FramePacer {
        &mut self.pacer
    }

    /// The most recent window's measurements, for speed display.
    pub fn window_report(&self) -> WindowReport {
        self.last_report
    }

    /// Tear the session down: close the channel so a producer blocked
    /// mid-frame wakes up and the output callback starts delivering
    /// silence.
    pub fn shutdown(&self) {
        self.channel.close();
    }

    fn push_mode(&self) -> PushMode {
        if self.pacer.fast_forward() || self.pacer.throttle_enabled() {
            PushMode::NonBlocking
        } else {
            PushMode::Blocking
        }
    }
}

impl<C: Clock> Drop for PlaybackSession<C> {
    fn drop(&mut self) {
        self.channel.close();
    }
}
