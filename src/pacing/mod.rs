//! Adaptive frame pacing
//!
//! Two independent mechanisms share one measurement cadence of
//! [`WINDOW_FRAMES`] native frames:
//! - **auto-frameskip** renders fewer of the emulated frames when the host
//!   falls behind, and more again as headroom appears ([`frameskip`]);
//! - **throttle** caps emulation speed at a configured percentage of native
//!   speed by sleeping off the surplus ([`throttle`]).
//!
//! Both tolerate the emulation being paused mid-window: the gap is never
//! charged as lag, the pacer simply re-baselines on the next window.

pub mod frameskip;
pub mod throttle;

pub use frameskip::{SkipController, MAX_SKIP_LEVEL};
pub use throttle::ThrottleTimer;

use std::time::{Duration, Instant};

/// Native frames per measurement window.
pub const WINDOW_FRAMES: u32 = 10;

/// Wall-clock microsecond source.
///
/// The emulation core (or the host shell) supplies the clock; tests drive
/// the pacer with a manual one.
pub trait Clock {
    /// Monotonic microseconds since an arbitrary origin.
    fn now_micros(&self) -> u64;
}

/// Monotonic production clock.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    /// Create a clock with its origin at the call site.
    pub fn new() -> Self {
        WallClock { origin: Instant::now() }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now_micros(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Static pacing configuration.
#[derive(Debug, Clone, Copy)]
pub struct PacerConfig {
    /// Native frame rate of the emulated machine in frames per second.
    pub frame_rate: u32,
    /// Enable the adaptive frameskip controller.
    pub auto_frameskip: bool,
    /// Speed cap in percent of native speed; 0 disables throttling.
    pub throttle_percent: u32,
}

impl Default for PacerConfig {
    fn default() -> Self {
        PacerConfig {
            frame_rate: 60,
            auto_frameskip: true,
            throttle_percent: 0,
        }
    }
}

/// Outcome of one window evaluation, for display and diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowReport {
    /// Measured speed in percent of native (100 = full speed); zero when
    /// the window was not measured (paused, or frameskip inactive).
    pub speed_percent: u32,
    /// Skip level after this window.
    pub skip_level: u32,
    /// How long the throttle slept at the end of the window.
    pub throttled: Duration,
    /// Frames actually rendered during the window.
    pub rendered_frames: u32,
}

/// Frame pacer: auto-frameskip and throttle state across measurement
/// windows.
///
/// Owned exclusively by the main emulation thread; no locking.
#[derive(Debug)]
pub struct FramePacer {
    config: PacerConfig,
    skip: SkipController,
    throttle: ThrottleTimer,
    last_window_micros: u64,
    was_paused: bool,
    fast_forward: bool,
    render_counter: u32,
    rendered_in_window: u32,
}

impl FramePacer {
    /// Create a pacer with both window baselines at the current clock
    /// reading.
    pub fn new(config: PacerConfig, clock: &impl Clock) -> Self {
        let now = clock.now_micros();
        FramePacer {
            config,
            skip: SkipController::new(),
            throttle: ThrottleTimer::new(now),
            last_window_micros: now,
            was_paused: false,
            fast_forward: false,
            render_counter: 0,
            rendered_in_window: 0,
        }
    }

    /// Current skip level.
    pub fn skip_level(&self) -> u32 {
        self.skip.level()
    }

    /// Whether fast-forward is engaged.
    pub fn fast_forward(&self) -> bool {
        self.fast_forward
    }

    /// Engage or release fast-forward. While engaged the throttle never
    /// sleeps.
    pub fn set_fast_forward(&mut self, on: bool) {
        self.fast_forward = on;
    }

    /// Whether a throttle target is configured.
    pub fn throttle_enabled(&self) -> bool {
        self.config.throttle_percent > 0
    }

    /// Change the throttle target at runtime; 0 disables.
    pub fn set_throttle_percent(&mut self, percent: u32) {
        self.config.throttle_percent = percent;
    }

    /// Enable or disable the frameskip controller. Disabling resets the
    /// skip level so every frame renders again.
    pub fn set_auto_frameskip(&mut self, on: bool) {
        self.config.auto_frameskip = on;
        if !on {
            self.skip.reset();
        }
    }

    /// Record that the emulation was paused. The next window evaluation
    /// skips both mechanisms and re-baselines from the resume timestamp.
    pub fn note_paused(&mut self) {
        self.was_paused = true;
    }

    /// Decide whether the upcoming frame should be rendered at the current
    /// skip level: one rendered frame for every `skip_level` skipped.
    pub fn should_render(&mut self) -> bool {
        if self.render_counter >= self.skip.level() {
            self.render_counter = 0;
            self.rendered_in_window += 1;
            true
        } else {
            self.render_counter += 1;
            false
        }
    }

    /// Per-window accounting, called once every [`WINDOW_FRAMES`] emulated
    /// frames: feed the frameskip controller and sleep off any throttle
    /// surplus. A window that contained a pause is measured by neither
    /// mechanism.
    pub fn end_of_window(&mut self, clock: &impl Clock) -> WindowReport {
        let now = clock.now_micros();
        let mut report = WindowReport {
            skip_level: self.skip.level(),
            rendered_frames: std::mem::take(&mut self.rendered_in_window),
            ..WindowReport::default()
        };

        if !self.was_paused && self.config.auto_frameskip && !self.throttle_enabled() {
            let elapsed = now.saturating_sub(self.last_window_micros);
            let speed = speed_percent(self.window_target_micros(), elapsed);
            self.skip.update(speed);
            report.speed_percent = speed;
            report.skip_level = self.skip.level();
        }

        if !self.was_paused && self.throttle_enabled() {
            if !self.fast_forward {
                let target =
                    ThrottleTimer::target_micros(self.config.frame_rate, self.config.throttle_percent);
                let deficit = self.throttle.deficit(now, target);
                if !deficit.is_zero() {
                    std::thread::sleep(deficit);
                    report.throttled = deficit;
                }
            }
            // Fresh reading so the sleep is not charged to the next window.
            self.throttle.rebaseline(clock.now_micros());
        }

        self.was_paused = false;
        self.last_window_micros = now;
        report
    }

    /// Wall-clock budget of one window at full native speed.
    fn window_target_micros(&self) -> u64 {
        WINDOW_FRAMES as u64 * 1_000_000 / self.config.frame_rate as u64
    }
}

/// Measured speed as a percentage of native; an unmeasurably short window
/// reads as full speed.
fn speed_percent(target_micros: u64, elapsed_micros: u64) -> u32 {
    if elapsed_micros == 0 {
        return 100;
    }
    (target_micros * 100 / elapsed_micros) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct ManualClock {
        micros: Cell<u64>,
    }

    impl ManualClock {
        fn new() -> Self {
            ManualClock { micros: Cell::new(0) }
        }

        fn advance(&self, micros: u64) {
            self.micros.set(self.micros.get() + micros);
        }
    }

    impl Clock for ManualClock {
        fn now_micros(&self) -> u64 {
            self.micros.get()
        }
    }

    fn skip_config() -> PacerConfig {
        PacerConfig {
            frame_rate: 60,
            auto_frameskip: true,
            throttle_percent: 0,
        }
    }

    #[test]
    fn test_full_speed_window_measures_100() {
        let clock = ManualClock::new();
        let mut pacer = FramePacer::new(skip_config(), &clock);

        clock.advance(166_666);
        let report = pacer.end_of_window(&clock);
        assert_eq!(report.speed_percent, 100);
        assert_eq!(report.skip_level, 0);
    }

    #[test]
    fn test_sustained_lag_then_recovery() {
        let clock = ManualClock::new();
        let mut pacer = FramePacer::new(skip_config(), &clock);

        // Two windows at ~85% raise the level to 1.
        for _ in 0..2 {
            clock.advance(196_078);
            pacer.end_of_window(&clock);
        }
        assert_eq!(pacer.skip_level(), 1);

        // Three full-speed windows take back exactly one level.
        for _ in 0..2 {
            clock.advance(166_666);
            assert_eq!(pacer.end_of_window(&clock).skip_level, 1);
        }
        clock.advance(166_666);
        assert_eq!(pacer.end_of_window(&clock).skip_level, 0);
    }

    #[test]
    fn test_heavy_lag_raises_every_window() {
        let clock = ManualClock::new();
        let mut pacer = FramePacer::new(skip_config(), &clock);

        // ~60% of native speed.
        for expected in 1..=3 {
            clock.advance(277_777);
            let report = pacer.end_of_window(&clock);
            assert_eq!(report.skip_level, expected);
        }
    }

    #[test]
    fn test_paused_window_is_not_charged() {
        let clock = ManualClock::new();
        let mut pacer = FramePacer::new(skip_config(), &clock);

        // A long gap that would read as heavy lag, but flagged as paused.
        pacer.note_paused();
        clock.advance(5_000_000);
        let report = pacer.end_of_window(&clock);
        assert_eq!(report.speed_percent, 0);
        assert_eq!(pacer.skip_level(), 0);

        // The baseline moved to the resume point: a normal window after it
        // measures normally.
        clock.advance(166_666);
        let report = pacer.end_of_window(&clock);
        assert_eq!(report.speed_percent, 100);
    }

    #[test]
    fn test_throttle_does_not_sleep_when_behind() {
        let clock = ManualClock::new();
        let mut pacer = FramePacer::new(
            PacerConfig {
                frame_rate: 60,
                auto_frameskip: false,
                throttle_percent: 100,
            },
            &clock,
        );

        // Window slower than the budget: nothing to sleep off.
        clock.advance(200_000);
        let report = pacer.end_of_window(&clock);
        assert_eq!(report.throttled, Duration::ZERO);
    }

    #[test]
    fn test_throttle_sleeps_off_surplus() {
        let clock = ManualClock::new();
        let mut pacer = FramePacer::new(
            PacerConfig {
                frame_rate: 60,
                auto_frameskip: false,
                throttle_percent: 1000,
            },
            &clock,
        );

        // Budget at 1000% is 16_666 µs; a 10_000 µs window sleeps the rest.
        clock.advance(10_000);
        let report = pacer.end_of_window(&clock);
        assert_eq!(report.throttled, Duration::from_micros(6_666));
    }

    #[test]
    fn test_fast_forward_never_throttles() {
        let clock = ManualClock::new();
        let mut pacer = FramePacer::new(
            PacerConfig {
                frame_rate: 60,
                auto_frameskip: false,
                throttle_percent: 100,
            },
            &clock,
        );
        pacer.set_fast_forward(true);

        clock.advance(1_000);
        let report = pacer.end_of_window(&clock);
        assert_eq!(report.throttled, Duration::ZERO);
    }

    #[test]
    fn test_throttle_suppresses_frameskip() {
        let clock = ManualClock::new();
        let mut pacer = FramePacer::new(
            PacerConfig {
                frame_rate: 60,
                auto_frameskip: true,
                throttle_percent: 100,
            },
            &clock,
        );

        // Heavy lag, but throttle pacing owns the window: skip level stays.
        clock.advance(500_000);
        pacer.end_of_window(&clock);
        assert_eq!(pacer.skip_level(), 0);
    }

    #[test]
    fn test_should_render_follows_skip_level() {
        let clock = ManualClock::new();
        let mut pacer = FramePacer::new(skip_config(), &clock);

        // Level 0: every frame renders.
        assert!(pacer.should_render());
        assert!(pacer.should_render());

        // Raise the level to 1: alternate render/skip.
        clock.advance(277_777);
        pacer.end_of_window(&clock);
        assert_eq!(pacer.skip_level(), 1);

        let pattern: Vec<bool> = (0..4).map(|_| pacer.should_render()).collect();
        assert_eq!(pattern, [false, true, false, true]);
    }
}
