//! Time management utilities
//!
//! [`FrameClock`] turns wall-clock readings into update steps. In variable
//! mode every tick produces exactly one update with the measured delta. In
//! fixed mode measured time accumulates and one update runs per whole
//! target step, so a tick may run zero, one or several updates.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Deltas this close to the fixed target are treated as exactly the target,
/// so a display running at the target rate never drifts into a double step.
const FIXED_STEP_SNAP: Duration = Duration::from_micros(250);

/// Default upper bound for one measured delta (covers debugger pauses)
pub const DEFAULT_MAX_DELTA: Duration = Duration::from_millis(100);

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Source of monotonic time readings
pub trait TimeSource {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Production time source backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    /// Create a source whose origin is the current instant
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced time source for deterministic stepping.
///
/// Clones share the same reading, so a test can keep one handle and give the
/// other to a [`FrameClock`].
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Rc<Cell<Duration>>,
}

impl ManualTime {
    /// Create a source reading zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// How measured time is converted into update steps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimestepMode {
    /// One update per tick with the measured delta
    Variable,
    /// Updates of exactly `target_seconds`, with sub-step time carried over
    Fixed {
        /// Length of one update step in seconds
        target_seconds: f64,
    },
}

impl Default for TimestepMode {
    fn default() -> Self {
        Self::Variable
    }
}

/// Update steps produced by one [`FrameClock::advance`] call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSteps {
    /// Number of updates to run this tick
    pub updates: u32,
    /// Elapsed seconds each of those updates should observe
    pub elapsed_seconds: f64,
}

/// Frame clock with elapsed/total bookkeeping and FPS tracking
pub struct FrameClock<T: TimeSource = MonotonicTime> {
    source: T,
    fixed_target: Option<Duration>,
    max_delta: Duration,

    last_time: Duration,
    leftover: Duration,

    elapsed: Duration,
    total: Duration,
    frame_count: u64,

    frames_this_second: u32,
    second_counter: Duration,
    frames_per_second: u32,
}

impl FrameClock<MonotonicTime> {
    /// Create a clock reading real time
    pub fn new(mode: TimestepMode, max_delta: Duration) -> Self {
        Self::with_source(MonotonicTime::new(), mode, max_delta)
    }
}

impl<T: TimeSource> FrameClock<T> {
    /// Create a clock reading from a custom time source.
    ///
    /// A fixed target that is not a positive finite number of seconds falls
    /// back to variable stepping.
    pub fn with_source(source: T, mode: TimestepMode, max_delta: Duration) -> Self {
        let last_time = source.now();
        Self {
            source,
            fixed_target: fixed_target(mode),
            max_delta,
            last_time,
            leftover: Duration::ZERO,
            elapsed: Duration::ZERO,
            total: Duration::ZERO,
            frame_count: 0,
            frames_this_second: 0,
            second_counter: Duration::ZERO,
            frames_per_second: 0,
        }
    }

    /// Switch between variable and fixed stepping
    pub fn set_mode(&mut self, mode: TimestepMode) {
        self.fixed_target = fixed_target(mode);
        self.leftover = Duration::ZERO;
    }

    /// Current stepping mode
    pub fn mode(&self) -> TimestepMode {
        match self.fixed_target {
            Some(target) => TimestepMode::Fixed { target_seconds: target.as_secs_f64() },
            None => TimestepMode::Variable,
        }
    }

    /// Read the time source and account for the time since the last call
    pub fn advance(&mut self) -> TickSteps {
        let now = self.source.now();
        let mut delta = now.saturating_sub(self.last_time);
        self.last_time = now;

        self.second_counter += delta;
        delta = delta.min(self.max_delta);

        let updates = match self.fixed_target {
            None => {
                self.elapsed = delta;
                self.total += delta;
                self.leftover = Duration::ZERO;
                self.frame_count += 1;
                1
            }
            Some(target) => {
                if abs_diff(delta, target) < FIXED_STEP_SNAP {
                    delta = target;
                }

                self.leftover += delta;
                let mut updates = 0;
                while self.leftover >= target {
                    self.elapsed = target;
                    self.total += target;
                    self.leftover -= target;
                    self.frame_count += 1;
                    updates += 1;
                }
                updates
            }
        };

        if updates > 0 {
            self.frames_this_second += 1;
        }

        if self.second_counter >= ONE_SECOND {
            self.frames_per_second = self.frames_this_second;
            self.frames_this_second = 0;
            self.second_counter = Duration::from_nanos(u64::from(self.second_counter.subsec_nanos()));
        }

        TickSteps {
            updates,
            elapsed_seconds: self.elapsed.as_secs_f64(),
        }
    }

    /// Restart the elapsed-time baseline.
    ///
    /// Call after an intentional pause (suspend, blocking load) so the next
    /// tick does not report the pause as one huge delta.
    pub fn reset_elapsed_time(&mut self) {
        self.last_time = self.source.now();
        self.leftover = Duration::ZERO;
        self.frames_per_second = 0;
        self.frames_this_second = 0;
        self.second_counter = Duration::ZERO;
    }

    /// Elapsed seconds observed by the most recent update
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Total simulated seconds across all updates
    pub fn total_seconds(&self) -> f64 {
        self.total.as_secs_f64()
    }

    /// Number of updates run since the clock was created
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Ticks that ran at least one update during the last full second
    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }
}

fn fixed_target(mode: TimestepMode) -> Option<Duration> {
    match mode {
        TimestepMode::Variable => None,
        TimestepMode::Fixed { target_seconds } => Duration::try_from_secs_f64(target_seconds)
            .ok()
            .filter(|target| !target.is_zero()),
    }
}

fn abs_diff(a: Duration, b: Duration) -> Duration {
    if a > b { a - b } else { b - a }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn manual_clock(mode: TimestepMode) -> (ManualTime, FrameClock<ManualTime>) {
        let time = ManualTime::new();
        let clock = FrameClock::with_source(time.clone(), mode, DEFAULT_MAX_DELTA);
        (time, clock)
    }

    #[test]
    fn test_new_clock_has_no_frames() {
        let (_time, clock) = manual_clock(TimestepMode::Variable);
        assert_eq!(clock.frame_count(), 0);
        assert_eq!(clock.total_seconds(), 0.0);
    }

    #[test]
    fn test_variable_step_runs_one_update_with_measured_delta() {
        let (time, mut clock) = manual_clock(TimestepMode::Variable);

        time.advance(Duration::from_millis(16));
        let steps = clock.advance();

        assert_eq!(steps.updates, 1);
        assert_relative_eq!(steps.elapsed_seconds, 0.016, epsilon = 1e-9);
        assert_eq!(clock.frame_count(), 1);
    }

    /// A zero-length tick still counts as an update in variable mode
    #[test]
    fn test_variable_step_with_zero_delta() {
        let (_time, mut clock) = manual_clock(TimestepMode::Variable);
        let steps = clock.advance();
        assert_eq!(steps.updates, 1);
        assert_eq!(steps.elapsed_seconds, 0.0);
    }

    #[test]
    fn test_long_pause_is_clamped() {
        let (time, mut clock) = manual_clock(TimestepMode::Variable);

        time.advance(Duration::from_secs(5));
        let steps = clock.advance();

        assert_relative_eq!(steps.elapsed_seconds, 0.1, epsilon = 1e-9);
        assert_relative_eq!(clock.total_seconds(), 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_fixed_step_accumulates_partial_time() {
        let (time, mut clock) = manual_clock(TimestepMode::Fixed { target_seconds: 0.010 });

        time.advance(Duration::from_millis(4));
        assert_eq!(clock.advance().updates, 0);
        assert_eq!(clock.frame_count(), 0);

        time.advance(Duration::from_millis(4));
        assert_eq!(clock.advance().updates, 0);

        // 8ms carried + 4ms measured
        time.advance(Duration::from_millis(4));
        let steps = clock.advance();
        assert_eq!(steps.updates, 1);
        assert_relative_eq!(steps.elapsed_seconds, 0.010, epsilon = 1e-9);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn test_fixed_step_catches_up_with_several_updates() {
        let (time, mut clock) = manual_clock(TimestepMode::Fixed { target_seconds: 0.010 });

        time.advance(Duration::from_millis(35));
        let steps = clock.advance();

        assert_eq!(steps.updates, 3);
        assert_eq!(clock.frame_count(), 3);
        assert_relative_eq!(clock.total_seconds(), 0.030, epsilon = 1e-9);
    }

    #[test]
    fn test_fixed_step_catch_up_is_bounded_by_max_delta() {
        let (time, mut clock) = manual_clock(TimestepMode::Fixed { target_seconds: 0.010 });

        time.advance(Duration::from_secs(3));
        assert_eq!(clock.advance().updates, 10);
    }

    /// A 60 Hz display reporting slightly short frames still steps once per frame
    #[test]
    fn test_fixed_step_snaps_near_target_deltas() {
        let (time, mut clock) = manual_clock(TimestepMode::Fixed { target_seconds: 1.0 / 60.0 });

        for _ in 0..120 {
            time.advance(Duration::from_micros(16_600));
            assert_eq!(clock.advance().updates, 1);
        }
        assert_eq!(clock.frame_count(), 120);
    }

    #[test]
    fn test_invalid_fixed_target_falls_back_to_variable() {
        let (_time, clock) = manual_clock(TimestepMode::Fixed { target_seconds: 0.0 });
        assert_eq!(clock.mode(), TimestepMode::Variable);

        let (_time, clock) = manual_clock(TimestepMode::Fixed { target_seconds: -1.0 });
        assert_eq!(clock.mode(), TimestepMode::Variable);
    }

    #[test]
    fn test_reset_elapsed_time_discards_pause() {
        let (time, mut clock) = manual_clock(TimestepMode::Variable);

        time.advance(Duration::from_millis(16));
        clock.advance();

        // Suspended for a while, then resumed
        time.advance(Duration::from_secs(30));
        clock.reset_elapsed_time();

        time.advance(Duration::from_millis(5));
        let steps = clock.advance();
        assert_relative_eq!(steps.elapsed_seconds, 0.005, epsilon = 1e-9);
    }

    #[test]
    fn test_reset_elapsed_time_drops_fixed_remainder() {
        let (time, mut clock) = manual_clock(TimestepMode::Fixed { target_seconds: 0.010 });

        time.advance(Duration::from_millis(9));
        assert_eq!(clock.advance().updates, 0);

        clock.reset_elapsed_time();
        time.advance(Duration::from_millis(2));
        assert_eq!(clock.advance().updates, 0);
    }

    #[test]
    fn test_frames_per_second_counts_ticks_over_a_second() {
        let (time, mut clock) = manual_clock(TimestepMode::Variable);

        for _ in 0..50 {
            time.advance(Duration::from_millis(20));
            clock.advance();
        }
        assert_eq!(clock.frames_per_second(), 50);
    }
}
