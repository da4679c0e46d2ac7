//! Time system for Outpost
//!
//! Two clocks live here. `NetworkClock` is the wrapping clock shared by all
//! peers of a session; cooldown timestamps are only meaningful modulo its
//! period. `GameTime` tracks local frame time and turns it into fixed
//! simulation ticks.

use serde::{Deserialize, Serialize};

/// Period of the shared network clock in seconds.
///
/// The relay provides a millisecond counter in a `u32`, so the clock wraps
/// after `u32::MAX` milliseconds.
pub const CLOCK_PERIOD: f64 = u32::MAX as f64 / 1000.0;

/// Elapsed time from `last` to `now` on a clock that wraps every `period`.
pub fn wrapping_elapsed(last: f64, now: f64, period: f64) -> f64 {
    (now - last + period).rem_euclid(period)
}

/// Errors that can occur when configuring clocks
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClockError {
    #[error("Clock period must be positive and finite, got {0}")]
    InvalidPeriod(f64),

    #[error("Tick rate must be positive, got {0}")]
    InvalidTickRate(f32),
}

/// Wrapping clock shared by every peer of a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkClock {
    period: f64,
    now: f64,
}

impl Default for NetworkClock {
    fn default() -> Self {
        Self {
            period: CLOCK_PERIOD,
            now: 0.0,
        }
    }
}

impl NetworkClock {
    /// Create a clock with the relay's standard period
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock with a custom period (mostly useful for tests)
    pub fn with_period(period: f64) -> Result<Self, ClockError> {
        if !(period.is_finite() && period > 0.0) {
            return Err(ClockError::InvalidPeriod(period));
        }
        Ok(Self { period, now: 0.0 })
    }

    /// Current clock reading in `[0, period)`
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Clock period in seconds
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Advance by a frame delta, wrapping at the period
    pub fn advance(&mut self, delta: f64) {
        self.now = (self.now + delta.max(0.0)).rem_euclid(self.period);
    }

    /// Adopt the authority's reading
    pub fn sync(&mut self, now: f64) {
        self.now = now.rem_euclid(self.period);
    }

    /// Seconds elapsed since `last`, correct across a wrap
    pub fn elapsed_since(&self, last: f64) -> f64 {
        wrapping_elapsed(last, self.now, self.period)
    }
}

/// Configuration for local frame time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// Simulation ticks per second
    pub tick_rate: f32,
    /// Maximum delta time to prevent spiral of death
    pub max_delta_time: f32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30.0,
            max_delta_time: 0.25,
        }
    }
}

impl TimeConfig {
    /// Seconds per simulation tick
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate
    }
}

/// Local frame time tracking
#[derive(Debug, Clone)]
pub struct GameTime {
    /// Configuration
    pub config: TimeConfig,
    /// Time since session start in seconds
    pub total_time: f64,
    /// Delta time for this frame (clamped)
    pub delta_time: f32,
    /// Frame counter
    pub frame_count: u64,
    /// Whether the simulation is paused
    pub paused: bool,
    /// Accumulated time not yet consumed by ticks
    tick_accumulator: f32,
}

impl Default for GameTime {
    fn default() -> Self {
        Self {
            config: TimeConfig::default(),
            total_time: 0.0,
            delta_time: 0.0,
            frame_count: 0,
            paused: false,
            tick_accumulator: 0.0,
        }
    }
}

impl GameTime {
    /// Create a new game time with custom config
    pub fn new(config: TimeConfig) -> Result<Self, ClockError> {
        if !(config.tick_rate > 0.0) {
            return Err(ClockError::InvalidTickRate(config.tick_rate));
        }
        Ok(Self {
            config,
            ..Default::default()
        })
    }

    /// Update with the raw delta from the previous frame
    pub fn update(&mut self, raw_delta: f32) {
        self.frame_count += 1;

        if self.paused {
            self.delta_time = 0.0;
            return;
        }

        self.delta_time = raw_delta.clamp(0.0, self.config.max_delta_time);
        self.total_time += self.delta_time as f64;
        self.tick_accumulator += self.delta_time;
    }

    /// Number of simulation ticks to run this frame
    pub fn due_ticks(&mut self) -> u32 {
        let step = self.config.tick_seconds();
        let mut ticks = 0;
        while self.tick_accumulator >= step {
            self.tick_accumulator -= step;
            ticks += 1;
        }
        ticks
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        self.paused = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_simple() {
        let mut clock = NetworkClock::new();
        clock.advance(10.0);
        assert!((clock.elapsed_since(4.0) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_elapsed_across_wrap() {
        let period = CLOCK_PERIOD;
        let last = period - 0.5;
        let mut clock = NetworkClock::new();
        clock.sync(0.25);
        let elapsed = clock.elapsed_since(last);
        assert!((elapsed - 0.75).abs() < 1e-6, "elapsed was {}", elapsed);
    }

    #[test]
    fn test_advance_wraps() {
        let mut clock = NetworkClock::with_period(10.0).unwrap();
        clock.advance(9.0);
        clock.advance(3.0);
        assert!((clock.now() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_period_rejected() {
        assert!(NetworkClock::with_period(0.0).is_err());
        assert!(NetworkClock::with_period(f64::NAN).is_err());
    }

    #[test]
    fn test_sync_normalises() {
        let mut clock = NetworkClock::with_period(10.0).unwrap();
        clock.sync(-1.0);
        assert!((clock.now() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_game_time_ticks() {
        let mut time = GameTime::new(TimeConfig {
            tick_rate: 10.0,
            max_delta_time: 1.0,
        })
        .unwrap();
        time.update(0.35);
        assert_eq!(time.due_ticks(), 3);
        time.update(0.06);
        assert_eq!(time.due_ticks(), 1);
        assert_eq!(time.frame_count, 2);
    }

    #[test]
    fn test_game_time_pause() {
        let mut time = GameTime::default();
        time.pause();
        time.update(0.1);
        assert_eq!(time.delta_time, 0.0);
        assert_eq!(time.due_ticks(), 0);
    }
}
