//! Simulation time model.
//!
//! # Design
//!
//! Ticks are counted with a monotonically increasing `Tick`.  Simulated time
//! is tracked separately in whole milliseconds because a tick's length is not
//! always the nominal interval: a clock driven by a real timer advances by
//! the measured wall-clock time between ticks.
//!
//!   now_ms = start_unix_ms + elapsed_ms
//!
//! Every advance moves simulated time forward by at least one millisecond,
//! so two samples of the same vehicle can never share a timestamp.

use std::fmt;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Tick counter plus simulated Unix time in milliseconds.
///
/// `SimClock` is cheap to copy and holds no heap data.
#[derive(Clone, Debug)]
pub struct SimClock {
    /// Unix timestamp (milliseconds) of tick 0.
    pub start_unix_ms: i64,
    /// Nominal tick length used by logical stepping.
    pub tick_interval_ms: i64,
    /// The current tick: advanced once per processed tick.
    pub current_tick: Tick,
    /// Simulated milliseconds elapsed since tick 0.
    pub elapsed_ms: i64,
}

impl SimClock {
    /// Create a clock starting at `start_unix_ms` with the given nominal
    /// interval (in seconds; fractional intervals are allowed).
    pub fn new(start_unix_ms: i64, tick_interval_secs: f64) -> Self {
        Self {
            start_unix_ms,
            tick_interval_ms: secs_to_ms(tick_interval_secs),
            current_tick: Tick::ZERO,
            elapsed_ms: 0,
        }
    }

    /// Nominal tick length in seconds.
    #[inline]
    pub fn nominal_interval_secs(&self) -> f64 {
        self.tick_interval_ms as f64 / 1000.0
    }

    /// Current simulated Unix time in milliseconds.
    #[inline]
    pub fn now_ms(&self) -> i64 {
        self.start_unix_ms + self.elapsed_ms
    }

    /// Simulated Unix time at the end of a tick lasting `elapsed_secs`,
    /// without advancing the clock.
    #[inline]
    pub fn peek_after(&self, elapsed_secs: f64) -> i64 {
        self.now_ms() + secs_to_ms(elapsed_secs)
    }

    /// Advance one tick covering `elapsed_secs`: the nominal interval on a
    /// logical clock, the measured duration on a wall clock.
    #[inline]
    pub fn advance_by(&mut self, elapsed_secs: f64) {
        self.elapsed_ms += secs_to_ms(elapsed_secs);
        self.current_tick = self.current_tick + 1;
    }

    /// Elapsed simulated time as (days, hours, minutes).
    pub fn elapsed_dhm(&self) -> (u64, u32, u32) {
        let total_secs = (self.elapsed_ms.max(0) / 1000) as u64;
        let days = total_secs / 86_400;
        let hours = ((total_secs % 86_400) / 3_600) as u32;
        let minutes = ((total_secs % 3_600) / 60) as u32;
        (days, hours, minutes)
    }
}

/// Seconds → whole milliseconds, never less than 1.
fn secs_to_ms(secs: f64) -> i64 {
    let ms = (secs * 1000.0).round();
    if ms.is_finite() && ms >= 1.0 { ms as i64 } else { 1 }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (d, h, m) = self.elapsed_dhm();
        write!(f, "{} at +{d}d {h:02}:{m:02}", self.current_tick)
    }
}
