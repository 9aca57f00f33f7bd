//! General time utility functions and control-loop clocks

use chrono;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Number of microseconds in a second
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a number of seconds into whole microseconds, or `None` if the
/// value is not finite or does not fit in an `i64`.
pub fn seconds_to_micros(seconds: f64) -> Option<i64> {
    let micros = (seconds * MICROS_PER_SECOND as f64).round();

    // i64::MAX is not exactly representable, the bound rounds up to 2^63
    if micros.is_finite() && micros >= i64::MIN as f64 && micros < i64::MAX as f64 {
        Some(micros as i64)
    } else {
        None
    }
}

/// A monotonic source of time for the control loop.
///
/// Times are integer microseconds from an arbitrary, clock-specific origin.
pub trait Clock {
    /// The current time.
    ///
    /// Units: microseconds
    fn now_us(&self) -> i64;
}

/// Clock backed by the operating system's monotonic clock, with its origin at
/// the moment of construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

/// A clock which only moves when told to. Used for simulation and tests.
#[derive(Debug, Default)]
pub struct SimClock {
    now_us: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> i64 {
        self.origin.elapsed().as_micros() as i64
    }
}

impl SimClock {
    /// Create a new clock starting at the given time.
    pub fn starting_at(now_us: i64) -> Self {
        Self {
            now_us: AtomicI64::new(now_us),
        }
    }

    /// Set the current time.
    pub fn set_us(&self, now_us: i64) {
        self.now_us.store(now_us, Ordering::SeqCst);
    }

    /// Move the clock forward by the given number of microseconds.
    pub fn advance_us(&self, delta_us: i64) {
        self.now_us.fetch_add(delta_us, Ordering::SeqCst);
    }
}

impl Clock for SimClock {
    fn now_us(&self) -> i64 {
        self.now_us.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_clock() {
        let clock = SimClock::starting_at(1_000);
        assert_eq!(clock.now_us(), 1_000);
        clock.advance_us(500);
        assert_eq!(clock.now_us(), 1_500);
        clock.set_us(10);
        assert_eq!(clock.now_us(), 10);
    }

    #[test]
    fn test_monotonic_clock() {
        let clock = MonotonicClock::new();
        let a = clock.now_us();
        let b = clock.now_us();
        assert!(a >= 0);
        assert!(b >= a);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(seconds_to_micros(1.5), Some(1_500_000));
        assert_eq!(seconds_to_micros(-0.25), Some(-250_000));
        assert_eq!(seconds_to_micros(1e300), None);
        assert_eq!(seconds_to_micros(f64::NAN), None);
        assert_eq!(seconds_to_micros(f64::NEG_INFINITY), None);
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(250)),
            Some(0.25)
        );
    }
}
