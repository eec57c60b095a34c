//! Time sources for trigger logging.

use std::time::Instant;

/// Monotonic time source, in seconds.
///
/// The presentation toolkit usually owns the experiment clock; implement this
/// for it so logged trigger times line up with its own timestamps.
pub trait Clock {
    /// Seconds elapsed on this clock.
    fn now(&self) -> f64;
}

/// Clock counting seconds since it was created (or last reset).
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Restart from zero.
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl<F> Clock for F
where
    F: Fn() -> f64,
{
    fn now(&self) -> f64 {
        self()
    }
}
