//! Scheduling clocks for the poll timer.

#![allow(missing_docs)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Clock interface for session scheduling.
///
/// Times are offsets from an arbitrary, clock-specific origin; only
/// differences between readings of the same clock are meaningful.
pub trait Clock: Send + Sync + 'static {
    /// Return the current time for scheduling.
    fn now(&self) -> Duration;
}

/// Monotonic clock based on `std::time::Instant`.
#[derive(Debug, Clone)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Deterministic clock for tests and simulations.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time by the given delta.
    pub fn advance(&self, delta: Duration) -> Duration {
        let mut now = self.now.lock().expect("manual clock lock poisoned");
        *now = now.saturating_add(delta);
        *now
    }

    /// Set the current time explicitly.
    pub fn set_time(&self, time: Duration) {
        let mut now = self.now.lock().expect("manual clock lock poisoned");
        *now = time;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().expect("manual clock lock poisoned")
    }
}
