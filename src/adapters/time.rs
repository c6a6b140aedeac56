//! Monotonic time adapter.
//!
//! Wraps `std::time::Instant` so the state store can stamp
//! `last_updated_us` without caring where time comes from.

use std::time::Instant;

use crate::app::ports::TimePort;

/// Microseconds since construction.  Never goes backwards.
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds since construction.
    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

impl TimePort for MonotonicClock {
    fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}
