//! Wall-clock adapter.
//!
//! Ledger records stamp the last gated operation with a UTC instant, so
//! "now" has to come from the same calendar clock rather than a monotonic
//! one. [`SystemClock`] reads it from the operating system; tests inject
//! `MockClock` (behind `test-helpers`) to pin it.

use crate::application::ports::Clock;
use chrono::{DateTime, Utc};

/// Reads the current UTC instant with `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
