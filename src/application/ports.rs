//! Ports (interfaces) for the application layer.
//!
//! The wait loop needs exactly two things from its environment: the current
//! wall-clock time and a way to suspend. Both are ports so that tests can
//! substitute a controllable clock and a sleeper that advances it.

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Port for obtaining the current wall-clock time.
///
/// Ledger timestamps are wall-clock instants, so this returns
/// `DateTime<Utc>` rather than a monotonic `Instant`.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Port for cooperative suspension.
///
/// Implementations must suspend the calling task without blocking the
/// worker thread. The returned future may be dropped before completion
/// when the wait is cancelled.
pub trait Sleeper: Send + Sync + Debug {
    /// Suspend for `duration`.
    fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}
