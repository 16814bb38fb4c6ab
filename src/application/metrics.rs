//! Observability metrics for gated actions.
//!
//! Metrics are owned by the caller and attached to a runner explicitly.
//! Clones share the same counters, so one `GateMetrics` can be handed to
//! several runners to aggregate across calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters describing how gated calls were admitted.
///
/// All metrics use atomic operations for thread-safe updates and reads.
#[derive(Debug, Clone, Default)]
pub struct GateMetrics {
    inner: Arc<GateMetricsInner>,
}

#[derive(Debug, Default)]
struct GateMetricsInner {
    /// Calls admitted on the first evaluation
    admitted_immediately: AtomicU64,
    /// Calls that had to wait and were eventually admitted
    admitted_after_wait: AtomicU64,
    /// Waits that ran out of budget
    timeouts: AtomicU64,
    /// Waits cancelled by the caller
    aborts: AtomicU64,
    /// Calls rejected because the snapshot was malformed
    policy_errors: AtomicU64,
    /// Total milliseconds spent waiting by admitted calls
    waited_millis: AtomicU64,
}

impl GateMetrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_admitted_immediately(&self) {
        self.inner
            .admitted_immediately
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_admitted_after_wait(&self, waited: Duration) {
        self.inner
            .admitted_after_wait
            .fetch_add(1, Ordering::Relaxed);
        let millis = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX);
        self.inner.waited_millis.fetch_add(millis, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.inner.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self) {
        self.inner.aborts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_policy_error(&self) {
        self.inner.policy_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of calls admitted without waiting.
    pub fn admitted_immediately(&self) -> u64 {
        self.inner.admitted_immediately.load(Ordering::Relaxed)
    }

    /// Get the number of calls admitted after waiting.
    pub fn admitted_after_wait(&self) -> u64 {
        self.inner.admitted_after_wait.load(Ordering::Relaxed)
    }

    /// Get the number of timed-out waits.
    pub fn timeouts(&self) -> u64 {
        self.inner.timeouts.load(Ordering::Relaxed)
    }

    /// Get the number of cancelled waits.
    pub fn aborts(&self) -> u64 {
        self.inner.aborts.load(Ordering::Relaxed)
    }

    /// Get the number of malformed snapshots seen.
    pub fn policy_errors(&self) -> u64 {
        self.inner.policy_errors.load(Ordering::Relaxed)
    }

    /// Get the total time admitted calls spent waiting.
    pub fn total_waited(&self) -> Duration {
        Duration::from_millis(self.inner.waited_millis.load(Ordering::Relaxed))
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> GateMetricsSnapshot {
        GateMetricsSnapshot {
            admitted_immediately: self.admitted_immediately(),
            admitted_after_wait: self.admitted_after_wait(),
            timeouts: self.timeouts(),
            aborts: self.aborts(),
            policy_errors: self.policy_errors(),
            total_waited: self.total_waited(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.admitted_immediately.store(0, Ordering::Relaxed);
        self.inner.admitted_after_wait.store(0, Ordering::Relaxed);
        self.inner.timeouts.store(0, Ordering::Relaxed);
        self.inner.aborts.store(0, Ordering::Relaxed);
        self.inner.policy_errors.store(0, Ordering::Relaxed);
        self.inner.waited_millis.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of gate metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateMetricsSnapshot {
    /// Calls admitted without waiting
    pub admitted_immediately: u64,
    /// Calls admitted after waiting
    pub admitted_after_wait: u64,
    /// Waits that ran out of budget
    pub timeouts: u64,
    /// Waits cancelled by the caller
    pub aborts: u64,
    /// Malformed snapshots
    pub policy_errors: u64,
    /// Total time admitted calls spent waiting
    pub total_waited: Duration,
}

impl GateMetricsSnapshot {
    /// Total calls that reached a verdict (admitted, timed out or aborted).
    pub fn total_calls(&self) -> u64 {
        self.admitted_immediately
            .saturating_add(self.admitted_after_wait)
            .saturating_add(self.timeouts)
            .saturating_add(self.aborts)
    }

    /// Fraction of calls that were rate limited (0.0 to 1.0).
    ///
    /// Returns 0.0 if no calls have been processed.
    pub fn rate_limited_ratio(&self) -> f64 {
        let total = self.total_calls();
        if total == 0 {
            0.0
        } else {
            (total - self.admitted_immediately) as f64 / total as f64
        }
    }
}
