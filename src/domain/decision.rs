//! Admission decisions.
//!
//! The evaluator maps a [`PolicySnapshot`] and an explicit "now" to an
//! [`AdmissionDecision`]. It performs no I/O and reads no clock, so the
//! same inputs always produce the same decision.

use crate::domain::policy::{PolicyError, PolicySnapshot};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::time::Duration;

const MICROS_PER_SECOND: f64 = 1_000_000.0;
const MICROS_PER_MILLI: f64 = 1_000.0;

/// Outcome of evaluating a policy snapshot at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum AdmissionDecision {
    /// The gated operation may run now
    Allowed,
    /// The gated operation must wait
    Denied {
        /// Whole milliseconds, rounded up; sleeping exactly this long admits
        #[serde(rename = "waitMillis", serialize_with = "serialize_millis")]
        wait: Duration,
    },
}

impl AdmissionDecision {
    /// Check if this decision is Allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmissionDecision::Allowed)
    }

    /// Check if this decision is Denied.
    pub fn is_denied(&self) -> bool {
        matches!(self, AdmissionDecision::Denied { .. })
    }

    /// Required wait, or `None` when allowed.
    pub fn wait(&self) -> Option<Duration> {
        match self {
            AdmissionDecision::Allowed => None,
            AdmissionDecision::Denied { wait } => Some(*wait),
        }
    }
}

fn serialize_millis<S>(wait: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(wait.as_millis() as u64)
}

/// Decide whether a gated operation may run at `now`.
///
/// The minimum spacing after the last operation is
/// `count / max_rate_per_second` seconds. Elapsed time is measured at
/// millisecond resolution and the boundary is inclusive.
///
/// # Errors
/// Returns `PolicyError::InvalidRate` or `PolicyError::InvalidTimestamp`
/// for malformed snapshots. Values are never clamped.
///
/// # Example
/// ```
/// use mint_throttle::{evaluate, AdmissionDecision, LastOperation, PolicySnapshot};
/// use chrono::{Duration as ChronoDuration, Utc};
/// use std::time::Duration;
///
/// let last = Utc::now();
/// let policy = PolicySnapshot::unthrottled()
///     .with_max_rate(100.0)
///     .with_last_operation(LastOperation::new(last, 100));
///
/// let decision = evaluate(&policy, last + ChronoDuration::milliseconds(500)).unwrap();
/// assert_eq!(decision, AdmissionDecision::Denied { wait: Duration::from_millis(500) });
/// ```
pub fn evaluate(
    policy: &PolicySnapshot,
    now: DateTime<Utc>,
) -> Result<AdmissionDecision, PolicyError> {
    let Some(raw_rate) = &policy.max_rate_per_second else {
        return Ok(AdmissionDecision::Allowed);
    };
    let Some(last) = &policy.last_operation else {
        return Ok(AdmissionDecision::Allowed);
    };

    let rate = raw_rate.parse()?;

    if last.count <= 0 {
        return Ok(AdmissionDecision::Allowed);
    }

    let min_interval_micros = last.count as f64 * MICROS_PER_SECOND / rate;
    let last_at = last.timestamp.parse()?;

    // Sources only guarantee millisecond resolution; negative deltas floor too
    let elapsed_micros = floor_millis(now - last_at) as f64 * MICROS_PER_MILLI;

    if elapsed_micros >= min_interval_micros {
        return Ok(AdmissionDecision::Allowed);
    }

    let wait_millis = ((min_interval_micros - elapsed_micros) / MICROS_PER_MILLI).ceil();
    Ok(AdmissionDecision::Denied {
        wait: Duration::from_millis(wait_millis as u64),
    })
}

fn floor_millis(delta: TimeDelta) -> i64 {
    match delta.num_microseconds() {
        Some(micros) => micros.div_euclid(1_000),
        None => delta.num_milliseconds(),
    }
}

impl PolicySnapshot {
    /// Evaluate this snapshot at `now`. See [`evaluate`].
    pub fn evaluate(&self, now: DateTime<Utc>) -> Result<AdmissionDecision, PolicyError> {
        evaluate(self, now)
    }
}
