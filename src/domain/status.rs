//! Read-only admission status for dashboards and log lines.

use crate::domain::decision::{evaluate, AdmissionDecision};
use crate::domain::policy::{PolicyError, PolicySnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Admission decision enriched with presentation fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStatus {
    /// The underlying decision
    #[serde(flatten)]
    pub decision: AdmissionDecision,
    /// Whether a rate ceiling is configured
    pub is_policy_enabled: bool,
    /// Required wait in seconds, present only when denied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_seconds: Option<f64>,
}

impl AdmissionStatus {
    /// Check if the gated operation may run now.
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }
}

impl fmt::Display for AdmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_policy_enabled {
            return write!(f, "allowed (throttling disabled)");
        }
        match self.wait_seconds {
            Some(seconds) => write!(f, "rate limited, retry in {:.3}s", seconds),
            None => write!(f, "allowed"),
        }
    }
}

/// Report the admission status of `policy` at `now`.
///
/// Pure and idempotent: identical inputs give identical output.
///
/// # Errors
/// Propagates `PolicyError` from [`evaluate`] for malformed snapshots.
pub fn status(policy: &PolicySnapshot, now: DateTime<Utc>) -> Result<AdmissionStatus, PolicyError> {
    let decision = evaluate(policy, now)?;
    let wait_seconds = decision
        .wait()
        .map(|wait| wait.as_millis() as f64 / 1000.0);

    Ok(AdmissionStatus {
        decision,
        is_policy_enabled: policy.is_enabled(),
        wait_seconds,
    })
}

impl PolicySnapshot {
    /// Report the admission status at `now`. See [`status`].
    pub fn status(&self, now: DateTime<Utc>) -> Result<AdmissionStatus, PolicyError> {
        status(self, now)
    }
}
