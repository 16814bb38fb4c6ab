//! Wait orchestration.
//!
//! Drives the evaluate/sleep loop around the admission evaluator until the
//! policy admits, the wait budget runs out, or the caller cancels.

use crate::application::config::WaitConfig;
use crate::application::ports::{Clock, Sleeper};
use crate::domain::decision::AdmissionDecision;
use crate::domain::policy::{PolicyError, PolicySnapshot};
use crate::infrastructure::{clock::SystemClock, sleeper::TokioSleeper};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Error returned when waiting for admission fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// The snapshot could not be evaluated
    Policy(PolicyError),
    /// Cancellation was observed before or during the wait
    Aborted,
    /// Admission was not granted within the configured budget
    Timeout {
        /// The configured maximum wait
        max_wait: Duration,
    },
}

impl std::fmt::Display for WaitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitError::Policy(e) => write!(f, "{}", e),
            WaitError::Aborted => write!(f, "wait for rate limit admission aborted"),
            WaitError::Timeout { max_wait } => {
                write!(
                    f,
                    "rate limit admission not granted within {}ms",
                    max_wait.as_millis()
                )
            }
        }
    }
}

impl std::error::Error for WaitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WaitError::Policy(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PolicyError> for WaitError {
    fn from(e: PolicyError) -> Self {
        WaitError::Policy(e)
    }
}

impl WaitError {
    /// Check if the wait was cancelled.
    pub fn is_aborted(&self) -> bool {
        matches!(self, WaitError::Aborted)
    }

    /// Check if the wait ran out of budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }
}

/// Suspends the caller until a policy snapshot admits.
///
/// The same snapshot is re-evaluated on every iteration; only the passage
/// of time changes the outcome. Sleeps are cooperative and cancellable.
#[derive(Debug, Clone)]
pub struct WaitOrchestrator {
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl WaitOrchestrator {
    /// Create an orchestrator with explicit time sources.
    pub fn new(clock: Arc<dyn Clock>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { clock, sleeper }
    }

    /// Create an orchestrator on the system clock and tokio timers.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock::new()), Arc::new(TokioSleeper::new()))
    }

    /// Get the clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Wait until `policy` admits.
    ///
    /// # Errors
    /// - `WaitError::Aborted` if the token is already cancelled (nothing is
    ///   evaluated) or becomes cancelled during a sleep (the sleep is cut short)
    /// - `WaitError::Timeout` once `max_wait` has elapsed without admission
    /// - `WaitError::Policy` if the snapshot is malformed
    pub async fn wait_until_allowed(
        &self,
        policy: &PolicySnapshot,
        config: &WaitConfig,
    ) -> Result<(), WaitError> {
        let token = config.cancellation_token();
        if token.is_cancelled() {
            debug!("admission wait aborted before start");
            return Err(WaitError::Aborted);
        }

        let max_wait = config.max_wait();
        let started = self.clock.now();

        loop {
            let wait = match policy.evaluate(self.clock.now())? {
                AdmissionDecision::Allowed => {
                    trace!("admission granted");
                    return Ok(());
                }
                AdmissionDecision::Denied { wait } => wait,
            };

            let elapsed = (self.clock.now() - started)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if elapsed >= max_wait {
                debug!(
                    max_wait_ms = max_wait.as_millis() as u64,
                    "admission wait timed out"
                );
                return Err(WaitError::Timeout { max_wait });
            }

            let sleep_for = wait
                .max(config.min_poll_interval())
                .min(max_wait - elapsed);

            debug!(
                wait_ms = wait.as_millis() as u64,
                sleep_ms = sleep_for.as_millis() as u64,
                elapsed_ms = elapsed.as_millis() as u64,
                "rate limited, sleeping before re-evaluation"
            );
            config.notify_wait_start(sleep_for);

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("admission wait aborted during sleep");
                    return Err(WaitError::Aborted);
                }
                _ = self.sleeper.sleep(sleep_for) => {}
            }
        }
    }
}

impl Default for WaitOrchestrator {
    fn default() -> Self {
        Self::system()
    }
}
