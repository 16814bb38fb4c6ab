//! Gated action execution.
//!
//! Combines the evaluator and the wait loop with a caller-supplied action:
//! the action runs exactly once, and only after the policy admits.
//!
//! The snapshot is the one passed in; it is never refreshed. If another
//! process can record gated operations on the same ledger throttle while
//! this call waits, re-fetch the snapshot after the wait and check
//! [`PolicySnapshot::status`] again before acting.

use crate::application::config::GateConfig;
use crate::application::metrics::GateMetrics;
use crate::application::orchestrator::{WaitError, WaitOrchestrator};
use crate::domain::policy::PolicySnapshot;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Result envelope of a gated action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintOutcome<T> {
    /// Whether the first evaluation (before any waiting) denied admission
    pub was_rate_limited: bool,
    /// Wall-clock time spent waiting; zero when not rate limited
    pub waited: Duration,
    /// The action's return value
    pub result: T,
}

impl<T> MintOutcome<T> {
    /// Discard the envelope and keep the action's value.
    pub fn into_result(self) -> T {
        self.result
    }

    /// Transform the action's value, keeping the envelope.
    pub fn map<U, F>(self, f: F) -> MintOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        MintOutcome {
            was_rate_limited: self.was_rate_limited,
            waited: self.waited,
            result: f(self.result),
        }
    }
}

/// Error returned by a gated run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError<E> {
    /// Admission was not granted; the action never ran
    Admission(WaitError),
    /// The action ran and failed; its error is passed through untouched
    Action(E),
}

impl<E: std::fmt::Display> std::fmt::Display for GateError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateError::Admission(e) => write!(f, "{}", e),
            GateError::Action(e) => write!(f, "gated action failed: {}", e),
        }
    }
}

impl<E> std::error::Error for GateError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GateError::Admission(e) => Some(e),
            GateError::Action(e) => Some(e),
        }
    }
}

impl<E> From<WaitError> for GateError<E> {
    fn from(e: WaitError) -> Self {
        GateError::Admission(e)
    }
}

impl<E> GateError<E> {
    /// The admission failure, if the action never ran.
    pub fn admission(&self) -> Option<&WaitError> {
        match self {
            GateError::Admission(e) => Some(e),
            GateError::Action(_) => None,
        }
    }

    /// The action's own error, if it ran and failed.
    pub fn into_action_error(self) -> Option<E> {
        match self {
            GateError::Admission(_) => None,
            GateError::Action(e) => Some(e),
        }
    }
}

/// Runs actions behind a transactions-per-second policy.
///
/// # Example
/// ```
/// use mint_throttle::{GateConfig, GatedActionRunner, PolicySnapshot};
/// use std::convert::Infallible;
///
/// # tokio_test_block_on(async {
/// let runner = GatedActionRunner::system();
/// let outcome = runner
///     .run(&PolicySnapshot::unthrottled(), || async { Ok::<_, Infallible>(7) }, &GateConfig::default())
///     .await
///     .unwrap();
///
/// assert!(!outcome.was_rate_limited);
/// assert_eq!(outcome.result, 7);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GatedActionRunner {
    orchestrator: WaitOrchestrator,
    metrics: Option<GateMetrics>,
}

impl GatedActionRunner {
    /// Create a runner around an orchestrator.
    pub fn new(orchestrator: WaitOrchestrator) -> Self {
        Self {
            orchestrator,
            metrics: None,
        }
    }

    /// Create a runner on the system clock and tokio timers.
    pub fn system() -> Self {
        Self::new(WaitOrchestrator::system())
    }

    /// Record admission outcomes into `metrics`.
    pub fn with_metrics(mut self, metrics: GateMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Get the attached metrics, if any.
    pub fn metrics(&self) -> Option<&GateMetrics> {
        self.metrics.as_ref()
    }

    /// Get the orchestrator.
    pub fn orchestrator(&self) -> &WaitOrchestrator {
        &self.orchestrator
    }

    /// Wait for admission, then run `action` once.
    ///
    /// # Errors
    /// - `GateError::Admission` if the snapshot is malformed, the wait times
    ///   out or is cancelled; `action` is not invoked
    /// - `GateError::Action` with the action's own error
    pub async fn run<T, E, F, Fut>(
        &self,
        policy: &PolicySnapshot,
        action: F,
        config: &GateConfig,
    ) -> Result<MintOutcome<T>, GateError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let (was_rate_limited, waited) = self.admit(policy, config).await?;

        config.notify_before_action();
        let result = action().await.map_err(GateError::Action)?;

        Ok(MintOutcome {
            was_rate_limited,
            waited,
            result,
        })
    }

    /// Wait for admission, then run a synchronous `action` once.
    ///
    /// # Errors
    /// Same as [`run`](Self::run).
    pub async fn run_blocking_action<T, E, F>(
        &self,
        policy: &PolicySnapshot,
        action: F,
        config: &GateConfig,
    ) -> Result<MintOutcome<T>, GateError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let (was_rate_limited, waited) = self.admit(policy, config).await?;

        config.notify_before_action();
        let result = action().map_err(GateError::Action)?;

        Ok(MintOutcome {
            was_rate_limited,
            waited,
            result,
        })
    }

    async fn admit(
        &self,
        policy: &PolicySnapshot,
        config: &GateConfig,
    ) -> Result<(bool, Duration), WaitError> {
        let clock = self.orchestrator.clock();
        let started_at = clock.now();

        let initial = policy.evaluate(started_at).map_err(|e| {
            self.record(|m| m.record_policy_error());
            WaitError::from(e)
        })?;

        if initial.is_allowed() {
            self.record(|m| m.record_admitted_immediately());
            return Ok((false, Duration::ZERO));
        }

        if let Err(e) = self
            .orchestrator
            .wait_until_allowed(policy, config.wait())
            .await
        {
            self.record(|m| match &e {
                WaitError::Aborted => m.record_abort(),
                WaitError::Timeout { .. } => m.record_timeout(),
                WaitError::Policy(_) => m.record_policy_error(),
            });
            return Err(e);
        }

        let waited = (clock.now() - started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        debug!(
            waited_ms = waited.as_millis() as u64,
            "gated action admitted after rate limit wait"
        );
        self.record(|m| m.record_admitted_after_wait(waited));

        Ok((true, waited))
    }

    fn record(&self, f: impl FnOnce(&GateMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}

impl Default for GatedActionRunner {
    fn default() -> Self {
        Self::system()
    }
}
