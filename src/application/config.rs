//! Per-call wait and gate configuration.

use crate::application::cancellation::CancellationToken;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound on time spent waiting for admission.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(5 * 60);

/// Default floor on the interval between re-evaluations.
pub const DEFAULT_MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Hook invoked with the duration about to be slept.
pub type WaitHook = Arc<dyn Fn(Duration) + Send + Sync + 'static>;

/// Hook invoked once admission is granted, right before the gated action.
pub type BeforeActionHook = Arc<dyn Fn() + Send + Sync + 'static>;

/// Error returned when wait configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Maximum wait duration must be greater than zero
    ZeroMaxWait,
    /// Minimum poll interval must be greater than zero
    ZeroPollInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroMaxWait => write!(f, "max wait must be greater than 0"),
            ConfigError::ZeroPollInterval => {
                write!(f, "min poll interval must be greater than 0")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for a single wait.
///
/// # Example
/// ```
/// use mint_throttle::{CancellationToken, WaitConfig};
/// use std::time::Duration;
///
/// let token = CancellationToken::new();
/// let config = WaitConfig::builder()
///     .max_wait(Duration::from_secs(30))
///     .min_poll_interval(Duration::from_millis(250))
///     .cancellation_token(token.clone())
///     .on_wait_start(|d| println!("sleeping {:?}", d))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.max_wait(), Duration::from_secs(30));
/// ```
#[derive(Clone)]
pub struct WaitConfig {
    max_wait: Duration,
    min_poll_interval: Duration,
    cancellation_token: CancellationToken,
    on_wait_start: Option<WaitHook>,
}

impl WaitConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> WaitConfigBuilder {
        WaitConfigBuilder::default()
    }

    /// Upper bound on total time spent waiting.
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Floor on the interval between re-evaluations.
    pub fn min_poll_interval(&self) -> Duration {
        self.min_poll_interval
    }

    /// Token observed before and during every sleep.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub(crate) fn notify_wait_start(&self, duration: Duration) {
        if let Some(hook) = &self.on_wait_start {
            hook(duration);
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            min_poll_interval: DEFAULT_MIN_POLL_INTERVAL,
            cancellation_token: CancellationToken::new(),
            on_wait_start: None,
        }
    }
}

impl fmt::Debug for WaitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitConfig")
            .field("max_wait", &self.max_wait)
            .field("min_poll_interval", &self.min_poll_interval)
            .field("cancelled", &self.cancellation_token.is_cancelled())
            .field("on_wait_start", &self.on_wait_start.is_some())
            .finish()
    }
}

/// Builder for [`WaitConfig`].
#[derive(Default)]
pub struct WaitConfigBuilder {
    max_wait: Option<Duration>,
    min_poll_interval: Option<Duration>,
    cancellation_token: Option<CancellationToken>,
    on_wait_start: Option<WaitHook>,
}

impl WaitConfigBuilder {
    /// Set the maximum total wait. Defaults to 5 minutes.
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Set the minimum interval between re-evaluations. Defaults to 100ms.
    pub fn min_poll_interval(mut self, interval: Duration) -> Self {
        self.min_poll_interval = Some(interval);
        self
    }

    /// Observe `token` for cancellation.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Invoke `hook` before each sleep with the duration about to be slept.
    pub fn on_wait_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.on_wait_start = Some(Arc::new(hook));
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::ZeroMaxWait` or `ConfigError::ZeroPollInterval`
    /// if either duration is zero.
    pub fn build(self) -> Result<WaitConfig, ConfigError> {
        let max_wait = self.max_wait.unwrap_or(DEFAULT_MAX_WAIT);
        if max_wait.is_zero() {
            return Err(ConfigError::ZeroMaxWait);
        }

        let min_poll_interval = self.min_poll_interval.unwrap_or(DEFAULT_MIN_POLL_INTERVAL);
        if min_poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }

        Ok(WaitConfig {
            max_wait,
            min_poll_interval,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            on_wait_start: self.on_wait_start,
        })
    }
}

/// Configuration for a gated action: the wait plus a pre-action hook.
#[derive(Clone, Default)]
pub struct GateConfig {
    wait: WaitConfig,
    on_before_action: Option<BeforeActionHook>,
}

impl GateConfig {
    /// Wrap a wait configuration.
    pub fn new(wait: WaitConfig) -> Self {
        Self {
            wait,
            on_before_action: None,
        }
    }

    /// Invoke `hook` after admission, immediately before the action runs.
    pub fn with_before_action<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_before_action = Some(Arc::new(hook));
        self
    }

    /// The wait configuration.
    pub fn wait(&self) -> &WaitConfig {
        &self.wait
    }

    pub(crate) fn notify_before_action(&self) {
        if let Some(hook) = &self.on_before_action {
            hook();
        }
    }
}

impl From<WaitConfig> for GateConfig {
    fn from(wait: WaitConfig) -> Self {
        Self::new(wait)
    }
}

impl fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateConfig")
            .field("wait", &self.wait)
            .field("on_before_action", &self.on_before_action.is_some())
            .finish()
    }
}
