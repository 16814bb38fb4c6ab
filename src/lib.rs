//! # mint-throttle
//!
//! Transactions-per-second admission control for throttled ledger operations.
//!
//! A ledger throttle record carries a rate ceiling and the most recent gated
//! operation (when it happened and how many units it consumed). This crate
//! decides whether the next operation may run now and, if not, cooperatively
//! waits until it may, with cancellation and a bounded wait.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mint_throttle::{GateConfig, GatedActionRunner, PolicySnapshot, WaitConfig};
//! use std::time::Duration;
//!
//! # async fn mint() -> Result<u64, std::io::Error> { Ok(1) }
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = PolicySnapshot::from_ledger_json(
//!     r#"{"maxRatePerSecond": 2, "lastOperation": {"timestamp": "2024-05-01T12:00:00Z", "count": 10}}"#,
//! )?;
//!
//! let config = GateConfig::new(
//!     WaitConfig::builder()
//!         .max_wait(Duration::from_secs(30))
//!         .on_wait_start(|d| println!("throttled, sleeping {:?}", d))
//!         .build()?,
//! );
//!
//! let outcome = GatedActionRunner::system().run(&policy, mint, &config).await?;
//! println!("minted {} (waited {:?})", outcome.result, outcome.waited);
//! # Ok(())
//! # }
//! ```
//!
//! ## The Admission Rule
//!
//! After an operation of `count` units, the next one may start once
//! `count / max_rate_per_second` seconds have elapsed. The boundary is
//! inclusive, and a denied decision reports the remaining wait rounded up to
//! whole milliseconds, so sleeping exactly that long always admits.
//!
//! | Snapshot | Decision |
//! |----------|----------|
//! | no rate configured | allowed |
//! | no last operation | allowed |
//! | last count <= 0 | allowed |
//! | rate 0, negative, NaN, or not a number | `PolicyError::InvalidRate` |
//! | unparsable timestamp | `PolicyError::InvalidTimestamp` |
//!
//! ## Status Without Waiting
//!
//! ```rust
//! use mint_throttle::{LastOperation, PolicySnapshot};
//! use chrono::{Duration, Utc};
//!
//! let last = Utc::now();
//! let policy = PolicySnapshot::unthrottled()
//!     .with_max_rate(1.0)
//!     .with_last_operation(LastOperation::new(last, 5));
//!
//! let status = policy.status(last + Duration::seconds(3)).unwrap();
//! assert_eq!(status.wait_seconds, Some(2.0));
//! println!("{}", status); // rate limited, retry in 2.000s
//! ```
//!
//! ## Cancellation and Timeouts
//!
//! Every wait observes a [`CancellationToken`]. A token that is already
//! cancelled fails the call before anything is evaluated; cancelling during
//! a sleep interrupts it. The wait gives up with `WaitError::Timeout` once
//! `max_wait` (default 5 minutes) has elapsed, and no sleep ever extends
//! past that budget.
//!
//! ## Snapshots Are Not Refreshed
//!
//! The wait loop re-evaluates the snapshot it was given; only time moves.
//! If other processes can record gated operations on the same throttle,
//! fetch a fresh snapshot after waiting and check it again before acting.
//!
//! ## Observability
//!
//! The crate emits `tracing` events at `debug` and `trace` level only.
//! Use `on_wait_start`, `GateConfig::with_before_action` and
//! [`GateMetrics`] for caller-facing observability.

// Domain layer - pure admission logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    decision::{evaluate, AdmissionDecision},
    policy::{LastOperation, PolicyError, PolicySnapshot, RateValue, TimestampValue},
    status::{status, AdmissionStatus},
};

pub use application::{
    cancellation::CancellationToken,
    config::{
        BeforeActionHook, ConfigError, GateConfig, WaitConfig, WaitConfigBuilder, WaitHook,
        DEFAULT_MAX_WAIT, DEFAULT_MIN_POLL_INTERVAL,
    },
    metrics::{GateMetrics, GateMetricsSnapshot},
    orchestrator::{WaitError, WaitOrchestrator},
    ports::{Clock, SleepFuture, Sleeper},
    runner::{GateError, GatedActionRunner, MintOutcome},
};

pub use infrastructure::{clock::SystemClock, sleeper::TokioSleeper};
