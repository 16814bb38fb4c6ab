//! Gated action execution end to end.

use chrono::{DateTime, TimeZone, Utc};
use mint_throttle::infrastructure::mocks::{MockClock, MockSleeper};
use mint_throttle::{
    CancellationToken, GateConfig, GateError, GateMetrics, GatedActionRunner, LastOperation,
    PolicyError, PolicySnapshot, WaitConfig, WaitError, WaitOrchestrator,
};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

fn throttled(rate: f64, count: i64) -> PolicySnapshot {
    PolicySnapshot::unthrottled()
        .with_max_rate(rate)
        .with_last_operation(LastOperation::new(t0(), count))
}

fn mock_runner() -> (GatedActionRunner, MockSleeper) {
    let clock = MockClock::new(t0());
    let sleeper = MockSleeper::new(clock.clone());
    let orchestrator = WaitOrchestrator::new(Arc::new(clock), Arc::new(sleeper.clone()));
    (GatedActionRunner::new(orchestrator), sleeper)
}

#[derive(Debug, PartialEq)]
struct LedgerError(&'static str);

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ledger error: {}", self.0)
    }
}

impl std::error::Error for LedgerError {}

#[tokio::test]
async fn test_action_runs_exactly_once_when_allowed() {
    let (runner, _sleeper) = mock_runner();
    let calls = Arc::new(AtomicUsize::new(0));

    let calls_clone = Arc::clone(&calls);
    let outcome = runner
        .run(
            &throttled(10.0, 10),
            move || async move {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok::<_, LedgerError>("contract-1")
            },
            &GateConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(outcome.was_rate_limited);
    assert_eq!(outcome.waited, Duration::from_secs(1));
    assert_eq!(outcome.result, "contract-1");
}

#[tokio::test]
async fn test_hooks_fire_in_order() {
    let (runner, _sleeper) = mock_runner();
    let events = Arc::new(Mutex::new(Vec::new()));

    let on_wait = Arc::clone(&events);
    let on_before = Arc::clone(&events);
    let in_action = Arc::clone(&events);
    let config = GateConfig::new(
        WaitConfig::builder()
            .on_wait_start(move |d| {
                on_wait
                    .lock()
                    .unwrap()
                    .push(format!("wait {}ms", d.as_millis()))
            })
            .build()
            .unwrap(),
    )
    .with_before_action(move || on_before.lock().unwrap().push("before".to_string()));

    runner
        .run_blocking_action(
            &throttled(5.0, 1),
            move || {
                in_action.lock().unwrap().push("action".to_string());
                Ok::<_, Infallible>(())
            },
            &config,
        )
        .await
        .unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec!["wait 200ms", "before", "action"]
    );
}

#[tokio::test]
async fn test_before_action_hook_runs_without_wait() {
    let (runner, sleeper) = mock_runner();
    let before = Arc::new(AtomicUsize::new(0));
    let before_clone = Arc::clone(&before);
    let config = GateConfig::default().with_before_action(move || {
        before_clone.fetch_add(1, Ordering::SeqCst);
    });

    let outcome = runner
        .run_blocking_action(
            &PolicySnapshot::unthrottled(),
            || Ok::<_, Infallible>(()),
            &config,
        )
        .await
        .unwrap();

    assert!(!outcome.was_rate_limited);
    assert_eq!(outcome.waited, Duration::ZERO);
    assert_eq!(before.load(Ordering::SeqCst), 1);
    assert!(sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start_never_runs_action() {
    let (runner, _sleeper) = mock_runner();
    let token = CancellationToken::new();
    token.cancel();
    let config = GateConfig::new(
        WaitConfig::builder()
            .cancellation_token(token)
            .build()
            .unwrap(),
    )
    .with_before_action(|| panic!("hook must not run"));

    let result = runner
        .run_blocking_action(
            &throttled(1.0, 3),
            || -> Result<(), LedgerError> { panic!("action must not run") },
            &config,
        )
        .await;

    assert!(matches!(result, Err(GateError::Admission(WaitError::Aborted))));
}

#[tokio::test]
async fn test_cancelled_token_ignored_when_not_rate_limited() {
    let (runner, _sleeper) = mock_runner();
    let token = CancellationToken::new();
    token.cancel();
    let config = GateConfig::new(
        WaitConfig::builder()
            .cancellation_token(token)
            .build()
            .unwrap(),
    );

    let outcome = runner
        .run_blocking_action(
            &PolicySnapshot::unthrottled(),
            || Ok::<_, Infallible>(3),
            &config,
        )
        .await
        .unwrap();

    assert_eq!(outcome.result, 3);
}

#[tokio::test]
async fn test_action_failure_is_not_wrapped_or_retried() {
    let (runner, _sleeper) = mock_runner();
    let calls = AtomicUsize::new(0);

    let err = runner
        .run_blocking_action(
            &throttled(1.0, 1),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(LedgerError("duplicate contract"))
            },
            &GateConfig::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        err.to_string(),
        "gated action failed: ledger error: duplicate contract"
    );
    assert_eq!(
        err.into_action_error(),
        Some(LedgerError("duplicate contract"))
    );
}

#[tokio::test]
async fn test_malformed_policy_fails_before_waiting() {
    let (runner, sleeper) = mock_runner();
    let policy = PolicySnapshot::unthrottled()
        .with_max_rate("0")
        .with_last_operation(LastOperation::new(t0(), 1));

    let err = runner
        .run_blocking_action(&policy, || Ok::<_, Infallible>(()), &GateConfig::default())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GateError::Admission(WaitError::Policy(PolicyError::InvalidRate {
            raw: "0".to_string()
        }))
    );
    assert!(sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_timeout_reports_budget() {
    let (runner, sleeper) = mock_runner();
    let metrics = GateMetrics::new();
    let runner = runner.with_metrics(metrics.clone());
    let config = GateConfig::new(
        WaitConfig::builder()
            .max_wait(Duration::from_secs(2))
            .build()
            .unwrap(),
    );

    let err = runner
        .run_blocking_action(&throttled(1.0, 30), || Ok::<_, Infallible>(()), &config)
        .await
        .unwrap_err();

    assert_eq!(
        err.admission(),
        Some(&WaitError::Timeout {
            max_wait: Duration::from_secs(2)
        })
    );
    assert_eq!(sleeper.total_slept(), Duration::from_secs(2));
    assert_eq!(metrics.timeouts(), 1);
}

#[tokio::test]
async fn test_error_source_chain() {
    use std::error::Error;

    let (runner, _sleeper) = mock_runner();
    let err = runner
        .run_blocking_action(
            &PolicySnapshot::unthrottled(),
            || Err::<(), _>(LedgerError("offline")),
            &GateConfig::default(),
        )
        .await
        .unwrap_err();

    let source = err.source().expect("action error exposed as source");
    assert_eq!(source.to_string(), "ledger error: offline");
}

#[tokio::test(start_paused = true)]
async fn test_system_runner_with_paused_time() {
    let runner = GatedActionRunner::system();
    let outcome = runner
        .run(
            &PolicySnapshot::unthrottled(),
            || async { Ok::<_, Infallible>(true) },
            &GateConfig::default(),
        )
        .await
        .unwrap();

    assert!(outcome.result);
    assert!(!outcome.was_rate_limited);
}
