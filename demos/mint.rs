//! Minting behind a transactions-per-second policy.
//!
//! Simulates a ledger that records each mint on its throttle record and
//! re-reads the record before every call, as a real caller would.
//!
//! Run with `RUST_LOG=mint_throttle=debug` to see the wait loop.

use chrono::Utc;
use mint_throttle::{
    CancellationToken, GateConfig, GateMetrics, GatedActionRunner, LastOperation, PolicySnapshot,
    RateValue, WaitConfig,
};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Stand-in for the ledger's throttle record.
#[derive(Default)]
struct Ledger {
    last_operation: Mutex<Option<LastOperation>>,
}

impl Ledger {
    fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot::new(
            Some(RateValue::Number(20.0)),
            self.last_operation.lock().unwrap().clone(),
        )
    }

    fn mint(&self, amount: i64) -> u64 {
        *self.last_operation.lock().unwrap() = Some(LastOperation::new(Utc::now(), amount));
        amount as u64
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Gated Mint Example ===\n");
    println!("Policy: 20 units per second\n");

    let ledger = Arc::new(Ledger::default());
    let metrics = GateMetrics::new();
    let runner = GatedActionRunner::system().with_metrics(metrics.clone());
    let token = CancellationToken::new();

    let config = GateConfig::new(
        WaitConfig::builder()
            .max_wait(Duration::from_secs(10))
            .cancellation_token(token.clone())
            .on_wait_start(|d| println!("  throttled, sleeping {:?}", d))
            .build()
            .expect("valid config"),
    );

    for amount in [5, 10, 20, 2] {
        let policy = ledger.snapshot();
        let status = policy.status(Utc::now()).expect("well-formed policy");
        println!("Status before minting {}: {}", amount, status);

        let ledger = Arc::clone(&ledger);
        let outcome = runner
            .run(
                &policy,
                || async move { Ok::<_, Infallible>(ledger.mint(amount)) },
                &config,
            )
            .await
            .expect("mint admitted");

        println!(
            "  minted {} (rate limited: {}, waited {:?})\n",
            outcome.result, outcome.was_rate_limited, outcome.waited
        );
    }

    // A cancelled token stops the next throttled mint before it starts
    token.cancel();
    let policy = ledger.snapshot();
    let result = runner
        .run_blocking_action(&policy, || Ok::<_, Infallible>(ledger.mint(1)), &config)
        .await;
    println!("After cancel: {:?}\n", result.map(|o| o.result));

    let snapshot = metrics.snapshot();
    println!("=== Metrics ===");
    println!("Admitted immediately: {}", snapshot.admitted_immediately);
    println!("Admitted after wait:  {}", snapshot.admitted_after_wait);
    println!("Aborted:              {}", snapshot.aborts);
    println!("Total waited:         {:?}", snapshot.total_waited);
}
