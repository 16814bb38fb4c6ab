//! Admission decisions through the public API.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use mint_throttle::{
    evaluate, status, AdmissionDecision, LastOperation, PolicyError, PolicySnapshot, RateValue,
    TimestampValue,
};
use std::time::Duration;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
}

fn at(ms: i64) -> DateTime<Utc> {
    t0() + ChronoDuration::milliseconds(ms)
}

#[test]
fn test_disabled_policy_ignores_history() {
    for count in [-5, 0, 1, 1_000_000] {
        let policy =
            PolicySnapshot::unthrottled().with_last_operation(LastOperation::new(t0(), count));
        assert_eq!(evaluate(&policy, t0()), Ok(AdmissionDecision::Allowed));
    }
}

#[test]
fn test_scenarios_from_ledger_records() {
    let a = PolicySnapshot::from_ledger_json(
        r#"{"maxRatePerSecond":100,"lastOperation":{"timestamp":"2025-03-14T09:26:53Z","count":100}}"#,
    )
    .unwrap();
    assert_eq!(
        evaluate(&a, at(500)),
        Ok(AdmissionDecision::Denied {
            wait: Duration::from_millis(500)
        })
    );

    let b = PolicySnapshot::from_ledger_json(
        r#"{"maxRatePerSecond":"1","lastOperation":{"timestamp":"2025-03-14T09:26:53Z","count":5}}"#,
    )
    .unwrap();
    assert_eq!(
        evaluate(&b, at(3000)),
        Ok(AdmissionDecision::Denied {
            wait: Duration::from_millis(2000)
        })
    );
    assert!(evaluate(&b, at(5000)).unwrap().is_allowed());
}

#[test]
fn test_epoch_millis_timestamp() {
    let json = format!(
        r#"{{"maxRatePerSecond":4,"lastOperation":{{"timestamp":{},"count":2}}}}"#,
        t0().timestamp_millis()
    );
    let policy = PolicySnapshot::from_ledger_json(&json).unwrap();

    assert_eq!(
        policy.last_operation.as_ref().unwrap().timestamp,
        TimestampValue::EpochMillis(t0().timestamp_millis())
    );
    assert_eq!(
        evaluate(&policy, at(100)).unwrap().wait(),
        Some(Duration::from_millis(400))
    );
}

#[test]
fn test_invalid_rates_report_raw_value() {
    let cases = [
        (RateValue::Number(0.0), "0"),
        (RateValue::Number(-2.5), "-2.5"),
        (RateValue::from("NaN"), "NaN"),
        (RateValue::from("ten"), "ten"),
    ];

    for (rate, raw) in cases {
        let policy = PolicySnapshot::unthrottled()
            .with_max_rate(rate)
            .with_last_operation(LastOperation::new(t0(), 1));

        assert_eq!(
            evaluate(&policy, t0()),
            Err(PolicyError::InvalidRate {
                raw: raw.to_string()
            })
        );
    }
}

#[test]
fn test_invalid_timestamp_from_ledger() {
    let policy = PolicySnapshot::from_ledger_json(
        r#"{"maxRatePerSecond":1,"lastOperation":{"timestamp":"last tuesday","count":1}}"#,
    )
    .unwrap();

    let err = evaluate(&policy, t0()).unwrap_err();
    assert_eq!(
        err,
        PolicyError::InvalidTimestamp {
            raw: "last tuesday".to_string()
        }
    );
    assert_eq!(
        err.to_string(),
        "invalid last operation timestamp: last tuesday"
    );
}

#[test]
fn test_status_matches_decision() {
    let policy = PolicySnapshot::unthrottled()
        .with_max_rate(8.0)
        .with_last_operation(LastOperation::new(t0(), 4));

    for ms in [0, 100, 499, 500, 900] {
        let decision = evaluate(&policy, at(ms)).unwrap();
        let report = status(&policy, at(ms)).unwrap();

        assert_eq!(report.decision, decision);
        assert!(report.is_policy_enabled);
        assert_eq!(
            report.wait_seconds,
            decision.wait().map(|w| w.as_millis() as f64 / 1000.0)
        );
    }
}
