//! Throttle policy snapshots.
//!
//! A [`PolicySnapshot`] is an immutable read of the ledger's throttle record:
//! the configured transactions-per-second ceiling and the most recent gated
//! operation. Raw ledger values are kept as-is and only validated when the
//! snapshot is evaluated, so that malformed values can be reported verbatim.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Error returned when a policy snapshot cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The rate is zero, negative, NaN, infinite or not a number
    InvalidRate {
        /// The offending value as it appeared in the snapshot
        raw: String,
    },
    /// The last-operation timestamp does not describe a valid instant
    InvalidTimestamp {
        /// The offending value as it appeared in the snapshot
        raw: String,
    },
    /// The ledger record could not be decoded into a snapshot
    Decode(String),
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::InvalidRate { raw } => {
                write!(
                    f,
                    "invalid policy: max rate per second must be a finite number > 0, got {}",
                    raw
                )
            }
            PolicyError::InvalidTimestamp { raw } => {
                write!(f, "invalid last operation timestamp: {}", raw)
            }
            PolicyError::Decode(msg) => write!(f, "failed to decode policy record: {}", msg),
        }
    }
}

impl std::error::Error for PolicyError {}

/// Raw transactions-per-second value read from the ledger.
///
/// Ledger records carry decimals either as JSON numbers or as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RateValue {
    /// Numeric value
    Number(f64),
    /// Textual value, parsed on evaluation
    Text(String),
}

impl RateValue {
    /// Parse into a finite, strictly positive rate.
    ///
    /// # Errors
    /// Returns `PolicyError::InvalidRate` carrying the raw value otherwise.
    pub fn parse(&self) -> Result<f64, PolicyError> {
        let parsed = match self {
            RateValue::Number(value) => Some(*value),
            RateValue::Text(text) => text.trim().parse::<f64>().ok(),
        };

        match parsed {
            Some(rate) if rate.is_finite() && rate > 0.0 => Ok(rate),
            _ => Err(PolicyError::InvalidRate { raw: self.raw() }),
        }
    }

    fn raw(&self) -> String {
        match self {
            RateValue::Number(value) => value.to_string(),
            RateValue::Text(text) => text.clone(),
        }
    }
}

impl From<f64> for RateValue {
    fn from(value: f64) -> Self {
        RateValue::Number(value)
    }
}

impl From<u32> for RateValue {
    fn from(value: u32) -> Self {
        RateValue::Number(f64::from(value))
    }
}

impl From<&str> for RateValue {
    fn from(value: &str) -> Self {
        RateValue::Text(value.to_string())
    }
}

impl From<String> for RateValue {
    fn from(value: String) -> Self {
        RateValue::Text(value)
    }
}

/// Raw timestamp of the last gated operation.
///
/// Variant order matters for decoding: strings that are valid RFC 3339
/// become `At`, integers are epoch milliseconds, other strings are kept as
/// `Text` and any other JSON value as `Unrecognized`. Both of the latter are
/// rejected on evaluation with the raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampValue {
    /// A well-formed instant
    At(DateTime<Utc>),
    /// Milliseconds since the Unix epoch
    EpochMillis(i64),
    /// Unparsed text
    Text(String),
    /// Any other JSON value, such as a fractional number or an object
    Unrecognized(serde_json::Value),
}

impl TimestampValue {
    /// Resolve to a UTC instant.
    ///
    /// # Errors
    /// Returns `PolicyError::InvalidTimestamp` if the value is not a valid instant.
    pub fn parse(&self) -> Result<DateTime<Utc>, PolicyError> {
        match self {
            TimestampValue::At(at) => Ok(*at),
            TimestampValue::EpochMillis(millis) => DateTime::from_timestamp_millis(*millis)
                .ok_or_else(|| PolicyError::InvalidTimestamp {
                    raw: millis.to_string(),
                }),
            TimestampValue::Text(text) => DateTime::parse_from_rfc3339(text.trim())
                .map(|at| at.with_timezone(&Utc))
                .map_err(|_| PolicyError::InvalidTimestamp { raw: text.clone() }),
            TimestampValue::Unrecognized(value) => Err(PolicyError::InvalidTimestamp {
                raw: value.to_string(),
            }),
        }
    }
}

impl From<DateTime<Utc>> for TimestampValue {
    fn from(at: DateTime<Utc>) -> Self {
        TimestampValue::At(at)
    }
}

impl From<&str> for TimestampValue {
    fn from(text: &str) -> Self {
        TimestampValue::Text(text.to_string())
    }
}

/// The most recent gated operation recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperation {
    /// When the operation was recorded
    pub timestamp: TimestampValue,
    /// How many units the operation consumed
    ///
    /// Decodes from a JSON integer or from an integer string, the encoding
    /// ledger APIs use for 64-bit values.
    #[serde(deserialize_with = "deserialize_count")]
    pub count: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountRepr {
    Number(i64),
    Text(String),
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match CountRepr::deserialize(deserializer)? {
        CountRepr::Number(count) => Ok(count),
        CountRepr::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid operation count: {:?}", text))),
    }
}

impl LastOperation {
    /// Create a last-operation record.
    pub fn new(timestamp: impl Into<TimestampValue>, count: i64) -> Self {
        Self {
            timestamp: timestamp.into(),
            count,
        }
    }
}

/// Immutable view of the throttle at a point in time.
///
/// Each admission check is a pure function of the snapshot and "now". The
/// snapshot is never refreshed by this crate; callers that need to observe
/// operations recorded by other processes must fetch a new one.
///
/// # Example
/// ```
/// use mint_throttle::{LastOperation, PolicySnapshot};
/// use chrono::Utc;
///
/// let policy = PolicySnapshot::unthrottled()
///     .with_max_rate(10.0)
///     .with_last_operation(LastOperation::new(Utc::now(), 5));
///
/// assert!(policy.is_enabled());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySnapshot {
    /// Transactions-per-second ceiling; `None` disables throttling
    #[serde(default)]
    pub max_rate_per_second: Option<RateValue>,
    /// Most recent gated operation; `None` means no history
    #[serde(default)]
    pub last_operation: Option<LastOperation>,
}

impl PolicySnapshot {
    /// Create a snapshot from its parts.
    pub fn new(max_rate_per_second: Option<RateValue>, last_operation: Option<LastOperation>) -> Self {
        Self {
            max_rate_per_second,
            last_operation,
        }
    }

    /// A snapshot with throttling disabled and no history.
    pub fn unthrottled() -> Self {
        Self::default()
    }

    /// Set the transactions-per-second ceiling.
    pub fn with_max_rate(mut self, rate: impl Into<RateValue>) -> Self {
        self.max_rate_per_second = Some(rate.into());
        self
    }

    /// Set the most recent gated operation.
    pub fn with_last_operation(mut self, last_operation: LastOperation) -> Self {
        self.last_operation = Some(last_operation);
        self
    }

    /// Whether a rate ceiling is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.max_rate_per_second.is_some()
    }

    /// Decode a snapshot from the ledger's throttle record.
    ///
    /// The record uses camelCase keys; missing keys mean "absent":
    ///
    /// ```json
    /// { "maxRatePerSecond": "2.5",
    ///   "lastOperation": { "timestamp": "2024-05-01T12:00:00Z", "count": 10 } }
    /// ```
    ///
    /// # Errors
    /// Returns `PolicyError::Decode` if the JSON does not match the record shape.
    pub fn from_ledger_json(json: &str) -> Result<Self, PolicyError> {
        serde_json::from_str(json).map_err(|e| PolicyError::Decode(e.to_string()))
    }
}
