//! Shared primitive types used across the entire screening engine.

use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A stable identifier for a player account.
pub type AccountId = String;

/// Monetary amounts. Sign is carried but never relied upon.
pub type Amount = Decimal;

/// Largest absolute amount a single upstream record may carry. Anything
/// beyond is a feed error, not a movement.
pub const MAX_ABS_AMOUNT: Amount = dec!(1000000000000);

// ── Transaction ──────────────────────────────────────────────────────────────

/// One validated monetary movement. Read-only inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: NaiveDateTime,
    pub label:     String,
    pub amount:    Amount,
}

impl Transaction {
    pub fn new(timestamp: NaiveDateTime, label: impl Into<String>, amount: Amount) -> Self {
        Self {
            timestamp,
            label: label.into(),
            amount,
        }
    }

    /// Calendar day of the movement.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn abs_amount(&self) -> Amount {
        self.amount.abs()
    }
}

/// A transaction record exactly as the upstream collaborator hands it over.
///
/// Every field is optional so that a broken record can be rejected
/// individually instead of failing deserialization of the whole account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub label:     Option<String>,
    #[serde(default)]
    pub amount:    Option<serde_json::Value>,
}

impl RawTransaction {
    pub fn new(timestamp: &str, label: &str, amount: serde_json::Value) -> Self {
        Self {
            timestamp: Some(timestamp.to_string()),
            label:     Some(label.to_string()),
            amount:    Some(amount),
        }
    }

    /// Validate into a `Transaction`. `index` is the record's position in the
    /// account's input and is only used for error reporting.
    pub fn validate(&self, index: usize) -> EngineResult<Transaction> {
        let malformed = |reason: &str| EngineError::MalformedTransaction {
            index,
            reason: reason.to_string(),
        };

        let raw_ts = self
            .timestamp
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("missing timestamp"))?;
        let timestamp = parse_timestamp(raw_ts)
            .ok_or_else(|| malformed(&format!("unparseable timestamp '{raw_ts}'")))?;

        let label = self
            .label
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("missing label"))?;

        let amount = match &self.amount {
            Some(value) => parse_amount(value)
                .ok_or_else(|| malformed(&format!("non-numeric amount {value}")))?,
            None => return Err(malformed("missing amount")),
        };
        if amount.abs() > MAX_ABS_AMOUNT {
            return Err(malformed(&format!("amount {amount} out of range")));
        }

        Ok(Transaction::new(timestamp, label, amount))
    }
}

/// Accepts RFC 3339 (normalised to UTC), `YYYY-MM-DD HH:MM:SS[.f]`,
/// `YYYY-MM-DDTHH:MM:SS[.f]` and bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_amount(value: &serde_json::Value) -> Option<Amount> {
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

// ── Risk level ───────────────────────────────────────────────────────────────

/// Ordered risk levels. Declaration order is the escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Elevated,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low      => "Low",
            RiskLevel::Medium   => "Medium",
            RiskLevel::High     => "High",
            RiskLevel::Elevated => "Elevated",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Derived structures ───────────────────────────────────────────────────────

/// A detected structuring episode within one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuringEvent {
    pub window_start: NaiveDate,
    pub trigger_date: NaiveDate,
    pub total_amount: Amount,
    pub transaction_count: usize,
}

impl StructuringEvent {
    /// True when `[window_start, trigger_date]` intersects `[from, to]`.
    pub fn intersects(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.window_start <= to && from <= self.trigger_date
    }
}

/// The engine's verdict for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
}

impl RiskAssessment {
    /// Verdict for an account with no usable history.
    pub fn empty() -> Self {
        Self {
            score: 0,
            level: RiskLevel::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_supported_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-05 14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T15:30:00+01:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-05"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("05/03/2024"), None);
    }

    #[test]
    fn numeric_strings_are_accepted_as_amounts() {
        let raw = RawTransaction::new("2024-01-01", "Direct top-up", json!("-250.50"));
        assert_eq!(raw.validate(0).unwrap().amount, dec!(-250.50));
    }

    #[test]
    fn malformed_records_are_rejected_with_their_index() {
        let raw = RawTransaction {
            timestamp: None,
            label:     Some("Direct top-up".into()),
            amount:    Some(json!(10)),
        };
        match raw.validate(7) {
            Err(EngineError::MalformedTransaction { index, .. }) => assert_eq!(index, 7),
            other => panic!("expected malformed error, got {other:?}"),
        }

        let raw = RawTransaction::new("2024-01-01", "Direct top-up", json!("ten"));
        assert!(raw.validate(0).is_err());

        let raw = RawTransaction::new("2024-01-01", "Direct top-up", json!(null));
        assert!(raw.validate(0).is_err());
    }

    #[test]
    fn amounts_beyond_the_sanity_bound_are_malformed() {
        let at_bound = RawTransaction::new("2024-01-01", "Direct top-up", json!("-1000000000000"));
        assert_eq!(at_bound.validate(0).unwrap().amount, -MAX_ABS_AMOUNT);

        let huge = RawTransaction::new("2024-01-01", "Direct top-up", json!(Decimal::MAX.to_string()));
        assert!(matches!(
            huge.validate(3),
            Err(EngineError::MalformedTransaction { index: 3, .. })
        ));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Elevated);
    }
}
