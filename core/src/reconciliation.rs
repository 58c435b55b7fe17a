//! Status reconciliation: decides whether a manually reviewed account is
//! silently re-escalated because of transactions that arrived after the
//! last manual action.
//!
//! Design:
//!   - "New" transactions are strictly after `last_action_at` (all of them
//!     when there was no action yet).
//!   - Override only when the fresh level is High or Elevated AND the new
//!     transactions either touch a structuring event's date range or sit in
//!     a volume bucket above its threshold.
//!   - Otherwise the manual status is kept verbatim.

use crate::{
    engine::{ScreeningEngine, ScreeningReport},
    event::ScreeningEvent,
    types::{RiskLevel, Transaction},
    volume::{CategoryVolumes, Granularity},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const STATUS_HIGH_RISK: &str = "high-risk";
pub const STATUS_CRITICAL_RISK: &str = "critical-risk";

/// Previously stored review state of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewState {
    pub status:         String,
    pub last_action_at: Option<NaiveDateTime>,
}

impl ReviewState {
    pub fn new(status: impl Into<String>, last_action_at: Option<NaiveDateTime>) -> Self {
        Self {
            status: status.into(),
            last_action_at,
        }
    }

    fn is_new(&self, txn: &Transaction) -> bool {
        self.last_action_at.map_or(true, |at| txn.timestamp > at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideReason {
    NewStructuring,
    VolumeThresholdExceeded,
}

impl OverrideReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideReason::NewStructuring          => "new structuring detected",
            OverrideReason::VolumeThresholdExceeded => "volume threshold exceeded",
        }
    }
}

impl fmt::Display for OverrideReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    Preserved {
        status: String,
    },
    Overridden {
        previous_status: String,
        status:          String,
        reasons:         Vec<OverrideReason>,
    },
}

impl ReconciliationOutcome {
    /// The status the account ends up with.
    pub fn status(&self) -> &str {
        match self {
            ReconciliationOutcome::Preserved { status }
            | ReconciliationOutcome::Overridden { status, .. } => status,
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self, ReconciliationOutcome::Overridden { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub report:  ScreeningReport,
    pub outcome: ReconciliationOutcome,
}

impl Reconciled {
    /// Audit event for an override, `None` when the status was preserved.
    pub fn audit_event(&self) -> Option<ScreeningEvent> {
        match &self.outcome {
            ReconciliationOutcome::Preserved { .. } => None,
            ReconciliationOutcome::Overridden {
                previous_status,
                status,
                reasons,
            } => Some(ScreeningEvent::StatusOverridden {
                account_id:      self.report.account_id.clone(),
                previous_status: previous_status.clone(),
                new_status:      status.clone(),
                level:           self.report.assessment.level,
                reasons:         reasons.iter().map(|r| r.as_str().to_string()).collect(),
            }),
        }
    }
}

fn automatic_status(level: RiskLevel) -> Option<&'static str> {
    match level {
        RiskLevel::Elevated => Some(STATUS_CRITICAL_RISK),
        RiskLevel::High     => Some(STATUS_HIGH_RISK),
        RiskLevel::Low | RiskLevel::Medium => None,
    }
}

fn fresh<'t>(prior: &ReviewState, category: &[&'t Transaction]) -> Vec<&'t Transaction> {
    category.iter().copied().filter(|t| prior.is_new(t)).collect()
}

/// True when a bucket holding one of `new_txns` exceeds its threshold.
fn new_volume_breach(
    new_txns: &[&Transaction],
    volumes: &CategoryVolumes,
    engine: &ScreeningEngine,
) -> bool {
    let thresholds = &engine.config().thresholds;
    Granularity::ALL.iter().any(|g| {
        let limit = g.threshold(thresholds);
        let buckets = volumes.buckets(*g);
        new_txns
            .iter()
            .any(|t| buckets.get(&g.key_for(t.day())).is_some_and(|total| *total > limit))
    })
}

pub fn reconcile(
    engine: &ScreeningEngine,
    account_id: &str,
    prior: &ReviewState,
    txns: &[Transaction],
) -> Reconciled {
    let analysis = engine.analyze(account_id, txns);
    let report = analysis.report;
    let preserved = ReconciliationOutcome::Preserved {
        status: prior.status.clone(),
    };

    let Some(new_status) = automatic_status(report.assessment.level) else {
        return Reconciled { report, outcome: preserved };
    };

    let new_days: Vec<_> = txns.iter().filter(|t| prior.is_new(t)).map(Transaction::day).collect();
    let (Some(from), Some(to)) = (new_days.iter().min().copied(), new_days.iter().max().copied()) else {
        return Reconciled { report, outcome: preserved };
    };

    let mut reasons = Vec::new();

    if report
        .deposit_events
        .iter()
        .chain(&report.withdrawal_events)
        .any(|e| e.intersects(from, to))
    {
        reasons.push(OverrideReason::NewStructuring);
    }

    let new_deposits = fresh(prior, &analysis.netted.deposits);
    let new_withdrawals = fresh(prior, &analysis.netted.effective_withdrawals);
    if new_volume_breach(&new_deposits, &report.volumes.deposits, engine)
        || new_volume_breach(&new_withdrawals, &report.volumes.withdrawals, engine)
    {
        reasons.push(OverrideReason::VolumeThresholdExceeded);
    }

    if reasons.is_empty() || prior.status == new_status {
        return Reconciled { report, outcome: preserved };
    }

    let summary: Vec<&str> = reasons.iter().map(OverrideReason::as_str).collect();
    log::warn!(
        "account={account_id} status '{}' overridden to '{new_status}': {}",
        prior.status,
        summary.join(", ")
    );

    Reconciled {
        outcome: ReconciliationOutcome::Overridden {
            previous_status: prior.status.clone(),
            status:          new_status.to_string(),
            reasons,
        },
        report,
    }
}
