//! Audit events emitted by the orchestration layer.
//!
//! RULE: Every automatic status change is recorded as a `ScreeningEvent`.
//! Variants are only ever added, never removed or reordered.

use crate::types::{AccountId, RiskLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScreeningEvent {
    AccountScreened {
        account_id:     AccountId,
        level:          RiskLevel,
        score:          u32,
        config_version: String,
    },
    StatusOverridden {
        account_id:      AccountId,
        previous_status: String,
        new_status:      String,
        level:           RiskLevel,
        reasons:         Vec<String>,
    },
}

impl ScreeningEvent {
    pub fn account_id(&self) -> &str {
        match self {
            ScreeningEvent::AccountScreened { account_id, .. }
            | ScreeningEvent::StatusOverridden { account_id, .. } => account_id,
        }
    }

    /// Stable name for the `event_type` column of the audit table.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScreeningEvent::AccountScreened { .. }  => "account_screened",
            ScreeningEvent::StatusOverridden { .. } => "status_overridden",
        }
    }
}

/// One persisted audit row.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub audit_id:    String,
    pub account_id:  AccountId,
    pub event_type:  String,
    pub payload:     String,
    pub recorded_at: String,
}

impl AuditEntry {
    pub fn event(&self) -> serde_json::Result<ScreeningEvent> {
        serde_json::from_str(&self.payload)
    }
}
