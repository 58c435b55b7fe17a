//! Account review state and the status audit trail.

use super::{format_ts, parse_ts, AccountReviewRow, ScreenStore};
use crate::{
    error::{EngineError, EngineResult},
    event::{AuditEntry, ScreeningEvent},
    reconciliation::{Reconciled, ReviewState},
};
use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension};

impl ScreenStore {
    /// Record a manual review action (or seed an account's status).
    pub fn set_review_status(
        &self,
        account_id: &str,
        status: &str,
        last_action_at: Option<&NaiveDateTime>,
    ) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO account_review (account_id, status, last_action_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(account_id) DO UPDATE SET
                status = excluded.status,
                last_action_at = excluded.last_action_at",
            params![account_id, status, last_action_at.map(format_ts)],
        )?;
        Ok(())
    }

    pub fn review_row(&self, account_id: &str) -> EngineResult<Option<AccountReviewRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT account_id, status, last_action_at FROM account_review
                 WHERE account_id = ?1",
                params![account_id],
                |row| {
                    let last: Option<String> = row.get(2)?;
                    Ok(AccountReviewRow {
                        account_id:     row.get(0)?,
                        status:         row.get(1)?,
                        last_action_at: last.map(|s| parse_ts(2, &s)).transpose()?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn review_status(&self, account_id: &str) -> EngineResult<Option<ReviewState>> {
        Ok(self
            .review_row(account_id)?
            .map(|r| ReviewState::new(r.status, r.last_action_at)))
    }

    pub fn require_review_status(&self, account_id: &str) -> EngineResult<ReviewState> {
        self.review_status(account_id)?
            .ok_or_else(|| EngineError::UnknownAccount {
                account_id: account_id.to_string(),
            })
    }

    /// Append one event to the audit trail. Returns the new audit id.
    pub fn append_audit(
        &self,
        event: &ScreeningEvent,
        recorded_at: &NaiveDateTime,
    ) -> EngineResult<String> {
        let audit_id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO status_audit (audit_id, account_id, event_type, payload, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                audit_id,
                event.account_id(),
                event.type_name(),
                serde_json::to_string(event)?,
                format_ts(recorded_at),
            ],
        )?;
        Ok(audit_id)
    }

    /// Audit rows for one account, oldest first.
    pub fn audit_for_account(&self, account_id: &str) -> EngineResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT audit_id, account_id, event_type, payload, recorded_at
             FROM status_audit WHERE account_id = ?1
             ORDER BY rowid ASC",
        )?;
        let entries = stmt
            .query_map(params![account_id], |row| {
                Ok(AuditEntry {
                    audit_id:    row.get(0)?,
                    account_id:  row.get(1)?,
                    event_type:  row.get(2)?,
                    payload:     row.get(3)?,
                    recorded_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Persist a reconciliation override: new status plus audit row, in one
    /// transaction. The last manual action time is left untouched. Returns
    /// false (and writes nothing) when the status was preserved.
    pub fn apply_reconciliation(
        &self,
        reconciled: &Reconciled,
        recorded_at: &NaiveDateTime,
    ) -> EngineResult<bool> {
        let Some(event) = reconciled.audit_event() else {
            return Ok(false);
        };
        let tx = self.conn.unchecked_transaction()?;
        let updated = self.conn.execute(
            "UPDATE account_review SET status = ?2 WHERE account_id = ?1",
            params![reconciled.report.account_id, reconciled.outcome.status()],
        )?;
        if updated == 0 {
            return Err(EngineError::UnknownAccount {
                account_id: reconciled.report.account_id.clone(),
            });
        }
        self.append_audit(&event, recorded_at)?;
        tx.commit()?;
        Ok(true)
    }
}
