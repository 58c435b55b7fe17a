//! Versioned engine configuration documents.

use super::{format_ts, ConfigVersionRow, ScreenStore};
use crate::{
    config::{ConfigSource, EngineConfig},
    error::EngineResult,
};
use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension};

impl ScreenStore {
    /// Store a full config document under its version. Re-saving an
    /// existing version replaces it and makes it the latest.
    pub fn save_config(&self, config: &EngineConfig, created_at: &NaiveDateTime) -> EngineResult<()> {
        let payload = serde_json::to_string(config)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO config_version (version, payload, created_at)
             VALUES (?1, ?2, ?3)",
            params![config.version, payload, format_ts(created_at)],
        )?;
        Ok(())
    }

    pub fn latest_config_row(&self) -> EngineResult<Option<ConfigVersionRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT version, payload, created_at FROM config_version
                 ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(ConfigVersionRow {
                        version:    row.get(0)?,
                        payload:    row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn latest_config(&self) -> EngineResult<Option<EngineConfig>> {
        match self.latest_config_row()? {
            Some(row) => Ok(Some(EngineConfig::from_json(&row.payload)?)),
            None => Ok(None),
        }
    }

    pub fn config_version_count(&self) -> EngineResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM config_version", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl ConfigSource for ScreenStore {
    fn describe(&self) -> String {
        match &self.path {
            Some(p) => format!("config_version table in {p}"),
            None => "config_version table (in-memory)".into(),
        }
    }

    fn fetch(&self) -> anyhow::Result<EngineConfig> {
        self.latest_config()?
            .ok_or_else(|| anyhow::anyhow!("no config version stored"))
    }
}
