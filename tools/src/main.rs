//! screen-runner: headless batch runner for the AML screening engine.
//!
//! Usage:
//!   screen-runner --input accounts.json
//!   screen-runner --input accounts.json --config cfg.json --db screen.db --pretty
//!
//! The input file is either a JSON list of accounts or `{ "accounts": [...] }`,
//! each account being `{ "account_id": ..., "transactions": [...] }`.
//! Reports go to stdout, one JSON document per account; the summary goes to
//! stderr.

use amlscreen_core::{
    config::{ConfigSource, FileConfigSource},
    engine::{AccountInput, ScreeningReport},
    event::ScreeningEvent,
    reconciliation::{reconcile, ReconciliationOutcome},
    store::ScreenStore,
    ConfigProvider, ScreeningEngine,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, sync::atomic::AtomicBool};

#[derive(Deserialize)]
#[serde(untagged)]
enum InputFile {
    Wrapped { accounts: Vec<AccountInput> },
    Bare(Vec<AccountInput>),
}

impl InputFile {
    fn into_accounts(self) -> Vec<AccountInput> {
        match self {
            InputFile::Wrapped { accounts } | InputFile::Bare(accounts) => accounts,
        }
    }
}

#[derive(Serialize)]
struct AccountOutput<'a> {
    report: &'a ScreeningReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    review: Option<ReconciliationOutcome>,
}

#[derive(Default)]
struct Summary {
    screened:  usize,
    rejected:  usize,
    reviewed:  usize,
    overrides: usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(input) = arg_value(&args, "--input") else {
        eprintln!("usage: screen-runner --input accounts.json [--config cfg.json] [--db screen.db] [--pretty]");
        std::process::exit(2);
    };
    let config_path = arg_value(&args, "--config");
    let db = arg_value(&args, "--db");
    let pretty = args.iter().any(|a| a == "--pretty");

    let store = match db {
        Some(path) => {
            let store = ScreenStore::open(path)?;
            store.migrate()?;
            Some(store)
        }
        None => None,
    };

    // One snapshot for the whole batch: a file override wins over the store.
    let file_source = config_path.map(FileConfigSource::new);
    let source: Option<&dyn ConfigSource> = match (&file_source, &store) {
        (Some(file), _) => Some(file as &dyn ConfigSource),
        (None, Some(store)) => Some(store as &dyn ConfigSource),
        (None, None) => None,
    };
    let snapshot = match source {
        Some(source) => ConfigProvider::new(source).snapshot(),
        None => ConfigProvider::builtin().snapshot(),
    };

    eprintln!("screen-runner: AML batch screening");
    eprintln!("  input:     {input}");
    eprintln!("  config:    {}", snapshot.version);
    eprintln!("  db:        {}", db.unwrap_or("(none)"));
    eprintln!();

    let content = std::fs::read_to_string(input).with_context(|| format!("Cannot read {input}"))?;
    let accounts = serde_json::from_str::<InputFile>(&content)
        .with_context(|| format!("Cannot parse accounts in {input}"))?
        .into_accounts();

    let engine = ScreeningEngine::new(snapshot);
    let cancel = AtomicBool::new(false);
    let outcome = engine.screen_batch(accounts.iter().cloned(), &cancel);

    let now = chrono::Utc::now().naive_utc();
    let mut summary = Summary::default();

    for (report, account) in outcome.reports.iter().zip(&accounts) {
        summary.screened += 1;
        summary.rejected += report.rejected_records;

        let mut review = None;
        if let Some(store) = &store {
            store.append_audit(
                &ScreeningEvent::AccountScreened {
                    account_id:     report.account_id.clone(),
                    level:          report.assessment.level,
                    score:          report.assessment.score,
                    config_version: report.config_version.clone(),
                },
                &now,
            )?;

            if let Some(prior) = store.review_status(&account.account_id)? {
                let (txns, _) = ScreeningEngine::sanitize(&account.account_id, &account.transactions);
                let reconciled = reconcile(&engine, &account.account_id, &prior, &txns);
                if store.apply_reconciliation(&reconciled, &now)? {
                    summary.overrides += 1;
                }
                summary.reviewed += 1;
                review = Some(reconciled.outcome);
            }
        }

        let output = AccountOutput { report, review };
        let line = if pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        };
        println!("{line}");
    }

    print_summary(&summary, accounts.len(), outcome.cancelled);
    Ok(())
}

fn print_summary(summary: &Summary, total: usize, cancelled: bool) {
    eprintln!();
    eprintln!("=== SCREENING SUMMARY ===");
    eprintln!("  accounts:         {}/{total}", summary.screened);
    eprintln!("  rejected records: {}", summary.rejected);
    eprintln!("  reviewed:         {}", summary.reviewed);
    eprintln!("  overrides:        {}", summary.overrides);
    if cancelled {
        eprintln!("  (batch cancelled before completion)");
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
