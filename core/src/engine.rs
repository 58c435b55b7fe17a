//! The screening engine: one account's transactions in, one report out.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Sanitize    raw records → transactions (malformed ones excluded)
//!   2. Classify    label → category, then stable sort by timestamp
//!   3. Net         cancelled withdrawals removed
//!   4. Structuring deposits and effective withdrawals, independently
//!   5. Patterns    over the raw classified set
//!   6. Volumes     deposits and effective withdrawals
//!   7. Escalate    base level + aggravants → level and score
//!
//! RULES:
//!   - Every stage is a pure function of (transactions, EngineConfig).
//!   - The engine holds one immutable config snapshot for its lifetime.
//!   - Nothing here does I/O; batch cancellation happens between accounts.

use crate::{
    classifier::{classify_all, KeywordClassifier, LabelClassifier},
    config::EngineConfig,
    escalation::{escalate, Signals, TriggeredMotivation},
    netting::{net_reversals, Netted, NettingSummary},
    patterns::{detect_patterns, PatternFlag},
    structuring::detect_structuring,
    types::{AccountId, RawTransaction, RiskAssessment, RiskLevel, StructuringEvent, Transaction},
    volume::VolumeProfile,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Full explanation of one account's assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningReport {
    pub account_id:        AccountId,
    pub assessment:        RiskAssessment,
    pub base_level:        RiskLevel,
    pub deposit_events:    Vec<StructuringEvent>,
    pub withdrawal_events: Vec<StructuringEvent>,
    pub flags:             BTreeSet<PatternFlag>,
    pub motivations:       Vec<TriggeredMotivation>,
    pub netting:           NettingSummary,
    pub volumes:           VolumeProfile,
    pub transaction_count: usize,
    pub rejected_records:  usize,
    pub config_version:    String,
}

impl ScreeningReport {
    fn empty(account_id: &str, config_version: &str) -> Self {
        Self {
            account_id:        account_id.to_string(),
            assessment:        RiskAssessment::empty(),
            base_level:        RiskLevel::Low,
            deposit_events:    Vec::new(),
            withdrawal_events: Vec::new(),
            flags:             BTreeSet::new(),
            motivations:       Vec::new(),
            netting:           NettingSummary::default(),
            volumes:           VolumeProfile::default(),
            transaction_count: 0,
            rejected_records:  0,
            config_version:    config_version.to_string(),
        }
    }

    /// Names of every triggered motivation and raised flag.
    pub fn triggered_names(&self) -> BTreeSet<String> {
        self.motivations
            .iter()
            .map(|m| m.name.clone())
            .chain(self.flags.iter().map(|f| f.motivation().to_string()))
            .collect()
    }
}

/// Report plus the netting result it was derived from. Borrowed from the
/// transactions it analysed.
pub struct Analysis<'t> {
    pub netted: Netted<'t>,
    pub report: ScreeningReport,
}

/// One account as handed over by the ingestion collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInput {
    pub account_id:   AccountId,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub reports:   Vec<ScreeningReport>,
    /// True when the batch stopped early on the cancellation flag.
    pub cancelled: bool,
}

pub struct ScreeningEngine {
    config:     Arc<EngineConfig>,
    classifier: Box<dyn LabelClassifier + Send + Sync>,
}

impl ScreeningEngine {
    /// Engine using the keyword classifier built from the config vocabulary.
    pub fn new(config: Arc<EngineConfig>) -> Self {
        let classifier = KeywordClassifier::new(&config.vocabulary);
        Self {
            config,
            classifier: Box::new(classifier),
        }
    }

    /// Replace the label classifier.
    pub fn with_classifier<C>(mut self, classifier: C) -> Self
    where
        C: LabelClassifier + Send + Sync + 'static,
    {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate raw records, excluding (and logging) malformed ones.
    /// Returns the usable transactions and the number rejected.
    pub fn sanitize(account_id: &str, raw: &[RawTransaction]) -> (Vec<Transaction>, usize) {
        let mut rejected = 0;
        let txns = raw
            .iter()
            .enumerate()
            .filter_map(|(i, r)| match r.validate(i) {
                Ok(txn) => Some(txn),
                Err(e) => {
                    log::warn!("account={account_id} excluded record: {e}");
                    rejected += 1;
                    None
                }
            })
            .collect();
        (txns, rejected)
    }

    /// Screen an account from raw upstream records.
    pub fn screen_raw(&self, account_id: &str, raw: &[RawTransaction]) -> ScreeningReport {
        let (txns, rejected) = Self::sanitize(account_id, raw);
        let mut report = self.screen(account_id, &txns);
        report.rejected_records = rejected;
        report
    }

    /// Screen an account from validated transactions.
    pub fn screen(&self, account_id: &str, txns: &[Transaction]) -> ScreeningReport {
        self.analyze(account_id, txns).report
    }

    /// Run the full pipeline, keeping the netting result for callers that
    /// need to know which transactions survived it.
    pub fn analyze<'t>(&self, account_id: &str, txns: &'t [Transaction]) -> Analysis<'t> {
        let cfg = &*self.config;
        if txns.is_empty() {
            return Analysis {
                netted: Netted::default(),
                report: ScreeningReport::empty(account_id, &cfg.version),
            };
        }

        let mut classified = classify_all(self.classifier.as_ref(), txns);
        classified.sort_by_key(|c| c.txn.timestamp);

        let netted = net_reversals(&classified, &cfg.netting);

        let window = cfg.structuring.window_days;
        let deposit_events =
            detect_structuring(&netted.deposits, cfg.structuring.deposit_threshold, window);
        let withdrawal_events = detect_structuring(
            &netted.effective_withdrawals,
            cfg.structuring.withdrawal_threshold,
            window,
        );

        let flags = detect_patterns(&classified, cfg);
        let volumes = VolumeProfile::aggregate(&netted.deposits, &netted.effective_withdrawals);

        let escalation = escalate(
            &Signals {
                volumes:           &volumes,
                deposit_events:    &deposit_events,
                withdrawal_events: &withdrawal_events,
                flags:             &flags,
            },
            cfg,
        );

        log::debug!(
            "account={account_id} txns={} level={} score={}",
            txns.len(),
            escalation.assessment.level,
            escalation.assessment.score
        );

        let report = ScreeningReport {
            account_id:        account_id.to_string(),
            assessment:        escalation.assessment,
            base_level:        escalation.base_level,
            deposit_events,
            withdrawal_events,
            flags,
            motivations:       escalation.motivations,
            netting:           netted.summary(),
            volumes,
            transaction_count: txns.len(),
            rejected_records:  0,
            config_version:    cfg.version.clone(),
        };

        Analysis { netted, report }
    }

    /// Screen many accounts against this engine's single config snapshot.
    /// `cancel` is checked between accounts; reports already produced stay
    /// valid when the batch stops early.
    pub fn screen_batch<I>(&self, accounts: I, cancel: &AtomicBool) -> BatchOutcome
    where
        I: IntoIterator<Item = AccountInput>,
    {
        let mut outcome = BatchOutcome::default();
        for account in accounts {
            if cancel.load(Ordering::Relaxed) {
                log::warn!(
                    "Batch cancelled after {} accounts (config '{}')",
                    outcome.reports.len(),
                    self.config.version
                );
                outcome.cancelled = true;
                break;
            }
            let report = self.screen_raw(&account.account_id, &account.transactions);
            if report.rejected_records > 0 {
                log::warn!(
                    "account={} scored with {} malformed records excluded",
                    account.account_id,
                    report.rejected_records
                );
            }
            outcome.reports.push(report);
        }
        log::info!(
            "Batch screened {} accounts with config '{}'",
            outcome.reports.len(),
            self.config.version
        );
        outcome
    }
}
