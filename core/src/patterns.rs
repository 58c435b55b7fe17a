//! Behavioral pattern checks over the raw (un-netted) transaction set.
//!
//! Checks:
//!   1. Rapid cycle: some deposit is followed by a withdrawal no more than
//!      `rapid_cycle_days` later, both ends inclusive. Cancellations are not
//!      withdrawals.
//!   2. Bonus concentration: bonus rows make up at least the configured
//!      percentage (default 10) of all rows, inclusive.
//!   3. Live casino concentration: live rows make up at least the configured
//!      percentage (default 40) of gameplay rows, inclusive. No gameplay, no
//!      flag.
//!
//! Percentages compare by cross-multiplication, never by division.

use crate::{
    classifier::{Classified, TxnCategory},
    config::{motivation, EngineConfig},
};
use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ── Constants ────────────────────────────────────────────────────────────────

const DEFAULT_BONUS_PERCENTAGE: Decimal = dec!(10);
const DEFAULT_LIVE_PERCENTAGE: Decimal = dec!(40);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFlag {
    RapidCycle,
    BonusConcentration,
    LiveCasinoConcentration,
}

impl PatternFlag {
    /// Name of the motivation this flag feeds.
    pub fn motivation(&self) -> &'static str {
        match self {
            PatternFlag::RapidCycle              => motivation::RAPID_CYCLE,
            PatternFlag::BonusConcentration      => motivation::BONUS_CONCENTRATION,
            PatternFlag::LiveCasinoConcentration => motivation::LIVE_CASINO_CONCENTRATION,
        }
    }
}

/// Run every pattern check. Flags are reported regardless of whether their
/// motivation is enabled; gating happens during escalation.
pub fn detect_patterns(txns: &[Classified<'_>], cfg: &EngineConfig) -> BTreeSet<PatternFlag> {
    let mut flags = BTreeSet::new();

    if rapid_cycle(txns, Duration::try_days(cfg.patterns.rapid_cycle_days)) {
        flags.insert(PatternFlag::RapidCycle);
    }

    let bonus_pct = cfg.threshold_percentage(motivation::BONUS_CONCENTRATION, DEFAULT_BONUS_PERCENTAGE);
    if bonus_concentration(txns, bonus_pct) {
        flags.insert(PatternFlag::BonusConcentration);
    }

    let live_pct = cfg.threshold_percentage(motivation::LIVE_CASINO_CONCENTRATION, DEFAULT_LIVE_PERCENTAGE);
    if live_casino_concentration(txns, live_pct) {
        flags.insert(PatternFlag::LiveCasinoConcentration);
    }

    flags
}

/// True when some deposit is followed by a withdrawal within
/// `[deposit, deposit + window]`, both ends inclusive. `None` is a window
/// too large to represent, i.e. any later withdrawal counts.
pub fn rapid_cycle(txns: &[Classified<'_>], window: Option<Duration>) -> bool {
    let mut withdrawals: Vec<NaiveDateTime> = txns
        .iter()
        .filter(|c| c.category == TxnCategory::Withdrawal)
        .map(|c| c.txn.timestamp)
        .collect();
    if withdrawals.is_empty() {
        return false;
    }
    withdrawals.sort_unstable();

    txns.iter()
        .filter(|c| c.category == TxnCategory::Deposit)
        .any(|d| {
            let from = d.txn.timestamp;
            let first = withdrawals.partition_point(|w| *w < from);
            withdrawals
                .get(first)
                .is_some_and(|w| window.map_or(true, |win| *w - from <= win))
        })
}

/// `count(part) * 100 >= percentage * count(whole)`, false for an empty whole.
fn share_reaches(part: usize, whole: usize, percentage: Decimal) -> bool {
    whole > 0
        && Decimal::from(part).saturating_mul(dec!(100))
            >= percentage.saturating_mul(Decimal::from(whole))
}

pub fn bonus_concentration(txns: &[Classified<'_>], percentage: Decimal) -> bool {
    let bonus = txns.iter().filter(|c| c.category == TxnCategory::Bonus).count();
    share_reaches(bonus, txns.len(), percentage)
}

pub fn live_casino_concentration(txns: &[Classified<'_>], percentage: Decimal) -> bool {
    let gameplay = txns.iter().filter(|c| c.category.is_gameplay()).count();
    let live = txns
        .iter()
        .filter(|c| c.category == TxnCategory::LiveGameplay)
        .count();
    share_reaches(live, gameplay, percentage)
}
