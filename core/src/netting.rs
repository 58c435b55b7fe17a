//! Reversal netting.
//!
//! Removes withdrawals that were later cancelled. Matching is greedy and
//! order-sensitive: cancellations are processed in input order and each one
//! claims the most recent eligible withdrawal. It is not an optimal
//! assignment and must not be turned into one; downstream volumes are
//! defined relative to this exact heuristic.

use crate::{
    classifier::{Classified, TxnCategory},
    config::NettingConfig,
    types::Transaction,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Output of netting for one account.
#[derive(Debug, Clone, Default)]
pub struct Netted<'a> {
    pub deposits:              Vec<&'a Transaction>,
    pub effective_withdrawals: Vec<&'a Transaction>,
    /// `(withdrawal, cancellation)` pairs removed from analysis.
    pub reversals:             Vec<(&'a Transaction, &'a Transaction)>,
    pub unmatched_cancellations: usize,
}

impl Netted<'_> {
    pub fn summary(&self) -> NettingSummary {
        NettingSummary {
            reversed_withdrawals:    self.reversals.len(),
            unmatched_cancellations: self.unmatched_cancellations,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NettingSummary {
    pub reversed_withdrawals:    usize,
    pub unmatched_cancellations: usize,
}

/// Net cancellations against withdrawals. Input order is preserved in every
/// output list. Cancellations never appear in the output sets.
pub fn net_reversals<'a>(txns: &[Classified<'a>], cfg: &NettingConfig) -> Netted<'a> {
    let withdrawals: Vec<&'a Transaction> = txns
        .iter()
        .filter(|c| c.category == TxnCategory::Withdrawal)
        .map(|c| c.txn)
        .collect();
    let mut claimed = vec![false; withdrawals.len()];
    // An age limit too large to represent places no limit at all.
    let max_age = Duration::try_days(cfg.max_age_days);

    let mut reversals = Vec::new();
    let mut unmatched = 0;

    for cancel in txns
        .iter()
        .filter(|c| c.category == TxnCategory::WithdrawalCancellation)
        .map(|c| c.txn)
    {
        let target = cancel.abs_amount();
        // max_by_key keeps the last of equal maxima, so equal timestamps
        // resolve to the later withdrawal in input order.
        let pick = withdrawals
            .iter()
            .enumerate()
            .filter(|(i, w)| {
                !claimed[*i]
                    && (w.abs_amount() - target).abs() < cfg.amount_tolerance
                    && w.timestamp <= cancel.timestamp
                    && max_age.map_or(true, |age| cancel.timestamp - w.timestamp <= age)
            })
            .max_by_key(|(_, w)| w.timestamp)
            .map(|(i, _)| i);

        match pick {
            Some(i) => {
                claimed[i] = true;
                log::debug!(
                    "Cancellation {} at {} reverses withdrawal at {}",
                    cancel.amount,
                    cancel.timestamp,
                    withdrawals[i].timestamp
                );
                reversals.push((withdrawals[i], cancel));
            }
            None => {
                log::debug!(
                    "Cancellation {} at {} has no eligible withdrawal; dropped",
                    cancel.amount,
                    cancel.timestamp
                );
                unmatched += 1;
            }
        }
    }

    let effective_withdrawals = withdrawals
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(w, _)| *w)
        .collect();

    Netted {
        deposits: txns
            .iter()
            .filter(|c| c.category == TxnCategory::Deposit)
            .map(|c| c.txn)
            .collect(),
        effective_withdrawals,
        reversals,
        unmatched_cancellations: unmatched,
    }
}
