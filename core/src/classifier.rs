//! Label classification.
//!
//! Free-text labels are mapped to a `TxnCategory` by a `LabelClassifier`.
//! The algorithms only ever see categories, so the matching vocabulary can
//! be swapped without touching them.

use crate::{config::Vocabulary, types::Transaction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnCategory {
    Deposit,
    Withdrawal,
    /// Admin- or user-initiated cancellation of an earlier withdrawal.
    WithdrawalCancellation,
    Bonus,
    LiveGameplay,
    Gameplay,
}

impl TxnCategory {
    pub fn is_gameplay(&self) -> bool {
        matches!(self, TxnCategory::Gameplay | TxnCategory::LiveGameplay)
    }
}

pub trait LabelClassifier {
    fn classify(&self, label: &str) -> TxnCategory;
}

impl<F> LabelClassifier for F
where
    F: Fn(&str) -> TxnCategory,
{
    fn classify(&self, label: &str) -> TxnCategory {
        self(label)
    }
}

/// Case-insensitive substring matcher driven by a `Vocabulary`.
///
/// Precedence: cancellation, bonus, deposit, withdrawal, then gameplay
/// (live when a live keyword matches).
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    vocabulary: Vocabulary,
}

impl KeywordClassifier {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        let lower = |list: &[String]| list.iter().map(|w| w.to_lowercase()).collect();
        Self {
            vocabulary: Vocabulary {
                cancellation: lower(&vocabulary.cancellation),
                bonus:        lower(&vocabulary.bonus),
                deposit:      lower(&vocabulary.deposit),
                withdrawal:   lower(&vocabulary.withdrawal),
                live:         lower(&vocabulary.live),
            },
        }
    }
}

fn any_of(label: &str, words: &[String]) -> bool {
    words.iter().any(|w| label.contains(w.as_str()))
}

impl LabelClassifier for KeywordClassifier {
    fn classify(&self, label: &str) -> TxnCategory {
        let label = label.to_lowercase();
        let v = &self.vocabulary;
        if any_of(&label, &v.cancellation) {
            TxnCategory::WithdrawalCancellation
        } else if any_of(&label, &v.bonus) {
            TxnCategory::Bonus
        } else if any_of(&label, &v.deposit) {
            TxnCategory::Deposit
        } else if any_of(&label, &v.withdrawal) {
            TxnCategory::Withdrawal
        } else if any_of(&label, &v.live) {
            TxnCategory::LiveGameplay
        } else {
            TxnCategory::Gameplay
        }
    }
}

/// A transaction paired with its category. Borrowed; the engine never
/// copies or mutates the underlying record.
#[derive(Debug, Clone, Copy)]
pub struct Classified<'a> {
    pub txn:      &'a Transaction,
    pub category: TxnCategory,
}

pub fn classify_all<'a, C>(classifier: &C, txns: &'a [Transaction]) -> Vec<Classified<'a>>
where
    C: LabelClassifier + ?Sized,
{
    txns.iter()
        .map(|txn| Classified {
            txn,
            category: classifier.classify(&txn.label),
        })
        .collect()
}
