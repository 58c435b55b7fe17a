//! Volume aggregation by day, ISO week and calendar month.
//!
//! Pure grouping. Thresholds are applied by the escalation engine so that
//! threshold changes never require re-bucketing. Bucket totals saturate at
//! `Decimal::MAX`.

use crate::{
    config::VolumeThresholds,
    types::{Amount, Transaction},
};
use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::{collections::BTreeMap, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Day, Granularity::Week, Granularity::Month];

    pub fn key_for(&self, date: NaiveDate) -> PeriodKey {
        match self {
            Granularity::Day => PeriodKey::Day(date),
            Granularity::Week => {
                let offset = Days::new(u64::from(date.weekday().num_days_from_monday()));
                // Only the first days of the calendar have no representable Monday.
                PeriodKey::Week(date.checked_sub_days(offset).unwrap_or(NaiveDate::MIN))
            }
            Granularity::Month => PeriodKey::Month {
                year:  date.year(),
                month: date.month(),
            },
        }
    }

    pub fn threshold(&self, thresholds: &VolumeThresholds) -> Amount {
        match self {
            Granularity::Day   => thresholds.daily,
            Granularity::Week  => thresholds.weekly,
            Granularity::Month => thresholds.monthly,
        }
    }
}

/// Bucket key. Weeks are keyed by their Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodKey {
    Day(NaiveDate),
    Week(NaiveDate),
    Month { year: i32, month: u32 },
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Day(d) | PeriodKey::Week(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            PeriodKey::Month { year, month }       => write!(f, "{year:04}-{month:02}"),
        }
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Amount totals for one category at one granularity.
pub type Buckets = BTreeMap<PeriodKey, Amount>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryVolumes {
    pub daily:   Buckets,
    pub weekly:  Buckets,
    pub monthly: Buckets,
}

impl CategoryVolumes {
    pub fn from_transactions(txns: &[&Transaction]) -> Self {
        let mut volumes = Self::default();
        for txn in txns {
            for granularity in Granularity::ALL {
                let total = volumes
                    .buckets_mut(granularity)
                    .entry(granularity.key_for(txn.day()))
                    .or_insert(Decimal::ZERO);
                *total = total.saturating_add(txn.abs_amount());
            }
        }
        volumes
    }

    pub fn buckets(&self, granularity: Granularity) -> &Buckets {
        match granularity {
            Granularity::Day   => &self.daily,
            Granularity::Week  => &self.weekly,
            Granularity::Month => &self.monthly,
        }
    }

    fn buckets_mut(&mut self, granularity: Granularity) -> &mut Buckets {
        match granularity {
            Granularity::Day   => &mut self.daily,
            Granularity::Week  => &mut self.weekly,
            Granularity::Month => &mut self.monthly,
        }
    }

    /// Keys of buckets whose total strictly exceeds the threshold.
    pub fn breaches(&self, granularity: Granularity, thresholds: &VolumeThresholds) -> Vec<PeriodKey> {
        let limit = granularity.threshold(thresholds);
        self.buckets(granularity)
            .iter()
            .filter(|(_, total)| **total > limit)
            .map(|(key, _)| *key)
            .collect()
    }
}

/// The six bucket maps of one account.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumeProfile {
    pub deposits:    CategoryVolumes,
    pub withdrawals: CategoryVolumes,
}

impl VolumeProfile {
    pub fn aggregate(deposits: &[&Transaction], effective_withdrawals: &[&Transaction]) -> Self {
        Self {
            deposits:    CategoryVolumes::from_transactions(deposits),
            withdrawals: CategoryVolumes::from_transactions(effective_withdrawals),
        }
    }

    /// True when any bucket of either category exceeds its threshold.
    pub fn exceeds(&self, granularity: Granularity, thresholds: &VolumeThresholds) -> bool {
        [&self.deposits, &self.withdrawals]
            .iter()
            .any(|v| !v.breaches(granularity, thresholds).is_empty())
    }
}
