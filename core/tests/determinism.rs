//! THE MOST IMPORTANT TEST IN THE PROJECT.
//!
//! Two engines, same config snapshot, same transactions.
//! They must produce byte-identical reports.
//! Any divergence is a blocker; do not merge until fixed.

use amlscreen_core::{EngineConfig, ScreeningEngine, ScreeningReport, Transaction};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::sync::Arc;

/// A busy year of mixed activity, generated from a fixed xorshift state.
fn history(seed: u64) -> Vec<Transaction> {
    let labels = [
        "Direct top-up",
        "Voucher withdrawal",
        "Cancellation of withdrawal by user",
        "Welcome bonus",
        "Live Roulette",
        "Slot spin",
    ];
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let mut state = seed;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    (0..2_000)
        .map(|i| {
            // Distinct timestamps: one slot per index plus jitter below it.
            let ts = start + Duration::minutes(i * 240 + (next() % 200) as i64);
            let label = labels[(next() % labels.len() as u64) as usize];
            let amount = Decimal::new((next() % 300_000) as i64, 2);
            Transaction::new(ts, label, amount)
        })
        .collect()
}

fn run(txns: &[Transaction]) -> ScreeningReport {
    let engine = ScreeningEngine::new(Arc::new(EngineConfig::default()));
    engine.screen("det-account", txns)
}

#[test]
fn same_input_produces_identical_reports() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;
    let txns = history(SEED);

    let a = serde_json::to_string(&run(&txns)).expect("serialize a");
    let b = serde_json::to_string(&run(&txns)).expect("serialize b");

    assert_eq!(a.len(), b.len(), "Report lengths differ: {} vs {}", a.len(), b.len());
    assert_eq!(a, b, "Reports diverged");
}

#[test]
fn input_order_is_irrelevant_for_distinct_timestamps() {
    let txns = history(42);
    let mut reversed = txns.clone();
    reversed.reverse();

    assert_eq!(run(&txns), run(&reversed));
}

#[test]
fn different_histories_produce_different_reports() {
    // Verifies that the generated input actually reaches the report.
    let a = run(&history(42));
    let b = run(&history(99));
    assert_ne!(a.volumes, b.volumes, "Different inputs produced identical volumes");
}
