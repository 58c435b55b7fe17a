//! Structuring detector: window sliding, trigger-day absorption, and the
//! non-overlap guarantee.

use amlscreen_core::{structuring::detect_structuring, StructuringEvent, Transaction};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const THRESHOLD: Decimal = dec!(5000.00);

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 30).unwrap() + Duration::days(n)
}

fn at(n: i64, hour: u32) -> NaiveDateTime {
    day(n).and_hms_opt(hour, 0, 0).unwrap()
}

fn deposit(n: i64, hour: u32, amount: Decimal) -> Transaction {
    Transaction::new(at(n, hour), "Direct top-up", amount)
}

fn detect(owned: &[Transaction]) -> Vec<StructuringEvent> {
    let refs: Vec<&Transaction> = owned.iter().collect();
    detect_structuring(&refs, THRESHOLD, 7)
}

#[test]
fn exact_threshold_on_one_day_is_a_single_day_event() {
    let txns = vec![
        deposit(3, 9, dec!(2000.00)),
        deposit(3, 12, dec!(2000.00)),
        deposit(3, 20, dec!(1000.00)),
    ];
    let events = detect(&txns);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].window_start, events[0].trigger_date);
    assert_eq!(events[0].total_amount, dec!(5000.00));
}

#[test]
fn six_daily_deposits_yield_exactly_one_event() {
    let txns: Vec<Transaction> = (1..=6).map(|d| deposit(d, 10, dec!(1000.00))).collect();
    let events = detect(&txns);

    assert_eq!(events.len(), 1, "expected one event, got {events:?}");
    assert_eq!(events[0].window_start, day(1));
    assert_eq!(events[0].trigger_date, day(5));
    assert!(events[0].total_amount >= THRESHOLD);
}

#[test]
fn window_excludes_day_seven() {
    let apart = vec![deposit(1, 9, dec!(2500)), deposit(8, 9, dec!(2500))];
    assert!(detect(&apart).is_empty());

    let inside = vec![deposit(1, 9, dec!(2500)), deposit(7, 23, dec!(2500))];
    let events = detect(&inside);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].trigger_date, day(7));
}

#[test]
fn signs_are_ignored() {
    let txns = vec![
        Transaction::new(at(2, 9), "Voucher withdrawal", dec!(-2600)),
        Transaction::new(at(2, 15), "Voucher withdrawal", dec!(-2600)),
    ];
    let events = detect(&txns);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].total_amount, dec!(5200));
}

#[test]
fn scanning_resumes_after_trigger_day() {
    let txns = vec![
        deposit(1, 9, dec!(3000)),
        deposit(2, 9, dec!(3000)),
        deposit(2, 21, dec!(100)),
        deposit(3, 9, dec!(4000)),
        deposit(4, 9, dec!(1000)),
    ];
    let events = detect(&txns);

    assert_eq!(events.len(), 2);
    assert_eq!((events[0].window_start, events[0].trigger_date), (day(1), day(2)));
    assert_eq!(events[0].total_amount, dec!(6100));
    assert_eq!((events[1].window_start, events[1].trigger_date), (day(3), day(4)));
    assert_eq!(events[1].total_amount, dec!(5000));
}

#[test]
fn events_never_overlap_or_share_transactions() {
    // Deterministic pseudo-random history: 400 deposits over ~200 days.
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    let mut txns: Vec<Transaction> = (0..400)
        .map(|_| {
            let d = (next() % 200) as i64;
            let h = (next() % 24) as u32;
            let cents = (next() % 250_000) as i64;
            deposit(d, h, Decimal::new(cents, 2))
        })
        .collect();
    txns.sort_by_key(|t| t.timestamp);

    let events = detect(&txns);
    assert!(!events.is_empty());

    for e in &events {
        assert!(e.window_start <= e.trigger_date);
        assert!(e.trigger_date < e.window_start + Duration::days(7));
        assert!(e.total_amount >= THRESHOLD);
    }
    for pair in events.windows(2) {
        assert!(
            pair[0].trigger_date < pair[1].window_start,
            "overlapping events: {:?} / {:?}",
            pair[0],
            pair[1]
        );
    }
    let consumed: usize = events.iter().map(|e| e.transaction_count).sum();
    assert!(consumed <= txns.len());
}

#[test]
fn unrepresentable_window_covers_the_whole_history() {
    let txns = vec![deposit(1, 9, dec!(2500)), deposit(3000, 9, dec!(2500))];
    let refs: Vec<&Transaction> = txns.iter().collect();
    let events = detect_structuring(&refs, THRESHOLD, i64::MAX);

    assert_eq!(events.len(), 1);
    assert_eq!((events[0].window_start, events[0].trigger_date), (day(1), day(3000)));
}
