//! Structuring (smurfing) detection over a single transaction category.
//!
//! Scan rules:
//!   1. The earliest unprocessed transaction opens a window on its calendar
//!      day; the window covers `window_days` days, the last one exclusive.
//!   2. Absolute amounts accumulate in timestamp order while inside the window.
//!   3. The first transaction that takes the running sum to the threshold
//!      fixes the trigger day; later transactions on that same day are still
//!      absorbed before the event closes.
//!   4. After an event, scanning resumes at the first transaction strictly
//!      after the trigger day. Consumed transactions are never reconsidered.
//!   5. A window that closes below threshold slides by one transaction,
//!      not by one day.
//!   6. Sums saturate at `Decimal::MAX`; a window whose end date cannot be
//!      represented has no end.
//!
//! Deposits and effective withdrawals are scanned independently.

use crate::types::{Amount, StructuringEvent, Transaction};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

/// Detect structuring events. `txns` must be sorted ascending by timestamp.
pub fn detect_structuring(
    txns: &[&Transaction],
    threshold: Amount,
    window_days: i64,
) -> Vec<StructuringEvent> {
    debug_assert!(txns.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let mut events = Vec::new();
    let mut start = 0;

    while start < txns.len() {
        let window_start = txns[start].day();
        let window_end = Duration::try_days(window_days)
            .and_then(|span| window_start.checked_add_signed(span));
        let in_window = |day: NaiveDate| window_end.map_or(true, |end| day < end);

        let mut sum = Decimal::ZERO;
        let mut next = start;
        let mut trigger = None;

        while next < txns.len() && in_window(txns[next].day()) {
            sum = sum.saturating_add(txns[next].abs_amount());
            next += 1;
            if sum >= threshold {
                trigger = Some(txns[next - 1].day());
                break;
            }
        }

        let Some(trigger_date) = trigger else {
            start += 1;
            continue;
        };

        while next < txns.len() && txns[next].day() == trigger_date {
            sum = sum.saturating_add(txns[next].abs_amount());
            next += 1;
        }

        log::debug!(
            "Structuring window {window_start}..={trigger_date}: {sum} over {} transactions",
            next - start
        );
        events.push(StructuringEvent {
            window_start,
            trigger_date,
            total_amount: sum,
            transaction_count: next - start,
        });
        start = next;
    }

    events
}
