//! SQLite boundary: config versions, review state and the status audit trail.

use amlscreen_core::{
    config::{ConfigProvider, FileConfigSource},
    event::ScreeningEvent,
    reconciliation::{reconcile, ReviewState, STATUS_HIGH_RISK},
    store::ScreenStore,
    EngineConfig, EngineError, RiskLevel, ScreeningEngine, Transaction,
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal_macros::dec;
use std::{path::PathBuf, sync::Arc};

fn store() -> ScreenStore {
    let store = ScreenStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn at(m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn versioned(version: &str) -> EngineConfig {
    EngineConfig {
        version: version.into(),
        ..EngineConfig::default()
    }
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{name}-{}", uuid::Uuid::new_v4()))
}

// ── Config versions ──────────────────────────────────────────────────────────

#[test]
fn latest_saved_config_wins() {
    let store = store();
    assert!(store.latest_config().unwrap().is_none());

    let mut v2 = versioned("v2");
    v2.thresholds.monthly = dec!(25000);
    store.save_config(&v2, &at(1, 1, 0)).unwrap();
    store.save_config(&versioned("v3"), &at(2, 1, 0)).unwrap();

    assert_eq!(store.config_version_count().unwrap(), 2);
    assert_eq!(store.latest_config().unwrap().unwrap().version, "v3");

    // Re-saving an existing version makes it the latest again.
    store.save_config(&v2, &at(3, 1, 0)).unwrap();
    assert_eq!(store.config_version_count().unwrap(), 2);
    let latest = store.latest_config().unwrap().unwrap();
    assert_eq!(latest, v2);
    assert_eq!(store.latest_config_row().unwrap().unwrap().created_at, "2024-03-01T00:00:00");
}

#[test]
fn provider_reads_from_the_store() {
    let store = store();
    store.save_config(&versioned("db-v1"), &at(1, 1, 0)).unwrap();
    let snapshot = ConfigProvider::new(&store).snapshot();
    assert_eq!(snapshot.version, "db-v1");
}

#[test]
fn empty_store_falls_back_to_builtin() {
    let store = store();
    let snapshot = ConfigProvider::new(&store).snapshot();
    assert_eq!(*snapshot, EngineConfig::default());
}

#[test]
fn file_source_applies_partial_overrides() {
    let path = temp_path("amlscreen-config.json");
    std::fs::write(
        &path,
        r#"{ "version": "file-v1", "structuring": { "window_days": 3 } }"#,
    )
    .unwrap();

    let source = FileConfigSource::new(path.clone());
    let snapshot = ConfigProvider::new(&source).snapshot();
    assert_eq!(snapshot.version, "file-v1");
    assert_eq!(snapshot.structuring.window_days, 3);
    assert_eq!(snapshot.structuring.deposit_threshold, dec!(5000));

    std::fs::remove_file(&path).unwrap();
    let missing = ConfigProvider::new(&source).snapshot();
    assert_eq!(missing.version, "builtin");
}

// ── Review state ─────────────────────────────────────────────────────────────

#[test]
fn review_status_round_trip() {
    let store = store();
    store.set_review_status("acc-1", "cleared", Some(&at(5, 5, 23))).unwrap();
    store.set_review_status("acc-2", "watch", None).unwrap();

    assert_eq!(
        store.review_status("acc-1").unwrap(),
        Some(ReviewState::new("cleared", Some(at(5, 5, 23))))
    );
    assert_eq!(
        store.require_review_status("acc-2").unwrap(),
        ReviewState::new("watch", None)
    );

    store.set_review_status("acc-2", "cleared", Some(&at(6, 1, 8))).unwrap();
    assert_eq!(store.review_row("acc-2").unwrap().unwrap().status, "cleared");
}

#[test]
fn unknown_account_is_an_error() {
    let store = store();
    assert!(store.review_status("ghost").unwrap().is_none());
    assert!(matches!(
        store.require_review_status("ghost"),
        Err(EngineError::UnknownAccount { account_id }) if account_id == "ghost"
    ));
}

#[test]
fn file_store_is_visible_from_a_second_connection() {
    let path = temp_path("amlscreen-store.db");
    let path_str = path.to_string_lossy().to_string();
    {
        let store = ScreenStore::open(&path_str).unwrap();
        store.migrate().unwrap();
        store.set_review_status("acc-f", "cleared", None).unwrap();
        let other = store.reopen().unwrap();
        assert_eq!(other.review_status("acc-f").unwrap().unwrap().status, "cleared");
    }
    let _ = std::fs::remove_file(&path);
}

// ── Audit trail ──────────────────────────────────────────────────────────────

fn may_structuring() -> Vec<Transaction> {
    (3..=7)
        .map(|d| Transaction::new(at(5, d, 10), "Direct top-up", dec!(1000)))
        .collect()
}

#[test]
fn override_updates_status_and_appends_audit() {
    let store = store();
    store.set_review_status("acc-r", "cleared", Some(&at(5, 5, 23))).unwrap();

    let engine = ScreeningEngine::new(Arc::new(EngineConfig::default()));
    let prior = store.require_review_status("acc-r").unwrap();
    let reconciled = reconcile(&engine, "acc-r", &prior, &may_structuring());

    assert!(store.apply_reconciliation(&reconciled, &at(5, 8, 6)).unwrap());

    // Status replaced, last manual action untouched.
    assert_eq!(
        store.review_status("acc-r").unwrap(),
        Some(ReviewState::new(STATUS_HIGH_RISK, Some(at(5, 5, 23))))
    );

    let audit = store.audit_for_account("acc-r").unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].event_type, "status_overridden");
    assert_eq!(audit[0].recorded_at, "2024-05-08T06:00:00");
    match audit[0].event().unwrap() {
        ScreeningEvent::StatusOverridden { previous_status, new_status, level, .. } => {
            assert_eq!(previous_status, "cleared");
            assert_eq!(new_status, STATUS_HIGH_RISK);
            assert_eq!(level, RiskLevel::High);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn preserved_status_writes_nothing() {
    let store = store();
    store.set_review_status("acc-p", "cleared", Some(&at(7, 1, 0))).unwrap();

    let engine = ScreeningEngine::new(Arc::new(EngineConfig::default()));
    let prior = store.require_review_status("acc-p").unwrap();
    let reconciled = reconcile(&engine, "acc-p", &prior, &may_structuring());

    assert!(!store.apply_reconciliation(&reconciled, &at(7, 2, 0)).unwrap());
    assert_eq!(store.review_status("acc-p").unwrap().unwrap().status, "cleared");
    assert!(store.audit_for_account("acc-p").unwrap().is_empty());
}

#[test]
fn override_for_unreviewed_account_rolls_back() {
    let store = store();
    let engine = ScreeningEngine::new(Arc::new(EngineConfig::default()));
    let reconciled = reconcile(
        &engine,
        "acc-missing",
        &ReviewState::new("cleared", None),
        &may_structuring(),
    );
    assert!(reconciled.outcome.is_override());

    let err = store.apply_reconciliation(&reconciled, &at(5, 8, 6));
    assert!(matches!(err, Err(EngineError::UnknownAccount { .. })));
    assert!(store.audit_for_account("acc-missing").unwrap().is_empty());
}

#[test]
fn screened_events_are_appended_in_order() {
    let store = store();
    for score in [20, 80] {
        let event = ScreeningEvent::AccountScreened {
            account_id:     "acc-a".into(),
            level:          if score == 20 { RiskLevel::Low } else { RiskLevel::High },
            score,
            config_version: "builtin".into(),
        };
        store.append_audit(&event, &at(1, 2, 3)).unwrap();
    }
    let audit = store.audit_for_account("acc-a").unwrap();
    assert_eq!(audit.len(), 2);
    assert!(audit.iter().all(|a| a.event_type == "account_screened"));
    assert_ne!(audit[0].audit_id, audit[1].audit_id);
    assert!(audit[1].payload.contains("\"score\":80"));
}
