#![allow(clippy::unwrap_used)]

use super::*;
use chrono::{TimeZone, Utc};
use std::cell::Cell;
use std::rc::Rc;

fn utc_ms(year: i32, month: u32, day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

fn make_txn(amount: i64, category_id: Option<i64>, date: chrono::DateTime<Utc>) -> Transaction {
    Transaction {
        id: None,
        amount_centavos: amount,
        category_id,
        description: Some("test".into()),
        date,
        created_at: date,
    }
}

fn sample_profile() -> UserProfile {
    UserProfile {
        id: PROFILE_ID,
        income_amount: 500_000,
        fixed_bills_amount: 120_000,
        savings_goal_amount: 50_000,
        income_frequency: IncomeFrequency::Weekly,
        reset_day: 15,
        currency: "₱".into(),
        setup_completed: true,
    }
}

// ── Seeded data ───────────────────────────────────────────────

#[test]
fn test_default_categories_seeded() {
    let db = Database::open_in_memory().unwrap();
    let cats = db.get_categories().unwrap();
    assert_eq!(cats.len(), 8);
    assert_eq!(cats[0].id, Some(1));
    assert_eq!(cats[0].name, "Food & Canteen");
    assert!(cats.iter().any(|c| c.name == "Other"));
}

#[test]
fn test_default_categories_not_duplicated_on_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("barya.db");
    {
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_categories().unwrap().len(), 8);
    }
    let db = Database::open(&path).unwrap();
    assert_eq!(db.get_categories().unwrap().len(), 8);
}

// ── User profile ──────────────────────────────────────────────

#[test]
fn test_profile_absent_before_setup() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.get_profile_once().unwrap(), None);
}

#[test]
fn test_profile_round_trip() {
    let db = Database::open_in_memory().unwrap();
    let profile = sample_profile();
    db.insert_profile(&profile).unwrap();
    assert_eq!(db.get_profile_once().unwrap(), Some(profile));
}

#[test]
fn test_profile_insert_replaces_single_row() {
    let db = Database::open_in_memory().unwrap();
    db.insert_profile(&sample_profile()).unwrap();

    let mut second = sample_profile();
    second.income_amount = 999_999;
    db.insert_profile(&second).unwrap();

    let count: i64 = db
        .conn
        .query_row("SELECT COUNT(*) FROM user_profile", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(db.get_profile_once().unwrap(), Some(second));
}

#[test]
fn test_profile_update() {
    let db = Database::open_in_memory().unwrap();
    db.insert_profile(&sample_profile()).unwrap();

    let mut updated = sample_profile();
    updated.fixed_bills_amount = 150_000;
    updated.income_frequency = IncomeFrequency::Irregular;
    db.update_profile(&updated).unwrap();
    assert_eq!(db.get_profile_once().unwrap(), Some(updated));
}

#[test]
fn test_profile_update_without_row_is_noop() {
    let db = Database::open_in_memory().unwrap();
    db.update_profile(&sample_profile()).unwrap();
    assert_eq!(db.get_profile_once().unwrap(), None);
}

#[test]
fn test_unknown_stored_frequency_is_decode_error() {
    let db = Database::open_in_memory().unwrap();
    db.insert_profile(&sample_profile()).unwrap();
    db.conn
        .execute("UPDATE user_profile SET incomeFrequency = 'FORTNIGHTLY'", [])
        .unwrap();

    let err = db.get_profile_once().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::UnknownFrequency(s)) if s == "FORTNIGHTLY"
    ));
}

// ── Transactions ──────────────────────────────────────────────

#[test]
fn test_autoincrement_ids_strictly_increase() {
    let db = Database::open_in_memory().unwrap();
    let mut last = 0;
    for i in 1..=5 {
        let id = db
            .insert_transaction(&make_txn(i * 100, None, utc_ms(2026, 1, 10)))
            .unwrap();
        assert!(id > last);
        last = id;
    }
}

#[test]
fn test_transaction_round_trip() {
    let db = Database::open_in_memory().unwrap();
    let txn = make_txn(10050, Some(2), utc_ms(2026, 3, 4));
    let id = db.insert_transaction(&txn).unwrap();

    let fetched = db.get_transaction_by_id(id).unwrap().unwrap();
    assert_eq!(fetched.id, Some(id));
    assert_eq!(fetched.amount_centavos, 10050);
    assert_eq!(fetched.category_id, Some(2));
    assert_eq!(fetched.description.as_deref(), Some("test"));
    assert_eq!(fetched.date, txn.date);
}

#[test]
fn test_transaction_by_id_not_found() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.get_transaction_by_id(99999).unwrap(), None);
}

#[test]
fn test_transactions_ordered_by_date_desc() {
    let db = Database::open_in_memory().unwrap();
    db.insert_transaction(&make_txn(100, None, utc_ms(2026, 1, 10)))
        .unwrap();
    db.insert_transaction(&make_txn(200, None, utc_ms(2026, 3, 1)))
        .unwrap();
    db.insert_transaction(&make_txn(300, None, utc_ms(2026, 2, 5)))
        .unwrap();

    let amounts: Vec<i64> = db
        .get_transactions()
        .unwrap()
        .iter()
        .map(|t| t.amount_centavos)
        .collect();
    assert_eq!(amounts, vec![200, 300, 100]);
}

#[test]
fn test_month_filter_and_total() {
    let db = Database::open_in_memory().unwrap();
    db.insert_transaction(&make_txn(1000, Some(1), utc_ms(2026, 1, 5)))
        .unwrap();
    db.insert_transaction(&make_txn(2000, Some(1), utc_ms(2026, 1, 31)))
        .unwrap();
    db.insert_transaction(&make_txn(4000, Some(1), utc_ms(2026, 2, 1)))
        .unwrap();

    let january = db.get_transactions_for_month(2026, 1).unwrap();
    assert_eq!(january.len(), 2);
    assert_eq!(db.total_for_month(2026, 1).unwrap(), 3000);
    assert_eq!(db.total_for_month(2026, 2).unwrap(), 4000);
    assert_eq!(db.total_for_month(2026, 3).unwrap(), 0);
}

#[test]
fn test_month_bounds_december_rollover() {
    let db = Database::open_in_memory().unwrap();
    db.insert_transaction(&make_txn(1500, None, utc_ms(2025, 12, 31)))
        .unwrap();
    db.insert_transaction(&make_txn(2500, None, utc_ms(2026, 1, 1)))
        .unwrap();

    assert_eq!(db.total_for_month(2025, 12).unwrap(), 1500);
    assert_eq!(db.total_for_month(2026, 1).unwrap(), 2500);
}

#[test]
fn test_month_queries_reject_out_of_range_dates() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.total_for_month(2026, 13).is_err());
    assert!(db.get_transactions_for_month(2026, 0).is_err());
    // December of the maximum year must error, not overflow the rollover
    assert!(db.total_for_month(i32::MAX, 12).is_err());
}

#[test]
fn test_recent_limit() {
    let db = Database::open_in_memory().unwrap();
    for day in 1..=5 {
        db.insert_transaction(&make_txn(day as i64, None, utc_ms(2026, 1, day)))
            .unwrap();
    }
    let recent = db.get_recent_transactions(3).unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].amount_centavos, 5);
}

#[test]
fn test_update_transaction() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .insert_transaction(&make_txn(100, None, utc_ms(2026, 1, 1)))
        .unwrap();

    let mut txn = db.get_transaction_by_id(id).unwrap().unwrap();
    txn.amount_centavos = 175;
    txn.category_id = Some(4);
    db.update_transaction(&txn).unwrap();
    assert_eq!(db.get_transaction_by_id(id).unwrap(), Some(txn));
}

#[test]
fn test_update_missing_transaction_is_noop() {
    let db = Database::open_in_memory().unwrap();
    let mut txn = make_txn(100, None, utc_ms(2026, 1, 1));
    txn.id = Some(12345);
    db.update_transaction(&txn).unwrap();
    assert_eq!(db.get_transaction_by_id(12345).unwrap(), None);
}

#[test]
fn test_update_uninserted_transaction_is_error() {
    let db = Database::open_in_memory().unwrap();
    let txn = make_txn(100, None, utc_ms(2026, 1, 1));
    assert!(db.update_transaction(&txn).is_err());
}

#[test]
fn test_delete_and_clear() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .insert_transaction(&make_txn(100, None, utc_ms(2026, 1, 1)))
        .unwrap();
    db.insert_transaction(&make_txn(200, None, utc_ms(2026, 1, 2)))
        .unwrap();

    db.delete_transaction(id).unwrap();
    assert_eq!(db.get_transactions().unwrap().len(), 1);

    db.clear_transactions().unwrap();
    assert!(db.get_transactions().unwrap().is_empty());
}

// ── Categories ────────────────────────────────────────────────

#[test]
fn test_insert_category_autoassigns_id() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .insert_category(&Category::new("Sports".into(), "sports".into(), 0xFF11_2233))
        .unwrap();
    assert!(id > 8);
    let fetched = db.get_category_by_id(id).unwrap().unwrap();
    assert_eq!(fetched.name, "Sports");
    assert_eq!(fetched.color, 0xFF11_2233);
}

#[test]
fn test_insert_category_replaces_by_id() {
    let db = Database::open_in_memory().unwrap();
    let mut cat = Category::new("Pamasahe".into(), "transport".into(), 0xFF4E_CDC4);
    cat.id = Some(2);
    db.insert_category(&cat).unwrap();

    assert_eq!(db.get_categories().unwrap().len(), 8);
    assert_eq!(db.get_category_by_id(2).unwrap().unwrap().name, "Pamasahe");
}

#[test]
fn test_category_by_id_not_found() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.get_category_by_id(99).unwrap(), None);
}

// ── Watch / invalidation ──────────────────────────────────────

#[test]
fn test_watch_profile_emits_initial_snapshot() {
    let db = Database::open_in_memory().unwrap();
    let sub = db.watch_profile().unwrap();
    assert_eq!(sub.poll(), vec![None]);
}

#[test]
fn test_watch_profile_emits_pre_and_post_update() {
    let db = Database::open_in_memory().unwrap();
    db.insert_profile(&sample_profile()).unwrap();

    let sub = db.watch_profile().unwrap();
    let mut updated = sample_profile();
    updated.income_amount = 750_000;
    db.update_profile(&updated).unwrap();

    let emissions = sub.poll();
    assert!(emissions.len() >= 2);
    assert_eq!(emissions[0], Some(sample_profile()));
    assert_eq!(emissions.last().unwrap(), &Some(updated));
}

#[test]
fn test_watch_is_table_level() {
    let db = Database::open_in_memory().unwrap();
    let sub = db.watch_transactions().unwrap();
    assert_eq!(sub.poll().len(), 1);

    // A profile write must not re-emit a transactions watcher
    db.insert_profile(&sample_profile()).unwrap();
    assert!(sub.poll().is_empty());

    db.insert_transaction(&make_txn(100, None, utc_ms(2026, 1, 1)))
        .unwrap();
    let latest = sub.latest().unwrap();
    assert_eq!(latest.len(), 1);
}

#[test]
fn test_watch_recent_respects_limit() {
    let db = Database::open_in_memory().unwrap();
    let sub = db.watch_recent_transactions(2).unwrap();
    for day in 1..=4 {
        db.insert_transaction(&make_txn(day as i64, None, utc_ms(2026, 1, day)))
            .unwrap();
    }
    assert_eq!(sub.latest().unwrap().len(), 2);
}

#[test]
fn test_dropped_subscription_is_pruned() {
    let db = Database::open_in_memory().unwrap();
    let sub = db.watch_transactions().unwrap();
    assert_eq!(db.watcher_count(), 1);

    drop(sub);
    db.insert_transaction(&make_txn(100, None, utc_ms(2026, 1, 1)))
        .unwrap();
    assert_eq!(db.watcher_count(), 0);
}

#[test]
fn test_watch_categories_sees_seed_and_writes() {
    let db = Database::open_in_memory().unwrap();
    let sub = db.watch_categories().unwrap();
    assert_eq!(sub.latest().unwrap().len(), 8);

    db.insert_category(&Category::new("Sports".into(), "sports".into(), 0xFF00_0000))
        .unwrap();
    assert_eq!(sub.latest().unwrap().len(), 9);
}

// ── Open path: migrations, identity, validation ───────────────

fn v1_database(path: &std::path::Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE schema_version (version INTEGER NOT NULL);
        INSERT INTO schema_version (version) VALUES (1);
        CREATE TABLE transactions (
            id          INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            amount      REAL NOT NULL,
            categoryId  INTEGER,
            description TEXT,
            date        INTEGER NOT NULL,
            createdAt   INTEGER NOT NULL
        );
        INSERT INTO transactions (amount, categoryId, description, date, createdAt)
            VALUES (10.50, 0, 'jeep fare', 1700000000000, 1700000000000);
        INSERT INTO transactions (amount, categoryId, description, date, createdAt)
            VALUES (250.00, 3, 'prepaid load', 1700000100000, 1700000100000);
        CREATE TABLE categories (
            id    INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name  TEXT NOT NULL,
            icon  TEXT NOT NULL,
            color INTEGER NOT NULL
        );
        CREATE TABLE user_profile (
            id             INTEGER NOT NULL,
            monthlyIncome  REAL NOT NULL,
            fixedBills     REAL NOT NULL,
            savingsGoal    REAL NOT NULL,
            currency       TEXT NOT NULL,
            setupCompleted INTEGER NOT NULL,
            PRIMARY KEY(id)
        );
        INSERT INTO user_profile VALUES (1, 5000.0, 1200.0, 500.0, '₱', 1);
        "#,
    )
    .unwrap();
}

#[test]
fn test_migration_from_v1_converts_to_minor_units() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.db");
    v1_database(&path);

    let db = Database::open(&path).unwrap();

    let profile = db.get_profile_once().unwrap().unwrap();
    assert_eq!(profile.income_amount, 500_000);
    assert_eq!(profile.fixed_bills_amount, 120_000);
    assert_eq!(profile.savings_goal_amount, 50_000);
    assert_eq!(profile.income_frequency, IncomeFrequency::Monthly);
    assert_eq!(profile.reset_day, 1);
    assert!(profile.setup_completed);

    let txns = db.get_transactions().unwrap();
    assert_eq!(txns.len(), 2);
    // Legacy category id 0 becomes income (NULL)
    let fare = txns.iter().find(|t| t.amount_centavos == 1050).unwrap();
    assert_eq!(fare.category_id, None);
    let load = txns.iter().find(|t| t.amount_centavos == 25_000).unwrap();
    assert_eq!(load.category_id, Some(3));

    let version: i32 = db
        .conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(version, schema::CURRENT_VERSION);
}

#[test]
fn test_newer_version_fails_without_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    {
        let db = Database::open(&path).unwrap();
        db.conn
            .execute("UPDATE schema_version SET version = 99", [])
            .unwrap();
    }

    let err = Database::open(&path).unwrap_err();
    assert!(matches!(
        err.root_cause().downcast_ref::<StoreError>(),
        Some(StoreError::MigrationMissing { from: 99, to: 4 })
    ));
}

#[test]
fn test_newer_version_destructive_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    {
        let db = Database::open(&path).unwrap();
        db.insert_transaction(&make_txn(100, None, utc_ms(2026, 1, 1)))
            .unwrap();
        db.conn
            .execute("UPDATE schema_version SET version = 99", [])
            .unwrap();
    }

    let notified = Rc::new(Cell::new(false));
    let flag = Rc::clone(&notified);
    let db = OpenOptions::new()
        .destructive_fallback()
        .on_destructive_migration(move || flag.set(true))
        .open(&path)
        .unwrap();

    assert!(notified.get());
    assert!(db.get_transactions().unwrap().is_empty());
    assert_eq!(db.get_categories().unwrap().len(), 8);
}

#[test]
fn test_missing_column_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drifted.db");
    {
        let db = Database::open(&path).unwrap();
        db.conn
            .execute("ALTER TABLE user_profile DROP COLUMN resetDay", [])
            .unwrap();
    }

    let err = Database::open(&path).unwrap_err();
    match err.root_cause().downcast_ref::<StoreError>() {
        Some(StoreError::SchemaMismatch { table, expected, found }) => {
            assert_eq!(table, "user_profile");
            assert!(expected.contains("resetDay"));
            assert!(!found.contains("resetDay"));
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }
}

#[test]
fn test_identity_mismatch_is_fatal_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tampered.db");
    {
        let db = Database::open(&path).unwrap();
        db.conn
            .execute(
                "UPDATE store_master SET identity_hash = 'deadbeef' WHERE id = 42",
                [],
            )
            .unwrap();
    }

    let err = Database::open(&path).unwrap_err();
    assert!(matches!(
        err.root_cause().downcast_ref::<StoreError>(),
        Some(StoreError::IdentityMismatch { .. })
    ));
}

#[test]
fn test_identity_mismatch_destructive_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reset.db");
    {
        let db = Database::open(&path).unwrap();
        db.insert_transaction(&make_txn(100, None, utc_ms(2026, 1, 1)))
            .unwrap();
        db.conn
            .execute(
                "UPDATE store_master SET identity_hash = 'deadbeef' WHERE id = 42",
                [],
            )
            .unwrap();
    }

    let notified = Rc::new(Cell::new(false));
    let flag = Rc::clone(&notified);
    let db = OpenOptions::new()
        .destructive_fallback()
        .on_destructive_migration(move || flag.set(true))
        .open(&path)
        .unwrap();

    assert!(notified.get());
    assert!(db.get_transactions().unwrap().is_empty());
    // Store is usable again after the reset
    assert_eq!(db.get_categories().unwrap().len(), 8);
}

#[test]
fn test_persistence_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persist.db");
    {
        let db = Database::open(&path).unwrap();
        db.insert_profile(&sample_profile()).unwrap();
        db.insert_transaction(&make_txn(4299, Some(5), utc_ms(2026, 8, 25)))
            .unwrap();
    }

    let db = Database::open(&path).unwrap();
    assert_eq!(db.get_profile_once().unwrap(), Some(sample_profile()));
    assert_eq!(db.get_transactions().unwrap().len(), 1);
}
