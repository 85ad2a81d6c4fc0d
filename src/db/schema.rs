use super::validate::{ColumnInfo, TableInfo};

pub(crate) const SCHEMA_V4: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_master (
    id            INTEGER PRIMARY KEY,
    identity_hash TEXT
);

CREATE TABLE IF NOT EXISTS transactions (
    id             INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    amountCentavos INTEGER NOT NULL,
    categoryId     INTEGER,
    description    TEXT,
    date           INTEGER NOT NULL,
    createdAt      INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

CREATE TABLE IF NOT EXISTS categories (
    id    INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name  TEXT NOT NULL,
    icon  TEXT NOT NULL,
    color INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS user_profile (
    id                INTEGER NOT NULL,
    incomeAmount      INTEGER NOT NULL,
    fixedBillsAmount  INTEGER NOT NULL,
    savingsGoalAmount INTEGER NOT NULL,
    incomeFrequency   TEXT NOT NULL,
    resetDay          INTEGER NOT NULL,
    currency          TEXT NOT NULL,
    setupCompleted    INTEGER NOT NULL,
    PRIMARY KEY(id)
);
"#;

pub(crate) const CURRENT_VERSION: i32 = 4;

/// Entity tables, i.e. everything except the two metadata tables.
pub(crate) const ENTITY_TABLES: &[&str] = &["transactions", "categories", "user_profile"];

/// Migrations from version N to N+1. Each entry is (from_version, sql).
///
/// v1 stored floating-point amounts; v3 rebuilt `transactions` around
/// integer minor units (and dropped the short-lived `transactionType`
/// column); v4 did the same rebuild for `user_profile`, adding the income
/// frequency and reset day along the way.
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[
    (
        1,
        "ALTER TABLE transactions ADD COLUMN transactionType TEXT NOT NULL DEFAULT 'expense';",
    ),
    (
        2,
        r#"
        ALTER TABLE transactions ADD COLUMN amountCentavos INTEGER NOT NULL DEFAULT 0;
        UPDATE transactions SET amountCentavos = CAST(amount * 100 AS INTEGER);
        CREATE TABLE transactions_new (
            id             INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            amountCentavos INTEGER NOT NULL,
            categoryId     INTEGER,
            description    TEXT,
            date           INTEGER NOT NULL,
            createdAt      INTEGER NOT NULL
        );
        INSERT INTO transactions_new (id, amountCentavos, categoryId, description, date, createdAt)
            SELECT id, amountCentavos,
                   CASE WHEN categoryId = 0 THEN NULL ELSE categoryId END,
                   description, date, createdAt
            FROM transactions;
        DROP TABLE transactions;
        ALTER TABLE transactions_new RENAME TO transactions;
        CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
        "#,
    ),
    (
        3,
        r#"
        CREATE TABLE user_profile_new (
            id                INTEGER NOT NULL,
            incomeAmount      INTEGER NOT NULL DEFAULT 0,
            fixedBillsAmount  INTEGER NOT NULL DEFAULT 0,
            savingsGoalAmount INTEGER NOT NULL DEFAULT 0,
            incomeFrequency   TEXT NOT NULL DEFAULT 'MONTHLY',
            resetDay          INTEGER NOT NULL DEFAULT 1,
            currency          TEXT NOT NULL DEFAULT '₱',
            setupCompleted    INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY(id)
        );
        INSERT INTO user_profile_new (id, incomeAmount, fixedBillsAmount, savingsGoalAmount,
                                      incomeFrequency, resetDay, currency, setupCompleted)
            SELECT id,
                   CAST(monthlyIncome * 100 AS INTEGER),
                   CAST(fixedBills * 100 AS INTEGER),
                   CAST(savingsGoal * 100 AS INTEGER),
                   'MONTHLY',
                   1,
                   currency,
                   setupCompleted
            FROM user_profile;
        DROP TABLE user_profile;
        ALTER TABLE user_profile_new RENAME TO user_profile;
        "#,
    ),
];

/// The column sets every entity table must match exactly after migration.
pub(crate) fn expected_tables() -> Vec<TableInfo> {
    vec![
        TableInfo::new(
            "transactions",
            vec![
                ColumnInfo::new("id", "INTEGER", true, 1),
                ColumnInfo::new("amountCentavos", "INTEGER", true, 0),
                ColumnInfo::new("categoryId", "INTEGER", false, 0),
                ColumnInfo::new("description", "TEXT", false, 0),
                ColumnInfo::new("date", "INTEGER", true, 0),
                ColumnInfo::new("createdAt", "INTEGER", true, 0),
            ],
        ),
        TableInfo::new(
            "categories",
            vec![
                ColumnInfo::new("id", "INTEGER", true, 1),
                ColumnInfo::new("name", "TEXT", true, 0),
                ColumnInfo::new("icon", "TEXT", true, 0),
                ColumnInfo::new("color", "INTEGER", true, 0),
            ],
        ),
        TableInfo::new(
            "user_profile",
            vec![
                ColumnInfo::new("id", "INTEGER", true, 1),
                ColumnInfo::new("incomeAmount", "INTEGER", true, 0),
                ColumnInfo::new("fixedBillsAmount", "INTEGER", true, 0),
                ColumnInfo::new("savingsGoalAmount", "INTEGER", true, 0),
                ColumnInfo::new("incomeFrequency", "TEXT", true, 0),
                ColumnInfo::new("resetDay", "INTEGER", true, 0),
                ColumnInfo::new("currency", "TEXT", true, 0),
                ColumnInfo::new("setupCompleted", "INTEGER", true, 0),
            ],
        ),
    ]
}

/// Fingerprint of the expected table definitions, stored in `store_master`
/// and compared on every open to detect schema drift.
pub(crate) fn identity_hash() -> String {
    let mut canonical = String::new();
    for table in expected_tables() {
        canonical.push_str(&table.to_string());
        canonical.push('\n');
    }
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}
