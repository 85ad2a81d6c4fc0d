mod convert;
mod error;
mod schema;
mod validate;
mod watch;

use std::cell::RefCell;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::models::*;

pub use error::StoreError;
pub use watch::{Subscription, Table};

use watch::Watcher;

const PROFILE_SQL: &str = "SELECT id, incomeAmount, fixedBillsAmount, savingsGoalAmount, \
     incomeFrequency, resetDay, currency, setupCompleted FROM user_profile WHERE id = ?1";

const TXN_COLUMNS: &str = "id, amountCentavos, categoryId, description, date, createdAt";

/// Stock categories written at fixed ids on every open (replace keeps their
/// icons and colors current across app versions).
const DEFAULT_CATEGORIES: &[(i64, &str, &str, u32)] = &[
    (1, "Food & Canteen", "food", 0xFFFF_6B6B),
    (2, "Commute", "transport", 0xFF4E_CDC4),
    (3, "Load & Data", "data", 0xFFFF_E66D),
    (4, "Gimik / Fun", "entertainment", 0xFF95_E1D3),
    (5, "Lazada / Shopee", "shopping", 0xFFF3_8181),
    (6, "Academics", "school", 0xFFAA_96DA),
    (7, "Subscriptions", "sub", 0xFFFC_BAD3),
    (8, "Other", "other", 0xFFC7_CEEA),
];

/// Open-time knobs. By default any schema divergence without a migration
/// path fails the open; `destructive_fallback` instead drops and recreates
/// everything, invoking the caller's notification first-hand.
pub struct OpenOptions {
    destructive_fallback: bool,
    on_destructive: Option<Box<dyn FnMut()>>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self {
            destructive_fallback: false,
            on_destructive: None,
        }
    }

    pub fn destructive_fallback(mut self) -> Self {
        self.destructive_fallback = true;
        self
    }

    pub fn on_destructive_migration(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_destructive = Some(Box::new(f));
        self
    }

    pub fn open(self, path: &Path) -> Result<Database> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        debug!(path = %path.display(), "opening store");
        Database::from_connection(conn, self)
    }

    #[cfg(test)]
    pub fn open_in_memory(self) -> Result<Database> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Database::from_connection(conn, self)
    }
}

pub struct Database {
    conn: Connection,
    watchers: RefCell<Vec<Watcher>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("conn", &self.conn)
            .finish_non_exhaustive()
    }
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        OpenOptions::new().open(path)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        OpenOptions::new().open_in_memory()
    }

    fn from_connection(conn: Connection, mut opts: OpenOptions) -> Result<Self> {
        prepare_schema(&conn, &mut opts).context("Database migration failed")?;
        let mut db = Self {
            conn,
            watchers: RefCell::new(Vec::new()),
        };
        db.seed_default_categories()?;
        Ok(db)
    }

    fn seed_default_categories(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for &(id, name, icon, color) in DEFAULT_CATEGORIES {
            tx.execute(
                "INSERT OR REPLACE INTO categories (id, name, icon, color) VALUES (?1, ?2, ?3, ?4)",
                params![id, name, icon, color],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    // ── User profile ──────────────────────────────────────────

    /// Upsert keyed on the fixed profile id; at most one row ever exists.
    pub fn insert_profile(&self, profile: &UserProfile) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO user_profile \
             (id, incomeAmount, fixedBillsAmount, savingsGoalAmount, incomeFrequency, resetDay, currency, setupCompleted) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                PROFILE_ID,
                profile.income_amount,
                profile.fixed_bills_amount,
                profile.savings_goal_amount,
                profile.income_frequency.as_str(),
                profile.reset_day,
                profile.currency,
                profile.setup_completed,
            ],
        )?;
        self.invalidate(Table::UserProfile);
        Ok(())
    }

    /// Zero rows affected is a no-op success, mirroring the insert-first flow.
    pub fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        self.conn.execute(
            "UPDATE user_profile SET incomeAmount = ?1, fixedBillsAmount = ?2, savingsGoalAmount = ?3, \
             incomeFrequency = ?4, resetDay = ?5, currency = ?6, setupCompleted = ?7 WHERE id = ?8",
            params![
                profile.income_amount,
                profile.fixed_bills_amount,
                profile.savings_goal_amount,
                profile.income_frequency.as_str(),
                profile.reset_day,
                profile.currency,
                profile.setup_completed,
                PROFILE_ID,
            ],
        )?;
        self.invalidate(Table::UserProfile);
        Ok(())
    }

    pub fn get_profile_once(&self) -> Result<Option<UserProfile>> {
        read_profile(&self.conn)
    }

    pub fn watch_profile(&self) -> Result<Subscription<Option<UserProfile>>> {
        self.watch(&[Table::UserProfile], read_profile)
    }

    // ── Transactions ──────────────────────────────────────────

    pub fn insert_transaction(&self, txn: &Transaction) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO transactions (amountCentavos, categoryId, description, date, createdAt) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                txn.amount_centavos,
                txn.category_id,
                txn.description,
                convert::datetime_to_millis(txn.date),
                convert::datetime_to_millis(txn.created_at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.invalidate(Table::Transactions);
        Ok(id)
    }

    pub fn update_transaction(&self, txn: &Transaction) -> Result<()> {
        let id = txn
            .id
            .context("Cannot update a transaction that was never inserted")?;
        self.conn.execute(
            "UPDATE transactions SET amountCentavos = ?1, categoryId = ?2, description = ?3, \
             date = ?4, createdAt = ?5 WHERE id = ?6",
            params![
                txn.amount_centavos,
                txn.category_id,
                txn.description,
                convert::datetime_to_millis(txn.date),
                convert::datetime_to_millis(txn.created_at),
                id,
            ],
        )?;
        self.invalidate(Table::Transactions);
        Ok(())
    }

    pub fn delete_transaction(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        self.invalidate(Table::Transactions);
        Ok(())
    }

    pub fn clear_transactions(&self) -> Result<()> {
        self.conn.execute("DELETE FROM transactions", [])?;
        self.invalidate(Table::Transactions);
        Ok(())
    }

    pub fn get_transaction_by_id(&self, id: i64) -> Result<Option<Transaction>> {
        let mut rows = read_transactions(
            &self.conn,
            &format!("SELECT {TXN_COLUMNS} FROM transactions WHERE id = ?1"),
            &[&id],
        )?;
        Ok(rows.pop())
    }

    pub fn get_transactions(&self) -> Result<Vec<Transaction>> {
        read_transactions(
            &self.conn,
            &format!("SELECT {TXN_COLUMNS} FROM transactions ORDER BY date DESC, createdAt DESC"),
            &[],
        )
    }

    pub fn get_transactions_for_month(
        &self,
        year: i32,
        month: u32,
    ) -> Result<Vec<Transaction>> {
        let (start, end) = month_bounds(year, month)?;
        read_transactions(
            &self.conn,
            &format!(
                "SELECT {TXN_COLUMNS} FROM transactions WHERE date >= ?1 AND date < ?2 \
                 ORDER BY date DESC, createdAt DESC"
            ),
            &[&start, &end],
        )
    }

    /// Sum of all amounts in the month, 0 when there are none.
    pub fn total_for_month(&self, year: i32, month: u32) -> Result<i64> {
        let (start, end) = month_bounds(year, month)?;
        Ok(self.conn.query_row(
            "SELECT COALESCE(SUM(amountCentavos), 0) FROM transactions WHERE date >= ?1 AND date < ?2",
            params![start, end],
            |row| row.get(0),
        )?)
    }

    pub fn get_recent_transactions(&self, limit: u32) -> Result<Vec<Transaction>> {
        read_transactions(
            &self.conn,
            &format!(
                "SELECT {TXN_COLUMNS} FROM transactions ORDER BY date DESC, createdAt DESC LIMIT {limit}"
            ),
            &[],
        )
    }

    pub fn watch_transactions(&self) -> Result<Subscription<Vec<Transaction>>> {
        self.watch(&[Table::Transactions], |conn| {
            read_transactions(
                conn,
                &format!(
                    "SELECT {TXN_COLUMNS} FROM transactions ORDER BY date DESC, createdAt DESC"
                ),
                &[],
            )
        })
    }

    pub fn watch_recent_transactions(
        &self,
        limit: u32,
    ) -> Result<Subscription<Vec<Transaction>>> {
        self.watch(&[Table::Transactions], move |conn| {
            read_transactions(
                conn,
                &format!(
                    "SELECT {TXN_COLUMNS} FROM transactions ORDER BY date DESC, createdAt DESC LIMIT {limit}"
                ),
                &[],
            )
        })
    }

    // ── Categories ────────────────────────────────────────────

    /// Replace-on-conflict, so the fixed-id stock categories can be
    /// refreshed in place.
    pub fn insert_category(&self, cat: &Category) -> Result<i64> {
        self.conn.execute(
            "INSERT OR REPLACE INTO categories (id, name, icon, color) VALUES (?1, ?2, ?3, ?4)",
            params![cat.id, cat.name, cat.icon, cat.color],
        )?;
        let id = self.conn.last_insert_rowid();
        self.invalidate(Table::Categories);
        Ok(id)
    }

    pub fn get_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, icon, color FROM categories ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: Some(row.get("id")?),
                name: row.get("name")?,
                icon: row.get("icon")?,
                color: row.get("color")?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn get_category_by_id(&self, id: i64) -> Result<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, icon, color FROM categories WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Category {
                        id: Some(row.get("id")?),
                        name: row.get("name")?,
                        icon: row.get("icon")?,
                        color: row.get("color")?,
                    })
                },
            )
            .optional()?)
    }

    pub fn watch_categories(&self) -> Result<Subscription<Vec<Category>>> {
        self.watch(&[Table::Categories], |conn| {
            let mut stmt = conn.prepare("SELECT id, name, icon, color FROM categories ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok(Category {
                    id: Some(row.get("id")?),
                    name: row.get("name")?,
                    icon: row.get("icon")?,
                    color: row.get("color")?,
                })
            })?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        })
    }

    // ── Watch plumbing ────────────────────────────────────────

    /// Register a query over `tables`; the current snapshot is delivered
    /// immediately and a fresh one after every write touching those tables.
    fn watch<T, F>(&self, tables: &[Table], query: F) -> Result<Subscription<T>>
    where
        T: 'static,
        F: Fn(&Connection) -> Result<T> + 'static,
    {
        let (tx, rx) = crossbeam::channel::unbounded();
        let initial = query(&self.conn)?;
        let _ = tx.send(initial);
        self.watchers.borrow_mut().push(Watcher {
            tables: tables.to_vec(),
            rerun: Box::new(move |conn| match query(conn) {
                Ok(snapshot) => tx.send(snapshot).is_ok(),
                Err(e) => {
                    warn!(error = %e, "watched query failed; dropping subscriber");
                    false
                }
            }),
        });
        Ok(Subscription::new(rx))
    }

    /// Re-run every watcher of `table`, pruning the ones whose receiver is
    /// gone or whose query failed.
    fn invalidate(&self, table: Table) {
        debug!(table = table.name(), "invalidating watched queries");
        let conn = &self.conn;
        self.watchers
            .borrow_mut()
            .retain(|w| !w.tables.contains(&table) || (w.rerun)(conn));
    }

    #[cfg(test)]
    pub(crate) fn watcher_count(&self) -> usize {
        self.watchers.borrow().len()
    }
}

// ── Open-time schema handling ─────────────────────────────────

fn prepare_schema(conn: &Connection, opts: &mut OpenOptions) -> Result<()> {
    let has_version_table: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !has_version_table {
        // Fresh database: apply the full current schema
        conn.execute_batch(schema::SCHEMA_V4)?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![schema::CURRENT_VERSION],
        )?;
        write_identity(conn)?;
        info!(version = schema::CURRENT_VERSION, "created fresh schema");
    } else {
        let current: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current > schema::CURRENT_VERSION {
            if opts.destructive_fallback {
                destructive_reset(conn, opts)?;
            } else {
                return Err(StoreError::MigrationMissing {
                    from: current,
                    to: schema::CURRENT_VERSION,
                }
                .into());
            }
        } else if current < schema::CURRENT_VERSION {
            for &(from_version, sql) in schema::MIGRATIONS {
                if current <= from_version {
                    conn.execute_batch(sql)?;
                    info!(from = from_version, to = from_version + 1, "applied migration");
                }
            }
            conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
            // The migration path lands on the current generation
            write_identity(conn)?;
        } else {
            check_identity(conn, opts)?;
        }
    }

    validate::check(conn)?;
    Ok(())
}

fn write_identity(conn: &Connection) -> Result<()> {
    // Databases created before the master table existed gain it on migration
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS store_master (id INTEGER PRIMARY KEY, identity_hash TEXT);",
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO store_master (id, identity_hash) VALUES (42, ?1)",
        params![schema::identity_hash()],
    )?;
    Ok(())
}

fn check_identity(conn: &Connection, opts: &mut OpenOptions) -> Result<()> {
    let stored: Option<String> = conn
        .query_row("SELECT identity_hash FROM store_master WHERE id = 42", [], |row| {
            row.get(0)
        })
        .optional()?;
    let expected = schema::identity_hash();
    match stored {
        None => write_identity(conn),
        Some(found) if found == expected => Ok(()),
        Some(found) => {
            if opts.destructive_fallback {
                destructive_reset(conn, opts)
            } else {
                Err(StoreError::IdentityMismatch { expected, found }.into())
            }
        }
    }
}

/// Drop everything and recreate the current schema, discarding all data.
/// The caller-supplied notification runs before the rebuild.
fn destructive_reset(conn: &Connection, opts: &mut OpenOptions) -> Result<()> {
    warn!("schema diverged with no migration path; dropping all tables");
    if let Some(notify) = opts.on_destructive.as_mut() {
        notify();
    }
    for table in schema::ENTITY_TABLES {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table}"))?;
    }
    conn.execute_batch("DROP TABLE IF EXISTS schema_version; DROP TABLE IF EXISTS store_master;")?;
    conn.execute_batch(schema::SCHEMA_V4)?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        params![schema::CURRENT_VERSION],
    )?;
    write_identity(conn)
}

// ── Row readers (shared by one-shot reads and watchers) ───────

fn read_profile(conn: &Connection) -> Result<Option<UserProfile>> {
    let raw = conn
        .query_row(PROFILE_SQL, params![PROFILE_ID], |row| {
            Ok((
                row.get::<_, i64>("id")?,
                row.get::<_, i64>("incomeAmount")?,
                row.get::<_, i64>("fixedBillsAmount")?,
                row.get::<_, i64>("savingsGoalAmount")?,
                row.get::<_, String>("incomeFrequency")?,
                row.get::<_, u32>("resetDay")?,
                row.get::<_, String>("currency")?,
                row.get::<_, bool>("setupCompleted")?,
            ))
        })
        .optional()?;

    let Some((id, income, bills, savings, frequency, reset_day, currency, setup)) = raw else {
        return Ok(None);
    };
    Ok(Some(UserProfile {
        id,
        income_amount: income,
        fixed_bills_amount: bills,
        savings_goal_amount: savings,
        income_frequency: convert::parse_frequency(&frequency)?,
        reset_day,
        currency,
        setup_completed: setup,
    }))
}

fn read_transactions(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(sql)?;
    let raw = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, i64>("id")?,
                row.get::<_, i64>("amountCentavos")?,
                row.get::<_, Option<i64>>("categoryId")?,
                row.get::<_, Option<String>>("description")?,
                row.get::<_, i64>("date")?,
                row.get::<_, i64>("createdAt")?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(id, amount, category_id, description, date_ms, created_ms)| {
            Ok(Transaction {
                id: Some(id),
                amount_centavos: amount,
                category_id,
                description,
                date: convert::millis_to_datetime(date_ms)?,
                created_at: convert::millis_to_datetime(created_ms)?,
            })
        })
        .collect()
}

/// Epoch-millisecond bounds of `[start of month, start of next month)` in UTC.
fn month_bounds(year: i32, month: u32) -> Result<(i64, i64)> {
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

    let first = |y: i32, m: u32| -> Result<i64> {
        let day = NaiveDate::from_ymd_opt(y, m, 1)
            .with_context(|| format!("Invalid month: {y}-{m:02}"))?;
        Ok(Utc
            .from_utc_datetime(&day.and_time(NaiveTime::MIN))
            .timestamp_millis())
    };

    let start = first(year, month)?;
    let end = if month == 12 {
        let next = year
            .checked_add(1)
            .with_context(|| format!("Invalid month: {year}-{month:02}"))?;
        first(next, 1)?
    } else {
        first(year, month + 1)?
    };
    Ok((start, end))
}

#[cfg(test)]
mod tests;
