//! Structural schema validation, run after migrations on every open.
//!
//! Each entity table's on-disk definition is read back through
//! `PRAGMA table_info` and compared field-for-field against the expected
//! definition. Any divergence fails the open with an expected-vs-found
//! diff; nothing here ever mutates the database.

use std::collections::BTreeMap;
use std::fmt;

use rusqlite::Connection;

use super::error::StoreError;
use super::schema;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnInfo {
    pub(crate) name: String,
    pub(crate) decl_type: String,
    pub(crate) not_null: bool,
    /// 1-based position within the primary key, 0 when not part of it.
    pub(crate) pk: u32,
}

impl ColumnInfo {
    pub(crate) fn new(name: &str, decl_type: &str, not_null: bool, pk: u32) -> Self {
        Self {
            name: name.to_string(),
            decl_type: decl_type.to_uppercase(),
            not_null,
            pk,
        }
    }
}

impl fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}{}",
            self.name,
            self.decl_type,
            if self.not_null { " NOT NULL" } else { "" },
            if self.pk > 0 { " PK" } else { "" },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableInfo {
    pub(crate) name: String,
    /// Keyed by column name so comparison and diff output are order-independent.
    pub(crate) columns: BTreeMap<String, ColumnInfo>,
}

impl TableInfo {
    pub(crate) fn new(name: &str, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.into_iter().map(|c| (c.name.clone(), c)).collect(),
        }
    }

    /// Read the live definition of `table` from the database.
    pub(crate) fn read(conn: &Connection, table: &str) -> Result<Self, StoreError> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get("name")?,
                    decl_type: row.get::<_, String>("type")?.to_uppercase(),
                    not_null: row.get("notnull")?,
                    pk: row.get("pk")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(table, columns))
    }
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cols: Vec<String> = self.columns.values().map(|c| c.to_string()).collect();
        write!(f, "{}({})", self.name, cols.join(", "))
    }
}

pub(crate) fn check(conn: &Connection) -> Result<(), StoreError> {
    for expected in schema::expected_tables() {
        let found = TableInfo::read(conn, &expected.name)?;
        if found != expected {
            return Err(StoreError::SchemaMismatch {
                table: expected.name.clone(),
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
    }
    Ok(())
}
