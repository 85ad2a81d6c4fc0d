//! Local-only SQLite persistence for the BaryaBuddy budget tracker.
//!
//! [`db::Database`] owns the connection and exposes typed reads and writes
//! for the profile, transaction, and category tables, plus watched queries
//! that re-emit a fresh snapshot whenever a table they cover is written.

pub mod db;
pub mod models;
