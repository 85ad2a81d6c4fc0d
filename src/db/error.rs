/// Failures the store surfaces as typed errors so callers can tell schema
/// drift apart from ordinary query failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("schema validation failed for table `{table}`\n expected: {expected}\n    found: {found}")]
    SchemaMismatch {
        table: String,
        expected: String,
        found: String,
    },

    #[error("schema identity mismatch: expected {expected}, found {found}")]
    IdentityMismatch { expected: String, found: String },

    #[error("no migration path from schema version {from} to {to}")]
    MigrationMissing { from: i32, to: i32 },

    #[error("unknown income frequency `{0}` stored in profile")]
    UnknownFrequency(String),

    #[error("stored timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}
