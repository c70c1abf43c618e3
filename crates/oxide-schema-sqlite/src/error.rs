//! Error types for applying migrations.

use std::path::PathBuf;

use oxide_schema::error::SchemaError;

/// A foreign key check failure reported by `pragma foreign_key_check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyViolation {
    /// Table holding the offending row.
    pub table: String,
    /// Rowid of the offending row, absent for `without rowid` tables.
    pub rowid: Option<i64>,
    /// Table the row fails to reference.
    pub parent: String,
}

impl std::fmt::Display for ForeignKeyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.rowid {
            Some(rowid) => write!(f, "{} row {} -> {}", self.table, rowid, self.parent),
            None => write!(f, "{} -> {}", self.table, self.parent),
        }
    }
}

/// Errors that can occur while planning or applying a migration.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The migration could not be planned.
    #[error(transparent)]
    Plan(#[from] oxide_schema::Error),

    /// A schema file describes an invalid schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Database error during execution.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Rows violate foreign keys after the migration; nothing was committed.
    #[error("Foreign key check failed:\n{}", .violations.iter().map(|v| format!("  - {v}")).collect::<Vec<_>>().join("\n"))]
    ForeignKeyViolation {
        /// Every reported violation.
        violations: Vec<ForeignKeyViolation>,
    },

    /// Failed to parse a schema file.
    #[error("Failed to parse schema file '{path}': {source}")]
    Descriptor {
        /// Path to the schema file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// IO error reading a schema file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for apply operations.
pub type Result<T> = std::result::Result<T, ApplyError>;
