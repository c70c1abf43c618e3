//! Error types for schema construction and migration planning.
//!
//! Representation-level problems (a descriptor that cannot describe a valid
//! table) are reported as [`SchemaError`]. Problems found while diffing and
//! planning are reported as [`Error`]. Both are raised before any SQL is
//! rendered.

/// A descriptor or table definition is malformed or self-inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Two tables share a name.
    #[error("Table '{0}' is declared more than once")]
    DuplicateTable(String),

    /// A table declares no columns.
    #[error("Table '{0}' has no columns")]
    EmptyTable(String),

    /// Two columns of one table share a name.
    #[error("Column '{column}' is declared more than once in table '{table}'")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// The same attribute was set twice with different values.
    #[error("Column '{table}.{column}' sets {attribute} more than once with different values")]
    ConflictingModifier {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Attribute that was set twice.
        attribute: &'static str,
    },

    /// A modifier cannot be applied to this column.
    #[error("Invalid modifier on column '{table}.{column}': {reason}")]
    InvalidModifier {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Why the modifier was rejected.
        reason: String,
    },

    /// A table declares more than one primary key.
    #[error("Table '{0}' declares more than one primary key")]
    MultiplePrimaryKeys(String),

    /// A reference names a table that does not exist.
    #[error("'{referenced_by}' references unknown table '{table}'")]
    UnknownTable {
        /// The missing table.
        table: String,
        /// Where the reference was made.
        referenced_by: String,
    },

    /// An expression, key or reference names a column that does not exist.
    #[error("Unknown column '{table}.{column}' used by {context}")]
    UnknownColumn {
        /// Table the column was looked up in.
        table: String,
        /// The missing column.
        column: String,
        /// Where the column was used.
        context: String,
    },

    /// A foreign key cannot be resolved.
    #[error("Invalid foreign key on table '{table}': {reason}")]
    InvalidForeignKey {
        /// Referencing table.
        table: String,
        /// Why the key was rejected.
        reason: String,
    },

    /// Two indexes share a name but differ in definition.
    #[error("Index name '{0}' is used by more than one index")]
    DuplicateIndex(String),

    /// A full-text table definition is invalid.
    #[error("Invalid full-text table '{table}': {reason}")]
    InvalidFullText {
        /// Full-text table name.
        table: String,
        /// Why the definition was rejected.
        reason: String,
    },
}

/// Errors raised while diffing or planning a migration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A snapshot is malformed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A table is dropped (or missing) while something still depends on it.
    #[error("Table '{table}' is still referenced by '{referenced_by}'")]
    Dependency {
        /// The table that is missing after the migration.
        table: String,
        /// The table that still depends on it.
        referenced_by: String,
    },

    /// Created tables form a foreign-key cycle with no nullable edge.
    #[error("Foreign keys between {} form a cycle with no nullable reference", .tables.join(", "))]
    CyclicSchema {
        /// Tables on (or between) the offending cycles.
        tables: Vec<String>,
    },

    /// An operation would silently lose or corrupt data.
    #[error("Migration of table '{table}' would lose data: {reason}")]
    Migration {
        /// Affected table.
        table: String,
        /// What would be lost.
        reason: String,
    },
}

/// Result type for planning operations.
pub type Result<T> = std::result::Result<T, Error>;
