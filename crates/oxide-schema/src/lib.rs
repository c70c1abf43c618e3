//! Declarative SQLite schemas and migration planning.
//!
//! `oxide-schema` turns two snapshots of a declared schema into the ordered
//! DDL that migrates a database from the first to the second:
//! - Columns are declared with composable modifiers whose order does not
//!   matter, and parsed into an immutable [`Schema`](schema::Schema)
//! - Snapshots are diffed structurally, detecting column renames
//! - The planner picks in-place `alter table` statements where SQLite
//!   supports them and full table rebuilds elsewhere, ordered by foreign-key
//!   dependencies
//! - Full-text (`fts5`) tables and their sync triggers are planned with the
//!   tables they index
//!
//! # Architecture
//!
//! - **Descriptor** - Author-facing table and column builders
//! - **Parser** - Validates descriptors and resolves references
//! - **Diff** - Structural differences between two schemas
//! - **Planner** - Orders differences into migration operations
//! - **Dialect** - SQL generation for SQLite
//! - **Describe** - Serializable metadata for other tools
//!
//! # Example
//!
//! ```rust
//! use oxide_schema::prelude::*;
//!
//! let before = SchemaDescriptor::from(vec![
//!     TableDescriptor::new("users")
//!         .column(integer("id").primary_key())
//!         .column(text("name")),
//! ])
//! .parse()
//! .unwrap();
//!
//! let after = SchemaDescriptor::from(vec![
//!     TableDescriptor::new("users")
//!         .column(integer("id").primary_key())
//!         .column(text("name").unique()),
//! ])
//! .parse()
//! .unwrap();
//!
//! let script = oxide_schema::migrate(&before, &after).unwrap();
//! assert_eq!(script, "create unique index users_unique_name on users(name);");
//! ```

pub mod describe;
pub mod descriptor;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod expr;
pub mod operations;
pub mod parser;
pub mod planner;
pub mod schema;

use dialect::{MigrationDialect, SqliteDialect};
pub use error::{Error, Result};
use schema::Schema;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::describe::SchemaDescription;
    pub use crate::descriptor::{
        blob, boolean, date, integer, json, real, text, CheckRule, ColumnDescriptor,
        ColumnModifier, ForeignKeyDescriptor, IndexDescriptor, SchemaDescriptor, TableDescriptor,
    };
    pub use crate::dialect::{normalize_sql, MigrationDialect, SqliteDialect};
    pub use crate::diff::{diff, ChangeSet};
    pub use crate::error::{Error, Result, SchemaError};
    pub use crate::operations::MigrationOperation;
    pub use crate::planner::{plan, PlanOptions, Planner};
    pub use crate::schema::{
        Column, ColumnType, ForeignKeyAction, Index, Literal, Schema, Table, TableKind,
    };
}

/// Plans the migration from `previous` to `current` with default options
/// and renders it as a SQLite script.
///
/// # Errors
///
/// Returns an error if the migration cannot be planned.
pub fn migrate(previous: &Schema, current: &Schema) -> Result<String> {
    let operations = planner::plan(&diff::diff(previous, current))?;
    Ok(SqliteDialect::new().render(&operations))
}
