//! Applies `oxide-schema` migration plans to SQLite databases.
//!
//! The planning crate is pure: it turns two schema snapshots into
//! operations. This crate supplies what needs a database connection:
//! - **Introspect** - Which tables hold rows, and what a database looks like
//! - **Executor** - Runs a plan atomically with foreign keys re-validated
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_schema::dialect::SqliteDialect;
//! use oxide_schema_sqlite::{executor::MigrationExecutor, load_schema};
//!
//! let previous = load_schema("schema/v1.json".as_ref())?;
//! let current = load_schema("schema/v2.json".as_ref())?;
//! let executor = MigrationExecutor::new(pool, SqliteDialect::new());
//! executor.migrate(&previous, &current, false).await?;
//! ```

pub mod error;
pub mod executor;
pub mod introspect;

use std::path::Path;

use oxide_schema::descriptor::SchemaDescriptor;
use oxide_schema::schema::Schema;

use crate::error::{ApplyError, Result};

/// Reads a JSON schema file and parses it.
pub fn load_schema(path: &Path) -> Result<Schema> {
    let contents = std::fs::read_to_string(path)?;
    let descriptor: SchemaDescriptor =
        serde_json::from_str(&contents).map_err(|source| ApplyError::Descriptor {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(descriptor.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_schema() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tables": [{{"name": "users", "columns": [
                {{"name": "id", "type": "integer", "modifiers": [{{"kind": "primary_key"}}]}},
                {{"name": "email", "type": "text", "modifiers": [{{"kind": "unique"}}]}}
            ]}}]}}"#
        )
        .unwrap();

        let schema = load_schema(file.path()).unwrap();
        let users = schema.table("users").unwrap();
        assert_eq!(users.indexes[0].name, "users_unique_email");
    }

    #[test]
    fn test_load_schema_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"tables\": 42}}").unwrap();
        assert!(matches!(
            load_schema(file.path()),
            Err(ApplyError::Descriptor { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tables": [{{"name": "empty"}}]}}"#).unwrap();
        assert!(matches!(
            load_schema(file.path()),
            Err(ApplyError::Schema(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_schema(&dir.path().join("missing.json")),
            Err(ApplyError::Io(_))
        ));
    }
}
