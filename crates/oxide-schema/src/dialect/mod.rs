//! DDL emitters.
//!
//! A dialect knows how to turn migration operations into SQL text for one
//! database engine.

mod sqlite;

pub use sqlite::SqliteDialect;

use crate::expr::normalize_whitespace;
use crate::operations::MigrationOperation;

/// Trait for database-specific SQL generation.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Generates the statements for one operation, without terminators.
    fn generate_sql(&self, operation: &MigrationOperation) -> Vec<String>;

    /// Quotes an identifier when it needs quoting.
    fn quote_identifier(&self, name: &str) -> String {
        crate::expr::quote_identifier(name).into_owned()
    }

    /// Renders operations as a script: one normalised statement per line,
    /// each terminated by `;`.
    fn render(&self, operations: &[MigrationOperation]) -> String {
        operations
            .iter()
            .flat_map(|op| self.generate_sql(op))
            .map(|statement| format!("{};", normalize_sql(&statement)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Normalises a statement so that semantically identical SQL compares
/// equal: whitespace runs outside literals collapse to one space, and
/// surrounding whitespace and trailing terminators are removed.
#[must_use]
pub fn normalize_sql(sql: &str) -> String {
    let normalized = normalize_whitespace(sql);
    normalized.trim_end_matches(';').trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sql() {
        assert_eq!(
            normalize_sql("  drop   index\n users_unique_name ;"),
            "drop index users_unique_name"
        );
        assert_eq!(
            normalize_sql("insert into t values ('a  b');"),
            "insert into t values ('a  b')"
        );
    }
}
