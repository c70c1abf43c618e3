//! Migration operations.
//!
//! This module defines every schema change a plan can contain. Each
//! operation carries enough of the schema to be rendered to SQL on its own.

use serde::{Deserialize, Serialize};

use crate::schema::{Column, Index, Table};

/// One column copied during a table rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCopy {
    /// Column name in the original table.
    pub from: String,
    /// Column name in the rebuilt table.
    pub to: String,
}

impl ColumnCopy {
    /// Copies a column that kept its name.
    #[must_use]
    pub fn same(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            from: name.clone(),
            to: name,
        }
    }
}

/// A single migration operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MigrationOperation {
    /// Create a table. Full-text tables also get their sync triggers.
    CreateTable(Table),

    /// Drop a table. Full-text tables also lose their sync triggers.
    DropTable(Table),

    /// Add a column to a table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: Column,
    },

    /// Drop a column from a table.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Rename a column.
    RenameColumn {
        /// Table name.
        table: String,
        /// Old column name.
        from: String,
        /// New column name.
        to: String,
    },

    /// Create an index.
    CreateIndex(Index),

    /// Drop an index.
    DropIndex(Index),

    /// Rebuild a table through a temporary copy: create the new shape,
    /// copy rows, drop the original, rename, re-create indexes and check
    /// foreign keys.
    RebuildTable {
        /// Current definition of the table, indexes included.
        table: Table,
        /// Name of the temporary table.
        temp_name: String,
        /// Columns copied from the original table.
        copy: Vec<ColumnCopy>,
    },

    /// Re-create the sync triggers of a content full-text table after its
    /// content table was rebuilt, and re-index it.
    RestoreFullTextSync {
        /// The full-text table.
        table: Table,
    },
}

impl MigrationOperation {
    /// Creates an AddColumn operation.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: Column) -> Self {
        Self::AddColumn {
            table: table.into(),
            column,
        }
    }

    /// Creates a DropColumn operation.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DropColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a RenameColumn operation.
    #[must_use]
    pub fn rename_column(
        table: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::RenameColumn {
            table: table.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Returns the name of the table this operation touches.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::CreateTable(table)
            | Self::DropTable(table)
            | Self::RebuildTable { table, .. }
            | Self::RestoreFullTextSync { table } => &table.name,
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::RenameColumn { table, .. } => table,
            Self::CreateIndex(index) | Self::DropIndex(index) => &index.table,
        }
    }

    /// Returns true if this operation can discard stored data.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::DropTable(_) | Self::DropColumn { .. } | Self::RebuildTable { .. }
        )
    }

    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable(table) => format!("Create table '{}'", table.name),
            Self::DropTable(table) => format!("Drop table '{}'", table.name),
            Self::AddColumn { table, column } => {
                format!("Add column '{}' to table '{}'", column.name, table)
            }
            Self::DropColumn { table, column } => {
                format!("Drop column '{column}' from table '{table}'")
            }
            Self::RenameColumn { table, from, to } => {
                format!("Rename column '{from}' to '{to}' in table '{table}'")
            }
            Self::CreateIndex(index) => {
                format!("Create index '{}' on table '{}'", index.name, index.table)
            }
            Self::DropIndex(index) => format!("Drop index '{}'", index.name),
            Self::RebuildTable { table, copy, .. } => format!(
                "Rebuild table '{}' copying {} column(s)",
                table.name,
                copy.len()
            ),
            Self::RestoreFullTextSync { table } => {
                format!("Restore full-text sync for '{}'", table.name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    #[test]
    fn test_description() {
        let op = MigrationOperation::add_column("users", Column::new("name", ColumnType::Text));
        assert_eq!(op.description(), "Add column 'name' to table 'users'");

        let op = MigrationOperation::rename_column("users", "name", "displayName");
        assert_eq!(
            op.description(),
            "Rename column 'name' to 'displayName' in table 'users'"
        );
        assert_eq!(op.table_name(), "users");
        assert!(!op.is_destructive());
    }

    #[test]
    fn test_destructive_operations() {
        assert!(MigrationOperation::drop_column("users", "name").is_destructive());
        assert!(MigrationOperation::DropTable(Table::new("users")).is_destructive());
        assert!(!MigrationOperation::CreateTable(Table::new("users")).is_destructive());
    }

    #[test]
    fn test_column_copy_same() {
        assert_eq!(
            ColumnCopy::same("id"),
            ColumnCopy {
                from: "id".to_string(),
                to: "id".to_string()
            }
        );
    }
}
