//! Author-facing table descriptors.
//!
//! A descriptor is the declarative form of a table before it is parsed into
//! the [`crate::schema`] model. Columns are built by applying modifiers to a
//! base column; each modifier sets one named attribute, so the parsed result
//! does not depend on the order in which modifiers were applied.
//!
//! ```
//! use oxide_schema::descriptor::{integer, text, TableDescriptor};
//!
//! let users = TableDescriptor::new("users")
//!     .column(integer("id").primary_key().autoincrement())
//!     .column(text("email").not_null().unique())
//!     .column(text("name").max_length(100));
//! assert_eq!(users.columns.len(), 3);
//! ```
//!
//! Descriptors also deserialize from JSON, which is how the command line
//! tool reads schema files.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::schema::{ColumnType, ForeignKeyAction, Literal, Schema};

// ============================================================================
// Column modifiers
// ============================================================================

/// A value constraint attached to a column, rendered as a `check` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CheckRule {
    /// `column >= value`
    Min {
        /// Lower bound.
        value: Literal,
    },
    /// `column <= value`
    Max {
        /// Upper bound.
        value: Literal,
    },
    /// `column between low and high`
    Between {
        /// Lower bound.
        low: Literal,
        /// Upper bound.
        high: Literal,
    },
    /// `column in (...)`
    OneOf {
        /// Allowed values.
        values: Vec<Literal>,
    },
    /// `length(column) >= length`
    MinLength {
        /// Minimum length.
        length: u32,
    },
    /// `length(column) <= length`
    MaxLength {
        /// Maximum length.
        length: u32,
    },
    /// Free-form boolean expression.
    Expression {
        /// SQL expression.
        expression: String,
    },
}

/// A single attribute-setting modifier applied to a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnModifier {
    /// Simple primary key.
    PrimaryKey,
    /// Auto-incrementing integer key.
    AutoIncrement,
    /// Rejects NULL values.
    NotNull,
    /// Explicitly allows NULL values.
    Nullable,
    /// Unique value, expressed as a generated unique index.
    Unique,
    /// Generated index on this column.
    Index {
        /// Whether the index is unique.
        #[serde(default)]
        unique: bool,
        /// Partial index condition.
        #[serde(default)]
        predicate: Option<String>,
    },
    /// Literal default value.
    Default {
        /// The value.
        value: Literal,
    },
    /// Deferred default expression, evaluated on insert.
    DefaultExpression {
        /// SQL expression.
        expression: String,
    },
    /// Value constraint.
    Check {
        /// The rule.
        #[serde(flatten)]
        rule: CheckRule,
    },
    /// Foreign key reference.
    References {
        /// Target table.
        table: String,
        /// Target column, defaults to the target's primary key.
        #[serde(default)]
        column: Option<String>,
    },
    /// Action taken when the referenced row is deleted.
    OnDelete {
        /// The action.
        action: ForeignKeyAction,
    },
    /// Action taken when the referenced key is updated.
    OnUpdate {
        /// The action.
        action: ForeignKeyAction,
    },
    /// Shorthand for a reference with `on delete cascade`.
    Cascade {
        /// Target table.
        table: String,
        /// Target column, defaults to the target's primary key.
        #[serde(default)]
        column: Option<String>,
    },
    /// Computed column.
    Generated {
        /// SQL expression.
        expression: String,
        /// Whether the value is stored.
        #[serde(default)]
        stored: bool,
    },
    /// Full-text column excluded from the search index.
    Unindexed,
}

// ============================================================================
// Column descriptor
// ============================================================================

/// Declarative column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Modifiers, in the order they were applied.
    #[serde(default)]
    pub modifiers: Vec<ColumnModifier>,
}

macro_rules! column_constructor {
    ($(#[$doc:meta] $fn_name:ident => $variant:ident),* $(,)?) => {
        $(
            #[$doc]
            #[must_use]
            pub fn $fn_name(name: impl Into<String>) -> ColumnDescriptor {
                ColumnDescriptor::new(name, ColumnType::$variant)
            }
        )*
    };
}

column_constructor! {
    /// Creates an integer column.
    integer => Integer,
    /// Creates a text column.
    text => Text,
    /// Creates a real column.
    real => Real,
    /// Creates a boolean column.
    boolean => Boolean,
    /// Creates a date column.
    date => Date,
    /// Creates a JSON column.
    json => Json,
    /// Creates a blob column.
    blob => Blob,
}

impl ColumnDescriptor {
    /// Creates a column with no modifiers.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            modifiers: Vec::new(),
        }
    }

    /// Applies an arbitrary modifier.
    #[must_use]
    pub fn modifier(mut self, modifier: ColumnModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Sets as primary key.
    #[must_use]
    pub fn primary_key(self) -> Self {
        self.modifier(ColumnModifier::PrimaryKey)
    }

    /// Sets as auto-increment.
    #[must_use]
    pub fn autoincrement(self) -> Self {
        self.modifier(ColumnModifier::AutoIncrement)
    }

    /// Sets as NOT NULL.
    #[must_use]
    pub fn not_null(self) -> Self {
        self.modifier(ColumnModifier::NotNull)
    }

    /// Sets as nullable.
    #[must_use]
    pub fn nullable(self) -> Self {
        self.modifier(ColumnModifier::Nullable)
    }

    /// Sets as UNIQUE.
    #[must_use]
    pub fn unique(self) -> Self {
        self.modifier(ColumnModifier::Unique)
    }

    /// Adds a generated index.
    #[must_use]
    pub fn index(self) -> Self {
        self.modifier(ColumnModifier::Index {
            unique: false,
            predicate: None,
        })
    }

    /// Adds a generated partial index.
    #[must_use]
    pub fn index_where(self, predicate: impl Into<String>) -> Self {
        self.modifier(ColumnModifier::Index {
            unique: false,
            predicate: Some(predicate.into()),
        })
    }

    /// Adds a generated partial unique index.
    #[must_use]
    pub fn unique_where(self, predicate: impl Into<String>) -> Self {
        self.modifier(ColumnModifier::Index {
            unique: true,
            predicate: Some(predicate.into()),
        })
    }

    /// Sets a literal default value.
    #[must_use]
    pub fn default(self, value: impl Into<Literal>) -> Self {
        self.modifier(ColumnModifier::Default {
            value: value.into(),
        })
    }

    /// Sets a deferred default expression.
    #[must_use]
    pub fn default_expr(self, expression: impl Into<String>) -> Self {
        self.modifier(ColumnModifier::DefaultExpression {
            expression: expression.into(),
        })
    }

    fn check(self, rule: CheckRule) -> Self {
        self.modifier(ColumnModifier::Check { rule })
    }

    /// Requires `column >= value`.
    #[must_use]
    pub fn min(self, value: impl Into<Literal>) -> Self {
        self.check(CheckRule::Min {
            value: value.into(),
        })
    }

    /// Requires `column <= value`.
    #[must_use]
    pub fn max(self, value: impl Into<Literal>) -> Self {
        self.check(CheckRule::Max {
            value: value.into(),
        })
    }

    /// Requires `column between low and high`.
    #[must_use]
    pub fn between(self, low: impl Into<Literal>, high: impl Into<Literal>) -> Self {
        self.check(CheckRule::Between {
            low: low.into(),
            high: high.into(),
        })
    }

    /// Requires the value to be one of `values`.
    #[must_use]
    pub fn one_of<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        self.check(CheckRule::OneOf {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Requires `length(column) >= length`.
    #[must_use]
    pub fn min_length(self, length: u32) -> Self {
        self.check(CheckRule::MinLength { length })
    }

    /// Requires `length(column) <= length`.
    #[must_use]
    pub fn max_length(self, length: u32) -> Self {
        self.check(CheckRule::MaxLength { length })
    }

    /// Adds a free-form check expression.
    #[must_use]
    pub fn check_expr(self, expression: impl Into<String>) -> Self {
        self.check(CheckRule::Expression {
            expression: expression.into(),
        })
    }

    /// References the primary key of `table`.
    #[must_use]
    pub fn references(self, table: impl Into<String>) -> Self {
        self.modifier(ColumnModifier::References {
            table: table.into(),
            column: None,
        })
    }

    /// References a specific column of `table`.
    #[must_use]
    pub fn references_column(self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.modifier(ColumnModifier::References {
            table: table.into(),
            column: Some(column.into()),
        })
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(self, action: ForeignKeyAction) -> Self {
        self.modifier(ColumnModifier::OnDelete { action })
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(self, action: ForeignKeyAction) -> Self {
        self.modifier(ColumnModifier::OnUpdate { action })
    }

    /// References the primary key of `table` with `on delete cascade`.
    #[must_use]
    pub fn cascade(self, table: impl Into<String>) -> Self {
        self.modifier(ColumnModifier::Cascade {
            table: table.into(),
            column: None,
        })
    }

    /// Computes the column on read.
    #[must_use]
    pub fn generated(self, expression: impl Into<String>) -> Self {
        self.modifier(ColumnModifier::Generated {
            expression: expression.into(),
            stored: false,
        })
    }

    /// Computes the column on write and stores it.
    #[must_use]
    pub fn stored_generated(self, expression: impl Into<String>) -> Self {
        self.modifier(ColumnModifier::Generated {
            expression: expression.into(),
            stored: true,
        })
    }

    /// Excludes a full-text column from the search index.
    #[must_use]
    pub fn unindexed(self) -> Self {
        self.modifier(ColumnModifier::Unindexed)
    }
}

// ============================================================================
// Table descriptor
// ============================================================================

/// Kind of table being declared.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableKindDescriptor {
    /// Ordinary table.
    #[default]
    Plain,
    /// Full-text table over the columns of `content`.
    ContentFts {
        /// Content table.
        content: String,
        /// Content column used as rowid; defaults to the integer primary key.
        #[serde(default)]
        content_rowid: Option<String>,
        /// Tokenizer specification.
        #[serde(default)]
        tokenizer: Option<String>,
        /// Prefix index lengths.
        #[serde(default)]
        prefix: Vec<u32>,
    },
    /// Full-text table storing its own text.
    ContentlessFts {
        /// Tokenizer specification.
        #[serde(default)]
        tokenizer: Option<String>,
        /// Prefix index lengths.
        #[serde(default)]
        prefix: Vec<u32>,
    },
}

/// Declarative table-level index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Explicit name; generated from the table and columns when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Indexed columns.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Indexed expression, exclusive with `columns`.
    #[serde(default)]
    pub expression: Option<String>,
    /// Whether the index is unique.
    #[serde(default)]
    pub unique: bool,
    /// Partial index condition.
    #[serde(default)]
    pub predicate: Option<String>,
}

impl IndexDescriptor {
    /// Creates an index on columns.
    #[must_use]
    pub fn on<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Creates an expression index.
    #[must_use]
    pub fn expression(expression: impl Into<String>) -> Self {
        Self {
            expression: Some(expression.into()),
            ..Self::default()
        }
    }

    /// Sets as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Restricts the index to rows matching `predicate`.
    #[must_use]
    pub fn partial(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Sets an explicit name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Declarative table-level (possibly composite) foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Target table.
    pub table: String,
    /// Target columns, defaults to the target's key.
    #[serde(default)]
    pub target_columns: Vec<String>,
    /// Action on delete.
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
    /// Action on update.
    #[serde(default)]
    pub on_update: ForeignKeyAction,
}

impl ForeignKeyDescriptor {
    /// Creates a foreign key from `columns` to the key of `table`.
    #[must_use]
    pub fn new<I, S>(columns: I, table: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            table: table.into(),
            target_columns: Vec::new(),
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    /// Sets the target columns.
    #[must_use]
    pub fn target_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }
}

/// Declarative table definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,
    /// Plain or full-text.
    #[serde(default)]
    pub kind: TableKindDescriptor,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
    /// Composite primary key.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Table-level indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDescriptor>,
    /// Table-level foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
    /// Table-level check expressions.
    #[serde(default)]
    pub checks: Vec<String>,
}

impl TableDescriptor {
    /// Creates a plain table descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TableKindDescriptor::Plain,
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
        }
    }

    /// Creates a full-text table mirroring columns of `content`.
    #[must_use]
    pub fn content_fts(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: TableKindDescriptor::ContentFts {
                content: content.into(),
                content_rowid: None,
                tokenizer: None,
                prefix: Vec::new(),
            },
            ..Self::new(name)
        }
    }

    /// Creates a self-contained full-text table.
    #[must_use]
    pub fn contentless_fts(name: impl Into<String>) -> Self {
        Self {
            kind: TableKindDescriptor::ContentlessFts {
                tokenizer: None,
                prefix: Vec::new(),
            },
            ..Self::new(name)
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets a composite primary key.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a table-level index.
    #[must_use]
    pub fn index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a table-level foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKeyDescriptor) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Adds a table-level check expression.
    #[must_use]
    pub fn check(mut self, expression: impl Into<String>) -> Self {
        self.checks.push(expression.into());
        self
    }

    /// Sets the full-text content rowid column. Ignored for other kinds.
    #[must_use]
    pub fn content_rowid(mut self, column: impl Into<String>) -> Self {
        if let TableKindDescriptor::ContentFts { content_rowid, .. } = &mut self.kind {
            *content_rowid = Some(column.into());
        }
        self
    }

    /// Sets the full-text tokenizer. Ignored for plain tables.
    #[must_use]
    pub fn tokenizer(mut self, spec: impl Into<String>) -> Self {
        match &mut self.kind {
            TableKindDescriptor::ContentFts { tokenizer, .. }
            | TableKindDescriptor::ContentlessFts { tokenizer, .. } => {
                *tokenizer = Some(spec.into());
            }
            TableKindDescriptor::Plain => {}
        }
        self
    }

    /// Sets the full-text prefix index lengths. Ignored for plain tables.
    #[must_use]
    pub fn prefix(mut self, lengths: impl IntoIterator<Item = u32>) -> Self {
        match &mut self.kind {
            TableKindDescriptor::ContentFts { prefix, .. }
            | TableKindDescriptor::ContentlessFts { prefix, .. } => {
                *prefix = lengths.into_iter().collect();
            }
            TableKindDescriptor::Plain => {}
        }
        self
    }
}

/// A whole schema snapshot as authored, in declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Table descriptors.
    pub tables: Vec<TableDescriptor>,
}

impl SchemaDescriptor {
    /// Parses the descriptors into a [`Schema`].
    pub fn parse(&self) -> Result<Schema, SchemaError> {
        crate::parser::parse(&self.tables)
    }
}

impl From<Vec<TableDescriptor>> for SchemaDescriptor {
    fn from(tables: Vec<TableDescriptor>) -> Self {
        Self { tables }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_records_modifiers_in_order() {
        let column = text("email").not_null().unique().max_length(255);
        assert_eq!(column.column_type, ColumnType::Text);
        assert_eq!(
            column.modifiers,
            vec![
                ColumnModifier::NotNull,
                ColumnModifier::Unique,
                ColumnModifier::Check {
                    rule: CheckRule::MaxLength { length: 255 }
                },
            ]
        );
    }

    #[test]
    fn test_table_builder() {
        let table = TableDescriptor::new("memberships")
            .column(integer("user_id").not_null())
            .column(integer("group_id").not_null())
            .primary_key(["user_id", "group_id"])
            .index(IndexDescriptor::on(["group_id"]).unique().named("by_group"));

        assert_eq!(table.primary_key, vec!["user_id", "group_id"]);
        assert_eq!(table.indexes[0].name.as_deref(), Some("by_group"));
        assert!(table.indexes[0].unique);
    }

    #[test]
    fn test_fts_builder_options() {
        let table = TableDescriptor::content_fts("posts_search", "posts")
            .tokenizer("porter unicode61")
            .prefix([2, 3]);
        assert_eq!(
            table.kind,
            TableKindDescriptor::ContentFts {
                content: "posts".to_string(),
                content_rowid: None,
                tokenizer: Some("porter unicode61".to_string()),
                prefix: vec![2, 3],
            }
        );
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{
            "tables": [{
                "name": "users",
                "columns": [
                    {"name": "id", "type": "integer", "modifiers": [{"kind": "primary_key"}]},
                    {"name": "age", "type": "integer", "modifiers": [
                        {"kind": "check", "rule": "between", "low": 0, "high": 150},
                        {"kind": "default", "value": 18}
                    ]},
                    {"name": "team_id", "type": "integer", "modifiers": [
                        {"kind": "cascade", "table": "teams"}
                    ]}
                ]
            }]
        }"#;
        let schema: SchemaDescriptor = serde_json::from_str(json).unwrap();
        let users = &schema.tables[0];
        assert_eq!(users.kind, TableKindDescriptor::Plain);
        assert_eq!(users.columns[1], integer("age").between(0, 150).default(18));
        assert_eq!(users.columns[2], integer("team_id").cascade("teams"));
    }
}
