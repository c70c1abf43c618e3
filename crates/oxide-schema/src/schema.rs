//! Schema representation types.
//!
//! These types describe one snapshot of a SQLite database: its tables, their
//! columns, indexes, foreign keys, checks and full-text settings. A
//! [`Schema`] is built once (by [`crate::parser::parse`] or
//! [`Schema::from_tables`]) and never mutated afterwards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::expr::{normalize_whitespace, quote_string};

/// Column types supported by the schema model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// 64-bit integer.
    Integer,
    /// UTF-8 text.
    Text,
    /// Floating point.
    Real,
    /// Boolean stored as 0/1.
    Boolean,
    /// Date stored as ISO-8601 text.
    Date,
    /// JSON document stored as text.
    Json,
    /// Binary large object.
    Blob,
}

impl ColumnType {
    /// Returns the declared type name used in DDL.
    #[must_use]
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Real => "real",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Json => "json",
            Self::Blob => "blob",
        }
    }
}

/// A literal value used by defaults and check rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// NULL.
    Null,
    /// Boolean, stored as 0/1.
    Boolean(bool),
    /// Integer.
    Integer(i64),
    /// Floating point.
    Real(f64),
    /// Text.
    Text(String),
}

impl Literal {
    /// Returns the SQL representation of this literal.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Real(f) => format!("{f:?}"),
            Self::Text(s) => quote_string(s),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// A literal assigned directly in the descriptor.
    Literal(Literal),
    /// A deferred SQL expression (e.g. `CURRENT_TIMESTAMP`).
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL representation of this default value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Literal(literal) => literal.to_sql(),
            Self::Expression(expr) => format!("({})", normalize_whitespace(expr)),
        }
    }

    /// Returns true for deferred expressions, which SQLite refuses in
    /// `ALTER TABLE ... ADD COLUMN`.
    #[must_use]
    pub fn is_expression(&self) -> bool {
        matches!(self, Self::Expression(_))
    }
}

/// Foreign key action (ON DELETE, ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    /// No action; the clause is omitted from DDL.
    #[default]
    NoAction,
    /// Restrict.
    Restrict,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the referencing column to NULL.
    SetNull,
    /// Set the referencing column to its default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL keywords for this action, or `None` for the default.
    #[must_use]
    pub fn to_sql(self) -> Option<&'static str> {
        match self {
            Self::NoAction => None,
            Self::Restrict => Some("restrict"),
            Self::Cascade => Some("cascade"),
            Self::SetNull => Some("set null"),
            Self::SetDefault => Some("set default"),
        }
    }
}

/// A single-column reference to another table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Referenced table.
    pub table: String,
    /// Referenced column (resolved to the target's primary key when omitted
    /// in the descriptor).
    pub column: String,
    /// Action on delete.
    pub on_delete: ForeignKeyAction,
    /// Action on update.
    pub on_update: ForeignKeyAction,
}

/// Marks a computed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generated {
    /// Expression computing the value.
    pub expression: String,
    /// Whether the value is stored rather than computed on read.
    pub stored: bool,
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub column_type: ColumnType,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// Whether this column is the table's simple primary key.
    pub primary_key: bool,
    /// Whether this column auto-increments.
    pub autoincrement: bool,
    /// Whether a unique index is generated for this column.
    pub unique: bool,
    /// Normalised check expression.
    pub check: Option<String>,
    /// Foreign key reference.
    pub reference: Option<Reference>,
    /// Computed column marker.
    pub generated: Option<Generated>,
    /// Full-text column excluded from the search index.
    pub unindexed: bool,
}

impl Column {
    /// Creates a nullable column with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            primary_key: false,
            autoincrement: false,
            unique: false,
            check: None,
            reference: None,
            generated: None,
            unindexed: false,
        }
    }

    /// Returns true when existing rows need a value the migration cannot
    /// supply (not null, no default, not computed).
    #[must_use]
    pub fn requires_value(&self) -> bool {
        !self.nullable && self.default.is_none() && self.generated.is_none()
    }
}

/// What an index covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexTarget {
    /// Plain column list.
    Columns(Vec<String>),
    /// Expression index.
    Expression(String),
}

/// Schema definition for an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    /// Index name, unique across the schema.
    pub name: String,
    /// Indexed table.
    pub table: String,
    /// Indexed columns or expression.
    pub target: IndexTarget,
    /// Whether this is a unique index.
    pub unique: bool,
    /// Partial index condition (WHERE clause).
    pub predicate: Option<String>,
}

impl Index {
    /// Returns every column the index mentions, including its predicate.
    #[must_use]
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut columns = match &self.target {
            IndexTarget::Columns(columns) => columns.clone(),
            IndexTarget::Expression(expr) => crate::expr::referenced_columns(expr),
        };
        if let Some(predicate) = &self.predicate {
            for column in crate::expr::referenced_columns(predicate) {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
        columns
    }
}

/// Schema definition for a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Column(s) in the referencing table.
    pub columns: Vec<String>,
    /// Referenced table name.
    pub target_table: String,
    /// Referenced column(s).
    pub target_columns: Vec<String>,
    /// Action on delete.
    pub on_delete: ForeignKeyAction,
    /// Action on update.
    pub on_update: ForeignKeyAction,
    /// True when every referencing column is nullable, which lets the
    /// planner break creation cycles through this key.
    pub nullable: bool,
}

/// Options shared by both full-text table variants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FtsOptions {
    /// Tokenizer specification (e.g. `porter unicode61`).
    pub tokenizer: Option<String>,
    /// Prefix index lengths.
    pub prefix: Vec<u32>,
}

/// What kind of table this is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Ordinary stored table.
    #[default]
    Plain,
    /// Full-text table mirroring columns of a content table.
    ContentFts {
        /// Content table.
        content: String,
        /// Content table column used as the rowid.
        content_rowid: String,
        /// Tokenizer and prefix settings.
        options: FtsOptions,
    },
    /// Self-contained full-text table storing its own text.
    ContentlessFts {
        /// Tokenizer and prefix settings.
        options: FtsOptions,
    },
}

/// Complete schema definition for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Column definitions, in declaration order.
    pub columns: Vec<Column>,
    /// Composite primary key columns (empty when a simple key is declared on
    /// a column).
    pub primary_key: Vec<String>,
    /// Index definitions.
    pub indexes: Vec<Index>,
    /// Foreign keys, column references included.
    pub foreign_keys: Vec<ForeignKey>,
    /// Table-level check expressions.
    pub checks: Vec<String>,
    /// Plain or full-text.
    pub kind: TableKind,
}

impl Table {
    /// Creates an empty plain table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
            kind: TableKind::Plain,
        }
    }

    /// Gets a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the ordinal position of a column.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the key columns: the simple primary key or the composite key.
    #[must_use]
    pub fn key_columns(&self) -> Vec<&str> {
        match self.columns.iter().find(|c| c.primary_key) {
            Some(column) => vec![column.name.as_str()],
            None => self.primary_key.iter().map(String::as_str).collect(),
        }
    }

    /// Returns the integer primary key column aliasing the rowid, if any.
    #[must_use]
    pub fn rowid_alias(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.primary_key && c.column_type == ColumnType::Integer)
    }

    /// Returns true for both full-text variants.
    #[must_use]
    pub fn is_full_text(&self) -> bool {
        !matches!(self.kind, TableKind::Plain)
    }

    /// Returns the content table of a content-backed full-text table.
    #[must_use]
    pub fn content_table(&self) -> Option<&str> {
        match &self.kind {
            TableKind::ContentFts { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Returns the tables this table cannot exist without: foreign key
    /// targets and the content table. Self-references are skipped.
    #[must_use]
    pub fn dependencies(&self) -> BTreeSet<&str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.target_table.as_str())
            .chain(self.content_table())
            .filter(|name| *name != self.name)
            .collect()
    }

    /// Returns true when the column is used by a constraint that makes
    /// `ALTER TABLE ... DROP COLUMN` impossible.
    #[must_use]
    pub fn constrains_column(&self, name: &str) -> bool {
        let mentioned = |expr: &str| crate::expr::referenced_columns(expr).iter().any(|c| c == name);

        self.primary_key.iter().any(|c| c == name)
            || self
                .foreign_keys
                .iter()
                .any(|fk| fk.columns.iter().any(|c| c == name))
            || self.checks.iter().any(|check| mentioned(check))
            || self.columns.iter().any(|c| {
                c.name != name
                    && (c.check.as_deref().is_some_and(mentioned)
                        || c.generated.as_ref().is_some_and(|g| mentioned(&g.expression)))
            })
    }

    /// Returns the foreign keys that are not rendered inline on a column.
    #[must_use]
    pub fn table_level_foreign_keys(&self) -> Vec<&ForeignKey> {
        self.foreign_keys
            .iter()
            .filter(|fk| !self.is_inline_reference(fk))
            .collect()
    }

    fn is_inline_reference(&self, fk: &ForeignKey) -> bool {
        let [column] = fk.columns.as_slice() else {
            return false;
        };
        let [target_column] = fk.target_columns.as_slice() else {
            return false;
        };
        self.column(column)
            .and_then(|c| c.reference.as_ref())
            .is_some_and(|r| {
                r.table == fk.target_table
                    && r.column == *target_column
                    && r.on_delete == fk.on_delete
                    && r.on_update == fk.on_update
            })
    }
}

/// The complete database schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    tables: Vec<Table>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Assembles a schema from ready-made tables.
    ///
    /// Checks the invariants that hold within a snapshot (unique table,
    /// column and index names, non-empty tables, a single primary key) but
    /// not cross-table references, which the planner verifies against the
    /// migration as a whole.
    pub fn from_tables(tables: Vec<Table>) -> Result<Self, SchemaError> {
        let mut table_names = BTreeSet::new();
        let mut index_names = BTreeSet::new();

        for table in &tables {
            if !table_names.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable(table.name.clone()));
            }
            if table.columns.is_empty() {
                return Err(SchemaError::EmptyTable(table.name.clone()));
            }

            let mut column_names = BTreeSet::new();
            for column in &table.columns {
                if !column_names.insert(column.name.as_str()) {
                    return Err(SchemaError::DuplicateColumn {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }

            let simple_keys = table.columns.iter().filter(|c| c.primary_key).count();
            if simple_keys > 1 || (simple_keys == 1 && !table.primary_key.is_empty()) {
                return Err(SchemaError::MultiplePrimaryKeys(table.name.clone()));
            }

            for index in &table.indexes {
                if !index_names.insert(index.name.as_str()) {
                    return Err(SchemaError::DuplicateIndex(index.name.clone()));
                }
            }
        }

        Ok(Self { tables })
    }

    /// Returns all tables in declaration order.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Gets a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Returns true when a table with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Returns table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Returns the full-text tables mirroring the given content table.
    pub fn full_text_tables_of<'a>(&'a self, content: &'a str) -> impl Iterator<Item = &'a Table> {
        self.tables
            .iter()
            .filter(move |t| t.content_table() == Some(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        let mut table = Table::new("users");
        let mut id = Column::new("id", ColumnType::Integer);
        id.primary_key = true;
        id.nullable = false;
        table.columns.push(id);
        table.columns.push(Column::new("name", ColumnType::Text));
        table
    }

    #[test]
    fn test_literal_to_sql() {
        assert_eq!(Literal::Null.to_sql(), "null");
        assert_eq!(Literal::Boolean(true).to_sql(), "1");
        assert_eq!(Literal::Integer(42).to_sql(), "42");
        assert_eq!(Literal::Real(1.0).to_sql(), "1.0");
        assert_eq!(Literal::from("it's").to_sql(), "'it''s'");
    }

    #[test]
    fn test_default_value_to_sql() {
        assert_eq!(DefaultValue::Literal(Literal::Integer(0)).to_sql(), "0");
        assert_eq!(
            DefaultValue::Expression("CURRENT_TIMESTAMP".to_string()).to_sql(),
            "(CURRENT_TIMESTAMP)"
        );
    }

    #[test]
    fn test_literal_deserializes_untagged() {
        let values: Vec<Literal> = serde_json::from_str(r#"[null, true, 5, 2.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Literal::Null,
                Literal::Boolean(true),
                Literal::Integer(5),
                Literal::Real(2.5),
                Literal::Text("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_tables_rejects_duplicates() {
        let err = Schema::from_tables(vec![users(), users()]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateTable("users".to_string()));

        let mut table = users();
        table.columns.push(Column::new("name", ColumnType::Text));
        let err = Schema::from_tables(vec![table]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_from_tables_rejects_two_primary_keys() {
        let mut table = users();
        table.primary_key = vec!["id".to_string(), "name".to_string()];
        let err = Schema::from_tables(vec![table]).unwrap_err();
        assert_eq!(err, SchemaError::MultiplePrimaryKeys("users".to_string()));
    }

    #[test]
    fn test_table_helpers() {
        let table = users();
        assert_eq!(table.key_columns(), vec!["id"]);
        assert_eq!(table.rowid_alias().map(|c| c.name.as_str()), Some("id"));
        assert_eq!(table.position("name"), Some(1));
        assert!(!table.constrains_column("name"));
        assert!(table.dependencies().is_empty());
    }
}
