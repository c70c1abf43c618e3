//! Serializable schema metadata.
//!
//! Query builders and code generators consume this instead of the schema
//! model itself, so the shape is flat and uses camelCase keys.

use serde::Serialize;

use crate::schema::{ForeignKeyAction, IndexTarget, Schema, Table, TableKind};

/// Metadata for a whole schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescription {
    pub tables: Vec<TableDescription>,
}

/// Metadata for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescription {
    pub name: String,
    /// `plain`, `content_fts` or `contentless_fts`.
    pub kind: &'static str,
    /// Content table of a content full-text table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub columns: Vec<ColumnDescription>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexDescription>,
    pub foreign_keys: Vec<ForeignKeyDescription>,
    pub checks: Vec<String>,
}

/// Metadata for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: &'static str,
    pub not_null: bool,
    /// Default rendered as SQL.
    pub default: Option<String>,
    pub check: Option<String>,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub generated: Option<String>,
    pub references: Option<ReferenceDescription>,
}

/// Target of a column reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDescription {
    pub table: String,
    pub column: String,
    pub on_delete: &'static str,
    pub on_update: &'static str,
}

/// Metadata for one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDescription {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}

/// Metadata for one foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyDescription {
    pub columns: Vec<String>,
    pub table: String,
    pub target_columns: Vec<String>,
    pub on_delete: &'static str,
    pub on_update: &'static str,
}

fn action_name(action: ForeignKeyAction) -> &'static str {
    action.to_sql().unwrap_or("no action")
}

impl Schema {
    /// Describes the schema for external consumers.
    #[must_use]
    pub fn describe(&self) -> SchemaDescription {
        SchemaDescription {
            tables: self.tables().iter().map(describe_table).collect(),
        }
    }
}

fn describe_table(table: &Table) -> TableDescription {
    let (kind, content) = match &table.kind {
        TableKind::Plain => ("plain", None),
        TableKind::ContentFts { content, .. } => ("content_fts", Some(content.clone())),
        TableKind::ContentlessFts { .. } => ("contentless_fts", None),
    };

    let columns = table
        .columns
        .iter()
        .map(|column| ColumnDescription {
            name: column.name.clone(),
            column_type: column.column_type.sql_name(),
            not_null: !column.nullable,
            default: column.default.as_ref().map(|d| d.to_sql()),
            check: column.check.clone(),
            primary_key: column.primary_key || table.primary_key.contains(&column.name),
            autoincrement: column.autoincrement,
            generated: column.generated.as_ref().map(|g| g.expression.clone()),
            references: column.reference.as_ref().map(|r| ReferenceDescription {
                table: r.table.clone(),
                column: r.column.clone(),
                on_delete: action_name(r.on_delete),
                on_update: action_name(r.on_update),
            }),
        })
        .collect();

    let indexes = table
        .indexes
        .iter()
        .map(|index| {
            let (columns, expression) = match &index.target {
                IndexTarget::Columns(columns) => (columns.clone(), None),
                IndexTarget::Expression(expression) => (Vec::new(), Some(expression.clone())),
            };
            IndexDescription {
                name: index.name.clone(),
                unique: index.unique,
                columns,
                expression,
                predicate: index.predicate.clone(),
            }
        })
        .collect();

    let foreign_keys = table
        .foreign_keys
        .iter()
        .map(|fk| ForeignKeyDescription {
            columns: fk.columns.clone(),
            table: fk.target_table.clone(),
            target_columns: fk.target_columns.clone(),
            on_delete: action_name(fk.on_delete),
            on_update: action_name(fk.on_update),
        })
        .collect();

    TableDescription {
        name: table.name.clone(),
        kind,
        content,
        columns,
        primary_key: table
            .key_columns()
            .into_iter()
            .map(String::from)
            .collect(),
        indexes,
        foreign_keys,
        checks: table.checks.clone(),
    }
}

#[cfg(test)]
mod tests {
    use crate::descriptor::{integer, text, TableDescriptor};
    use crate::parser::parse;

    #[test]
    fn test_describe_columns() {
        let schema = parse(&[
            TableDescriptor::new("users").column(integer("id").primary_key()),
            TableDescriptor::new("posts")
                .column(integer("id").primary_key())
                .column(integer("author_id").cascade("users"))
                .column(text("status").default("draft")),
        ])
        .unwrap();

        let description = schema.describe();
        let posts = &description.tables[1];
        assert_eq!(posts.kind, "plain");
        assert_eq!(posts.primary_key, vec!["id"]);

        let author = &posts.columns[1];
        assert!(!author.not_null);
        let reference = author.references.as_ref().unwrap();
        assert_eq!(reference.table, "users");
        assert_eq!(reference.on_delete, "cascade");
        assert_eq!(reference.on_update, "no action");

        assert_eq!(posts.columns[2].default.as_deref(), Some("'draft'"));
        assert_eq!(posts.indexes[0].name, "posts_index_author_id");
    }

    #[test]
    fn test_describe_serializes_camel_case() {
        let schema = parse(&[TableDescriptor::new("users")
            .column(integer("id").primary_key().autoincrement())])
        .unwrap();
        let json = serde_json::to_value(schema.describe()).unwrap();
        let id = &json["tables"][0]["columns"][0];
        assert_eq!(id["type"], "integer");
        assert_eq!(id["notNull"], true);
        assert_eq!(id["primaryKey"], true);
        assert_eq!(json["tables"][0]["foreignKeys"], serde_json::json!([]));
        assert!(json["tables"][0].get("content").is_none());
    }
}
