//! SQLite dialect for migrations.
//!
//! SQLite has limited ALTER TABLE support, so column changes beyond add,
//! drop and rename are applied by rebuilding the table: create a new table,
//! copy data, drop the old table, rename the new table. Full-text tables use
//! the `fts5` module; content-backed ones are kept in sync by triggers on
//! the content table.

use crate::operations::{ColumnCopy, MigrationOperation};
use crate::schema::{Column, ColumnType, FtsOptions, Index, IndexTarget, Table, TableKind};

use super::MigrationDialect;

/// SQLite migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn quote_list<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> String {
        names
            .into_iter()
            .map(|name| self.quote_identifier(name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Generates the definition of a column of a plain table.
    #[must_use]
    pub fn column_definition(&self, column: &Column) -> String {
        let mut parts = vec![
            self.quote_identifier(&column.name),
            column.column_type.sql_name().to_string(),
        ];

        if column.primary_key {
            parts.push("primary key".to_string());
            if column.autoincrement {
                parts.push("autoincrement".to_string());
            }
        }

        // An integer primary key aliases the rowid and is never null.
        let rowid_alias = column.primary_key && column.column_type == ColumnType::Integer;
        if !column.nullable && !rowid_alias {
            parts.push("not null".to_string());
        }

        if let Some(default) = &column.default {
            parts.push(format!("default {}", default.to_sql()));
        }

        if let Some(check) = &column.check {
            parts.push(format!("check ({check})"));
        }

        if let Some(reference) = &column.reference {
            parts.push(format!(
                "references {}({})",
                self.quote_identifier(&reference.table),
                self.quote_identifier(&reference.column)
            ));
            if let Some(action) = reference.on_delete.to_sql() {
                parts.push(format!("on delete {action}"));
            }
            if let Some(action) = reference.on_update.to_sql() {
                parts.push(format!("on update {action}"));
            }
        }

        if let Some(generated) = &column.generated {
            let storage = if generated.stored { "stored" } else { "virtual" };
            parts.push(format!(
                "generated always as ({}) {storage}",
                generated.expression
            ));
        }

        parts.join(" ")
    }

    /// Generates the CREATE TABLE statement of a plain table.
    #[must_use]
    pub fn create_table_sql(&self, table: &Table) -> String {
        self.create_table_named(&table.name, table)
    }

    fn create_table_named(&self, name: &str, table: &Table) -> String {
        let mut definitions: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();

        if !table.primary_key.is_empty() {
            definitions.push(format!(
                "primary key ({})",
                self.quote_list(&table.primary_key)
            ));
        }

        for fk in table.table_level_foreign_keys() {
            let mut clause = format!(
                "foreign key ({}) references {}({})",
                self.quote_list(&fk.columns),
                self.quote_identifier(&fk.target_table),
                self.quote_list(&fk.target_columns)
            );
            if let Some(action) = fk.on_delete.to_sql() {
                clause.push_str(&format!(" on delete {action}"));
            }
            if let Some(action) = fk.on_update.to_sql() {
                clause.push_str(&format!(" on update {action}"));
            }
            definitions.push(clause);
        }

        for check in &table.checks {
            definitions.push(format!("check ({check})"));
        }

        format!(
            "create table {} ({})",
            self.quote_identifier(name),
            definitions.join(", ")
        )
    }

    /// Generates the CREATE INDEX statement of an index.
    #[must_use]
    pub fn create_index_sql(&self, index: &Index) -> String {
        let target = match &index.target {
            IndexTarget::Columns(columns) => self.quote_list(columns),
            IndexTarget::Expression(expression) => expression.clone(),
        };
        let mut sql = format!(
            "create {}index {} on {}({target})",
            if index.unique { "unique " } else { "" },
            self.quote_identifier(&index.name),
            self.quote_identifier(&index.table)
        );
        if let Some(predicate) = &index.predicate {
            sql.push_str(&format!(" where {predicate}"));
        }
        sql
    }

    fn rebuild_sql(&self, table: &Table, temp_name: &str, copy: &[ColumnCopy]) -> Vec<String> {
        let name = self.quote_identifier(&table.name);
        let temp = self.quote_identifier(temp_name);

        let mut statements = vec![self.create_table_named(temp_name, table)];
        if !copy.is_empty() {
            let targets: Vec<String> = copy.iter().map(|c| self.quote_identifier(&c.to)).collect();
            let sources: Vec<String> = copy.iter().map(|c| self.quote_identifier(&c.from)).collect();
            statements.push(format!(
                "insert into {temp} ({}) select {} from {name}",
                targets.join(", "),
                sources.join(", ")
            ));
        }
        statements.push(format!("drop table {name}"));
        statements.push(format!("alter table {temp} rename to {name}"));
        statements.extend(table.indexes.iter().map(|i| self.create_index_sql(i)));
        statements.push("pragma foreign_key_check".to_string());
        statements
    }

    // ========================================================================
    // Full-text tables
    // ========================================================================

    fn fts_options(&self, options: &FtsOptions, parts: &mut Vec<String>) {
        if let Some(tokenizer) = &options.tokenizer {
            parts.push(format!("tokenize = {}", crate::expr::quote_string(tokenizer)));
        }
        if !options.prefix.is_empty() {
            let lengths: Vec<String> = options.prefix.iter().map(u32::to_string).collect();
            parts.push(format!("prefix = '{}'", lengths.join(" ")));
        }
    }

    /// Generates the CREATE VIRTUAL TABLE statement of a full-text table.
    #[must_use]
    pub fn create_fts_sql(&self, table: &Table) -> String {
        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|c| {
                let name = self.quote_identifier(&c.name);
                if c.unindexed {
                    format!("{name} unindexed")
                } else {
                    name
                }
            })
            .collect();

        match &table.kind {
            TableKind::ContentFts {
                content,
                content_rowid,
                options,
            } => {
                parts.push(format!("content = {}", crate::expr::quote_string(content)));
                parts.push(format!(
                    "content_rowid = {}",
                    crate::expr::quote_string(content_rowid)
                ));
                self.fts_options(options, &mut parts);
            }
            TableKind::ContentlessFts { options } => self.fts_options(options, &mut parts),
            TableKind::Plain => {}
        }

        format!(
            "create virtual table {} using fts5({})",
            self.quote_identifier(&table.name),
            parts.join(", ")
        )
    }

    fn trigger_names(&self, table: &Table) -> [String; 3] {
        ["ai", "ad", "au"].map(|suffix| self.quote_identifier(&format!("{}_{suffix}", table.name)))
    }

    /// Generates the triggers mirroring writes on the content table into a
    /// content full-text table, followed by a full re-index.
    #[must_use]
    pub fn fts_sync_sql(&self, table: &Table) -> Vec<String> {
        let TableKind::ContentFts {
            content,
            content_rowid,
            ..
        } = &table.kind
        else {
            return Vec::new();
        };

        let fts = self.quote_identifier(&table.name);
        let content = self.quote_identifier(content);
        let rowid = self.quote_identifier(content_rowid);
        let columns = self.quote_list(table.columns.iter().map(|c| &c.name));
        let values = |prefix: &str| {
            table
                .columns
                .iter()
                .map(|c| format!("{prefix}.{}", self.quote_identifier(&c.name)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let insert_new = format!(
            "insert into {fts}(rowid, {columns}) values (new.{rowid}, {})",
            values("new")
        );
        let delete_old = format!(
            "insert into {fts}({fts}, rowid, {columns}) values ('delete', old.{rowid}, {})",
            values("old")
        );
        let [insert, delete, update] = self.trigger_names(table);

        vec![
            format!("create trigger {insert} after insert on {content} begin {insert_new}; end"),
            format!("create trigger {delete} after delete on {content} begin {delete_old}; end"),
            format!(
                "create trigger {update} after update on {content} begin {delete_old}; {insert_new}; end"
            ),
            format!("insert into {fts}({fts}) values ('rebuild')"),
        ]
    }

    fn create_sql(&self, table: &Table) -> Vec<String> {
        if !table.is_full_text() {
            return vec![self.create_table_sql(table)];
        }
        let mut statements = vec![self.create_fts_sql(table)];
        statements.extend(self.fts_sync_sql(table));
        statements
    }

    fn drop_sql(&self, table: &Table) -> Vec<String> {
        let mut statements = Vec::new();
        if matches!(table.kind, TableKind::ContentFts { .. }) {
            statements.extend(
                self.trigger_names(table)
                    .into_iter()
                    .map(|trigger| format!("drop trigger if exists {trigger}")),
            );
        }
        statements.push(format!("drop table {}", self.quote_identifier(&table.name)));
        statements
    }
}

impl MigrationDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn generate_sql(&self, operation: &MigrationOperation) -> Vec<String> {
        match operation {
            MigrationOperation::CreateTable(table) => self.create_sql(table),
            MigrationOperation::DropTable(table) => self.drop_sql(table),
            MigrationOperation::AddColumn { table, column } => vec![format!(
                "alter table {} add column {}",
                self.quote_identifier(table),
                self.column_definition(column)
            )],
            MigrationOperation::DropColumn { table, column } => vec![format!(
                "alter table {} drop column {}",
                self.quote_identifier(table),
                self.quote_identifier(column)
            )],
            MigrationOperation::RenameColumn { table, from, to } => vec![format!(
                "alter table {} rename column {} to {}",
                self.quote_identifier(table),
                self.quote_identifier(from),
                self.quote_identifier(to)
            )],
            MigrationOperation::CreateIndex(index) => vec![self.create_index_sql(index)],
            MigrationOperation::DropIndex(index) => {
                vec![format!("drop index {}", self.quote_identifier(&index.name))]
            }
            MigrationOperation::RebuildTable {
                table,
                temp_name,
                copy,
            } => self.rebuild_sql(table, temp_name, copy),
            MigrationOperation::RestoreFullTextSync { table } => self.fts_sync_sql(table),
        }
    }
}
