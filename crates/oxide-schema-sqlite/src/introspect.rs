//! Reads facts back from a live SQLite database.
//!
//! The planner needs to know which tables hold rows; tests need to compare
//! what two databases look like after different migration paths.

use std::collections::{BTreeMap, BTreeSet};

use oxide_schema::expr::quote_identifier;
use oxide_schema::schema::{Schema, TableKind};
use sqlx::sqlite::SqlitePool;
use tracing::{debug, warn};

use crate::error::Result;

/// Returns the tables of `schema` that exist in the database and hold at
/// least one row. Content full-text tables are skipped: their rows live in
/// the content table.
pub async fn populated_tables(pool: &SqlitePool, schema: &Schema) -> Result<BTreeSet<String>> {
    let mut populated = BTreeSet::new();
    for table in schema.tables() {
        if matches!(table.kind, TableKind::ContentFts { .. }) {
            continue;
        }
        if !table_exists(pool, &table.name).await? {
            warn!(table = %table.name, "Declared table is missing from the database");
            continue;
        }
        let sql = format!(
            "select exists (select 1 from {})",
            quote_identifier(&table.name)
        );
        let (has_rows,): (i64,) = sqlx::query_as(&sql).fetch_one(pool).await?;
        if has_rows != 0 {
            populated.insert(table.name.clone());
        }
    }
    debug!(tables = ?populated, "Detected populated tables");
    Ok(populated)
}

async fn table_exists(pool: &SqlitePool, name: &str) -> Result<bool> {
    let row: Option<(String,)> =
        sqlx::query_as("select name from sqlite_master where type = 'table' and name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

/// One column as reported by `pragma table_xinfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnShape {
    pub name: String,
    /// Declared type, empty for untyped columns.
    pub declared_type: String,
    pub not_null: bool,
    /// Default as written in the DDL.
    pub default: Option<String>,
    /// Position in the primary key, 0 when not part of it.
    pub primary_key: i64,
    /// 0 for ordinary columns, 2 or 3 for generated ones.
    pub hidden: i64,
}

/// One index as reported by `pragma index_list` and `pragma index_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexShape {
    pub unique: bool,
    pub partial: bool,
    /// `c` for `create index`, `u` for unique constraints, `pk` for keys.
    pub origin: String,
    /// Indexed columns, `None` for expressions.
    pub columns: Vec<Option<String>>,
}

/// One foreign key column pair as reported by `pragma foreign_key_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyShape {
    pub from: String,
    pub table: String,
    pub to: Option<String>,
    pub on_update: String,
    pub on_delete: String,
}

/// Everything introspection reports about one table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableShape {
    /// Whether the table was created with `create virtual table`.
    pub is_virtual: bool,
    pub columns: Vec<ColumnShape>,
    pub indexes: BTreeMap<String, IndexShape>,
    pub foreign_keys: Vec<ForeignKeyShape>,
}

/// The observable shape of a database schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatabaseShape {
    pub tables: BTreeMap<String, TableShape>,
    /// Trigger name to the table it is defined on.
    pub triggers: BTreeMap<String, String>,
}

/// Introspects every user table, index, foreign key and trigger.
pub async fn database_shape(pool: &SqlitePool) -> Result<DatabaseShape> {
    let mut shape = DatabaseShape::default();

    let tables: Vec<(String, Option<String>)> = sqlx::query_as(
        "select name, sql from sqlite_master \
         where type = 'table' and name not like 'sqlite_%' order by name",
    )
    .fetch_all(pool)
    .await?;

    for (name, sql) in tables {
        let is_virtual = sql
            .as_deref()
            .is_some_and(|s| s.trim_start().to_ascii_lowercase().starts_with("create virtual"));
        let table = TableShape {
            is_virtual,
            columns: columns(pool, &name).await?,
            indexes: indexes(pool, &name).await?,
            foreign_keys: foreign_keys(pool, &name).await?,
        };
        shape.tables.insert(name, table);
    }

    let triggers: Vec<(String, String)> =
        sqlx::query_as("select name, tbl_name from sqlite_master where type = 'trigger'")
            .fetch_all(pool)
            .await?;
    shape.triggers = triggers.into_iter().collect();

    Ok(shape)
}

async fn columns(pool: &SqlitePool, table: &str) -> Result<Vec<ColumnShape>> {
    let rows: Vec<(String, String, i64, Option<String>, i64, i64)> = sqlx::query_as(
        "select name, type, \"notnull\", dflt_value, pk, hidden \
         from pragma_table_xinfo(?) order by cid",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(name, declared_type, not_null, default, primary_key, hidden)| ColumnShape {
                name,
                declared_type: declared_type.to_ascii_lowercase(),
                not_null: not_null != 0,
                default,
                primary_key,
                hidden,
            },
        )
        .collect())
}

async fn indexes(pool: &SqlitePool, table: &str) -> Result<BTreeMap<String, IndexShape>> {
    let list: Vec<(String, i64, String, i64)> = sqlx::query_as(
        "select name, \"unique\", origin, partial from pragma_index_list(?)",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    let mut indexes = BTreeMap::new();
    for (name, unique, origin, partial) in list {
        let columns: Vec<(Option<String>,)> =
            sqlx::query_as("select name from pragma_index_info(?) order by seqno")
                .bind(&name)
                .fetch_all(pool)
                .await?;
        indexes.insert(
            name,
            IndexShape {
                unique: unique != 0,
                partial: partial != 0,
                origin,
                columns: columns.into_iter().map(|(c,)| c).collect(),
            },
        );
    }
    Ok(indexes)
}

async fn foreign_keys(pool: &SqlitePool, table: &str) -> Result<Vec<ForeignKeyShape>> {
    let rows: Vec<(String, String, Option<String>, String, String)> = sqlx::query_as(
        "select \"from\", \"table\", \"to\", on_update, on_delete \
         from pragma_foreign_key_list(?) order by id, seq",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(from, table, to, on_update, on_delete)| ForeignKeyShape {
            from,
            table,
            to,
            on_update,
            on_delete,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_schema::descriptor::{integer, text, TableDescriptor};
    use oxide_schema::parser::parse;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool")
    }

    #[tokio::test]
    async fn test_populated_tables() {
        let pool = create_test_pool().await;
        sqlx::query("create table users (id integer primary key, name text)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("create table tags (id integer primary key)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("insert into users (name) values ('ada')")
            .execute(&pool)
            .await
            .unwrap();

        let schema = parse(&[
            TableDescriptor::new("users")
                .column(integer("id").primary_key())
                .column(text("name")),
            TableDescriptor::new("tags").column(integer("id").primary_key()),
            TableDescriptor::new("missing").column(integer("id").primary_key()),
        ])
        .unwrap();

        let populated = populated_tables(&pool, &schema).await.unwrap();
        assert_eq!(populated, BTreeSet::from(["users".to_string()]));
    }

    #[tokio::test]
    async fn test_database_shape() {
        let pool = create_test_pool().await;
        for sql in [
            "create table users (id integer primary key, email text not null default '')",
            "create table posts (id integer primary key, author_id integer references users(id) on delete cascade)",
            "create unique index users_unique_email on users(email)",
        ] {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }

        let shape = database_shape(&pool).await.unwrap();
        let users = &shape.tables["users"];
        assert!(!users.is_virtual);
        assert_eq!(users.columns[1].name, "email");
        assert!(users.columns[1].not_null);
        assert_eq!(users.columns[1].default.as_deref(), Some("''"));
        assert_eq!(users.columns[0].primary_key, 1);

        let index = &users.indexes["users_unique_email"];
        assert!(index.unique);
        assert_eq!(index.columns, vec![Some("email".to_string())]);

        let fk = &shape.tables["posts"].foreign_keys[0];
        assert_eq!(fk.table, "users");
        assert_eq!(fk.to.as_deref(), Some("id"));
        assert_eq!(fk.on_delete, "CASCADE");
    }
}
