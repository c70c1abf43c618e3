//! End-to-end tests: descriptors in, SQLite script out.

use oxide_schema::prelude::*;
use oxide_schema::{migrate, parser::parse};

fn schema(tables: Vec<TableDescriptor>) -> Schema {
    parse(&tables).unwrap()
}

fn users(extra: Vec<ColumnDescriptor>) -> TableDescriptor {
    extra.into_iter().fold(
        TableDescriptor::new("users").column(integer("id").primary_key()),
        TableDescriptor::column,
    )
}

fn posts(author: ColumnDescriptor) -> TableDescriptor {
    TableDescriptor::new("posts")
        .column(integer("id").primary_key())
        .column(author)
        .column(text("title").not_null())
}

#[test]
fn test_identical_schemas_plan_nothing() {
    let s = schema(vec![
        users(vec![text("name").not_null().unique()]),
        posts(integer("author_id").cascade("users")),
        TableDescriptor::content_fts("posts_search", "posts").column(text("title")),
    ]);
    let changes = diff(&s, &s);
    assert!(changes.is_empty());
    assert!(plan(&changes).unwrap().is_empty());
    assert_eq!(migrate(&s, &s).unwrap(), "");
}

#[test]
fn test_add_column() {
    let before = schema(vec![users(vec![])]);
    let after = schema(vec![users(vec![text("name").not_null()])]);
    assert_eq!(
        migrate(&before, &after).unwrap(),
        "alter table users add column name text not null;"
    );
}

#[test]
fn test_drop_column() {
    let before = schema(vec![users(vec![text("name")])]);
    let after = schema(vec![users(vec![])]);
    assert_eq!(
        migrate(&before, &after).unwrap(),
        "alter table users drop column name;"
    );
}

#[test]
fn test_rename_column() {
    let before = schema(vec![users(vec![text("name")])]);
    let after = schema(vec![users(vec![text("displayName")])]);
    assert_eq!(
        migrate(&before, &after).unwrap(),
        "alter table users rename column name to displayName;"
    );
}

#[test]
fn test_unique_index_added_and_removed() {
    let before = schema(vec![users(vec![text("name")])]);
    let after = schema(vec![users(vec![text("name").unique()])]);
    assert_eq!(
        migrate(&before, &after).unwrap(),
        "create unique index users_unique_name on users(name);"
    );
    assert_eq!(
        migrate(&after, &before).unwrap(),
        "drop index users_unique_name;"
    );
}

#[test]
fn test_nullability_change_rebuilds_table() {
    let before = schema(vec![users(vec![text("name")])]);
    let after = schema(vec![users(vec![text("name").not_null()])]);
    assert_eq!(
        migrate(&before, &after).unwrap(),
        "create table temp_users (id integer primary key, name text not null);\n\
         insert into temp_users (id, name) select id, name from users;\n\
         drop table users;\n\
         alter table temp_users rename to users;\n\
         pragma foreign_key_check;"
    );
}

#[test]
fn test_default_change_rebuilds_table() {
    let before = schema(vec![users(vec![text("role").default("member")])]);
    let after = schema(vec![users(vec![text("role").default("guest")])]);
    let ops = plan(&diff(&before, &after)).unwrap();
    assert_eq!(ops.len(), 1);
    assert!(matches!(
        &ops[0],
        MigrationOperation::RebuildTable { temp_name, copy, .. }
            if temp_name == "temp_users" && copy.len() == 2
    ));
}

#[test]
fn test_removing_dependent_tables_together() {
    let before = schema(vec![
        users(vec![]),
        posts(integer("author_id").references("users")),
    ]);
    let after = Schema::empty();
    assert_eq!(
        migrate(&before, &after).unwrap(),
        "drop table posts;\ndrop table users;"
    );
}

#[test]
fn test_removing_referenced_table_fails() {
    let before = schema(vec![
        users(vec![]),
        posts(integer("author_id").references("users")),
    ]);

    // A surviving table still referencing `users` cannot be declared...
    let err = parse(&[posts(integer("author_id").references("users"))]).unwrap_err();
    assert!(matches!(err, SchemaError::UnknownTable { ref table, .. } if table == "users"));

    // ...and a snapshot assembled without validation is refused by the planner.
    let orphan = before.table("posts").unwrap().clone();
    let after = Schema::from_tables(vec![orphan]).unwrap();
    let err = plan(&diff(&before, &after)).unwrap_err();
    assert_eq!(
        err,
        Error::Dependency {
            table: "users".to_string(),
            referenced_by: "posts".to_string(),
        }
    );
}

#[test]
fn test_cascade_shorthand_matches_explicit_reference() {
    let shorthand = schema(vec![
        users(vec![]),
        posts(integer("author_id").cascade("users")),
    ]);
    let explicit = schema(vec![
        users(vec![]),
        posts(
            integer("author_id")
                .references("users")
                .on_delete(ForeignKeyAction::Cascade),
        ),
    ]);

    let a = shorthand.table("posts").unwrap();
    let b = explicit.table("posts").unwrap();
    assert_eq!(a.foreign_keys, b.foreign_keys);
    assert_eq!(a.indexes, b.indexes);
    assert_eq!(a.indexes[0].name, "posts_index_author_id");
    assert!(diff(&shorthand, &explicit).is_empty());
}

#[test]
fn test_describe_nullable_reference_and_literal_default() {
    let s = schema(vec![
        users(vec![]),
        TableDescriptor::new("posts")
            .column(integer("id").primary_key())
            .column(integer("author_id").references("users"))
            .column(text("status").default("draft")),
    ]);
    let description = s.describe();
    let posts = description.tables.iter().find(|t| t.name == "posts").unwrap();

    assert!(!posts.columns[1].not_null);
    assert_eq!(
        posts.columns[1].references.as_ref().map(|r| r.table.as_str()),
        Some("users")
    );
    assert_eq!(posts.columns[2].default.as_deref(), Some("'draft'"));
}

#[test]
fn test_new_tables_created_in_dependency_order() {
    let before = Schema::empty();
    let after = schema(vec![
        posts(integer("author_id").not_null().references("users")),
        users(vec![]),
    ]);
    assert_eq!(
        migrate(&before, &after).unwrap(),
        "create table users (id integer primary key);\n\
         create table posts (id integer primary key, author_id integer not null references users(id), title text not null);\n\
         create index posts_index_author_id on posts(author_id);"
    );
}

#[test]
fn test_populated_table_refuses_required_column() {
    let before = schema(vec![users(vec![])]);
    let after = schema(vec![users(vec![text("name").not_null()])]);
    let changes = diff(&before, &after);

    let planner = Planner::with_options(PlanOptions::new().populated(["users"]));
    assert!(matches!(
        planner.plan(&changes),
        Err(Error::Migration { ref table, .. }) if table == "users"
    ));

    let after = schema(vec![users(vec![text("name").not_null().default("")])]);
    assert_eq!(
        planner.plan(&diff(&before, &after)).unwrap().len(),
        1
    );
}

#[test]
fn test_rebuilding_content_table_restores_full_text_sync() {
    let search = TableDescriptor::content_fts("posts_search", "posts").column(text("title"));
    let before = schema(vec![
        users(vec![]),
        posts(integer("author_id").references("users")),
        search.clone(),
    ]);
    let after = schema(vec![
        users(vec![]),
        posts(integer("author_id").not_null().references("users")),
        search,
    ]);

    let ops = plan(&diff(&before, &after)).unwrap();
    let descriptions: Vec<String> = ops.iter().map(MigrationOperation::description).collect();
    assert_eq!(
        descriptions,
        vec![
            "Rebuild table 'posts' copying 3 column(s)",
            "Restore full-text sync for 'posts_search'",
        ]
    );

    let script = SqliteDialect::new().render(&ops);
    assert!(script.contains("create trigger posts_search_ai after insert on posts begin"));
    assert!(script.ends_with("insert into posts_search(posts_search) values ('rebuild');"));
}
