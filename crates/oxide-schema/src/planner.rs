//! Migration planner.
//!
//! Turns a [`ChangeSet`] into an ordered list of [`MigrationOperation`]s.
//! Tables are created in foreign-key dependency order and dropped in the
//! reverse order. A changed table is migrated with direct `ALTER TABLE`
//! statements when SQLite supports every change natively, and rebuilt
//! through a temporary copy otherwise.
//!
//! The planner fails closed: every [`Error`] is raised before the first
//! operation is returned.

use std::collections::BTreeSet;

use tracing::debug;

use crate::diff::{ChangeSet, ColumnChange, TableChanges};
use crate::error::{Error, Result};
use crate::operations::{ColumnCopy, MigrationOperation};
use crate::schema::{Column, DefaultValue, Literal, Schema, Table, TableKind};

/// Facts about the target database the planner cannot know on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Tables that currently hold at least one row.
    pub populated_tables: BTreeSet<String>,
    /// Whether dropping populated tables or not-null columns is acknowledged.
    pub allow_data_loss: bool,
}

impl PlanOptions {
    /// Creates default options: every table empty, data loss refused.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks tables as holding rows.
    #[must_use]
    pub fn populated<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.populated_tables
            .extend(tables.into_iter().map(Into::into));
        self
    }

    /// Acknowledges (or refuses) data loss.
    #[must_use]
    pub fn allow_data_loss(mut self, allow: bool) -> Self {
        self.allow_data_loss = allow;
        self
    }

    fn is_populated(&self, table: &str) -> bool {
        self.populated_tables.contains(table)
    }
}

/// Plans migrations for change sets.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    options: PlanOptions,
}

/// Plans a change set with default options.
///
/// # Errors
///
/// See [`Planner::plan`].
pub fn plan(changes: &ChangeSet<'_>) -> Result<Vec<MigrationOperation>> {
    Planner::new().plan(changes)
}

/// How a table present in both snapshots is migrated.
enum Strategy {
    /// Direct ALTER statements.
    Direct,
    /// Temp-table copy and swap.
    Rebuild,
    /// Dropped and created again; used whenever a full-text table is on
    /// either side.
    Recreate,
}

impl Planner {
    /// Creates a planner with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a planner with the given options.
    #[must_use]
    pub fn with_options(options: PlanOptions) -> Self {
        Self { options }
    }

    /// Orders a change set into migration operations.
    ///
    /// # Errors
    ///
    /// - [`Error::Dependency`] when a table in the current snapshot
    ///   references a table that does not exist after the migration.
    /// - [`Error::CyclicSchema`] when created tables reference each other
    ///   through not-null foreign keys only.
    /// - [`Error::Migration`] when an operation would lose data the options
    ///   do not allow losing.
    pub fn plan(&self, changes: &ChangeSet<'_>) -> Result<Vec<MigrationOperation>> {
        check_dependencies(changes.current)?;

        let strategies: Vec<(&TableChanges<'_>, Strategy)> = changes
            .tables_changed
            .iter()
            .map(|tc| (tc, strategy(tc)))
            .collect();

        self.check_data_loss(changes, &strategies)?;

        let recreated: Vec<&TableChanges<'_>> = strategies
            .iter()
            .filter(|(_, s)| matches!(s, Strategy::Recreate))
            .map(|(tc, _)| *tc)
            .collect();

        let mut ops = Vec::new();

        // 1. Full-text tables go first: nothing depends on them.
        for table in changes.tables_removed.iter().filter(|t| t.is_full_text()) {
            ops.push(MigrationOperation::DropTable((*table).clone()));
        }
        for tc in recreated.iter().filter(|tc| tc.previous.is_full_text()) {
            ops.push(MigrationOperation::DropTable(tc.previous.clone()));
        }

        // 2. Removed indexes of tables altered in place or rebuilt. A name
        //    freed here may be reused by any table created or changed later.
        for (tc, strategy) in &strategies {
            if !matches!(strategy, Strategy::Recreate) {
                for index in &tc.indexes_removed {
                    ops.push(MigrationOperation::DropIndex((*index).clone()));
                }
            }
        }

        // 3. Plain tables, referencing tables before referenced ones.
        let dropped: Vec<&Table> = changes
            .tables_removed
            .iter()
            .copied()
            .filter(|t| !t.is_full_text())
            .chain(
                recreated
                    .iter()
                    .filter(|tc| !tc.previous.is_full_text())
                    .map(|tc| tc.previous),
            )
            .collect();
        let mut drop_order = dependency_order(dropped, true)?;
        drop_order.reverse();
        for table in drop_order {
            ops.push(MigrationOperation::DropTable(table.clone()));
        }

        // 4. New plain tables in dependency order, each with its indexes.
        let created: Vec<&Table> = changes
            .tables_added
            .iter()
            .copied()
            .filter(|t| !t.is_full_text())
            .chain(
                recreated
                    .iter()
                    .filter(|tc| !tc.current.is_full_text())
                    .map(|tc| tc.current),
            )
            .collect();
        for table in dependency_order(created, false)? {
            ops.push(MigrationOperation::CreateTable(table.clone()));
            for index in &table.indexes {
                ops.push(MigrationOperation::CreateIndex(index.clone()));
            }
        }

        // 5. Tables present on both sides, referenced tables first. A rebuild
        //    checks foreign keys, so the tables it references must already
        //    have their final shape.
        let changed: Vec<&Table> = strategies
            .iter()
            .filter(|(_, s)| !matches!(s, Strategy::Recreate))
            .map(|(tc, _)| tc.current)
            .collect();
        let mut rebuilt = BTreeSet::new();
        for table in dependency_order(changed, true)? {
            let Some((tc, strategy)) = strategies.iter().find(|(tc, _)| tc.name() == table.name)
            else {
                continue;
            };
            match strategy {
                Strategy::Direct => plan_direct(tc, &mut ops),
                Strategy::Rebuild => {
                    ops.push(rebuild(tc, changes));
                    rebuilt.insert(tc.name());
                }
                Strategy::Recreate => {}
            }
        }

        // 6. New full-text tables, after the content they mirror.
        let mut created_fts = BTreeSet::new();
        let fts = changes
            .tables_added
            .iter()
            .copied()
            .filter(|t| t.is_full_text())
            .chain(
                recreated
                    .iter()
                    .filter(|tc| tc.current.is_full_text())
                    .map(|tc| tc.current),
            );
        for table in fts {
            created_fts.insert(table.name.as_str());
            ops.push(MigrationOperation::CreateTable(table.clone()));
        }

        // 7. Dropping a content table drops the triggers defined on it.
        for content in &rebuilt {
            for table in changes.current.full_text_tables_of(content) {
                if !created_fts.contains(table.name.as_str()) {
                    debug!(table = %table.name, content = %content, "Restoring full-text sync");
                    ops.push(MigrationOperation::RestoreFullTextSync {
                        table: table.clone(),
                    });
                }
            }
        }

        debug!(operations = ops.len(), "Planned migration");
        Ok(ops)
    }

    fn check_data_loss(
        &self,
        changes: &ChangeSet<'_>,
        strategies: &[(&TableChanges<'_>, Strategy)],
    ) -> Result<()> {
        let holds_data = |table: &Table| {
            self.options.is_populated(&table.name)
                && !matches!(table.kind, TableKind::ContentFts { .. })
        };

        let dropped = changes.tables_removed.iter().copied().chain(
            strategies
                .iter()
                .filter(|(_, s)| matches!(s, Strategy::Recreate))
                .map(|(tc, _)| tc.previous),
        );
        for table in dropped {
            if holds_data(table) && !self.options.allow_data_loss {
                return Err(Error::Migration {
                    table: table.name.clone(),
                    reason: "the table holds rows and would be dropped".to_string(),
                });
            }
        }

        for (tc, strategy) in strategies {
            if matches!(strategy, Strategy::Recreate) || !self.options.is_populated(tc.name()) {
                continue;
            }
            for change in &tc.columns {
                match change {
                    ColumnChange::Added(column) if column.requires_value() => {
                        return Err(Error::Migration {
                            table: tc.name().to_string(),
                            reason: format!(
                                "column '{}' is not null and has no default",
                                column.name
                            ),
                        });
                    }
                    ColumnChange::Removed(column)
                        if !column.nullable && !self.options.allow_data_loss =>
                    {
                        return Err(Error::Migration {
                            table: tc.name().to_string(),
                            reason: format!(
                                "dropping not-null column '{}' discards its values",
                                column.name
                            ),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

// ================================================================
// Dependency checks and ordering
// ================================================================

/// Every foreign key target and content table named by the current snapshot
/// must exist in it.
fn check_dependencies(current: &Schema) -> Result<()> {
    for table in current.tables() {
        for dependency in table.dependencies() {
            if !current.contains(dependency) {
                return Err(Error::Dependency {
                    table: dependency.to_string(),
                    referenced_by: table.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Topologically sorts `tables` so that referenced tables come first.
///
/// Only edges between members of `tables` count; self-references are
/// ignored. Ties keep declaration order. When the remaining tables form a
/// cycle, nullable edges are ignored until one table can be placed. If that
/// is not enough, `break_any` places the first remaining table anyway;
/// otherwise the cycle is an error.
fn dependency_order(tables: Vec<&Table>, break_any: bool) -> Result<Vec<&Table>> {
    let members: BTreeSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    let mut remaining = tables;
    let mut placed: BTreeSet<&str> = BTreeSet::new();
    let mut order = Vec::with_capacity(remaining.len());
    let mut relaxed = false;

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|table| {
            table.foreign_keys.iter().all(|fk| {
                fk.target_table == table.name
                    || !members.contains(fk.target_table.as_str())
                    || placed.contains(fk.target_table.as_str())
                    || (relaxed && fk.nullable)
            })
        });

        match ready {
            Some(position) => {
                let table = remaining.remove(position);
                placed.insert(table.name.as_str());
                order.push(table);
                relaxed = false;
            }
            None if !relaxed => {
                debug!("Breaking foreign key cycle through nullable references");
                relaxed = true;
            }
            None if break_any => {
                let table = remaining.remove(0);
                debug!(table = %table.name, "Breaking foreign key cycle");
                placed.insert(table.name.as_str());
                order.push(table);
                relaxed = false;
            }
            None => {
                return Err(Error::CyclicSchema {
                    tables: cycle_members(&remaining),
                });
            }
        }
    }
    Ok(order)
}

/// Trims tables that merely depend on a cycle, leaving its members.
fn cycle_members(remaining: &[&Table]) -> Vec<String> {
    let mut members: Vec<&Table> = remaining.to_vec();
    loop {
        let referenced: BTreeSet<&str> = members
            .iter()
            .flat_map(|t| {
                t.foreign_keys
                    .iter()
                    .filter(move |fk| fk.target_table != t.name)
                    .map(|fk| fk.target_table.as_str())
            })
            .collect();
        let before = members.len();
        members.retain(|t| referenced.contains(t.name.as_str()));
        if members.len() == before {
            break;
        }
    }
    members.iter().map(|t| t.name.clone()).collect()
}

// ================================================================
// Changed tables
// ================================================================

fn strategy(tc: &TableChanges<'_>) -> Strategy {
    if tc.previous.is_full_text() || tc.current.is_full_text() {
        debug!(table = %tc.name(), "Recreating full-text table");
        return Strategy::Recreate;
    }
    if let Some(reason) = rebuild_reason(tc) {
        debug!(table = %tc.name(), %reason, "Rebuilding table");
        return Strategy::Rebuild;
    }
    Strategy::Direct
}

/// Returns why SQLite cannot apply the changes in place, if it cannot.
fn rebuild_reason(tc: &TableChanges<'_>) -> Option<String> {
    if let Some(delta) = tc.table_deltas.first() {
        return Some(format!("table-level change {delta:?}"));
    }
    tc.columns.iter().find_map(|change| match change {
        ColumnChange::Altered { current, deltas, .. } => {
            Some(format!("column '{}' changed {deltas:?}", current.name))
        }
        ColumnChange::Renamed { to, deltas, .. } if !deltas.is_empty() => {
            Some(format!("renamed column '{}' changed {deltas:?}", to.name))
        }
        ColumnChange::Added(column) if !can_add_column(column) => {
            Some(format!("column '{}' cannot be added in place", column.name))
        }
        ColumnChange::Removed(column) if !can_drop_column(tc.previous, column) => {
            Some(format!("column '{}' cannot be dropped in place", column.name))
        }
        _ => None,
    })
}

/// Mirrors the restrictions of `ALTER TABLE ... ADD COLUMN`.
fn can_add_column(column: &Column) -> bool {
    let non_null_default = column
        .default
        .as_ref()
        .is_some_and(|d| *d != DefaultValue::Literal(Literal::Null));

    !column.primary_key
        && !column.autoincrement
        && !column.default.as_ref().is_some_and(DefaultValue::is_expression)
        && !column.generated.as_ref().is_some_and(|g| g.stored)
        && !(column.reference.is_some() && non_null_default)
}

/// Mirrors the restrictions of `ALTER TABLE ... DROP COLUMN`. Indexes on the
/// column are dropped beforehand.
fn can_drop_column(table: &Table, column: &Column) -> bool {
    !column.primary_key && column.reference.is_none() && !table.constrains_column(&column.name)
}

fn plan_direct(tc: &TableChanges<'_>, ops: &mut Vec<MigrationOperation>) {
    let table = tc.name();
    for change in &tc.columns {
        match change {
            ColumnChange::Removed(column) => {
                ops.push(MigrationOperation::drop_column(table, &column.name));
            }
            ColumnChange::Renamed { from, to, .. } => {
                ops.push(MigrationOperation::rename_column(table, &from.name, &to.name));
            }
            ColumnChange::Added(column) => {
                ops.push(MigrationOperation::add_column(table, (*column).clone()));
            }
            ColumnChange::Altered { .. } => {}
        }
    }
    for index in &tc.indexes_added {
        ops.push(MigrationOperation::CreateIndex((*index).clone()));
    }
}

fn rebuild(tc: &TableChanges<'_>, changes: &ChangeSet<'_>) -> MigrationOperation {
    let renames: Vec<(&str, &str)> = tc.renames().collect();
    let copy = tc
        .current
        .columns
        .iter()
        .filter(|column| column.generated.is_none())
        .filter_map(|column| {
            let from = renames
                .iter()
                .find(|(_, to)| *to == column.name)
                .map_or(column.name.as_str(), |(from, _)| *from);
            tc.previous.column(from).map(|_| ColumnCopy {
                from: from.to_string(),
                to: column.name.clone(),
            })
        })
        .collect();

    MigrationOperation::RebuildTable {
        table: tc.current.clone(),
        temp_name: temp_name(tc.name(), changes),
        copy,
    }
}

/// `temp_{table}`, suffixed until it names no table in either snapshot.
fn temp_name(table: &str, changes: &ChangeSet<'_>) -> String {
    let taken = |name: &str| changes.previous.contains(name) || changes.current.contains(name);
    let base = format!("temp_{table}");
    if !taken(&base) {
        return base;
    }
    let mut n = 1;
    loop {
        let name = format!("{base}_{n}");
        if !taken(&name) {
            return name;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{integer, text, ColumnDescriptor, IndexDescriptor, TableDescriptor};
    use crate::diff::diff;
    use crate::parser::parse;
    use crate::schema::ForeignKeyAction;

    fn users(columns: Vec<ColumnDescriptor>) -> TableDescriptor {
        let mut table = TableDescriptor::new("users").column(integer("id").primary_key());
        for column in columns {
            table = table.column(column);
        }
        table
    }

    fn posts() -> TableDescriptor {
        TableDescriptor::new("posts")
            .column(integer("id").primary_key())
            .column(integer("author_id").not_null().references("users"))
    }

    fn plan_between(
        previous: &[TableDescriptor],
        current: &[TableDescriptor],
        options: PlanOptions,
    ) -> Result<Vec<MigrationOperation>> {
        let previous = parse(previous).unwrap();
        let current = parse(current).unwrap();
        Planner::with_options(options).plan(&diff(&previous, &current))
    }

    fn descriptions(ops: &[MigrationOperation]) -> Vec<String> {
        ops.iter().map(MigrationOperation::description).collect()
    }

    #[test]
    fn test_no_changes_no_operations() {
        let schema = [users(vec![text("name")]), posts()];
        let ops = plan_between(&schema, &schema, PlanOptions::new()).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_direct_add_drop_rename() {
        let ops = plan_between(
            &[users(vec![text("a"), text("old")])],
            &[users(vec![text("a"), text("new"), integer("age")])],
            PlanOptions::new(),
        )
        .unwrap();
        assert_eq!(
            descriptions(&ops),
            vec![
                "Rename column 'old' to 'new' in table 'users'",
                "Add column 'age' to table 'users'",
            ]
        );

        let ops = plan_between(
            &[users(vec![text("a"), integer("b")])],
            &[users(vec![text("a")])],
            PlanOptions::new(),
        )
        .unwrap();
        assert_eq!(descriptions(&ops), vec!["Drop column 'b' from table 'users'"]);
    }

    #[test]
    fn test_nullability_change_rebuilds() {
        let ops = plan_between(
            &[users(vec![text("name").not_null()])],
            &[users(vec![text("name")])],
            PlanOptions::new(),
        )
        .unwrap();
        match ops.as_slice() {
            [MigrationOperation::RebuildTable { temp_name, copy, .. }] => {
                assert_eq!(temp_name, "temp_users");
                assert_eq!(copy, &vec![ColumnCopy::same("id"), ColumnCopy::same("name")]);
            }
            other => panic!("expected a rebuild, got {other:?}"),
        }
    }

    #[test]
    fn test_rebuild_copies_renamed_column_from_old_name() {
        let ops = plan_between(
            &[users(vec![text("name").not_null()])],
            &[users(vec![text("title")])],
            PlanOptions::new(),
        )
        .unwrap();
        match ops.as_slice() {
            [MigrationOperation::RebuildTable { copy, .. }] => {
                assert_eq!(
                    copy[1],
                    ColumnCopy {
                        from: "name".to_string(),
                        to: "title".to_string()
                    }
                );
            }
            other => panic!("expected a rebuild, got {other:?}"),
        }
    }

    #[test]
    fn test_dropping_referenced_column_rebuilds() {
        let ops = plan_between(
            &[users(vec![]), posts()],
            &[
                users(vec![]),
                TableDescriptor::new("posts").column(integer("id").primary_key()),
            ],
            PlanOptions::new(),
        )
        .unwrap();
        assert_eq!(
            descriptions(&ops),
            vec![
                "Drop index 'posts_index_author_id'",
                "Rebuild table 'posts' copying 1 column(s)",
            ]
        );
    }

    #[test]
    fn test_create_order_follows_foreign_keys() {
        let ops = plan_between(&[], &[posts(), users(vec![])], PlanOptions::new()).unwrap();
        assert_eq!(
            descriptions(&ops),
            vec![
                "Create table 'users'",
                "Create table 'posts'",
                "Create index 'posts_index_author_id' on table 'posts'",
            ]
        );
    }

    #[test]
    fn test_drop_order_is_reversed() {
        let ops = plan_between(&[users(vec![]), posts()], &[], PlanOptions::new()).unwrap();
        assert_eq!(
            descriptions(&ops),
            vec!["Drop table 'posts'", "Drop table 'users'"]
        );
    }

    #[test]
    fn test_dropping_referenced_table_fails() {
        let previous = parse(&[users(vec![]), posts()]).unwrap();
        let posts_table = previous.table("posts").unwrap().clone();
        let current = Schema::from_tables(vec![posts_table]).unwrap();

        let err = plan(&diff(&previous, &current)).unwrap_err();
        assert_eq!(
            err,
            Error::Dependency {
                table: "users".to_string(),
                referenced_by: "posts".to_string(),
            }
        );
    }

    #[test]
    fn test_non_nullable_cycle_fails() {
        let a = TableDescriptor::new("a")
            .column(integer("id").primary_key())
            .column(integer("b_id").not_null().references("b"));
        let b = TableDescriptor::new("b")
            .column(integer("id").primary_key())
            .column(integer("a_id").not_null().references("a"));
        let c = TableDescriptor::new("c")
            .column(integer("id").primary_key())
            .column(integer("a_id").not_null().references("a"));

        let err = plan_between(&[], &[a, b, c], PlanOptions::new()).unwrap_err();
        assert_eq!(
            err,
            Error::CyclicSchema {
                tables: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn test_nullable_cycle_is_broken() {
        let a = TableDescriptor::new("a")
            .column(integer("id").primary_key())
            .column(integer("b_id").references("b"));
        let b = TableDescriptor::new("b")
            .column(integer("id").primary_key())
            .column(integer("a_id").not_null().references("a"));

        let ops = plan_between(&[], &[b, a], PlanOptions::new()).unwrap();
        let created: Vec<&str> = ops
            .iter()
            .filter_map(|op| match op {
                MigrationOperation::CreateTable(t) => Some(t.name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(created, vec!["a", "b"]);
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let employees = TableDescriptor::new("employees")
            .column(integer("id").primary_key())
            .column(integer("manager_id").not_null().references("employees"));
        assert!(plan_between(&[], &[employees], PlanOptions::new()).is_ok());
    }

    #[test]
    fn test_populated_table_refuses_not_null_add() {
        let err = plan_between(
            &[users(vec![])],
            &[users(vec![text("name").not_null()])],
            PlanOptions::new().populated(["users"]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Migration { table, .. } if table == "users"));

        let ok = plan_between(
            &[users(vec![])],
            &[users(vec![text("name").not_null().default("")])],
            PlanOptions::new().populated(["users"]),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_populated_not_null_drop_needs_acknowledgement() {
        let previous = [users(vec![text("name").not_null()])];
        let current = [users(vec![])];
        let options = PlanOptions::new().populated(["users"]);

        let err = plan_between(&previous, &current, options.clone()).unwrap_err();
        assert!(matches!(err, Error::Migration { .. }));
        assert!(plan_between(&previous, &current, options.allow_data_loss(true)).is_ok());
    }

    #[test]
    fn test_populated_table_drop_needs_acknowledgement() {
        let options = PlanOptions::new().populated(["users"]);
        let err = plan_between(&[users(vec![])], &[], options.clone()).unwrap_err();
        assert!(matches!(err, Error::Migration { .. }));
        assert!(plan_between(&[users(vec![])], &[], options.allow_data_loss(true)).is_ok());
    }

    #[test]
    fn test_action_change_rebuilds() {
        let current_posts = TableDescriptor::new("posts")
            .column(integer("id").primary_key())
            .column(
                integer("author_id")
                    .not_null()
                    .references("users")
                    .on_delete(ForeignKeyAction::Cascade),
            );
        let ops = plan_between(
            &[users(vec![]), posts()],
            &[users(vec![]), current_posts],
            PlanOptions::new(),
        )
        .unwrap();
        assert!(matches!(
            ops.as_slice(),
            [MigrationOperation::RebuildTable { table, .. }] if table.name == "posts"
        ));
    }

    #[test]
    fn test_rebuilt_content_table_restores_full_text_sync() {
        let search = TableDescriptor::content_fts("users_search", "users").column(text("name"));
        let ops = plan_between(
            &[users(vec![text("name").not_null()]), search.clone()],
            &[users(vec![text("name")]), search],
            PlanOptions::new(),
        )
        .unwrap();
        assert_eq!(
            descriptions(&ops),
            vec![
                "Rebuild table 'users' copying 2 column(s)",
                "Restore full-text sync for 'users_search'",
            ]
        );
    }

    #[test]
    fn test_changed_full_text_table_is_recreated_last() {
        let previous = [
            users(vec![text("name"), text("bio")]),
            TableDescriptor::content_fts("users_search", "users").column(text("name")),
        ];
        let current = [
            users(vec![text("name"), text("bio")]),
            TableDescriptor::content_fts("users_search", "users")
                .column(text("name"))
                .column(text("bio")),
        ];
        let ops = plan_between(&previous, &current, PlanOptions::new()).unwrap();
        assert_eq!(
            descriptions(&ops),
            vec!["Drop table 'users_search'", "Create table 'users_search'"]
        );
    }

    #[test]
    fn test_referenced_table_changes_before_referencing_rebuild() {
        let previous = [
            TableDescriptor::new("posts")
                .column(integer("id").primary_key())
                .column(integer("author_id").references("users")),
            TableDescriptor::new("users").column(integer("id").primary_key()),
        ];
        let current = [
            TableDescriptor::new("posts")
                .column(integer("id").primary_key())
                .column(integer("author_id").references("users")),
            TableDescriptor::new("users").column(integer("uid").primary_key()),
        ];
        let ops = plan_between(&previous, &current, PlanOptions::new()).unwrap();
        assert_eq!(
            descriptions(&ops),
            vec![
                "Rename column 'id' to 'uid' in table 'users'",
                "Rebuild table 'posts' copying 2 column(s)",
            ]
        );
    }

    #[test]
    fn test_rebuilt_table_drops_removed_index_first() {
        let previous = [
            TableDescriptor::new("b")
                .column(integer("id").primary_key())
                .column(integer("x")),
            TableDescriptor::new("a")
                .column(integer("id").primary_key())
                .column(integer("x").not_null())
                .index(IndexDescriptor::on(["x"]).named("idx_x")),
        ];
        let current = [
            TableDescriptor::new("b")
                .column(integer("id").primary_key())
                .column(integer("x"))
                .index(IndexDescriptor::on(["x"]).named("idx_x")),
            TableDescriptor::new("a")
                .column(integer("id").primary_key())
                .column(integer("x")),
        ];
        let ops = plan_between(&previous, &current, PlanOptions::new()).unwrap();
        assert_eq!(
            descriptions(&ops),
            vec![
                "Drop index 'idx_x'",
                "Create index 'idx_x' on table 'b'",
                "Rebuild table 'a' copying 2 column(s)",
            ]
        );
    }

    #[test]
    fn test_temp_name_avoids_existing_tables() {
        let temp = TableDescriptor::new("temp_users").column(integer("id"));
        let ops = plan_between(
            &[users(vec![text("name").not_null()]), temp.clone()],
            &[users(vec![text("name")]), temp],
            PlanOptions::new(),
        )
        .unwrap();
        assert!(matches!(
            ops.as_slice(),
            [MigrationOperation::RebuildTable { temp_name, .. }] if temp_name == "temp_users_1"
        ));
    }
}
