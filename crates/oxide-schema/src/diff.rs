//! Schema differ.
//!
//! Compares two schema snapshots table by table and column by column and
//! classifies every difference. The result is a [`ChangeSet`] borrowing both
//! snapshots; ordering the changes into operations is the planner's job.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::schema::{Column, ForeignKey, Index, Schema, Table};

// ================================================================
// Change set types
// ================================================================

/// Attribute of a column that differs between two snapshots.
///
/// Uniqueness is not listed: it is expressed as a generated index and shows
/// up as an index change instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnDelta {
    /// Declared type changed.
    Type,
    /// Nullability changed.
    Nullable,
    /// Default value changed.
    Default,
    /// Check expression changed.
    Check,
    /// Primary key flag changed.
    PrimaryKey,
    /// Auto-increment flag changed.
    Autoincrement,
    /// Reference target or actions changed.
    Reference,
    /// Computed column expression or storage changed.
    Generated,
    /// Full-text unindexed flag changed.
    Unindexed,
}

/// Table-level attribute that differs between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TableDelta {
    /// Composite primary key changed.
    PrimaryKey,
    /// Table-level foreign keys changed.
    ForeignKeys,
    /// Table-level checks changed.
    Checks,
    /// Table kind or full-text options changed.
    Kind,
}

/// A classified column difference.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnChange<'a> {
    /// Column only in the current snapshot.
    Added(&'a Column),
    /// Column only in the previous snapshot.
    Removed(&'a Column),
    /// Column renamed, possibly with other attribute changes.
    Renamed {
        /// Column in the previous snapshot.
        from: &'a Column,
        /// Column in the current snapshot.
        to: &'a Column,
        /// Attributes that changed besides the name.
        deltas: Vec<ColumnDelta>,
    },
    /// Column kept its name but changed in a way SQLite cannot alter.
    Altered {
        /// Column in the previous snapshot.
        previous: &'a Column,
        /// Column in the current snapshot.
        current: &'a Column,
        /// Attributes that changed.
        deltas: Vec<ColumnDelta>,
    },
}

/// Differences within a table present in both snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct TableChanges<'a> {
    /// Table in the previous snapshot.
    pub previous: &'a Table,
    /// Table in the current snapshot.
    pub current: &'a Table,
    /// Column changes, removals first, then renames and alterations, then
    /// additions in declaration order.
    pub columns: Vec<ColumnChange<'a>>,
    /// Indexes to create.
    pub indexes_added: Vec<&'a Index>,
    /// Indexes to drop.
    pub indexes_removed: Vec<&'a Index>,
    /// Table-level differences.
    pub table_deltas: Vec<TableDelta>,
}

impl<'a> TableChanges<'a> {
    /// Returns the table name (identical in both snapshots).
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.current.name
    }

    /// Returns true when nothing differs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
            && self.indexes_added.is_empty()
            && self.indexes_removed.is_empty()
            && self.table_deltas.is_empty()
    }

    /// Returns `(from, to)` for every renamed column.
    pub fn renames(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.columns.iter().filter_map(|change| match change {
            ColumnChange::Renamed { from, to, .. } => Some((from.name.as_str(), to.name.as_str())),
            _ => None,
        })
    }
}

/// Unordered classification of the differences between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet<'a> {
    /// The previous snapshot.
    pub previous: &'a Schema,
    /// The current snapshot.
    pub current: &'a Schema,
    /// Tables only in the current snapshot, in declaration order.
    pub tables_added: Vec<&'a Table>,
    /// Tables only in the previous snapshot, in declaration order.
    pub tables_removed: Vec<&'a Table>,
    /// Tables in both snapshots that differ, in current declaration order.
    pub tables_changed: Vec<TableChanges<'a>>,
}

impl ChangeSet<'_> {
    /// Returns true when the snapshots are equivalent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables_added.is_empty()
            && self.tables_removed.is_empty()
            && self.tables_changed.is_empty()
    }
}

// ================================================================
// Schema-level diff
// ================================================================

/// Compares two snapshots.
#[must_use]
pub fn diff<'a>(previous: &'a Schema, current: &'a Schema) -> ChangeSet<'a> {
    let tables_added = current
        .tables()
        .iter()
        .filter(|t| !previous.contains(&t.name))
        .collect();
    let tables_removed = previous
        .tables()
        .iter()
        .filter(|t| !current.contains(&t.name))
        .collect();
    let tables_changed = current
        .tables()
        .iter()
        .filter_map(|table| {
            let old = previous.table(&table.name)?;
            let changes = diff_table(old, table);
            (!changes.is_empty()).then_some(changes)
        })
        .collect();

    ChangeSet {
        previous,
        current,
        tables_added,
        tables_removed,
        tables_changed,
    }
}

// ================================================================
// Table-level diff
// ================================================================

fn diff_table<'a>(old: &'a Table, new: &'a Table) -> TableChanges<'a> {
    let old_names: BTreeSet<&str> = old.columns.iter().map(|c| c.name.as_str()).collect();
    let new_names: BTreeSet<&str> = new.columns.iter().map(|c| c.name.as_str()).collect();

    let dropped: Vec<&Column> = old
        .columns
        .iter()
        .filter(|c| !new_names.contains(c.name.as_str()))
        .collect();
    let added: Vec<&Column> = new
        .columns
        .iter()
        .filter(|c| !old_names.contains(c.name.as_str()))
        .collect();

    let renames = detect_renames(old, new, &dropped, &added);
    let renamed_from: BTreeSet<&str> = renames.keys().copied().collect();
    let renamed_to: BTreeSet<&str> = renames.values().copied().collect();

    let mut columns = Vec::new();

    for column in &dropped {
        if !renamed_from.contains(column.name.as_str()) {
            columns.push(ColumnChange::Removed(*column));
        }
    }

    for column in &new.columns {
        if let Some(previous) = old.column(&column.name) {
            let deltas = column_deltas(previous, column);
            if !deltas.is_empty() {
                columns.push(ColumnChange::Altered {
                    previous,
                    current: column,
                    deltas,
                });
            }
        } else if renamed_to.contains(column.name.as_str()) {
            let from = renames
                .iter()
                .find(|(_, to)| **to == column.name)
                .and_then(|(from, _)| old.column(from));
            if let Some(from) = from {
                columns.push(ColumnChange::Renamed {
                    from,
                    to: column,
                    deltas: column_deltas(from, column),
                });
            }
        }
    }

    for column in &added {
        if !renamed_to.contains(column.name.as_str()) {
            columns.push(ColumnChange::Added(*column));
        }
    }

    let (indexes_added, indexes_removed) = diff_indexes(old, new);
    let table_deltas = table_deltas(old, new, &renames);

    if columns.is_empty() {
        detect_column_order_change(old, new);
    }

    TableChanges {
        previous: old,
        current: new,
        columns,
        indexes_added,
        indexes_removed,
        table_deltas,
    }
}

/// Pairs unmatched columns into renames.
///
/// A previous column X and a current column Y of the same declared type
/// score 2 when they share an ordinal position and 1 otherwise. The pair is a
/// rename only if it is the strictly best match for X among the added
/// columns and for Y among the dropped ones; ties are left as drop plus add.
fn detect_renames<'a>(
    old: &'a Table,
    new: &'a Table,
    dropped: &[&'a Column],
    added: &[&'a Column],
) -> BTreeMap<&'a str, &'a str> {
    let score = |x: &Column, y: &Column| -> u8 {
        if x.column_type != y.column_type {
            0
        } else if old.position(&x.name) == new.position(&y.name) {
            2
        } else {
            1
        }
    };

    let mut renames = BTreeMap::new();
    for x in dropped {
        for y in added {
            let best = score(x, y);
            if best == 0 {
                continue;
            }
            let unique_for_x = added
                .iter()
                .filter(|other| other.name != y.name)
                .all(|other| score(x, other) < best);
            let unique_for_y = dropped
                .iter()
                .filter(|other| other.name != x.name)
                .all(|other| score(other, y) < best);
            if unique_for_x && unique_for_y {
                debug!(
                    table = %new.name,
                    from = %x.name,
                    to = %y.name,
                    "Detected column rename"
                );
                renames.insert(x.name.as_str(), y.name.as_str());
            }
        }
    }
    renames
}

fn column_deltas(old: &Column, new: &Column) -> Vec<ColumnDelta> {
    let checks = [
        (old.column_type != new.column_type, ColumnDelta::Type),
        (old.nullable != new.nullable, ColumnDelta::Nullable),
        (old.default != new.default, ColumnDelta::Default),
        (old.check != new.check, ColumnDelta::Check),
        (old.primary_key != new.primary_key, ColumnDelta::PrimaryKey),
        (old.autoincrement != new.autoincrement, ColumnDelta::Autoincrement),
        (old.reference != new.reference, ColumnDelta::Reference),
        (old.generated != new.generated, ColumnDelta::Generated),
        (old.unindexed != new.unindexed, ColumnDelta::Unindexed),
    ];
    checks
        .into_iter()
        .filter_map(|(changed, delta)| changed.then_some(delta))
        .collect()
}

// ================================================================
// Index and constraint diff
// ================================================================

/// Indexes are matched by name. A name present on both sides with a
/// different definition is dropped and re-created.
fn diff_indexes<'a>(old: &'a Table, new: &'a Table) -> (Vec<&'a Index>, Vec<&'a Index>) {
    let added = new
        .indexes
        .iter()
        .filter(|index| !old.indexes.contains(index))
        .collect();
    let removed = old
        .indexes
        .iter()
        .filter(|index| !new.indexes.contains(index))
        .collect();
    (added, removed)
}

/// Key used to compare foreign keys across a rename: the nullable flag
/// follows column nullability, which is already a column delta.
fn foreign_key_shape(fk: &ForeignKey, renames: &BTreeMap<&str, &str>) -> String {
    let columns: Vec<&str> = fk
        .columns
        .iter()
        .map(|c| renames.get(c.as_str()).copied().unwrap_or(c))
        .collect();
    format!(
        "({}) -> {}({}) {:?} {:?}",
        columns.join(","),
        fk.target_table,
        fk.target_columns.join(","),
        fk.on_delete,
        fk.on_update
    )
}

fn table_deltas(old: &Table, new: &Table, renames: &BTreeMap<&str, &str>) -> Vec<TableDelta> {
    let mut deltas = Vec::new();

    let old_key: Vec<&str> = old
        .primary_key
        .iter()
        .map(|c| renames.get(c.as_str()).copied().unwrap_or(c))
        .collect();
    if old_key != new.primary_key {
        deltas.push(TableDelta::PrimaryKey);
    }

    let old_fks: BTreeSet<String> = old
        .table_level_foreign_keys()
        .into_iter()
        .map(|fk| foreign_key_shape(fk, renames))
        .collect();
    let new_fks: BTreeSet<String> = new
        .table_level_foreign_keys()
        .into_iter()
        .map(|fk| foreign_key_shape(fk, &BTreeMap::new()))
        .collect();
    if old_fks != new_fks {
        deltas.push(TableDelta::ForeignKeys);
    }

    let old_checks: BTreeSet<&String> = old.checks.iter().collect();
    let new_checks: BTreeSet<&String> = new.checks.iter().collect();
    if old_checks != new_checks {
        deltas.push(TableDelta::Checks);
    }

    if old.kind != new.kind {
        deltas.push(TableDelta::Kind);
    }
    deltas
}

// ================================================================
// Column ordering
// ================================================================

/// Column order alone is not a change; it is only logged.
fn detect_column_order_change(old: &Table, new: &Table) {
    let old_order: Vec<&str> = old.columns.iter().map(|c| c.name.as_str()).collect();
    let new_order: Vec<&str> = new.columns.iter().map(|c| c.name.as_str()).collect();
    if old_order != new_order {
        debug!(
            table = %new.name,
            ?old_order,
            ?new_order,
            "Ignoring column reordering"
        );
    }
}
