//! Descriptor parser.
//!
//! Turns [`TableDescriptor`]s into an immutable [`Schema`]. Parsing runs in
//! two passes: the first folds every column's modifiers into named fields,
//! the second resolves references between tables (which needs every table's
//! primary key) and generates index names.

use std::collections::BTreeSet;

use tracing::debug;

use crate::descriptor::{
    CheckRule, ColumnDescriptor, ColumnModifier, ForeignKeyDescriptor, IndexDescriptor,
    TableDescriptor, TableKindDescriptor,
};
use crate::error::SchemaError;
use crate::expr::{
    normalize_whitespace, predicate_slug, quote_identifier, referenced_columns, slug,
};
use crate::schema::{
    Column, ColumnType, DefaultValue, ForeignKey, ForeignKeyAction, FtsOptions, Generated, Index,
    IndexTarget, Reference, Schema, Table, TableKind,
};

/// Parses table descriptors into a schema.
///
/// # Errors
///
/// Returns a [`SchemaError`] for any malformed or self-inconsistent
/// descriptor: duplicate names, dangling references, conflicting modifiers,
/// expressions naming unknown columns and invalid full-text tables.
pub fn parse(descriptors: &[TableDescriptor]) -> Result<Schema, SchemaError> {
    let mut seen = BTreeSet::new();
    for descriptor in descriptors {
        if !seen.insert(descriptor.name.as_str()) {
            return Err(SchemaError::DuplicateTable(descriptor.name.clone()));
        }
    }

    let mut drafts = descriptors
        .iter()
        .map(TableDraft::fold)
        .collect::<Result<Vec<_>, _>>()?;

    // Keys must be known before references can default to them.
    let keys: Vec<TableKey> = drafts
        .iter()
        .map(|d| TableKey {
            name: d.table.name.clone(),
            columns: d.table.key_columns().into_iter().map(String::from).collect(),
            full_text: !matches!(d.kind, TableKindDescriptor::Plain),
        })
        .collect();

    for (draft, descriptor) in drafts.iter_mut().zip(descriptors) {
        draft.resolve_references(&keys, descriptors)?;
        draft.resolve_foreign_keys(&descriptor.foreign_keys, &keys, descriptors)?;
        draft.generate_indexes(&descriptor.indexes)?;
        draft.validate_expressions()?;
    }

    let mut tables: Vec<Table> = drafts.into_iter().map(|d| d.table).collect();
    for table in &mut tables {
        resolve_full_text(table, descriptors)?;
    }

    debug!(tables = tables.len(), "Parsed schema descriptors");
    Schema::from_tables(tables)
}

// ============================================================================
// Column folding
// ============================================================================

/// Sets a field once. Setting it again with an equal value is a no-op, a
/// different value is a conflict.
fn set_once<T: PartialEq>(
    slot: &mut Option<T>,
    value: T,
    attribute: &'static str,
    table: &str,
    column: &str,
) -> Result<(), SchemaError> {
    match slot {
        Some(existing) if *existing != value => Err(SchemaError::ConflictingModifier {
            table: table.to_string(),
            column: column.to_string(),
            attribute,
        }),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

/// Every attribute a column's modifiers can set.
#[derive(Default)]
struct FoldedColumn {
    not_null: Option<bool>,
    primary_key: bool,
    autoincrement: bool,
    unique: bool,
    indexes: Vec<(bool, Option<String>)>,
    default: Option<DefaultValue>,
    checks: Vec<CheckRule>,
    reference: Option<(String, Option<String>)>,
    on_delete: Option<ForeignKeyAction>,
    on_update: Option<ForeignKeyAction>,
    generated: Option<Generated>,
    unindexed: bool,
}

impl FoldedColumn {
    fn fold(table: &str, descriptor: &ColumnDescriptor) -> Result<Self, SchemaError> {
        let column = descriptor.name.as_str();
        let mut folded = Self::default();

        for modifier in &descriptor.modifiers {
            match modifier {
                ColumnModifier::PrimaryKey => folded.primary_key = true,
                ColumnModifier::AutoIncrement => folded.autoincrement = true,
                ColumnModifier::NotNull => {
                    set_once(&mut folded.not_null, true, "nullability", table, column)?;
                }
                ColumnModifier::Nullable => {
                    set_once(&mut folded.not_null, false, "nullability", table, column)?;
                }
                ColumnModifier::Unique => folded.unique = true,
                ColumnModifier::Index { unique, predicate } => {
                    let entry = (*unique, predicate.as_deref().map(normalize_whitespace));
                    if !folded.indexes.contains(&entry) {
                        folded.indexes.push(entry);
                    }
                }
                ColumnModifier::Default { value } => {
                    let value = DefaultValue::Literal(value.clone());
                    set_once(&mut folded.default, value, "default", table, column)?;
                }
                ColumnModifier::DefaultExpression { expression } => {
                    let value = DefaultValue::Expression(normalize_whitespace(expression));
                    set_once(&mut folded.default, value, "default", table, column)?;
                }
                ColumnModifier::Check { rule } => folded.checks.push(rule.clone()),
                ColumnModifier::References { table: target, column: target_column } => {
                    let value = (target.clone(), target_column.clone());
                    set_once(&mut folded.reference, value, "reference", table, column)?;
                }
                ColumnModifier::OnDelete { action } => {
                    set_once(&mut folded.on_delete, *action, "on delete", table, column)?;
                }
                ColumnModifier::OnUpdate { action } => {
                    set_once(&mut folded.on_update, *action, "on update", table, column)?;
                }
                ColumnModifier::Cascade { table: target, column: target_column } => {
                    let value = (target.clone(), target_column.clone());
                    set_once(&mut folded.reference, value, "reference", table, column)?;
                    let cascade = ForeignKeyAction::Cascade;
                    set_once(&mut folded.on_delete, cascade, "on delete", table, column)?;
                }
                ColumnModifier::Generated { expression, stored } => {
                    let value = Generated {
                        expression: normalize_whitespace(expression),
                        stored: *stored,
                    };
                    set_once(&mut folded.generated, value, "generated", table, column)?;
                }
                ColumnModifier::Unindexed => folded.unindexed = true,
            }
        }
        // Column-level indexes are independent of application order.
        folded.indexes.sort();
        Ok(folded)
    }
}

fn invalid(table: &str, column: &str, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidModifier {
        table: table.to_string(),
        column: column.to_string(),
        reason: reason.into(),
    }
}

/// Renders a check rule as a boolean clause over `column`.
fn check_clause(column: &str, rule: &CheckRule) -> (String, bool) {
    let name = quote_identifier(column);
    match rule {
        CheckRule::Min { value } => (format!("{name} >= {}", value.to_sql()), false),
        CheckRule::Max { value } => (format!("{name} <= {}", value.to_sql()), false),
        CheckRule::Between { low, high } => (
            format!("{name} between {} and {}", low.to_sql(), high.to_sql()),
            false,
        ),
        CheckRule::OneOf { values } => {
            let values: Vec<String> = values.iter().map(|v| v.to_sql()).collect();
            (format!("{name} in ({})", values.join(", ")), false)
        }
        CheckRule::MinLength { length } => (format!("length({name}) >= {length}"), false),
        CheckRule::MaxLength { length } => (format!("length({name}) <= {length}"), false),
        CheckRule::Expression { expression } => (normalize_whitespace(expression), true),
    }
}

/// Combines check rules into one normalised expression. Clauses are sorted
/// and de-duplicated so the result is independent of modifier order.
fn combine_checks(column: &str, rules: &[CheckRule]) -> Option<String> {
    let mut clauses: Vec<(String, bool)> = rules.iter().map(|r| check_clause(column, r)).collect();
    clauses.sort();
    clauses.dedup();

    match clauses.as_slice() {
        [] => None,
        [(clause, _)] => Some(clause.clone()),
        many => Some(
            many.iter()
                .map(|(clause, expression)| {
                    if *expression {
                        format!("({clause})")
                    } else {
                        clause.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(" and "),
        ),
    }
}

// ============================================================================
// Table drafts
// ============================================================================

/// Primary key of a parsed table, used to resolve references to it.
struct TableKey {
    name: String,
    columns: Vec<String>,
    full_text: bool,
}

/// A table under construction.
struct TableDraft {
    table: Table,
    kind: TableKindDescriptor,
    /// Unresolved column references: (column, target table, target column).
    references: Vec<(String, String, Option<String>)>,
    /// Column-level index requests: (column, unique, predicate).
    column_indexes: Vec<(String, bool, Option<String>)>,
}

impl TableDraft {
    fn fold(descriptor: &TableDescriptor) -> Result<Self, SchemaError> {
        let name = descriptor.name.as_str();
        if descriptor.columns.is_empty() {
            return Err(SchemaError::EmptyTable(name.to_string()));
        }

        let mut draft = Self {
            table: Table::new(name),
            kind: descriptor.kind.clone(),
            references: Vec::new(),
            column_indexes: Vec::new(),
        };
        let full_text = !matches!(descriptor.kind, TableKindDescriptor::Plain);

        let mut column_names = BTreeSet::new();
        for column in &descriptor.columns {
            if !column_names.insert(column.name.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    table: name.to_string(),
                    column: column.name.clone(),
                });
            }
            if full_text {
                draft.fold_full_text_column(column)?;
            } else {
                draft.fold_plain_column(column)?;
            }
        }

        if full_text {
            if !descriptor.primary_key.is_empty()
                || !descriptor.indexes.is_empty()
                || !descriptor.foreign_keys.is_empty()
                || !descriptor.checks.is_empty()
            {
                return Err(SchemaError::InvalidFullText {
                    table: name.to_string(),
                    reason: "full-text tables take no keys, indexes or checks".to_string(),
                });
            }
            return Ok(draft);
        }

        draft.apply_composite_key(&descriptor.primary_key)?;
        draft.table.checks = descriptor
            .checks
            .iter()
            .map(|c| normalize_whitespace(c))
            .collect();
        Ok(draft)
    }

    fn fold_full_text_column(&mut self, descriptor: &ColumnDescriptor) -> Result<(), SchemaError> {
        let mut column = Column::new(&descriptor.name, descriptor.column_type);
        for modifier in &descriptor.modifiers {
            match modifier {
                ColumnModifier::Unindexed => column.unindexed = true,
                other => {
                    return Err(SchemaError::InvalidFullText {
                        table: self.table.name.clone(),
                        reason: format!(
                            "column '{}' carries unsupported modifier {other:?}",
                            descriptor.name
                        ),
                    });
                }
            }
        }
        self.table.columns.push(column);
        Ok(())
    }

    fn fold_plain_column(&mut self, descriptor: &ColumnDescriptor) -> Result<(), SchemaError> {
        let table = self.table.name.clone();
        let name = descriptor.name.as_str();
        let folded = FoldedColumn::fold(&table, descriptor)?;

        if folded.unindexed {
            return Err(invalid(&table, name, "unindexed applies to full-text tables only"));
        }
        if folded.primary_key && folded.not_null == Some(false) {
            return Err(invalid(&table, name, "a primary key cannot be nullable"));
        }
        if folded.autoincrement
            && !(folded.primary_key && descriptor.column_type == ColumnType::Integer)
        {
            return Err(invalid(
                &table,
                name,
                "autoincrement requires an integer primary key",
            ));
        }
        if folded.generated.is_some() && (folded.primary_key || folded.default.is_some()) {
            return Err(invalid(
                &table,
                name,
                "a generated column cannot be a primary key or have a default",
            ));
        }
        if folded.reference.is_none() && (folded.on_delete.is_some() || folded.on_update.is_some())
        {
            return Err(invalid(&table, name, "foreign key action without a reference"));
        }

        let nullable = !folded.primary_key && folded.not_null != Some(true);
        let set_null = [folded.on_delete, folded.on_update]
            .contains(&Some(ForeignKeyAction::SetNull));
        if set_null && !nullable {
            return Err(invalid(&table, name, "set null on a column that is not null"));
        }

        let mut column = Column::new(name, descriptor.column_type);
        column.nullable = nullable;
        column.default = folded.default;
        column.primary_key = folded.primary_key;
        column.autoincrement = folded.autoincrement;
        column.unique = folded.unique;
        column.check = combine_checks(name, &folded.checks);
        column.generated = folded.generated;

        if let Some((target, target_column)) = folded.reference {
            // Resolved once every table's key is known.
            column.reference = Some(Reference {
                table: target.clone(),
                column: String::new(),
                on_delete: folded.on_delete.unwrap_or_default(),
                on_update: folded.on_update.unwrap_or_default(),
            });
            self.references.push((name.to_string(), target, target_column));
        }

        if folded.unique {
            self.column_indexes.push((name.to_string(), true, None));
        }
        for (unique, predicate) in folded.indexes {
            self.column_indexes.push((name.to_string(), unique, predicate));
        }

        self.table.columns.push(column);
        Ok(())
    }

    fn apply_composite_key(&mut self, key: &[String]) -> Result<(), SchemaError> {
        if key.is_empty() {
            return Ok(());
        }
        if self.table.columns.iter().any(|c| c.primary_key) {
            return Err(SchemaError::MultiplePrimaryKeys(self.table.name.clone()));
        }
        for name in key {
            let table = self.table.name.clone();
            let column = self
                .table
                .columns
                .iter_mut()
                .find(|c| c.name == *name)
                .ok_or_else(|| SchemaError::UnknownColumn {
                    table: table.clone(),
                    column: name.clone(),
                    context: "primary key".to_string(),
                })?;
            column.nullable = false;
        }
        self.table.primary_key = key.to_vec();
        Ok(())
    }

    fn resolve_references(
        &mut self,
        keys: &[TableKey],
        descriptors: &[TableDescriptor],
    ) -> Result<(), SchemaError> {
        let table_name = self.table.name.clone();
        for (column_name, target, target_column) in std::mem::take(&mut self.references) {
            let referenced_by = format!("{table_name}.{column_name}");
            let key = lookup_plain(keys, &table_name, &target, &referenced_by)?;
            let target_column = match target_column {
                Some(explicit) => {
                    require_column(descriptors, &target, &explicit, &referenced_by)?;
                    explicit
                }
                None => match key.columns.as_slice() {
                    [single] => single.clone(),
                    _ => {
                        return Err(SchemaError::InvalidForeignKey {
                            table: table_name,
                            reason: format!(
                                "'{column_name}' references '{target}' which has no single-column primary key"
                            ),
                        });
                    }
                },
            };

            let Some(column) = self.table.columns.iter_mut().find(|c| c.name == column_name)
            else {
                continue;
            };
            let Some(reference) = column.reference.as_mut() else {
                continue;
            };
            reference.column = target_column.clone();
            let foreign_key = ForeignKey {
                columns: vec![column_name.clone()],
                target_table: target.clone(),
                target_columns: vec![target_column],
                on_delete: reference.on_delete,
                on_update: reference.on_update,
                nullable: column.nullable,
            };
            self.table.foreign_keys.push(foreign_key);
        }
        Ok(())
    }

    fn resolve_foreign_keys(
        &mut self,
        foreign_keys: &[ForeignKeyDescriptor],
        keys: &[TableKey],
        descriptors: &[TableDescriptor],
    ) -> Result<(), SchemaError> {
        let table_name = self.table.name.clone();
        for fk in foreign_keys {
            if fk.columns.is_empty() {
                return Err(SchemaError::InvalidForeignKey {
                    table: table_name,
                    reason: format!("foreign key to '{}' names no columns", fk.table),
                });
            }
            let mut nullable = true;
            for name in &fk.columns {
                let column = self.table.column(name).ok_or_else(|| SchemaError::UnknownColumn {
                    table: table_name.clone(),
                    column: name.clone(),
                    context: format!("foreign key to '{}'", fk.table),
                })?;
                nullable &= column.nullable;
            }
            if !nullable
                && [fk.on_delete, fk.on_update].contains(&ForeignKeyAction::SetNull)
            {
                return Err(SchemaError::InvalidForeignKey {
                    table: table_name,
                    reason: format!("set null on not-null columns referencing '{}'", fk.table),
                });
            }

            let referenced_by = format!("{table_name}({})", fk.columns.join(", "));
            let key = lookup_plain(keys, &table_name, &fk.table, &referenced_by)?;
            let target_columns = if fk.target_columns.is_empty() {
                key.columns.clone()
            } else {
                for name in &fk.target_columns {
                    require_column(descriptors, &fk.table, name, &referenced_by)?;
                }
                fk.target_columns.clone()
            };
            if target_columns.len() != fk.columns.len() {
                return Err(SchemaError::InvalidForeignKey {
                    table: table_name,
                    reason: format!(
                        "{} column(s) cannot reference {} column(s) of '{}'",
                        fk.columns.len(),
                        target_columns.len(),
                        fk.table
                    ),
                });
            }

            let foreign_key = ForeignKey {
                columns: fk.columns.clone(),
                target_table: fk.table.clone(),
                target_columns,
                on_delete: fk.on_delete,
                on_update: fk.on_update,
                nullable,
            };
            if !self.table.foreign_keys.contains(&foreign_key) {
                self.table.foreign_keys.push(foreign_key);
            }
        }
        Ok(())
    }

    fn generate_indexes(&mut self, table_indexes: &[IndexDescriptor]) -> Result<(), SchemaError> {
        let table = self.table.name.clone();
        let mut indexes: Vec<Index> = Vec::new();

        for (column, unique, predicate) in std::mem::take(&mut self.column_indexes) {
            let name = format!(
                "{table}_{}_{column}{}",
                marker(unique),
                predicate_suffix(predicate.as_deref())
            );
            push_index(
                &mut indexes,
                Index {
                    name,
                    table: table.clone(),
                    target: IndexTarget::Columns(vec![column]),
                    unique,
                    predicate,
                },
            )?;
        }

        // Referencing columns get an index unless one already leads with them.
        for fk in &self.table.foreign_keys {
            let [column] = fk.columns.as_slice() else {
                continue;
            };
            let covered = self.table.key_columns().first() == Some(&column.as_str())
                || indexes.iter().any(|index| {
                    index.predicate.is_none()
                        && matches!(&index.target, IndexTarget::Columns(cols) if cols.first() == Some(column))
                });
            if covered {
                continue;
            }
            push_index(
                &mut indexes,
                Index {
                    name: format!("{table}_index_{column}"),
                    table: table.clone(),
                    target: IndexTarget::Columns(vec![column.clone()]),
                    unique: false,
                    predicate: None,
                },
            )?;
        }

        for descriptor in table_indexes {
            let target = match (&descriptor.expression, descriptor.columns.is_empty()) {
                (Some(expression), true) => IndexTarget::Expression(normalize_whitespace(expression)),
                (None, false) => {
                    for column in &descriptor.columns {
                        if self.table.column(column).is_none() {
                            return Err(SchemaError::UnknownColumn {
                                table: table.clone(),
                                column: column.clone(),
                                context: "index".to_string(),
                            });
                        }
                    }
                    IndexTarget::Columns(descriptor.columns.clone())
                }
                _ => {
                    return Err(SchemaError::InvalidModifier {
                        table: table.clone(),
                        column: descriptor.columns.join(", "),
                        reason: "an index needs either columns or an expression".to_string(),
                    });
                }
            };
            let name = descriptor.name.clone().unwrap_or_else(|| {
                let subject = match &target {
                    IndexTarget::Columns(columns) => columns.join("_"),
                    IndexTarget::Expression(expression) => slug(expression),
                };
                format!(
                    "{table}_{}_{subject}{}",
                    marker(descriptor.unique),
                    predicate_suffix(descriptor.predicate.as_deref())
                )
            });
            push_index(
                &mut indexes,
                Index {
                    name,
                    table: table.clone(),
                    target,
                    unique: descriptor.unique,
                    predicate: descriptor.predicate.as_deref().map(normalize_whitespace),
                },
            )?;
        }

        self.table.indexes = indexes;
        Ok(())
    }

    /// Every column mentioned by a check, default, generated or index
    /// expression must exist in the table.
    fn validate_expressions(&self) -> Result<(), SchemaError> {
        let table = &self.table;
        let mut fragments: Vec<(String, &str)> = Vec::new();

        for column in &table.columns {
            if let Some(check) = &column.check {
                fragments.push((format!("check on '{}'", column.name), check.as_str()));
            }
            if let Some(DefaultValue::Expression(expression)) = &column.default {
                fragments.push((format!("default of '{}'", column.name), expression.as_str()));
            }
            if let Some(generated) = &column.generated {
                fragments.push((
                    format!("generated column '{}'", column.name),
                    generated.expression.as_str(),
                ));
            }
        }
        for check in &table.checks {
            fragments.push(("table check".to_string(), check.as_str()));
        }
        for index in &table.indexes {
            if let IndexTarget::Expression(expression) = &index.target {
                fragments.push((format!("index '{}'", index.name), expression.as_str()));
            }
            if let Some(predicate) = &index.predicate {
                fragments.push((format!("index '{}'", index.name), predicate.as_str()));
            }
        }

        for (context, fragment) in fragments {
            for column in referenced_columns(fragment) {
                if table.column(&column).is_none() {
                    return Err(SchemaError::UnknownColumn {
                        table: table.name.clone(),
                        column,
                        context,
                    });
                }
            }
        }
        Ok(())
    }
}

fn marker(unique: bool) -> &'static str {
    if unique {
        "unique"
    } else {
        "index"
    }
}

/// `_where_{predicate slug}` for partial indexes, so that indexes on the same
/// columns with different predicates get different names.
fn predicate_suffix(predicate: Option<&str>) -> String {
    predicate.map_or_else(String::new, |predicate| format!("_where_{}", predicate_slug(predicate)))
}

/// Adds an index, skipping exact duplicates. A name reused for a different
/// definition is an error.
fn push_index(indexes: &mut Vec<Index>, index: Index) -> Result<(), SchemaError> {
    match indexes.iter().find(|i| i.name == index.name) {
        Some(existing) if *existing == index => Ok(()),
        Some(_) => Err(SchemaError::DuplicateIndex(index.name)),
        None => {
            indexes.push(index);
            Ok(())
        }
    }
}

fn lookup_plain<'k>(
    keys: &'k [TableKey],
    table: &str,
    target: &str,
    referenced_by: &str,
) -> Result<&'k TableKey, SchemaError> {
    let entry = keys
        .iter()
        .find(|k| k.name == target)
        .ok_or_else(|| SchemaError::UnknownTable {
            table: target.to_string(),
            referenced_by: referenced_by.to_string(),
        })?;
    if entry.full_text {
        return Err(SchemaError::InvalidForeignKey {
            table: table.to_string(),
            reason: format!("'{referenced_by}' references full-text table '{target}'"),
        });
    }
    Ok(entry)
}

fn require_column(
    descriptors: &[TableDescriptor],
    table: &str,
    column: &str,
    referenced_by: &str,
) -> Result<(), SchemaError> {
    let descriptor = descriptors
        .iter()
        .find(|d| d.name == table)
        .ok_or_else(|| SchemaError::UnknownTable {
            table: table.to_string(),
            referenced_by: referenced_by.to_string(),
        })?;
    if descriptor.columns.iter().any(|c| c.name == column) {
        Ok(())
    } else {
        Err(SchemaError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
            context: format!("reference from '{referenced_by}'"),
        })
    }
}

// ============================================================================
// Full-text tables
// ============================================================================

fn resolve_full_text(table: &mut Table, descriptors: &[TableDescriptor]) -> Result<(), SchemaError> {
    let Some(descriptor) = descriptors.iter().find(|d| d.name == table.name) else {
        return Ok(());
    };
    let fts_error = |reason: String| SchemaError::InvalidFullText {
        table: descriptor.name.clone(),
        reason,
    };

    table.kind = match &descriptor.kind {
        TableKindDescriptor::Plain => TableKind::Plain,
        TableKindDescriptor::ContentlessFts { tokenizer, prefix } => TableKind::ContentlessFts {
            options: FtsOptions {
                tokenizer: tokenizer.as_deref().map(normalize_whitespace),
                prefix: prefix.clone(),
            },
        },
        TableKindDescriptor::ContentFts {
            content,
            content_rowid,
            tokenizer,
            prefix,
        } => {
            let source = descriptors
                .iter()
                .find(|d| d.name == *content)
                .ok_or_else(|| fts_error(format!("content table '{content}' does not exist")))?;
            if !matches!(source.kind, TableKindDescriptor::Plain) {
                return Err(fts_error(format!("content table '{content}' is itself full-text")));
            }
            let has = |name: &str| source.columns.iter().any(|c| c.name == name);
            for column in &table.columns {
                if !has(&column.name) {
                    return Err(fts_error(format!(
                        "content table '{content}' has no column '{}'",
                        column.name
                    )));
                }
            }

            let content_rowid = match content_rowid {
                Some(explicit) if has(explicit) => explicit.clone(),
                Some(explicit) => {
                    return Err(fts_error(format!(
                        "content rowid '{explicit}' is not a column of '{content}'"
                    )));
                }
                None => source
                    .columns
                    .iter()
                    .find(|c| {
                        c.column_type == ColumnType::Integer
                            && c.modifiers.contains(&ColumnModifier::PrimaryKey)
                    })
                    .map_or_else(|| "rowid".to_string(), |c| c.name.clone()),
            };

            TableKind::ContentFts {
                content: content.clone(),
                content_rowid,
                options: FtsOptions {
                    tokenizer: tokenizer.as_deref().map(normalize_whitespace),
                    prefix: prefix.clone(),
                },
            }
        }
    };
    Ok(())
}
