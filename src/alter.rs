//! Atomic column-level operations on one table.
//!
//! Each operation either applies completely or, when the table or column
//! it names is gone, does nothing. Relationships touched by an operation
//! are kept in step with the columns. Validation is left to the caller.

use serde::Deserialize;
use tracing::debug;

use crate::model::{Cardinality, Column, ColumnPatch, ColumnSpec, Relationship, Schema};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "op",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum AlterOperation {
    AddColumn(ColumnSpec),
    DropColumn {
        column_id: String,
    },
    ModifyColumn {
        column_id: String,
        changes: ColumnPatch,
    },
    /// Clears every primary-key flag in the table, then sets the listed ones.
    AddPrimaryKey {
        column_ids: Vec<String>,
    },
    DropPrimaryKey,
    AddForeignKey {
        column_id: String,
        referenced_table: String,
        referenced_column: String,
        #[serde(default)]
        constraint_name: Option<String>,
    },
    /// Clears the reference on every column carrying this constraint name.
    DropForeignKey {
        constraint_name: String,
    },
}

impl AlterOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddColumn(_) => "ADD_COLUMN",
            Self::DropColumn { .. } => "DROP_COLUMN",
            Self::ModifyColumn { .. } => "MODIFY_COLUMN",
            Self::AddPrimaryKey { .. } => "ADD_PRIMARY_KEY",
            Self::DropPrimaryKey => "DROP_PRIMARY_KEY",
            Self::AddForeignKey { .. } => "ADD_FOREIGN_KEY",
            Self::DropForeignKey { .. } => "DROP_FOREIGN_KEY",
        }
    }
}

/// Apply one operation to the table `table_id`. Returns whether the
/// schema changed.
pub fn apply(schema: &mut Schema, table_id: &str, op: AlterOperation) -> bool {
    let op_name = op.name();
    let applied = apply_inner(schema, table_id, op);
    if !applied {
        debug!(table_id, op = op_name, "alter operation had nothing to apply");
    }
    applied
}

fn apply_inner(schema: &mut Schema, table_id: &str, op: AlterOperation) -> bool {
    let Some(table) = schema.table_mut(table_id) else {
        return false;
    };

    match op {
        AlterOperation::AddColumn(spec) => {
            table.columns.push(Column::from_spec(spec));
            true
        }
        AlterOperation::DropColumn { column_id } => {
            let before = table.columns.len();
            table.columns.retain(|c| c.id != column_id);
            if table.columns.len() == before {
                return false;
            }
            schema.detach_relationships(|r| r.touches_column(table_id, &column_id));
            true
        }
        AlterOperation::ModifyColumn { column_id, changes } => match table.column_mut(&column_id) {
            Some(column) => {
                column.apply_patch(changes);
                true
            }
            None => false,
        },
        AlterOperation::AddPrimaryKey { column_ids } => {
            for column in &mut table.columns {
                column.is_primary_key = column_ids.contains(&column.id);
            }
            true
        }
        AlterOperation::DropPrimaryKey => {
            for column in &mut table.columns {
                column.is_primary_key = false;
            }
            true
        }
        AlterOperation::AddForeignKey {
            column_id,
            referenced_table,
            referenced_column,
            constraint_name,
        } => add_foreign_key(
            schema,
            table_id,
            &column_id,
            &referenced_table,
            &referenced_column,
            constraint_name,
        ),
        AlterOperation::DropForeignKey { constraint_name } => {
            let mut cleared = Vec::new();
            for column in &mut table.columns {
                if column.constraint_name.as_deref() == Some(constraint_name.as_str()) {
                    column.clear_foreign_key();
                    cleared.push(column.id.clone());
                }
            }
            let dropped = schema.detach_relationships(|r| {
                r.source_table_id == table_id
                    && (r.constraint_name == constraint_name || cleared.contains(&r.source_column_id))
            });
            !cleared.is_empty() || dropped > 0
        }
    }
}

/// Point the column at `referenced_table.referenced_column`. A column has
/// at most one outgoing relationship: an existing one is re-targeted when
/// the new reference resolves and dropped when it does not. The column
/// keeps `constraint_name` when one is given.
fn add_foreign_key(
    schema: &mut Schema,
    table_id: &str,
    column_id: &str,
    referenced_table: &str,
    referenced_column: &str,
    constraint_name: Option<String>,
) -> bool {
    let Some((table, column)) = schema.resolve(table_id, column_id) else {
        return false;
    };
    let constraint = constraint_name.unwrap_or_else(|| {
        Relationship::constraint_name_for(&table.name, &column.name, referenced_table, referenced_column)
    });
    let target = schema.table_by_name(referenced_table).and_then(|t| {
        t.column_by_name(referenced_column).map(|c| (t.id.clone(), c.id.clone()))
    });
    let existing = schema
        .relationships
        .iter()
        .position(|r| r.source_table_id == table_id && r.source_column_id == column_id);

    match (target, existing) {
        (Some((target_table_id, target_column_id)), Some(index)) => {
            let rel = &mut schema.relationships[index];
            rel.target_table_id = target_table_id;
            rel.target_column_id = target_column_id;
        }
        (Some((target_table_id, target_column_id)), None) => {
            let source = schema.resolve(table_id, column_id);
            let target = schema.resolve(&target_table_id, &target_column_id);
            if let (Some(source), Some(target)) = (source, target) {
                let rel = Relationship::between(source, target, Cardinality::OneToMany);
                schema.relationships.push(rel);
            }
        }
        // Unresolved references stay on the column for the validator to report
        (None, Some(_)) => {
            schema.detach_relationships(|r| r.source_table_id == table_id && r.source_column_id == column_id);
        }
        (None, None) => {}
    }

    if let Some(column) = schema
        .table_mut(table_id)
        .and_then(|t| t.column_mut(column_id))
    {
        column.set_foreign_key(referenced_table, referenced_column, &constraint);
    }
    true
}
