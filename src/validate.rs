//! Structural and referential checks over a schema.
//!
//! Validation is a pure function of the schema. Diagnostics come out in
//! traversal order: tables in collection order, their columns in declared
//! order, then relationships in collection order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Relationship, Schema, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_id: Option<String>,
}

impl Diagnostic {
    fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
            table_id: None,
            column_id: None,
            relationship_id: None,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message)
        }
    }

    fn on_table(mut self, table: &Table) -> Self {
        self.table_id = Some(table.id.clone());
        self
    }

    fn on_column(mut self, column_id: &str) -> Self {
        self.column_id = Some(column_id.to_string());
        self
    }

    fn on_relationship(mut self, rel: &Relationship) -> Self {
        self.relationship_id = Some(rel.id.clone());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// What to do when a relationship points at a column that is not the
/// target table's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPolicy {
    #[default]
    Ignore,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOptions {
    #[serde(default)]
    pub primary_key_targets: TargetPolicy,
}

/// Validate a schema with default options.
pub fn validate(schema: &Schema) -> Vec<Diagnostic> {
    validate_with(schema, &ValidationOptions::default())
}

pub fn validate_with(schema: &Schema, options: &ValidationOptions) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    let mut table_names = HashSet::new();
    for table in &schema.tables {
        if !table_names.insert(table.name.to_lowercase()) {
            out.push(Diagnostic::error(format!("Duplicate table name: {}", table.name)).on_table(table));
        }
        check_columns(schema, table, &mut out);
    }

    for rel in &schema.relationships {
        check_relationship(schema, rel, options, &mut out);
    }

    out
}

/// Checks for a single table: its name against the other tables, then
/// every column rule.
pub fn validate_table(schema: &Schema, table: &Table) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let clash = schema
        .tables
        .iter()
        .any(|other| other.id != table.id && other.name.eq_ignore_ascii_case(&table.name));
    if clash {
        out.push(Diagnostic::error(format!("Duplicate table name: {}", table.name)).on_table(table));
    }
    check_columns(schema, table, &mut out);
    out
}

pub fn validate_relationship(
    schema: &Schema,
    rel: &Relationship,
    options: &ValidationOptions,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    check_relationship(schema, rel, options, &mut out);
    out
}

fn check_columns(schema: &Schema, table: &Table, out: &mut Vec<Diagnostic>) {
    let mut pk_count = 0;
    let mut names = HashSet::new();
    let mut unique_names = HashSet::new();

    for column in &table.columns {
        if column.is_primary_key {
            pk_count += 1;
            if pk_count == 2 {
                out.push(
                    Diagnostic::error(format!("Multiple primary keys in table {}", table.name))
                        .on_table(table)
                        .on_column(&column.id),
                );
            }
        }

        let lower = column.name.to_lowercase();
        if !names.insert(lower.clone()) {
            out.push(
                Diagnostic::error(format!(
                    "Duplicate column name: {} in table {}",
                    column.name, table.name
                ))
                .on_table(table)
                .on_column(&column.id),
            );
        }

        if column.is_foreign_key {
            check_reference(schema, table, column, out);
        }

        // Overlaps with the name check above; kept so existing consumers
        // still see the unique-specific message.
        if column.is_unique && !unique_names.insert(lower) {
            out.push(
                Diagnostic::error(format!(
                    "Duplicate unique column: {} in table {}",
                    column.name, table.name
                ))
                .on_table(table)
                .on_column(&column.id),
            );
        }
    }
}

fn check_reference(
    schema: &Schema,
    table: &Table,
    column: &crate::model::Column,
    out: &mut Vec<Diagnostic>,
) {
    let ref_table = column.referenced_table.as_deref().unwrap_or("");
    let ref_column = column.referenced_column.as_deref().unwrap_or("");

    let Some(target) = schema.table_by_name(ref_table) else {
        out.push(
            Diagnostic::error(format!(
                "Foreign key {}.{} references missing table {}",
                table.name, column.name, ref_table
            ))
            .on_table(table)
            .on_column(&column.id),
        );
        return;
    };

    if target.column_by_name(ref_column).is_none() {
        out.push(
            Diagnostic::error(format!(
                "Foreign key {}.{} references missing column {}.{}",
                table.name, column.name, target.name, ref_column
            ))
            .on_table(table)
            .on_column(&column.id),
        );
    }
}

fn check_relationship(
    schema: &Schema,
    rel: &Relationship,
    options: &ValidationOptions,
    out: &mut Vec<Diagnostic>,
) {
    let source = endpoint(schema, &rel.source_table_id, &rel.source_column_id);
    let target = endpoint(schema, &rel.target_table_id, &rel.target_column_id);

    match source {
        Endpoint::MissingTable => out.push(
            Diagnostic::error(format!("Relationship {} has a missing source table", rel.name))
                .on_relationship(rel),
        ),
        Endpoint::MissingColumn => out.push(
            Diagnostic::error(format!("Relationship {} has a missing source column", rel.name))
                .on_relationship(rel),
        ),
        Endpoint::Resolved(_) => {}
    }

    match target {
        Endpoint::MissingTable => out.push(
            Diagnostic::error(format!("Relationship {} has a missing target table", rel.name))
                .on_relationship(rel),
        ),
        Endpoint::MissingColumn => out.push(
            Diagnostic::error(format!("Relationship {} has a missing target column", rel.name))
                .on_relationship(rel),
        ),
        Endpoint::Resolved(is_pk) => {
            if !is_pk && options.primary_key_targets != TargetPolicy::Ignore {
                let message = format!(
                    "Relationship {} targets a column that is not a primary key",
                    rel.name
                );
                out.push(
                    match options.primary_key_targets {
                        TargetPolicy::Error => Diagnostic::error(message),
                        _ => Diagnostic::warning(message),
                    }
                    .on_relationship(rel),
                );
            }
        }
    }

    if rel.is_self_reference() {
        out.push(
            Diagnostic::warning(format!("Relationship {} references its own table", rel.name))
                .on_relationship(rel),
        );
    }
}

enum Endpoint {
    MissingTable,
    MissingColumn,
    /// Carries whether the column is a primary key.
    Resolved(bool),
}

fn endpoint(schema: &Schema, table_id: &str, column_id: &str) -> Endpoint {
    match schema.table(table_id) {
        None => Endpoint::MissingTable,
        Some(table) => match table.column(column_id) {
            None => Endpoint::MissingColumn,
            Some(column) => Endpoint::Resolved(column.is_primary_key),
        },
    }
}
