//! Schema IR: the in-memory graph of tables, columns, relationships,
//! indexes and constraints every other module reads or writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Generate a fresh entity id. Ids are never reused.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub id: String,
    pub name: String,
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub members: Vec<Member>,
    pub updated_at: DateTime<Utc>,
}

impl Schema {
    /// Fresh schema with a single owner member and no tables.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            tables: vec![],
            relationships: vec![],
            indexes: vec![],
            constraints: vec![],
            members: vec![Member {
                id: new_id(),
                name: "owner".to_string(),
                role: MemberRole::Owner,
            }],
            updated_at: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn table(&self, id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn table_mut(&mut self, id: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.id == id)
    }

    /// Case-insensitive lookup by table name.
    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a (table id, column id) pair.
    pub fn resolve(&self, table_id: &str, column_id: &str) -> Option<(&Table, &Column)> {
        let table = self.table(table_id)?;
        let column = table.column(column_id)?;
        Some((table, column))
    }

    pub fn relationship(&self, id: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id == id)
    }

    /// Remove every relationship matching `pred` and clear the foreign-key
    /// fields it mirrored onto its source column. Returns how many went.
    pub fn detach_relationships<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&Relationship) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.relationships.drain(..).partition(|r| pred(r));
        self.relationships = kept;

        for rel in &removed {
            if let Some(column) = self
                .table_mut(&rel.source_table_id)
                .and_then(|t| t.column_mut(&rel.source_column_id))
            {
                column.clear_foreign_key();
            }
        }
        removed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub role: MemberRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Editor,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub row_count: u64,
    /// Row data for the query sandbox; never interpreted here.
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

impl Table {
    pub fn from_spec(spec: TableSpec) -> Self {
        Self {
            id: new_id(),
            name: spec.name,
            columns: spec.columns.into_iter().map(Column::from_spec).collect(),
            position: spec.position.unwrap_or_default(),
            row_count: 0,
            data: vec![],
        }
    }

    pub fn column(&self, id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn column_mut(&mut self, id: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.id == id)
    }

    /// Case-insensitive lookup by column name.
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub name: String,
    /// Opaque type token such as `VARCHAR(255)`; dialects disagree on
    /// what is valid, so it is never parsed into an enum.
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_indexed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self::from_spec(ColumnSpec::new(name, data_type))
    }

    pub fn from_spec(spec: ColumnSpec) -> Self {
        Self {
            id: new_id(),
            name: spec.name,
            data_type: spec.data_type,
            nullable: spec.nullable,
            default_value: spec.default_value,
            is_primary_key: spec.is_primary_key,
            is_foreign_key: false,
            is_unique: spec.is_unique,
            is_indexed: spec.is_indexed,
            referenced_table: None,
            referenced_column: None,
            constraint_name: None,
        }
    }

    pub fn set_foreign_key(&mut self, table: &str, column: &str, constraint: &str) {
        self.is_foreign_key = true;
        self.referenced_table = Some(table.to_string());
        self.referenced_column = Some(column.to_string());
        self.constraint_name = Some(constraint.to_string());
    }

    pub fn clear_foreign_key(&mut self) {
        self.is_foreign_key = false;
        self.referenced_table = None;
        self.referenced_column = None;
        self.constraint_name = None;
    }

    pub fn apply_patch(&mut self, patch: ColumnPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(data_type) = patch.data_type {
            self.data_type = data_type;
        }
        if let Some(nullable) = patch.nullable {
            self.nullable = nullable;
        }
        if let Some(default_value) = patch.default_value {
            self.default_value = default_value;
        }
        if let Some(pk) = patch.is_primary_key {
            self.is_primary_key = pk;
        }
        if let Some(unique) = patch.is_unique {
            self.is_unique = unique;
        }
        if let Some(indexed) = patch.is_indexed {
            self.is_indexed = indexed;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "1:1")]
    OneToOne,
    #[default]
    #[serde(rename = "1:N")]
    OneToMany,
    #[serde(rename = "N:M")]
    ManyToMany,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "1:1",
            Self::OneToMany => "1:N",
            Self::ManyToMany => "N:M",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub name: String,
    pub source_table_id: String,
    pub source_column_id: String,
    pub target_table_id: String,
    pub target_column_id: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    pub constraint_name: String,
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    /// Build a relationship between two resolved endpoints, with its name
    /// and constraint name derived from the current table/column names.
    pub fn between(
        source: (&Table, &Column),
        target: (&Table, &Column),
        cardinality: Cardinality,
    ) -> Self {
        Self {
            id: new_id(),
            name: Self::display_name_for(&source.0.name, &target.0.name),
            source_table_id: source.0.id.clone(),
            source_column_id: source.1.id.clone(),
            target_table_id: target.0.id.clone(),
            target_column_id: target.1.id.clone(),
            cardinality,
            constraint_name: Self::constraint_name_for(
                &source.0.name,
                &source.1.name,
                &target.0.name,
                &target.1.name,
            ),
            created_at: Utc::now(),
        }
    }

    /// `FK_{sourceTable}_{sourceColumn}_{targetTable}_{targetColumn}`
    pub fn constraint_name_for(
        source_table: &str,
        source_column: &str,
        target_table: &str,
        target_column: &str,
    ) -> String {
        format!(
            "FK_{}_{}_{}_{}",
            source_table, source_column, target_table, target_column
        )
    }

    pub fn display_name_for(source_table: &str, target_table: &str) -> String {
        format!("{}_{}", source_table, target_table)
    }

    pub fn is_self_reference(&self) -> bool {
        self.source_table_id == self.target_table_id
    }

    pub fn touches_table(&self, table_id: &str) -> bool {
        self.source_table_id == table_id || self.target_table_id == table_id
    }

    pub fn touches_column(&self, table_id: &str, column_id: &str) -> bool {
        (self.source_table_id == table_id && self.source_column_id == column_id)
            || (self.target_table_id == table_id && self.target_column_id == column_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub id: String,
    pub name: String,
    pub table_id: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    pub id: String,
    pub name: String,
    pub table_id: String,
    pub columns: Vec<String>,
    pub kind: ConstraintKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    Check { expression: String },
}

// Creation specs and patches. These are what callers hand to the store;
// ids are always assigned on the store side.

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub position: Option<Position>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_indexed: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default_value: None,
            is_primary_key: false,
            is_unique: false,
            is_indexed: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePatch {
    pub name: Option<String>,
    pub position: Option<Position>,
    pub row_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    pub nullable: Option<bool>,
    /// `Some(None)` clears the default, `None` leaves it alone.
    #[serde(default, deserialize_with = "present")]
    pub default_value: Option<Option<String>>,
    pub is_primary_key: Option<bool>,
    pub is_unique: Option<bool>,
    pub is_indexed: Option<bool>,
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipSpec {
    pub source_table_id: String,
    pub source_column_id: String,
    pub target_table_id: String,
    pub target_column_id: String,
    #[serde(default)]
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipPatch {
    pub source_table_id: Option<String>,
    pub source_column_id: Option<String>,
    pub target_table_id: Option<String>,
    pub target_column_id: Option<String>,
    pub cardinality: Option<Cardinality>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSpec {
    pub name: String,
    pub table_id: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintSpec {
    pub name: String,
    pub table_id: String,
    pub columns: Vec<String>,
    pub kind: ConstraintKind,
}
