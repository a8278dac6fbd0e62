//! The schema store: owns the current schema, applies mutations and keeps
//! the diagnostics for it current.
//!
//! Every mutation runs to completion before returning: the change is
//! applied, dependent fields are re-derived, the validator runs, and
//! subscribers are called with the new schema and diagnostics. Mutations
//! that name an id which no longer exists are no-ops, never errors.

use serde::Serialize;
use tracing::{debug, info};

use crate::alter::{self, AlterOperation};
use crate::config::DesignerConfig;
use crate::emit::{self, EmitError};
use crate::error::{ImportError, PersistError};
use crate::model::{
    Column, ColumnPatch, ColumnSpec, Constraint, ConstraintSpec, Index, IndexSpec, Position,
    Relationship, RelationshipPatch, RelationshipSpec, Schema, Table, TablePatch, TableSpec,
    new_id,
};
use crate::sql::{self, AlterIntent, Dialect, SkippedStatement};
use crate::validate::{self, Diagnostic};

pub type SubscriptionId = usize;

type Subscriber = Box<dyn FnMut(&Schema, &[Diagnostic])>;

const DUPLICATE_OFFSET: f64 = 40.0;

/// Result of a successful SQL import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub table_ids: Vec<String>,
    pub relationship_ids: Vec<String>,
    /// ALTER/DROP statements found in the input; reported, not applied.
    pub alters: Vec<AlterIntent>,
    pub skipped: Vec<SkippedStatement>,
}

pub struct SchemaStore {
    schema: Schema,
    diagnostics: Vec<Diagnostic>,
    config: DesignerConfig,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: SubscriptionId,
}

impl SchemaStore {
    pub fn new(name: &str) -> Self {
        Self::with_config(name, DesignerConfig::default())
    }

    pub fn with_config(name: &str, config: DesignerConfig) -> Self {
        Self::from_schema(Schema::new(name), config)
    }

    pub fn from_schema(schema: Schema, config: DesignerConfig) -> Self {
        let diagnostics = validate::validate_with(&schema, &config.validation);
        Self {
            schema,
            diagnostics,
            config,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Load a persisted schema document.
    pub fn from_json(text: &str, config: DesignerConfig) -> Result<Self, PersistError> {
        let schema: Schema = serde_json::from_str(text)?;
        Ok(Self::from_schema(schema, config))
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(&self.schema)?)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &DesignerConfig {
        &self.config
    }

    /// Diagnostics from the last validation run.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Whether any error-level diagnostic points at this table, column or
    /// relationship id.
    pub fn has_errors_for(&self, id: &str) -> bool {
        self.diagnostics.iter().any(|d| {
            d.is_error()
                && [&d.table_id, &d.column_id, &d.relationship_id]
                    .iter()
                    .any(|field| field.as_deref() == Some(id))
        })
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Schema, &[Diagnostic]) + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Replace the whole schema, e.g. after loading from storage.
    pub fn replace_schema(&mut self, schema: Schema) {
        self.schema = schema;
        self.commit("replace_schema");
    }

    // Tables

    pub fn add_table(&mut self, spec: TableSpec) -> String {
        let table = Table::from_spec(spec);
        let id = table.id.clone();
        self.schema.tables.push(table);
        self.commit("add_table");
        id
    }

    pub fn remove_table(&mut self, id: &str) -> bool {
        let before = self.schema.tables.len();
        self.schema.tables.retain(|t| t.id != id);
        if self.schema.tables.len() == before {
            return self.skip("remove_table", id);
        }

        self.schema.detach_relationships(|r| r.touches_table(id));
        self.schema.indexes.retain(|i| i.table_id != id);
        self.schema.constraints.retain(|c| c.table_id != id);
        self.commit("remove_table");
        true
    }

    pub fn update_table(&mut self, id: &str, patch: TablePatch) -> bool {
        let Some(table) = self.schema.table_mut(id) else {
            return self.skip("update_table", id);
        };
        if let Some(name) = patch.name {
            table.name = name;
        }
        if let Some(position) = patch.position {
            table.position = position;
        }
        if let Some(row_count) = patch.row_count {
            table.row_count = row_count;
        }
        self.commit("update_table");
        true
    }

    /// Copy a table with fresh ids under a name no other table uses.
    /// Relationships are not copied, so the copy's columns carry no
    /// foreign keys.
    pub fn duplicate_table(&mut self, id: &str) -> Option<String> {
        let Some(original) = self.schema.table(id) else {
            self.skip("duplicate_table", id);
            return None;
        };

        let mut copy = original.clone();
        copy.id = new_id();
        copy.name = self.unused_name(&format!("{}{}", original.name, self.config.duplicate_suffix));
        copy.position = Position {
            x: original.position.x + DUPLICATE_OFFSET,
            y: original.position.y + DUPLICATE_OFFSET,
        };
        for column in &mut copy.columns {
            column.id = new_id();
            column.clear_foreign_key();
        }

        let copy_id = copy.id.clone();
        self.schema.tables.push(copy);
        self.commit("duplicate_table");
        Some(copy_id)
    }

    fn unused_name(&self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 2;
        while self.schema.table_by_name(&candidate).is_some() {
            candidate = format!("{}{}", base, n);
            n += 1;
        }
        candidate
    }

    pub fn alter_table(&mut self, table_id: &str, op: AlterOperation) -> bool {
        let applied = alter::apply(&mut self.schema, table_id, op);
        if applied {
            self.commit("alter_table");
        }
        applied
    }

    /// Apply several operations and validate once at the end. Returns how
    /// many of them changed the schema.
    pub fn alter_table_batch(&mut self, table_id: &str, ops: Vec<AlterOperation>) -> usize {
        let applied = ops
            .into_iter()
            .map(|op| alter::apply(&mut self.schema, table_id, op))
            .filter(|applied| *applied)
            .count();
        if applied > 0 {
            self.commit("alter_table_batch");
        }
        applied
    }

    // Columns

    pub fn add_column(&mut self, table_id: &str, spec: ColumnSpec) -> Option<String> {
        let Some(table) = self.schema.table_mut(table_id) else {
            self.skip("add_column", table_id);
            return None;
        };
        let column = Column::from_spec(spec);
        let id = column.id.clone();
        table.columns.push(column);
        self.commit("add_column");
        Some(id)
    }

    pub fn remove_column(&mut self, table_id: &str, column_id: &str) -> bool {
        let removed = match self.schema.table_mut(table_id) {
            Some(table) => {
                let before = table.columns.len();
                table.columns.retain(|c| c.id != column_id);
                table.columns.len() != before
            }
            None => false,
        };
        if !removed {
            return self.skip("remove_column", column_id);
        }

        self.schema
            .detach_relationships(|r| r.touches_column(table_id, column_id));
        self.commit("remove_column");
        true
    }

    pub fn update_column(&mut self, table_id: &str, column_id: &str, patch: ColumnPatch) -> bool {
        let Some(column) = self
            .schema
            .table_mut(table_id)
            .and_then(|t| t.column_mut(column_id))
        else {
            return self.skip("update_column", column_id);
        };
        column.apply_patch(patch);
        self.commit("update_column");
        true
    }

    // Relationships

    pub fn add_relationship(&mut self, spec: RelationshipSpec) -> Option<String> {
        let source = self.schema.resolve(&spec.source_table_id, &spec.source_column_id);
        let target = self.schema.resolve(&spec.target_table_id, &spec.target_column_id);
        let (Some(source), Some(target)) = (source, target) else {
            self.skip("add_relationship", &spec.source_column_id);
            return None;
        };

        let rel = Relationship::between(source, target, spec.cardinality);
        let id = rel.id.clone();
        self.schema.relationships.push(rel);
        self.reset_foreign_key(&spec.source_table_id, &spec.source_column_id);
        self.commit("add_relationship");
        Some(id)
    }

    pub fn remove_relationship(&mut self, id: &str) -> bool {
        if self.schema.detach_relationships(|r| r.id == id) == 0 {
            return self.skip("remove_relationship", id);
        }
        self.commit("remove_relationship");
        true
    }

    /// Merge cardinality and/or endpoint changes. An endpoint that does not
    /// resolve makes the whole update a no-op.
    pub fn update_relationship(&mut self, id: &str, patch: RelationshipPatch) -> bool {
        let Some(index) = self.schema.relationships.iter().position(|r| r.id == id) else {
            return self.skip("update_relationship", id);
        };
        let current = self.schema.relationships[index].clone();

        let source_table_id = patch.source_table_id.unwrap_or(current.source_table_id.clone());
        let source_column_id = patch.source_column_id.unwrap_or(current.source_column_id.clone());
        let target_table_id = patch.target_table_id.unwrap_or(current.target_table_id.clone());
        let target_column_id = patch.target_column_id.unwrap_or(current.target_column_id.clone());

        if self.schema.resolve(&source_table_id, &source_column_id).is_none()
            || self.schema.resolve(&target_table_id, &target_column_id).is_none()
        {
            return self.skip("update_relationship", id);
        }

        let source_moved =
            source_table_id != current.source_table_id || source_column_id != current.source_column_id;
        if source_moved {
            self.reset_foreign_key(&current.source_table_id, &current.source_column_id);
            self.reset_foreign_key(&source_table_id, &source_column_id);
        }

        let rel = &mut self.schema.relationships[index];
        rel.source_table_id = source_table_id;
        rel.source_column_id = source_column_id;
        rel.target_table_id = target_table_id;
        rel.target_column_id = target_column_id;
        if let Some(cardinality) = patch.cardinality {
            rel.cardinality = cardinality;
        }
        self.commit("update_relationship");
        true
    }

    // Indexes and constraints

    pub fn add_index(&mut self, spec: IndexSpec) -> Option<String> {
        if self.schema.table(&spec.table_id).is_none() {
            self.skip("add_index", &spec.table_id);
            return None;
        }
        let id = new_id();
        self.schema.indexes.push(Index {
            id: id.clone(),
            name: spec.name,
            table_id: spec.table_id,
            columns: spec.columns,
            unique: spec.unique,
        });
        self.commit("add_index");
        Some(id)
    }

    pub fn remove_index(&mut self, id: &str) -> bool {
        let before = self.schema.indexes.len();
        self.schema.indexes.retain(|i| i.id != id);
        if self.schema.indexes.len() == before {
            return self.skip("remove_index", id);
        }
        self.commit("remove_index");
        true
    }

    pub fn add_constraint(&mut self, spec: ConstraintSpec) -> Option<String> {
        if self.schema.table(&spec.table_id).is_none() {
            self.skip("add_constraint", &spec.table_id);
            return None;
        }
        let id = new_id();
        self.schema.constraints.push(Constraint {
            id: id.clone(),
            name: spec.name,
            table_id: spec.table_id,
            columns: spec.columns,
            kind: spec.kind,
        });
        self.commit("add_constraint");
        Some(id)
    }

    pub fn remove_constraint(&mut self, id: &str) -> bool {
        let before = self.schema.constraints.len();
        self.schema.constraints.retain(|c| c.id != id);
        if self.schema.constraints.len() == before {
            return self.skip("remove_constraint", id);
        }
        self.commit("remove_constraint");
        true
    }

    // Derived output

    /// Generic SQL for the whole schema.
    pub fn generate_sql(&self) -> String {
        emit::emit_sql(&self.schema, Dialect::Generic)
    }

    /// Render in a dialect given by name; unknown names get generic SQL.
    pub fn export_schema(&self, dialect: &str) -> Result<String, EmitError> {
        emit::emit(&self.schema, Dialect::from_name_or_generic(dialect))
    }

    pub fn validate_schema(&self) -> Vec<Diagnostic> {
        validate::validate_with(&self.schema, &self.config.validation)
    }

    pub fn validate_table(&self, table: &Table) -> Vec<Diagnostic> {
        validate::validate_table(&self.schema, table)
    }

    pub fn validate_relationship(&self, rel: &Relationship) -> Vec<Diagnostic> {
        validate::validate_relationship(&self.schema, rel, &self.config.validation)
    }

    // Import

    /// Merge every CREATE TABLE statement of `text` into the schema.
    ///
    /// Statements that cannot be read are skipped and listed in the
    /// report. Only when no table at all could be parsed is this an error,
    /// and then the schema is left untouched.
    pub fn import_from_sql(&mut self, text: &str) -> Result<ImportReport, ImportError> {
        let outcome = sql::parse_statements(text);
        if outcome.tables.is_empty() {
            return Err(ImportError::NothingParsed {
                skipped: outcome.skipped,
            });
        }

        let table_ids: Vec<String> = outcome.tables.iter().map(|t| t.id.clone()).collect();
        self.schema.tables.extend(outcome.tables);

        // Inline REFERENCES that resolve become relationships
        let mut links = Vec::new();
        for table_id in &table_ids {
            let Some(table) = self.schema.table(table_id) else {
                continue;
            };
            for column in table.columns.iter().filter(|c| c.is_foreign_key) {
                let target = column
                    .referenced_table
                    .as_deref()
                    .and_then(|name| self.schema.table_by_name(name))
                    .and_then(|t| {
                        let col = t.column_by_name(column.referenced_column.as_deref()?)?;
                        Some((t.id.clone(), col.id.clone()))
                    });
                if let Some((target_table_id, target_column_id)) = target {
                    links.push(RelationshipSpec {
                        source_table_id: table.id.clone(),
                        source_column_id: column.id.clone(),
                        target_table_id,
                        target_column_id,
                        cardinality: Default::default(),
                    });
                }
            }
        }

        let mut relationship_ids = Vec::new();
        for link in links {
            let source = self.schema.resolve(&link.source_table_id, &link.source_column_id);
            let target = self.schema.resolve(&link.target_table_id, &link.target_column_id);
            if let (Some(source), Some(target)) = (source, target) {
                let rel = Relationship::between(source, target, link.cardinality);
                relationship_ids.push(rel.id.clone());
                self.schema.relationships.push(rel);
                self.reset_foreign_key(&link.source_table_id, &link.source_column_id);
            }
        }

        info!(
            tables = table_ids.len(),
            relationships = relationship_ids.len(),
            skipped = outcome.skipped.len(),
            "imported SQL"
        );
        self.commit("import_from_sql");

        Ok(ImportReport {
            table_ids,
            relationship_ids,
            alters: outcome.alters,
            skipped: outcome.skipped,
        })
    }

    // Internals

    /// Clear a column's reference so the derive step fills it in afresh.
    fn reset_foreign_key(&mut self, table_id: &str, column_id: &str) {
        if let Some(column) = self
            .schema
            .table_mut(table_id)
            .and_then(|t| t.column_mut(column_id))
        {
            column.clear_foreign_key();
        }
    }

    fn skip(&self, action: &str, id: &str) -> bool {
        debug!(action, id, "nothing to apply");
        false
    }

    fn commit(&mut self, action: &str) {
        self.schema.touch();
        derive_relationship_fields(&mut self.schema);
        self.diagnostics = validate::validate_with(&self.schema, &self.config.validation);
        debug!(
            action,
            tables = self.schema.tables.len(),
            relationships = self.schema.relationships.len(),
            diagnostics = self.diagnostics.len(),
            "schema updated"
        );
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&self.schema, &self.diagnostics);
        }
    }
}

/// Recompute every resolvable relationship's name and constraint name from
/// the current table and column names, and mirror the reference onto its
/// source column. A source column whose constraint name differs from the
/// relationship's previous one was named by the caller and keeps its name.
fn derive_relationship_fields(schema: &mut Schema) {
    let mut mirrors = Vec::new();
    for (index, rel) in schema.relationships.iter().enumerate() {
        let source = schema.resolve(&rel.source_table_id, &rel.source_column_id);
        let target = schema.resolve(&rel.target_table_id, &rel.target_column_id);
        if let (Some((st, sc)), Some((tt, tc))) = (source, target) {
            mirrors.push((
                index,
                Relationship::display_name_for(&st.name, &tt.name),
                Relationship::constraint_name_for(&st.name, &sc.name, &tt.name, &tc.name),
                tt.name.clone(),
                tc.name.clone(),
            ));
        }
    }

    for (index, name, constraint, target_table, target_column) in mirrors {
        let rel = &mut schema.relationships[index];
        rel.name = name;
        let previous = std::mem::replace(&mut rel.constraint_name, constraint.clone());
        let (table_id, column_id) = (rel.source_table_id.clone(), rel.source_column_id.clone());
        if let Some(column) = schema
            .table_mut(&table_id)
            .and_then(|t| t.column_mut(&column_id))
        {
            let chosen = column
                .constraint_name
                .clone()
                .filter(|current| column.is_foreign_key && *current != previous)
                .unwrap_or(constraint);
            column.set_foreign_key(&target_table, &target_column, &chosen);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, ConstraintKind};
    use crate::validate::{Severity, TargetPolicy, ValidationOptions};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// users(id PK, email) and orders(id PK, user_id)
    fn store() -> (SchemaStore, String, String) {
        let mut store = SchemaStore::new("shop");
        let users = store.add_table(
            TableSpec::new("users")
                .column(ColumnSpec::new("id", "INT").primary_key())
                .column(ColumnSpec::new("email", "VARCHAR(255)")),
        );
        let orders = store.add_table(
            TableSpec::new("orders")
                .column(ColumnSpec::new("id", "INT").primary_key())
                .column(ColumnSpec::new("user_id", "INT")),
        );
        (store, users, orders)
    }

    fn column_id(store: &SchemaStore, table_id: &str, name: &str) -> String {
        store
            .schema()
            .table(table_id)
            .and_then(|t| t.column_by_name(name))
            .map(|c| c.id.clone())
            .unwrap()
    }

    fn link(store: &mut SchemaStore, users: &str, orders: &str) -> String {
        let spec = RelationshipSpec {
            source_table_id: orders.to_string(),
            source_column_id: column_id(store, orders, "user_id"),
            target_table_id: users.to_string(),
            target_column_id: column_id(store, users, "id"),
            cardinality: Cardinality::OneToMany,
        };
        store.add_relationship(spec).unwrap()
    }

    #[test]
    fn test_new_store_is_clean() {
        let store = SchemaStore::new("empty");
        assert!(store.validate_schema().is_empty());
        assert!(store.diagnostics().is_empty());
        assert_eq!(store.schema().members.len(), 1);
    }

    #[test]
    fn test_add_relationship_mirrors_foreign_key() {
        let (mut store, users, orders) = store();
        let rel_id = link(&mut store, &users, &orders);

        let schema = store.schema();
        assert_eq!(schema.relationships.len(), 1);
        let rel = schema.relationship(&rel_id).unwrap();
        assert_eq!(rel.constraint_name, "FK_orders_user_id_users_id");
        assert_eq!(rel.cardinality, Cardinality::OneToMany);

        let user_id = schema.table(&orders).unwrap().column_by_name("user_id").unwrap();
        assert!(user_id.is_foreign_key);
        assert_eq!(user_id.referenced_table.as_deref(), Some("users"));
        assert_eq!(user_id.referenced_column.as_deref(), Some("id"));
        assert!(store.diagnostics().is_empty());
    }

    #[test]
    fn test_add_relationship_with_stale_id_is_noop() {
        let (mut store, users, orders) = store();
        let before = store.schema().clone();
        let spec = RelationshipSpec {
            source_table_id: orders.clone(),
            source_column_id: "gone".to_string(),
            target_table_id: users.clone(),
            target_column_id: column_id(&store, &users, "id"),
            cardinality: Cardinality::OneToOne,
        };

        assert_eq!(store.add_relationship(spec), None);
        assert_eq!(store.schema(), &before);
    }

    #[test]
    fn test_remove_relationship_clears_flags() {
        let (mut store, users, orders) = store();
        let rel_id = link(&mut store, &users, &orders);

        assert!(store.remove_relationship(&rel_id));
        let user_id = store.schema().table(&orders).unwrap().column_by_name("user_id").unwrap();
        assert!(!user_id.is_foreign_key);
        assert_eq!(user_id.constraint_name, None);
        assert!(!store.remove_relationship(&rel_id));
    }

    #[test]
    fn test_remove_table_cascades() {
        let (mut store, users, orders) = store();
        link(&mut store, &users, &orders);
        store.add_index(IndexSpec {
            name: "idx_users_email".to_string(),
            table_id: users.clone(),
            columns: vec!["email".to_string()],
            unique: true,
        });
        store.add_constraint(ConstraintSpec {
            name: "UQ_users_email".to_string(),
            table_id: users.clone(),
            columns: vec!["email".to_string()],
            kind: ConstraintKind::Unique,
        });

        assert!(store.remove_table(&users));
        let schema = store.schema();
        assert!(schema.relationships.iter().all(|r| !r.touches_table(&users)));
        assert!(schema.indexes.is_empty());
        assert!(schema.constraints.is_empty());
        assert!(!schema.table(&orders).unwrap().columns[1].is_foreign_key);
        assert!(store.validate_schema().is_empty());
        assert!(!store.remove_table(&users));
    }

    #[test]
    fn test_remove_column_prunes_relationships() {
        let (mut store, users, orders) = store();
        link(&mut store, &users, &orders);
        let users_pk = column_id(&store, &users, "id");

        assert!(store.remove_column(&users, &users_pk));
        assert!(store.schema().relationships.is_empty());
        assert!(!store.schema().table(&orders).unwrap().columns[1].is_foreign_key);
        assert!(!store.remove_column(&users, &users_pk));
    }

    #[test]
    fn test_duplicate_table_name_diagnostic() {
        let (mut store, _, _) = store();
        let dup = store.add_table(TableSpec::new("Users"));

        let diags = store.validate_schema();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].message, "Duplicate table name: Users");
        assert!(store.has_errors_for(&dup));

        store.update_table(&dup, TablePatch { name: Some("customers".to_string()), ..Default::default() });
        assert!(!store.has_errors_for(&dup));
    }

    #[test]
    fn test_rename_rederives_relationship_fields() {
        let (mut store, users, orders) = store();
        let rel_id = link(&mut store, &users, &orders);

        store.update_table(&users, TablePatch { name: Some("accounts".to_string()), ..Default::default() });

        let schema = store.schema();
        let rel = schema.relationship(&rel_id).unwrap();
        assert_eq!(rel.constraint_name, "FK_orders_user_id_accounts_id");
        assert_eq!(rel.name, "orders_accounts");
        let user_id = &schema.table(&orders).unwrap().columns[1];
        assert_eq!(user_id.referenced_table.as_deref(), Some("accounts"));
        assert!(store.diagnostics().is_empty());
    }

    #[test]
    fn test_update_relationship_moves_source() {
        let (mut store, users, orders) = store();
        let rel_id = link(&mut store, &users, &orders);
        let order_pk = column_id(&store, &orders, "id");

        let patch = RelationshipPatch {
            source_column_id: Some(order_pk.clone()),
            cardinality: Some(Cardinality::OneToOne),
            ..Default::default()
        };
        assert!(store.update_relationship(&rel_id, patch));

        let table = store.schema().table(&orders).unwrap();
        assert!(!table.column_by_name("user_id").unwrap().is_foreign_key);
        assert!(table.column(&order_pk).unwrap().is_foreign_key);
        assert_eq!(
            store.schema().relationship(&rel_id).unwrap().cardinality,
            Cardinality::OneToOne
        );

        let bad = RelationshipPatch {
            target_column_id: Some("missing".to_string()),
            ..Default::default()
        };
        assert!(!store.update_relationship(&rel_id, bad));
    }

    #[test]
    fn test_alter_add_primary_key() {
        let (mut store, users, _) = store();
        let c1 = column_id(&store, &users, "id");
        let c2 = column_id(&store, &users, "email");

        assert!(store.alter_table(&users, AlterOperation::AddPrimaryKey { column_ids: vec![c2.clone()] }));
        let table = store.schema().table(&users).unwrap();
        assert!(table.column(&c2).unwrap().is_primary_key);
        assert!(!table.column(&c1).unwrap().is_primary_key);
    }

    fn add_foreign_key(column_id: String, table: &str, constraint_name: Option<&str>) -> AlterOperation {
        AlterOperation::AddForeignKey {
            column_id,
            referenced_table: table.to_string(),
            referenced_column: "id".to_string(),
            constraint_name: constraint_name.map(str::to_string),
        }
    }

    #[test]
    fn test_alter_add_foreign_key_records_relationship() {
        let (mut store, users, orders) = store();
        let user_id = column_id(&store, &orders, "user_id");

        assert!(store.alter_table(&orders, add_foreign_key(user_id.clone(), "users", None)));

        let schema = store.schema();
        assert_eq!(schema.relationships.len(), 1);
        assert_eq!(schema.relationships[0].target_table_id, users);
        let column = schema.table(&orders).unwrap().column(&user_id).unwrap();
        assert_eq!(column.referenced_table.as_deref(), Some("users"));
        assert_eq!(column.constraint_name.as_deref(), Some("FK_orders_user_id_users_id"));
        assert!(store.diagnostics().is_empty());
    }

    #[test]
    fn test_alter_add_foreign_key_repoints_existing_relationship() {
        let (mut store, users, orders) = store();
        let accounts = store.add_table(TableSpec::new("accounts").column(ColumnSpec::new("id", "INT").primary_key()));
        let rel_id = link(&mut store, &users, &orders);
        let user_id = column_id(&store, &orders, "user_id");

        assert!(store.alter_table(&orders, add_foreign_key(user_id.clone(), "accounts", None)));

        let schema = store.schema();
        assert_eq!(schema.relationships.len(), 1);
        let rel = schema.relationship(&rel_id).unwrap();
        assert_eq!(rel.target_table_id, accounts);
        assert_eq!(rel.constraint_name, "FK_orders_user_id_accounts_id");
        let column = schema.table(&orders).unwrap().column(&user_id).unwrap();
        assert_eq!(column.referenced_table.as_deref(), Some("accounts"));
        assert_eq!(column.constraint_name.as_deref(), Some("FK_orders_user_id_accounts_id"));
    }

    #[test]
    fn test_alter_add_foreign_key_to_missing_table_drops_relationship() {
        let (mut store, users, orders) = store();
        link(&mut store, &users, &orders);
        let user_id = column_id(&store, &orders, "user_id");

        assert!(store.alter_table(&orders, add_foreign_key(user_id.clone(), "customers", None)));

        assert!(store.schema().relationships.is_empty());
        let column = store.schema().table(&orders).unwrap().column(&user_id).unwrap();
        assert_eq!(column.referenced_table.as_deref(), Some("customers"));
        assert_eq!(
            store.diagnostics()[0].message,
            "Foreign key orders.user_id references missing table customers"
        );
    }

    #[test]
    fn test_alter_custom_constraint_name_survives_until_dropped() {
        let (mut store, users, orders) = store();
        let user_id = column_id(&store, &orders, "user_id");

        store.alter_table(&orders, add_foreign_key(user_id.clone(), "users", Some("fk_user")));
        let column = store.schema().table(&orders).unwrap().column(&user_id).unwrap();
        assert_eq!(column.constraint_name.as_deref(), Some("fk_user"));
        assert_eq!(store.schema().relationships.len(), 1);

        // Renames re-derive the relationship but leave the chosen name alone
        store.update_table(&users, TablePatch { name: Some("people".to_string()), ..Default::default() });
        let column = store.schema().table(&orders).unwrap().column(&user_id).unwrap();
        assert_eq!(column.constraint_name.as_deref(), Some("fk_user"));
        assert_eq!(column.referenced_table.as_deref(), Some("people"));

        let drop = AlterOperation::DropForeignKey { constraint_name: "fk_user".to_string() };
        assert!(store.alter_table(&orders, drop.clone()));
        let column = store.schema().table(&orders).unwrap().column(&user_id).unwrap();
        assert!(!column.is_foreign_key);
        assert!(store.schema().relationships.is_empty());
        assert!(!store.alter_table(&orders, drop));
    }

    #[test]
    fn test_alter_drop_foreign_key_by_derived_name() {
        let (mut store, users, orders) = store();
        link(&mut store, &users, &orders);

        let drop = AlterOperation::DropForeignKey {
            constraint_name: "FK_orders_user_id_users_id".to_string(),
        };
        assert!(store.alter_table(&orders, drop));
        assert!(store.schema().relationships.is_empty());
        assert!(!store.schema().table(&orders).unwrap().columns[1].is_foreign_key);
    }

    #[test]
    fn test_alter_batch_validates_once() {
        let (mut store, users, _) = store();
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        store.subscribe(move |_, _| *counter.borrow_mut() += 1);

        let applied = store.alter_table_batch(
            &users,
            vec![
                AlterOperation::AddColumn(ColumnSpec::new("age", "INT")),
                AlterOperation::DropColumn { column_id: "missing".to_string() },
                AlterOperation::DropPrimaryKey,
            ],
        );
        assert_eq!(applied, 2);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_subscribers_see_diagnostics() {
        let mut store = SchemaStore::new("s");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = store.subscribe(move |schema, diags| {
            sink.borrow_mut().push((schema.tables.len(), diags.len()));
        });

        store.add_table(TableSpec::new("a"));
        store.add_table(TableSpec::new("A"));
        assert_eq!(*seen.borrow(), vec![(1, 0), (2, 1)]);

        assert!(store.unsubscribe(sub));
        store.add_table(TableSpec::new("b"));
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_duplicate_table() {
        let (mut store, users, orders) = store();
        link(&mut store, &users, &orders);

        let copy_id = store.duplicate_table(&orders).unwrap();
        let second = store.duplicate_table(&orders).unwrap();
        let schema = store.schema();
        let original = schema.table(&orders).unwrap();
        let copy = schema.table(&copy_id).unwrap();

        assert_eq!(copy.name, "orders_copy");
        assert_eq!(schema.table(&second).unwrap().name, "orders_copy2");
        assert_eq!(copy.columns.len(), original.columns.len());
        assert_ne!(copy.columns[0].id, original.columns[0].id);
        assert!(!copy.columns[1].is_foreign_key);
        assert_eq!(copy.position.x, original.position.x + DUPLICATE_OFFSET);
        assert_eq!(schema.relationships.len(), 1);
        assert_eq!(store.duplicate_table("missing"), None);
    }

    #[test]
    fn test_import_from_sql() {
        let mut store = SchemaStore::new("s");
        let report = store
            .import_from_sql("CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(255) NOT NULL);")
            .unwrap();

        assert_eq!(report.table_ids.len(), 1);
        let table = store.schema().table(&report.table_ids[0]).unwrap();
        assert_eq!(table.name, "t");
        assert_eq!(table.columns.len(), 2);
        assert!(table.column_by_name("id").unwrap().is_primary_key);
        assert!(!table.column_by_name("name").unwrap().nullable);
    }

    #[test]
    fn test_import_partial_success_and_references() {
        let mut store = SchemaStore::new("s");
        let sql = r#"
            CREATE TABLE users (id INT PRIMARY KEY);
            CREATE TABLE;
            CREATE TABLE orders (id INT PRIMARY KEY, user_id INT REFERENCES users(id));
            ALTER TABLE orders ADD COLUMN total INT;
        "#;

        let report = store.import_from_sql(sql).unwrap();
        assert_eq!(report.table_ids.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.alters.len(), 1);
        assert_eq!(report.relationship_ids.len(), 1);
        assert_eq!(store.schema().relationships[0].constraint_name, "FK_orders_user_id_users_id");
        assert!(store.diagnostics().is_empty());
    }

    #[test]
    fn test_import_nothing_parsed_commits_nothing() {
        let mut store = SchemaStore::new("s");
        let before = store.schema().clone();

        let err = store.import_from_sql("CREATE TABLE; SELECT 1;").unwrap_err();
        let ImportError::NothingParsed { skipped } = err;
        assert_eq!(skipped.len(), 1);
        assert_eq!(store.schema(), &before);
    }

    #[test]
    fn test_export_schema_mysql() {
        let mut store = SchemaStore::new("s");
        store.add_table(TableSpec::new("users").column(ColumnSpec::new("id", "INT").primary_key()));

        let sql = store.export_schema("mysql").unwrap();
        assert!(sql.contains("CREATE TABLE `users`"));
        assert!(sql.contains("`id` INT NOT NULL AUTO_INCREMENT PRIMARY KEY"));
        assert_eq!(store.export_schema("whatever").unwrap(), store.generate_sql());
        assert!(store.export_schema("mongodb").unwrap().contains("\"collections\""));
    }

    #[test]
    fn test_validation_policy_from_config() {
        let config = DesignerConfig {
            validation: ValidationOptions {
                primary_key_targets: TargetPolicy::Warn,
            },
            ..Default::default()
        };
        let mut store = SchemaStore::with_config("s", config);
        let users = store.add_table(
            TableSpec::new("users")
                .column(ColumnSpec::new("id", "INT").primary_key())
                .column(ColumnSpec::new("email", "TEXT")),
        );
        let orders = store.add_table(TableSpec::new("orders").column(ColumnSpec::new("email", "TEXT")));
        store.add_relationship(RelationshipSpec {
            source_table_id: orders.clone(),
            source_column_id: column_id(&store, &orders, "email"),
            target_table_id: users.clone(),
            target_column_id: column_id(&store, &users, "email"),
            cardinality: Cardinality::OneToOne,
        });

        assert_eq!(store.diagnostics().len(), 1);
        assert_eq!(store.diagnostics()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_json_persistence_round_trip() {
        let (mut store, users, orders) = store();
        link(&mut store, &users, &orders);

        let json = store.to_json().unwrap();
        let restored = SchemaStore::from_json(&json, DesignerConfig::default()).unwrap();
        assert_eq!(restored.schema(), store.schema());
        assert!(SchemaStore::from_json("{}", DesignerConfig::default()).is_err());
    }

    #[test]
    fn test_validate_relationship_and_table() {
        let (mut store, users, orders) = store();
        let rel_id = link(&mut store, &users, &orders);
        let rel = store.schema().relationship(&rel_id).unwrap().clone();
        assert!(store.validate_relationship(&rel).is_empty());

        let mut dangling = rel;
        dangling.target_table_id = "gone".to_string();
        assert_eq!(store.validate_relationship(&dangling).len(), 1);

        let table = store.schema().table(&users).unwrap().clone();
        assert!(store.validate_table(&table).is_empty());
    }
}
