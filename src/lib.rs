pub mod alter;
pub mod config;
pub mod emit;
pub mod error;
pub mod model;
pub mod sql;
pub mod store;
pub mod validate;

use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

pub use alter::AlterOperation;
pub use config::DesignerConfig;
pub use model::Schema;
pub use sql::Dialect;
pub use store::{ImportReport, SchemaStore};
pub use validate::{Diagnostic, Severity};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Convert DDL from one script into another dialect
#[wasm_bindgen(js_name = "convertDdl")]
pub fn convert_ddl(source: &str, dialect: &str) -> Result<String, String> {
    let mut store = SchemaStore::new("converted");
    store.import_from_sql(source).map_err(|e| e.to_string())?;
    store.export_schema(dialect).map_err(|e| e.to_string())
}

fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| e.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

/// Schema store handle for JavaScript. Structured arguments and results
/// travel as JSON strings.
#[wasm_bindgen]
pub struct SchemaDesigner {
    store: SchemaStore,
}

#[wasm_bindgen]
impl SchemaDesigner {
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, config: Option<String>) -> Result<SchemaDesigner, String> {
        let config = match config {
            Some(json) => DesignerConfig::from_json(&json).map_err(|e| e.to_string())?,
            None => DesignerConfig::default(),
        };
        Ok(Self {
            store: SchemaStore::with_config(name, config),
        })
    }

    #[wasm_bindgen(js_name = "fromJson")]
    pub fn from_json(schema: &str, config: Option<String>) -> Result<SchemaDesigner, String> {
        let config = match config {
            Some(json) => DesignerConfig::from_json(&json).map_err(|e| e.to_string())?,
            None => DesignerConfig::default(),
        };
        let store = SchemaStore::from_json(schema, config).map_err(|e| e.to_string())?;
        Ok(Self { store })
    }

    #[wasm_bindgen(js_name = "toJson")]
    pub fn to_json(&self) -> Result<String, String> {
        self.store.to_json().map_err(|e| e.to_string())
    }

    pub fn config(&self) -> Result<String, String> {
        to_json(self.store.config())
    }

    pub fn diagnostics(&self) -> Result<String, String> {
        to_json(self.store.diagnostics())
    }

    /// Register `callback(schemaJson, diagnosticsJson)`, called after every
    /// change. Returns an id for `offChange`.
    #[wasm_bindgen(js_name = "onChange")]
    pub fn on_change(&mut self, callback: js_sys::Function) -> usize {
        self.store.subscribe(move |schema, diagnostics| {
            let schema = serde_json::to_string(schema).unwrap_or_default();
            let diagnostics = serde_json::to_string(diagnostics).unwrap_or_default();
            let _ = callback.call2(
                &JsValue::NULL,
                &JsValue::from_str(&schema),
                &JsValue::from_str(&diagnostics),
            );
        })
    }

    #[wasm_bindgen(js_name = "offChange")]
    pub fn off_change(&mut self, id: usize) -> bool {
        self.store.unsubscribe(id)
    }

    #[wasm_bindgen(js_name = "addTable")]
    pub fn add_table(&mut self, spec: &str) -> Result<String, String> {
        Ok(self.store.add_table(from_json(spec)?))
    }

    #[wasm_bindgen(js_name = "removeTable")]
    pub fn remove_table(&mut self, id: &str) -> bool {
        self.store.remove_table(id)
    }

    #[wasm_bindgen(js_name = "updateTable")]
    pub fn update_table(&mut self, id: &str, patch: &str) -> Result<bool, String> {
        Ok(self.store.update_table(id, from_json(patch)?))
    }

    #[wasm_bindgen(js_name = "duplicateTable")]
    pub fn duplicate_table(&mut self, id: &str) -> Option<String> {
        self.store.duplicate_table(id)
    }

    #[wasm_bindgen(js_name = "alterTable")]
    pub fn alter_table(&mut self, table_id: &str, operation: &str) -> Result<bool, String> {
        Ok(self.store.alter_table(table_id, from_json(operation)?))
    }

    #[wasm_bindgen(js_name = "alterTableBatch")]
    pub fn alter_table_batch(&mut self, table_id: &str, operations: &str) -> Result<usize, String> {
        Ok(self.store.alter_table_batch(table_id, from_json(operations)?))
    }

    #[wasm_bindgen(js_name = "addColumn")]
    pub fn add_column(&mut self, table_id: &str, spec: &str) -> Result<Option<String>, String> {
        Ok(self.store.add_column(table_id, from_json(spec)?))
    }

    #[wasm_bindgen(js_name = "removeColumn")]
    pub fn remove_column(&mut self, table_id: &str, column_id: &str) -> bool {
        self.store.remove_column(table_id, column_id)
    }

    #[wasm_bindgen(js_name = "updateColumn")]
    pub fn update_column(&mut self, table_id: &str, column_id: &str, patch: &str) -> Result<bool, String> {
        Ok(self.store.update_column(table_id, column_id, from_json(patch)?))
    }

    #[wasm_bindgen(js_name = "addRelationship")]
    pub fn add_relationship(&mut self, spec: &str) -> Result<Option<String>, String> {
        Ok(self.store.add_relationship(from_json(spec)?))
    }

    #[wasm_bindgen(js_name = "removeRelationship")]
    pub fn remove_relationship(&mut self, id: &str) -> bool {
        self.store.remove_relationship(id)
    }

    #[wasm_bindgen(js_name = "updateRelationship")]
    pub fn update_relationship(&mut self, id: &str, patch: &str) -> Result<bool, String> {
        Ok(self.store.update_relationship(id, from_json(patch)?))
    }

    #[wasm_bindgen(js_name = "addIndex")]
    pub fn add_index(&mut self, spec: &str) -> Result<Option<String>, String> {
        Ok(self.store.add_index(from_json(spec)?))
    }

    #[wasm_bindgen(js_name = "removeIndex")]
    pub fn remove_index(&mut self, id: &str) -> bool {
        self.store.remove_index(id)
    }

    #[wasm_bindgen(js_name = "addConstraint")]
    pub fn add_constraint(&mut self, spec: &str) -> Result<Option<String>, String> {
        Ok(self.store.add_constraint(from_json(spec)?))
    }

    #[wasm_bindgen(js_name = "removeConstraint")]
    pub fn remove_constraint(&mut self, id: &str) -> bool {
        self.store.remove_constraint(id)
    }

    #[wasm_bindgen(js_name = "generateSql")]
    pub fn generate_sql(&self) -> String {
        self.store.generate_sql()
    }

    #[wasm_bindgen(js_name = "exportSchema")]
    pub fn export_schema(&self, dialect: &str) -> Result<String, String> {
        self.store.export_schema(dialect).map_err(|e| e.to_string())
    }

    #[wasm_bindgen(js_name = "validateSchema")]
    pub fn validate_schema(&self) -> Result<String, String> {
        to_json(&self.store.validate_schema())
    }

    /// Returns the import report as JSON.
    #[wasm_bindgen(js_name = "importFromSql")]
    pub fn import_from_sql(&mut self, text: &str) -> Result<String, String> {
        let report = self.store.import_from_sql(text).map_err(|e| e.to_string())?;
        to_json(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_ddl() {
        let out = convert_ddl("CREATE TABLE users (id INT PRIMARY KEY);", "sqlserver").unwrap();
        assert!(out.contains("CREATE TABLE [users]"));
        assert!(out.contains("IDENTITY(1,1) PRIMARY KEY"));
    }

    #[test]
    fn test_convert_ddl_without_tables() {
        let err = convert_ddl("SELECT 1;", "mysql").unwrap_err();
        assert!(err.starts_with("No CREATE TABLE statement could be parsed"));
    }

    #[test]
    fn test_designer_json_bridge() {
        let mut designer = SchemaDesigner::new("shop", None).unwrap();
        let users = designer
            .add_table(r#"{"name": "users", "columns": [{"name": "id", "type": "INT", "isPrimaryKey": true}]}"#)
            .unwrap();
        let column = designer
            .add_column(&users, r#"{"name": "email", "type": "TEXT"}"#)
            .unwrap();
        assert!(column.is_some());
        assert!(designer.add_table("not json").is_err());

        let restored = SchemaDesigner::from_json(&designer.to_json().unwrap(), None).unwrap();
        assert_eq!(restored.generate_sql(), designer.generate_sql());
        assert_eq!(designer.diagnostics().unwrap(), "[]");
    }

    #[test]
    fn test_designer_alter_operations_from_json() {
        let mut designer = SchemaDesigner::new("s", Some(r#"{"duplicateSuffix": "_v2"}"#.to_string())).unwrap();
        let table = designer.add_table(r#"{"name": "t", "columns": []}"#).unwrap();
        let applied = designer
            .alter_table_batch(
                &table,
                r#"[{"op": "ADD_COLUMN", "payload": {"name": "id", "type": "INT"}}, {"op": "DROP_PRIMARY_KEY"}]"#,
            )
            .unwrap();
        assert_eq!(applied, 2);

        let copy = designer.duplicate_table(&table).unwrap();
        assert_eq!(designer.store.schema().table(&copy).unwrap().name, "t_v2");
        assert!(designer.config().unwrap().contains(r#""duplicateSuffix":"_v2""#));
    }
}
