//! MongoDB `$jsonSchema` emitter.

use serde_json::{Map, Value, json};

use super::EmitError;
use crate::model::{Schema, Table};
use crate::sql::TypeClass;

/// One collection per table, with a validator derived from the columns
/// and the table's indexes carried through.
pub fn emit_mongo(schema: &Schema) -> Result<String, EmitError> {
    let collections: Vec<Value> = schema
        .tables
        .iter()
        .map(|table| collection(schema, table))
        .collect();

    let document = json!({
        "database": schema.name,
        "collections": collections,
    });
    Ok(serde_json::to_string_pretty(&document)?)
}

fn collection(schema: &Schema, table: &Table) -> Value {
    let required: Vec<&str> = table
        .columns
        .iter()
        .filter(|c| !c.nullable)
        .map(|c| c.name.as_str())
        .collect();

    let mut properties = Map::new();
    for column in &table.columns {
        properties.insert(
            column.name.clone(),
            json!({
                "bsonType": TypeClass::classify(&column.data_type).bson_type(),
                "description": column.data_type,
            }),
        );
    }

    let indexes: Vec<Value> = schema
        .indexes
        .iter()
        .filter(|index| index.table_id == table.id)
        .map(|index| {
            let key: Map<String, Value> = index
                .columns
                .iter()
                .map(|c| (c.clone(), json!(1)))
                .collect();
            json!({
                "key": key,
                "unique": index.unique,
                "name": index.name,
            })
        })
        .collect();

    json!({
        "name": table.name,
        "validator": {
            "$jsonSchema": {
                "bsonType": "object",
                "required": required,
                "properties": properties,
            }
        },
        "indexes": indexes,
    })
}
