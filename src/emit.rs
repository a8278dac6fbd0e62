//! IR-to-text emitters.
//!
//! Every SQL dialect goes through one IR walk parameterized by
//! [`Dialect`]; the MongoDB output is a JSON document and has its own
//! emitter. Emitters only read the schema, and the same schema always
//! produces the same text.

mod mongo;
mod sql;

pub use mongo::emit_mongo;
pub use sql::emit_sql;

use thiserror::Error;

use crate::model::Schema;
use crate::sql::Dialect;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Failed to encode document schema: {0}")]
    Json(#[from] serde_json::Error),
}

/// Render the schema in the given dialect.
pub fn emit(schema: &Schema, dialect: Dialect) -> Result<String, EmitError> {
    match dialect {
        Dialect::MongoDB => emit_mongo(schema),
        sql_dialect => Ok(emit_sql(schema, sql_dialect)),
    }
}
