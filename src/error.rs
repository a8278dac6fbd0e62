use thiserror::Error;

use crate::sql::SkippedStatement;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("No CREATE TABLE statement could be parsed ({} statement(s) skipped)", skipped.len())]
    NothingParsed { skipped: Vec<SkippedStatement> },
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Invalid schema document: {0}")]
    Json(#[from] serde_json::Error),
}
