//! Designer settings, loadable from a JSON file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sql::Dialect;
use crate::validate::ValidationOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignerConfig {
    #[serde(flatten)]
    pub validation: ValidationOptions,
    /// Appended to a table's name when it is duplicated.
    pub duplicate_suffix: String,
    pub default_dialect: Dialect,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            validation: ValidationOptions::default(),
            duplicate_suffix: "_copy".to_string(),
            default_dialect: Dialect::Generic,
        }
    }
}

impl DesignerConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }
}
