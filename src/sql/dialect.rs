//! Target dialects and the syntax each one varies.

use serde::{Deserialize, Serialize};

/// Output dialect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Standard SQL
    #[default]
    Generic,
    MySQL,
    PostgreSQL,
    SqlServer,
    Oracle,
    /// MongoDB JSON Schema; not SQL at all
    MongoDB,
}

impl Dialect {
    /// Parse dialect from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "generic" | "sql" | "ansi" => Some(Self::Generic),
            "mysql" => Some(Self::MySQL),
            "postgres" | "postgresql" => Some(Self::PostgreSQL),
            "sqlserver" | "mssql" => Some(Self::SqlServer),
            "oracle" => Some(Self::Oracle),
            "mongodb" | "mongo" => Some(Self::MongoDB),
            _ => None,
        }
    }

    /// Unknown names fall back to generic SQL.
    pub fn from_name_or_generic(s: &str) -> Self {
        Self::from_str(s).unwrap_or_default()
    }

    /// Quote an identifier, doubling any embedded closing quote.
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Self::MySQL => format!("`{}`", ident.replace('`', "``")),
            Self::PostgreSQL | Self::Oracle => format!("\"{}\"", ident.replace('"', "\"\"")),
            Self::SqlServer => format!("[{}]", ident.replace(']', "]]")),
            Self::Generic | Self::MongoDB => ident.to_string(),
        }
    }

    pub fn primary_key_clause(&self) -> &'static str {
        match self {
            Self::MySQL => "AUTO_INCREMENT PRIMARY KEY",
            Self::SqlServer => "IDENTITY(1,1) PRIMARY KEY",
            _ => "PRIMARY KEY",
        }
    }

    /// Appended after the closing parenthesis of CREATE TABLE.
    pub fn table_suffix(&self) -> &'static str {
        match self {
            Self::MySQL => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            _ => "",
        }
    }
}
