//! Coarse classification of opaque SQL type tokens.

/// Broad type family of a column, derived from its SQL type token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Int,
    String,
    Bool,
    Date,
    Other,
}

impl TypeClass {
    /// Classify by string matching on the base type name.
    pub fn classify(sql_type: &str) -> Self {
        let lower = sql_type.to_lowercase();
        let base = lower.split('(').next().unwrap_or(&lower).trim();

        match base {
            b if b.starts_with("int") => Self::Int,
            "tinyint" | "smallint" | "mediumint" | "bigint" | "serial" | "bigserial" => Self::Int,
            b if b.starts_with("varchar") || b.contains("string") => Self::String,
            "text" | "char" | "nvarchar" | "nchar" | "uuid" => Self::String,
            b if b.starts_with("bool") => Self::Bool,
            b if b.starts_with("date") => Self::Date,
            _ => Self::Other,
        }
    }

    /// BSON type used for a property of this class. Unclassified types
    /// fall back to strings.
    pub fn bson_type(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::String | Self::Other => "string",
        }
    }
}
