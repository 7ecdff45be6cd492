//! DB2 type name normalization.

use serde::{Deserialize, Serialize};

/// Storage-independent type family of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BaseType {
    Integer,
    Numeric,
    Float,
    Boolean,
    Date,
    Timestamp,
    String,
}

impl BaseType {
    /// Name used in metadata values.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Numeric => "NUMERIC",
            Self::Float => "FLOAT",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::String => "STRING",
        }
    }
}

impl std::fmt::Display for BaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `type_name` carries a precision and a scale.
pub fn is_decimal_family(type_name: &str) -> bool {
    matches!(
        type_name.trim().to_ascii_uppercase().as_str(),
        "DECIMAL" | "NUMERIC"
    )
}

/// Renders a column length.
///
/// DECIMAL family types with a nonzero scale become `precision,scale`,
/// everything else the bare length.
pub fn normalize_length(type_name: &str, length: &str, scale: i64) -> String {
    let length = length.trim();
    if scale != 0 && is_decimal_family(type_name) {
        format!("{},{}", length, scale)
    } else {
        length.to_string()
    }
}

/// Maps a DB2 type name to its base type.
///
/// Anything not listed is `STRING`: character and graphic types, LOBs, XML
/// and binary columns. `SYSCAT.COLUMNS` reports `CHAR FOR BIT DATA` as
/// `CHARACTER` with a code page of 0, so it lands there too.
pub fn map_db2_type(type_name: &str) -> BaseType {
    match type_name.trim().to_ascii_uppercase().as_str() {
        "SMALLINT" | "INTEGER" | "INT" | "BIGINT" => BaseType::Integer,
        "DECIMAL" | "NUMERIC" | "DECFLOAT" => BaseType::Numeric,
        "REAL" | "DOUBLE" | "FLOAT" => BaseType::Float,
        "BOOLEAN" => BaseType::Boolean,
        "DATE" => BaseType::Date,
        "TIMESTAMP" | "TIMESTMP" | "TIME" => BaseType::Timestamp,
        _ => BaseType::String,
    }
}
