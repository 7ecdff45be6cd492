//! Core data models for export requests and catalog metadata.
//!
//! `TableSpec` describes one configured export. `TableDefinition` and
//! `ColumnDefinition` are the normalized catalog description produced by
//! introspection and consumed by the manifest builder. All catalog models
//! serialize with the camelCase field names of the `getTables` response.

use crate::{ExtractorError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Schema-qualified reference to a catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    pub schema: String,
    pub table_name: String,
}

impl TableRef {
    /// Creates a new table reference.
    pub fn new(schema: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table_name: table_name.into(),
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table_name)
    }
}

/// Whether a free-form query is mandatory for every table spec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryMode {
    /// Build `SELECT ... FROM schema.table` when no query is configured
    #[default]
    Simple,
    /// Every table spec must carry its own query
    QueryRequired,
}

/// Source of the rows of one export, resolved once per table spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSource {
    /// Free-form SQL executed verbatim
    FreeQuery(String),
    /// Simple select over a catalog table, optionally restricted to columns
    TableRef { table: TableRef, columns: Vec<String> },
}

/// One configured export request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableRef>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub output_table: String,
    #[serde(default)]
    pub incremental: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub primary_key: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TableSpec {
    /// Creates a spec exporting a whole catalog table.
    pub fn for_table(name: impl Into<String>, table: TableRef, output_table: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            query: None,
            table: Some(table),
            columns: Vec::new(),
            output_table: output_table.into(),
            incremental: false,
            primary_key: Vec::new(),
            enabled: true,
        }
    }

    /// Creates a spec exporting the result of a free-form query.
    pub fn for_query(name: impl Into<String>, query: impl Into<String>, output_table: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            query: Some(query.into()),
            table: None,
            columns: Vec::new(),
            output_table: output_table.into(),
            incremental: false,
            primary_key: Vec::new(),
            enabled: true,
        }
    }

    /// Builder method to restrict the exported columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the primary key.
    pub fn with_primary_key<I, S>(mut self, primary_key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = primary_key.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to mark the export as incremental.
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Returns the configured query when it is present and non-blank.
    pub fn free_query(&self) -> Option<&str> {
        self.query
            .as_deref()
            .filter(|query| !query.trim().is_empty())
    }

    /// Resolves where the exported rows come from.
    ///
    /// # Errors
    /// Returns a configuration error if the spec carries neither a usable
    /// query nor a table reference, or if `mode` requires a query and none
    /// was given.
    pub fn export_source(&self, mode: QueryMode) -> Result<ExportSource> {
        if let Some(query) = self.free_query() {
            return Ok(ExportSource::FreeQuery(query.to_string()));
        }

        match (mode, &self.table) {
            (QueryMode::QueryRequired, _) => Err(ExtractorError::configuration(format!(
                "Missing attribute 'query' in table [{}]",
                self.name
            ))),
            (QueryMode::Simple, Some(table)) => {
                if table.schema.is_empty() || table.table_name.is_empty() {
                    return Err(ExtractorError::configuration(format!(
                        "Table [{}] must define both 'schema' and 'tableName'",
                        self.name
                    )));
                }
                Ok(ExportSource::TableRef {
                    table: table.clone(),
                    columns: self.columns.clone(),
                })
            }
            (QueryMode::Simple, None) => Err(ExtractorError::configuration(format!(
                "Table [{}] must define either 'query' or 'table'",
                self.name
            ))),
        }
    }
}

/// Kind of a catalog table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableKind {
    Table,
    View,
    /// Catalog code with no normalized counterpart, passed through verbatim
    Other(String),
}

impl TableKind {
    /// Normalizes a `SYSCAT.TABLES.TYPE` code.
    ///
    /// `T`/`U` are tables, `V`/`W` views, anything else passes through.
    pub fn from_catalog_code(code: &str) -> Self {
        match code.trim() {
            "T" | "U" => Self::Table,
            "V" | "W" => Self::View,
            other => Self::Other(other.to_string()),
        }
    }

    /// Name used in serialized output.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TableKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TableKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(match value.as_str() {
            "TABLE" => Self::Table,
            "VIEW" => Self::View,
            _ => Self::Other(value),
        })
    }
}

/// Column description built from catalog rows.
///
/// Field order is the natural order used when column metadata is emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub length: String,
    pub primary_key: bool,
    pub ordinal_position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_ref_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key_ref: Option<String>,
}

/// Table description built from catalog rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub schema: Option<String>,
    #[serde(rename = "type")]
    pub kind: TableKind,
    /// Columns sorted by ordinal position
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    /// Finds a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Returns true when this definition describes the referenced table.
    pub fn matches(&self, table: &TableRef) -> bool {
        self.name == table.table_name && self.schema.as_deref() == Some(table.schema.as_str())
    }
}
