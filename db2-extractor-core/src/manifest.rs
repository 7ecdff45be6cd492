//! Manifest generation and persistence.
//!
//! A manifest is the JSON sidecar of an exported CSV file. It names the
//! destination table and, when the export referenced a catalog table,
//! carries table and column metadata under `KBC.` keys.

use crate::catalog::map_db2_type;
use crate::models::{ColumnDefinition, TableDefinition, TableSpec};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Prefix of every metadata key.
const KEY_PREFIX: &str = "KBC.";

/// Prefix of the datatype metadata keys.
const DATATYPE_PREFIX: &str = "KBC.datatype.";

/// One `{key, value}` metadata pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: Value,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Manifest of one exported table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub destination: String,
    pub incremental: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<MetadataEntry>>,
    /// Per-column metadata in catalog ordinal order, serialized as an object
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_column_metadata"
    )]
    pub column_metadata: Option<Vec<(String, Vec<MetadataEntry>)>>,
}

fn serialize_column_metadata<S>(
    columns: &Option<Vec<(String, Vec<MetadataEntry>)>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match columns {
        Some(columns) => {
            let mut map = serializer.serialize_map(Some(columns.len()))?;
            for (name, entries) in columns {
                map.serialize_entry(name, entries)?;
            }
            map.end()
        }
        None => serializer.serialize_none(),
    }
}

impl Manifest {
    /// Metadata entries of a column, if the manifest carries them.
    pub fn column(&self, name: &str) -> Option<&[MetadataEntry]> {
        self.column_metadata
            .as_ref()?
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Serializes the manifest as compact JSON.
    ///
    /// # Errors
    /// Returns the serializer error, which only occurs for non-string map keys.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Writes the manifest to `path` through a temporary sibling file that
    /// is renamed into place, so readers never see a partial manifest.
    ///
    /// # Errors
    /// Returns the I/O error of the failing step. The temporary file is
    /// removed on failure.
    pub fn persist(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        let tmp_path = temporary_path(path);

        let written = std::fs::File::create(&tmp_path).and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        });
        let result = written.and_then(|()| std::fs::rename(&tmp_path, path));

        if result.is_err() {
            let _ = std::fs::remove_file(&tmp_path);
        }
        result
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Derives manifests from table specs and catalog definitions.
pub struct ManifestBuilder;

impl ManifestBuilder {
    /// Builds the manifest of `spec`.
    ///
    /// Table and column metadata are included only when the rows come from
    /// a catalog table (no free-form query) and its `definition` is known.
    /// With a column list only those columns are described, in catalog order.
    pub fn build(spec: &TableSpec, definition: Option<&TableDefinition>) -> Manifest {
        let mut manifest = Manifest {
            destination: spec.output_table.clone(),
            incremental: spec.incremental,
            primary_key: spec.primary_key.clone(),
            metadata: None,
            column_metadata: None,
        };

        let from_table = spec.table.is_some() && spec.free_query().is_none();
        if let (true, Some(definition)) = (from_table, definition) {
            manifest.metadata = Some(Self::table_metadata(definition));
            manifest.column_metadata = Some(
                definition
                    .columns
                    .iter()
                    .filter(|column| spec.columns.is_empty() || spec.columns.contains(&column.name))
                    .map(|column| (column.name.clone(), Self::column_metadata(column)))
                    .collect(),
            );
        }

        manifest
    }

    /// Table-level entries: every table field except the columns.
    pub fn table_metadata(definition: &TableDefinition) -> Vec<MetadataEntry> {
        vec![
            MetadataEntry::new("KBC.name", definition.name.as_str()),
            MetadataEntry::new("KBC.schema", definition.schema.clone()),
            MetadataEntry::new("KBC.type", definition.kind.as_str()),
        ]
    }

    /// Datatype entries followed by the remaining column fields.
    pub fn column_metadata(column: &ColumnDefinition) -> Vec<MetadataEntry> {
        let mut entries = Self::datatype_metadata(column);

        let mut push = |key: &str, value: Value| {
            entries.push(MetadataEntry::new(format!("{}{}", KEY_PREFIX, key), value));
        };
        push("primaryKey", json!(column.primary_key));
        push("ordinalPosition", json!(column.ordinal_position));
        if let Some(indexed) = column.indexed {
            push("indexed", json!(indexed));
        }
        if let Some(unique_key) = column.unique_key {
            push("uniqueKey", json!(unique_key));
        }
        if let Some(table) = &column.foreign_key_ref_table {
            push("foreignKeyRefTable", json!(table));
        }
        if let Some(key) = &column.foreign_key_ref {
            push("foreignKeyRef", json!(key));
        }

        entries
    }

    /// `KBC.datatype.*` entries of a column.
    pub fn datatype_metadata(column: &ColumnDefinition) -> Vec<MetadataEntry> {
        let key = |name: &str| format!("{}{}", DATATYPE_PREFIX, name);

        let mut entries = vec![
            MetadataEntry::new(key("type"), column.data_type.as_str()),
            MetadataEntry::new(key("nullable"), column.nullable),
            MetadataEntry::new(key("basetype"), map_db2_type(&column.data_type).as_str()),
        ];
        if !column.length.is_empty() {
            entries.push(MetadataEntry::new(key("length"), column.length.as_str()));
        }
        if let Some(default) = column.default.as_deref() {
            entries.push(MetadataEntry::new(key("default"), default));
        }

        entries
    }
}
