//! Export of one table spec to a CSV file and its manifest.

use crate::catalog::CatalogIntrospector;
use crate::config::{CsvOptions, IntrospectionStrategy};
use crate::connection::Connection;
use crate::manifest::ManifestBuilder;
use crate::models::{QueryMode, TableDefinition, TableSpec};
use crate::query::QueryBuilder;
use crate::writer::RowStreamWriter;
use crate::{ExtractorError, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Locations of the files produced for one output table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub data: PathBuf,
    pub manifest: PathBuf,
}

impl OutputPaths {
    /// Directory receiving output tables below the data directory.
    pub fn tables_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("out").join("tables")
    }

    /// `<dir>/<output table>.csv` and `<dir>/<output table>.csv.manifest`.
    pub fn new(tables_dir: &Path, output_table: &str) -> Self {
        let data = tables_dir.join(format!("{}.csv", output_table));
        let manifest = tables_dir.join(format!("{}.csv.manifest", output_table));
        Self { data, manifest }
    }
}

/// Runs exports against one connection.
pub struct Exporter<'c> {
    connection: &'c dyn Connection,
    tables_dir: PathBuf,
    query_mode: QueryMode,
    introspection: IntrospectionStrategy,
    csv: CsvOptions,
}

impl<'c> Exporter<'c> {
    /// Creates an exporter writing into `tables_dir`.
    pub fn new(connection: &'c dyn Connection, tables_dir: impl Into<PathBuf>) -> Self {
        Self {
            connection,
            tables_dir: tables_dir.into(),
            query_mode: QueryMode::default(),
            introspection: IntrospectionStrategy::default(),
            csv: CsvOptions::default(),
        }
    }

    /// Builder method to set the query mode.
    pub fn with_query_mode(mut self, query_mode: QueryMode) -> Self {
        self.query_mode = query_mode;
        self
    }

    /// Builder method to set the introspection strategy used for manifests.
    pub fn with_introspection(mut self, introspection: IntrospectionStrategy) -> Self {
        self.introspection = introspection;
        self
    }

    /// Builder method to set the CSV dialect.
    pub fn with_csv_options(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    /// Exports `spec` and returns its output table name.
    ///
    /// The data file is written even for an empty result, in which case it
    /// holds neither header nor rows. The manifest is written last.
    ///
    /// # Errors
    /// - Configuration error when `outputTable` is missing or no SQL can
    ///   be resolved
    /// - Query error when the statement or a fetch fails
    /// - Schema drift error when a row does not match the header
    /// - Manifest error, carrying the spec, when the manifest cannot be written
    pub async fn export(&self, spec: &TableSpec) -> Result<String> {
        if spec.output_table.trim().is_empty() {
            return Err(ExtractorError::configuration(
                "Missing attribute 'outputTable'",
            ));
        }
        let output_table = &spec.output_table;

        let source = spec.export_source(self.query_mode)?;
        let sql = QueryBuilder::build(&source);

        info!("Exporting to {}", output_table);
        std::fs::create_dir_all(&self.tables_dir).map_err(|e| ExtractorError::Io {
            context: format!(
                "Failed to create output directory {}",
                self.tables_dir.display()
            ),
            source: e,
        })?;
        let paths = OutputPaths::new(&self.tables_dir, output_table);
        let mut writer = RowStreamWriter::create(&paths.data, &self.csv, spec.name.as_str())?;

        {
            let mut rows = self
                .connection
                .query(&sql, &[])
                .await
                .map_err(|e| ExtractorError::query_failed(&spec.name, e))?;

            let first = rows
                .next()
                .await
                .transpose()
                .map_err(|e| ExtractorError::query_failed(&spec.name, e))?;

            match first {
                Some(row) if !row.is_empty() => {
                    writer.write_row(&row)?;
                    while let Some(row) = rows.next().await {
                        let row = row.map_err(|e| ExtractorError::query_failed(&spec.name, e))?;
                        writer.write_row(&row)?;
                    }
                }
                _ => warn!("Query returned empty result. Nothing was imported."),
            }
        }

        let summary = writer.finish()?;
        info!(
            "Exported {} rows to {}",
            summary.rows,
            paths.data.display()
        );

        let definition = self.table_definition(spec).await?;
        let manifest = ManifestBuilder::build(spec, definition.as_ref());
        manifest.persist(&paths.manifest).map_err(|e| {
            ExtractorError::manifest_failed(
                format!("Failed to write {}", paths.manifest.display()),
                serde_json::json!({ "table": spec }),
                Some(e),
            )
        })?;
        debug!("Manifest written to {}", paths.manifest.display());

        Ok(output_table.clone())
    }

    /// Catalog definition of the table `spec` references, if any.
    async fn table_definition(&self, spec: &TableSpec) -> Result<Option<TableDefinition>> {
        let Some(table) = &spec.table else {
            return Ok(None);
        };
        if spec.free_query().is_some() {
            return Ok(None);
        }

        if !self.connection.supports_catalog() {
            warn!(
                "{} has no SYSCAT catalog, manifest of {} carries no column metadata",
                self.connection.describe(),
                spec.output_table
            );
            return Ok(None);
        }

        let definition = CatalogIntrospector::new(self.connection, self.introspection)
            .describe_table(table)
            .await?;
        if definition.is_none() {
            warn!(
                "Table {} not found in catalog, manifest of {} carries no column metadata",
                table, spec.output_table
            );
        }

        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_paths() {
        let tables_dir = OutputPaths::tables_dir(Path::new("/data"));
        assert_eq!(tables_dir, PathBuf::from("/data/out/tables"));

        let paths = OutputPaths::new(&tables_dir, "in.c-main.sales");
        assert_eq!(
            paths.data,
            PathBuf::from("/data/out/tables/in.c-main.sales.csv")
        );
        assert_eq!(
            paths.manifest,
            PathBuf::from("/data/out/tables/in.c-main.sales.csv.manifest")
        );
    }
}
