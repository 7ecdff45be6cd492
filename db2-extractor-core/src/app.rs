//! Action dispatch.
//!
//! [`Application`] runs the action named by the configuration and returns
//! the JSON-serializable response of that action.

use crate::catalog::CatalogIntrospector;
use crate::config::{Action, Config};
use crate::connection::Connection;
use crate::export::{Exporter, OutputPaths};
use crate::models::TableDefinition;
use crate::{ExtractorError, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Outcome status reported in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
}

/// Response of an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionResponse {
    /// `{"status": "success", "imported": [...]}`
    Run {
        status: Status,
        imported: Vec<String>,
    },
    /// `{"status": "success", "tables": [...]}`
    GetTables {
        status: Status,
        tables: Vec<TableDefinition>,
    },
    /// `{"status": "success"}`
    TestConnection { status: Status },
}

/// One extractor run over a live connection.
pub struct Application {
    config: Config,
    connection: Box<dyn Connection>,
    data_dir: PathBuf,
}

impl Application {
    /// Creates an application writing outputs below `data_dir`.
    pub fn new(config: Config, connection: Box<dyn Connection>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            connection,
            data_dir: data_dir.into(),
        }
    }

    /// The configuration this application runs.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the configured action.
    ///
    /// # Errors
    /// Returns the error of the failing action step.
    pub async fn run(&self) -> Result<ActionResponse> {
        info!(
            "Running action {} against {}",
            self.config.action,
            self.connection.describe()
        );

        match self.config.action {
            Action::Run => Ok(ActionResponse::Run {
                status: Status::Success,
                imported: self.export_tables().await?,
            }),
            Action::TestConnection => {
                self.test_connection().await?;
                Ok(ActionResponse::TestConnection {
                    status: Status::Success,
                })
            }
            Action::GetTables => Ok(ActionResponse::GetTables {
                status: Status::Success,
                tables: self.get_tables().await?,
            }),
        }
    }

    /// Exports every enabled table spec in configuration order.
    ///
    /// # Errors
    /// Stops at the first failing export and returns its error.
    pub async fn export_tables(&self) -> Result<Vec<String>> {
        let parameters = &self.config.parameters;
        let exporter = Exporter::new(
            self.connection.as_ref(),
            OutputPaths::tables_dir(&self.data_dir),
        )
        .with_query_mode(parameters.query_mode)
        .with_introspection(parameters.introspection)
        .with_csv_options(parameters.csv);

        let mut imported = Vec::new();
        for spec in &parameters.tables {
            if !spec.enabled {
                info!("Skipping disabled table [{}]", spec.name);
                continue;
            }
            imported.push(exporter.export(spec).await?);
        }

        Ok(imported)
    }

    /// Runs the connection's trivial query.
    ///
    /// # Errors
    /// Returns a connection error if the query fails.
    pub async fn test_connection(&self) -> Result<()> {
        self.connection
            .fetch_all(self.connection.test_query(), &[])
            .await
            .map_err(|e| ExtractorError::connection_failed(self.connection.describe(), e))?;
        Ok(())
    }

    /// Describes the catalog tables, restricted by `getTablesFilter`.
    ///
    /// # Errors
    /// Returns an unsupported feature error for databases without a `SYSCAT`
    /// catalog, or a catalog error if a catalog query fails.
    pub async fn get_tables(&self) -> Result<Vec<TableDefinition>> {
        if !self.connection.supports_catalog() {
            return Err(ExtractorError::unsupported_feature(
                "getTables",
                format!("{} has no SYSCAT catalog", self.connection.describe()),
            ));
        }

        let parameters = &self.config.parameters;
        CatalogIntrospector::new(self.connection.as_ref(), parameters.introspection)
            .list_tables(parameters.get_tables_filter.as_deref())
            .await
    }
}
