//! Extractor configuration.
//!
//! The configuration is the `config.json` document found in the data
//! directory. It names the action to run, the database to connect to and
//! the table specs to export.
//!
//! # Module Structure
//! - `connection`: database parameters and zeroizing credentials

use crate::models::{QueryMode, TableRef, TableSpec};
use crate::{ExtractorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod connection;

pub use connection::{Credentials, DEFAULT_DB2_PORT, DbParameters, Driver};

/// Name of the configuration file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Action requested by the configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Export every enabled table spec
    #[default]
    Run,
    /// Verify the database answers a trivial query
    TestConnection,
    /// Describe the catalog tables
    GetTables,
}

impl Action {
    /// Whether the action answers with a JSON document on stdout.
    pub fn prints_response(&self) -> bool {
        !matches!(self, Self::Run)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::TestConnection => write!(f, "testConnection"),
            Self::GetTables => write!(f, "getTables"),
        }
    }
}

/// How column metadata is pulled from the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntrospectionStrategy {
    /// One column query for all discovered tables
    #[default]
    Bulk,
    /// One column query per discovered table
    PerTable,
}

/// When CSV fields are wrapped in quotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuoteStyle {
    /// Only fields containing the delimiter, quotes or line breaks
    #[default]
    Necessary,
    /// Every field
    Always,
}

impl From<QuoteStyle> for csv::QuoteStyle {
    fn from(style: QuoteStyle) -> Self {
        match style {
            QuoteStyle::Necessary => csv::QuoteStyle::Necessary,
            QuoteStyle::Always => csv::QuoteStyle::Always,
        }
    }
}

/// Output file dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvOptions {
    pub delimiter: char,
    pub quote_style: QuoteStyle,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote_style: QuoteStyle::Necessary,
        }
    }
}

impl CsvOptions {
    /// Delimiter as the single byte the CSV writer expects.
    ///
    /// # Errors
    /// Returns a configuration error for non-ASCII delimiters.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                ExtractorError::configuration(format!(
                    "CSV delimiter '{}' must be a single ASCII character",
                    self.delimiter
                ))
            })
    }
}

/// The `parameters` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    #[serde(skip_serializing)]
    pub db: DbParameters,
    #[serde(default)]
    pub tables: Vec<TableSpec>,
    #[serde(default)]
    pub query_mode: QueryMode,
    #[serde(default)]
    pub introspection: IntrospectionStrategy,
    #[serde(default)]
    pub csv: CsvOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get_tables_filter: Option<Vec<TableRef>>,
}

impl Parameters {
    /// Creates parameters for a database with no table specs.
    pub fn new(db: DbParameters) -> Self {
        Self {
            db,
            tables: Vec::new(),
            query_mode: QueryMode::default(),
            introspection: IntrospectionStrategy::default(),
            csv: CsvOptions::default(),
            get_tables_filter: None,
        }
    }

    /// Builder method to set the table specs.
    pub fn with_tables(mut self, tables: Vec<TableSpec>) -> Self {
        self.tables = tables;
        self
    }

    /// Builder method to set the query mode.
    pub fn with_query_mode(mut self, query_mode: QueryMode) -> Self {
        self.query_mode = query_mode;
        self
    }

    /// Builder method to set the introspection strategy.
    pub fn with_introspection(mut self, introspection: IntrospectionStrategy) -> Self {
        self.introspection = introspection;
        self
    }
}

/// The complete configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub action: Action,
    pub parameters: Parameters,
}

impl Config {
    /// Creates a configuration for one action.
    pub fn new(action: Action, parameters: Parameters) -> Self {
        Self { action, parameters }
    }

    /// Parses a configuration document.
    ///
    /// # Errors
    /// Returns a configuration error if the JSON is malformed or does not
    /// have the expected shape.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ExtractorError::configuration(format!("Invalid configuration: {}", e)))
    }

    /// Loads `config.json` from the data directory.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read and a configuration
    /// error if it cannot be parsed.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let json = std::fs::read_to_string(&path).map_err(|e| ExtractorError::Io {
            context: format!("Failed to read configuration file {}", path.display()),
            source: e,
        })?;
        Self::from_json(&json)
    }

    /// Validates the parts of the configuration every action depends on.
    ///
    /// # Errors
    /// Returns the first configuration problem found.
    pub fn validate(&self) -> Result<()> {
        self.parameters.db.validate()?;
        self.parameters.csv.delimiter_byte()?;
        Ok(())
    }
}
