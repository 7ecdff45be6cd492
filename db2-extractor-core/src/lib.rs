//! Core library of the DB2 extractor.
//!
//! The extractor exports query results from a DB2 database into CSV files,
//! each with a JSON manifest sidecar, and describes the database catalog.
//!
//! # Security Guarantees
//! - Passwords live in zeroizing containers and are never logged or serialized
//! - Connection strings are redacted before they reach an error message
//! - All database operations are read-only
//!
//! # Architecture
//! - [`connection`]: the seam to database drivers, with a factory per driver
//! - [`query`]: builds the simple `SELECT` for table specs without a query
//! - [`writer`]: streams rows into a CSV file
//! - [`catalog`]: reconstructs table definitions from the `SYSCAT` catalog
//! - [`manifest`]: derives and persists the manifest of an exported table
//! - [`export`]: composes the above into the export of one table spec
//! - [`app`]: dispatches the configured action

pub mod app;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod logging;
pub mod manifest;
pub mod models;
pub mod query;
pub mod writer;

// Re-export commonly used types
pub use app::{ActionResponse, Application};
pub use catalog::CatalogIntrospector;
pub use config::{Action, Config, DbParameters, Driver, IntrospectionStrategy, Parameters};
pub use connection::{Connection, Row, RowStream, connect};
pub use error::{DriverError, DriverResult, ErrorKind, ExtractorError, Result};
pub use export::{Exporter, OutputPaths};
pub use manifest::{Manifest, ManifestBuilder, MetadataEntry};
pub use models::{
    ColumnDefinition, ExportSource, QueryMode, TableDefinition, TableKind, TableRef, TableSpec,
};
pub use query::QueryBuilder;
pub use writer::{RowStreamWriter, WriteSummary};
