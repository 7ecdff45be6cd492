//! SQLite connection through sqlx.
//!
//! Used for local runs and the test-suite. SQLite has no `SYSCAT` catalog,
//! so `getTables` is only meaningful against DB2.
//!
//! # Connection Modes
//! - File-based: `sqlite:///path/to/database.db` or a plain file path
//! - In-memory: `sqlite::memory:` or `:memory:`

use super::{Connection, Row, RowStream};
use crate::{DriverError, DriverResult, ExtractorError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _};
use std::str::FromStr;

/// Connection to a SQLite database.
///
/// A single pooled connection is kept for the whole run, which also keeps
/// in-memory databases alive between queries.
pub struct SqliteConnection {
    pool: SqlitePool,
    database: String,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Opens an existing database read-only.
    ///
    /// # Errors
    /// Returns a connection error if the database does not exist or cannot
    /// be opened.
    pub async fn open(database: &str) -> Result<Self> {
        let options = parse_options(database)?.read_only(true);
        Self::connect_with(database, options).await
    }

    /// Opens a database read-write, creating it when missing.
    ///
    /// # Errors
    /// Returns a connection error if the database cannot be created.
    pub async fn create(database: &str) -> Result<Self> {
        let options = parse_options(database)?.create_if_missing(true);
        Self::connect_with(database, options).await
    }

    async fn connect_with(database: &str, options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                ExtractorError::connection_failed(
                    format!("Failed to open SQLite database {}", database),
                    Box::new(e),
                )
            })?;

        Ok(Self {
            pool,
            database: database.to_string(),
        })
    }

    /// Executes a statement that returns no rows, such as DDL used to seed
    /// a database.
    ///
    /// # Errors
    /// Returns the driver error if the statement fails.
    pub async fn execute(&self, sql: &str) -> DriverResult<u64> {
        let result = sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Closes the connection gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn query<'a>(&'a self, sql: &'a str, params: &'a [String]) -> DriverResult<RowStream<'a>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.as_str());
        }

        let stream = query
            .fetch(&self.pool)
            .map(|row| {
                row.map(|row| convert_row(&row))
                    .map_err(|e| Box::new(e) as DriverError)
            });

        Ok(stream.boxed())
    }

    fn test_query(&self) -> &'static str {
        "SELECT 1"
    }

    fn supports_catalog(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        format!("sqlite://{}", self.database)
    }
}

fn parse_options(database: &str) -> Result<SqliteConnectOptions> {
    SqliteConnectOptions::from_str(&normalize_connection_string(database)).map_err(|e| {
        ExtractorError::configuration(format!("Invalid SQLite connection string: {}", e))
    })
}

/// Normalizes a path or URL to the SQLite URL format.
fn normalize_connection_string(database: &str) -> String {
    if database == ":memory:" {
        return "sqlite::memory:".to_string();
    }

    if database.starts_with("sqlite:") {
        return database.to_string();
    }

    format!("sqlite://{}", database)
}

fn convert_row(row: &SqliteRow) -> Row {
    Row::new(
        row.columns()
            .iter()
            .map(|column| {
                (
                    column.name().to_string(),
                    extract_column_value(row, column.ordinal()),
                )
            })
            .collect(),
    )
}

/// Renders a dynamically typed SQLite value as text.
fn extract_column_value(row: &SqliteRow, index: usize) -> Option<String> {
    // SQLite is dynamically typed, so try the storage classes in order
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v;
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        use base64::Engine;
        return v.map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes));
    }

    None
}
