//! Connection seam between the extractor core and database drivers.
//!
//! The core only needs to run a query and walk its rows lazily. Everything
//! else (authentication, tunnelling, retries) belongs to the driver behind
//! [`Connection`].
//!
//! # Module Structure
//! - `row`: ordered row representation shared by all drivers
//! - `odbc`: DB2 through the IBM ODBC driver (feature `db2`)
//! - `sqlite`: SQLite through sqlx (feature `sqlite`)

use crate::config::{DbParameters, Driver};
use crate::{DriverResult, Result};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;

mod row;

pub use row::Row;

#[cfg(feature = "db2")]
pub mod odbc;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Lazily fetched query result. Each item is one row.
pub type RowStream<'a> = BoxStream<'a, DriverResult<Row>>;

/// Query used to verify that a DB2 connection is usable.
pub const DB2_TEST_QUERY: &str = "SELECT 1 FROM sysibm.sysdummy1";

/// A live, authenticated database connection.
///
/// # Object Safety
/// This trait is object-safe, allowing for dynamic dispatch through
/// `Box<dyn Connection>` or `Arc<dyn Connection>`.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Executes `sql` with positional `?` parameters and returns the rows
    /// as a stream. Rows are materialized one at a time as the stream is
    /// polled; implementations must not buffer the full result.
    ///
    /// # Errors
    /// Returns the driver error if the statement cannot be prepared or
    /// executed. Fetch failures surface as stream items.
    async fn query<'a>(&'a self, sql: &'a str, params: &'a [String]) -> DriverResult<RowStream<'a>>;

    /// Executes `sql` and collects every row.
    ///
    /// Only used for catalog queries, whose size is bounded by the catalog.
    async fn fetch_all(&self, sql: &str, params: &[String]) -> DriverResult<Vec<Row>> {
        let mut stream = self.query(sql, params).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Trivial query that succeeds on any healthy connection.
    fn test_query(&self) -> &'static str {
        DB2_TEST_QUERY
    }

    /// Whether the database exposes the DB2 `SYSCAT` catalog.
    fn supports_catalog(&self) -> bool {
        true
    }

    /// Human readable target description (credentials sanitized).
    fn describe(&self) -> String;
}

/// Opens a connection for the configured driver.
///
/// # Errors
/// Returns error if:
/// - The parameters are incomplete
/// - The driver is not compiled in
/// - The database cannot be reached or rejects the credentials
pub async fn connect(params: &DbParameters) -> Result<Box<dyn Connection>> {
    params.validate()?;

    match params.driver {
        Driver::Db2 => {
            #[cfg(feature = "db2")]
            {
                let connection = odbc::OdbcConnection::connect(params).await?;
                Ok(Box::new(connection))
            }
            #[cfg(not(feature = "db2"))]
            {
                Err(crate::ExtractorError::unsupported_feature(
                    "DB2 driver",
                    "Compile with --features db2 to enable the IBM DB2 ODBC driver",
                ))
            }
        }
        Driver::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                let connection = sqlite::SqliteConnection::open(&params.database).await?;
                Ok(Box::new(connection))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err(crate::ExtractorError::unsupported_feature(
                    "SQLite driver",
                    "Compile with --features sqlite to enable SQLite support",
                ))
            }
        }
    }
}
