//! DB2 connection through the IBM DB2 ODBC driver.
//!
//! ODBC calls block, so every statement runs on a blocking thread. Rows are
//! fetched in batches into a text buffer and handed to the async side over a
//! bounded channel. At most one batch plus the channel capacity is held in
//! memory, whatever the size of the result.
//!
//! Text values are expected in UTF-8. A value longer than the text buffer or
//! one that does not decode fails the statement rather than reaching the CSV
//! file altered.

use super::{Connection, Row, RowStream};
use crate::config::DbParameters;
use crate::error::redact_connection_string;
use crate::{DriverError, DriverResult, ExtractorError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use odbc_api::buffers::TextRowSet;
use odbc_api::{ConnectionOptions, Cursor, Environment, IntoParameter, ResultSetMetadata};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Rows fetched per ODBC round trip.
const FETCH_BATCH_SIZE: usize = 1000;

/// Upper bound for a single text value in bytes. Longer values fail the fetch.
const MAX_TEXT_LENGTH: usize = 65536;

/// Rows buffered between the fetch thread and the consumer.
const CHANNEL_CAPACITY: usize = 1024;

/// Connection to DB2 through ODBC.
///
/// ODBC handles are opened per statement on the blocking thread that runs
/// it. The environment is shared.
pub struct OdbcConnection {
    env: Arc<Environment>,
    connection_string: Arc<Zeroizing<String>>,
    description: String,
}

impl std::fmt::Debug for OdbcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdbcConnection")
            .field("target", &self.description)
            .finish_non_exhaustive()
    }
}

impl OdbcConnection {
    /// Opens and verifies a DB2 connection.
    ///
    /// # Errors
    /// Returns a connection error if the ODBC environment cannot be created,
    /// the driver is missing, or the database rejects the connection.
    pub async fn connect(params: &DbParameters) -> Result<Self> {
        let env = Environment::new().map_err(|e| {
            ExtractorError::connection_failed(
                "Failed to create ODBC environment. Make sure the IBM DB2 ODBC driver is installed",
                Box::new(e),
            )
        })?;
        let env = Arc::new(env);
        let connection_string = Arc::new(Zeroizing::new(params.odbc_connection_string()));
        let description = params.to_string();

        debug!(
            "ODBC connection string: {}",
            redact_connection_string(&connection_string)
        );

        let verify_env = Arc::clone(&env);
        let verify_string = Arc::clone(&connection_string);
        tokio::task::spawn_blocking(move || -> DriverResult<()> {
            verify_env
                .connect_with_connection_string(&verify_string, ConnectionOptions::default())?;
            Ok(())
        })
        .await
        .map_err(|e| ExtractorError::connection_failed(description.clone(), Box::new(e)))?
        .map_err(|e| ExtractorError::connection_failed(description.clone(), e))?;

        info!("Connected to {}", description);

        Ok(Self {
            env,
            connection_string,
            description,
        })
    }
}

#[async_trait]
impl Connection for OdbcConnection {
    async fn query<'a>(&'a self, sql: &'a str, params: &'a [String]) -> DriverResult<RowStream<'a>> {
        let env = Arc::clone(&self.env);
        let connection_string = Arc::clone(&self.connection_string);
        let sql = sql.to_string();
        let params = params.to_vec();

        let (tx, rx) = mpsc::channel::<DriverResult<Row>>(CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel::<DriverResult<()>>();

        tokio::task::spawn_blocking(move || {
            let connection = match env
                .connect_with_connection_string(&connection_string, ConnectionOptions::default())
            {
                Ok(connection) => connection,
                Err(e) => {
                    let _ = ready_tx.send(Err(Box::new(e)));
                    return;
                }
            };

            let mut prepared = match connection.prepare(&sql) {
                Ok(prepared) => prepared,
                Err(e) => {
                    let _ = ready_tx.send(Err(Box::new(e)));
                    return;
                }
            };

            let params: Vec<_> = params.into_iter().map(|p| p.into_parameter()).collect();
            match prepared.execute(params.as_slice()) {
                Err(e) => {
                    let _ = ready_tx.send(Err(Box::new(e)));
                }
                // Statement without a result set
                Ok(None) => {
                    let _ = ready_tx.send(Ok(()));
                }
                Ok(Some(cursor)) => {
                    let _ = ready_tx.send(Ok(()));
                    if let Err(e) = stream_cursor(cursor, &tx) {
                        let _ = tx.blocking_send(Err(e));
                    }
                }
            }
        });

        ready_rx
            .await
            .map_err(|e| Box::new(e) as DriverError)??;

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        Ok(stream.boxed())
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Fetches every batch of `cursor` and sends its rows to `tx`.
///
/// Stops early without error when the receiving side is dropped.
fn stream_cursor(mut cursor: impl Cursor, tx: &mpsc::Sender<DriverResult<Row>>) -> DriverResult<()> {
    let names = cursor
        .column_names()?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    let mut buffers = TextRowSet::for_cursor(FETCH_BATCH_SIZE, &mut cursor, Some(MAX_TEXT_LENGTH))?;
    let mut row_cursor = cursor.bind_buffer(&mut buffers)?;

    while let Some(batch) = row_cursor
        .fetch_with_truncation_check(true)
        .map_err(truncation_error)?
    {
        for row_idx in 0..batch.num_rows() {
            let fields = names
                .iter()
                .enumerate()
                .map(|(col_idx, name)| -> DriverResult<(String, Option<String>)> {
                    let value = batch
                        .at(col_idx, row_idx)
                        .map(|bytes| decode_text(name, bytes))
                        .transpose()?;
                    Ok((name.clone(), value))
                })
                .collect::<DriverResult<Vec<_>>>()?;

            if tx.blocking_send(Ok(Row::new(fields))).is_err() {
                return Ok(());
            }
        }
    }

    Ok(())
}

/// Names the buffer limit when a value did not fit.
fn truncation_error(error: odbc_api::Error) -> DriverError {
    if matches!(error, odbc_api::Error::TooLargeValueForBuffer { .. }) {
        format!(
            "Value longer than {} bytes cannot be exported: {}",
            MAX_TEXT_LENGTH, error
        )
        .into()
    } else {
        Box::new(error)
    }
}

/// Decodes one text value of `column`.
fn decode_text(column: &str, bytes: &[u8]) -> DriverResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| {
        format!("Column {} holds a value that is not valid UTF-8: {}", column, e).into()
    })
}
