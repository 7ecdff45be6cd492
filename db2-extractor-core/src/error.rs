//! Error types with credential sanitization and user/application classification.
//!
//! Every driver failure is wrapped into an [`ExtractorError`] that names the
//! table, query or catalog step that failed. Driver errors never leave the
//! core unwrapped. Connection strings and passwords are never included in
//! error output.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Boxed error produced by a database driver behind the
/// [`Connection`](crate::connection::Connection) seam.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// Result type used by connection implementations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Who is expected to fix a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-fixable: bad configuration, unreachable database, failed query.
    User,
    /// Internal or environment fault, such as a manifest that could not be written.
    Application,
}

/// Main error type for extractor operations.
///
/// # Security
/// All error messages are sanitized to prevent credential leakage.
/// Connection strings and passwords are never included in error output.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// Database connection failed (credentials sanitized)
    #[error("Connection failed: {context}")]
    Connection {
        context: String,
        #[source]
        source: DriverError,
    },

    /// Export query failed while executing or fetching
    #[error("DB query [{table}] failed: {source}")]
    Query {
        table: String,
        #[source]
        source: DriverError,
    },

    /// Catalog introspection query failed or returned unusable data
    #[error("Catalog introspection failed: {context}")]
    Catalog {
        context: String,
        #[source]
        source: DriverError,
    },

    /// Configuration or validation error
    #[error("{message}")]
    Configuration { message: String },

    /// A streamed row does not carry the same fields as the header row
    #[error("Row {row} of [{table}] does not match the header columns: expected {expected:?}, got {actual:?}")]
    SchemaDrift {
        table: String,
        row: u64,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// Manifest could not be serialized or persisted
    #[error("Unable to create manifest: {context}")]
    Manifest {
        context: String,
        data: Box<serde_json::Value>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Unsupported driver or operation
    #[error("Unsupported operation: {feature} ({hint})")]
    UnsupportedFeature { feature: String, hint: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV encoding failed
    #[error("CSV write failed: {context}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with [`ExtractorError`]
pub type Result<T> = std::result::Result<T, ExtractorError>;

impl ExtractorError {
    /// Creates a connection error with sanitized context
    pub fn connection_failed(context: impl Into<String>, error: DriverError) -> Self {
        Self::Connection {
            context: redact_connection_string(&context.into()),
            source: error,
        }
    }

    /// Creates a query error naming the table spec that failed
    pub fn query_failed(table: impl Into<String>, error: DriverError) -> Self {
        Self::Query {
            table: table.into(),
            source: error,
        }
    }

    /// Creates a catalog error with context
    pub fn catalog_failed(context: impl Into<String>, error: DriverError) -> Self {
        Self::Catalog {
            context: context.into(),
            source: error,
        }
    }

    /// Creates a parsing error for a catalog column value.
    ///
    /// # Arguments
    /// * `field_name` - Name of the field being parsed
    /// * `table_context` - Optional catalog table for better error messages
    /// * `error` - The underlying parsing error
    pub fn parse_field<E>(field_name: &str, table_context: Option<&str>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let context = match table_context {
            Some(table) => format!(
                "Failed to parse field '{}' from result for table '{}'",
                field_name, table
            ),
            None => format!("Failed to parse field '{}' from catalog result", field_name),
        };
        Self::Catalog {
            context,
            source: Box::new(error),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an unsupported feature error
    pub fn unsupported_feature(feature: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
            hint: hint.into(),
        }
    }

    /// Creates a manifest error carrying structured diagnostics
    pub fn manifest_failed(
        context: impl Into<String>,
        data: serde_json::Value,
        source: Option<std::io::Error>,
    ) -> Self {
        Self::Manifest {
            context: context.into(),
            data: Box::new(data),
            source,
        }
    }

    /// Classifies the error as user-fixable or application fault.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. }
            | Self::Query { .. }
            | Self::Catalog { .. }
            | Self::Configuration { .. }
            | Self::SchemaDrift { .. }
            | Self::UnsupportedFeature { .. } => ErrorKind::User,
            Self::Manifest { .. } | Self::Io { .. } | Self::Csv { .. } | Self::Serialization { .. } => {
                ErrorKind::Application
            }
        }
    }

    /// Process exit code for the error: 1 for user errors, 2 for application errors.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::User => 1,
            ErrorKind::Application => 2,
        }
    }

    /// Structured context attached to the error, for logging.
    pub fn data(&self) -> serde_json::Value {
        match self {
            Self::Manifest { data, .. } => data.as_ref().clone(),
            Self::Query { table, .. } => serde_json::json!({ "table": table }),
            Self::SchemaDrift {
                table,
                row,
                expected,
                actual,
            } => serde_json::json!({
                "table": table,
                "row": row,
                "expected": expected,
                "actual": actual,
            }),
            _ => serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

// Literal pattern, compilation cannot fail
#[allow(clippy::expect_used)]
fn password_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(PWD|PASSWORD)=[^;]*").expect("Invalid password pattern")
    })
}

/// Masks passwords in ODBC style connection strings.
///
/// # Example
///
/// ```rust
/// use db2_extractor_core::error::redact_connection_string;
///
/// let sanitized = redact_connection_string("HOSTNAME=db2;UID=app;PWD=secret;");
/// assert_eq!(sanitized, "HOSTNAME=db2;UID=app;PWD=****;");
/// ```
pub fn redact_connection_string(connection_string: &str) -> String {
    password_pattern()
        .replace_all(connection_string, "$1=****")
        .into_owned()
}
