//! Database connection parameters.
//!
//! This module provides [`DbParameters`], the `parameters.db` block of the
//! extractor configuration, and [`Credentials`], the zeroizing container the
//! password lives in.

use crate::{ExtractorError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use zeroize::{Zeroize, Zeroizing};

/// Default DB2 listener port.
pub const DEFAULT_DB2_PORT: u16 = 50000;

/// Driver used to reach the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// IBM DB2 through the IBM DB2 ODBC driver
    #[default]
    Db2,
    /// SQLite database file, `database` being the path
    Sqlite,
}

/// Secure credential container that automatically zeros memory on drop.
///
/// # Example
///
/// ```rust
/// use db2_extractor_core::config::Credentials;
///
/// let creds = Credentials::new("db2inst1".to_string(), Some("secret".to_string()));
/// assert_eq!(creds.username(), "db2inst1");
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone, Default, Zeroize)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Gets the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Checks if a non-empty password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Exposes the password for building a driver connection string.
    pub(crate) fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"****")
            .field("password", &"****")
            .finish()
    }
}

/// The `parameters.db` configuration block.
///
/// # Security
/// The password is never serialized, logged, or displayed.
#[derive(Debug, Clone)]
pub struct DbParameters {
    pub driver: Driver,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub credentials: Credentials,
}

impl Default for DbParameters {
    fn default() -> Self {
        Self {
            driver: Driver::Db2,
            host: String::new(),
            port: DEFAULT_DB2_PORT,
            database: String::new(),
            credentials: Credentials::default(),
        }
    }
}

impl std::fmt::Display for DbParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.driver {
            Driver::Db2 => write!(f, "db2://{}:{}/{}", self.host, self.port, self.database),
            Driver::Sqlite => write!(f, "sqlite://{}", self.database),
        }
        // Intentionally omit username and never include credentials
    }
}

#[derive(Deserialize)]
struct RawDbParameters {
    #[serde(default)]
    driver: Driver,
    #[serde(default)]
    host: Option<String>,
    #[serde(default, deserialize_with = "port_from_number_or_string")]
    port: Option<u16>,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(rename = "#password", alias = "password", default)]
    password: Option<String>,
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(port)) => Ok(Some(port)),
        Some(Port::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Port::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{}'", text))),
    }
}

impl<'de> Deserialize<'de> for DbParameters {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawDbParameters::deserialize(deserializer)?;
        Ok(Self {
            driver: raw.driver,
            host: raw.host.unwrap_or_default(),
            port: raw.port.unwrap_or(DEFAULT_DB2_PORT),
            database: raw.database.unwrap_or_default(),
            credentials: Credentials::new(raw.user.unwrap_or_default(), raw.password),
        })
    }
}

impl DbParameters {
    /// Creates DB2 parameters.
    pub fn db2(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            driver: Driver::Db2,
            host: host.into(),
            port: DEFAULT_DB2_PORT,
            database: database.into(),
            credentials: Credentials::new(user.into(), Some(password.into())),
        }
    }

    /// Creates SQLite parameters for a database path or URL.
    pub fn sqlite(database: impl Into<String>) -> Self {
        Self {
            driver: Driver::Sqlite,
            database: database.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Validates that every parameter the driver needs is present.
    ///
    /// # Errors
    /// Returns `Parameter <name> is missing.` for the first absent parameter.
    pub fn validate(&self) -> Result<()> {
        let missing = |name: &str| {
            ExtractorError::configuration(format!("Parameter {} is missing.", name))
        };

        match self.driver {
            Driver::Db2 => {
                if self.host.trim().is_empty() {
                    return Err(missing("host"));
                }
                if self.database.trim().is_empty() {
                    return Err(missing("database"));
                }
                if self.credentials.username().is_empty() {
                    return Err(missing("user"));
                }
                if self.credentials.password().is_none() {
                    return Err(missing("password"));
                }
                if self.port == 0 {
                    return Err(ExtractorError::configuration(
                        "Parameter port must be greater than 0.",
                    ));
                }
            }
            Driver::Sqlite => {
                if self.database.trim().is_empty() {
                    return Err(missing("database"));
                }
            }
        }

        Ok(())
    }

    /// Builds the ODBC connection string for the IBM DB2 ODBC driver.
    ///
    /// The result contains the password and must only be handed to the
    /// driver. Use [`crate::error::redact_connection_string`] before logging.
    pub fn odbc_connection_string(&self) -> String {
        format!(
            "DRIVER={{IBM DB2 ODBC DRIVER}};HOSTNAME={};PORT={};DATABASE={};PROTOCOL=TCPIP;UID={};PWD={};",
            odbc_value(&self.host),
            self.port,
            odbc_value(&self.database),
            odbc_value(self.credentials.username()),
            odbc_value(self.credentials.password().unwrap_or_default()),
        )
    }
}

/// Braces a connection string attribute value when it contains separators.
fn odbc_value(value: &str) -> String {
    if value.contains([';', '{', '}']) {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}
