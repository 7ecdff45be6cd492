//! Shared fixtures for integration tests.
//!
//! [`ScriptedConnection`] answers queries from a script matched on SQL
//! fragments, which lets catalog and export scenarios run without DB2.

#![allow(dead_code)]

use async_trait::async_trait;
use db2_extractor_core::{Connection, DriverResult, Row, RowStream};
use futures::StreamExt;
use std::sync::Mutex;

/// Answer to a scripted query.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Rows streamed in order
    Rows(Vec<Row>),
    /// Statement fails before any row
    Fail(String),
    /// Rows streamed, then a fetch error
    FailAfter(Vec<Row>, String),
}

/// Statement seen by a [`ScriptedConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub sql: String,
    pub params: Vec<String>,
}

#[derive(Debug)]
struct Scripted {
    fragment: String,
    params: Option<Vec<String>>,
    reply: Reply,
}

impl Scripted {
    fn matches(&self, sql: &str, params: &[String]) -> bool {
        sql.contains(self.fragment.as_str())
            && self.params.as_deref().is_none_or(|expected| expected == params)
    }
}

/// In-memory [`Connection`] replaying scripted replies.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    script: Vec<Scripted>,
    catalog: bool,
    executed: Mutex<Vec<Executed>>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self {
            catalog: true,
            ..Default::default()
        }
    }

    /// Answers the first query containing `fragment` with `reply`. Earlier
    /// registrations win.
    pub fn on(mut self, fragment: &str, reply: Reply) -> Self {
        self.script.push(Scripted {
            fragment: fragment.to_string(),
            params: None,
            reply,
        });
        self
    }

    /// Like [`on`](Self::on), but only for statements bound to `params`.
    pub fn on_params(mut self, fragment: &str, params: &[&str], reply: Reply) -> Self {
        self.script.push(Scripted {
            fragment: fragment.to_string(),
            params: Some(params.iter().map(|p| p.to_string()).collect()),
            reply,
        });
        self
    }

    /// Reports the connection as lacking a `SYSCAT` catalog.
    pub fn without_catalog(mut self) -> Self {
        self.catalog = false;
        self
    }

    /// Statements executed so far.
    pub fn executed(&self) -> Vec<Executed> {
        self.executed.lock().unwrap().clone()
    }

    /// Number of executed statements containing `fragment`.
    pub fn count(&self, fragment: &str) -> usize {
        self.executed()
            .iter()
            .filter(|executed| executed.sql.contains(fragment))
            .count()
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn query<'a>(&'a self, sql: &'a str, params: &'a [String]) -> DriverResult<RowStream<'a>> {
        self.executed.lock().unwrap().push(Executed {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        let reply = self
            .script
            .iter()
            .find(|scripted| scripted.matches(sql, params))
            .map(|scripted| scripted.reply.clone())
            .ok_or_else(|| format!("no scripted reply for: {}", sql))?;

        match reply {
            Reply::Rows(rows) => Ok(futures::stream::iter(rows.into_iter().map(Ok)).boxed()),
            Reply::Fail(message) => Err(message.into()),
            Reply::FailAfter(rows, message) => {
                let items: Vec<DriverResult<Row>> = rows
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(message.into())))
                    .collect();
                Ok(futures::stream::iter(items).boxed())
            }
        }
    }

    fn supports_catalog(&self) -> bool {
        self.catalog
    }

    fn describe(&self) -> String {
        "scripted://db2".to_string()
    }
}

/// Builds a row from name/value pairs.
pub fn row(pairs: &[(&str, Option<&str>)]) -> Row {
    Row::from_pairs(pairs.iter().copied())
}

/// A `SYSCAT.TABLES` row.
pub fn table_row(schema: &str, name: &str, kind: &str) -> Row {
    row(&[
        ("TABSCHEMA", Some(schema)),
        ("TABNAME", Some(name)),
        ("TYPE", Some(kind)),
    ])
}

/// Column description used to build correlated `SYSCAT.COLUMNS` rows.
#[derive(Debug, Clone)]
pub struct CatalogColumn<'a> {
    pub schema: &'a str,
    pub table: &'a str,
    pub name: &'a str,
    pub colno: i64,
    pub type_name: &'a str,
    pub length: &'a str,
    pub scale: i64,
    pub nulls: &'a str,
    pub default: Option<&'a str>,
    pub index_type: Option<&'a str>,
    pub unique_rule: Option<&'a str>,
    pub ref_key_name: Option<&'a str>,
    pub ref_table_name: Option<&'a str>,
}

impl<'a> CatalogColumn<'a> {
    /// A nullable `VARCHAR(255)` column without index or key.
    pub fn varchar(schema: &'a str, table: &'a str, name: &'a str, colno: i64) -> Self {
        Self {
            schema,
            table,
            name,
            colno,
            type_name: "VARCHAR",
            length: "255",
            scale: 0,
            nulls: "Y",
            default: None,
            index_type: None,
            unique_rule: None,
            ref_key_name: None,
            ref_table_name: None,
        }
    }

    pub fn row(&self) -> Row {
        let colno = self.colno.to_string();
        let scale = self.scale.to_string();
        row(&[
            ("TABSCHEMA", Some(self.schema)),
            ("TABNAME", Some(self.table)),
            ("COLNAME", Some(self.name)),
            ("COLNO", Some(colno.as_str())),
            ("TYPENAME", Some(self.type_name)),
            ("LENGTH", Some(self.length)),
            ("SCALE", Some(scale.as_str())),
            ("NULLS", Some(self.nulls)),
            ("DEFAULT", self.default),
            ("INDEXTYPE", self.index_type),
            ("UNIQUERULE", self.unique_rule),
            ("REFKEYNAME", self.ref_key_name),
            ("REFTABNAME", self.ref_table_name),
        ])
    }
}

/// SQL fragment identifying column queries.
pub const COLUMNS_QUERY: &str = "FROM SYSCAT.COLUMNS";

/// SQL fragment identifying table listing queries.
pub const TABLES_QUERY: &str = "SELECT TABS.TABSCHEMA";
