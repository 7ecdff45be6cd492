//! SQL text for table specs without a free-form query.

use crate::models::{ExportSource, TableRef};

/// Builds the statement executed for an export.
pub struct QueryBuilder;

impl QueryBuilder {
    /// Wraps an identifier in double quotes.
    ///
    /// Identifiers come from the catalog and are used verbatim, embedded
    /// quotes are not escaped.
    pub fn quote_identifier(identifier: &str) -> String {
        format!("\"{}\"", identifier)
    }

    /// Builds `SELECT <columns> FROM "schema"."table"`.
    ///
    /// Columns keep their given order; an empty list selects `*`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use db2_extractor_core::{QueryBuilder, TableRef};
    ///
    /// let table = TableRef::new("DB2INST1", "SALES");
    /// assert_eq!(
    ///     QueryBuilder::simple_query(&table, &["REGION".to_string()]),
    ///     r#"SELECT "REGION" FROM "DB2INST1"."SALES""#
    /// );
    /// ```
    pub fn simple_query(table: &TableRef, columns: &[String]) -> String {
        let projection = if columns.is_empty() {
            "*".to_string()
        } else {
            columns
                .iter()
                .map(|column| Self::quote_identifier(column))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "SELECT {} FROM {}.{}",
            projection,
            Self::quote_identifier(&table.schema),
            Self::quote_identifier(&table.table_name)
        )
    }

    /// Renders the SQL for a resolved export source.
    pub fn build(source: &ExportSource) -> String {
        match source {
            ExportSource::FreeQuery(sql) => sql.clone(),
            ExportSource::TableRef { table, columns } => Self::simple_query(table, columns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_query_all_columns() {
        let table = TableRef::new("S", "T");
        assert_eq!(
            QueryBuilder::simple_query(&table, &[]),
            r#"SELECT * FROM "S"."T""#
        );
    }

    #[test]
    fn test_simple_query_preserves_column_order() {
        let table = TableRef::new("DB2INST1", "PROJACT");
        let columns = vec!["ACTNO".to_string(), "PROJNO".to_string()];
        assert_eq!(
            QueryBuilder::simple_query(&table, &columns),
            r#"SELECT "ACTNO", "PROJNO" FROM "DB2INST1"."PROJACT""#
        );
    }

    #[test]
    fn test_quote_identifier_does_not_escape() {
        assert_eq!(QueryBuilder::quote_identifier("a\"b"), "\"a\"b\"");
    }

    #[test]
    fn test_build_free_query_verbatim() {
        let sql = "SELECT * FROM sysibm.sysdummy1 WHERE 1 = 1";
        assert_eq!(
            QueryBuilder::build(&ExportSource::FreeQuery(sql.to_string())),
            sql
        );
    }
}
