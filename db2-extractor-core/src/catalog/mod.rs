//! Catalog introspection over the DB2 `SYSCAT` views.
//!
//! Table definitions are rebuilt in two passes. The first pass lists the
//! user-owned tables and creates one skeleton per `(schema, name)`. The
//! second pass folds column rows, already correlated with index and foreign
//! key information by the catalog query, into each skeleton keyed by the
//! catalog ordinal. Rows sharing an ordinal overwrite each other, so a
//! column appearing in several indexes is reported once.
//!
//! # Module Structure
//! - `queries`: parameterized `SYSCAT` queries
//! - `type_mapping`: length normalization and base types

use crate::config::IntrospectionStrategy;
use crate::connection::{Connection, Row};
use crate::models::{ColumnDefinition, TableDefinition, TableKind, TableRef};
use crate::{ExtractorError, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub mod queries;
pub mod type_mapping;

pub use type_mapping::{BaseType, is_decimal_family, map_db2_type, normalize_length};

use queries::{COLUMNS_CONTEXT, CatalogQuery, TABLES_CONTEXT};

/// `SYSCAT.INDEXES.UNIQUERULE` code of a primary key index.
const UNIQUE_RULE_PRIMARY: &str = "P";

/// `SYSCAT.INDEXES.UNIQUERULE` code of a unique index.
const UNIQUE_RULE_UNIQUE: &str = "U";

/// `SYSCAT.COLUMNS.NULLS` code of a NOT NULL column.
const NULLS_FORBIDDEN: &str = "N";

/// Table being assembled from catalog rows.
#[derive(Debug)]
struct TableSkeleton {
    name: String,
    schema: Option<String>,
    kind: TableKind,
    columns: BTreeMap<i64, ColumnDefinition>,
}

impl TableSkeleton {
    fn into_definition(self) -> TableDefinition {
        TableDefinition {
            name: self.name,
            schema: self.schema,
            kind: self.kind,
            columns: self.columns.into_values().collect(),
        }
    }
}

/// Reconstructs table definitions from catalog queries.
pub struct CatalogIntrospector<'c> {
    connection: &'c dyn Connection,
    strategy: IntrospectionStrategy,
}

impl<'c> CatalogIntrospector<'c> {
    /// Creates an introspector running catalog queries on `connection`.
    pub fn new(connection: &'c dyn Connection, strategy: IntrospectionStrategy) -> Self {
        Self {
            connection,
            strategy,
        }
    }

    /// Lists user-owned tables with their columns.
    ///
    /// An empty or absent filter lists every table. Tables come back ordered
    /// by name, columns by ordinal position.
    ///
    /// # Errors
    /// Returns a catalog error if a catalog query fails or returns a row
    /// that cannot be interpreted.
    pub async fn list_tables(&self, filter: Option<&[TableRef]>) -> Result<Vec<TableDefinition>> {
        let filter = filter.unwrap_or_default();

        let table_rows = self
            .fetch(&queries::tables_query(filter), TABLES_CONTEXT)
            .await?;
        if table_rows.is_empty() {
            debug!("Catalog returned no tables");
            return Ok(Vec::new());
        }

        let mut skeletons = Vec::with_capacity(table_rows.len());
        let mut index: HashMap<(String, String), usize> = HashMap::new();
        for row in &table_rows {
            let skeleton = table_skeleton(row)?;
            let key = (
                skeleton.schema.clone().unwrap_or_default(),
                skeleton.name.clone(),
            );
            index.insert(key, skeletons.len());
            skeletons.push(skeleton);
        }
        debug!("Discovered {} tables", skeletons.len());

        match self.strategy {
            IntrospectionStrategy::Bulk => {
                let column_rows = self
                    .fetch(&queries::bulk_columns_query(filter), COLUMNS_CONTEXT)
                    .await?;
                debug!("Folding {} column rows", column_rows.len());
                fold_columns(&mut skeletons, &index, &column_rows)?;
            }
            IntrospectionStrategy::PerTable => {
                let tables: Vec<TableRef> = skeletons
                    .iter()
                    .map(|skeleton| {
                        TableRef::new(
                            skeleton.schema.clone().unwrap_or_default(),
                            skeleton.name.clone(),
                        )
                    })
                    .collect();

                for table in &tables {
                    debug!("Collecting columns of {}", table);
                    let column_rows = self
                        .fetch(&queries::table_columns_query(table), COLUMNS_CONTEXT)
                        .await?;
                    fold_columns(&mut skeletons, &index, &column_rows)?;
                }
            }
        }

        Ok(skeletons
            .into_iter()
            .map(TableSkeleton::into_definition)
            .collect())
    }

    /// Describes one table, or `None` when the catalog does not know it.
    ///
    /// # Errors
    /// Returns a catalog error if a catalog query fails.
    pub async fn describe_table(&self, table: &TableRef) -> Result<Option<TableDefinition>> {
        let tables = self.list_tables(Some(std::slice::from_ref(table))).await?;
        Ok(tables.into_iter().find(|definition| definition.matches(table)))
    }

    async fn fetch(&self, query: &CatalogQuery, context: &str) -> Result<Vec<Row>> {
        self.connection
            .fetch_all(&query.sql, &query.params)
            .await
            .map_err(|e| ExtractorError::catalog_failed(format!("Failed to query {}", context), e))
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value.map(|v| v.trim_end().to_string())
}

/// Builds an empty table from a `SYSCAT.TABLES` row.
fn table_skeleton(row: &Row) -> Result<TableSkeleton> {
    let name = row.get_str("TABNAME", Some(TABLES_CONTEXT))?.trim_end();
    let kind = TableKind::from_catalog_code(row.get_opt("TYPE").unwrap_or_default());

    Ok(TableSkeleton {
        name: name.to_string(),
        schema: trimmed(row.get_opt("TABSCHEMA")),
        kind,
        columns: BTreeMap::new(),
    })
}

/// Builds a column from a correlated `SYSCAT.COLUMNS` row.
fn column_definition(row: &Row) -> Result<(i64, ColumnDefinition)> {
    let context = Some(COLUMNS_CONTEXT);
    let ordinal: i64 = row.parse_field("COLNO", context)?;
    let data_type = row.get_str("TYPENAME", context)?.trim_end().to_string();
    let scale: i64 = match row.get_opt("SCALE") {
        Some(_) => row.parse_field("SCALE", context)?,
        None => 0,
    };
    let length = normalize_length(&data_type, row.get_opt("LENGTH").unwrap_or_default(), scale);
    let unique_rule = row.get_opt("UNIQUERULE").map(str::trim);

    let (indexed, unique_key) = match row.get_opt("INDEXTYPE") {
        Some(_) => (Some(true), Some(unique_rule == Some(UNIQUE_RULE_UNIQUE))),
        None => (None, None),
    };
    let (foreign_key_ref_table, foreign_key_ref) = match row.get_opt("REFKEYNAME") {
        Some(key) => (
            trimmed(row.get_opt("REFTABNAME")),
            Some(key.trim_end().to_string()),
        ),
        None => (None, None),
    };

    let column = ColumnDefinition {
        name: row.get_str("COLNAME", context)?.trim_end().to_string(),
        data_type,
        nullable: row.get_opt("NULLS").map(str::trim) != Some(NULLS_FORBIDDEN),
        default: row.get_opt("DEFAULT").map(str::to_string),
        length,
        primary_key: unique_rule == Some(UNIQUE_RULE_PRIMARY),
        ordinal_position: ordinal,
        indexed,
        unique_key,
        foreign_key_ref_table,
        foreign_key_ref,
    };

    Ok((ordinal, column))
}

/// Folds column rows into the skeletons they belong to.
///
/// Rows of tables that were not discovered are ignored.
fn fold_columns(
    skeletons: &mut [TableSkeleton],
    index: &HashMap<(String, String), usize>,
    rows: &[Row],
) -> Result<()> {
    for row in rows {
        let key = (
            trimmed(row.get_opt("TABSCHEMA")).unwrap_or_default(),
            row.get_str("TABNAME", Some(COLUMNS_CONTEXT))?
                .trim_end()
                .to_string(),
        );
        let Some(&position) = index.get(&key) else {
            continue;
        };

        let (ordinal, column) = column_definition(row)?;
        skeletons[position].columns.insert(ordinal, column);
    }

    Ok(())
}
