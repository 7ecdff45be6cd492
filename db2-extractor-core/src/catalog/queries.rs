//! `SYSCAT` catalog queries.
//!
//! Filters are passed as positional parameters, never spliced into the SQL.

use crate::models::TableRef;

/// Catalog table named in error contexts for the table listing step.
pub const TABLES_CONTEXT: &str = "SYSCAT.TABLES";

/// Catalog table named in error contexts for the column step.
pub const COLUMNS_CONTEXT: &str = "SYSCAT.COLUMNS";

const TABLES_SELECT: &str = "SELECT TABS.TABSCHEMA, TABS.TABNAME, TABS.TYPE \
     FROM SYSCAT.TABLES AS TABS \
     WHERE TABS.OWNERTYPE = 'U'";

const COLUMNS_SELECT: &str = "SELECT COLS.TABSCHEMA, COLS.TABNAME, COLS.COLNAME, COLS.COLNO, \
     COLS.TYPENAME, COLS.LENGTH, COLS.SCALE, COLS.NULLS, COLS.DEFAULT, \
     IDXCOLS.INDEXTYPE, IDXCOLS.UNIQUERULE, REFCOLS.REFKEYNAME, REFCOLS.REFTABNAME \
     FROM SYSCAT.COLUMNS AS COLS \
     JOIN SYSCAT.TABLES AS TABS \
     ON TABS.TABSCHEMA = COLS.TABSCHEMA AND TABS.TABNAME = COLS.TABNAME \
     LEFT OUTER JOIN ( \
     SELECT ICU.COLNAME, IDX.TABSCHEMA, IDX.TABNAME, IDX.INDEXTYPE, IDX.UNIQUERULE \
     FROM SYSCAT.INDEXCOLUSE AS ICU \
     JOIN SYSCAT.INDEXES AS IDX \
     ON ICU.INDSCHEMA = IDX.INDSCHEMA AND ICU.INDNAME = IDX.INDNAME \
     AND SUBSTR(IDX.INDEXTYPE, 1, 1) != 'X' \
     ) AS IDXCOLS \
     ON COLS.TABSCHEMA = IDXCOLS.TABSCHEMA AND COLS.TABNAME = IDXCOLS.TABNAME \
     AND COLS.COLNAME = IDXCOLS.COLNAME \
     LEFT OUTER JOIN ( \
     SELECT KCU.COLNAME, REF.TABSCHEMA, REF.TABNAME, REF.REFKEYNAME, REF.REFTABNAME \
     FROM SYSCAT.KEYCOLUSE AS KCU \
     JOIN SYSCAT.REFERENCES AS REF \
     ON KCU.CONSTNAME = REF.CONSTNAME AND KCU.TABSCHEMA = REF.TABSCHEMA \
     AND KCU.TABNAME = REF.TABNAME \
     ) AS REFCOLS \
     ON COLS.TABSCHEMA = REFCOLS.TABSCHEMA AND COLS.TABNAME = REFCOLS.TABNAME \
     AND COLS.COLNAME = REFCOLS.COLNAME";

const COLUMNS_ORDER: &str = " ORDER BY COLS.TABSCHEMA, COLS.TABNAME, COLS.COLNO";

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub sql: String,
    pub params: Vec<String>,
}

/// Appends `AND ((TABS.TABSCHEMA = ? AND TABS.TABNAME = ?) OR ...)`.
fn push_filter(sql: &mut String, params: &mut Vec<String>, filter: &[TableRef]) {
    if filter.is_empty() {
        return;
    }

    let predicates = filter
        .iter()
        .map(|table| {
            params.push(table.schema.clone());
            params.push(table.table_name.clone());
            "(TABS.TABSCHEMA = ? AND TABS.TABNAME = ?)"
        })
        .collect::<Vec<_>>()
        .join(" OR ");

    sql.push_str(" AND (");
    sql.push_str(&predicates);
    sql.push(')');
}

/// Lists user-owned tables, optionally restricted to exact pairs.
pub fn tables_query(filter: &[TableRef]) -> CatalogQuery {
    let mut sql = TABLES_SELECT.to_string();
    let mut params = Vec::new();
    push_filter(&mut sql, &mut params, filter);
    sql.push_str(" ORDER BY TABS.TABNAME, TABS.TABSCHEMA");
    CatalogQuery { sql, params }
}

/// Columns with index and foreign key correlation for every user-owned
/// table the same filter selects.
pub fn bulk_columns_query(filter: &[TableRef]) -> CatalogQuery {
    let mut sql = format!("{} WHERE TABS.OWNERTYPE = 'U'", COLUMNS_SELECT);
    let mut params = Vec::new();
    push_filter(&mut sql, &mut params, filter);
    sql.push_str(COLUMNS_ORDER);
    CatalogQuery { sql, params }
}

/// Columns with index and foreign key correlation for one table.
pub fn table_columns_query(table: &TableRef) -> CatalogQuery {
    CatalogQuery {
        sql: format!(
            "{} WHERE COLS.TABSCHEMA = ? AND COLS.TABNAME = ?{}",
            COLUMNS_SELECT, COLUMNS_ORDER
        ),
        params: vec![table.schema.clone(), table.table_name.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_query_without_filter() {
        let query = tables_query(&[]);
        assert!(query.sql.contains("FROM SYSCAT.TABLES"));
        assert!(query.sql.contains("OWNERTYPE = 'U'"));
        assert!(query.sql.ends_with("ORDER BY TABS.TABNAME, TABS.TABSCHEMA"));
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_tables_query_with_filter_uses_parameters() {
        let filter = vec![
            TableRef::new("DB2INST1", "SALES"),
            TableRef::new("OTHER", "O'BRIEN"),
        ];
        let query = tables_query(&filter);

        assert!(query.sql.contains(
            "AND ((TABS.TABSCHEMA = ? AND TABS.TABNAME = ?) OR (TABS.TABSCHEMA = ? AND TABS.TABNAME = ?))"
        ));
        assert!(!query.sql.contains("O'BRIEN"));
        assert_eq!(query.params, vec!["DB2INST1", "SALES", "OTHER", "O'BRIEN"]);
    }

    #[test]
    fn test_bulk_columns_query() {
        let query = bulk_columns_query(&[TableRef::new("S", "T")]);
        assert!(query.sql.contains("FROM SYSCAT.COLUMNS AS COLS"));
        assert!(query.sql.contains("SUBSTR(IDX.INDEXTYPE, 1, 1) != 'X'"));
        assert!(query.sql.contains("SYSCAT.REFERENCES"));
        assert!(query.sql.ends_with(COLUMNS_ORDER));
        assert_eq!(query.params, vec!["S", "T"]);
    }

    #[test]
    fn test_table_columns_query() {
        let query = table_columns_query(&TableRef::new("S", "T"));
        assert!(query.sql.contains("WHERE COLS.TABSCHEMA = ? AND COLS.TABNAME = ?"));
        assert_eq!(query.params, vec!["S", "T"]);
    }
}
