//! Ordered row representation.

use crate::{ExtractorError, Result};
use std::str::FromStr;

/// One result row: `(column name, value)` pairs in driver order.
///
/// Values are carried as text, `None` being SQL NULL. Column sets vary per
/// query, so there is no fixed record type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, Option<String>)>,
}

impl Row {
    /// Creates a row from ordered fields.
    pub fn new(fields: Vec<(String, Option<String>)>) -> Self {
        Self { fields }
    }

    /// Builds a row from name/value pairs, mostly useful for tests.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.map(Into::into)))
                .collect(),
        }
    }

    /// Returns true when the row carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Field names in driver order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Field values in driver order.
    pub fn values(&self) -> impl Iterator<Item = Option<&str>> {
        self.fields.iter().map(|(_, value)| value.as_deref())
    }

    /// Value of the named field. Outer `None` means the field is absent,
    /// inner `None` means SQL NULL.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_deref())
    }

    /// Value of the named field, treating absent fields as NULL.
    pub fn get_opt(&self, name: &str) -> Option<&str> {
        self.get(name).flatten()
    }

    /// Extracts a required, non-NULL text field with error context.
    ///
    /// # Errors
    /// Returns a catalog error if the field is absent or NULL.
    pub fn get_str(&self, name: &str, table_context: Option<&str>) -> Result<&str> {
        self.get_opt(name)
            .ok_or_else(|| ExtractorError::parse_field(name, table_context, MissingField))
    }

    /// Parses a required field into `T` with error context.
    ///
    /// # Errors
    /// Returns a catalog error if the field is absent, NULL, or unparsable.
    pub fn parse_field<T>(&self, name: &str, table_context: Option<&str>) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.get_str(name, table_context)?
            .trim()
            .parse()
            .map_err(|e| ExtractorError::parse_field(name, table_context, e))
    }
}

/// Field absent from the row or NULL where a value is required.
#[derive(Debug)]
struct MissingField;

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("value is missing or NULL")
    }
}

impl std::error::Error for MissingField {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::from_pairs([
            ("COLNAME", Some("ID")),
            ("COLNO", Some(" 3 ")),
            ("DEFAULT", None),
        ])
    }

    #[test]
    fn test_row_lookup() {
        let row = sample();
        assert_eq!(row.len(), 3);
        assert_eq!(row.get("COLNAME"), Some(Some("ID")));
        assert_eq!(row.get("DEFAULT"), Some(None));
        assert_eq!(row.get("MISSING"), None);
        assert_eq!(row.get_opt("MISSING"), None);
        assert_eq!(
            row.names().collect::<Vec<_>>(),
            vec!["COLNAME", "COLNO", "DEFAULT"]
        );
    }

    #[test]
    fn test_row_parse_field() {
        let row = sample();
        let colno: i64 = row.parse_field("COLNO", Some("SYSCAT.COLUMNS")).unwrap();
        assert_eq!(colno, 3);

        let error = row
            .parse_field::<i64>("COLNAME", Some("SYSCAT.COLUMNS"))
            .unwrap_err();
        assert!(error.to_string().contains("COLNAME"));
        assert!(error.to_string().contains("SYSCAT.COLUMNS"));

        assert!(row.get_str("DEFAULT", None).is_err());
    }

    #[test]
    fn test_empty_row() {
        assert!(Row::default().is_empty());
        assert!(!sample().is_empty());
    }
}
