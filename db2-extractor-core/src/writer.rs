//! Streaming CSV output.
//!
//! The header is taken from the field names of the first row. Every later
//! row must carry the same field set. A row whose fields only come in a
//! different order is written in header order, any other difference fails
//! the export.

use crate::config::CsvOptions;
use crate::connection::Row;
use crate::{ExtractorError, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Outcome of a finished write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Data rows written, header excluded
    pub rows: u64,
    /// Header written, empty when no row was written
    pub header: Vec<String>,
}

/// Writes rows of one export to a CSV sink.
///
/// The underlying writer is flushed by [`RowStreamWriter::finish`] and, on
/// early exit, when the value is dropped.
pub struct RowStreamWriter<W: Write> {
    writer: csv::Writer<W>,
    header: Option<Vec<String>>,
    rows: u64,
    table: String,
}

impl RowStreamWriter<File> {
    /// Creates the output file, truncating an existing one.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be created, or a
    /// configuration error for an unusable delimiter.
    pub fn create(path: &Path, options: &CsvOptions, table: impl Into<String>) -> Result<Self> {
        let file = File::create(path).map_err(|e| ExtractorError::Io {
            context: format!("Failed to create output file {}", path.display()),
            source: e,
        })?;
        Self::new(file, options, table)
    }
}

impl<W: Write> RowStreamWriter<W> {
    /// Wraps `inner` with the configured CSV dialect. `table` names the
    /// export in error messages.
    ///
    /// # Errors
    /// Returns a configuration error for an unusable delimiter.
    pub fn new(inner: W, options: &CsvOptions, table: impl Into<String>) -> Result<Self> {
        let writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter_byte()?)
            .quote_style(options.quote_style.into())
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(inner);

        Ok(Self {
            writer,
            header: None,
            rows: 0,
            table: table.into(),
        })
    }

    /// Header written so far, if any.
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Data rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Writes one row, writing the header first when this is the first row.
    ///
    /// A row without fields is ignored while no header exists. NULL values
    /// become empty fields.
    ///
    /// # Errors
    /// Returns a schema drift error when the row's field set differs from
    /// the header, or a CSV error when writing fails.
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        if self.header.is_none() {
            if row.is_empty() {
                return Ok(());
            }
            let header: Vec<String> = row.names().map(str::to_string).collect();
            self.writer
                .write_record(&header)
                .map_err(|e| self.csv_error("header", e))?;
            self.header = Some(header);
        }

        let Self {
            writer,
            header,
            rows,
            table,
        } = self;
        let header = header.as_deref().unwrap_or_default();
        let row_number = rows.saturating_add(1);

        if row.names().eq(header.iter().map(String::as_str)) {
            writer
                .write_record(row.values().map(Option::unwrap_or_default))
                .map_err(|e| csv_error(table, row_number, e))?;
        } else {
            let values = reorder(row, header).ok_or_else(|| ExtractorError::SchemaDrift {
                table: table.clone(),
                row: row_number,
                expected: header.to_vec(),
                actual: row.names().map(str::to_string).collect(),
            })?;
            writer
                .write_record(values)
                .map_err(|e| csv_error(table, row_number, e))?;
        }

        *rows = row_number;
        Ok(())
    }

    /// Flushes the output and reports what was written.
    ///
    /// # Errors
    /// Returns an I/O error if flushing fails.
    pub fn finish(mut self) -> Result<WriteSummary> {
        self.writer.flush().map_err(|e| ExtractorError::Io {
            context: format!("Failed to flush output of [{}]", self.table),
            source: e,
        })?;

        Ok(WriteSummary {
            rows: self.rows,
            header: self.header.take().unwrap_or_default(),
        })
    }

    fn csv_error(&self, what: &str, error: csv::Error) -> ExtractorError {
        ExtractorError::Csv {
            context: format!("Failed to write {} of [{}]", what, self.table),
            source: error,
        }
    }
}

fn csv_error(table: &str, row: u64, error: csv::Error) -> ExtractorError {
    ExtractorError::Csv {
        context: format!("Failed to write row {} of [{}]", row, table),
        source: error,
    }
}

/// Values of `row` in header order, or `None` when the field sets differ.
fn reorder<'r>(row: &'r Row, header: &[String]) -> Option<Vec<&'r str>> {
    if row.len() != header.len() {
        return None;
    }

    header
        .iter()
        .map(|name| row.get(name).map(Option::unwrap_or_default))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuoteStyle;

    fn write_rows(rows: &[Row], options: &CsvOptions) -> (Result<WriteSummary>, String) {
        let mut buffer = Vec::new();
        let result = {
            let mut writer = RowStreamWriter::new(&mut buffer, options, "test").unwrap();
            let mut outcome = Ok(());
            for row in rows {
                outcome = writer.write_row(row);
                if outcome.is_err() {
                    break;
                }
            }
            outcome.and_then(|_| writer.finish())
        };
        (result, String::from_utf8(buffer).unwrap())
    }

    fn row(pairs: &[(&str, Option<&str>)]) -> Row {
        Row::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_header_from_first_row() {
        let rows = vec![
            row(&[("A", Some("x")), ("B", Some("1"))]),
            row(&[("A", Some("y")), ("B", Some("2"))]),
        ];
        let (summary, output) = write_rows(&rows, &CsvOptions::default());

        assert_eq!(output, "A,B\nx,1\ny,2\n");
        let summary = summary.unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.header, vec!["A", "B"]);
    }

    #[test]
    fn test_null_and_quoting() {
        let rows = vec![row(&[
            ("A", None),
            ("B", Some("a,b")),
            ("C", Some("say \"hi\"")),
            ("D", Some("line\nbreak")),
        ])];
        let (_, output) = write_rows(&rows, &CsvOptions::default());

        assert_eq!(output, "A,B,C,D\n,\"a,b\",\"say \"\"hi\"\"\",\"line\nbreak\"\n");
    }

    #[test]
    fn test_quote_style_always_and_delimiter() {
        let options = CsvOptions {
            delimiter: ';',
            quote_style: QuoteStyle::Always,
        };
        let rows = vec![row(&[("A", Some("x")), ("B", Some("1"))])];
        let (_, output) = write_rows(&rows, &options);

        assert_eq!(output, "\"A\";\"B\"\n\"x\";\"1\"\n");
    }

    #[test]
    fn test_reordered_fields_follow_header() {
        let rows = vec![
            row(&[("A", Some("x")), ("B", Some("1"))]),
            row(&[("B", Some("2")), ("A", Some("y"))]),
        ];
        let (summary, output) = write_rows(&rows, &CsvOptions::default());

        assert!(summary.is_ok());
        assert_eq!(output, "A,B\nx,1\ny,2\n");
    }

    #[test]
    fn test_schema_drift_is_rejected() {
        let rows = vec![
            row(&[("A", Some("x")), ("B", Some("1"))]),
            row(&[("A", Some("y")), ("C", Some("2"))]),
        ];
        let (summary, output) = write_rows(&rows, &CsvOptions::default());

        match summary.unwrap_err() {
            ExtractorError::SchemaDrift { row, expected, actual, .. } => {
                assert_eq!(row, 2);
                assert_eq!(expected, vec!["A", "B"]);
                assert_eq!(actual, vec!["A", "C"]);
            }
            other => panic!("unexpected error: {}", other),
        }
        // The rows before the drift are flushed on drop
        assert_eq!(output, "A,B\nx,1\n");
    }

    #[test]
    fn test_extra_field_is_rejected() {
        let rows = vec![
            row(&[("A", Some("x"))]),
            row(&[("A", Some("y")), ("B", Some("2"))]),
        ];
        let (summary, _) = write_rows(&rows, &CsvOptions::default());
        assert!(matches!(
            summary.unwrap_err(),
            ExtractorError::SchemaDrift { row: 2, .. }
        ));
    }

    #[test]
    fn test_no_rows_writes_nothing() {
        let (summary, output) = write_rows(&[Row::default()], &CsvOptions::default());

        assert_eq!(output, "");
        assert_eq!(summary.unwrap(), WriteSummary::default());
    }

    #[test]
    fn test_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut writer = RowStreamWriter::create(&path, &CsvOptions::default(), "out").unwrap();
        writer.write_row(&row(&[("ID", Some("1"))])).unwrap();
        assert_eq!(writer.rows_written(), 1);
        assert_eq!(writer.header(), Some(&["ID".to_string()][..]));
        writer.finish().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ID\n1\n");
    }
}
