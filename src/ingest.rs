//! Row-iteration drivers: open a tabular source, feed every cell to its
//! column's inference engine in row order, then finalize each column.
//!
//! The drivers contain no inference logic of their own. Columns are created
//! from the header row (or unnamed when the source has none), mutated only
//! through their own `process_value`/`finalize` calls, and returned complete
//! and read-only.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    column::{Column, RawValue},
    io_utils, workbook,
};

/// Options shared by both readers.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Whether the first row carries column labels (used only for
    /// diagnostics).
    pub has_headers: bool,
    /// Truncates iteration after this many data rows.
    pub row_limit: Option<usize>,
    /// Additional sentinel strings treated as absent, on top of the default
    /// set.
    pub extra_absent_tokens: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            has_headers: true,
            row_limit: None,
            extra_absent_tokens: Vec::new(),
        }
    }
}

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls"];

pub fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

/// Dispatches to the workbook or delimited-text reader by extension.
pub fn read_source(
    path: &Path,
    sheet: Option<&str>,
    delimiter: u8,
    encoding: &'static Encoding,
    options: &IngestOptions,
) -> Result<Vec<Column>> {
    if is_workbook_path(path) {
        read_workbook(path, sheet, options)
    } else {
        ensure!(
            sheet.is_none(),
            "--sheet applies only to workbook inputs ({path:?} is delimited text)"
        );
        read_csv(path, delimiter, encoding, options)
    }
}

/// Reads a delimited-text source, inferring one column per field.
pub fn read_csv(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
    options: &IngestOptions,
) -> Result<Vec<Column>> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, options.has_headers)?;
    let mut columns: Vec<Column> = if options.has_headers {
        io_utils::reader_headers(&mut reader, encoding)?
            .into_iter()
            .map(|header| new_column(Some(header), options))
            .collect()
    } else {
        Vec::new()
    };

    let mut record = csv::ByteRecord::new();
    let mut rows = 0usize;
    while reader.read_byte_record(&mut record)? {
        if options.row_limit.is_some_and(|limit| rows >= limit) {
            break;
        }
        let fields = io_utils::decode_record(&record, encoding)?;
        if columns.is_empty() {
            columns = (0..fields.len())
                .map(|_| new_column(None, options))
                .collect();
        }
        ensure!(
            fields.len() == columns.len(),
            "Row {} has {} field(s), expected {}",
            rows + 1,
            fields.len(),
            columns.len()
        );
        for (column, field) in columns.iter_mut().zip(fields) {
            column.process_value(RawValue::Text(field))?;
        }
        rows += 1;
    }
    finalize_columns(&mut columns)?;
    debug!("read {} row(s) across {} column(s)", rows, columns.len());
    Ok(columns)
}

/// Reads an XLSX worksheet, inferring one column per sheet column.
pub fn read_workbook(
    path: &Path,
    sheet: Option<&str>,
    options: &IngestOptions,
) -> Result<Vec<Column>> {
    let range = workbook::read_range(path, sheet)?;
    let mut iter = range.rows();

    let mut columns: Vec<Column> = if options.has_headers {
        match iter.next() {
            Some(header_row) => header_row
                .iter()
                .map(|cell| {
                    let label = workbook::cell_label(cell);
                    let name = (!label.is_empty()).then_some(label);
                    new_column(name, options)
                })
                .collect(),
            None => Vec::new(),
        }
    } else {
        Vec::new()
    };

    let mut rows = 0usize;
    for row in iter {
        if options.row_limit.is_some_and(|limit| rows >= limit) {
            break;
        }
        if columns.is_empty() {
            columns = (0..row.len()).map(|_| new_column(None, options)).collect();
        }
        ensure!(
            row.len() == columns.len(),
            "Row {} has {} cell(s), expected {}",
            rows + 1,
            row.len(),
            columns.len()
        );
        for (column, cell) in columns.iter_mut().zip(row) {
            column.process_value(workbook::cell_to_raw(cell))?;
        }
        rows += 1;
    }
    finalize_columns(&mut columns)?;
    info!(
        "read {} row(s) across {} column(s) from {:?}",
        rows,
        columns.len(),
        path
    );
    Ok(columns)
}

fn new_column(name: Option<String>, options: &IngestOptions) -> Column {
    Column::with_absent_tokens(name, options.extra_absent_tokens.clone())
}

fn finalize_columns(columns: &mut [Column]) -> Result<()> {
    for column in columns.iter_mut() {
        column
            .finalize()
            .context("Finalizing column conversions")?;
    }
    Ok(())
}

/// Row count of a completed column set (0 for an empty source).
pub fn row_count(columns: &[Column]) -> usize {
    columns.first().map_or(0, |column| column.values().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::DataType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("temp file");
        file.write_all(contents.as_bytes()).expect("write csv");
        file
    }

    #[test]
    fn csv_columns_take_header_names_and_types() {
        let file = write_csv("id,price,seen\n1,9.75,2023-04-15\n2,3.50,2023-01-05\n");
        let columns = read_csv(
            file.path(),
            b',',
            encoding_rs::UTF_8,
            &IngestOptions::default(),
        )
        .expect("read csv");

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name(), Some("id"));
        assert_eq!(columns[0].data_type(), DataType::Integer);
        assert_eq!(columns[1].data_type(), DataType::Float);
        assert_eq!(columns[2].data_type(), DataType::Date);
        assert_eq!(columns[2].resolved_pattern(), Some("%Y-%m-%d"));
        assert_eq!(row_count(&columns), 2);
    }

    #[test]
    fn headerless_sources_leave_columns_unnamed() {
        let file = write_csv("1,alpha\n2,beta\n");
        let options = IngestOptions {
            has_headers: false,
            ..IngestOptions::default()
        };
        let columns =
            read_csv(file.path(), b',', encoding_rs::UTF_8, &options).expect("read csv");

        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name(), None);
        assert_eq!(columns[0].data_type(), DataType::Integer);
        assert_eq!(columns[1].data_type(), DataType::String);
    }

    #[test]
    fn row_limit_truncates_iteration() {
        let file = write_csv("n\n1\n2\n3\n4\n");
        let options = IngestOptions {
            row_limit: Some(2),
            ..IngestOptions::default()
        };
        let columns =
            read_csv(file.path(), b',', encoding_rs::UTF_8, &options).expect("read csv");
        assert_eq!(row_count(&columns), 2);
    }

    #[test]
    fn unresolved_temporal_column_is_a_hard_failure() {
        let file = write_csv("when\n03-04-05\n04-05-06\n");
        let err = read_csv(
            file.path(),
            b',',
            encoding_rs::UTF_8,
            &IngestOptions::default(),
        )
        .expect_err("must not resolve");
        assert!(err.to_string().contains("Finalizing column conversions"));
    }

    #[test]
    fn sheet_option_is_rejected_for_delimited_text() {
        let file = write_csv("a\n1\n");
        let err = read_source(
            file.path(),
            Some("Sheet1"),
            b',',
            encoding_rs::UTF_8,
            &IngestOptions::default(),
        )
        .expect_err("sheet must be rejected");
        assert!(err.to_string().contains("--sheet"));
    }
}
