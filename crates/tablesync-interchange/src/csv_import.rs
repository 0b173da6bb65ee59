//! CSV import
//!
//! The first record names the columns; every following record becomes one
//! row. Records must all have the header's width.

use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use tablesync_core::Table;

use crate::CsvOptions;
use crate::value_encoding::decode_field;

/// Errors during CSV import
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid CSV: {0}")]
    ParseError(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn parse_error(error: csv::Error) -> ImportError {
    let position = error
        .position()
        .map(|p| format!("line {}: ", p.line()))
        .unwrap_or_default();

    let message = match error.into_kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("record has {} fields, header has {}", len, expected_len),
        csv::ErrorKind::Utf8 { err, .. } => format!("invalid UTF-8: {}", err),
        csv::ErrorKind::Io(e) => e.to_string(),
        other => format!("{:?}", other),
    };

    ImportError::ParseError(format!("{}{}", position, message))
}

/// Read a table from any reader
pub fn read_table<R: Read>(reader: R, options: &CsvOptions) -> Result<Table, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(parse_error)?.clone();
    if headers.is_empty() {
        return Err(ImportError::ParseError(
            "missing header row: the file is empty".to_string(),
        ));
    }

    let mut table = Table::with_columns(headers.iter());
    for record in csv_reader.records() {
        let record = record.map_err(parse_error)?;
        let row = record
            .iter()
            .map(|field| decode_field(field, options.inference))
            .collect();
        table
            .push_row(row)
            .map_err(|e| ImportError::ParseError(e.to_string()))?;
    }

    Ok(table)
}

/// Read the CSV file at `path` into a table
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn read_csv(path: &Path, options: &CsvOptions) -> Result<Table, ImportError> {
    let content = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ImportError::NotFound(path.to_path_buf()),
        _ => ImportError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let table = read_table(content.as_slice(), options)?;
    tracing::info!(
        rows = table.row_count(),
        columns = table.column_count(),
        "CSV import complete"
    );
    Ok(table)
}
