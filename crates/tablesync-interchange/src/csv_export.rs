//! CSV export
//!
//! The table is written to a temporary file next to the destination and
//! renamed over it once every record is flushed, so readers never observe a
//! partially written file and a failed export leaves nothing behind.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use tablesync_core::{QueryError, Table};

use crate::CsvOptions;
use crate::value_encoding::encode_field;

/// Errors during CSV export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to extract table: {0}")]
    ExtractFailed(#[from] QueryError),

    #[error("failed to write CSV: {0}")]
    WriteFailed(String),
}

/// What an export produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Destination file
    pub path: PathBuf,
    /// Data rows written, header excluded
    pub rows: usize,
    /// Columns per row
    pub columns: usize,
}

/// Write `table` as CSV into any writer
pub fn write_table<W: Write>(
    table: &Table,
    writer: W,
    options: &CsvOptions,
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);

    if options.include_headers && table.column_count() > 0 {
        csv_writer.write_record(table.column_names())?;
    }

    for row in table.rows() {
        csv_writer.write_record(row.into_iter().map(encode_field))?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write `table` to `path`, replacing any existing file atomically.
///
/// A table without columns is refused: the file would be empty, and
/// `read_csv` rejects an empty file for lack of a header row.
#[tracing::instrument(skip_all, fields(path = %path.display(), rows = table.row_count()))]
pub fn write_csv(
    table: &Table,
    path: &Path,
    options: &CsvOptions,
) -> Result<ExportSummary, ExportError> {
    if table.column_count() == 0 {
        return Err(ExportError::WriteFailed(format!(
            "{}: table has no columns",
            path.display()
        )));
    }

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(directory).map_err(|e| {
        ExportError::WriteFailed(format!(
            "cannot create temporary file in {}: {}",
            directory.display(),
            e
        ))
    })?;

    // On any error below the temp file is dropped and removed.
    write_table(table, temp_file.as_file_mut(), options)
        .map_err(|e| ExportError::WriteFailed(format!("{}: {}", path.display(), e)))?;

    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| ExportError::WriteFailed(format!("{}: {}", path.display(), e)))?;

    temp_file
        .persist(path)
        .map_err(|e| ExportError::WriteFailed(format!("{}: {}", path.display(), e.error)))?;

    let summary = ExportSummary {
        path: path.to_path_buf(),
        rows: table.row_count(),
        columns: table.column_count(),
    };
    tracing::info!(
        rows = summary.rows,
        columns = summary.columns,
        "CSV export complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use tablesync_core::Value;

    fn loan_payments() -> Table {
        Table::from_rows(
            ["id", "amount"],
            vec![
                vec![Value::Int32(1), Value::Decimal("100.00".into())],
                vec![Value::Int32(2), Value::Decimal("250.50".into())],
                vec![Value::Int32(3), Value::Null],
            ],
        )
        .unwrap()
    }

    fn render(table: &Table, options: &CsvOptions) -> String {
        let mut buffer = Vec::new();
        write_table(table, &mut buffer, options).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_header_then_rows_in_order() {
        assert_eq!(
            render(&loan_payments(), &CsvOptions::default()),
            indoc! {"
                id,amount
                1,100.00
                2,250.50
                3,
            "}
        );
    }

    #[test]
    fn test_special_characters_are_quoted() {
        let table = Table::from_rows(
            ["note"],
            vec![
                vec![Value::String("a,b".into())],
                vec![Value::String("say \"hi\"".into())],
                vec![Value::String("two\nlines".into())],
            ],
        )
        .unwrap();

        assert_eq!(
            render(&table, &CsvOptions::default()),
            "note\n\"a,b\"\n\"say \"\"hi\"\"\"\n\"two\nlines\"\n"
        );
    }

    #[test]
    fn test_delimiter_and_header_options() {
        let options = CsvOptions::default().with_delimiter(b';').with_headers(false);
        assert_eq!(
            render(&loan_payments(), &options),
            "1;100.00\n2;250.50\n3;\n"
        );
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let table = Table::with_columns(["id", "amount"]);
        assert_eq!(render(&table, &CsvOptions::default()), "id,amount\n");
    }

    #[test]
    fn test_write_csv_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loan_payments.csv");
        std::fs::write(&path, "stale").unwrap();

        let summary = write_csv(&loan_payments(), &path, &CsvOptions::default()).unwrap();

        assert_eq!(
            summary,
            ExportSummary {
                path: path.clone(),
                rows: 3,
                columns: 2,
            }
        );
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("id,amount\n"));
        assert_eq!(written.lines().count(), 4);
        // Only the destination remains; the temporary file was renamed.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_directory_fails_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");

        let err = write_csv(&loan_payments(), &path, &CsvOptions::default()).unwrap_err();

        assert!(matches!(err, ExportError::WriteFailed(_)), "{:?}", err);
        assert!(!path.exists());
    }

    #[test]
    fn test_zero_column_table_is_refused_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        let err = write_csv(&Table::default(), &path, &CsvOptions::default()).unwrap_err();

        match err {
            ExportError::WriteFailed(message) => {
                assert!(message.contains("no columns"), "{}", message);
            }
            other => panic!("expected WriteFailed, got {:?}", other),
        }
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_directory_as_destination_fails_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("occupied");
        std::fs::create_dir(&target).unwrap();

        let err = write_csv(&loan_payments(), &target, &CsvOptions::default()).unwrap_err();

        assert!(matches!(err, ExportError::WriteFailed(_)), "{:?}", err);
        assert!(target.is_dir());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
