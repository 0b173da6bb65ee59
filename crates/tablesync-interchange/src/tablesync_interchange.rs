//! CSV interchange for tablesync tables
//!
//! Tables are written as RFC 4180 CSV with a header row and no index column,
//! and read back with the header naming the columns.
//!
//! ```text
//! Table → encode_field → csv::Writer → temp file → rename over destination
//! file → csv::Reader → decode_field (ValueInference) → Table
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let summary = write_csv(&table, Path::new("loan_payments.csv"), &CsvOptions::default())?;
//! let restored = read_csv(&summary.path, &CsvOptions::default())?;
//! ```

mod csv_export;
mod csv_import;
mod options;
mod value_encoding;

pub use csv_export::{ExportError, ExportSummary, write_csv, write_table};
pub use csv_import::{ImportError, read_csv, read_table};
pub use options::{CsvOptions, ValueInference};
pub use value_encoding::{decode_field, encode_field};
