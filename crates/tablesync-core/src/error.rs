//! Error types for tablesync

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure while loading a credentials file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration syntax: {0}")]
    ParseError(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Failure while opening or closing a database connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("failed to build database connection: {0}")]
    BuildFailed(String),

    #[error("failed to close database connection: {0}")]
    CloseFailed(String),
}

/// Failure while running a query
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("query execution failed: {0}")]
    ExecutionFailed(String),

    #[error("query timed out after {0:?}")]
    TimedOut(Duration),

    #[error("connection is closed")]
    ConnectionClosed,
}

/// Violation of the rectangular table invariant
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TableError {
    #[error("column `{column}` has {actual} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("row {row} has {actual} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
}
