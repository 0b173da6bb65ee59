//! Single-table extract, CSV export and CSV import

use std::path::Path;
use std::time::Duration;

use tablesync_core::{Connection, ConnectionError, CredentialSet, QueryError, Table};
use tablesync_driver_postgres::{ConnectOptions, PostgresDriver};
use tablesync_interchange::{
    CsvOptions, ExportError, ExportSummary, ImportError, read_csv, write_csv,
};

/// Runtime options for one `DatabaseTableSync`
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Table read by `extract`, optionally schema-qualified (`schema.table`).
    ///
    /// Every `.` separates two identifiers, so a table or schema whose own
    /// name contains a dot cannot be addressed.
    pub table: String,
    /// Upper bound on a single query
    pub query_timeout: Duration,
    /// Upper bound on opening the connection
    pub connect_timeout: Duration,
    /// CSV dialect for export and import
    pub csv: CsvOptions,
}

impl SyncOptions {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            query_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            csv: CsvOptions::default(),
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_csv(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }
}

/// Quote a possibly schema-qualified name as PostgreSQL identifiers.
///
/// `public.loan_payments` becomes `"public"."loan_payments"`; embedded double
/// quotes are doubled. The name is split on every `.`, so `a.b.c` becomes
/// three identifiers and a dot can never be part of a single one.
pub fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Owns one database connection and moves a single table between the
/// database and CSV files.
///
/// The connection is opened eagerly by `create` and released by `close` or
/// when the value is dropped.
pub struct DatabaseTableSync {
    connection: Box<dyn Connection>,
    options: SyncOptions,
}

impl std::fmt::Debug for DatabaseTableSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseTableSync")
            .field("driver", &self.connection.driver_name())
            .field("closed", &self.connection.is_closed())
            .field("options", &self.options)
            .finish()
    }
}

impl DatabaseTableSync {
    /// Connect to PostgreSQL with `credentials`.
    ///
    /// The credentials are consumed; nothing is kept but the open session.
    #[tracing::instrument(skip_all, fields(table = %options.table))]
    pub async fn create(
        credentials: CredentialSet,
        options: SyncOptions,
    ) -> Result<Self, ConnectionError> {
        let connect_options = ConnectOptions {
            connect_timeout: options.connect_timeout,
            ..ConnectOptions::default()
        };
        let connection = PostgresDriver::new()
            .connect(&credentials, &connect_options)
            .await?;
        Ok(Self::with_connection(Box::new(connection), options))
    }

    /// Build around an already open connection
    pub fn with_connection(connection: Box<dyn Connection>, options: SyncOptions) -> Self {
        Self {
            connection,
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    /// The statement `extract` runs
    pub fn select_statement(&self) -> String {
        format!("SELECT * FROM {}", quote_identifier(&self.options.table))
    }

    /// Read the whole table.
    ///
    /// On timeout the running query is cancelled on the server.
    #[tracing::instrument(skip(self), fields(table = %self.options.table))]
    pub async fn extract(&mut self) -> Result<Table, QueryError> {
        let sql = self.select_statement();
        let timeout = self.options.query_timeout;

        match tokio::time::timeout(timeout, self.connection.query(&sql)).await {
            Ok(Ok(table)) => {
                tracing::info!(
                    rows = table.row_count(),
                    columns = table.column_count(),
                    "table extracted"
                );
                Ok(table)
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "extract failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(?timeout, "extract timed out, cancelling query");
                if let Some(handle) = self.connection.cancel_handle() {
                    handle.cancel();
                }
                Err(QueryError::TimedOut(timeout))
            }
        }
    }

    /// Extract the table and write it to `path` as CSV
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn export_to_csv(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<ExportSummary, ExportError> {
        let table = self.extract().await?;
        write_csv(&table, path.as_ref(), &self.options.csv)
    }

    /// Read a CSV file written by `export_to_csv` or any compatible tool
    pub async fn import_from_csv(&mut self, path: impl AsRef<Path>) -> Result<Table, ImportError> {
        read_csv(path.as_ref(), &self.options.csv)
    }

    /// Release the connection. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<(), ConnectionError> {
        self.connection.close().await
    }

    /// Close the connection, then hand back `result` unchanged.
    ///
    /// A failure to close is logged as a warning; it never replaces the
    /// outcome of work that already finished.
    pub async fn finish<T, E>(mut self, result: Result<T, E>) -> Result<T, E> {
        if let Err(e) = self.close().await {
            tracing::warn!(error = %e, "failed to close the connection");
        }
        result
    }
}
