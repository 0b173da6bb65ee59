//! PostgreSQL connection implementation

use async_trait::async_trait;
use postgres_native_tls::MakeTlsConnector;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tablesync_core::security::TlsMode;
use tablesync_core::{
    Column, Connection, ConnectionError, CredentialSet, QueryCancelHandle, QueryError, Table,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::{CancelToken, Client, NoTls};

use crate::decode::{check_columns, postgres_to_value};
use crate::driver::ConnectOptions;
use crate::tls::PostgresTlsConnector;

/// Cancel handle for PostgreSQL queries.
///
/// Wraps the tokio-postgres `CancelToken`; the cancel request is sent on the
/// current Tokio runtime.
pub struct PostgresCancelHandle {
    cancel_token: CancelToken,
}

impl QueryCancelHandle for PostgresCancelHandle {
    fn cancel(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no Tokio runtime available to send PostgreSQL cancel request");
            return;
        };
        tracing::debug!("sending cancel request to PostgreSQL server");
        let cancel_token = self.cancel_token.clone();
        runtime.spawn(async move {
            if let Err(e) = cancel_token.cancel_query(NoTls).await {
                tracing::warn!(error = %e, "failed to cancel PostgreSQL query");
            } else {
                tracing::debug!("PostgreSQL cancel request sent successfully");
            }
        });
    }
}

/// Render a driver error with SQLSTATE, detail and hint when the server sent them
pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail().filter(|d| !d.trim().is_empty()) {
        message.push_str(&format!(" (detail: {})", detail));
    }

    if let Some(hint) = db_error.hint().filter(|h| !h.trim().is_empty()) {
        message.push_str(&format!(" (hint: {})", hint));
    }

    match db_error.code().code() {
        "42P01" => format!("table does not exist: {}", message),
        "42501" => format!("permission denied: {}", message),
        "28P01" | "28000" => format!("authentication failed: {}", message),
        "3D000" => format!("database does not exist: {}", message),
        code => format!("{} (SQLSTATE {})", message, code),
    }
}

/// A single PostgreSQL session.
///
/// The client and its background connection task live until `close` is
/// called or the value is dropped; dropping the client makes the task send
/// a terminate message and finish.
pub struct PostgresConnection {
    client: Mutex<Option<Client>>,
    connection_task: Mutex<Option<JoinHandle<()>>>,
    cancel_token: CancelToken,
    closed: AtomicBool,
}

impl PostgresConnection {
    /// Open a session. Must be called from within a Tokio runtime.
    #[tracing::instrument(skip_all, fields(host = %credentials.host(), port = credentials.port(), database = %credentials.database()))]
    pub async fn connect(
        credentials: &CredentialSet,
        options: &ConnectOptions,
    ) -> Result<Self, ConnectionError> {
        let tls = credentials.tls();
        tracing::info!(sslmode = tls.mode.as_sslmode(), "connecting to PostgreSQL database");

        let mut config = tokio_postgres::Config::new();
        config
            .host(credentials.host())
            .port(credentials.port())
            .dbname(credentials.database())
            .user(credentials.user())
            .password(credentials.password())
            .application_name(&options.application_name)
            .connect_timeout(options.connect_timeout);

        config.ssl_mode(match tls.mode {
            TlsMode::Disable => tokio_postgres::config::SslMode::Disable,
            TlsMode::Prefer => tokio_postgres::config::SslMode::Prefer,
            TlsMode::Require | TlsMode::VerifyCa | TlsMode::VerifyFull => {
                tokio_postgres::config::SslMode::Require
            }
        });

        let connect_failed =
            |e: tokio_postgres::Error| ConnectionError::BuildFailed(format_postgres_error(&e));

        let (client, connection_task) = if tls.mode == TlsMode::Disable {
            let (client, connection) = with_timeout(options, config.connect(NoTls))
                .await?
                .map_err(connect_failed)?;
            let task = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL connection error");
                }
            });
            (client, task)
        } else {
            let connector: MakeTlsConnector = PostgresTlsConnector::build(tls)
                .map_err(|e| ConnectionError::BuildFailed(e.to_string()))?;
            let (client, connection) = with_timeout(options, config.connect(connector))
                .await?
                .map_err(connect_failed)?;
            let task = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!(error = %e, "PostgreSQL connection error");
                }
            });
            (client, task)
        };

        tracing::info!("PostgreSQL connection established");
        Ok(Self {
            cancel_token: client.cancel_token(),
            client: Mutex::new(Some(client)),
            connection_task: Mutex::new(Some(connection_task)),
            closed: AtomicBool::new(false),
        })
    }
}

async fn with_timeout<F, T>(options: &ConnectOptions, future: F) -> Result<T, ConnectionError>
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(options.connect_timeout, future)
        .await
        .map_err(|_| {
            ConnectionError::BuildFailed(format!(
                "timed out after {:?} waiting for the server",
                options.connect_timeout
            ))
        })
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgresql"
    }

    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str) -> Result<Table, QueryError> {
        let start_time = std::time::Instant::now();

        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(QueryError::ConnectionClosed)?;

        // Prepare first so empty result sets still carry their columns.
        let statement = client.prepare(sql).await.map_err(|e| {
            QueryError::ExecutionFailed(format!(
                "failed to prepare query: {}",
                format_postgres_error(&e)
            ))
        })?;
        check_columns(statement.columns())?;

        let pg_rows = client.query(&statement, &[]).await.map_err(|e| {
            QueryError::ExecutionFailed(format!(
                "failed to execute query: {}",
                format_postgres_error(&e)
            ))
        })?;
        drop(guard);

        let mut table = Table::new(
            statement
                .columns()
                .iter()
                .map(|col| Column::with_type(col.name(), col.type_().name()))
                .collect(),
        )
        .map_err(|e| QueryError::ExecutionFailed(e.to_string()))?;

        for pg_row in &pg_rows {
            let values = (0..pg_row.len())
                .map(|idx| postgres_to_value(pg_row, idx))
                .collect::<Result<Vec<_>, _>>()?;
            table
                .push_row(values)
                .map_err(|e| QueryError::ExecutionFailed(e.to_string()))?;
        }

        tracing::debug!(
            row_count = table.row_count(),
            column_count = table.column_count(),
            execution_time_ms = start_time.elapsed().as_millis() as u64,
            "query executed successfully"
        );

        Ok(table)
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!("closing PostgreSQL connection");

        // Dropping the client makes the connection task terminate the session.
        drop(self.client.lock().await.take());

        if let Some(task) = self.connection_task.lock().await.take() {
            task.await
                .map_err(|e| ConnectionError::CloseFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn cancel_handle(&self) -> Option<Arc<dyn QueryCancelHandle>> {
        Some(Arc::new(PostgresCancelHandle {
            cancel_token: self.cancel_token.clone(),
        }))
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            tracing::debug!("PostgreSQL connection dropped without close; releasing session");
        }
    }
}
