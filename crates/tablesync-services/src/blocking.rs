//! Blocking facade over `DatabaseTableSync`
//!
//! Owns a small Tokio runtime and blocks the calling thread for every
//! operation. Must not be used from inside an async runtime.

use std::path::Path;

use tablesync_core::{Connection, ConnectionError, CredentialSet, QueryError, Table};
use tablesync_interchange::{ExportError, ExportSummary, ImportError};
use tokio::runtime::Runtime;

use crate::{DatabaseTableSync, SyncOptions};

fn build_runtime() -> Result<Runtime, ConnectionError> {
    // One worker keeps driving the connection task and cancel requests
    // between calls.
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .thread_name("tablesync-runtime")
        .build()
        .map_err(|e| ConnectionError::BuildFailed(format!("failed to start Tokio runtime: {}", e)))
}

/// Synchronous `DatabaseTableSync`
#[derive(Debug)]
pub struct BlockingTableSync {
    inner: DatabaseTableSync,
    runtime: Runtime,
}

impl BlockingTableSync {
    /// Connect to PostgreSQL, blocking until the session is open
    pub fn create(credentials: CredentialSet, options: SyncOptions) -> Result<Self, ConnectionError> {
        let runtime = build_runtime()?;
        let inner = runtime.block_on(DatabaseTableSync::create(credentials, options))?;
        Ok(Self { inner, runtime })
    }

    /// Build around an already open connection
    pub fn with_connection(
        connection: Box<dyn Connection>,
        options: SyncOptions,
    ) -> Result<Self, ConnectionError> {
        Ok(Self {
            inner: DatabaseTableSync::with_connection(connection, options),
            runtime: build_runtime()?,
        })
    }

    pub fn options(&self) -> &SyncOptions {
        self.inner.options()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn extract(&mut self) -> Result<Table, QueryError> {
        self.runtime.block_on(self.inner.extract())
    }

    pub fn export_to_csv(&mut self, path: impl AsRef<Path>) -> Result<ExportSummary, ExportError> {
        self.runtime.block_on(self.inner.export_to_csv(path))
    }

    pub fn import_from_csv(&mut self, path: impl AsRef<Path>) -> Result<Table, ImportError> {
        self.runtime.block_on(self.inner.import_from_csv(path))
    }

    pub fn close(&mut self) -> Result<(), ConnectionError> {
        self.runtime.block_on(self.inner.close())
    }
}

impl Drop for BlockingTableSync {
    fn drop(&mut self) {
        if self.inner.is_closed() || tokio::runtime::Handle::try_current().is_ok() {
            return;
        }
        if let Err(e) = self.runtime.block_on(self.inner.close()) {
            tracing::warn!(error = %e, "failed to close connection on drop");
        }
    }
}
