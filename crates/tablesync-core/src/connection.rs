//! Connection trait and query cancellation

use crate::{ConnectionError, QueryError, Table};
use async_trait::async_trait;
use std::sync::Arc;

/// Handle for cancelling a running query from any thread.
///
/// Safe to call when no query is running; repeated calls are no-ops.
pub trait QueryCancelHandle: Send + Sync {
    /// Cancel the currently running query on the associated connection.
    fn cancel(&self);
}

/// A live database session.
///
/// A connection is opened by a driver and owned by exactly one component.
/// `close` releases the session; dropping the connection must release it too.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "postgresql")
    fn driver_name(&self) -> &str;

    /// Execute a query and collect every row into a table
    async fn query(&self, sql: &str) -> Result<Table, QueryError>;

    /// Close the connection. Closing twice is a no-op.
    async fn close(&self) -> Result<(), ConnectionError>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Get a handle that can cancel the running query.
    ///
    /// Returns `None` if the driver does not support query cancellation.
    fn cancel_handle(&self) -> Option<Arc<dyn QueryCancelHandle>> {
        None
    }
}
