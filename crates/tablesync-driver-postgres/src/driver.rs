//! PostgreSQL driver entry point

use std::time::Duration;
use tablesync_core::{ConnectionError, CredentialSet};

use crate::PostgresConnection;

/// Options applied while opening a session
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Upper bound on establishing the session, TLS handshake included
    pub connect_timeout: Duration,
    /// Reported to the server as `application_name`
    pub application_name: String,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            application_name: "tablesync".to_string(),
        }
    }
}

/// PostgreSQL database driver
pub struct PostgresDriver;

impl PostgresDriver {
    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &'static str {
        "postgresql"
    }

    /// Open a connection described by `credentials`
    #[tracing::instrument(skip_all, fields(target = %self.redacted_connection_string(credentials)))]
    pub async fn connect(
        &self,
        credentials: &CredentialSet,
        options: &ConnectOptions,
    ) -> Result<PostgresConnection, ConnectionError> {
        PostgresConnection::connect(credentials, options)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "failed to connect to PostgreSQL database"))
    }

    /// `postgresql://{user}:{password}@{host}:{port}/{database}`
    pub fn build_connection_string(&self, credentials: &CredentialSet) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            credentials.user(),
            credentials.password(),
            credentials.host(),
            credentials.port(),
            credentials.database()
        )
    }

    /// The connection string with the password masked, for logs and messages
    pub fn redacted_connection_string(&self, credentials: &CredentialSet) -> String {
        format!(
            "postgresql://{}:****@{}:{}/{}",
            credentials.user(),
            credentials.host(),
            credentials.port(),
            credentials.database()
        )
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}
