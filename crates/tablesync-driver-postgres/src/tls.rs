//! PostgreSQL TLS Support
//!
//! Builds `native-tls` connectors for tokio-postgres from the TLS settings
//! carried by a credential set.

use native_tls::{Certificate, TlsConnector as NativeTlsConnector, TlsConnectorBuilder};
use postgres_native_tls::MakeTlsConnector;
use std::fs;
use std::path::Path;
use tablesync_core::security::{TlsConfig, TlsMode};
use tracing::{debug, info};

/// Error types for TLS operations
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// Failed to load CA certificate
    #[error("failed to load CA certificate from {path}: {source}")]
    CaCertLoadFailed {
        path: String,
        source: std::io::Error,
    },

    /// Invalid CA certificate format
    #[error("invalid CA certificate format: {0}")]
    InvalidCaCert(String),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),

    /// TLS mode not supported
    #[error("TLS mode {mode:?} does not use a TLS connector")]
    UnsupportedMode { mode: TlsMode },
}

/// Builds TLS connectors suitable for tokio-postgres
#[derive(Debug, Clone)]
pub struct PostgresTlsConnector;

impl PostgresTlsConnector {
    /// Build a TLS connector from configuration
    ///
    /// `prefer` and `require` encrypt without verifying the server, matching
    /// libpq. `verify-ca` checks the chain, `verify-full` also the hostname.
    pub fn build(config: &TlsConfig) -> Result<MakeTlsConnector, TlsError> {
        if config.mode == TlsMode::Disable {
            return Err(TlsError::UnsupportedMode { mode: config.mode });
        }

        info!(mode = config.mode.as_sslmode(), "building PostgreSQL TLS connector");

        let mut builder = NativeTlsConnector::builder();
        configure_verification(&mut builder, config);

        if let Some(ca_cert_path) = &config.ca_cert {
            apply_ca_cert(&mut builder, ca_cert_path)?;
        }

        let connector = builder
            .build()
            .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;

        debug!("TLS connector built successfully");
        Ok(MakeTlsConnector::new(connector))
    }
}

/// Configure certificate verification based on TLS mode
fn configure_verification(builder: &mut TlsConnectorBuilder, config: &TlsConfig) {
    match config.mode {
        TlsMode::Disable => {}
        TlsMode::Prefer | TlsMode::Require => {
            // A CA certificate upgrades require to chain verification, as in libpq.
            if config.ca_cert.is_none() {
                builder.danger_accept_invalid_certs(true);
            }
            builder.danger_accept_invalid_hostnames(true);
        }
        TlsMode::VerifyCa => {
            debug!("enabling CA verification only (hostname verification disabled)");
            builder.danger_accept_invalid_hostnames(true);
        }
        TlsMode::VerifyFull => {
            debug!("enabling full certificate verification");
        }
    }
}

/// Load and apply a PEM-encoded CA certificate to the TLS builder
fn apply_ca_cert(builder: &mut TlsConnectorBuilder, path: &Path) -> Result<(), TlsError> {
    debug!(path = %path.display(), "loading CA certificate");

    let pem_data = fs::read(path).map_err(|e| TlsError::CaCertLoadFailed {
        path: path.display().to_string(),
        source: e,
    })?;

    let cert =
        Certificate::from_pem(&pem_data).map_err(|e| TlsError::InvalidCaCert(e.to_string()))?;
    builder.add_root_certificate(cert);

    Ok(())
}
