//! TLS/SSL settings for database connections

use std::path::PathBuf;
use std::str::FromStr;

/// TLS/SSL mode, following PostgreSQL's `sslmode` names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Never use TLS
    Disable,
    /// Try TLS first, fall back to unencrypted if the server refuses
    #[default]
    Prefer,
    /// Require TLS, but don't verify the server certificate
    Require,
    /// Require TLS and verify the server certificate against the CA
    VerifyCa,
    /// Require TLS, verify CA, and verify the server hostname matches
    VerifyFull,
}

impl TlsMode {
    /// Returns true if this mode refuses unencrypted connections
    pub fn requires_encryption(&self) -> bool {
        matches!(
            self,
            TlsMode::Require | TlsMode::VerifyCa | TlsMode::VerifyFull
        )
    }

    /// The `sslmode` keyword for this mode
    pub fn as_sslmode(&self) -> &'static str {
        match self {
            TlsMode::Disable => "disable",
            TlsMode::Prefer => "prefer",
            TlsMode::Require => "require",
            TlsMode::VerifyCa => "verify-ca",
            TlsMode::VerifyFull => "verify-full",
        }
    }
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disable" => Ok(TlsMode::Disable),
            "allow" | "prefer" => Ok(TlsMode::Prefer),
            "require" => Ok(TlsMode::Require),
            "verify-ca" | "verify_ca" => Ok(TlsMode::VerifyCa),
            "verify-full" | "verify_full" => Ok(TlsMode::VerifyFull),
            other => Err(format!(
                "unknown sslmode `{}` (expected disable, prefer, require, verify-ca or verify-full)",
                other
            )),
        }
    }
}

/// TLS configuration attached to a credential set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    pub mode: TlsMode,
    /// PEM-encoded CA certificate used to verify the server
    pub ca_cert: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sslmode() {
        assert_eq!("disable".parse::<TlsMode>(), Ok(TlsMode::Disable));
        assert_eq!("Prefer".parse::<TlsMode>(), Ok(TlsMode::Prefer));
        assert_eq!("allow".parse::<TlsMode>(), Ok(TlsMode::Prefer));
        assert_eq!("verify_full".parse::<TlsMode>(), Ok(TlsMode::VerifyFull));
        assert!("sometimes".parse::<TlsMode>().is_err());
    }

    #[test]
    fn test_requires_encryption() {
        assert!(!TlsMode::Disable.requires_encryption());
        assert!(!TlsMode::Prefer.requires_encryption());
        assert!(TlsMode::Require.requires_encryption());
        assert!(TlsMode::VerifyFull.requires_encryption());
    }

    #[test]
    fn test_sslmode_round_trip() {
        for mode in [
            TlsMode::Disable,
            TlsMode::Prefer,
            TlsMode::Require,
            TlsMode::VerifyCa,
            TlsMode::VerifyFull,
        ] {
            assert_eq!(mode.as_sslmode().parse::<TlsMode>(), Ok(mode));
        }
    }
}
