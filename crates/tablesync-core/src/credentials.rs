//! Database credentials and the loader that reads them from disk
//!
//! A credentials file is a flat key/value document. YAML is the default
//! format; files ending in `.toml` are parsed as TOML instead.
//!
//! ```yaml
//! RDS_HOST: localhost
//! RDS_PORT: 5432
//! RDS_DATABASE: finance
//! RDS_USER: analyst
//! RDS_PASSWORD: secret
//! # optional
//! RDS_SSLMODE: require
//! RDS_SSLROOTCERT: /etc/ssl/rds-ca.pem
//! ```
//!
//! Lowercase keys (`host`, `port`, ...) are accepted as aliases.

use serde::Deserialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::ConfigError;
use crate::security::{TlsConfig, TlsMode};

/// Validated connection parameters for one database
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    host: String,
    port: u16,
    database: String,
    user: String,
    password: String,
    tls: TlsConfig,
}

impl CredentialSet {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: password.into(),
            tls: TlsConfig::default(),
        }
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn tls(&self) -> &TlsConfig {
        &self.tls
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("tls", &self.tls)
            .finish()
    }
}

/// Syntax of a credentials file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from the file extension; anything but `.toml` is YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Scalars as they appear in YAML/TOML before validation
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl RawScalar {
    /// Text fields must be written as strings. An unquoted `1.50`, `0x1F` or
    /// `1e3` reaches us already converted, and rendering the number back
    /// would not give the characters in the file.
    fn into_text(self, field: &'static str) -> Result<String, ConfigError> {
        match self {
            RawScalar::Text(s) => Ok(s),
            _ => Err(ConfigError::InvalidField {
                field,
                reason: "must be a quoted string".to_string(),
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawCredentials {
    #[serde(rename = "RDS_HOST", alias = "host")]
    host: Option<RawScalar>,
    #[serde(rename = "RDS_PORT", alias = "port")]
    port: Option<RawScalar>,
    #[serde(rename = "RDS_DATABASE", alias = "database")]
    database: Option<RawScalar>,
    #[serde(rename = "RDS_USER", alias = "user")]
    user: Option<RawScalar>,
    #[serde(rename = "RDS_PASSWORD", alias = "password")]
    password: Option<RawScalar>,
    #[serde(rename = "RDS_SSLMODE", alias = "sslmode")]
    sslmode: Option<String>,
    #[serde(rename = "RDS_SSLROOTCERT", alias = "sslrootcert")]
    sslrootcert: Option<PathBuf>,
}

impl RawCredentials {
    fn validate(self) -> Result<CredentialSet, ConfigError> {
        let host = required(self.host, "host")?;
        let port = parse_port(required_scalar(self.port, "port")?)?;
        let database = required(self.database, "database")?;
        let user = required(self.user, "user")?;
        let password = required(self.password, "password")?;

        if host.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "host",
                reason: "must not be empty".to_string(),
            });
        }

        let mode = match self.sslmode {
            Some(raw) => raw
                .parse::<TlsMode>()
                .map_err(|reason| ConfigError::InvalidField {
                    field: "sslmode",
                    reason,
                })?,
            None => TlsMode::default(),
        };

        Ok(CredentialSet::new(host, port, database, user, password).with_tls(TlsConfig {
            mode,
            ca_cert: self.sslrootcert,
        }))
    }
}

fn required_scalar(
    value: Option<RawScalar>,
    field: &'static str,
) -> Result<RawScalar, ConfigError> {
    value.ok_or(ConfigError::MissingField(field))
}

fn required(value: Option<RawScalar>, field: &'static str) -> Result<String, ConfigError> {
    required_scalar(value, field)?.into_text(field)
}

fn parse_port(value: RawScalar) -> Result<u16, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidField {
        field: "port",
        reason,
    };
    let port = match value {
        RawScalar::Integer(v) => v,
        RawScalar::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("`{}` is not an integer", s)))?,
        RawScalar::Float(v) => return Err(invalid(format!("`{}` is not an integer", v))),
        RawScalar::Bool(v) => return Err(invalid(format!("`{}` is not an integer", v))),
    };
    u16::try_from(port)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| invalid(format!("{} is outside 1..=65535", port)))
}

/// Reads and validates credentials files
pub struct CredentialLoader;

impl CredentialLoader {
    /// Load credentials from `path`, choosing the syntax from its extension.
    ///
    /// Fails with `NotFound` when the file does not exist, `ParseError` when
    /// the syntax is invalid and `MissingField` when any of `host`, `port`,
    /// `database`, `user` or `password` is absent or null.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<CredentialSet, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let credentials = Self::parse_str(&content, ConfigFormat::from_path(path))?;
        tracing::debug!(
            host = %credentials.host(),
            port = credentials.port(),
            database = %credentials.database(),
            sslmode = credentials.tls().mode.as_sslmode(),
            "credentials loaded"
        );
        Ok(credentials)
    }

    /// Parse and validate credentials from an in-memory document
    pub fn parse_str(content: &str, format: ConfigFormat) -> Result<CredentialSet, ConfigError> {
        let raw: RawCredentials = if content.trim().is_empty() {
            RawCredentials::default()
        } else {
            match format {
                ConfigFormat::Yaml => serde_yaml::from_str(content)
                    .map_err(|e| ConfigError::ParseError(e.to_string()))?,
                ConfigFormat::Toml => {
                    toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?
                }
            }
        };
        raw.validate()
    }
}
