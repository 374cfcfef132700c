//! Configuration module.
//!
//! Process settings come from environment variables; the SMTP transport
//! parameters come from a JSON file read once at startup.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid '{field}' address: {source}")]
    Address {
        field: &'static str,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("invalid smtp transport settings: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Path of the webhook signing secret
    pub secret_path: PathBuf,

    /// Path of the JSON transport configuration
    pub transport_config_path: PathBuf,

    /// Timeout for a whole SMTP session in seconds (0 disables it)
    pub smtp_timeout_secs: u64,

    /// Largest request body the webhook endpoint accepts
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_var("PORT", 26263),

            secret_path: env::var("HOOKMAIL_SECRET_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("ghs")),

            transport_config_path: env::var("HOOKMAIL_SMTP_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("smtp.json")),

            smtp_timeout_secs: parse_var("SMTP_TIMEOUT_SECS", 30),

            max_body_bytes: parse_var("MAX_BODY_BYTES", 25 * 1024 * 1024),
        }
    }

    /// The SMTP session timeout, if one is configured.
    pub fn smtp_timeout(&self) -> Option<std::time::Duration> {
        (self.smtp_timeout_secs > 0).then(|| std::time::Duration::from_secs(self.smtp_timeout_secs))
    }
}

/// Parse a single environment variable, falling back to `default` when it
/// is unset or malformed.
fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// SMTP transport parameters.
///
/// All fields are required; unknown fields are ignored.
#[derive(Clone, Deserialize)]
pub struct TransportConfig {
    pub server: String,
    pub port: u16,
    pub from: String,
    pub to: String,
    pub username: String,
    pub password: String,
}

impl TransportConfig {
    /// Read and parse the transport configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
