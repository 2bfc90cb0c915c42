//! Shared configuration for the buildwire client and server.
//!
//! Both binaries resolve a [`Config`] through `ortho_config`, which layers
//! built-in defaults, an optional TOML file (`--config-path` or
//! `BUILDWIRE_CONFIG_PATH`), `BUILDWIRE_*` environment variables and command
//! line flags, with later layers taking precedence. Every field is optional in
//! every layer; the accessors fall back to the values in [`defaults`] so an
//! empty configuration is always usable.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration shared by `buildwired` and `buildwire`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "BUILDWIRE")]
pub struct Config {
    /// Host name or address to bind (server) or connect to (client).
    pub host: Option<String>,
    /// TCP port of the command protocol.
    pub port: Option<u16>,
    /// Tracing filter expression, for example `info` or `buildwired=debug`.
    pub log_filter: Option<String>,
    /// Log output format.
    pub log_format: Option<LogFormat>,
    /// Maximum number of connection handlers running at once; zero is unbounded.
    pub max_connections: Option<usize>,
    /// Seconds a connection may sit idle between commands; zero waits forever.
    pub idle_timeout_secs: Option<u64>,
    /// Seconds the client waits for the TCP connection to open.
    pub connect_timeout_secs: Option<u64>,
    /// Project file loaded by the server at startup.
    pub project_file: Option<Utf8PathBuf>,
    /// Directory that relative paths in commands resolve against.
    pub base_dir: Option<Utf8PathBuf>,
}

impl Config {
    /// Host to bind or connect to.
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Port of the command protocol.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }

    /// Handler bound, `None` when unbounded.
    #[must_use]
    pub fn max_connections(&self) -> Option<usize> {
        match self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS) {
            0 => None,
            limit => Some(limit),
        }
    }

    /// Idle read timeout, `None` when connections may idle forever.
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Client connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    /// Project file to load at server startup.
    #[must_use]
    pub fn project_file(&self) -> Option<&Utf8Path> {
        self.project_file.as_deref()
    }

    /// Explicit base directory, if configured.
    #[must_use]
    pub fn base_dir(&self) -> Option<&Utf8Path> {
        self.base_dir.as_deref()
    }

    /// `host:port` label used in logs and error messages.
    #[must_use]
    pub fn address_label(&self) -> String {
        format!("{}:{}", self.host(), self.port())
    }
}
