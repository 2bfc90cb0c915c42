use crate::logging::LogFormat;

/// Well-known TCP port for the build command protocol.
pub const DEFAULT_PORT: u16 = 17000;

/// Host the server binds to and the client connects to by default.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Upper bound on concurrently running connection handlers.
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

/// Idle read timeout in seconds; zero disables the timeout.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 0;

/// Client connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
