//! Per-connection command sessions.
//!
//! A session writes the handshake record, then loops: read a command, run
//! it with a listener attached, answer with one response record plus any
//! payload bytes. `Disconnect` and `Shutdown` end the loop after their
//! response, as do end of stream, idle timeouts and protocol errors. A
//! session waiting for its next command also ends once the server stops.

mod handler;
mod machine;

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::health::HealthReporter;
use crate::project::Project;
use crate::report::ReportFormat;
use crate::transport::ShutdownFlag;

pub(crate) use self::handler::SessionHandler;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The client closed the stream between commands.
    PeerClosed,
    /// The client sent `Disconnect`.
    Disconnected,
    /// The client sent `Shutdown`.
    ShutdownRequested,
    /// No command arrived within the idle timeout.
    IdleTimeout,
    /// The server stopped while the session waited for a command.
    ServerStopping,
    /// The client sent something that is not a command frame.
    Protocol(String),
    /// The connection failed.
    Io(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("peer closed"),
            Self::Disconnected => f.write_str("disconnect requested"),
            Self::ShutdownRequested => f.write_str("shutdown requested"),
            Self::IdleTimeout => f.write_str("idle timeout"),
            Self::ServerStopping => f.write_str("server stopping"),
            Self::Protocol(detail) => write!(f, "protocol error: {detail}"),
            Self::Io(detail) => write!(f, "connection error: {detail}"),
        }
    }
}

/// Outcome of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Commands read from the client.
    pub commands: u64,
    /// Why the session ended.
    pub reason: CloseReason,
}

/// Collaborators shared by every session of a server.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub(crate) project: Arc<Project>,
    pub(crate) report: Arc<dyn ReportFormat>,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: ShutdownFlag,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Renders an error and its causes, one per line.
pub(crate) fn error_trace(error: &(dyn Error + 'static)) -> String {
    let mut trace = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        trace.push_str("\ncaused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }
    trace
}
