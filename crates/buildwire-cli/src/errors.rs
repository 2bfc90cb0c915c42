//! Error types for the client, the batch runner and the CLI runtime.

use std::io;
use std::sync::Arc;

use buildwire_protocol::{ProtocolError, ValidationError};
use camino::Utf8PathBuf;
use thiserror::Error;

/// Failures talking to a build server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server address did not resolve.
    #[error("failed to resolve server address {address}: {source}")]
    Resolve {
        /// `host:port` label.
        address: String,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// The TCP connection could not be opened.
    #[error("failed to connect to server at {address}: {source}")]
    Connect {
        /// `host:port` label.
        address: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The server did not send a usable handshake.
    #[error("server handshake failed: {0}")]
    Handshake(#[source] ProtocolError),
    /// The command was rejected before anything was sent.
    #[error("invalid command: {0}")]
    Invalid(#[from] ValidationError),
    /// A command was issued on a disconnected client.
    #[error("client is not connected")]
    NotConnected,
    /// Writing the command frame failed.
    #[error("failed to send command: {0}")]
    Send(#[source] ProtocolError),
    /// Streaming the request payload failed.
    #[error("failed to upload payload: {0}")]
    Upload(#[source] io::Error),
    /// Reading the response frame failed.
    #[error("failed to read response: {0}")]
    Receive(#[source] ProtocolError),
    /// The server closed the connection before responding.
    #[error("server closed the connection before responding")]
    Closed,
    /// Receiving the response payload failed.
    #[error("failed to download payload: {0}")]
    Download(#[source] io::Error),
}

/// Failures loading or running a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The batch file could not be read.
    #[error("failed to read batch file {path}: {source}")]
    Read {
        /// Batch file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The batch file is not valid TOML or names an unknown command.
    #[error("failed to parse batch file {path}: {source}")]
    Parse {
        /// Batch file path.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
    /// The batch file lists no commands.
    #[error("batch file {path} lists no commands")]
    Empty {
        /// Batch file path.
        path: Utf8PathBuf,
    },
    /// A local file to upload could not be opened.
    #[error("failed to open {path}: {source}")]
    OpenLocal {
        /// Local path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A local destination for a download could not be created.
    #[error("failed to create {path}: {source}")]
    CreateLocal {
        /// Local path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// An upload source has no file name.
    #[error("cannot upload {path}: path has no file name")]
    NoFileName {
        /// Local path.
        path: Utf8PathBuf,
    },
    /// Talking to the server failed.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
    /// The batch stopped at its first failing command.
    #[error("{command} failed; stopped after {completed} of {total} commands")]
    Stopped {
        /// Label of the failing command.
        command: String,
        /// Commands attempted, including the failing one.
        completed: usize,
        /// Commands in the batch.
        total: usize,
    },
    /// The batch ran to the end with failures.
    #[error("{failed} of {total} commands failed")]
    Failures {
        /// Number of failing commands.
        failed: usize,
        /// Commands in the batch.
        total: usize,
    },
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Batch(#[from] BatchError),
}
