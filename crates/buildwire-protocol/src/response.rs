//! Result records sent from the server to the client.

use serde::{Deserialize, Serialize};

/// Outcome of one command.
///
/// The default value is a successful, empty response; the server writes one
/// as the handshake record before reading the first command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the command completed without error.
    pub succeeded: bool,
    /// Display text of the failure.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Failure with its full chain of causes, one per line.
    #[serde(default)]
    pub error_trace: Option<String>,
    /// Serialized [`BuildReport`](crate::BuildReport) of the events the
    /// command triggered; empty when no report could be produced.
    #[serde(default)]
    pub report: String,
    /// Number of raw payload bytes that follow this response on the stream.
    #[serde(default)]
    pub content_length: u64,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            succeeded: true,
            error_message: None,
            error_trace: None,
            report: String::new(),
            content_length: 0,
        }
    }
}

impl Response {
    /// The content-free record that opens every session.
    #[must_use]
    pub fn handshake() -> Self {
        Self::default()
    }

    /// Builds a failed response carrying only a message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Attaches the failure trace.
    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.error_trace = Some(trace.into());
        self
    }
}
