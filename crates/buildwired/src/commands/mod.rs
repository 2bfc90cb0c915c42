//! Command executors.
//!
//! [`execute`] maps each [`Command`] variant to the code that performs it.
//! The match is exhaustive, so a new variant cannot be added without an
//! executor. Commands are validated before they get here.

mod build;
mod errors;
mod files;

use std::fmt;
use std::io::Read;

use buildwire_protocol::Command;

pub use self::errors::CommandError;
use crate::project::Project;

const COMMANDS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::commands");

/// Raw bytes a command returns after its response record.
pub struct ResponsePayload {
    length: u64,
    source: Box<dyn Read + Send>,
}

impl ResponsePayload {
    /// Wraps a reader that yields at least `length` bytes.
    pub fn new(length: u64, source: impl Read + Send + 'static) -> Self {
        Self {
            length,
            source: Box::new(source),
        }
    }

    /// Number of bytes announced in the response.
    #[must_use]
    pub const fn length(&self) -> u64 {
        self.length
    }

    /// Splits the payload into its length and reader.
    #[must_use]
    pub fn into_parts(self) -> (u64, Box<dyn Read + Send>) {
        (self.length, self.source)
    }
}

impl fmt::Debug for ResponsePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponsePayload")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// What an executor hands back to the session.
#[derive(Debug, Default)]
pub struct CommandOutput {
    /// Bytes streamed after the response, if any.
    pub payload: Option<ResponsePayload>,
}

impl CommandOutput {
    /// Output carrying a response payload.
    #[must_use]
    pub fn with_payload(payload: ResponsePayload) -> Self {
        Self {
            payload: Some(payload),
        }
    }
}

/// Runs `command` against `project`.
///
/// `payload` yields the raw bytes that followed the command frame, at most
/// [`Command::content_length`] of them. Connection control commands have no
/// work of their own; the session acts on them after responding.
///
/// # Errors
///
/// Returns a [`CommandError`] describing why the command did not complete.
pub fn execute(
    command: &Command,
    project: &Project,
    payload: &mut dyn Read,
) -> Result<CommandOutput, CommandError> {
    match command {
        Command::RunTarget { target } => build::run_target(project, target),
        Command::RunBuild(run) => build::run_build(project, run),
        Command::SendFile(send) => files::receive(project, send, payload),
        Command::FetchFile { path } => files::serve(project, path),
        Command::Shutdown | Command::Disconnect => Ok(CommandOutput::default()),
    }
}
