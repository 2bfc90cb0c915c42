//! Executors for file transfer commands.

use std::fs::{self, File};
use std::io::{self, Read};

use buildwire_protocol::{SendFile, copy_exact};
use tracing::{debug, info};

use super::{COMMANDS_TARGET, CommandError, CommandOutput, ResponsePayload};
use crate::project::Project;

/// Writes the request payload to the upload destination.
///
/// A partially written file is removed when the copy fails.
pub(super) fn receive(
    project: &Project,
    send: &SendFile,
    payload: &mut dyn Read,
) -> Result<CommandOutput, CommandError> {
    let path = project.base_dir().join(send.destination());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CommandError::CreateDirectory {
            path: parent.to_owned(),
            source,
        })?;
    }
    let mut file = File::create(&path).map_err(|source| CommandError::Write {
        path: path.clone(),
        source,
    })?;
    let mut incoming = Incoming::new(payload);
    if let Err(source) = copy_exact(&mut incoming, &mut file, send.content_length) {
        drop(file);
        if let Err(error) = fs::remove_file(&path) {
            debug!(target: COMMANDS_TARGET, %path, %error, "could not remove partial upload");
        }
        return Err(if incoming.failed {
            CommandError::Receive { path, source }
        } else {
            CommandError::Write { path, source }
        });
    }
    info!(
        target: COMMANDS_TARGET,
        %path,
        bytes = send.content_length,
        "received file"
    );
    Ok(CommandOutput::default())
}

/// Payload reader that remembers whether the connection side failed, so
/// upload errors can be told apart from disk errors.
struct Incoming<'a> {
    payload: &'a mut dyn Read,
    failed: bool,
}

impl<'a> Incoming<'a> {
    fn new(payload: &'a mut dyn Read) -> Self {
        Self {
            payload,
            failed: false,
        }
    }
}

impl Read for Incoming<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.payload.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.failed = true;
                Ok(0)
            }
            Err(error) if error.kind() != io::ErrorKind::Interrupted => {
                self.failed = true;
                Err(error)
            }
            other => other,
        }
    }
}

/// Opens a file under the base directory for streaming back to the client.
pub(super) fn serve(project: &Project, relative: &str) -> Result<CommandOutput, CommandError> {
    let path = project.base_dir().join(relative);
    let file = File::open(&path).map_err(|source| CommandError::Open {
        path: path.clone(),
        source,
    })?;
    let metadata = file.metadata().map_err(|source| CommandError::Open {
        path: path.clone(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(CommandError::NotAFile { path });
    }
    debug!(target: COMMANDS_TARGET, %path, bytes = metadata.len(), "serving file");
    Ok(CommandOutput::with_payload(ResponsePayload::new(
        metadata.len(),
        file,
    )))
}
