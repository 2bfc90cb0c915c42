//! Ordered command batches and the runner that sends them.
//!
//! A batch file is TOML with one `[[command]]` table per step, tagged by
//! `kind`:
//!
//! ```toml
//! [[command]]
//! kind = "send_file"
//! local = "dist/app.tar"
//! to_dir = "incoming"
//!
//! [[command]]
//! kind = "run_target"
//! target = "deploy"
//! ```
//!
//! Local paths resolve against the directory holding the batch file.

use std::fs::{self, File};
use std::io::{self, Write};

use buildwire_protocol::{Command, Response, RunBuild, SendFile};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::client::Client;
use crate::errors::{BatchError, ClientError};
use crate::output::Output;
use crate::transport::Endpoint;

/// One step of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchEntry {
    /// Runs a target in the server's project.
    RunTarget {
        /// Target to run.
        target: String,
    },
    /// Runs a sub-build.
    RunBuild(RunBuild),
    /// Uploads a local file.
    SendFile {
        /// Local file to upload.
        local: Utf8PathBuf,
        /// Destination directory on the server.
        #[serde(default)]
        to_dir: Option<String>,
        /// Destination file name on the server.
        #[serde(default)]
        to_file: Option<String>,
    },
    /// Downloads a remote file.
    FetchFile {
        /// Path relative to the server's base directory.
        path: String,
        /// Local destination.
        local: Utf8PathBuf,
    },
    /// Stops the server.
    Shutdown,
    /// Closes the connection.
    Disconnect,
}

impl BatchEntry {
    /// Short description used in output lines.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::RunTarget { target } => format!("run_target {target}"),
            Self::RunBuild(build) => format!(
                "run_build {}:{}",
                build.build_file.as_deref().unwrap_or("<project>"),
                build.target.as_deref().unwrap_or("<default>"),
            ),
            Self::SendFile { local, .. } => format!("send_file {local}"),
            Self::FetchFile { path, .. } => format!("fetch_file {path}"),
            Self::Shutdown => "shutdown".to_owned(),
            Self::Disconnect => "disconnect".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BatchFile {
    #[serde(default, rename = "command")]
    commands: Vec<BatchEntry>,
}

/// Commands to send in order, with the directory local paths resolve
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    base_dir: Utf8PathBuf,
    entries: Vec<BatchEntry>,
}

impl Batch {
    /// Wraps entries whose local paths resolve against the working directory.
    #[must_use]
    pub fn new(entries: Vec<BatchEntry>) -> Self {
        Self {
            base_dir: Utf8PathBuf::new(),
            entries,
        }
    }

    /// Loads a batch file.
    ///
    /// # Errors
    ///
    /// Returns a [`BatchError`] if the file cannot be read or parsed, or lists
    /// no commands.
    pub fn load(path: &Utf8Path) -> Result<Self, BatchError> {
        let text = fs::read_to_string(path).map_err(|source| BatchError::Read {
            path: path.to_owned(),
            source,
        })?;
        let file: BatchFile = toml::from_str(&text).map_err(|source| BatchError::Parse {
            path: path.to_owned(),
            source,
        })?;
        if file.commands.is_empty() {
            return Err(BatchError::Empty {
                path: path.to_owned(),
            });
        }
        Ok(Self {
            base_dir: path.parent().map(Utf8Path::to_owned).unwrap_or_default(),
            entries: file.commands,
        })
    }

    /// Steps in order.
    #[must_use]
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Directory local paths resolve against.
    #[must_use]
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }
}

/// Result of a batch in which every command succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Number of commands sent.
    pub commands: usize,
}

/// Sends a [`Batch`] to one server.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    endpoint: Endpoint,
    persistent: bool,
    fail_on_error: bool,
}

impl BatchRunner {
    /// Runner that reuses one connection and stops at the first failure.
    #[must_use]
    pub const fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            persistent: true,
            fail_on_error: true,
        }
    }

    /// Reuses one connection for the whole batch when `persistent`, otherwise
    /// connects once per command.
    #[must_use]
    pub const fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Stops at the first failing command when set, otherwise runs every
    /// command and reports the failures at the end.
    #[must_use]
    pub const fn fail_on_error(mut self, fail_on_error: bool) -> Self {
        self.fail_on_error = fail_on_error;
        self
    }

    /// Runs every entry of `batch`, printing each outcome.
    ///
    /// In persistent mode a `Disconnect` is sent after the last entry unless
    /// that entry already closed the connection.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Stopped`] or [`BatchError::Failures`] when
    /// commands failed, and [`BatchError::Output`] when output cannot be
    /// written.
    pub fn run<W: Write, E: Write>(
        &self,
        batch: &Batch,
        output: &mut Output<'_, W, E>,
    ) -> Result<BatchSummary, BatchError> {
        let total = batch.entries().len();
        let mut client = None;
        let mut failed = 0;
        for (index, entry) in batch.entries().iter().enumerate() {
            let label = entry.label();
            let succeeded = match self.step(&mut client, batch.base_dir(), entry) {
                Ok(response) => output
                    .response(&label, &response)
                    .map_err(BatchError::Output)?,
                Err(error) => {
                    output.error(&label, &error).map_err(BatchError::Output)?;
                    false
                }
            };
            if !self.persistent {
                client = None;
            }
            if succeeded {
                continue;
            }
            failed += 1;
            if self.fail_on_error {
                self.finish(client, output)?;
                return Err(BatchError::Stopped {
                    command: label,
                    completed: index + 1,
                    total,
                });
            }
        }
        self.finish(client, output)?;
        if failed > 0 {
            return Err(BatchError::Failures { failed, total });
        }
        Ok(BatchSummary { commands: total })
    }

    fn step(
        &self,
        client: &mut Option<Client>,
        base_dir: &Utf8Path,
        entry: &BatchEntry,
    ) -> Result<Response, BatchError> {
        if !client.as_ref().is_some_and(Client::is_connected) {
            *client = Some(Client::connect(&self.endpoint)?);
        }
        let Some(session) = client.as_mut() else {
            return Err(ClientError::NotConnected.into());
        };
        match entry {
            BatchEntry::RunTarget { target } => {
                Ok(session.send(&Command::run_target(target.as_str()))?)
            }
            BatchEntry::RunBuild(build) => Ok(session.send(&Command::from(build.clone()))?),
            BatchEntry::SendFile {
                local,
                to_dir,
                to_file,
            } => upload(
                session,
                &base_dir.join(local),
                to_dir.as_deref(),
                to_file.as_deref(),
            ),
            BatchEntry::FetchFile { path, local } => download(session, path, &base_dir.join(local)),
            BatchEntry::Shutdown => Ok(session.shutdown()?),
            BatchEntry::Disconnect => Ok(session.send(&Command::Disconnect)?),
        }
    }

    fn finish<W: Write, E: Write>(
        &self,
        client: Option<Client>,
        output: &mut Output<'_, W, E>,
    ) -> Result<(), BatchError> {
        let Some(mut session) = client else {
            return Ok(());
        };
        if self.persistent && session.is_connected() {
            if let Err(error) = session.send(&Command::Disconnect) {
                output
                    .error("disconnect", &error)
                    .map_err(BatchError::Output)?;
            }
        }
        session.disconnect();
        Ok(())
    }
}

fn upload(
    client: &mut Client,
    path: &Utf8Path,
    to_dir: Option<&str>,
    to_file: Option<&str>,
) -> Result<Response, BatchError> {
    let open_error = |source| BatchError::OpenLocal {
        path: path.to_owned(),
        source,
    };
    let mut file = File::open(path).map_err(open_error)?;
    let metadata = file.metadata().map_err(open_error)?;
    if !metadata.is_file() {
        return Err(open_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    let name = path.file_name().ok_or_else(|| BatchError::NoFileName {
        path: path.to_owned(),
    })?;
    let mut send = SendFile::new(name, metadata.len());
    send.to_dir = to_dir.map(str::to_owned);
    send.to_file = to_file.map(str::to_owned);
    Ok(client.send_command(&Command::from(send), &mut file, &mut io::sink())?)
}

/// Streams a remote file into `local`, removing `local` again unless the
/// download succeeded.
fn download(client: &mut Client, remote: &str, local: &Utf8Path) -> Result<Response, BatchError> {
    let create_error = |source| BatchError::CreateLocal {
        path: local.to_owned(),
        source,
    };
    if let Some(parent) = local.parent().filter(|parent| !parent.as_str().is_empty()) {
        fs::create_dir_all(parent).map_err(create_error)?;
    }
    let mut file = File::create(local).map_err(create_error)?;
    let result = client.send_command(&Command::fetch_file(remote), &mut io::empty(), &mut file);
    drop(file);
    if !matches!(&result, Ok(response) if response.succeeded) {
        let _ = fs::remove_file(local);
    }
    Ok(result?)
}
