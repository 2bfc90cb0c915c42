//! Command records sent from the client to the server.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One remote action.
///
/// Commands are serialized with an internal `kind` tag:
///
/// ```json
/// {"kind":"run_target","target":"compile"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Runs a named target, and its dependencies, in the server's project.
    RunTarget {
        /// Target to run.
        target: String,
    },
    /// Runs a sub-build from another project file.
    RunBuild(RunBuild),
    /// Uploads a file; the bytes follow the command frame.
    SendFile(SendFile),
    /// Downloads a file; the bytes follow the response frame.
    FetchFile {
        /// Path relative to the server's base directory.
        path: String,
    },
    /// Closes this connection and stops the server.
    Shutdown,
    /// Closes this connection only.
    Disconnect,
}

impl Command {
    /// Builds a `RunTarget` command.
    #[must_use]
    pub fn run_target(target: impl Into<String>) -> Self {
        Self::RunTarget {
            target: target.into(),
        }
    }

    /// Builds a `FetchFile` command.
    #[must_use]
    pub fn fetch_file(path: impl Into<String>) -> Self {
        Self::FetchFile { path: path.into() }
    }

    /// Stable snake case name used in logs and client output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RunTarget { .. } => "run_target",
            Self::RunBuild(_) => "run_build",
            Self::SendFile(_) => "send_file",
            Self::FetchFile { .. } => "fetch_file",
            Self::Shutdown => "shutdown",
            Self::Disconnect => "disconnect",
        }
    }

    /// Number of raw payload bytes that follow this command on the stream.
    #[must_use]
    pub const fn content_length(&self) -> u64 {
        match self {
            Self::SendFile(send) => send.content_length,
            Self::RunTarget { .. }
            | Self::RunBuild(_)
            | Self::FetchFile { .. }
            | Self::Shutdown
            | Self::Disconnect => 0,
        }
    }

    /// Returns true when the server closes the connection after this command.
    #[must_use]
    pub const fn is_terminating(&self) -> bool {
        matches!(self, Self::Shutdown | Self::Disconnect)
    }

    /// Checks required parameters before anything is executed.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first missing or unsafe
    /// parameter.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::RunTarget { target } => require("run_target", "target", target),
            Self::RunBuild(build) => build.validate(),
            Self::SendFile(send) => send.validate(),
            Self::FetchFile { path } => {
                require("fetch_file", "path", path)?;
                require_relative(path)
            }
            Self::Shutdown | Self::Disconnect => Ok(()),
        }
    }
}

/// Parameters of a sub-build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunBuild {
    /// Project file relative to the server's base directory; the server's own
    /// project file when absent.
    #[serde(default)]
    pub build_file: Option<String>,
    /// Target to run; the project's default target when absent.
    #[serde(default)]
    pub target: Option<String>,
    /// Properties applied to the sub-build last.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Names of parent references copied into the sub-build.
    #[serde(default)]
    pub references: Vec<String>,
    /// Whether the sub-build sees the parent's properties.
    #[serde(default = "default_inherit_all")]
    pub inherit_all: bool,
    /// Whether the sub-build sees all of the parent's references.
    #[serde(default)]
    pub inherit_refs: bool,
}

const fn default_inherit_all() -> bool {
    true
}

impl Default for RunBuild {
    fn default() -> Self {
        Self {
            build_file: None,
            target: None,
            properties: BTreeMap::new(),
            references: Vec::new(),
            inherit_all: true,
            inherit_refs: false,
        }
    }
}

impl RunBuild {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(file) = &self.build_file {
            require("run_build", "build_file", file)?;
            require_relative(file)?;
        }
        if let Some(target) = &self.target {
            require("run_build", "target", target)?;
        }
        if self.properties.keys().any(|key| key.trim().is_empty()) {
            return Err(ValidationError::EmptyPropertyName);
        }
        if self.references.iter().any(|name| name.trim().is_empty()) {
            return Err(ValidationError::MissingParameter {
                command: "run_build",
                parameter: "references",
            });
        }
        Ok(())
    }
}

impl From<RunBuild> for Command {
    fn from(build: RunBuild) -> Self {
        Self::RunBuild(build)
    }
}

/// Parameters of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendFile {
    /// Name of the file on the sending side.
    pub file_name: String,
    /// Destination directory relative to the server's base directory.
    #[serde(default)]
    pub to_dir: Option<String>,
    /// Destination file name; `file_name` when absent.
    #[serde(default)]
    pub to_file: Option<String>,
    /// Number of payload bytes following the command frame.
    pub content_length: u64,
}

impl SendFile {
    /// Describes an upload of `content_length` bytes named `file_name`.
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_length: u64) -> Self {
        Self {
            file_name: file_name.into(),
            to_dir: None,
            to_file: None,
            content_length,
        }
    }

    /// Sets the destination directory.
    #[must_use]
    pub fn with_to_dir(mut self, to_dir: impl Into<String>) -> Self {
        self.to_dir = Some(to_dir.into());
        self
    }

    /// Sets the destination file name.
    #[must_use]
    pub fn with_to_file(mut self, to_file: impl Into<String>) -> Self {
        self.to_file = Some(to_file.into());
        self
    }

    /// Destination path relative to the server's base directory.
    #[must_use]
    pub fn destination(&self) -> String {
        let name = self.to_file.as_deref().unwrap_or(&self.file_name);
        match self.to_dir.as_deref() {
            Some(dir) if !dir.is_empty() => format!("{}/{name}", dir.trim_end_matches('/')),
            _ => name.to_owned(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("send_file", "file_name", &self.file_name)?;
        if let Some(dir) = &self.to_dir {
            require_relative(dir)?;
        }
        if let Some(file) = &self.to_file {
            require("send_file", "to_file", file)?;
        }
        require_relative(&self.destination())
    }
}

impl From<SendFile> for Command {
    fn from(send: SendFile) -> Self {
        Self::SendFile(send)
    }
}

/// Parameter problems detected before a command runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required parameter is empty or missing.
    #[error("{command}: missing required parameter '{parameter}'")]
    MissingParameter {
        /// Command being validated.
        command: &'static str,
        /// Parameter that failed the check.
        parameter: &'static str,
    },
    /// A path escapes the server's base directory.
    #[error("path '{path}' must be relative and stay inside the base directory")]
    UnsafePath {
        /// Offending path.
        path: String,
    },
    /// A property override has a blank name.
    #[error("run_build: property names must not be empty")]
    EmptyPropertyName,
}

fn require(
    command: &'static str,
    parameter: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingParameter { command, parameter });
    }
    Ok(())
}

fn require_relative(path: &str) -> Result<(), ValidationError> {
    let safe = Path::new(path)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(())
    } else {
        Err(ValidationError::UnsafePath {
            path: path.to_owned(),
        })
    }
}
