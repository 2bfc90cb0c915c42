//! Failures raised by command executors.
//!
//! Messages name the failing step only; the underlying cause is exposed via
//! [`Error::source`](std::error::Error::source) so the response trace lists
//! each cause once.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::project::ProjectError;

/// Errors returned by [`execute`](super::execute).
#[derive(Debug, Error)]
pub enum CommandError {
    /// A target run failed.
    #[error("run_target '{target}' failed")]
    Target {
        /// Requested target.
        target: String,
        /// Project failure.
        #[source]
        source: ProjectError,
    },
    /// A sub-build failed.
    #[error("run_build failed")]
    SubBuild {
        /// Project failure.
        #[source]
        source: ProjectError,
    },
    /// The destination directory of an upload could not be created.
    #[error("send_file could not create '{path}'")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The upload payload could not be read from the connection.
    #[error("send_file did not receive the payload for '{path}'")]
    Receive {
        /// Destination file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing an upload failed.
    #[error("send_file could not write '{path}'")]
    Write {
        /// Destination file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A download source could not be opened.
    #[error("fetch_file could not open '{path}'")]
    Open {
        /// Requested file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A download source is a directory or special file.
    #[error("fetch_file target '{path}' is not a regular file")]
    NotAFile {
        /// Requested path.
        path: Utf8PathBuf,
    },
}
