//! Failures raised while loading or running a build project.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors surfaced by [`Project`](super::Project) operations.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The project file could not be read.
    #[error("failed to read project file '{path}': {source}")]
    Read {
        /// File that failed to load.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The project file is not valid TOML for a project.
    #[error("failed to parse project file '{path}': {source}")]
    Parse {
        /// File that failed to parse.
        path: Utf8PathBuf,
        /// Underlying parser error.
        #[source]
        source: toml::de::Error,
    },
    /// Two targets share a name.
    #[error("target '{target}' is defined more than once")]
    DuplicateTarget {
        /// Repeated name.
        target: String,
    },
    /// A requested or depended-upon target does not exist.
    #[error("target '{target}' does not exist in project '{project}'")]
    UnknownTarget {
        /// Project that was searched.
        project: String,
        /// Missing target.
        target: String,
    },
    /// No target was requested and the project declares no default.
    #[error("project '{project}' has no default target")]
    NoDefaultTarget {
        /// Project without a default.
        project: String,
    },
    /// Target dependencies loop back on themselves.
    #[error("circular dependency through target '{target}'")]
    DependencyCycle {
        /// Target reached twice on one dependency path.
        target: String,
    },
    /// A sub-build asked for a reference the parent does not hold.
    #[error("reference '{reference}' does not exist")]
    UnknownReference {
        /// Missing reference name.
        reference: String,
    },
    /// A sub-build was requested but no project file is known.
    #[error("no project file to run a sub-build from")]
    NoProjectFile,
    /// A target failed while running.
    #[error("target '{target}' failed: {message}")]
    TargetFailed {
        /// Failing target.
        target: String,
        /// Failure text.
        message: String,
    },
}
