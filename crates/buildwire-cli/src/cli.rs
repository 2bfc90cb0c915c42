//! CLI argument definitions for the `buildwire` client.

use std::collections::BTreeMap;

use buildwire_protocol::RunBuild;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

use crate::batch::{Batch, BatchEntry};
use crate::errors::BatchError;

/// Command-line client for a `buildwired` build server.
#[derive(Parser, Debug)]
#[command(name = "buildwire", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Opens a new connection for every command instead of reusing one.
    #[arg(long, global = true)]
    pub(crate) no_persistent: bool,
    /// Runs every command and reports the failures at the end.
    #[arg(long, global = true)]
    pub(crate) keep_going: bool,
    /// Prints remote error traces and detailed build output.
    #[arg(long, short, global = true)]
    pub(crate) verbose: bool,
    /// Command to send.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Remote commands.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Runs a target, and its dependencies, in the server's project.
    RunTarget {
        /// Target to run.
        target: String,
    },
    /// Runs a sub-build from a project file on the server.
    RunBuild(RunBuildArgs),
    /// Uploads a local file into the server's base directory.
    SendFile {
        /// Local file to upload.
        local: Utf8PathBuf,
        /// Destination directory on the server.
        #[arg(long)]
        to_dir: Option<String>,
        /// Destination file name on the server.
        #[arg(long)]
        to_file: Option<String>,
    },
    /// Downloads a file from the server's base directory.
    FetchFile {
        /// Path on the server.
        remote: String,
        /// Local destination.
        local: Utf8PathBuf,
    },
    /// Runs the commands listed in a TOML batch file.
    Batch {
        /// Batch file.
        file: Utf8PathBuf,
    },
    /// Stops the server.
    Shutdown,
    /// Closes the connection.
    Disconnect,
}

/// Sub-build parameters.
#[derive(Args, Debug, Clone)]
pub(crate) struct RunBuildArgs {
    /// Project file relative to the server's base directory.
    #[arg(long)]
    file: Option<String>,
    /// Target to run instead of the project's default.
    #[arg(long)]
    target: Option<String>,
    /// Property applied to the sub-build last.
    #[arg(long = "property", value_name = "NAME=VALUE", value_parser = parse_property)]
    properties: Vec<(String, String)>,
    /// Parent reference copied into the sub-build.
    #[arg(long = "reference", value_name = "NAME")]
    references: Vec<String>,
    /// Hides the parent's properties from the sub-build.
    #[arg(long)]
    no_inherit_all: bool,
    /// Copies all of the parent's references into the sub-build.
    #[arg(long)]
    inherit_refs: bool,
}

impl From<RunBuildArgs> for RunBuild {
    fn from(args: RunBuildArgs) -> Self {
        Self {
            build_file: args.file,
            target: args.target,
            properties: args.properties.into_iter().collect::<BTreeMap<_, _>>(),
            references: args.references,
            inherit_all: !args.no_inherit_all,
            inherit_refs: args.inherit_refs,
        }
    }
}

impl CliCommand {
    /// Resolves the subcommand into the batch it sends.
    pub(crate) fn into_batch(self) -> Result<Batch, BatchError> {
        let entry = match self {
            Self::Batch { file } => return Batch::load(&file),
            Self::RunTarget { target } => BatchEntry::RunTarget { target },
            Self::RunBuild(args) => BatchEntry::RunBuild(args.into()),
            Self::SendFile {
                local,
                to_dir,
                to_file,
            } => BatchEntry::SendFile {
                local,
                to_dir,
                to_file,
            },
            Self::FetchFile { remote, local } => BatchEntry::FetchFile {
                path: remote,
                local,
            },
            Self::Shutdown => BatchEntry::Shutdown,
            Self::Disconnect => BatchEntry::Disconnect,
        };
        Ok(Batch::new(vec![entry]))
    }
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}
