//! Client for the buildwire build command protocol.
//!
//! The crate exposes a blocking [`Client`] for a single connection, a
//! [`BatchRunner`] that sends an ordered [`Batch`] of commands over one or
//! many connections, and the `buildwire` command-line runtime in [`run`].
//! The runtime is exercised both from the binary entrypoint and from tests,
//! where configuration loading and the output streams are substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use buildwire_config::Config;
use clap::Parser;

mod batch;
mod cli;
mod client;
mod config;
mod errors;
mod output;
mod transport;

pub use batch::{Batch, BatchEntry, BatchRunner, BatchSummary};
pub use client::Client;
pub use errors::{BatchError, ClientError};
pub use output::{Output, render_report};
pub use transport::Endpoint;

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, command_arguments, split_config_arguments};
use errors::AppError;

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);

    let result = Cli::try_parse_from(command_arguments(&args, &split))
        .map_err(AppError::CliUsage)
        .and_then(|cli| {
            loader
                .load(&split.config_arguments)
                .map(|config| (cli, config))
        })
        .and_then(|(cli, config)| execute(cli, &config, stdout, stderr));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        // Help and version output are requested, not failures.
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<W, E>(cli: Cli, config: &Config, stdout: &mut W, stderr: &mut E) -> Result<(), AppError>
where
    W: Write,
    E: Write,
{
    let batch = cli.command.into_batch()?;
    let runner = BatchRunner::new(Endpoint::from_config(config))
        .persistent(!cli.no_persistent)
        .fail_on_error(!cli.keep_going);
    let mut output = Output::new(stdout, stderr, cli.verbose);
    runner.run(&batch, &mut output)?;
    Ok(())
}

#[cfg(test)]
mod tests;
