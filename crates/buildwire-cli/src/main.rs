//! CLI entrypoint for the buildwire client.
//!
//! The binary delegates to [`buildwire_cli::run`], which loads configuration,
//! parses the subcommand and sends it to the configured build server.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    buildwire_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
