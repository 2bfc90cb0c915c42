use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match buildwired::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(io::stderr(), "buildwired: {error}");
            ExitCode::FAILURE
        }
    }
}
