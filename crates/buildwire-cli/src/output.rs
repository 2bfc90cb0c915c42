//! Rendering of responses and build reports for the terminal.

use std::error::Error;
use std::fmt::Write as _;
use std::io::{self, Write};

use buildwire_protocol::{BuildEvent, BuildReport, Priority, Response};

/// Writers for command results.
///
/// Build output and success lines go to stdout; failures, remote traces and
/// warnings go to stderr.
pub struct Output<'a, W: Write, E: Write> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    verbose: bool,
}

impl<'a, W: Write, E: Write> Output<'a, W, E> {
    /// Wraps the two streams.
    pub fn new(stdout: &'a mut W, stderr: &'a mut E, verbose: bool) -> Self {
        Self {
            stdout,
            stderr,
            verbose,
        }
    }

    /// Prints the report carried by `response` and its outcome.
    ///
    /// Returns whether the command succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if either stream cannot be written.
    pub fn response(&mut self, label: &str, response: &Response) -> io::Result<bool> {
        match BuildReport::from_json(&response.report) {
            Ok(report) => self
                .stdout
                .write_all(render_report(&report, self.verbose).as_bytes())?,
            Err(error) => writeln!(self.stderr, "warning: {label}: unreadable report: {error}")?,
        }
        if response.succeeded {
            writeln!(self.stdout, "{label}: ok")?;
            self.stdout.flush()?;
            return Ok(true);
        }
        let message = response
            .error_message
            .as_deref()
            .unwrap_or("no error message");
        writeln!(self.stderr, "{label}: failed: {message}")?;
        if let Some(trace) = response.error_trace.as_deref().filter(|_| self.verbose) {
            for line in trace.lines() {
                writeln!(self.stderr, "  {line}")?;
            }
        }
        self.stdout.flush()?;
        self.stderr.flush()?;
        Ok(false)
    }

    /// Prints a local failure for the command labelled `label`.
    ///
    /// # Errors
    ///
    /// Returns an error if stderr cannot be written.
    pub fn error(&mut self, label: &str, error: &dyn Error) -> io::Result<()> {
        writeln!(self.stderr, "{label}: error: {error}")?;
        if self.verbose {
            let mut source = error.source();
            while let Some(cause) = source {
                writeln!(self.stderr, "  caused by: {cause}")?;
                source = cause.source();
            }
        }
        self.stderr.flush()
    }
}

/// Formats build events, one per line.
///
/// Target headers and messages up to [`Priority::Info`] are always shown;
/// build boundaries, target failures and low-priority messages only in
/// verbose mode.
#[must_use]
pub fn render_report(report: &BuildReport, verbose: bool) -> String {
    let mut rendered = String::new();
    for event in &report.events {
        let line = match event {
            BuildEvent::TargetStarted { target } => Some(format!("{target}:")),
            BuildEvent::Message {
                target,
                priority,
                text,
            } if verbose || *priority <= Priority::Info => Some(match target {
                Some(target) => format!("  [{target}] {text}"),
                None => format!("  {text}"),
            }),
            BuildEvent::Message { .. } => None,
            BuildEvent::BuildStarted { project } if verbose => {
                Some(format!("build {project} started"))
            }
            BuildEvent::BuildFinished { project, error } if verbose => Some(match error {
                Some(error) => format!("build {project} failed: {error}"),
                None => format!("build {project} finished"),
            }),
            BuildEvent::TargetFinished {
                target,
                error: Some(error),
            } if verbose => Some(format!("{target} failed: {error}")),
            BuildEvent::BuildStarted { .. }
            | BuildEvent::BuildFinished { .. }
            | BuildEvent::TargetFinished { .. } => None,
        };
        if let Some(line) = line {
            let _ = writeln!(rendered, "{line}");
        }
    }
    rendered
}
