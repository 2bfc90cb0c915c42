//! The session state machine.

use std::io::{self, BufRead, BufReader, BufWriter, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use buildwire_protocol::{
    BuildReport, Command, ProtocolError, Response, copy_exact_and_close, discard_exact,
    read_frame, write_frame,
};
use tracing::{debug, trace, warn};

use super::{CloseReason, SESSION_TARGET, SessionContext, SessionSummary, error_trace};
use crate::commands::{self, CommandOutput, ResponsePayload};
use crate::project::EventLog;

/// How often a waiting session checks for a server stop.
const STOP_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Handshake,
    AwaitingCommand,
    Executing,
    Responding,
    Closed,
}

struct Reply {
    response: Response,
    payload: Option<ResponsePayload>,
}

pub(super) struct Session<'a> {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    context: &'a SessionContext,
    state: SessionState,
    commands: u64,
}

impl<'a> Session<'a> {
    pub(super) fn open(stream: TcpStream, context: &'a SessionContext) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream.try_clone()?);
        Ok(Self {
            stream,
            reader,
            writer,
            context,
            state: SessionState::Handshake,
            commands: 0,
        })
    }

    /// Serves the connection until it ends, then closes it.
    pub(super) fn run(mut self) -> SessionSummary {
        let reason = self.serve();
        self.transition(SessionState::Closed);
        debug!(target: SESSION_TARGET, reason = %reason, "session finished");
        SessionSummary {
            commands: self.commands,
            reason,
        }
    }

    fn serve(&mut self) -> CloseReason {
        if let Err(error) = write_frame(&mut self.writer, &Response::handshake()) {
            return close_reason(error);
        }
        loop {
            self.transition(SessionState::AwaitingCommand);
            if let Err(reason) = self.await_command() {
                return reason;
            }
            let command: Command = match read_frame(&mut self.reader) {
                Ok(Some(command)) => command,
                Ok(None) => return CloseReason::PeerClosed,
                Err(ProtocolError::Decode(error)) => {
                    self.reject(&error);
                    return CloseReason::Protocol(error.to_string());
                }
                Err(error) => return close_reason(error),
            };
            self.commands += 1;
            debug!(target: SESSION_TARGET, command = command.name(), "command received");

            self.transition(SessionState::Executing);
            if matches!(command, Command::Shutdown) {
                self.context.shutdown.trigger();
            }
            let reply = match self.execute(&command) {
                Ok(reply) => reply,
                Err(error) => return CloseReason::Io(error.to_string()),
            };

            self.transition(SessionState::Responding);
            if let Err(error) = self.respond(reply) {
                return close_reason(error);
            }

            match command {
                Command::Disconnect => return CloseReason::Disconnected,
                Command::Shutdown => return CloseReason::ShutdownRequested,
                Command::RunTarget { .. }
                | Command::RunBuild(_)
                | Command::SendFile(_)
                | Command::FetchFile { .. } => {}
            }
        }
    }

    /// Waits until the next command starts to arrive.
    ///
    /// The idle timeout and server stops only apply here. Once a frame has
    /// begun, reads block until the command and its payload are complete.
    fn await_command(&mut self) -> Result<(), CloseReason> {
        let started = Instant::now();
        loop {
            if self.context.shutdown.is_triggered() {
                return Err(CloseReason::ServerStopping);
            }
            let wait = match self.context.idle_timeout {
                Some(limit) => {
                    let left = limit.saturating_sub(started.elapsed());
                    if left.is_zero() {
                        return Err(CloseReason::IdleTimeout);
                    }
                    left.min(STOP_POLL)
                }
                None => STOP_POLL,
            };
            self.set_read_timeout(Some(wait))?;
            match self.reader.fill_buf() {
                Ok([]) => return Err(CloseReason::PeerClosed),
                Ok(_) => break,
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(error) => return Err(CloseReason::Io(error.to_string())),
            }
        }
        self.set_read_timeout(None)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), CloseReason> {
        self.stream
            .set_read_timeout(timeout)
            .map_err(|error| CloseReason::Io(error.to_string()))
    }

    /// Runs one command with a fresh listener attached for its duration.
    ///
    /// Payload bytes the executor leaves unread are discarded so the next
    /// frame starts at the right offset. Only a stream failure is an error.
    fn execute(&mut self, command: &Command) -> io::Result<Reply> {
        let context = self.context;
        let project = &context.project;
        let mut payload = Read::take(&mut self.reader, command.content_length());
        let log = Arc::new(EventLog::default());

        let outcome = match command.validate() {
            Err(error) => {
                debug!(target: SESSION_TARGET, error = %error, "command rejected");
                Err(Response::failure(error.to_string()))
            }
            Ok(()) => {
                let _guard = project.attach(log.clone());
                commands::execute(command, project, &mut payload).map_err(|error| {
                    warn!(
                        target: SESSION_TARGET,
                        command = command.name(),
                        error = %error,
                        "command failed"
                    );
                    Response::failure(error.to_string()).with_trace(error_trace(&error))
                })
            }
        };

        let unread = payload.limit();
        if unread > 0 {
            debug!(target: SESSION_TARGET, unread, "discarding unread payload");
            discard_exact(&mut payload, unread)?;
        }

        let (mut response, payload) = match outcome {
            Ok(CommandOutput { payload }) => (Response::default(), payload),
            Err(response) => (response, None),
        };
        response.report = self.render(&BuildReport::new(log.take()));
        response.content_length = payload.as_ref().map_or(0, ResponsePayload::length);
        Ok(Reply { response, payload })
    }

    fn render(&self, report: &BuildReport) -> String {
        self.context.report.render(report).unwrap_or_else(|error| {
            warn!(target: SESSION_TARGET, error = %error, "sending empty report");
            String::new()
        })
    }

    fn respond(&mut self, reply: Reply) -> Result<(), ProtocolError> {
        write_frame(&mut self.writer, &reply.response)?;
        if let Some(payload) = reply.payload {
            let (length, source) = payload.into_parts();
            copy_exact_and_close(source, &mut self.writer, length)?;
        }
        Ok(())
    }

    /// Best-effort failure record for an undecodable command.
    fn reject(&mut self, error: &serde_json::Error) {
        let response = Response::failure(format!("malformed command: {error}"));
        if let Err(write_error) = write_frame(&mut self.writer, &response) {
            debug!(target: SESSION_TARGET, error = %write_error, "could not report malformed command");
        }
    }

    fn transition(&mut self, next: SessionState) {
        trace!(target: SESSION_TARGET, from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(error) = io::Write::flush(&mut self.writer) {
            debug!(target: SESSION_TARGET, error = %error, "flush on close failed");
        }
        for direction in [Shutdown::Read, Shutdown::Write] {
            if let Err(error) = self.stream.shutdown(direction) {
                debug!(target: SESSION_TARGET, ?direction, error = %error, "socket shutdown failed");
            }
        }
    }
}

fn close_reason(error: ProtocolError) -> CloseReason {
    match error {
        ProtocolError::Io(error) => CloseReason::Io(error.to_string()),
        other => CloseReason::Protocol(other.to_string()),
    }
}
