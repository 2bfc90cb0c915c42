//! Blocking client for one build server connection.
//!
//! A [`Client`] owns a TCP stream for its whole life. Every call to
//! [`Client::send_command`] writes one command frame, streams the command's
//! payload, and reads exactly one response followed by the response payload,
//! so the stream is always positioned at a frame boundary between calls.

use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, TcpStream};

use buildwire_protocol::{Command, Response, copy_exact, read_frame, write_frame};

use crate::errors::ClientError;
use crate::transport::Endpoint;

struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

/// Connection to a build server.
pub struct Client {
    connection: Option<Connection>,
}

impl Client {
    /// Connects to `endpoint` and consumes the server's handshake.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the address cannot be resolved, the
    /// connection cannot be opened, or no handshake arrives.
    pub fn connect(endpoint: &Endpoint) -> Result<Self, ClientError> {
        let stream = endpoint.open()?;
        let writer = stream
            .try_clone()
            .map_err(|source| ClientError::Connect {
                address: endpoint.label(),
                source,
            })?;
        let mut reader = BufReader::new(stream);
        let _handshake: Response = read_frame(&mut reader)
            .map_err(ClientError::Handshake)?
            .ok_or(ClientError::Closed)?;
        Ok(Self {
            connection: Some(Connection {
                reader,
                writer: BufWriter::new(writer),
            }),
        })
    }

    /// Returns true while the socket is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Sends `command` and waits for its response.
    ///
    /// Exactly [`Command::content_length`] bytes are streamed from `payload`
    /// after the command frame. When the response declares a payload, exactly
    /// that many bytes are copied into `sink`; pass [`io::sink`] to discard
    /// them. The client disconnects after a terminating command, and after
    /// any failure that leaves the stream out of step.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Invalid`] without touching the network when the
    /// command fails validation, and other variants when the exchange fails.
    pub fn send_command(
        &mut self,
        command: &Command,
        payload: &mut dyn Read,
        sink: &mut dyn Write,
    ) -> Result<Response, ClientError> {
        command.validate()?;
        let connection = self.connection.as_mut().ok_or(ClientError::NotConnected)?;
        let result = exchange(connection, command, payload, sink);
        if result.is_err() || command.is_terminating() {
            self.disconnect();
        }
        result
    }

    /// Sends a command that carries no payload, discarding any payload sent
    /// back.
    ///
    /// # Errors
    ///
    /// Same as [`Client::send_command`].
    pub fn send(&mut self, command: &Command) -> Result<Response, ClientError> {
        self.send_command(command, &mut io::empty(), &mut io::sink())
    }

    /// Asks the server to stop, then disconnects.
    ///
    /// # Errors
    ///
    /// Same as [`Client::send_command`].
    pub fn shutdown(&mut self) -> Result<Response, ClientError> {
        let result = self.send(&Command::Shutdown);
        self.disconnect();
        result
    }

    /// Closes the socket without notifying the server. Safe to call again.
    pub fn disconnect(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            let _ = connection.writer.flush();
            let _ = connection.reader.get_ref().shutdown(Shutdown::Both);
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn exchange(
    connection: &mut Connection,
    command: &Command,
    payload: &mut dyn Read,
    sink: &mut dyn Write,
) -> Result<Response, ClientError> {
    write_frame(&mut connection.writer, command).map_err(ClientError::Send)?;
    let length = command.content_length();
    if length > 0 {
        copy_exact(payload, &mut connection.writer, length).map_err(ClientError::Upload)?;
    }
    let response: Response = read_frame(&mut connection.reader)
        .map_err(ClientError::Receive)?
        .ok_or(ClientError::Closed)?;
    if response.content_length > 0 {
        copy_exact(&mut connection.reader, sink, response.content_length)
            .map_err(ClientError::Download)?;
    }
    Ok(response)
}
