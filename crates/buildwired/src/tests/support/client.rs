//! Minimal protocol client for driving a server from tests.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use buildwire_protocol::{BuildReport, Command, Response, read_frame, write_frame};

/// Raw protocol client that has already consumed the handshake.
pub struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    /// Connects and reads the handshake record.
    pub fn connect(addr: SocketAddr) -> Self {
        let mut stream = TcpStream::connect(addr).expect("connect to server");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("set read timeout");
        let handshake: Response = read_frame(&mut stream)
            .expect("read handshake")
            .expect("server closed before handshake");
        assert_eq!(handshake, Response::handshake());
        Self { stream }
    }

    /// Sends a command with no payload and reads its response.
    pub fn send(&mut self, command: &Command) -> Response {
        self.send_with_payload(command, &[])
    }

    /// Sends a command followed by raw payload bytes.
    pub fn send_with_payload(&mut self, command: &Command, payload: &[u8]) -> Response {
        self.write(command, payload);
        self.read_response()
    }

    /// Writes a command and payload without waiting.
    pub fn write(&mut self, command: &Command, payload: &[u8]) {
        write_frame(&mut self.stream, command).expect("write command");
        self.stream.write_all(payload).expect("write payload");
        self.stream.flush().expect("flush payload");
    }

    /// Reads one response record.
    pub fn read_response(&mut self) -> Response {
        read_frame(&mut self.stream)
            .expect("read response")
            .expect("server closed before responding")
    }

    /// Reads the payload announced by `response`.
    pub fn read_payload(&mut self, response: &Response) -> Vec<u8> {
        let length = usize::try_from(response.content_length).expect("payload fits in memory");
        let mut payload = vec![0_u8; length];
        self.stream.read_exact(&mut payload).expect("read payload");
        payload
    }

    /// Writes raw bytes onto the stream.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).expect("write raw bytes");
    }

    /// Returns true once the server has closed the connection.
    pub fn is_closed(&mut self) -> bool {
        let mut byte = [0_u8; 1];
        matches!(self.stream.read(&mut byte), Ok(0) | Err(_))
    }
}

/// Decodes the report carried by `response`.
pub fn report(response: &Response) -> BuildReport {
    BuildReport::from_json(&response.report).expect("decode report")
}
