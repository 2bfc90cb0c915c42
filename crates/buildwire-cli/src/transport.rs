//! TCP connection helpers for the client.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use buildwire_config::Config;

use crate::errors::ClientError;

/// Where and how patiently the client connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    timeout: Duration,
}

impl Endpoint {
    /// Describes `host:port` with a connect timeout.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Reads host, port and connect timeout from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.host(), config.port(), config.connect_timeout())
    }

    /// `host:port` label used in error messages.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn open(&self) -> Result<TcpStream, ClientError> {
        let address = resolve_tcp_address(&self.host, self.port).map_err(|source| {
            ClientError::Resolve {
                address: self.label(),
                source,
            }
        })?;
        let stream = TcpStream::connect_timeout(&address, self.timeout).map_err(|source| {
            ClientError::Connect {
                address: self.label(),
                source,
            }
        })?;
        // Commands are small frames answered one at a time.
        let _ = stream.set_nodelay(true);
        Ok(stream)
    }
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}
