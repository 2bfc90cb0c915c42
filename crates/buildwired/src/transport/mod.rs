//! Socket listener for the command server.
//!
//! The transport module binds a TCP address and accepts connections in a
//! background thread, handing each one to a [`ConnectionHandler`] on a
//! dedicated, named thread. An admission gate bounds how many connections are
//! served at once; further clients wait in the accept backlog.

mod admission;
mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::handler::ConnectionId;
pub(crate) use self::handler::ConnectionHandler;
pub(crate) use self::listener::{ListenerHandle, SocketListener};
pub use self::listener::ShutdownFlag;
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
