//! Connection handler that runs command sessions.

use std::net::TcpStream;

use tracing::{info_span, warn};

use super::machine::Session;
use super::{CloseReason, SESSION_TARGET, SessionContext, SessionSummary};
use crate::transport::{ConnectionHandler, ConnectionId};

pub(crate) struct SessionHandler {
    context: SessionContext,
}

impl SessionHandler {
    pub(crate) fn new(context: SessionContext) -> Self {
        Self { context }
    }
}

impl ConnectionHandler for SessionHandler {
    fn handle(&self, stream: TcpStream, id: ConnectionId) {
        let peer = stream.peer_addr().ok();
        let span = info_span!(target: SESSION_TARGET, "connection", connection = %id);
        let _entered = span.enter();
        self.context.reporter.connection_opened(id, peer);

        let summary = match Session::open(stream, &self.context) {
            Ok(session) => session.run(),
            Err(error) => {
                warn!(target: SESSION_TARGET, error = %error, "failed to prepare connection");
                SessionSummary {
                    commands: 0,
                    reason: CloseReason::Io(error.to_string()),
                }
            }
        };
        self.context.reporter.connection_closed(id, &summary);
    }
}
