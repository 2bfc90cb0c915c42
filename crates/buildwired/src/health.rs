//! Structured health reporting for server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use buildwire_config::Config;

use crate::bootstrap::BootstrapError;
use crate::session::SessionSummary;
use crate::transport::ConnectionId;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the listener is bound and accepting.
    fn server_listening(&self, addr: SocketAddr);

    /// Invoked after the accept loop has exited and the socket is closed.
    fn server_stopped(&self, addr: SocketAddr);

    /// Invoked when a connection thread starts serving a client.
    fn connection_opened(&self, id: ConnectionId, peer: Option<SocketAddr>);

    /// Invoked when a connection has been closed.
    fn connection_closed(&self, id: ConnectionId, summary: &SessionSummary);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn server_listening(&self, addr: SocketAddr) {
        (**self).server_listening(addr);
    }

    fn server_stopped(&self, addr: SocketAddr) {
        (**self).server_stopped(addr);
    }

    fn connection_opened(&self, id: ConnectionId, peer: Option<SocketAddr>) {
        (**self).connection_opened(id, peer);
    }

    fn connection_closed(&self, id: ConnectionId, summary: &SessionSummary) {
        (**self).connection_closed(id, summary);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting server bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            address = %config.address_label(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            max_connections = ?config.max_connections(),
            "server bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "server bootstrap failed"
        );
    }

    fn server_listening(&self, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_listening",
            %addr,
            "server accepting connections"
        );
    }

    fn server_stopped(&self, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopped",
            %addr,
            "server stopped"
        );
    }

    fn connection_opened(&self, id: ConnectionId, peer: Option<SocketAddr>) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "connection_opened",
            connection = %id,
            peer = ?peer,
            "connection opened"
        );
    }

    fn connection_closed(&self, id: ConnectionId, summary: &SessionSummary) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "connection_closed",
            connection = %id,
            commands = summary.commands,
            reason = %summary.reason,
            "connection closed"
        );
    }
}
