//! Test double for [`HealthReporter`] that records structured events for assertions.
//!
//! The recorder captures lifecycle telemetry emitted during bootstrap, while
//! the server runs, and as connections open and close.

use std::net::SocketAddr;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use buildwire_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::session::{CloseReason, SessionSummary};
use crate::transport::ConnectionId;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The listener is bound.
    ServerListening(SocketAddr),
    /// The listener has stopped.
    ServerStopped,
    /// A connection opened.
    ConnectionOpened(ConnectionId),
    /// A connection closed.
    ConnectionClosed {
        id: ConnectionId,
        commands: u64,
        reason: CloseReason,
    },
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
    recorded: Condvar,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
        self.recorded.notify_all();
    }

    /// Waits up to `timeout` for an event matching `predicate`.
    pub fn wait_for<F>(&self, timeout: Duration, predicate: F) -> Option<HealthEvent>
    where
        F: Fn(&HealthEvent) -> bool,
    {
        let guard = self.events.lock().expect("health reporter mutex poisoned");
        let (guard, _) = self
            .recorded
            .wait_timeout_while(guard, timeout, |events| !events.iter().any(&predicate))
            .expect("health reporter mutex poisoned");
        guard.iter().find(|event| predicate(*event)).cloned()
    }

    /// Waits for the listener address.
    pub fn wait_for_address(&self, timeout: Duration) -> Option<SocketAddr> {
        match self.wait_for(timeout, |event| {
            matches!(event, HealthEvent::ServerListening(_))
        }) {
            Some(HealthEvent::ServerListening(addr)) => Some(addr),
            _ => None,
        }
    }

    /// Reasons of every closed connection, in order.
    pub fn close_reasons(&self) -> Vec<CloseReason> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HealthEvent::ConnectionClosed { reason, .. } => Some(reason),
                _ => None,
            })
            .collect()
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn server_listening(&self, addr: SocketAddr) {
        self.record(HealthEvent::ServerListening(addr));
    }

    fn server_stopped(&self, _addr: SocketAddr) {
        self.record(HealthEvent::ServerStopped);
    }

    fn connection_opened(&self, id: ConnectionId, _peer: Option<SocketAddr>) {
        self.record(HealthEvent::ConnectionOpened(id));
    }

    fn connection_closed(&self, id: ConnectionId, summary: &SessionSummary) {
        self.record(HealthEvent::ConnectionClosed {
            id,
            commands: summary.commands,
            reason: summary.reason.clone(),
        });
    }
}
