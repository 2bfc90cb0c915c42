//! Build command server.
//!
//! `buildwired` accepts TCP connections from the `buildwire` client and runs
//! build commands against a shared [`Project`]. Each connection is served on
//! its own thread by a session that writes a handshake record and then
//! answers every command with exactly one [`Response`] record, followed by
//! any raw payload bytes the response announces.
//!
//! Events fired while a command runs are captured by a listener attached for
//! that command alone and returned as the response's report. Listeners are
//! scoped to the connection thread, so concurrent clients never see each
//! other's build output.
//!
//! The process lifecycle mirrors other daemons: [`bootstrap_with`] loads
//! configuration, installs telemetry and loads the project; [`run_daemon`]
//! serves until a termination signal or a `Shutdown` command arrives.
//!
//! [`Response`]: buildwire_protocol::Response

mod bootstrap;
pub mod commands;
mod health;
pub mod project;
mod process;
mod report;
mod server;
mod session;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon,
    run_daemon_with,
};
pub use project::{Project, ProjectError, Target};
pub use report::{JsonReport, ReportError, ReportFormat};
pub use server::{Server, ServerHandle};
pub use session::{CloseReason, SessionSummary};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use transport::{ConnectionId, ListenerError, ShutdownFlag};

#[cfg(test)]
mod tests;
