//! Supervises server launch sequencing and runtime orchestration.

use std::sync::Arc;
use std::thread;

use tracing::{error, info};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Runs the server using the production collaborators.
///
/// Returns once a termination signal or a `Shutdown` command has stopped the
/// listener and every open connection has finished.
///
/// # Errors
///
/// Returns a [`LaunchError`] if signal handlers, bootstrap or the listener
/// fail.
pub fn run_daemon() -> Result<(), LaunchError> {
    let signal = SystemShutdownSignal::install()?;
    run_daemon_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        signal,
    )
}

/// Runs the server with injected collaborators.
///
/// The signal is awaited on a watcher thread. The watcher outlives this call
/// when the server stops through a `Shutdown` command instead.
///
/// # Errors
///
/// Same as [`run_daemon`].
pub fn run_daemon_with<S>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    mut signal: S,
) -> Result<(), LaunchError>
where
    S: ShutdownSignal,
{
    info!(target: PROCESS_TARGET, "starting server runtime");
    let daemon = bootstrap_with(loader, reporter)?;
    let server = daemon.serve()?;
    let stop = server.shutdown_flag();
    thread::Builder::new()
        .name(String::from("buildwire-signals"))
        .spawn(move || {
            if let Err(error) = signal.wait() {
                error!(target: PROCESS_TARGET, error = %error, "shutdown signal failed; stopping");
            }
            stop.trigger();
        })
        .map_err(|source| LaunchError::SignalThread { source })?;
    server.join()?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
