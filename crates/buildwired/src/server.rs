//! Server start and stop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use buildwire_config::{Config, DEFAULT_HOST, DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT};

use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::project::Project;
use crate::report::{JsonReport, ReportFormat};
use crate::session::{SessionContext, SessionHandler};
use crate::transport::{ListenerError, ListenerHandle, ShutdownFlag, SocketListener};

/// Command server for one build project.
///
/// ```no_run
/// use std::sync::Arc;
/// use buildwired::{Project, Server};
///
/// # fn main() -> Result<(), buildwired::ListenerError> {
/// let project = Arc::new(Project::new("demo", "."));
/// let handle = Server::new(project).with_address("127.0.0.1", 0).start()?;
/// println!("listening on {}", handle.local_addr());
/// handle.stop();
/// handle.join()?;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    project: Arc<Project>,
    host: String,
    port: u16,
    max_connections: Option<usize>,
    idle_timeout: Option<Duration>,
    report: Arc<dyn ReportFormat>,
    reporter: Arc<dyn HealthReporter>,
}

impl Server {
    /// Creates a server with the default address and limits.
    #[must_use]
    pub fn new(project: Arc<Project>) -> Self {
        Self {
            project,
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
            max_connections: Some(DEFAULT_MAX_CONNECTIONS),
            idle_timeout: None,
            report: Arc::new(JsonReport),
            reporter: Arc::new(StructuredHealthReporter::new()),
        }
    }

    /// Creates a server from resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config, project: Arc<Project>) -> Self {
        Self::new(project)
            .with_address(config.host(), config.port())
            .with_max_connections(config.max_connections())
            .with_idle_timeout(config.idle_timeout())
    }

    /// Sets the bind address; port 0 picks a free port.
    #[must_use]
    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Caps concurrently served connections; `None` removes the cap.
    #[must_use]
    pub fn with_max_connections(mut self, limit: Option<usize>) -> Self {
        self.max_connections = limit;
        self
    }

    /// Closes connections that send nothing for `timeout`.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Replaces the report renderer.
    #[must_use]
    pub fn with_report_format(mut self, report: Arc<dyn ReportFormat>) -> Self {
        self.report = report;
        self
    }

    /// Replaces the health reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn HealthReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Binds the listener and starts accepting on a background thread.
    ///
    /// The socket is bound before this returns, so clients may connect as
    /// soon as the handle exists.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] if the address cannot be resolved or bound.
    pub fn start(self) -> Result<ServerHandle, ListenerError> {
        let listener = SocketListener::bind(&self.host, self.port)?
            .with_connection_limit(self.max_connections);
        let addr = listener.local_addr();
        let shutdown = ShutdownFlag::default();
        let handler = Arc::new(SessionHandler::new(SessionContext {
            project: self.project,
            report: self.report,
            reporter: Arc::clone(&self.reporter),
            shutdown: shutdown.clone(),
            idle_timeout: self.idle_timeout,
        }));
        let listener = listener.start(handler, shutdown)?;
        self.reporter.server_listening(addr);
        Ok(ServerHandle {
            addr,
            listener,
            reporter: self.reporter,
        })
    }
}

/// Running server.
///
/// Dropping the handle requests a stop without waiting for it.
pub struct ServerHandle {
    addr: SocketAddr,
    listener: ListenerHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl ServerHandle {
    /// Address the server is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Requests a stop and closes the listening socket before returning.
    ///
    /// Connections already being served finish their current command.
    pub fn stop(&self) {
        self.listener.shutdown();
    }

    /// Flag that stops this server when triggered, for use from other
    /// threads.
    #[must_use]
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.listener.flag()
    }

    /// Returns true once a stop was requested by [`stop`](Self::stop), a
    /// flag or a `Shutdown` command.
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.listener.flag().is_triggered()
    }

    /// Waits until the listener has stopped and every connection it
    /// admitted has finished.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] if the accept thread panicked.
    pub fn join(self) -> Result<(), ListenerError> {
        let Self {
            addr,
            listener,
            reporter,
        } = self;
        listener.join()?;
        reporter.server_stopped(addr);
        Ok(())
    }
}
