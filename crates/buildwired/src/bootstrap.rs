//! Server bootstrap orchestration.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use buildwire_config::Config;

use crate::health::HealthReporter;
use crate::project::{Project, ProjectError};
use crate::server::{Server, ServerHandle};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::ListenerError;

const ANONYMOUS_PROJECT: &str = "buildwire";

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The working directory could not be determined.
    #[error("failed to resolve working directory: {source}")]
    WorkingDirectory {
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The base directory is not valid UTF-8.
    #[error("base directory '{}' is not valid UTF-8", path.display())]
    NonUtf8Path {
        /// Offending path.
        path: PathBuf,
    },
    /// The project file failed to load.
    #[error("failed to load project: {source}")]
    Project {
        /// Underlying project error.
        #[source]
        source: ProjectError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    project: Arc<Project>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("config", &self.config)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The project served to clients.
    #[must_use]
    pub fn project(&self) -> &Arc<Project> {
        &self.project
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Starts a server for the project with the configured address and
    /// limits.
    ///
    /// # Errors
    ///
    /// Returns a [`ListenerError`] if the listener cannot be bound.
    pub fn serve(&self) -> Result<ServerHandle, ListenerError> {
        Server::from_config(&self.config, Arc::clone(&self.project))
            .with_reporter(Arc::clone(&self.reporter))
            .start()
    }
}

/// Bootstraps the server using the supplied collaborators.
///
/// Loads configuration, installs telemetry, resolves the base directory and
/// loads the project file when one is configured. Without a project file the
/// server runs an empty project that targets can be added to.
///
/// # Errors
///
/// Returns a [`BootstrapError`] naming the stage that failed; the reporter
/// sees the same error.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match prepare(loader) {
        Ok((config, project, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Daemon {
                config,
                project: Arc::new(project),
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn prepare(loader: &dyn ConfigLoader) -> Result<(Config, Project, TelemetryHandle), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let base_dir = resolve_base_dir(&config)?;
    let project = match config.project_file() {
        Some(file) => Project::load(file, base_dir)
            .map_err(|source| BootstrapError::Project { source })?,
        None => Project::new(ANONYMOUS_PROJECT, base_dir),
    };
    Ok((config, project, telemetry))
}

/// Configured base directory, else the project file's directory, else the
/// working directory.
fn resolve_base_dir(config: &Config) -> Result<Utf8PathBuf, BootstrapError> {
    if let Some(dir) = config.base_dir() {
        return Ok(dir.to_owned());
    }
    if let Some(parent) = config
        .project_file()
        .and_then(Utf8Path::parent)
        .filter(|parent| !parent.as_str().is_empty())
    {
        return Ok(parent.to_owned());
    }
    let cwd = env::current_dir().map_err(|source| BootstrapError::WorkingDirectory { source })?;
    Utf8PathBuf::from_path_buf(cwd).map_err(|path| BootstrapError::NonUtf8Path { path })
}
