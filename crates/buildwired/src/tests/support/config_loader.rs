//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use buildwire_config::Config;

use crate::bootstrap::ConfigLoader;

/// Project file written by [`TestConfigLoader::with_project`].
pub const SAMPLE_PROJECT: &str = r#"
name = "sample"
default = "package"

[properties]
version = "1.0"

[[target]]
name = "compile"
echo = ["compiling ${version}"]

[[target]]
name = "package"
depends = ["compile"]
echo = ["packaging ${version}"]
"#;

/// Loader that binds an ephemeral port and roots the server in a temporary
/// directory.
pub struct TestConfigLoader {
    dir: TempDir,
    project: bool,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temporary directory"),
            project: false,
        }
    }

    /// Also writes [`SAMPLE_PROJECT`] and points the configuration at it.
    #[must_use]
    pub fn with_project() -> Self {
        let loader = Self {
            project: true,
            ..Self::new()
        };
        fs::write(loader.root().join("build.toml"), SAMPLE_PROJECT)
            .expect("failed to write sample project");
        loader
    }

    /// Temporary directory holding the project.
    #[must_use]
    pub fn root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().to_path_buf())
            .expect("temporary directory was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let root = self.root();
        Ok(Config {
            host: Some(String::from("127.0.0.1")),
            port: Some(0),
            project_file: self.project.then(|| root.join("build.toml")),
            base_dir: (!self.project).then_some(root),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("buildwired"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
