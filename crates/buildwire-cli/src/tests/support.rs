//! Test support for CLI coverage.
//!
//! Runs a real `buildwired` server in process, rooted in a scratch directory,
//! and captures the CLI's output and exit code.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::net::{SocketAddr, TcpListener};
use std::process::ExitCode;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use buildwire_config::Config;
use buildwired::{
    BootstrapError, ConnectionId, HealthReporter, Project, Server, ServerHandle, SessionSummary,
};
use camino::{Utf8Path, Utf8PathBuf};
use rstest::fixture;
use tempfile::TempDir;

use crate::config::ConfigLoader;
use crate::errors::AppError;

const WAIT: Duration = Duration::from_secs(5);

/// Project served by the test server.
pub(crate) const PROJECT: &str = r#"
name = "app"
default = "package"

[properties]
version = "2.1"

[[target]]
name = "compile"
echo = ["compiling ${version}"]

[[target]]
name = "package"
depends = ["compile"]
echo = ["packaging ${version}"]

[[target]]
name = "broken"
fail = "tests failed"
"#;

/// Sub-build project next to [`PROJECT`].
pub(crate) const SUB_PROJECT: &str = r#"
name = "sub"
default = "dist"

[[target]]
name = "dist"
echo = ["dist ${version} ${mode}"]
"#;

/// Loader that points the client at a fixed port.
pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Collects the summaries of closed sessions.
#[derive(Debug, Default)]
pub(crate) struct SessionLog {
    closed: Mutex<Vec<SessionSummary>>,
    changed: Condvar,
}

impl SessionLog {
    /// Waits until `count` sessions have closed and returns them.
    pub(crate) fn wait_for(&self, count: usize) -> Vec<SessionSummary> {
        let guard = self.closed.lock().expect("session log poisoned");
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, WAIT, |closed| closed.len() < count)
            .expect("session log poisoned");
        guard.clone()
    }
}

impl HealthReporter for SessionLog {
    fn bootstrap_starting(&self) {}

    fn bootstrap_succeeded(&self, _config: &Config) {}

    fn bootstrap_failed(&self, _error: &BootstrapError) {}

    fn server_listening(&self, _addr: SocketAddr) {}

    fn server_stopped(&self, _addr: SocketAddr) {}

    fn connection_opened(&self, _id: ConnectionId, _peer: Option<SocketAddr>) {}

    fn connection_closed(&self, _id: ConnectionId, summary: &SessionSummary) {
        self.closed
            .lock()
            .expect("session log poisoned")
            .push(summary.clone());
        self.changed.notify_all();
    }
}

/// Scenario world: a scratch directory, an optional server and the last CLI
/// run.
pub(crate) struct TestWorld {
    dir: TempDir,
    sessions: Arc<SessionLog>,
    server: Option<ServerHandle>,
    port: u16,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<ExitCode>,
}

impl TestWorld {
    /// Creates `server/` with the project files and an empty `local/`.
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let world = Self {
            dir,
            sessions: Arc::new(SessionLog::default()),
            server: None,
            port: unused_port(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
        };
        fs::create_dir_all(world.local_dir()).expect("create local dir");
        fs::create_dir_all(world.server_dir()).expect("create server dir");
        fs::write(world.server_dir().join("build.toml"), PROJECT).expect("write project");
        fs::write(world.server_dir().join("sub.toml"), SUB_PROJECT).expect("write sub project");
        world
    }

    fn root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().to_path_buf()).expect("utf8 temp dir")
    }

    /// Directory the server resolves command paths against.
    pub(crate) fn server_dir(&self) -> Utf8PathBuf {
        self.root().join("server")
    }

    /// Directory the client's `@name` arguments resolve against.
    pub(crate) fn local_dir(&self) -> Utf8PathBuf {
        self.root().join("local")
    }

    /// Starts a server for the project in `server/`.
    pub(crate) fn start_server(&mut self) {
        let server_dir = self.server_dir();
        let project = Project::load(&server_dir.join("build.toml"), server_dir.clone())
            .expect("load project");
        let server = Server::new(Arc::new(project))
            .with_address("127.0.0.1", 0)
            .with_reporter(self.sessions.clone())
            .start()
            .expect("start server");
        self.port = server.local_addr().port();
        self.server = Some(server);
    }

    /// Closed sessions, once `count` of them have been recorded.
    pub(crate) fn sessions(&self, count: usize) -> Vec<SessionSummary> {
        self.sessions.wait_for(count)
    }

    /// Returns true when the server refuses new connections.
    pub(crate) fn server_refuses_connections(&self) -> bool {
        std::net::TcpStream::connect(("127.0.0.1", self.port)).is_err()
    }

    /// Writes `bytes` to `local/<name>`.
    pub(crate) fn write_local(&self, name: &str, bytes: &[u8]) {
        let path = self.local_dir().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create local parent");
        }
        fs::write(path, bytes).expect("write local file");
    }

    /// Reads `local/<name>`, `None` when it does not exist.
    pub(crate) fn read_local(&self, name: &str) -> Option<Vec<u8>> {
        fs::read(self.local_dir().join(name)).ok()
    }

    /// Reads a file under the server's base directory.
    pub(crate) fn read_remote(&self, path: &str) -> Option<Vec<u8>> {
        fs::read(self.server_dir().join(path)).ok()
    }

    /// Writes a batch file of `run_target` entries to `local/<name>`.
    pub(crate) fn write_target_batch(&self, name: &str, targets: &[&str]) {
        let text: String = targets
            .iter()
            .map(|target| format!("[[command]]\nkind = \"run_target\"\ntarget = \"{target}\"\n\n"))
            .collect();
        self.write_local(name, text.as_bytes());
    }

    /// Runs the CLI with whitespace-separated `command` tokens; tokens
    /// starting with `@` name files under `local/`.
    pub(crate) fn run(&mut self, command: &str) {
        let local = self.local_dir();
        let args = std::iter::once(OsString::from("buildwire")).chain(
            command
                .split_whitespace()
                .map(|token| resolve_token(&local, token)),
        );
        let loader = StaticConfigLoader {
            config: Config {
                host: Some("127.0.0.1".to_owned()),
                port: Some(self.port),
                connect_timeout_secs: Some(2),
                ..Config::default()
            },
        };
        self.stdout.clear();
        self.stderr.clear();
        self.exit_code = Some(crate::run_with_loader(
            args,
            &mut self.stdout,
            &mut self.stderr,
            &loader,
        ));
    }

    pub(crate) fn stdout_text(&self) -> String {
        String::from_utf8(self.stdout.clone()).expect("stdout utf8")
    }

    pub(crate) fn stderr_text(&self) -> String {
        String::from_utf8(self.stderr.clone()).expect("stderr utf8")
    }

    pub(crate) fn exit_code(&self) -> ExitCode {
        self.exit_code.expect("the CLI has not run")
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.stop();
            let _ = server.join();
        }
    }
}

fn resolve_token(local: &Utf8Path, token: &str) -> OsString {
    match token.strip_prefix('@') {
        Some(name) => OsString::from(local.join(name).as_str()),
        None => OsString::from(token),
    }
}

fn unused_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind probe");
    listener.local_addr().expect("probe address").port()
}

#[fixture]
pub(crate) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
