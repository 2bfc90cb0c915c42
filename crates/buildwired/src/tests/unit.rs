//! Unit tests for the server bootstrap utilities.

use std::fs;
use std::sync::Arc;

use buildwire_config::Config;
use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use rstest::rstest;
use tempfile::TempDir;

use crate::bootstrap::{BootstrapError, StaticConfigLoader, bootstrap_with};

use super::support::{
    FailingConfigLoader, HealthEvent, RecordingHealthReporter, SAMPLE_PROJECT, TestConfigLoader,
};

fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir")
}

#[rstest]
fn bootstrap_without_project_file_serves_an_empty_project() {
    let loader = TestConfigLoader::new();
    let reporter = Arc::new(RecordingHealthReporter::default());

    let daemon = bootstrap_with(&loader, reporter.clone()).expect("bootstrap should succeed");

    assert_eq!(daemon.project().name(), "buildwire");
    assert_eq!(daemon.project().base_dir(), loader.root().as_path());
    assert_eq!(daemon.project().project_file(), None);
    assert_eq!(
        reporter.events(),
        vec![HealthEvent::BootstrapStarting, HealthEvent::BootstrapSucceeded]
    );
}

#[rstest]
fn base_dir_defaults_to_the_project_file_directory() {
    let dir = TempDir::new().expect("temp dir");
    let root = utf8_dir(&dir);
    fs::write(root.join("build.toml"), SAMPLE_PROJECT).expect("write project");
    let loader = StaticConfigLoader::new(Config {
        project_file: Some(root.join("build.toml")),
        ..Config::default()
    });

    let daemon = bootstrap_with(&loader, Arc::new(RecordingHealthReporter::default()))
        .expect("bootstrap should succeed");

    assert_eq!(daemon.project().base_dir(), root.as_path());
    assert_eq!(daemon.project().property("version").as_deref(), Some("1.0"));
}

#[rstest]
fn explicit_base_dir_wins() {
    let dir = TempDir::new().expect("temp dir");
    let root = utf8_dir(&dir);
    fs::write(root.join("build.toml"), SAMPLE_PROJECT).expect("write project");
    let elsewhere = root.join("work");
    let loader = StaticConfigLoader::new(Config {
        project_file: Some(root.join("build.toml")),
        base_dir: Some(elsewhere.clone()),
        ..Config::default()
    });

    let daemon = bootstrap_with(&loader, Arc::new(RecordingHealthReporter::default()))
        .expect("bootstrap should succeed");

    assert_eq!(daemon.project().base_dir(), elsewhere.as_path());
}

#[rstest]
fn missing_project_file_fails_bootstrap() {
    let dir = TempDir::new().expect("temp dir");
    let loader = StaticConfigLoader::new(Config {
        project_file: Some(utf8_dir(&dir).join("absent.toml")),
        ..Config::default()
    });
    let reporter = Arc::new(RecordingHealthReporter::default());

    let error = bootstrap_with(&loader, reporter.clone()).expect_err("bootstrap should fail");

    assert!(matches!(error, BootstrapError::Project { .. }));
    assert!(matches!(
        reporter.events().last(),
        Some(HealthEvent::BootstrapFailed(_))
    ));
}

#[rstest]
fn configuration_errors_are_reported() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let error =
        bootstrap_with(&FailingConfigLoader, reporter.clone()).expect_err("bootstrap should fail");

    assert!(matches!(error, BootstrapError::Configuration { .. }));
    assert_eq!(reporter.events().len(), 2);
}

#[rstest]
fn layered_loading_without_overrides_matches_the_defaults() {
    let loaded = Config::load_from_iter(["buildwired"]).expect("load configuration");
    let defaults = Config::default();

    assert_eq!(loaded.port(), defaults.port());
    assert_eq!(loaded.max_connections(), defaults.max_connections());
}
