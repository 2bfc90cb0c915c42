use std::ffi::OsString;
use std::fs;

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;
use buildwire_config::Config;

#[test]
fn malformed_config_file_is_reported() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let cli_path = temp_dir.path().join("buildwire.toml");
    fs::write(&cli_path, "port = not_a_number\n").expect("write malformed config");

    let args = vec![
        OsString::from("buildwire"),
        OsString::from("--config-path"),
        cli_path.clone().into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    let mentions_file = match error.as_ref() {
        OrthoError::File { path, .. } => path == &cli_path,
        OrthoError::Aggregate(aggregate) => aggregate.iter().any(
            |err| matches!(err, OrthoError::File { path, .. } if path == &cli_path),
        ),
        _ => false,
    };
    assert!(mentions_file, "expected the malformed file in the error, got {error:?}");
}

#[test]
fn out_of_range_port_is_rejected() {
    let args = vec![
        OsString::from("buildwire"),
        OsString::from("--port"),
        OsString::from("70000"),
    ];

    assert!(Config::load_from_iter(args).is_err());
}
