//! Config load / save / init integration tests.

use assert_fs::prelude::*;
use habitguard_core::{config, Config, ConfigError, LogFormat};
use predicates::prelude::predicate;
use std::fs;
use std::path::PathBuf;

fn write_config(home: &assert_fs::TempDir, yaml: &str) {
    home.child(".habitguard/config.yaml")
        .write_str(yaml)
        .expect("write config");
}

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

#[test]
fn missing_config_yields_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let cfg = config::load_at(home.path()).expect("load");
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.hosts_path, PathBuf::from("/etc/hosts"));
    assert_eq!(cfg.poll_interval().as_secs(), 60);
}

#[test]
fn partial_config_fills_remaining_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(
        &home,
        "api_url: https://habits.example\npoll_interval_secs: 15\nlog_format: json\n",
    );

    let cfg = config::load_at(home.path()).expect("load");
    assert_eq!(cfg.api_url, "https://habits.example");
    assert_eq!(cfg.poll_interval_secs, 15);
    assert_eq!(cfg.log_format, LogFormat::Json);
    assert_eq!(cfg.fetch_timeout_secs, 5);
}

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(&home, ": : corrupt : yaml : !!!\n  - broken: [unclosed");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn unknown_field_is_rejected() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(&home, "poll_interval: 10\n");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

#[test]
fn zero_interval_fails_validation() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(&home, "poll_interval_secs: 0\n");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(
        matches!(err, ConfigError::Invalid { field: "poll_interval_secs", .. }),
        "got: {err}"
    );
}

#[test]
fn non_http_api_url_fails_validation() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(&home, "api_url: ftp://nope\n");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "api_url", .. }));
}

// ---------------------------------------------------------------------------
// 2. Save / init
// ---------------------------------------------------------------------------

#[test]
fn save_round_trips_and_cleans_tmp() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let cfg = Config {
        hosts_path: PathBuf::from("/tmp/hosts"),
        socket_path: Some(PathBuf::from("/run/habitguard.sock")),
        ..Config::default()
    };
    let path = config::save_at(home.path(), &cfg).expect("save");

    home.child(".habitguard/config.yaml")
        .assert(predicate::path::exists());
    assert!(!path.with_file_name("config.yaml.tmp").exists());
    assert_eq!(config::load_at(home.path()).expect("reload"), cfg);
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::init_at(home.path(), false).expect("first init");

    let err = config::init_at(home.path(), false).unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyExists { .. }));

    write_config(&home, "poll_interval_secs: 5\n");
    config::init_at(home.path(), true).expect("forced init");
    assert_eq!(
        config::load_at(home.path()).expect("load").poll_interval_secs,
        60,
        "forced init resets to defaults"
    );
}

#[cfg(unix)]
#[test]
fn saved_config_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let home = assert_fs::TempDir::new().expect("tempdir");
    let path = config::init_at(home.path(), false).expect("init");
    let mode = fs::metadata(&path).expect("metadata").permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}
