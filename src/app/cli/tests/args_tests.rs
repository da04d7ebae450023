//! Tests for host argument parsing

use crate::app::cli::{Args, DEFAULT_CONFIG_FILE};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_defaults() {
    let args = Args::try_parse_from(["queuebridge"]).unwrap();

    assert!(args.config.is_none());
    assert!(!args.check);
    assert!(args.log_level.is_none());
    assert!(args.log_file_path().is_none());

    if let Some(path) = args.config_path() {
        assert!(path.ends_with(PathBuf::from("queuebridge").join(DEFAULT_CONFIG_FILE)));
    }
}

#[test]
fn test_explicit_config_and_check() {
    let args = Args::try_parse_from([
        "queuebridge",
        "--config",
        "/etc/queuebridge/queues.toml",
        "--check",
    ])
    .unwrap();

    assert!(args.check);
    assert_eq!(
        args.config_path(),
        Some(PathBuf::from("/etc/queuebridge/queues.toml"))
    );
}

#[test]
fn test_logging_flags() {
    let args = Args::try_parse_from([
        "queuebridge",
        "-l",
        "debug",
        "--log-format",
        "json",
        "--log-file",
        "/tmp/queuebridge.log",
    ])
    .unwrap();

    assert_eq!(args.log_level.as_deref(), Some("debug"));
    assert_eq!(args.log_format.as_deref(), Some("json"));
    assert_eq!(args.log_file_path(), Some("/tmp/queuebridge.log"));
}

#[test]
fn test_log_file_none_disables_file_output() {
    let args = Args::try_parse_from(["queuebridge", "--log-file", "none"]).unwrap();
    assert!(args.log_file_path().is_none());
}

#[test]
fn test_invalid_values_rejected() {
    assert!(Args::try_parse_from(["queuebridge", "--log-level", "loud"]).is_err());
    assert!(Args::try_parse_from(["queuebridge", "--log-format", "xml"]).is_err());
    assert!(Args::try_parse_from(["queuebridge", "--color", "--no-color"]).is_err());
}

#[test]
fn test_color_flags() {
    let forced = Args::try_parse_from(["queuebridge", "--color"]).unwrap();
    assert!(forced.use_color());

    let disabled = Args::try_parse_from(["queuebridge", "--no-color"]).unwrap();
    assert!(!disabled.use_color());
}
