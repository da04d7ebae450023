//! Host binary integration tests
//!
//! Only `--check` is exercised here; it validates and exits without waiting
//! for a shutdown signal.

use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn queuebridge() -> Command {
    Command::new(env!("CARGO_BIN_EXE_queuebridge"))
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn check_prints_reactor_plan() {
    let config = config_file(
        r#"
[[queue]]
id = "orders"
broker = "memory"
processing_mode = "subscribe"
transactional = true

[[queue]]
id = "quotes"
broker = "memory"
processing_mode = "subscribe_and_reply"
"#,
    );

    let output = queuebridge()
        .arg("--config")
        .arg(config.path())
        .args(["--check", "--no-color", "--log-level", "off"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "stdout: {}", stdout);
    assert!(lines[1].starts_with("orders") && lines[1].ends_with("transacted-polling"));
    assert!(lines[2].starts_with("quotes") && lines[2].ends_with("subscribe-and-reply"));
}

#[test]
fn invalid_configuration_exits_nonzero() {
    let config = config_file(
        r#"
[[queue]]
id = "orders"
broker = "kafka"
processing_mode = "polling"
"#,
    );

    let output = queuebridge()
        .arg("--config")
        .arg(config.path())
        .args(["--check", "--no-color", "--log-level", "off"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_config_file_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let output = queuebridge()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .args(["--check", "--log-level", "off"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}
