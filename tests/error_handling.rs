// tests/error_handling.rs

use std::io::Write;
use tempfile::NamedTempFile;
use qk::config::{load_and_validate, load_or_default};
use qk::errors::QkError;
use qk::types::ExitedPolicy;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_invalid_toml_returns_toml_error() {
    let file = config_file("[run\noutput_lines = ");

    match load_and_validate(file.path()) {
        Err(QkError::TomlError(_)) => {}
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_wrong_value_type_returns_toml_error() {
    let file = config_file(
        r#"
[display]
show_timer = "yes"
"#,
    );

    assert!(matches!(load_and_validate(file.path()), Err(QkError::TomlError(_))));
}

#[test]
fn test_zero_output_lines_returns_config_error() {
    let file = config_file(
        r#"
[run]
output_lines = 0
"#,
    );

    match load_and_validate(file.path()) {
        Err(QkError::ConfigError(msg)) => assert!(msg.contains("output_lines")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_exited_policy_is_rejected() {
    let file = config_file(
        r#"
[run]
exited_policy = "sometimes"
"#,
    );

    assert!(load_and_validate(file.path()).is_err());
}

#[test]
fn test_missing_explicit_config_returns_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    match load_or_default(Some(missing.as_path())) {
        Err(QkError::IoError(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        Err(e) => panic!("Expected IoError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_full_config_is_loaded() {
    let file = config_file(
        r#"
[display]
show_timer = false
show_stdout = true

[run]
output_lines = 20
grace_period_ms = 250
shutdown_timeout_ms = 500
exited_policy = "fail"
depth = -1
markers = ["package.json"]
ignore = ["node_modules", "dist"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert!(!cfg.display.show_timer);
    assert!(cfg.display.show_scripts);
    assert!(cfg.display.show_stdout);
    assert_eq!(cfg.run.output_lines, 20);
    assert_eq!(cfg.run.grace_period().as_millis(), 250);
    assert_eq!(cfg.run.shutdown_timeout().as_millis(), 500);
    assert_eq!(cfg.run.exited_policy, ExitedPolicy::Fail);
    assert_eq!(cfg.run.max_depth(), None);
    assert_eq!(cfg.run.markers, vec!["package.json"]);
}
