// tests/integration/error_handling.rs

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use watchtree::config::{load_and_validate, load_or_default};
use watchtree::errors::WatchtreeError;
use watchtree::types::{EventMask, RenameCorrelation};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_valid_config_loads() {
    let file = config_file(
        r#"
[watch]
paths = ["/srv/data", "/srv/logs"]
recursive = false
events = ["create", "delete_self"]

[reader]
buffer_size = 4096
batch_capacity = 16
rename_correlation = "cookie"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.watch.paths.len(), 2);
    assert!(!cfg.watch.recursive);
    assert_eq!(cfg.event_mask(), EventMask::CREATE | EventMask::DELETE_SELF);
    assert_eq!(cfg.reader.batch_capacity, 16);
    let options = cfg.loop_options();
    assert_eq!(options.buffer_size, 4096);
    assert_eq!(options.rename_correlation, RenameCorrelation::Cookie);
}

#[test]
fn test_unknown_event_returns_config_error() {
    let file = config_file("[watch]\nevents = [\"create\", \"teleport\"]\n");

    match load_and_validate(file.path()) {
        Err(WatchtreeError::ConfigError(msg)) => assert!(msg.contains("teleport")),
        Err(e) => panic!("Expected ConfigError, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_tiny_buffer_returns_config_error() {
    let file = config_file("[reader]\nbuffer_size = 100\n");

    match load_and_validate(file.path()) {
        Err(WatchtreeError::ConfigError(msg)) => assert!(msg.contains("buffer_size")),
        Err(e) => panic!("Expected ConfigError, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_invalid_toml_returns_toml_error() {
    let file = config_file("[watch\npaths = ");

    assert!(matches!(
        load_and_validate(file.path()),
        Err(WatchtreeError::TomlError(_))
    ));
}

#[test]
fn test_missing_explicit_config_is_io_error() {
    let err = load_or_default(Some(Path::new("/definitely/not/here/Watchtree.toml"))).unwrap_err();
    assert!(matches!(err, WatchtreeError::IoError(_)));
    assert_eq!(err.os_code(), Some(libc::ENOENT));
}
