//! Tests for loading `BridgeConfig` from files.

use raven_rs::{BridgeConfig, DayBoundary, RavenError};
use std::io::Write;

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
serial_path = "/dev/ttyUSB1"
baudrate = 57600
channel_id = 31337
write_key = "WRITEKEY"
poll_interval_secs = 120
day_boundary = "-05:00"
"#
    )
    .unwrap();

    let config = BridgeConfig::load(file.path()).unwrap();
    assert_eq!(config.serial_path, "/dev/ttyUSB1");
    assert_eq!(config.serial_config().baudrate, 57600);
    assert_eq!(config.channel().unwrap().0, 31337);
    assert_eq!(config.day_boundary, "-05:00".parse::<DayBoundary>().unwrap());
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = BridgeConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, RavenError::ConfigError(_)));
}

#[test]
fn test_malformed_file_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "baudrate = \"fast\"").unwrap();
    let err = BridgeConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, RavenError::ConfigError(_)));
}
