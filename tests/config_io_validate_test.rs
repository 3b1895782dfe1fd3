use std::fs;
use vandebron_green::config::Config;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.api.base_url = "http://10.0.0.5:8080".to_string();
    cfg.coordinator.update_interval_secs = 300;
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.api.base_url, "http://10.0.0.5:8080");
    assert_eq!(loaded.coordinator.update_interval_secs, 300);
    assert_eq!(loaded.logging.file, cfg.logging.file);
    assert!(loaded.validate().is_ok());
}

#[test]
fn partial_yaml_fills_in_defaults() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), "coordinator:\n  timezone: UTC\nweb:\n  port: 9000\n").unwrap();
    let cfg = Config::from_file(tmp.path()).unwrap();

    assert_eq!(cfg.coordinator.timezone, "UTC");
    assert_eq!(cfg.coordinator.update_interval_secs, 900);
    assert_eq!(cfg.web.port, 9000);
    assert_eq!(cfg.web.host, "127.0.0.1");
    assert_eq!(cfg.api.base_url, "https://vandebron.nl");
    assert_eq!(cfg.api.timeout_secs, 10);
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();
    assert!(cfg.validate().is_ok());

    // Base URL
    cfg.api.base_url.clear();
    assert!(cfg.validate().is_err());
    cfg = Config::default();
    cfg.api.base_url = "ftp://vandebron.nl".to_string();
    assert!(cfg.validate().is_err());

    // Zero timeout
    cfg = Config::default();
    cfg.api.timeout_secs = 0;
    assert!(cfg.validate().is_err());

    // Zero interval
    cfg = Config::default();
    cfg.coordinator.update_interval_secs = 0;
    assert!(cfg.validate().is_err());

    // Unknown timezone
    cfg = Config::default();
    cfg.coordinator.timezone = "Europe/Atlantis".to_string();
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("coordinator.timezone"));

    // Empty entry file
    cfg = Config::default();
    cfg.storage.entry_file = "  ".to_string();
    assert!(cfg.validate().is_err());

    // Invalid port
    cfg = Config::default();
    cfg.web.port = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"api: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}
