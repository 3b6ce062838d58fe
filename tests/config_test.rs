use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

use s3explorer::config::{apply_env_with, load_config, load_from_yaml, Config};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

/// Test loading configuration from YAML file
#[test]
fn test_load_yaml_config() {
    let yaml = r#"
server:
  address: "127.0.0.1:9000"
  request_timeout: 20
  shutdown_timeout: 5

aws:
  region: us-west-2
  endpoint_url: http://localhost:4566
  access_key: AKIATEST
  secret_key: secrettest
  max_attempts: 5

log:
  level: debug
  format: console
"#;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    fs::write(&config_path, yaml).unwrap();

    let config = load_from_yaml(&config_path).unwrap().normalize().unwrap();

    assert_eq!(config.server.address, "127.0.0.1:9000");
    assert_eq!(config.server.request_timeout, 20);
    assert_eq!(config.server.shutdown_timeout, 5);

    assert_eq!(config.aws.region, "us-west-2");
    assert_eq!(config.aws.endpoint_url.as_deref(), Some("http://localhost:4566"));
    assert!(config.aws.path_style());
    assert_eq!(config.aws.max_attempts, 5);

    let credentials = config.aws.credentials().unwrap();
    assert_eq!(credentials.access_key, "AKIATEST");
    assert_eq!(credentials.secret_key, "secrettest");

    assert_eq!(config.log.level, "debug");
    assert_eq!(config.log.format, "console");
}

/// Sections left out of the file keep their defaults
#[test]
fn test_partial_yaml_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    fs::write(&config_path, "aws:\n  region: ap-south-1\n").unwrap();

    let config = load_from_yaml(&config_path).unwrap().normalize().unwrap();

    assert_eq!(config.aws.region, "ap-south-1");
    assert_eq!(config.server.address, "0.0.0.0:8080");
    assert_eq!(config.server.request_timeout, 30);
    assert_eq!(config.server.shutdown_timeout, 10);
    assert_eq!(config.aws.max_attempts, 3);
    assert!(!config.aws.path_style());
    assert_eq!(config.log.format, "json");
}

/// Environment variables override file values
#[test]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    fs::write(&config_path, "server:\n  address: \"127.0.0.1:9000\"\n").unwrap();

    let mut config = load_from_yaml(&config_path).unwrap();
    apply_env_with(
        &mut config,
        lookup(&[
            ("S3EXPLORER_SERVER_ADDRESS", "0.0.0.0:7000"),
            ("S3EXPLORER_AWS_FORCE_PATH_STYLE", "true"),
            ("S3EXPLORER_LOG_FORMAT", "console"),
        ]),
    )
    .unwrap();
    let config = config.normalize().unwrap();

    assert_eq!(config.server.address, "0.0.0.0:7000");
    assert!(config.aws.force_path_style);
    assert_eq!(config.log.format, "console");
}

#[test]
fn test_invalid_values_rejected() {
    let mut config = Config::default();
    config.log.format = "xml".to_string();
    assert!(config.normalize().is_err());

    let mut config = Config::default();
    assert!(apply_env_with(&mut config, lookup(&[("S3EXPLORER_AWS_MAX_ATTEMPTS", "many")])).is_err());
}

/// Test error handling for a missing explicit config file
#[test]
fn test_missing_config_file() {
    let result = load_config(Some("/nonexistent/path/config.yml"));
    assert!(result.is_err());
}

/// Test error handling for invalid YAML
#[test]
fn test_invalid_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("invalid.yml");
    fs::write(&config_path, "invalid: yaml: content: [[[").unwrap();

    let result = load_from_yaml(&config_path);
    assert!(result.is_err());
}
