use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::s3::Credentials;

/// Prefix for environment variable overrides (`S3EXPLORER_SERVER_ADDRESS`, ...)
pub const ENV_PREFIX: &str = "S3EXPLORER_";

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default: 0.0.0.0:8080)
    #[serde(default = "default_address")]
    pub address: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Grace period for draining in-flight requests on shutdown, in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_shutdown_timeout() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            request_timeout: default_request_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Storage region (default: us-east-1)
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint (LocalStack, MinIO, ...). Enables path-style addressing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// Use path-style addressing even against the default AWS endpoint
    #[serde(default)]
    pub force_path_style: bool,

    /// Static access key (falls back to AWS_ACCESS_KEY_ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// Static secret key (falls back to AWS_SECRET_ACCESS_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Session token for temporary credentials (falls back to AWS_SESSION_TOKEN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,

    /// Total attempts per storage request, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Disable TLS certificate verification towards the storage endpoint
    #[serde(default)]
    pub insecure_tls: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Upper bound for `aws.max_attempts`
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

fn default_max_attempts() -> u32 {
    3
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
            force_path_style: false,
            access_key: None,
            secret_key: None,
            session_token: None,
            max_attempts: default_max_attempts(),
            insecure_tls: false,
        }
    }
}

impl AwsConfig {
    /// Whether requests should address buckets as `{endpoint}/{bucket}`
    pub fn path_style(&self) -> bool {
        self.force_path_style || self.endpoint_url.is_some()
    }

    /// Resolve credentials from the config file, then the standard AWS
    /// variables. With a custom endpoint and nothing configured, the static
    /// `test`/`test` pair accepted by local emulators is used.
    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    pub(crate) fn credentials_with<F>(&self, lookup: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key = self
            .access_key
            .clone()
            .or_else(|| lookup("AWS_ACCESS_KEY_ID"))
            .filter(|v| !v.is_empty());
        let secret_key = self
            .secret_key
            .clone()
            .or_else(|| lookup("AWS_SECRET_ACCESS_KEY"))
            .filter(|v| !v.is_empty());
        let session_token = self
            .session_token
            .clone()
            .or_else(|| lookup("AWS_SESSION_TOKEN"))
            .filter(|v| !v.is_empty());

        match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => Ok(Credentials {
                access_key,
                secret_key,
                session_token,
            }),
            _ if self.endpoint_url.is_some() => Ok(Credentials {
                access_key: "test".to_string(),
                secret_key: "test".to_string(),
                session_token: None,
            }),
            _ => anyhow::bail!(
                "No storage credentials: set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY or aws.access_key/aws.secret_key"
            ),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json or console
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub aws: AwsConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Replace empty string values with defaults and reject unusable values
    pub fn normalize(mut self) -> Result<Self> {
        if self.server.address.trim().is_empty() {
            self.server.address = default_address();
        }
        if self.aws.region.trim().is_empty() {
            self.aws.region = default_region();
        }
        if self.log.level.trim().is_empty() {
            self.log.level = default_log_level();
        }
        if self.log.format.trim().is_empty() {
            self.log.format = default_log_format();
        }
        if self.aws.endpoint_url.as_deref().is_some_and(|e| e.trim().is_empty()) {
            self.aws.endpoint_url = None;
        }

        if !(1..=MAX_ATTEMPTS_LIMIT).contains(&self.aws.max_attempts) {
            anyhow::bail!(
                "aws.max_attempts must be between 1 and {}",
                MAX_ATTEMPTS_LIMIT
            );
        }
        if self.server.request_timeout == 0 {
            anyhow::bail!("server.request_timeout must be greater than 0");
        }
        match self.log.format.as_str() {
            "json" | "console" => {}
            other => anyhow::bail!("Unknown log format '{}' (expected json or console)", other),
        }

        Ok(self)
    }
}

/// Load configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config: Config =
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

    Ok(config)
}

/// Overlay `S3EXPLORER_*` environment variables onto a configuration
///
/// `S3EXPLORER_SERVER_ADDRESS` maps to `server.address`,
/// `S3EXPLORER_AWS_ENDPOINT_URL` to `aws.endpoint_url`, and so on.
pub fn apply_env(config: &mut Config) -> Result<()> {
    apply_env_with(config, |name| std::env::var(name).ok())
}

/// Same as [`apply_env`] with an explicit variable lookup
pub fn apply_env_with<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));

    if let Some(address) = var("SERVER_ADDRESS") {
        config.server.address = address;
    }
    if let Some(timeout) = var("SERVER_REQUEST_TIMEOUT") {
        config.server.request_timeout = timeout
            .parse()
            .context("S3EXPLORER_SERVER_REQUEST_TIMEOUT must be a number of seconds")?;
    }
    if let Some(timeout) = var("SERVER_SHUTDOWN_TIMEOUT") {
        config.server.shutdown_timeout = timeout
            .parse()
            .context("S3EXPLORER_SERVER_SHUTDOWN_TIMEOUT must be a number of seconds")?;
    }

    if let Some(region) = var("AWS_REGION") {
        config.aws.region = region;
    }
    if let Some(endpoint) = var("AWS_ENDPOINT_URL") {
        config.aws.endpoint_url = Some(endpoint);
    }
    if let Some(flag) = var("AWS_FORCE_PATH_STYLE") {
        config.aws.force_path_style = parse_bool(&flag);
    }
    if let Some(attempts) = var("AWS_MAX_ATTEMPTS") {
        config.aws.max_attempts = attempts
            .parse()
            .context("S3EXPLORER_AWS_MAX_ATTEMPTS must be a positive integer")?;
    }
    if let Some(flag) = var("AWS_INSECURE_TLS") {
        config.aws.insecure_tls = parse_bool(&flag);
    }

    if let Some(level) = var("LOG_LEVEL") {
        config.log.level = level;
    }
    if let Some(format) = var("LOG_FORMAT") {
        config.log.format = format;
    }

    Ok(())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Load configuration from file and environment
///
/// An explicit `config_path` must exist. Without one, `config.yml` in the
/// working directory is used when present. Environment variables are applied
/// on top, then defaults fill any empty values.
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let mut config = match config_path {
        Some(path) => load_from_yaml(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => load_from_yaml(DEFAULT_CONFIG_FILE)?,
        None => Config::default(),
    };

    apply_env(&mut config)?;
    config.normalize()
}
