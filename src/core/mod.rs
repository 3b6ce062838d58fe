use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use crate::config::Config;
use crate::explorer::Explorer;
use crate::s3::{ObjectStore, S3Client};

/// Immutable state shared by every request
///
/// The S3 client is created once; its HTTP connection pool is shared by all
/// handlers through the `Explorer`.
#[derive(Clone)]
pub struct Core {
    pub config: Arc<Config>,
    pub explorer: Explorer,
}

impl Core {
    /// Build the S3 client from config and wire it into the explorer
    pub fn new(config: Config) -> Result<Self> {
        // A storage call must not outlive the request that issued it
        let attempt_timeout = Duration::from_secs(config.server.request_timeout);
        let client = S3Client::from_config(&config.aws)
            .context("Failed to create S3 client")?
            .with_timeout(attempt_timeout);

        tracing::info!(
            region = %client.region(),
            endpoint = config.aws.endpoint_url.as_deref().unwrap_or("aws"),
            path_style = config.aws.path_style(),
            max_attempts = config.aws.max_attempts,
            "storage client ready"
        );

        Ok(Self::with_store(config, Arc::new(client)))
    }

    /// Use an arbitrary store (tests, alternative providers)
    pub fn with_store(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config: Arc::new(config),
            explorer: Explorer::new(store),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.server.request_timeout)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.config.server.shutdown_timeout)
    }
}
