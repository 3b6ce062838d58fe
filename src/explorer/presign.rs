use super::Explorer;
use crate::error::{ExplorerError, Result};
use crate::models::{ObjectMetadata, PresignedPostRequest, PresignedUpload};
use crate::s3::MAX_PRESIGN_EXPIRY_SECS;
use std::time::Duration;

pub const DEFAULT_GET_EXPIRY_SECS: u64 = 900;
pub const DEFAULT_POST_EXPIRY_SECS: u64 = 15 * 60;
pub const DEFAULT_POST_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Non-positive values fall back to the default
fn positive_or(value: i64, default: u64) -> u64 {
    if value > 0 {
        value as u64
    } else {
        default
    }
}

impl Explorer {
    /// Time-limited download URL; the object is not checked for existence
    pub async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in_seconds: i64,
    ) -> Result<String> {
        if key.is_empty() {
            return Err(ExplorerError::validation("Key is required"));
        }

        let expires = positive_or(expires_in_seconds, DEFAULT_GET_EXPIRY_SECS);
        tracing::debug!(bucket = %bucket, key = %key, expires, "presigning GET");
        Ok(self
            .store
            .presign_get(bucket, key, Duration::from_secs(expires))?)
    }

    /// Form fields for a direct browser upload of one object
    pub async fn presigned_post(
        &self,
        bucket: &str,
        request: &PresignedPostRequest,
    ) -> Result<PresignedUpload> {
        if request.key.is_empty() {
            return Err(ExplorerError::validation("Key is required"));
        }
        if request.content_type.is_empty() {
            return Err(ExplorerError::validation("Content type is required"));
        }

        let expires = positive_or(request.expires_in_seconds, DEFAULT_POST_EXPIRY_SECS)
            .min(MAX_PRESIGN_EXPIRY_SECS);
        let max_bytes = positive_or(request.max_size_bytes, DEFAULT_POST_MAX_BYTES);

        tracing::debug!(
            bucket = %bucket,
            key = %request.key,
            content_type = %request.content_type,
            expires,
            max_bytes,
            "presigning POST"
        );

        Ok(self.store.presign_post(
            bucket,
            &request.key,
            &request.content_type,
            Duration::from_secs(expires),
            max_bytes,
        )?)
    }

    pub async fn object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        if key.is_empty() {
            return Err(ExplorerError::validation("Key is required"));
        }
        Ok(self.store.head_object(bucket, key).await?)
    }
}
