use super::client::{Result, S3Client};
use super::types::{DeleteObjectsResponse, ListObjectsResponse};
use crate::models::{Bucket, ObjectMetadata, PresignedUpload};
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Storage operations the explorer needs from an S3-compatible provider
///
/// `S3Client` is the production implementation; tests plug in an
/// in-memory store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<Bucket>>;

    /// One ListObjectsV2 page. `delimiter: None` lists recursively.
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<&str>,
        max_keys: i32,
    ) -> Result<ListObjectsResponse>;

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata>;

    /// Write a zero-byte object (folder marker)
    async fn put_empty_object(&self, bucket: &str, key: &str) -> Result<()>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Batch delete, at most `MAX_DELETE_BATCH` keys
    async fn delete_objects(&self, bucket: &str, keys: &[String])
        -> Result<DeleteObjectsResponse>;

    fn presign_get(&self, bucket: &str, key: &str, expires: Duration) -> Result<String>;

    fn presign_post(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires: Duration,
        max_bytes: u64,
    ) -> Result<PresignedUpload>;
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        S3Client::list_buckets(self).await
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<&str>,
        max_keys: i32,
    ) -> Result<ListObjectsResponse> {
        self.list_objects_v2(bucket, prefix, delimiter, continuation_token, max_keys)
            .await
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        S3Client::head_object(self, bucket, key).await
    }

    async fn put_empty_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.put_object(bucket, key, Bytes::new(), "application/x-directory")
            .await?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        S3Client::delete_object(self, bucket, key).await
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<DeleteObjectsResponse> {
        S3Client::delete_objects(self, bucket, keys).await
    }

    fn presign_get(&self, bucket: &str, key: &str, expires: Duration) -> Result<String> {
        Ok(S3Client::presign_get(self, bucket, key, expires))
    }

    fn presign_post(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires: Duration,
        max_bytes: u64,
    ) -> Result<PresignedUpload> {
        S3Client::presign_post(self, bucket, key, content_type, expires, max_bytes)
    }
}
