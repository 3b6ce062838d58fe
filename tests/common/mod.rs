#![allow(dead_code)]

use async_trait::async_trait;
use hyper::StatusCode;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use s3explorer::models::{Bucket, ObjectMetadata, PresignedUpload};
use s3explorer::s3::{
    DeleteError, DeleteObjectsResponse, DeletedObject, ListObjectsResponse, ObjectStore,
    S3Error, S3Object,
};

/// Arguments of the last presign_post call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCall {
    pub key: String,
    pub content_type: String,
    pub expires: Duration,
    pub max_bytes: u64,
}

/// In-memory bucket store with S3-like listing semantics
#[derive(Default)]
pub struct MockStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, u64>>>,
    /// Sizes of every delete_objects call, in order
    delete_batches: Mutex<Vec<usize>>,
    /// Zero-based batch index that reports per-key errors
    failing_batch: Mutex<Option<usize>>,
    last_post: Mutex<Option<PostCall>>,
    unavailable: AtomicBool,
    list_delay: Mutex<Option<Duration>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, bucket: &str) -> Self {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default();
        self
    }

    pub fn with_object(self, bucket: &str, key: &str, size: u64) -> Self {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), size);
        self
    }

    pub fn with_objects<I, S>(self, bucket: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut buckets = self.buckets.lock().unwrap();
            let objects = buckets.entry(bucket.to_string()).or_default();
            for key in keys {
                objects.insert(key.into(), 1);
            }
        }
        self
    }

    pub fn fail_batch(&self, index: usize) {
        *self.failing_batch.lock().unwrap() = Some(index);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    pub fn delete_batches(&self) -> Vec<usize> {
        self.delete_batches.lock().unwrap().clone()
    }

    pub fn last_post(&self) -> Option<PostCall> {
        self.last_post.lock().unwrap().clone()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key))
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), S3Error> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(S3Error::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    fn no_such_bucket() -> S3Error {
        S3Error::Service {
            status: StatusCode::NOT_FOUND,
            code: "NoSuchBucket".to_string(),
            message: "The specified bucket does not exist".to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn list_buckets(&self) -> Result<Vec<Bucket>, S3Error> {
        self.check_available()?;
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .keys()
            .map(|name| Bucket {
                name: name.clone(),
                creation_date: None,
            })
            .collect())
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<&str>,
        max_keys: i32,
    ) -> Result<ListObjectsResponse, S3Error> {
        self.check_available()?;
        let buckets = self.buckets.lock().unwrap();
        let objects = buckets.get(bucket).ok_or_else(Self::no_such_bucket)?;

        let mut response = ListObjectsResponse::new();
        let mut last_key: Option<String> = None;

        for (key, size) in objects.iter() {
            if !key.starts_with(prefix) {
                continue;
            }
            if continuation_token.is_some_and(|token| key.as_str() <= token) {
                continue;
            }

            let folder = delimiter.and_then(|d| {
                let rest = &key[prefix.len()..];
                rest.find(d)
                    .map(|i| format!("{}{}", prefix, &rest[..i + d.len()]))
            });

            // Keys under an already emitted common prefix are folded into it
            if folder.is_some() && response.common_prefixes.last() == folder.as_ref() {
                last_key = Some(key.clone());
                continue;
            }

            if response.contents.len() + response.common_prefixes.len() == max_keys as usize {
                response.is_truncated = true;
                break;
            }

            match folder {
                Some(folder) => response.common_prefixes.push(folder),
                None => response.contents.push(S3Object::new(key.clone(), *size)),
            }
            last_key = Some(key.clone());
        }

        if response.is_truncated {
            response.next_continuation_token = last_key;
        }
        Ok(response)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, S3Error> {
        self.check_available()?;
        let buckets = self.buckets.lock().unwrap();
        match buckets.get(bucket).and_then(|objects| objects.get(key)) {
            Some(size) => Ok(ObjectMetadata {
                key: key.to_string(),
                content_length: *size,
                content_type: Some("application/octet-stream".to_string()),
                storage_class: Some("STANDARD".to_string()),
                user_metadata: HashMap::new(),
                ..Default::default()
            }),
            None => Err(S3Error::from_response(StatusCode::NOT_FOUND, b"")),
        }
    }

    async fn put_empty_object(&self, bucket: &str, key: &str) -> Result<(), S3Error> {
        self.check_available()?;
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets.get_mut(bucket).ok_or_else(Self::no_such_bucket)?;
        objects.insert(key.to_string(), 0);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), S3Error> {
        self.check_available()?;
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets.get_mut(bucket).ok_or_else(Self::no_such_bucket)?;
        objects.remove(key);
        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<DeleteObjectsResponse, S3Error> {
        self.check_available()?;
        assert!(keys.len() <= 1000, "batch of {} keys exceeds provider limit", keys.len());

        let batch_index = {
            let mut batches = self.delete_batches.lock().unwrap();
            batches.push(keys.len());
            batches.len() - 1
        };

        let mut response = DeleteObjectsResponse::new();
        if *self.failing_batch.lock().unwrap() == Some(batch_index) {
            response.errors.push(DeleteError {
                key: keys[0].clone(),
                code: "InternalError".to_string(),
                message: "We encountered an internal error".to_string(),
            });
            return Ok(response);
        }

        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets.get_mut(bucket).ok_or_else(Self::no_such_bucket)?;
        for key in keys {
            objects.remove(key);
            response.deleted.push(DeletedObject::new(key.clone()));
        }
        Ok(response)
    }

    fn presign_get(&self, bucket: &str, key: &str, expires: Duration) -> Result<String, S3Error> {
        Ok(format!(
            "https://{}.s3.mock/{}?X-Amz-Expires={}",
            bucket,
            key,
            expires.as_secs()
        ))
    }

    fn presign_post(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires: Duration,
        max_bytes: u64,
    ) -> Result<PresignedUpload, S3Error> {
        *self.last_post.lock().unwrap() = Some(PostCall {
            key: key.to_string(),
            content_type: content_type.to_string(),
            expires,
            max_bytes,
        });

        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), key.to_string());
        fields.insert("Content-Type".to_string(), content_type.to_string());
        fields.insert("policy".to_string(), "e30=".to_string());
        Ok(PresignedUpload {
            url: format!("https://{}.s3.mock/", bucket),
            fields,
        })
    }
}
