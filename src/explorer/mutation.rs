use super::Explorer;
use crate::error::{ExplorerError, Result};
use crate::s3::MAX_DELETE_BATCH;

const FOLDER_DELIMITER: char = '/';

impl Explorer {
    /// Create a zero-byte folder marker; returns the normalized key
    ///
    /// Putting an existing marker again overwrites it, so repeated calls succeed.
    pub async fn create_folder(&self, bucket: &str, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(ExplorerError::validation("Key is required"));
        }

        let mut key = key.to_string();
        if !key.ends_with(FOLDER_DELIMITER) {
            key.push(FOLDER_DELIMITER);
        }

        tracing::debug!(bucket = %bucket, key = %key, "creating folder");
        self.store.put_empty_object(bucket, &key).await?;
        Ok(key)
    }

    /// Delete one object; deleting an absent key succeeds
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(ExplorerError::validation("Key is required"));
        }

        tracing::debug!(bucket = %bucket, key = %key, "deleting object");
        self.store.delete_object(bucket, key).await?;
        Ok(())
    }

    /// Delete every key under `prefix`, in batches of at most 1000
    ///
    /// All pages are listed before the first batch is sent. Batches run in
    /// order and the first failing batch aborts the rest; earlier batches stay
    /// deleted. Returns the number of keys deleted.
    pub async fn delete_by_prefix(&self, bucket: &str, prefix: &str) -> Result<usize> {
        if prefix.is_empty() {
            return Err(ExplorerError::validation(
                "Prefix is required for recursive delete",
            ));
        }

        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .store
                .list_objects_page(bucket, prefix, None, token.as_deref(), MAX_DELETE_BATCH as i32)
                .await?;

            keys.extend(page.contents.into_iter().map(|o| o.key));

            match page.next_continuation_token {
                Some(next) if page.is_truncated => token = Some(next),
                _ => break,
            }
        }

        if keys.is_empty() {
            tracing::debug!(bucket = %bucket, prefix = %prefix, "nothing to delete under prefix");
            return Ok(0);
        }

        let batches = keys.len().div_ceil(MAX_DELETE_BATCH);
        tracing::info!(
            bucket = %bucket,
            prefix = %prefix,
            keys = keys.len(),
            batches,
            "deleting objects by prefix"
        );

        let mut deleted = 0;
        for (i, chunk) in keys.chunks(MAX_DELETE_BATCH).enumerate() {
            let response = self.store.delete_objects(bucket, chunk).await?;
            if let Err(e) = response.into_result() {
                tracing::warn!(
                    bucket = %bucket,
                    prefix = %prefix,
                    batch = i + 1,
                    deleted,
                    error = %e,
                    "batch delete aborted"
                );
                return Err(e.into());
            }
            deleted += chunk.len();
        }

        Ok(deleted)
    }
}
