//! Explorer service: folder-style views and mutations over an `ObjectStore`
//!
//! Handlers call into `Explorer`; it owns no state besides the shared store
//! handle, so cloning is cheap and every request sees live provider data.

mod listing;
mod mutation;
mod presign;

pub use listing::{clamp_max_keys, detect_content_type, ListParams, DEFAULT_DELIMITER, MAX_PAGE_SIZE};
pub use presign::{
    DEFAULT_GET_EXPIRY_SECS, DEFAULT_POST_EXPIRY_SECS, DEFAULT_POST_MAX_BYTES,
};

use crate::error::Result;
use crate::models::Bucket;
use crate::s3::ObjectStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct Explorer {
    store: Arc<dyn ObjectStore>,
}

impl Explorer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        tracing::debug!("listing buckets");
        Ok(self.store.list_buckets().await?)
    }
}
