//! S3 client module with AWS SigV4 signing
//!
//! This module provides:
//! - AWS Signature Version 4 signing (headers, query presign, POST policy)
//! - Async S3 operations used by the explorer
//! - The `ObjectStore` seam the explorer is written against

pub mod client;
pub mod signer;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use client::{Result, S3Client, S3Error, MAX_DELETE_BATCH};
pub use signer::{Credentials, S3SignerV4, MAX_PRESIGN_EXPIRY_SECS};
pub use store::ObjectStore;
pub use types::{
    DeleteError, DeleteObjectsResponse, DeletedObject, ErrorDocument, ListObjectsResponse,
    S3Object,
};
