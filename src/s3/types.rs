//! S3 types and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parse an ISO-8601 timestamp as returned in S3 XML bodies
pub(crate) fn parse_xml_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Parse an HTTP-date header value (`Last-Modified`)
pub(crate) fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// S3 Object metadata from a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Object {
    /// Object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    /// Storage class (STANDARD, STANDARD_IA, GLACIER, etc.)
    pub storage_class: Option<String>,
}

impl S3Object {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
            etag: None,
            storage_class: None,
        }
    }
}

/// Response from ListObjectsV2 operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListObjectsResponse {
    pub contents: Vec<S3Object>,
    /// Common prefixes (subdirectories when using delimiter)
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    /// Continuation token for next request
    pub next_continuation_token: Option<String>,
    /// Prefix used in the request
    pub prefix: Option<String>,
    pub max_keys: Option<i32>,
    /// Key count in this response
    pub key_count: Option<i32>,
}

impl ListObjectsResponse {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Response from DeleteObjects batch operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteObjectsResponse {
    /// Successfully deleted objects
    pub deleted: Vec<DeletedObject>,
    /// Per-key failures
    pub errors: Vec<DeleteError>,
}

impl DeleteObjectsResponse {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Deleted object information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedObject {
    pub key: String,
    pub version_id: Option<String>,
}

impl DeletedObject {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: None,
        }
    }
}

/// Delete error information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteError {
    pub key: String,
    pub code: String,
    pub message: String,
}

/// Parsed `<Error>` document returned by S3 on failure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDocument {
    pub code: String,
    pub message: String,
}
