//! JSON models exposed by the explorer API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// An S3 bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,
}

/// Whether a listed entry is a synthetic folder or a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    File,
}

/// A folder or file in a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub is_folder: bool,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl ObjectEntry {
    pub fn folder(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: 0,
            is_folder: true,
            kind: EntryKind::Folder,
            content_type: None,
            last_modified: None,
            storage_class: None,
            etag: None,
        }
    }
}

/// One page of a directory-style listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    /// Folders first, then files
    pub items: Vec<ObjectEntry>,
    pub is_truncated: bool,
    /// Opaque provider cursor, passed back unmodified as `nextToken`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_continuation_token: Option<String>,
    pub items_in_page: usize,
    /// Same value as `items_in_page`; not a total across pages
    pub total_items: usize,
    pub page_size: i32,
}

/// Metadata returned by a HEAD on one object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub content_length: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub user_metadata: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_encryption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

/// Form upload target: POST `fields` plus the file to `url`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedUpload {
    pub url: String,
    pub fields: BTreeMap<String, String>,
}

/// Body of `POST /api/buckets/:bucket/objects`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Body of `POST /api/buckets/:bucket/presigned-post-url`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedPostRequest {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub expires_in_seconds: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_size_bytes: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_folder_entry_json() {
        let value = serde_json::to_value(ObjectEntry::folder("photos/")).unwrap();
        assert_eq!(
            value,
            json!({"key": "photos/", "size": 0, "isFolder": true, "type": "folder"})
        );
    }

    #[test]
    fn test_presigned_post_request_minimal() {
        let req: PresignedPostRequest =
            serde_json::from_str(r#"{"key":"test.jpg","contentType":"image/jpeg"}"#).unwrap();
        assert_eq!(req.key, "test.jpg");
        assert_eq!(req.content_type, "image/jpeg");
        assert_eq!(req.expires_in_seconds, 0);
        assert_eq!(req.max_size_bytes, 0);

        // Zero values are omitted again on the way out
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"key": "test.jpg", "contentType": "image/jpeg"})
        );
    }

    #[test]
    fn test_create_folder_request_type_field() {
        let req: CreateFolderRequest =
            serde_json::from_str(r#"{"key":"new-folder/","type":"folder"}"#).unwrap();
        assert_eq!(req.key, "new-folder/");
        assert_eq!(req.kind, "folder");
    }

    #[test]
    fn test_listing_page_omits_missing_token() {
        let page = ListingPage {
            items: vec![],
            is_truncated: false,
            next_continuation_token: None,
            items_in_page: 0,
            total_items: 0,
            page_size: 1000,
        };
        let value = serde_json::to_value(&page).unwrap();
        assert!(value.get("nextContinuationToken").is_none());
        assert_eq!(value["pageSize"], 1000);
        assert_eq!(value["items"], json!([]));
    }
}
