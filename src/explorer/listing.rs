use super::Explorer;
use crate::error::Result;
use crate::models::{EntryKind, ListingPage, ObjectEntry};
use crate::s3::ListObjectsResponse;

pub const DEFAULT_DELIMITER: &str = "/";

/// Provider ceiling for keys per ListObjectsV2 page
pub const MAX_PAGE_SIZE: i32 = 1000;

/// Query parameters of a folder listing
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub prefix: String,
    /// Empty means `/`
    pub delimiter: String,
    /// Opaque provider cursor from the previous page
    pub continuation_token: Option<String>,
    pub max_keys: Option<i32>,
}

/// Omitted, zero, negative and oversized page sizes all become 1000
pub fn clamp_max_keys(requested: Option<i32>) -> i32 {
    match requested {
        Some(n) if n > 0 && n <= MAX_PAGE_SIZE => n,
        _ => MAX_PAGE_SIZE,
    }
}

/// MIME type from the last extension of the key's final path segment
pub fn detect_content_type(key: &str) -> &'static str {
    let name = key.rsplit('/').next().unwrap_or(key);
    let ext = match name.rfind('.') {
        Some(pos) => name[pos + 1..].to_ascii_lowercase(),
        None => return "application/octet-stream",
    };

    match ext.as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

impl Explorer {
    /// List one page of a bucket as folders and files
    pub async fn list_objects(&self, bucket: &str, params: ListParams) -> Result<ListingPage> {
        let delimiter = if params.delimiter.is_empty() {
            DEFAULT_DELIMITER
        } else {
            params.delimiter.as_str()
        };
        let max_keys = clamp_max_keys(params.max_keys);
        let token = params.continuation_token.as_deref().filter(|t| !t.is_empty());

        tracing::debug!(
            bucket = %bucket,
            prefix = %params.prefix,
            delimiter = %delimiter,
            max_keys,
            has_token = token.is_some(),
            "listing objects"
        );

        let raw = self
            .store
            .list_objects_page(bucket, &params.prefix, Some(delimiter), token, max_keys)
            .await?;

        Ok(build_listing_page(&params.prefix, raw, max_keys))
    }
}

/// Folders from common prefixes first, then files; the prefix's own marker is skipped
pub(crate) fn build_listing_page(
    prefix: &str,
    raw: ListObjectsResponse,
    page_size: i32,
) -> ListingPage {
    let mut items = Vec::with_capacity(raw.common_prefixes.len() + raw.contents.len());

    items.extend(raw.common_prefixes.into_iter().map(ObjectEntry::folder));

    for obj in raw.contents {
        if obj.key == prefix {
            continue;
        }

        // Marker objects for nested folders carry no content type
        let content_type = if obj.key.ends_with('/') {
            None
        } else {
            Some(detect_content_type(&obj.key).to_string())
        };

        items.push(ObjectEntry {
            key: obj.key,
            size: obj.size,
            is_folder: false,
            kind: EntryKind::File,
            content_type,
            last_modified: obj.last_modified,
            storage_class: obj.storage_class,
            etag: obj.etag,
        });
    }

    let count = items.len();
    ListingPage {
        items,
        is_truncated: raw.is_truncated,
        next_continuation_token: raw.next_continuation_token,
        items_in_page: count,
        total_items: count,
        page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::S3Object;

    #[test]
    fn test_clamp_max_keys() {
        assert_eq!(clamp_max_keys(None), 1000);
        assert_eq!(clamp_max_keys(Some(0)), 1000);
        assert_eq!(clamp_max_keys(Some(-5)), 1000);
        assert_eq!(clamp_max_keys(Some(5000)), 1000);
        assert_eq!(clamp_max_keys(Some(50)), 50);
        assert_eq!(clamp_max_keys(Some(1000)), 1000);
    }

    #[test]
    fn test_detect_content_type() {
        assert_eq!(detect_content_type("a.txt"), "text/plain");
        assert_eq!(detect_content_type("docs/INDEX.HTM"), "text/html");
        assert_eq!(detect_content_type("photos/cat.JPEG"), "image/jpeg");
        assert_eq!(detect_content_type("a.tar.gz"), "application/octet-stream");
        assert_eq!(detect_content_type("noext"), "application/octet-stream");
        // Dots in folder names do not count
        assert_eq!(detect_content_type("v1.2/readme"), "application/octet-stream");
    }

    #[test]
    fn test_build_listing_page() {
        let mut marker = S3Object::new("docs/", 0);
        marker.etag = Some("\"d41d8cd98f00b204e9800998ecf8427e\"".to_string());
        let mut nested_marker = S3Object::new("docs/empty/", 0);
        nested_marker.storage_class = Some("STANDARD".to_string());

        let raw = ListObjectsResponse {
            contents: vec![
                marker,
                S3Object::new("docs/a.pdf", 120),
                nested_marker,
            ],
            common_prefixes: vec!["docs/img/".to_string()],
            is_truncated: true,
            next_continuation_token: Some("opaque==".to_string()),
            ..Default::default()
        };

        let page = build_listing_page("docs/", raw, 2);
        let keys: Vec<&str> = page.items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["docs/img/", "docs/a.pdf", "docs/empty/"]);

        assert!(page.items[0].is_folder);
        assert_eq!(page.items[0].kind, EntryKind::Folder);
        assert_eq!(page.items[1].content_type.as_deref(), Some("application/pdf"));
        assert_eq!(page.items[1].size, 120);
        assert!(!page.items[2].is_folder);
        assert_eq!(page.items[2].content_type, None);

        assert!(page.is_truncated);
        assert_eq!(page.next_continuation_token.as_deref(), Some("opaque=="));
        assert_eq!(page.items_in_page, 3);
        assert_eq!(page.total_items, 3);
        assert_eq!(page.page_size, 2);
    }

    #[test]
    fn test_build_empty_page() {
        let page = build_listing_page("", ListObjectsResponse::new(), 1000);
        assert!(page.items.is_empty());
        assert!(!page.is_truncated);
        assert_eq!(page.items_in_page, 0);
    }
}
