//! S3 client implementation with the operations the explorer uses
//!
//! - HTTP/1.1 via hyper with a pooled connector (TCP_NODELAY, keepalive)
//! - native-tls for HTTPS endpoints
//! - Virtual-hosted addressing against AWS, path-style for custom endpoints
//! - Bounded retry with jitter for throttling, 5xx and transport errors
//! - Byte-slice XML parsing of list, delete and error documents

use crate::config::AwsConfig;
use crate::models::{Bucket, ObjectMetadata, PresignedUpload};
use crate::s3::signer::{Credentials, S3SignerV4};
use crate::s3::types::{
    parse_http_date, parse_xml_timestamp, DeleteError, DeleteObjectsResponse, DeletedObject,
    ErrorDocument, ListObjectsResponse, S3Object,
};
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::header::HeaderMap;
use hyper::{Method, Request, StatusCode};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use native_tls::TlsConnector;
use quick_xml::events::Event;
use quick_xml::Reader;
use rand::Rng;
use serde_json::json;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as FmtWrite;
use std::time::Duration;
use thiserror::Error;

/// Hex lookup table for URI encoding
static HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Hard provider limit for keys in one DeleteObjects request
pub const MAX_DELETE_BATCH: usize = 1000;

/// S3 client errors
#[derive(Error, Debug)]
pub enum S3Error {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::http::Error),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("S3 error: {status} {code} - {message}")]
    Service {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Per-key failures inside an otherwise successful DeleteObjects call
    #[error("{failed} keys failed to delete, first {key}: {code} - {message}")]
    BatchDelete {
        failed: usize,
        key: String,
        code: String,
        message: String,
    },

    #[error("TLS setup failed: {0}")]
    Tls(String),
}

impl S3Error {
    /// Provider error code (`NoSuchBucket`, `AccessDenied`, ...) if any
    pub fn code(&self) -> Option<&str> {
        match self {
            S3Error::Service { code, .. } | S3Error::BatchDelete { code, .. }
                if !code.is_empty() =>
            {
                Some(code)
            }
            _ => None,
        }
    }

    /// HTTP status returned by the provider, if the request got that far
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            S3Error::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build a service error from a non-2xx response
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let doc = parse_error_document(body).unwrap_or_default();
        let code = if doc.code.is_empty() {
            // HEAD responses carry no body
            match status {
                StatusCode::NOT_FOUND => "NotFound".to_string(),
                StatusCode::FORBIDDEN => "AccessDenied".to_string(),
                _ => String::new(),
            }
        } else {
            doc.code
        };
        let message = if doc.message.is_empty() {
            status.canonical_reason().unwrap_or("").to_string()
        } else {
            doc.message
        };
        S3Error::Service {
            status,
            code,
            message,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            S3Error::Transport(_) | S3Error::Timeout(_) => true,
            S3Error::Service { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

impl From<quick_xml::Error> for S3Error {
    fn from(err: quick_xml::Error) -> Self {
        S3Error::XmlParse(err.to_string())
    }
}

impl From<hyper_util::client::legacy::Error> for S3Error {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        S3Error::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, S3Error>;

impl DeleteObjectsResponse {
    /// Turn per-key errors into a single failure
    pub fn into_result(self) -> Result<usize> {
        match self.errors.first() {
            None => Ok(self.deleted.len()),
            Some(first) => Err(S3Error::BatchDelete {
                failed: self.errors.len(),
                key: first.key.clone(),
                code: first.code.clone(),
                message: first.message.clone(),
            }),
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::INTERNAL_SERVER_ERROR
        || status == StatusCode::BAD_GATEWAY
        || status == StatusCode::SERVICE_UNAVAILABLE
        || status == StatusCode::GATEWAY_TIMEOUT
}

/// 100 ms doubled per failed attempt, capped at 2^16 steps
fn backoff_base_ms(attempt: u32) -> u64 {
    100u64.saturating_mul(1u64 << attempt.saturating_sub(1).min(16))
}

/// S3 client bound to one account/region, usable for any bucket
///
/// Clone is cheap - the underlying HTTP client uses Arc internally.
#[derive(Clone)]
pub struct S3Client {
    client: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    signer: S3SignerV4,
    /// Custom endpoint; `None` means AWS regional endpoints
    endpoint: Option<String>,
    path_style: bool,
    /// Total attempts per request (first try included)
    max_attempts: u32,
    timeout: Duration,
}

impl S3Client {
    /// Create a client for AWS regional endpoints
    pub fn new(credentials: Credentials, region: String, insecure_tls: bool) -> Result<Self> {
        let mut http = HttpConnector::new();
        http.set_nodelay(true);
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(10)));
        http.set_keepalive(Some(Duration::from_secs(90)));

        let tls = if insecure_tls {
            tracing::warn!("insecure TLS enabled: storage certificate verification is disabled");
            TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
        } else {
            TlsConnector::new()
        }
        .map_err(|e| S3Error::Tls(e.to_string()))?;

        let https = HttpsConnector::from((http, tls.into()));

        let client = HyperClient::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(64)
            .retry_canceled_requests(true)
            .set_host(true)
            .build(https);

        Ok(Self {
            client,
            signer: S3SignerV4::new(credentials, Some(region)),
            endpoint: None,
            path_style: false,
            max_attempts: 3,
            timeout: Duration::from_secs(25),
        })
    }

    /// Build a client from the `aws` config section
    pub fn from_config(aws: &AwsConfig) -> anyhow::Result<Self> {
        let credentials = aws.credentials()?;
        let client = Self::new(credentials, aws.region.clone(), aws.insecure_tls)?
            .with_endpoint(aws.endpoint_url.clone(), aws.path_style())
            .with_max_attempts(aws.max_attempts);
        Ok(client)
    }

    /// Point at a custom endpoint (LocalStack, MinIO, ...)
    pub fn with_endpoint(mut self, endpoint: Option<String>, path_style: bool) -> Self {
        self.endpoint = endpoint.map(|e| e.trim_end_matches('/').to_string());
        self.path_style = path_style;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn region(&self) -> &str {
        self.signer.region()
    }

    /// Send a signed request, retrying throttling, 5xx and transport errors
    /// up to `max_attempts` in total with exponential backoff and jitter.
    ///
    /// Non-2xx final responses are turned into `S3Error::Service`.
    async fn request_with_retry(
        &self,
        method: Method,
        url: &str,
        headers: BTreeMap<String, String>,
        body: Bytes,
    ) -> Result<(StatusCode, HeaderMap, Bytes)> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.request_once(method.clone(), url, headers.clone(), body.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let base_ms = backoff_base_ms(attempt);
                    let jitter = (base_ms as f64 * 0.2 * rand::thread_rng().gen::<f64>()) as u64;
                    tracing::debug!(
                        %method,
                        attempt,
                        delay_ms = base_ms + jitter,
                        error = %e,
                        "s3_retry_backoff"
                    );
                    tokio::time::sleep(Duration::from_millis(base_ms + jitter)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(
        &self,
        method: Method,
        url: &str,
        headers: BTreeMap<String, String>,
        body: Bytes,
    ) -> Result<(StatusCode, HeaderMap, Bytes)> {
        // Re-signed per attempt (timestamp changes)
        let signed_headers = self.signer.sign(method.as_str(), url, headers, &body);

        let mut req = Request::builder().method(method).uri(url);
        for (key, value) in signed_headers.iter() {
            req = req.header(key, value);
        }
        let request = req.body(Full::new(body))?;

        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| S3Error::Timeout(self.timeout))??;

        let status = response.status();
        let resp_headers = response.headers().clone();
        // Always drain body to return connection to pool
        let body_bytes = response
            .collect()
            .await
            .map_err(|e| S3Error::Transport(format!("Body error: {}", e)))?
            .to_bytes();

        if !status.is_success() {
            return Err(S3Error::from_response(status, &body_bytes));
        }

        Ok((status, resp_headers, body_bytes))
    }

    /// Encode an S3 key, preserving forward slashes
    fn encode_s3_key(key: &str) -> Cow<str> {
        let needs_encoding = key.bytes().any(|b| {
            !matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/')
        });

        if !needs_encoding {
            return Cow::Borrowed(key);
        }

        let mut result = String::with_capacity(key.len() + 32);
        for byte in key.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                    result.push(byte as char);
                }
                _ => {
                    result.push('%');
                    result.push(HEX_UPPER[(byte >> 4) as usize] as char);
                    result.push(HEX_UPPER[(byte & 0xf) as usize] as char);
                }
            }
        }
        Cow::Owned(result)
    }

    /// Encode a query parameter value (RFC 3986) into an existing buffer
    fn url_encode_into(buf: &mut String, s: &str) {
        for byte in s.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    buf.push(byte as char);
                }
                _ => {
                    buf.push('%');
                    buf.push(HEX_UPPER[(byte >> 4) as usize] as char);
                    buf.push(HEX_UPPER[(byte & 0xf) as usize] as char);
                }
            }
        }
    }

    /// Account-level URL (ListBuckets)
    fn service_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/", endpoint),
            None => format!("https://s3.{}.amazonaws.com/", self.region()),
        }
    }

    /// Bucket URL: `https://{bucket}.s3.{region}.amazonaws.com/` for
    /// virtual-hosted style, `{endpoint}/{bucket}` for path style
    ///
    /// Bucket names containing dots fall back to path style, since they do
    /// not match the wildcard certificate.
    pub fn bucket_url(&self, bucket: &str) -> String {
        let path_style = self.path_style || bucket.contains('.');
        match (&self.endpoint, path_style) {
            (Some(endpoint), true) => format!("{}/{}", endpoint, bucket),
            (None, true) => format!("https://s3.{}.amazonaws.com/{}", self.region(), bucket),
            (Some(endpoint), false) => {
                // Virtual-hosted against a custom endpoint: prepend the bucket to the host
                match endpoint.split_once("://") {
                    Some((scheme, host)) => format!("{}://{}.{}/", scheme, bucket, host),
                    None => format!("{}.{}/", bucket, endpoint),
                }
            }
            (None, false) => format!("https://{}.s3.{}.amazonaws.com/", bucket, self.region()),
        }
    }

    /// Full object URL with the key URI-encoded
    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        let base = self.bucket_url(bucket);
        let encoded_key = Self::encode_s3_key(key);
        let mut url = String::with_capacity(base.len() + 1 + encoded_key.len());
        url.push_str(&base);
        if !base.ends_with('/') {
            url.push('/');
        }
        url.push_str(&encoded_key);
        url
    }

    /// Build the full URL for a ListObjectsV2 request.
    ///
    /// Parameters are ordered alphabetically so the signer's canonical query
    /// fast path can skip re-sorting.
    pub fn build_list_url(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<&str>,
        max_keys: i32,
    ) -> String {
        let base_url = self.bucket_url(bucket);

        let mut url = String::with_capacity(base_url.len() + 256);
        url.push_str(&base_url);
        url.push('?');

        if let Some(token) = continuation_token {
            url.push_str("continuation-token=");
            Self::url_encode_into(&mut url, token);
            url.push('&');
        }
        if let Some(d) = delimiter {
            url.push_str("delimiter=");
            Self::url_encode_into(&mut url, d);
            url.push('&');
        }
        url.push_str("list-type=2&max-keys=");
        let _ = write!(url, "{}", max_keys);
        if !prefix.is_empty() {
            url.push_str("&prefix=");
            Self::url_encode_into(&mut url, prefix);
        }

        url
    }

    /// List all buckets owned by the credentials
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        let url = self.service_url();
        let (_, _, body) = self
            .request_with_retry(Method::GET, &url, BTreeMap::new(), Bytes::new())
            .await?;
        parse_list_buckets_response(&body)
    }

    /// List objects in bucket (S3 ListObjectsV2), one page
    pub async fn list_objects_v2(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<&str>,
        max_keys: i32,
    ) -> Result<ListObjectsResponse> {
        let url = self.build_list_url(bucket, prefix, delimiter, continuation_token, max_keys);
        let (_, _, body) = self
            .request_with_retry(Method::GET, &url, BTreeMap::new(), Bytes::new())
            .await?;
        parse_list_response(&body)
    }

    /// HEAD an object and collect its metadata headers
    pub async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        let url = self.object_url(bucket, key);
        let (_, headers, _) = self
            .request_with_retry(Method::HEAD, &url, BTreeMap::new(), Bytes::new())
            .await?;
        Ok(metadata_from_headers(key, &headers))
    }

    /// Put object to S3, returning the ETag when the provider sends one
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<Option<String>> {
        let url = self.object_url(bucket, key);

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        headers.insert("content-length".to_string(), data.len().to_string());

        let (_, resp_headers, _) = self
            .request_with_retry(Method::PUT, &url, headers, data)
            .await?;

        Ok(resp_headers
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    /// Delete object from S3 (absent keys are not an error on S3)
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let url = self.object_url(bucket, key);
        self.request_with_retry(Method::DELETE, &url, BTreeMap::new(), Bytes::new())
            .await?;
        Ok(())
    }

    /// Delete multiple objects in one request (at most 1000 keys)
    pub async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<DeleteObjectsResponse> {
        if keys.is_empty() {
            return Ok(DeleteObjectsResponse::new());
        }

        if keys.len() > MAX_DELETE_BATCH {
            return Err(S3Error::InvalidArgument(format!(
                "Cannot delete more than {} objects at once",
                MAX_DELETE_BATCH
            )));
        }

        let xml_bytes = build_delete_body(keys).into_bytes();

        let md5_hash = md5::compute(&xml_bytes);
        let md5_base64 =
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &md5_hash[..]);

        // "?delete=" so the canonical query string is "delete="
        let base_url = self.bucket_url(bucket);
        let url = format!("{}?delete=", base_url);

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/xml".to_string());
        headers.insert("content-length".to_string(), xml_bytes.len().to_string());
        headers.insert("content-md5".to_string(), md5_base64);

        let (_, _, body) = self
            .request_with_retry(Method::POST, &url, headers, Bytes::from(xml_bytes))
            .await?;

        parse_delete_response(&body)
    }

    /// Presigned GET URL for one object; does not check that it exists
    pub fn presign_get(&self, bucket: &str, key: &str, expires: Duration) -> String {
        let url = self.object_url(bucket, key);
        self.signer.presign_url("GET", &url, expires.as_secs())
    }

    /// Presigned POST form for a browser upload
    ///
    /// The policy pins bucket, key and content type, and limits the body to
    /// `[0, max_bytes]`. The provider enforces both at upload time.
    pub fn presign_post(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires: Duration,
        max_bytes: u64,
    ) -> Result<PresignedUpload> {
        let expiration = chrono::Duration::from_std(expires)
            .ok()
            .and_then(|expires| Utc::now().checked_add_signed(expires))
            .ok_or_else(|| {
                S3Error::InvalidArgument(format!("Expiry out of range: {:?}", expires))
            })?;

        let conditions = vec![
            json!({ "bucket": bucket }),
            json!({ "key": key }),
            json!({ "Content-Type": content_type }),
            json!(["content-length-range", 0, max_bytes]),
        ];

        let mut fields = self.signer.sign_post_policy(conditions, expiration);
        fields.insert("key".to_string(), key.to_string());
        fields.insert("Content-Type".to_string(), content_type.to_string());

        Ok(PresignedUpload {
            url: self.bucket_url(bucket),
            fields,
        })
    }
}

/// Build the `<Delete>` request document
fn build_delete_body(keys: &[String]) -> String {
    let mut xml = String::with_capacity(keys.len() * 60 + 80);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Delete>");
    for key in keys {
        xml.push_str("<Object><Key>");
        xml_escape_into(&mut xml, key);
        xml.push_str("</Key></Object>");
    }
    xml.push_str("</Delete>");
    xml
}

/// Escape XML special characters into an existing buffer
fn xml_escape_into(buf: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            '\'' => buf.push_str("&apos;"),
            _ => buf.push(ch),
        }
    }
}

fn metadata_from_headers(key: &str, headers: &HeaderMap) -> ObjectMetadata {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let user_metadata: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            let meta_key = name.as_str().strip_prefix("x-amz-meta-")?;
            let value = value.to_str().ok()?;
            Some((meta_key.to_string(), value.to_string()))
        })
        .collect();

    ObjectMetadata {
        key: key.to_string(),
        content_type: header("content-type"),
        content_length: header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        etag: header("etag"),
        last_modified: header("last-modified").and_then(|v| parse_http_date(&v)),
        // S3 omits the header for STANDARD
        storage_class: Some(header("x-amz-storage-class").unwrap_or_else(|| "STANDARD".to_string())),
        user_metadata,
        server_side_encryption: header("x-amz-server-side-encryption"),
        version_id: header("x-amz-version-id"),
    }
}

fn xml_reader(xml_data: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml_data);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;
    reader
}

/// Parse ListObjectsV2 XML response
///
/// Byte-slice tag matching and `std::mem::take` keep per-object allocations
/// down to the values themselves.
pub(crate) fn parse_list_response(xml_data: &[u8]) -> Result<ListObjectsResponse> {
    let mut reader = xml_reader(xml_data);

    let mut response = ListObjectsResponse::new();
    let mut current_object: Option<S3Object> = None;
    let mut current_text = String::with_capacity(256);
    let mut in_common_prefixes = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Contents" => {
                    current_object = Some(S3Object::new(String::new(), 0));
                }
                b"CommonPrefixes" => {
                    in_common_prefixes = true;
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape()?);
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Key" => {
                        if let Some(ref mut obj) = current_object {
                            obj.key = std::mem::take(&mut current_text);
                        }
                    }
                    b"Size" => {
                        if let Some(ref mut obj) = current_object {
                            obj.size = current_text.parse().unwrap_or(0);
                        }
                    }
                    b"LastModified" => {
                        if let Some(ref mut obj) = current_object {
                            obj.last_modified = parse_xml_timestamp(&current_text);
                        }
                    }
                    b"ETag" => {
                        if let Some(ref mut obj) = current_object {
                            obj.etag = Some(std::mem::take(&mut current_text));
                        }
                    }
                    b"StorageClass" => {
                        if let Some(ref mut obj) = current_object {
                            obj.storage_class = Some(std::mem::take(&mut current_text));
                        }
                    }
                    b"Contents" => {
                        if let Some(obj) = current_object.take() {
                            response.contents.push(obj);
                        }
                    }
                    b"CommonPrefixes" => {
                        in_common_prefixes = false;
                    }
                    b"Prefix" => {
                        if in_common_prefixes {
                            response
                                .common_prefixes
                                .push(std::mem::take(&mut current_text));
                        } else {
                            response.prefix = Some(std::mem::take(&mut current_text));
                        }
                    }
                    b"IsTruncated" => {
                        response.is_truncated = current_text == "true";
                    }
                    b"NextContinuationToken" => {
                        response.next_continuation_token = Some(std::mem::take(&mut current_text));
                    }
                    b"MaxKeys" => {
                        response.max_keys = current_text.parse().ok();
                    }
                    b"KeyCount" => {
                        response.key_count = current_text.parse().ok();
                    }
                    _ => {}
                }

                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }

    Ok(response)
}

/// Parse ListAllMyBucketsResult
pub(crate) fn parse_list_buckets_response(xml_data: &[u8]) -> Result<Vec<Bucket>> {
    let mut reader = xml_reader(xml_data);

    let mut buckets = Vec::new();
    let mut current: Option<Bucket> = None;
    let mut current_text = String::with_capacity(64);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"Bucket" {
                    current = Some(Bucket {
                        name: String::new(),
                        creation_date: None,
                    });
                }
            }
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape()?);
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Name" => {
                        if let Some(ref mut bucket) = current {
                            bucket.name = std::mem::take(&mut current_text);
                        }
                    }
                    b"CreationDate" => {
                        if let Some(ref mut bucket) = current {
                            bucket.creation_date = parse_xml_timestamp(&current_text);
                        }
                    }
                    b"Bucket" => {
                        if let Some(bucket) = current.take() {
                            buckets.push(bucket);
                        }
                    }
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }

    Ok(buckets)
}

/// Parse DeleteObjects XML response
pub(crate) fn parse_delete_response(xml_data: &[u8]) -> Result<DeleteObjectsResponse> {
    let mut reader = xml_reader(xml_data);

    let mut response = DeleteObjectsResponse::new();
    let mut current_deleted: Option<DeletedObject> = None;
    let mut current_error: Option<DeleteError> = None;
    let mut current_text = String::with_capacity(256);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Deleted" => {
                    current_deleted = Some(DeletedObject::new(String::new()));
                }
                b"Error" => {
                    current_error = Some(DeleteError::default());
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape()?);
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Key" => {
                        if let Some(ref mut deleted) = current_deleted {
                            deleted.key = std::mem::take(&mut current_text);
                        } else if let Some(ref mut error) = current_error {
                            error.key = std::mem::take(&mut current_text);
                        }
                    }
                    b"VersionId" => {
                        if let Some(ref mut deleted) = current_deleted {
                            deleted.version_id = Some(std::mem::take(&mut current_text));
                        }
                    }
                    b"Code" => {
                        if let Some(ref mut error) = current_error {
                            error.code = std::mem::take(&mut current_text);
                        }
                    }
                    b"Message" => {
                        if let Some(ref mut error) = current_error {
                            error.message = std::mem::take(&mut current_text);
                        }
                    }
                    b"Deleted" => {
                        if let Some(deleted) = current_deleted.take() {
                            response.deleted.push(deleted);
                        }
                    }
                    b"Error" => {
                        if let Some(error) = current_error.take() {
                            response.errors.push(error);
                        }
                    }
                    _ => {}
                }

                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }

    Ok(response)
}

/// Parse the `<Error><Code/><Message/></Error>` body of a failed request
pub(crate) fn parse_error_document(xml_data: &[u8]) -> Option<ErrorDocument> {
    if xml_data.is_empty() {
        return None;
    }

    let mut reader = xml_reader(xml_data);
    let mut doc = ErrorDocument::default();
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape().ok()?);
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Code" => doc.code = std::mem::take(&mut current_text),
                    b"Message" => doc.message = std::mem::take(&mut current_text),
                    _ => {}
                }
                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    Some(doc)
}
