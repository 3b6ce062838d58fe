//! AWS Signature Version 4 signer for S3 requests
//!
//! Covers the three shapes the explorer needs:
//! - header signing for regular API calls
//! - query-string presigning for shareable GET URLs
//! - POST policy signing for browser form uploads
//!
//! The derived signing key only changes daily and is cached per signer.

use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Mutex;

type HmacSha256 = Hmac<Sha256>;

/// Hex lookup table for zero-allocation percent encoding
static HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Pre-computed SHA256 hash of empty payload
const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Longest validity SigV4 accepts for presigned requests (7 days)
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 604_800;

/// Access credentials used for signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    /// Present for temporary (STS) credentials
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token: None,
        }
    }
}

/// AWS Signature Version 4 signer
pub struct S3SignerV4 {
    credentials: Credentials,
    region: String,
    service: String,
    /// Pre-computed "AWS4" + secret_key
    aws4_key: Vec<u8>,
    /// Cached signing key per day: (date_stamp, derived_key)
    cached_signing_key: Mutex<Option<(String, [u8; 32])>>,
}

impl Clone for S3SignerV4 {
    fn clone(&self) -> Self {
        Self {
            credentials: self.credentials.clone(),
            region: self.region.clone(),
            service: self.service.clone(),
            aws4_key: self.aws4_key.clone(),
            // Each clone gets its own cache (populated on first use)
            cached_signing_key: Mutex::new(None),
        }
    }
}

impl S3SignerV4 {
    /// Create a new S3 signer
    pub fn new(credentials: Credentials, region: Option<String>) -> Self {
        let region = region.unwrap_or_else(|| "us-east-1".to_string());
        let aws4_key = format!("AWS4{}", credentials.secret_key).into_bytes();
        Self {
            credentials,
            region,
            service: "s3".to_string(),
            aws4_key,
            cached_signing_key: Mutex::new(None),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sign an S3 request with AWS Signature V4 (Authorization header)
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        headers: BTreeMap<String, String>,
        payload: &[u8],
    ) -> BTreeMap<String, String> {
        if payload.is_empty() {
            self.sign_with_hash(method, url, headers, EMPTY_SHA256, Utc::now())
        } else {
            let hash = hex::encode(Sha256::digest(payload));
            self.sign_with_hash(method, url, headers, &hash, Utc::now())
        }
    }

    fn sign_with_hash(
        &self,
        method: &str,
        url: &str,
        mut headers: BTreeMap<String, String>,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, String> {
        let (host, path, query) = Self::parse_url_fast(url);

        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();

        // Required headers, lowercase for canonical form
        headers.insert("host".to_string(), host.to_string());
        headers.insert("x-amz-date".to_string(), amz_date.clone());
        headers.insert("x-amz-content-sha256".to_string(), payload_hash.to_string());
        if let Some(token) = &self.credentials.session_token {
            headers.insert("x-amz-security-token".to_string(), token.clone());
        }

        let canonical_query = self.create_canonical_query_string(query);
        let canonical_headers = self.create_canonical_headers(&headers);
        let signed_headers = self.create_signed_headers(&headers);

        // Path is already URI-encoded by the client
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method, path, canonical_query, canonical_headers, signed_headers, payload_hash
        );

        tracing::trace!(%method, %url, canonical_request = %canonical_request, "sigv4_canonical_request");

        let credential_scope = self.credential_scope(&date_stamp);
        let string_to_sign = Self::string_to_sign(&amz_date, &credential_scope, &canonical_request);
        let signature = self.calculate_signature(&date_stamp, &string_to_sign);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.credentials.access_key, credential_scope, signed_headers, signature
        );
        headers.insert("authorization".to_string(), authorization);

        headers
    }

    /// Presign a request in the query string, valid for `expires_secs`
    ///
    /// Only `host` is signed and the payload is `UNSIGNED-PAYLOAD`, so the URL
    /// works from any HTTP client. Expiry is capped at seven days.
    pub fn presign_url(&self, method: &str, url: &str, expires_secs: u64) -> String {
        self.presign_url_at(method, url, expires_secs, Utc::now())
    }

    pub(crate) fn presign_url_at(
        &self,
        method: &str,
        url: &str,
        expires_secs: u64,
        now: DateTime<Utc>,
    ) -> String {
        let (host, path, query) = Self::parse_url_fast(url);
        let expires_secs = expires_secs.min(MAX_PRESIGN_EXPIRY_SECS);

        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let credential_scope = self.credential_scope(&date_stamp);
        let credential = format!("{}/{}", self.credentials.access_key, credential_scope);

        // Parameters in sorted order
        let mut presign_query = String::with_capacity(256);
        presign_query.push_str("X-Amz-Algorithm=");
        presign_query.push_str(ALGORITHM);
        presign_query.push_str("&X-Amz-Credential=");
        presign_query.push_str(&Self::uri_encode(&credential, true));
        presign_query.push_str("&X-Amz-Date=");
        presign_query.push_str(&amz_date);
        presign_query.push_str("&X-Amz-Expires=");
        presign_query.push_str(&expires_secs.to_string());
        if let Some(token) = &self.credentials.session_token {
            presign_query.push_str("&X-Amz-Security-Token=");
            presign_query.push_str(&Self::uri_encode(token, true));
        }
        presign_query.push_str("&X-Amz-SignedHeaders=host");

        let full_query = if query.is_empty() {
            presign_query
        } else {
            format!("{}&{}", query, presign_query)
        };
        let canonical_query = self.create_canonical_query_string(&full_query);

        let canonical_request = format!(
            "{}\n{}\n{}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
            method, path, canonical_query, host
        );

        let string_to_sign = Self::string_to_sign(&amz_date, &credential_scope, &canonical_request);
        let signature = self.calculate_signature(&date_stamp, &string_to_sign);

        let base = match url.find('?') {
            Some(pos) => &url[..pos],
            None => url,
        };
        format!("{}?{}&X-Amz-Signature={}", base, canonical_query, signature)
    }

    /// Sign a browser-based POST upload policy
    ///
    /// `conditions` are the caller's policy conditions; the signing
    /// conditions (algorithm, credential, date, token) are appended here.
    /// Returns the form fields the client must send alongside the file.
    pub fn sign_post_policy(
        &self,
        conditions: Vec<Value>,
        expiration: DateTime<Utc>,
    ) -> BTreeMap<String, String> {
        self.sign_post_policy_at(conditions, expiration, Utc::now())
    }

    pub(crate) fn sign_post_policy_at(
        &self,
        mut conditions: Vec<Value>,
        expiration: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, String> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let credential = format!(
            "{}/{}",
            self.credentials.access_key,
            self.credential_scope(&date_stamp)
        );

        let mut fields = BTreeMap::new();
        fields.insert("x-amz-algorithm".to_string(), ALGORITHM.to_string());
        fields.insert("x-amz-credential".to_string(), credential);
        fields.insert("x-amz-date".to_string(), amz_date);
        if let Some(token) = &self.credentials.session_token {
            fields.insert("x-amz-security-token".to_string(), token.clone());
        }

        for (name, value) in &fields {
            let mut condition = serde_json::Map::new();
            condition.insert(name.clone(), Value::String(value.clone()));
            conditions.push(Value::Object(condition));
        }

        let policy = json!({
            "expiration": expiration.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            "conditions": conditions,
        });
        let encoded_policy =
            base64::engine::general_purpose::STANDARD.encode(policy.to_string().as_bytes());
        let signature = self.calculate_signature(&date_stamp, &encoded_policy);

        fields.insert("policy".to_string(), encoded_policy);
        fields.insert("x-amz-signature".to_string(), signature);
        fields
    }

    fn credential_scope(&self, date_stamp: &str) -> String {
        format!("{}/{}/{}/aws4_request", date_stamp, self.region, self.service)
    }

    fn string_to_sign(amz_date: &str, credential_scope: &str, canonical_request: &str) -> String {
        let canonical_request_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM, amz_date, credential_scope, canonical_request_hash
        )
    }

    /// Split a URL into (host_with_port, path, query) without allocating.
    /// Default ports (:443 for https, :80 for http) are stripped from the host.
    fn parse_url_fast(url: &str) -> (&str, &str, &str) {
        let after_scheme = if let Some(rest) = url.strip_prefix("https://") {
            rest
        } else if let Some(rest) = url.strip_prefix("http://") {
            rest
        } else {
            url
        };

        let (authority, path_and_query) = match after_scheme.find('/') {
            Some(pos) => (&after_scheme[..pos], &after_scheme[pos..]),
            None => (after_scheme, "/"),
        };

        let (path, query) = match path_and_query.find('?') {
            Some(pos) => (&path_and_query[..pos], &path_and_query[pos + 1..]),
            None => (path_and_query, ""),
        };

        let host = if url.starts_with("https") {
            authority.strip_suffix(":443").unwrap_or(authority)
        } else {
            authority.strip_suffix(":80").unwrap_or(authority)
        };

        (host, path, query)
    }

    /// Create canonical query string (sorted by parameter name)
    ///
    /// Fast path: already-canonical, sorted, `key=value` queries are returned
    /// as-is. Anything else is decoded, re-encoded and sorted.
    fn create_canonical_query_string(&self, query: &str) -> String {
        if query.is_empty() {
            return String::new();
        }

        let all_canonical = query.bytes().all(|b| {
            matches!(b,
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9'
                | b'-' | b'_' | b'.' | b'~'
                | b'=' | b'&' | b'%'
            )
        });

        if all_canonical {
            let mut sorted = true;
            let mut all_have_equals = true;
            let mut last_key: &str = "";
            for pair in query.split('&') {
                let key = match pair.find('=') {
                    Some(pos) => &pair[..pos],
                    None => {
                        all_have_equals = false;
                        pair
                    }
                };
                if key < last_key {
                    sorted = false;
                    break;
                }
                last_key = key;
            }
            if sorted && all_have_equals {
                return query.to_string();
            }
        }

        let mut params: Vec<(String, String)> = Vec::new();
        for pair in query.split('&') {
            if let Some(pos) = pair.find('=') {
                let key = &pair[..pos];
                let value = &pair[pos + 1..];
                let decoded_key = urlencoding::decode(key).unwrap_or_else(|_| key.into());
                let decoded_value = urlencoding::decode(value).unwrap_or_else(|_| value.into());
                params.push((
                    Self::uri_encode(&decoded_key, true),
                    Self::uri_encode(&decoded_value, true),
                ));
            } else {
                let decoded = urlencoding::decode(pair).unwrap_or_else(|_| pair.into());
                params.push((Self::uri_encode(&decoded, true), String::new()));
            }
        }

        params.sort_unstable();

        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Canonical headers; keys are lowercase and sorted by the BTreeMap
    fn create_canonical_headers(&self, headers: &BTreeMap<String, String>) -> String {
        let mut result = String::with_capacity(headers.len() * 64);
        for (k, v) in headers {
            result.push_str(k);
            result.push(':');
            result.push_str(v.trim());
            result.push('\n');
        }
        result
    }

    fn create_signed_headers(&self, headers: &BTreeMap<String, String>) -> String {
        headers.keys().map(String::as_str).collect::<Vec<_>>().join(";")
    }

    /// Calculate the signature, reusing the day's signing key when cached
    fn calculate_signature(&self, date_stamp: &str, string_to_sign: &str) -> String {
        let signing_key = {
            let mut cache = self
                .cached_signing_key
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match *cache {
                Some((ref cached_date, cached_key)) if cached_date == date_stamp => cached_key,
                _ => {
                    let key = self.derive_signing_key(date_stamp);
                    *cache = Some((date_stamp.to_string(), key));
                    key
                }
            }
        };

        hex::encode(Self::hmac_sha256(&signing_key, string_to_sign.as_bytes()))
    }

    /// Derive signing key from date stamp (4 chained HMAC operations)
    fn derive_signing_key(&self, date_stamp: &str) -> [u8; 32] {
        let k_date = Self::hmac_sha256(&self.aws4_key, date_stamp.as_bytes());
        let k_region = Self::hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = Self::hmac_sha256(&k_region, self.service.as_bytes());
        Self::hmac_sha256(&k_service, b"aws4_request")
    }

    fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
        mac.update(msg);
        let result = mac.finalize().into_bytes();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        output
    }

    /// URI encode a string (RFC 3986)
    pub(crate) fn uri_encode(s: &str, encode_slash: bool) -> String {
        let mut result = String::with_capacity(s.len() + 16);
        for byte in s.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    result.push(byte as char);
                }
                b'/' if !encode_slash => {
                    result.push('/');
                }
                _ => {
                    result.push('%');
                    result.push(HEX_UPPER[(byte >> 4) as usize] as char);
                    result.push(HEX_UPPER[(byte & 0xf) as usize] as char);
                }
            }
        }
        result
    }
}
