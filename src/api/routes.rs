use hyper::Method;
use std::collections::HashMap;

/// Endpoint resolved from method and path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRoute {
    Health,
    ListBuckets,
    ListObjects { bucket: String },
    CreateFolder { bucket: String },
    PresignedGet { bucket: String, key: String },
    ObjectMetadata { bucket: String, key: String },
    DeleteObject { bucket: String, key: String },
    PresignedPost { bucket: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    Found(ApiRoute),
    /// Path exists but not for this method
    MethodNotAllowed,
    NotFound,
    /// Percent-encoding that does not decode to UTF-8
    BadPath,
}

impl ApiRoute {
    /// Operation name used in logs and generic error messages
    pub fn operation(&self) -> &'static str {
        match self {
            ApiRoute::Health => "health",
            ApiRoute::ListBuckets => "list_buckets",
            ApiRoute::ListObjects { .. } => "list_objects",
            ApiRoute::CreateFolder { .. } => "create_folder",
            ApiRoute::PresignedGet { .. } => "presigned_get",
            ApiRoute::ObjectMetadata { .. } => "object_metadata",
            ApiRoute::DeleteObject { .. } => "delete_object",
            ApiRoute::PresignedPost { .. } => "presigned_post",
        }
    }

    /// Match a request path against the route table
    ///
    /// Object keys are everything after `/objects/` or `/metadata/`, slashes
    /// included, percent-decoded.
    pub fn resolve(method: &Method, path: &str) -> RouteMatch {
        if path == "/health" {
            return Self::only(method, Method::GET, ApiRoute::Health);
        }

        let rest = match path.strip_prefix("/api/buckets") {
            Some(rest) => rest,
            None => return RouteMatch::NotFound,
        };
        if rest.is_empty() {
            return Self::only(method, Method::GET, ApiRoute::ListBuckets);
        }

        let rest = match rest.strip_prefix('/') {
            Some(rest) => rest,
            None => return RouteMatch::NotFound,
        };
        let (raw_bucket, tail) = match rest.split_once('/') {
            Some(parts) => parts,
            None => return RouteMatch::NotFound,
        };
        if raw_bucket.is_empty() {
            return RouteMatch::NotFound;
        }
        let bucket = match decode(raw_bucket) {
            Some(b) => b,
            None => return RouteMatch::BadPath,
        };

        if tail == "objects" {
            return match *method {
                Method::GET => RouteMatch::Found(ApiRoute::ListObjects { bucket }),
                Method::POST => RouteMatch::Found(ApiRoute::CreateFolder { bucket }),
                _ => RouteMatch::MethodNotAllowed,
            };
        }
        if tail == "presigned-post-url" {
            return Self::only(method, Method::POST, ApiRoute::PresignedPost { bucket });
        }
        if let Some(raw_key) = tail.strip_prefix("objects/") {
            let key = match decode(raw_key) {
                Some(k) => k,
                None => return RouteMatch::BadPath,
            };
            return match *method {
                Method::GET => RouteMatch::Found(ApiRoute::PresignedGet { bucket, key }),
                Method::DELETE => RouteMatch::Found(ApiRoute::DeleteObject { bucket, key }),
                _ => RouteMatch::MethodNotAllowed,
            };
        }
        if let Some(raw_key) = tail.strip_prefix("metadata/") {
            let key = match decode(raw_key) {
                Some(k) => k,
                None => return RouteMatch::BadPath,
            };
            return Self::only(method, Method::GET, ApiRoute::ObjectMetadata { bucket, key });
        }

        RouteMatch::NotFound
    }

    fn only(method: &Method, expected: Method, route: ApiRoute) -> RouteMatch {
        if *method == expected {
            RouteMatch::Found(route)
        } else {
            RouteMatch::MethodNotAllowed
        }
    }
}

fn decode(raw: &str) -> Option<String> {
    urlencoding::decode(raw).ok().map(|s| s.into_owned())
}

/// Parse a form-encoded query string; later duplicates win
pub fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let query = match query {
        Some(q) if !q.is_empty() => q,
        _ => return params,
    };

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = urlencoding::decode(&name.replace('+', " ")).map(|s| s.into_owned());
        let value = urlencoding::decode(&value.replace('+', " ")).map(|s| s.into_owned());
        if let (Ok(name), Ok(value)) = (name, value) {
            params.insert(name, value);
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(method: Method, path: &str) -> ApiRoute {
        match ApiRoute::resolve(&method, path) {
            RouteMatch::Found(route) => route,
            other => panic!("{} {} resolved to {:?}", method, path, other),
        }
    }

    #[test]
    fn test_resolve_routes() {
        assert_eq!(found(Method::GET, "/health"), ApiRoute::Health);
        assert_eq!(found(Method::GET, "/api/buckets"), ApiRoute::ListBuckets);
        assert_eq!(
            found(Method::GET, "/api/buckets/photos/objects"),
            ApiRoute::ListObjects { bucket: "photos".into() }
        );
        assert_eq!(
            found(Method::POST, "/api/buckets/photos/objects"),
            ApiRoute::CreateFolder { bucket: "photos".into() }
        );
        assert_eq!(
            found(Method::POST, "/api/buckets/photos/presigned-post-url"),
            ApiRoute::PresignedPost { bucket: "photos".into() }
        );
    }

    #[test]
    fn test_resolve_wildcard_keys() {
        assert_eq!(
            found(Method::GET, "/api/buckets/photos/objects/2024/march/cat%20one.jpg"),
            ApiRoute::PresignedGet {
                bucket: "photos".into(),
                key: "2024/march/cat one.jpg".into()
            }
        );
        assert_eq!(
            found(Method::DELETE, "/api/buckets/photos/objects/2024/"),
            ApiRoute::DeleteObject {
                bucket: "photos".into(),
                key: "2024/".into()
            }
        );
        assert_eq!(
            found(Method::GET, "/api/buckets/photos/metadata/docs/a.pdf"),
            ApiRoute::ObjectMetadata {
                bucket: "photos".into(),
                key: "docs/a.pdf".into()
            }
        );
    }

    #[test]
    fn test_resolve_misses() {
        assert_eq!(ApiRoute::resolve(&Method::GET, "/"), RouteMatch::NotFound);
        assert_eq!(ApiRoute::resolve(&Method::GET, "/api/bucketsx"), RouteMatch::NotFound);
        assert_eq!(ApiRoute::resolve(&Method::GET, "/api/buckets/photos"), RouteMatch::NotFound);
        assert_eq!(
            ApiRoute::resolve(&Method::GET, "/api/buckets/photos/unknown"),
            RouteMatch::NotFound
        );
        assert_eq!(
            ApiRoute::resolve(&Method::PUT, "/api/buckets/photos/objects"),
            RouteMatch::MethodNotAllowed
        );
        assert_eq!(
            ApiRoute::resolve(&Method::DELETE, "/health"),
            RouteMatch::MethodNotAllowed
        );
        assert_eq!(
            ApiRoute::resolve(&Method::GET, "/api/buckets/photos/objects/%FF"),
            RouteMatch::BadPath
        );
    }

    #[test]
    fn test_parse_query() {
        let params = parse_query(Some("prefix=docs%2F&nextToken=abc%3D%3D&maxKeys=50&flag"));
        assert_eq!(params["prefix"], "docs/");
        assert_eq!(params["nextToken"], "abc==");
        assert_eq!(params["maxKeys"], "50");
        assert_eq!(params["flag"], "");

        let params = parse_query(Some("prefix=my+folder%2B/"));
        assert_eq!(params["prefix"], "my folder+/");

        assert!(parse_query(None).is_empty());
    }
}
