use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{error, info};

use super::routes::ApiRoute;
use crate::core::Core;
use crate::error::ExplorerError;
use crate::explorer::ListParams;
use crate::models::{CreateFolderRequest, PresignedPostRequest};

/// HTTP body type for responses
pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Convert Bytes into a BoxBody
pub(crate) fn bytes_body(b: Bytes) -> BoxBody {
    Full::new(b).map_err(|never| match never {}).boxed()
}

pub(crate) fn empty_response(status: StatusCode) -> Response<BoxBody> {
    let mut response = Response::new(bytes_body(Bytes::new()));
    *response.status_mut() = status;
    response
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<BoxBody> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(bytes_body(Bytes::from(body)));
            *response.status_mut() = status;
            response.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(e) => {
            error!(error = %e, "response_encode_failed");
            empty_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// `{"message": ...}` error body
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response<BoxBody> {
    json_response(status, &json!({ "message": message }))
}

/// Generic client-facing message for provider failures
fn failure_message(route: &ApiRoute, recursive: bool) -> &'static str {
    match route {
        ApiRoute::Health => "Health check failed",
        ApiRoute::ListBuckets => "Failed to list buckets",
        ApiRoute::ListObjects { .. } => "Failed to list objects",
        ApiRoute::CreateFolder { .. } => "Failed to create folder",
        ApiRoute::PresignedGet { .. } => "Failed to generate presigned URL",
        ApiRoute::ObjectMetadata { .. } => "Failed to get object metadata",
        ApiRoute::DeleteObject { .. } if recursive => "Failed to delete folder",
        ApiRoute::DeleteObject { .. } => "Failed to delete object",
        ApiRoute::PresignedPost { .. } => "Failed to generate presigned POST URL",
    }
}

/// Map a service error to a response; provider details are logged, not returned
fn explorer_error(
    err: ExplorerError,
    route: &ApiRoute,
    bucket: &str,
    key: &str,
    recursive: bool,
) -> Response<BoxBody> {
    match err {
        ExplorerError::Provider(ref source) => {
            error!(
                operation = route.operation(),
                bucket = %bucket,
                key = %key,
                error = %source,
                "storage_provider_error"
            );
            error_response(err.status(), failure_message(route, recursive))
        }
        other => error_response(other.status(), &other.to_string()),
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response<BoxBody>> {
    serde_json::from_slice(body)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid request body"))
}

/// Execute a resolved route
pub(crate) async fn dispatch(
    core: &Core,
    route: ApiRoute,
    query: HashMap<String, String>,
    body: Bytes,
) -> Response<BoxBody> {
    let explorer = &core.explorer;

    match &route {
        ApiRoute::Health => json_response(StatusCode::OK, &json!({ "status": "ok" })),

        ApiRoute::ListBuckets => match explorer.list_buckets().await {
            Ok(buckets) => json_response(StatusCode::OK, &buckets),
            Err(e) => explorer_error(e, &route, "", "", false),
        },

        ApiRoute::ListObjects { bucket } => {
            let params = ListParams {
                prefix: query.get("prefix").cloned().unwrap_or_default(),
                delimiter: query.get("delimiter").cloned().unwrap_or_default(),
                continuation_token: query.get("nextToken").cloned(),
                // Unparseable values fall back to the default page size
                max_keys: query.get("maxKeys").and_then(|v| v.parse().ok()),
            };
            let prefix = params.prefix.clone();
            match explorer.list_objects(bucket, params).await {
                Ok(page) => json_response(StatusCode::OK, &page),
                Err(e) => explorer_error(e, &route, bucket, &prefix, false),
            }
        }

        ApiRoute::CreateFolder { bucket } => {
            let request: CreateFolderRequest = match parse_body(&body) {
                Ok(r) => r,
                Err(response) => return response,
            };
            if request.kind != "folder" {
                return error_response(StatusCode::BAD_REQUEST, "Type must be 'folder'");
            }
            match explorer.create_folder(bucket, &request.key).await {
                Ok(key) => json_response(
                    StatusCode::CREATED,
                    &json!({ "message": "Folder created successfully", "key": key }),
                ),
                Err(e) => explorer_error(e, &route, bucket, &request.key, false),
            }
        }

        ApiRoute::PresignedGet { bucket, key } => {
            let expires_in = query
                .get("expiresIn")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(0);
            match explorer.presigned_get_url(bucket, key, expires_in).await {
                Ok(url) => json_response(StatusCode::OK, &json!({ "url": url })),
                Err(e) => explorer_error(e, &route, bucket, key, false),
            }
        }

        ApiRoute::ObjectMetadata { bucket, key } => {
            match explorer.object_metadata(bucket, key).await {
                Ok(metadata) => json_response(StatusCode::OK, &metadata),
                Err(e) => explorer_error(e, &route, bucket, key, false),
            }
        }

        ApiRoute::DeleteObject { bucket, key } => {
            let recursive = query.get("recursive").map(String::as_str) == Some("true");
            let result = if recursive {
                explorer.delete_by_prefix(bucket, key).await.map(|deleted| {
                    info!(bucket = %bucket, prefix = %key, deleted, "folder_deleted");
                })
            } else {
                explorer.delete_object(bucket, key).await
            };
            match result {
                Ok(()) => empty_response(StatusCode::NO_CONTENT),
                Err(e) => explorer_error(e, &route, bucket, key, recursive),
            }
        }

        ApiRoute::PresignedPost { bucket } => {
            let request: PresignedPostRequest = match parse_body(&body) {
                Ok(r) => r,
                Err(response) => return response,
            };
            match explorer.presigned_post(bucket, &request).await {
                Ok(upload) => json_response(StatusCode::OK, &upload),
                Err(e) => explorer_error(e, &route, bucket, &request.key, false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::S3Error;

    async fn body_json(response: Response<BoxBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_provider_error_is_opaque() {
        let route = ApiRoute::ListObjects { bucket: "photos".into() };
        let err = ExplorerError::Provider(S3Error::Transport("dns failure at 10.0.0.1".into()));

        let response = explorer_error(err, &route, "photos", "", false);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({"message": "Failed to list objects"}));
    }

    #[tokio::test]
    async fn test_recursive_delete_failure_message() {
        let route = ApiRoute::DeleteObject { bucket: "b".into(), key: "dir/".into() };
        let err = ExplorerError::Provider(S3Error::Timeout(std::time::Duration::from_secs(1)));

        let response = explorer_error(err, &route, "b", "dir/", true);
        assert_eq!(body_json(response).await, json!({"message": "Failed to delete folder"}));
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = error_response(StatusCode::NOT_FOUND, "Bucket not found");
        assert_eq!(
            response.headers()[hyper::header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_json(response).await, json!({"message": "Bucket not found"}));
    }
}
