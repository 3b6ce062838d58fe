//! Service-level error taxonomy

use crate::s3::S3Error;
use hyper::StatusCode;
use thiserror::Error;

/// What was missing when the provider reported a 404
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Bucket,
    Object,
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Missing::Bucket => f.write_str("Bucket"),
            Missing::Object => f.write_str("Object"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("{0} not found")]
    NotFound(Missing),

    #[error("Access denied")]
    AccessDenied,

    /// Any other storage failure, including transport errors and timeouts
    #[error("Storage provider error: {0}")]
    Provider(S3Error),

    /// Malformed client input
    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ExplorerError>;

impl ExplorerError {
    pub fn validation(message: impl Into<String>) -> Self {
        ExplorerError::Validation(message.into())
    }

    /// HTTP status the API answers with
    pub fn status(&self) -> StatusCode {
        match self {
            ExplorerError::NotFound(_) => StatusCode::NOT_FOUND,
            ExplorerError::AccessDenied => StatusCode::FORBIDDEN,
            ExplorerError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ExplorerError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Classification goes by provider error code only. Code-less HEAD
/// responses get `NotFound`/`AccessDenied` codes in `S3Error::from_response`.
impl From<S3Error> for ExplorerError {
    fn from(err: S3Error) -> Self {
        match err.code() {
            Some("NoSuchBucket") => ExplorerError::NotFound(Missing::Bucket),
            Some("NoSuchKey") | Some("NotFound") => ExplorerError::NotFound(Missing::Object),
            Some("AccessDenied") => ExplorerError::AccessDenied,
            _ => ExplorerError::Provider(err),
        }
    }
}
