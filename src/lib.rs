//! s3explorer - file-explorer REST API over S3-compatible object storage

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod explorer;
pub mod models;
pub mod s3;

pub use crate::core::Core;
pub use crate::config::Config;
pub use crate::error::ExplorerError;
