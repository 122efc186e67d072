//! Error types for object store operations

use std::time::Duration;

use aws_sdk_s3::error::SdkError;
use thiserror::Error;

/// Result type for object store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during object store operations
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// S3 service error
    #[error("S3 service error: {0}")]
    S3Error(String),

    /// AWS SDK error
    #[error("AWS SDK error: {0}")]
    AwsError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Upstream service error (5xx from S3)
    #[error("Upstream service error: {0}")]
    UpstreamError(String),

    /// Object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Call did not complete within the configured bound
    #[error("Object store call timed out after {0:?}")]
    Timeout(Duration),
}

impl<E: std::fmt::Debug> From<SdkError<E>> for StoreError {
    fn from(error: SdkError<E>) -> Self {
        match error {
            SdkError::ServiceError(service_err) if service_err.raw().status().as_u16() >= 500 => {
                Self::UpstreamError(format!("{:?}", service_err.err()))
            }
            SdkError::ServiceError(service_err) => Self::S3Error(format!("{:?}", service_err.err())),
            _ => Self::AwsError(format!("{error:?}")),
        }
    }
}
