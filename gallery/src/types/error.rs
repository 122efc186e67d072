//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::{gateway::GatewayError, namespace::KeyError, storage::StoreError};

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Error details
    error: ErrorBody,
}

/// Error body containing code and message
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable error message
    pub message: &'static str,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(
        status: StatusCode,
        code: &'static str,
        msg: &'static str,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                allow_retry: retry,
                error: ErrorBody { code, message: msg },
            },
        }
    }

    /// HTTP status of the error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.inner.error.code
    }

    fn from_store_error(err: &StoreError, code: &'static str, msg: &'static str) -> Self {
        match err {
            StoreError::UpstreamError(detail) => {
                tracing::error!("Object store upstream error: {detail}");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "upstream_error",
                    "Object store temporarily unavailable",
                    true,
                )
            }
            StoreError::Timeout(after) => {
                tracing::error!("Object store call timed out after {after:?}");
                Self::new(
                    StatusCode::GATEWAY_TIMEOUT,
                    "upstream_timeout",
                    "Object store did not respond in time",
                    true,
                )
            }
            StoreError::NotFound(path) => {
                tracing::debug!("Object not found: {path}");
                Self::new(
                    StatusCode::NOT_FOUND,
                    "not_found",
                    "Image not found",
                    false,
                )
            }
            StoreError::ConfigError(detail) => {
                tracing::error!("Configuration error: {detail}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, msg, false)
            }
            StoreError::S3Error(detail) | StoreError::AwsError(detail) => {
                tracing::error!("S3/AWS error: {detail}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, msg, true)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert rejected object keys to application errors
impl From<KeyError> for AppError {
    fn from(err: KeyError) -> Self {
        tracing::warn!("Invalid object key: {err}");
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_key",
            "Invalid image name",
            false,
        )
    }
}

/// Convert gateway errors to application errors
impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match &err {
            GatewayError::List(source) => {
                Self::from_store_error(source, "list_failed", "Failed to list images")
            }
            GatewayError::Sign { source, .. } => {
                Self::from_store_error(source, "sign_failed", "Failed to sign image URL")
            }
            GatewayError::Upload(source) => {
                Self::from_store_error(source, "upload_failed", "Failed to upload image")
            }
            GatewayError::Delete { source, .. } => {
                Self::from_store_error(source, "delete_failed", "Failed to delete image")
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
