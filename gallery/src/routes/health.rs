use aide::axum::IntoApiResponse;
use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::Serialize;

use crate::types::Environment;

/// Liveness and build information
#[derive(Debug, Serialize, JsonSchema)]
pub struct HealthResponse {
    /// Always `ok` while the process is serving
    status: &'static str,
    /// Current version of the application
    semver: &'static str,
    /// Commit hash of the current build (if available)
    rev: Option<&'static str>,
    /// Object store backend serving images (`s3` or `memory`)
    storage: String,
    /// Whether bearer tokens are verified against the identity provider
    auth_enforced: bool,
}

/// Health check endpoint
///
/// Reports liveness, build information and which object store backend is configured.
/// Does not call the object store.
#[allow(clippy::unused_async)]
pub async fn handler(Extension(environment): Extension<Environment>) -> impl IntoApiResponse {
    Json(HealthResponse {
        status: "ok",
        semver: env!("CARGO_PKG_VERSION"),
        rev: option_env!("GIT_REV"),
        storage: environment.storage_backend().to_string(),
        auth_enforced: !environment.disable_auth(),
    })
}
