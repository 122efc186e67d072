//! API reference: the generated `OpenAPI` document and a Scalar viewer on top of it

use aide::{axum::ApiRouter, openapi::OpenApi, scalar::Scalar};
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json,
};

use crate::types::Environment;

const OPENAPI_PATH: &str = "/openapi.json";

/// Routes serving the API reference
pub fn handler() -> ApiRouter {
    let scalar = Scalar::new(OPENAPI_PATH).with_title("Gallery API Docs");

    ApiRouter::new()
        .route("/docs", scalar.axum_route())
        .route(OPENAPI_PATH, get(openapi_schema))
        .layer(middleware::from_fn(docs_visibility))
}

/// Hides the reference in production
async fn docs_visibility(
    Extension(environment): Extension<Environment>,
    request: Request,
    next: Next,
) -> Response {
    if !environment.show_api_docs() {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

#[allow(clippy::unused_async)]
async fn openapi_schema(Extension(openapi): Extension<OpenApi>) -> Json<OpenApi> {
    Json(openapi)
}
