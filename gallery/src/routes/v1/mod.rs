/// Image list, upload and delete handlers
pub mod images;

use aide::axum::{
    routing::{delete, get},
    ApiRouter,
};
use axum::middleware;

use crate::middleware::auth::auth_middleware;

/// Creates the v1 API router with all v1 handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .api_route(
            "/images",
            get(images::list_images).post(images::upload_image),
        )
        .api_route("/images/{name}", delete(images::delete_image))
        .layer(middleware::from_fn(auth_middleware))
}
