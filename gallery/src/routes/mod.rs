mod docs;
mod entry;
mod health;
/// Version 1 of the images API
pub mod v1;

use aide::axum::{routing::get, ApiRouter};

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler())
        .route("/", axum::routing::get(entry::handler))
        .api_route("/health", get(health::handler))
        .nest("/v1", v1::handler())
}
