//! Entry view: sends the visitor to the dashboard or the sign-in page

use std::sync::Arc;

use axum::{http::HeaderMap, response::Redirect, Extension};

use crate::{
    gallery::entry_route,
    identity::{JwtVerifier, SessionIdentity},
    middleware::bearer_token,
};

/// Redirects (303) to `/dashboard` for a valid session, `/login` otherwise
pub async fn handler(
    Extension(verifier): Extension<Arc<JwtVerifier>>,
    headers: HeaderMap,
) -> Redirect {
    let session = SessionIdentity::new(verifier);
    if let Some(token) = bearer_token(&headers) {
        session.sign_in(token).await;
    }

    Redirect::to(entry_route(&session).await.path())
}
