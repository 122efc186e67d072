use std::sync::Arc;

use aide::OperationIo;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Extension,
};

use crate::{
    identity::{JwtVerifier, Principal},
    namespace::Namespace,
    types::{AppError, Environment},
};

/// Authenticated user resolved from the bearer token
#[derive(Debug, Clone, OperationIo)]
pub struct AuthenticatedUser {
    /// The principal the token was issued to
    pub principal: Principal,
}

impl AuthenticatedUser {
    /// Storage namespace owned by this user
    #[must_use]
    pub fn namespace(&self) -> Namespace {
        Namespace::for_principal(&self.principal)
    }
}

/// Axum extractor for authenticated user
///
/// Use this in your handlers to automatically extract the authenticated user:
/// ```ignore
/// async fn protected_handler(
///     user: AuthenticatedUser,
///     // ... other extractors
/// ) -> Result<impl IntoResponse, AppError> {
///     let namespace = user.namespace();
///     Ok("Protected content")
/// }
/// ```
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or_else(|| {
            AppError::new(
                StatusCode::UNAUTHORIZED,
                "missing_auth",
                "Authentication required but user not found in request extensions",
                false,
            )
        })
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Bearer token authentication middleware
///
/// This middleware:
/// 1. Extracts Bearer token from Authorization header
/// 2. Resolves the principal with `JwtVerifier`
/// 3. Adds `AuthenticatedUser` to request extensions
/// 4. Returns 401 for invalid/missing tokens, before any handler touches the object store
///
/// In development, set `DISABLE_AUTH=true` to use the raw token as the principal id.
///
/// # Errors
///
/// - `AppError` - Invalid/missing token with 401 status code
pub async fn auth_middleware(
    Extension(verifier): Extension<Arc<JwtVerifier>>,
    Extension(environment): Extension<Environment>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        AppError::new(
            StatusCode::UNAUTHORIZED,
            "missing_token",
            "Authorization header must contain a valid Bearer token",
            false,
        )
    })?;

    let principal = if environment.disable_auth() {
        Principal::new(token).ok()
    } else {
        verifier.resolve(token)
    };

    let principal = principal.ok_or_else(|| {
        AppError::new(
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "Invalid or expired token",
            false,
        )
    })?;

    tracing::debug!("Authenticated principal {}", principal.id);

    request
        .extensions_mut()
        .insert(AuthenticatedUser { principal });

    Ok(next.run(request).await)
}
