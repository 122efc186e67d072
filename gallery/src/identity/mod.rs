//! Identity resolution
//!
//! Authentication itself is delegated to an external identity provider. This module only
//! turns the provider's bearer tokens into a [`Principal`]. Resolution is soft: any lookup
//! failure or missing session yields `None`, which callers treat as "signed out".

mod error;
mod jwt;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

pub use error::IdentityError;
pub use jwt::{JwtVerifier, TokenClaims};

/// Maximum accepted length of a principal id
const MAX_PRINCIPAL_ID_LEN: usize = 128;

/// The authenticated identity making a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    /// Opaque identifier assigned by the identity provider
    pub id: String,
}

impl Principal {
    /// Creates a principal, rejecting ids that could not safely scope a storage namespace
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidSubject` for empty, overlong, dot-only or
    /// non `[A-Za-z0-9._@-]` ids
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into();

        let valid = !id.is_empty()
            && id.len() <= MAX_PRINCIPAL_ID_LEN
            && id != "."
            && id != ".."
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));

        if valid {
            Ok(Self { id })
        } else {
            Err(IdentityError::InvalidSubject(id))
        }
    }
}

/// Source of the current principal
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns the signed-in principal, or `None` when there is no valid session
    async fn current_principal(&self) -> Option<Principal>;
}

/// Session-scoped resolver holding the bearer token of one signed-in client
pub struct SessionIdentity {
    verifier: Arc<JwtVerifier>,
    token: RwLock<Option<String>>,
}

impl SessionIdentity {
    /// Creates a signed-out session
    #[must_use]
    pub const fn new(verifier: Arc<JwtVerifier>) -> Self {
        Self {
            verifier,
            token: RwLock::const_new(None),
        }
    }

    /// Stores the access token handed out by the identity provider
    pub async fn sign_in(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    /// Forgets the current token
    pub async fn sign_out(&self) {
        *self.token.write().await = None;
    }
}

#[async_trait]
impl IdentityResolver for SessionIdentity {
    async fn current_principal(&self) -> Option<Principal> {
        let token = self.token.read().await.clone()?;
        self.verifier.resolve(&token)
    }
}
