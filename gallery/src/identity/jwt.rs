//! HS256 token verification for tokens minted by the identity provider

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{IdentityError, Principal};

/// Claims carried by identity provider access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (principal id)
    pub sub: String,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    pub iat: i64,
    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Verifies bearer tokens issued by the identity provider
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    audience: Option<String>,
}

impl JwtVerifier {
    /// Creates a verifier for the provider's shared secret
    ///
    /// When `audience` is `None` the `aud` claim is not checked.
    #[must_use]
    pub fn new(secret: &[u8], audience: Option<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            encoding_key: EncodingKey::from_secret(secret),
            audience,
        }
    }

    /// Validates a token and returns the principal it was issued to
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` if the signature, expiry or audience is invalid
    /// Returns `IdentityError::InvalidSubject` if the subject is not a usable principal id
    pub fn verify(&self, token: &str) -> Result<Principal, IdentityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(IdentityError::InvalidToken)?;

        Principal::new(data.claims.sub)
    }

    /// Soft variant of [`Self::verify`]: any failure yields `None`
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<Principal> {
        match self.verify(token) {
            Ok(principal) => Some(principal),
            Err(e) => {
                debug!("Token rejected: {e}");
                None
            }
        }
    }

    /// Issues a token for `principal`, used for local development and tests
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::SigningError` if encoding fails
    pub fn issue(&self, principal: &Principal, ttl: Duration) -> Result<String, IdentityError> {
        let now = Utc::now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = TokenClaims {
            sub: principal.id.clone(),
            exp: now.saturating_add(ttl_secs),
            iat: now,
            aud: self.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(IdentityError::SigningError)
    }
}
