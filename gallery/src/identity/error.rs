//! Error types for identity resolution

use thiserror::Error;

/// Errors that can occur while resolving a principal from a token
#[derive(Error, Debug)]
pub enum IdentityError {
    /// Token failed signature, expiry or audience validation
    #[error("Invalid or expired token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// Token subject cannot be used as a principal id
    #[error("Invalid token subject: {0}")]
    InvalidSubject(String),

    /// Token could not be issued
    #[error("Failed to issue token: {0}")]
    SigningError(#[source] jsonwebtoken::errors::Error),
}
