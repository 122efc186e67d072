//! Error types for gallery gateway operations

use thiserror::Error;

use crate::storage::StoreError;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by [`super::ImageGateway`], one kind per operation
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// Listing the namespace failed
    #[error("Failed to list images: {0}")]
    List(#[source] StoreError),

    /// Signing a single object failed
    #[error("Failed to sign {key}: {source}")]
    Sign {
        /// Object key that could not be signed
        key: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Uploading failed
    #[error("Failed to upload image: {0}")]
    Upload(#[source] StoreError),

    /// Deleting failed
    #[error("Failed to delete {key}: {source}")]
    Delete {
        /// Object key that could not be removed
        key: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },
}

impl GatewayError {
    /// Underlying store error
    #[must_use]
    pub const fn source_error(&self) -> &StoreError {
        match self {
            Self::List(source)
            | Self::Upload(source)
            | Self::Sign { source, .. }
            | Self::Delete { source, .. } => source,
        }
    }

    /// Underlying error detail, suitable for a user-facing message
    #[must_use]
    pub fn detail(&self) -> String {
        self.source_error().to_string()
    }
}
