//! Object store access
//!
//! [`ObjectStore`] is the thin seam over the external object store. It works on full key
//! paths (`namespace/key`) and knows nothing about principals; namespace scoping happens
//! one layer up in [`crate::gateway::ImageGateway`].

mod error;
mod memory;
mod s3;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

/// One listed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full key path
    pub path: String,
    /// Creation time reported by the store
    pub created_at: DateTime<Utc>,
}

/// Operations the gallery needs from the external object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists the objects directly under `prefix`, newest first, at most `limit` entries
    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<ObjectEntry>>;

    /// Creates a time-limited read URL for the object at `path`
    async fn create_signed_url(&self, path: &str, ttl: Duration) -> StoreResult<String>;

    /// Stores `bytes` at `path`
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> StoreResult<()>;

    /// Removes the objects at `paths`
    async fn remove(&self, paths: &[String]) -> StoreResult<()>;
}

/// Orders entries newest first and caps them at `limit`
pub(crate) fn newest_first(mut entries: Vec<ObjectEntry>, limit: usize) -> Vec<ObjectEntry> {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.path.cmp(&b.path)));
    entries.truncate(limit);
    entries
}
