//! Namespace-scoped gateway to the object store
//!
//! All reads and writes go through a [`Namespace`], which can only be derived from an
//! authenticated [`crate::identity::Principal`]. Each store call is bounded by a timeout
//! reported as the error kind of the operation that timed out.

mod error;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

pub use error::{GatewayError, GatewayResult};

use crate::{
    namespace::{Namespace, ObjectKey},
    storage::{ObjectStore, StoreError, StoreResult},
};

/// Default number of objects returned by a listing
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Default signed URL lifetime
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// Default bound for a single store call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for [`ImageGateway`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Lifetime of signed URLs
    pub signed_url_ttl: Duration,
    /// Maximum number of objects per listing
    pub list_limit: usize,
    /// Bound applied to every store call
    pub call_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
            list_limit: DEFAULT_LIST_LIMIT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Object as listed in a namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedObject {
    /// Key within the namespace
    pub key: ObjectKey,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Temporary read access to one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// Key within the namespace
    pub key: ObjectKey,
    /// Capability-bearing URL
    pub url: String,
    /// Lifetime the URL was signed for
    pub expires_in: Duration,
    /// Point in time after which the URL stops working
    pub expires_at: DateTime<Utc>,
}

/// Namespace-scoped access to the object store
pub struct ImageGateway {
    store: Arc<dyn ObjectStore>,
    config: GatewayConfig,
}

impl ImageGateway {
    /// Creates a gateway over `store`
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, config: GatewayConfig) -> Self {
        Self { store, config }
    }

    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        tokio::time::timeout(self.config.call_timeout, call)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.config.call_timeout)))
    }

    /// Lists the namespace, newest first, capped at the configured limit
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::List` if the store cannot be listed or the call times out
    #[instrument(skip(self), fields(namespace = %namespace))]
    pub async fn list(&self, namespace: &Namespace) -> GatewayResult<Vec<ListedObject>> {
        let entries = self
            .bounded(self.store.list(&namespace.prefix(), self.config.list_limit))
            .await
            .map_err(GatewayError::List)?;

        let mut objects: Vec<ListedObject> = entries
            .into_iter()
            .filter_map(|entry| match namespace.key_from_path(&entry.path) {
                Some(key) => Some(ListedObject {
                    key,
                    created_at: entry.created_at,
                }),
                None => {
                    warn!("Ignoring foreign path in listing: {}", entry.path);
                    None
                }
            })
            .collect();

        objects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        objects.truncate(self.config.list_limit);

        Ok(objects)
    }

    /// Signs one object of the namespace
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Sign` if the store refuses or the call times out
    pub async fn sign(&self, namespace: &Namespace, key: &ObjectKey) -> GatewayResult<SignedUrl> {
        let ttl = self.config.signed_url_ttl;
        let url = self
            .bounded(self.store.create_signed_url(&namespace.full_path(key), ttl))
            .await
            .map_err(|source| GatewayError::Sign {
                key: key.to_string(),
                source,
            })?;

        Ok(SignedUrl {
            key: key.clone(),
            url,
            expires_in: ttl,
            expires_at: Utc::now() + ttl,
        })
    }

    /// Lists the namespace and signs every entry concurrently
    ///
    /// Output keeps the listing order. Entries that fail to sign are dropped; the rest of
    /// the listing is still returned.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::List` if the listing itself fails
    #[instrument(skip(self), fields(namespace = %namespace))]
    pub async fn list_signed(&self, namespace: &Namespace) -> GatewayResult<Vec<SignedUrl>> {
        let objects = self.list(namespace).await?;

        let results = join_all(objects.iter().map(|object| self.sign(namespace, &object.key))).await;

        let signed: Vec<SignedUrl> = results
            .into_iter()
            .filter_map(|result| {
                result
                    .map_err(|e| warn!("Dropping unsigned item from listing: {e}"))
                    .ok()
            })
            .collect();

        debug!("Signed {} of {} listed objects", signed.len(), objects.len());

        Ok(signed)
    }

    /// Stores a new image under a freshly generated key
    ///
    /// The object is stored with `content_type` as reported by the client. When it is
    /// absent or unparsable, the type is derived from the key's extension.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Upload` if the store rejects the object or the call times out
    #[instrument(skip(self, bytes), fields(namespace = %namespace, size = bytes.len()))]
    pub async fn upload(
        &self,
        namespace: &Namespace,
        original_filename: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> GatewayResult<ObjectKey> {
        let key = ObjectKey::generate(original_filename);
        let content_type = content_type
            .and_then(|raw| raw.parse::<mime::Mime>().ok())
            .unwrap_or_else(|| key.content_type());

        self.bounded(
            self.store
                .upload(&namespace.full_path(&key), bytes, content_type.as_ref()),
        )
        .await
        .map_err(GatewayError::Upload)?;

        info!("Uploaded {key} as {content_type}");

        Ok(key)
    }

    /// Removes one object of the namespace
    ///
    /// Signed URLs already handed out are not revoked and stay usable until they expire.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Delete` if the store rejects the removal or the call times out
    #[instrument(skip(self), fields(namespace = %namespace))]
    pub async fn remove(&self, namespace: &Namespace, key: &ObjectKey) -> GatewayResult<()> {
        self.bounded(self.store.remove(&[namespace.full_path(key)]))
            .await
            .map_err(|source| GatewayError::Delete {
                key: key.to_string(),
                source,
            })?;

        info!("Removed {key}");

        Ok(())
    }
}
