//! In-process object store for local development and tests
//!
//! Signed URLs use the `memory://` scheme and carry an HMAC-SHA256 over the path and
//! expiry, so they can be checked with [`MemoryObjectStore::resolve_signed_url`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::sync::RwLock;
use url::Url;

use super::{ObjectEntry, ObjectStore, StoreError, StoreResult};

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "memory";
const HOST: &str = "gallery";

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Bytes,
    content_type: String,
    created_at: DateTime<Utc>,
    sequence: u64,
}

/// Object store holding everything in memory
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    signing_key: Vec<u8>,
    sequence: AtomicU64,
}

impl MemoryObjectStore {
    /// Creates an empty store signing URLs with `signing_key`
    #[must_use]
    pub fn new(signing_key: impl Into<Vec<u8>>) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            signing_key: signing_key.into(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an empty store with a random signing key
    #[must_use]
    pub fn with_random_key() -> Self {
        Self::new(rand::random::<[u8; 32]>().to_vec())
    }

    /// Whether an object exists at `path`
    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    /// All stored paths, in key order
    pub async fn paths(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// Checks a signed URL and returns the object's content type and bytes
    ///
    /// Returns `None` for foreign, tampered or expired URLs and for objects that no longer
    /// exist.
    pub async fn resolve_signed_url(&self, signed_url: &str) -> Option<(String, Bytes)> {
        let url = Url::parse(signed_url).ok()?;
        if url.scheme() != SCHEME || url.host_str() != Some(HOST) {
            return None;
        }
        let path = url.path().strip_prefix('/')?.to_string();

        let mut expires = None;
        let mut signature = None;
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "expires" => expires = value.parse::<i64>().ok(),
                "signature" => signature = hex::decode(value.as_bytes()).ok(),
                _ => {}
            }
        }
        let (expires, signature) = (expires?, signature?);

        if expires < Utc::now().timestamp() {
            return None;
        }

        self.mac(&path, expires)?.verify_slice(&signature).ok()?;

        let objects = self.objects.read().await;
        let object = objects.get(&path)?;
        Some((object.content_type.clone(), object.bytes.clone()))
    }

    fn mac(&self, path: &str, expires: i64) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key).ok()?;
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Some(mac)
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::with_random_key()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<ObjectEntry>> {
        let objects = self.objects.read().await;

        let mut entries: Vec<(&String, &StoredObject)> = objects
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .collect();

        entries.sort_by(|(_, a), (_, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.sequence.cmp(&a.sequence))
        });

        Ok(entries
            .into_iter()
            .take(limit)
            .map(|(path, object)| ObjectEntry {
                path: path.clone(),
                created_at: object.created_at,
            })
            .collect())
    }

    async fn create_signed_url(&self, path: &str, ttl: Duration) -> StoreResult<String> {
        if !self.contains(path).await {
            return Err(StoreError::NotFound(path.to_string()));
        }

        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| StoreError::ConfigError(format!("Signed URL TTL too large: {ttl:?}")))?;
        let expires = Utc::now().timestamp().saturating_add(ttl_secs);

        let mac = self
            .mac(path, expires)
            .ok_or_else(|| StoreError::ConfigError("Invalid signing key".to_string()))?;
        let signature = hex::encode(mac.finalize().into_bytes());

        let mut url = Url::parse(&format!("{SCHEME}://{HOST}/{path}"))
            .map_err(|e| StoreError::ConfigError(format!("Invalid object path {path}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &signature);

        Ok(url.to_string())
    }

    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> StoreResult<()> {
        let object = StoredObject {
            bytes,
            content_type: content_type.to_string(),
            created_at: Utc::now(),
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };

        self.objects.write().await.insert(path.to_string(), object);

        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> StoreResult<()> {
        let mut objects = self.objects.write().await;
        for path in paths {
            objects.remove(path);
        }

        Ok(())
    }
}
