//! Test doubles for the identity provider and the object store

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, RwLock, Semaphore};

use crate::{
    identity::{IdentityResolver, Principal},
    storage::{MemoryObjectStore, ObjectEntry, ObjectStore, StoreError, StoreResult},
};

/// Identity resolver returning whatever principal it was last given
#[derive(Default)]
pub struct StaticIdentity {
    principal: RwLock<Option<Principal>>,
    lookups: AtomicUsize,
}

impl StaticIdentity {
    /// Resolver signed in as `id`
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a valid principal id
    #[must_use]
    pub fn signed_in(id: &str) -> Self {
        Self {
            principal: RwLock::new(Some(Principal::new(id).expect("valid principal id"))),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Resolver without a session
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Replaces the current principal
    pub async fn set(&self, principal: Option<Principal>) {
        *self.principal.write().await = principal;
    }

    /// Number of `current_principal` calls so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentity {
    async fn current_principal(&self) -> Option<Principal> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.principal.read().await.clone()
    }
}

/// Counts of calls that reached the wrapped store
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    /// `list` calls
    pub list: usize,
    /// `create_signed_url` calls
    pub sign: usize,
    /// `upload` calls
    pub upload: usize,
    /// `remove` calls
    pub remove: usize,
}

impl CallCounts {
    /// Sum of all calls
    #[must_use]
    pub const fn total(&self) -> usize {
        self.list + self.sign + self.upload + self.remove
    }
}

/// [`MemoryObjectStore`] wrapper with call counting, fault injection and latency control
pub struct InstrumentedStore {
    inner: Arc<MemoryObjectStore>,
    list_calls: AtomicUsize,
    sign_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    remove_calls: AtomicUsize,
    fail_list: AtomicBool,
    fail_upload: AtomicBool,
    fail_remove: AtomicBool,
    fail_sign_suffixes: Mutex<HashSet<String>>,
    sign_delays: Mutex<HashMap<String, Duration>>,
    store_delay: Mutex<Option<Duration>>,
    list_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl InstrumentedStore {
    /// Wraps a fresh in-memory store
    #[must_use]
    pub fn new() -> Self {
        Self::wrapping(Arc::new(MemoryObjectStore::with_random_key()))
    }

    /// Wraps an existing in-memory store
    #[must_use]
    pub fn wrapping(inner: Arc<MemoryObjectStore>) -> Self {
        Self {
            inner,
            list_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
            fail_list: AtomicBool::new(false),
            fail_upload: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
            fail_sign_suffixes: Mutex::new(HashSet::new()),
            sign_delays: Mutex::new(HashMap::new()),
            store_delay: Mutex::new(None),
            list_gate: Mutex::new(None),
        }
    }

    /// The wrapped store
    #[must_use]
    pub fn inner(&self) -> &MemoryObjectStore {
        &self.inner
    }

    /// Calls that reached the store so far
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            list: self.list_calls.load(Ordering::SeqCst),
            sign: self.sign_calls.load(Ordering::SeqCst),
            upload: self.upload_calls.load(Ordering::SeqCst),
            remove: self.remove_calls.load(Ordering::SeqCst),
        }
    }

    /// Makes every `list` call fail
    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Makes every `upload` call fail
    pub fn fail_upload(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    /// Makes every `remove` call fail
    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    /// Makes signing fail for paths ending in `suffix`
    pub async fn fail_sign_for(&self, suffix: &str) {
        self.fail_sign_suffixes
            .lock()
            .await
            .insert(suffix.to_string());
    }

    /// Delays signing of paths ending in `suffix`
    pub async fn delay_sign_for(&self, suffix: &str, delay: Duration) {
        self.sign_delays
            .lock()
            .await
            .insert(suffix.to_string(), delay);
    }

    /// Delays every call by `delay`
    pub async fn delay_all(&self, delay: Duration) {
        *self.store_delay.lock().await = Some(delay);
    }

    /// Blocks `list` calls until [`Self::open_list_gate`] releases them
    pub async fn close_list_gate(&self) {
        *self.list_gate.lock().await = Some(Arc::new(Semaphore::new(0)));
    }

    /// Releases `permits` blocked or future `list` calls
    pub async fn open_list_gate(&self, permits: usize) {
        if let Some(gate) = self.list_gate.lock().await.as_ref() {
            gate.add_permits(permits);
        }
    }

    async fn pause(&self) {
        let delay = *self.store_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for InstrumentedStore {
    fn default() -> Self {
        Self::new()
    }
}

fn injected(operation: &str) -> StoreError {
    StoreError::S3Error(format!("injected {operation} failure"))
}

#[async_trait]
impl ObjectStore for InstrumentedStore {
    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<ObjectEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        let gate = self.list_gate.lock().await.clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if self.fail_list.load(Ordering::SeqCst) {
            return Err(injected("list"));
        }
        self.inner.list(prefix, limit).await
    }

    async fn create_signed_url(&self, path: &str, ttl: Duration) -> StoreResult<String> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        let delay = self
            .sign_delays
            .lock()
            .await
            .iter()
            .find(|(suffix, _)| path.ends_with(suffix.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let fails = self
            .fail_sign_suffixes
            .lock()
            .await
            .iter()
            .any(|suffix| path.ends_with(suffix.as_str()));
        if fails {
            return Err(injected("sign"));
        }
        self.inner.create_signed_url(path, ttl).await
    }

    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> StoreResult<()> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(injected("upload"));
        }
        self.inner.upload(path, bytes, content_type).await
    }

    async fn remove(&self, paths: &[String]) -> StoreResult<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(injected("remove"));
        }
        self.inner.remove(paths).await
    }
}
