//! Gallery view-model
//!
//! Orchestrates identity, namespace and gateway for one mounted gallery page. The listing
//! flow moves `Idle -> Loading -> Ready`; uploads move `Idle -> Uploading -> Idle`; deletes
//! pass through an explicit pending confirmation.

mod state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub use state::{GalleryItem, GalleryState, ListingState, SelectedFile, UploadState};

use crate::{
    gateway::ImageGateway,
    identity::{IdentityResolver, Principal},
    namespace::{KeyError, Namespace, ObjectKey},
};

/// Status shown after a successful upload
pub const UPLOAD_SUCCEEDED: &str = "Upload succeeded";
/// Status shown when upload is triggered without a file
pub const SELECT_A_FILE: &str = "Please select a file";
/// Status shown when an operation needs a session
pub const SIGN_IN_REQUIRED: &str = "Please sign in";
/// Status shown when the picked file is not an image
pub const IMAGES_ONLY: &str = "Only image files can be uploaded";

/// Result of a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Listing replaced; unsigned items were left out
    Refreshed {
        /// Items now rendered
        items: usize,
    },
    /// Another refresh was in flight and will pick this request up
    Coalesced,
    /// No session; nothing was requested from the store
    SignedOut,
    /// Listing failed; previous items were kept
    Failed,
}

/// Result of an upload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Stored under the returned key
    Uploaded(ObjectKey),
    /// No file selected
    NoFile,
    /// No session
    SignedOut,
    /// An upload is already in flight
    Busy,
    /// Store rejected the upload; the file stays selected
    Failed,
}

/// Result of resolving a pending delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Object removed
    Deleted(ObjectKey),
    /// User declined; nothing was removed
    Cancelled,
    /// There was no pending delete
    NothingPending,
    /// No session
    SignedOut,
    /// Store rejected the removal; listing left as is
    Failed,
}

/// Where the entry view sends the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Signed in
    Dashboard,
    /// Signed out
    SignIn,
}

impl Route {
    /// Path of the target view
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/dashboard",
            Self::SignIn => "/login",
        }
    }
}

/// Resolves the identity once and picks the view to redirect to
pub async fn entry_route(identity: &dyn IdentityResolver) -> Route {
    match identity.current_principal().await {
        Some(_) => Route::Dashboard,
        None => Route::SignIn,
    }
}

/// View-model of the gallery page
pub struct GalleryViewModel {
    identity: Arc<dyn IdentityResolver>,
    gateway: Arc<ImageGateway>,
    state: Mutex<GalleryState>,
    refresh_lock: Mutex<()>,
    refresh_requested: AtomicBool,
}

impl GalleryViewModel {
    /// Creates a view-model over injected identity and gateway
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityResolver>, gateway: Arc<ImageGateway>) -> Self {
        Self {
            identity,
            gateway,
            state: Mutex::new(GalleryState::default()),
            refresh_lock: Mutex::new(()),
            refresh_requested: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current state
    pub async fn state(&self) -> GalleryState {
        self.state.lock().await.clone()
    }

    /// Rendered items
    pub async fn items(&self) -> Vec<GalleryItem> {
        self.state.lock().await.items.clone()
    }

    async fn namespace(&self) -> Option<Namespace> {
        self.identity
            .current_principal()
            .await
            .as_ref()
            .map(Namespace::for_principal)
    }

    /// Reloads the listing
    ///
    /// Refreshes never overlap. A request arriving while one is in flight returns
    /// [`RefreshOutcome::Coalesced`] and the in-flight refresh runs once more after it
    /// finishes, so the final listing always reflects the latest mutation.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.refresh_requested.store(true, Ordering::SeqCst);

        let mut outcome = None;
        loop {
            let Ok(guard) = self.refresh_lock.try_lock() else {
                return outcome.unwrap_or(RefreshOutcome::Coalesced);
            };

            while self.refresh_requested.swap(false, Ordering::SeqCst) {
                outcome = Some(self.refresh_once().await);
            }

            drop(guard);

            if !self.refresh_requested.load(Ordering::SeqCst) {
                return outcome.unwrap_or(RefreshOutcome::Coalesced);
            }
        }
    }

    async fn refresh_once(&self) -> RefreshOutcome {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut state.listing, ListingState::Loading)
        };

        let Some(namespace) = self.namespace().await else {
            debug!("No signed-in principal, skipping listing");
            self.state.lock().await.listing = previous;
            return RefreshOutcome::SignedOut;
        };

        match self.gateway.list_signed(&namespace).await {
            Ok(signed) => {
                let items: Vec<GalleryItem> = signed
                    .into_iter()
                    .map(|signed| GalleryItem {
                        name: signed.key.to_string(),
                        url: signed.url,
                    })
                    .collect();
                let count = items.len();

                let mut state = self.state.lock().await;
                state.items = items;
                state.listing = ListingState::Ready;

                RefreshOutcome::Refreshed { items: count }
            }
            Err(e) => {
                error!("Refresh failed, keeping previous listing: {e}");
                self.state.lock().await.listing = previous;
                RefreshOutcome::Failed
            }
        }
    }

    /// Picks a file for the next upload
    ///
    /// Returns `false` and leaves the selection unchanged if the file is not an image.
    pub async fn select_file(&self, file: SelectedFile) -> bool {
        let mut state = self.state.lock().await;

        if !file.is_image() {
            state.message = Some(IMAGES_ONLY.to_string());
            return false;
        }

        state.selected_file = Some(file);
        true
    }

    /// Drops the selected file
    pub async fn clear_file(&self) {
        self.state.lock().await.selected_file = None;
    }

    /// Uploads the selected file
    ///
    /// On success the selection is cleared and the listing refreshed. On failure the file
    /// stays selected so the user can retry, and no refresh happens.
    pub async fn upload(&self) -> UploadOutcome {
        let file = {
            let mut state = self.state.lock().await;
            if state.upload == UploadState::Uploading {
                return UploadOutcome::Busy;
            }

            let Some(file) = state
                .selected_file
                .clone()
                .filter(|file| !file.bytes.is_empty())
            else {
                state.message = Some(SELECT_A_FILE.to_string());
                return UploadOutcome::NoFile;
            };

            state.upload = UploadState::Uploading;
            file
        };

        let Some(namespace) = self.namespace().await else {
            let mut state = self.state.lock().await;
            state.upload = UploadState::Idle;
            state.message = Some(SIGN_IN_REQUIRED.to_string());
            return UploadOutcome::SignedOut;
        };

        let result = self
            .gateway
            .upload(
                &namespace,
                &file.name,
                file.bytes.clone(),
                Some(file.content_type.as_str()),
            )
            .await;

        match result {
            Ok(key) => {
                {
                    let mut state = self.state.lock().await;
                    state.upload = UploadState::Idle;
                    if state.selected_file.as_ref() == Some(&file) {
                        state.selected_file = None;
                    }
                    state.message = Some(UPLOAD_SUCCEEDED.to_string());
                }

                self.refresh().await;
                UploadOutcome::Uploaded(key)
            }
            Err(e) => {
                warn!("Upload failed: {e}");
                let mut state = self.state.lock().await;
                state.upload = UploadState::Idle;
                state.message = Some(format!("Upload failed: {}", e.detail()));
                UploadOutcome::Failed
            }
        }
    }

    /// Asks for confirmation before deleting `name`
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if `name` is not a valid object key
    pub async fn request_delete(&self, name: &str) -> Result<(), KeyError> {
        let key = ObjectKey::parse(name)?;
        self.state.lock().await.pending_delete = Some(key);
        Ok(())
    }

    /// Answers the pending confirmation prompt
    pub async fn resolve_delete(&self, confirmed: bool) -> DeleteOutcome {
        if confirmed {
            self.confirm_delete().await
        } else {
            self.cancel_delete().await
        }
    }

    /// Declines the pending delete
    pub async fn cancel_delete(&self) -> DeleteOutcome {
        match self.state.lock().await.pending_delete.take() {
            Some(_) => DeleteOutcome::Cancelled,
            None => DeleteOutcome::NothingPending,
        }
    }

    /// Confirms the pending delete and removes the object
    ///
    /// On success the listing is refreshed. On failure an alert is raised and the listing
    /// is left untouched until the next refresh.
    pub async fn confirm_delete(&self) -> DeleteOutcome {
        let Some(key) = self.state.lock().await.pending_delete.take() else {
            return DeleteOutcome::NothingPending;
        };

        let Some(namespace) = self.namespace().await else {
            self.state.lock().await.alert = Some(SIGN_IN_REQUIRED.to_string());
            return DeleteOutcome::SignedOut;
        };

        match self.gateway.remove(&namespace, &key).await {
            Ok(()) => {
                info!("Deleted {key}");
                self.refresh().await;
                DeleteOutcome::Deleted(key)
            }
            Err(e) => {
                warn!("Delete failed: {e}");
                self.state.lock().await.alert = Some(format!("Delete failed: {}", e.detail()));
                DeleteOutcome::Failed
            }
        }
    }

    /// Clears the alert after the user acknowledged it
    pub async fn dismiss_alert(&self) {
        self.state.lock().await.alert = None;
    }

    /// Principal the view-model currently acts for
    pub async fn principal(&self) -> Option<Principal> {
        self.identity.current_principal().await
    }
}
