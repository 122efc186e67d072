//! Observable state of the gallery page

use bytes::Bytes;
use serde::Serialize;
use strum::Display;

use crate::namespace::ObjectKey;

/// Listing flow state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListingState {
    /// Nothing loaded yet
    #[default]
    Idle,
    /// A refresh is in flight
    Loading,
    /// Items reflect the last successful refresh
    Ready,
}

/// Upload flow state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    /// Upload control enabled
    #[default]
    Idle,
    /// Upload in flight, control disabled
    Uploading,
}

/// One rendered image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryItem {
    /// Object key
    pub name: String,
    /// Signed URL
    pub url: String,
}

/// File picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Original file name, only used for its extension
    pub name: String,
    /// Content type reported by the picker
    pub content_type: String,
    /// File contents
    pub bytes: Bytes,
}

impl SelectedFile {
    /// Creates a selected file
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Whether the picker's image filter admits this file
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type
            .parse::<mime::Mime>()
            .is_ok_and(|mime| mime.type_() == mime::IMAGE)
    }
}

/// Snapshot of everything the page renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryState {
    /// Listing flow state
    pub listing: ListingState,
    /// Upload flow state
    pub upload: UploadState,
    /// Rendered images, newest first
    pub items: Vec<GalleryItem>,
    /// Status line
    pub message: Option<String>,
    /// Blocking alert raised by a failed delete
    pub alert: Option<String>,
    /// File waiting to be uploaded
    pub selected_file: Option<SelectedFile>,
    /// Delete awaiting confirmation
    pub pending_delete: Option<ObjectKey>,
}
