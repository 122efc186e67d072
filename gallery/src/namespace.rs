//! Per-principal storage namespacing and object key generation
//!
//! Every object a principal owns lives under `{principal.id}/`. Keys handed back by
//! clients are re-validated before use so a key can never reach outside its namespace.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::identity::Principal;

/// Maximum accepted length of an object key
pub const MAX_KEY_LEN: usize = 128;

/// Maximum number of extension characters carried into a generated key
const MAX_EXTENSION_LEN: usize = 16;

/// Reasons a client-supplied object key is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Key is empty
    #[error("Object key is empty")]
    Empty,

    /// Key exceeds [`MAX_KEY_LEN`]
    #[error("Object key is {0} bytes long, maximum is {max}", max = MAX_KEY_LEN)]
    TooLong(usize),

    /// Key contains a path separator, a relative path segment or a disallowed character
    #[error("Object key contains illegal characters: {0}")]
    IllegalCharacters(String),
}

/// Storage path prefix scoping the objects a principal may list, sign or delete
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// Namespace isolated to a single principal
    #[must_use]
    pub fn for_principal(principal: &Principal) -> Self {
        Self(principal.id.clone())
    }

    /// Listing prefix, including the trailing separator
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}/", self.0)
    }

    /// Full object path: `namespace + "/" + key`
    #[must_use]
    pub fn full_path(&self, key: &ObjectKey) -> String {
        format!("{}/{}", self.0, key.as_str())
    }

    /// Recovers the object key from a full path, if the path belongs to this namespace
    #[must_use]
    pub fn key_from_path(&self, path: &str) -> Option<ObjectKey> {
        path.strip_prefix(&self.prefix())
            .and_then(|key| ObjectKey::parse(key).ok())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of a stored image within its namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Generates a fresh key: a random UUID plus the original file's extension
    ///
    /// The extension is the text after the last `.` of the file name, restricted to ASCII
    /// alphanumerics. A name without a `.` produces a key with a trailing empty extension
    /// (`{uuid}.`). The original file name is never part of the key.
    #[must_use]
    pub fn generate(original_filename: &str) -> Self {
        let file_name = original_filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(original_filename);

        let extension: String = file_name
            .rsplit_once('.')
            .map_or("", |(_, ext)| ext)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(MAX_EXTENSION_LEN)
            .collect();

        Self(format!("{}.{extension}", Uuid::new_v4()))
    }

    /// Validates a key received from a client
    ///
    /// # Errors
    ///
    /// Returns `KeyError` for empty, overlong or path-like keys
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        if raw.is_empty() {
            return Err(KeyError::Empty);
        }

        if raw.len() > MAX_KEY_LEN {
            return Err(KeyError::TooLong(raw.len()));
        }

        let allowed = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if !allowed || raw.starts_with('.') {
            return Err(KeyError::IllegalCharacters(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    /// Key as stored
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extension part of the key, empty when the key ends with `.` or has none
    #[must_use]
    pub fn extension(&self) -> &str {
        self.0.rsplit_once('.').map_or("", |(_, ext)| ext)
    }

    /// Image content type implied by the extension
    #[must_use]
    pub fn content_type(&self) -> mime::Mime {
        match self.extension().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => mime::IMAGE_JPEG,
            "png" => mime::IMAGE_PNG,
            "gif" => mime::IMAGE_GIF,
            "bmp" => mime::IMAGE_BMP,
            "svg" => mime::IMAGE_SVG,
            "webp" => "image/webp"
                .parse()
                .unwrap_or(mime::APPLICATION_OCTET_STREAM),
            "avif" => "image/avif"
                .parse()
                .unwrap_or(mime::APPLICATION_OCTET_STREAM),
            _ => mime::APPLICATION_OCTET_STREAM,
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
