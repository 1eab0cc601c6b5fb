//! Media asset records and the shared asset store.
//!
//! An asset is created once (by import, generation, or export) and never
//! modified afterwards. The store is the only state shared between the
//! editor and the rest of the application, and it only grows.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// What kind of media an asset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
}

impl AssetKind {
    /// Infer the kind from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "webm" | "mov" | "mkv" | "m4v" => Some(AssetKind::Video),
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" => Some(AssetKind::Image),
            _ => None,
        }
    }

    /// Infer the kind from a MIME type such as `video/mp4` or `image/png`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let top = mime.split('/').next()?.trim();
        match top {
            "video" => Some(AssetKind::Video),
            "image" => Some(AssetKind::Image),
            _ => None,
        }
    }
}

/// An immutable media record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Image or video.
    pub kind: AssetKind,

    /// Locator: a filesystem path, a `file://` URL, or a `data:` URL.
    pub source: String,

    /// Origin prompt or file name.
    pub label: String,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

impl Asset {
    /// Create a new asset with a fresh id and the current timestamp.
    pub fn new(kind: AssetKind, source: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            source: source.into(),
            label: label.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Import a local media file as a new asset labelled with its file name.
    pub fn import_file(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AssetError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let kind = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(AssetKind::from_extension)
            .ok_or_else(|| AssetError::UnsupportedType {
                path: path.to_path_buf(),
            })?;

        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Ok(Self::new(kind, absolute.to_string_lossy(), label))
    }

    /// Resolve the locator to a filesystem path, if it names one.
    ///
    /// Returns `None` for `data:` URLs.
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.is_data_url() {
            return None;
        }
        let raw = self.source.strip_prefix("file://").unwrap_or(&self.source);
        Some(PathBuf::from(raw))
    }

    /// Whether the locator is an inline `data:` URL.
    pub fn is_data_url(&self) -> bool {
        self.source.starts_with("data:")
    }
}

/// Errors raised while creating assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Unsupported media type: {path} (expected a video/* or image/* file)")]
    UnsupportedType { path: PathBuf },
}

/// Ordered, append-only collection of assets.
///
/// Cloning the store produces another handle onto the same collection.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    inner: Arc<RwLock<VecDeque<Asset>>>,
}

impl AssetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All assets, most recent first.
    pub fn list(&self) -> Vec<Asset> {
        match self.inner.read() {
            Ok(assets) => assets.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Add a newly created asset at the front.
    pub fn append(&self, asset: Asset) {
        let mut assets = match self.inner.write() {
            Ok(assets) => assets,
            Err(poisoned) => poisoned.into_inner(),
        };
        assets.push_front(asset);
    }

    /// Look up an asset by id.
    pub fn get(&self, id: &str) -> Option<Asset> {
        self.list().into_iter().find(|a| a.id == id)
    }

    /// Number of assets in the store.
    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(assets) => assets.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Whether the store holds no assets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
