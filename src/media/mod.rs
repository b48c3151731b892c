//! Media Catalog and Source Resolution
//!
//! Catalog entries describe imported media and where its bytes live. An
//! entry may carry several locators at once (a local path from import, a
//! cached blob, an original URL); resolution tries them in a fixed order
//! and materializes non-file payloads into the session temp store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ExportError, ExportResult};
use crate::fs::FileStore;
use crate::types::{MediaId, TimeSec};

/// Timeout for downloading a single remote source.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// Catalog types
// =============================================================================

/// Media kind, fixed at import time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    /// Default file extension used when materializing a payload whose
    /// original name carries none.
    fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "m4a",
            MediaKind::Image => "png",
        }
    }
}

/// One imported media entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: MediaId,
    pub name: String,
    pub kind: MediaKind,
    /// Intrinsic duration in seconds (images have none)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<TimeSec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Absolute path on disk, when the bytes were imported as a file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// In-memory payload (pasted/generated media, session cache)
    #[serde(skip)]
    pub blob: Option<Vec<u8>>,
    /// Original remote URL, kept as a last-resort locator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl MediaItem {
    pub fn from_path(name: &str, kind: MediaKind, path: PathBuf) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
            kind,
            duration: None,
            width: None,
            height: None,
            local_path: Some(path),
            blob: None,
            url: None,
        }
    }

    pub fn from_blob(name: &str, kind: MediaKind, bytes: Vec<u8>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
            kind,
            duration: None,
            width: None,
            height: None,
            local_path: None,
            blob: Some(bytes),
            url: None,
        }
    }

    pub fn from_url(name: &str, kind: MediaKind, url: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
            kind,
            duration: None,
            width: None,
            height: None,
            local_path: None,
            blob: None,
            url: Some(url.to_string()),
        }
    }

    /// File name to use when materializing this entry's payload.
    fn materialized_name(&self) -> String {
        if Path::new(&self.name).extension().is_some() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.kind.default_extension())
        }
    }
}

/// In-memory catalog keyed by media id.
#[derive(Clone, Debug, Default)]
pub struct MediaCatalog {
    items: std::collections::HashMap<MediaId, MediaItem>,
}

impl MediaCatalog {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&MediaItem> {
        self.items.get(id)
    }

    pub fn insert(&mut self, item: MediaItem) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Source resolution
// =============================================================================

/// A resolved, file-backed source ready for the encoder.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSource {
    pub path: PathBuf,
    /// True when the file was materialized into the session temp store
    /// (and will be removed with it), false for user files.
    pub materialized: bool,
}

/// Resolves a catalog entry to an openable file path.
///
/// Locators are tried in order: local path, cached blob, remote URL.
/// A locator that fails (file deleted, download error) logs a warning and
/// falls through to the next; only when all are exhausted does this fail.
pub async fn resolve_source(
    item: &MediaItem,
    store: &dyn FileStore,
) -> ExportResult<ResolvedSource> {
    if let Some(path) = &item.local_path {
        if store.file_exists(path).await {
            return Ok(ResolvedSource {
                path: path.clone(),
                materialized: false,
            });
        }
        warn!(
            "Local path for media '{}' no longer exists: {}",
            item.name,
            path.display()
        );
    }

    // An empty cached blob is not usable; fall through to the URL.
    if let Some(bytes) = item.blob.as_deref().filter(|b| !b.is_empty()) {
        let path = store.save_temp(&item.materialized_name(), bytes).await?;
        debug!(
            "Materialized blob for media '{}' at {}",
            item.name,
            path.display()
        );
        return Ok(ResolvedSource {
            path,
            materialized: true,
        });
    }

    if let Some(url) = &item.url {
        match download(url).await {
            Ok(bytes) => {
                let path = store.save_temp(&item.materialized_name(), &bytes).await?;
                debug!(
                    "Downloaded media '{}' ({} bytes) to {}",
                    item.name,
                    bytes.len(),
                    path.display()
                );
                return Ok(ResolvedSource {
                    path,
                    materialized: true,
                });
            }
            Err(e) => {
                warn!("Failed to download media '{}' from {}: {}", item.name, url, e);
            }
        }
    }

    Err(ExportError::SourceUnavailable(format!(
        "No usable locator for media '{}'",
        item.name
    )))
}

async fn download(url: &str) -> ExportResult<Vec<u8>> {
    let fut = async {
        let response = reqwest::get(url)
            .await
            .map_err(|e| ExportError::SourceUnavailable(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| ExportError::SourceUnavailable(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExportError::SourceUnavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    };

    tokio::time::timeout(DOWNLOAD_TIMEOUT, fut)
        .await
        .map_err(|_| ExportError::Timeout(format!("Download timed out: {}", url)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::TempFileStore;

    fn store() -> (tempfile::TempDir, TempFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TempFileStore::at(dir.path().join("session")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_resolve_prefers_local_path() {
        let (dir, store) = store();
        let file = dir.path().join("clip.mp4");
        tokio::fs::write(&file, b"data").await.unwrap();

        let mut item = MediaItem::from_path("clip.mp4", MediaKind::Video, file.clone());
        item.blob = Some(b"should not be used".to_vec());

        let resolved = resolve_source(&item, &store).await.unwrap();
        assert_eq!(resolved.path, file);
        assert!(!resolved.materialized);
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_blob() {
        let (dir, store) = store();
        // Local path points at a deleted file; blob must win.
        let mut item = MediaItem::from_blob("pasted", MediaKind::Image, b"imagedata".to_vec());
        item.local_path = Some(dir.path().join("gone.png"));

        let resolved = resolve_source(&item, &store).await.unwrap();
        assert!(resolved.materialized);
        assert_eq!(tokio::fs::read(&resolved.path).await.unwrap(), b"imagedata");
        assert_eq!(resolved.path.extension().unwrap(), "png");
    }

    #[tokio::test]
    async fn test_empty_blob_is_not_a_locator() {
        let (_dir, store) = store();
        // A zero-byte cached blob must not shadow the remaining locators
        // by materializing an empty file.
        let item = MediaItem::from_blob("hollow", MediaKind::Video, vec![]);

        let err = resolve_source(&item, &store).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SourceUnavailable);
        assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_no_locators_fails() {
        let (_dir, store) = store();
        let item = MediaItem {
            id: "m1".to_string(),
            name: "empty".to_string(),
            kind: MediaKind::Video,
            duration: None,
            width: None,
            height: None,
            local_path: None,
            blob: None,
            url: None,
        };

        let err = resolve_source(&item, &store).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SourceUnavailable);
    }

    #[test]
    fn test_materialized_name_adds_extension() {
        let item = MediaItem::from_blob("pasted", MediaKind::Video, vec![]);
        assert_eq!(item.materialized_name(), "pasted.mp4");

        let item = MediaItem::from_blob("clip.mov", MediaKind::Video, vec![]);
        assert_eq!(item.materialized_name(), "clip.mov");
    }

    #[test]
    fn test_catalog_lookup() {
        let item = MediaItem::from_blob("a", MediaKind::Audio, vec![]);
        let id = item.id.clone();
        let catalog = MediaCatalog::new(vec![item]);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(&id).is_some());
        assert!(catalog.get("missing").is_none());
    }
}
