//! File Store Abstraction
//!
//! The export pipeline materializes non-file sources (in-memory blobs,
//! downloaded payloads) into real files the encoder can open. This module
//! defines the collaborator trait for that, a session-scoped temp-directory
//! implementation, and output path validation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ExportError, ExportResult};
use crate::types::SessionId;

// =============================================================================
// FileStore trait
// =============================================================================

/// Storage collaborator used to materialize source payloads as files.
///
/// Engines that require file-backed inputs refuse to construct when no
/// store is available; the selector then falls back to the next tier.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Writes `bytes` to a new temp file with the given preferred file name
    /// and returns its absolute path.
    async fn save_temp(&self, file_name: &str, bytes: &[u8]) -> ExportResult<PathBuf>;

    /// Checks that a previously returned or user-supplied path still exists.
    async fn file_exists(&self, path: &Path) -> bool;
}

// =============================================================================
// TempFileStore
// =============================================================================

/// Session-scoped temp store: all files live under one directory named by
/// the export session id, removed as a unit when the session ends.
pub struct TempFileStore {
    root: PathBuf,
}

impl TempFileStore {
    /// Creates the session temp directory under the OS temp dir.
    pub fn new(session_id: &SessionId) -> ExportResult<Self> {
        let root = std::env::temp_dir().join(format!("reelcut-export-{}", session_id));
        std::fs::create_dir_all(&root)?;
        debug!("Created session temp directory: {}", root.display());
        Ok(Self { root })
    }

    /// Creates a store rooted at an explicit directory (tests).
    pub fn at(root: PathBuf) -> ExportResult<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Removes the whole session directory. Failure is logged, not fatal:
    /// the OS temp dir is cleaned eventually anyway.
    pub fn cleanup(&self) {
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove session temp directory {}: {}",
                    self.root.display(),
                    e
                );
            }
        }
    }
}

impl Drop for TempFileStore {
    // Materialized sources must not outlive the export session.
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[async_trait]
impl FileStore for TempFileStore {
    async fn save_temp(&self, file_name: &str, bytes: &[u8]) -> ExportResult<PathBuf> {
        // Prefix with a fresh ulid so identical element file names never collide.
        let name = format!("{}-{}", ulid::Ulid::new(), sanitize_file_name(file_name));
        let path = self.root.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    async fn file_exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

/// Strips path separators and control characters from a preferred file name.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

// =============================================================================
// Output path validation
// =============================================================================

/// Validates an export output path before the encoder is spawned.
///
/// The parent directory must exist and the file name must be non-empty;
/// catching this up front gives a clearer error than an encoder exit code.
pub fn validate_output_path(path: &Path) -> ExportResult<()> {
    if path.file_name().map(|n| n.is_empty()).unwrap_or(true) {
        return Err(ExportError::InvalidSettings(format!(
            "Output path has no file name: {}",
            path.display()
        )));
    }

    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Ok(()),
        Some(parent) => {
            if parent.is_dir() {
                Ok(())
            } else {
                Err(ExportError::InvalidSettings(format!(
                    "Output directory does not exist: {}",
                    parent.display()
                )))
            }
        }
        None => Ok(()),
    }
}
