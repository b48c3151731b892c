//! Reelcut Error Definitions
//!
//! Defines error types used throughout the export pipeline.
//!
//! Error policy (mirrors the propagation rules of the pipeline):
//! - Per-element extraction failures are absorbed by the extractor (logged
//!   and skipped); they never appear here.
//! - Missing collaborators trigger engine-tier fallback before becoming
//!   a user-visible error.
//! - Encoder process failures and "all sources failed" are the only hard
//!   failures surfaced to callers.
//! - Cancellation is a distinct outcome from failure.

use thiserror::Error;

/// Export pipeline error types
#[derive(Error, Debug)]
pub enum ExportError {
    // =========================================================================
    // Encoder Errors
    // =========================================================================
    #[error("Encoder not available. Install FFmpeg or ensure bundled binaries are present.")]
    EncoderNotAvailable,

    #[error("Failed to spawn encoder process: {0}")]
    SpawnFailed(String),

    #[error("Encoder process failed: {diagnostic}")]
    EncoderFailed {
        /// Captured stderr output from the encoder process
        diagnostic: String,
    },

    #[error("Encoder probe failed: {0}")]
    ProbeFailed(String),

    // =========================================================================
    // Extraction Errors
    // =========================================================================
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("All {attempted} source elements failed extraction")]
    AllSourcesFailed { attempted: usize },

    #[error("Required collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    // =========================================================================
    // Resource Errors
    // =========================================================================
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Export cancelled")]
    Cancelled,

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Export pipeline result type
pub type ExportResult<T> = Result<T, ExportError>;

impl ExportError {
    /// Machine-checkable error kind, stable across message changes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::EncoderNotAvailable => ErrorKind::EncoderUnavailable,
            ExportError::SpawnFailed(_) => ErrorKind::EncoderUnavailable,
            ExportError::EncoderFailed { .. } => ErrorKind::EncoderFailed,
            ExportError::ProbeFailed(_) => ErrorKind::EncoderFailed,
            ExportError::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            ExportError::AllSourcesFailed { .. } => ErrorKind::NoSources,
            ExportError::CollaboratorUnavailable(_) => ErrorKind::CollaboratorUnavailable,
            ExportError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            ExportError::Timeout(_) => ErrorKind::Timeout,
            ExportError::Cancelled => ErrorKind::Cancelled,
            ExportError::InvalidSettings(_) => ErrorKind::InvalidSettings,
            ExportError::IoError(_) | ExportError::JsonError(_) => ErrorKind::Internal,
        }
    }

    /// True when the failure is the user aborting, not an actual error.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ExportError::Cancelled)
    }
}

/// Coarse error classification for callers that branch on failure kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    EncoderUnavailable,
    EncoderFailed,
    SourceUnavailable,
    NoSources,
    CollaboratorUnavailable,
    ResourceExhausted,
    Timeout,
    Cancelled,
    InvalidSettings,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExportError::EncoderNotAvailable;
        assert!(err.to_string().contains("Encoder not available"));

        let err = ExportError::EncoderFailed {
            diagnostic: "exit code 1".to_string(),
        };
        assert!(err.to_string().contains("exit code 1"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ExportError::AllSourcesFailed { attempted: 3 }.kind(),
            ErrorKind::NoSources
        );
        assert_eq!(ExportError::Cancelled.kind(), ErrorKind::Cancelled);
        assert!(ExportError::Cancelled.is_cancellation());
        assert!(!ExportError::EncoderNotAvailable.is_cancellation());
    }
}
