//! Export Engines
//!
//! Engine tiers, capability-driven selection, and the process-backed
//! implementation that orchestrates a full export: extraction, filter
//! assembly, one encoder invocation, progress, and cleanup.

mod export;
mod invocation;
mod selector;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use crate::cancel::CancellationToken;
use crate::encoder::{ExportProgress, ExportSettings};
use crate::error::ExportResult;
use crate::media::MediaCatalog;
use crate::timeline::Timeline;

pub use export::ProcessEngine;
pub use selector::{create_engine, recommend, EngineOverride};

// =============================================================================
// Tiers
// =============================================================================

/// Export engine tier, from most to least capable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineTier {
    /// Detected system encoder driven directly, default settings
    NativeProcess,
    /// Hardware-accelerated encoding (NVENC/QSV/AMF/VideoToolbox/VAAPI)
    Hardware,
    /// Software encoding with a bounded thread pool
    WorkerPool,
    /// Single-threaded software encoding, maximum compatibility
    Baseline,
}

impl std::fmt::Display for EngineTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineTier::NativeProcess => write!(f, "native-process"),
            EngineTier::Hardware => write!(f, "hardware"),
            EngineTier::WorkerPool => write!(f, "worker-pool"),
            EngineTier::Baseline => write!(f, "baseline"),
        }
    }
}

/// Expected throughput of a recommended tier on this machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceEstimate {
    High,
    Medium,
    Low,
}

/// Outcome of engine selection: the tier, why, and what to expect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineRecommendation {
    pub engine: EngineTier,
    pub reason: String,
    pub estimated_performance: PerformanceEstimate,
}

// =============================================================================
// Engine trait
// =============================================================================

/// Result of a completed export.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    pub output_path: PathBuf,
    /// Rendered duration in seconds
    pub duration_sec: f64,
    /// Output file size in bytes
    pub file_size: u64,
    /// Wall-clock encoding time in seconds
    pub encoding_time_sec: f64,
}

/// An export engine renders a timeline snapshot to a video file.
#[async_trait]
pub trait ExportEngine: Send + Sync {
    fn tier(&self) -> EngineTier;

    /// Runs the full export pipeline against one timeline snapshot.
    async fn export(
        &self,
        timeline: &Timeline,
        catalog: &MediaCatalog,
        settings: &ExportSettings,
        progress_tx: Option<Sender<ExportProgress>>,
        cancel: &CancellationToken,
    ) -> ExportResult<ExportOutcome>;
}
