//! Engine Selection
//!
//! One pure decision over the capability snapshot, plus the factory that
//! constructs the chosen engine with a baseline fallback. Selection logic
//! stays side-effect free so it is unit-testable; construction is where
//! logging and fallback happen.

use tracing::{info, warn};

use crate::capabilities::RuntimeCapabilities;
use crate::encoder::{EncoderInstallation, ExportSettings};
use crate::engine::export::ProcessEngine;
use crate::engine::{EngineRecommendation, EngineTier, ExportEngine, PerformanceEstimate};
use crate::error::{ExportError, ExportResult};
use crate::types::TimeSec;

/// Memory headroom the encoder itself needs, independent of frame size.
const ENCODER_BASE_MEMORY_MB: f64 = 512.0;

/// Seconds of decoded frames assumed buffered during encoding.
const FRAME_BUFFER_SECONDS: f64 = 2.0;

/// Debug override forcing a specific tier regardless of capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineOverride {
    Force(EngineTier),
}

// =============================================================================
// Recommendation
// =============================================================================

/// Recommend an engine tier for one export.
///
/// Pure function of the capability snapshot, settings, and render
/// duration; identical inputs always produce an identical
/// recommendation. First match wins:
///
/// 1. Detected system encoder drives the native-process tier, unless a
///    debug override forces a lower one.
/// 2. Hardware encoder plus ample memory, a high performance score, and
///    an estimated peak memory comfortably under available memory.
/// 3. Two or more CPUs run the bounded worker-pool tier.
/// 4. Everything else gets the single-threaded baseline.
pub fn recommend(
    caps: &RuntimeCapabilities,
    settings: &ExportSettings,
    duration_sec: TimeSec,
    override_tier: Option<EngineOverride>,
) -> EngineRecommendation {
    if let Some(EngineOverride::Force(tier)) = override_tier {
        return EngineRecommendation {
            engine: tier,
            reason: format!("debug override forced the {} tier", tier),
            estimated_performance: estimate_for(tier, caps),
        };
    }

    if caps.encoder_available {
        return EngineRecommendation {
            engine: EngineTier::NativeProcess,
            reason: "system encoder detected".to_string(),
            estimated_performance: PerformanceEstimate::High,
        };
    }

    let peak_mb = estimated_peak_memory_mb(settings, duration_sec);
    let memory_comfortable = caps
        .total_memory_mb
        .map(|total| peak_mb <= total as f64 / 2.0)
        .unwrap_or(false);

    if caps.has_hardware_encoder()
        && caps.memory_gb().map(|gb| gb >= 8.0).unwrap_or(false)
        && caps.performance_score >= 70
        && memory_comfortable
    {
        return EngineRecommendation {
            engine: EngineTier::Hardware,
            reason: format!(
                "hardware encoder available with {} MB headroom",
                caps.total_memory_mb.unwrap_or(0)
            ),
            estimated_performance: PerformanceEstimate::High,
        };
    }

    if caps.cpu_count >= 2 {
        return EngineRecommendation {
            engine: EngineTier::WorkerPool,
            reason: format!("{} CPUs available for software encoding", caps.cpu_count),
            estimated_performance: PerformanceEstimate::Medium,
        };
    }

    EngineRecommendation {
        engine: EngineTier::Baseline,
        reason: "no concurrency or hardware advantages detected".to_string(),
        estimated_performance: if caps.performance_score >= 40 {
            PerformanceEstimate::Medium
        } else {
            PerformanceEstimate::Low
        },
    }
}

fn estimate_for(tier: EngineTier, caps: &RuntimeCapabilities) -> PerformanceEstimate {
    match tier {
        EngineTier::NativeProcess | EngineTier::Hardware => PerformanceEstimate::High,
        EngineTier::WorkerPool => PerformanceEstimate::Medium,
        EngineTier::Baseline => {
            if caps.performance_score >= 40 {
                PerformanceEstimate::Medium
            } else {
                PerformanceEstimate::Low
            }
        }
    }
}

/// Rough peak working-set estimate for one render, in MB.
///
/// Assumes a couple of seconds of uncompressed RGBA frames in flight
/// plus a fixed encoder overhead. Deliberately pessimistic; it only
/// gates the hardware tier, never blocks an export outright.
fn estimated_peak_memory_mb(settings: &ExportSettings, duration_sec: TimeSec) -> f64 {
    let frame_mb = settings.width as f64 * settings.height as f64 * 4.0 / (1024.0 * 1024.0);
    let buffered_frames = settings.fps * duration_sec.min(FRAME_BUFFER_SECONDS).max(0.0);
    frame_mb * buffered_frames + ENCODER_BASE_MEMORY_MB
}

// =============================================================================
// Factory
// =============================================================================

/// Construct the engine for a recommendation, falling back to the
/// baseline tier if the recommended tier cannot be built (e.g. the
/// hardware tier with no usable hardware encoder).
pub fn create_engine(
    caps: &RuntimeCapabilities,
    installation: Option<EncoderInstallation>,
    recommendation: &EngineRecommendation,
) -> ExportResult<Box<dyn ExportEngine>> {
    let Some(installation) = installation else {
        return Err(ExportError::EncoderNotAvailable);
    };

    let tier = recommendation.engine;
    match ProcessEngine::new(tier, installation.clone(), caps) {
        Ok(engine) => {
            info!("Selected {} export engine: {}", tier, recommendation.reason);
            Ok(Box::new(engine))
        }
        Err(e) if tier != EngineTier::Baseline => {
            warn!(
                "Could not construct {} engine ({}), falling back to baseline",
                tier, e
            );
            let fallback = ProcessEngine::new(EngineTier::Baseline, installation, caps)?;
            Ok(Box::new(fallback))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::HardwareAccel;
    use std::path::PathBuf;

    fn caps(
        encoder_available: bool,
        cpu_count: usize,
        total_memory_mb: Option<u64>,
        hardware_accels: Vec<HardwareAccel>,
        performance_score: u8,
    ) -> RuntimeCapabilities {
        RuntimeCapabilities {
            encoder_available,
            cpu_count,
            total_memory_mb,
            hardware_accels,
            encoder_version_major: Some(7),
            benchmark_ms: 10.0,
            performance_score,
        }
    }

    fn installation() -> EncoderInstallation {
        EncoderInstallation::from_paths(
            PathBuf::from("/usr/bin/ffmpeg"),
            PathBuf::from("/usr/bin/ffprobe"),
            "7.0.1",
        )
    }

    #[test]
    fn test_detected_encoder_wins() {
        let caps = caps(true, 8, Some(16 * 1024), vec![HardwareAccel::Nvenc], 90);
        let rec = recommend(&caps, &ExportSettings::default(), 30.0, None);
        assert_eq!(rec.engine, EngineTier::NativeProcess);
        assert_eq!(rec.estimated_performance, PerformanceEstimate::High);
    }

    #[test]
    fn test_recommendation_is_pure() {
        let caps = caps(false, 4, Some(8 * 1024), vec![], 55);
        let settings = ExportSettings::default();
        let a = recommend(&caps, &settings, 60.0, None);
        let b = recommend(&caps, &settings, 60.0, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hardware_tier_needs_memory_and_score() {
        let settings = ExportSettings::default();
        let strong = caps(false, 8, Some(16 * 1024), vec![HardwareAccel::Nvenc], 85);
        assert_eq!(
            recommend(&strong, &settings, 30.0, None).engine,
            EngineTier::Hardware
        );

        let low_memory = caps(false, 8, Some(4 * 1024), vec![HardwareAccel::Nvenc], 85);
        assert_ne!(
            recommend(&low_memory, &settings, 30.0, None).engine,
            EngineTier::Hardware
        );

        let low_score = caps(false, 8, Some(16 * 1024), vec![HardwareAccel::Nvenc], 50);
        assert_ne!(
            recommend(&low_score, &settings, 30.0, None).engine,
            EngineTier::Hardware
        );
    }

    #[test]
    fn test_unknown_memory_never_picks_hardware() {
        let caps = caps(false, 8, None, vec![HardwareAccel::Nvenc], 85);
        let rec = recommend(&caps, &ExportSettings::default(), 30.0, None);
        assert_eq!(rec.engine, EngineTier::WorkerPool);
    }

    #[test]
    fn test_multicore_without_hardware_picks_worker_pool() {
        // No detected encoder, no hardware accel, but multiple CPUs.
        let caps = caps(false, 4, Some(8 * 1024), vec![], 60);
        let rec = recommend(&caps, &ExportSettings::default(), 30.0, None);
        assert_eq!(rec.engine, EngineTier::WorkerPool);
        assert_eq!(rec.estimated_performance, PerformanceEstimate::Medium);
    }

    #[test]
    fn test_single_core_baseline_labels_by_score() {
        let ok = caps(false, 1, Some(4 * 1024), vec![], 45);
        let rec = recommend(&ok, &ExportSettings::default(), 30.0, None);
        assert_eq!(rec.engine, EngineTier::Baseline);
        assert_eq!(rec.estimated_performance, PerformanceEstimate::Medium);

        let weak = caps(false, 1, Some(2 * 1024), vec![], 20);
        let rec = recommend(&weak, &ExportSettings::default(), 30.0, None);
        assert_eq!(rec.engine, EngineTier::Baseline);
        assert_eq!(rec.estimated_performance, PerformanceEstimate::Low);
    }

    #[test]
    fn test_override_beats_detection() {
        let caps = caps(true, 8, Some(16 * 1024), vec![], 90);
        let rec = recommend(
            &caps,
            &ExportSettings::default(),
            30.0,
            Some(EngineOverride::Force(EngineTier::Baseline)),
        );
        assert_eq!(rec.engine, EngineTier::Baseline);
        assert!(rec.reason.contains("override"));
    }

    #[test]
    fn test_peak_memory_estimate_scales_with_resolution() {
        let hd = ExportSettings::default();
        let mut uhd = ExportSettings::default();
        uhd.width = 3840;
        uhd.height = 2160;

        let hd_peak = estimated_peak_memory_mb(&hd, 60.0);
        let uhd_peak = estimated_peak_memory_mb(&uhd, 60.0);
        assert!(uhd_peak > hd_peak * 2.0);
    }

    #[test]
    fn test_create_engine_without_installation_fails() {
        let caps = caps(false, 4, Some(8 * 1024), vec![], 60);
        let rec = recommend(&caps, &ExportSettings::default(), 30.0, None);
        let err = match create_engine(&caps, None, &rec) {
            Ok(_) => panic!("engine construction should fail without a binary"),
            Err(e) => e,
        };
        assert!(matches!(err, ExportError::EncoderNotAvailable));
    }

    #[test]
    fn test_hardware_construction_falls_back_to_baseline() {
        // Recommendation says hardware but the snapshot carries no accel,
        // so construction fails and the factory degrades.
        let caps = caps(false, 8, Some(16 * 1024), vec![], 85);
        let rec = EngineRecommendation {
            engine: EngineTier::Hardware,
            reason: "test".to_string(),
            estimated_performance: PerformanceEstimate::High,
        };
        let engine = create_engine(&caps, Some(installation()), &rec).unwrap();
        assert_eq!(engine.tier(), EngineTier::Baseline);
    }

    #[test]
    fn test_worker_pool_constructs_directly() {
        let caps = caps(false, 4, Some(8 * 1024), vec![], 60);
        let rec = recommend(&caps, &ExportSettings::default(), 30.0, None);
        let engine = create_engine(&caps, Some(installation()), &rec).unwrap();
        assert_eq!(engine.tier(), EngineTier::WorkerPool);
    }
}
