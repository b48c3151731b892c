//! Process-Backed Export Engine
//!
//! The one concrete engine implementation: all tiers drive the detected
//! encoder binary, differing only in codec and threading. An export runs
//! extraction for every source kind concurrently, folds the results into
//! a single invocation, tracks encoder progress, and tears down the
//! session temp directory in every outcome.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::capabilities::RuntimeCapabilities;
use crate::encoder::{
    probe_media, run_invocation, EncoderInstallation, ExportProgress, ExportSettings,
};
use crate::engine::invocation::{
    build_export_invocation, EncoderConfig, ExportMaterial, StickerSource, TextOverlay,
};
use crate::engine::{EngineTier, ExportEngine, ExportOutcome};
use crate::error::{ExportError, ExportResult};
use crate::extract::{
    extract_audio_sources, extract_image_sources, extract_sticker_sources, extract_video_sources,
    SourceInput,
};
use crate::filters::FontResolver;
use crate::fs::TempFileStore;
use crate::media::MediaCatalog;
use crate::timeline::{ElementKind, StickerPlacement, Timeline, TrackKind};
use crate::types::{ElementId, SessionId};

/// Upper bound on `-threads` for the worker-pool tier; x264 gains little
/// beyond this and the pool should leave cores for the rest of the app.
const MAX_WORKER_THREADS: usize = 8;

/// Export engine that shells out to the detected encoder binary.
pub struct ProcessEngine {
    tier: EngineTier,
    installation: EncoderInstallation,
    config: EncoderConfig,
    fonts: FontResolver,
}

impl ProcessEngine {
    /// Builds the engine for a tier against the current capability
    /// snapshot. Fails when the tier needs hardware the snapshot does
    /// not carry; the selector treats that as a fallback signal.
    pub(crate) fn new(
        tier: EngineTier,
        installation: EncoderInstallation,
        caps: &RuntimeCapabilities,
    ) -> ExportResult<Self> {
        let config = match tier {
            EngineTier::NativeProcess => EncoderConfig {
                video_codec: "libx264".to_string(),
                threads: None,
                quality_args: true,
            },
            EngineTier::Hardware => {
                let accel = caps.best_hardware_accel().ok_or_else(|| {
                    ExportError::CollaboratorUnavailable(
                        "no usable hardware encoder detected".to_string(),
                    )
                })?;
                EncoderConfig {
                    video_codec: accel.h264_encoder().to_string(),
                    threads: None,
                    quality_args: false,
                }
            }
            EngineTier::WorkerPool => EncoderConfig {
                video_codec: "libx264".to_string(),
                threads: Some(caps.cpu_count.clamp(1, MAX_WORKER_THREADS)),
                quality_args: true,
            },
            EngineTier::Baseline => EncoderConfig {
                video_codec: "libx264".to_string(),
                threads: Some(1),
                quality_args: true,
            },
        };

        Ok(Self {
            tier,
            installation,
            config,
            fonts: FontResolver::new(),
        })
    }
}

impl ProcessEngine {
    /// Probes each audio source and drops files with no audio stream;
    /// mapping a silent video into the mix would fail the whole encode.
    /// A failed probe keeps the source and lets the encoder decide.
    async fn drop_silent_sources(&self, audios: Vec<SourceInput>) -> Vec<SourceInput> {
        let mut kept = Vec::with_capacity(audios.len());
        for audio in audios {
            match probe_media(&self.installation.ffprobe_path, &audio.path).await {
                Ok(info) if !info.has_audio() => {
                    warn!(
                        "Excluding '{}' from the audio mix: no audio stream",
                        audio.path.display()
                    );
                }
                _ => kept.push(audio),
            }
        }
        kept
    }
}

#[async_trait]
impl ExportEngine for ProcessEngine {
    fn tier(&self) -> EngineTier {
        self.tier
    }

    async fn export(
        &self,
        timeline: &Timeline,
        catalog: &MediaCatalog,
        settings: &ExportSettings,
        progress_tx: Option<Sender<ExportProgress>>,
        cancel: &CancellationToken,
    ) -> ExportResult<ExportOutcome> {
        settings.validate()?;
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        let session: SessionId = ulid::Ulid::new().to_string();
        // Dropped on every exit path, removing all materialized sources.
        let store = TempFileStore::new(&session)?;
        let started = Instant::now();

        info!(
            "Starting {} export (session {}): {}x{} @ {} fps -> {}",
            self.tier,
            session,
            settings.width,
            settings.height,
            settings.fps,
            settings.output_path.display()
        );

        let (videos, audios, images, stickers) = tokio::try_join!(
            extract_video_sources(timeline, catalog, &store, cancel),
            extract_audio_sources(timeline, catalog, &store, cancel),
            extract_image_sources(timeline, catalog, &store, cancel),
            extract_sticker_sources(timeline, catalog, &store, cancel),
        )?;

        let attempted = videos.attempted + audios.attempted + images.attempted + stickers.attempted;
        let resolved = videos.sources.len()
            + audios.sources.len()
            + images.sources.len()
            + stickers.sources.len();
        if attempted > 0 && resolved == 0 {
            return Err(ExportError::AllSourcesFailed { attempted });
        }
        debug!(
            "Extracted {}/{} sources: {} video, {} audio, {} image, {} sticker",
            resolved,
            attempted,
            videos.sources.len(),
            audios.sources.len(),
            images.sources.len(),
            stickers.sources.len()
        );

        let placements = sticker_placements(timeline);
        let sticker_sources = stickers
            .sources
            .into_iter()
            .filter_map(|input| {
                placements
                    .get(&input.element_id)
                    .cloned()
                    .map(|placement| StickerSource { input, placement })
            })
            .collect();

        let material = ExportMaterial {
            videos: videos.sources,
            images: images.sources,
            audios: self.drop_silent_sources(audios.sources).await,
            stickers: sticker_sources,
            texts: collect_text_overlays(timeline),
        };

        let plan = build_export_invocation(
            &self.installation.ffmpeg_path,
            &material,
            settings,
            &self.config,
            &self.fonts,
        )?;

        run_invocation(
            &plan.invocation,
            plan.total_duration,
            plan.total_frames,
            progress_tx,
            cancel,
        )
        .await?;

        let file_size = tokio::fs::metadata(&settings.output_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        let encoding_time_sec = started.elapsed().as_secs_f64();

        info!(
            "Export finished in {:.1}s: {} ({} bytes)",
            encoding_time_sec,
            settings.output_path.display(),
            file_size
        );

        Ok(ExportOutcome {
            output_path: settings.output_path.clone(),
            duration_sec: plan.total_duration,
            file_size,
            encoding_time_sec,
        })
    }
}

/// Placement lookup for sticker elements, keyed by element id.
fn sticker_placements(timeline: &Timeline) -> HashMap<ElementId, StickerPlacement> {
    timeline
        .tracks
        .iter()
        .filter(|t| t.kind == TrackKind::Sticker)
        .flat_map(|t| &t.elements)
        .filter_map(|el| el.sticker.clone().map(|p| (el.id.clone(), p)))
        .collect()
}

/// Visible text overlays with their effective windows, sorted by start
/// time (stable, so track encounter order breaks ties).
fn collect_text_overlays(timeline: &Timeline) -> Vec<TextOverlay> {
    let mut overlays: Vec<TextOverlay> = timeline
        .tracks
        .iter()
        .filter(|t| t.kind == TrackKind::Text)
        .flat_map(|t| &t.elements)
        .filter(|el| !el.hidden && el.kind == ElementKind::Text)
        .filter_map(|el| {
            el.text.clone().map(|data| TextOverlay {
                data,
                start: el.start_time,
                end: el.end_time(),
            })
        })
        .collect();
    overlays.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    overlays
}
