//! Source Extraction
//!
//! Walks the timeline snapshot and turns elements into normalized,
//! file-backed source descriptors the encoder can consume. Four
//! extractors share one resolution core: video clips, audio (dedicated
//! audio tracks plus the audio of media-track video), still images, and
//! stickers.
//!
//! Failure policy: a single element failing to resolve is logged and
//! skipped; extraction only errors on cancellation or a broken store.

mod audio;
mod image;
mod sticker;
mod video;

use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cancel::CancellationToken;
use crate::error::{ExportError, ExportResult};
use crate::fs::FileStore;
use crate::media::{resolve_source, MediaItem};
use crate::timeline::TimelineElement;
use crate::types::{ElementId, TimeSec};

pub use audio::extract_audio_sources;
pub use image::extract_image_sources;
pub use sticker::extract_sticker_sources;
pub use video::{extract_single_video_input, extract_video_sources};

/// Bound on concurrent materializations within one extractor.
const MAX_CONCURRENT_RESOLVES: usize = 4;

/// Timeout for one element's materialization (blob write or fetch).
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(120);

/// A normalized, file-backed source ready for invocation assembly.
///
/// `path` always points at readable local bytes; timing fields are copied
/// from the element unchanged (images get zero trims).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInput {
    pub element_id: ElementId,
    pub path: std::path::PathBuf,
    pub start_time: TimeSec,
    pub duration: TimeSec,
    pub trim_start: TimeSec,
    pub trim_end: TimeSec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
}

impl SourceInput {
    /// Duration actually played after trims.
    pub fn effective_duration(&self) -> TimeSec {
        (self.duration - self.trim_start - self.trim_end).max(0.0)
    }
}

/// Result of one extractor run. `attempted` counts candidate elements so
/// the orchestrator can distinguish "nothing on the timeline" from
/// "everything failed".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub sources: Vec<SourceInput>,
    pub attempted: usize,
}

/// One element paired with its catalog entry, pre-filtered by an extractor.
///
/// Owns clones of both records so resolution tasks can move across the
/// bounded-concurrency stream without borrowing from the timeline.
pub(crate) struct Candidate {
    pub element: TimelineElement,
    pub item: MediaItem,
}

#[derive(Clone, Copy, Default)]
pub(crate) struct ResolveOptions {
    /// Force zero trims on the produced input (still images).
    pub zero_trims: bool,
    /// Re-verify the resolved path exists before accepting it (guards
    /// stale cached paths on audio re-use).
    pub recheck_exists: bool,
}

/// Resolve candidates to source inputs with bounded concurrency.
///
/// Per-element failures warn and skip. The returned list is sorted by
/// ascending start time; ties keep the elements' encounter order, which
/// concurrent resolution must not perturb.
pub(crate) async fn resolve_candidates(
    candidates: Vec<Candidate>,
    store: &dyn FileStore,
    cancel: &CancellationToken,
    opts: ResolveOptions,
) -> ExportResult<Extraction> {
    let attempted = candidates.len();

    let mut resolved: Vec<(usize, SourceInput)> = stream::iter(candidates.into_iter().enumerate())
        .map(|(idx, candidate)| async move {
            if cancel.is_cancelled() {
                return Err(ExportError::Cancelled);
            }

            let outcome =
                tokio::time::timeout(RESOLVE_TIMEOUT, resolve_source(&candidate.item, store))
                    .await
                    .unwrap_or_else(|_| {
                        Err(ExportError::Timeout(format!(
                            "Resolving media '{}' timed out",
                            candidate.item.name
                        )))
                    });

            let source = match outcome {
                Ok(source) => source,
                Err(e) => {
                    warn!(
                        "Skipping element '{}': failed to resolve media '{}': {}",
                        candidate.element.name, candidate.item.name, e
                    );
                    return Ok((idx, None));
                }
            };

            if opts.recheck_exists && !store.file_exists(&source.path).await {
                warn!(
                    "Skipping element '{}': resolved path vanished: {}",
                    candidate.element.name,
                    source.path.display()
                );
                return Ok((idx, None));
            }

            Ok((idx, Some(make_input(&candidate.element, &candidate.item, source.path, opts))))
        })
        .buffer_unordered(MAX_CONCURRENT_RESOLVES)
        .try_collect::<Vec<(usize, Option<SourceInput>)>>()
        .await?
        .into_iter()
        .filter_map(|(idx, input)| input.map(|i| (idx, i)))
        .collect();

    // Restore encounter order, then stable-sort by start time so ties
    // keep it.
    resolved.sort_by_key(|(idx, _)| *idx);
    let mut sources: Vec<SourceInput> = resolved.into_iter().map(|(_, input)| input).collect();
    sources.sort_by(|a, b| {
        a.start_time
            .partial_cmp(&b.start_time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(Extraction { sources, attempted })
}

pub(crate) fn make_input(
    element: &TimelineElement,
    item: &MediaItem,
    path: std::path::PathBuf,
    opts: ResolveOptions,
) -> SourceInput {
    SourceInput {
        element_id: element.id.clone(),
        path,
        start_time: element.start_time,
        duration: element.duration,
        trim_start: if opts.zero_trims { 0.0 } else { element.trim_start },
        trim_end: if opts.zero_trims { 0.0 } else { element.trim_end },
        width: item.width,
        height: item.height,
        volume: element.volume,
    }
}
