//! Video clip extraction from media tracks.

use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::error::ExportResult;
use crate::extract::{
    make_input, resolve_candidates, Candidate, Extraction, ResolveOptions, SourceInput,
};
use crate::fs::FileStore;
use crate::media::{resolve_source, MediaCatalog, MediaKind};
use crate::timeline::{ElementKind, Timeline, TrackKind};

/// Collect visible video-backed elements from media tracks.
fn video_candidates(timeline: &Timeline, catalog: &MediaCatalog) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for track in timeline.tracks.iter().filter(|t| t.kind == TrackKind::Media) {
        for element in &track.elements {
            if element.hidden || element.kind != ElementKind::Media {
                continue;
            }
            let Some(media_id) = &element.media_id else {
                continue;
            };
            match catalog.get(media_id) {
                Some(item) if item.kind == MediaKind::Video => {
                    candidates.push(Candidate {
                        element: element.clone(),
                        item: item.clone(),
                    });
                }
                Some(_) => {} // images on media tracks belong to the image extractor
                None => {
                    warn!(
                        "Skipping element '{}': media '{}' not in catalog",
                        element.name, media_id
                    );
                }
            }
        }
    }
    candidates
}

/// Extract all video clips as file-backed sources, sorted by start time.
pub async fn extract_video_sources(
    timeline: &Timeline,
    catalog: &MediaCatalog,
    store: &dyn FileStore,
    cancel: &CancellationToken,
) -> ExportResult<Extraction> {
    let candidates = video_candidates(timeline, catalog);
    debug!("Extracting {} video candidates", candidates.len());
    resolve_candidates(candidates, store, cancel, ResolveOptions::default()).await
}

/// Fast path for the common one-clip export.
///
/// Returns the resolved source only when exactly one visible video
/// element exists across all media tracks. A second candidate aborts the
/// scan before any resolution work happens. Resolution failure degrades
/// to None so the caller falls back to the general path.
pub async fn extract_single_video_input(
    timeline: &Timeline,
    catalog: &MediaCatalog,
    store: &dyn FileStore,
    cancel: &CancellationToken,
) -> ExportResult<Option<SourceInput>> {
    let mut only: Option<Candidate> = None;
    for track in timeline.tracks.iter().filter(|t| t.kind == TrackKind::Media) {
        for element in &track.elements {
            if element.hidden || element.kind != ElementKind::Media {
                continue;
            }
            let Some(item) = element.media_id.as_ref().and_then(|id| catalog.get(id)) else {
                continue;
            };
            if item.kind != MediaKind::Video {
                continue;
            }
            if only.is_some() {
                // Second candidate: not a single-clip timeline.
                return Ok(None);
            }
            only = Some(Candidate {
                element: element.clone(),
                item: item.clone(),
            });
        }
    }

    let Some(candidate) = only else {
        return Ok(None);
    };

    if cancel.is_cancelled() {
        return Err(crate::error::ExportError::Cancelled);
    }

    match resolve_source(&candidate.item, store).await {
        Ok(source) => Ok(Some(make_input(
            &candidate.element,
            &candidate.item,
            source.path,
            ResolveOptions::default(),
        ))),
        Err(e) => {
            warn!(
                "Single-clip fast path failed to resolve '{}': {}",
                candidate.item.name, e
            );
            Ok(None)
        }
    }
}
