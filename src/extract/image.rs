//! Still image extraction from media tracks.

use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::error::ExportResult;
use crate::extract::{resolve_candidates, Candidate, Extraction, ResolveOptions};
use crate::fs::FileStore;
use crate::media::{MediaCatalog, MediaKind};
use crate::timeline::{ElementKind, Timeline, TrackKind};

/// Extract still images placed on media tracks, sorted by start time.
///
/// Images have no intrinsic timeline; their displayed span is the
/// element duration, so trims are forced to zero.
pub async fn extract_image_sources(
    timeline: &Timeline,
    catalog: &MediaCatalog,
    store: &dyn FileStore,
    cancel: &CancellationToken,
) -> ExportResult<Extraction> {
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
                Some(item) if item.kind == MediaKind::Image => {
                    candidates.push(Candidate {
                        element: element.clone(),
                        item: item.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    warn!(
                        "Skipping element '{}': media '{}' not in catalog",
                        element.name, media_id
                    );
                }
            }
        }
    }

    debug!("Extracting {} image candidates", candidates.len());
    resolve_candidates(
        candidates,
        store,
        cancel,
        ResolveOptions {
            zero_trims: true,
            recheck_exists: false,
        },
    )
    .await
}
