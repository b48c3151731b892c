//! Sticker extraction from sticker tracks.

use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::error::ExportResult;
use crate::extract::{resolve_candidates, Candidate, Extraction, ResolveOptions};
use crate::fs::FileStore;
use crate::media::{MediaCatalog, MediaKind};
use crate::timeline::{ElementKind, Timeline, TrackKind};

/// Extract sticker images, sorted by start time.
///
/// The returned order is also the overlay stacking order: later start
/// times composite on top, ties stack in encounter order.
pub async fn extract_sticker_sources(
    timeline: &Timeline,
    catalog: &MediaCatalog,
    store: &dyn FileStore,
    cancel: &CancellationToken,
) -> ExportResult<Extraction> {
    let mut candidates = Vec::new();
    for track in timeline.tracks.iter().filter(|t| t.kind == TrackKind::Sticker) {
        for element in &track.elements {
            if element.hidden || element.kind != ElementKind::Sticker {
                continue;
            }
            if element.sticker.is_none() {
                warn!("Skipping sticker element '{}': no placement", element.name);
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
                Some(item) => {
                    warn!(
                        "Skipping sticker element '{}': media '{}' is not an image ({:?})",
                        element.name, media_id, item.kind
                    );
                }
                None => {
                    warn!(
                        "Skipping element '{}': media '{}' not in catalog",
                        element.name, media_id
                    );
                }
            }
        }
    }

    debug!("Extracting {} sticker candidates", candidates.len());
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
