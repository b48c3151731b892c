//! Audio extraction: dedicated audio tracks plus media-track audio.

use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::error::ExportResult;
use crate::extract::{resolve_candidates, Candidate, Extraction, ResolveOptions};
use crate::fs::FileStore;
use crate::media::{MediaCatalog, MediaKind};
use crate::timeline::{ElementKind, Timeline, TrackKind};

/// Extract audio sources, sorted by start time.
///
/// Two populations feed the audio mix: elements on dedicated audio
/// tracks, and the audio streams of video clips on media tracks. Muted
/// tracks contribute nothing. Resolved paths are re-verified before use
/// since audio frequently re-uses paths the video pass resolved earlier
/// in the session.
pub async fn extract_audio_sources(
    timeline: &Timeline,
    catalog: &MediaCatalog,
    store: &dyn FileStore,
    cancel: &CancellationToken,
) -> ExportResult<Extraction> {
    let mut candidates = Vec::new();

    for track in &timeline.tracks {
        if track.muted {
            continue;
        }
        let wanted_kind = match track.kind {
            TrackKind::Audio => MediaKind::Audio,
            TrackKind::Media => MediaKind::Video,
            _ => continue,
        };

        for element in &track.elements {
            if element.hidden || element.kind != ElementKind::Media {
                continue;
            }
            let Some(media_id) = &element.media_id else {
                continue;
            };
            match catalog.get(media_id) {
                Some(item) if item.kind == wanted_kind => {
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

    debug!("Extracting {} audio candidates", candidates.len());
    resolve_candidates(
        candidates,
        store,
        cancel,
        ResolveOptions {
            zero_trims: false,
            recheck_exists: true,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_support::*;
    use crate::timeline::{Timeline, TimelineElement, Track, TrackKind};

    #[tokio::test]
    async fn test_mixes_audio_tracks_and_media_audio_sorted() {
        let (dir, store) = store();
        let (video, video_path) = file_item(dir.path(), "clip.mp4", MediaKind::Video);
        let (audio, audio_path) = file_item(dir.path(), "music.m4a", MediaKind::Audio);

        let mut media_track = Track::new("V1", TrackKind::Media);
        media_track.add_element(TimelineElement::media("clip", &video.id, 0.0, 10.0));

        let mut audio_track = Track::new("A1", TrackKind::Audio);
        audio_track.add_element(TimelineElement::media("music", &audio.id, 3.0, 5.0));

        // Audio track listed first; sorting must still put the media
        // clip's audio (t=0) ahead of the music bed (t=3).
        let timeline = Timeline::new(vec![audio_track, media_track]);
        let catalog = catalog(vec![video, audio]);

        let cancel = CancellationToken::new();
        let extraction = extract_audio_sources(&timeline, &catalog, &store, &cancel)
            .await
            .unwrap();

        assert_eq!(extraction.sources.len(), 2);
        assert_eq!(extraction.sources[0].path, video_path);
        assert_eq!(extraction.sources[1].path, audio_path);
    }

    #[tokio::test]
    async fn test_muted_track_excluded() {
        let (dir, store) = store();
        let (audio, _) = file_item(dir.path(), "music.m4a", MediaKind::Audio);

        let mut track = Track::new("A1", TrackKind::Audio);
        track.muted = true;
        track.add_element(TimelineElement::media("music", &audio.id, 0.0, 5.0));
        let timeline = Timeline::new(vec![track]);
        let catalog = catalog(vec![audio]);

        let cancel = CancellationToken::new();
        let extraction = extract_audio_sources(&timeline, &catalog, &store, &cancel)
            .await
            .unwrap();
        assert_eq!(extraction.attempted, 0);
    }

    #[tokio::test]
    async fn test_stale_local_path_skipped() {
        let (dir, store) = store();
        let (mut audio, path) = file_item(dir.path(), "gone.m4a", MediaKind::Audio);
        std::fs::remove_file(&path).unwrap();
        audio.blob = None; // nothing to fall back to

        let timeline = single_track_timeline(
            TrackKind::Audio,
            vec![TimelineElement::media("gone", &audio.id, 0.0, 5.0)],
        );
        let catalog = catalog(vec![audio]);

        let cancel = CancellationToken::new();
        let extraction = extract_audio_sources(&timeline, &catalog, &store, &cancel)
            .await
            .unwrap();
        assert_eq!(extraction.attempted, 1);
        assert!(extraction.sources.is_empty());
    }

    #[tokio::test]
    async fn test_volume_carried_through() {
        let (dir, store) = store();
        let (audio, _) = file_item(dir.path(), "music.m4a", MediaKind::Audio);

        let mut element = TimelineElement::media("music", &audio.id, 0.0, 5.0);
        element.volume = Some(0.4);
        let timeline = single_track_timeline(TrackKind::Audio, vec![element]);
        let catalog = catalog(vec![audio]);

        let cancel = CancellationToken::new();
        let extraction = extract_audio_sources(&timeline, &catalog, &store, &cancel)
            .await
            .unwrap();
        assert_eq!(extraction.sources[0].volume, Some(0.4));
    }
}
