//! Timeline snapshot models.
//!
//! Uses a denormalized structure: tracks hold their elements directly, and
//! track insertion order is the render/z order within a kind.

use serde::{Deserialize, Serialize};

use crate::types::{Color, ElementId, MediaId, Point2D, Size2D, TimeSec, TrackId};

// =============================================================================
// Track
// =============================================================================

/// Track kind. Gates which element kinds a track may legally contain and
/// which extractor consumes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    /// Video and image clips
    Media,
    /// Audio-only clips
    Audio,
    /// Text overlays
    Text,
    /// Sticker overlays
    Sticker,
    /// Effect-only tracks (no extractable sources)
    Effects,
}

/// Track (contains elements directly for denormalized storage)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
    pub name: String,
    /// Elements in encounter order; this order is the tie-break for
    /// extraction sorting and overlay stacking.
    pub elements: Vec<TimelineElement>,
    pub muted: bool,
}

impl Track {
    /// Creates a new empty track with the given name and kind
    pub fn new(name: &str, kind: TrackKind) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind,
            name: name.to_string(),
            elements: vec![],
            muted: false,
        }
    }

    /// Adds an element to the track
    pub fn add_element(&mut self, element: TimelineElement) {
        self.elements.push(element);
    }
}

// =============================================================================
// Element
// =============================================================================

/// Element kind within a track
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementKind {
    /// Media-backed clip (video, audio, or image, per the catalog entry)
    Media,
    /// Text overlay
    Text,
    /// Sticker overlay
    Sticker,
}

/// One placed clip/text/sticker instance on a track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineElement {
    pub id: ElementId,
    pub kind: ElementKind,
    pub name: String,
    /// Timeline position in seconds
    pub start_time: TimeSec,
    /// Placed duration in seconds (before trims)
    pub duration: TimeSec,
    /// Seconds trimmed from the start of the source
    pub trim_start: TimeSec,
    /// Seconds trimmed from the end of the source
    pub trim_end: TimeSec,
    /// Hidden elements are excluded from every extractor
    pub hidden: bool,
    /// Foreign key into the media catalog for media-backed elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_id: Option<MediaId>,
    /// Playback volume (1.0 = 100%), media/audio elements only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    /// Text payload for text elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextElementData>,
    /// Placement for sticker elements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker: Option<StickerPlacement>,
}

impl TimelineElement {
    /// Creates a media-backed element referencing a catalog entry.
    pub fn media(name: &str, media_id: &str, start_time: TimeSec, duration: TimeSec) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind: ElementKind::Media,
            name: name.to_string(),
            start_time,
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            hidden: false,
            media_id: Some(media_id.to_string()),
            volume: None,
            text: None,
            sticker: None,
        }
    }

    /// Creates a text element.
    pub fn text(data: TextElementData, start_time: TimeSec, duration: TimeSec) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind: ElementKind::Text,
            name: data.content.chars().take(24).collect(),
            start_time,
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            hidden: false,
            media_id: None,
            volume: None,
            text: Some(data),
            sticker: None,
        }
    }

    /// Creates a sticker element referencing a catalog entry.
    pub fn sticker(
        name: &str,
        media_id: &str,
        placement: StickerPlacement,
        start_time: TimeSec,
        duration: TimeSec,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind: ElementKind::Sticker,
            name: name.to_string(),
            start_time,
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            hidden: false,
            media_id: Some(media_id.to_string()),
            volume: None,
            text: None,
            sticker: Some(placement),
        }
    }

    /// Duration actually played after trims are applied.
    pub fn effective_duration(&self) -> TimeSec {
        (self.duration - self.trim_start - self.trim_end).max(0.0)
    }

    /// End of the effective playable window on the timeline.
    pub fn end_time(&self) -> TimeSec {
        self.start_time + self.effective_duration()
    }
}

// =============================================================================
// Text
// =============================================================================

/// Payload for a text element: content plus styling used by the drawtext
/// filter builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElementData {
    pub content: String,
    /// Font family name (system font)
    pub font_family: String,
    /// Font size in points
    pub font_size: u32,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    /// Position of the text anchor in canvas pixels
    pub position: Point2D,
}

impl Default for TextElementData {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_family: "Arial".to_string(),
            font_size: 48,
            color: Color::white(),
            bold: false,
            italic: false,
            position: Point2D::default(),
        }
    }
}

// =============================================================================
// Sticker
// =============================================================================

/// Placement of a sticker overlay on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerPlacement {
    pub position: Point2D,
    pub size: Size2D,
    /// Opacity (0.0 ~ 1.0)
    pub opacity: f32,
}

impl Default for StickerPlacement {
    fn default() -> Self {
        Self {
            position: Point2D::default(),
            size: Size2D::new(128, 128),
            opacity: 1.0,
        }
    }
}

// =============================================================================
// Timeline
// =============================================================================

/// Immutable timeline snapshot handed to the export pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub tracks: Vec<Track>,
}

impl Timeline {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Total duration: latest effective end time across all visible elements.
    pub fn duration(&self) -> TimeSec {
        self.tracks
            .iter()
            .flat_map(|t| t.elements.iter())
            .filter(|e| !e.hidden)
            .map(|e| e.end_time())
            .fold(0.0, f64::max)
    }

    /// True when no track contains a visible element.
    pub fn is_empty(&self) -> bool {
        self.tracks
            .iter()
            .all(|t| t.elements.iter().all(|e| e.hidden))
    }
}
