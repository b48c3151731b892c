//! reelcut: timeline-to-video export pipeline.
//!
//! Turns an immutable timeline snapshot (tracks of video, audio, image,
//! text, and sticker elements) into a single rendered video file by
//! driving a detected FFmpeg installation:
//!
//! - [`capabilities`] probes the machine once per session and scores it.
//! - [`engine`] recommends a tier for that score and orchestrates the
//!   export: extraction, filtergraph assembly, one encoder invocation,
//!   progress, cancellation, and temp cleanup.
//! - [`extract`] normalizes timeline elements into file-backed source
//!   descriptors, materializing in-memory and remote media to temp files.
//! - [`filters`] builds the drawtext/overlay filtergraph fragments.
//!
//! ```no_run
//! use std::sync::Arc;
//! use reelcut::capabilities::{CapabilityContext, SystemProbe};
//! use reelcut::cancel::CancellationToken;
//! use reelcut::encoder::{detect_encoder, ExportPreset, ExportSettings};
//! use reelcut::engine::{create_engine, recommend};
//! use reelcut::media::MediaCatalog;
//! use reelcut::timeline::Timeline;
//!
//! # async fn run(timeline: Timeline, catalog: MediaCatalog) -> reelcut::error::ExportResult<()> {
//! let installation = detect_encoder().ok();
//! let context = CapabilityContext::new(Arc::new(SystemProbe::new(installation.clone())));
//! let caps = context.get().await;
//!
//! let settings = ExportSettings::from_preset(ExportPreset::Youtube1080p, "out.mp4".into());
//! let recommendation = recommend(&caps, &settings, timeline.duration(), None);
//! let engine = create_engine(&caps, installation, &recommendation)?;
//!
//! let cancel = CancellationToken::new();
//! let outcome = engine.export(&timeline, &catalog, &settings, None, &cancel).await?;
//! println!("rendered {}", outcome.output_path.display());
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod capabilities;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod extract;
pub mod filters;
pub mod fs;
pub mod media;
pub mod timeline;
pub mod types;

mod process;

pub use cancel::CancellationToken;
pub use encoder::{ExportProgress, ExportSettings};
pub use engine::{EngineRecommendation, EngineTier, ExportEngine, ExportOutcome};
pub use error::{ExportError, ExportResult};
pub use extract::SourceInput;
pub use media::{MediaCatalog, MediaItem};
pub use timeline::Timeline;
