//! Encoder Process Layer
//!
//! Detection of the FFmpeg/FFprobe binaries, media probing, export
//! settings, and the invocation runner that drives one encoder process
//! with progress reporting and cancellation.

mod detection;
mod probe;
mod runner;
mod settings;

pub use detection::{detect_encoder, parse_version_major, validate_encoder, EncoderInstallation};
pub use probe::{probe_media, AudioStreamInfo, MediaInfo, VideoStreamInfo};
pub use runner::{
    calculate_progress, parse_progress_line, run_invocation, EncoderInvocation, ExportProgress,
    ProgressData,
};
pub use settings::{ExportPreset, ExportSettings};
