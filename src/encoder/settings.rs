//! Export Settings
//!
//! Output parameters shared by every engine tier. Tiers decide the codec
//! and threading; these settings carry resolution, rates, and quality.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};
use crate::fs::validate_output_path;

/// Export preset type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportPreset {
    /// YouTube 1080p (H.264, AAC)
    Youtube1080p,
    /// YouTube 4K (H.264, AAC)
    Youtube4k,
    /// Vertical 1080x1920 (Shorts/TikTok)
    Shorts1080p,
    /// Fast low-quality draft
    Draft720p,
    /// Custom settings
    Custom,
}

/// Export settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    pub preset: ExportPreset,
    /// Output file path
    pub output_path: PathBuf,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Output frame rate
    pub fps: f64,
    /// Video bitrate (e.g., "8M", "5000k")
    pub video_bitrate: String,
    /// Audio bitrate (e.g., "192k")
    pub audio_bitrate: String,
    /// Encoding speed preset for x264 (ultrafast..slow)
    pub speed_preset: String,
    /// CRF value for quality-based encoding (0-51, lower is better)
    pub crf: Option<u8>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from_preset(ExportPreset::Youtube1080p, PathBuf::from("output.mp4"))
    }
}

impl ExportSettings {
    /// Create settings from a preset
    pub fn from_preset(preset: ExportPreset, output_path: PathBuf) -> Self {
        match preset {
            ExportPreset::Youtube1080p | ExportPreset::Custom => Self {
                preset,
                output_path,
                width: 1920,
                height: 1080,
                fps: 30.0,
                video_bitrate: "8M".to_string(),
                audio_bitrate: "192k".to_string(),
                speed_preset: "medium".to_string(),
                crf: Some(23),
            },
            ExportPreset::Youtube4k => Self {
                preset,
                output_path,
                width: 3840,
                height: 2160,
                fps: 30.0,
                video_bitrate: "35M".to_string(),
                audio_bitrate: "256k".to_string(),
                speed_preset: "slow".to_string(),
                crf: Some(20),
            },
            ExportPreset::Shorts1080p => Self {
                preset,
                output_path,
                width: 1080,
                height: 1920,
                fps: 30.0,
                video_bitrate: "6M".to_string(),
                audio_bitrate: "192k".to_string(),
                speed_preset: "medium".to_string(),
                crf: Some(23),
            },
            ExportPreset::Draft720p => Self {
                preset,
                output_path,
                width: 1280,
                height: 720,
                fps: 30.0,
                video_bitrate: "2M".to_string(),
                audio_bitrate: "128k".to_string(),
                speed_preset: "ultrafast".to_string(),
                crf: Some(28),
            },
        }
    }

    /// Validate settings before the encoder is spawned
    pub fn validate(&self) -> ExportResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ExportError::InvalidSettings(format!(
                "Resolution must be non-zero: {}x{}",
                self.width, self.height
            )));
        }
        // H.264 yuv420p requires even dimensions
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ExportError::InvalidSettings(format!(
                "Resolution must be even: {}x{}",
                self.width, self.height
            )));
        }
        if !(self.fps > 0.0) {
            return Err(ExportError::InvalidSettings(format!(
                "Frame rate must be positive: {}",
                self.fps
            )));
        }
        if let Some(crf) = self.crf {
            if crf > 51 {
                return Err(ExportError::InvalidSettings(format!(
                    "CRF out of range (0-51): {}",
                    crf
                )));
            }
        }
        validate_output_path(&self.output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let shorts = ExportSettings::from_preset(ExportPreset::Shorts1080p, "o.mp4".into());
        assert_eq!(shorts.width, 1080);
        assert_eq!(shorts.height, 1920);

        let draft = ExportSettings::from_preset(ExportPreset::Draft720p, "o.mp4".into());
        assert_eq!(draft.speed_preset, "ultrafast");
        assert_eq!(draft.crf, Some(28));

        let uhd = ExportSettings::from_preset(ExportPreset::Youtube4k, "o.mp4".into());
        assert_eq!(uhd.width, 3840);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = ExportSettings::default();
        assert!(settings.validate().is_ok());

        settings.width = 0;
        assert!(settings.validate().is_err());

        settings.width = 1921; // odd
        assert!(settings.validate().is_err());

        settings.width = 1920;
        settings.fps = 0.0;
        assert!(settings.validate().is_err());

        settings.fps = 30.0;
        settings.crf = Some(60);
        assert!(settings.validate().is_err());
    }
}
