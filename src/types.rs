//! Reelcut Core Type Definitions
//!
//! Defines fundamental types used throughout the export pipeline.

use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// ID Types
// =============================================================================

/// Timeline element unique identifier (ULID)
pub type ElementId = String;

/// Track unique identifier (ULID)
pub type TrackId = String;

/// Media catalog entry unique identifier (ULID)
pub type MediaId = String;

/// Export session unique identifier (ULID)
pub type SessionId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

// =============================================================================
// Spatial Types
// =============================================================================

/// 2D coordinates in canvas pixels
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// 2D size in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size2D {
    pub width: u32,
    pub height: u32,
}

impl Size2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

// =============================================================================
// Color
// =============================================================================

/// Color (RGBA)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red (0.0 ~ 1.0)
    pub r: f32,
    /// Green (0.0 ~ 1.0)
    pub g: f32,
    /// Blue (0.0 ~ 1.0)
    pub b: f32,
    /// Alpha (0.0 ~ 1.0, optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a: Option<f32>,
}

impl Color {
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: None,
        }
    }

    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: Some(a.clamp(0.0, 1.0)),
        }
    }

    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// Parses a hex color string (e.g. `#RRGGBB`, `#RRGGBBAA`, `#RGB`, `#RGBA`).
    pub fn try_from_hex(hex: &str) -> Result<Self, String> {
        let hex = hex.trim().trim_start_matches('#');
        let len = hex.len();

        if len != 3 && len != 4 && len != 6 && len != 8 {
            return Err(format!("Invalid hex color length: {}", len));
        }

        let parse_channel = |s: &str| -> Result<f32, String> {
            u8::from_str_radix(s, 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|e| e.to_string())
        };

        // Short hex (3 or 4 chars): each digit expands, e.g. F -> FF
        if len == 3 || len == 4 {
            let expand = |s: &str| -> Result<f32, String> {
                let v = u8::from_str_radix(s, 16).map_err(|e| e.to_string())?;
                Ok((v * 17) as f32 / 255.0)
            };

            let r = expand(&hex[0..1])?;
            let g = expand(&hex[1..2])?;
            let b = expand(&hex[2..3])?;

            if len == 4 {
                let a = expand(&hex[3..4])?;
                return Ok(Self::rgba(r, g, b, a));
            }
            return Ok(Self::rgb(r, g, b));
        }

        let r = parse_channel(&hex[0..2])?;
        let g = parse_channel(&hex[2..4])?;
        let b = parse_channel(&hex[4..6])?;

        if len == 8 {
            let a = parse_channel(&hex[6..8])?;
            Ok(Self::rgba(r, g, b, a))
        } else {
            Ok(Self::rgb(r, g, b))
        }
    }

    /// Parses a hex color string, falling back to white on invalid input.
    pub fn from_hex(hex: &str) -> Self {
        match Self::try_from_hex(hex) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    "Failed to parse hex color '{}': {}, defaulting to white",
                    hex, e
                );
                Self::white()
            }
        }
    }

    /// Formats the color for an FFmpeg filter expression.
    ///
    /// Opaque colors render as `0xRRGGBB`; colors with an alpha channel
    /// append `@A.AA` (FFmpeg's per-color alpha syntax). The conversion is
    /// lossless for opaque 8-bit channels.
    pub fn to_filter_color(&self) -> String {
        let r = (self.r * 255.0).round() as u8;
        let g = (self.g * 255.0).round() as u8;
        let b = (self.b * 255.0).round() as u8;

        match self.a {
            Some(a) if a < 1.0 => format!("0x{:02X}{:02X}{:02X}@{:.2}", r, g, b, a),
            _ => format!("0x{:02X}{:02X}{:02X}", r, g, b),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::white()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parse_full() {
        let c = Color::try_from_hex("#FF8000").unwrap();
        assert!((c.r - 1.0).abs() < 1e-6);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert!((c.b - 0.0).abs() < 1e-6);
        assert!(c.a.is_none());
    }

    #[test]
    fn test_hex_parse_short() {
        let c = Color::try_from_hex("#F80").unwrap();
        assert!((c.r - 1.0).abs() < 1e-6);
        assert!((c.g - 136.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_hex_parse_with_alpha() {
        let c = Color::try_from_hex("#FF000080").unwrap();
        let a = c.a.unwrap();
        assert!((a - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_hex_parse_invalid() {
        assert!(Color::try_from_hex("#FF80").is_ok()); // 4-digit short form
        assert!(Color::try_from_hex("#FF800").is_err());
        assert!(Color::try_from_hex("not-a-color").is_err());
    }

    #[test]
    fn test_filter_color_opaque_roundtrip() {
        // Opaque conversion must be lossless for 8-bit channels.
        let c = Color::try_from_hex("#1A2B3C").unwrap();
        assert_eq!(c.to_filter_color(), "0x1A2B3C");
    }

    #[test]
    fn test_filter_color_preserves_alpha() {
        let c = Color::rgba(1.0, 0.0, 0.0, 0.5);
        assert_eq!(c.to_filter_color(), "0xFF0000@0.50");
    }

    #[test]
    fn test_filter_color_full_alpha_is_opaque() {
        let c = Color::rgba(0.0, 0.0, 0.0, 1.0);
        assert_eq!(c.to_filter_color(), "0x000000");
    }

    #[test]
    fn test_from_hex_fallback() {
        let c = Color::from_hex("garbage");
        assert_eq!(c, Color::white());
    }
}
