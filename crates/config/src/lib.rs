//! Shared configuration for Facet
//!
//! This crate provides the single source of truth for viewport dimensions,
//! camera, brush and conversion defaults shared by the scene, sculpting and
//! application crates.

use serde::{Deserialize, Serialize};

/// Default viewport width in pixels
pub const DEFAULT_WIDTH: u32 = 1280;

/// Default viewport height in pixels
pub const DEFAULT_HEIGHT: u32 = 800;

/// Default scale factor (1.0 = no scaling)
pub const DEFAULT_SCALE: f32 = 1.0;

/// Edge length of the canonical view volume a loaded model is fitted into.
pub const CANONICAL_EXTENT: f32 = 3.0;

/// Default target format for conversions.
pub const DEFAULT_TARGET_FORMAT: &str = "glb";

/// Default position quantization used when compression is requested.
pub const DEFAULT_QUANTIZATION_BITS: u8 = 11;

/// Display configuration for the output surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Surface width in logical pixels
    pub width: u32,
    /// Surface height in logical pixels
    pub height: u32,
    /// Scale factor for DPI scaling
    pub scale: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            scale: DEFAULT_SCALE,
        }
    }
}

impl DisplayConfig {
    /// Create a new display config with the given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale: DEFAULT_SCALE,
        }
    }

    /// Get scaled width (for physical pixel calculations)
    pub fn scaled_width(&self) -> u32 {
        (self.width as f32 * self.scale) as u32
    }

    /// Get scaled height (for physical pixel calculations)
    pub fn scaled_height(&self) -> u32 {
        (self.height as f32 * self.scale) as u32
    }
}

/// Perspective camera and orbit damping defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Initial distance from the orbit target (camera starts at `(0, 0, distance)`)
    pub distance: f32,
    /// Fraction of the pending orbit delta applied per frame
    pub damping: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            distance: 5.0,
            damping: 0.05,
        }
    }
}

/// Sculpt brush defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushConfig {
    /// Brush radius in world units
    pub radius: f32,
    /// Displacement per pointer event at the brush center
    pub strength: f32,
    /// Inflate (true) or deflate (false)
    pub inflate: bool,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            radius: 0.2,
            strength: 0.1,
            inflate: true,
        }
    }
}

/// Conversion settings that are not chosen per request.
///
/// Per-request toggles (weld, simplify, compress) live on the conversion
/// message and carry their own defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Target format extension
    pub target: String,
    /// Position quantization applied when compressing GLB output
    pub quantization_bits: u8,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET_FORMAT.to_string(),
            quantization_bits: DEFAULT_QUANTIZATION_BITS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DisplayConfig::default();
        assert_eq!(config.width, DEFAULT_WIDTH);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.scale, DEFAULT_SCALE);
    }

    #[test]
    fn test_scaled_dimensions() {
        let mut config = DisplayConfig::new(1920, 1080);
        config.scale = 2.0;
        assert_eq!(config.scaled_width(), 3840);
        assert_eq!(config.scaled_height(), 2160);
    }

    #[test]
    fn test_conversion_defaults() {
        let config = ConversionConfig::default();
        assert_eq!(config.target, "glb");
        assert_eq!(config.quantization_bits, 11);
    }

    #[test]
    fn test_brush_defaults() {
        let brush = BrushConfig::default();
        assert!(brush.inflate);
        assert!((brush.radius - 0.2).abs() < f32::EPSILON);
        assert!((brush.strength - 0.1).abs() < f32::EPSILON);
    }
}
