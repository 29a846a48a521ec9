//! Application configuration composed from the shared defaults

use facet_config::{BrushConfig, CameraConfig, ConversionConfig, DisplayConfig};
use facet_scene::ModelFormat;

/// Target format override (`glb`, `stl`, `obj`, ...)
pub const ENV_TARGET: &str = "FACET_TARGET";
/// Quantization bits used when compression is requested
pub const ENV_QUANTIZATION_BITS: &str = "FACET_QUANTIZATION_BITS";
/// Brush radius in world units
pub const ENV_BRUSH_RADIUS: &str = "FACET_BRUSH_RADIUS";
/// Brush strength per pointer event
pub const ENV_BRUSH_STRENGTH: &str = "FACET_BRUSH_STRENGTH";

/// Everything the application context is built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub display: DisplayConfig,
    pub camera: CameraConfig,
    pub brush: BrushConfig,
    pub conversion: ConversionConfig,
}

impl AppConfig {
    /// Defaults with overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from `lookup`. Invalid values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(target) = lookup(ENV_TARGET) {
            match ModelFormat::from_extension(&target) {
                Ok(format) if format.is_target() => {
                    config.conversion.target = format.extension().to_string();
                }
                _ => tracing::warn!("Ignoring {}={:?}: not a target format", ENV_TARGET, target),
            }
        }

        if let Some(bits) = lookup(ENV_QUANTIZATION_BITS) {
            match bits.parse::<u8>() {
                Ok(bits) if (1..=16).contains(&bits) => config.conversion.quantization_bits = bits,
                _ => tracing::warn!("Ignoring {}={:?}", ENV_QUANTIZATION_BITS, bits),
            }
        }

        if let Some(radius) = parse_positive(&lookup, ENV_BRUSH_RADIUS) {
            config.brush.radius = radius;
        }
        if let Some(strength) = parse_positive(&lookup, ENV_BRUSH_STRENGTH) {
            config.brush.strength = strength;
        }

        config
    }

    /// Configured target, falling back to the default when unrecognized.
    pub fn target_format(&self) -> ModelFormat {
        ModelFormat::from_extension(&self.conversion.target)
            .ok()
            .filter(|format| format.is_target())
            .unwrap_or(ModelFormat::Glb)
    }
}

fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<f32> {
    let value = lookup(key)?;
    match value.parse::<f32>() {
        Ok(parsed) if parsed.is_finite() && parsed > 0.0 => Some(parsed),
        _ => {
            tracing::warn!("Ignoring {}={:?}", key, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_env() {
        let config = config_with(&[]);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.target_format(), ModelFormat::Glb);
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            (ENV_TARGET, "STL"),
            (ENV_QUANTIZATION_BITS, "14"),
            (ENV_BRUSH_RADIUS, "0.5"),
            (ENV_BRUSH_STRENGTH, "0.02"),
        ]);
        assert_eq!(config.target_format(), ModelFormat::Stl);
        assert_eq!(config.conversion.quantization_bits, 14);
        assert!((config.brush.radius - 0.5).abs() < f32::EPSILON);
        assert!((config.brush.strength - 0.02).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_values_ignored() {
        let config = config_with(&[
            (ENV_TARGET, "fbx"),
            (ENV_QUANTIZATION_BITS, "40"),
            (ENV_BRUSH_RADIUS, "-1"),
            (ENV_BRUSH_STRENGTH, "NaN"),
        ]);
        assert_eq!(config, AppConfig::default());
    }
}
