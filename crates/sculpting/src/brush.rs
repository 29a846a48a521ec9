//! Brush settings and falloff.
//!
//! A brush is a world-space sphere; each pointer event under it becomes one
//! [`Dab`] expressed in the local space of the mesh that was hit.

use facet_config::BrushConfig;
use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

/// Linear falloff at a normalized distance (0.0 = center, 1.0 = edge).
///
/// One at the center, zero at and beyond the edge.
pub fn falloff(normalized_distance: f32) -> f32 {
    if normalized_distance >= 1.0 {
        return 0.0;
    }
    1.0 - normalized_distance.max(0.0)
}

/// Whether dabs push the surface out or in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Polarity {
    #[default]
    Inflate,
    Deflate,
}

impl Polarity {
    pub fn sign(self) -> f32 {
        match self {
            Polarity::Inflate => 1.0,
            Polarity::Deflate => -1.0,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Polarity::Inflate => Polarity::Deflate,
            Polarity::Deflate => Polarity::Inflate,
        }
    }
}

/// Current brush settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    radius: f32,
    strength: f32,
    pub polarity: Polarity,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self::from_config(&BrushConfig::default())
    }
}

impl BrushSettings {
    pub fn from_config(config: &BrushConfig) -> Self {
        let defaults = BrushConfig::default();
        let mut settings = Self {
            radius: defaults.radius,
            strength: defaults.strength,
            polarity: if config.inflate {
                Polarity::Inflate
            } else {
                Polarity::Deflate
            },
        };
        settings.set_radius(config.radius);
        settings.set_strength(config.strength);
        settings
    }

    /// World-space radius
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Displacement at the brush center per event
    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Set the world radius. Non-finite or non-positive values are ignored.
    pub fn set_radius(&mut self, radius: f32) -> bool {
        if !radius.is_finite() || radius <= 0.0 {
            tracing::debug!("Ignoring brush radius {}", radius);
            return false;
        }
        self.radius = radius;
        true
    }

    /// Set the strength. Non-finite or non-positive values are ignored.
    pub fn set_strength(&mut self, strength: f32) -> bool {
        if !strength.is_finite() || strength <= 0.0 {
            tracing::debug!("Ignoring brush strength {}", strength);
            return false;
        }
        self.strength = strength;
        true
    }

    pub fn toggle_polarity(&mut self) {
        self.polarity = self.polarity.toggled();
    }

    /// Signed displacement for a vertex at `distance` from a center with
    /// brush radius `radius` (both in the same space).
    pub fn displacement(&self, distance: f32, radius: f32) -> f32 {
        if radius <= 0.0 {
            return 0.0;
        }
        self.strength * falloff(distance / radius) * self.polarity.sign()
    }
}

/// One brush application in mesh-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dab {
    pub center: Vec3,
    pub radius: f32,
    pub settings: BrushSettings,
}

impl Dab {
    /// Express a world-space hit in the local space of a mesh with the given
    /// world matrix.
    ///
    /// The radius is divided by the length of the world X axis, so meshes
    /// under non-uniform scale get a sphere sized for their X scale only.
    pub fn for_hit(local_center: Vec3, world: &Affine3A, settings: BrushSettings) -> Self {
        let world_scale = world.matrix3.x_axis.length();
        let radius = if world_scale > f32::EPSILON {
            settings.radius() / world_scale
        } else {
            settings.radius()
        };
        Self {
            center: local_center,
            radius,
            settings,
        }
    }

    pub fn displacement_at(&self, position: Vec3) -> f32 {
        self.settings.displacement(position.distance(self.center), self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_falloff_endpoints() {
        assert_eq!(falloff(0.0), 1.0);
        assert!((falloff(0.25) - 0.75).abs() < 1e-6);
        assert_eq!(falloff(1.0), 0.0);
        assert_eq!(falloff(3.0), 0.0);
        assert_eq!(falloff(-0.5), 1.0);
    }

    #[test]
    fn test_displacement_sign_and_magnitude() {
        let mut settings = BrushSettings::default();
        assert!((settings.displacement(0.0, 0.2) - 0.1).abs() < 1e-6);
        assert_eq!(settings.displacement(0.2, 0.2), 0.0);
        assert_eq!(settings.displacement(0.5, 0.2), 0.0);

        settings.toggle_polarity();
        assert_eq!(settings.polarity, Polarity::Deflate);
        assert!((settings.displacement(0.0, 0.2) + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_setters_ignore_invalid_values() {
        let mut settings = BrushSettings::default();
        assert!(!settings.set_radius(0.0));
        assert!(!settings.set_radius(f32::INFINITY));
        assert!(!settings.set_strength(-1.0));
        assert!(!settings.set_strength(f32::NAN));
        assert_eq!(settings, BrushSettings::default());

        assert!(settings.set_radius(0.5));
        assert_eq!(settings.radius(), 0.5);
    }

    #[test]
    fn test_from_config_rejects_bad_values() {
        let config = BrushConfig {
            radius: -3.0,
            strength: 0.4,
            inflate: false,
        };
        let settings = BrushSettings::from_config(&config);
        assert_eq!(settings.radius(), BrushConfig::default().radius);
        assert_eq!(settings.strength(), 0.4);
        assert_eq!(settings.polarity, Polarity::Deflate);
    }

    #[test]
    fn test_dab_local_radius() {
        let world = Affine3A::from_scale(Vec3::splat(4.0));
        let dab = Dab::for_hit(Vec3::ZERO, &world, BrushSettings::default());
        assert!((dab.radius - 0.05).abs() < 1e-6);

        // Only the X scale is used
        let stretched = Affine3A::from_scale(Vec3::new(2.0, 8.0, 8.0));
        let dab = Dab::for_hit(Vec3::ZERO, &stretched, BrushSettings::default());
        assert!((dab.radius - 0.1).abs() < 1e-6);
    }
}
