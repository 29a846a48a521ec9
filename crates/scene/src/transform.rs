//! Placement state applied on top of normalization.

use std::f32::consts::FRAC_PI_2;

use facet_ipc::Axis;
use glam::{EulerRot, Quat, Vec3};

use crate::scene::Transform;

/// Cumulative user placement of the loaded model.
///
/// Rotation is tracked as quarter turns per axis so four rotations return
/// exactly to the start. The scale factor is relative to the normalization
/// scale and is always set, never accumulated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    quarter_turns: [u8; 3],
    mirror: [bool; 3],
    scale_factor: f32,
    pub translation: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            quarter_turns: [0; 3],
            mirror: [false; 3],
            scale_factor: 1.0,
            translation: Vec3::ZERO,
        }
    }
}

impl Placement {
    /// Add 90 degrees about one axis.
    pub fn rotate(&mut self, axis: Axis) {
        let turns = &mut self.quarter_turns[axis.index()];
        *turns = (*turns + 1) % 4;
    }

    /// Flip the sign of one scale component.
    pub fn mirror(&mut self, axis: Axis) {
        self.mirror[axis.index()] ^= true;
    }

    /// Set the scale factor. Non-finite or non-positive factors are ignored.
    pub fn set_scale_factor(&mut self, factor: f32) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            tracing::debug!("Ignoring scale factor {}", factor);
            return false;
        }
        self.scale_factor = factor;
        true
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn quarter_turns(&self) -> [u8; 3] {
        self.quarter_turns
    }

    pub fn is_mirrored(&self, axis: Axis) -> bool {
        self.mirror[axis.index()]
    }

    /// Cumulative rotation angles in radians, XYZ order.
    pub fn euler_angles(&self) -> Vec3 {
        Vec3::from_array(self.quarter_turns.map(|turns| turns as f32 * FRAC_PI_2))
    }

    pub fn rotation(&self) -> Quat {
        let angles = self.euler_angles();
        Quat::from_euler(EulerRot::XYZ, angles.x, angles.y, angles.z)
    }

    /// Mirror signs times the scale factor.
    pub fn scale(&self) -> Vec3 {
        let signs = Vec3::from_array(self.mirror.map(|m| if m { -1.0 } else { 1.0 }));
        signs * self.scale_factor
    }

    /// Local transform of a slot root carrying this placement.
    pub fn transform(&self) -> Transform {
        Transform {
            translation: self.translation,
            rotation: self.rotation(),
            scale: self.scale(),
        }
    }
}
