//! Damped orbit camera
//!
//! Controls:
//! - Pointer drag: Orbit around target (damped, settles over several frames)
//! - Scroll wheel: Dolly (zoom, immediate)

use facet_config::CameraConfig;
use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use crate::raycast::Ray;

/// Camera matrices shared by both halves of a split frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub eye: Vec3,
}

/// Camera orbit controller state
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    /// Point the camera orbits around
    pub target: Vec3,
    /// Distance from target
    pub distance: f32,
    /// Horizontal angle (yaw) in radians
    pub yaw: f32,
    /// Vertical angle (pitch) in radians
    pub pitch: f32,
    /// Orbit sensitivity (radians per pixel)
    pub orbit_sensitivity: f32,
    /// Zoom sensitivity (fraction of the distance per scroll line)
    pub zoom_sensitivity: f32,
    /// Minimum distance from target
    pub min_distance: f32,
    /// Maximum distance from target
    pub max_distance: f32,
    /// Fraction of the pending orbit applied per update
    pub damping: f32,
    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
    pending: Vec2,
    config: CameraConfig,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(&CameraConfig::default())
    }
}

impl OrbitCamera {
    /// Camera at `(0, 0, distance)` looking at the origin.
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            target: Vec3::ZERO,
            distance: config.distance,
            yaw: 0.0,
            pitch: 0.0,
            orbit_sensitivity: 0.005,
            zoom_sensitivity: 0.1,
            min_distance: 0.5,
            max_distance: 200.0,
            damping: config.damping,
            fov: config.fov_degrees.to_radians(),
            near: config.near,
            far: config.far,
            aspect: facet_config::DEFAULT_WIDTH as f32 / facet_config::DEFAULT_HEIGHT as f32,
            pending: Vec2::ZERO,
            config: config.clone(),
        }
    }

    /// Calculate camera position from orbit parameters
    pub fn calculate_position(&self) -> Vec3 {
        // Pitch is the angle from horizontal, yaw the angle around Y
        let horizontal_distance = self.distance * self.pitch.cos();
        let y = self.distance * self.pitch.sin();
        let x = horizontal_distance * self.yaw.sin();
        let z = horizontal_distance * self.yaw.cos();

        self.target + Vec3::new(x, y, z)
    }

    /// Queue an orbit by a pointer drag in pixels.
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        self.pending += Vec2::new(delta_x, delta_y) * self.orbit_sensitivity;
    }

    /// Dolly toward (positive delta) or away from the target.
    pub fn zoom(&mut self, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        let zoom_amount = delta * self.zoom_sensitivity * self.distance;
        self.distance = (self.distance - zoom_amount).clamp(self.min_distance, self.max_distance);
    }

    /// Whether queued orbit motion is still settling.
    pub fn is_settling(&self) -> bool {
        self.pending != Vec2::ZERO
    }

    /// Advance damping by one frame.
    pub fn update(&mut self) {
        if !self.is_settling() {
            return;
        }
        let factor = if self.damping > 0.0 && self.damping < 1.0 {
            self.damping
        } else {
            1.0
        };
        let step = self.pending * factor;
        self.pending -= step;
        if self.pending.length_squared() < 1e-12 {
            self.pending = Vec2::ZERO;
        }

        // Dragging right turns the view around the model to the left
        self.yaw -= step.x;
        // Clamp pitch to prevent flipping (just below straight up/down)
        self.pitch = (self.pitch + step.y).clamp(-1.5, 1.5);
    }

    /// Match the aspect ratio to the surface. Zero-sized surfaces are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.aspect = width as f32 / height as f32;
        true
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Reset to default view
    pub fn reset(&mut self) {
        let aspect = self.aspect;
        *self = Self::new(&self.config);
        self.aspect = aspect;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.calculate_position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect, self.near, self.far)
    }

    pub fn uniforms(&self) -> ViewUniforms {
        ViewUniforms {
            view: self.view_matrix(),
            projection: self.projection_matrix(),
            eye: self.calculate_position(),
        }
    }

    /// World-space ray through a point in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = (self.projection_matrix() * self.view_matrix()).inverse();
        let far = inverse * ndc.extend(1.0).extend(1.0);
        let far = far.xyz() / far.w;
        let eye = self.calculate_position();
        Ray::new(eye, far - eye)
    }
}

/// Convert a surface pixel position (origin top-left) to NDC.
pub fn pixel_to_ndc(x: f32, y: f32, width: u32, height: u32) -> Option<Vec2> {
    if width == 0 || height == 0 {
        return None;
    }
    Some(Vec2::new(
        x / width as f32 * 2.0 - 1.0,
        -(y / height as f32 * 2.0 - 1.0),
    ))
}
