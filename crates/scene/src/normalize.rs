//! Fit a loaded scene into the canonical view volume.

use facet_config::CANONICAL_EXTENT;
use glam::Vec3;

use crate::bounds::Aabb;
use crate::error::DegenerateGeometryError;
use crate::scene::Scene;

/// Extent substituted for a zero or non-finite bounding box.
pub const MIN_EXTENT: f32 = 1.0;

/// Center and uniform scale that fit a scene into the canonical volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub center: Vec3,
    pub scale: f32,
    /// True when the extent was degenerate and [`MIN_EXTENT`] was used
    pub clamped: bool,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            scale: 1.0,
            clamped: false,
        }
    }
}

impl Normalization {
    /// Normalization for a world-space bounding box.
    pub fn from_bounds(bounds: &Aabb) -> Self {
        let extent = bounds.max_extent();
        let (extent, clamped) = if extent > 0.0 && extent.is_finite() {
            (extent, false)
        } else {
            tracing::warn!(
                "Degenerate model extent {}, using {} instead",
                extent,
                MIN_EXTENT
            );
            (MIN_EXTENT, true)
        };

        let center = bounds.center();
        Self {
            center: if center.is_finite() { center } else { Vec3::ZERO },
            scale: CANONICAL_EXTENT / extent,
            clamped,
        }
    }
}

/// Compute the normalization of every mesh in the scene, in world space.
///
/// Fails only when the scene has no vertices at all; a single point or a flat
/// model is clamped instead.
pub fn normalize(scene: &Scene) -> Result<Normalization, DegenerateGeometryError> {
    if scene.vertex_count(scene.root()) == 0 {
        return Err(DegenerateGeometryError("model has no vertices".into()));
    }
    Ok(Normalization::from_bounds(&scene.world_bounds(scene.root())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::MeshBuffer;
    use crate::scene::{Node, Transform};

    fn scene_with(positions: Vec<Vec3>) -> Scene {
        let mut scene = Scene::new();
        scene.add_child(scene.root(), Node::new("mesh").with_mesh(MeshBuffer::new(positions)));
        scene
    }

    #[test]
    fn test_scale_uses_largest_extent() {
        let scene = scene_with(vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(5.0, 2.0, 1.0), Vec3::ZERO]);
        let normalization = normalize(&scene).unwrap();
        assert!((normalization.scale - 0.5).abs() < 1e-6);
        assert_eq!(normalization.center, Vec3::new(2.0, 1.0, 0.5));
        assert!(!normalization.clamped);
    }

    #[test]
    fn test_world_space_bounds() {
        let mut scene = Scene::new();
        scene.add_child(
            scene.root(),
            Node::new("scaled")
                .with_transform(Transform::from_scale(Vec3::splat(10.0)))
                .with_mesh(MeshBuffer::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y])),
        );
        let normalization = normalize(&scene).unwrap();
        assert!((normalization.scale - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_single_point_is_clamped() {
        let scene = scene_with(vec![Vec3::splat(2.0); 3]);
        let normalization = normalize(&scene).unwrap();
        assert!(normalization.scale.is_finite());
        assert!(normalization.scale > 0.0);
        assert!((normalization.scale - CANONICAL_EXTENT).abs() < 1e-6);
        assert!(normalization.clamped);
        assert_eq!(normalization.center, Vec3::splat(2.0));
    }

    #[test]
    fn test_empty_scene_is_rejected() {
        let scene = Scene::new();
        assert!(normalize(&scene).is_err());
    }
}
