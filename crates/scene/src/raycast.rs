//! Ray-mesh intersection for sculpt hit testing.
//!
//! Rays are tested against each mesh in its local space using the
//! Moller-Trumbore algorithm; the closest hit across a subtree is chosen by
//! world-space distance so differently scaled meshes compare correctly.

use glam::{Affine3A, Mat3, Vec3};

use crate::mesh::MeshBuffer;
use crate::scene::{MeshRef, NodeId, Scene};

/// Epsilon for floating point comparisons in ray intersection
const EPSILON: f32 = 1e-6;

/// A ray with a normalized direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// The same ray expressed in another space. The direction is re-normalized,
    /// so `t` values are not comparable across spaces.
    pub fn transformed(&self, matrix: &Affine3A) -> Ray {
        Ray::new(
            matrix.transform_point3(self.origin),
            matrix.transform_vector3(self.direction),
        )
    }
}

/// Result of a ray-triangle intersection test
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Distance along the ray to the intersection point
    pub t: f32,
    /// Barycentric coordinate u (weight for vertex 1)
    pub u: f32,
    /// Barycentric coordinate v (weight for vertex 2)
    pub v: f32,
}

/// Moller-Trumbore ray-triangle intersection.
///
/// Both faces are hit: sculpting works from inside open meshes too.
pub fn ray_triangle_intersection(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);

    // Ray parallel to the triangle plane
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let tvec = ray.origin - v0;

    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if t < EPSILON {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Interpolate a Vec3 attribute using barycentric coordinates.
pub fn interpolate_vec3(v0: Vec3, v1: Vec3, v2: Vec3, u: f32, v: f32) -> Vec3 {
    let w = 1.0 - u - v;
    v0 * w + v1 * u + v2 * v
}

/// Closest hit on a single mesh, in mesh-local space.
#[derive(Debug, Clone, Copy)]
pub struct MeshHit {
    pub t: f32,
    pub point: Vec3,
    /// Interpolated vertex normal, or the face normal when normals are missing
    pub normal: Vec3,
    pub face: u32,
}

/// Cast a local-space ray against every triangle of a mesh.
pub fn raycast_mesh(ray: &Ray, mesh: &MeshBuffer) -> Option<MeshHit> {
    let mut closest: Option<(TriangleHit, u32, [u32; 3])> = None;

    // Brute force over all triangles
    for (face, triangle) in mesh.triangles().enumerate() {
        let [v0, v1, v2] = mesh.triangle_positions(triangle);
        let Some(hit) = ray_triangle_intersection(ray, v0, v1, v2) else {
            continue;
        };
        if closest.as_ref().is_none_or(|(prev, _, _)| hit.t < prev.t) {
            closest = Some((hit, face as u32, triangle));
        }
    }

    closest.map(|(hit, face, triangle)| {
        let [v0, v1, v2] = mesh.triangle_positions(triangle);
        let face_normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        let normal = match mesh.normals() {
            Some(normals) => {
                let [i0, i1, i2] = triangle.map(|i| normals[i as usize]);
                interpolate_vec3(i0, i1, i2, hit.u, hit.v).try_normalize()
            }
            None => None,
        }
        .unwrap_or(face_normal);

        MeshHit {
            t: hit.t,
            point: ray.at(hit.t),
            normal,
            face,
        }
    })
}

/// Closest hit within a scene subtree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneHit {
    pub mesh: MeshRef,
    /// Hit point in world space
    pub point: Vec3,
    /// Hit point in the mesh's local space
    pub local_point: Vec3,
    /// World-space unit normal at the hit
    pub normal: Vec3,
    /// World-space distance from the ray origin
    pub distance: f32,
    pub face: u32,
}

/// Cast a world-space ray against every mesh under `subtree`.
pub fn raycast_scene(scene: &Scene, subtree: NodeId, ray: &Ray) -> Option<SceneHit> {
    let mut closest: Option<SceneHit> = None;

    for mesh_ref in scene.mesh_refs(subtree) {
        let Some(mesh) = scene.mesh(mesh_ref) else {
            continue;
        };
        let world = scene.world_matrix(mesh_ref.node);
        if world.matrix3.determinant().abs() < f32::EPSILON {
            continue;
        }
        let local_ray = ray.transformed(&world.inverse());
        let Some(hit) = raycast_mesh(&local_ray, mesh) else {
            continue;
        };

        let point = world.transform_point3(hit.point);
        let distance = point.distance(ray.origin);
        if closest.as_ref().is_some_and(|prev| distance >= prev.distance) {
            continue;
        }

        let normal_matrix = Mat3::from(world.matrix3).inverse().transpose();
        closest = Some(SceneHit {
            mesh: mesh_ref,
            point,
            local_point: hit.point,
            normal: (normal_matrix * hit.normal).normalize_or_zero(),
            distance,
            face: hit.face,
        });
    }

    closest
}
