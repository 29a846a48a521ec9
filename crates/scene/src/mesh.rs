//! Geometry buffer: per-mesh vertex attributes with derived bounds.
//!
//! Meshes are stored as triangle lists. Positions are always present;
//! normals may be missing until [`MeshBuffer::compute_normals`] runs, and an
//! index buffer is only present for welded or indexed input.

use glam::Vec3;

use crate::bounds::Aabb;
use crate::error::FormatError;

#[cfg(feature = "bevy")]
use bevy::mesh::{Indices, PrimitiveTopology};

/// Interleaved vertex layout uploaded to the GPU.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Vertex positions, optional normals and optional indices of one mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    indices: Option<Vec<u32>>,
    bounds: Aabb,
}

impl MeshBuffer {
    /// Non-indexed triangle list without normals.
    pub fn new(positions: Vec<Vec3>) -> Self {
        let bounds = Aabb::from_points(&positions);
        Self {
            positions,
            normals: None,
            indices: None,
            bounds,
        }
    }

    /// Indexed triangle list. Fails if any index points past the positions.
    pub fn try_indexed(positions: Vec<Vec3>, indices: Vec<u32>) -> Result<Self, FormatError> {
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(FormatError::IndexOutOfRange {
                index,
                vertices: positions.len(),
            });
        }
        let mut mesh = Self::new(positions);
        mesh.indices = Some(indices);
        Ok(mesh)
    }

    /// Attach per-vertex normals. Ignored if the count does not match.
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        if normals.len() == self.positions.len() {
            self.normals = Some(normals);
        } else {
            tracing::warn!(
                "Discarding {} normals for {} positions",
                normals.len(),
                self.positions.len()
            );
        }
        self
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> Option<&[Vec3]> {
        self.normals.as_deref()
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Number of vertex attributes (the position count, not unique corners).
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Cached bounds in mesh-local space.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn recompute_bounds(&mut self) {
        self.bounds = Aabb::from_points(&self.positions);
    }

    /// Vertex indices of every complete triangle.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let count = match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        };
        (0..count).map(move |tri| match &self.indices {
            Some(indices) => [indices[tri * 3], indices[tri * 3 + 1], indices[tri * 3 + 2]],
            None => {
                let base = (tri * 3) as u32;
                [base, base + 1, base + 2]
            }
        })
    }

    pub fn triangle_positions(&self, triangle: [u32; 3]) -> [Vec3; 3] {
        triangle.map(|i| self.positions[i as usize])
    }

    /// Mutable positions alongside the current normals.
    ///
    /// Returns `None` when normals have not been computed yet. Bounds are not
    /// refreshed; call [`MeshBuffer::recompute_bounds`] after editing.
    pub fn positions_mut_with_normals(&mut self) -> Option<(&mut [Vec3], &[Vec3])> {
        let normals = self.normals.as_deref()?;
        Some((&mut self.positions, normals))
    }

    /// Compute normals only if the mesh has none.
    pub fn ensure_normals(&mut self) {
        if self.normals.is_none() {
            self.compute_normals();
        }
    }

    /// Recompute vertex normals from the triangles.
    ///
    /// Indexed meshes get area-weighted smooth normals; non-indexed meshes get
    /// the face normal on each corner. Vertices not referenced by any triangle
    /// end up with a zero normal.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for triangle in self.triangles() {
            let [v0, v1, v2] = self.triangle_positions(triangle);
            // Unnormalized cross product weights by triangle area
            let face_normal = (v1 - v0).cross(v2 - v0);
            for index in triangle {
                normals[index as usize] += face_normal;
            }
        }
        for normal in &mut normals {
            *normal = normal.normalize_or_zero();
        }
        self.normals = Some(normals);
    }

    /// Bake an affine transform into positions and normals.
    pub fn transform_vertices(&mut self, matrix: &glam::Affine3A) {
        for position in &mut self.positions {
            *position = matrix.transform_point3(*position);
        }
        if let Some(normals) = &mut self.normals {
            let normal_matrix = glam::Mat3::from(matrix.matrix3).inverse().transpose();
            for normal in normals.iter_mut() {
                *normal = (normal_matrix * *normal).normalize_or_zero();
            }
        }
        // A mirroring transform flips triangle winding
        if matrix.matrix3.determinant() < 0.0 {
            self.flip_winding();
        }
        self.recompute_bounds();
    }

    fn flip_winding(&mut self) {
        match &mut self.indices {
            Some(indices) => {
                for triangle in indices.chunks_exact_mut(3) {
                    triangle.swap(1, 2);
                }
            }
            None => {
                for triangle in self.positions.chunks_exact_mut(3) {
                    triangle.swap(1, 2);
                }
                if let Some(normals) = &mut self.normals {
                    for triangle in normals.chunks_exact_mut(3) {
                        triangle.swap(1, 2);
                    }
                }
            }
        }
    }

    /// Interleaved position/normal data; missing normals upload as zero.
    pub fn gpu_vertices(&self) -> Vec<GpuVertex> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, position)| GpuVertex {
                position: position.to_array(),
                normal: self
                    .normals
                    .as_ref()
                    .map_or([0.0; 3], |normals| normals[i].to_array()),
            })
            .collect()
    }

    /// Size of the interleaved vertex buffer in bytes.
    pub fn gpu_vertex_bytes(&self) -> usize {
        bytemuck::cast_slice::<GpuVertex, u8>(&self.gpu_vertices()).len()
    }

    /// Convert to a Bevy mesh for GPU rendering.
    #[cfg(feature = "bevy")]
    pub fn to_bevy_mesh(&self) -> bevy::prelude::Mesh {
        let positions: Vec<[f32; 3]> = self.positions.iter().map(|p| p.to_array()).collect();

        let mut mesh = bevy::prelude::Mesh::new(
            PrimitiveTopology::TriangleList,
            bevy::asset::RenderAssetUsages::default(),
        );
        mesh.insert_attribute(bevy::prelude::Mesh::ATTRIBUTE_POSITION, positions);
        if let Some(normals) = &self.normals {
            let normals: Vec<[f32; 3]> = normals.iter().map(|n| n.to_array()).collect();
            mesh.insert_attribute(bevy::prelude::Mesh::ATTRIBUTE_NORMAL, normals);
        }
        if let Some(indices) = &self.indices {
            mesh.insert_indices(Indices::U32(indices.clone()));
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Affine3A;

    fn unit_triangle() -> MeshBuffer {
        MeshBuffer::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ])
    }

    #[test]
    fn test_bounds_follow_positions() {
        let mesh = unit_triangle();
        assert_eq!(mesh.bounds().min, Vec3::ZERO);
        assert_eq!(mesh.bounds().max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_flat_normals() {
        let mut mesh = unit_triangle();
        assert!(!mesh.has_normals());
        mesh.compute_normals();
        for normal in mesh.normals().unwrap() {
            assert!((*normal - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_indexed_smooth_normals() {
        // Two triangles folded 90 degrees along the shared x axis edge
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let mut mesh = MeshBuffer::try_indexed(positions, vec![0, 1, 2, 0, 3, 1]).unwrap();
        mesh.compute_normals();
        let normals = mesh.normals().unwrap();
        // Shared vertex averages +Z and +Y
        let expected = Vec3::new(0.0, 1.0, 1.0).normalize();
        assert!((normals[0] - expected).length() < 1e-5);
        assert!((normals[2] - Vec3::Z).length() < 1e-5);
        assert!((normals[3] - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_index_out_of_range() {
        let result = MeshBuffer::try_indexed(vec![Vec3::ZERO; 3], vec![0, 1, 3]);
        assert!(matches!(
            result,
            Err(FormatError::IndexOutOfRange { index: 3, vertices: 3 })
        ));
    }

    #[test]
    fn test_triangles_ignore_trailing_vertices() {
        let mesh = MeshBuffer::new(vec![Vec3::ZERO; 7]);
        assert_eq!(mesh.triangles().count(), 2);
    }

    #[test]
    fn test_mirror_transform_keeps_normals_outward() {
        let mut mesh = unit_triangle();
        mesh.compute_normals();
        mesh.transform_vertices(&Affine3A::from_scale(Vec3::new(1.0, 1.0, -1.0)));
        // Normal is mirrored to -Z and the winding agrees with it
        let normal = mesh.normals().unwrap()[0];
        assert!((normal - Vec3::NEG_Z).length() < 1e-6);
        let mut recomputed = mesh.clone();
        recomputed.compute_normals();
        assert!((recomputed.normals().unwrap()[0] - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_gpu_vertex_bytes() {
        let mesh = unit_triangle();
        assert_eq!(mesh.gpu_vertex_bytes(), 3 * 6 * 4);
    }
}
