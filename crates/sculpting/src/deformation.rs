//! Vertex displacement along normals.

use facet_scene::MeshBuffer;

use crate::brush::Dab;

/// Result of applying a dab.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeformationResult {
    /// Vertices that moved
    pub moved: usize,
    /// Largest absolute displacement applied
    pub max_displacement: f32,
}

impl DeformationResult {
    pub fn is_empty(&self) -> bool {
        self.moved == 0
    }
}

/// Push every vertex within the dab sphere along its current normal.
///
/// Normals are read as they are, not recomputed; a mesh without normals is
/// left untouched. Bounds are refreshed when anything moved.
pub fn apply_dab(mesh: &mut MeshBuffer, dab: &Dab) -> DeformationResult {
    let mut result = DeformationResult::default();
    let Some((positions, normals)) = mesh.positions_mut_with_normals() else {
        tracing::warn!("Sculpt dab on a mesh without normals");
        return result;
    };

    for (position, normal) in positions.iter_mut().zip(normals) {
        let displacement = dab.displacement_at(*position);
        if displacement == 0.0 {
            continue;
        }
        *position += *normal * displacement;
        result.moved += 1;
        result.max_displacement = result.max_displacement.max(displacement.abs());
    }

    if !result.is_empty() {
        mesh.recompute_bounds();
    }
    result
}
