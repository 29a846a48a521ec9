//! Vertex welding: merge duplicate corners into an indexed mesh.

use std::collections::HashMap;

use glam::Vec3;

use crate::mesh::MeshBuffer;
use crate::scene::{NodeId, Scene};

/// Attribute values closer than this are merged (4 decimal places).
pub const WELD_PRECISION: f32 = 1e-4;

type WeldKey = [i64; 6];

fn quantize(value: Vec3) -> [i64; 3] {
    (value / WELD_PRECISION).round().to_array().map(|c| c as i64)
}

fn weld_key(position: Vec3, normal: Option<Vec3>) -> WeldKey {
    let [px, py, pz] = quantize(position);
    let [nx, ny, nz] = normal.map_or([0; 3], quantize);
    [px, py, pz, nx, ny, nz]
}

/// Merge vertices whose position and normal agree after rounding.
///
/// The first occurrence of each key keeps its exact attributes. Trailing
/// vertices that do not form a complete triangle are dropped.
pub fn weld(mesh: &MeshBuffer) -> MeshBuffer {
    let normals = mesh.normals();
    let mut lookup: HashMap<WeldKey, u32> = HashMap::new();
    let mut positions = Vec::new();
    let mut welded_normals = Vec::new();
    let mut indices = Vec::new();

    for triangle in mesh.triangles() {
        for index in triangle {
            let position = mesh.positions()[index as usize];
            let normal = normals.map(|n| n[index as usize]);
            let next = positions.len() as u32;
            let welded = *lookup.entry(weld_key(position, normal)).or_insert_with(|| {
                positions.push(position);
                if let Some(normal) = normal {
                    welded_normals.push(normal);
                }
                next
            });
            indices.push(welded);
        }
    }

    let before = mesh.vertex_count();
    let mut out = match MeshBuffer::try_indexed(positions, indices) {
        Ok(out) => out,
        // Indices are produced from the positions pushed above
        Err(_) => return mesh.clone(),
    };
    if normals.is_some() {
        out = out.with_normals(welded_normals);
    }
    tracing::debug!("Welded {} vertices into {}", before, out.vertex_count());
    out
}

/// Weld every mesh under `subtree` in place.
pub fn weld_scene(scene: &mut Scene, subtree: NodeId) {
    for mesh_ref in scene.mesh_refs(subtree) {
        if let Some(mesh) = scene.mesh_mut(mesh_ref) {
            *mesh = weld(mesh);
        }
    }
}
