//! Size reduction over exported bytes: weld, simplify, quantize.
//!
//! Simplification is grid vertex clustering: every vertex snaps to the
//! average of its grid cell and triangles that collapse are dropped.
//! Compression codecs are out of scope; `compress` maps to position and
//! normal quantization.

use std::collections::HashMap;

use facet_scene::{MeshBuffer, Node, Scene, weld};
use glam::{UVec3, Vec3};

/// Grid resolution at 0% simplification.
pub const MAX_GRID_CELLS: f32 = 256.0;

/// Cells per axis for a simplification ratio in percent.
pub fn grid_cells(simplify_ratio: u8) -> u32 {
    let ratio = simplify_ratio.min(100) as f32 / 100.0;
    ((MAX_GRID_CELLS * (1.0 - ratio)).round() as u32).max(2)
}

/// Cluster vertices on a uniform grid over the mesh bounds.
///
/// Returns the input unchanged when every triangle would collapse.
pub fn simplify(mesh: &MeshBuffer, simplify_ratio: u8) -> MeshBuffer {
    if simplify_ratio == 0 {
        return mesh.clone();
    }
    let indexed = if mesh.indices().is_some() {
        mesh.clone()
    } else {
        weld(mesh)
    };

    let cells = grid_cells(simplify_ratio);
    let bounds = indexed.bounds();
    let size = bounds.size().max(Vec3::splat(f32::EPSILON));
    let max_cell = UVec3::splat(cells - 1);

    let cell_of = |p: Vec3| -> UVec3 {
        let normalized = ((p - bounds.min) / size * cells as f32).max(Vec3::ZERO);
        normalized.as_uvec3().min(max_cell)
    };

    let mut cluster_of_cell: HashMap<UVec3, u32> = HashMap::new();
    let mut sums: Vec<(Vec3, u32)> = Vec::new();
    let remap: Vec<u32> = indexed
        .positions()
        .iter()
        .map(|&p| {
            let next = sums.len() as u32;
            let cluster = *cluster_of_cell.entry(cell_of(p)).or_insert_with(|| {
                sums.push((Vec3::ZERO, 0));
                next
            });
            let (sum, count) = &mut sums[cluster as usize];
            *sum += p;
            *count += 1;
            cluster
        })
        .collect();

    let positions: Vec<Vec3> = sums.iter().map(|(sum, count)| *sum / *count as f32).collect();
    let mut indices = Vec::new();
    for triangle in indexed.triangles() {
        let [a, b, c] = triangle.map(|i| remap[i as usize]);
        if a != b && b != c && a != c {
            indices.extend([a, b, c]);
        }
    }

    if indices.is_empty() {
        tracing::warn!("Simplification collapsed every triangle, keeping the mesh");
        return mesh.clone();
    }

    match MeshBuffer::try_indexed(positions, indices) {
        Ok(mut simplified) => {
            simplified.compute_normals();
            tracing::debug!(
                "Simplified {} vertices into {} ({} cells per axis)",
                indexed.vertex_count(),
                simplified.vertex_count(),
                cells
            );
            simplified
        }
        Err(_) => mesh.clone(),
    }
}

fn quantize_value(value: f32, min: f32, extent: f32, levels: f32) -> f32 {
    if extent <= 0.0 {
        return value;
    }
    let step = ((value - min) / extent * levels).round();
    min + step / levels * extent
}

/// Snap positions to `bits` per axis over the mesh bounds and normals to
/// `max(6, bits - 2)` bits per component.
pub fn quantize(mesh: &MeshBuffer, bits: u8) -> MeshBuffer {
    let bits = bits.clamp(1, 16);
    let levels = ((1u32 << bits) - 1) as f32;
    let normal_bits = bits.saturating_sub(2).max(6);
    let normal_levels = ((1u32 << normal_bits) - 1) as f32;

    let bounds = mesh.bounds();
    let size = bounds.size();
    let positions: Vec<Vec3> = mesh
        .positions()
        .iter()
        .map(|p| {
            Vec3::new(
                quantize_value(p.x, bounds.min.x, size.x, levels),
                quantize_value(p.y, bounds.min.y, size.y, levels),
                quantize_value(p.z, bounds.min.z, size.z, levels),
            )
        })
        .collect();

    let mut out = match mesh.indices() {
        Some(indices) => match MeshBuffer::try_indexed(positions, indices.to_vec()) {
            Ok(out) => out,
            Err(_) => return mesh.clone(),
        },
        None => MeshBuffer::new(positions),
    };
    if let Some(normals) = mesh.normals() {
        let normals = normals
            .iter()
            .map(|n| {
                let q = |c: f32| quantize_value(c, -1.0, 2.0, normal_levels);
                Vec3::new(q(n.x), q(n.y), q(n.z)).normalize_or_zero()
            })
            .collect();
        out = out.with_normals(normals);
    }
    out
}

/// Run the enabled passes over every mesh (transforms baked first).
pub fn optimize_scene(scene: &Scene, weld_vertices: bool, simplify_ratio: u8, quantization_bits: Option<u8>) -> Scene {
    let flat = scene.flatten();
    let mut root = Node::new("optimized");
    if let Some(node) = flat.node(flat.root()) {
        for mesh in &node.meshes {
            let mut mesh = if weld_vertices { weld(mesh) } else { mesh.clone() };
            mesh = simplify(&mesh, simplify_ratio);
            if let Some(bits) = quantization_bits {
                mesh = quantize(&mesh, bits);
            }
            root.meshes.push(mesh);
        }
    }
    Scene::with_root(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Indexed grid with n x n quads over [0, 1]^2
    fn grid(n: u32) -> MeshBuffer {
        let mut positions = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                positions.push(Vec3::new(i as f32 / n as f32, j as f32 / n as f32, 0.0));
            }
        }
        let mut indices = Vec::new();
        let row = n + 1;
        for j in 0..n {
            for i in 0..n {
                let a = j * row + i;
                indices.extend([a, a + 1, a + row + 1, a, a + row + 1, a + row]);
            }
        }
        let mut mesh = MeshBuffer::try_indexed(positions, indices).unwrap();
        mesh.compute_normals();
        mesh
    }

    #[test]
    fn test_grid_cells() {
        assert_eq!(grid_cells(0), 256);
        assert_eq!(grid_cells(50), 128);
        assert_eq!(grid_cells(100), 2);
        assert_eq!(grid_cells(99), 3);
        assert_eq!(grid_cells(200), 2);
    }

    #[test]
    fn test_simplify_reduces_triangles() {
        let mesh = grid(40);
        let simplified = simplify(&mesh, 95);
        assert!(simplified.triangles().count() < mesh.triangles().count());
        assert!(simplified.vertex_count() < mesh.vertex_count());
        // Averages stay inside the original bounds
        let bounds = simplified.bounds();
        assert!(bounds.min.x >= 0.0 && bounds.max.x <= 1.0);
    }

    #[test]
    fn test_simplify_zero_is_identity() {
        let mesh = grid(4);
        assert_eq!(simplify(&mesh, 0), mesh);
    }

    #[test]
    fn test_full_collapse_keeps_mesh() {
        let mesh = MeshBuffer::new(vec![Vec3::ZERO, Vec3::ZERO, Vec3::X]);
        let simplified = simplify(&mesh, 50);
        assert_eq!(simplified, mesh);
    }

    #[test]
    fn test_quantize_snaps_to_levels() {
        let mesh = MeshBuffer::new(vec![Vec3::ZERO, Vec3::new(1.0, 0.3, 0.0), Vec3::new(0.0, 1.0, 0.0)]);
        let quantized = quantize(&mesh, 2);
        // 2 bits -> 3 steps over [0, 1]
        let y = quantized.positions()[1].y;
        assert!((y - 1.0 / 3.0).abs() < 1e-6);
        // Bounds corners are preserved exactly
        assert_eq!(quantized.positions()[0], Vec3::ZERO);
        assert_eq!(quantized.positions()[1].x, 1.0);
    }

    #[test]
    fn test_quantize_keeps_unit_normals() {
        let quantized = quantize(&grid(3), 11);
        for n in quantized.normals().unwrap() {
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_optimize_scene_weld() {
        let soup = MeshBuffer::new(
            grid(2)
                .triangles()
                .flat_map(|t| grid(2).triangle_positions(t))
                .collect(),
        );
        let scene = Scene::with_root(Node::new("soup").with_mesh(soup));
        let optimized = optimize_scene(&scene, true, 0, None);
        assert_eq!(optimized.vertex_count(optimized.root()), 9);
    }
}
