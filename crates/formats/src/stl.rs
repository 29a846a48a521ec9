//! STL reader (binary and ASCII) and writer.

use std::fmt::Write as _;

use facet_scene::{ExportError, FormatError, MeshBuffer, Node, Scene};
use glam::Vec3;

const HEADER_LEN: usize = 80;
const TRIANGLE_LEN: usize = 50;

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

fn read_vec3(bytes: &[u8], offset: usize) -> Vec3 {
    Vec3::new(
        read_f32(bytes, offset),
        read_f32(bytes, offset + 4),
        read_f32(bytes, offset + 8),
    )
}

/// True when the byte length matches the binary layout for its triangle count.
fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_LEN + 4 {
        return false;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    count
        .checked_mul(TRIANGLE_LEN)
        .and_then(|body| body.checked_add(HEADER_LEN + 4))
        == Some(bytes.len())
}

fn parse_binary(bytes: &[u8]) -> Vec<Vec3> {
    let count = (bytes.len() - HEADER_LEN - 4) / TRIANGLE_LEN;
    let mut positions = Vec::with_capacity(count * 3);
    for triangle in 0..count {
        // Skip the stored facet normal; normals are recomputed from winding
        let base = HEADER_LEN + 4 + triangle * TRIANGLE_LEN + 12;
        for corner in 0..3 {
            positions.push(read_vec3(bytes, base + corner * 12));
        }
    }
    positions
}

fn parse_ascii(text: &str) -> Result<Vec<Vec3>, FormatError> {
    let mut positions = Vec::new();
    for (line_number, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("vertex") {
            continue;
        }
        let mut coords = [0.0f32; 3];
        for coord in &mut coords {
            *coord = tokens
                .next()
                .and_then(|token| token.parse().ok())
                .ok_or_else(|| {
                    FormatError::malformed("stl", format!("bad vertex on line {}", line_number + 1))
                })?;
        }
        positions.push(Vec3::from_array(coords));
    }
    Ok(positions)
}

/// Parse an STL file into a single-mesh scene with flat normals.
pub fn parse(bytes: &[u8]) -> Result<Scene, FormatError> {
    let positions = if is_binary(bytes) {
        parse_binary(bytes)
    } else {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| FormatError::malformed("stl", "neither binary nor ASCII STL"))?;
        if !text.trim_start().starts_with("solid") {
            return Err(FormatError::malformed("stl", "missing 'solid' header"));
        }
        parse_ascii(text)?
    };

    if positions.len() % 3 != 0 {
        return Err(FormatError::malformed("stl", "incomplete facet"));
    }

    let mut mesh = MeshBuffer::new(positions);
    mesh.compute_normals();
    Ok(Scene::with_root(Node::new("stl").with_mesh(mesh)))
}

fn face_normals(mesh: &MeshBuffer) -> impl Iterator<Item = (Vec3, [Vec3; 3])> + '_ {
    mesh.triangles().map(|triangle| {
        let [v0, v1, v2] = mesh.triangle_positions(triangle);
        ((v1 - v0).cross(v2 - v0).normalize_or_zero(), [v0, v1, v2])
    })
}

/// Write every mesh of the scene, transforms baked, as one STL solid.
pub fn write(scene: &Scene, binary: bool) -> Result<Vec<u8>, ExportError> {
    let flat = scene.flatten();
    let meshes = flat.node(flat.root()).map_or(&[][..], |node| &node.meshes[..]);
    let facets: Vec<(Vec3, [Vec3; 3])> = meshes.iter().flat_map(face_normals).collect();
    if facets.is_empty() {
        return Err(ExportError::EmptyScene("no triangles to write".into()));
    }

    if binary {
        let count = u32::try_from(facets.len())
            .map_err(|_| ExportError::Serialize("too many triangles for STL".into()))?;
        let mut out = Vec::with_capacity(HEADER_LEN + 4 + facets.len() * TRIANGLE_LEN);
        let mut header = [0u8; HEADER_LEN];
        let label = b"facet binary stl";
        header[..label.len()].copy_from_slice(label);
        out.extend_from_slice(&header);
        out.extend_from_slice(&count.to_le_bytes());
        for (normal, corners) in &facets {
            for v in std::iter::once(normal).chain(corners) {
                for c in v.to_array() {
                    out.extend_from_slice(&c.to_le_bytes());
                }
            }
            out.extend_from_slice(&0u16.to_le_bytes());
        }
        Ok(out)
    } else {
        let mut text = String::from("solid facet\n");
        for (n, [a, b, c]) in &facets {
            // Writing to a String cannot fail
            let _ = writeln!(text, "  facet normal {} {} {}", n.x, n.y, n.z);
            text.push_str("    outer loop\n");
            for v in [a, b, c] {
                let _ = writeln!(text, "      vertex {} {} {}", v.x, v.y, v.z);
            }
            text.push_str("    endloop\n  endfacet\n");
        }
        text.push_str("endsolid facet\n");
        Ok(text.into_bytes())
    }
}
