//! Wavefront OBJ reader and writer (positions, normals, faces).
//!
//! Faces are fan-triangulated and expanded into non-indexed triangle lists,
//! one mesh per `o`/`g` group.

use std::fmt::Write as _;

use facet_scene::{ExportError, FormatError, MeshBuffer, Node, Scene};
use glam::Vec3;

#[derive(Default)]
struct Group {
    name: String,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    /// False once any face corner lacks a normal
    has_normals: bool,
}

impl Group {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            has_normals: true,
            ..Default::default()
        }
    }

    fn into_node(self) -> Option<Node> {
        if self.positions.is_empty() {
            return None;
        }
        let mut mesh = MeshBuffer::new(self.positions);
        if self.has_normals {
            mesh = mesh.with_normals(self.normals);
        } else {
            mesh.compute_normals();
        }
        Some(Node::new(self.name).with_mesh(mesh))
    }
}

/// Resolve a 1-based (or negative, relative) OBJ index.
fn resolve_index(token: &str, len: usize, line: usize) -> Result<usize, FormatError> {
    let index: i64 = token
        .parse()
        .map_err(|_| FormatError::malformed("obj", format!("bad index '{token}' on line {line}")))?;
    let resolved = if index < 0 { len as i64 + index } else { index - 1 };
    if resolved < 0 || resolved >= len as i64 {
        return Err(FormatError::malformed(
            "obj",
            format!("index {index} out of range on line {line}"),
        ));
    }
    Ok(resolved as usize)
}

fn parse_vec3<'a>(mut tokens: impl Iterator<Item = &'a str>, line: usize) -> Result<Vec3, FormatError> {
    let mut coords = [0.0f32; 3];
    for coord in &mut coords {
        *coord = tokens
            .next()
            .and_then(|token| token.parse().ok())
            .ok_or_else(|| FormatError::malformed("obj", format!("bad vector on line {line}")))?;
    }
    Ok(Vec3::from_array(coords))
}

/// Parse OBJ text into a scene with one child node per group.
pub fn parse(bytes: &[u8]) -> Result<Scene, FormatError> {
    let text = std::str::from_utf8(bytes).map_err(|_| FormatError::malformed("obj", "not UTF-8 text"))?;

    let mut vertices = Vec::new();
    let mut vertex_normals = Vec::new();
    let mut groups = vec![Group::new("obj")];

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let mut tokens = raw.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        match keyword {
            "v" => vertices.push(parse_vec3(tokens, line)?),
            "vn" => vertex_normals.push(parse_vec3(tokens, line)?),
            "o" | "g" => {
                let name = tokens.collect::<Vec<_>>().join(" ");
                groups.push(Group::new(if name.is_empty() { "obj" } else { &name }));
            }
            "f" => {
                let mut corners = Vec::new();
                for corner in tokens {
                    let mut parts = corner.split('/');
                    let position = resolve_index(parts.next().unwrap_or(""), vertices.len(), line)?;
                    let normal = match parts.nth(1) {
                        Some(token) if !token.is_empty() => {
                            Some(resolve_index(token, vertex_normals.len(), line)?)
                        }
                        _ => None,
                    };
                    corners.push((position, normal));
                }
                if corners.len() < 3 {
                    return Err(FormatError::malformed(
                        "obj",
                        format!("face with fewer than 3 corners on line {line}"),
                    ));
                }

                let Some(group) = groups.last_mut() else {
                    continue;
                };
                for i in 1..corners.len() - 1 {
                    for (position, normal) in [corners[0], corners[i], corners[i + 1]] {
                        group.positions.push(vertices[position]);
                        match normal {
                            Some(n) => group.normals.push(vertex_normals[n]),
                            None => group.has_normals = false,
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let mut scene = Scene::new();
    let root = scene.root();
    for node in groups.into_iter().filter_map(Group::into_node) {
        scene.add_child(root, node);
    }
    Ok(scene)
}

/// Write every mesh, transforms baked, as OBJ text.
pub fn write(scene: &Scene) -> Result<Vec<u8>, ExportError> {
    let flat = scene.flatten();
    let meshes = flat.node(flat.root()).map_or(&[][..], |node| &node.meshes[..]);
    if meshes.iter().all(|mesh| mesh.triangles().next().is_none()) {
        return Err(ExportError::EmptyScene("no triangles to write".into()));
    }

    let mut text = String::from("# facet\n");
    let mut offset = 1usize;
    // Writing to a String cannot fail
    for (i, mesh) in meshes.iter().enumerate() {
        let _ = writeln!(text, "o mesh_{i}");
        for p in mesh.positions() {
            let _ = writeln!(text, "v {} {} {}", p.x, p.y, p.z);
        }
        if let Some(normals) = mesh.normals() {
            for n in normals {
                let _ = writeln!(text, "vn {} {} {}", n.x, n.y, n.z);
            }
        }
        for triangle in mesh.triangles() {
            let [a, b, c] = triangle.map(|index| index as usize + offset);
            if mesh.has_normals() {
                let _ = writeln!(text, "f {a}//{a} {b}//{b} {c}//{c}");
            } else {
                let _ = writeln!(text, "f {a} {b} {c}");
            }
        }
        offset += mesh.vertex_count();
    }
    Ok(text.into_bytes())
}
