//! Binary glTF (GLB) reader and writer for triangle meshes.
//!
//! Reading goes through the `gltf` crate. Accessors are bounds-checked
//! against their views and the BIN chunk before any data is pulled, so a
//! hostile file fails with `FormatError` instead of reading out of range.
//! Only float positions and normals, unsigned indices and data in the
//! embedded BIN chunk are supported.

use facet_scene::{ExportError, FormatError, MeshBuffer, Node, NodeId, Scene, Transform};
use glam::{Affine3A, Mat4, Vec3};
use gltf::accessor::sparse::IndexType;
use gltf::accessor::{DataType, Dimensions};
use gltf::buffer::Source;
use gltf::mesh::Mode;

/// GLB magic number: "glTF"
const GLB_MAGIC: u32 = 0x46546C67;
/// GLB version 2
const GLB_VERSION: u32 = 2;
/// JSON chunk type
const CHUNK_TYPE_JSON: u32 = 0x4E4F534A;
/// BIN chunk type
const CHUNK_TYPE_BIN: u32 = 0x004E4942;

/// glTF component types written by the exporter
const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;

/// glTF buffer view targets
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Primitive mode for triangle lists
const TRIANGLES: u32 = 4;

/// Deepest node nesting accepted; also stops cyclic child references
const MAX_NODE_DEPTH: usize = 64;

fn malformed(message: impl Into<String>) -> FormatError {
    FormatError::malformed("glb", message)
}

/// Check that `count` elements of `size` bytes, `stride` apart, starting at
/// `offset` inside `view`, stay within the view and the view within its
/// buffer's bytes.
fn check_range(
    view: &gltf::buffer::View,
    offset: usize,
    count: usize,
    size: usize,
    blob: &[u8],
) -> Result<(), FormatError> {
    let buffer = view.buffer();
    match buffer.source() {
        Source::Bin => {}
        Source::Uri(_) => return Err(malformed("external buffers are not supported")),
    }
    let in_bounds = view
        .offset()
        .checked_add(view.length())
        .is_some_and(|end| end <= buffer.length() && end <= blob.len());
    if !in_bounds {
        return Err(malformed(format!("buffer view {} exceeds BIN chunk", view.index())));
    }

    let stride = view.stride().unwrap_or(size);
    if stride < size {
        return Err(malformed(format!("buffer view {} stride {stride} is too small", view.index())));
    }
    if count == 0 {
        return Err(malformed("accessor with zero elements"));
    }
    let end = (count - 1)
        .checked_mul(stride)
        .and_then(|span| span.checked_add(offset))
        .and_then(|start| start.checked_add(size))
        .ok_or_else(|| malformed("accessor size overflows"))?;
    if end > view.length() {
        return Err(malformed(format!("accessor exceeds buffer view {}", view.index())));
    }
    Ok(())
}

/// Validate an accessor, including any sparse substitution data.
fn check_accessor(accessor: &gltf::Accessor, blob: &[u8]) -> Result<(), FormatError> {
    match accessor.view() {
        Some(view) => check_range(&view, accessor.offset(), accessor.count(), accessor.size(), blob)?,
        None if accessor.sparse().is_none() => {
            return Err(malformed(format!("accessor {} has no data", accessor.index())));
        }
        None => {}
    }
    if let Some(sparse) = accessor.sparse() {
        if sparse.count() > accessor.count() {
            return Err(malformed("sparse count exceeds accessor count"));
        }
        let indices = sparse.indices();
        check_range(
            &indices.view(),
            indices.offset(),
            sparse.count(),
            match indices.index_type() {
                IndexType::U8 => 1,
                IndexType::U16 => 2,
                IndexType::U32 => 4,
            },
            blob,
        )?;
        let values = sparse.values();
        check_range(&values.view(), values.offset(), sparse.count(), accessor.size(), blob)?;
    }
    Ok(())
}

fn check_vec3(accessor: &gltf::Accessor, blob: &[u8]) -> Result<(), FormatError> {
    if accessor.data_type() != DataType::F32 || accessor.dimensions() != Dimensions::Vec3 {
        return Err(malformed("only float VEC3 attributes are supported"));
    }
    check_accessor(accessor, blob)
}

fn read_primitive(primitive: &gltf::Primitive, blob: &[u8]) -> Result<MeshBuffer, FormatError> {
    let position = primitive
        .get(&gltf::Semantic::Positions)
        .ok_or_else(|| malformed("primitive without POSITION"))?;
    check_vec3(&position, blob)?;
    let normal = primitive.get(&gltf::Semantic::Normals);
    if let Some(normal) = &normal {
        check_vec3(normal, blob)?;
    }
    if let Some(indices) = primitive.indices() {
        if indices.dimensions() != Dimensions::Scalar
            || !matches!(indices.data_type(), DataType::U8 | DataType::U16 | DataType::U32)
        {
            return Err(malformed("indices must be unsigned scalars"));
        }
        check_accessor(&indices, blob)?;
    }

    let reader = primitive.reader(|buffer| match buffer.source() {
        Source::Bin => Some(blob),
        Source::Uri(_) => None,
    });
    let positions: Vec<Vec3> = reader
        .read_positions()
        .ok_or_else(|| malformed("unreadable POSITION accessor"))?
        .map(Vec3::from_array)
        .collect();
    let mut mesh = match reader.read_indices() {
        Some(indices) => MeshBuffer::try_indexed(positions, indices.into_u32().collect())?,
        None => MeshBuffer::new(positions),
    };
    if let Some(normals) = reader.read_normals() {
        mesh = mesh.with_normals(normals.map(Vec3::from_array).collect());
    }
    if mesh.normals().is_none() {
        mesh.compute_normals();
    }
    Ok(mesh)
}

fn read_node(
    node: &gltf::Node,
    blob: &[u8],
    scene: &mut Scene,
    parent: NodeId,
    depth: usize,
) -> Result<(), FormatError> {
    if depth > MAX_NODE_DEPTH {
        return Err(malformed("node hierarchy too deep"));
    }

    let matrix = Mat4::from_cols_array_2d(&node.transform().matrix());
    let name = node
        .name()
        .map_or_else(|| format!("node_{}", node.index()), str::to_string);
    let mut out = Node::new(name).with_transform(Transform::from_matrix(&Affine3A::from_mat4(matrix)));

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != Mode::Triangles {
                tracing::warn!("Skipping non-triangle primitive in mesh {}", mesh.index());
                continue;
            }
            out = out.with_mesh(read_primitive(&primitive, blob)?);
        }
    }

    let id = scene.add_child(parent, out);
    for child in node.children() {
        read_node(&child, blob, scene, id, depth + 1)?;
    }
    Ok(())
}

/// Parse a GLB file into a scene.
pub fn parse(bytes: &[u8]) -> Result<Scene, FormatError> {
    let gltf = gltf::Gltf::from_slice(bytes).map_err(|e| malformed(e.to_string()))?;
    let blob = gltf.blob.as_deref().unwrap_or(&[]);
    let document = &gltf.document;

    let mut scene = Scene::new();
    let root = scene.root();
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(gltf_scene) => {
            for node in gltf_scene.nodes() {
                read_node(&node, blob, &mut scene, root, 0)?;
            }
        }
        None => {
            // No scene list: every node that is nobody's child is a root
            let children: Vec<usize> = document
                .nodes()
                .flat_map(|node| node.children().map(|child| child.index()).collect::<Vec<_>>())
                .collect();
            for node in document.nodes().filter(|node| !children.contains(&node.index())) {
                read_node(&node, blob, &mut scene, root, 0)?;
            }
        }
    }
    Ok(scene)
}

fn push_vec3s(bin: &mut Vec<u8>, values: &[Vec3]) -> (usize, usize) {
    let offset = bin.len();
    for value in values {
        for c in value.to_array() {
            bin.extend_from_slice(&c.to_le_bytes());
        }
    }
    (offset, bin.len() - offset)
}

fn push_view(views: &mut Vec<serde_json::Value>, offset: usize, length: usize, target: u32) -> usize {
    views.push(serde_json::json!({
        "buffer": 0,
        "byteOffset": offset,
        "byteLength": length,
        "target": target
    }));
    views.len() - 1
}

/// Write every mesh, transforms baked, as a GLB file with one node per mesh.
pub fn write(scene: &Scene) -> Result<Vec<u8>, ExportError> {
    let flat = scene.flatten();
    let meshes: Vec<&MeshBuffer> = flat
        .node(flat.root())
        .map(|node| node.meshes.iter().filter(|m| m.vertex_count() > 0).collect())
        .unwrap_or_default();
    if meshes.is_empty() {
        return Err(ExportError::EmptyScene("no vertices to write".into()));
    }

    let mut bin: Vec<u8> = Vec::new();
    let mut accessors = Vec::new();
    let mut buffer_views = Vec::new();
    let mut gltf_meshes = Vec::new();
    let mut nodes = Vec::new();

    for (i, mesh) in meshes.iter().enumerate() {
        let bounds = mesh.bounds();
        let (offset, length) = push_vec3s(&mut bin, mesh.positions());
        let view = push_view(&mut buffer_views, offset, length, ARRAY_BUFFER);
        accessors.push(serde_json::json!({
            "bufferView": view,
            "componentType": FLOAT,
            "count": mesh.vertex_count(),
            "type": "VEC3",
            "min": bounds.min.to_array(),
            "max": bounds.max.to_array()
        }));
        let mut attributes = serde_json::json!({ "POSITION": accessors.len() - 1 });

        if let Some(normals) = mesh.normals() {
            let (offset, length) = push_vec3s(&mut bin, normals);
            let view = push_view(&mut buffer_views, offset, length, ARRAY_BUFFER);
            accessors.push(serde_json::json!({
                "bufferView": view,
                "componentType": FLOAT,
                "count": normals.len(),
                "type": "VEC3"
            }));
            attributes["NORMAL"] = serde_json::json!(accessors.len() - 1);
        }

        let mut primitive = serde_json::json!({ "attributes": attributes, "mode": TRIANGLES });
        if let Some(indices) = mesh.indices() {
            let offset = bin.len();
            for index in indices {
                bin.extend_from_slice(&index.to_le_bytes());
            }
            let view = push_view(&mut buffer_views, offset, bin.len() - offset, ELEMENT_ARRAY_BUFFER);
            accessors.push(serde_json::json!({
                "bufferView": view,
                "componentType": UNSIGNED_INT,
                "count": indices.len(),
                "type": "SCALAR"
            }));
            primitive["indices"] = serde_json::json!(accessors.len() - 1);
        }

        gltf_meshes.push(serde_json::json!({ "name": format!("mesh_{i}"), "primitives": [primitive] }));
        nodes.push(serde_json::json!({ "name": format!("mesh_{i}"), "mesh": i }));
    }

    let gltf_json = serde_json::json!({
        "asset": { "version": "2.0", "generator": "facet" },
        "scene": 0,
        "scenes": [{ "nodes": (0..nodes.len()).collect::<Vec<_>>() }],
        "nodes": nodes,
        "meshes": gltf_meshes,
        "accessors": accessors,
        "bufferViews": buffer_views,
        "buffers": [{ "byteLength": bin.len() }]
    });

    let mut json_bytes =
        serde_json::to_vec(&gltf_json).map_err(|e| ExportError::Serialize(e.to_string()))?;

    // Pad JSON with spaces and BIN with zeros to 4-byte alignment
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total_length = 12 + 8 + json_bytes.len() + 8 + bin.len();
    let total = u32::try_from(total_length)
        .map_err(|_| ExportError::Serialize("GLB exceeds 4 GiB".into()))?;

    let mut glb = Vec::with_capacity(total_length);
    glb.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&total.to_le_bytes());

    glb.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_TYPE_JSON.to_le_bytes());
    glb.extend_from_slice(&json_bytes);

    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_TYPE_BIN.to_le_bytes());
    glb.extend_from_slice(&bin);

    Ok(glb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
        let slice = bytes.get(offset..offset + 4)?;
        Some(u32::from_le_bytes(slice.try_into().ok()?))
    }

    /// Assemble a GLB container from a JSON document and an optional BIN chunk.
    fn glb_bytes(json: serde_json::Value, bin: &[u8]) -> Vec<u8> {
        let mut json_bytes = serde_json::to_vec(&json).unwrap();
        while json_bytes.len() % 4 != 0 {
            json_bytes.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let bin_chunk = if bin.is_empty() { 0 } else { 8 + bin.len() };
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&GLB_VERSION.to_le_bytes());
        bytes.extend_from_slice(&((20 + json_bytes.len() + bin_chunk) as u32).to_le_bytes());
        bytes.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&CHUNK_TYPE_JSON.to_le_bytes());
        bytes.extend_from_slice(&json_bytes);
        if !bin.is_empty() {
            bytes.extend_from_slice(&(bin.len() as u32).to_le_bytes());
            bytes.extend_from_slice(&CHUNK_TYPE_BIN.to_le_bytes());
            bytes.extend_from_slice(&bin);
        }
        bytes
    }

    /// One triangle whose position view and accessor can be tampered with.
    fn triangle_json(view: serde_json::Value, count: u64) -> serde_json::Value {
        serde_json::json!({
            "asset": { "version": "2.0" },
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "mesh": 0 }],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
            "accessors": [{
                "bufferView": 0,
                "componentType": FLOAT,
                "count": count,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 0.0]
            }],
            "bufferViews": [view],
            "buffers": [{ "byteLength": 36 }]
        })
    }

    fn triangle_bin() -> Vec<u8> {
        [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    fn indexed_quad() -> Scene {
        let mut mesh = MeshBuffer::try_indexed(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap();
        mesh.compute_normals();
        let mut scene = Scene::new();
        scene.add_child(
            scene.root(),
            Node::new("quad")
                .with_transform(Transform::from_translation(Vec3::Y))
                .with_mesh(mesh),
        );
        scene
    }

    #[test]
    fn test_header_and_alignment() {
        let bytes = write(&indexed_quad()).unwrap();
        assert_eq!(read_u32(&bytes, 0), Some(GLB_MAGIC));
        assert_eq!(read_u32(&bytes, 8), Some(bytes.len() as u32));
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn test_roundtrip_geometry() {
        let bytes = write(&indexed_quad()).unwrap();
        let scene = parse(&bytes).unwrap();
        assert_eq!(scene.vertex_count(scene.root()), 4);
        let bounds = scene.world_bounds(scene.root());
        assert_eq!(bounds.min, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 0.0));

        let mesh_ref = scene.mesh_refs(scene.root())[0];
        let mesh = scene.mesh(mesh_ref).unwrap();
        assert_eq!(mesh.indices().unwrap(), &[0, 1, 2, 0, 2, 3]);
        assert!((mesh.normals().unwrap()[0] - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_node_hierarchy_and_matrix() {
        let json = serde_json::json!({
            "asset": { "version": "2.0" },
            "nodes": [
                { "children": [1], "translation": [0.0, 0.0, 5.0] },
                { "matrix": [2.0,0.0,0.0,0.0, 0.0,2.0,0.0,0.0, 0.0,0.0,2.0,0.0, 0.0,0.0,0.0,1.0] }
            ]
        });

        let scene = parse(&glb_bytes(json, &[])).unwrap();
        let top = scene.node(scene.root()).unwrap().children()[0];
        let child = scene.node(top).unwrap().children()[0];
        let world = scene.world_matrix(child);
        assert!((world.transform_point3(Vec3::X) - Vec3::new(2.0, 0.0, 5.0)).length() < 1e-6);
    }

    #[test]
    fn test_reads_unindexed_triangle_with_flat_normals() {
        let view = serde_json::json!({ "buffer": 0, "byteLength": 36 });
        let scene = parse(&glb_bytes(triangle_json(view, 3), &triangle_bin())).unwrap();
        let mesh_ref = scene.mesh_refs(scene.root())[0];
        let mesh = scene.mesh(mesh_ref).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert!((mesh.normals().unwrap()[0] - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_huge_view_offset_is_malformed() {
        let view = serde_json::json!({
            "buffer": 0,
            "byteOffset": u64::MAX,
            "byteLength": 36
        });
        let result = parse(&glb_bytes(triangle_json(view, 3), &triangle_bin()));
        assert!(matches!(result, Err(FormatError::Malformed { format: "glb", .. })));
    }

    #[test]
    fn test_count_past_view_is_malformed() {
        let view = serde_json::json!({ "buffer": 0, "byteLength": 36 });
        let result = parse(&glb_bytes(triangle_json(view, 4_000_000_000), &triangle_bin()));
        assert!(matches!(result, Err(FormatError::Malformed { format: "glb", .. })));
    }

    #[test]
    fn test_view_past_bin_chunk_is_malformed() {
        let view = serde_json::json!({ "buffer": 0, "byteOffset": 24, "byteLength": 36 });
        let result = parse(&glb_bytes(triangle_json(view, 3), &triangle_bin()));
        assert!(matches!(result, Err(FormatError::Malformed { format: "glb", .. })));
    }

    #[test]
    fn test_rejects_non_glb() {
        assert!(matches!(
            parse(b"solid not a glb"),
            Err(FormatError::Malformed { format: "glb", .. })
        ));
    }

    #[test]
    fn test_empty_scene_not_written() {
        assert!(matches!(write(&Scene::new()), Err(ExportError::EmptyScene(_))));
    }
}
