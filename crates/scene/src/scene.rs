//! Scene tree: nodes with local transforms and mesh attachments.
//!
//! Nodes live in an arena owned by the [`Scene`]. Each node owns its children
//! through their ids and keeps a non-owning parent id that is only used to
//! walk the ancestor chain for world/local conversions.

use std::collections::HashMap;

use facet_ipc::SceneStats;
use glam::{Affine3A, Quat, Vec3};

use crate::bounds::Aabb;
use crate::mesh::MeshBuffer;

/// Type-safe node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A mesh attachment: node plus index into its mesh list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshRef {
    pub node: NodeId,
    pub index: usize,
}

/// Local placement of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    /// Decompose an affine matrix. Exact for scale-rotation-translation
    /// matrices, including mirrored ones.
    pub fn from_matrix(matrix: &Affine3A) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn matrix(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A scene node
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub meshes: Vec<MeshBuffer>,
    /// Hidden nodes (and their subtrees) are skipped by renderers
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            meshes: Vec::new(),
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, mesh: MeshBuffer) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A tree of nodes rooted at [`Scene::root`].
///
/// Ids of removed nodes are recycled by later insertions.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
    /// Empty slots left by [`Scene::remove_subtree`]
    free: Vec<NodeId>,
    root: NodeId,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create a scene containing only an identity root node.
    pub fn new() -> Self {
        Self::with_root(Node::new("root"))
    }

    /// Create a scene from a single root node (its parent/children are reset).
    pub fn with_root(mut root: Node) -> Self {
        root.parent = None;
        root.children.clear();
        Self {
            nodes: vec![Some(root)],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)?.as_ref()
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)?.as_mut()
    }

    /// Slots in the node arena, live or free.
    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Attach `node` under `parent`. A missing parent falls back to the root.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let parent = if self.contains(parent) {
            parent
        } else {
            tracing::warn!("Parent {:?} missing, attaching to root", parent);
            self.root
        };

        node.parent = Some(parent);
        node.children.clear();
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id.0 as usize] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() as u32 - 1)
            }
        };
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(id);
        }
        id
    }

    pub fn mesh(&self, mesh: MeshRef) -> Option<&MeshBuffer> {
        self.node(mesh.node)?.meshes.get(mesh.index)
    }

    pub fn mesh_mut(&mut self, mesh: MeshRef) -> Option<&mut MeshBuffer> {
        self.node_mut(mesh.node)?.meshes.get_mut(mesh.index)
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) {
        if let Some(node) = self.node_mut(id) {
            node.transform = transform;
        }
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.node_mut(id) {
            node.visible = visible;
        }
    }

    /// Local-to-world matrix: product of the ancestor chain's local transforms.
    pub fn world_matrix(&self, id: NodeId) -> Affine3A {
        let mut matrix = Affine3A::IDENTITY;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.node(node_id) else {
                break;
            };
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// World matrix of the node's parent (identity for the root).
    pub fn parent_world_matrix(&self, id: NodeId) -> Affine3A {
        self.node(id)
            .and_then(|node| node.parent)
            .map_or(Affine3A::IDENTITY, |parent| self.world_matrix(parent))
    }

    /// Express a world-space offset in the node's parent-local space, i.e. the
    /// space its `transform.translation` lives in.
    pub fn world_offset_to_parent_local(&self, id: NodeId, offset: Vec3) -> Vec3 {
        self.parent_world_matrix(id).inverse().transform_vector3(offset)
    }

    /// Node ids of the subtree rooted at `id`, in pre-order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            let Some(node) = self.node(node_id) else {
                continue;
            };
            out.push(node_id);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Every mesh attachment in the subtree rooted at `id`.
    pub fn mesh_refs(&self, id: NodeId) -> Vec<MeshRef> {
        self.subtree(id)
            .into_iter()
            .flat_map(|node| {
                let count = self.node(node).map_or(0, |n| n.meshes.len());
                (0..count).map(move |index| MeshRef { node, index })
            })
            .collect()
    }

    /// World-space bounds of every mesh under `id`.
    pub fn world_bounds(&self, id: NodeId) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for node_id in self.subtree(id) {
            let Some(node) = self.node(node_id) else {
                continue;
            };
            if node.meshes.is_empty() {
                continue;
            }
            let world = self.world_matrix(node_id);
            for mesh in &node.meshes {
                bounds = bounds.union(&mesh.bounds().transformed(&world));
            }
        }
        bounds
    }

    /// Total vertex-attribute count under `id`.
    pub fn vertex_count(&self, id: NodeId) -> usize {
        self.mesh_refs(id)
            .into_iter()
            .filter_map(|mesh| self.mesh(mesh))
            .map(MeshBuffer::vertex_count)
            .sum()
    }

    /// Display statistics for the subtree under `id`.
    pub fn stats(&self, id: NodeId) -> SceneStats {
        SceneStats::from_vertex_count(self.vertex_count(id))
    }

    /// True if the node and all its ancestors are visible.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.node(node_id) else {
                return false;
            };
            if !node.visible {
                return false;
            }
            current = node.parent;
        }
        true
    }

    /// Visible mesh attachments with their world matrices.
    pub fn visible_meshes(&self) -> Vec<(MeshRef, Affine3A)> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root, Affine3A::IDENTITY)];
        while let Some((node_id, parent_world)) = stack.pop() {
            let Some(node) = self.node(node_id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let world = parent_world * node.transform.matrix();
            for index in 0..node.meshes.len() {
                out.push((MeshRef { node: node_id, index }, world));
            }
            stack.extend(node.children.iter().rev().map(|&child| (child, world)));
        }
        out
    }

    /// Move another scene under `parent`, returning the id of its old root.
    pub fn graft(&mut self, parent: NodeId, other: Scene) -> NodeId {
        let order = other.subtree(other.root);
        let mut nodes = other.nodes;
        let mut remap: HashMap<NodeId, NodeId> = HashMap::new();

        for old_id in order {
            let Some(node) = nodes.get_mut(old_id.0 as usize).and_then(Option::take) else {
                continue;
            };
            let new_parent = node
                .parent
                .and_then(|p| remap.get(&p).copied())
                .unwrap_or(parent);
            let new_id = self.add_child(new_parent, node);
            remap.insert(old_id, new_id);
        }

        remap.get(&other.root).copied().unwrap_or(parent)
    }

    /// Deep copy of the subtree under `id` as a standalone scene whose root
    /// keeps the node's local transform.
    pub fn extract(&self, id: NodeId) -> Option<Scene> {
        let root = self.node(id)?.clone();
        let mut scene = Scene::with_root(root);
        let mut remap = HashMap::from([(id, scene.root)]);

        for node_id in self.subtree(id).into_iter().skip(1) {
            let Some(node) = self.node(node_id) else {
                continue;
            };
            let parent = node
                .parent
                .and_then(|p| remap.get(&p).copied())
                .unwrap_or(scene.root);
            let new_id = scene.add_child(parent, node.clone());
            remap.insert(node_id, new_id);
        }
        Some(scene)
    }

    /// Remove a node and all its descendants. Removing the root only clears
    /// its children.
    pub fn remove_subtree(&mut self, id: NodeId) {
        if id == self.root {
            let children = self.node(id).map(|n| n.children.clone()).unwrap_or_default();
            for child in children {
                self.remove_subtree(child);
            }
            return;
        }

        let parent = self.node(id).and_then(|n| n.parent);
        if let Some(parent_node) = parent.and_then(|p| self.node_mut(p)) {
            parent_node.children.retain(|&child| child != id);
        }
        for node_id in self.subtree(id) {
            if let Some(slot) = self.nodes.get_mut(node_id.0 as usize) {
                if slot.take().is_some() {
                    self.free.push(node_id);
                }
            }
        }
    }

    /// Bake every node transform into its meshes, producing a single-node scene.
    pub fn flatten(&self) -> Scene {
        let root = self.root;
        let mut flat = Node::new(self.node(root).map_or("root".to_string(), |n| n.name.clone()));
        for mesh_ref in self.mesh_refs(root) {
            let Some(mesh) = self.mesh(mesh_ref) else {
                continue;
            };
            let mut mesh = mesh.clone();
            mesh.transform_vertices(&self.world_matrix(mesh_ref.node));
            flat.meshes.push(mesh);
        }
        Scene::with_root(flat)
    }
}
