//! The viewport stage: original and result slots sharing one placement.
//!
//! Layout of the owned scene:
//!
//! ```text
//! root
//! └── model (uniform normalization scale)
//!     └── pivot (translation = -normalization center)
//!         ├── original (placement)
//!         │   └── loaded scene
//!         └── result (placement)
//!             └── export compensation (inverse of the export matrix)
//!                 └── re-imported preview
//! ```
//!
//! The preview was exported with the placement and up-axis correction baked
//! in. The compensation node undoes that bake, so the result follows later
//! placement edits exactly like the original does.

use facet_ipc::{Axis, SceneStats};
use glam::{Affine3A, Quat, Vec3};

use crate::compositor::Comparison;
use crate::normalize::Normalization;
use crate::raycast::{Ray, SceneHit, raycast_scene};
use crate::scene::{Node, NodeId, Scene, Transform};
use crate::transform::Placement;
use crate::weld::weld_scene;

/// Default base colour of the original model.
pub const ORIGINAL_COLOR: &str = "#00f2fe";

/// Default base colour of the converted preview.
pub const RESULT_COLOR: &str = "#38ef7d";

/// Which side of the comparison a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Original,
    Result,
}

/// Parse `#rrggbb` into linear-ish RGB components in [0, 1].
pub fn parse_hex_color(value: &str) -> Option<[f32; 3]> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?].map(|c| c as f32 / 255.0))
}

/// Material state consumed by render backends.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotMaterial {
    pub base_color: [f32; 3],
    pub wireframe: bool,
}

impl SlotMaterial {
    fn from_hex(hex: &str) -> Self {
        Self {
            base_color: parse_hex_color(hex).unwrap_or([1.0; 3]),
            wireframe: false,
        }
    }
}

/// A scene prepared for export, plus the matrix baked into it.
#[derive(Debug, Clone)]
pub struct ExportSnapshot {
    pub scene: Scene,
    /// Transform from pivot space to exported coordinates
    pub export_matrix: Affine3A,
}

#[derive(Debug, Clone, Copy)]
struct ResultSlot {
    root: NodeId,
    compensation: NodeId,
}

/// Scene graph plus the slot, placement and comparison state of the viewport.
#[derive(Debug, Clone)]
pub struct Stage {
    scene: Scene,
    model: NodeId,
    pivot: NodeId,
    original: Option<NodeId>,
    result: Option<ResultSlot>,
    normalization: Normalization,
    placement: Placement,
    pub comparison: Comparison,
    original_material: SlotMaterial,
    result_material: SlotMaterial,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    pub fn new() -> Self {
        let mut scene = Scene::new();
        let model = scene.add_child(scene.root(), Node::new("model"));
        let pivot = scene.add_child(model, Node::new("pivot"));
        Self {
            scene,
            model,
            pivot,
            original: None,
            result: None,
            normalization: Normalization::default(),
            placement: Placement::default(),
            comparison: Comparison::default(),
            original_material: SlotMaterial::from_hex(ORIGINAL_COLOR),
            result_material: SlotMaterial::from_hex(RESULT_COLOR),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn has_model(&self) -> bool {
        self.original.is_some()
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    pub fn original_root(&self) -> Option<NodeId> {
        self.original
    }

    pub fn result_root(&self) -> Option<NodeId> {
        self.result.map(|slot| slot.root)
    }

    pub fn slot_root(&self, slot: Slot) -> Option<NodeId> {
        match slot {
            Slot::Original => self.original_root(),
            Slot::Result => self.result_root(),
        }
    }

    /// Slot owning a node, if any.
    pub fn slot_of(&self, node: NodeId) -> Option<Slot> {
        let mut current = Some(node);
        while let Some(id) = current {
            if Some(id) == self.original {
                return Some(Slot::Original);
            }
            if Some(id) == self.result_root() {
                return Some(Slot::Result);
            }
            current = self.scene.node(id).and_then(Node::parent);
        }
        None
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn material(&self, slot: Slot) -> &SlotMaterial {
        match slot {
            Slot::Original => &self.original_material,
            Slot::Result => &self.result_material,
        }
    }

    /// Replace the original with a freshly loaded scene.
    ///
    /// Any previous original and result are released, placement and
    /// comparison state are reset.
    pub fn install_original(&mut self, loaded: Scene, normalization: Normalization) {
        self.clear();
        self.normalization = normalization;
        self.scene
            .set_transform(self.model, Transform::from_scale(Vec3::splat(normalization.scale)));
        self.scene
            .set_transform(self.pivot, Transform::from_translation(-normalization.center));

        let root = self.scene.add_child(self.pivot, Node::new("original"));
        self.scene.graft(root, loaded);
        self.original = Some(root);
        tracing::debug!(
            "Installed original: scale {}, center {:?}",
            normalization.scale,
            normalization.center
        );
    }

    /// Replace the result with a re-imported preview.
    ///
    /// `export_matrix` is the pivot-space transform that was baked into the
    /// exported bytes. Returns false without a loaded original.
    pub fn install_result(&mut self, preview: Scene, export_matrix: Affine3A) -> bool {
        if !self.has_model() {
            return false;
        }
        self.remove_result();

        let root = self.scene.add_child(
            self.pivot,
            Node::new("result").with_transform(self.placement.transform()),
        );
        let compensation = self.scene.add_child(
            root,
            Node::new("export compensation")
                .with_transform(Transform::from_matrix(&export_matrix.inverse())),
        );
        self.scene.graft(compensation, preview);
        self.result = Some(ResultSlot { root, compensation });
        self.comparison.comparing = true;
        true
    }

    fn remove_result(&mut self) {
        if let Some(slot) = self.result.take() {
            self.scene.remove_subtree(slot.root);
        }
        self.comparison.comparing = false;
    }

    /// Drop both slots and reset all per-model state.
    pub fn clear(&mut self) {
        self.remove_result();
        if let Some(root) = self.original.take() {
            self.scene.remove_subtree(root);
        }
        self.normalization = Normalization::default();
        self.placement = Placement::default();
        self.scene.set_transform(self.model, Transform::IDENTITY);
        self.scene.set_transform(self.pivot, Transform::IDENTITY);
        self.comparison = Comparison::default();
        self.original_material = SlotMaterial::from_hex(ORIGINAL_COLOR);
        self.result_material = SlotMaterial::from_hex(RESULT_COLOR);
    }

    pub fn original_stats(&self) -> SceneStats {
        self.original
            .map_or_else(SceneStats::default, |root| self.scene.stats(root))
    }

    pub fn result_stats(&self) -> SceneStats {
        self.result
            .map_or_else(SceneStats::default, |slot| self.scene.stats(slot.compensation))
    }

    /// Show or hide each slot.
    pub fn set_slot_visibility(&mut self, original: bool, result: bool) {
        if let Some(root) = self.original {
            self.scene.set_visible(root, original);
        }
        if let Some(slot) = self.result {
            self.scene.set_visible(slot.root, result);
        }
    }

    pub fn is_slot_visible(&self, slot: Slot) -> bool {
        self.slot_root(slot)
            .is_some_and(|root| self.scene.is_visible(root))
    }

    /// Closest hit on the original model.
    pub fn raycast_original(&self, ray: &Ray) -> Option<SceneHit> {
        raycast_scene(&self.scene, self.original?, ray)
    }

    /// Copy the original's current state for export.
    ///
    /// The copy carries the placement (and sculpt edits); normalization is
    /// not included. `up_correction` is applied as an outer rotation.
    pub fn export_snapshot(&self, up_correction: Option<Quat>, weld: bool) -> Option<ExportSnapshot> {
        let copy = self.scene.extract(self.original?)?;

        let rotation = up_correction.unwrap_or(Quat::IDENTITY);
        let mut scene = Scene::with_root(
            Node::new("export").with_transform(Transform::from_rotation(rotation)),
        );
        scene.graft(scene.root(), copy);
        if weld {
            let root = scene.root();
            weld_scene(&mut scene, root);
        }

        let export_matrix = Affine3A::from_quat(rotation) * self.placement.transform().matrix();
        Some(ExportSnapshot {
            scene,
            export_matrix,
        })
    }

    fn sync_placement(&mut self) {
        let transform = self.placement.transform();
        if let Some(root) = self.original {
            self.scene.set_transform(root, transform);
        }
        if let Some(slot) = self.result {
            self.scene.set_transform(slot.root, transform);
        }
    }

    /// Add 90 degrees about `axis`. No-op without a model.
    pub fn rotate(&mut self, axis: Axis) {
        if !self.has_model() {
            return;
        }
        self.placement.rotate(axis);
        self.sync_placement();
    }

    /// Flip the model along `axis`. No-op without a model.
    pub fn mirror(&mut self, axis: Axis) {
        if !self.has_model() {
            return;
        }
        self.placement.mirror(axis);
        self.sync_placement();
    }

    /// Set the overall scale to the normalization scale times `factor`.
    pub fn apply_scale(&mut self, factor: f32) {
        if !self.has_model() {
            return;
        }
        if self.placement.set_scale_factor(factor) {
            self.sync_placement();
        }
    }

    /// Translate the model so its world bounding box is centered at the origin.
    pub fn center(&mut self) {
        let Some(root) = self.original else {
            return;
        };
        let bounds = self.scene.world_bounds(root);
        if bounds.is_empty() {
            return;
        }
        self.translate_world(root, -bounds.center());
    }

    /// Translate the model so its lowest world point sits at y = 0.
    pub fn ground(&mut self) {
        let Some(root) = self.original else {
            return;
        };
        let bounds = self.scene.world_bounds(root);
        if bounds.is_empty() {
            return;
        }
        self.translate_world(root, Vec3::new(0.0, -bounds.min.y, 0.0));
    }

    fn translate_world(&mut self, root: NodeId, offset: Vec3) {
        let local = self.scene.world_offset_to_parent_local(root, offset);
        self.placement.translation += local;
        self.sync_placement();
    }

    /// Toggle wireframe rendering on both slots. No-op without a model.
    pub fn set_wireframe(&mut self, wireframe: bool) {
        if !self.has_model() {
            return;
        }
        self.original_material.wireframe = wireframe;
        self.result_material.wireframe = wireframe;
    }

    /// Set the base colour of both slots from `#rrggbb`. Invalid colours and
    /// calls without a model are ignored.
    pub fn set_base_color(&mut self, hex: &str) {
        if !self.has_model() {
            return;
        }
        let Some(color) = parse_hex_color(hex) else {
            tracing::debug!("Ignoring invalid colour {:?}", hex);
            return;
        };
        self.original_material.base_color = color;
        self.result_material.base_color = color;
    }
}
