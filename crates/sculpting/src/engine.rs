//! Stroke state machine: Idle -> Stroking -> Idle.
//!
//! A primary press that hits the original model starts a stroke and applies
//! the first dab. Every move while stroking applies another dab at the new
//! hit. Release ends the stroke and recomputes normals once, only for meshes
//! that actually moved.

use facet_config::BrushConfig;
use facet_ipc::{BrushCursorInfo, SculptCommand};
use facet_scene::{MeshRef, Ray, SceneHit, Stage};

use crate::brush::{BrushSettings, Dab, Polarity};
use crate::deformation::apply_dab;

/// Brush indicator drawn over the surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BrushCursor {
    pub visible: bool,
    pub hit: Option<SceneHit>,
    pub radius: f32,
}

impl BrushCursor {
    pub fn info(&self) -> BrushCursorInfo {
        let (position, normal) = self
            .hit
            .map_or(([0.0; 3], [0.0; 3]), |hit| (hit.point.to_array(), hit.normal.to_array()));
        BrushCursorInfo {
            visible: self.visible,
            position,
            normal,
            radius: self.radius,
        }
    }
}

#[derive(Debug, Clone, Default)]
enum StrokeState {
    #[default]
    Idle,
    Stroking {
        stroke_id: u64,
        touched: Vec<MeshRef>,
        dirty: bool,
        dabs: usize,
    },
}

/// Summary of a finished stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeSummary {
    pub stroke_id: u64,
    pub dabs: usize,
    /// Meshes whose normals were recomputed
    pub normals_recomputed: usize,
}

/// Sculpt engine driving brush strokes against a [`Stage`].
#[derive(Debug, Clone, Default)]
pub struct SculptEngine {
    pub settings: BrushSettings,
    enabled: bool,
    state: StrokeState,
    cursor: BrushCursor,
    next_stroke_id: u64,
}

impl SculptEngine {
    pub fn new(config: &BrushConfig) -> Self {
        Self {
            settings: BrushSettings::from_config(config),
            ..Default::default()
        }
    }

    /// Sculpt mode gates all pointer handling.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_stroking(&self) -> bool {
        matches!(self.state, StrokeState::Stroking { .. })
    }

    pub fn cursor(&self) -> &BrushCursor {
        &self.cursor
    }

    /// Turn sculpt mode on or off. Turning it off finishes any active stroke.
    pub fn set_enabled(&mut self, stage: &mut Stage, enabled: bool) -> Option<StrokeSummary> {
        self.enabled = enabled;
        if enabled {
            return None;
        }
        self.cursor.visible = false;
        self.pointer_up(stage)
    }

    /// Apply a brush settings command. Returns a stroke summary if the command
    /// ended a stroke.
    pub fn apply_command(&mut self, stage: &mut Stage, command: &SculptCommand) -> Option<StrokeSummary> {
        match command {
            SculptCommand::SetEnabled(enabled) => return self.set_enabled(stage, *enabled),
            SculptCommand::SetBrushRadius(radius) => {
                if self.settings.set_radius(*radius) {
                    self.cursor.radius = *radius;
                }
            }
            SculptCommand::SetBrushStrength(strength) => {
                self.settings.set_strength(*strength);
            }
            SculptCommand::SetInflate(inflate) => {
                self.settings.polarity = if *inflate {
                    Polarity::Inflate
                } else {
                    Polarity::Deflate
                };
            }
            SculptCommand::TogglePolarity => self.settings.toggle_polarity(),
        }
        None
    }

    /// Primary button pressed. Returns true when a stroke started, meaning
    /// the event is consumed and the camera must not orbit.
    pub fn pointer_down(&mut self, stage: &mut Stage, ray: &Ray) -> bool {
        if !self.enabled {
            return false;
        }
        if self.is_stroking() {
            self.pointer_up(stage);
        }
        let Some(hit) = self.update_cursor(stage, ray) else {
            return false;
        };

        let stroke_id = self.next_stroke_id;
        self.next_stroke_id += 1;
        self.state = StrokeState::Stroking {
            stroke_id,
            touched: Vec::new(),
            dirty: false,
            dabs: 0,
        };
        tracing::debug!("Stroke {} started on {:?}", stroke_id, hit.mesh);
        self.apply_at(stage, &hit);
        true
    }

    /// Pointer moved: update the cursor and, while stroking, sculpt.
    pub fn pointer_move(&mut self, stage: &mut Stage, ray: &Ray) {
        if !self.enabled {
            return;
        }
        let Some(hit) = self.update_cursor(stage, ray) else {
            return;
        };
        if self.is_stroking() {
            self.apply_at(stage, &hit);
        }
    }

    /// Primary button released: end the stroke.
    pub fn pointer_up(&mut self, stage: &mut Stage) -> Option<StrokeSummary> {
        let StrokeState::Stroking {
            stroke_id,
            touched,
            dirty,
            dabs,
        } = std::mem::take(&mut self.state)
        else {
            return None;
        };

        let mut normals_recomputed = 0;
        if dirty {
            for mesh_ref in &touched {
                if let Some(mesh) = stage.scene_mut().mesh_mut(*mesh_ref) {
                    mesh.compute_normals();
                    normals_recomputed += 1;
                }
            }
        }
        tracing::debug!(
            "Stroke {} ended after {} dabs, normals recomputed for {} meshes",
            stroke_id,
            dabs,
            normals_recomputed
        );
        Some(StrokeSummary {
            stroke_id,
            dabs,
            normals_recomputed,
        })
    }

    /// Drop any stroke without touching geometry (the model is gone).
    pub fn reset(&mut self) {
        self.state = StrokeState::Idle;
        self.cursor = BrushCursor::default();
    }

    fn update_cursor(&mut self, stage: &Stage, ray: &Ray) -> Option<SceneHit> {
        let hit = stage.raycast_original(ray);
        self.cursor = BrushCursor {
            visible: hit.is_some(),
            hit,
            radius: self.settings.radius(),
        };
        hit
    }

    fn apply_at(&mut self, stage: &mut Stage, hit: &SceneHit) {
        let StrokeState::Stroking {
            touched,
            dirty,
            dabs,
            ..
        } = &mut self.state
        else {
            return;
        };

        let world = stage.scene().world_matrix(hit.mesh.node);
        let dab = Dab::for_hit(hit.local_point, &world, self.settings);
        let Some(mesh) = stage.scene_mut().mesh_mut(hit.mesh) else {
            return;
        };

        if !touched.contains(&hit.mesh) {
            // Displacement follows normals, so they must exist before the first dab
            mesh.ensure_normals();
            touched.push(hit.mesh);
        }

        let result = apply_dab(mesh, &dab);
        *dabs += 1;
        *dirty |= !result.is_empty();
    }
}
