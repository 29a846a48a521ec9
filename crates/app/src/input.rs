//! Pointer routing between the comparison slider, the sculpt brush and the
//! orbit camera.
//!
//! A primary press near the split line grabs the slider. Otherwise, in
//! sculpt mode, a press that hits the model starts a stroke; anything else
//! orbits. While a stroke is active drags never reach the camera.

use facet_ipc::{PointerButton, PointerEvent};
use facet_scene::{OrbitCamera, Ray, Stage, Surface, pixel_to_ndc};
use glam::Vec2;
use sculpting::{SculptEngine, StrokeSummary};

/// Horizontal distance in pixels within which a press grabs the split line
pub const SLIDER_GRAB_PX: f32 = 8.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Drag {
    #[default]
    None,
    Slider,
    Sculpt,
    Orbit {
        last: Vec2,
    },
}

/// What a pointer event changed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerOutcome {
    /// The brush cursor moved, appeared or disappeared
    pub cursor_changed: bool,
    /// A stroke ended with this event
    pub stroke: Option<StrokeSummary>,
}

/// Pointer state across events.
#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    drag: Drag,
}

/// World ray through a surface pixel.
pub fn ray_at(camera: &OrbitCamera, surface: Surface, x: f32, y: f32) -> Option<Ray> {
    pixel_to_ndc(x, y, surface.width, surface.height).map(|ndc| camera.ray_from_ndc(ndc))
}

impl InputRouter {
    pub fn is_dragging_slider(&self) -> bool {
        self.drag == Drag::Slider
    }

    pub fn is_orbiting(&self) -> bool {
        matches!(self.drag, Drag::Orbit { .. })
    }

    /// Forget any drag in progress.
    pub fn reset(&mut self) {
        self.drag = Drag::None;
    }

    fn near_split(stage: &Stage, surface: Surface, x: f32) -> bool {
        if !stage.comparison.comparing || !stage.has_result() {
            return false;
        }
        let split = stage.comparison.split_x(surface.width) as f32;
        (x - split).abs() <= SLIDER_GRAB_PX
    }

    pub fn handle(
        &mut self,
        event: PointerEvent,
        stage: &mut Stage,
        camera: &mut OrbitCamera,
        sculpt: &mut SculptEngine,
        surface: Surface,
    ) -> PointerOutcome {
        let mut outcome = PointerOutcome::default();
        match event {
            PointerEvent::ButtonDown {
                button: PointerButton::Primary,
                x,
                y,
            } => {
                if Self::near_split(stage, surface, x) {
                    self.drag = Drag::Slider;
                    stage
                        .comparison
                        .set_slider_from_pointer(x, 0.0, surface.width as f32);
                    return outcome;
                }
                if sculpt.is_enabled() {
                    if let Some(ray) = ray_at(camera, surface, x, y) {
                        let started = sculpt.pointer_down(stage, &ray);
                        outcome.cursor_changed = true;
                        if started {
                            self.drag = Drag::Sculpt;
                            return outcome;
                        }
                    }
                }
                self.drag = Drag::Orbit {
                    last: Vec2::new(x, y),
                };
            }
            PointerEvent::ButtonDown { x, y, .. } => {
                if !sculpt.is_stroking() {
                    self.drag = Drag::Orbit {
                        last: Vec2::new(x, y),
                    };
                }
            }
            PointerEvent::Move { x, y } => match self.drag {
                Drag::Slider => {
                    stage
                        .comparison
                        .set_slider_from_pointer(x, 0.0, surface.width as f32);
                }
                Drag::Sculpt => {
                    if let Some(ray) = ray_at(camera, surface, x, y) {
                        sculpt.pointer_move(stage, &ray);
                        outcome.cursor_changed = true;
                    }
                }
                Drag::Orbit { last } => {
                    let position = Vec2::new(x, y);
                    if !sculpt.is_stroking() {
                        let delta = position - last;
                        camera.orbit(delta.x, delta.y);
                    }
                    self.drag = Drag::Orbit { last: position };
                }
                Drag::None => {
                    // Hover only moves the brush cursor
                    if sculpt.is_enabled() {
                        if let Some(ray) = ray_at(camera, surface, x, y) {
                            sculpt.pointer_move(stage, &ray);
                            outcome.cursor_changed = true;
                        }
                    }
                }
            },
            PointerEvent::ButtonUp { .. } => {
                if self.drag == Drag::Sculpt {
                    outcome.stroke = sculpt.pointer_up(stage);
                }
                self.drag = Drag::None;
            }
            PointerEvent::Scroll { delta } => camera.zoom(delta),
        }
        outcome
    }
}
