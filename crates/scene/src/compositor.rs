//! Dual-view compositor: one camera, two visibility masks, a split scissor.
//!
//! The compositor drives a [`RenderBackend`]; it does not own GPU state.
//! Each frame advances the camera first so both halves of a split frame use
//! identical matrices, and slot visibility is restored once the frame is done
//! so hit tests and stats always see both slots.

use crate::camera::{OrbitCamera, ViewUniforms};
use crate::stage::{Slot, Stage};

/// Half-open pixel rectangle `[x, x + width) x [y, y + height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn contains_x(&self, x: u32) -> bool {
        x >= self.x && x < self.right()
    }
}

/// Comparison mode state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    /// Set once a result exists
    pub comparing: bool,
    slider_fraction: f32,
}

impl Default for Comparison {
    fn default() -> Self {
        Self {
            comparing: false,
            slider_fraction: 0.5,
        }
    }
}

impl Comparison {
    pub fn slider_fraction(&self) -> f32 {
        self.slider_fraction
    }

    /// Set the split position; clamped to [0, 1], NaN ignored.
    pub fn set_slider_fraction(&mut self, fraction: f32) {
        if fraction.is_nan() {
            return;
        }
        self.slider_fraction = fraction.clamp(0.0, 1.0);
    }

    /// Move the slider to a pointer position over a surface spanning
    /// `[left, left + width)`.
    pub fn set_slider_from_pointer(&mut self, x: f32, left: f32, width: f32) {
        if width <= 0.0 {
            return;
        }
        self.set_slider_fraction((x - left) / width);
    }

    /// Pixel column where the split happens.
    pub fn split_x(&self, width: u32) -> u32 {
        ((self.slider_fraction * width as f32).round() as u32).min(width)
    }

    /// Left and right scissor rectangles; together they partition the surface.
    pub fn split_rects(&self, width: u32, height: u32) -> (PixelRect, PixelRect) {
        let split = self.split_x(width);
        (
            PixelRect::new(0, 0, split, height),
            PixelRect::new(split, 0, width - split, height),
        )
    }
}

/// Minimal surface a frame is drawn to.
pub trait RenderBackend {
    fn set_viewport(&mut self, rect: PixelRect);

    /// Restrict drawing to `rect`, or disable scissoring with `None`.
    fn set_scissor(&mut self, rect: Option<PixelRect>);

    /// Draw every visible mesh of the stage.
    fn draw(&mut self, stage: &Stage, uniforms: &ViewUniforms);
}

/// Output surface size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
}

impl Surface {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn rect(&self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }
}

/// Render one frame. Returns the number of draw passes issued.
pub fn render_frame(
    stage: &mut Stage,
    camera: &mut OrbitCamera,
    surface: Surface,
    backend: &mut impl RenderBackend,
) -> usize {
    camera.update();
    if surface.is_empty() {
        return 0;
    }

    let uniforms = camera.uniforms();
    backend.set_viewport(surface.rect());

    if !stage.comparison.comparing || !stage.has_result() {
        backend.set_scissor(None);
        backend.draw(stage, &uniforms);
        return 1;
    }

    let (left, right) = stage.comparison.split_rects(surface.width, surface.height);

    backend.set_scissor(Some(left));
    stage.set_slot_visibility(true, false);
    backend.draw(stage, &uniforms);

    backend.set_scissor(Some(right));
    stage.set_slot_visibility(false, true);
    backend.draw(stage, &uniforms);

    stage.set_slot_visibility(true, true);
    backend.set_scissor(None);
    2
}

/// What a single draw call saw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub viewport: Option<PixelRect>,
    pub scissor: Option<PixelRect>,
    pub original_visible: bool,
    pub result_visible: bool,
    /// Vertices of all visible meshes
    pub vertices: usize,
    /// Interleaved vertex bytes that would be uploaded
    pub gpu_bytes: usize,
    pub uniforms: ViewUniforms,
}

/// Backend that records draw calls instead of rasterizing.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    viewport: Option<PixelRect>,
    scissor: Option<PixelRect>,
    pub draws: Vec<DrawRecord>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scissor(&self) -> Option<PixelRect> {
        self.scissor
    }

    pub fn clear(&mut self) {
        self.draws.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn set_viewport(&mut self, rect: PixelRect) {
        self.viewport = Some(rect);
    }

    fn set_scissor(&mut self, rect: Option<PixelRect>) {
        self.scissor = rect;
    }

    fn draw(&mut self, stage: &Stage, uniforms: &ViewUniforms) {
        let scene = stage.scene();
        let visible = scene.visible_meshes();
        let meshes = visible.iter().filter_map(|(mesh, _)| scene.mesh(*mesh));
        let (vertices, gpu_bytes) = meshes.fold((0, 0), |(v, b), mesh| {
            (v + mesh.vertex_count(), b + mesh.gpu_vertex_bytes())
        });

        self.draws.push(DrawRecord {
            viewport: self.viewport,
            scissor: self.scissor,
            original_visible: stage.is_slot_visible(Slot::Original),
            result_visible: stage.is_slot_visible(Slot::Result),
            vertices,
            gpu_bytes,
            uniforms: *uniforms,
        });
    }
}
