//! Scene core for Facet
//!
//! This crate holds everything the viewport needs independent of a GPU:
//!
//! - **Geometry**: [`MeshBuffer`] vertex buffers with cached [`Aabb`] bounds
//! - **Scene tree**: [`Scene`] arena of nodes with local transforms
//! - **Normalizer**: fits loaded models into the canonical view volume
//! - **Stage**: original/result slots sharing one [`Placement`]
//! - **Compositor**: split-view rendering through a [`RenderBackend`]
//! - **IO interfaces**: [`Importer`], [`Exporter`] and [`Optimizer`] traits
//!   implemented by the format crate

pub mod bounds;
pub mod camera;
pub mod compositor;
pub mod error;
pub mod io;
pub mod mesh;
pub mod normalize;
pub mod raycast;
pub mod scene;
pub mod stage;
pub mod transform;
pub mod weld;

pub use bounds::Aabb;
pub use camera::{OrbitCamera, ViewUniforms, pixel_to_ndc};
pub use compositor::{
    Comparison, DrawRecord, PixelRect, RecordingBackend, RenderBackend, Surface, render_frame,
};
pub use error::{DegenerateGeometryError, ExportError, FormatError, OptimizationError};
pub use io::{
    ExportOptions, Exporter, Importer, ModelFormat, OptimizeOptions, Optimizer,
    output_file_name, up_axis_correction,
};
pub use mesh::{GpuVertex, MeshBuffer};
pub use normalize::{Normalization, normalize};
pub use raycast::{Ray, SceneHit, raycast_scene};
pub use scene::{MeshRef, Node, NodeId, Scene, Transform};
pub use stage::{ExportSnapshot, Slot, SlotMaterial, Stage};
pub use transform::Placement;
pub use weld::{weld, weld_scene};
