//! 3D Sculpting for Facet.
//!
//! Brush-based displacement of mesh vertices along their normals, driven by
//! pointer events that are ray-cast into the original model.
//!
//! ## Key Components
//!
//! - **Brush**: settings, polarity and linear falloff
//! - **Deformation**: per-dab vertex displacement in mesh-local space
//! - **Engine**: the Idle/Stroking state machine and brush cursor

pub mod brush;
pub mod deformation;
pub mod engine;

pub use brush::{BrushSettings, Dab, Polarity, falloff};
pub use deformation::{DeformationResult, apply_dab};
pub use engine::{BrushCursor, SculptEngine, StrokeSummary};
