//! Command types for IPC messages.

use serde::{Deserialize, Serialize};

use crate::types::Axis;

/// Discrete placement and display edits applied to the loaded model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelCommand {
    Rotate(Axis),
    Mirror(Axis),
    Center,
    Ground,
    /// Overall scale relative to the normalized size
    Scale(f32),
    SetWireframe(bool),
    /// `#rrggbb`
    SetBaseColor(String),
}

/// Sculpt brush commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SculptCommand {
    SetEnabled(bool),
    SetBrushRadius(f32),
    SetBrushStrength(f32),
    SetInflate(bool),
    TogglePolarity,
}

/// Camera control commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CameraCommand {
    Orbit { delta_x: f32, delta_y: f32 },
    Zoom { delta: f32 },
    Reset,
}

/// Options selected in the conversion panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub weld: bool,
    /// Percentage of geometry to remove (0-100)
    pub simplify_ratio: u8,
    pub compress: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            weld: false,
            simplify_ratio: 0,
            compress: true,
        }
    }
}
