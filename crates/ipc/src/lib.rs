//! IPC message protocol for Facet
//!
//! Defines all message types exchanged between the core and the UI layer.
//! The UI drives the core with [`UiToCore`] messages and renders whatever the
//! core reports back through [`CoreToUi`].

use serde::{Deserialize, Serialize};

mod commands;
mod error;
mod input;
pub mod types;

pub use commands::*;
pub use error::IpcError;
pub use input::*;
pub use types::*;

/// Messages from the core to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CoreToUi {
    /// A model was parsed and normalized
    ModelLoaded {
        file_name: String,
        input_format: String,
        stats: SceneStats,
        targets: Vec<String>,
        target: String,
    },

    /// Pipeline moved to a new state
    StatusChanged(PipelineStatus),

    /// A conversion finished and its preview is in the viewport
    ConversionComplete(ConversionReport),

    /// The previous report no longer applies (target format changed)
    ReportHidden,

    /// Brush cursor moved or was hidden
    BrushCursor(BrushCursorInfo),

    /// Error notification
    Error { kind: ErrorKind, message: String },
}

/// Messages from the UI to the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UiToCore {
    /// Load a model file
    LoadFile { file_name: String, bytes: Vec<u8> },

    /// Pointer input over the viewport, in surface pixels
    Pointer(PointerEvent),

    /// Comparison slider moved (fraction of the viewport width)
    SetSliderFraction(f32),

    /// Placement and display edits
    ModelCommand(ModelCommand),

    /// Sculpt brush settings
    SculptCommand(SculptCommand),

    /// Camera control
    CameraCommand(CameraCommand),

    /// Select the conversion target by extension
    SelectTarget { format: String },

    /// Start a conversion with the given options
    Convert(ConversionOptions),

    /// Hand the last output to the download sink
    Download,

    /// Drop every model and return to the empty state
    Reset,

    /// Output surface resized
    Resize { width: u32, height: u32 },
}

/// Coarse pipeline state shown by the UI (loader overlay, buttons).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    NoModel,
    Loading,
    Loaded,
    Converting,
    Previewed,
}

/// Failure category attached to error notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Format,
    Export,
    Optimization,
    DegenerateGeometry,
}

/// Brush cursor state for the on-screen indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrushCursorInfo {
    pub visible: bool,
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub radius: f32,
}

impl CoreToUi {
    /// Serialize for the UI transport.
    pub fn to_json(&self) -> Result<String, IpcError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl UiToCore {
    /// Parse a message coming from the UI transport.
    pub fn from_json(text: &str) -> Result<Self, IpcError> {
        serde_json::from_str(text).map_err(|e| IpcError::MalformedMessage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_message_tagging() {
        let json = r#"{"type":"SetSliderFraction","data":0.3}"#;
        let message = UiToCore::from_json(json).unwrap();
        assert_eq!(message, UiToCore::SetSliderFraction(0.3));
    }

    #[test]
    fn test_invalid_ui_message() {
        let result = UiToCore::from_json(r#"{"type":"Explode"}"#);
        assert!(matches!(result, Err(IpcError::MalformedMessage(_))));
    }

    #[test]
    fn test_error_message_json() {
        let message = CoreToUi::Error {
            kind: ErrorKind::Format,
            message: "bad header".into(),
        };
        let json = message.to_json().unwrap();
        assert!(json.contains("\"type\":\"Error\""));
        assert!(json.contains("\"kind\":\"Format\""));
    }
}
