//! Pointer input events in device (surface pixel) coordinates.

use serde::{Deserialize, Serialize};

/// Pointer input events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Move { x: f32, y: f32 },
    ButtonDown { button: PointerButton, x: f32, y: f32 },
    ButtonUp { button: PointerButton, x: f32, y: f32 },
    Scroll { delta: f32 },
}

/// Pointer button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

impl PointerEvent {
    /// Device position carried by the event, if any.
    pub fn position(&self) -> Option<(f32, f32)> {
        match *self {
            PointerEvent::Move { x, y }
            | PointerEvent::ButtonDown { x, y, .. }
            | PointerEvent::ButtonUp { x, y, .. } => Some((x, y)),
            PointerEvent::Scroll { .. } => None,
        }
    }
}
