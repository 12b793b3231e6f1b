//! Pointer and keyboard events delivered by the host.
//!
//! Positions are screen coordinates relative to the whiteboard viewport.
//! Timestamps are host milliseconds (monotonic, arbitrary epoch).

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    /// Space bar held (hand tool).
    pub space: bool,
}

impl Modifiers {
    /// Whether a primary-button press should pan instead of hitting blocks.
    pub fn forces_pan(&self) -> bool {
        self.space || self.alt
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    Down {
        position: Point,
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
        time_ms: f64,
    },
    Move {
        position: Point,
        time_ms: f64,
    },
    Up {
        position: Point,
        #[serde(default)]
        button: MouseButton,
        time_ms: f64,
    },
    Wheel {
        position: Point,
        delta: Vec2,
        time_ms: f64,
    },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Move { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Wheel { position, .. } => *position,
        }
    }

    pub fn time_ms(&self) -> f64 {
        match self {
            PointerEvent::Down { time_ms, .. }
            | PointerEvent::Move { time_ms, .. }
            | PointerEvent::Up { time_ms, .. }
            | PointerEvent::Wheel { time_ms, .. } => *time_ms,
        }
    }
}

/// Keys the whiteboard reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    /// Zoom to fit all blocks.
    Fit,
    /// Reset the camera to 100% at the origin.
    ResetZoom,
    ZoomIn,
    ZoomOut,
}

impl Key {
    /// Parse a host key name ("Escape", "Delete", "=", ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Escape" | "Esc" => Some(Key::Escape),
            "Delete" | "Del" => Some(Key::Delete),
            "Backspace" => Some(Key::Backspace),
            "1" | "F" | "f" => Some(Key::Fit),
            "0" => Some(Key::ResetZoom),
            "=" | "+" => Some(Key::ZoomIn),
            "-" | "_" => Some(Key::ZoomOut),
            _ => None,
        }
    }

    /// Whether the key removes the focused block.
    pub fn is_delete(self) -> bool {
        matches!(self, Key::Delete | Key::Backspace)
    }
}

/// Tracks which pointer buttons are down and where the pointer was last seen.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub pointer_position: Point,
    pub previous_pointer_position: Point,
    pressed: Vec<MouseButton>,
    pub modifiers: Modifiers,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pointer event.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) {
        self.previous_pointer_position = self.pointer_position;
        self.pointer_position = event.position();
        match event {
            PointerEvent::Down { button, modifiers, .. } => {
                self.modifiers = *modifiers;
                if !self.pressed.contains(button) {
                    self.pressed.push(*button);
                }
            }
            PointerEvent::Up { button, .. } => self.pressed.retain(|b| b != button),
            PointerEvent::Move { .. } | PointerEvent::Wheel { .. } => {}
        }
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed.contains(&button)
    }

    pub fn any_pressed(&self) -> bool {
        !self.pressed.is_empty()
    }

    /// Pointer movement since the previous event.
    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer_position - self.previous_pointer_position
    }
}
