//! Input abstraction layer.
//!
//! Normalizes DOM pointer, wheel and keyboard events into a single
//! `InputEvent` enum. Pointer coordinates are in screen space (canvas
//! element pixels); the handler maps them to canvas space.

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// ⌘ on macOS, Ctrl elsewhere.
    pub fn cmd(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// From `MouseEvent.button` (0 primary, 1 middle, 2 secondary).
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => Self::Middle,
            2 => Self::Secondary,
            _ => Self::Primary,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f64,
        y: f64,
        button: PointerButton,
        modifiers: Modifiers,
    },
    PointerMove {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },
    PointerUp {
        x: f64,
        y: f64,
        modifiers: Modifiers,
    },
    /// One wheel step; negative `delta_y` zooms in.
    Wheel { x: f64, y: f64, delta_y: f64 },
    DoubleClick { x: f64, y: f64 },
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`, `" "`).
    KeyDown { key: String, modifiers: Modifiers },
    KeyUp { key: String, modifiers: Modifiers },
}

impl InputEvent {
    /// Screen position for pointer-like events.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::Wheel { x, y, .. }
            | Self::DoubleClick { x, y } => Some((*x, *y)),
            Self::KeyDown { .. } | Self::KeyUp { .. } => None,
        }
    }
}
