//! Input abstraction layer.
//!
//! Normalizes host pointer events into a unified `InputEvent` consumed by
//! the canvas and its tools. Coordinates are in screen space; the canvas
//! maps them into scene space using its viewport offset.

/// Keyboard modifiers held during a pointer or key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };
}

/// A pointer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
    pub modifiers: Modifiers,
    /// Host timestamp in milliseconds.
    pub time_ms: f64,
}

impl PointerEvent {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            modifiers: Modifiers::NONE,
            time_ms: 0.0,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn at_time(mut self, time_ms: f64) -> Self {
        self.time_ms = time_ms;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start, pen contact).
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    /// Pointer left the canvas.
    PointerOut(PointerEvent),
}

impl InputEvent {
    pub fn pointer(&self) -> &PointerEvent {
        match self {
            Self::PointerDown(p) | Self::PointerMove(p) | Self::PointerUp(p) | Self::PointerOut(p) => p,
        }
    }

    /// Extract the screen position.
    pub fn position(&self) -> (f64, f64) {
        let p = self.pointer();
        (p.x, p.y)
    }
}
