//! Input events delivered by the platform and routed through the tree.
//!
//! Positions are in window coordinates when they arrive and are translated
//! to element-local coordinates before each element sees them.

use std::time::{Duration, Instant};

use crate::geometry::Point;

/// Mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button.
    Left,
    /// Right mouse button.
    Right,
    /// Middle mouse button (scroll wheel click).
    Middle,
}

/// Keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Escape key.
    Escape,
    /// Enter/Return key.
    Enter,
    /// Tab key.
    Tab,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
    /// Home key.
    Home,
    /// End key.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// Space bar.
    Space,
    /// Any other key, by platform scan code.
    Other(u32),
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Control key is held.
    pub ctrl: bool,
    /// Alt key is held.
    pub alt: bool,
    /// Super/Command key is held.
    pub super_key: bool,
}

/// A single input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer moved.
    MouseMove {
        /// Pointer position.
        position: Point,
    },
    /// Button pressed.
    MouseDown {
        /// Pointer position.
        position: Point,
        /// Which button.
        button: MouseButton,
        /// 1 for a single click, 2 for a double click.
        click_count: u8,
    },
    /// Button released.
    MouseUp {
        /// Pointer position.
        position: Point,
        /// Which button.
        button: MouseButton,
    },
    /// Wheel or touchpad scroll.
    Wheel {
        /// Pointer position.
        position: Point,
        /// Scroll amount in pixels.
        delta: Point,
    },
    /// Pointer left the window.
    MouseLeave,
    /// Key pressed.
    KeyDown {
        /// The key.
        key: Key,
        /// Held modifiers.
        modifiers: Modifiers,
    },
    /// Key released.
    KeyUp {
        /// The key.
        key: Key,
        /// Held modifiers.
        modifiers: Modifiers,
    },
    /// Committed text.
    Text(String),
}

impl InputEvent {
    /// Returns the pointer position for pointer events.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::MouseMove { position }
            | Self::MouseDown { position, .. }
            | Self::MouseUp { position, .. }
            | Self::Wheel { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Returns a copy with the pointer position shifted by `-origin`.
    #[must_use]
    pub fn relative_to(&self, origin: Point) -> Self {
        let mut event = self.clone();
        match &mut event {
            Self::MouseMove { position }
            | Self::MouseDown { position, .. }
            | Self::MouseUp { position, .. }
            | Self::Wheel { position, .. } => *position -= origin,
            _ => {}
        }
        event
    }

    /// Returns true for keyboard and text events.
    #[must_use]
    pub const fn is_keyboard(&self) -> bool {
        matches!(self, Self::KeyDown { .. } | Self::KeyUp { .. } | Self::Text(_))
    }
}

/// Double-click detection.
#[derive(Debug, Clone)]
pub(crate) struct ClickTracker {
    /// Time of the last left press.
    last_time: Option<Instant>,
    /// Position of the last left press.
    last_position: Point,
    /// Consecutive clicks so far.
    count: u8,
    /// Double-click time threshold.
    max_delay: Duration,
    /// Double-click position threshold (pixels).
    max_distance: f32,
}

impl ClickTracker {
    pub(crate) fn new(max_delay: Duration, max_distance: f32) -> Self {
        Self {
            last_time: None,
            last_position: Point::ZERO,
            count: 0,
            max_delay,
            max_distance,
        }
    }

    /// Records a press and returns its click count.
    pub(crate) fn press(&mut self, button: MouseButton, position: Point, now: Instant) -> u8 {
        if button != MouseButton::Left {
            return 1;
        }

        let repeated = self.last_time.is_some_and(|last| {
            now.duration_since(last) < self.max_delay
                && position.distance(self.last_position) < self.max_distance
        });

        self.count = if repeated { self.count.saturating_add(1) } else { 1 };
        self.last_time = Some(now);
        self.last_position = position;
        self.count
    }
}
