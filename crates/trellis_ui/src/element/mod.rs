//! Element types: identity, flags, per-element state and the tagged
//! element kinds.
//!
//! ## Ownership
//!
//! ```text
//! ElementTree (arena)
//!   └─ Element { state, visual, kind }
//!        kind = Leaf
//!             | Panel(PanelState { children: ElementCollection, .. })
//!             | Window(WindowState { panel, native, renderer, .. })
//! ```
//!
//! Panels own their children through the arena; children point back to
//! their parent with a non-owning [`ElementId`].

mod collection;
mod factory;
mod panel;
mod tree;
mod visual;
mod window;

pub use collection::{CollectionChange, CollectionEvent, CollectionPhase, ElementCollection};
pub use factory::{ElementRegistry, ElementTemplate, PropertyValue};
pub use panel::PanelState;
pub use tree::{Ancestors, Descendants, ElementTree};
pub use visual::{
    AsAny, Blank, HitTestable, Interactive, Label, Layoutable, Paintable, Reaction, Rectangle,
    UpdateOutcome, Visual,
};
pub use window::WindowState;

pub(crate) use factory::apply_core_property;

use trellis_core::Handle;

use crate::geometry::{Point, Rect, Size, Thickness};
use crate::layout::Length;
use crate::platform::CursorIcon;

/// Identifies an element in an [`ElementTree`].
///
/// Ids are generational: once an element is disposed its id never resolves
/// again, even after the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(Handle);

impl ElementId {
    /// Wraps a raw arena handle.
    #[inline]
    #[must_use]
    pub const fn from_handle(handle: Handle) -> Self {
        Self(handle)
    }

    /// The underlying arena handle.
    #[inline]
    #[must_use]
    pub const fn handle(self) -> Handle {
        self.0
    }
}

impl std::fmt::Debug for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Element({}v{})", self.0.index(), self.0.generation())
    }
}

/// Element state flags (bitfield).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementFlags(u32);

impl ElementFlags {
    /// Element is visible.
    pub const VISIBLE: u32 = 1 << 0;
    /// Element is enabled (can receive input).
    pub const ENABLED: u32 = 1 << 1;
    /// Pointer is over the element or one of its descendants.
    pub const MOUSE_OVER: u32 = 1 << 2;
    /// Element holds global focus.
    pub const FOCUSED: u32 = 1 << 3;
    /// Element can take focus.
    pub const FOCUSABLE: u32 = 1 << 4;

    /// Default flags for a new element.
    pub const DEFAULT: Self = Self(Self::VISIBLE | Self::ENABLED);

    /// Returns true if the flag is set.
    #[inline]
    #[must_use]
    pub const fn has(self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Sets a flag.
    #[inline]
    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    /// Clears a flag.
    #[inline]
    pub fn clear(&mut self, flag: u32) {
        self.0 &= !flag;
    }

    /// Sets or clears a flag. Returns true if the flag changed.
    #[inline]
    pub fn assign(&mut self, flag: u32, on: bool) -> bool {
        let before = self.0;
        if on {
            self.set(flag);
        } else {
            self.clear(flag);
        }
        before != self.0
    }
}

impl Default for ElementFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What an element asks of its parent's layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutParams {
    /// Requested width.
    pub width: Length,
    /// Requested height.
    pub height: Length,
    /// Space kept free around the element.
    pub margin: Thickness,
    /// Paint and hit-test order among siblings; higher is on top.
    pub z_index: i32,
}

impl LayoutParams {
    /// Returns true if either axis sizes to content.
    #[must_use]
    pub fn is_auto_sized(&self) -> bool {
        matches!(self.width, Length::Auto) || matches!(self.height, Length::Auto)
    }
}

/// State common to every element.
#[derive(Debug, Clone)]
pub struct ElementState {
    /// Element identifier.
    pub id: ElementId,
    /// Layout rectangle, relative to the parent's top-left corner.
    pub rect: Rect,
    /// Content size found by the last measure pass (margin excluded).
    pub desired_size: Size,
    /// Available size handed to the last measure pass.
    pub measured_with: Size,
    /// `desired_size` still holds for `measured_with`; cleared by any
    /// layout invalidation in the element or its subtree.
    pub(crate) measure_valid: bool,
    /// State flags.
    pub flags: ElementFlags,
    /// Layout request.
    pub layout: LayoutParams,
    /// Opacity multiplier applied to the element and its descendants.
    pub opacity: f32,
    /// Paint/hit-test translation that does not affect layout.
    pub render_offset: Point,
    /// Pointer shape shown while hovering the element.
    pub cursor: CursorIcon,
    /// Owning panel (None for windows and detached elements).
    pub(crate) parent: Option<ElementId>,
}

impl ElementState {
    /// Creates the default state for a new element.
    #[must_use]
    pub fn new(id: ElementId) -> Self {
        Self {
            id,
            rect: Rect::ZERO,
            desired_size: Size::ZERO,
            measured_with: Size::ZERO,
            measure_valid: false,
            flags: ElementFlags::DEFAULT,
            layout: LayoutParams::default(),
            opacity: 1.0,
            render_offset: Point::ZERO,
            cursor: CursorIcon::Arrow,
            parent: None,
        }
    }

    /// Owning panel.
    #[inline]
    #[must_use]
    pub const fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Size of the layout rectangle.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.rect.size()
    }

    /// Returns true if the element is visible.
    #[inline]
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.flags.has(ElementFlags::VISIBLE)
    }

    /// Returns true if the element accepts input.
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.flags.has(ElementFlags::ENABLED)
    }

    /// Returns true if the pointer is over the element.
    #[inline]
    #[must_use]
    pub const fn is_mouse_over(&self) -> bool {
        self.flags.has(ElementFlags::MOUSE_OVER)
    }

    /// Returns true if the element holds global focus.
    #[inline]
    #[must_use]
    pub const fn is_focused(&self) -> bool {
        self.flags.has(ElementFlags::FOCUSED)
    }

    /// Returns true if the element can take focus.
    #[inline]
    #[must_use]
    pub const fn is_focusable(&self) -> bool {
        self.flags.has(ElementFlags::FOCUSABLE)
    }
}

/// What a change requires from the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Invalidation {
    /// The element's size request changed; its parent must re-layout.
    pub layout: bool,
    /// The element must be repainted.
    pub visual: bool,
}

impl Invalidation {
    /// Nothing to do.
    pub const NONE: Self = Self {
        layout: false,
        visual: false,
    };
    /// Repaint only.
    pub const VISUAL: Self = Self {
        layout: false,
        visual: true,
    };
    /// Re-layout and repaint.
    pub const LAYOUT: Self = Self {
        layout: true,
        visual: true,
    };

    /// Combines two invalidations.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            layout: self.layout || other.layout,
            visual: self.visual || other.visual,
        }
    }

    /// Returns true if nothing is requested.
    #[must_use]
    pub const fn is_none(self) -> bool {
        !self.layout && !self.visual
    }
}

/// The structural role of an element.
pub enum ElementKind {
    /// A plain element without children.
    Leaf,
    /// A composite element owning a child collection.
    Panel(PanelState),
    /// A top-level panel bound to a native surface.
    Window(Box<WindowState>),
}

impl std::fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf => f.write_str("Leaf"),
            Self::Panel(panel) => f.debug_tuple("Panel").field(panel).finish(),
            Self::Window(window) => f.debug_tuple("Window").field(&window.panel).finish(),
        }
    }
}

/// A node of the element tree.
pub struct Element {
    /// Common state.
    pub state: ElementState,
    /// Registered type name.
    pub(crate) type_name: &'static str,
    /// Behaviour supplied by the concrete element type.
    pub(crate) visual: Box<dyn Visual>,
    /// Structural role.
    pub(crate) kind: ElementKind,
}

impl Element {
    /// Registered type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Behaviour of the element.
    #[must_use]
    pub fn visual(&self) -> &dyn Visual {
        self.visual.as_ref()
    }

    /// Downcasts the visual to a concrete type.
    #[must_use]
    pub fn visual_as<T: Visual>(&self) -> Option<&T> {
        (*self.visual).as_any().downcast_ref::<T>()
    }

    /// Structural role.
    #[must_use]
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Panel state of panels and windows.
    #[must_use]
    pub fn panel(&self) -> Option<&PanelState> {
        match &self.kind {
            ElementKind::Leaf => None,
            ElementKind::Panel(panel) => Some(panel),
            ElementKind::Window(window) => Some(&window.panel),
        }
    }

    pub(crate) fn panel_mut(&mut self) -> Option<&mut PanelState> {
        match &mut self.kind {
            ElementKind::Leaf => None,
            ElementKind::Panel(panel) => Some(panel),
            ElementKind::Window(window) => Some(&mut window.panel),
        }
    }

    /// Window state of windows.
    #[must_use]
    pub fn window(&self) -> Option<&WindowState> {
        match &self.kind {
            ElementKind::Window(window) => Some(window),
            _ => None,
        }
    }

    pub(crate) fn window_mut(&mut self) -> Option<&mut WindowState> {
        match &mut self.kind {
            ElementKind::Window(window) => Some(window),
            _ => None,
        }
    }

    /// Returns true for panels and windows.
    #[must_use]
    pub fn is_panel(&self) -> bool {
        !matches!(self.kind, ElementKind::Leaf)
    }

    /// Returns true for windows.
    #[must_use]
    pub fn is_window(&self) -> bool {
        matches!(self.kind, ElementKind::Window(_))
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("type_name", &self.type_name)
            .field("state", &self.state)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let mut flags = ElementFlags::DEFAULT;
        assert!(flags.has(ElementFlags::VISIBLE));
        assert!(!flags.has(ElementFlags::FOCUSED));

        assert!(flags.assign(ElementFlags::FOCUSED, true));
        assert!(!flags.assign(ElementFlags::FOCUSED, true));
        assert!(flags.has(ElementFlags::FOCUSED));

        flags.clear(ElementFlags::VISIBLE);
        assert!(!flags.has(ElementFlags::VISIBLE));
    }

    #[test]
    fn test_invalidation_merge() {
        assert_eq!(Invalidation::NONE.merge(Invalidation::VISUAL), Invalidation::VISUAL);
        assert_eq!(Invalidation::VISUAL.merge(Invalidation::LAYOUT), Invalidation::LAYOUT);
        assert!(Invalidation::NONE.is_none());
    }

    #[test]
    fn test_element_id_debug() {
        let id = ElementId::from_handle(Handle::new(4, 2));
        assert_eq!(format!("{id:?}"), "Element(4v2)");
    }
}
