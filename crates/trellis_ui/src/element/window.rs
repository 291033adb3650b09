//! Top-level panel bound to a native surface.

use super::{ElementId, PanelState};
use crate::color::Color;
use crate::input::ClickTracker;
use crate::platform::{NativeHandle, WindowImpl};
use crate::render::Renderer;

/// State of a window element.
pub struct WindowState {
    /// The root panel.
    pub(crate) panel: PanelState,
    /// Native surface.
    pub(crate) native: Box<dyn WindowImpl>,
    /// Renderer; taken out while the window is being painted.
    pub(crate) renderer: Option<Box<dyn Renderer>>,
    /// Cached native handle.
    pub(crate) handle: NativeHandle,
    /// Color the surface is cleared with.
    pub background: Color,
    /// Window has keyboard focus.
    pub(crate) active: bool,
    /// Hovered chain, outermost first.
    pub(crate) hovered: Vec<ElementId>,
    /// Element receiving all pointer input between press and release.
    pub(crate) capture: Option<ElementId>,
    /// Double-click detection.
    pub(crate) clicks: ClickTracker,
    /// The native surface is already gone.
    pub(crate) native_destroyed: bool,
}

impl WindowState {
    pub(crate) fn new(
        panel: PanelState,
        native: Box<dyn WindowImpl>,
        renderer: Box<dyn Renderer>,
        clicks: ClickTracker,
    ) -> Self {
        let handle = native.handle();
        Self {
            panel,
            native,
            renderer: Some(renderer),
            handle,
            background: Color::WINDOW,
            active: false,
            hovered: Vec::new(),
            capture: None,
            clicks,
            native_destroyed: false,
        }
    }

    /// Root panel.
    #[must_use]
    pub fn panel(&self) -> &PanelState {
        &self.panel
    }

    /// Native surface handle.
    #[must_use]
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// Returns true if the window has keyboard focus.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Element holding the pointer capture.
    #[must_use]
    pub fn capture(&self) -> Option<ElementId> {
        self.capture
    }

    /// Hovered chain, outermost first.
    #[must_use]
    pub fn hovered(&self) -> &[ElementId] {
        &self.hovered
    }
}
