//! Composite element state.

use super::{ElementCollection, ElementId};
use crate::geometry::{Point, Size, Thickness};
use crate::layout::PanelLayout;

/// State of a panel: its children and how they are arranged.
#[derive(Debug, Clone)]
pub struct PanelState {
    /// Owned children.
    pub(crate) children: ElementCollection,
    /// Arrangement strategy.
    pub layout: PanelLayout,
    /// Space between the panel edge and its client region.
    pub padding: Thickness,
    /// Content scroll position.
    pub(crate) scroll_offset: Point,
    /// Children extent measured from the client origin.
    pub(crate) content_size: Size,
    /// Wheel input may scroll this panel.
    pub scrollable: bool,
    /// Children are clipped to the panel rectangle.
    pub clip_children: bool,
    /// Panel keeps its own remembered focus.
    pub(crate) focus_scope: bool,
    /// Last focused descendant inside this scope.
    pub(crate) scope_focus: Option<ElementId>,
}

impl PanelState {
    /// Creates an empty panel.
    #[must_use]
    pub fn new(layout: PanelLayout) -> Self {
        Self {
            children: ElementCollection::new(),
            layout,
            padding: Thickness::ZERO,
            scroll_offset: Point::ZERO,
            content_size: Size::ZERO,
            scrollable: false,
            clip_children: false,
            focus_scope: false,
            scope_focus: None,
        }
    }

    /// Child collection.
    #[must_use]
    pub fn children(&self) -> &ElementCollection {
        &self.children
    }

    /// Current scroll offset.
    #[must_use]
    pub fn scroll_offset(&self) -> Point {
        self.scroll_offset
    }

    /// Extent of the children, measured from the client origin.
    #[must_use]
    pub fn content_size(&self) -> Size {
        self.content_size
    }

    /// Returns true if the panel is a focus scope.
    #[must_use]
    pub fn is_focus_scope(&self) -> bool {
        self.focus_scope
    }

    /// Remembered focus of a focus scope.
    #[must_use]
    pub fn scope_focus(&self) -> Option<ElementId> {
        self.scope_focus
    }

    /// Largest scroll offset that keeps content in view.
    #[must_use]
    pub fn max_scroll(&self, panel_size: Size) -> Point {
        let client = panel_size.deflate(self.padding);
        Point::new(
            (self.content_size.width - client.width).max(0.0),
            (self.content_size.height - client.height).max(0.0),
        )
    }
}
