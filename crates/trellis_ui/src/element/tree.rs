//! Element tree over a generational arena.
//!
//! Structural preconditions (double insertion, cycles, removing a
//! non-child) are caller defects and panic.

use trellis_core::Arena;

use super::{Element, ElementId, ElementKind, ElementState, PanelState, Visual};
use crate::geometry::Point;

/// Storage and structure of all elements of one scheduler.
pub struct ElementTree {
    /// Element storage.
    elements: Arena<Element>,
}

impl ElementTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: Arena::with_capacity(256),
        }
    }

    /// Number of stored elements, disposed-but-uncollected included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the tree holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Stores a new detached element.
    pub(crate) fn insert(
        &mut self,
        type_name: &'static str,
        visual: Box<dyn Visual>,
        kind: ElementKind,
    ) -> ElementId {
        let handle = self.elements.insert_with(|handle| Element {
            state: ElementState::new(ElementId::from_handle(handle)),
            type_name,
            visual,
            kind,
        });
        ElementId::from_handle(handle)
    }

    /// Gets an element, including one awaiting disposal.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.handle())
    }

    pub(crate) fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.handle())
    }

    /// Returns true if the element exists and is not awaiting disposal.
    #[must_use]
    pub fn is_live(&self, id: ElementId) -> bool {
        self.elements.is_live(id.handle())
    }

    /// Returns true if the element is awaiting disposal.
    #[must_use]
    pub fn is_disposing(&self, id: ElementId) -> bool {
        self.elements.is_marked(id.handle())
    }

    /// Owning panel of an element.
    #[must_use]
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id)?.state.parent
    }

    /// Panel state of a panel or window.
    #[must_use]
    pub fn panel(&self, id: ElementId) -> Option<&PanelState> {
        self.get(id)?.panel()
    }

    pub(crate) fn panel_mut(&mut self, id: ElementId) -> Option<&mut PanelState> {
        self.get_mut(id)?.panel_mut()
    }

    /// Children of a panel in logical order. Empty for leaves.
    #[must_use]
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.panel(id)
            .map(|panel| panel.children.logical())
            .unwrap_or(&[])
    }

    /// Children of a panel, topmost first.
    #[must_use]
    pub fn z_order(&self, id: ElementId) -> Vec<ElementId> {
        self.panel(id)
            .map(|panel| panel.children.z_order().collect())
            .unwrap_or_default()
    }

    /// Drops the cached measurement of an element and of every ancestor.
    pub(crate) fn invalidate_measure(&mut self, id: ElementId) {
        let mut next = Some(id);
        while let Some(current) = next {
            let Some(element) = self.get_mut(current) else {
                break;
            };
            element.state.measure_valid = false;
            next = element.state.parent;
        }
    }

    /// Ancestors from the parent up to the root.
    #[must_use]
    pub fn ancestors(&self, id: ElementId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Root of the element's tree.
    #[must_use]
    pub fn root(&self, id: ElementId) -> ElementId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Window containing the element (the element itself for windows).
    #[must_use]
    pub fn window_of(&self, id: ElementId) -> Option<ElementId> {
        let root = self.root(id);
        self.get(root)?.is_window().then_some(root)
    }

    /// Number of ancestors.
    #[must_use]
    pub fn depth(&self, id: ElementId) -> usize {
        self.ancestors(id).count()
    }

    /// Returns true if `ancestor` is a strict ancestor of `id`.
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: ElementId, id: ElementId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Returns true if `id` is `root` or inside its subtree.
    #[must_use]
    pub fn is_in_subtree(&self, root: ElementId, id: ElementId) -> bool {
        id == root || self.is_ancestor_of(root, id)
    }

    /// The element and all its descendants, depth first in logical order.
    #[must_use]
    pub fn descendants(&self, id: ElementId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: if self.get(id).is_some() { vec![id] } else { Vec::new() },
        }
    }

    /// Top-left corner of the element in window coordinates.
    #[must_use]
    pub fn window_position(&self, id: ElementId) -> Point {
        let mut position = Point::ZERO;
        let mut current = id;

        while let Some(element) = self.get(current) {
            position += element.state.rect.origin() + element.state.render_offset;
            let Some(parent) = element.state.parent else {
                break;
            };
            if let Some(panel) = self.panel(parent) {
                position -= panel.scroll_offset;
            }
            current = parent;
        }
        position
    }

    /// Adds a detached element to a panel.
    ///
    /// # Panics
    ///
    /// Panics if `panel` is not a live panel, `child` already has a parent,
    /// is a window, or is `panel` or one of its ancestors, or if `before`
    /// is not a child of `panel`.
    pub(crate) fn insert_child(
        &mut self,
        panel: ElementId,
        before: Option<ElementId>,
        child: ElementId,
    ) {
        assert!(self.is_live(panel), "{panel:?} is not a live element");
        assert!(self.is_live(child), "{child:?} is not a live element");
        assert!(
            child != panel && !self.is_ancestor_of(child, panel),
            "inserting {child:?} into {panel:?} would create a cycle"
        );

        let element = self.get(child).expect("checked live above");
        assert!(!element.is_window(), "windows cannot be children");
        assert!(
            element.state.parent.is_none(),
            "{child:?} already belongs to {:?}",
            element.state.parent
        );
        let z_index = element.state.layout.z_index;

        let collection = &mut self
            .panel_mut(panel)
            .unwrap_or_else(|| panic!("{panel:?} is not a panel"))
            .children;
        collection.insert(child, before, z_index);

        if let Some(element) = self.get_mut(child) {
            element.state.parent = Some(panel);
        }
    }

    /// Detaches a child from its panel.
    ///
    /// # Panics
    ///
    /// Panics if `child` is not a child of `panel`.
    pub(crate) fn remove_child(&mut self, panel: ElementId, child: ElementId) {
        assert_eq!(
            self.parent(child),
            Some(panel),
            "{child:?} is not a child of {panel:?}"
        );
        if let Some(panel) = self.panel_mut(panel) {
            panel.children.remove(child);
        }
        if let Some(element) = self.get_mut(child) {
            element.state.parent = None;
        }
    }

    /// Changes a z-index and re-sorts the parent's Z order.
    pub(crate) fn set_zindex(&mut self, child: ElementId, z_index: i32) {
        let Some(element) = self.get_mut(child) else {
            return;
        };
        element.state.layout.z_index = z_index;
        let parent = element.state.parent;

        if let Some(panel) = parent.and_then(|parent| self.panel_mut(parent)) {
            panel.children.set_zindex(child, z_index);
        }
    }

    /// Moves a child in its parent's logical order.
    ///
    /// # Panics
    ///
    /// Panics if `child` is detached or `before` is not a sibling.
    pub(crate) fn move_child_before(&mut self, child: ElementId, before: Option<ElementId>) {
        let parent = self
            .parent(child)
            .unwrap_or_else(|| panic!("{child:?} has no parent"));
        if let Some(panel) = self.panel_mut(parent) {
            panel.children.move_before(child, before);
        }
    }

    /// Marks an element and its whole subtree for disposal.
    ///
    /// Returns the newly marked elements.
    pub(crate) fn mark_for_disposal(&mut self, id: ElementId) -> Vec<ElementId> {
        let subtree: Vec<ElementId> = self.descendants(id).collect();
        subtree
            .into_iter()
            .filter(|&element| self.elements.mark_for_removal(element.handle()))
            .collect()
    }

    /// Number of elements awaiting disposal.
    #[must_use]
    pub fn pending_disposals(&self) -> usize {
        self.elements.pending_removals()
    }

    /// Frees every element marked for disposal.
    pub(crate) fn collect_disposed(&mut self) -> Vec<(ElementId, Element)> {
        self.elements
            .collect_marked()
            .into_iter()
            .map(|(handle, element)| (ElementId::from_handle(handle), element))
            .collect()
    }

    /// Iterates over all stored elements.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements
            .iter()
            .map(|(handle, element)| (ElementId::from_handle(handle), element))
    }
}

impl Default for ElementTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ElementTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementTree")
            .field("len", &self.elements.len())
            .field("pending_disposals", &self.elements.pending_removals())
            .finish()
    }
}

/// Iterator from an element's parent up to the root.
pub struct Ancestors<'a> {
    tree: &'a ElementTree,
    next: Option<ElementId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.tree.parent(id);
        Some(id)
    }
}

/// Depth-first iterator over a subtree.
pub struct Descendants<'a> {
    tree: &'a ElementTree,
    stack: Vec<ElementId>,
}

impl Iterator for Descendants<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;

        // Push children in reverse order so they're visited in logical order
        for &child in self.tree.children(id).iter().rev() {
            self.stack.push(child);
        }

        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Blank;
    use crate::layout::PanelLayout;

    fn panel(tree: &mut ElementTree) -> ElementId {
        tree.insert(
            "Panel",
            Box::new(Blank),
            ElementKind::Panel(PanelState::new(PanelLayout::default())),
        )
    }

    fn leaf(tree: &mut ElementTree) -> ElementId {
        tree.insert("Element", Box::new(Blank), ElementKind::Leaf)
    }

    #[test]
    fn test_tree_hierarchy() {
        let mut tree = ElementTree::new();
        let root = panel(&mut tree);
        let inner = panel(&mut tree);
        let a = leaf(&mut tree);
        let b = leaf(&mut tree);

        tree.insert_child(root, None, inner);
        tree.insert_child(inner, None, a);
        tree.insert_child(root, Some(inner), b);

        assert_eq!(tree.children(root), &[b, inner]);
        assert_eq!(tree.parent(a), Some(inner));
        assert_eq!(tree.depth(a), 2);
        assert!(tree.is_ancestor_of(root, a));
        assert!(!tree.is_ancestor_of(a, root));
        assert_eq!(tree.root(a), root);
        assert_eq!(tree.window_of(a), None);
        assert_eq!(tree.descendants(root).collect::<Vec<_>>(), vec![root, b, inner, a]);
    }

    #[test]
    fn test_remove_child_clears_parent() {
        let mut tree = ElementTree::new();
        let root = panel(&mut tree);
        let a = leaf(&mut tree);

        tree.insert_child(root, None, a);
        tree.remove_child(root, a);

        assert_eq!(tree.parent(a), None);
        assert!(tree.children(root).is_empty());
        // A detached element can be inserted again
        tree.insert_child(root, None, a);
        assert_eq!(tree.parent(a), Some(root));
    }

    #[test]
    #[should_panic(expected = "already belongs to")]
    fn test_double_insertion_panics() {
        let mut tree = ElementTree::new();
        let first = panel(&mut tree);
        let second = panel(&mut tree);
        let a = leaf(&mut tree);

        tree.insert_child(first, None, a);
        tree.insert_child(second, None, a);
    }

    #[test]
    #[should_panic(expected = "would create a cycle")]
    fn test_cycle_panics() {
        let mut tree = ElementTree::new();
        let outer = panel(&mut tree);
        let inner = panel(&mut tree);

        tree.insert_child(outer, None, inner);
        tree.insert_child(inner, None, outer);
    }

    #[test]
    fn test_disposal_is_two_phase() {
        let mut tree = ElementTree::new();
        let root = panel(&mut tree);
        let a = leaf(&mut tree);
        tree.insert_child(root, None, a);

        let marked = tree.mark_for_disposal(root);
        assert_eq!(marked, vec![root, a]);
        // Still reachable until the collection pass
        assert!(tree.get(a).is_some());
        assert!(!tree.is_live(a));
        assert_eq!(tree.pending_disposals(), 2);

        let freed = tree.collect_disposed();
        assert_eq!(freed.len(), 2);
        assert!(tree.get(root).is_none());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_window_position_accumulates_offsets() {
        let mut tree = ElementTree::new();
        let root = panel(&mut tree);
        let a = leaf(&mut tree);
        tree.insert_child(root, None, a);

        tree.get_mut(root).unwrap().state.rect.x = 10.0;
        tree.get_mut(a).unwrap().state.rect.x = 5.0;
        tree.get_mut(a).unwrap().state.render_offset = Point::new(0.0, 3.0);
        tree.panel_mut(root).unwrap().scroll_offset = Point::new(2.0, 0.0);

        assert_eq!(tree.window_position(a), Point::new(13.0, 3.0));
    }
}
