//! Ordered child container of a panel.
//!
//! Children are kept in two orderings of the same set:
//!
//! - **logical** order (insertion order, used by layout and focus cycling)
//! - **Z order**, descending z-index (topmost first, used by hit testing and
//!   painted back to front)
//!
//! Reordering one never touches the other.

use super::ElementId;

/// Whether an event is raised before or after the mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionPhase {
    /// Raised before the collection changes.
    Changing,
    /// Raised after the collection changed.
    Changed,
}

/// A structural change to a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionChange {
    /// A child was added before `before` (or at the end).
    Inserted {
        /// The new child.
        child: ElementId,
        /// Logical successor, if any.
        before: Option<ElementId>,
    },
    /// A child was detached.
    Removed {
        /// The detached child.
        child: ElementId,
    },
    /// A child's z-index changed.
    ZOrderChanged {
        /// The child.
        child: ElementId,
        /// Its new z-index.
        z_index: i32,
    },
    /// A child moved in logical order.
    Moved {
        /// The child.
        child: ElementId,
        /// New logical successor, if any.
        before: Option<ElementId>,
    },
}

impl CollectionChange {
    /// The child the change is about.
    #[must_use]
    pub const fn child(&self) -> ElementId {
        match *self {
            Self::Inserted { child, .. }
            | Self::Removed { child }
            | Self::ZOrderChanged { child, .. }
            | Self::Moved { child, .. } => child,
        }
    }
}

/// Notification delivered to collection observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionEvent {
    /// The panel owning the collection.
    pub panel: ElementId,
    /// Before or after the mutation.
    pub phase: CollectionPhase,
    /// What changes.
    pub change: CollectionChange,
}

/// Children of one panel.
#[derive(Debug, Clone, Default)]
pub struct ElementCollection {
    /// Insertion order.
    logical: Vec<ElementId>,
    /// Descending z-index, topmost first.
    z_order: Vec<(i32, ElementId)>,
}

impl ElementCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.logical.len()
    }

    /// Returns true if there are no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.logical.is_empty()
    }

    /// Returns true if `child` belongs to this collection.
    #[must_use]
    pub fn contains(&self, child: ElementId) -> bool {
        self.logical.contains(&child)
    }

    /// Children in logical order.
    #[must_use]
    pub fn logical(&self) -> &[ElementId] {
        &self.logical
    }

    /// Children topmost first.
    pub fn z_order(&self) -> impl DoubleEndedIterator<Item = ElementId> + '_ {
        self.z_order.iter().map(|&(_, id)| id)
    }

    /// Logical position of a child.
    #[must_use]
    pub fn position(&self, child: ElementId) -> Option<usize> {
        self.logical.iter().position(|&id| id == child)
    }

    /// Inserts `child` before `before` in logical order and on top of its
    /// z-index equals in Z order.
    ///
    /// # Panics
    ///
    /// Panics if `child` is already present or `before` is not.
    pub(crate) fn insert(&mut self, child: ElementId, before: Option<ElementId>, z_index: i32) {
        assert!(!self.contains(child), "{child:?} is already in this collection");

        let index = match before {
            Some(reference) => self
                .position(reference)
                .unwrap_or_else(|| panic!("{reference:?} is not in this collection")),
            None => self.logical.len(),
        };
        self.logical.insert(index, child);
        self.insert_z(child, z_index);
    }

    /// Removes a child from both orderings. Returns false if absent.
    pub(crate) fn remove(&mut self, child: ElementId) -> bool {
        let Some(index) = self.position(child) else {
            return false;
        };
        self.logical.remove(index);
        self.z_order.retain(|&(_, id)| id != child);
        true
    }

    /// Re-sorts `child` in Z order only.
    pub(crate) fn set_zindex(&mut self, child: ElementId, z_index: i32) {
        debug_assert!(self.contains(child));
        self.z_order.retain(|&(_, id)| id != child);
        self.insert_z(child, z_index);
    }

    /// Moves `child` before `before` in logical order only.
    ///
    /// # Panics
    ///
    /// Panics if `child` or `before` is not in the collection.
    pub(crate) fn move_before(&mut self, child: ElementId, before: Option<ElementId>) {
        let from = self
            .position(child)
            .unwrap_or_else(|| panic!("{child:?} is not in this collection"));
        self.logical.remove(from);

        let to = match before {
            Some(reference) => self
                .position(reference)
                .unwrap_or_else(|| panic!("{reference:?} is not in this collection")),
            None => self.logical.len(),
        };
        self.logical.insert(to, child);
    }

    fn insert_z(&mut self, child: ElementId, z_index: i32) {
        // Above every sibling with the same or a lower z-index.
        let index = self
            .z_order
            .iter()
            .position(|&(z, _)| z <= z_index)
            .unwrap_or(self.z_order.len());
        self.z_order.insert(index, (z_index, child));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::Handle;

    fn id(index: u32) -> ElementId {
        ElementId::from_handle(Handle::new(index, 0))
    }

    fn z(collection: &ElementCollection) -> Vec<ElementId> {
        collection.z_order().collect()
    }

    #[test]
    fn test_orderings_are_independent() {
        let mut children = ElementCollection::new();
        children.insert(id(1), None, 0);
        children.insert(id(2), None, 5);
        children.insert(id(3), Some(id(1)), 0);

        assert_eq!(children.logical(), &[id(3), id(1), id(2)]);
        // Highest first; newest on top among equals
        assert_eq!(z(&children), vec![id(2), id(3), id(1)]);

        children.move_before(id(2), Some(id(3)));
        assert_eq!(children.logical(), &[id(2), id(3), id(1)]);
        assert_eq!(z(&children), vec![id(2), id(3), id(1)]);

        children.set_zindex(id(1), 10);
        assert_eq!(children.logical(), &[id(2), id(3), id(1)]);
        assert_eq!(z(&children), vec![id(1), id(2), id(3)]);
    }

    #[test]
    fn test_remove_clears_both_orderings() {
        let mut children = ElementCollection::new();
        children.insert(id(1), None, 0);
        children.insert(id(2), None, 0);

        assert!(children.remove(id(1)));
        assert!(!children.remove(id(1)));
        assert_eq!(children.logical(), &[id(2)]);
        assert_eq!(z(&children), vec![id(2)]);
    }

    #[test]
    #[should_panic(expected = "already in this collection")]
    fn test_double_insert_panics() {
        let mut children = ElementCollection::new();
        children.insert(id(1), None, 0);
        children.insert(id(1), None, 0);
    }
}
