//! The three dirty sets.
//!
//! Layout is tracked per panel (the panel whose children need arranging),
//! updates and visuals per element. The sets are ordered so processing is
//! deterministic.

use std::collections::BTreeSet;

use crate::element::{ElementId, ElementTree};

/// Elements awaiting recomputation.
#[derive(Debug, Default)]
pub(crate) struct DirtySets {
    /// Panels whose children need arranging.
    pub layout: BTreeSet<ElementId>,
    /// Elements awaiting a per-frame update.
    pub update: BTreeSet<ElementId>,
    /// Elements that need repainting.
    pub visual: BTreeSet<ElementId>,
}

impl DirtySets {
    /// Returns true if nothing is dirty.
    pub(crate) fn is_empty(&self) -> bool {
        self.layout.is_empty() && self.update.is_empty() && self.visual.is_empty()
    }

    /// Removes the dirty layout panel closest to its root.
    ///
    /// Panels that no longer exist are dropped on the way.
    pub(crate) fn pop_shallowest_layout(&mut self, tree: &ElementTree) -> Option<ElementId> {
        self.layout.retain(|&id| tree.is_live(id));
        let shallowest = self
            .layout
            .iter()
            .copied()
            .min_by_key(|&id| (tree.depth(id), id))?;
        self.layout.remove(&shallowest);
        Some(shallowest)
    }

    /// Drops an element from every set.
    pub(crate) fn forget(&mut self, id: ElementId) {
        self.layout.remove(&id);
        self.update.remove(&id);
        self.visual.remove(&id);
    }
}
