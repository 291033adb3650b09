//! Focus management.
//!
//! Global focus is one optional element. Every focus scope (windows are
//! always scopes) additionally remembers the last focused element inside
//! it, so refocusing the scope returns there.

use tracing::trace;

use super::Scheduler;
use crate::element::{Element, ElementFlags, ElementId, Invalidation};

/// Where keyboard input goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    /// Nothing has focus.
    None,
    /// A window itself has focus.
    Window(ElementId),
    /// An element inside a window has focus.
    Element(ElementId),
}

impl Scheduler {
    /// Element holding global focus.
    #[must_use]
    pub fn focused_element(&self) -> Option<ElementId> {
        self.focus
    }

    /// Current focus state.
    #[must_use]
    pub fn focus_state(&self) -> FocusState {
        match self.focus {
            None => FocusState::None,
            Some(id) if self.tree.get(id).is_some_and(Element::is_window) => FocusState::Window(id),
            Some(id) => FocusState::Element(id),
        }
    }

    /// Moves global focus.
    ///
    /// Every focus-scope ancestor of the new focus remembers it.
    ///
    /// # Panics
    ///
    /// Panics if `target` is not a live element inside a window.
    pub fn set_focused_element(&mut self, target: Option<ElementId>) {
        self.assert_owner();
        if let Some(id) = target {
            assert!(
                self.tree.is_live(id) && self.tree.window_of(id).is_some(),
                "cannot focus {id:?}: not attached to a window"
            );
            self.remember_in_scopes(id);
        }

        if self.focus == target {
            return;
        }
        trace!(from = ?self.focus, to = ?target, "focus changed");

        if let Some(old) = self.focus.take() {
            self.notify_focus(old, false);
        }
        self.focus = target;
        if let Some(new) = target {
            self.notify_focus(new, true);
        }
    }

    /// Focuses a scope's remembered element, or the scope itself.
    ///
    /// Returns the newly focused element, or `None` if `scope` is not a
    /// panel inside a window.
    pub fn focus_scope(&mut self, scope: ElementId) -> Option<ElementId> {
        if !self.tree.is_live(scope) || self.tree.window_of(scope).is_none() {
            return None;
        }
        let remembered = self.tree.panel(scope)?.scope_focus();
        let target = remembered
            .filter(|&id| self.tree.is_live(id) && self.tree.is_ancestor_of(scope, id))
            .unwrap_or(scope);

        self.set_focused_element(Some(target));
        Some(target)
    }

    /// Moves focus to the next (or previous) focusable element of the
    /// current focus scope, wrapping around.
    ///
    /// Returns the new focus, or `None` if nothing is focusable.
    pub fn move_focus(&mut self, forward: bool) -> Option<ElementId> {
        let current = self.focus?;
        let scope = self.enclosing_scope(current)?;

        let candidates: Vec<ElementId> = self
            .tree
            .descendants(scope)
            .filter(|&id| id != scope && self.can_take_focus(id))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let count = candidates.len();
        let next = match candidates.iter().position(|&id| id == current) {
            Some(index) if forward => (index + 1) % count,
            Some(index) => (index + count - 1) % count,
            None if forward => 0,
            None => count - 1,
        };

        let target = candidates[next];
        self.set_focused_element(Some(target));
        Some(target)
    }

    /// The scope owning focus moves of an element: the element itself when
    /// it is a scope, otherwise its nearest scope ancestor.
    fn enclosing_scope(&self, id: ElementId) -> Option<ElementId> {
        std::iter::once(id)
            .chain(self.tree.ancestors(id))
            .find(|&candidate| self.tree.panel(candidate).is_some_and(|panel| panel.is_focus_scope()))
    }

    /// Focusable, and visible and enabled up to the root.
    pub(crate) fn can_take_focus(&self, id: ElementId) -> bool {
        let Some(element) = self.tree.get(id) else {
            return false;
        };
        element.state.is_focusable()
            && std::iter::once(id).chain(self.tree.ancestors(id)).all(|ancestor| {
                self.tree
                    .get(ancestor)
                    .is_some_and(|element| element.state.is_visible() && element.state.is_enabled())
            })
    }

    fn remember_in_scopes(&mut self, id: ElementId) {
        let scopes: Vec<ElementId> = self.tree.ancestors(id).collect();
        for scope in scopes {
            if let Some(panel) = self.tree.panel_mut(scope) {
                if panel.focus_scope {
                    panel.scope_focus = Some(id);
                }
            }
        }
    }

    fn notify_focus(&mut self, id: ElementId, focused: bool) {
        let Some(element) = self.tree.get_mut(id) else {
            return;
        };
        element.state.flags.assign(ElementFlags::FOCUSED, focused);
        let Element { state, visual, .. } = element;
        let invalidation = visual.on_focus_changed(state, focused);
        self.apply_invalidation(id, invalidation.merge(Invalidation::VISUAL));
    }

    /// Drops every focus reference into a subtree about to leave its tree.
    ///
    /// Scope memories of the subtree's ancestors are cleared; global focus
    /// is cleared if it points inside.
    pub(crate) fn clear_focus_in_subtree(&mut self, root: ElementId) {
        let scopes: Vec<ElementId> = self.tree.ancestors(root).collect();
        for scope in scopes {
            let remembered = self.tree.panel(scope).and_then(|panel| panel.scope_focus());
            if remembered.is_some_and(|id| self.tree.is_in_subtree(root, id)) {
                if let Some(panel) = self.tree.panel_mut(scope) {
                    panel.scope_focus = None;
                }
            }
        }

        if self.focus.is_some_and(|id| self.tree.is_in_subtree(root, id)) {
            self.set_focused_element(None);
        }
    }
}
