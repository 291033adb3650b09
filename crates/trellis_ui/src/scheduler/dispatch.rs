//! Window event and input routing.
//!
//! Pointer events go to the topmost visible, enabled element under the
//! pointer (or to the capturing element between press and release).
//! Keyboard events go to the focused element. Both bubble up through
//! the parents until an element handles them.

use tracing::{debug, trace};

use super::Scheduler;
use crate::element::{Element, ElementFlags, ElementId};
use crate::geometry::{Point, Rect, Size};
use crate::input::{InputEvent, Key};
use crate::platform::{CursorIcon, WindowEvent};

/// Window lifecycle notification delivered to window observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowNotification {
    /// Client area changed size.
    Resized(Size),
    /// Window gained keyboard focus.
    Activated,
    /// Window lost keyboard focus.
    Deactivated,
    /// The user asked to close the window; it is disposed right after.
    Closing,
    /// The window and its native surface are gone.
    Destroyed,
}

impl Scheduler {
    pub(crate) fn dispatch_window_event(&mut self, window: ElementId, event: WindowEvent) {
        match event {
            WindowEvent::Resized(size) => self.resize_window(window, size),
            WindowEvent::FocusChanged(active) => self.activate_window(window, active),
            WindowEvent::Input(input) => self.route_input(window, input),
            WindowEvent::CloseRequested => {
                debug!(window = ?window, "close requested");
                self.notify_window(window, &WindowNotification::Closing);
                self.dispose(window);
            }
            WindowEvent::Destroyed => {
                if let Some(state) = self.tree.get_mut(window).and_then(Element::window_mut) {
                    state.native_destroyed = true;
                }
                self.dispose(window);
            }
        }
    }

    fn resize_window(&mut self, window: ElementId, size: Size) {
        let Some(element) = self.tree.get_mut(window) else {
            return;
        };
        if element.state.size() == size {
            return;
        }
        element.state.rect = Rect::from_size(size);
        trace!(window = ?window, width = size.width, height = size.height, "window resized");

        self.dirty.layout.insert(window);
        self.dirty.visual.insert(window);
        self.notify_window(window, &WindowNotification::Resized(size));
    }

    fn activate_window(&mut self, window: ElementId, active: bool) {
        let Some(state) = self.tree.get_mut(window).and_then(Element::window_mut) else {
            return;
        };
        if state.active == active {
            return;
        }
        state.active = active;

        if active {
            let focus_inside = self.focus.is_some_and(|id| self.tree.window_of(id) == Some(window));
            if !focus_inside {
                self.focus_scope(window);
            }
            self.notify_window(window, &WindowNotification::Activated);
        } else {
            if self.focus.is_some_and(|id| self.tree.window_of(id) == Some(window)) {
                self.set_focused_element(None);
            }
            self.notify_window(window, &WindowNotification::Deactivated);
        }
    }

    fn route_input(&mut self, window: ElementId, event: InputEvent) {
        match event {
            InputEvent::MouseMove { position } => {
                let hit = self.update_hover(window, position);
                if let Some(target) = self.capture_of(window).or(hit) {
                    self.bubble(target, &event);
                }
            }
            InputEvent::MouseDown { position, button, .. } => {
                let now = self.clock.now();
                let Some(state) = self.tree.get_mut(window).and_then(Element::window_mut) else {
                    return;
                };
                let click_count = state.clicks.press(button, position, now);
                let event = InputEvent::MouseDown {
                    position,
                    button,
                    click_count,
                };

                let hit = self.update_hover(window, position);
                if let Some(hit) = hit {
                    if let Some(target) = self.focus_target(hit) {
                        self.set_focused_element(Some(target));
                    }
                }

                let Some(target) = self.capture_of(window).or(hit) else {
                    return;
                };
                self.set_capture(window, Some(target));
                self.bubble(target, &event);
            }
            InputEvent::MouseUp { position, .. } => {
                let captured = self.capture_of(window);
                self.set_capture(window, None);
                let hit = self.hit_test(window, position);
                if let Some(target) = captured.or(hit) {
                    self.bubble(target, &event);
                }
                self.update_hover(window, position);
            }
            InputEvent::Wheel { position, delta } => {
                let Some(hit) = self.hit_test(window, position) else {
                    return;
                };
                if !self.bubble(hit, &event) {
                    self.wheel_fallback(hit, delta);
                }
            }
            InputEvent::MouseLeave => {
                if self.capture_of(window).is_none() {
                    self.set_hovered(window, Vec::new());
                }
            }
            InputEvent::KeyDown { key, modifiers } => {
                let target = self.keyboard_target(window);
                if !self.bubble(target, &event) && key == Key::Tab {
                    self.move_focus(!modifiers.shift);
                }
            }
            InputEvent::KeyUp { .. } | InputEvent::Text(_) => {
                let target = self.keyboard_target(window);
                self.bubble(target, &event);
            }
        }
    }

    /// Topmost visible, enabled element of a window under a window point.
    #[must_use]
    pub fn hit_test(&self, window: ElementId, position: Point) -> Option<ElementId> {
        self.hit_test_element(window, position)
    }

    /// `point` is in the coordinate space of the element's parent content.
    fn hit_test_element(&self, id: ElementId, point: Point) -> Option<ElementId> {
        let element = self.tree.get(id)?;
        let state = &element.state;
        if !state.is_visible() || !state.is_enabled() {
            return None;
        }
        let local = point - state.rect.origin() - state.render_offset;

        if let Some(panel) = element.panel() {
            if panel.clip_children && !Rect::from_size(state.size()).contains(local) {
                return None;
            }
            let content = local + panel.scroll_offset();
            for child in panel.children().z_order() {
                if let Some(hit) = self.hit_test_element(child, content) {
                    return Some(hit);
                }
            }
        }

        element.visual.hit_test(state, local).then_some(id)
    }

    /// Offers an event to `target` and its ancestors until one handles it.
    ///
    /// Returns true if the event was handled.
    fn bubble(&mut self, target: ElementId, event: &InputEvent) -> bool {
        let mut current = Some(target);
        while let Some(id) = current {
            let local = event.relative_to(self.tree.window_position(id));
            let Some(element) = self.tree.get_mut(id) else {
                return false;
            };
            current = element.state.parent;
            if !element.state.is_enabled() {
                continue;
            }

            let Element { state, visual, .. } = element;
            let reaction = visual.on_input(state, &local);
            self.apply_invalidation(id, reaction.invalidation);
            if reaction.handled {
                trace!(element = ?id, ?event, "input handled");
                return true;
            }
        }
        false
    }

    fn keyboard_target(&self, window: ElementId) -> ElementId {
        self.focus
            .filter(|&id| self.tree.window_of(id) == Some(window))
            .unwrap_or(window)
    }

    /// Nearest focusable element at or above `hit`.
    fn focus_target(&self, hit: ElementId) -> Option<ElementId> {
        std::iter::once(hit)
            .chain(self.tree.ancestors(hit))
            .find(|&id| self.can_take_focus(id))
    }

    fn capture_of(&self, window: ElementId) -> Option<ElementId> {
        self.tree.get(window)?.window()?.capture()
    }

    fn set_capture(&mut self, window: ElementId, target: Option<ElementId>) {
        let Some(state) = self.tree.get_mut(window).and_then(Element::window_mut) else {
            return;
        };
        let was_captured = state.capture.is_some();
        state.capture = target;
        if was_captured != target.is_some() {
            let on = target.is_some();
            self.best_effort(window, "set_capture", |native| native.set_capture(on));
        }
    }

    /// Recomputes the hovered chain. Returns the deepest hovered element.
    fn update_hover(&mut self, window: ElementId, position: Point) -> Option<ElementId> {
        let hit = self.hit_test(window, position);
        let chain = match hit {
            Some(hit) => {
                let mut chain: Vec<ElementId> = self.tree.ancestors(hit).collect();
                chain.reverse();
                chain.push(hit);
                chain
            }
            None => Vec::new(),
        };
        self.set_hovered(window, chain);
        hit
    }

    fn set_hovered(&mut self, window: ElementId, chain: Vec<ElementId>) {
        let Some(state) = self.tree.get_mut(window).and_then(Element::window_mut) else {
            return;
        };
        if state.hovered == chain {
            return;
        }
        let old = std::mem::replace(&mut state.hovered, chain.clone());

        for &id in old.iter().filter(|id| !chain.contains(id)) {
            self.set_mouse_over(id, false);
        }
        for &id in chain.iter().filter(|id| !old.contains(id)) {
            self.set_mouse_over(id, true);
        }

        if old.last() != chain.last() {
            let cursor = chain
                .last()
                .and_then(|&id| self.tree.get(id))
                .map_or(CursorIcon::default(), |element| element.state.cursor);
            self.best_effort(window, "set_cursor", |native| native.set_cursor(cursor));
        }
    }

    fn set_mouse_over(&mut self, id: ElementId, on: bool) {
        let changed = self
            .tree
            .get_mut(id)
            .is_some_and(|element| element.state.flags.assign(ElementFlags::MOUSE_OVER, on));
        if changed {
            self.dirty.visual.insert(id);
        }
    }

    /// Drops hover and capture inside a subtree about to leave its window.
    pub(crate) fn release_pointer_in_subtree(&mut self, root: ElementId) {
        let Some(window) = self.tree.window_of(root) else {
            return;
        };
        let Some(state) = self.tree.get(window).and_then(Element::window) else {
            return;
        };
        let dropped: Vec<ElementId> = state
            .hovered()
            .iter()
            .copied()
            .filter(|&id| self.tree.is_in_subtree(root, id))
            .collect();
        let capture_lost = state.capture().is_some_and(|id| self.tree.is_in_subtree(root, id));

        for &id in &dropped {
            if let Some(element) = self.tree.get_mut(id) {
                element.state.flags.clear(ElementFlags::MOUSE_OVER);
            }
        }
        if let Some(state) = self.tree.get_mut(window).and_then(Element::window_mut) {
            state.hovered.retain(|id| !dropped.contains(id));
        }
        if capture_lost {
            self.set_capture(window, None);
        }
    }

    /// Unhandled wheel: kinetic scroll of the nearest scrollable panel.
    fn wheel_fallback(&mut self, hit: ElementId, delta: Point) {
        let scrollable = std::iter::once(hit)
            .chain(self.tree.ancestors(hit))
            .find(|&id| self.tree.panel(id).is_some_and(|panel| panel.scrollable));
        if let Some(panel) = scrollable {
            let velocity = delta.scale(self.config.wheel_velocity_scale);
            self.start_kinetic_scroll(panel, velocity);
        }
    }
}
