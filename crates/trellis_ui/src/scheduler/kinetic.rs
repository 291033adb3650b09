//! Kinetic scrolling.
//!
//! A kinetic scroll is a self-rearming update task: each tick it moves the
//! panel's scroll offset by `velocity * dt`, decays the velocity
//! exponentially and arms itself again. Once the velocity drops below the
//! configured minimum (or the panel hits its scroll limits) it unregisters
//! itself through a temporary task.

use std::time::Instant;

use tracing::trace;

use super::{Scheduler, TaskToken};
use crate::element::ElementId;
use crate::geometry::Point;

impl Scheduler {
    /// Starts scrolling a panel with an initial velocity in pixels per
    /// second. A scroll already running on the panel is cancelled.
    pub fn start_kinetic_scroll(&mut self, panel: ElementId, velocity: Point) -> TaskToken {
        self.cancel_kinetic_scroll(panel);

        let decay = self.config.kinetic_decay;
        let min_velocity = self.config.kinetic_min_velocity;
        let mut velocity = velocity;
        let mut last: Option<Instant> = None;

        let token = self.register_update_task(move |scheduler, token| {
            let now = scheduler.now();
            let dt = last.map_or(0.0, |previous| now.saturating_duration_since(previous).as_secs_f32());
            last = Some(now);

            let moved = scheduler.scroll_panel_by(panel, velocity.scale(dt));
            velocity = velocity.scale((-decay * dt).exp());

            let stalled = dt > 0.0 && !moved;
            if stalled || velocity.length() < min_velocity || !scheduler.tree.is_live(panel) {
                trace!(panel = ?panel, "kinetic scroll finished");
                scheduler.finish_kinetic_scroll(panel, token);
            } else {
                scheduler.schedule_update_task(token);
            }
        });

        self.schedule_update_task(token);
        self.kinetic.insert(panel, token);
        trace!(panel = ?panel, vx = velocity.x, vy = velocity.y, "kinetic scroll started");
        token
    }

    /// Stops a running kinetic scroll. Returns false if none was running.
    pub fn cancel_kinetic_scroll(&mut self, panel: ElementId) -> bool {
        let Some(token) = self.kinetic.remove(&panel) else {
            return false;
        };
        if self.tasks.is_running(token) {
            self.post_temporary_task(move |scheduler| {
                scheduler.unregister_update_task(token);
            });
        } else {
            self.unregister_update_task(token);
        }
        true
    }

    /// Returns true while a kinetic scroll moves the panel.
    #[must_use]
    pub fn is_kinetic_scrolling(&self, panel: ElementId) -> bool {
        self.kinetic.contains_key(&panel)
    }

    fn finish_kinetic_scroll(&mut self, panel: ElementId, token: TaskToken) {
        if self.kinetic.get(&panel) == Some(&token) {
            self.kinetic.remove(&panel);
        }
        self.post_temporary_task(move |scheduler| {
            scheduler.unregister_update_task(token);
        });
    }

    /// Scrolls a panel by a delta, clamped to its content.
    ///
    /// Returns true if the offset changed.
    pub fn scroll_panel_by(&mut self, panel: ElementId, delta: Point) -> bool {
        let Some(current) = self.tree.panel(panel).map(|state| state.scroll_offset()) else {
            return false;
        };
        self.scroll_panel_to(panel, current + delta)
    }

    /// Sets a panel's scroll offset, clamped to its content.
    ///
    /// Returns true if the offset changed.
    pub fn scroll_panel_to(&mut self, panel: ElementId, offset: Point) -> bool {
        self.assert_owner();
        let Some(element) = self.tree.get_mut(panel) else {
            return false;
        };
        let size = element.state.size();
        let Some(state) = element.panel_mut() else {
            return false;
        };

        let max = state.max_scroll(size);
        let clamped = Point::new(offset.x.clamp(0.0, max.x), offset.y.clamp(0.0, max.y));
        if clamped == state.scroll_offset {
            return false;
        }
        state.scroll_offset = clamped;
        self.dirty.visual.insert(panel);
        true
    }
}
