//! Persistent update tasks.
//!
//! A task stays registered until unregistered and runs on the next tick
//! only when armed. Arming twice before a tick runs it once.

use trellis_core::{Arena, Handle};

use super::Scheduler;

/// Stable reference to a registered update task.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskToken(Handle);

impl std::fmt::Debug for TaskToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task({}v{})", self.0.index(), self.0.generation())
    }
}

/// Callback of a persistent task.
pub(crate) type TaskFn = Box<dyn FnMut(&mut Scheduler, TaskToken)>;

/// Callback of a fire-once task.
pub(crate) type TemporaryTask = Box<dyn FnOnce(&mut Scheduler)>;

struct TaskSlot {
    /// `None` while the task is executing.
    callback: Option<TaskFn>,
    /// Armed for the next tick.
    scheduled: bool,
}

/// Registered tasks plus the queue of armed ones, in arming order.
#[derive(Default)]
pub(crate) struct TaskRegistry {
    slots: Arena<TaskSlot>,
    queue: Vec<TaskToken>,
}

impl TaskRegistry {
    pub(crate) fn register(&mut self, callback: TaskFn) -> TaskToken {
        TaskToken(self.slots.insert(TaskSlot {
            callback: Some(callback),
            scheduled: false,
        }))
    }

    /// Arms a task. Returns false if the token is stale.
    pub(crate) fn schedule(&mut self, token: TaskToken) -> bool {
        let Some(slot) = self.slots.get_mut(token.0) else {
            return false;
        };
        if !slot.scheduled {
            slot.scheduled = true;
            self.queue.push(token);
        }
        true
    }

    /// Removes a task. Returns false if the token is stale.
    ///
    /// # Panics
    ///
    /// Panics if the task is currently executing.
    pub(crate) fn unregister(&mut self, token: TaskToken) -> bool {
        assert!(
            !self.is_running(token),
            "{token:?} cannot be unregistered while it runs; unregister it from a temporary task"
        );
        if self.slots.remove(token.0).is_none() {
            return false;
        }
        self.queue.retain(|&queued| queued != token);
        true
    }

    pub(crate) fn is_registered(&self, token: TaskToken) -> bool {
        self.slots.contains(token.0)
    }

    pub(crate) fn is_scheduled(&self, token: TaskToken) -> bool {
        self.slots.get(token.0).is_some_and(|slot| slot.scheduled)
    }

    pub(crate) fn is_running(&self, token: TaskToken) -> bool {
        self.slots.get(token.0).is_some_and(|slot| slot.callback.is_none())
    }

    /// Number of armed tasks.
    pub(crate) fn scheduled_count(&self) -> usize {
        self.queue.len()
    }

    /// Number of registered tasks.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Disarms every queued task and returns them in arming order.
    pub(crate) fn take_scheduled(&mut self) -> Vec<TaskToken> {
        let due = std::mem::take(&mut self.queue);
        for token in &due {
            if let Some(slot) = self.slots.get_mut(token.0) {
                slot.scheduled = false;
            }
        }
        due
    }

    /// Takes a callback out for execution.
    pub(crate) fn begin(&mut self, token: TaskToken) -> Option<TaskFn> {
        self.slots.get_mut(token.0)?.callback.take()
    }

    /// Returns a callback after execution.
    pub(crate) fn end(&mut self, token: TaskToken, callback: TaskFn) {
        if let Some(slot) = self.slots.get_mut(token.0) {
            slot.callback = Some(callback);
        }
    }
}
