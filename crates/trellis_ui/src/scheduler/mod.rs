//! # Scheduler
//!
//! Owns the element tree and decides what runs when:
//! ```text
//! update():
//! ┌──────────────────────────────────────────────────────────────┐
//! │ 1. remote jobs      -> temporary tasks                       │
//! │ 2. update tasks     (armed ones, arming order)               │
//! │ 3. temporary tasks  (queued before this tick)                │
//! │ 4. animations       (advance by wall-clock delta)            │
//! │ 5. disposal         (free marked elements, destroy windows)  │
//! │ 6. element updates                                           │
//! │ 7. layout           (dirty panels, shallowest first)         │
//! │ 8. visuals          (one repaint per dirty window)           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The main loop is *active* while [`Scheduler::needs_update`] holds: it
//! runs one update and then drains queued platform messages without
//! blocking. Otherwise it is *idle* and blocks on the platform until a
//! message, a wake-up or the animation timer arrives.
//!
//! One scheduler may be alive per thread. Every mutating call must come
//! from that thread; other threads use [`RemoteHandle`] or a [`Waker`].

mod dispatch;
mod focus;
mod invalidation;
mod kinetic;
mod paint;
mod tasks;

pub use dispatch::WindowNotification;
pub use focus::FocusState;
pub use tasks::TaskToken;

use std::cell::Cell;
use std::collections::HashMap;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, trace, warn};

use crate::animation::{Animatable, Animation, AnimationId, AnimationRegistry, AnimationTarget};
use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::element::{
    apply_core_property, Blank, CollectionChange, CollectionEvent, CollectionPhase, Element,
    ElementFlags, ElementId, ElementKind, ElementRegistry, ElementTree, Invalidation, PanelState,
    PropertyValue, Visual, WindowState,
};
use crate::error::{UiError, UiResult};
use crate::geometry::Rect;
use crate::input::ClickTracker;
use crate::layout::{self, PanelLayout};
use crate::platform::{MessageSource, NativeHandle, PlatformError, PlatformMessage, WindowImpl, Waker};
use crate::render::Renderer;

use invalidation::DirtySets;
use tasks::{TaskRegistry, TemporaryTask};

thread_local! {
    static ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Job posted from another thread.
type RemoteJob = Box<dyn FnOnce(&mut Scheduler) + Send>;

type WindowObserver = Box<dyn FnMut(&mut Scheduler, ElementId, &WindowNotification)>;

type CollectionObserver = Box<dyn FnMut(&mut Scheduler, &CollectionEvent)>;

/// Counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Completed `update` calls.
    pub ticks: u64,
    /// Panels arranged.
    pub layout_passes: u64,
    /// Windows painted.
    pub repaints: u64,
    /// Platform messages dispatched.
    pub messages: u64,
}

/// Posts work to a scheduler from any thread.
#[derive(Clone)]
pub struct RemoteHandle {
    jobs: Sender<RemoteJob>,
    waker: Waker,
}

impl RemoteHandle {
    /// Queues a job for the scheduler thread and wakes the loop.
    ///
    /// The job runs as a temporary task on the next tick. Returns false if
    /// the scheduler is gone.
    pub fn post(&self, job: impl FnOnce(&mut Scheduler) + Send + 'static) -> bool {
        if self.jobs.send(Box::new(job)).is_err() {
            return false;
        }
        self.waker.wake_up();
        true
    }

    /// Interrupts a blocking wait without queuing anything.
    pub fn wake_up(&self) {
        self.waker.wake_up();
    }
}

impl std::fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("queued", &self.jobs.len())
            .finish()
    }
}

/// The per-thread UI scheduler.
pub struct Scheduler {
    /// All elements.
    pub(crate) tree: ElementTree,
    /// Element templates by type name.
    registry: ElementRegistry,
    /// Pending recomputation.
    pub(crate) dirty: DirtySets,
    /// Persistent update tasks.
    tasks: TaskRegistry,
    /// Fire-once tasks for the next tick.
    temporary: Vec<TemporaryTask>,
    /// Playing animations.
    animations: AnimationRegistry,
    /// Global focus.
    pub(crate) focus: Option<ElementId>,
    /// Live windows in creation order.
    windows: Vec<ElementId>,
    /// Native handle to window element.
    native_windows: HashMap<NativeHandle, ElementId>,
    /// Platform event source.
    source: Box<dyn MessageSource>,
    /// Time source.
    clock: Box<dyn Clock>,
    /// Tunables.
    pub(crate) config: SchedulerConfig,
    /// Thread the scheduler belongs to.
    owner: ThreadId,
    window_observers: Vec<WindowObserver>,
    collection_observers: Vec<CollectionObserver>,
    remote_tx: Sender<RemoteJob>,
    remote_rx: Receiver<RemoteJob>,
    /// Running kinetic scroll per panel.
    pub(crate) kinetic: HashMap<ElementId, TaskToken>,
    stats: SchedulerStats,
    /// Leave the main loop.
    quit: bool,
    /// Start of the previous update.
    last_tick: Instant,
}

impl Scheduler {
    /// Creates the scheduler of the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::SchedulerAlreadyActive`] if another scheduler is
    /// alive on this thread.
    pub fn new(
        source: impl MessageSource + 'static,
        clock: impl Clock + 'static,
        config: SchedulerConfig,
    ) -> UiResult<Self> {
        if ACTIVE.with(|active| active.replace(true)) {
            return Err(UiError::SchedulerAlreadyActive);
        }

        let (remote_tx, remote_rx) = crossbeam_channel::unbounded();
        let last_tick = clock.now();
        debug!(?config, "scheduler created");

        Ok(Self {
            tree: ElementTree::new(),
            registry: ElementRegistry::new(),
            dirty: DirtySets::default(),
            tasks: TaskRegistry::default(),
            temporary: Vec::with_capacity(16),
            animations: AnimationRegistry::default(),
            focus: None,
            windows: Vec::new(),
            native_windows: HashMap::new(),
            source: Box::new(source),
            clock: Box::new(clock),
            config,
            owner: thread::current().id(),
            window_observers: Vec::new(),
            collection_observers: Vec::new(),
            remote_tx,
            remote_rx,
            kinetic: HashMap::new(),
            stats: SchedulerStats::default(),
            quit: false,
            last_tick,
        })
    }

    /// Panics when called from a thread other than the owner.
    #[inline]
    fn assert_owner(&self) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "scheduler used outside its owning thread"
        );
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The element tree.
    #[must_use]
    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    /// Gets a live element.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.tree.get(id).filter(|_| self.tree.is_live(id))
    }

    /// Element templates.
    #[must_use]
    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Element templates, for registering application types.
    pub fn registry_mut(&mut self) -> &mut ElementRegistry {
        &mut self.registry
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Counters since construction.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Current time of the scheduler's clock.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Live windows in creation order.
    #[must_use]
    pub fn windows(&self) -> &[ElementId] {
        &self.windows
    }

    /// Window bound to a native handle.
    #[must_use]
    pub fn window_for(&self, handle: NativeHandle) -> Option<ElementId> {
        self.native_windows.get(&handle).copied()
    }

    // =========================================================================
    // Element creation
    // =========================================================================

    /// Creates a detached element from a registered template.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::UnknownElementType`] if no template has this name.
    pub fn create_element(&mut self, type_name: &str) -> UiResult<ElementId> {
        self.assert_owner();
        let (name, template) = self
            .registry
            .get(type_name)
            .ok_or_else(|| UiError::UnknownElementType(type_name.to_owned()))?;

        let kind = match template.panel_layout() {
            Some(layout) => ElementKind::Panel(PanelState::new(layout)),
            None => ElementKind::Leaf,
        };
        let id = self.tree.insert(name, template.build(), kind);
        trace!(element = ?id, type_name = name, "element created");
        Ok(id)
    }

    /// Creates a detached leaf around a visual.
    pub fn create_leaf<V: Visual + 'static>(&mut self, visual: V) -> ElementId {
        self.assert_owner();
        self.tree
            .insert(std::any::type_name::<V>(), Box::new(visual), ElementKind::Leaf)
    }

    /// Creates a detached, empty panel.
    pub fn create_panel(&mut self, layout: PanelLayout) -> ElementId {
        self.assert_owner();
        self.tree.insert(
            "Panel",
            Box::new(Blank),
            ElementKind::Panel(PanelState::new(layout)),
        )
    }

    /// Creates a window bound to a native surface.
    ///
    /// The window is a focus scope arranging its children as an overlay.
    pub fn create_window(
        &mut self,
        native: impl WindowImpl + 'static,
        renderer: impl Renderer + 'static,
    ) -> ElementId {
        self.assert_owner();
        let size = native.client_size();
        let mut panel = PanelState::new(PanelLayout::default());
        panel.focus_scope = true;
        let clicks = ClickTracker::new(self.config.double_click_time(), self.config.double_click_distance);
        let window = WindowState::new(panel, Box::new(native), Box::new(renderer), clicks);
        let handle = window.handle;

        let id = self
            .tree
            .insert("Window", Box::new(Blank), ElementKind::Window(Box::new(window)));
        if let Some(element) = self.tree.get_mut(id) {
            element.state.rect = Rect::from_size(size);
            element.state.flags.set(ElementFlags::FOCUSABLE);
        }

        self.native_windows.insert(handle, id);
        self.windows.push(id);
        self.dirty.layout.insert(id);
        self.dirty.visual.insert(id);
        debug!(window = ?id, handle = handle.0, width = size.width, height = size.height, "window created");
        id
    }

    /// Shows a window.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::Platform`] if the native call fails (release
    /// builds only; debug builds panic).
    pub fn show_window(&mut self, window: ElementId) -> UiResult<()> {
        self.platform_call(window, "show", |native| native.show())
    }

    /// Hides a window.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::show_window`].
    pub fn hide_window(&mut self, window: ElementId) -> UiResult<()> {
        self.platform_call(window, "hide", |native| native.hide())
    }

    /// Sets a window title.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::show_window`].
    pub fn set_window_title(&mut self, window: ElementId, title: &str) -> UiResult<()> {
        self.platform_call(window, "set_title", |native| native.set_title(title))
    }

    /// Runs a native window call that must succeed.
    fn platform_call(
        &mut self,
        window: ElementId,
        operation: &'static str,
        call: impl FnOnce(&mut dyn WindowImpl) -> Result<(), PlatformError>,
    ) -> UiResult<()> {
        let state = self
            .tree
            .get_mut(window)
            .and_then(Element::window_mut)
            .ok_or(UiError::StaleElement(window))?;

        match call(state.native.as_mut()) {
            Ok(()) => Ok(()),
            Err(source) => {
                error!(window = ?window, operation, %source, "platform call failed");
                if cfg!(debug_assertions) {
                    panic!("platform call `{operation}` failed on {window:?}: {source}");
                }
                Err(UiError::Platform { operation, source })
            }
        }
    }

    /// Runs a native window call whose failure is tolerated.
    pub(crate) fn best_effort(
        &mut self,
        window: ElementId,
        operation: &'static str,
        call: impl FnOnce(&mut dyn WindowImpl) -> Result<(), PlatformError>,
    ) {
        let Some(state) = self.tree.get_mut(window).and_then(Element::window_mut) else {
            return;
        };
        if let Err(source) = call(state.native.as_mut()) {
            warn!(window = ?window, operation, %source, "best-effort platform call failed");
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Appends a detached element to a panel.
    ///
    /// # Panics
    ///
    /// Panics if `child` already has a parent, is a window, or would create
    /// a cycle.
    pub fn add_child(&mut self, panel: ElementId, child: ElementId) {
        self.insert_child_before(panel, None, child);
    }

    /// Inserts a detached element before `before` in logical order.
    ///
    /// Z order follows the child's z-index regardless of position.
    ///
    /// # Panics
    ///
    /// See [`Scheduler::add_child`]; also panics if `before` is not a child
    /// of `panel`.
    pub fn insert_child_before(&mut self, panel: ElementId, before: Option<ElementId>, child: ElementId) {
        self.assert_owner();
        let change = CollectionChange::Inserted { child, before };

        self.notify_collection(panel, CollectionPhase::Changing, change);
        self.tree.insert_child(panel, before, child);
        self.notify_collection(panel, CollectionPhase::Changed, change);

        self.tree.invalidate_measure(panel);
        self.dirty.layout.insert(panel);
        if self.tree.get(child).is_some_and(Element::is_panel) {
            self.dirty.layout.insert(child);
        }
        self.dirty.visual.insert(panel);
    }

    /// Detaches a child from its panel.
    ///
    /// Focus, hover and capture inside the removed subtree are cleared
    /// before the collection changes.
    ///
    /// # Panics
    ///
    /// Panics if `child` is not a child of `panel`.
    pub fn remove_child(&mut self, panel: ElementId, child: ElementId) {
        self.assert_owner();
        let change = CollectionChange::Removed { child };

        self.notify_collection(panel, CollectionPhase::Changing, change);
        self.clear_focus_in_subtree(child);
        self.release_pointer_in_subtree(child);
        self.tree.remove_child(panel, child);
        self.notify_collection(panel, CollectionPhase::Changed, change);

        self.tree.invalidate_measure(panel);
        self.dirty.layout.insert(panel);
        self.dirty.visual.insert(panel);
    }

    /// Changes paint and hit-test order among siblings.
    pub fn set_zindex(&mut self, child: ElementId, z_index: i32) {
        self.assert_owner();
        let Some(parent) = self.tree.parent(child) else {
            self.tree.set_zindex(child, z_index);
            return;
        };
        let change = CollectionChange::ZOrderChanged { child, z_index };

        self.notify_collection(parent, CollectionPhase::Changing, change);
        self.tree.set_zindex(child, z_index);
        self.notify_collection(parent, CollectionPhase::Changed, change);
        self.dirty.visual.insert(parent);
    }

    /// Moves a child before a sibling (or last) in logical order.
    ///
    /// # Panics
    ///
    /// Panics if `child` has no parent or `before` is not a sibling.
    pub fn move_child_before(&mut self, child: ElementId, before: Option<ElementId>) {
        self.assert_owner();
        let parent = self
            .tree
            .parent(child)
            .unwrap_or_else(|| panic!("{child:?} has no parent"));
        let change = CollectionChange::Moved { child, before };

        self.notify_collection(parent, CollectionPhase::Changing, change);
        self.tree.move_child_before(child, before);
        self.notify_collection(parent, CollectionPhase::Changed, change);
        self.dirty.layout.insert(parent);
    }

    /// Detaches an element and queues it and its subtree for disposal.
    ///
    /// Elements stay readable until the disposal step of the next update.
    pub fn dispose(&mut self, id: ElementId) {
        self.assert_owner();
        if !self.tree.is_live(id) {
            return;
        }

        match self.tree.parent(id) {
            Some(parent) => self.remove_child(parent, id),
            None => {
                self.clear_focus_in_subtree(id);
                self.release_pointer_in_subtree(id);
            }
        }

        let marked = self.tree.mark_for_disposal(id);
        for &element in &marked {
            self.dirty.forget(element);
            self.animations.remove_element(element);
        }
        debug!(element = ?id, count = marked.len(), "queued for disposal");
    }

    fn notify_collection(&mut self, panel: ElementId, phase: CollectionPhase, change: CollectionChange) {
        if self.collection_observers.is_empty() {
            return;
        }
        let event = CollectionEvent { panel, phase, change };
        let mut observers = std::mem::take(&mut self.collection_observers);
        for observer in &mut observers {
            observer(self, &event);
        }
        observers.append(&mut self.collection_observers);
        self.collection_observers = observers;
    }

    /// Registers a listener for child collection changes.
    ///
    /// Each change is reported twice: `Changing` before the mutation and
    /// `Changed` after. Changes made by the listener itself are not
    /// reported to listeners.
    pub fn observe_collection(&mut self, observer: impl FnMut(&mut Scheduler, &CollectionEvent) + 'static) {
        self.collection_observers.push(Box::new(observer));
    }

    /// Registers a listener for window lifecycle notifications.
    pub fn observe_window(
        &mut self,
        observer: impl FnMut(&mut Scheduler, ElementId, &WindowNotification) + 'static,
    ) {
        self.window_observers.push(Box::new(observer));
    }

    pub(crate) fn notify_window(&mut self, window: ElementId, notification: &WindowNotification) {
        if self.window_observers.is_empty() {
            return;
        }
        let mut observers = std::mem::take(&mut self.window_observers);
        for observer in &mut observers {
            observer(self, window, notification);
        }
        observers.append(&mut self.window_observers);
        self.window_observers = observers;
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Sets a property by name.
    ///
    /// Core properties are handled first, then the element's visual gets a
    /// chance.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::StaleElement`] for a disposed element,
    /// [`UiError::InvalidPropertyValue`] for a value of the wrong kind and
    /// [`UiError::UnknownProperty`] if nobody knows the name.
    pub fn set_property(&mut self, id: ElementId, name: &str, value: impl Into<PropertyValue>) -> UiResult<()> {
        self.assert_owner();
        let value = value.into();
        if !self.tree.is_live(id) {
            return Err(UiError::StaleElement(id));
        }

        if name == "z_index" {
            #[allow(clippy::cast_possible_truncation)]
            let z_index = value.as_number(name)?.round() as i32;
            self.set_zindex(id, z_index);
            return Ok(());
        }

        let element = self.tree.get_mut(id).ok_or(UiError::StaleElement(id))?;
        let invalidation = match apply_core_property(element, name, &value)? {
            Some(invalidation) => invalidation,
            None => element
                .visual
                .set_property(name, &value)?
                .ok_or_else(|| UiError::UnknownProperty {
                    element: id,
                    name: name.to_owned(),
                })?,
        };

        trace!(element = ?id, name, ?invalidation, "property set");
        self.apply_invalidation(id, invalidation);
        Ok(())
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Marks the layout around an element dirty.
    ///
    /// Layout is recomputed per panel: this dirties the element's parent,
    /// and the element itself when it arranges children.
    pub fn invalidate_layout(&mut self, id: ElementId) {
        self.assert_owner();
        let Some(element) = self.tree.get(id).filter(|_| self.tree.is_live(id)) else {
            return;
        };
        let (parent, is_panel) = (element.state.parent, element.is_panel());
        self.tree.invalidate_measure(id);
        if let Some(parent) = parent {
            self.dirty.layout.insert(parent);
        }
        if is_panel {
            self.dirty.layout.insert(id);
        }
    }

    /// Marks an element for repainting.
    ///
    /// Its window is painted once per frame however many of its elements
    /// are dirty.
    pub fn invalidate_visual(&mut self, id: ElementId) {
        self.assert_owner();
        if self.tree.is_live(id) {
            self.dirty.visual.insert(id);
        }
    }

    /// Requests a call of the element's per-frame update.
    pub fn request_update(&mut self, id: ElementId) {
        self.assert_owner();
        if self.tree.is_live(id) {
            self.dirty.update.insert(id);
        }
    }

    pub(crate) fn apply_invalidation(&mut self, id: ElementId, invalidation: Invalidation) {
        if invalidation.layout {
            self.invalidate_layout(id);
        }
        if invalidation.visual {
            self.invalidate_visual(id);
        }
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Registers a persistent update task. It runs only when armed.
    pub fn register_update_task(&mut self, task: impl FnMut(&mut Scheduler, TaskToken) + 'static) -> TaskToken {
        self.assert_owner();
        self.tasks.register(Box::new(task))
    }

    /// Arms a task for the next tick. Arming twice runs it once.
    ///
    /// Returns false for a stale token.
    pub fn schedule_update_task(&mut self, token: TaskToken) -> bool {
        self.assert_owner();
        self.tasks.schedule(token)
    }

    /// Removes a task, armed or not. Returns false for a stale token.
    ///
    /// # Panics
    ///
    /// Panics when called for the task that is currently executing; post a
    /// temporary task that unregisters it instead.
    pub fn unregister_update_task(&mut self, token: TaskToken) -> bool {
        self.assert_owner();
        self.tasks.unregister(token)
    }

    /// Returns true if the task is armed for the next tick.
    #[must_use]
    pub fn is_update_task_scheduled(&self, token: TaskToken) -> bool {
        self.tasks.is_scheduled(token)
    }

    /// Returns true if the token refers to a registered task.
    #[must_use]
    pub fn is_update_task_registered(&self, token: TaskToken) -> bool {
        self.tasks.is_registered(token)
    }

    /// Queues a fire-once task. It runs after the update tasks of the next
    /// tick; tasks queued from a temporary task wait one more tick.
    pub fn post_temporary_task(&mut self, task: impl FnOnce(&mut Scheduler) + 'static) {
        self.assert_owner();
        self.temporary.push(Box::new(task));
    }

    /// Handle for posting jobs from other threads.
    #[must_use]
    pub fn remote(&self) -> RemoteHandle {
        RemoteHandle {
            jobs: self.remote_tx.clone(),
            waker: self.source.waker(),
        }
    }

    /// Handle that interrupts the idle wait from any thread.
    #[must_use]
    pub fn waker(&self) -> Waker {
        self.source.waker()
    }

    // =========================================================================
    // Animations
    // =========================================================================

    /// Starts an animation, replacing one already driving the same
    /// property of the same element.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::StaleElement`] if the element is gone.
    pub fn start_animation<T: Animatable>(&mut self, element: ElementId, animation: Animation<T>) -> UiResult<AnimationId> {
        self.assert_owner();
        let state = &self
            .tree
            .get(element)
            .filter(|_| self.tree.is_live(element))
            .ok_or(UiError::StaleElement(element))?
            .state;

        let property = animation.property().name;
        let (id, replaced) = self.animations.start(element, state, animation);
        trace!(element = ?element, property, animation = ?id, ?replaced, "animation started");
        Ok(id)
    }

    /// Stops an animation where it is. Returns false if it already ended.
    pub fn stop_animation(&mut self, id: AnimationId) -> bool {
        self.assert_owner();
        self.animations.stop(id)
    }

    /// Returns true if the element has a playing animation, optionally of
    /// one named property.
    #[must_use]
    pub fn is_animating(&self, element: ElementId, property: Option<&str>) -> bool {
        self.animations.is_animating(element, property)
    }

    /// Playing animations of an element in start order.
    #[must_use]
    pub fn animations_of(&self, element: ElementId) -> Vec<(AnimationId, AnimationTarget)> {
        self.animations.animations_of(element)
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Returns true if the next iteration has work to do.
    #[must_use]
    pub fn needs_update(&self) -> bool {
        self.tasks.scheduled_count() > 0
            || !self.temporary.is_empty()
            || !self.remote_rx.is_empty()
            || self.tree.pending_disposals() > 0
            || self
                .animation_due_in()
                .is_some_and(|due| due <= self.config.animation_lookahead())
            || !self.dirty.is_empty()
    }

    /// Time until the earliest animation needs a tick, measured from now.
    fn animation_due_in(&self) -> Option<Duration> {
        let since_tick = self.clock.now().saturating_duration_since(self.last_tick);
        self.animations
            .next_update_in()
            .map(|due| due.saturating_sub(since_tick))
    }

    /// Runs one full scheduler pass.
    pub fn update(&mut self) {
        self.assert_owner();
        let now = self.clock.now();
        let dt = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.stats.ticks += 1;
        trace!(tick = self.stats.ticks, dt_us = u64::try_from(dt.as_micros()).unwrap_or(u64::MAX), "update");

        while let Ok(job) = self.remote_rx.try_recv() {
            self.temporary.push(job);
        }
        self.run_update_tasks();
        self.run_temporary_tasks();
        self.tick_animations(dt);
        self.collect_disposed();
        self.update_elements(dt);
        self.update_invalid_layout();
        self.update_invalid_visuals();
    }

    fn run_update_tasks(&mut self) {
        for token in self.tasks.take_scheduled() {
            // Unregistered by an earlier task of this tick
            let Some(mut callback) = self.tasks.begin(token) else {
                continue;
            };
            callback(self, token);
            self.tasks.end(token, callback);
        }
    }

    fn run_temporary_tasks(&mut self) {
        let tasks = std::mem::take(&mut self.temporary);
        for task in tasks {
            task(self);
        }
    }

    fn tick_animations(&mut self, dt: Duration) {
        for (id, invalidation) in self.animations.tick(&mut self.tree, dt) {
            self.apply_invalidation(id, invalidation);
        }
    }

    fn collect_disposed(&mut self) {
        if self.tree.pending_disposals() == 0 {
            return;
        }

        for (id, element) in self.tree.collect_disposed() {
            self.dirty.forget(id);
            self.animations.remove_element(id);
            self.kinetic.remove(&id);

            if let ElementKind::Window(mut window) = element.kind {
                self.native_windows.remove(&window.handle);
                self.windows.retain(|&live| live != id);
                if !window.native_destroyed {
                    if let Err(source) = window.native.destroy() {
                        warn!(window = ?id, %source, "native window destroy failed");
                    }
                }
                debug!(window = ?id, remaining = self.windows.len(), "window destroyed");
                self.notify_window(id, &WindowNotification::Destroyed);

                if self.windows.is_empty() && self.config.quit_when_last_window_closes {
                    debug!("last window closed, leaving main loop");
                    self.quit = true;
                }
            }
        }
    }

    fn update_elements(&mut self, dt: Duration) {
        for id in std::mem::take(&mut self.dirty.update) {
            let Some(element) = self.tree.get_mut(id) else {
                continue;
            };
            let Element { state, visual, .. } = element;
            let outcome = visual.on_update(state, dt);

            if outcome.again {
                self.dirty.update.insert(id);
            }
            self.apply_invalidation(id, outcome.invalidation);
        }
    }

    /// Arranges dirty panels until none is left.
    ///
    /// The shallowest dirty panel goes first. Panels dirtied by this pass,
    /// including by their own children, are processed in the same call.
    ///
    /// # Panics
    ///
    /// Panics if layout does not settle within `max_layout_passes`.
    pub fn update_invalid_layout(&mut self) {
        self.assert_owner();
        let mut passes = 0usize;

        while let Some(panel) = self.dirty.pop_shallowest_layout(&self.tree) {
            passes += 1;
            assert!(
                passes <= self.config.max_layout_passes,
                "layout did not converge after {passes} passes ({panel:?} still dirty)"
            );

            let outcome = layout::arrange_panel(&mut self.tree, panel);
            self.stats.layout_passes += 1;

            self.dirty.layout.extend(outcome.resized);
            self.dirty.visual.extend(outcome.moved);
            if outcome.desired_changed {
                if let Some(parent) = self.tree.parent(panel) {
                    self.dirty.layout.insert(parent);
                }
            }
            self.dirty.visual.insert(panel);
        }

        if passes > 0 {
            trace!(passes, "layout settled");
        }
    }

    /// Paints each window holding a dirty element exactly once.
    pub fn update_invalid_visuals(&mut self) {
        self.assert_owner();
        let dirty = std::mem::take(&mut self.dirty.visual);
        let windows: std::collections::BTreeSet<ElementId> = dirty
            .into_iter()
            .filter(|&id| self.tree.is_live(id))
            .filter_map(|id| self.tree.window_of(id))
            .collect();

        for window in windows {
            self.render_window(window);
        }
    }

    // =========================================================================
    // Main loop
    // =========================================================================

    /// Runs one loop iteration.
    ///
    /// Active: one update, then up to `max_messages_per_tick` queued
    /// messages. Idle: blocks for one message. Returns false once the loop
    /// should stop.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::Platform`] if the message source failed.
    pub fn run_iteration(&mut self) -> UiResult<bool> {
        self.assert_owner();
        if self.quit {
            return Ok(false);
        }

        if self.needs_update() {
            self.update();
            for _ in 0..self.config.max_messages_per_tick {
                let Some(message) = self.source.pump_one() else {
                    break;
                };
                self.dispatch_message(message);
            }
        } else {
            if let Some(due) = self.animation_due_in() {
                self.source.arm_timer(due);
            }
            let message = self
                .source
                .wait()
                .map_err(|source| UiError::Platform { operation: "wait", source })?;
            self.dispatch_message(message);
        }

        Ok(!self.quit)
    }

    /// Runs the loop until [`Scheduler::quit`] is called, a quit message
    /// arrives or the last window closes.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::Platform`] if the message source failed.
    pub fn run(&mut self) -> UiResult<()> {
        debug!(windows = self.windows.len(), "main loop started");
        while self.run_iteration()? {}
        debug!(ticks = self.stats.ticks, "main loop finished");
        Ok(())
    }

    /// Asks the main loop to stop after the current iteration.
    pub fn quit(&mut self) {
        self.quit = true;
    }

    /// Returns true once the loop has been asked to stop.
    #[must_use]
    pub fn is_quitting(&self) -> bool {
        self.quit
    }

    /// Handles one platform message.
    pub fn dispatch_message(&mut self, message: PlatformMessage) {
        self.assert_owner();
        self.stats.messages += 1;

        match message {
            PlatformMessage::Window { handle, event } => {
                let Some(window) = self.window_for(handle) else {
                    trace!(handle = handle.0, "message for unknown window dropped");
                    return;
                };
                self.dispatch_window_event(window, event);
            }
            PlatformMessage::Wake => trace!("woken up"),
            PlatformMessage::Timer => trace!("timer fired"),
            PlatformMessage::Quit => self.quit = true,
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.set(false));
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tree", &self.tree)
            .field("windows", &self.windows)
            .field("focus", &self.focus)
            .field("tasks", &self.tasks.len())
            .field("animating", &!self.animations.is_empty())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
