//! Integration test for the invalidation scheduler.

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use common::Harness;
use trellis_ui::element::{HitTestable, Interactive, Layoutable, Paintable, UpdateOutcome};
use trellis_ui::{
    CollectionChange, CollectionPhase, ElementState, Invalidation, SchedulerConfig, Size, UiError,
};

#[test]
fn test_visual_invalidations_coalesce_per_window() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let first = harness.element("Rectangle", window);
    let second = harness.element("Rectangle", window);
    harness.scheduler.update();
    let frames = harness.frame_count();

    harness.scheduler.invalidate_visual(first);
    harness.scheduler.invalidate_visual(first);
    harness.scheduler.invalidate_visual(second);
    harness.scheduler.update();

    assert_eq!(harness.frame_count(), frames + 1);
}

#[test]
fn test_needs_update_follows_dirty_state() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let leaf = harness.element("Rectangle", window);
    harness.scheduler.update();
    assert!(!harness.scheduler.needs_update());

    harness.scheduler.invalidate_visual(leaf);
    assert!(harness.scheduler.needs_update());
    harness.scheduler.update();
    assert!(!harness.scheduler.needs_update());

    harness.scheduler.invalidate_layout(leaf);
    assert!(harness.scheduler.needs_update());
    harness.scheduler.update();
    assert!(!harness.scheduler.needs_update());
}

#[test]
fn test_task_scheduled_many_times_runs_once() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let runs = Rc::new(Cell::new(0));
    let counter = Rc::clone(&runs);
    let token = harness.scheduler.register_update_task(move |_, _| counter.set(counter.get() + 1));

    // Arming a live token always succeeds; repeats do not queue it again.
    assert!(harness.scheduler.schedule_update_task(token));
    assert!(harness.scheduler.schedule_update_task(token));
    assert!(harness.scheduler.schedule_update_task(token));
    assert!(harness.scheduler.is_update_task_scheduled(token));
    harness.scheduler.update();
    harness.scheduler.update();

    assert_eq!(runs.get(), 1);
    assert!(!harness.scheduler.is_update_task_scheduled(token));
}

#[test]
fn test_rearming_task_runs_once_per_tick() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let runs = Rc::new(Cell::new(0));
    let counter = Rc::clone(&runs);
    let token = harness.scheduler.register_update_task(move |scheduler, token| {
        counter.set(counter.get() + 1);
        if counter.get() < 3 {
            scheduler.schedule_update_task(token);
        }
    });
    harness.scheduler.schedule_update_task(token);

    harness.scheduler.update();
    assert_eq!(runs.get(), 1);
    assert!(harness.scheduler.needs_update());

    let ticks = harness.settle(10);
    assert_eq!(ticks, 2);
    assert_eq!(runs.get(), 3);
    assert!(harness.scheduler.is_update_task_registered(token));
}

#[test]
fn test_tasks_run_before_layout() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let leaf = harness.element("Rectangle", window);
    harness.scheduler.update();

    let token = harness.scheduler.register_update_task(move |scheduler, _| {
        scheduler.set_property(leaf, "width", 40.0_f32).unwrap();
    });
    harness.scheduler.schedule_update_task(token);
    harness.scheduler.update();

    // The change made by the task is laid out in the same tick.
    let rect = harness.scheduler.tree().get(leaf).unwrap().state.rect;
    assert_eq!(rect.width, 40.0);
    assert!(!harness.scheduler.needs_update());
}

#[test]
fn test_disposal_is_deferred_to_next_update() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let panel = harness.element("Panel", window);
    let child = harness.element("Rectangle", panel);
    harness.scheduler.update();

    harness.scheduler.dispose(panel);
    // Still readable, no longer live
    assert!(harness.scheduler.tree().get(child).is_some());
    assert!(harness.scheduler.element(child).is_none());
    assert!(harness.scheduler.tree().is_disposing(child));
    assert!(matches!(
        harness.scheduler.set_property(child, "width", 10.0_f32),
        Err(UiError::StaleElement(_))
    ));
    assert!(harness.scheduler.tree().children(window).is_empty());

    harness.scheduler.update();
    assert!(harness.scheduler.tree().get(panel).is_none());
    assert!(harness.scheduler.tree().get(child).is_none());
    assert!(!harness.scheduler.tree().is_disposing(child));
}

#[test]
fn test_collection_events_wrap_mutation() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    harness.scheduler.observe_collection(move |scheduler, event| {
        let count = scheduler.tree().children(event.panel).len();
        sink.borrow_mut().push((event.phase, event.change, count));
    });

    let child = harness.scheduler.create_element("Rectangle").unwrap();
    harness.scheduler.add_child(window, child);
    harness.scheduler.remove_child(window, child);

    let inserted = CollectionChange::Inserted { child, before: None };
    let removed = CollectionChange::Removed { child };
    assert_eq!(
        *events.borrow(),
        vec![
            (CollectionPhase::Changing, inserted, 0),
            (CollectionPhase::Changed, inserted, 1),
            (CollectionPhase::Changing, removed, 1),
            (CollectionPhase::Changed, removed, 0),
        ]
    );
}

struct Countdown {
    left: Rc<Cell<u32>>,
}

impl Layoutable for Countdown {}
impl Paintable for Countdown {}
impl HitTestable for Countdown {}
impl Interactive for Countdown {
    fn on_update(&mut self, _state: &ElementState, _dt: Duration) -> UpdateOutcome {
        self.left.set(self.left.get() - 1);
        UpdateOutcome {
            again: self.left.get() > 0,
            invalidation: Invalidation::VISUAL,
        }
    }
}

#[test]
fn test_element_update_repeats_until_done() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let left = Rc::new(Cell::new(3));
    let element = harness.scheduler.create_leaf(Countdown { left: Rc::clone(&left) });
    harness.scheduler.add_child(window, element);
    harness.scheduler.update();
    let frames = harness.frame_count();

    harness.scheduler.request_update(element);
    let ticks = harness.settle(10);

    assert_eq!(ticks, 3);
    assert_eq!(left.get(), 0);
    assert_eq!(harness.frame_count(), frames + 3);
}

#[test]
fn test_config_from_toml() {
    let config = SchedulerConfig::from_toml_str("max_messages_per_tick = 4\nkinetic_decay = 2.5\n").unwrap();
    assert_eq!(config.max_messages_per_tick, 4);
    assert_eq!(config.kinetic_decay, 2.5);
    assert_eq!(config.max_layout_passes, SchedulerConfig::default().max_layout_passes);

    assert!(matches!(
        SchedulerConfig::from_toml_str("max_messages_per_tick = \"many\""),
        Err(UiError::Config(_))
    ));
}
