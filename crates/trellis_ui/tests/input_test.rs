//! Integration test for pointer and keyboard routing.

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use common::Harness;
use trellis_ui::element::{HitTestable, Interactive, Layoutable, Paintable, Reaction};
use trellis_ui::{
    Direction, ElementId, ElementState, InputEvent, Invalidation, Key, Modifiers, MouseButton, PanelLayout, Point,
    Size,
};

/// Records every event it sees; optionally consumes some kinds.
struct Recorder {
    seen: Rc<RefCell<Vec<InputEvent>>>,
    consume_keys: bool,
}

impl Layoutable for Recorder {}
impl Paintable for Recorder {}
impl HitTestable for Recorder {}
impl Interactive for Recorder {
    fn on_input(&mut self, _state: &ElementState, event: &InputEvent) -> Reaction {
        self.seen.borrow_mut().push(event.clone());
        if self.consume_keys && event.is_keyboard() {
            Reaction::handled(Invalidation::VISUAL)
        } else {
            Reaction::IGNORED
        }
    }
}

fn recorder(harness: &mut Harness, parent: ElementId, consume_keys: bool) -> (ElementId, Rc<RefCell<Vec<InputEvent>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let id = harness.scheduler.create_leaf(Recorder {
        seen: Rc::clone(&seen),
        consume_keys,
    });
    harness.scheduler.add_child(parent, id);
    (id, seen)
}

fn press(harness: &mut Harness, position: Point) {
    harness.input(InputEvent::MouseDown {
        position,
        button: MouseButton::Left,
        click_count: 1,
    });
    harness.input(InputEvent::MouseUp {
        position,
        button: MouseButton::Left,
    });
}

fn click_counts(seen: &[InputEvent]) -> Vec<u8> {
    seen.iter()
        .filter_map(|event| match event {
            InputEvent::MouseDown { click_count, .. } => Some(*click_count),
            _ => None,
        })
        .collect()
}

#[test]
fn test_double_click_within_time_and_distance() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let (_, seen) = recorder(&mut harness, window, false);
    harness.scheduler.update();

    press(&mut harness, Point::new(10.0, 10.0));
    harness.clock.advance(Duration::from_millis(100));
    press(&mut harness, Point::new(12.0, 10.0));
    harness.clock.advance(Duration::from_millis(400));
    press(&mut harness, Point::new(12.0, 10.0));
    harness.clock.advance(Duration::from_millis(100));
    press(&mut harness, Point::new(60.0, 60.0));

    assert_eq!(click_counts(&seen.borrow()), vec![1, 2, 1, 1]);
}

#[test]
fn test_topmost_sibling_receives_pointer() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let (below, seen_below) = recorder(&mut harness, window, false);
    let (above, seen_above) = recorder(&mut harness, window, false);
    harness.scheduler.update();

    // Equal z-index: the later child is on top.
    assert_eq!(harness.scheduler.hit_test(window, Point::new(5.0, 5.0)), Some(above));
    harness.scheduler.set_zindex(below, 1);
    assert_eq!(harness.scheduler.hit_test(window, Point::new(5.0, 5.0)), Some(below));

    press(&mut harness, Point::new(5.0, 5.0));
    assert_eq!(seen_below.borrow().len(), 2);
    assert!(seen_above.borrow().is_empty());
}

#[test]
fn test_capture_routes_moves_outside() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let row = harness.element("HorizontalStack", window);
    let (left, seen) = recorder(&mut harness, row, false);
    harness.scheduler.set_property(left, "width", 50.0_f32).unwrap();
    let right = harness.element("Rectangle", row);
    harness.scheduler.set_property(right, "width", 50.0_f32).unwrap();
    harness.scheduler.update();

    harness.input(InputEvent::MouseDown {
        position: Point::new(10.0, 10.0),
        button: MouseButton::Left,
        click_count: 1,
    });
    assert!(harness.native.lock().captured);

    harness.input(InputEvent::MouseMove {
        position: Point::new(80.0, 10.0),
    });
    // Delivered to the capturing element, in its local coordinates
    assert_eq!(
        seen.borrow().last().and_then(InputEvent::position),
        Some(Point::new(80.0, 10.0))
    );

    harness.input(InputEvent::MouseUp {
        position: Point::new(80.0, 10.0),
        button: MouseButton::Left,
    });
    assert!(!harness.native.lock().captured);
    assert_eq!(seen.borrow().len(), 3);
    // Hover follows the pointer again after release.
    assert!(harness.scheduler.element(right).unwrap().state.is_mouse_over());
    assert!(!harness.scheduler.element(left).unwrap().state.is_mouse_over());
}

#[test]
fn test_mouse_leave_clears_hover() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let leaf = harness.element("Rectangle", window);
    harness.scheduler.update();

    harness.input(InputEvent::MouseMove {
        position: Point::new(5.0, 5.0),
    });
    assert!(harness.scheduler.element(leaf).unwrap().state.is_mouse_over());
    assert!(harness.scheduler.element(window).unwrap().state.is_mouse_over());

    harness.input(InputEvent::MouseLeave);
    assert!(!harness.scheduler.element(leaf).unwrap().state.is_mouse_over());
    assert!(!harness.scheduler.element(window).unwrap().state.is_mouse_over());
}

#[test]
fn test_keys_go_to_focused_element_first() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let (field, seen) = recorder(&mut harness, window, true);
    harness.scheduler.set_property(field, "focusable", true).unwrap();
    let other = harness.element("Rectangle", window);
    harness.scheduler.set_property(other, "focusable", true).unwrap();
    harness.scheduler.set_focused_element(Some(field));

    harness.input(InputEvent::Text("a".into()));
    // A consumed Tab does not move focus
    harness.input(InputEvent::KeyDown {
        key: Key::Tab,
        modifiers: Modifiers::default(),
    });

    assert_eq!(seen.borrow().len(), 2);
    assert_eq!(harness.scheduler.focused_element(), Some(field));
}

#[test]
fn test_unhandled_wheel_scrolls_kinetically() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let list = harness.scheduler.create_panel(PanelLayout::stack(Direction::Vertical));
    harness.scheduler.set_property(list, "scrollable", true).unwrap();
    harness.scheduler.add_child(window, list);
    let mut rows = Vec::new();
    for _ in 0..4 {
        let row = harness.element("Rectangle", list);
        harness.scheduler.set_property(row, "height", 50.0_f32).unwrap();
        rows.push(row);
    }
    harness.scheduler.update();

    harness.input(InputEvent::Wheel {
        position: Point::new(50.0, 50.0),
        delta: Point::new(0.0, 10.0),
    });
    assert!(harness.scheduler.is_kinetic_scrolling(list));

    harness.settle(1000);
    let offset = harness.scheduler.tree().panel(list).unwrap().scroll_offset();
    assert!(offset.y > 0.0 && offset.y <= 100.0, "offset {offset:?}");
    assert!(!harness.scheduler.is_kinetic_scrolling(list));

    // Hit testing follows the scrolled content.
    let probe = Point::new(50.0, 99.0);
    let row = if probe.y + offset.y < 100.0 { rows[1] } else { rows[2] };
    assert_eq!(harness.scheduler.hit_test(window, probe), Some(row));
}
