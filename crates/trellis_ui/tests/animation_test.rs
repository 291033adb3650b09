//! Integration test for keyframe animations driven by the scheduler.

mod common;

use std::time::Duration;

use common::Harness;
use trellis_ui::{Animation, Easing, ElementId, Length, Point, Property, Repeat, Size, UiError};

fn opacity(harness: &Harness, id: ElementId) -> f32 {
    harness.scheduler.element(id).unwrap().state.opacity
}

fn fade_out() -> Animation<f32> {
    Animation::to(Property::OPACITY, 0.0, Duration::from_millis(100), Easing::Linear)
}

#[test]
fn test_opacity_follows_clock() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let leaf = harness.element("Rectangle", window);
    harness.scheduler.update();

    harness.scheduler.start_animation(leaf, fade_out()).unwrap();
    assert!(harness.scheduler.needs_update());

    // Binding tick: the animation starts from here.
    harness.tick(Duration::from_millis(16));
    assert!((opacity(&harness, leaf) - 1.0).abs() < 1e-5);

    let frames = harness.frame_count();
    harness.tick(Duration::from_millis(50));
    assert!((opacity(&harness, leaf) - 0.5).abs() < 1e-5);
    assert_eq!(harness.frame_count(), frames + 1);

    harness.tick(Duration::from_millis(50));
    assert!(opacity(&harness, leaf).abs() < 1e-5);
    assert!(!harness.scheduler.is_animating(leaf, None));
    assert!(!harness.scheduler.needs_update());
}

#[test]
fn test_second_animation_replaces_first() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let leaf = harness.element("Rectangle", window);

    let first = harness.scheduler.start_animation(leaf, fade_out()).unwrap();
    let second = harness
        .scheduler
        .start_animation(
            leaf,
            Animation::to(Property::OPACITY, 0.5, Duration::from_millis(100), Easing::Linear),
        )
        .unwrap();
    let offset = harness
        .scheduler
        .start_animation(
            leaf,
            Animation::to(Property::RENDER_OFFSET, Point::new(10.0, 0.0), Duration::from_millis(100), Easing::Linear),
        )
        .unwrap();

    let ids: Vec<_> = harness.scheduler.animations_of(leaf).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![second, offset]);
    assert!(!harness.scheduler.stop_animation(first));

    harness.settle(100);
    assert!((opacity(&harness, leaf) - 0.5).abs() < 1e-5);
    assert_eq!(harness.scheduler.element(leaf).unwrap().state.render_offset, Point::new(10.0, 0.0));
}

#[test]
fn test_stop_leaves_value_in_place() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let leaf = harness.element("Rectangle", window);
    let id = harness.scheduler.start_animation(leaf, fade_out()).unwrap();

    harness.tick(Duration::ZERO);
    harness.tick(Duration::from_millis(25));
    assert!(harness.scheduler.stop_animation(id));
    harness.tick(Duration::from_millis(50));

    assert!((opacity(&harness, leaf) - 0.75).abs() < 1e-5);
    assert!(!harness.scheduler.needs_update());
}

#[test]
fn test_width_animation_relayouts_siblings() {
    let mut harness = Harness::new(Size::new(200.0, 50.0));
    let window = harness.window;
    let row = harness.element("HorizontalStack", window);
    let grow = harness.element("Rectangle", row);
    harness.scheduler.set_property(grow, "width", 20.0_f32).unwrap();
    let rest = harness.element("Rectangle", row);
    harness.scheduler.set_property(rest, "width", Length::Proportional(1.0)).unwrap();
    harness.scheduler.update();

    harness
        .scheduler
        .start_animation(
            grow,
            Animation::to(Property::WIDTH, 120.0, Duration::from_millis(100), Easing::Linear),
        )
        .unwrap();
    harness.tick(Duration::ZERO);
    harness.tick(Duration::from_millis(50));

    let rest_rect = harness.scheduler.element(rest).unwrap().state.rect;
    assert_eq!(rest_rect.x, 70.0);
    assert_eq!(rest_rect.width, 130.0);
}

#[test]
fn test_delay_keeps_loop_idle_until_due() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let leaf = harness.element("Rectangle", window);
    harness.scheduler.update();

    harness
        .scheduler
        .start_animation(leaf, fade_out().delay(Duration::from_millis(300)))
        .unwrap();
    harness.tick(Duration::ZERO);
    assert!(!harness.scheduler.needs_update());

    harness.clock.advance(Duration::from_millis(290));
    assert!(!harness.scheduler.needs_update());
    // Inside the look-ahead window
    harness.clock.advance(Duration::from_millis(6));
    assert!(harness.scheduler.needs_update());
    harness.clock.advance(Duration::from_millis(4));
    assert!(harness.scheduler.needs_update());

    harness.tick(Duration::ZERO);
    harness.tick(Duration::from_millis(50));
    assert!((opacity(&harness, leaf) - 0.5).abs() < 1e-5);
}

#[test]
fn test_repeat_restarts_from_origin() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let leaf = harness.element("Rectangle", window);
    harness
        .scheduler
        .start_animation(leaf, fade_out().repeat(Repeat::Times(2)))
        .unwrap();

    harness.tick(Duration::ZERO);
    harness.tick(Duration::from_millis(100));
    assert!(opacity(&harness, leaf).abs() < 1e-5);
    assert!(harness.scheduler.is_animating(leaf, Some("opacity")));

    harness.tick(Duration::from_millis(25));
    assert!((opacity(&harness, leaf) - 0.75).abs() < 1e-5);
    harness.tick(Duration::from_millis(75));
    assert!(!harness.scheduler.is_animating(leaf, None));
}

#[test]
fn test_animating_disposed_element_fails() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let leaf = harness.element("Rectangle", window);
    harness.scheduler.start_animation(leaf, fade_out()).unwrap();

    harness.scheduler.dispose(leaf);
    assert!(!harness.scheduler.is_animating(leaf, None));
    assert!(matches!(
        harness.scheduler.start_animation(leaf, fade_out()),
        Err(UiError::StaleElement(_))
    ));
}

#[test]
fn test_empty_repeating_animation_lets_loop_idle() {
    let mut harness = Harness::new(Size::new(100.0, 100.0));
    let window = harness.window;
    let leaf = harness.element("Rectangle", window);
    harness
        .scheduler
        .start_animation(leaf, Animation::new(Property::OPACITY).repeat(Repeat::Forever))
        .unwrap();

    harness.tick(Duration::ZERO);
    assert!(!harness.scheduler.is_animating(leaf, None));
    assert!(!harness.scheduler.needs_update());
}
