//! Keyframe animations bound to element properties.
//!
//! An [`Animation<T>`] drives one typed [`Property<T>`] of one element.
//! At most one animation runs per (element, property) pair: starting a new
//! one replaces the old, where "same" means equal [`AnimationTarget`]s.

use std::collections::HashMap;
use std::time::Duration;

use crate::color::Color;
use crate::element::{ElementId, ElementState, ElementTree, Invalidation};
use crate::geometry::{Point, Size};
use crate::layout::Length;

/// Easing function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Linear interpolation.
    Linear,
    /// Exponential ease-out (sharp snap to target).
    #[default]
    ExponentialOut,
    /// Exponential ease-in (accelerating).
    ExponentialIn,
    /// Exponential ease-in-out.
    ExponentialInOut,
    /// Cubic ease-in-out.
    CubicInOut,
    /// Instant (no animation).
    Instant,
}

impl Easing {
    /// Applies the easing function to a t value (0-1).
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::ExponentialOut => {
                // Sharp snap: 1 - 2^(-10t)
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2.0_f32.powf(-10.0 * t)
                }
            }
            Self::ExponentialIn => {
                // Accelerating: 2^(10(t-1))
                if t <= 0.0 {
                    0.0
                } else {
                    2.0_f32.powf(10.0 * (t - 1.0))
                }
            }
            Self::ExponentialInOut => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else if t < 0.5 {
                    2.0_f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2.0_f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::Instant => 1.0,
        }
    }
}

/// A value that can be interpolated.
pub trait Animatable: Copy + PartialEq + std::fmt::Debug + 'static {
    /// Interpolates towards `to`; `t` is already eased.
    #[must_use]
    fn lerp(self, to: Self, t: f32) -> Self;
}

impl Animatable for f32 {
    fn lerp(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Animatable for Point {
    fn lerp(self, to: Self, t: f32) -> Self {
        Self::new(self.x.lerp(to.x, t), self.y.lerp(to.y, t))
    }
}

impl Animatable for Size {
    fn lerp(self, to: Self, t: f32) -> Self {
        Self::new(self.width.lerp(to.width, t), self.height.lerp(to.height, t))
    }
}

impl Animatable for Color {
    fn lerp(self, to: Self, t: f32) -> Self {
        Color::lerp(self, to, t)
    }
}

/// A typed, animatable element property.
pub struct Property<T> {
    /// Property name, used to compare animation targets.
    pub name: &'static str,
    /// What changing the property requires.
    pub affects: Invalidation,
    read: fn(&ElementState) -> T,
    write: fn(&mut ElementState, T),
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Property<T> {}

impl<T> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("affects", &self.affects)
            .finish_non_exhaustive()
    }
}

impl<T> Property<T> {
    /// Describes a custom property.
    #[must_use]
    pub const fn new(
        name: &'static str,
        affects: Invalidation,
        read: fn(&ElementState) -> T,
        write: fn(&mut ElementState, T),
    ) -> Self {
        Self {
            name,
            affects,
            read,
            write,
        }
    }

    /// Reads the current value.
    pub fn get(&self, state: &ElementState) -> T {
        (self.read)(state)
    }

    /// Writes a value.
    pub fn set(&self, state: &mut ElementState, value: T) {
        (self.write)(state, value);
    }
}

fn read_opacity(state: &ElementState) -> f32 {
    state.opacity
}

fn write_opacity(state: &mut ElementState, value: f32) {
    state.opacity = value.clamp(0.0, 1.0);
}

fn read_render_offset(state: &ElementState) -> Point {
    state.render_offset
}

fn write_render_offset(state: &mut ElementState, value: Point) {
    state.render_offset = value;
}

fn read_width(state: &ElementState) -> f32 {
    match state.layout.width {
        Length::Fixed(px) => px,
        _ => state.rect.width,
    }
}

fn write_width(state: &mut ElementState, value: f32) {
    state.layout.width = Length::Fixed(value.max(0.0));
}

fn read_height(state: &ElementState) -> f32 {
    match state.layout.height {
        Length::Fixed(px) => px,
        _ => state.rect.height,
    }
}

fn write_height(state: &mut ElementState, value: f32) {
    state.layout.height = Length::Fixed(value.max(0.0));
}

impl Property<f32> {
    /// Element opacity.
    pub const OPACITY: Self = Self::new("opacity", Invalidation::VISUAL, read_opacity, write_opacity);
    /// Fixed width.
    pub const WIDTH: Self = Self::new("width", Invalidation::LAYOUT, read_width, write_width);
    /// Fixed height.
    pub const HEIGHT: Self = Self::new("height", Invalidation::LAYOUT, read_height, write_height);
}

impl Property<Point> {
    /// Paint/hit-test translation.
    pub const RENDER_OFFSET: Self = Self::new(
        "render_offset",
        Invalidation::VISUAL,
        read_render_offset,
        write_render_offset,
    );
}

/// Identifies what an animation drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationTarget {
    /// The animated element.
    pub element: ElementId,
    /// The animated property.
    pub property: &'static str,
}

/// Handle of a started animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(u64);

/// How often an animation plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    /// One cycle.
    #[default]
    Once,
    /// A number of cycles.
    Times(u32),
    /// Until stopped.
    Forever,
}

/// One point of an animation curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    /// Time from the start of the cycle (delay excluded).
    pub offset: Duration,
    /// Value reached at `offset`.
    pub value: T,
    /// Curve used to get here from the previous keyframe.
    pub easing: Easing,
}

/// A keyframe animation of one property.
///
/// The cycle starts at the property's value when the animation is started
/// and passes through every keyframe in offset order.
#[derive(Debug, Clone)]
pub struct Animation<T: Animatable> {
    property: Property<T>,
    keyframes: Vec<Keyframe<T>>,
    delay: Duration,
    repeat: Repeat,
}

impl<T: Animatable> Animation<T> {
    /// Creates an empty animation of `property`.
    #[must_use]
    pub fn new(property: Property<T>) -> Self {
        Self {
            property,
            keyframes: Vec::with_capacity(4),
            delay: Duration::ZERO,
            repeat: Repeat::Once,
        }
    }

    /// Single-segment animation to `value`.
    #[must_use]
    pub fn to(property: Property<T>, value: T, duration: Duration, easing: Easing) -> Self {
        Self::new(property).keyframe(duration, value, easing)
    }

    /// Adds a keyframe, keeping keyframes sorted by offset.
    #[must_use]
    pub fn keyframe(mut self, offset: Duration, value: T, easing: Easing) -> Self {
        let index = self.keyframes.partition_point(|frame| frame.offset <= offset);
        self.keyframes.insert(index, Keyframe { offset, value, easing });
        self
    }

    /// Waits before the first cycle.
    #[must_use]
    pub const fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the repeat mode.
    #[must_use]
    pub const fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// The animated property.
    #[must_use]
    pub const fn property(&self) -> &Property<T> {
        &self.property
    }

    /// Length of one cycle.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.keyframes.last().map_or(Duration::ZERO, |frame| frame.offset)
    }

    /// Keyframes in offset order.
    #[must_use]
    pub fn keyframes(&self) -> &[Keyframe<T>] {
        &self.keyframes
    }

    /// Value at `time` into the cycle, starting from `origin`.
    #[must_use]
    pub fn sample(&self, origin: T, time: Duration) -> T {
        let mut previous = (Duration::ZERO, origin);
        for frame in &self.keyframes {
            if time < frame.offset {
                let span = (frame.offset - previous.0).as_secs_f32();
                let t = if span > 0.0 {
                    (time.saturating_sub(previous.0)).as_secs_f32() / span
                } else {
                    1.0
                };
                return previous.1.lerp(frame.value, frame.easing.apply(t));
            }
            previous = (frame.offset, frame.value);
        }
        previous.1
    }
}

/// `time` modulo a non-zero `period`.
fn cycle_remainder(time: Duration, period: Duration) -> Duration {
    let nanos = time.as_nanos() % period.as_nanos();
    // Below `period`, which fits a Duration.
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Progress of one tick.
struct TrackStep {
    finished: bool,
    invalidation: Invalidation,
}

/// Type-erased playing animation.
trait Track {
    fn property(&self) -> &'static str;
    /// Advances by `dt` and writes the property.
    fn advance(&mut self, state: &mut ElementState, dt: Duration) -> TrackStep;
    /// A fresh cycle if repeats remain.
    fn next_cycle(&self, state: &ElementState) -> Option<Box<dyn Track>>;
    /// Time until the track next changes the property.
    fn next_update_in(&self) -> Duration;
}

struct PlayingAnimation<T: Animatable> {
    animation: Animation<T>,
    /// Value the cycle starts from.
    origin: T,
    /// Time since start, delay included.
    elapsed: Duration,
    /// Completed cycles.
    cycles: u32,
}

impl<T: Animatable> PlayingAnimation<T> {
    fn start(animation: Animation<T>, state: &ElementState, cycles: u32) -> Self {
        let origin = animation.property.get(state);
        Self {
            animation,
            origin,
            elapsed: Duration::ZERO,
            cycles,
        }
    }
}

impl<T: Animatable> Track for PlayingAnimation<T> {
    fn property(&self) -> &'static str {
        self.animation.property.name
    }

    fn advance(&mut self, state: &mut ElementState, dt: Duration) -> TrackStep {
        self.elapsed += dt;
        let Some(time) = self.elapsed.checked_sub(self.animation.delay) else {
            return TrackStep {
                finished: false,
                invalidation: Invalidation::NONE,
            };
        };

        let property = self.animation.property;
        let value = self.animation.sample(self.origin, time);
        let invalidation = if property.get(state) == value {
            Invalidation::NONE
        } else {
            property.set(state, value);
            property.affects
        };

        TrackStep {
            finished: time >= self.animation.duration(),
            invalidation,
        }
    }

    fn next_cycle(&self, state: &ElementState) -> Option<Box<dyn Track>> {
        let duration = self.animation.duration();
        // A zero-length cycle plays once.
        if duration.is_zero() {
            return None;
        }
        // Time past the end of this cycle carries into the next ones.
        let overshoot = self
            .elapsed
            .saturating_sub(self.animation.delay)
            .saturating_sub(duration);
        let skipped = overshoot.as_nanos() / duration.as_nanos();
        let cycles = self
            .cycles
            .saturating_add(1)
            .saturating_add(u32::try_from(skipped).unwrap_or(u32::MAX));
        let again = match self.animation.repeat {
            Repeat::Once => false,
            Repeat::Times(total) => cycles < total,
            Repeat::Forever => true,
        };
        if !again {
            return None;
        }
        // Later cycles start from the same origin without the delay.
        let mut animation = self.animation.clone();
        animation.delay = Duration::ZERO;
        let mut next = Self::start(animation, state, cycles);
        next.origin = self.origin;
        next.elapsed = cycle_remainder(overshoot, duration);
        Some(Box::new(next))
    }

    fn next_update_in(&self) -> Duration {
        self.animation.delay.saturating_sub(self.elapsed)
    }
}

struct Playing {
    id: AnimationId,
    target: AnimationTarget,
    track: Box<dyn Track>,
    /// Started since the last tick; the first tick does not advance it.
    fresh: bool,
}

/// Per-element lists of playing animations.
#[derive(Default)]
pub(crate) struct AnimationRegistry {
    playing: HashMap<ElementId, Vec<Playing>>,
    next_id: u64,
}

impl AnimationRegistry {
    /// Starts an animation, replacing one with an equal target.
    ///
    /// Returns the new id and the id of the replaced animation.
    pub(crate) fn start<T: Animatable>(
        &mut self,
        element: ElementId,
        state: &ElementState,
        animation: Animation<T>,
    ) -> (AnimationId, Option<AnimationId>) {
        let target = AnimationTarget {
            element,
            property: animation.property.name,
        };
        let list = self.playing.entry(element).or_default();

        let replaced = list
            .iter()
            .position(|playing| playing.target == target)
            .map(|index| list.remove(index).id);

        self.next_id += 1;
        let id = AnimationId(self.next_id);
        list.push(Playing {
            id,
            target,
            track: Box::new(PlayingAnimation::start(animation, state, 0)),
            fresh: true,
        });
        (id, replaced)
    }

    /// Stops an animation, leaving the property at its current value.
    pub(crate) fn stop(&mut self, id: AnimationId) -> bool {
        for list in self.playing.values_mut() {
            if let Some(index) = list.iter().position(|playing| playing.id == id) {
                list.remove(index);
                return true;
            }
        }
        false
    }

    /// Returns true if `element` has an animation (of `property`, if given).
    pub(crate) fn is_animating(&self, element: ElementId, property: Option<&str>) -> bool {
        self.playing.get(&element).is_some_and(|list| {
            list.iter()
                .any(|playing| property.map_or(true, |name| playing.target.property == name))
        })
    }

    /// Animations of one element, in start order.
    pub(crate) fn animations_of(&self, element: ElementId) -> Vec<(AnimationId, AnimationTarget)> {
        self.playing
            .get(&element)
            .map(|list| list.iter().map(|playing| (playing.id, playing.target)).collect())
            .unwrap_or_default()
    }

    /// Forgets every animation of an element.
    pub(crate) fn remove_element(&mut self, element: ElementId) {
        self.playing.remove(&element);
    }

    /// Returns true if nothing is playing.
    pub(crate) fn is_empty(&self) -> bool {
        self.playing.values().all(Vec::is_empty)
    }

    /// Time until the earliest animation needs a tick.
    pub(crate) fn next_update_in(&self) -> Option<Duration> {
        self.playing
            .values()
            .flatten()
            .map(|playing| {
                if playing.fresh {
                    Duration::ZERO
                } else {
                    playing.track.next_update_in()
                }
            })
            .min()
    }

    /// Advances every animation by `dt` and writes the properties.
    ///
    /// Returns the elements whose properties changed.
    pub(crate) fn tick(&mut self, tree: &mut ElementTree, dt: Duration) -> Vec<(ElementId, Invalidation)> {
        let mut changed = Vec::new();

        self.playing.retain(|&element, list| {
            let Some(state) = tree.get_mut(element).map(|element| &mut element.state) else {
                return false;
            };

            let mut invalidation = Invalidation::NONE;
            let mut next_cycles = Vec::new();
            let mut index = 0;
            while index < list.len() {
                let playing = &mut list[index];
                let step_dt = if playing.fresh { Duration::ZERO } else { dt };
                playing.fresh = false;

                let step = playing.track.advance(state, step_dt);
                invalidation = invalidation.merge(step.invalidation);

                if step.finished {
                    let finished = list.remove(index);
                    if let Some(track) = finished.track.next_cycle(state) {
                        next_cycles.push(Playing {
                            id: finished.id,
                            target: finished.target,
                            track,
                            fresh: false,
                        });
                    }
                    // The next entry shifted into `index`.
                    continue;
                }
                index += 1;
            }
            // Next cycles start advancing on the following tick.
            list.append(&mut next_cycles);

            if !invalidation.is_none() {
                changed.push((element, invalidation));
            }
            !list.is_empty()
        });

        changed
    }
}
