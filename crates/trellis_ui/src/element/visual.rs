//! Capability traits implemented per concrete element type, and the
//! built-in visuals.
//!
//! Instead of a deep class chain, an element's behaviour is the sum of four
//! small contracts. Every method has a default so simple elements only
//! implement what they use.

use std::any::Any;
use std::time::Duration;

use super::{ElementState, Invalidation, PropertyValue};
use crate::color::Color;
use crate::error::UiResult;
use crate::geometry::{Point, Rect, Size};
use crate::input::InputEvent;
use crate::render::PaintContext;

/// Fixed-width glyph advance used for text measurement.
const CHAR_WIDTH: f32 = 8.0;
/// Line height used for text measurement.
const LINE_HEIGHT: f32 = 16.0;

/// Computes the content size an element wants.
pub trait Layoutable {
    /// Returns the desired content size (margin excluded) within `available`.
    fn measure(&self, state: &ElementState, available: Size) -> Size {
        let _ = (state, available);
        Size::ZERO
    }
}

/// Draws the element.
pub trait Paintable {
    /// Paints the element in local coordinates; children are painted by the
    /// tree afterwards.
    fn paint(&self, state: &ElementState, ctx: &mut PaintContext<'_>) {
        let _ = (state, ctx);
    }
}

/// Decides which local points belong to the element.
pub trait HitTestable {
    /// Returns true if `local` hits the element. Defaults to its rectangle.
    fn hit_test(&self, state: &ElementState, local: Point) -> bool {
        Rect::from_size(state.size()).contains(local)
    }
}

/// Result of offering an input event to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reaction {
    /// Stop bubbling to the parent.
    pub handled: bool,
    /// Invalidation caused by the event.
    pub invalidation: Invalidation,
}

impl Reaction {
    /// Event ignored, keep bubbling.
    pub const IGNORED: Self = Self {
        handled: false,
        invalidation: Invalidation::NONE,
    };

    /// Event consumed.
    #[must_use]
    pub const fn handled(invalidation: Invalidation) -> Self {
        Self {
            handled: true,
            invalidation,
        }
    }
}

/// Result of a per-frame element update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Run the update again next frame.
    pub again: bool,
    /// Invalidation caused by the update.
    pub invalidation: Invalidation,
}

impl UpdateOutcome {
    /// Nothing changed, nothing more to do.
    pub const DONE: Self = Self {
        again: false,
        invalidation: Invalidation::NONE,
    };
}

/// Reacts to input, focus, frame updates and property changes.
pub trait Interactive {
    /// Offers an input event in element-local coordinates.
    fn on_input(&mut self, state: &ElementState, event: &InputEvent) -> Reaction {
        let _ = (state, event);
        Reaction::IGNORED
    }

    /// Called when the element gains or loses global focus.
    fn on_focus_changed(&mut self, state: &ElementState, focused: bool) -> Invalidation {
        let _ = (state, focused);
        Invalidation::NONE
    }

    /// Per-frame update requested through `Scheduler::request_update`.
    fn on_update(&mut self, state: &ElementState, dt: Duration) -> UpdateOutcome {
        let _ = (state, dt);
        UpdateOutcome::DONE
    }

    /// Sets a type-specific property.
    ///
    /// Returns `Ok(None)` if the name is unknown to this type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::UiError::InvalidPropertyValue`] if the name is known
    /// but the value has the wrong kind.
    fn set_property(&mut self, name: &str, value: &PropertyValue) -> UiResult<Option<Invalidation>> {
        let _ = (name, value);
        Ok(None)
    }
}

/// Downcasting support for visuals.
pub trait AsAny: Any {
    /// Upcasts to `Any`.
    fn as_any(&self) -> &dyn Any;
    /// Upcasts to mutable `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The full behaviour of an element.
pub trait Visual: Layoutable + Paintable + HitTestable + Interactive + AsAny {}

impl<T> Visual for T where T: Layoutable + Paintable + HitTestable + Interactive + AsAny {}

/// An element with no content of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blank;

impl Layoutable for Blank {}
impl Paintable for Blank {}
impl HitTestable for Blank {}
impl Interactive for Blank {}

/// A filled and optionally outlined rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Fill color.
    pub fill: Color,
    /// Outline color and width.
    pub stroke: Option<(Color, f32)>,
}

impl Rectangle {
    /// Creates a filled rectangle.
    #[must_use]
    pub const fn new(fill: Color) -> Self {
        Self { fill, stroke: None }
    }

    /// Adds an outline.
    #[must_use]
    pub const fn with_stroke(mut self, color: Color, width: f32) -> Self {
        self.stroke = Some((color, width));
        self
    }
}

impl Default for Rectangle {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

impl Layoutable for Rectangle {}

impl Paintable for Rectangle {
    fn paint(&self, state: &ElementState, ctx: &mut PaintContext<'_>) {
        let bounds = Rect::from_size(state.size());
        ctx.fill_rect(bounds, self.fill);
        if let Some((color, width)) = self.stroke {
            ctx.stroke_rect(bounds, color, width);
        }
    }
}

impl HitTestable for Rectangle {}

impl Interactive for Rectangle {
    fn set_property(&mut self, name: &str, value: &PropertyValue) -> UiResult<Option<Invalidation>> {
        match name {
            "fill" | "color" => self.fill = value.as_color(name)?,
            "stroke" => {
                let width = self.stroke.map_or(1.0, |(_, width)| width);
                self.stroke = Some((value.as_color(name)?, width));
            }
            _ => return Ok(None),
        }
        Ok(Some(Invalidation::VISUAL))
    }
}

/// A single line of monospace text.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// Text content.
    pub text: String,
    /// Text color.
    pub color: Color,
}

impl Label {
    /// Creates a label.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: Color::TEXT,
        }
    }
}

impl Default for Label {
    fn default() -> Self {
        Self::new("")
    }
}

impl Layoutable for Label {
    fn measure(&self, _state: &ElementState, _available: Size) -> Size {
        // Character count is bounded by practical label lengths.
        #[allow(clippy::cast_precision_loss)]
        let chars = self.text.chars().count() as f32;
        Size::new(chars * CHAR_WIDTH, LINE_HEIGHT)
    }
}

impl Paintable for Label {
    fn paint(&self, _state: &ElementState, ctx: &mut PaintContext<'_>) {
        if !self.text.is_empty() {
            ctx.draw_text(&self.text, Point::ZERO, self.color);
        }
    }
}

impl HitTestable for Label {}

impl Interactive for Label {
    fn set_property(&mut self, name: &str, value: &PropertyValue) -> UiResult<Option<Invalidation>> {
        match name {
            "text" => {
                self.text = value.as_text(name)?.to_owned();
                Ok(Some(Invalidation::LAYOUT))
            }
            "color" => {
                self.color = value.as_color(name)?;
                Ok(Some(Invalidation::VISUAL))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementId;
    use trellis_core::Handle;

    fn state(width: f32, height: f32) -> ElementState {
        let mut state = ElementState::new(ElementId::from_handle(Handle::new(0, 0)));
        state.rect = Rect::new(5.0, 5.0, width, height);
        state
    }

    #[test]
    fn test_label_measure() {
        let label = Label::new("hello");
        assert_eq!(label.measure(&state(0.0, 0.0), Size::INFINITE), Size::new(40.0, 16.0));
    }

    #[test]
    fn test_default_hit_test_is_local_rect() {
        let state = state(10.0, 10.0);
        assert!(Blank.hit_test(&state, Point::new(9.0, 9.0)));
        assert!(!Blank.hit_test(&state, Point::new(10.0, 2.0)));
    }

    #[test]
    fn test_rectangle_properties() {
        let mut rect = Rectangle::default();

        let effect = rect.set_property("fill", &PropertyValue::Color(Color::BLACK)).unwrap();
        assert_eq!(effect, Some(Invalidation::VISUAL));
        assert_eq!(rect.fill, Color::BLACK);

        assert!(rect.set_property("fill", &PropertyValue::Bool(true)).is_err());
        assert_eq!(rect.set_property("text", &PropertyValue::from("x")).unwrap(), None);
    }

    #[test]
    fn test_downcast_through_visual() {
        let visual: Box<dyn Visual> = Box::new(Label::new("a"));
        assert_eq!((*visual).as_any().downcast_ref::<Label>().map(|l| l.text.as_str()), Some("a"));
        assert!((*visual).as_any().downcast_ref::<Blank>().is_none());
    }
}
