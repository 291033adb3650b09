//! Element factory and property entry points.
//!
//! The arrangement loader builds trees from data: it creates elements by
//! registered type name and sets properties by name. Core properties are
//! handled here; anything else is forwarded to the element's visual.

use std::collections::HashMap;

use super::{Blank, Element, ElementFlags, Invalidation, Label, Rectangle, Visual};
use crate::color::Color;
use crate::error::{UiError, UiResult};
use crate::geometry::{Point, Thickness};
use crate::layout::{Alignment, Direction, Length, PanelLayout};

/// A dynamically typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Number.
    Number(f32),
    /// Text.
    Text(String),
    /// Color.
    Color(Color),
    /// Size request.
    Length(Length),
    /// Flag.
    Bool(bool),
    /// Edge widths.
    Thickness(Thickness),
    /// Point or offset.
    Point(Point),
}

impl PropertyValue {
    fn invalid(name: &str, expected: &'static str) -> UiError {
        UiError::InvalidPropertyValue {
            name: name.to_owned(),
            expected,
        }
    }

    /// Reads a number.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidPropertyValue`] for other kinds.
    pub fn as_number(&self, name: &str) -> UiResult<f32> {
        match *self {
            Self::Number(value) => Ok(value),
            _ => Err(Self::invalid(name, "a number")),
        }
    }

    /// Reads a flag.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidPropertyValue`] for other kinds.
    pub fn as_bool(&self, name: &str) -> UiResult<bool> {
        match *self {
            Self::Bool(value) => Ok(value),
            _ => Err(Self::invalid(name, "a boolean")),
        }
    }

    /// Reads text.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidPropertyValue`] for other kinds.
    pub fn as_text(&self, name: &str) -> UiResult<&str> {
        match self {
            Self::Text(value) => Ok(value),
            _ => Err(Self::invalid(name, "text")),
        }
    }

    /// Reads a color.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidPropertyValue`] for other kinds.
    pub fn as_color(&self, name: &str) -> UiResult<Color> {
        match *self {
            Self::Color(value) => Ok(value),
            _ => Err(Self::invalid(name, "a color")),
        }
    }

    /// Reads a length; a plain number is a fixed length.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidPropertyValue`] for other kinds.
    pub fn as_length(&self, name: &str) -> UiResult<Length> {
        match *self {
            Self::Length(value) => Ok(value),
            Self::Number(value) => Ok(Length::Fixed(value)),
            _ => Err(Self::invalid(name, "a length")),
        }
    }

    /// Reads a thickness; a plain number is uniform.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::InvalidPropertyValue`] for other kinds.
    pub fn as_thickness(&self, name: &str) -> UiResult<Thickness> {
        match *self {
            Self::Thickness(value) => Ok(value),
            Self::Number(value) => Ok(Thickness::uniform(value)),
            _ => Err(Self::invalid(name, "a thickness")),
        }
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Color> for PropertyValue {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

impl From<Length> for PropertyValue {
    fn from(value: Length) -> Self {
        Self::Length(value)
    }
}

impl From<Thickness> for PropertyValue {
    fn from(value: Thickness) -> Self {
        Self::Thickness(value)
    }
}

impl From<Point> for PropertyValue {
    fn from(value: Point) -> Self {
        Self::Point(value)
    }
}

/// Builds the visual of a registered element type.
pub struct ElementTemplate {
    build: Box<dyn Fn() -> Box<dyn Visual>>,
    /// Panel arrangement; `None` builds a leaf.
    panel: Option<PanelLayout>,
}

impl ElementTemplate {
    /// A leaf element type.
    pub fn leaf(build: impl Fn() -> Box<dyn Visual> + 'static) -> Self {
        Self {
            build: Box::new(build),
            panel: None,
        }
    }

    /// A panel element type.
    pub fn panel(layout: PanelLayout, build: impl Fn() -> Box<dyn Visual> + 'static) -> Self {
        Self {
            build: Box::new(build),
            panel: Some(layout),
        }
    }

    /// Creates a fresh visual.
    #[must_use]
    pub fn build(&self) -> Box<dyn Visual> {
        (self.build)()
    }

    /// Panel arrangement of this type, if it is a panel.
    #[must_use]
    pub fn panel_layout(&self) -> Option<PanelLayout> {
        self.panel
    }
}

impl std::fmt::Debug for ElementTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementTemplate")
            .field("panel", &self.panel)
            .finish_non_exhaustive()
    }
}

/// Element types known to a scheduler, by name.
#[derive(Debug)]
pub struct ElementRegistry {
    templates: HashMap<&'static str, ElementTemplate>,
}

impl ElementRegistry {
    /// Creates a registry holding the built-in types.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("Element", ElementTemplate::leaf(|| Box::new(Blank)));
        registry.register("Rectangle", ElementTemplate::leaf(|| Box::new(Rectangle::default())));
        registry.register("Label", ElementTemplate::leaf(|| Box::new(Label::default())));
        registry.register(
            "Panel",
            ElementTemplate::panel(
                PanelLayout::Overlay {
                    alignment: Alignment::Stretch,
                },
                || Box::new(Blank),
            ),
        );
        registry.register(
            "HorizontalStack",
            ElementTemplate::panel(PanelLayout::stack(Direction::Horizontal), || Box::new(Blank)),
        );
        registry.register(
            "VerticalStack",
            ElementTemplate::panel(PanelLayout::stack(Direction::Vertical), || Box::new(Blank)),
        );
        registry
    }

    /// Creates a registry without any types.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            templates: HashMap::with_capacity(16),
        }
    }

    /// Registers (or replaces) a type.
    pub fn register(&mut self, name: &'static str, template: ElementTemplate) {
        self.templates.insert(name, template);
    }

    /// Returns true if a type is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Looks up a type, returning its canonical name and template.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<(&'static str, &ElementTemplate)> {
        self.templates
            .get_key_value(name)
            .map(|(&name, template)| (name, template))
    }

    /// Registered type names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.templates.keys().copied()
    }
}

impl Default for ElementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies a property every element understands.
///
/// Returns `Ok(None)` for names the core does not handle. `z_index` is
/// not handled here because it re-sorts the parent's collection.
pub(crate) fn apply_core_property(
    element: &mut Element,
    name: &str,
    value: &PropertyValue,
) -> UiResult<Option<Invalidation>> {
    let state = &mut element.state;

    let invalidation = match name {
        "width" => {
            state.layout.width = value.as_length(name)?;
            Invalidation::LAYOUT
        }
        "height" => {
            state.layout.height = value.as_length(name)?;
            Invalidation::LAYOUT
        }
        "margin" => {
            state.layout.margin = value.as_thickness(name)?;
            Invalidation::LAYOUT
        }
        "visible" => {
            state.flags.assign(ElementFlags::VISIBLE, value.as_bool(name)?);
            Invalidation::LAYOUT
        }
        "enabled" => {
            state.flags.assign(ElementFlags::ENABLED, value.as_bool(name)?);
            Invalidation::VISUAL
        }
        "focusable" => {
            state.flags.assign(ElementFlags::FOCUSABLE, value.as_bool(name)?);
            Invalidation::NONE
        }
        "opacity" => {
            state.opacity = value.as_number(name)?.clamp(0.0, 1.0);
            Invalidation::VISUAL
        }
        "padding" | "spacing" | "focus_scope" | "scrollable" | "clip_children" => {
            let Some(panel) = element.panel_mut() else {
                return Ok(None);
            };
            match name {
                "padding" => panel.padding = value.as_thickness(name)?,
                "spacing" => match &mut panel.layout {
                    PanelLayout::Stack { spacing, .. } => *spacing = value.as_number(name)?,
                    PanelLayout::Overlay { .. } => return Ok(None),
                },
                "focus_scope" => {
                    panel.focus_scope = value.as_bool(name)?;
                    if !panel.focus_scope {
                        panel.scope_focus = None;
                    }
                    return Ok(Some(Invalidation::NONE));
                }
                "scrollable" => panel.scrollable = value.as_bool(name)?,
                _ => {
                    panel.clip_children = value.as_bool(name)?;
                    return Ok(Some(Invalidation::VISUAL));
                }
            }
            Invalidation::LAYOUT
        }
        _ => return Ok(None),
    };
    Ok(Some(invalidation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, ElementTree, PanelState};

    #[test]
    fn test_builtin_types() {
        let registry = ElementRegistry::new();
        for name in ["Element", "Rectangle", "Label", "Panel", "HorizontalStack", "VerticalStack"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(registry.get("Button").is_none());

        let (name, template) = registry.get("Label").unwrap();
        assert_eq!(name, "Label");
        assert!(template.panel_layout().is_none());
        assert!((*template.build()).as_any().is::<Label>());
    }

    #[test]
    fn test_core_properties() {
        let mut tree = ElementTree::new();
        let id = tree.insert("Element", Box::new(Blank), ElementKind::Leaf);
        let element = tree.get_mut(id).unwrap();

        let effect = apply_core_property(element, "width", &PropertyValue::from(50.0_f32)).unwrap();
        assert_eq!(effect, Some(Invalidation::LAYOUT));
        assert_eq!(element.state.layout.width, Length::Fixed(50.0));

        apply_core_property(element, "visible", &false.into()).unwrap();
        assert!(!element.state.is_visible());

        assert!(apply_core_property(element, "opacity", &"half".into()).is_err());
        // Panel-only properties are unknown on leaves
        assert_eq!(apply_core_property(element, "padding", &4.0_f32.into()).unwrap(), None);
        assert_eq!(apply_core_property(element, "text", &"x".into()).unwrap(), None);
    }

    #[test]
    fn test_panel_properties() {
        let mut tree = ElementTree::new();
        let id = tree.insert(
            "VerticalStack",
            Box::new(Blank),
            ElementKind::Panel(PanelState::new(PanelLayout::stack(Direction::Vertical))),
        );
        let element = tree.get_mut(id).unwrap();

        apply_core_property(element, "spacing", &6.0_f32.into()).unwrap();
        apply_core_property(element, "padding", &2.0_f32.into()).unwrap();
        apply_core_property(element, "focus_scope", &true.into()).unwrap();

        let panel = element.panel().unwrap();
        assert!(matches!(panel.layout, PanelLayout::Stack { spacing, .. } if spacing == 6.0));
        assert_eq!(panel.padding, Thickness::uniform(2.0));
        assert!(panel.is_focus_scope());
    }
}
