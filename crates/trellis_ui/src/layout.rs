//! Panel layout: measuring and arranging the children of one panel.
//!
//! Layout is recomputed per panel, never per child, since siblings share
//! the panel's client region. Along a stack's main axis:
//!
//! 1. fixed and automatic requests are granted first, in logical order,
//!    each clamped to what remains
//! 2. proportional weights share the remaining *whole* pixels
//! 3. leftover pixels go one by one to proportional children in logical
//!    order
//!
//! so the allocations never exceed the available space and the remainder
//! is assigned deterministically.

use crate::element::{ElementId, ElementTree};
use crate::geometry::{Rect, Size, Thickness};

/// Requested size along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Length {
    /// Size to content.
    #[default]
    Auto,
    /// Exact size in pixels.
    Fixed(f32),
    /// Share of the space left after fixed and automatic siblings.
    Proportional(f32),
}

/// Layout direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Horizontal (left to right).
    #[default]
    Horizontal,
    /// Vertical (top to bottom).
    Vertical,
}

/// Layout alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Align to start (left/top).
    #[default]
    Start,
    /// Align to center.
    Center,
    /// Align to end (right/bottom).
    End,
    /// Stretch to fill available space.
    Stretch,
}

/// How a panel arranges its children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelLayout {
    /// Every child gets the whole client region.
    Overlay {
        /// Placement of children smaller than the region.
        alignment: Alignment,
    },
    /// Children follow each other along one axis.
    Stack {
        /// Main axis.
        direction: Direction,
        /// Gap between visible children.
        spacing: f32,
        /// Placement on the cross axis.
        cross_alignment: Alignment,
    },
}

impl PanelLayout {
    /// A stack with no spacing that stretches children across.
    #[must_use]
    pub const fn stack(direction: Direction) -> Self {
        Self::Stack {
            direction,
            spacing: 0.0,
            cross_alignment: Alignment::Stretch,
        }
    }
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self::Overlay {
            alignment: Alignment::Stretch,
        }
    }
}

/// A main-axis request, margin included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotRequest {
    /// Exact pixels (fixed or measured).
    Fixed(f32),
    /// Proportional weight.
    Proportional(f32),
}

/// Splits `available` pixels among `requests`.
#[must_use]
pub fn allocate(available: f32, requests: &[SlotRequest]) -> Vec<f32> {
    let mut sizes = vec![0.0; requests.len()];
    let mut remaining = available.max(0.0);
    let mut total_weight = 0.0;

    for (size, request) in sizes.iter_mut().zip(requests) {
        match *request {
            SlotRequest::Fixed(px) => {
                *size = px.max(0.0).min(remaining);
                remaining -= *size;
            }
            SlotRequest::Proportional(weight) => total_weight += weight.max(0.0),
        }
    }

    if total_weight <= 0.0 {
        return sizes;
    }

    let pool = remaining.floor();
    let mut assigned = 0.0;
    for (size, request) in sizes.iter_mut().zip(requests) {
        if let SlotRequest::Proportional(weight) = *request {
            *size = (pool * weight.max(0.0) / total_weight).floor();
            assigned += *size;
        }
    }

    // Flooring loses less than one pixel per child, so one round suffices.
    let mut leftover = pool - assigned;
    for (size, request) in sizes.iter_mut().zip(requests) {
        if leftover < 1.0 {
            break;
        }
        if matches!(*request, SlotRequest::Proportional(weight) if weight > 0.0) {
            *size += 1.0;
            leftover -= 1.0;
        }
    }

    sizes
}

/// Per-axis accessors so stacks are written once for both directions.
fn main(size: Size, direction: Direction) -> f32 {
    match direction {
        Direction::Horizontal => size.width,
        Direction::Vertical => size.height,
    }
}

fn cross(size: Size, direction: Direction) -> f32 {
    match direction {
        Direction::Horizontal => size.height,
        Direction::Vertical => size.width,
    }
}

fn from_axes(main: f32, cross: f32, direction: Direction) -> Size {
    match direction {
        Direction::Horizontal => Size::new(main, cross),
        Direction::Vertical => Size::new(cross, main),
    }
}

/// Places a box on one axis; returns (offset, size).
fn place(extent: f32, margins: (f32, f32), desired: f32, length: Length, alignment: Alignment) -> (f32, f32) {
    let available = (extent - margins.0 - margins.1).max(0.0);
    let size = match length {
        Length::Fixed(px) => px.max(0.0).min(available),
        Length::Proportional(_) => available,
        Length::Auto if alignment == Alignment::Stretch => available,
        Length::Auto => desired.min(available),
    };
    let offset = match alignment {
        Alignment::Start | Alignment::Stretch => 0.0,
        Alignment::Center => (available - size) * 0.5,
        Alignment::End => available - size,
    };
    (margins.0 + offset, size)
}

/// Combines children's outer sizes into a panel's content size.
fn combine(layout: PanelLayout, outer: &[Size]) -> Size {
    match layout {
        PanelLayout::Overlay { .. } => outer.iter().fold(Size::ZERO, |acc, size| acc.max(*size)),
        PanelLayout::Stack {
            direction, spacing, ..
        } => {
            let main_total: f32 = outer.iter().map(|size| main(*size, direction)).sum();
            let cross_max = outer
                .iter()
                .map(|size| cross(*size, direction))
                .fold(0.0, f32::max);
            // Child count is bounded by practical panel sizes.
            #[allow(clippy::cast_precision_loss)]
            let gaps = outer.len().saturating_sub(1) as f32 * spacing;
            from_axes(main_total + gaps, cross_max, direction)
        }
    }
}

fn apply_fixed(content: Size, width: Length, height: Length) -> Size {
    Size::new(
        match width {
            Length::Fixed(px) => px,
            _ => content.width,
        },
        match height {
            Length::Fixed(px) => px,
            _ => content.height,
        },
    )
}

/// Measures an element (recursively for panels) and caches the result.
///
/// A cached result is reused while the available size is unchanged and no
/// layout invalidation reached the element.
///
/// Returns the desired content size, margin excluded.
pub(crate) fn measure(tree: &mut ElementTree, id: ElementId, available: Size) -> Size {
    let Some(element) = tree.get(id) else {
        return Size::ZERO;
    };
    if element.state.measure_valid && element.state.measured_with == available {
        return element.state.desired_size;
    }
    let params = element.state.layout;

    let desired = if element.state.is_visible() {
        let constrained = Size::new(
            match params.width {
                Length::Fixed(px) => px,
                _ => available.width,
            },
            match params.height {
                Length::Fixed(px) => px,
                _ => available.height,
            },
        );

        let content = match element.panel() {
            Some(panel) => {
                let layout = panel.layout;
                let padding = panel.padding;
                let children = panel.children().logical().to_vec();
                let inner = constrained.deflate(padding);
                let outer = measure_children(tree, &children, inner);
                combine(layout, &outer).inflate(padding)
            }
            None => element.visual.measure(&element.state, constrained),
        };
        apply_fixed(content, params.width, params.height)
    } else {
        Size::ZERO
    };

    if let Some(element) = tree.get_mut(id) {
        element.state.desired_size = desired;
        element.state.measured_with = available;
        element.state.measure_valid = true;
    }
    desired
}

/// Measures children and returns the outer (margin-inclusive) sizes of the
/// visible ones.
fn measure_children(tree: &mut ElementTree, children: &[ElementId], inner: Size) -> Vec<Size> {
    let mut outer = Vec::with_capacity(children.len());
    for &child in children {
        let Some((visible, margin)) = tree
            .get(child)
            .map(|element| (element.state.is_visible(), element.state.layout.margin))
        else {
            continue;
        };
        let desired = measure(tree, child, inner.deflate(margin));
        if visible {
            outer.push(desired.inflate(margin));
        }
    }
    outer
}

/// What one panel arrangement changed.
#[derive(Debug, Default)]
pub(crate) struct ArrangeOutcome {
    /// Child panels whose size changed; their own children need layout.
    pub resized: Vec<ElementId>,
    /// Children whose rectangle changed.
    pub moved: Vec<ElementId>,
    /// The panel is auto-sized and its desired size changed, so its parent
    /// must re-layout too.
    pub desired_changed: bool,
}

struct ChildInfo {
    id: ElementId,
    visible: bool,
    desired: Size,
    margin: Thickness,
    width: Length,
    height: Length,
}

/// Recomputes the rectangles of a panel's immediate children.
pub(crate) fn arrange_panel(tree: &mut ElementTree, panel_id: ElementId) -> ArrangeOutcome {
    let mut outcome = ArrangeOutcome::default();
    let Some(element) = tree.get(panel_id) else {
        return outcome;
    };
    let Some(panel) = element.panel() else {
        return outcome;
    };
    let layout = panel.layout;
    let padding = panel.padding;
    let scrollable = panel.scrollable;
    let children = panel.children().logical().to_vec();
    let params = element.state.layout;
    let old_desired = element.state.desired_size;
    let cascades = element.state.parent.is_some() && params.is_auto_sized() && element.state.is_visible();
    let client = Rect::from_size(element.state.size()).deflate(padding);

    // Measure with the real client region; the result also yields this
    // panel's own desired size for the upward cascade.
    let outer = measure_children(tree, &children, client.size());
    if cascades {
        let desired = apply_fixed(combine(layout, &outer).inflate(padding), params.width, params.height);
        if desired != old_desired {
            tree.invalidate_measure(panel_id);
            if let Some(element) = tree.get_mut(panel_id) {
                element.state.desired_size = desired;
            }
            outcome.desired_changed = true;
        }
    }

    // Scrollable panels give their children the full desired extent.
    let arrange_client = if scrollable {
        Rect::from_origin_size(client.origin(), client.size().max(combine(layout, &outer)))
    } else {
        client
    };

    let infos: Vec<ChildInfo> = children
        .iter()
        .filter_map(|&id| {
            let state = &tree.get(id)?.state;
            Some(ChildInfo {
                id,
                visible: state.is_visible(),
                desired: state.desired_size,
                margin: state.layout.margin,
                width: state.layout.width,
                height: state.layout.height,
            })
        })
        .collect();

    let rects = match layout {
        PanelLayout::Overlay { alignment } => arrange_overlay(arrange_client, &infos, alignment),
        PanelLayout::Stack {
            direction,
            spacing,
            cross_alignment,
        } => arrange_stack(arrange_client, &infos, direction, spacing, cross_alignment),
    };

    let mut extent = Size::ZERO;
    for (info, rect) in infos.iter().zip(rects) {
        if info.visible {
            extent = extent.max(Size::new(
                rect.right() + info.margin.right - client.x,
                rect.bottom() + info.margin.bottom - client.y,
            ));
        }

        let Some(child) = tree.get_mut(info.id) else {
            continue;
        };
        if child.state.rect == rect {
            continue;
        }
        let resized = child.state.rect.size() != rect.size();
        child.state.rect = rect;
        outcome.moved.push(info.id);
        if resized && child.is_panel() {
            outcome.resized.push(info.id);
        }
    }

    if let Some(panel) = tree.panel_mut(panel_id) {
        panel.content_size = extent;
        let max = panel.max_scroll(client.size().inflate(padding));
        panel.scroll_offset.x = panel.scroll_offset.x.clamp(0.0, max.x);
        panel.scroll_offset.y = panel.scroll_offset.y.clamp(0.0, max.y);
    }

    outcome
}

fn collapsed(client: Rect) -> Rect {
    Rect::new(client.x, client.y, 0.0, 0.0)
}

fn arrange_overlay(client: Rect, children: &[ChildInfo], alignment: Alignment) -> Vec<Rect> {
    children
        .iter()
        .map(|child| {
            if !child.visible {
                return collapsed(client);
            }
            let (x, width) = place(
                client.width,
                (child.margin.left, child.margin.right),
                child.desired.width,
                child.width,
                alignment,
            );
            let (y, height) = place(
                client.height,
                (child.margin.top, child.margin.bottom),
                child.desired.height,
                child.height,
                alignment,
            );
            Rect::new(client.x + x, client.y + y, width, height)
        })
        .collect()
}

/// (main, cross) length requests.
fn axis_lengths(child: &ChildInfo, direction: Direction) -> (Length, Length) {
    match direction {
        Direction::Horizontal => (child.width, child.height),
        Direction::Vertical => (child.height, child.width),
    }
}

/// (main, cross) margin pairs, leading edge first.
fn axis_margins(margin: Thickness, direction: Direction) -> ((f32, f32), (f32, f32)) {
    match direction {
        Direction::Horizontal => ((margin.left, margin.right), (margin.top, margin.bottom)),
        Direction::Vertical => ((margin.top, margin.bottom), (margin.left, margin.right)),
    }
}

fn arrange_stack(
    client: Rect,
    children: &[ChildInfo],
    direction: Direction,
    spacing: f32,
    cross_alignment: Alignment,
) -> Vec<Rect> {
    let visible: Vec<&ChildInfo> = children.iter().filter(|child| child.visible).collect();
    let requests: Vec<SlotRequest> = visible
        .iter()
        .map(|child| {
            let ((before, after), _) = axis_margins(child.margin, direction);
            match axis_lengths(child, direction).0 {
                Length::Fixed(px) => SlotRequest::Fixed(px + before + after),
                Length::Auto => SlotRequest::Fixed(main(child.desired, direction) + before + after),
                Length::Proportional(weight) => SlotRequest::Proportional(weight),
            }
        })
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let gaps = visible.len().saturating_sub(1) as f32 * spacing;
    let client_size = client.size();
    let slots = allocate(main(client_size, direction) - gaps, &requests);

    let mut slots = slots.into_iter();
    let mut cursor = 0.0;
    children
        .iter()
        .map(|child| {
            if !child.visible {
                return collapsed(client);
            }
            let slot = slots.next().unwrap_or(0.0);
            let ((before, after), cross_margins) = axis_margins(child.margin, direction);
            let main_offset = cursor + before;
            let main_size = (slot - before - after).max(0.0);
            cursor += slot + spacing;

            let (cross_offset, cross_size) = place(
                cross(client_size, direction),
                cross_margins,
                cross(child.desired, direction),
                axis_lengths(child, direction).1,
                cross_alignment,
            );

            let size = from_axes(main_size, cross_size, direction);
            let offset = from_axes(main_offset, cross_offset, direction);
            Rect::new(client.x + offset.width, client.y + offset.height, size.width, size.height)
        })
        .collect()
}
