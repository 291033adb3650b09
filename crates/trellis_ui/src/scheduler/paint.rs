//! Window painting.
//!
//! Children are painted bottom to top (reverse Z order) inside their
//! parent's offset, opacity, scroll and clip.

use tracing::trace;

use super::Scheduler;
use crate::element::{Element, ElementId, ElementTree};
use crate::geometry::Rect;
use crate::render::PaintContext;

impl Scheduler {
    /// Paints one window. The renderer is taken out of the window for the
    /// duration of the frame.
    pub(crate) fn render_window(&mut self, window: ElementId) {
        let Some(element) = self.tree.get_mut(window) else {
            return;
        };
        let size = element.state.size();
        let Some(state) = element.window_mut() else {
            return;
        };
        let background = state.background;
        let Some(mut renderer) = state.renderer.take() else {
            return;
        };

        renderer.begin_drawing(window, size);
        renderer.clear(background);
        {
            let mut ctx = PaintContext::new(renderer.as_mut());
            paint_element(&self.tree, window, &mut ctx);
            ctx.finish();
        }
        renderer.end_drawing();

        if let Some(state) = self.tree.get_mut(window).and_then(Element::window_mut) {
            state.renderer = Some(renderer);
        }
        self.stats.repaints += 1;
        trace!(window = ?window, repaints = self.stats.repaints, "window painted");
    }
}

fn paint_element(tree: &ElementTree, id: ElementId, ctx: &mut PaintContext<'_>) {
    let Some(element) = tree.get(id) else {
        return;
    };
    let state = &element.state;
    if !state.is_visible() || state.opacity <= 0.0 {
        return;
    }

    ctx.push_offset(state.rect.origin() + state.render_offset);
    ctx.push_opacity(state.opacity);
    element.visual.paint(state, ctx);

    if let Some(panel) = element.panel() {
        if panel.clip_children {
            ctx.push_clip(Rect::from_size(state.size()));
        }
        ctx.push_offset(-panel.scroll_offset());
        for child in panel.children().z_order().rev() {
            paint_element(tree, child, ctx);
        }
        ctx.pop_offset();
        if panel.clip_children {
            ctx.pop_clip();
        }
    }

    ctx.pop_opacity();
    ctx.pop_offset();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::color::Color;
    use crate::config::SchedulerConfig;
    use crate::geometry::{Point, Size};
    use crate::layout::PanelLayout;
    use crate::platform::{ChannelMessageSource, HeadlessWindow, NativeHandle};
    use crate::render::{DrawCommand, RecordingRenderer};

    #[test]
    fn test_paint_order_follows_z() {
        let mut scheduler =
            Scheduler::new(ChannelMessageSource::new(), ManualClock::new(), SchedulerConfig::default()).unwrap();
        let renderer = RecordingRenderer::new();
        let log = renderer.log();
        let window = scheduler.create_window(HeadlessWindow::new(NativeHandle(1), Size::new(50.0, 50.0)), renderer);

        let red = scheduler.create_element("Rectangle").unwrap();
        scheduler.set_property(red, "fill", Color::rgb(1.0, 0.0, 0.0)).unwrap();
        scheduler.set_property(red, "z_index", 1.0_f32).unwrap();
        let blue = scheduler.create_element("Rectangle").unwrap();
        scheduler.set_property(blue, "fill", Color::rgb(0.0, 0.0, 1.0)).unwrap();
        scheduler.add_child(window, red);
        scheduler.add_child(window, blue);
        scheduler.update();

        let log = log.lock();
        let fills: Vec<Color> = log
            .last_frame()
            .unwrap()
            .commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::FillRect { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        // Blue first, red (higher z) painted over it
        assert_eq!(fills, vec![Color::rgb(0.0, 0.0, 1.0), Color::rgb(1.0, 0.0, 0.0)]);
    }

    #[test]
    fn test_scroll_and_clip_applied() {
        let mut scheduler =
            Scheduler::new(ChannelMessageSource::new(), ManualClock::new(), SchedulerConfig::default()).unwrap();
        let renderer = RecordingRenderer::new();
        let log = renderer.log();
        let window = scheduler.create_window(HeadlessWindow::new(NativeHandle(1), Size::new(50.0, 50.0)), renderer);

        let panel = scheduler.create_panel(PanelLayout::default());
        scheduler.set_property(panel, "clip_children", true).unwrap();
        scheduler.set_property(panel, "scrollable", true).unwrap();
        scheduler.set_property(panel, "margin", 10.0_f32).unwrap();
        scheduler.add_child(window, panel);
        let content = scheduler.create_element("Rectangle").unwrap();
        scheduler.set_property(content, "height", 100.0_f32).unwrap();
        scheduler.add_child(panel, content);
        scheduler.update();

        assert!(scheduler.scroll_panel_to(panel, Point::new(0.0, 20.0)));
        scheduler.update();

        let log = log.lock();
        let commands = &log.last_frame().unwrap().commands;
        assert!(commands.contains(&DrawCommand::PushClip {
            bounds: Rect::new(10.0, 10.0, 30.0, 30.0),
        }));
        assert!(commands.iter().any(|command| matches!(
            command,
            DrawCommand::FillRect { bounds, .. } if *bounds == Rect::new(10.0, -10.0, 30.0, 100.0)
        )));
    }
}
