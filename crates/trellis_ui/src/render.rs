//! Rendering contract and paint-time helpers.
//!
//! The core never draws anything itself. It decides *when* a window is
//! painted (at most once per frame) and walks the tree through a
//! [`PaintContext`], which forwards window-space primitives to a
//! [`Renderer`] supplied by the backend.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::color::Color;
use crate::element::ElementId;
use crate::geometry::{Point, Rect, Size};

/// A rendering backend bound to one window.
///
/// All coordinates are window coordinates.
pub trait Renderer {
    /// Starts a frame for the window.
    fn begin_drawing(&mut self, window: ElementId, size: Size);

    /// Finishes and presents the frame.
    fn end_drawing(&mut self);

    /// Fills the whole surface.
    fn clear(&mut self, color: Color);

    /// Fills a rectangle.
    fn fill_rect(&mut self, bounds: Rect, color: Color);

    /// Outlines a rectangle.
    fn stroke_rect(&mut self, bounds: Rect, color: Color, width: f32);

    /// Draws a run of text with its top-left corner at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point, color: Color);

    /// Restricts drawing to `bounds` until the matching `pop_clip`.
    fn push_clip(&mut self, bounds: Rect);

    /// Removes the innermost clip.
    fn pop_clip(&mut self);
}

/// Paint-time state threaded through the element tree.
///
/// Keeps a translation stack (local to window coordinates), an opacity
/// stack and a clip stack. Every push must be matched by a pop before the
/// frame ends; an unmatched pop is a caller defect and panics.
pub struct PaintContext<'a> {
    renderer: &'a mut dyn Renderer,
    /// Cumulative translations.
    offsets: Vec<Point>,
    /// Cumulative opacities.
    opacities: Vec<f32>,
    /// Intersected clip rectangles in window coordinates.
    clips: Vec<Rect>,
}

impl<'a> PaintContext<'a> {
    /// Wraps a renderer for one frame.
    pub fn new(renderer: &'a mut dyn Renderer) -> Self {
        Self {
            renderer,
            offsets: Vec::with_capacity(16),
            opacities: Vec::with_capacity(16),
            clips: Vec::with_capacity(16),
        }
    }

    /// Current local-to-window translation.
    #[must_use]
    pub fn offset(&self) -> Point {
        self.offsets.last().copied().unwrap_or(Point::ZERO)
    }

    /// Current opacity multiplier.
    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.opacities.last().copied().unwrap_or(1.0)
    }

    /// Returns the current clip rect in window coordinates.
    #[must_use]
    pub fn current_clip(&self) -> Option<Rect> {
        self.clips.last().copied()
    }

    /// Translates subsequent drawing by `by`.
    pub fn push_offset(&mut self, by: Point) {
        let next = self.offset() + by;
        self.offsets.push(next);
    }

    /// Pops the innermost translation.
    ///
    /// # Panics
    ///
    /// Panics if there is no matching `push_offset`.
    pub fn pop_offset(&mut self) {
        assert!(self.offsets.pop().is_some(), "pop_offset without matching push_offset");
    }

    /// Multiplies subsequent drawing opacity by `opacity`.
    pub fn push_opacity(&mut self, opacity: f32) {
        let next = self.opacity() * opacity.clamp(0.0, 1.0);
        self.opacities.push(next);
    }

    /// Pops the innermost opacity.
    ///
    /// # Panics
    ///
    /// Panics if there is no matching `push_opacity`.
    pub fn pop_opacity(&mut self) {
        assert!(self.opacities.pop().is_some(), "pop_opacity without matching push_opacity");
    }

    /// Pushes a clip rect given in local coordinates.
    pub fn push_clip(&mut self, local: Rect) {
        let bounds = local.translate(self.offset());
        // Intersect with current clip if any
        let actual = match self.clips.last() {
            Some(current) => current.intersection(&bounds).unwrap_or(Rect::ZERO),
            None => bounds,
        };

        self.clips.push(actual);
        self.renderer.push_clip(actual);
    }

    /// Pops the innermost clip rect.
    ///
    /// # Panics
    ///
    /// Panics if there is no matching `push_clip`.
    pub fn pop_clip(&mut self) {
        assert!(self.clips.pop().is_some(), "pop_clip without matching push_clip");
        self.renderer.pop_clip();
    }

    /// Fills a local rectangle.
    pub fn fill_rect(&mut self, local: Rect, color: Color) {
        let bounds = local.translate(self.offset());
        let color = color.fade(self.opacity());
        self.renderer.fill_rect(bounds, color);
    }

    /// Outlines a local rectangle.
    pub fn stroke_rect(&mut self, local: Rect, color: Color, width: f32) {
        let bounds = local.translate(self.offset());
        let color = color.fade(self.opacity());
        self.renderer.stroke_rect(bounds, color, width);
    }

    /// Draws text at a local position.
    pub fn draw_text(&mut self, text: &str, local: Point, color: Color) {
        let origin = local + self.offset();
        let color = color.fade(self.opacity());
        self.renderer.draw_text(text, origin, color);
    }

    /// Ends painting.
    ///
    /// # Panics
    ///
    /// Panics if any offset, opacity or clip push is still unmatched.
    pub fn finish(self) {
        assert!(self.offsets.is_empty(), "unbalanced offset stack at end of frame");
        assert!(self.opacities.is_empty(), "unbalanced opacity stack at end of frame");
        assert!(self.clips.is_empty(), "unbalanced clip stack at end of frame");
    }
}

/// A recorded drawing primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Surface clear.
    Clear(Color),
    /// Filled rectangle.
    FillRect {
        /// Bounds.
        bounds: Rect,
        /// Fill color.
        color: Color,
    },
    /// Rectangle outline.
    StrokeRect {
        /// Bounds.
        bounds: Rect,
        /// Stroke color.
        color: Color,
        /// Line width.
        width: f32,
    },
    /// Text.
    Text {
        /// Text content.
        text: String,
        /// Top-left corner.
        origin: Point,
        /// Text color.
        color: Color,
    },
    /// Scissor rect (clip children).
    PushClip {
        /// Clip bounds.
        bounds: Rect,
    },
    /// Pop scissor rect.
    PopClip,
}

/// One presented frame.
#[derive(Debug, Clone)]
pub struct RecordedFrame {
    /// The window that was painted.
    pub window: ElementId,
    /// Surface size at the time of painting.
    pub size: Size,
    /// Commands in submission order.
    pub commands: Vec<DrawCommand>,
}

/// Frames presented by a [`RecordingRenderer`].
///
/// Keeps the most recent `capacity` frames; counters cover every frame
/// presented since the last [`RenderLog::clear`].
#[derive(Debug)]
pub struct RenderLog {
    frames: VecDeque<RecordedFrame>,
    capacity: usize,
    presented: usize,
    per_window: HashMap<ElementId, usize>,
}

impl Default for RenderLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl RenderLog {
    /// Frames retained by default.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a log retaining at most `capacity` frames (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity,
            presented: 0,
            per_window: HashMap::new(),
        }
    }

    fn push(&mut self, frame: RecordedFrame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.presented += 1;
        *self.per_window.entry(frame.window).or_default() += 1;
        self.frames.push_back(frame);
    }

    /// Retained frames, oldest first.
    pub fn frames(&self) -> impl DoubleEndedIterator<Item = &RecordedFrame> + '_ {
        self.frames.iter()
    }

    /// Total number of presented frames, including evicted ones.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.presented
    }

    /// Number of frames presented for one window, including evicted ones.
    #[must_use]
    pub fn frames_for(&self, window: ElementId) -> usize {
        self.per_window.get(&window).copied().unwrap_or(0)
    }

    /// The most recent frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.frames.back()
    }

    /// Forgets all frames and resets the counters.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.presented = 0;
        self.per_window.clear();
    }
}

/// Renderer that records commands instead of drawing.
///
/// Serves as the headless backend and as a test double. The log is shared
/// so it can be inspected after the renderer was handed to a window, and
/// only retains the most recent frames.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    log: Arc<Mutex<RenderLog>>,
    current: Option<RecordedFrame>,
}

impl RecordingRenderer {
    /// Creates a renderer with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer whose log retains at most `capacity` frames.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            log: Arc::new(Mutex::new(RenderLog::with_capacity(capacity))),
            current: None,
        }
    }

    /// Returns the shared frame log.
    #[must_use]
    pub fn log(&self) -> Arc<Mutex<RenderLog>> {
        Arc::clone(&self.log)
    }

    fn record(&mut self, command: DrawCommand) {
        let frame = self
            .current
            .as_mut()
            .expect("drawing outside begin_drawing/end_drawing");
        frame.commands.push(command);
    }
}

impl Renderer for RecordingRenderer {
    fn begin_drawing(&mut self, window: ElementId, size: Size) {
        assert!(self.current.is_none(), "begin_drawing called twice without end_drawing");
        self.current = Some(RecordedFrame {
            window,
            size,
            commands: Vec::with_capacity(64),
        });
    }

    fn end_drawing(&mut self) {
        let frame = self.current.take().expect("end_drawing without begin_drawing");
        self.log.lock().push(frame);
    }

    fn clear(&mut self, color: Color) {
        self.record(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, bounds: Rect, color: Color) {
        self.record(DrawCommand::FillRect { bounds, color });
    }

    fn stroke_rect(&mut self, bounds: Rect, color: Color, width: f32) {
        self.record(DrawCommand::StrokeRect { bounds, color, width });
    }

    fn draw_text(&mut self, text: &str, origin: Point, color: Color) {
        self.record(DrawCommand::Text {
            text: text.to_owned(),
            origin,
            color,
        });
    }

    fn push_clip(&mut self, bounds: Rect) {
        self.record(DrawCommand::PushClip { bounds });
    }

    fn pop_clip(&mut self) {
        self.record(DrawCommand::PopClip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::Handle;

    fn window() -> ElementId {
        ElementId::from_handle(Handle::new(0, 0))
    }

    #[test]
    fn test_renderer_frame() {
        let mut renderer = RecordingRenderer::new();
        let log = renderer.log();

        renderer.begin_drawing(window(), Size::new(100.0, 50.0));
        renderer.fill_rect(Rect::new(0.0, 0.0, 100.0, 50.0), Color::WHITE);
        renderer.end_drawing();

        let log = log.lock();
        assert_eq!(log.frame_count(), 1);
        assert_eq!(log.frames().next().unwrap().commands.len(), 1);
    }

    #[test]
    fn test_log_keeps_recent_frames_and_counts_all() {
        let mut renderer = RecordingRenderer::with_capacity(2);
        let log = renderer.log();

        for width in [1.0, 2.0, 3.0] {
            renderer.begin_drawing(window(), Size::new(width, 1.0));
            renderer.end_drawing();
        }

        let mut log = log.lock();
        assert_eq!(log.frame_count(), 3);
        assert_eq!(log.frames_for(window()), 3);
        let sizes: Vec<f32> = log.frames().map(|frame| frame.size.width).collect();
        assert_eq!(sizes, vec![2.0, 3.0]);
        assert_eq!(log.last_frame().map(|frame| frame.size.width), Some(3.0));

        log.clear();
        assert_eq!(log.frame_count(), 0);
        assert!(log.frames().next().is_none());
    }

    #[test]
    fn test_paint_context_translates_and_fades() {
        let mut renderer = RecordingRenderer::new();
        let log = renderer.log();
        renderer.begin_drawing(window(), Size::new(100.0, 100.0));
        {
            let mut ctx = PaintContext::new(&mut renderer);
            ctx.push_offset(Point::new(10.0, 20.0));
            ctx.push_opacity(0.5);
            ctx.fill_rect(Rect::new(1.0, 1.0, 5.0, 5.0), Color::WHITE);
            ctx.pop_opacity();
            ctx.pop_offset();
            ctx.finish();
        }
        renderer.end_drawing();

        let log = log.lock();
        assert_eq!(
            log.frames().next().unwrap().commands[0],
            DrawCommand::FillRect {
                bounds: Rect::new(11.0, 21.0, 5.0, 5.0),
                color: Color::WHITE.with_alpha(0.5),
            }
        );
    }

    #[test]
    fn test_clip_stack_intersects() {
        let mut renderer = RecordingRenderer::new();
        renderer.begin_drawing(window(), Size::new(100.0, 100.0));
        let mut ctx = PaintContext::new(&mut renderer);

        ctx.push_clip(Rect::new(0.0, 0.0, 100.0, 100.0));
        ctx.push_clip(Rect::new(50.0, 50.0, 100.0, 100.0));
        assert_eq!(ctx.current_clip(), Some(Rect::new(50.0, 50.0, 50.0, 50.0)));

        ctx.pop_clip();
        ctx.pop_clip();
        assert!(ctx.current_clip().is_none());
        ctx.finish();
    }

    #[test]
    #[should_panic(expected = "pop_clip without matching push_clip")]
    fn test_unmatched_pop_clip_panics() {
        let mut renderer = RecordingRenderer::new();
        renderer.begin_drawing(window(), Size::ZERO);
        let mut ctx = PaintContext::new(&mut renderer);
        ctx.pop_clip();
    }

    #[test]
    #[should_panic(expected = "unbalanced offset stack")]
    fn test_unbalanced_offset_panics_at_finish() {
        let mut renderer = RecordingRenderer::new();
        let mut ctx = PaintContext::new(&mut renderer);
        ctx.push_offset(Point::new(1.0, 1.0));
        ctx.finish();
    }
}
