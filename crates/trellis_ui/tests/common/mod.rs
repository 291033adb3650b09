//! Shared fixture: a scheduler driving one headless window.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use trellis_ui::platform::HeadlessWindowState;
use trellis_ui::{
    ChannelMessageSource, ElementId, HeadlessWindow, InputEvent, ManualClock, NativeHandle,
    PlatformMessage, RecordingRenderer, RenderLog, Scheduler, SchedulerConfig, Size, WindowEvent,
};

/// Native handle of the harness window.
pub const NATIVE: NativeHandle = NativeHandle(1);

pub struct Harness {
    pub scheduler: Scheduler,
    pub clock: ManualClock,
    /// Injects platform messages.
    pub poster: Sender<PlatformMessage>,
    pub window: ElementId,
    pub native: Arc<Mutex<HeadlessWindowState>>,
    pub frames: Arc<Mutex<RenderLog>>,
}

impl Harness {
    pub fn new(size: Size) -> Self {
        Self::with_config(size, SchedulerConfig::default())
    }

    pub fn with_config(size: Size, config: SchedulerConfig) -> Self {
        let source = ChannelMessageSource::new();
        let poster = source.poster();
        let clock = ManualClock::new();
        let mut scheduler = Scheduler::new(source, clock.clone(), config).unwrap();

        let native = HeadlessWindow::new(NATIVE, size);
        let native_state = native.state();
        let renderer = RecordingRenderer::new();
        let frames = renderer.log();
        let window = scheduler.create_window(native, renderer);
        scheduler.show_window(window).unwrap();
        scheduler.update();

        Self {
            scheduler,
            clock,
            poster,
            window,
            native: native_state,
            frames,
        }
    }

    /// Moves time forward and runs one update.
    pub fn tick(&mut self, by: Duration) {
        self.clock.advance(by);
        self.scheduler.update();
    }

    /// Ticks at 60 Hz while there is work, at most `limit` times.
    pub fn settle(&mut self, limit: usize) -> usize {
        let mut ticks = 0;
        while self.scheduler.needs_update() && ticks < limit {
            self.tick(Duration::from_millis(16));
            ticks += 1;
        }
        ticks
    }

    pub fn send(&mut self, event: WindowEvent) {
        self.scheduler.dispatch_message(PlatformMessage::Window { handle: NATIVE, event });
    }

    pub fn input(&mut self, event: InputEvent) {
        self.send(WindowEvent::Input(event));
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().frames_for(self.window)
    }

    pub fn element(&mut self, type_name: &str, parent: ElementId) -> ElementId {
        let id = self.scheduler.create_element(type_name).unwrap();
        self.scheduler.add_child(parent, id);
        id
    }
}
