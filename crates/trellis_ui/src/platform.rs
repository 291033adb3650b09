//! Platform contract: the message source and the native window.
//!
//! The scheduler needs three primitives from the platform layer:
//!
//! 1. pump exactly one pending message without blocking
//! 2. block until a message arrives or a wake/timer fires
//! 3. arm a one-shot timer
//!
//! plus a [`Waker`] that other threads may use to interrupt the blocking
//! wait. [`ChannelMessageSource`] and [`HeadlessWindow`] implement the
//! contract without any native windowing system.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use thiserror::Error;

use crate::geometry::Size;
use crate::input::InputEvent;

/// A failed native call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The message source has no producers left.
    #[error("message source disconnected")]
    Disconnected,

    /// The native API reported an error.
    #[error("native error {code}: {message}")]
    Native {
        /// Platform error code.
        code: i32,
        /// Platform error description.
        message: String,
    },
}

impl PlatformError {
    /// Builds a native error.
    #[must_use]
    pub fn native(code: i32, message: impl Into<String>) -> Self {
        Self::Native {
            code,
            message: message.into(),
        }
    }
}

/// Identifies one native surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

/// Pointer shape requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CursorIcon {
    /// Default arrow.
    #[default]
    Arrow,
    /// Pointing hand (links, buttons).
    Hand,
    /// Text insertion beam.
    Text,
    /// Horizontal resize.
    ResizeHorizontal,
    /// Vertical resize.
    ResizeVertical,
    /// Busy.
    Wait,
}

/// Events targeting one native window.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    /// Client area changed size.
    Resized(Size),
    /// Window gained (`true`) or lost (`false`) keyboard focus.
    FocusChanged(bool),
    /// User input.
    Input(InputEvent),
    /// The user asked to close the window.
    CloseRequested,
    /// The native surface is gone.
    Destroyed,
}

/// A message produced by the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformMessage {
    /// An event for a window.
    Window {
        /// Native surface the event belongs to.
        handle: NativeHandle,
        /// The event.
        event: WindowEvent,
    },
    /// Cross-thread wake-up; carries no work by itself.
    Wake,
    /// The armed one-shot timer fired.
    Timer,
    /// Leave the main loop.
    Quit,
}

/// Interrupts a blocking [`MessageSource::wait`] from any thread.
///
/// Waking never touches scheduler state; it only posts a signal into the
/// platform's event source.
#[derive(Clone)]
pub struct Waker {
    wake: Arc<dyn Fn() + Send + Sync>,
}

impl Waker {
    /// Wraps a platform-specific wake primitive.
    pub fn new(wake: impl Fn() + Send + Sync + 'static) -> Self {
        Self { wake: Arc::new(wake) }
    }

    /// Posts the wake signal.
    pub fn wake_up(&self) {
        (self.wake)();
    }
}

impl std::fmt::Debug for Waker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waker").finish_non_exhaustive()
    }
}

/// The native event source the scheduler drives.
pub trait MessageSource {
    /// Returns one pending message without blocking.
    fn pump_one(&mut self) -> Option<PlatformMessage>;

    /// Blocks until a message arrives, a wake is posted or the timer fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the native source can no longer deliver messages.
    fn wait(&mut self) -> Result<PlatformMessage, PlatformError>;

    /// Arms a one-shot timer, replacing any earlier one.
    fn arm_timer(&mut self, after: Duration);

    /// Returns a thread-safe handle that interrupts [`MessageSource::wait`].
    fn waker(&self) -> Waker;
}

/// In-process message source backed by a crossbeam channel.
///
/// Other threads (or tests) inject platform messages through
/// [`ChannelMessageSource::poster`].
pub struct ChannelMessageSource {
    receiver: Receiver<PlatformMessage>,
    sender: Sender<PlatformMessage>,
    /// Deadline of the armed one-shot timer.
    timer: Option<Instant>,
}

impl ChannelMessageSource {
    /// Creates a source with an unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            receiver,
            sender,
            timer: None,
        }
    }

    /// Returns a sender for injecting messages from any thread.
    #[must_use]
    pub fn poster(&self) -> Sender<PlatformMessage> {
        self.sender.clone()
    }

    /// Returns true if a timer is armed.
    #[must_use]
    pub fn timer_armed(&self) -> bool {
        self.timer.is_some()
    }
}

impl Default for ChannelMessageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSource for ChannelMessageSource {
    fn pump_one(&mut self) -> Option<PlatformMessage> {
        if let Ok(message) = self.receiver.try_recv() {
            return Some(message);
        }
        // An expired timer counts as a pending message.
        if self.timer.is_some_and(|deadline| Instant::now() >= deadline) {
            self.timer = None;
            return Some(PlatformMessage::Timer);
        }
        None
    }

    fn wait(&mut self) -> Result<PlatformMessage, PlatformError> {
        let Some(deadline) = self.timer else {
            return self.receiver.recv().map_err(|_| PlatformError::Disconnected);
        };

        match self.receiver.recv_deadline(deadline) {
            Ok(message) => Ok(message),
            Err(RecvTimeoutError::Timeout) => {
                self.timer = None;
                Ok(PlatformMessage::Timer)
            }
            Err(RecvTimeoutError::Disconnected) => Err(PlatformError::Disconnected),
        }
    }

    fn arm_timer(&mut self, after: Duration) {
        self.timer = Some(Instant::now() + after);
    }

    fn waker(&self) -> Waker {
        let sender = self.sender.clone();
        Waker::new(move || {
            // The receiver lives as long as the source; a failed send means
            // the loop is gone and there is nobody left to wake.
            let _ = sender.send(PlatformMessage::Wake);
        })
    }
}

/// Native window operations the core relies on.
pub trait WindowImpl {
    /// The native surface handle.
    fn handle(&self) -> NativeHandle;

    /// Current client area size.
    fn client_size(&self) -> Size;

    /// Makes the window visible.
    ///
    /// # Errors
    ///
    /// Returns the native failure.
    fn show(&mut self) -> Result<(), PlatformError>;

    /// Hides the window.
    ///
    /// # Errors
    ///
    /// Returns the native failure.
    fn hide(&mut self) -> Result<(), PlatformError>;

    /// Sets the title bar text.
    ///
    /// # Errors
    ///
    /// Returns the native failure.
    fn set_title(&mut self, title: &str) -> Result<(), PlatformError>;

    /// Grabs or releases the pointer.
    ///
    /// # Errors
    ///
    /// Returns the native failure.
    fn set_capture(&mut self, captured: bool) -> Result<(), PlatformError>;

    /// Changes the pointer shape.
    ///
    /// # Errors
    ///
    /// Returns the native failure.
    fn set_cursor(&mut self, cursor: CursorIcon) -> Result<(), PlatformError>;

    /// Destroys the native surface.
    ///
    /// # Errors
    ///
    /// Returns the native failure.
    fn destroy(&mut self) -> Result<(), PlatformError>;
}

/// Observable state of a [`HeadlessWindow`].
#[derive(Debug, Clone, Default)]
pub struct HeadlessWindowState {
    /// Client area size.
    pub size: Size,
    /// Visible flag.
    pub visible: bool,
    /// Title text.
    pub title: String,
    /// Pointer captured.
    pub captured: bool,
    /// Last cursor set.
    pub cursor: CursorIcon,
    /// `destroy` was called.
    pub destroyed: bool,
    /// Make `set_cursor` fail, to exercise best-effort paths.
    pub fail_cursor: bool,
}

/// A window with no native surface.
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    handle: NativeHandle,
    state: Arc<Mutex<HeadlessWindowState>>,
}

impl HeadlessWindow {
    /// Creates a hidden headless window.
    #[must_use]
    pub fn new(handle: NativeHandle, size: Size) -> Self {
        Self {
            handle,
            state: Arc::new(Mutex::new(HeadlessWindowState {
                size,
                ..HeadlessWindowState::default()
            })),
        }
    }

    /// Shared view of the window state.
    #[must_use]
    pub fn state(&self) -> Arc<Mutex<HeadlessWindowState>> {
        Arc::clone(&self.state)
    }
}

impl WindowImpl for HeadlessWindow {
    fn handle(&self) -> NativeHandle {
        self.handle
    }

    fn client_size(&self) -> Size {
        self.state.lock().size
    }

    fn show(&mut self) -> Result<(), PlatformError> {
        self.state.lock().visible = true;
        Ok(())
    }

    fn hide(&mut self) -> Result<(), PlatformError> {
        self.state.lock().visible = false;
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<(), PlatformError> {
        title.clone_into(&mut self.state.lock().title);
        Ok(())
    }

    fn set_capture(&mut self, captured: bool) -> Result<(), PlatformError> {
        self.state.lock().captured = captured;
        Ok(())
    }

    fn set_cursor(&mut self, cursor: CursorIcon) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        if state.fail_cursor {
            return Err(PlatformError::native(-1, "cursor unavailable"));
        }
        state.cursor = cursor;
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.destroyed = true;
        state.visible = false;
        Ok(())
    }
}
