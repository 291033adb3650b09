//! # Trellis UI
//!
//! Retained-mode UI core driven by invalidation:
//! - Elements live in a generational arena; panels own their children
//! - Layout is recomputed per dirty panel, never per frame
//! - Each dirty window is painted at most once per frame
//! - The main loop blocks on the platform when nothing is dirty
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        SCHEDULER                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Platform msg → Window → Hit test / Focus → Element input    │
//! │        ↓                                          ↓          │
//! │  invalidate_layout / invalidate_visual / request_update      │
//! │        ↓                                                     │
//! │  update(): tasks → animations → disposal → layout → paint    │
//! │                                                   ↓          │
//! │                                             Renderer         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use trellis_ui::{
//!     ChannelMessageSource, HeadlessWindow, Length, NativeHandle, RecordingRenderer,
//!     Scheduler, SchedulerConfig, Size, SystemClock,
//! };
//!
//! let mut scheduler =
//!     Scheduler::new(ChannelMessageSource::new(), SystemClock, SchedulerConfig::default())?;
//! let window = scheduler.create_window(
//!     HeadlessWindow::new(NativeHandle(1), Size::new(200.0, 100.0)),
//!     RecordingRenderer::new(),
//! );
//!
//! let row = scheduler.create_element("HorizontalStack")?;
//! scheduler.add_child(window, row);
//! let label = scheduler.create_element("Label")?;
//! scheduler.set_property(label, "text", "Hello")?;
//! scheduler.set_property(label, "width", Length::Proportional(1.0))?;
//! scheduler.add_child(row, label);
//!
//! scheduler.update();
//! assert!(!scheduler.needs_update());
//! # Ok::<(), trellis_ui::UiError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod animation;
pub mod clock;
pub mod color;
pub mod config;
pub mod element;
pub mod error;
pub mod geometry;
pub mod input;
pub mod layout;
pub mod platform;
pub mod render;
pub mod scheduler;

pub use animation::{Animatable, Animation, AnimationId, AnimationTarget, Easing, Keyframe, Property, Repeat};
pub use clock::{Clock, ManualClock, SystemClock};
pub use color::Color;
pub use config::SchedulerConfig;
pub use element::{
    CollectionChange, CollectionEvent, CollectionPhase, Element, ElementId, ElementRegistry,
    ElementState, ElementTemplate, ElementTree, Invalidation, PropertyValue, Visual,
};
pub use error::{UiError, UiResult};
pub use geometry::{Point, Rect, Size, Thickness};
pub use input::{InputEvent, Key, Modifiers, MouseButton};
pub use layout::{Alignment, Direction, Length, PanelLayout};
pub use platform::{
    ChannelMessageSource, CursorIcon, HeadlessWindow, MessageSource, NativeHandle, PlatformError,
    PlatformMessage, WindowEvent, WindowImpl, Waker,
};
pub use render::{DrawCommand, PaintContext, RecordingRenderer, RenderLog, Renderer};
pub use scheduler::{FocusState, RemoteHandle, Scheduler, SchedulerStats, TaskToken, WindowNotification};
