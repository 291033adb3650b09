//! # Memory Management
//!
//! Generational storage shared by the element tree and the task registry.
//!
//! - `Handle`: index + generation, stale handles never alias new values
//! - `Arena`: free-list slots with mark-then-collect removal

mod arena;
mod handle;

pub use arena::Arena;
pub use handle::Handle;
