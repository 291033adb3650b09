//! # Trellis Core
//!
//! Storage foundation for the trellis UI toolkit.
//!
//! ## Architecture Rules
//!
//! 1. **Handles, not pointers** - Back-references are generational handles
//! 2. **Two-phase removal** - Mark now, free during a dedicated pass
//! 3. **Stale handles are harmless** - They resolve to `None`
//!
//! ## Example
//!
//! ```rust
//! use trellis_core::Arena;
//!
//! let mut arena = Arena::new();
//! let id = arena.insert(42);
//! assert_eq!(arena.get(id), Some(&42));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;

pub use memory::{Arena, Handle};
