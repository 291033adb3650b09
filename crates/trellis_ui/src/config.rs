//! # Scheduler Configuration
//!
//! Tunables loaded once at startup, usually from a TOML file.
//!
//! ```toml
//! max_messages_per_tick = 32
//! animation_lookahead_ms = 8
//! ```
//!
//! Every field is optional; missing fields keep their defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{UiError, UiResult};

/// Scheduler and input tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Upper bound of platform messages drained after one active update,
    /// so a message flood cannot starve rendering.
    pub max_messages_per_tick: usize,
    /// Animations due within this window keep the scheduler active.
    pub animation_lookahead_ms: u64,
    /// Layout passes allowed in one `update_invalid_layout` call before the
    /// tree is declared non-converging.
    pub max_layout_passes: usize,
    /// Leave the main loop once the last window is destroyed.
    pub quit_when_last_window_closes: bool,
    /// Maximum delay between two presses counted as a double click.
    pub double_click_ms: u64,
    /// Maximum pointer travel between two presses counted as a double click.
    pub double_click_distance: f32,
    /// Exponential decay rate of kinetic scroll velocity, per second.
    pub kinetic_decay: f32,
    /// Kinetic scrolling stops below this speed (pixels per second).
    pub kinetic_min_velocity: f32,
    /// Wheel delta to initial kinetic velocity factor.
    pub wheel_velocity_scale: f32,
}

impl SchedulerConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::Config`] if the text is not valid TOML or a field
    /// has the wrong type.
    pub fn from_toml_str(text: &str) -> UiResult<Self> {
        toml::from_str(text).map_err(|err| UiError::Config(err.to_string()))
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`UiError::Io`] if the file cannot be read and
    /// [`UiError::Config`] if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> UiResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Look-ahead window as a duration.
    #[must_use]
    pub const fn animation_lookahead(&self) -> Duration {
        Duration::from_millis(self.animation_lookahead_ms)
    }

    /// Double-click delay as a duration.
    #[must_use]
    pub const fn double_click_time(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_messages_per_tick: 64,
            animation_lookahead_ms: 5,
            max_layout_passes: 10_000,
            quit_when_last_window_closes: true,
            double_click_ms: 300,
            double_click_distance: 5.0,
            kinetic_decay: 4.0,
            kinetic_min_velocity: 10.0,
            wheel_velocity_scale: 20.0,
        }
    }
}
