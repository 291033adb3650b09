//! # UI Error Types
//!
//! Recoverable failures of the toolkit core.
//!
//! Caller defects (inserting an element twice, popping an empty clip stack,
//! unregistering a running task) are not represented here: they are fatal
//! assertions.

use thiserror::Error;

use crate::element::ElementId;
use crate::platform::PlatformError;

/// Errors that can occur in the toolkit core.
#[derive(Error, Debug)]
pub enum UiError {
    /// No element template is registered under this name.
    #[error("unknown element type: {0}")]
    UnknownElementType(String),

    /// Neither the core nor the element's visual knows this property.
    #[error("element {element:?} has no property `{name}`")]
    UnknownProperty {
        /// The element the property was set on.
        element: ElementId,
        /// The property name.
        name: String,
    },

    /// The property exists but the value has the wrong kind.
    #[error("property `{name}` expects {expected}")]
    InvalidPropertyValue {
        /// The property name.
        name: String,
        /// Human-readable description of the accepted value kind.
        expected: &'static str,
    },

    /// The element does not exist (disposed or never created).
    #[error("element {0:?} does not exist")]
    StaleElement(ElementId),

    /// A scheduler is already active on the current thread.
    #[error("a scheduler is already active on this thread")]
    SchedulerAlreadyActive,

    /// A native platform call failed.
    #[error("platform call `{operation}` failed: {source}")]
    Platform {
        /// The operation that was attempted.
        operation: &'static str,
        /// The underlying platform failure.
        #[source]
        source: PlatformError,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading a configuration file failed.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for toolkit operations.
pub type UiResult<T> = Result<T, UiError>;
