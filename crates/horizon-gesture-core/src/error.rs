//! Error types for Horizon Gesture.
//!
//! Gesture dispatch itself never fails: rejected votes, missing nodes and
//! duplicate posted events resolve to well-defined states. These errors only
//! come out of setup operations such as loading configuration or attaching
//! gestures to nodes.

use std::path::PathBuf;

use crate::node::NodeId;

/// Result type alias for gesture setup operations.
pub type Result<T> = std::result::Result<T, GestureError>;

/// Errors that can occur while configuring the gesture system.
#[derive(Debug, thiserror::Error)]
pub enum GestureError {
    /// Failed to read a configuration file.
    #[error("Failed to read gesture config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`GestureConfig`](crate::GestureConfig).
    #[error("Gesture config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration value is out of range.
    #[error("Invalid value for gesture config field '{field}': {message}")]
    InvalidConfig { field: &'static str, message: String },

    /// The node does not exist (never created or already removed).
    #[error("Node {0:?} not found")]
    NodeNotFound(NodeId),

    /// A gesture group was closed without any child gesture.
    #[error("Gesture group has no children")]
    EmptyGroup,

    /// `pop()` was called with no gesture under construction.
    #[error("No gesture under construction to pop")]
    UnbalancedPop,

    /// A gesture group was closed inside another gesture group.
    #[error("Gesture groups cannot be nested")]
    NestedGroup,

    /// Gestures were taken from the builder while some were still open.
    #[error("{open} gesture(s) still under construction")]
    UnclosedGesture { open: usize },
}

impl GestureError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a config validation error.
    pub fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}
