//! Core systems for Horizon Gesture.
//!
//! This crate provides the foundations the gesture engine is built on:
//!
//! - **Node arena**: stable [`NodeId`]s, hit testing and coordinate transforms
//!   for the tree gestures are attached to
//! - **Geometry**: [`Point`], [`Size`], [`Rect`]
//! - **Signals**: [`Signal`] callbacks used for gesture lifecycle notifications
//! - **Configuration**: [`GestureConfig`] thresholds loaded from TOML
//! - **Errors**: [`GestureError`] for setup operations
//! - **Logging**: `tracing` targets and helper macros
//!
//! # Example
//!
//! ```
//! use horizon_gesture_core::{NodeTree, Point, Rect};
//!
//! let mut tree = NodeTree::new();
//! let root = tree.create_root(Rect::new(0.0, 0.0, 100.0, 100.0));
//! let button = tree.create_child(root, Rect::new(10.0, 10.0, 30.0, 30.0)).unwrap();
//!
//! assert_eq!(tree.touch_test(Point::new(20.0, 20.0)), vec![button, root]);
//! assert_eq!(tree.to_local(button, Point::new(20.0, 20.0)), Some(Point::new(10.0, 10.0)));
//! ```

pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod node;
pub mod signal;

pub use config::GestureConfig;
pub use error::{GestureError, Result};
pub use geometry::{Point, Rect, Size};
pub use logging::PerfSpan;
pub use node::{HitTestMode, HitTestResult, NodeId, NodeTree};
pub use signal::{ConnectionId, Signal};
