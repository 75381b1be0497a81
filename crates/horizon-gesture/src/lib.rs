//! Horizon Gesture - gesture recognition and arbitration for node trees.
//!
//! Recognizers for pan, tap, long press, pinch, rotation and swipe watch the
//! pointer streams hitting the node they are attached to. When several of
//! them could claim the same stream, the referee decides which one wins
//! according to priority, policy and the order in which they become sure.
//!
//! - [`GestureModel`] declares gestures and groups.
//! - [`EventManager`] owns the node tree, hit tests input and runs arbitration.
//! - [`platform`] converts winit events into [`TouchSample`]s and [`AxisSample`]s.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use horizon_gesture::{EventManager, GestureModel, PanDirection, Rect, TouchSample};
//!
//! let mut manager = EventManager::new();
//! let root = manager.tree_mut().create_root(Rect::new(0.0, 0.0, 300.0, 300.0));
//!
//! let mut model = GestureModel::new();
//! model
//!     .create_pan(1, PanDirection::HORIZONTAL, None)
//!     .set_on_update(|event| println!("dragged by {:?}", event.offset));
//! model.pop().unwrap();
//! manager.attach(root, &mut model).unwrap();
//!
//! let start = Instant::now();
//! manager.dispatch_touch(&TouchSample::down(1, 10.0, 10.0, start));
//! manager.dispatch_touch(&TouchSample::moved(1, 40.0, 10.0, start + Duration::from_millis(16)));
//! manager.dispatch_touch(&TouchSample::up(1, 40.0, 10.0, start + Duration::from_millis(32)));
//! ```

pub use horizon_gesture_core::*;

pub mod arena;
pub mod event;
pub mod group;
pub mod hub;
pub mod manager;
pub mod model;
pub mod platform;
pub mod post_event;
pub mod recognizer;
pub mod referee;
pub mod touch_points;
pub mod velocity;

pub use arena::{GestureArena, GestureHandle};
pub use event::{
    AxisPhase, AxisSample, FingerInfo, GestureAction, GestureEvent, InputEventType,
    KeyboardModifiers, SourceTool, SourceType, TouchKind, TouchSample,
};
pub use group::{GestureGroup, GroupId, GroupMode};
pub use hub::{GestureEventHub, InputEventHub, Mutation, MutationQueue};
pub use manager::EventManager;
pub use model::{BuiltGesture, GestureModel, GroupSpec, with_global_model};
pub use post_event::{PostEventAction, PostEventManager};
pub use recognizer::{
    GestureCallbacks, GestureInfo, GestureJudge, GestureKind, GestureMask, GesturePolicy,
    GesturePriority, GestureType, JudgeResult, LongPressRecognizer, PanDirection,
    PanGestureOption, PanRecognizer, PinchRecognizer, Recognizer, RecognizerId, RecognizerState,
    RotationRecognizer, SwipeDirection, SwipeRecognizer, TapRecognizer, Vote,
};
pub use referee::{GestureReferee, PointerKey, ScopeId, UnitStatus};
pub use touch_points::TouchPointRegistry;
pub use velocity::VelocityTracker;
