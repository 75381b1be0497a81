//! Declarative gesture construction.
//!
//! A [`GestureModel`] builds gestures the way a UI description declares
//! them: each `create_*` call opens a gesture, the `set_*` calls configure the
//! innermost open one, and [`GestureModel::pop`] closes it. Gestures opened
//! while a group is open become that group's children.
//!
//! ```
//! use horizon_gesture::{GestureModel, GroupMode, PanDirection};
//!
//! let mut model = GestureModel::new();
//! model.create_group(GroupMode::Exclusive);
//! model.create_tap(2, 1, None).set_on_action(|event| println!("double tap x{}", event.repeat));
//! model.pop().unwrap();
//! model.create_pan(1, PanDirection::HORIZONTAL, None);
//! model.pop().unwrap();
//! model.pop().unwrap();
//!
//! let gestures = model.take_gestures().unwrap();
//! assert_eq!(gestures.len(), 1);
//! ```

use std::sync::Arc;
use std::time::Duration;

use horizon_gesture_core::logging::targets;
use horizon_gesture_core::{GestureConfig, GestureError, Result};
use parking_lot::Mutex;

use crate::event::GestureEvent;
use crate::group::GroupMode;
use crate::recognizer::{
    GestureCallbacks, GestureInfo, GestureMask, GesturePolicy, GesturePriority, JudgeResult,
    LongPressRecognizer, PanDirection, PanGestureOption, PanRecognizer, PinchRecognizer,
    Recognizer, RotationRecognizer, SwipeDirection, SwipeRecognizer, TapRecognizer,
};

/// A group before it is handed to the event manager.
#[derive(Debug)]
pub struct GroupSpec {
    pub mode: GroupMode,
    pub children: Vec<Recognizer>,
    pub priority: GesturePriority,
    pub policy: GesturePolicy,
    pub mask: GestureMask,
}

impl GroupSpec {
    pub fn new(mode: GroupMode, children: Vec<Recognizer>) -> Self {
        Self {
            mode,
            children,
            priority: GesturePriority::default(),
            policy: GesturePolicy::default(),
            mask: GestureMask::default(),
        }
    }
}

/// A finished gesture ready to be attached to a node.
#[derive(Debug)]
pub enum BuiltGesture {
    Single(Recognizer),
    Group(GroupSpec),
}

impl From<Recognizer> for BuiltGesture {
    fn from(recognizer: Recognizer) -> Self {
        Self::Single(recognizer)
    }
}

impl From<GroupSpec> for BuiltGesture {
    fn from(spec: GroupSpec) -> Self {
        Self::Group(spec)
    }
}

#[derive(Debug)]
enum Frame {
    Single(Recognizer),
    Group(GroupSpec),
}

/// Builder stack for gestures.
#[derive(Debug, Default)]
pub struct GestureModel {
    config: GestureConfig,
    stack: Vec<Frame>,
    built: Vec<BuiltGesture>,
}

impl GestureModel {
    /// A model using the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A model using `config` for every threshold left unspecified.
    pub fn with_config(config: GestureConfig) -> Self {
        Self {
            config,
            stack: Vec::new(),
            built: Vec::new(),
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Gestures are still open.
    pub fn is_building(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Open a pan. `distance` defaults to the configured touch threshold.
    pub fn create_pan(
        &mut self,
        fingers: usize,
        direction: PanDirection,
        distance: Option<f32>,
    ) -> &mut Self {
        let distance = distance.unwrap_or(self.config.pan_distance);
        let kind = PanRecognizer::new(direction, distance, self.config.pan_mouse_distance);
        self.open(Recognizer::new(kind, fingers, &self.config))
    }

    /// Open a pan driven by a shared option. Later changes to the option
    /// apply while the pan is not yet recognized.
    pub fn create_pan_with_option(&mut self, option: PanGestureOption) -> &mut Self {
        let fingers = option.fingers();
        let kind = PanRecognizer::with_option(option, self.config.pan_mouse_distance);
        self.open(Recognizer::new(kind, fingers, &self.config))
    }

    /// Open a tap of `count` taps. `distance` defaults to the configured slop.
    pub fn create_tap(&mut self, count: u32, fingers: usize, distance: Option<f32>) -> &mut Self {
        let slop = distance.unwrap_or(self.config.tap_slop);
        let kind = TapRecognizer::new(count, slop, self.config.multi_tap_interval());
        self.open(Recognizer::new(kind, fingers, &self.config))
    }

    /// Open a long press. `duration` defaults to the configured hold time.
    pub fn create_long_press(
        &mut self,
        fingers: usize,
        repeat: bool,
        duration: Option<Duration>,
    ) -> &mut Self {
        let duration = duration.unwrap_or(self.config.long_press_duration());
        let kind = LongPressRecognizer::new(duration, repeat, self.config.long_press_slop);
        self.open(Recognizer::new(kind, fingers, &self.config))
    }

    pub fn create_pinch(&mut self, fingers: usize, distance: Option<f32>) -> &mut Self {
        let kind = PinchRecognizer::new(distance.unwrap_or(self.config.pinch_distance));
        self.open(Recognizer::new(kind, fingers, &self.config))
    }

    pub fn create_rotation(&mut self, fingers: usize, angle: Option<f32>) -> &mut Self {
        let kind = RotationRecognizer::new(angle.unwrap_or(self.config.rotation_angle));
        self.open(Recognizer::new(kind, fingers, &self.config))
    }

    pub fn create_swipe(
        &mut self,
        fingers: usize,
        direction: SwipeDirection,
        speed: Option<f32>,
    ) -> &mut Self {
        let kind = SwipeRecognizer::new(direction, speed.unwrap_or(self.config.swipe_speed));
        self.open(Recognizer::new(kind, fingers, &self.config))
    }

    /// Open a group. Gestures created until the matching [`pop`](Self::pop)
    /// become its children.
    pub fn create_group(&mut self, mode: GroupMode) -> &mut Self {
        self.stack.push(Frame::Group(GroupSpec::new(mode, Vec::new())));
        self
    }

    pub fn set_on_start(
        &mut self,
        f: impl Fn(&GestureEvent) + Send + Sync + 'static,
    ) -> &mut Self {
        self.with_callbacks(|callbacks| {
            callbacks.on_start.connect(f);
        })
    }

    pub fn set_on_update(
        &mut self,
        f: impl Fn(&GestureEvent) + Send + Sync + 'static,
    ) -> &mut Self {
        self.with_callbacks(|callbacks| {
            callbacks.on_update.connect(f);
        })
    }

    pub fn set_on_end(&mut self, f: impl Fn(&GestureEvent) + Send + Sync + 'static) -> &mut Self {
        self.with_callbacks(|callbacks| {
            callbacks.on_end.connect(f);
        })
    }

    pub fn set_on_cancel(
        &mut self,
        f: impl Fn(&GestureEvent) + Send + Sync + 'static,
    ) -> &mut Self {
        self.with_callbacks(|callbacks| {
            callbacks.on_cancel.connect(f);
        })
    }

    pub fn set_on_action(
        &mut self,
        f: impl Fn(&GestureEvent) + Send + Sync + 'static,
    ) -> &mut Self {
        self.with_callbacks(|callbacks| {
            callbacks.on_action.connect(f);
        })
    }

    /// Install a judge on the innermost open recognizer.
    pub fn set_judge(
        &mut self,
        judge: impl Fn(&GestureInfo, &GestureEvent) -> JudgeResult + Send + Sync + 'static,
    ) -> &mut Self {
        if let Some(Frame::Single(recognizer)) = self.stack.last_mut() {
            recognizer.set_judge(Arc::new(judge));
        } else {
            tracing::debug!(target: targets::MODEL, "judge ignored: no open gesture");
        }
        self
    }

    pub fn set_priority(&mut self, priority: GesturePriority) -> &mut Self {
        match self.stack.last_mut() {
            Some(Frame::Single(recognizer)) => recognizer.set_priority(priority),
            Some(Frame::Group(group)) => group.priority = priority,
            None => {}
        }
        self
    }

    pub fn set_policy(&mut self, policy: GesturePolicy) -> &mut Self {
        match self.stack.last_mut() {
            Some(Frame::Single(recognizer)) => recognizer.set_policy(policy),
            Some(Frame::Group(group)) => group.policy = policy,
            None => {}
        }
        self
    }

    pub fn set_mask(&mut self, mask: GestureMask) -> &mut Self {
        match self.stack.last_mut() {
            Some(Frame::Single(recognizer)) => recognizer.set_mask(mask),
            Some(Frame::Group(group)) => group.mask = mask,
            None => {}
        }
        self
    }

    /// Let mouse input drive the innermost open recognizer (or forbid it).
    pub fn set_allow_mouse(&mut self, allow: bool) -> &mut Self {
        if let Some(Frame::Single(recognizer)) = self.stack.last_mut() {
            recognizer.set_allow_mouse(allow);
        }
        self
    }

    /// Close the innermost open gesture.
    ///
    /// A closed recognizer joins the enclosing group, if any; otherwise it is
    /// a top-level gesture. Closing a group with no children is an error, as
    /// is popping with nothing open or closing a group inside another.
    pub fn pop(&mut self) -> Result<&mut Self> {
        let frame = self.stack.pop().ok_or(GestureError::UnbalancedPop)?;
        let built = match frame {
            Frame::Single(recognizer) => BuiltGesture::Single(recognizer),
            Frame::Group(group) if group.children.is_empty() => {
                return Err(GestureError::EmptyGroup);
            }
            Frame::Group(group) => BuiltGesture::Group(group),
        };
        match (self.stack.last_mut(), built) {
            (Some(Frame::Group(parent)), BuiltGesture::Single(recognizer)) => {
                parent.children.push(recognizer);
            }
            (Some(Frame::Group(_)), BuiltGesture::Group(_)) => {
                return Err(GestureError::NestedGroup);
            }
            // Only groups have children.
            (Some(Frame::Single(_)) | None, built) => self.built.push(built),
        }
        Ok(self)
    }

    /// Hand over every closed top-level gesture.
    pub fn take_gestures(&mut self) -> Result<Vec<BuiltGesture>> {
        if !self.stack.is_empty() {
            return Err(GestureError::UnclosedGesture {
                open: self.stack.len(),
            });
        }
        Ok(std::mem::take(&mut self.built))
    }

    /// Drop everything built or open.
    pub fn clear(&mut self) {
        self.stack.clear();
        self.built.clear();
    }

    fn open(&mut self, recognizer: Recognizer) -> &mut Self {
        tracing::trace!(
            target: targets::MODEL,
            gesture = ?recognizer.gesture_type(),
            depth = self.stack.len(),
            "gesture opened"
        );
        self.stack.push(Frame::Single(recognizer));
        self
    }

    fn with_callbacks(&mut self, f: impl FnOnce(&GestureCallbacks)) -> &mut Self {
        if let Some(Frame::Single(recognizer)) = self.stack.last() {
            f(recognizer.callbacks());
        } else {
            tracing::debug!(
                target: targets::MODEL,
                "callback ignored: no open gesture"
            );
        }
        self
    }
}

static GLOBAL_MODEL: Mutex<Option<GestureModel>> = Mutex::new(None);

/// Run `f` against the process-wide model, creating it on first use.
///
/// Prefer an owned [`GestureModel`]; the shared one exists for declarative
/// front ends that have no place to keep a builder.
pub fn with_global_model<R>(f: impl FnOnce(&mut GestureModel) -> R) -> R {
    let mut guard = GLOBAL_MODEL.lock();
    f(guard.get_or_insert_with(GestureModel::new))
}
