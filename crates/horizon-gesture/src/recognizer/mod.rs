//! Gesture recognizers.
//!
//! A [`Recognizer`] consumes raw [`TouchSample`]s and [`AxisSample`]s for the
//! node it is attached to and casts a [`Vote`] on each one. It never decides
//! on its own whether it wins: the referee answers every [`Vote::Accept`] with
//! [`Recognizer::on_accepted`] or [`Recognizer::on_rejected`].
//!
//! # State machine
//!
//! ```text
//! Ready ──(finger threshold met)──> Detecting ──(accepted)──> Succeed
//!   ^                                   │                        │
//!   │                               (rejected)                   │
//!   │                                   v                        │
//!   └───────────(pointers released / reset)── Fail <─────────────┘
//! ```
//!
//! Lifecycle callbacks ([`GestureCallbacks`]) fire only while in
//! [`RecognizerState::Succeed`]. Votes are only evaluated while
//! [`RecognizerState::Detecting`].
//!
//! The kind-specific behaviour lives in one struct per gesture kind, wrapped
//! in the closed [`GestureKind`] enum.

mod long_press;
mod pan;
mod pinch;
mod rotation;
mod swipe;
mod tap;

use std::sync::Arc;
use std::time::Instant;

use horizon_gesture_core::config::MAX_FINGERS;
use horizon_gesture_core::logging::targets;
use horizon_gesture_core::{GestureConfig, NodeId, Point, Signal};
use slotmap::new_key_type;

use crate::event::{
    AxisSample, GestureAction, GestureEvent, InputEventType, SourceType, TouchKind, TouchSample,
};
use crate::touch_points::TouchPointRegistry;
use crate::velocity::VelocityTracker;

pub use long_press::LongPressRecognizer;
pub use pan::{PanDirection, PanGestureOption, PanRecognizer};
pub use pinch::PinchRecognizer;
pub use rotation::RotationRecognizer;
pub use swipe::{SwipeDirection, SwipeRecognizer};
pub use tap::TapRecognizer;

new_key_type! {
    /// Stable handle of a recognizer owned by the event manager.
    pub struct RecognizerId;
}

/// Recognition state of a recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum RecognizerState {
    /// Waiting for enough pointers.
    #[default]
    Ready,
    /// Enough pointers are down; votes are being evaluated.
    Detecting,
    /// Won arbitration; lifecycle callbacks are firing.
    Succeed,
    /// Lost arbitration or gave up; silent until reset.
    Fail,
}

/// A recognizer's verdict on one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vote {
    /// The input is this recognizer's gesture.
    Accept,
    /// The input can never become this recognizer's gesture.
    Reject,
    /// Undecided; keep sending input.
    Pending,
}

/// The kind of gesture a recognizer detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureType {
    Pan,
    Tap,
    LongPress,
    Pinch,
    Rotation,
    Swipe,
}

impl GestureType {
    /// Continuous kinds report Start/Update/End; discrete kinds report Action.
    pub fn is_continuous(self) -> bool {
        matches!(self, Self::Pan | Self::Pinch | Self::Rotation)
    }
}

/// Priority level for gesture recognition.
///
/// An accept from a lower-priority gesture waits while a higher-priority
/// competitor is still undecided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum GesturePriority {
    /// Low priority - yields to everything else.
    Low = 0,
    /// Normal priority - default for most gestures.
    #[default]
    Normal = 1,
    /// High priority - never waits on other gestures.
    High = 2,
}

/// Policy for how a gesture interacts with its competitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GesturePolicy {
    /// Competes by priority; the first accept wins.
    #[default]
    Default,
    /// Accepting rejects every competitor regardless of priority.
    Exclusive,
    /// Accepts alongside competitors without rejecting them.
    Cooperative,
}

/// Which gestures a stream collects below this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureMask {
    /// Gestures on descendants compete normally.
    #[default]
    Normal,
    /// Gestures on descendant nodes are dropped from the stream.
    IgnoreInternal,
}

/// Verdict of a gesture judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JudgeResult {
    /// Let the accept proceed.
    Continue,
    /// Treat the accept as a reject.
    Reject,
}

/// Description of a recognizer handed to a gesture judge.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureInfo {
    pub gesture_type: GestureType,
    pub node: Option<NodeId>,
    pub fingers: usize,
    pub priority: GesturePriority,
    pub policy: GesturePolicy,
    pub input_type: InputEventType,
    pub source_type: SourceType,
}

/// A callback that may veto an accept before it commits.
pub type GestureJudge = Arc<dyn Fn(&GestureInfo, &GestureEvent) -> JudgeResult + Send + Sync>;

/// Lifecycle signals of one gesture.
#[derive(Debug, Default)]
pub struct GestureCallbacks {
    /// A continuous gesture was recognized.
    pub on_start: Signal<GestureEvent>,
    /// A continuous gesture progressed.
    pub on_update: Signal<GestureEvent>,
    /// A gesture finished normally.
    pub on_end: Signal<GestureEvent>,
    /// A recognized gesture was cancelled.
    pub on_cancel: Signal<GestureEvent>,
    /// A discrete gesture fired.
    pub on_action: Signal<GestureEvent>,
}

impl GestureCallbacks {
    fn signal(&self, action: GestureAction) -> &Signal<GestureEvent> {
        match action {
            GestureAction::Start => &self.on_start,
            GestureAction::Update => &self.on_update,
            GestureAction::End => &self.on_end,
            GestureAction::Cancel => &self.on_cancel,
            GestureAction::Action => &self.on_action,
        }
    }
}

/// State shared by every gesture kind.
#[derive(Debug)]
pub(crate) struct RecognizerCore {
    pub(crate) state: RecognizerState,
    pub(crate) points: TouchPointRegistry,
    pub(crate) velocity: VelocityTracker,
    pub(crate) fingers: usize,
    pub(crate) node: Option<NodeId>,
    pub(crate) allow_mouse: bool,
    pub(crate) callbacks: Arc<GestureCallbacks>,
    pub(crate) last_touch: Option<TouchSample>,
    pub(crate) last_axis: Option<AxisSample>,
    pub(crate) input_type: InputEventType,
    /// End (or Cancel) already reported for the current lifecycle.
    pub(crate) finished: bool,
    /// An accept was cast and the referee has not answered yet.
    pub(crate) accept_voted: bool,
    gesture_type: GestureType,
}

impl RecognizerCore {
    fn new(gesture_type: GestureType, fingers: usize, config: &GestureConfig) -> Self {
        Self {
            state: RecognizerState::Ready,
            points: TouchPointRegistry::new(),
            velocity: VelocityTracker::from_config(config),
            fingers,
            node: None,
            allow_mouse: !matches!(gesture_type, GestureType::Pinch | GestureType::Rotation),
            callbacks: Arc::new(GestureCallbacks::default()),
            last_touch: None,
            last_axis: None,
            input_type: InputEventType::Touch,
            finished: false,
            accept_voted: false,
            gesture_type,
        }
    }

    pub(crate) fn transition(&mut self, to: RecognizerState) {
        if self.state != to {
            tracing::trace!(
                target: targets::RECOGNIZER,
                gesture = ?self.gesture_type,
                node = ?self.node,
                from = ?self.state,
                ?to,
                "state transition"
            );
            self.state = to;
        }
    }

    /// Start tracking a pointer.
    pub(crate) fn track_down(&mut self, sample: &TouchSample) {
        self.points.insert(sample);
        self.velocity.reset(sample.id);
        self.velocity
            .update_touch_point(sample.id, sample.position, sample.time, false);
    }

    /// Record a move; `None` when the pointer is not ours.
    pub(crate) fn track_move(&mut self, sample: &TouchSample) -> Option<Point> {
        let delta = self.points.update(sample)?;
        self.velocity
            .update_touch_point(sample.id, sample.position, sample.time, false);
        Some(delta)
    }

    /// Record a release; `false` when the pointer is not ours.
    pub(crate) fn track_up(&mut self, sample: &TouchSample) -> bool {
        if self.points.remove(sample.id).is_none() {
            return false;
        }
        self.velocity
            .update_touch_point(sample.id, sample.position, sample.time, true);
        true
    }

    /// Fill the kind-independent fields of an event.
    pub(crate) fn event(&self, action: GestureAction) -> GestureEvent {
        let mut event = match (self.input_type, &self.last_touch, &self.last_axis) {
            (InputEventType::Axis, _, Some(axis)) => {
                GestureEvent::new(action, axis.time).with_axis(axis)
            }
            (_, Some(touch), _) => GestureEvent::new(action, touch.time).with_touch(touch),
            (_, None, Some(axis)) => GestureEvent::new(action, axis.time).with_axis(axis),
            (_, None, None) => GestureEvent::new(action, Instant::now()),
        };
        event.fingers = self.points.finger_infos();
        if event.fingers.is_empty()
            && self.input_type == InputEventType::Touch
            && let Some(touch) = &self.last_touch
        {
            event.fingers.push(crate::event::FingerInfo {
                id: touch.id,
                local_position: touch.local_position,
                global_position: touch.position,
                source_tool: touch.source_tool,
            });
        }
        event.target = self.node;
        event
    }

    /// Deliver an event to the application. Only a succeeded recognizer speaks.
    pub(crate) fn emit(&self, event: GestureEvent) {
        if self.state != RecognizerState::Succeed {
            tracing::trace!(
                target: targets::RECOGNIZER,
                gesture = ?self.gesture_type,
                action = ?event.action,
                state = ?self.state,
                "suppressed callback outside Succeed"
            );
            return;
        }
        tracing::trace!(
            target: targets::RECOGNIZER,
            gesture = ?self.gesture_type,
            node = ?self.node,
            action = ?event.action,
            "callback"
        );
        self.callbacks.signal(event.action).emit(&event);
    }

    /// Fewer pointers than the threshold remain.
    pub(crate) fn below_threshold(&self) -> bool {
        self.points.len() < self.fingers
    }

    fn reset(&mut self) {
        self.transition(RecognizerState::Ready);
        self.points.clear();
        self.velocity.reset_all();
        self.finished = false;
        self.accept_voted = false;
    }
}

/// Per-kind recognition policy.
///
/// The wrapper [`Recognizer`] handles everything common to all kinds: mouse
/// filtering, the judge, cancellation and state bookkeeping. Implementations
/// only decide votes and fill their part of the payload.
pub(crate) trait GestureBehavior {
    fn on_touch_down(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote;

    fn on_touch_move(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote;

    fn on_touch_up(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote;

    /// Axis input. Kinds that do not consume axis input stay out of the way
    /// of a touch stream they are following and reject otherwise.
    fn on_axis(&mut self, core: &mut RecognizerCore, _sample: &AxisSample) -> Vote {
        if core.points.is_empty() {
            Vote::Reject
        } else {
            Vote::Pending
        }
    }

    fn on_tick(&mut self, _core: &mut RecognizerCore, _now: Instant) -> Vote {
        Vote::Pending
    }

    /// Called after the state moved to Succeed.
    fn on_accepted(&mut self, core: &mut RecognizerCore);

    fn needs_more_input(&self, _core: &RecognizerCore) -> bool {
        false
    }

    fn fill_event(&self, core: &RecognizerCore, event: &mut GestureEvent);

    /// Forget runtime state, keeping configuration.
    fn reset(&mut self);

    fn emit(&self, core: &RecognizerCore, action: GestureAction) {
        let mut event = core.event(action);
        self.fill_event(core, &mut event);
        core.emit(event);
    }
}

/// The closed set of gesture kinds.
#[derive(Debug)]
pub enum GestureKind {
    Pan(PanRecognizer),
    Tap(TapRecognizer),
    LongPress(LongPressRecognizer),
    Pinch(PinchRecognizer),
    Rotation(RotationRecognizer),
    Swipe(SwipeRecognizer),
}

macro_rules! with_kind {
    ($kind:expr, $k:ident => $body:expr) => {
        match $kind {
            GestureKind::Pan($k) => $body,
            GestureKind::Tap($k) => $body,
            GestureKind::LongPress($k) => $body,
            GestureKind::Pinch($k) => $body,
            GestureKind::Rotation($k) => $body,
            GestureKind::Swipe($k) => $body,
        }
    };
}

impl GestureKind {
    pub fn gesture_type(&self) -> GestureType {
        match self {
            Self::Pan(_) => GestureType::Pan,
            Self::Tap(_) => GestureType::Tap,
            Self::LongPress(_) => GestureType::LongPress,
            Self::Pinch(_) => GestureType::Pinch,
            Self::Rotation(_) => GestureType::Rotation,
            Self::Swipe(_) => GestureType::Swipe,
        }
    }

    fn finger_range(&self) -> (usize, usize) {
        match self {
            Self::Pinch(_) | Self::Rotation(_) => (2, 5),
            _ => (1, MAX_FINGERS),
        }
    }

    /// Move runtime state from a compatible instance of the same kind.
    fn take_runtime(&mut self, old: &mut GestureKind) {
        match (self, old) {
            (Self::Pan(new), Self::Pan(old)) => new.take_runtime(old),
            (Self::Tap(new), Self::Tap(old)) => new.take_runtime(old),
            (Self::LongPress(new), Self::LongPress(old)) => new.take_runtime(old),
            (Self::Pinch(new), Self::Pinch(old)) => new.take_runtime(old),
            (Self::Rotation(new), Self::Rotation(old)) => new.take_runtime(old),
            (Self::Swipe(new), Self::Swipe(old)) => new.take_runtime(old),
            _ => {}
        }
    }
}

impl From<PanRecognizer> for GestureKind {
    fn from(kind: PanRecognizer) -> Self {
        Self::Pan(kind)
    }
}

impl From<TapRecognizer> for GestureKind {
    fn from(kind: TapRecognizer) -> Self {
        Self::Tap(kind)
    }
}

impl From<LongPressRecognizer> for GestureKind {
    fn from(kind: LongPressRecognizer) -> Self {
        Self::LongPress(kind)
    }
}

impl From<PinchRecognizer> for GestureKind {
    fn from(kind: PinchRecognizer) -> Self {
        Self::Pinch(kind)
    }
}

impl From<RotationRecognizer> for GestureKind {
    fn from(kind: RotationRecognizer) -> Self {
        Self::Rotation(kind)
    }
}

impl From<SwipeRecognizer> for GestureKind {
    fn from(kind: SwipeRecognizer) -> Self {
        Self::Swipe(kind)
    }
}

/// A gesture recognizer: common state plus one [`GestureKind`].
pub struct Recognizer {
    core: RecognizerCore,
    kind: GestureKind,
    priority: GesturePriority,
    policy: GesturePolicy,
    mask: GestureMask,
    judge: Option<GestureJudge>,
}

impl std::fmt::Debug for Recognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recognizer")
            .field("kind", &self.kind)
            .field("state", &self.core.state)
            .field("fingers", &self.core.fingers)
            .field("node", &self.core.node)
            .field("priority", &self.priority)
            .field("policy", &self.policy)
            .field("mask", &self.mask)
            .field("has_judge", &self.judge.is_some())
            .finish()
    }
}

impl Recognizer {
    /// Create a recognizer. `fingers` is clamped to the kind's valid range.
    pub fn new(kind: impl Into<GestureKind>, fingers: usize, config: &GestureConfig) -> Self {
        let kind = kind.into();
        let (min, max) = kind.finger_range();
        let fingers = fingers.clamp(min, max);
        let mut core = RecognizerCore::new(kind.gesture_type(), fingers, config);
        if let GestureKind::Pan(pan) = &kind
            && let Some(option) = pan.option()
        {
            core.fingers = option.fingers().clamp(min, max);
        }
        Self {
            core,
            kind,
            priority: GesturePriority::default(),
            policy: GesturePolicy::default(),
            mask: GestureMask::default(),
            judge: None,
        }
    }

    pub fn gesture_type(&self) -> GestureType {
        self.kind.gesture_type()
    }

    pub fn kind(&self) -> &GestureKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut GestureKind {
        &mut self.kind
    }

    pub fn state(&self) -> RecognizerState {
        self.core.state
    }

    pub fn fingers(&self) -> usize {
        self.core.fingers
    }

    pub fn priority(&self) -> GesturePriority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: GesturePriority) {
        self.priority = priority;
    }

    pub fn policy(&self) -> GesturePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: GesturePolicy) {
        self.policy = policy;
    }

    pub fn mask(&self) -> GestureMask {
        self.mask
    }

    pub fn set_mask(&mut self, mask: GestureMask) {
        self.mask = mask;
    }

    pub fn set_judge(&mut self, judge: GestureJudge) {
        self.judge = Some(judge);
    }

    pub fn node(&self) -> Option<NodeId> {
        self.core.node
    }

    pub fn set_node(&mut self, node: Option<NodeId>) {
        self.core.node = node;
    }

    /// Whether mouse-sourced touch samples may drive this recognizer.
    pub fn allows_mouse(&self) -> bool {
        self.core.allow_mouse
    }

    pub fn set_allow_mouse(&mut self, allow: bool) {
        self.core.allow_mouse = allow;
    }

    /// Lifecycle signals.
    pub fn callbacks(&self) -> &GestureCallbacks {
        &self.core.callbacks
    }

    /// Pointer ids currently tracked.
    pub fn tracked_pointers(&self) -> Vec<u64> {
        self.core.points.ids()
    }

    /// End or Cancel was already reported for the current lifecycle.
    pub fn is_finished(&self) -> bool {
        self.core.finished
    }

    /// Information handed to a judge.
    pub fn info(&self) -> GestureInfo {
        GestureInfo {
            gesture_type: self.gesture_type(),
            node: self.core.node,
            fingers: self.core.fingers,
            priority: self.priority,
            policy: self.policy,
            input_type: self.core.input_type,
            source_type: self
                .core
                .last_touch
                .as_ref()
                .map(|touch| touch.source_type)
                .unwrap_or_default(),
        }
    }

    /// Undecided with no pointers down, but the gesture is not over yet.
    pub fn needs_more_input(&self) -> bool {
        with_kind!(&self.kind, k => k.needs_more_input(&self.core))
    }

    /// Feed a touch sample. The sample's `local_position` must already be in
    /// this recognizer's node space.
    pub fn handle_touch(&mut self, sample: &TouchSample) -> Vote {
        self.refresh_pan_option();
        if self.core.state == RecognizerState::Fail {
            return Vote::Pending;
        }
        if sample.kind != TouchKind::Down && !self.core.points.contains(sample.id) {
            return Vote::Pending;
        }
        self.core.input_type = InputEventType::Touch;

        let vote = match sample.kind {
            TouchKind::Down => {
                if sample.is_mouse() && !self.core.allow_mouse {
                    tracing::debug!(
                        target: targets::RECOGNIZER,
                        gesture = ?self.gesture_type(),
                        "mouse input not allowed"
                    );
                    return Vote::Reject;
                }
                self.core.last_touch = Some(sample.clone());
                with_kind!(&mut self.kind, k => k.on_touch_down(&mut self.core, sample))
            }
            TouchKind::Move => {
                self.core.last_touch = Some(sample.clone());
                with_kind!(&mut self.kind, k => k.on_touch_move(&mut self.core, sample))
            }
            TouchKind::Up => {
                self.core.last_touch = Some(sample.clone());
                let vote = with_kind!(&mut self.kind, k => k.on_touch_up(&mut self.core, sample));
                // An accept still awaiting the referee survives the release.
                if vote == Vote::Reject && self.core.accept_voted {
                    Vote::Pending
                } else {
                    vote
                }
            }
            TouchKind::Cancel => {
                self.core.last_touch = Some(sample.clone());
                self.handle_cancel()
            }
        };
        self.vet(vote)
    }

    fn handle_cancel(&mut self) -> Vote {
        match self.core.state {
            RecognizerState::Succeed => {
                if !self.core.finished {
                    self.emit(GestureAction::Cancel);
                }
                self.reset();
                Vote::Pending
            }
            RecognizerState::Ready | RecognizerState::Detecting => Vote::Reject,
            RecognizerState::Fail => Vote::Pending,
        }
    }

    /// Feed an axis sample.
    pub fn handle_axis(&mut self, sample: &AxisSample) -> Vote {
        self.refresh_pan_option();
        if self.core.state == RecognizerState::Fail {
            return Vote::Pending;
        }
        if self.core.points.is_empty() {
            self.core.input_type = InputEventType::Axis;
            self.core.last_axis = Some(sample.clone());
        }
        let vote = with_kind!(&mut self.kind, k => k.on_axis(&mut self.core, sample));
        self.vet(vote)
    }

    /// Advance time-driven recognition (long-press deadlines, multi-tap expiry).
    pub fn tick(&mut self, now: Instant) -> Vote {
        if self.core.state == RecognizerState::Fail {
            return Vote::Pending;
        }
        let vote = with_kind!(&mut self.kind, k => k.on_tick(&mut self.core, now));
        self.vet(vote)
    }

    /// Run the judge on an accept and remember that an accept is outstanding.
    fn vet(&mut self, vote: Vote) -> Vote {
        if vote != Vote::Accept {
            return vote;
        }
        if self.core.state != RecognizerState::Detecting {
            return Vote::Pending;
        }
        if let Some(judge) = &self.judge {
            let mut event = self.core.event(GestureAction::Start);
            with_kind!(&self.kind, k => k.fill_event(&self.core, &mut event));
            if judge(&self.info(), &event) == JudgeResult::Reject {
                tracing::debug!(
                    target: targets::RECOGNIZER,
                    gesture = ?self.gesture_type(),
                    node = ?self.core.node,
                    "judge rejected accept"
                );
                return Vote::Reject;
            }
        }
        self.core.accept_voted = true;
        Vote::Accept
    }

    /// The referee granted this recognizer the stream.
    pub fn on_accepted(&mut self) {
        if self.core.state != RecognizerState::Detecting {
            tracing::trace!(
                target: targets::RECOGNIZER,
                gesture = ?self.gesture_type(),
                state = ?self.core.state,
                "accept ignored"
            );
            return;
        }
        self.core.accept_voted = false;
        self.core.transition(RecognizerState::Succeed);
        with_kind!(&mut self.kind, k => k.on_accepted(&mut self.core));
    }

    /// The referee denied this recognizer the stream.
    pub fn on_rejected(&mut self) {
        if self.core.state == RecognizerState::Succeed && !self.core.finished {
            self.emit(GestureAction::Cancel);
        }
        self.core.accept_voted = false;
        self.core.transition(RecognizerState::Fail);
    }

    /// Return to Ready, dropping pointers and runtime state without callbacks.
    pub fn reset(&mut self) {
        self.core.reset();
        with_kind!(&mut self.kind, k => k.reset());
    }

    /// Return to Ready, reporting Cancel first if the gesture was running.
    pub fn force_cancel(&mut self) {
        if self.core.state == RecognizerState::Succeed && !self.core.finished {
            self.emit(GestureAction::Cancel);
        }
        self.reset();
    }

    fn emit(&self, action: GestureAction) {
        with_kind!(&self.kind, k => k.emit(&self.core, action));
    }

    /// Whether runtime state may move from `old` into `self`.
    pub fn is_compatible(&self, old: &Recognizer) -> bool {
        self.gesture_type() == old.gesture_type()
            && self.core.fingers == old.core.fingers
            && self.priority == old.priority
            && self.mask == old.mask
    }

    /// Take over the in-flight state of the instance this one replaces.
    ///
    /// Configuration and callbacks stay those of `self`. Returns `false`, and
    /// leaves both untouched, when the two are not compatible; the caller
    /// then cancels `old` and `self` starts fresh.
    pub fn reconcile_from(&mut self, old: &mut Recognizer) -> bool {
        if !self.is_compatible(old) {
            tracing::debug!(
                target: targets::RECOGNIZER,
                gesture = ?self.gesture_type(),
                old = ?old.gesture_type(),
                "reconcile rejected, starting fresh"
            );
            return false;
        }
        let core = &mut self.core;
        let old_core = &mut old.core;
        core.state = old_core.state;
        core.points = std::mem::take(&mut old_core.points);
        std::mem::swap(&mut core.velocity, &mut old_core.velocity);
        core.node = old_core.node;
        core.last_touch = old_core.last_touch.take();
        core.last_axis = old_core.last_axis.take();
        core.input_type = old_core.input_type;
        core.finished = old_core.finished;
        core.accept_voted = old_core.accept_voted;
        self.kind.take_runtime(&mut old.kind);
        old.reset();
        true
    }

    fn refresh_pan_option(&mut self) {
        if !matches!(
            self.core.state,
            RecognizerState::Ready | RecognizerState::Detecting
        ) {
            return;
        }
        if let GestureKind::Pan(pan) = &mut self.kind
            && let Some(fingers) = pan.refresh_option()
        {
            self.core.fingers = fingers.clamp(1, MAX_FINGERS);
        }
    }
}

static_assertions::assert_impl_all!(Recognizer: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn pan(fingers: usize, direction: PanDirection, distance: f32) -> Recognizer {
        let config = GestureConfig::default();
        Recognizer::new(
            PanRecognizer::new(direction, distance, config.pan_mouse_distance),
            fingers,
            &config,
        )
    }

    #[test]
    fn test_fingers_clamped_per_kind() {
        let config = GestureConfig::default();
        assert_eq!(pan(0, PanDirection::ALL, 5.0).fingers(), 1);
        assert_eq!(pan(42, PanDirection::ALL, 5.0).fingers(), MAX_FINGERS);
        let pinch = Recognizer::new(PinchRecognizer::new(5.0), 1, &config);
        assert_eq!(pinch.fingers(), 2);
    }

    #[test]
    fn test_judge_turns_accept_into_reject() {
        let now = Instant::now();
        let mut recognizer = pan(1, PanDirection::ALL, 5.0);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        recognizer.set_judge(Arc::new(move |info: &GestureInfo, _: &GestureEvent| {
            seen.fetch_add(1, Ordering::SeqCst);
            assert_eq!(info.gesture_type, GestureType::Pan);
            JudgeResult::Reject
        }));

        recognizer.handle_touch(&TouchSample::down(1, 0.0, 0.0, now));
        let vote = recognizer.handle_touch(&TouchSample::moved(
            1,
            20.0,
            0.0,
            now + Duration::from_millis(10),
        ));
        assert_eq!(vote, Vote::Reject);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rejected_recognizer_is_silent() {
        let now = Instant::now();
        let mut recognizer = pan(1, PanDirection::ALL, 5.0);
        recognizer.handle_touch(&TouchSample::down(1, 0.0, 0.0, now));
        recognizer.on_rejected();
        assert_eq!(recognizer.state(), RecognizerState::Fail);
        assert_eq!(
            recognizer.handle_touch(&TouchSample::moved(1, 50.0, 0.0, now)),
            Vote::Pending
        );
        recognizer.reset();
        assert_eq!(recognizer.state(), RecognizerState::Ready);
        assert!(recognizer.tracked_pointers().is_empty());
    }

    #[test]
    fn test_reconcile_requires_matching_shape() {
        let now = Instant::now();
        let mut old = pan(1, PanDirection::ALL, 5.0);
        old.handle_touch(&TouchSample::down(1, 0.0, 0.0, now));
        assert_eq!(old.state(), RecognizerState::Detecting);

        let mut different = pan(2, PanDirection::ALL, 5.0);
        assert!(!different.reconcile_from(&mut old));
        assert_eq!(different.state(), RecognizerState::Ready);
        assert_eq!(old.state(), RecognizerState::Detecting);

        let mut same = pan(1, PanDirection::HORIZONTAL, 8.0);
        assert!(same.reconcile_from(&mut old));
        assert_eq!(same.state(), RecognizerState::Detecting);
        assert_eq!(same.tracked_pointers(), vec![1]);
        assert_eq!(old.state(), RecognizerState::Ready);
    }
}
