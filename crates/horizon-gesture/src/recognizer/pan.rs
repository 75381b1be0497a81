//! Pan (drag) recognition.
//!
//! A pan is accepted once the averaged finger displacement travels far enough
//! along an allowed direction. Touch and mouse sources have separate distance
//! thresholds; axis input (wheel, touchpad scroll) is treated as a single
//! synthetic finger and uses the mouse threshold.
//!
//! Direction restrictions decide between the two axes by the dominant
//! component of the displacement. When only one vertical direction is allowed
//! and the input comes from a touchscreen, the per-finger displacements are
//! weighed instead of the average, so a single finger drifting the wrong way
//! cannot veto a pan the other fingers agree on.

use std::sync::Arc;

use bitflags::bitflags;
use horizon_gesture_core::Point;
use horizon_gesture_core::logging::targets;
use parking_lot::RwLock;

use super::{GestureBehavior, RecognizerCore, RecognizerState, Vote};
use crate::event::{AxisPhase, AxisSample, GestureAction, GestureEvent, TouchSample};
use crate::velocity::VelocityAxis;

bitflags! {
    /// Directions a pan may move in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PanDirection: u32 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const UP = 1 << 2;
        const DOWN = 1 << 3;
        const HORIZONTAL = Self::LEFT.bits() | Self::RIGHT.bits();
        const VERTICAL = Self::UP.bits() | Self::DOWN.bits();
        const ALL = Self::HORIZONTAL.bits() | Self::VERTICAL.bits();
    }
}

impl PanDirection {
    /// No direction: every pan is rejected.
    pub const NONE: Self = Self::empty();

    /// Zero the components of `delta` on axes this mask does not allow.
    pub fn mask(self, delta: Point) -> Point {
        Point::new(
            if self.intersects(Self::HORIZONTAL) { delta.x } else { 0.0 },
            if self.intersects(Self::VERTICAL) { delta.y } else { 0.0 },
        )
    }

    /// Axis velocity is projected onto for this mask.
    pub fn velocity_axis(self) -> VelocityAxis {
        if !self.is_empty() && Self::HORIZONTAL.contains(self) {
            VelocityAxis::Horizontal
        } else if !self.is_empty() && Self::VERTICAL.contains(self) {
            VelocityAxis::Vertical
        } else {
            VelocityAxis::Free
        }
    }
}

impl Default for PanDirection {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug)]
struct PanOptionState {
    fingers: usize,
    direction: PanDirection,
    distance: f32,
    generation: u64,
}

/// Shared, live-editable pan configuration.
///
/// Clones share the same settings. A recognizer picks up changes only while
/// it is Ready or Detecting, so a running pan never jumps mid-gesture.
#[derive(Debug, Clone)]
pub struct PanGestureOption {
    inner: Arc<RwLock<PanOptionState>>,
}

impl PanGestureOption {
    pub fn new(fingers: usize, direction: PanDirection, distance: f32) -> Self {
        Self {
            inner: Arc::new(RwLock::new(PanOptionState {
                fingers,
                direction,
                distance,
                generation: 0,
            })),
        }
    }

    pub fn fingers(&self) -> usize {
        self.inner.read().fingers
    }

    pub fn direction(&self) -> PanDirection {
        self.inner.read().direction
    }

    pub fn distance(&self) -> f32 {
        self.inner.read().distance
    }

    pub fn set_fingers(&self, fingers: usize) {
        let mut state = self.inner.write();
        state.fingers = fingers;
        state.generation += 1;
    }

    pub fn set_direction(&self, direction: PanDirection) {
        let mut state = self.inner.write();
        state.direction = direction;
        state.generation += 1;
    }

    pub fn set_distance(&self, distance: f32) {
        let mut state = self.inner.write();
        state.distance = distance;
        state.generation += 1;
    }

    fn generation(&self) -> u64 {
        self.inner.read().generation
    }
}

/// Pan policy and runtime state.
#[derive(Debug, Clone)]
pub struct PanRecognizer {
    direction: PanDirection,
    distance: f32,
    mouse_distance: f32,
    option: Option<PanGestureOption>,
    option_generation: u64,
    /// Averaged touch displacement since Detecting began.
    average_distance: Point,
    /// Axis displacement since the axis stream began.
    axis_offset: Point,
    /// Masked displacement reported by the latest Update.
    delta: Point,
    axis_active: bool,
    mouse_source: bool,
}

impl PanRecognizer {
    /// Create a pan with a touch distance threshold and a mouse/axis one.
    pub fn new(direction: PanDirection, distance: f32, mouse_distance: f32) -> Self {
        Self {
            direction,
            distance: distance.max(0.0),
            mouse_distance: mouse_distance.max(0.0),
            option: None,
            option_generation: 0,
            average_distance: Point::ZERO,
            axis_offset: Point::ZERO,
            delta: Point::ZERO,
            axis_active: false,
            mouse_source: false,
        }
    }

    /// Create a pan driven by a shared option.
    pub fn with_option(option: PanGestureOption, mouse_distance: f32) -> Self {
        let mut pan = Self::new(option.direction(), option.distance(), mouse_distance);
        pan.option_generation = option.generation();
        pan.option = Some(option);
        pan
    }

    pub fn direction(&self) -> PanDirection {
        self.direction
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn option(&self) -> Option<&PanGestureOption> {
        self.option.as_ref()
    }

    /// Averaged displacement since detection began.
    pub fn average_distance(&self) -> Point {
        self.average_distance
    }

    /// Apply pending option changes; returns the new finger count if any.
    pub(crate) fn refresh_option(&mut self) -> Option<usize> {
        let option = self.option.as_ref()?;
        let state = option.inner.read();
        if state.generation == self.option_generation {
            return None;
        }
        self.option_generation = state.generation;
        self.direction = state.direction;
        self.distance = state.distance.max(0.0);
        tracing::debug!(
            target: targets::RECOGNIZER,
            direction = ?self.direction,
            distance = self.distance,
            fingers = state.fingers,
            "pan option applied"
        );
        Some(state.fingers)
    }

    pub(crate) fn take_runtime(&mut self, old: &mut PanRecognizer) {
        self.average_distance = old.average_distance;
        self.axis_offset = old.axis_offset;
        self.delta = old.delta;
        self.axis_active = old.axis_active;
        self.mouse_source = old.mouse_source;
        old.reset();
    }

    fn threshold(&self) -> f32 {
        if self.mouse_source || self.axis_active {
            self.mouse_distance
        } else {
            self.distance
        }
    }

    fn evaluate(&self, core: &RecognizerCore, displacement: Point) -> Vote {
        let threshold = self.threshold();
        if self.direction == PanDirection::ALL {
            return if displacement.length() >= threshold {
                Vote::Accept
            } else {
                Vote::Pending
            };
        }

        let horizontal_enabled = self.direction.intersects(PanDirection::HORIZONTAL);
        let vertical_enabled = self.direction.intersects(PanDirection::VERTICAL);
        if displacement.x.abs() >= displacement.y.abs() {
            if horizontal_enabled {
                self.judge_horizontal(displacement.x, threshold)
            } else if vertical_enabled && displacement.y.abs() >= threshold {
                self.judge_vertical(core, displacement.y, threshold)
            } else {
                Vote::Pending
            }
        } else if vertical_enabled {
            self.judge_vertical(core, displacement.y, threshold)
        } else if horizontal_enabled && displacement.x.abs() >= threshold {
            self.judge_horizontal(displacement.x, threshold)
        } else {
            Vote::Pending
        }
    }

    fn judge_horizontal(&self, dx: f32, threshold: f32) -> Vote {
        if dx.abs() < threshold {
            return Vote::Pending;
        }
        let wanted = if dx < 0.0 {
            PanDirection::LEFT
        } else {
            PanDirection::RIGHT
        };
        if self.direction.contains(wanted) {
            Vote::Accept
        } else {
            Vote::Reject
        }
    }

    fn judge_vertical(&self, core: &RecognizerCore, dy: f32, threshold: f32) -> Vote {
        let single_direction = self.direction.contains(PanDirection::UP)
            != self.direction.contains(PanDirection::DOWN);
        if single_direction && !self.mouse_source && !self.axis_active {
            return self.judge_by_fingers(core, dy, threshold);
        }
        if dy.abs() < threshold {
            return Vote::Pending;
        }
        let wanted = if dy < 0.0 {
            PanDirection::UP
        } else {
            PanDirection::DOWN
        };
        if self.direction.contains(wanted) {
            Vote::Accept
        } else {
            Vote::Reject
        }
    }

    /// Weigh what each finger is doing when one vertical direction is banned.
    fn judge_by_fingers(&self, core: &RecognizerCore, average_dy: f32, threshold: f32) -> Vote {
        let down_allowed = self.direction.contains(PanDirection::DOWN);
        let toward_allowed = |dy: f32| if down_allowed { dy > 0.0 } else { dy < 0.0 };

        let forbidden_travel = if down_allowed { -average_dy } else { average_dy };
        if forbidden_travel >= threshold {
            return Vote::Reject;
        }

        let allowed_travel: f32 = core
            .points
            .iter()
            .map(|point| point.distance.y)
            .filter(|&dy| toward_allowed(dy))
            .map(f32::abs)
            .sum();
        if allowed_travel >= threshold && core.points.len() >= core.fingers {
            Vote::Accept
        } else {
            Vote::Pending
        }
    }

    fn offset(&self) -> Point {
        if self.axis_active {
            self.direction.mask(self.axis_offset)
        } else {
            self.direction.mask(self.average_distance)
        }
    }

    fn end_axis_stream(&mut self, core: &mut RecognizerCore) {
        core.reset();
        self.reset();
    }

    fn begin_axis(&mut self, core: &mut RecognizerCore, sample: &AxisSample) -> Vote {
        if sample.is_rotation || self.direction.is_empty() || core.fingers != 1 {
            return Vote::Reject;
        }
        if core.state != RecognizerState::Ready || !core.points.is_empty() {
            return Vote::Pending;
        }
        self.axis_active = true;
        self.axis_offset = Point::ZERO;
        self.delta = Point::ZERO;
        core.velocity.reset(sample.id);
        core.velocity
            .update_touch_point(sample.id, Point::ZERO, sample.time, false);
        core.transition(RecognizerState::Detecting);
        Vote::Pending
    }
}

impl GestureBehavior for PanRecognizer {
    fn on_touch_down(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if self.direction.is_empty() {
            return Vote::Reject;
        }
        if self.axis_active {
            return Vote::Pending;
        }
        self.mouse_source = sample.is_mouse();
        core.track_down(sample);
        if core.state == RecognizerState::Ready && !core.below_threshold() {
            self.average_distance = Point::ZERO;
            core.points.reset_distances();
            core.transition(RecognizerState::Detecting);
        }
        Vote::Pending
    }

    fn on_touch_move(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        let Some(delta) = core.track_move(sample) else {
            return Vote::Pending;
        };
        let average_delta = delta / core.points.len().max(1) as f32;
        match core.state {
            RecognizerState::Detecting => {
                self.average_distance += average_delta;
                self.evaluate(core, self.average_distance)
            }
            RecognizerState::Succeed if !core.finished => {
                self.average_distance += average_delta;
                self.delta = self.direction.mask(average_delta);
                self.emit(core, GestureAction::Update);
                Vote::Pending
            }
            _ => Vote::Pending,
        }
    }

    fn on_touch_up(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if !core.track_up(sample) {
            return Vote::Pending;
        }
        match core.state {
            RecognizerState::Ready | RecognizerState::Detecting => {
                if core.below_threshold() {
                    Vote::Reject
                } else {
                    Vote::Pending
                }
            }
            // Runs until the last finger lifts, whatever the threshold.
            RecognizerState::Succeed => {
                if core.points.is_empty() {
                    if !core.finished {
                        self.delta = Point::ZERO;
                        self.emit(core, GestureAction::End);
                    }
                    core.reset();
                    self.reset();
                }
                Vote::Pending
            }
            RecognizerState::Fail => Vote::Pending,
        }
    }

    fn on_axis(&mut self, core: &mut RecognizerCore, sample: &AxisSample) -> Vote {
        match sample.phase {
            AxisPhase::Begin => self.begin_axis(core, sample),
            AxisPhase::Update => {
                if sample.is_rotation {
                    return if self.axis_active {
                        Vote::Pending
                    } else {
                        Vote::Reject
                    };
                }
                if !self.axis_active {
                    let vote = self.begin_axis(core, sample);
                    if vote != Vote::Pending || !self.axis_active {
                        return vote;
                    }
                }
                let delta = sample.scroll_delta();
                self.axis_offset += delta;
                core.velocity
                    .update_touch_point(sample.id, self.axis_offset, sample.time, false);
                match core.state {
                    RecognizerState::Detecting => self.evaluate(core, self.axis_offset),
                    RecognizerState::Succeed if !core.finished => {
                        self.delta = self.direction.mask(delta);
                        self.emit(core, GestureAction::Update);
                        Vote::Pending
                    }
                    _ => Vote::Pending,
                }
            }
            AxisPhase::End => {
                if !self.axis_active {
                    return Vote::Pending;
                }
                core.velocity
                    .update_touch_point(sample.id, self.axis_offset, sample.time, true);
                match core.state {
                    RecognizerState::Succeed => {
                        if !core.finished {
                            self.delta = Point::ZERO;
                            self.emit(core, GestureAction::End);
                        }
                        self.end_axis_stream(core);
                        Vote::Pending
                    }
                    _ if core.accept_voted => Vote::Pending,
                    _ => Vote::Reject,
                }
            }
            AxisPhase::Cancel => {
                if !self.axis_active {
                    return Vote::Pending;
                }
                match core.state {
                    RecognizerState::Succeed => {
                        if !core.finished {
                            self.emit(core, GestureAction::Cancel);
                        }
                        self.end_axis_stream(core);
                        Vote::Pending
                    }
                    _ => Vote::Reject,
                }
            }
        }
    }

    fn on_accepted(&mut self, core: &mut RecognizerCore) {
        self.emit(core, GestureAction::Start);
        self.delta = self.offset();
        self.emit(core, GestureAction::Update);

        let lifted = if self.axis_active {
            core.last_axis
                .as_ref()
                .is_some_and(|axis| matches!(axis.phase, AxisPhase::End | AxisPhase::Cancel))
        } else {
            core.points.is_empty()
        };
        if lifted {
            self.delta = Point::ZERO;
            self.emit(core, GestureAction::End);
            core.finished = true;
            if core.points.is_empty() {
                core.reset();
                self.reset();
            }
        }
    }

    fn fill_event(&self, core: &RecognizerCore, event: &mut GestureEvent) {
        let velocity = self.direction.mask(core.velocity.velocity());
        event.offset = self.offset();
        event.delta = self.delta;
        event.velocity = velocity;
        event.main_axis_velocity = match self.direction.velocity_axis() {
            VelocityAxis::Horizontal => velocity.x,
            VelocityAxis::Vertical => velocity.y,
            VelocityAxis::Free => velocity.length(),
        };
    }

    fn reset(&mut self) {
        self.average_distance = Point::ZERO;
        self.axis_offset = Point::ZERO;
        self.delta = Point::ZERO;
        self.axis_active = false;
        self.mouse_source = false;
    }
}
