//! Swipe (fling) recognition.

use bitflags::bitflags;
use horizon_gesture_core::Point;
use horizon_gesture_core::logging::targets;

use super::{GestureBehavior, RecognizerCore, RecognizerState, Vote};
use crate::event::{GestureAction, GestureEvent, TouchSample};

bitflags! {
    /// Axes a swipe may travel along.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SwipeDirection: u32 {
        const HORIZONTAL = 1 << 0;
        const VERTICAL = 1 << 1;
        const ALL = Self::HORIZONTAL.bits() | Self::VERTICAL.bits();
    }
}

impl SwipeDirection {
    /// No direction: every swipe is rejected.
    pub const NONE: Self = Self::empty();

    /// Release speed along the allowed axes, or `None` when the motion runs
    /// along a disallowed axis.
    pub fn speed(self, velocity: Point) -> Option<f32> {
        let horizontal = velocity.x.abs() >= velocity.y.abs();
        match (
            self.contains(Self::HORIZONTAL),
            self.contains(Self::VERTICAL),
        ) {
            (true, true) => Some(velocity.length()),
            (true, false) if horizontal => Some(velocity.x.abs()),
            (false, true) if !horizontal => Some(velocity.y.abs()),
            _ => None,
        }
    }
}

impl Default for SwipeDirection {
    fn default() -> Self {
        Self::ALL
    }
}

/// Accepts when the fingers are released faster than `speed` px/s.
#[derive(Debug, Clone)]
pub struct SwipeRecognizer {
    direction: SwipeDirection,
    speed: f32,
    peak_fingers: usize,
    release_velocity: Point,
    release_speed: f32,
}

impl SwipeRecognizer {
    pub fn new(direction: SwipeDirection, speed: f32) -> Self {
        Self {
            direction,
            speed: speed.max(0.0),
            peak_fingers: 0,
            release_velocity: Point::ZERO,
            release_speed: 0.0,
        }
    }

    pub fn direction(&self) -> SwipeDirection {
        self.direction
    }

    pub(crate) fn take_runtime(&mut self, old: &mut SwipeRecognizer) {
        self.peak_fingers = old.peak_fingers;
        self.release_velocity = old.release_velocity;
        self.release_speed = old.release_speed;
        old.reset();
    }
}

impl GestureBehavior for SwipeRecognizer {
    fn on_touch_down(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if self.direction.is_empty() {
            return Vote::Reject;
        }
        core.track_down(sample);
        self.peak_fingers = self.peak_fingers.max(core.points.len());
        if core.points.len() > core.fingers {
            return Vote::Reject;
        }
        if core.state == RecognizerState::Ready && !core.below_threshold() {
            core.transition(RecognizerState::Detecting);
        }
        Vote::Pending
    }

    fn on_touch_move(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        core.track_move(sample);
        Vote::Pending
    }

    fn on_touch_up(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if !core.track_up(sample) {
            return Vote::Pending;
        }
        match core.state {
            RecognizerState::Ready => Vote::Reject,
            RecognizerState::Detecting if core.points.is_empty() => {
                let velocity = core.velocity.velocity();
                let speed = self.direction.speed(velocity);
                self.release_velocity = velocity;
                self.release_speed = speed.unwrap_or(0.0);
                tracing::trace!(
                    target: targets::RECOGNIZER,
                    speed = self.release_speed,
                    threshold = self.speed,
                    "swipe released"
                );
                match speed {
                    Some(speed) if speed >= self.speed && self.peak_fingers >= core.fingers => {
                        Vote::Accept
                    }
                    _ => Vote::Reject,
                }
            }
            _ => Vote::Pending,
        }
    }

    fn on_accepted(&mut self, core: &mut RecognizerCore) {
        self.emit(core, GestureAction::Action);
        core.finished = true;
    }

    fn fill_event(&self, _core: &RecognizerCore, event: &mut GestureEvent) {
        event.velocity = self.release_velocity;
        event.speed = self.release_speed;
        event.main_axis_velocity = self.release_speed;
        event.angle = self
            .release_velocity
            .y
            .atan2(self.release_velocity.x)
            .to_degrees();
    }

    fn reset(&mut self) {
        self.peak_fingers = 0;
        self.release_velocity = Point::ZERO;
        self.release_speed = 0.0;
    }
}
