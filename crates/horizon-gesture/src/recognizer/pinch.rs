//! Pinch recognition.
//!
//! The span of a set of fingers is their mean distance from the centroid.
//! A pinch is accepted once the span has changed by `distance`; the reported
//! scale is the current span over the span when detection began. Axis input
//! carrying a pinch scale (touchpad pinch, ctrl+wheel) drives the scale
//! directly.

use horizon_gesture_core::Point;

use super::{GestureBehavior, RecognizerCore, RecognizerState, Vote};
use crate::event::{AxisPhase, AxisSample, GestureAction, GestureEvent, TouchSample};

#[derive(Debug, Clone)]
pub struct PinchRecognizer {
    distance: f32,
    initial_span: f32,
    scale: f32,
    axis_active: bool,
    axis_center: Point,
}

impl PinchRecognizer {
    pub fn new(distance: f32) -> Self {
        Self {
            distance: distance.max(0.0),
            initial_span: 0.0,
            scale: 1.0,
            axis_active: false,
            axis_center: Point::ZERO,
        }
    }

    /// Scale relative to the start of detection.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub(crate) fn take_runtime(&mut self, old: &mut PinchRecognizer) {
        self.initial_span = old.initial_span;
        self.scale = old.scale;
        self.axis_active = old.axis_active;
        self.axis_center = old.axis_center;
        old.reset();
    }

    fn touch_scale(&self, core: &RecognizerCore) -> f32 {
        if self.initial_span <= f32::EPSILON {
            1.0
        } else {
            core.points.span() / self.initial_span
        }
    }

    fn finish(&mut self, core: &mut RecognizerCore, action: GestureAction) {
        if !core.finished {
            self.emit(core, action);
            core.finished = true;
        }
    }
}

impl GestureBehavior for PinchRecognizer {
    fn on_touch_down(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if self.axis_active {
            return Vote::Pending;
        }
        core.track_down(sample);
        match core.state {
            RecognizerState::Ready if !core.below_threshold() => {
                self.initial_span = core.points.span();
                core.transition(RecognizerState::Detecting);
            }
            RecognizerState::Detecting => self.initial_span = core.points.span(),
            _ => {}
        }
        Vote::Pending
    }

    fn on_touch_move(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if core.track_move(sample).is_none() {
            return Vote::Pending;
        }
        match core.state {
            RecognizerState::Detecting => {
                if (core.points.span() - self.initial_span).abs() >= self.distance {
                    self.scale = self.touch_scale(core);
                    Vote::Accept
                } else {
                    Vote::Pending
                }
            }
            RecognizerState::Succeed if !core.finished => {
                self.scale = self.touch_scale(core);
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
                    self.initial_span = core.points.span();
                    Vote::Pending
                }
            }
            RecognizerState::Succeed => {
                if core.below_threshold() {
                    self.finish(core, GestureAction::End);
                }
                if core.points.is_empty() {
                    core.reset();
                    self.reset();
                }
                Vote::Pending
            }
            RecognizerState::Fail => Vote::Pending,
        }
    }

    fn on_axis(&mut self, core: &mut RecognizerCore, sample: &AxisSample) -> Vote {
        if !core.points.is_empty() {
            return Vote::Pending;
        }
        if !self.axis_active {
            if sample.pinch_scale.is_none()
                || !matches!(sample.phase, AxisPhase::Begin | AxisPhase::Update)
            {
                return Vote::Reject;
            }
            if core.state != RecognizerState::Ready {
                return Vote::Pending;
            }
            self.axis_active = true;
            self.scale = 1.0;
            core.transition(RecognizerState::Detecting);
        }
        self.axis_center = sample.local_position;
        match sample.phase {
            AxisPhase::Begin | AxisPhase::Update => {
                if let Some(scale) = sample.pinch_scale {
                    self.scale = scale;
                }
                match core.state {
                    RecognizerState::Detecting if (self.scale - 1.0).abs() > f32::EPSILON => {
                        Vote::Accept
                    }
                    RecognizerState::Succeed if !core.finished => {
                        self.emit(core, GestureAction::Update);
                        Vote::Pending
                    }
                    _ => Vote::Pending,
                }
            }
            AxisPhase::End | AxisPhase::Cancel => match core.state {
                RecognizerState::Succeed => {
                    let action = if sample.phase == AxisPhase::End {
                        GestureAction::End
                    } else {
                        GestureAction::Cancel
                    };
                    self.finish(core, action);
                    core.reset();
                    self.reset();
                    Vote::Pending
                }
                _ if core.accept_voted && sample.phase == AxisPhase::End => Vote::Pending,
                _ => Vote::Reject,
            },
        }
    }

    fn on_accepted(&mut self, core: &mut RecognizerCore) {
        self.emit(core, GestureAction::Start);
        self.emit(core, GestureAction::Update);
        let lifted = if self.axis_active {
            core.last_axis
                .as_ref()
                .is_some_and(|axis| matches!(axis.phase, AxisPhase::End | AxisPhase::Cancel))
        } else {
            core.below_threshold()
        };
        if lifted {
            self.finish(core, GestureAction::End);
            if core.points.is_empty() {
                core.reset();
                self.reset();
            }
        }
    }

    fn fill_event(&self, core: &RecognizerCore, event: &mut GestureEvent) {
        event.scale = self.scale;
        event.pinch_center = if self.axis_active {
            self.axis_center
        } else {
            core.points.local_centroid()
        };
    }

    fn reset(&mut self) {
        self.initial_span = 0.0;
        self.scale = 1.0;
        self.axis_active = false;
        self.axis_center = Point::ZERO;
    }
}
