//! Rotation recognition.
//!
//! Tracks the angle of the line through the first two fingers (in Down
//! order). The angle is accumulated step by step so crossing ±180° does not
//! jump. Rotation-flagged axis samples drive the angle directly; this is the
//! only kind that consumes them.

use super::{GestureBehavior, RecognizerCore, RecognizerState, Vote};
use crate::event::{AxisPhase, AxisSample, GestureAction, GestureEvent, TouchSample};
use crate::touch_points::TouchPointRegistry;

/// Wrap an angle difference into (-180, 180].
fn normalize_degrees(delta: f32) -> f32 {
    let wrapped = (delta + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 { 180.0 } else { wrapped }
}

fn line_angle(points: &TouchPointRegistry) -> Option<f32> {
    let mut iter = points.iter();
    let first = iter.next()?.last.position;
    let second = iter.next()?.last.position;
    let d = second - first;
    Some(d.y.atan2(d.x).to_degrees())
}

#[derive(Debug, Clone)]
pub struct RotationRecognizer {
    angle: f32,
    last_line: Option<f32>,
    total: f32,
    axis_active: bool,
}

impl RotationRecognizer {
    /// Accept once the fingers turned by `angle` degrees.
    pub fn new(angle: f32) -> Self {
        Self {
            angle: angle.abs(),
            last_line: None,
            total: 0.0,
            axis_active: false,
        }
    }

    /// Degrees turned since detection began.
    pub fn total(&self) -> f32 {
        self.total
    }

    pub(crate) fn take_runtime(&mut self, old: &mut RotationRecognizer) {
        self.last_line = old.last_line;
        self.total = old.total;
        self.axis_active = old.axis_active;
        old.reset();
    }

    fn accumulate(&mut self, core: &RecognizerCore) {
        if let Some(current) = line_angle(&core.points) {
            if let Some(last) = self.last_line {
                self.total += normalize_degrees(current - last);
            }
            self.last_line = Some(current);
        }
    }

    fn finish(&mut self, core: &mut RecognizerCore, action: GestureAction) {
        if !core.finished {
            self.emit(core, action);
            core.finished = true;
        }
    }
}

impl GestureBehavior for RotationRecognizer {
    fn on_touch_down(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if self.axis_active {
            return Vote::Pending;
        }
        core.track_down(sample);
        if core.state == RecognizerState::Ready && !core.below_threshold() {
            self.total = 0.0;
            self.last_line = line_angle(&core.points);
            core.transition(RecognizerState::Detecting);
        }
        Vote::Pending
    }

    fn on_touch_move(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if core.track_move(sample).is_none() {
            return Vote::Pending;
        }
        match core.state {
            RecognizerState::Detecting => {
                self.accumulate(core);
                if self.total.abs() >= self.angle {
                    Vote::Accept
                } else {
                    Vote::Pending
                }
            }
            RecognizerState::Succeed if !core.finished => {
                self.accumulate(core);
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
        // The line may now run through a different pair of fingers.
        self.last_line = line_angle(&core.points);
        match core.state {
            RecognizerState::Ready | RecognizerState::Detecting => {
                if core.below_threshold() {
                    Vote::Reject
                } else {
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
            if !sample.is_rotation
                || !matches!(sample.phase, AxisPhase::Begin | AxisPhase::Update)
            {
                return Vote::Reject;
            }
            if core.state != RecognizerState::Ready {
                return Vote::Pending;
            }
            self.axis_active = true;
            self.total = 0.0;
            core.transition(RecognizerState::Detecting);
        }
        match sample.phase {
            AxisPhase::Begin | AxisPhase::Update => {
                if let Some(rotation) = sample.rotation {
                    self.total = rotation;
                }
                match core.state {
                    RecognizerState::Detecting if self.total.abs() >= self.angle => Vote::Accept,
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

    fn fill_event(&self, _core: &RecognizerCore, event: &mut GestureEvent) {
        event.angle = self.total;
    }

    fn reset(&mut self) {
        self.last_line = None;
        self.total = 0.0;
        self.axis_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::{GestureKind, Recognizer};
    use horizon_gesture_core::{GestureConfig, Point};
    use std::time::Instant;

    #[test]
    fn test_normalize_wraps() {
        assert_eq!(normalize_degrees(190.0), -170.0);
        assert_eq!(normalize_degrees(-190.0), 170.0);
        assert_eq!(normalize_degrees(-180.0), 180.0);
        assert_eq!(normalize_degrees(45.0), 45.0);
    }

    #[test]
    fn test_quarter_turn() {
        let now = Instant::now();
        let mut recognizer =
            Recognizer::new(RotationRecognizer::new(10.0), 2, &GestureConfig::default());
        recognizer.handle_touch(&TouchSample::down(1, 0.0, 0.0, now));
        recognizer.handle_touch(&TouchSample::down(2, 100.0, 0.0, now));

        assert_eq!(
            recognizer.handle_touch(&TouchSample::moved(2, 100.0, 5.0, now)),
            Vote::Pending
        );
        assert_eq!(
            recognizer.handle_touch(&TouchSample::moved(2, 0.0, 100.0, now)),
            Vote::Accept
        );
        let GestureKind::Rotation(kind) = recognizer.kind() else {
            unreachable!()
        };
        assert!((kind.total() - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_rotation_axis_drives_angle() {
        let now = Instant::now();
        let mut recognizer =
            Recognizer::new(RotationRecognizer::new(5.0), 2, &GestureConfig::default());
        let sample = AxisSample::scroll(0, AxisPhase::Update, Point::ZERO, 0.0, 0.0, now)
            .with_touchpad()
            .with_rotation(12.0);
        assert_eq!(recognizer.handle_axis(&sample), Vote::Accept);
    }
}
