//! Long-press recognition.
//!
//! Time drives this recognizer: the event manager calls [`Recognizer::tick`]
//! and the press is accepted once the pointers have been held, without
//! straying, for the configured duration.
//!
//! [`Recognizer::tick`]: super::Recognizer::tick

use std::time::{Duration, Instant};

use super::{GestureBehavior, RecognizerCore, RecognizerState, Vote};
use crate::event::{GestureAction, GestureEvent, TouchSample};

#[derive(Debug, Clone)]
pub struct LongPressRecognizer {
    duration: Duration,
    repeat: bool,
    slop: f32,
    deadline: Option<Instant>,
    next_repeat: Option<Instant>,
    repeats: u32,
}

impl LongPressRecognizer {
    /// A press held for `duration`. With `repeat`, Action fires again every
    /// further `duration` until release.
    pub fn new(duration: Duration, repeat: bool, slop: f32) -> Self {
        Self {
            duration,
            repeat,
            slop: slop.max(0.0),
            deadline: None,
            next_repeat: None,
            repeats: 0,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// When the press will be accepted, if detecting.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn take_runtime(&mut self, old: &mut LongPressRecognizer) {
        self.deadline = old.deadline;
        self.next_repeat = old.next_repeat;
        self.repeats = old.repeats;
        old.reset();
    }
}

impl GestureBehavior for LongPressRecognizer {
    fn on_touch_down(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        core.track_down(sample);
        if core.points.len() > core.fingers && core.state != RecognizerState::Succeed {
            return Vote::Reject;
        }
        if core.state == RecognizerState::Ready && !core.below_threshold() {
            self.deadline = Some(sample.time + self.duration);
            core.transition(RecognizerState::Detecting);
        }
        Vote::Pending
    }

    fn on_touch_move(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if core.track_move(sample).is_none() {
            return Vote::Pending;
        }
        if core.state == RecognizerState::Succeed {
            return Vote::Pending;
        }
        let strayed = core
            .points
            .iter()
            .any(|point| point.last.position.distance(point.down.position) > self.slop);
        if strayed { Vote::Reject } else { Vote::Pending }
    }

    fn on_touch_up(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if !core.track_up(sample) {
            return Vote::Pending;
        }
        match core.state {
            RecognizerState::Ready | RecognizerState::Detecting => Vote::Reject,
            RecognizerState::Succeed => {
                if core.below_threshold() && !core.finished {
                    self.emit(core, GestureAction::End);
                    core.finished = true;
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

    fn on_tick(&mut self, core: &mut RecognizerCore, now: Instant) -> Vote {
        match core.state {
            RecognizerState::Detecting if self.deadline.is_some_and(|deadline| now >= deadline) => {
                Vote::Accept
            }
            RecognizerState::Succeed if self.repeat && !core.finished => {
                while let Some(next) = self.next_repeat
                    && now >= next
                {
                    self.repeats += 1;
                    self.emit(core, GestureAction::Action);
                    self.next_repeat = Some(next + self.duration);
                }
                Vote::Pending
            }
            _ => Vote::Pending,
        }
    }

    fn on_accepted(&mut self, core: &mut RecognizerCore) {
        self.emit(core, GestureAction::Action);
        if self.repeat {
            self.next_repeat = self.deadline.map(|deadline| deadline + self.duration);
        }
        if core.below_threshold() {
            self.emit(core, GestureAction::End);
            core.finished = true;
            if core.points.is_empty() {
                core.reset();
                self.reset();
            }
        }
    }

    fn fill_event(&self, _core: &RecognizerCore, event: &mut GestureEvent) {
        event.repeat = self.repeats;
    }

    fn reset(&mut self) {
        self.deadline = None;
        self.next_repeat = None;
        self.repeats = 0;
    }
}
