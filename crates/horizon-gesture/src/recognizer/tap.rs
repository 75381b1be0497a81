//! Tap and multi-tap recognition.

use std::time::{Duration, Instant};

use horizon_gesture_core::logging::targets;

use super::{GestureBehavior, RecognizerCore, RecognizerState, Vote};
use crate::event::{GestureAction, GestureEvent, TouchSample};

/// Recognizes `count` consecutive taps of `fingers` fingers.
///
/// Each tap must stay within `slop` of where its fingers went down, and the
/// next tap must start within `interval` of the previous release.
#[derive(Debug, Clone)]
pub struct TapRecognizer {
    count: u32,
    slop: f32,
    interval: Duration,
    taps: u32,
    last_release: Option<Instant>,
    peak_fingers: usize,
}

impl TapRecognizer {
    pub fn new(count: u32, slop: f32, interval: Duration) -> Self {
        Self {
            count: count.max(1),
            slop: slop.max(0.0),
            interval,
            taps: 0,
            last_release: None,
            peak_fingers: 0,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Taps completed in the current sequence.
    pub fn taps(&self) -> u32 {
        self.taps
    }

    pub(crate) fn take_runtime(&mut self, old: &mut TapRecognizer) {
        self.taps = old.taps;
        self.last_release = old.last_release;
        self.peak_fingers = old.peak_fingers;
        old.reset();
    }

    fn expired(&self, now: Instant) -> bool {
        self.last_release
            .is_some_and(|release| now.saturating_duration_since(release) > self.interval)
    }
}

impl GestureBehavior for TapRecognizer {
    fn on_touch_down(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if self.expired(sample.time) {
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
        if core.track_move(sample).is_none() {
            return Vote::Pending;
        }
        let strayed = core
            .points
            .iter()
            .any(|point| point.last.position.distance(point.down.position) > self.slop);
        if strayed && core.state != RecognizerState::Succeed {
            Vote::Reject
        } else {
            Vote::Pending
        }
    }

    fn on_touch_up(&mut self, core: &mut RecognizerCore, sample: &TouchSample) -> Vote {
        if !core.track_up(sample) {
            return Vote::Pending;
        }
        if core.state == RecognizerState::Ready {
            return Vote::Reject;
        }
        if core.state != RecognizerState::Detecting || !core.points.is_empty() {
            return Vote::Pending;
        }
        if self.peak_fingers < core.fingers {
            return Vote::Reject;
        }

        self.taps += 1;
        self.peak_fingers = 0;
        self.last_release = Some(sample.time);
        tracing::trace!(
            target: targets::RECOGNIZER,
            taps = self.taps,
            count = self.count,
            "tap completed"
        );
        if self.taps >= self.count {
            Vote::Accept
        } else {
            Vote::Pending
        }
    }

    fn on_tick(&mut self, core: &mut RecognizerCore, now: Instant) -> Vote {
        let waiting = self.taps > 0 && self.taps < self.count;
        if core.state == RecognizerState::Detecting
            && core.points.is_empty()
            && waiting
            && self.expired(now)
        {
            tracing::trace!(target: targets::RECOGNIZER, "multi-tap interval expired");
            Vote::Reject
        } else {
            Vote::Pending
        }
    }

    fn on_accepted(&mut self, core: &mut RecognizerCore) {
        self.emit(core, GestureAction::Action);
        core.finished = true;
    }

    fn needs_more_input(&self, core: &RecognizerCore) -> bool {
        core.state == RecognizerState::Detecting
            && core.points.is_empty()
            && self.taps > 0
            && self.taps < self.count
    }

    fn fill_event(&self, _core: &RecognizerCore, event: &mut GestureEvent) {
        event.repeat = self.taps;
    }

    fn reset(&mut self) {
        self.taps = 0;
        self.last_release = None;
        self.peak_fingers = 0;
    }
}
