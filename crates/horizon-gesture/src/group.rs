//! Gesture groups.
//!
//! A [`GestureGroup`] bundles several recognizers attached to the same node
//! and competes in arbitration as a single unit. How the children share the
//! input depends on the [`GroupMode`]:
//!
//! - [`GroupMode::Exclusive`]: every child sees the input and the earliest
//!   declared child to accept wins. A child that accepts waits while a sibling
//!   declared before it is still undecided, so a double tap listed ahead of a
//!   single tap gets its chance first.
//! - [`GroupMode::Parallel`]: every child sees the input; once the group has
//!   won, each child's accept goes through on its own.
//! - [`GroupMode::Sequence`]: only the current child sees the input. A
//!   discrete child hands over as soon as it succeeds, a continuous one after
//!   it ended. Pointers still held are replayed to the next child as Downs.
//!   Any child failing fails the whole group.

use std::time::{Duration, Instant};

use horizon_gesture_core::NodeId;
use horizon_gesture_core::logging::targets;
use slotmap::{SlotMap, new_key_type};

use crate::event::{AxisSample, TouchKind, TouchSample};
use crate::recognizer::{
    GestureMask, GesturePolicy, GesturePriority, Recognizer, RecognizerId, RecognizerState, Vote,
};

new_key_type! {
    /// Stable handle of a gesture group owned by the event manager.
    pub struct GroupId;
}

/// How the children of a group share input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GroupMode {
    /// Children are recognized one after another.
    #[default]
    Sequence,
    /// Children are recognized simultaneously.
    Parallel,
    /// The first child to be recognized wins.
    Exclusive,
}

type Recognizers = SlotMap<RecognizerId, Recognizer>;

/// Several recognizers competing as one arbitration unit.
///
/// The children live in the recognizer store; the group only keeps their ids,
/// so every operation borrows the store alongside the group.
#[derive(Debug)]
pub struct GestureGroup {
    mode: GroupMode,
    children: Vec<RecognizerId>,
    state: RecognizerState,
    failed: Vec<bool>,
    /// Children that voted Accept before the group was granted the stream.
    candidates: Vec<usize>,
    /// Index of the child receiving input in sequence mode.
    current: usize,
    /// Last sample of every pointer currently down.
    held: Vec<TouchSample>,
    last_release: Option<Instant>,
    interval: Duration,
    priority: GesturePriority,
    policy: GesturePolicy,
    mask: GestureMask,
    node: Option<NodeId>,
}

impl GestureGroup {
    /// A group over `children`. `interval` bounds how long a sequence waits
    /// for the next child's input after every pointer lifted.
    pub(crate) fn new(mode: GroupMode, children: Vec<RecognizerId>, interval: Duration) -> Self {
        let failed = vec![false; children.len()];
        Self {
            mode,
            children,
            state: RecognizerState::Ready,
            failed,
            candidates: Vec::new(),
            current: 0,
            held: Vec::new(),
            last_release: None,
            interval,
            priority: GesturePriority::default(),
            policy: GesturePolicy::default(),
            mask: GestureMask::default(),
            node: None,
        }
    }

    pub fn mode(&self) -> GroupMode {
        self.mode
    }

    pub fn children(&self) -> &[RecognizerId] {
        &self.children
    }

    pub fn state(&self) -> RecognizerState {
        self.state
    }

    /// The child receiving input in sequence mode.
    pub fn current(&self) -> Option<RecognizerId> {
        match self.mode {
            GroupMode::Sequence => self.children.get(self.current).copied(),
            _ => None,
        }
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

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub(crate) fn set_node(&mut self, node: Option<NodeId>) {
        self.node = node;
    }

    pub(crate) fn handle_touch(
        &mut self,
        recognizers: &mut Recognizers,
        sample: &TouchSample,
    ) -> Vote {
        if self.state == RecognizerState::Fail {
            return Vote::Pending;
        }
        self.track(sample);
        if sample.kind == TouchKind::Down && self.state == RecognizerState::Ready {
            self.transition(RecognizerState::Detecting);
        }
        match self.mode {
            GroupMode::Sequence => {
                self.sequence_step(recognizers, |child| child.handle_touch(sample))
            }
            GroupMode::Parallel | GroupMode::Exclusive => {
                self.fan_out(recognizers, |child| child.handle_touch(sample))
            }
        }
    }

    pub(crate) fn handle_axis(
        &mut self,
        recognizers: &mut Recognizers,
        sample: &AxisSample,
    ) -> Vote {
        if self.state == RecognizerState::Fail {
            return Vote::Pending;
        }
        if self.state == RecognizerState::Ready {
            self.transition(RecognizerState::Detecting);
        }
        match self.mode {
            GroupMode::Sequence => {
                self.sequence_step(recognizers, |child| child.handle_axis(sample))
            }
            GroupMode::Parallel | GroupMode::Exclusive => {
                self.fan_out(recognizers, |child| child.handle_axis(sample))
            }
        }
    }

    pub(crate) fn tick(&mut self, recognizers: &mut Recognizers, now: Instant) -> Vote {
        match (self.mode, self.state) {
            (_, RecognizerState::Fail | RecognizerState::Ready) => Vote::Pending,
            (GroupMode::Sequence, _) => {
                if self.waiting_for_next_child()
                    && self.last_release.is_some_and(|release| {
                        now.saturating_duration_since(release) > self.interval
                    })
                {
                    tracing::debug!(
                        target: targets::REFEREE,
                        node = ?self.node,
                        step = self.current,
                        "sequence timed out waiting for next gesture"
                    );
                    return Vote::Reject;
                }
                self.sequence_step(recognizers, |child| child.tick(now))
            }
            _ => self.fan_out(recognizers, |child| child.tick(now)),
        }
    }

    /// The referee granted the group the stream.
    ///
    /// Returns a follow-up vote: a sequence that hands over to its next child
    /// replays the held pointers, and that child may reject them.
    pub(crate) fn on_accepted(&mut self, recognizers: &mut Recognizers) -> Vote {
        if self.state != RecognizerState::Detecting {
            return Vote::Pending;
        }
        self.transition(RecognizerState::Succeed);
        let candidates = std::mem::take(&mut self.candidates);
        match self.mode {
            GroupMode::Exclusive => {
                let winner = candidates.iter().min().copied();
                for index in 0..self.children.len() {
                    let Some(child) = recognizers.get_mut(self.children[index]) else {
                        continue;
                    };
                    if Some(index) == winner {
                        child.on_accepted();
                    } else if !self.failed[index] {
                        child.on_rejected();
                        self.failed[index] = true;
                    }
                }
                Vote::Pending
            }
            GroupMode::Parallel => {
                for index in candidates {
                    if let Some(child) = recognizers.get_mut(self.children[index]) {
                        child.on_accepted();
                    }
                }
                Vote::Pending
            }
            GroupMode::Sequence => {
                if !candidates.contains(&self.current) {
                    return Vote::Pending;
                }
                if let Some(child) = recognizers.get_mut(self.children[self.current]) {
                    child.on_accepted();
                }
                self.advance_if_done(recognizers, RecognizerState::Succeed)
            }
        }
    }

    /// The referee denied the group the stream.
    pub(crate) fn on_rejected(&mut self, recognizers: &mut Recognizers) {
        // Children a sequence already moved past are complete; they are only
        // reset when the scope closes.
        let first = match self.mode {
            GroupMode::Sequence => self.current,
            _ => 0,
        };
        for &id in self.children.iter().skip(first) {
            if let Some(child) = recognizers.get_mut(id) {
                child.on_rejected();
            }
        }
        self.failed.iter_mut().for_each(|failed| *failed = true);
        self.candidates.clear();
        self.transition(RecognizerState::Fail);
    }

    /// Back to Ready without callbacks.
    pub(crate) fn reset(&mut self, recognizers: &mut Recognizers) {
        for &id in &self.children {
            if let Some(child) = recognizers.get_mut(id) {
                child.reset();
            }
        }
        self.clear_runtime();
    }

    /// Back to Ready, reporting Cancel on children that were running.
    pub(crate) fn force_cancel(&mut self, recognizers: &mut Recognizers) {
        for &id in &self.children {
            if let Some(child) = recognizers.get_mut(id) {
                child.force_cancel();
            }
        }
        self.clear_runtime();
    }

    pub(crate) fn needs_more_input(&self, recognizers: &Recognizers) -> bool {
        match self.mode {
            GroupMode::Sequence => {
                self.waiting_for_next_child()
                    || self
                        .children
                        .get(self.current)
                        .and_then(|&id| recognizers.get(id))
                        .is_some_and(Recognizer::needs_more_input)
            }
            GroupMode::Parallel | GroupMode::Exclusive => self
                .children
                .iter()
                .zip(&self.failed)
                .filter(|(_, failed)| !**failed)
                .filter_map(|(&id, _)| recognizers.get(id))
                .any(Recognizer::needs_more_input),
        }
    }

    /// A sequence whose completed child handed over but whose next child has
    /// not seen a pointer yet.
    fn waiting_for_next_child(&self) -> bool {
        self.mode == GroupMode::Sequence
            && self.state == RecognizerState::Succeed
            && self.current > 0
            && self.current < self.children.len()
            && self.held.is_empty()
    }

    fn transition(&mut self, to: RecognizerState) {
        if self.state != to {
            tracing::trace!(
                target: targets::REFEREE,
                mode = ?self.mode,
                node = ?self.node,
                from = ?self.state,
                ?to,
                "group state transition"
            );
            self.state = to;
        }
    }

    fn clear_runtime(&mut self) {
        self.transition(RecognizerState::Ready);
        self.failed.iter_mut().for_each(|failed| *failed = false);
        self.candidates.clear();
        self.current = 0;
        self.held.clear();
        self.last_release = None;
    }

    fn track(&mut self, sample: &TouchSample) {
        let existing = self.held.iter().position(|held| held.id == sample.id);
        match (sample.kind, existing) {
            (TouchKind::Down, Some(index)) | (TouchKind::Move, Some(index)) => {
                self.held[index] = sample.clone();
            }
            (TouchKind::Down, None) => self.held.push(sample.clone()),
            (TouchKind::Up | TouchKind::Cancel, Some(index)) => {
                self.held.remove(index);
                if self.held.is_empty() {
                    self.last_release = Some(sample.time);
                }
            }
            _ => {}
        }
    }

    /// Deliver to every child still in the running.
    fn fan_out(
        &mut self,
        recognizers: &mut Recognizers,
        mut feed: impl FnMut(&mut Recognizer) -> Vote,
    ) -> Vote {
        let mut vote = Vote::Pending;
        for index in 0..self.children.len() {
            if self.failed[index] {
                continue;
            }
            let Some(child) = recognizers.get_mut(self.children[index]) else {
                continue;
            };
            let child_vote = feed(child);
            if self.child_vote(recognizers, index, child_vote) == Vote::Accept {
                vote = Vote::Accept;
            }
        }
        if self.failed.iter().all(|failed| *failed) {
            return Vote::Reject;
        }
        match self.mode {
            GroupMode::Exclusive if self.state != RecognizerState::Succeed => {
                self.exclusive_vote()
            }
            _ => vote,
        }
    }

    /// Accept once the earliest child still running has accepted.
    fn exclusive_vote(&self) -> Vote {
        match self.failed.iter().position(|failed| !failed) {
            Some(index) if self.candidates.contains(&index) => Vote::Accept,
            _ => Vote::Pending,
        }
    }

    /// Deliver to the current child of a sequence.
    fn sequence_step(
        &mut self,
        recognizers: &mut Recognizers,
        feed: impl FnOnce(&mut Recognizer) -> Vote,
    ) -> Vote {
        let Some(child) = self
            .children
            .get(self.current)
            .and_then(|&id| recognizers.get_mut(id))
        else {
            return Vote::Pending;
        };
        let before = child.state();
        let child_vote = feed(child);
        let vote = self.child_vote(recognizers, self.current, child_vote);
        if vote == Vote::Reject {
            return Vote::Reject;
        }
        match self.advance_if_done(recognizers, before) {
            Vote::Pending => vote,
            follow_up => follow_up,
        }
    }

    /// Translate a child's vote into the group's.
    fn child_vote(&mut self, recognizers: &mut Recognizers, index: usize, vote: Vote) -> Vote {
        let Some(child) = recognizers.get_mut(self.children[index]) else {
            return Vote::Pending;
        };
        match vote {
            Vote::Pending => Vote::Pending,
            Vote::Reject => {
                child.on_rejected();
                self.failed[index] = true;
                self.candidates.retain(|&candidate| candidate != index);
                match self.mode {
                    GroupMode::Sequence => Vote::Reject,
                    GroupMode::Parallel | GroupMode::Exclusive => Vote::Pending,
                }
            }
            Vote::Accept if self.state == RecognizerState::Succeed => {
                child.on_accepted();
                Vote::Pending
            }
            Vote::Accept => {
                if !self.candidates.contains(&index) {
                    self.candidates.push(index);
                }
                Vote::Accept
            }
        }
    }

    /// Move a sequence past a child that has completed.
    fn advance_if_done(&mut self, recognizers: &mut Recognizers, before: RecognizerState) -> Vote {
        if self.mode != GroupMode::Sequence || self.state != RecognizerState::Succeed {
            return Vote::Pending;
        }
        let Some(child) = self
            .children
            .get(self.current)
            .and_then(|&id| recognizers.get(id))
        else {
            return Vote::Pending;
        };
        let done = if child.gesture_type().is_continuous() {
            child.is_finished()
                || (before == RecognizerState::Succeed && child.state() == RecognizerState::Ready)
        } else {
            child.state() == RecognizerState::Succeed
        };
        if !done {
            return Vote::Pending;
        }

        self.current += 1;
        tracing::debug!(
            target: targets::REFEREE,
            node = ?self.node,
            step = self.current,
            of = self.children.len(),
            "sequence advanced"
        );
        let Some(&next) = self.children.get(self.current) else {
            return Vote::Pending;
        };
        let mut vote = Vote::Pending;
        for held in self.held.clone() {
            let Some(child) = recognizers.get_mut(next) else {
                break;
            };
            let replayed = child.handle_touch(&held.with_kind(TouchKind::Down));
            vote = self.child_vote(recognizers, self.current, replayed);
            if vote == Vote::Reject {
                break;
            }
        }
        vote
    }
}
