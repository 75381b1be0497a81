//! Storage for every recognizer and group the event manager owns.
//!
//! Nodes refer to their gestures through [`GestureHandle`]s, and the referee
//! arbitrates between handles. All access goes through this store, so a
//! handle whose gesture was removed simply misses.

use std::time::{Duration, Instant};

use horizon_gesture_core::NodeId;
use slotmap::SlotMap;

use crate::event::{AxisSample, TouchSample};
use crate::group::{GestureGroup, GroupId};
use crate::model::BuiltGesture;
use crate::recognizer::{
    GestureMask, GesturePolicy, GesturePriority, Recognizer, RecognizerId, RecognizerState, Vote,
};

/// One arbitration unit: a single recognizer or a whole group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureHandle {
    Single(RecognizerId),
    Group(GroupId),
}

/// Owner of recognizers and groups.
#[derive(Debug, Default)]
pub struct GestureArena {
    recognizers: SlotMap<RecognizerId, Recognizer>,
    groups: SlotMap<GroupId, GestureGroup>,
}

impl GestureArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a built gesture and bind it to `node`.
    ///
    /// `interval` is the sequence hand-over window used by groups.
    pub fn insert(
        &mut self,
        gesture: BuiltGesture,
        node: NodeId,
        interval: Duration,
    ) -> GestureHandle {
        match gesture {
            BuiltGesture::Single(mut recognizer) => {
                recognizer.set_node(Some(node));
                GestureHandle::Single(self.recognizers.insert(recognizer))
            }
            BuiltGesture::Group(spec) => {
                let children = spec
                    .children
                    .into_iter()
                    .map(|mut child| {
                        child.set_node(Some(node));
                        self.recognizers.insert(child)
                    })
                    .collect();
                let mut group = GestureGroup::new(spec.mode, children, interval);
                group.set_node(Some(node));
                group.set_priority(spec.priority);
                group.set_policy(spec.policy);
                group.set_mask(spec.mask);
                GestureHandle::Group(self.groups.insert(group))
            }
        }
    }

    /// Drop a gesture without callbacks. Groups take their children along.
    pub fn remove(&mut self, handle: GestureHandle) -> bool {
        match handle {
            GestureHandle::Single(id) => self.recognizers.remove(id).is_some(),
            GestureHandle::Group(id) => {
                let Some(group) = self.groups.remove(id) else {
                    return false;
                };
                for &child in group.children() {
                    self.recognizers.remove(child);
                }
                true
            }
        }
    }

    pub fn contains(&self, handle: GestureHandle) -> bool {
        match handle {
            GestureHandle::Single(id) => self.recognizers.contains_key(id),
            GestureHandle::Group(id) => self.groups.contains_key(id),
        }
    }

    pub fn recognizer(&self, id: RecognizerId) -> Option<&Recognizer> {
        self.recognizers.get(id)
    }

    pub fn recognizer_mut(&mut self, id: RecognizerId) -> Option<&mut Recognizer> {
        self.recognizers.get_mut(id)
    }

    pub fn group(&self, id: GroupId) -> Option<&GestureGroup> {
        self.groups.get(id)
    }

    /// Number of recognizers, group children included.
    pub fn recognizer_count(&self) -> usize {
        self.recognizers.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn priority(&self, handle: GestureHandle) -> GesturePriority {
        match handle {
            GestureHandle::Single(id) => self.recognizers.get(id).map(Recognizer::priority),
            GestureHandle::Group(id) => self.groups.get(id).map(GestureGroup::priority),
        }
        .unwrap_or_default()
    }

    pub fn policy(&self, handle: GestureHandle) -> GesturePolicy {
        match handle {
            GestureHandle::Single(id) => self.recognizers.get(id).map(Recognizer::policy),
            GestureHandle::Group(id) => self.groups.get(id).map(GestureGroup::policy),
        }
        .unwrap_or_default()
    }

    pub fn mask(&self, handle: GestureHandle) -> GestureMask {
        match handle {
            GestureHandle::Single(id) => self.recognizers.get(id).map(Recognizer::mask),
            GestureHandle::Group(id) => self.groups.get(id).map(GestureGroup::mask),
        }
        .unwrap_or_default()
    }

    pub fn node(&self, handle: GestureHandle) -> Option<NodeId> {
        match handle {
            GestureHandle::Single(id) => self.recognizers.get(id)?.node(),
            GestureHandle::Group(id) => self.groups.get(id)?.node(),
        }
    }

    pub fn state(&self, handle: GestureHandle) -> Option<RecognizerState> {
        match handle {
            GestureHandle::Single(id) => self.recognizers.get(id).map(Recognizer::state),
            GestureHandle::Group(id) => self.groups.get(id).map(GestureGroup::state),
        }
    }

    pub fn handle_touch(&mut self, handle: GestureHandle, sample: &TouchSample) -> Vote {
        match handle {
            GestureHandle::Single(id) => self
                .recognizers
                .get_mut(id)
                .map_or(Vote::Pending, |recognizer| recognizer.handle_touch(sample)),
            GestureHandle::Group(id) => match self.groups.get_mut(id) {
                Some(group) => group.handle_touch(&mut self.recognizers, sample),
                None => Vote::Pending,
            },
        }
    }

    pub fn handle_axis(&mut self, handle: GestureHandle, sample: &AxisSample) -> Vote {
        match handle {
            GestureHandle::Single(id) => self
                .recognizers
                .get_mut(id)
                .map_or(Vote::Pending, |recognizer| recognizer.handle_axis(sample)),
            GestureHandle::Group(id) => match self.groups.get_mut(id) {
                Some(group) => group.handle_axis(&mut self.recognizers, sample),
                None => Vote::Pending,
            },
        }
    }

    pub fn tick(&mut self, handle: GestureHandle, now: Instant) -> Vote {
        match handle {
            GestureHandle::Single(id) => self
                .recognizers
                .get_mut(id)
                .map_or(Vote::Pending, |recognizer| recognizer.tick(now)),
            GestureHandle::Group(id) => self
                .groups
                .get_mut(id)
                .map_or(Vote::Pending, |group| group.tick(&mut self.recognizers, now)),
        }
    }

    /// Grant the stream. Returns a follow-up vote the referee must process.
    pub fn accept(&mut self, handle: GestureHandle) -> Vote {
        match handle {
            GestureHandle::Single(id) => {
                if let Some(recognizer) = self.recognizers.get_mut(id) {
                    recognizer.on_accepted();
                }
                Vote::Pending
            }
            GestureHandle::Group(id) => self
                .groups
                .get_mut(id)
                .map_or(Vote::Pending, |group| group.on_accepted(&mut self.recognizers)),
        }
    }

    pub fn reject(&mut self, handle: GestureHandle) {
        match handle {
            GestureHandle::Single(id) => {
                if let Some(recognizer) = self.recognizers.get_mut(id) {
                    recognizer.on_rejected();
                }
            }
            GestureHandle::Group(id) => {
                if let Some(group) = self.groups.get_mut(id) {
                    group.on_rejected(&mut self.recognizers);
                }
            }
        }
    }

    pub fn reset(&mut self, handle: GestureHandle) {
        match handle {
            GestureHandle::Single(id) => {
                if let Some(recognizer) = self.recognizers.get_mut(id) {
                    recognizer.reset();
                }
            }
            GestureHandle::Group(id) => {
                if let Some(group) = self.groups.get_mut(id) {
                    group.reset(&mut self.recognizers);
                }
            }
        }
    }

    /// Back to Ready, firing Cancel where a gesture was running.
    pub fn force_cancel(&mut self, handle: GestureHandle) {
        match handle {
            GestureHandle::Single(id) => {
                if let Some(recognizer) = self.recognizers.get_mut(id) {
                    recognizer.force_cancel();
                }
            }
            GestureHandle::Group(id) => {
                if let Some(group) = self.groups.get_mut(id) {
                    group.force_cancel(&mut self.recognizers);
                }
            }
        }
    }

    pub fn needs_more_input(&self, handle: GestureHandle) -> bool {
        match handle {
            GestureHandle::Single(id) => self
                .recognizers
                .get(id)
                .is_some_and(Recognizer::needs_more_input),
            GestureHandle::Group(id) => self
                .groups
                .get(id)
                .is_some_and(|group| group.needs_more_input(&self.recognizers)),
        }
    }
}
