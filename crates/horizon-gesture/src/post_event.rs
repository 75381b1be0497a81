//! Bookkeeping for synthetic touch streams.
//!
//! Applications may inject touch samples aimed at a node (replaying a
//! recorded interaction, driving UI tests). Injected samples go through the
//! same hit test and arbitration as live input, so the streams must be as
//! well-formed as live ones. Per (node, pointer id) the manager tracks:
//!
//! ```text
//! None ──Down──> DownPosted ──Move──> MovePosted ──Up/Cancel──> (purged)
//!                    │                                ^
//!                    └──────────────Up/Cancel─────────┘
//! ```
//!
//! The dispatch itself is done by [`EventManager::post_event`].
//!
//! [`EventManager::post_event`]: crate::EventManager::post_event

use std::time::Instant;

use horizon_gesture_core::NodeId;
use horizon_gesture_core::logging::targets;

use crate::event::{TouchKind, TouchSample};

/// One accepted synthetic sample, retained until its pointer resolves.
#[derive(Debug, Clone)]
pub struct PostEventAction {
    pub node: NodeId,
    pub sample: TouchSample,
}

/// Tracks Down/Up pairing of injected samples.
#[derive(Debug, Default)]
pub struct PostEventManager {
    actions: Vec<PostEventAction>,
}

impl PostEventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sample with the same pointer id and timestamp was already posted to
    /// `node` and has not resolved yet.
    pub fn is_duplicate(&self, node: NodeId, sample: &TouchSample) -> bool {
        self.actions.iter().any(|action| {
            action.node == node
                && action.sample.id == sample.id
                && action.sample.time == sample.time
        })
    }

    /// Whether `sample` may be posted to `node` at all.
    ///
    /// Duplicates are refused, and so is anything but a Down for a pointer
    /// that has no Down outstanding.
    pub fn check_point_validity(&self, node: NodeId, sample: &TouchSample) -> bool {
        if self.is_duplicate(node, sample) {
            tracing::debug!(
                target: targets::POST_EVENT,
                ?node,
                id = sample.id,
                kind = ?sample.kind,
                "duplicate posted sample refused"
            );
            return false;
        }
        if sample.kind != TouchKind::Down && !self.have_received_down_event(node, sample.id) {
            tracing::debug!(
                target: targets::POST_EVENT,
                ?node,
                id = sample.id,
                kind = ?sample.kind,
                "posted sample without a down refused"
            );
            return false;
        }
        true
    }

    /// A Down for (`node`, `id`) is outstanding.
    pub fn have_received_down_event(&self, node: NodeId, id: u64) -> bool {
        self.actions.iter().any(|action| {
            action.node == node && action.sample.id == id && action.sample.kind == TouchKind::Down
        })
    }

    /// The last sample posted for an unresolved (`node`, `id`) pair.
    pub fn last_sample(&self, node: NodeId, id: u64) -> Option<&TouchSample> {
        self.actions
            .iter()
            .rev()
            .find(|action| action.node == node && action.sample.id == id)
            .map(|action| &action.sample)
    }

    /// Record an accepted sample.
    pub fn record(&mut self, node: NodeId, sample: &TouchSample) {
        tracing::trace!(
            target: targets::POST_EVENT,
            ?node,
            id = sample.id,
            kind = ?sample.kind,
            "posted sample recorded"
        );
        self.actions.push(PostEventAction {
            node,
            sample: sample.clone(),
        });
    }

    /// Forget everything about (`node`, `id`).
    pub fn purge(&mut self, node: NodeId, id: u64) {
        self.actions
            .retain(|action| !(action.node == node && action.sample.id == id));
    }

    /// Forget everything posted to `node`, returning the pointers that were
    /// still down.
    pub fn purge_node(&mut self, node: NodeId) -> Vec<u64> {
        let mut open: Vec<u64> = self
            .actions
            .iter()
            .filter(|action| action.node == node && action.sample.kind == TouchKind::Down)
            .map(|action| action.sample.id)
            .collect();
        open.dedup();
        self.actions.retain(|action| action.node != node);
        open
    }

    /// A Cancel closing the unresolved (`node`, `id`) pair at its last known
    /// position, stamped no earlier than `time`.
    pub fn stale_cancel(&self, node: NodeId, id: u64, time: Instant) -> Option<TouchSample> {
        let last = self.last_sample(node, id)?;
        let mut cancel = last.with_kind(TouchKind::Cancel);
        cancel.time = time.max(last.time);
        Some(cancel)
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_gesture_core::{NodeTree, Rect};
    use std::time::Duration;

    fn node() -> NodeId {
        NodeTree::new().create_root(Rect::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn test_move_without_down_is_invalid() {
        let manager = PostEventManager::new();
        let sample = TouchSample::moved(1, 0.0, 0.0, Instant::now());
        assert!(!manager.check_point_validity(node(), &sample));
    }

    #[test]
    fn test_duplicate_refused_until_purged() {
        let node = node();
        let now = Instant::now();
        let mut manager = PostEventManager::new();
        let down = TouchSample::down(1, 0.0, 0.0, now);
        assert!(manager.check_point_validity(node, &down));
        manager.record(node, &down);
        assert!(!manager.check_point_validity(node, &down));
        assert!(manager.have_received_down_event(node, 1));

        manager.purge(node, 1);
        assert!(manager.is_empty());
        assert!(manager.check_point_validity(node, &down));
    }

    #[test]
    fn test_stale_cancel_uses_last_position() {
        let node = node();
        let now = Instant::now();
        let mut manager = PostEventManager::new();
        manager.record(node, &TouchSample::down(3, 1.0, 1.0, now));
        let moved = TouchSample::moved(3, 4.0, 2.0, now + Duration::from_millis(5));
        manager.record(node, &moved);

        let cancel = manager
            .stale_cancel(node, 3, now + Duration::from_millis(10))
            .unwrap();
        assert_eq!(cancel.kind, TouchKind::Cancel);
        assert_eq!(cancel.position.x, 4.0);
        assert_eq!(manager.purge_node(node), vec![3]);
        assert!(manager.is_empty());
    }
}
