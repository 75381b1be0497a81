//! Per-node event hubs and deferred structural changes.
//!
//! A node's [`GestureEventHub`] lists the gestures attached to it; its
//! [`InputEventHub`] carries raw touch and axis listeners that see every
//! sample hitting the node, whatever arbitration decides.
//!
//! Gesture callbacks run while the event manager is mid-dispatch, so they
//! cannot restructure the tree or the gesture lists directly. They queue a
//! [`Mutation`] on a [`MutationQueue`] instead; the manager applies the queue
//! once the dispatch round is over.

use std::sync::Arc;

use horizon_gesture_core::logging::targets;
use horizon_gesture_core::{NodeId, Signal};
use parking_lot::Mutex;

use crate::arena::GestureHandle;
use crate::event::{AxisSample, TouchSample};
use crate::model::BuiltGesture;

/// Gestures attached to one node, in attachment order.
#[derive(Debug, Default)]
pub struct GestureEventHub {
    gestures: Vec<GestureHandle>,
}

impl GestureEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gestures(&self) -> &[GestureHandle] {
        &self.gestures
    }

    pub fn push(&mut self, handle: GestureHandle) {
        self.gestures.push(handle);
    }

    pub fn remove(&mut self, handle: GestureHandle) -> bool {
        let before = self.gestures.len();
        self.gestures.retain(|&h| h != handle);
        self.gestures.len() != before
    }

    pub fn contains(&self, handle: GestureHandle) -> bool {
        self.gestures.contains(&handle)
    }

    /// Detach everything, handing the handles back.
    pub fn take(&mut self) -> Vec<GestureHandle> {
        std::mem::take(&mut self.gestures)
    }

    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }
}

/// Raw input listeners of one node.
///
/// Samples arrive with `local_position` in the node's space.
#[derive(Debug, Default)]
pub struct InputEventHub {
    pub on_touch: Signal<TouchSample>,
    pub on_axis: Signal<AxisSample>,
}

/// A structural change requested during dispatch.
#[derive(Debug)]
pub enum Mutation {
    /// Rebuild a node's gestures, keeping in-flight state where compatible.
    ReplaceGestures {
        node: NodeId,
        gestures: Vec<BuiltGesture>,
    },
    /// Detach every gesture from a node, cancelling running ones.
    ClearGestures(NodeId),
    /// Force every gesture of a node back to Ready.
    ForceClean(NodeId),
    /// Remove a node and its subtree.
    RemoveNode(NodeId),
}

/// Cloneable handle for queueing [`Mutation`]s from callbacks.
#[derive(Debug, Clone, Default)]
pub struct MutationQueue {
    pending: Arc<Mutex<Vec<Mutation>>>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, mutation: Mutation) {
        tracing::trace!(target: targets::DISPATCH, ?mutation, "mutation queued");
        self.pending.lock().push(mutation);
    }

    pub fn replace_gestures(&self, node: NodeId, gestures: Vec<BuiltGesture>) {
        self.push(Mutation::ReplaceGestures { node, gestures });
    }

    pub fn clear_gestures(&self, node: NodeId) {
        self.push(Mutation::ClearGestures(node));
    }

    pub fn force_clean(&self, node: NodeId) {
        self.push(Mutation::ForceClean(node));
    }

    pub fn remove_node(&self, node: NodeId) {
        self.push(Mutation::RemoveNode(node));
    }

    /// Take every queued mutation, oldest first.
    pub fn drain(&self) -> Vec<Mutation> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

static_assertions::assert_impl_all!(MutationQueue: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_gesture_core::{NodeTree, Rect};

    #[test]
    fn test_queue_is_shared_between_clones() {
        let mut tree = NodeTree::new();
        let node = tree.create_root(Rect::new(0.0, 0.0, 10.0, 10.0));
        let queue = MutationQueue::new();
        let handle = queue.clone();
        handle.clear_gestures(node);
        handle.remove_node(node);

        let drained = queue.drain();
        assert!(matches!(drained[0], Mutation::ClearGestures(n) if n == node));
        assert!(matches!(drained[1], Mutation::RemoveNode(n) if n == node));
        assert!(queue.is_empty());
    }
}
