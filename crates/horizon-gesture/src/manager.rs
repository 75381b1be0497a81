//! Event dispatch.
//!
//! The [`EventManager`] owns the node tree and every gesture attached to it,
//! and is the single entry point for input:
//!
//! 1. A Down is hit tested; the gestures of every responding node (deepest
//!    first) join an arbitration scope for the pointer.
//! 2. Each live gesture of the scope receives the sample in its node's local
//!    space and votes; the referee resolves each vote before the next
//!    gesture sees the sample.
//! 3. Moves, Ups and Cancels go to the gestures of the pointer's scope; raw
//!    listeners of the nodes hit by the Down see them too.
//! 4. Structural changes queued by callbacks are applied once the sample has
//!    been fully dispatched.
//!
//! Time-driven recognition (long press, multi-tap expiry) advances on every
//! dispatched sample and on explicit [`EventManager::tick`] calls.

use std::collections::HashMap;
use std::time::Instant;

use horizon_gesture_core::logging::{span_names, targets};
use horizon_gesture_core::{GestureConfig, GestureError, NodeId, NodeTree, PerfSpan, Result};
use slotmap::SecondaryMap;

use crate::arena::{GestureArena, GestureHandle};
use crate::event::{AxisPhase, AxisSample, TouchKind, TouchSample};
use crate::hub::{GestureEventHub, InputEventHub, Mutation, MutationQueue};
use crate::model::{BuiltGesture, GestureModel};
use crate::post_event::PostEventManager;
use crate::recognizer::GestureMask;
use crate::referee::{GestureReferee, PointerKey, ScopeId};

/// Routes input through hit testing and arbitration.
#[derive(Debug)]
pub struct EventManager {
    tree: NodeTree,
    config: GestureConfig,
    arena: GestureArena,
    referee: GestureReferee,
    post_events: PostEventManager,
    gesture_hubs: SecondaryMap<NodeId, GestureEventHub>,
    input_hubs: SecondaryMap<NodeId, InputEventHub>,
    /// Nodes hit by each pointer's Down, for raw listeners.
    touch_targets: HashMap<u64, Vec<NodeId>>,
    mutations: MutationQueue,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    /// An empty tree with default thresholds.
    pub fn new() -> Self {
        Self::with_tree(NodeTree::new(), GestureConfig::default())
    }

    pub fn with_config(config: GestureConfig) -> Self {
        Self::with_tree(NodeTree::new(), config)
    }

    pub fn with_tree(tree: NodeTree, config: GestureConfig) -> Self {
        Self {
            tree,
            config,
            arena: GestureArena::new(),
            referee: GestureReferee::new(),
            post_events: PostEventManager::new(),
            gesture_hubs: SecondaryMap::new(),
            input_hubs: SecondaryMap::new(),
            touch_targets: HashMap::new(),
            mutations: MutationQueue::new(),
        }
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// Mutable access for building and laying out the tree.
    ///
    /// Remove nodes through [`remove_node`](Self::remove_node) so their
    /// gestures are cancelled and detached.
    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn arena(&self) -> &GestureArena {
        &self.arena
    }

    pub fn referee(&self) -> &GestureReferee {
        &self.referee
    }

    pub fn post_events(&self) -> &PostEventManager {
        &self.post_events
    }

    /// A handle for requesting structural changes from inside callbacks.
    pub fn mutation_queue(&self) -> MutationQueue {
        self.mutations.clone()
    }

    /// Gestures attached to `node`, in attachment order.
    pub fn gestures(&self, node: NodeId) -> &[GestureHandle] {
        self.gesture_hubs
            .get(node)
            .map(GestureEventHub::gestures)
            .unwrap_or(&[])
    }

    /// Raw input listeners of `node`, created on first use.
    pub fn input_events(&mut self, node: NodeId) -> Result<&InputEventHub> {
        if !self.tree.contains(node) {
            return Err(GestureError::NodeNotFound(node));
        }
        self.input_hubs
            .entry(node)
            .map(|entry| &*entry.or_default())
            .ok_or(GestureError::NodeNotFound(node))
    }

    /// Attach every gesture the model finished building.
    pub fn attach(
        &mut self,
        node: NodeId,
        model: &mut GestureModel,
    ) -> Result<Vec<GestureHandle>> {
        if !self.tree.contains(node) {
            return Err(GestureError::NodeNotFound(node));
        }
        let gestures = model.take_gestures()?;
        Ok(gestures
            .into_iter()
            .map(|gesture| self.insert(node, gesture))
            .collect())
    }

    /// Attach one gesture.
    pub fn attach_gesture(
        &mut self,
        node: NodeId,
        gesture: impl Into<BuiltGesture>,
    ) -> Result<GestureHandle> {
        if !self.tree.contains(node) {
            return Err(GestureError::NodeNotFound(node));
        }
        Ok(self.insert(node, gesture.into()))
    }

    /// Replace a node's gestures with a rebuilt list.
    ///
    /// Gestures are matched by position. A recognizer compatible with the
    /// one it replaces takes over its in-flight state and arbitration slot;
    /// anything else cancels the old gesture and starts fresh.
    pub fn replace_gestures(&mut self, node: NodeId, gestures: Vec<BuiltGesture>) -> Result<()> {
        if !self.tree.contains(node) {
            return Err(GestureError::NodeNotFound(node));
        }
        let old = self
            .gesture_hubs
            .get_mut(node)
            .map(GestureEventHub::take)
            .unwrap_or_default();
        let mut old = old.into_iter();
        let mut kept = Vec::with_capacity(gestures.len());

        for gesture in gestures {
            match (old.next(), gesture) {
                (Some(GestureHandle::Single(id)), BuiltGesture::Single(mut fresh)) => {
                    let reconciled = match self.arena.recognizer_mut(id) {
                        Some(previous) => fresh.reconcile_from(previous),
                        None => false,
                    };
                    if reconciled && let Some(slot) = self.arena.recognizer_mut(id) {
                        *slot = fresh;
                        kept.push(GestureHandle::Single(id));
                    } else {
                        self.retire(GestureHandle::Single(id));
                        kept.push(self.arena.insert(
                            BuiltGesture::Single(fresh),
                            node,
                            self.config.multi_tap_interval(),
                        ));
                    }
                }
                (previous, gesture) => {
                    if let Some(previous) = previous {
                        self.retire(previous);
                    }
                    kept.push(self.arena.insert(
                        gesture,
                        node,
                        self.config.multi_tap_interval(),
                    ));
                }
            }
        }
        for stale in old {
            self.retire(stale);
        }

        tracing::debug!(
            target: targets::DISPATCH,
            ?node,
            gestures = kept.len(),
            "gestures replaced"
        );
        if let Some(hub) = self.gesture_hubs.entry(node).map(|entry| entry.or_default()) {
            for handle in kept {
                hub.push(handle);
            }
        }
        Ok(())
    }

    /// Detach every gesture from `node`, cancelling running ones.
    pub fn clear_gestures(&mut self, node: NodeId) {
        let handles = self
            .gesture_hubs
            .get_mut(node)
            .map(GestureEventHub::take)
            .unwrap_or_default();
        for handle in handles {
            self.retire(handle);
        }
    }

    /// Drive every gesture of `node` back to Ready, firing Cancel where one
    /// was running, and take them out of arbitration. They stay attached.
    pub fn force_clean_recognizers(&mut self, node: NodeId) {
        let handles = self.gestures(node).to_vec();
        for handle in handles {
            self.arena.force_cancel(handle);
            self.referee.remove_handle(handle, &mut self.arena);
        }
    }

    /// Remove `node` and its subtree, cancelling and dropping their gestures.
    ///
    /// Returns the removed nodes, descendants first.
    pub fn remove_node(&mut self, node: NodeId) -> Vec<NodeId> {
        let removed = self.tree.remove(node);
        for &id in &removed {
            if let Some(mut hub) = self.gesture_hubs.remove(id) {
                for handle in hub.take() {
                    self.retire(handle);
                }
            }
            self.input_hubs.remove(id);
            self.post_events.purge_node(id);
        }
        for targets in self.touch_targets.values_mut() {
            targets.retain(|target| !removed.contains(target));
        }
        if !removed.is_empty() {
            tracing::debug!(
                target: targets::DISPATCH,
                ?node,
                removed = removed.len(),
                "node removed"
            );
        }
        removed
    }

    /// Reset all arbitration, dropping every open scope without callbacks.
    pub fn clean(&mut self) {
        self.referee.clear(&mut self.arena);
        self.touch_targets.clear();
        self.post_events.clear();
    }

    /// Dispatch one live touch sample.
    #[tracing::instrument(
        skip_all,
        target = "horizon_gesture::dispatch",
        level = "trace",
        fields(id = sample.id, kind = ?sample.kind)
    )]
    pub fn dispatch_touch(&mut self, sample: &TouchSample) {
        let _perf = PerfSpan::new(span_names::DISPATCH_TOUCH);
        self.run_deadlines(sample.time);
        let hits = (sample.kind == TouchKind::Down).then(|| self.tree.touch_test(sample.position));
        self.route_touch(sample, hits);
        self.apply_mutations();
    }

    /// Dispatch one axis sample.
    #[tracing::instrument(
        skip_all,
        target = "horizon_gesture::dispatch",
        level = "trace",
        fields(id = sample.id, phase = ?sample.phase)
    )]
    pub fn dispatch_axis(&mut self, sample: &AxisSample) {
        let _perf = PerfSpan::new(span_names::DISPATCH_AXIS);
        self.run_deadlines(sample.time);

        let key = PointerKey::Axis(sample.id);
        let hits = self.tree.touch_test(sample.position);
        self.notify_axis(&hits, sample);
        let scope = match self.referee.scope_of(key) {
            Some(scope) => Some(scope),
            None if matches!(sample.phase, AxisPhase::Begin | AxisPhase::Update) => {
                let handles = self.collect_gestures(&hits);
                Some(self.referee.join(key, &handles, &self.arena))
            }
            None => {
                tracing::trace!(
                    target: targets::DISPATCH,
                    id = sample.id,
                    "axis sample without a stream"
                );
                None
            }
        };
        if let Some(scope) = scope {
            for handle in self.referee.live_units(scope) {
                if self.referee.is_live(scope, handle) {
                    self.deliver_axis(scope, handle, sample);
                }
            }
            if matches!(sample.phase, AxisPhase::End | AxisPhase::Cancel) {
                self.referee.release(key, &mut self.arena);
            }
        }
        self.apply_mutations();
    }

    /// Advance time-driven recognition without new input.
    pub fn tick(&mut self, now: Instant) {
        self.run_deadlines(now);
        self.apply_mutations();
    }

    /// Inject a synthetic touch sample aimed at `node`.
    ///
    /// The sample is hit tested within `node`'s subtree and dispatched like
    /// live input. Returns `false`, without side effects, when `node` no
    /// longer exists, when the sample duplicates one already posted, or when
    /// it continues a pointer that was never posted down. A second Down for a
    /// pointer still down cancels the stale stream first.
    pub fn post_event(&mut self, node: NodeId, sample: &TouchSample) -> bool {
        if !self.tree.contains(node) {
            tracing::debug!(target: targets::POST_EVENT, ?node, "target node missing");
            return false;
        }
        if !self.post_events.check_point_validity(node, sample) {
            return false;
        }
        if sample.kind == TouchKind::Down
            && self.post_events.have_received_down_event(node, sample.id)
        {
            if let Some(cancel) = self.post_events.stale_cancel(node, sample.id, sample.time) {
                tracing::debug!(
                    target: targets::POST_EVENT,
                    ?node,
                    id = sample.id,
                    "cancelling stale posted stream"
                );
                self.dispatch_posted(node, &cancel);
            }
            self.post_events.purge(node, sample.id);
        }
        self.post_events.record(node, sample);
        self.dispatch_posted(node, sample);
        if sample.kind.is_terminal() {
            self.post_events.purge(node, sample.id);
        }
        true
    }

    /// Apply structural changes queued from callbacks.
    pub fn apply_mutations(&mut self) {
        loop {
            let batch = self.mutations.drain();
            if batch.is_empty() {
                return;
            }
            for mutation in batch {
                match mutation {
                    Mutation::ReplaceGestures { node, gestures } => {
                        if let Err(err) = self.replace_gestures(node, gestures) {
                            tracing::warn!(
                                target: targets::DISPATCH,
                                %err,
                                "queued gesture replacement dropped"
                            );
                        }
                    }
                    Mutation::ClearGestures(node) => self.clear_gestures(node),
                    Mutation::ForceClean(node) => self.force_clean_recognizers(node),
                    Mutation::RemoveNode(node) => {
                        self.remove_node(node);
                    }
                }
            }
        }
    }

    fn insert(&mut self, node: NodeId, gesture: BuiltGesture) -> GestureHandle {
        let handle = self
            .arena
            .insert(gesture, node, self.config.multi_tap_interval());
        if let Some(hub) = self.gesture_hubs.entry(node).map(|entry| entry.or_default()) {
            hub.push(handle);
        }
        tracing::debug!(target: targets::DISPATCH, ?node, ?handle, "gesture attached");
        handle
    }

    /// Cancel a gesture, take it out of arbitration and drop it.
    fn retire(&mut self, handle: GestureHandle) {
        self.arena.force_cancel(handle);
        self.referee.remove_handle(handle, &mut self.arena);
        self.arena.remove(handle);
    }

    fn dispatch_posted(&mut self, node: NodeId, sample: &TouchSample) {
        let mut posted = sample.clone();
        posted.posted = true;
        self.run_deadlines(posted.time);
        let hits = (posted.kind == TouchKind::Down)
            .then(|| self.tree.touch_test_subtree(node, posted.position));
        self.route_touch(&posted, hits);
        self.apply_mutations();
    }

    fn route_touch(&mut self, sample: &TouchSample, hits: Option<Vec<NodeId>>) {
        let key = PointerKey::Touch(sample.id);
        if sample.kind == TouchKind::Down {
            if self.referee.scope_of(key).is_some() {
                tracing::debug!(
                    target: targets::DISPATCH,
                    id = sample.id,
                    "pointer went down twice, cancelling the stale stream"
                );
                self.route_touch(&sample.with_kind(TouchKind::Cancel), None);
            }
            let hits = hits.unwrap_or_default();
            self.notify_touch(&hits, sample);
            let handles = self.collect_gestures(&hits);
            self.touch_targets.insert(sample.id, hits);
            let scope = self.referee.join(key, &handles, &self.arena);
            for handle in handles {
                if self.referee.is_live(scope, handle) {
                    self.deliver_touch(scope, handle, sample);
                }
            }
            return;
        }

        let targets = if sample.kind.is_terminal() {
            self.touch_targets.remove(&sample.id)
        } else {
            self.touch_targets.get(&sample.id).cloned()
        };
        if let Some(targets) = targets {
            self.notify_touch(&targets, sample);
        }
        let Some(scope) = self.referee.scope_of(key) else {
            tracing::trace!(
                target: targets::DISPATCH,
                id = sample.id,
                kind = ?sample.kind,
                "sample for a pointer that never went down"
            );
            return;
        };
        for handle in self.referee.live_units(scope) {
            if self.referee.is_live(scope, handle) {
                self.deliver_touch(scope, handle, sample);
            }
        }
        if sample.kind.is_terminal() {
            self.referee.release(key, &mut self.arena);
        }
    }

    fn deliver_touch(&mut self, scope: ScopeId, handle: GestureHandle, sample: &TouchSample) {
        let Some(local) = self
            .arena
            .node(handle)
            .and_then(|node| self.tree.to_local(node, sample.position))
        else {
            tracing::trace!(target: targets::DISPATCH, ?handle, "gesture node gone");
            return;
        };
        let mut local_sample = sample.clone();
        local_sample.local_position = local;
        let vote = self.arena.handle_touch(handle, &local_sample);
        self.referee.vote(scope, handle, vote, &mut self.arena);
    }

    fn deliver_axis(&mut self, scope: ScopeId, handle: GestureHandle, sample: &AxisSample) {
        let Some(local) = self
            .arena
            .node(handle)
            .and_then(|node| self.tree.to_local(node, sample.position))
        else {
            tracing::trace!(target: targets::DISPATCH, ?handle, "gesture node gone");
            return;
        };
        let mut local_sample = sample.clone();
        local_sample.local_position = local;
        let vote = self.arena.handle_axis(handle, &local_sample);
        self.referee.vote(scope, handle, vote, &mut self.arena);
    }

    /// Gestures of the hit nodes, deepest node first.
    ///
    /// A gesture masked with [`GestureMask::IgnoreInternal`] drops the
    /// gestures of its node's descendants.
    fn collect_gestures(&self, hits: &[NodeId]) -> Vec<GestureHandle> {
        let mut masking: Vec<NodeId> = Vec::new();
        let mut per_node: Vec<&[GestureHandle]> = Vec::new();
        for &node in hits.iter().rev() {
            if masking
                .iter()
                .any(|&ancestor| self.tree.is_ancestor(ancestor, node))
            {
                continue;
            }
            let handles = self.gestures(node);
            if handles
                .iter()
                .any(|&handle| self.arena.mask(handle) == GestureMask::IgnoreInternal)
            {
                masking.push(node);
            }
            per_node.push(handles);
        }
        per_node.into_iter().rev().flatten().copied().collect()
    }

    fn run_deadlines(&mut self, now: Instant) {
        if self.referee.is_idle() {
            return;
        }
        let _perf = PerfSpan::new(span_names::TICK);
        for scope in self.referee.scope_ids() {
            for handle in self.referee.live_units(scope) {
                if self.referee.is_live(scope, handle) {
                    let vote = self.arena.tick(handle, now);
                    self.referee.vote(scope, handle, vote, &mut self.arena);
                }
            }
            self.referee.try_close(scope, &mut self.arena);
        }
    }

    fn notify_touch(&self, targets: &[NodeId], sample: &TouchSample) {
        for &node in targets {
            let (Some(hub), Some(local)) =
                (self.input_hubs.get(node), self.tree.to_local(node, sample.position))
            else {
                continue;
            };
            let mut local_sample = sample.clone();
            local_sample.local_position = local;
            hub.on_touch.emit(&local_sample);
        }
    }

    fn notify_axis(&self, targets: &[NodeId], sample: &AxisSample) {
        for &node in targets {
            let (Some(hub), Some(local)) =
                (self.input_hubs.get(node), self.tree.to_local(node, sample.position))
            else {
                continue;
            };
            let mut local_sample = sample.clone();
            local_sample.local_position = local;
            hub.on_axis.emit(&local_sample);
        }
    }
}
