//! Arbitration between competing gestures.
//!
//! Every input stream is arbitrated in a *scope*. The first Down of a stream
//! opens a scope holding the gestures collected by hit testing; a Down whose
//! gestures already compete in a live scope joins that scope instead, so a
//! second finger landing next to the first feeds the same competition.
//!
//! Within a scope, each unit (a recognizer or a group) is [`UnitStatus::Pending`]
//! until it votes. The first unit to accept wins: undecided competitors are
//! rejected before the winner is told it was accepted. Priority and policy
//! refine this:
//!
//! - An accept while an undecided unit of higher priority exists is
//!   *blocked*. It is granted once every higher unit rejected, and rejected
//!   if one of them wins.
//! - [`GesturePolicy::Exclusive`] accepts immediately and rejects every other
//!   unit, whatever its priority.
//! - [`GesturePolicy::Cooperative`] accepts without rejecting anyone, and is
//!   never rejected by another unit's win.
//!
//! When the last pointer of a scope lifts, units still waiting for input
//! (a multi-tap between taps) keep the scope lingering. Otherwise undecided
//! units are rejected, blocked units are granted, every member is reset and
//! the scope is discarded.

use std::collections::HashSet;

use horizon_gesture_core::logging::targets;

use crate::arena::{GestureArena, GestureHandle};
use crate::recognizer::{GesturePolicy, Vote};

/// Identifies an input stream within arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKey {
    /// A touch or mouse pointer.
    Touch(u64),
    /// An axis gesture (wheel, touchpad scroll or pinch).
    Axis(u64),
}

/// Handle of an arbitration scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

/// Where a unit stands in its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    /// Still voting.
    Pending,
    /// Voted accept, waiting on a higher-priority unit.
    Blocked,
    /// Owns the stream.
    Accepted,
    /// Out of the competition.
    Rejected,
}

impl UnitStatus {
    /// Undecided units still stand between a blocked unit and the stream.
    fn is_undecided(self) -> bool {
        matches!(self, Self::Pending | Self::Blocked)
    }

    /// Live units keep receiving input.
    pub fn is_live(self) -> bool {
        self != Self::Rejected
    }
}

#[derive(Debug)]
struct Unit {
    handle: GestureHandle,
    status: UnitStatus,
}

#[derive(Debug)]
struct Scope {
    id: ScopeId,
    pointers: HashSet<PointerKey>,
    units: Vec<Unit>,
}

impl Scope {
    fn position(&self, handle: GestureHandle) -> Option<usize> {
        self.units.iter().position(|unit| unit.handle == handle)
    }
}

/// Resolves the votes of competing gestures.
#[derive(Debug, Default)]
pub struct GestureReferee {
    scopes: Vec<Scope>,
    next_scope: u64,
}

impl GestureReferee {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open scopes, lingering ones included.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// No arbitration in progress.
    pub fn is_idle(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn scope_ids(&self) -> Vec<ScopeId> {
        self.scopes.iter().map(|scope| scope.id).collect()
    }

    /// The scope a pointer is being arbitrated in.
    pub fn scope_of(&self, pointer: PointerKey) -> Option<ScopeId> {
        self.scopes
            .iter()
            .find(|scope| scope.pointers.contains(&pointer))
            .map(|scope| scope.id)
    }

    /// Status of a unit in whichever scope it competes in.
    pub fn status(&self, handle: GestureHandle) -> Option<UnitStatus> {
        self.scopes
            .iter()
            .find_map(|scope| scope.units.iter().find(|unit| unit.handle == handle))
            .map(|unit| unit.status)
    }

    /// Units of a scope that still receive input, in arbitration order.
    pub fn live_units(&self, scope: ScopeId) -> Vec<GestureHandle> {
        self.find(scope)
            .map(|scope| {
                scope
                    .units
                    .iter()
                    .filter(|unit| unit.status.is_live())
                    .map(|unit| unit.handle)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_live(&self, scope: ScopeId, handle: GestureHandle) -> bool {
        self.find(scope)
            .and_then(|scope| scope.units.iter().find(|unit| unit.handle == handle))
            .is_some_and(|unit| unit.status.is_live())
    }

    /// Enter a new pointer with the gestures its hit test collected.
    ///
    /// Scopes already holding any of `handles` are merged and the pointer
    /// joins the result; otherwise a fresh scope opens. Units are kept in
    /// descending priority, collection order breaking ties.
    pub fn join(
        &mut self,
        pointer: PointerKey,
        handles: &[GestureHandle],
        arena: &GestureArena,
    ) -> ScopeId {
        let mut matching: Vec<usize> = self
            .scopes
            .iter()
            .enumerate()
            .filter(|(_, scope)| handles.iter().any(|&h| scope.position(h).is_some()))
            .map(|(index, _)| index)
            .collect();

        let target = match matching.first().copied() {
            Some(first) => {
                // Fold later matches into the first, back to front so indices hold.
                while matching.len() > 1 {
                    let Some(index) = matching.pop() else { break };
                    let merged = self.scopes.remove(index);
                    tracing::debug!(
                        target: targets::REFEREE,
                        from = ?merged.id,
                        into = ?self.scopes[first].id,
                        "merging scopes"
                    );
                    let scope = &mut self.scopes[first];
                    scope.pointers.extend(merged.pointers);
                    for unit in merged.units {
                        if scope.position(unit.handle).is_none() {
                            scope.units.push(unit);
                        }
                    }
                }
                first
            }
            None => {
                let id = ScopeId(self.next_scope);
                self.next_scope += 1;
                tracing::debug!(
                    target: targets::REFEREE,
                    scope = ?id,
                    ?pointer,
                    "scope opened"
                );
                self.scopes.push(Scope {
                    id,
                    pointers: HashSet::new(),
                    units: Vec::new(),
                });
                self.scopes.len() - 1
            }
        };

        let scope = &mut self.scopes[target];
        scope.pointers.insert(pointer);
        for &handle in handles {
            if scope.position(handle).is_none() {
                scope.units.push(Unit {
                    handle,
                    status: UnitStatus::Pending,
                });
            }
        }
        scope
            .units
            .sort_by_key(|unit| std::cmp::Reverse(arena.priority(unit.handle)));
        tracing::trace!(
            target: targets::REFEREE,
            scope = ?scope.id,
            ?pointer,
            units = scope.units.len(),
            "pointer joined scope"
        );
        scope.id
    }

    /// Process a unit's vote.
    pub fn vote(
        &mut self,
        scope: ScopeId,
        handle: GestureHandle,
        vote: Vote,
        arena: &mut GestureArena,
    ) {
        let Some(index) = self.index(scope) else {
            return;
        };
        let Some(position) = self.scopes[index].position(handle) else {
            return;
        };
        let status = self.scopes[index].units[position].status;
        match (vote, status) {
            (Vote::Pending, _) | (_, UnitStatus::Rejected) => {}
            (Vote::Reject, _) => {
                tracing::debug!(
                    target: targets::REFEREE,
                    ?scope,
                    ?handle,
                    "unit rejected"
                );
                self.scopes[index].units[position].status = UnitStatus::Rejected;
                arena.reject(handle);
                self.promote_blocked(index, arena);
            }
            (Vote::Accept, UnitStatus::Accepted) => {
                // The unit already owns the stream; a later accept (a
                // continuous gesture detecting again) is granted directly.
                let follow_up = arena.accept(handle);
                self.follow_up(scope, handle, follow_up, arena);
            }
            (Vote::Accept, UnitStatus::Pending | UnitStatus::Blocked) => {
                self.try_accept(index, position, arena);
            }
        }
    }

    /// A pointer of the scope lifted or was cancelled.
    pub fn release(&mut self, pointer: PointerKey, arena: &mut GestureArena) {
        let Some(index) = self
            .scopes
            .iter()
            .position(|scope| scope.pointers.contains(&pointer))
        else {
            return;
        };
        self.scopes[index].pointers.remove(&pointer);
        let id = self.scopes[index].id;
        self.try_close(id, arena);
    }

    /// Close a scope whose pointers all lifted, unless it must linger.
    pub fn try_close(&mut self, scope: ScopeId, arena: &mut GestureArena) {
        let Some(index) = self.index(scope) else {
            return;
        };
        if !self.scopes[index].pointers.is_empty() {
            return;
        }
        let lingering = self.scopes[index]
            .units
            .iter()
            .any(|unit| unit.status.is_live() && arena.needs_more_input(unit.handle));
        if lingering {
            tracing::trace!(target: targets::REFEREE, ?scope, "scope lingering");
            return;
        }

        for position in 0..self.scopes[index].units.len() {
            let unit = &mut self.scopes[index].units[position];
            if unit.status == UnitStatus::Pending {
                unit.status = UnitStatus::Rejected;
                arena.reject(unit.handle);
            }
        }
        self.promote_blocked(index, arena);

        let Some(index) = self.index(scope) else {
            return;
        };
        let closed = self.scopes.remove(index);
        for unit in &closed.units {
            if unit.status == UnitStatus::Blocked {
                arena.reject(unit.handle);
            }
            arena.reset(unit.handle);
        }
        tracing::debug!(target: targets::REFEREE, ?scope, "scope closed");
    }

    /// Take a gesture out of arbitration (detached or rebuilt).
    pub fn remove_handle(&mut self, handle: GestureHandle, arena: &mut GestureArena) {
        for index in 0..self.scopes.len() {
            let scope = &mut self.scopes[index];
            if let Some(position) = scope.position(handle) {
                scope.units.remove(position);
                self.promote_blocked(index, arena);
            }
        }
        self.scopes
            .retain(|scope| !(scope.units.is_empty() && scope.pointers.is_empty()));
    }

    /// Point every scope entry of `old` at `new`, keeping its status.
    pub fn replace_handle(&mut self, old: GestureHandle, new: GestureHandle) {
        for scope in &mut self.scopes {
            for unit in &mut scope.units {
                if unit.handle == old {
                    unit.handle = new;
                }
            }
        }
    }

    /// Drop all scopes. Members are reset without callbacks.
    pub fn clear(&mut self, arena: &mut GestureArena) {
        for scope in self.scopes.drain(..) {
            for unit in scope.units {
                arena.reset(unit.handle);
            }
        }
    }

    fn find(&self, scope: ScopeId) -> Option<&Scope> {
        self.scopes.iter().find(|s| s.id == scope)
    }

    fn index(&self, scope: ScopeId) -> Option<usize> {
        self.scopes.iter().position(|s| s.id == scope)
    }

    fn follow_up(
        &mut self,
        scope: ScopeId,
        handle: GestureHandle,
        vote: Vote,
        arena: &mut GestureArena,
    ) {
        if vote == Vote::Reject {
            self.vote(scope, handle, Vote::Reject, arena);
        }
    }

    /// An undecided, non-cooperative unit ranks above `position`.
    fn blocked_by_higher(&self, index: usize, position: usize, arena: &GestureArena) -> bool {
        let units = &self.scopes[index].units;
        let priority = arena.priority(units[position].handle);
        units.iter().enumerate().any(|(other, unit)| {
            other != position
                && unit.status.is_undecided()
                && arena.priority(unit.handle) > priority
                && arena.policy(unit.handle) != GesturePolicy::Cooperative
        })
    }

    fn try_accept(&mut self, index: usize, position: usize, arena: &mut GestureArena) {
        let handle = self.scopes[index].units[position].handle;
        let policy = arena.policy(handle);
        let scope = self.scopes[index].id;

        let losers: Vec<usize> = match policy {
            GesturePolicy::Cooperative => Vec::new(),
            GesturePolicy::Exclusive => self.losers(index, position, arena, false),
            GesturePolicy::Default => {
                if self.blocked_by_higher(index, position, arena) {
                    tracing::debug!(
                        target: targets::REFEREE,
                        ?scope,
                        ?handle,
                        "accept blocked by higher priority"
                    );
                    self.scopes[index].units[position].status = UnitStatus::Blocked;
                    return;
                }
                self.losers(index, position, arena, true)
            }
        };

        for loser in losers {
            let unit = &mut self.scopes[index].units[loser];
            unit.status = UnitStatus::Rejected;
            arena.reject(unit.handle);
        }
        self.scopes[index].units[position].status = UnitStatus::Accepted;
        tracing::debug!(
            target: targets::REFEREE,
            ?scope,
            ?handle,
            ?policy,
            "unit accepted"
        );
        let follow_up = arena.accept(handle);
        self.follow_up(scope, handle, follow_up, arena);
    }

    /// Undecided units other than `position`. Cooperative units are spared
    /// unless `spare_cooperative` is off.
    fn losers(
        &self,
        index: usize,
        position: usize,
        arena: &GestureArena,
        spare_cooperative: bool,
    ) -> Vec<usize> {
        self.scopes[index]
            .units
            .iter()
            .enumerate()
            .filter(|(other, unit)| {
                *other != position
                    && unit.status.is_undecided()
                    && !(spare_cooperative
                        && arena.policy(unit.handle) == GesturePolicy::Cooperative)
            })
            .map(|(other, _)| other)
            .collect()
    }

    /// Grant blocked units nothing ranks above any more.
    fn promote_blocked(&mut self, index: usize, arena: &mut GestureArena) {
        loop {
            let Some(scope) = self.scopes.get(index) else {
                return;
            };
            let ready = scope
                .units
                .iter()
                .enumerate()
                .filter(|(_, unit)| unit.status == UnitStatus::Blocked)
                .map(|(position, _)| position)
                .find(|&position| !self.blocked_by_higher(index, position, arena));
            let Some(position) = ready else {
                return;
            };
            self.try_accept(index, position, arena);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TouchSample;
    use crate::model::BuiltGesture;
    use crate::recognizer::{
        GesturePriority, LongPressRecognizer, PanDirection, PanRecognizer, Recognizer,
        RecognizerState, TapRecognizer,
    };
    use horizon_gesture_core::{GestureConfig, NodeTree, Rect};
    use std::time::{Duration, Instant};

    struct Fixture {
        config: GestureConfig,
        arena: GestureArena,
        referee: GestureReferee,
        node: horizon_gesture_core::NodeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut tree = NodeTree::new();
            Self {
                config: GestureConfig::default(),
                arena: GestureArena::new(),
                referee: GestureReferee::new(),
                node: tree.create_root(Rect::new(0.0, 0.0, 200.0, 200.0)),
            }
        }

        fn add(&mut self, recognizer: Recognizer) -> GestureHandle {
            let interval = self.config.multi_tap_interval();
            self.arena
                .insert(BuiltGesture::Single(recognizer), self.node, interval)
        }

        fn pan(&mut self, priority: GesturePriority, policy: GesturePolicy) -> GestureHandle {
            let mut pan = Recognizer::new(
                PanRecognizer::new(PanDirection::ALL, 5.0, self.config.pan_mouse_distance),
                1,
                &self.config,
            );
            pan.set_priority(priority);
            pan.set_policy(policy);
            self.add(pan)
        }

        fn state(&self, handle: GestureHandle) -> Option<RecognizerState> {
            self.arena.state(handle)
        }

        /// Deliver a sample to every live unit the way the event manager does.
        fn feed(&mut self, handles: &[GestureHandle], sample: &TouchSample) {
            let key = PointerKey::Touch(sample.id);
            let scope = match self.referee.scope_of(key) {
                Some(scope) => scope,
                None => self.referee.join(key, handles, &self.arena),
            };
            for handle in self.referee.live_units(scope) {
                if !self.referee.is_live(scope, handle) {
                    continue;
                }
                let vote = self.arena.handle_touch(handle, sample);
                self.referee.vote(scope, handle, vote, &mut self.arena);
            }
            if sample.kind.is_terminal() {
                self.referee.release(key, &mut self.arena);
            }
        }
    }

    #[test]
    fn test_first_accept_wins() {
        let now = Instant::now();
        let mut fx = Fixture::new();
        let a = fx.pan(GesturePriority::Normal, GesturePolicy::Default);
        let b = fx.pan(GesturePriority::Normal, GesturePolicy::Default);
        let handles = [a, b];

        fx.feed(&handles, &TouchSample::down(1, 0.0, 0.0, now));
        fx.feed(&handles, &TouchSample::moved(1, 20.0, 0.0, now));
        assert_eq!(fx.state(a), Some(RecognizerState::Succeed));
        assert_eq!(fx.state(b), Some(RecognizerState::Fail));
        assert_eq!(fx.referee.status(b), Some(UnitStatus::Rejected));

        fx.feed(&handles, &TouchSample::up(1, 20.0, 0.0, now));
        assert!(fx.referee.is_idle());
        assert_eq!(fx.state(b), Some(RecognizerState::Ready));
    }

    #[test]
    fn test_lower_priority_accept_waits_for_higher() {
        let now = Instant::now();
        let mut fx = Fixture::new();
        let mut long_press = Recognizer::new(
            LongPressRecognizer::new(Duration::from_millis(500), false, 15.0),
            1,
            &fx.config,
        );
        long_press.set_priority(GesturePriority::High);
        let high = fx.add(long_press);
        let low = fx.pan(GesturePriority::Normal, GesturePolicy::Default);
        let handles = [low, high];

        fx.feed(&handles, &TouchSample::down(1, 0.0, 0.0, now));
        fx.feed(&handles, &TouchSample::moved(1, 10.0, 0.0, now));
        assert_eq!(fx.referee.status(low), Some(UnitStatus::Blocked));
        assert_eq!(fx.state(low), Some(RecognizerState::Detecting));

        // Straying past the long-press slop releases the block.
        fx.feed(&handles, &TouchSample::moved(1, 30.0, 0.0, now));
        assert_eq!(fx.state(high), Some(RecognizerState::Fail));
        assert_eq!(fx.state(low), Some(RecognizerState::Succeed));
    }

    #[test]
    fn test_exclusive_overrides_priority() {
        let now = Instant::now();
        let mut fx = Fixture::new();
        let low = fx.pan(GesturePriority::Low, GesturePolicy::Exclusive);
        let mut tap = Recognizer::new(
            TapRecognizer::new(1, 10.0, Duration::from_millis(300)),
            1,
            &fx.config,
        );
        tap.set_priority(GesturePriority::High);
        let tap = fx.add(tap);
        let handles = [low, tap];

        fx.feed(&handles, &TouchSample::down(1, 0.0, 0.0, now));
        fx.feed(&handles, &TouchSample::moved(1, 6.0, 0.0, now));
        assert_eq!(fx.state(low), Some(RecognizerState::Succeed));
        assert_eq!(fx.state(tap), Some(RecognizerState::Fail));
    }

    #[test]
    fn test_cooperative_accept_spares_competitors() {
        let now = Instant::now();
        let mut fx = Fixture::new();
        let cooperative = fx.pan(GesturePriority::Normal, GesturePolicy::Cooperative);
        let other = fx.pan(GesturePriority::Normal, GesturePolicy::Default);
        let handles = [cooperative, other];

        fx.feed(&handles, &TouchSample::down(1, 0.0, 0.0, now));
        fx.feed(&handles, &TouchSample::moved(1, 20.0, 0.0, now));
        assert_eq!(fx.state(cooperative), Some(RecognizerState::Succeed));
        assert_eq!(fx.state(other), Some(RecognizerState::Succeed));
    }

    #[test]
    fn test_scope_lingers_between_taps() {
        let base = Instant::now();
        let mut fx = Fixture::new();
        let double_tap = fx.add(Recognizer::new(
            TapRecognizer::new(2, 10.0, Duration::from_millis(300)),
            1,
            &fx.config,
        ));
        let handles = [double_tap];

        fx.feed(&handles, &TouchSample::down(1, 0.0, 0.0, base));
        fx.feed(&handles, &TouchSample::up(1, 0.0, 0.0, base + Duration::from_millis(40)));
        assert_eq!(fx.referee.scope_count(), 1);

        let second = base + Duration::from_millis(120);
        fx.feed(&handles, &TouchSample::down(2, 1.0, 0.0, second));
        assert_eq!(fx.referee.scope_count(), 1);
        fx.feed(&handles, &TouchSample::up(2, 1.0, 0.0, second + Duration::from_millis(40)));
        assert!(fx.referee.is_idle());
        assert_eq!(fx.state(double_tap), Some(RecognizerState::Ready));
    }
}
