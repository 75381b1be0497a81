//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use horizon_gesture::{EventManager, GestureAction, GestureModel, NodeId, Rect};
use parking_lot::Mutex;

/// Callback log: which gesture fired what, in firing order.
pub type Log = Arc<Mutex<Vec<(&'static str, GestureAction)>>>;

pub fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// Log every callback of the innermost open gesture under `tag`.
pub fn record(model: &mut GestureModel, log: &Log, tag: &'static str) {
    let sinks: [Log; 5] = std::array::from_fn(|_| log.clone());
    let [start, update, end, cancel, action] = sinks;
    model
        .set_on_start(move |event| start.lock().push((tag, event.action)))
        .set_on_update(move |event| update.lock().push((tag, event.action)))
        .set_on_end(move |event| end.lock().push((tag, event.action)))
        .set_on_cancel(move |event| cancel.lock().push((tag, event.action)))
        .set_on_action(move |event| action.lock().push((tag, event.action)));
}

/// The actions logged for `tag`, with consecutive Updates collapsed.
pub fn actions(log: &Log, tag: &str) -> Vec<GestureAction> {
    let mut out: Vec<GestureAction> = Vec::new();
    for &(logged, action) in log.lock().iter() {
        if logged != tag {
            continue;
        }
        if action == GestureAction::Update && out.last() == Some(&GestureAction::Update) {
            continue;
        }
        out.push(action);
    }
    out
}

/// Millisecond offsets from a fixed start.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn at(&self, ms: u64) -> Instant {
        self.start + Duration::from_millis(ms)
    }
}

/// A 400x400 root with a 200x200 child at (100, 100).
pub fn screen() -> (EventManager, NodeId, NodeId) {
    let mut manager = EventManager::new();
    let root = manager
        .tree_mut()
        .create_root(Rect::new(0.0, 0.0, 400.0, 400.0));
    let child = manager
        .tree_mut()
        .create_child(root, Rect::new(100.0, 100.0, 200.0, 200.0))
        .expect("root exists");
    (manager, root, child)
}
