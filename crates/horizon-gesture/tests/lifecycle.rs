//! Attaching, rebuilding and detaching gestures around live input.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use common::{Clock, actions, log, record, screen, setup};
use horizon_gesture::{
    GestureAction, GestureError, GestureModel, PanDirection, RecognizerState, TouchSample,
};

fn pan_model(events: &common::Log, tag: &'static str, fingers: usize) -> GestureModel {
    let mut model = GestureModel::new();
    model.create_pan(fingers, PanDirection::ALL, None);
    record(&mut model, events, tag);
    model.pop().unwrap();
    model
}

#[test]
fn test_rebuild_from_callback_keeps_gesture_running() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let events = log();
    let queue = manager.mutation_queue();
    let rebuilt = Arc::new(AtomicBool::new(false));

    let mut model = pan_model(&events, "first", 1);
    let flag = rebuilt.clone();
    let rebuild_events = events.clone();
    let handles = manager.attach(root, &mut model).unwrap();
    let first = handles[0];
    // Re-render on the first update, as a declarative front end would.
    if let horizon_gesture::GestureHandle::Single(id) = first {
        let recognizer = manager.arena().recognizer(id).unwrap();
        recognizer.callbacks().on_update.connect(move |event| {
            if flag.swap(true, Ordering::SeqCst) {
                return;
            }
            let node = event.target.expect("attached");
            let gestures = pan_model(&rebuild_events, "second", 1)
                .take_gestures()
                .unwrap();
            queue.replace_gestures(node, gestures);
        });
    }

    manager.dispatch_touch(&TouchSample::down(1, 10.0, 10.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::moved(1, 40.0, 10.0, clock.at(16)));
    assert!(rebuilt.load(Ordering::SeqCst));
    assert_eq!(manager.gestures(root)[0], first);
    assert_eq!(manager.gestures(root).len(), 1);
    assert_eq!(manager.arena().state(first), Some(RecognizerState::Succeed));

    manager.dispatch_touch(&TouchSample::moved(1, 60.0, 10.0, clock.at(32)));
    manager.dispatch_touch(&TouchSample::up(1, 60.0, 10.0, clock.at(48)));
    assert_eq!(
        actions(&events, "first"),
        vec![GestureAction::Start, GestureAction::Update]
    );
    assert_eq!(
        actions(&events, "second"),
        vec![GestureAction::Update, GestureAction::End]
    );
}

#[test]
fn test_incompatible_rebuild_cancels_old_gesture() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let events = log();
    let old = manager.attach(root, &mut pan_model(&events, "old", 1)).unwrap()[0];

    manager.dispatch_touch(&TouchSample::down(1, 10.0, 10.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::moved(1, 40.0, 10.0, clock.at(16)));

    let gestures = pan_model(&events, "new", 2).take_gestures().unwrap();
    manager.replace_gestures(root, gestures).unwrap();
    let new = manager.gestures(root)[0];
    assert_ne!(new, old);
    assert!(!manager.arena().contains(old));
    assert_eq!(manager.arena().state(new), Some(RecognizerState::Ready));

    manager.dispatch_touch(&TouchSample::up(1, 40.0, 10.0, clock.at(32)));
    assert_eq!(
        actions(&events, "old"),
        vec![GestureAction::Start, GestureAction::Update, GestureAction::Cancel]
    );
    assert!(actions(&events, "new").is_empty());
    assert!(manager.referee().is_idle());
}

#[test]
fn test_force_clean_keeps_gestures_attached() {
    setup();
    let clock = Clock::new();
    let (mut manager, _, child) = screen();
    let events = log();
    let pan = manager.attach(child, &mut pan_model(&events, "pan", 1)).unwrap()[0];

    manager.dispatch_touch(&TouchSample::down(1, 150.0, 150.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::moved(1, 180.0, 150.0, clock.at(16)));
    manager.force_clean_recognizers(child);
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Ready));
    assert_eq!(manager.gestures(child), &[pan]);

    manager.dispatch_touch(&TouchSample::moved(1, 200.0, 150.0, clock.at(32)));
    manager.dispatch_touch(&TouchSample::up(1, 200.0, 150.0, clock.at(48)));
    assert_eq!(
        actions(&events, "pan"),
        vec![GestureAction::Start, GestureAction::Update, GestureAction::Cancel]
    );

    // The next stream starts from scratch.
    manager.dispatch_touch(&TouchSample::down(2, 150.0, 150.0, clock.at(100)));
    manager.dispatch_touch(&TouchSample::moved(2, 180.0, 150.0, clock.at(116)));
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Succeed));
}

#[test]
fn test_removing_parent_detaches_subtree() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, child) = screen();
    let events = log();
    manager.attach(root, &mut pan_model(&events, "outer", 1)).unwrap();
    manager.attach(child, &mut pan_model(&events, "inner", 1)).unwrap();

    manager.dispatch_touch(&TouchSample::down(1, 150.0, 150.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::moved(1, 180.0, 150.0, clock.at(16)));
    let removed = manager.remove_node(root);
    assert_eq!(removed.len(), 2);
    assert_eq!(manager.arena().recognizer_count(), 0);
    assert_eq!(
        actions(&events, "inner"),
        vec![GestureAction::Start, GestureAction::Update, GestureAction::Cancel]
    );
    assert!(actions(&events, "outer").is_empty());

    manager.dispatch_touch(&TouchSample::up(1, 180.0, 150.0, clock.at(32)));
    assert!(manager.referee().is_idle());
}

#[test]
fn test_unclosed_model_cannot_attach() {
    setup();
    let (mut manager, root, _) = screen();
    let mut model = GestureModel::new();
    model.create_group(horizon_gesture::GroupMode::Parallel);
    model.create_tap(1, 1, None);
    assert!(matches!(
        manager.attach(root, &mut model),
        Err(GestureError::UnclosedGesture { open: 2 })
    ));
    assert!(manager.gestures(root).is_empty());
}
