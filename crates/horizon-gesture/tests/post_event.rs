//! Injected touch streams.

mod common;

use common::{Clock, actions, log, record, screen, setup};
use horizon_gesture::{GestureAction, GestureModel, PanDirection, RecognizerState, TouchSample};

#[test]
fn test_duplicate_post_is_refused_without_dispatch() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let events = log();
    let mut model = GestureModel::new();
    model.create_tap(1, 1, None);
    record(&mut model, &events, "tap");
    model.pop().unwrap();
    manager.attach(root, &mut model).unwrap();

    let down = TouchSample::down(7, 20.0, 20.0, clock.at(0));
    assert!(manager.post_event(root, &down));
    assert!(!manager.post_event(root, &down));
    let up = TouchSample::up(7, 20.0, 20.0, clock.at(40));
    assert!(manager.post_event(root, &up));
    assert_eq!(actions(&events, "tap"), vec![GestureAction::Action]);

    // The pair resolved, so replaying the Up has no Down to pair with.
    assert!(!manager.post_event(root, &up));
    assert_eq!(actions(&events, "tap"), vec![GestureAction::Action]);
}

#[test]
fn test_move_without_posted_down_is_refused() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, child) = screen();
    assert!(!manager.post_event(root, &TouchSample::moved(1, 5.0, 5.0, clock.at(0))));
    assert!(!manager.post_event(child, &TouchSample::up(1, 5.0, 5.0, clock.at(0))));

    // A Down posted to one node does not pair with a Move for another.
    assert!(manager.post_event(root, &TouchSample::down(1, 150.0, 150.0, clock.at(10))));
    assert!(!manager.post_event(child, &TouchSample::moved(1, 160.0, 150.0, clock.at(20))));
}

#[test]
fn test_second_down_cancels_stale_stream() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let events = log();
    let mut model = GestureModel::new();
    model.create_pan(1, PanDirection::ALL, None);
    record(&mut model, &events, "pan");
    model.pop().unwrap();
    let pan = manager.attach(root, &mut model).unwrap()[0];

    assert!(manager.post_event(root, &TouchSample::down(2, 10.0, 10.0, clock.at(0))));
    assert!(manager.post_event(root, &TouchSample::moved(2, 40.0, 10.0, clock.at(16))));
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Succeed));

    assert!(manager.post_event(root, &TouchSample::down(2, 60.0, 60.0, clock.at(32))));
    assert_eq!(
        actions(&events, "pan"),
        vec![GestureAction::Start, GestureAction::Update, GestureAction::Cancel]
    );
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Detecting));
    assert!(manager.post_events().have_received_down_event(root, 2));
}

#[test]
fn test_posted_down_only_reaches_target_subtree() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, child) = screen();
    let mut outer = GestureModel::new();
    outer.create_pan(1, PanDirection::ALL, None);
    outer.pop().unwrap();
    let outer = manager.attach(root, &mut outer).unwrap()[0];
    let mut inner = GestureModel::new();
    inner.create_pan(1, PanDirection::ALL, None);
    inner.pop().unwrap();
    let inner = manager.attach(child, &mut inner).unwrap()[0];

    let down = TouchSample::down(3, 150.0, 150.0, clock.at(0));
    assert!(manager.post_event(child, &down));
    assert_eq!(manager.arena().state(inner), Some(RecognizerState::Detecting));
    assert_eq!(manager.arena().state(outer), Some(RecognizerState::Ready));
    assert!(manager.post_event(child, &TouchSample::up(3, 150.0, 150.0, clock.at(30))));
    assert!(manager.post_events().is_empty());
}

#[test]
fn test_post_to_removed_node_fails() {
    setup();
    let clock = Clock::new();
    let (mut manager, _, child) = screen();
    assert!(manager.post_event(child, &TouchSample::down(1, 150.0, 150.0, clock.at(0))));
    manager.remove_node(child);
    assert!(!manager.post_event(child, &TouchSample::up(1, 150.0, 150.0, clock.at(20))));
    assert!(manager.post_events().is_empty());
}
