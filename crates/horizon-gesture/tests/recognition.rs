//! Recognition behaviour of individual gestures driven through the event
//! manager.

mod common;

use std::time::Duration;

use common::{Clock, actions, log, record, screen, setup};
use horizon_gesture::{
    AxisPhase, AxisSample, GestureAction, GestureConfig, GestureHandle, GestureModel,
    PanDirection, Point, RecognizerState, SwipeDirection, TouchSample, VelocityTracker,
};

fn single(handles: Vec<GestureHandle>) -> GestureHandle {
    assert_eq!(handles.len(), 1);
    handles[0]
}

#[test]
fn test_three_finger_pan_waits_for_three_fingers() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let mut model = GestureModel::new();
    model.create_pan(3, PanDirection::ALL, None);
    model.pop().unwrap();
    let pan = single(manager.attach(root, &mut model).unwrap());

    manager.dispatch_touch(&TouchSample::down(1, 10.0, 10.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::down(2, 20.0, 10.0, clock.at(5)));
    for step in 1..10u64 {
        let x = step as f32 * 20.0;
        manager.dispatch_touch(&TouchSample::moved(1, 10.0 + x, 10.0, clock.at(10 + step)));
        manager.dispatch_touch(&TouchSample::moved(2, 20.0 + x, 10.0, clock.at(10 + step)));
        assert_eq!(manager.arena().state(pan), Some(RecognizerState::Ready));
    }

    manager.dispatch_touch(&TouchSample::down(3, 30.0, 10.0, clock.at(30)));
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Detecting));
}

#[test]
fn test_horizontal_pan_ignores_vertical_travel() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let mut model = GestureModel::new();
    model.create_pan(1, PanDirection::HORIZONTAL, Some(10.0));
    model.pop().unwrap();
    let pan = single(manager.attach(root, &mut model).unwrap());

    manager.dispatch_touch(&TouchSample::down(1, 200.0, 200.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::moved(1, 200.0, 185.0, clock.at(16)));
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Detecting));

    manager.dispatch_touch(&TouchSample::moved(1, 212.0, 185.0, clock.at(32)));
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Succeed));
}

#[test]
fn test_one_finger_going_the_wrong_way_does_not_veto() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let events = log();
    let mut model = GestureModel::new();
    model.create_pan(2, PanDirection::DOWN, Some(10.0));
    record(&mut model, &events, "pan");
    model.pop().unwrap();
    let pan = single(manager.attach(root, &mut model).unwrap());

    manager.dispatch_touch(&TouchSample::down(1, 100.0, 100.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::down(2, 150.0, 100.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::moved(2, 150.0, 95.0, clock.at(16)));
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Detecting));

    // Averaged travel is 7.5px, but one finger went 20px the allowed way.
    manager.dispatch_touch(&TouchSample::moved(1, 100.0, 120.0, clock.at(32)));
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Succeed));
    assert_eq!(
        actions(&events, "pan"),
        vec![GestureAction::Start, GestureAction::Update]
    );
}

#[test]
fn test_two_finger_pan_ends_on_last_lift() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let events = log();
    let mut model = GestureModel::new();
    model.create_pan(2, PanDirection::ALL, Some(5.0));
    record(&mut model, &events, "pan");
    model.pop().unwrap();
    let pan = single(manager.attach(root, &mut model).unwrap());
    let updates = || {
        events
            .lock()
            .iter()
            .filter(|(_, action)| *action == GestureAction::Update)
            .count()
    };

    manager.dispatch_touch(&TouchSample::down(1, 100.0, 100.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::down(2, 150.0, 100.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::moved(1, 120.0, 100.0, clock.at(16)));
    manager.dispatch_touch(&TouchSample::moved(2, 170.0, 100.0, clock.at(16)));
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Succeed));

    manager.dispatch_touch(&TouchSample::up(1, 120.0, 100.0, clock.at(32)));
    assert_eq!(
        actions(&events, "pan"),
        vec![GestureAction::Start, GestureAction::Update]
    );
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Succeed));

    let before = updates();
    manager.dispatch_touch(&TouchSample::moved(2, 200.0, 100.0, clock.at(48)));
    manager.dispatch_touch(&TouchSample::moved(2, 230.0, 100.0, clock.at(64)));
    assert_eq!(updates(), before + 2);

    manager.dispatch_touch(&TouchSample::up(2, 230.0, 100.0, clock.at(80)));
    assert_eq!(
        actions(&events, "pan"),
        vec![GestureAction::Start, GestureAction::Update, GestureAction::End]
    );
    let ends = events
        .lock()
        .iter()
        .filter(|(_, action)| *action == GestureAction::End)
        .count();
    assert_eq!(ends, 1);
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Ready));
    assert!(manager.referee().is_idle());
}

#[test]
fn test_fastest_pointer_sets_velocity() {
    let clock = Clock::new();
    let mut tracker = VelocityTracker::from_config(&GestureConfig::default());
    for step in 0..5u64 {
        let t = clock.at(step * 10);
        let s = step as f32;
        tracker.update_touch_point(1, Point::new(s * 1.0, 0.0), t, false);
        tracker.update_touch_point(2, Point::new(0.0, s * 5.0), t, false);
    }
    let velocity = tracker.velocity();
    assert!(velocity.x.abs() < 1.0);
    assert!((velocity.y - 500.0).abs() < 1.0);
}

#[test]
fn test_mouse_down_rejects_touch_only_pan() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let mut model = GestureModel::new();
    model.create_pan(1, PanDirection::ALL, None).set_allow_mouse(false);
    model.pop().unwrap();
    let pan = single(manager.attach(root, &mut model).unwrap());

    manager.dispatch_touch(&TouchSample::down(1, 10.0, 10.0, clock.at(0)).with_mouse());
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Fail));
    manager.dispatch_touch(&TouchSample::moved(1, 80.0, 10.0, clock.at(16)).with_mouse());
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Fail));

    manager.dispatch_touch(&TouchSample::up(1, 80.0, 10.0, clock.at(32)).with_mouse());
    assert_eq!(manager.arena().state(pan), Some(RecognizerState::Ready));
}

#[test]
fn test_pan_reports_local_offsets() {
    setup();
    let clock = Clock::new();
    let (mut manager, _, child) = screen();
    let offsets = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = offsets.clone();
    let mut model = GestureModel::new();
    model
        .create_pan(1, PanDirection::ALL, None)
        .set_on_end(move |event| sink.lock().push((event.offset, event.local_position)));
    model.pop().unwrap();
    manager.attach(child, &mut model).unwrap();

    manager.dispatch_touch(&TouchSample::down(1, 150.0, 150.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::moved(1, 170.0, 150.0, clock.at(16)));
    manager.dispatch_touch(&TouchSample::moved(1, 190.0, 160.0, clock.at(32)));
    manager.dispatch_touch(&TouchSample::up(1, 190.0, 160.0, clock.at(48)));

    let offsets = offsets.lock();
    assert_eq!(offsets.len(), 1);
    assert_eq!(offsets[0].0, Point::new(40.0, 10.0));
    assert_eq!(offsets[0].1, Point::new(90.0, 60.0));
}

#[test]
fn test_wheel_scroll_drives_pan() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let events = log();
    let mut model = GestureModel::new();
    model.create_pan(1, PanDirection::VERTICAL, None);
    record(&mut model, &events, "pan");
    model.pop().unwrap();
    manager.attach(root, &mut model).unwrap();

    let at = Point::new(50.0, 50.0);
    manager.dispatch_axis(&AxisSample::scroll(0, AxisPhase::Begin, at, 0.0, 0.0, clock.at(0)));
    manager.dispatch_axis(&AxisSample::scroll(0, AxisPhase::Update, at, 0.0, 30.0, clock.at(16)));
    manager.dispatch_axis(&AxisSample::scroll(0, AxisPhase::End, at, 0.0, 0.0, clock.at(32)));
    assert_eq!(
        actions(&events, "pan"),
        vec![GestureAction::Start, GestureAction::Update, GestureAction::End]
    );
    assert!(manager.referee().is_idle());
}

#[test]
fn test_long_press_fires_on_tick() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let events = log();
    let mut model = GestureModel::new();
    model.create_long_press(1, false, Some(Duration::from_millis(400)));
    record(&mut model, &events, "press");
    model.pop().unwrap();
    manager.attach(root, &mut model).unwrap();

    manager.dispatch_touch(&TouchSample::down(1, 50.0, 50.0, clock.at(0)));
    manager.tick(clock.at(300));
    assert!(actions(&events, "press").is_empty());
    manager.tick(clock.at(410));
    assert_eq!(actions(&events, "press"), vec![GestureAction::Action]);

    manager.dispatch_touch(&TouchSample::up(1, 50.0, 50.0, clock.at(600)));
    assert_eq!(
        actions(&events, "press"),
        vec![GestureAction::Action, GestureAction::End]
    );
}

#[test]
fn test_double_tap_needs_both_taps() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let events = log();
    let mut model = GestureModel::new();
    model.create_tap(2, 1, None);
    record(&mut model, &events, "tap");
    model.pop().unwrap();
    manager.attach(root, &mut model).unwrap();

    manager.dispatch_touch(&TouchSample::down(1, 50.0, 50.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::up(1, 50.0, 50.0, clock.at(60)));
    assert!(!manager.referee().is_idle());
    manager.dispatch_touch(&TouchSample::down(2, 52.0, 50.0, clock.at(200)));
    manager.dispatch_touch(&TouchSample::up(2, 52.0, 50.0, clock.at(260)));
    assert_eq!(actions(&events, "tap"), vec![GestureAction::Action]);
    assert!(manager.referee().is_idle());

    // A lone tap expires once the interval passes.
    manager.dispatch_touch(&TouchSample::down(3, 50.0, 50.0, clock.at(1000)));
    manager.dispatch_touch(&TouchSample::up(3, 50.0, 50.0, clock.at(1060)));
    manager.tick(clock.at(1500));
    assert!(manager.referee().is_idle());
    assert_eq!(actions(&events, "tap"), vec![GestureAction::Action]);
}

#[test]
fn test_fast_fling_swipes() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let events = log();
    let mut model = GestureModel::new();
    model.create_swipe(1, SwipeDirection::HORIZONTAL, None);
    record(&mut model, &events, "swipe");
    model.pop().unwrap();
    manager.attach(root, &mut model).unwrap();

    manager.dispatch_touch(&TouchSample::down(1, 20.0, 100.0, clock.at(0)));
    for step in 1..=5u64 {
        let x = 20.0 + step as f32 * 30.0;
        manager.dispatch_touch(&TouchSample::moved(1, x, 100.0, clock.at(step * 10)));
    }
    manager.dispatch_touch(&TouchSample::up(1, 170.0, 100.0, clock.at(50)));
    assert_eq!(actions(&events, "swipe"), vec![GestureAction::Action]);
}

#[test]
fn test_two_finger_spread_pinches() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let scales = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = scales.clone();
    let mut model = GestureModel::new();
    model
        .create_pinch(2, None)
        .set_on_update(move |event| sink.lock().push(event.scale));
    model.pop().unwrap();
    manager.attach(root, &mut model).unwrap();

    manager.dispatch_touch(&TouchSample::down(1, 150.0, 200.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::down(2, 250.0, 200.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::moved(1, 100.0, 200.0, clock.at(16)));
    manager.dispatch_touch(&TouchSample::moved(2, 300.0, 200.0, clock.at(16)));

    let scales = scales.lock();
    let last = scales.last().copied().unwrap_or_default();
    assert!((last - 2.0).abs() < 1e-3, "scale was {last}");
}

#[test]
fn test_two_finger_twist_rotates() {
    setup();
    let clock = Clock::new();
    let (mut manager, root, _) = screen();
    let events = log();
    let mut model = GestureModel::new();
    model.create_rotation(2, None);
    record(&mut model, &events, "rotate");
    model.pop().unwrap();
    let rotation = single(manager.attach(root, &mut model).unwrap());

    manager.dispatch_touch(&TouchSample::down(1, 100.0, 200.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::down(2, 300.0, 200.0, clock.at(0)));
    manager.dispatch_touch(&TouchSample::moved(1, 200.0, 100.0, clock.at(16)));
    manager.dispatch_touch(&TouchSample::moved(2, 200.0, 300.0, clock.at(16)));
    assert_eq!(manager.arena().state(rotation), Some(RecognizerState::Succeed));

    manager.dispatch_touch(&TouchSample::up(1, 200.0, 100.0, clock.at(32)));
    manager.dispatch_touch(&TouchSample::up(2, 200.0, 300.0, clock.at(32)));
    assert_eq!(
        actions(&events, "rotate"),
        vec![GestureAction::Start, GestureAction::Update, GestureAction::End]
    );
}
