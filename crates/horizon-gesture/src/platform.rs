//! Conversion from winit input events.
//!
//! [`TouchInputHandler`] turns finger, mouse-button and cursor reports into
//! [`TouchSample`]s; [`AxisInputHandler`] turns wheel and touchpad gesture
//! reports into [`AxisSample`]s. Both stamp samples with the time they are
//! handed, so feed them as events arrive.
//!
//! ```ignore
//! use horizon_gesture::platform::TouchInputHandler;
//!
//! let mut touches = TouchInputHandler::new();
//!
//! // In the winit event loop:
//! WindowEvent::Touch(touch) => {
//!     let sample = touches.handle_touch(touch, Instant::now());
//!     manager.dispatch_touch(&sample);
//! }
//! ```

use std::collections::HashMap;
use std::time::Instant;

use horizon_gesture_core::Point;
use horizon_gesture_core::logging::targets;
use winit::dpi::PhysicalPosition;
use winit::event::{
    ElementState, Force as WinitForce, MouseButton, MouseScrollDelta, Touch,
    TouchPhase as WinitTouchPhase,
};
use winit::keyboard::ModifiersState;

use crate::event::{AxisPhase, AxisSample, KeyboardModifiers, TouchKind, TouchSample};

/// Pointer id used for the mouse cursor's touch stream.
pub const MOUSE_POINTER_ID: u64 = u64::MAX;

/// Pointer id used for wheel and touchpad axis streams.
pub const AXIS_POINTER_ID: u64 = 0;

/// Pixels scrolled per wheel line.
pub const LINE_SCROLL_PIXELS: f32 = 40.0;

/// Converts a winit TouchPhase to a TouchKind.
pub fn from_winit_touch_phase(phase: WinitTouchPhase) -> TouchKind {
    match phase {
        WinitTouchPhase::Started => TouchKind::Down,
        WinitTouchPhase::Moved => TouchKind::Move,
        WinitTouchPhase::Ended => TouchKind::Up,
        WinitTouchPhase::Cancelled => TouchKind::Cancel,
    }
}

/// Converts a winit TouchPhase to an AxisPhase.
pub fn from_winit_axis_phase(phase: WinitTouchPhase) -> AxisPhase {
    match phase {
        WinitTouchPhase::Started => AxisPhase::Begin,
        WinitTouchPhase::Moved => AxisPhase::Update,
        WinitTouchPhase::Ended => AxisPhase::End,
        WinitTouchPhase::Cancelled => AxisPhase::Cancel,
    }
}

/// Normalized force in `0.0..=1.0`.
pub fn from_winit_force(force: WinitForce) -> f32 {
    match force {
        WinitForce::Calibrated {
            force,
            max_possible_force,
            ..
        } if max_possible_force > 0.0 => (force / max_possible_force).clamp(0.0, 1.0) as f32,
        WinitForce::Calibrated { .. } => 0.0,
        WinitForce::Normalized(force) => force.clamp(0.0, 1.0) as f32,
    }
}

pub fn from_winit_modifiers(state: ModifiersState) -> KeyboardModifiers {
    KeyboardModifiers {
        shift: state.shift_key(),
        control: state.control_key(),
        alt: state.alt_key(),
        meta: state.super_key(),
    }
}

/// A wheel delta in pixels.
pub fn scroll_delta_pixels(delta: MouseScrollDelta) -> Point {
    match delta {
        MouseScrollDelta::LineDelta(x, y) => {
            Point::new(x * LINE_SCROLL_PIXELS, y * LINE_SCROLL_PIXELS)
        }
        MouseScrollDelta::PixelDelta(position) => Point::new(position.x as f32, position.y as f32),
    }
}

fn to_point(position: PhysicalPosition<f64>) -> Point {
    Point::new(position.x as f32, position.y as f32)
}

#[derive(Debug, Clone, Copy)]
struct ActiveTouch {
    position: Point,
    start_position: Point,
}

/// Tracks active touches and the mouse button, producing touch samples.
#[derive(Debug)]
pub struct TouchInputHandler {
    active_touches: HashMap<u64, ActiveTouch>,
    modifiers: KeyboardModifiers,
    cursor: Point,
    mouse_pressed: bool,
}

impl Default for TouchInputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchInputHandler {
    pub fn new() -> Self {
        Self {
            active_touches: HashMap::new(),
            modifiers: KeyboardModifiers::NONE,
            cursor: Point::ZERO,
            mouse_pressed: false,
        }
    }

    pub fn update_modifiers(&mut self, modifiers: ModifiersState) {
        self.modifiers = from_winit_modifiers(modifiers);
    }

    pub fn modifiers(&self) -> KeyboardModifiers {
        self.modifiers
    }

    pub fn active_touch_count(&self) -> usize {
        self.active_touches.len()
    }

    pub fn touch_position(&self, id: u64) -> Option<Point> {
        self.active_touches.get(&id).map(|touch| touch.position)
    }

    /// Where the touch went down, while it is active.
    pub fn touch_start(&self, id: u64) -> Option<Point> {
        self.active_touches.get(&id).map(|touch| touch.start_position)
    }

    /// Convert a winit touch report.
    pub fn handle_touch(&mut self, touch: Touch, time: Instant) -> TouchSample {
        self.handle_raw_touch(touch.id, touch.phase, touch.location, touch.force, time)
    }

    /// Convert the fields of a touch report.
    pub fn handle_raw_touch(
        &mut self,
        id: u64,
        phase: WinitTouchPhase,
        location: PhysicalPosition<f64>,
        force: Option<WinitForce>,
        time: Instant,
    ) -> TouchSample {
        let kind = from_winit_touch_phase(phase);
        let position = to_point(location);
        match kind {
            TouchKind::Down => {
                self.active_touches.insert(
                    id,
                    ActiveTouch {
                        position,
                        start_position: position,
                    },
                );
            }
            TouchKind::Move => {
                if let Some(active) = self.active_touches.get_mut(&id) {
                    active.position = position;
                }
            }
            TouchKind::Up | TouchKind::Cancel => {
                self.active_touches.remove(&id);
            }
        }
        let mut sample =
            TouchSample::new(id, kind, position, time).with_modifiers(self.modifiers);
        if let Some(force) = force {
            sample = sample.with_force(from_winit_force(force));
        }
        sample
    }

    /// Track the cursor; yields a Move while the left button is held.
    pub fn handle_cursor_moved(
        &mut self,
        position: PhysicalPosition<f64>,
        time: Instant,
    ) -> Option<TouchSample> {
        self.cursor = to_point(position);
        self.mouse_pressed
            .then(|| self.mouse_sample(TouchKind::Move, time))
    }

    /// Left button presses become a Down/Up stream at the cursor.
    pub fn handle_mouse_input(
        &mut self,
        state: ElementState,
        button: MouseButton,
        time: Instant,
    ) -> Option<TouchSample> {
        if button != MouseButton::Left {
            return None;
        }
        match (state, self.mouse_pressed) {
            (ElementState::Pressed, false) => {
                self.mouse_pressed = true;
                Some(self.mouse_sample(TouchKind::Down, time))
            }
            (ElementState::Released, true) => {
                self.mouse_pressed = false;
                Some(self.mouse_sample(TouchKind::Up, time))
            }
            _ => {
                tracing::trace!(target: targets::PLATFORM, ?state, "unpaired mouse button event");
                None
            }
        }
    }

    /// The cursor left the window while pressed.
    pub fn handle_cursor_left(&mut self, time: Instant) -> Option<TouchSample> {
        if !self.mouse_pressed {
            return None;
        }
        self.mouse_pressed = false;
        tracing::debug!(target: targets::PLATFORM, "cursor left while pressed");
        Some(self.mouse_sample(TouchKind::Cancel, time))
    }

    pub fn cursor_position(&self) -> Point {
        self.cursor
    }

    /// Forget every active touch and the mouse button.
    pub fn reset(&mut self) {
        self.active_touches.clear();
        self.mouse_pressed = false;
    }

    fn mouse_sample(&self, kind: TouchKind, time: Instant) -> TouchSample {
        TouchSample::new(MOUSE_POINTER_ID, kind, self.cursor, time)
            .with_mouse()
            .with_modifiers(self.modifiers)
    }
}

/// Turns wheel and touchpad gesture reports into axis samples.
#[derive(Debug)]
pub struct AxisInputHandler {
    modifiers: KeyboardModifiers,
    cursor: Point,
    pinch_scale: f32,
    rotation: f32,
}

impl Default for AxisInputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl AxisInputHandler {
    pub fn new() -> Self {
        Self {
            modifiers: KeyboardModifiers::NONE,
            cursor: Point::ZERO,
            pinch_scale: 1.0,
            rotation: 0.0,
        }
    }

    pub fn update_modifiers(&mut self, modifiers: ModifiersState) {
        self.modifiers = from_winit_modifiers(modifiers);
    }

    /// Axis samples are positioned at the cursor.
    pub fn set_cursor(&mut self, position: PhysicalPosition<f64>) {
        self.cursor = to_point(position);
    }

    /// Convert a wheel report. Pixel deltas come from touchpads.
    pub fn handle_mouse_wheel(
        &mut self,
        delta: MouseScrollDelta,
        phase: WinitTouchPhase,
        time: Instant,
    ) -> AxisSample {
        let pixels = scroll_delta_pixels(delta);
        let sample = AxisSample::scroll(
            AXIS_POINTER_ID,
            from_winit_axis_phase(phase),
            self.cursor,
            pixels.x,
            pixels.y,
            time,
        )
        .with_modifiers(self.modifiers);
        match delta {
            MouseScrollDelta::PixelDelta(_) => sample.with_touchpad(),
            MouseScrollDelta::LineDelta(..) => sample,
        }
    }

    /// Convert a touchpad pinch report. `delta` is added to the running scale.
    pub fn handle_pinch_gesture(
        &mut self,
        delta: f64,
        phase: WinitTouchPhase,
        time: Instant,
    ) -> AxisSample {
        let phase = from_winit_axis_phase(phase);
        match phase {
            AxisPhase::Begin | AxisPhase::Cancel => self.pinch_scale = 1.0,
            AxisPhase::Update | AxisPhase::End => self.pinch_scale += delta as f32,
        }
        AxisSample::scroll(AXIS_POINTER_ID, phase, self.cursor, 0.0, 0.0, time)
            .with_touchpad()
            .with_pinch_scale(self.pinch_scale)
            .with_modifiers(self.modifiers)
    }

    /// Convert a touchpad rotation report. `delta` is in degrees.
    pub fn handle_rotation_gesture(
        &mut self,
        delta: f32,
        phase: WinitTouchPhase,
        time: Instant,
    ) -> AxisSample {
        let phase = from_winit_axis_phase(phase);
        match phase {
            AxisPhase::Begin | AxisPhase::Cancel => self.rotation = 0.0,
            AxisPhase::Update | AxisPhase::End => self.rotation += delta,
        }
        AxisSample::scroll(AXIS_POINTER_ID, phase, self.cursor, 0.0, 0.0, time)
            .with_touchpad()
            .with_rotation(self.rotation)
            .with_modifiers(self.modifiers)
    }

    pub fn reset(&mut self) {
        self.pinch_scale = 1.0;
        self.rotation = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SourceType;

    #[test]
    fn test_touch_phase_conversion() {
        assert_eq!(from_winit_touch_phase(WinitTouchPhase::Started), TouchKind::Down);
        assert_eq!(from_winit_touch_phase(WinitTouchPhase::Moved), TouchKind::Move);
        assert_eq!(from_winit_touch_phase(WinitTouchPhase::Ended), TouchKind::Up);
        assert_eq!(
            from_winit_touch_phase(WinitTouchPhase::Cancelled),
            TouchKind::Cancel
        );
    }

    #[test]
    fn test_force_is_normalized() {
        let calibrated = WinitForce::Calibrated {
            force: 2.0,
            max_possible_force: 4.0,
            altitude_angle: None,
        };
        assert_eq!(from_winit_force(calibrated), 0.5);
        assert_eq!(from_winit_force(WinitForce::Normalized(1.5)), 1.0);
    }

    #[test]
    fn test_touch_tracking() {
        let now = Instant::now();
        let mut handler = TouchInputHandler::new();

        let sample = handler.handle_raw_touch(
            1,
            WinitTouchPhase::Started,
            PhysicalPosition::new(100.0, 200.0),
            None,
            now,
        );
        assert_eq!(sample.kind, TouchKind::Down);
        assert_eq!(handler.active_touch_count(), 1);

        let sample = handler.handle_raw_touch(
            1,
            WinitTouchPhase::Moved,
            PhysicalPosition::new(150.0, 250.0),
            Some(WinitForce::Normalized(0.25)),
            now,
        );
        assert_eq!(sample.position, Point::new(150.0, 250.0));
        assert_eq!(sample.force, 0.25);
        assert_eq!(handler.touch_start(1), Some(Point::new(100.0, 200.0)));

        handler.handle_raw_touch(
            1,
            WinitTouchPhase::Ended,
            PhysicalPosition::new(150.0, 250.0),
            None,
            now,
        );
        assert_eq!(handler.active_touch_count(), 0);
    }

    #[test]
    fn test_mouse_button_drives_pointer_stream() {
        let now = Instant::now();
        let mut handler = TouchInputHandler::new();
        assert!(
            handler
                .handle_cursor_moved(PhysicalPosition::new(5.0, 5.0), now)
                .is_none()
        );

        let down = handler
            .handle_mouse_input(ElementState::Pressed, MouseButton::Left, now)
            .unwrap();
        assert_eq!(down.kind, TouchKind::Down);
        assert_eq!(down.id, MOUSE_POINTER_ID);
        assert!(down.is_mouse());

        let moved = handler
            .handle_cursor_moved(PhysicalPosition::new(9.0, 5.0), now)
            .unwrap();
        assert_eq!(moved.position, Point::new(9.0, 5.0));
        assert!(
            handler
                .handle_mouse_input(ElementState::Pressed, MouseButton::Right, now)
                .is_none()
        );
        let cancel = handler.handle_cursor_left(now).unwrap();
        assert_eq!(cancel.kind, TouchKind::Cancel);
    }

    #[test]
    fn test_wheel_lines_become_pixels() {
        let now = Instant::now();
        let mut handler = AxisInputHandler::new();
        let sample = handler.handle_mouse_wheel(
            MouseScrollDelta::LineDelta(0.0, -1.0),
            WinitTouchPhase::Moved,
            now,
        );
        assert_eq!(sample.phase, AxisPhase::Update);
        assert_eq!(sample.vertical, -LINE_SCROLL_PIXELS);
        assert_eq!(sample.source_type, SourceType::Mouse);

        let sample = handler.handle_mouse_wheel(
            MouseScrollDelta::PixelDelta(PhysicalPosition::new(3.0, 0.0)),
            WinitTouchPhase::Started,
            now,
        );
        assert_eq!(sample.source_type, SourceType::Touchpad);
    }

    #[test]
    fn test_pinch_scale_accumulates() {
        let now = Instant::now();
        let mut handler = AxisInputHandler::new();
        handler.handle_pinch_gesture(0.0, WinitTouchPhase::Started, now);
        let sample = handler.handle_pinch_gesture(0.5, WinitTouchPhase::Moved, now);
        assert_eq!(sample.pinch_scale, Some(1.5));

        let sample = handler.handle_rotation_gesture(12.0, WinitTouchPhase::Moved, now);
        assert_eq!(sample.rotation, Some(12.0));
        assert!(sample.is_rotation);
    }
}
