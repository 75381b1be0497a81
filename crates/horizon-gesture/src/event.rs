//! Input samples consumed by recognizers and the payload they emit.
//!
//! A [`TouchSample`] is one discrete pointer report (finger, pen or a mouse
//! button drag); an [`AxisSample`] is one continuous scroll, touchpad pinch or
//! rotation report. Both are immutable once captured; a newer sample for the
//! same pointer id supersedes the previous one.
//!
//! Recognizers report their lifecycle through [`GestureEvent`]s.

use std::time::Instant;

use horizon_gesture_core::{NodeId, Point};

/// Keyboard modifiers held while a sample was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct KeyboardModifiers {
    /// The Shift key is held.
    pub shift: bool,
    /// The Control key is held (Cmd on macOS).
    pub control: bool,
    /// The Alt key is held (Option on macOS).
    pub alt: bool,
    /// The Meta/Super key is held.
    pub meta: bool,
}

impl KeyboardModifiers {
    /// No modifiers pressed.
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };

    /// Shift modifier only.
    pub const SHIFT: Self = Self {
        shift: true,
        control: false,
        alt: false,
        meta: false,
    };

    /// Control modifier only.
    pub const CTRL: Self = Self {
        shift: false,
        control: true,
        alt: false,
        meta: false,
    };

    /// Check if any modifier is pressed.
    pub fn any(&self) -> bool {
        self.shift || self.control || self.alt || self.meta
    }
}

/// Device class a sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SourceType {
    #[default]
    Touchscreen,
    Mouse,
    Touchpad,
    Keyboard,
    Unknown,
}

/// Tool that produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SourceTool {
    #[default]
    Finger,
    Pen,
    Mouse,
    Touchpad,
    Unknown,
}

/// Phase of a touch sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchKind {
    Down,
    Move,
    Up,
    Cancel,
}

impl TouchKind {
    /// Up or Cancel.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Up | Self::Cancel)
    }
}

/// One pointer report.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchSample {
    /// Pointer or finger id, stable from Down to Up/Cancel.
    pub id: u64,
    /// Phase of this report.
    pub kind: TouchKind,
    /// Position in window coordinates.
    pub position: Point,
    /// Position in screen coordinates.
    pub screen_position: Point,
    /// Position in the coordinates of the node being dispatched to.
    ///
    /// Filled in by dispatch; equal to `position` until then.
    pub local_position: Point,
    /// Capture time.
    pub time: Instant,
    /// Normalized contact force, 0 when unknown.
    pub force: f32,
    /// Pen tilt around the x axis, in degrees.
    pub tilt_x: f32,
    /// Pen tilt around the y axis, in degrees.
    pub tilt_y: f32,
    /// Device class.
    pub source_type: SourceType,
    /// Tool.
    pub source_tool: SourceTool,
    /// Modifiers held.
    pub modifiers: KeyboardModifiers,
    /// Injected through the post-event path rather than from hardware.
    pub posted: bool,
}

impl TouchSample {
    /// Create a finger sample on a touchscreen.
    pub fn new(id: u64, kind: TouchKind, position: Point, time: Instant) -> Self {
        Self {
            id,
            kind,
            position,
            screen_position: position,
            local_position: position,
            time,
            force: 0.0,
            tilt_x: 0.0,
            tilt_y: 0.0,
            source_type: SourceType::Touchscreen,
            source_tool: SourceTool::Finger,
            modifiers: KeyboardModifiers::NONE,
            posted: false,
        }
    }

    /// Shorthand for a Down sample.
    pub fn down(id: u64, x: f32, y: f32, time: Instant) -> Self {
        Self::new(id, TouchKind::Down, Point::new(x, y), time)
    }

    /// Shorthand for a Move sample.
    pub fn moved(id: u64, x: f32, y: f32, time: Instant) -> Self {
        Self::new(id, TouchKind::Move, Point::new(x, y), time)
    }

    /// Shorthand for an Up sample.
    pub fn up(id: u64, x: f32, y: f32, time: Instant) -> Self {
        Self::new(id, TouchKind::Up, Point::new(x, y), time)
    }

    /// Shorthand for a Cancel sample.
    pub fn cancel(id: u64, x: f32, y: f32, time: Instant) -> Self {
        Self::new(id, TouchKind::Cancel, Point::new(x, y), time)
    }

    /// Mark the sample as coming from a mouse.
    pub fn with_mouse(mut self) -> Self {
        self.source_type = SourceType::Mouse;
        self.source_tool = SourceTool::Mouse;
        self
    }

    /// Set the device class and tool.
    pub fn with_source(mut self, source_type: SourceType, source_tool: SourceTool) -> Self {
        self.source_type = source_type;
        self.source_tool = source_tool;
        self
    }

    /// Set the held modifiers.
    pub fn with_modifiers(mut self, modifiers: KeyboardModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set the contact force.
    pub fn with_force(mut self, force: f32) -> Self {
        self.force = force;
        self
    }

    /// Same sample with a different phase.
    pub fn with_kind(&self, kind: TouchKind) -> Self {
        let mut sample = self.clone();
        sample.kind = kind;
        sample
    }

    /// Whether the sample came from a mouse.
    pub fn is_mouse(&self) -> bool {
        self.source_type == SourceType::Mouse
    }
}

/// Phase of an axis sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisPhase {
    Begin,
    Update,
    End,
    Cancel,
}

/// One continuous scroll, pinch or rotation report.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSample {
    /// Id of the device pointer.
    pub id: u64,
    /// Phase of this report.
    pub phase: AxisPhase,
    /// Cursor position in window coordinates.
    pub position: Point,
    /// Cursor position in screen coordinates.
    pub screen_position: Point,
    /// Cursor position in node-local coordinates, filled in by dispatch.
    pub local_position: Point,
    /// Horizontal scroll delta in pixels.
    pub horizontal: f32,
    /// Vertical scroll delta in pixels.
    pub vertical: f32,
    /// Cumulative pinch scale for touchpad pinch / ctrl+wheel, if any.
    pub pinch_scale: Option<f32>,
    /// Cumulative rotation in degrees for touchpad rotation, if any.
    pub rotation: Option<f32>,
    /// The report belongs to a rotation gesture of the device.
    pub is_rotation: bool,
    /// Capture time.
    pub time: Instant,
    /// Device class.
    pub source_type: SourceType,
    /// Tool.
    pub source_tool: SourceTool,
    /// Modifiers held.
    pub modifiers: KeyboardModifiers,
}

impl AxisSample {
    /// Create a scroll sample from a mouse wheel.
    pub fn scroll(
        id: u64,
        phase: AxisPhase,
        position: Point,
        horizontal: f32,
        vertical: f32,
        time: Instant,
    ) -> Self {
        Self {
            id,
            phase,
            position,
            screen_position: position,
            local_position: position,
            horizontal,
            vertical,
            pinch_scale: None,
            rotation: None,
            is_rotation: false,
            time,
            source_type: SourceType::Mouse,
            source_tool: SourceTool::Mouse,
            modifiers: KeyboardModifiers::NONE,
        }
    }

    /// Mark the sample as a touchpad report.
    pub fn with_touchpad(mut self) -> Self {
        self.source_type = SourceType::Touchpad;
        self.source_tool = SourceTool::Touchpad;
        self
    }

    /// Attach a pinch scale.
    pub fn with_pinch_scale(mut self, scale: f32) -> Self {
        self.pinch_scale = Some(scale);
        self
    }

    /// Attach a rotation angle and flag the report as rotation.
    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = Some(degrees);
        self.is_rotation = true;
        self
    }

    /// Set the held modifiers.
    pub fn with_modifiers(mut self, modifiers: KeyboardModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// The scroll delta as a displacement.
    ///
    /// With Shift held, a purely vertical wheel scrolls horizontally.
    pub fn scroll_delta(&self) -> Point {
        if self.modifiers.shift && self.horizontal == 0.0 {
            Point::new(self.vertical, 0.0)
        } else {
            Point::new(self.horizontal, self.vertical)
        }
    }
}

/// Whether a gesture was driven by touch samples or axis samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum InputEventType {
    #[default]
    Touch,
    Axis,
}

/// Lifecycle step a [`GestureEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureAction {
    /// A continuous gesture was recognized.
    Start,
    /// A continuous gesture progressed.
    Update,
    /// A gesture finished normally.
    End,
    /// A recognized gesture was cancelled.
    Cancel,
    /// A discrete gesture fired (tap, swipe, long press).
    Action,
}

/// One finger participating in a gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerInfo {
    /// Pointer id.
    pub id: u64,
    /// Position in node-local coordinates.
    pub local_position: Point,
    /// Position in window coordinates.
    pub global_position: Point,
    /// Tool.
    pub source_tool: SourceTool,
}

/// Payload delivered to gesture callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureEvent {
    /// Lifecycle step.
    pub action: GestureAction,
    /// Time of the sample that caused the event.
    pub time: Instant,
    /// Fingers currently tracked.
    pub fingers: Vec<FingerInfo>,
    /// Device class.
    pub source_type: SourceType,
    /// Tool.
    pub source_tool: SourceTool,
    /// Total displacement since recognition began (pan).
    pub offset: Point,
    /// Displacement since the previous event (pan).
    pub delta: Point,
    /// Release velocity estimate, pixels per second.
    pub velocity: Point,
    /// Velocity projected onto the gesture's main axis.
    pub main_axis_velocity: f32,
    /// Scale relative to the start of the gesture (pinch).
    pub scale: f32,
    /// Centre of the fingers, node-local (pinch).
    pub pinch_center: Point,
    /// Rotation since the start of the gesture in degrees (rotation).
    pub angle: f32,
    /// Release speed (swipe).
    pub speed: f32,
    /// Repeat count (tap count, long-press repeat).
    pub repeat: u32,
    /// Primary position in node-local coordinates.
    pub local_position: Point,
    /// Primary position in window coordinates.
    pub window_position: Point,
    /// Primary position in screen coordinates.
    pub screen_position: Point,
    /// Node the recognizer is attached to.
    pub target: Option<NodeId>,
    /// Modifiers held.
    pub modifiers: KeyboardModifiers,
    /// Touch- or axis-driven.
    pub input_type: InputEventType,
    /// Contact force of the primary pointer.
    pub force: f32,
    /// Pen tilt of the primary pointer.
    pub tilt: Point,
}

impl GestureEvent {
    /// Create an event with neutral values for every kind-specific field.
    pub fn new(action: GestureAction, time: Instant) -> Self {
        Self {
            action,
            time,
            fingers: Vec::new(),
            source_type: SourceType::Touchscreen,
            source_tool: SourceTool::Finger,
            offset: Point::ZERO,
            delta: Point::ZERO,
            velocity: Point::ZERO,
            main_axis_velocity: 0.0,
            scale: 1.0,
            pinch_center: Point::ZERO,
            angle: 0.0,
            speed: 0.0,
            repeat: 0,
            local_position: Point::ZERO,
            window_position: Point::ZERO,
            screen_position: Point::ZERO,
            target: None,
            modifiers: KeyboardModifiers::NONE,
            input_type: InputEventType::Touch,
            force: 0.0,
            tilt: Point::ZERO,
        }
    }

    /// Copy position, device and modifier fields from a touch sample.
    pub fn with_touch(mut self, sample: &TouchSample) -> Self {
        self.source_type = sample.source_type;
        self.source_tool = sample.source_tool;
        self.local_position = sample.local_position;
        self.window_position = sample.position;
        self.screen_position = sample.screen_position;
        self.modifiers = sample.modifiers;
        self.input_type = InputEventType::Touch;
        self.force = sample.force;
        self.tilt = Point::new(sample.tilt_x, sample.tilt_y);
        self
    }

    /// Copy position, device and modifier fields from an axis sample.
    pub fn with_axis(mut self, sample: &AxisSample) -> Self {
        self.source_type = sample.source_type;
        self.source_tool = sample.source_tool;
        self.local_position = sample.local_position;
        self.window_position = sample.position;
        self.screen_position = sample.screen_position;
        self.modifiers = sample.modifiers;
        self.input_type = InputEventType::Axis;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_wheel_scrolls_horizontally() {
        let now = Instant::now();
        let sample = AxisSample::scroll(0, AxisPhase::Update, Point::ZERO, 0.0, 12.0, now)
            .with_modifiers(KeyboardModifiers::SHIFT);
        assert_eq!(sample.scroll_delta(), Point::new(12.0, 0.0));

        let plain = AxisSample::scroll(0, AxisPhase::Update, Point::ZERO, 3.0, 12.0, now);
        assert_eq!(plain.scroll_delta(), Point::new(3.0, 12.0));
    }

    #[test]
    fn test_event_copies_sample_fields() {
        let now = Instant::now();
        let mut sample = TouchSample::down(4, 10.0, 20.0, now).with_mouse().with_force(0.5);
        sample.local_position = Point::new(1.0, 2.0);

        let event = GestureEvent::new(GestureAction::Start, now).with_touch(&sample);
        assert_eq!(event.source_type, SourceType::Mouse);
        assert_eq!(event.local_position, Point::new(1.0, 2.0));
        assert_eq!(event.window_position, Point::new(10.0, 20.0));
        assert_eq!(event.force, 0.5);
        assert_eq!(event.scale, 1.0);
    }
}
