//! Logging facilities for Horizon Gesture.
//!
//! Horizon Gesture uses the `tracing` crate for instrumentation. Nothing is
//! printed unless the application installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_gesture::referee=debug")
//!     .init();
//! ```
//!
//! Every event is emitted under one of the [`targets`] so arbitration can be
//! traced without drowning in per-sample velocity output.

/// Span names used for tracing dispatch rounds.
pub mod span_names {
    /// One touch sample dispatched through hit test and arbitration.
    pub const DISPATCH_TOUCH: &str = "horizon_gesture::dispatch_touch";
    /// One axis sample dispatched through arbitration.
    pub const DISPATCH_AXIS: &str = "horizon_gesture::dispatch_axis";
    /// Deadline processing (long press, multi-tap expiry).
    pub const TICK: &str = "horizon_gesture::tick";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_gesture_core";
    /// Signal emission.
    pub const SIGNAL: &str = "horizon_gesture_core::signal";
    /// Node arena and hit testing.
    pub const NODE: &str = "horizon_gesture_core::node";
    /// Hit-test and hand-off of samples to recognizers.
    pub const DISPATCH: &str = "horizon_gesture::dispatch";
    /// Recognizer state transitions and votes.
    pub const RECOGNIZER: &str = "horizon_gesture::recognizer";
    /// Arbitration decisions.
    pub const REFEREE: &str = "horizon_gesture::referee";
    /// Synthetic event injection.
    pub const POST_EVENT: &str = "horizon_gesture::post_event";
    /// Velocity estimation.
    pub const VELOCITY: &str = "horizon_gesture::velocity";
    /// Declarative gesture construction.
    pub const MODEL: &str = "horizon_gesture::model";
    /// Dispatch timing spans.
    pub const PERF: &str = "horizon_gesture::perf";
    /// Conversion of windowing-system input.
    pub const PLATFORM: &str = "horizon_gesture::platform";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Used to time a full dispatch round.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::trace_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Trace-level log under the core target.
#[macro_export]
macro_rules! gesture_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: $crate::logging::targets::CORE, $($arg)*)
    };
}

/// Debug-level log under the core target.
#[macro_export]
macro_rules! gesture_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: $crate::logging::targets::CORE, $($arg)*)
    };
}

/// Warn-level log under the core target.
#[macro_export]
macro_rules! gesture_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: $crate::logging::targets::CORE, $($arg)*)
    };
}
