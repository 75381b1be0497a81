//! Tuning constants for gesture recognition.
//!
//! Distances are in logical pixels and durations in milliseconds. The defaults
//! suit a touchscreen at typical density; platforms with other densities or
//! input hardware should load their own values:
//!
//! ```
//! use horizon_gesture_core::GestureConfig;
//!
//! let config = GestureConfig::from_toml_str(r#"
//!     pan_distance = 8.0
//!     long_press_duration_ms = 650
//! "#).unwrap();
//! assert_eq!(config.pan_distance, 8.0);
//! assert_eq!(config.tap_slop, GestureConfig::default().tap_slop);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GestureError, Result};

/// Largest finger count any recognizer accepts.
pub const MAX_FINGERS: usize = 10;

/// Default pan distance threshold for touch input.
pub const DEFAULT_PAN_DISTANCE: f32 = 5.0;

/// Default pan distance threshold for mouse and axis input.
pub const DEFAULT_PAN_MOUSE_DISTANCE: f32 = 1.0;

/// Default maximum movement for a tap.
pub const DEFAULT_TAP_SLOP: f32 = 10.0;

/// Default maximum gap between taps of a multi-tap.
pub const DEFAULT_MULTI_TAP_INTERVAL_MS: u64 = 300;

/// Default hold time for a long press.
pub const DEFAULT_LONG_PRESS_DURATION_MS: u64 = 500;

/// Default maximum movement during a long press.
pub const DEFAULT_LONG_PRESS_SLOP: f32 = 15.0;

/// Default minimum release speed for a swipe, in pixels per second.
pub const DEFAULT_SWIPE_SPEED: f32 = 100.0;

/// Default span change before a pinch is recognized.
pub const DEFAULT_PINCH_DISTANCE: f32 = 5.0;

/// Default angle change before a rotation is recognized, in degrees.
pub const DEFAULT_ROTATION_ANGLE: f32 = 1.0;

/// Default recency window for velocity estimation.
pub const DEFAULT_VELOCITY_WINDOW_MS: u64 = 100;

/// Default number of samples kept per pointer for velocity estimation.
pub const DEFAULT_VELOCITY_MAX_SAMPLES: usize = 20;

/// Thresholds and windows used by the recognizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Pan distance threshold for touch input.
    pub pan_distance: f32,
    /// Pan distance threshold for mouse and axis input.
    pub pan_mouse_distance: f32,
    /// Maximum movement for a tap.
    pub tap_slop: f32,
    /// Maximum gap between taps of a multi-tap.
    pub multi_tap_interval_ms: u64,
    /// Hold time for a long press.
    pub long_press_duration_ms: u64,
    /// Maximum movement during a long press.
    pub long_press_slop: f32,
    /// Minimum release speed for a swipe.
    pub swipe_speed: f32,
    /// Span change before a pinch is recognized.
    pub pinch_distance: f32,
    /// Angle change before a rotation is recognized, in degrees.
    pub rotation_angle: f32,
    /// Recency window for velocity estimation.
    pub velocity_window_ms: u64,
    /// Samples kept per pointer for velocity estimation.
    pub velocity_max_samples: usize,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pan_distance: DEFAULT_PAN_DISTANCE,
            pan_mouse_distance: DEFAULT_PAN_MOUSE_DISTANCE,
            tap_slop: DEFAULT_TAP_SLOP,
            multi_tap_interval_ms: DEFAULT_MULTI_TAP_INTERVAL_MS,
            long_press_duration_ms: DEFAULT_LONG_PRESS_DURATION_MS,
            long_press_slop: DEFAULT_LONG_PRESS_SLOP,
            swipe_speed: DEFAULT_SWIPE_SPEED,
            pinch_distance: DEFAULT_PINCH_DISTANCE,
            rotation_angle: DEFAULT_ROTATION_ANGLE,
            velocity_window_ms: DEFAULT_VELOCITY_WINDOW_MS,
            velocity_max_samples: DEFAULT_VELOCITY_MAX_SAMPLES,
        }
    }
}

impl GestureConfig {
    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        if let Err(err) = config.validate() {
            crate::gesture_warn!(%err, "rejected gesture config");
            return Err(err);
        }
        crate::gesture_trace!(?config, "parsed gesture config");
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|source| GestureError::io(path, source))?;
        let config = Self::from_toml_str(&source)?;
        crate::gesture_debug!(path = %path.display(), "loaded gesture config");
        Ok(config)
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("pan_distance", self.pan_distance),
            ("pan_mouse_distance", self.pan_mouse_distance),
            ("tap_slop", self.tap_slop),
            ("long_press_slop", self.long_press_slop),
            ("swipe_speed", self.swipe_speed),
            ("pinch_distance", self.pinch_distance),
            ("rotation_angle", self.rotation_angle),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(GestureError::invalid_config(
                    field,
                    format!("expected a finite non-negative number, got {value}"),
                ));
            }
        }
        if self.velocity_window_ms == 0 {
            return Err(GestureError::invalid_config(
                "velocity_window_ms",
                "window must be at least 1 ms",
            ));
        }
        if self.velocity_max_samples < 2 {
            return Err(GestureError::invalid_config(
                "velocity_max_samples",
                "at least two samples are needed to estimate velocity",
            ));
        }
        if self.long_press_duration_ms == 0 {
            return Err(GestureError::invalid_config(
                "long_press_duration_ms",
                "duration must be at least 1 ms",
            ));
        }
        Ok(())
    }

    /// Multi-tap interval as a [`Duration`].
    pub fn multi_tap_interval(&self) -> Duration {
        Duration::from_millis(self.multi_tap_interval_ms)
    }

    /// Long-press duration as a [`Duration`].
    pub fn long_press_duration(&self) -> Duration {
        Duration::from_millis(self.long_press_duration_ms)
    }

    /// Velocity window as a [`Duration`].
    pub fn velocity_window(&self) -> Duration {
        Duration::from_millis(self.velocity_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(GestureConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GestureConfig::from_toml_str("swipe_speed = 250.0").unwrap();
        assert_eq!(config.swipe_speed, 250.0);
        assert_eq!(config.pan_distance, DEFAULT_PAN_DISTANCE);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = GestureConfig::from_toml_str("pan_distance = -1.0").unwrap_err();
        assert!(matches!(
            err,
            GestureError::InvalidConfig {
                field: "pan_distance",
                ..
            }
        ));

        let err = GestureConfig::from_toml_str("velocity_max_samples = 1").unwrap_err();
        assert!(matches!(err, GestureError::InvalidConfig { .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = GestureConfig::from_toml_str("pan_distance = ").unwrap_err();
        assert!(matches!(err, GestureError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = GestureConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, GestureError::Io { .. }));
    }
}
