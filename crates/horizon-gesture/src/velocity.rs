//! Velocity estimation for tracked pointers.
//!
//! Each pointer keeps a short history of timestamped positions. Samples
//! older than the recency window (measured from the pointer's newest sample)
//! are discarded, and the history never exceeds `max_samples`. Velocity is the
//! slope of a least-squares line fitted to position against time, per axis,
//! in pixels per second.
//!
//! With several pointers the fastest one wins: when fingers move out of step
//! the dominant finger represents intent better than an average.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use horizon_gesture_core::{GestureConfig, Point};
use horizon_gesture_core::logging::targets;

/// Axis a velocity is projected onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum VelocityAxis {
    Horizontal,
    Vertical,
    /// No restriction: the projection is the speed.
    #[default]
    Free,
}

#[derive(Debug, Clone, Default)]
struct PointerHistory {
    samples: VecDeque<(Instant, Point)>,
    ended: bool,
}

impl PointerHistory {
    fn push(&mut self, time: Instant, position: Point, window: Duration, max_samples: usize) {
        if self.ended {
            self.samples.clear();
            self.ended = false;
        }
        self.samples.push_back((time, position));
        while self.samples.len() > max_samples {
            self.samples.pop_front();
        }
        while let Some(&(oldest, _)) = self.samples.front() {
            if time.saturating_duration_since(oldest) > window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn velocity(&self) -> Point {
        let Some(&(newest, _)) = self.samples.back() else {
            return Point::ZERO;
        };
        if self.samples.len() < 2 {
            return Point::ZERO;
        }

        // Times are negative offsets from the newest sample, in seconds.
        let n = self.samples.len() as f64;
        let mut sum_t = 0.0;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for &(time, position) in &self.samples {
            sum_t -= newest.duration_since(time).as_secs_f64();
            sum_x += f64::from(position.x);
            sum_y += f64::from(position.y);
        }
        let (mean_t, mean_x, mean_y) = (sum_t / n, sum_x / n, sum_y / n);

        let mut var_t = 0.0;
        let mut cov_x = 0.0;
        let mut cov_y = 0.0;
        for &(time, position) in &self.samples {
            let dt = -newest.duration_since(time).as_secs_f64() - mean_t;
            var_t += dt * dt;
            cov_x += dt * (f64::from(position.x) - mean_x);
            cov_y += dt * (f64::from(position.y) - mean_y);
        }
        if var_t <= f64::EPSILON {
            return Point::ZERO;
        }
        Point::new((cov_x / var_t) as f32, (cov_y / var_t) as f32)
    }
}

/// Per-pointer velocity tracking.
#[derive(Debug, Clone)]
pub struct VelocityTracker {
    pointers: HashMap<u64, PointerHistory>,
    window: Duration,
    max_samples: usize,
}

impl Default for VelocityTracker {
    fn default() -> Self {
        Self::from_config(&GestureConfig::default())
    }
}

impl VelocityTracker {
    /// Create a tracker with an explicit window and sample bound.
    pub fn new(window: Duration, max_samples: usize) -> Self {
        Self {
            pointers: HashMap::new(),
            window,
            max_samples: max_samples.max(2),
        }
    }

    /// Create a tracker using the configured window and sample bound.
    pub fn from_config(config: &GestureConfig) -> Self {
        Self::new(config.velocity_window(), config.velocity_max_samples)
    }

    /// Record a position for a pointer.
    ///
    /// `is_end` marks the pointer's final sample; the next update for the
    /// same id starts a fresh history.
    pub fn update_touch_point(&mut self, id: u64, position: Point, time: Instant, is_end: bool) {
        let history = self.pointers.entry(id).or_default();
        history.push(time, position, self.window, self.max_samples);
        history.ended = is_end;
    }

    /// Velocity of the fastest tracked pointer.
    pub fn velocity(&self) -> Point {
        let fastest = self
            .pointers
            .values()
            .map(PointerHistory::velocity)
            .max_by(|a, b| a.length().total_cmp(&b.length()))
            .unwrap_or(Point::ZERO);
        tracing::trace!(target: targets::VELOCITY, vx = fastest.x, vy = fastest.y, "velocity estimate");
        fastest
    }

    /// Velocity of one pointer.
    pub fn pointer_velocity(&self, id: u64) -> Option<Point> {
        self.pointers.get(&id).map(PointerHistory::velocity)
    }

    /// Velocity projected onto an axis.
    pub fn main_axis_velocity(&self, axis: VelocityAxis) -> f32 {
        let velocity = self.velocity();
        match axis {
            VelocityAxis::Horizontal => velocity.x,
            VelocityAxis::Vertical => velocity.y,
            VelocityAxis::Free => velocity.length(),
        }
    }

    /// Drop one pointer's history.
    pub fn reset(&mut self, id: u64) {
        self.pointers.remove(&id);
    }

    /// Drop every pointer's history.
    pub fn reset_all(&mut self) {
        self.pointers.clear();
    }

    /// Number of pointers with history.
    pub fn tracked_count(&self) -> usize {
        self.pointers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn test_constant_motion() {
        let base = Instant::now();
        let mut tracker = VelocityTracker::default();
        for step in 0..5u64 {
            let x = step as f32 * 10.0;
            tracker.update_touch_point(1, Point::new(x, 0.0), ms(base, step * 10), false);
        }
        let velocity = tracker.velocity();
        assert!((velocity.x - 1000.0).abs() < 1.0, "got {velocity:?}");
        assert!(velocity.y.abs() < 1e-3);
    }

    #[test]
    fn test_single_sample_has_no_velocity() {
        let mut tracker = VelocityTracker::default();
        tracker.update_touch_point(1, Point::new(5.0, 5.0), Instant::now(), false);
        assert_eq!(tracker.velocity(), Point::ZERO);
        assert_eq!(tracker.velocity(), tracker.pointer_velocity(1).unwrap());
    }

    #[test]
    fn test_stale_samples_leave_window() {
        let base = Instant::now();
        let mut tracker = VelocityTracker::new(Duration::from_millis(50), 20);
        tracker.update_touch_point(1, Point::new(0.0, 0.0), ms(base, 0), false);
        tracker.update_touch_point(1, Point::new(100.0, 0.0), ms(base, 10), false);
        // Held still long enough for the motion to fall out of the window.
        tracker.update_touch_point(1, Point::new(100.0, 0.0), ms(base, 200), false);
        tracker.update_touch_point(1, Point::new(100.0, 0.0), ms(base, 210), true);
        assert_eq!(tracker.velocity(), Point::ZERO);
    }

    #[test]
    fn test_main_axis_projection() {
        let base = Instant::now();
        let mut tracker = VelocityTracker::default();
        tracker.update_touch_point(1, Point::new(0.0, 0.0), ms(base, 0), false);
        tracker.update_touch_point(1, Point::new(3.0, -4.0), ms(base, 10), false);

        assert!((tracker.main_axis_velocity(VelocityAxis::Horizontal) - 300.0).abs() < 0.5);
        assert!((tracker.main_axis_velocity(VelocityAxis::Vertical) + 400.0).abs() < 0.5);
        assert!((tracker.main_axis_velocity(VelocityAxis::Free) - 500.0).abs() < 0.5);
    }

    #[test]
    fn test_reset_single_pointer() {
        let base = Instant::now();
        let mut tracker = VelocityTracker::default();
        tracker.update_touch_point(1, Point::ZERO, base, false);
        tracker.update_touch_point(2, Point::ZERO, base, false);
        tracker.reset(1);
        assert_eq!(tracker.tracked_count(), 1);
        tracker.reset_all();
        assert_eq!(tracker.tracked_count(), 0);
    }
}
