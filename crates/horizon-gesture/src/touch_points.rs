//! Per-recognizer bookkeeping of the pointers it is following.
//!
//! Entries keep Down order so "the first two fingers" is well defined, and
//! each entry accumulates its own displacement since Down
//! ([`TrackedPoint::distance`]), which direction-restricted recognizers use to
//! weigh what each finger is actually doing.

use horizon_gesture_core::Point;

use crate::event::{FingerInfo, TouchSample};

/// One pointer followed by a recognizer.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPoint {
    /// The Down sample that started tracking.
    pub down: TouchSample,
    /// The most recent sample.
    pub last: TouchSample,
    /// Displacement accumulated since Down.
    pub distance: Point,
}

impl TrackedPoint {
    /// As callback payload finger info.
    pub fn finger_info(&self) -> FingerInfo {
        FingerInfo {
            id: self.last.id,
            local_position: self.last.local_position,
            global_position: self.last.position,
            source_tool: self.last.source_tool,
        }
    }
}

/// Pointers tracked by one recognizer, in Down order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TouchPointRegistry {
    points: Vec<TrackedPoint>,
}

impl TouchPointRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a pointer. A pointer already tracked is restarted.
    pub fn insert(&mut self, sample: &TouchSample) {
        self.points.retain(|p| p.down.id != sample.id);
        self.points.push(TrackedPoint {
            down: sample.clone(),
            last: sample.clone(),
            distance: Point::ZERO,
        });
    }

    /// Record a new sample for a tracked pointer.
    ///
    /// Returns the displacement since the previous sample, or `None` when the
    /// pointer is not tracked.
    pub fn update(&mut self, sample: &TouchSample) -> Option<Point> {
        let point = self.points.iter_mut().find(|p| p.down.id == sample.id)?;
        let delta = sample.position - point.last.position;
        point.distance += delta;
        point.last = sample.clone();
        Some(delta)
    }

    /// Stop tracking a pointer.
    pub fn remove(&mut self, id: u64) -> Option<TrackedPoint> {
        let index = self.points.iter().position(|p| p.down.id == id)?;
        Some(self.points.remove(index))
    }

    /// Look up a tracked pointer.
    pub fn get(&self, id: u64) -> Option<&TrackedPoint> {
        self.points.iter().find(|p| p.down.id == id)
    }

    /// Whether a pointer is tracked.
    pub fn contains(&self, id: u64) -> bool {
        self.get(id).is_some()
    }

    /// Number of tracked pointers.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Tracked pointers in Down order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedPoint> {
        self.points.iter()
    }

    /// Ids of tracked pointers in Down order.
    pub fn ids(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.down.id).collect()
    }

    /// Forget every pointer.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Zero every accumulated displacement, keeping the pointers.
    pub fn reset_distances(&mut self) {
        for point in &mut self.points {
            point.distance = Point::ZERO;
        }
    }

    /// Centre of the current positions (window coordinates).
    pub fn centroid(&self) -> Point {
        self.centroid_with(|p| p.last.position)
    }

    /// Centre of the current positions (node-local coordinates).
    pub fn local_centroid(&self) -> Point {
        self.centroid_with(|p| p.last.local_position)
    }

    fn centroid_with(&self, position: impl Fn(&TrackedPoint) -> Point) -> Point {
        if self.points.is_empty() {
            return Point::ZERO;
        }
        let sum = self
            .points
            .iter()
            .fold(Point::ZERO, |acc, p| acc + position(p));
        sum / self.points.len() as f32
    }

    /// Mean distance of the current positions from their centroid.
    pub fn span(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        let centre = self.centroid();
        let total: f32 = self
            .points
            .iter()
            .map(|p| p.last.position.distance(centre))
            .sum();
        total / self.points.len() as f32
    }

    /// Most recent sample of the most recently moved-or-added pointer.
    pub fn latest(&self) -> Option<&TouchSample> {
        self.points
            .iter()
            .map(|p| &p.last)
            .max_by_key(|sample| sample.time)
    }

    /// Finger info for callback payloads.
    pub fn finger_infos(&self) -> Vec<FingerInfo> {
        self.points.iter().map(TrackedPoint::finger_info).collect()
    }
}
