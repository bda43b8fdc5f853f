//! Goal markers agents wander between

use glam::Vec3;
use rand::Rng;
use rustc_hash::FxHashMap;

/// Lists goal marker positions by tag
pub trait GoalMarkers {
    fn goal_markers(&self, tag: &str) -> &[Vec3];
}

/// Pick a marker uniformly at random
pub fn pick_goal<R: Rng + ?Sized>(markers: &[Vec3], rng: &mut R) -> Option<Vec3> {
    if markers.is_empty() {
        return None;
    }
    Some(markers[rng.gen_range(0..markers.len())])
}

/// Tagged goal markers
#[derive(Debug, Clone, Default)]
pub struct GoalBoard {
    markers: FxHashMap<String, Vec<Vec3>>,
}

impl GoalBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker under `tag`
    pub fn add(&mut self, tag: impl Into<String>, position: Vec3) {
        self.markers.entry(tag.into()).or_default().push(position);
    }

    /// Remove every marker under `tag`
    pub fn clear_tag(&mut self, tag: &str) {
        self.markers.remove(tag);
    }

    /// Number of markers under `tag`
    #[must_use]
    pub fn count(&self, tag: &str) -> usize {
        self.goal_markers(tag).len()
    }
}

impl GoalMarkers for GoalBoard {
    fn goal_markers(&self, tag: &str) -> &[Vec3] {
        self.markers.get(tag).map(Vec::as_slice).unwrap_or_default()
    }
}
