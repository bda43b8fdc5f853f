//! Navigation event queue
//!
//! A double-buffered queue of things that happened to agents and the grid.
//! Events pushed during tick N become readable after the swap at the start
//! of tick N+1, so consumers never see a half-finished tick.
//!
//! # Example
//!
//! ```ignore
//! sim.tick(dt);
//! sim.tick(dt);
//! for event in sim.events().iter() {
//!     if let NavEvent::PathFailed { agent, reason, .. } = event {
//!         println!("{agent:?}: {reason}");
//!     }
//! }
//! ```

use std::collections::VecDeque;

use glam::Vec3;
use hecs::Entity;

use crate::error::NoPath;

// ============================================================================
// Event Types
// ============================================================================

/// Navigation events for inter-system communication.
///
/// The `#[non_exhaustive]` attribute allows adding new variants without
/// breaking downstream code that uses wildcard patterns.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum NavEvent {
    // -------------------------------------------------------------------------
    // Agent Events
    // -------------------------------------------------------------------------
    /// An agent picked a goal and got a path to it.
    PathAssigned {
        agent: Entity,
        /// Goal marker position
        goal: Vec3,
        /// Number of waypoints on the new path
        waypoints: usize,
    },

    /// An agent picked a goal that no path leads to.
    PathFailed {
        agent: Entity,
        goal: Vec3,
        reason: NoPath,
    },

    /// An agent went looking for a goal and found no markers.
    GoalsMissing {
        agent: Entity,
        /// Tag that had no markers
        tag: String,
    },

    /// An agent reached an intermediate waypoint.
    WaypointReached {
        agent: Entity,
        /// Index of the reached waypoint
        index: usize,
    },

    /// An agent reached the last waypoint of its path.
    PathCompleted { agent: Entity },

    // -------------------------------------------------------------------------
    // World Events
    // -------------------------------------------------------------------------
    /// The navigation grid was regenerated.
    GridRebuilt {
        width: usize,
        height: usize,
        /// Cells that are blocked or have no ground
        obstacles: usize,
    },

    /// The selected agent changed.
    SelectionChanged { agent: Option<Entity> },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue for tick-consistent event processing.
///
/// Events pushed during tick N are available for reading during tick N+1.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this tick
    pending: VecDeque<NavEvent>,
    /// Events from previous tick, ready for processing
    processing: VecDeque<NavEvent>,
}

impl EventQueue {
    /// Default initial capacity for event queues.
    const DEFAULT_CAPACITY: usize = 64;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a new event queue with specified initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be processed next tick.
    #[inline]
    pub fn push(&mut self, event: NavEvent) {
        self.pending.push_back(event);
    }

    /// Swap the pending and processing queues.
    ///
    /// Call this once per tick, at the start of the update. After swapping:
    /// - `iter()` returns events from the previous tick
    /// - `push()` writes to the new pending queue
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over events from the previous tick.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &NavEvent> {
        self.processing.iter()
    }

    /// Drain all events from the previous tick.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = NavEvent> + '_ {
        self.processing.drain(..)
    }

    /// Iterate over events pushed this tick that are not yet swapped in.
    #[inline]
    pub fn pending(&self) -> impl Iterator<Item = &NavEvent> {
        self.pending.iter()
    }

    /// Check if there are any events to process.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Get the number of events ready for processing.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Get the number of events pending for next tick.
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear all events (both pending and processing).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::GridCoord;

    /// Helper to create a test entity
    fn test_entity() -> Entity {
        let mut world = hecs::World::new();
        world.spawn(())
    }

    #[test]
    fn test_event_queue_push_and_swap() {
        let mut queue = EventQueue::new();
        let agent = test_entity();

        queue.push(NavEvent::PathCompleted { agent });
        assert!(queue.is_empty(), "Events should not be visible before swap");
        assert_eq!(queue.pending_count(), 1);

        queue.swap();
        assert_eq!(queue.len(), 1);

        let events: Vec<_> = queue.iter().collect();
        assert!(matches!(events[0], NavEvent::PathCompleted { agent: a } if *a == agent));
    }

    #[test]
    fn test_event_queue_double_buffer_isolation() {
        let mut queue = EventQueue::new();

        // Tick 1: push A
        queue.push(NavEvent::SelectionChanged { agent: None });
        queue.swap();

        // Tick 2: push B while A is being processed
        let agent = test_entity();
        queue.push(NavEvent::SelectionChanged { agent: Some(agent) });

        let events: Vec<_> = queue.iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], &NavEvent::SelectionChanged { agent: None });

        // Tick 3: now B
        queue.swap();
        let events: Vec<_> = queue.iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], &NavEvent::SelectionChanged { agent: Some(agent) });
    }

    #[test]
    fn test_event_queue_drain() {
        let mut queue = EventQueue::new();
        let agent = test_entity();

        queue.push(NavEvent::WaypointReached { agent, index: 0 });
        queue.push(NavEvent::WaypointReached { agent, index: 1 });
        queue.swap();

        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_event_queue_clear() {
        let mut queue = EventQueue::new();

        queue.push(NavEvent::GridRebuilt {
            width: 4,
            height: 4,
            obstacles: 0,
        });
        queue.swap();
        queue.push(NavEvent::SelectionChanged { agent: None });

        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_path_failed_event() {
        let agent = test_entity();
        let event = NavEvent::PathFailed {
            agent,
            goal: Vec3::new(3.0, 0.0, 4.0),
            reason: NoPath::Unreachable {
                goal: GridCoord::new(3, 4),
                expanded: 7,
            },
        };

        if let NavEvent::PathFailed { reason, goal, .. } = event {
            assert_eq!(goal, Vec3::new(3.0, 0.0, 4.0));
            assert_eq!(reason.to_string(), "goal cell (3, 4) is unreachable");
        } else {
            panic!("Wrong event type");
        }
    }
}
