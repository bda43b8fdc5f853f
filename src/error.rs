//! Error types for navigation and steering

use thiserror::Error;

use crate::nav::GridCoord;

/// Why a path search produced no path.
///
/// This is an ordinary search outcome, not a fault: callers fall back to
/// idling and pick another goal later.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoPath {
    /// An endpoint resolved to a cell outside the grid
    #[error("cell {0} lies outside the grid")]
    OutOfBounds(GridCoord),

    /// The goal cell can never be entered
    #[error("goal cell {0} is not walkable")]
    GoalNotWalkable(GridCoord),

    /// The open set ran dry before the goal was reached
    #[error("goal cell {goal} is unreachable")]
    Unreachable {
        goal: GridCoord,
        /// Nodes closed before giving up
        expanded: usize,
    },
}

impl NoPath {
    /// Nodes the search closed before failing. Only exhausted searches
    /// expand anything.
    #[must_use]
    pub fn expanded(&self) -> usize {
        match self {
            Self::Unreachable { expanded, .. } => *expanded,
            Self::OutOfBounds(_) | Self::GoalNotWalkable(_) => 0,
        }
    }
}

/// Navigation error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    #[error(transparent)]
    NoPath(#[from] NoPath),

    #[error("no goal markers tagged `{0}`")]
    MissingGoals(String),

    #[error("invalid grid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, NavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_path_converts_into_nav_error() {
        let reason = NoPath::Unreachable {
            goal: GridCoord::new(3, 4),
            expanded: 12,
        };
        assert_eq!(reason.expanded(), 12);

        let err: NavError = reason.into();
        assert_eq!(err.to_string(), "goal cell (3, 4) is unreachable");
        assert!(matches!(err, NavError::NoPath(NoPath::Unreachable { .. })));
    }

    #[test]
    fn test_early_failures_expand_nothing() {
        assert_eq!(NoPath::OutOfBounds(GridCoord::new(-1, 0)).expanded(), 0);
        assert_eq!(NoPath::GoalNotWalkable(GridCoord::new(2, 2)).expanded(), 0);
    }
}
