//! Grid cells

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Integer address of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub z: i32,
}

impl GridCoord {
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Offset by a cell delta
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// One sampled cell of a [`NavGrid`](super::NavGrid).
///
/// Everything here is fixed at construction. Search bookkeeping is kept by
/// the path finder in its own per-search table, never on the node.
#[derive(Debug, Clone, PartialEq)]
pub struct NavNode {
    /// Cell address, matches the node's slot in the grid
    coord: GridCoord,
    /// World-space sample point (grid origin plus cell offset)
    pub position: Vec3,
    /// A ground surface was found under the sample point
    pub has_ground: bool,
    /// Agents may enter this cell
    pub walkable: bool,
    /// Where the ground ray hit, if it did
    pub hit_point: Option<Vec3>,
    /// Additive traversal penalty for entering this cell
    pub extra_cost: f32,
}

impl NavNode {
    pub(crate) fn new(coord: GridCoord, position: Vec3) -> Self {
        Self {
            coord,
            position,
            has_ground: false,
            walkable: false,
            hit_point: None,
            extra_cost: 0.0,
        }
    }

    #[must_use]
    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    /// Counted in the grid's obstacle set
    #[must_use]
    pub fn is_obstacle(&self) -> bool {
        !self.walkable || !self.has_ground
    }

    /// The point a path reports for this cell
    #[must_use]
    pub fn waypoint(&self) -> Vec3 {
        self.hit_point.unwrap_or(self.position)
    }
}
