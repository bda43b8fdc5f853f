//! Navigation grid and path search
//!
//! Provides the sampled grid data model, its construction from ray queries,
//! and A* search over it.

mod grid;
mod node;
mod pathfinding;
mod sampling;

pub use grid::NavGrid;
pub use node::{GridCoord, NavNode};
pub use pathfinding::{NoTrace, Path, SearchTrace, find_path, find_path_traced, octile_distance};
pub use sampling::{
    CostAnnotations, FlatGround, GroundQuery, ObstacleQuery, SurfaceHit, SurfaceId,
};
