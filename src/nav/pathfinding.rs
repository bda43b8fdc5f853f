//! A* pathfinding over a [`NavGrid`]
//!
//! Searches are stateless with respect to the grid: all bookkeeping (cost so
//! far, heuristic, predecessor, open/closed) lives in a table created for one
//! call and dropped when it returns. Any number of searches may borrow the
//! same grid.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec3;

use super::grid::NavGrid;
use super::node::GridCoord;
use crate::error::NoPath;

/// Diagonal step weight of the octile metric
const DIAGONAL_COST: f32 = 1.4;

/// Octile distance between two world points over X and Z
#[must_use]
pub fn octile_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = (a.x - b.x).abs();
    let dz = (a.z - b.z).abs();
    DIAGONAL_COST * dx.min(dz) + (dx - dz).abs()
}

/// Observer hooks called while a search runs
pub trait SearchTrace {
    /// A node was taken off the open set and closed
    fn expanded(&mut self, _coord: GridCoord) {}

    /// A neighbour got a better cost through the node being expanded
    fn relaxed(&mut self, _from: Vec3, _to: Vec3) {}
}

/// Trace that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrace;

impl SearchTrace for NoTrace {}

/// A found path
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Waypoints in world coordinates, start cell first, goal cell last
    pub waypoints: Vec<Vec3>,
    /// Cells matching each waypoint
    pub cells: Vec<GridCoord>,
    /// Accumulated cost at each waypoint
    pub costs: Vec<f32>,
    /// Nodes closed during the search
    pub expanded: usize,
}

impl Path {
    /// Accumulated cost at the goal
    #[must_use]
    pub fn cost(&self) -> f32 {
        self.costs.last().copied().unwrap_or(0.0)
    }

    /// Number of waypoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Last waypoint
    #[must_use]
    pub fn goal(&self) -> Option<Vec3> {
        self.waypoints.last().copied()
    }

    /// Octile length of the polyline through all waypoints
    #[must_use]
    pub fn octile_length(&self) -> f32 {
        self.waypoints
            .windows(2)
            .map(|pair| octile_distance(pair[0], pair[1]))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unseen,
    Open,
    Closed,
}

/// Per-search state of one cell
#[derive(Debug, Clone, Copy)]
struct SearchRecord {
    /// Cost from start
    g: f32,
    /// Estimate to goal
    h: f32,
    parent: Option<usize>,
    visit: Visit,
}

impl SearchRecord {
    const UNSEEN: Self = Self {
        g: f32::INFINITY,
        h: 0.0,
        parent: None,
        visit: Visit::Unseen,
    };
}

/// Open set entry
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    /// g + h + extra cost of the cell
    total: f32,
    h: f32,
    /// Insertion order, earlier wins remaining ties
    seq: u64,
    index: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap
        other
            .total
            .total_cmp(&self.total)
            .then_with(|| other.h.total_cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path using A*.
///
/// # Errors
///
/// Returns [`NoPath`] when an endpoint lies outside the grid, the goal cell
/// is not walkable, or the goal cannot be reached.
pub fn find_path(grid: &NavGrid, start: Vec3, goal: Vec3) -> Result<Path, NoPath> {
    find_path_traced(grid, start, goal, &mut NoTrace)
}

/// Find a path using A*, reporting progress to `trace`.
///
/// The open set pops the lowest `g + h + extra_cost`, then the lowest `h`,
/// then the earliest insertion. Closed cells are never reopened.
///
/// # Errors
///
/// Same as [`find_path`].
pub fn find_path_traced<T: SearchTrace + ?Sized>(
    grid: &NavGrid,
    start: Vec3,
    goal: Vec3,
    trace: &mut T,
) -> Result<Path, NoPath> {
    let start_cell = grid.world_to_cell(start);
    let goal_cell = grid.world_to_cell(goal);

    let start_index = grid
        .index_of(start_cell)
        .ok_or(NoPath::OutOfBounds(start_cell))?;
    let goal_index = grid
        .index_of(goal_cell)
        .ok_or(NoPath::OutOfBounds(goal_cell))?;

    let goal_node = grid.node_at(goal_index);
    if !goal_node.walkable {
        return Err(NoPath::GoalNotWalkable(goal_cell));
    }

    let mut records = vec![SearchRecord::UNSEEN; grid.len()];
    let mut open = BinaryHeap::new();
    let mut seq = 0u64;
    let mut expanded = 0usize;

    let start_node = grid.node_at(start_index);
    let start_h = octile_distance(start_node.position, goal_node.position);
    records[start_index] = SearchRecord {
        g: 0.0,
        h: start_h,
        parent: None,
        visit: Visit::Open,
    };
    open.push(OpenEntry {
        total: start_h + start_node.extra_cost,
        h: start_h,
        seq,
        index: start_index,
    });

    while let Some(entry) = open.pop() {
        let current_index = entry.index;
        if records[current_index].visit == Visit::Closed {
            continue;
        }
        records[current_index].visit = Visit::Closed;
        expanded += 1;

        let current = grid.node_at(current_index);
        trace.expanded(current.coord());

        if current_index == goal_index {
            return Ok(retrace(grid, &records, start_index, goal_index, expanded));
        }

        let current_g = records[current_index].g;

        for neighbor in grid.neighbors(current.coord()) {
            if !neighbor.walkable {
                continue;
            }
            let Some(neighbor_index) = grid.index_of(neighbor.coord()) else {
                continue;
            };
            let record = &mut records[neighbor_index];
            if record.visit == Visit::Closed {
                continue;
            }

            let tentative = current_g
                + octile_distance(current.position, neighbor.position)
                + neighbor.extra_cost;

            if record.visit == Visit::Unseen || tentative < record.g {
                record.g = tentative;
                record.h = octile_distance(neighbor.position, goal_node.position);
                record.parent = Some(current_index);
                record.visit = Visit::Open;

                seq += 1;
                open.push(OpenEntry {
                    total: record.g + record.h + neighbor.extra_cost,
                    h: record.h,
                    seq,
                    index: neighbor_index,
                });
                trace.relaxed(current.position, neighbor.position);
            }
        }
    }

    Err(NoPath::Unreachable {
        goal: goal_cell,
        expanded,
    })
}

/// Walk predecessor links back from the goal
fn retrace(
    grid: &NavGrid,
    records: &[SearchRecord],
    start_index: usize,
    goal_index: usize,
    expanded: usize,
) -> Path {
    let mut indices = vec![goal_index];
    let mut current = goal_index;
    while current != start_index {
        match records[current].parent {
            Some(parent) => {
                indices.push(parent);
                current = parent;
            }
            None => break,
        }
    }
    indices.reverse();

    let nodes: Vec<_> = indices.iter().map(|&i| grid.node_at(i)).collect();

    Path {
        waypoints: nodes.iter().map(|n| n.waypoint()).collect(),
        cells: nodes.iter().map(|n| n.coord()).collect(),
        costs: indices.iter().map(|&i| records[i].g).collect(),
        expanded,
    }
}
