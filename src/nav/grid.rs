//! Navigation grid built from environment sampling

use glam::Vec3;
use smallvec::SmallVec;

use super::node::{GridCoord, NavNode};
use super::sampling::{CostAnnotations, GroundQuery, ObstacleQuery};
use crate::core::GridConfig;
use crate::error::NavError;

/// Neighbour offsets in the order they are reported: left, left-down,
/// left-up, right, right-down, right-up, down, up.
const MOORE_OFFSETS: [(i32, i32); 8] = [
    (-1, 0),
    (-1, -1),
    (-1, 1),
    (1, 0),
    (1, -1),
    (1, 1),
    (0, -1),
    (0, 1),
];

/// A dense 2D navigation grid
#[derive(Debug, Clone)]
pub struct NavGrid {
    config: GridConfig,
    /// Row-major by z: `index = z * width + x`
    nodes: Vec<NavNode>,
    /// Cells that are blocked or have no ground
    obstacles: Vec<GridCoord>,
}

impl NavGrid {
    /// Sample the environment once per cell and build the grid.
    ///
    /// Each cell casts a ray straight down from `sample_height` above its
    /// position. A ground hit makes the cell walkable unless the obstacle
    /// query reports something along the same ray. Cells without ground are
    /// kept so every in-bounds coordinate stays addressable.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Configuration`] if the layout is degenerate.
    pub fn build(
        config: &GridConfig,
        ground: &impl GroundQuery,
        obstacles: &impl ObstacleQuery,
        costs: &impl CostAnnotations,
    ) -> Result<Self, NavError> {
        config.validate()?;

        let mut nodes = Vec::with_capacity(config.width * config.height);
        let mut blocked = Vec::new();

        for z in 0..config.height as i32 {
            for x in 0..config.width as i32 {
                let coord = GridCoord::new(x, z);
                let position = Self::position_of(config, coord);
                let ray_origin = position + Vec3::Y * config.sample_height;

                let mut node = NavNode::new(coord, position);
                node.extra_cost = config.default_extra_cost;

                if let Some(hit) = ground.ground(ray_origin, Vec3::NEG_Y) {
                    node.has_ground = true;
                    node.hit_point = Some(hit.point);
                    node.walkable = !obstacles.obstructed(ray_origin, Vec3::NEG_Y);
                    if let Some(cost) = costs.extra_cost(hit.surface) {
                        node.extra_cost = cost;
                    }
                }

                if node.is_obstacle() {
                    blocked.push(coord);
                }
                nodes.push(node);
            }
        }

        let grid = Self {
            config: *config,
            nodes,
            obstacles: blocked,
        };

        log::info!(
            "Built {}x{} nav grid: {} walkable, {} obstacle cells",
            grid.width(),
            grid.height(),
            grid.walkable_count(),
            grid.obstacles.len()
        );

        Ok(grid)
    }

    /// Regenerate every cell from fresh samples, keeping the layout.
    ///
    /// On error the old grid is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Configuration`] if the layout is degenerate.
    pub fn rebuild(
        &mut self,
        ground: &impl GroundQuery,
        obstacles: &impl ObstacleQuery,
        costs: &impl CostAnnotations,
    ) -> Result<(), NavError> {
        *self = Self::build(&self.config, ground, obstacles, costs)?;
        Ok(())
    }

    fn position_of(config: &GridConfig, coord: GridCoord) -> Vec3 {
        config.origin
            + Vec3::new(
                coord.x as f32 * config.cell_size,
                0.0,
                coord.z as f32 * config.cell_size,
            )
    }

    pub(crate) fn index_of(&self, coord: GridCoord) -> Option<usize> {
        if self.contains(coord) {
            Some(coord.z as usize * self.config.width + coord.x as usize)
        } else {
            None
        }
    }

    pub(crate) fn node_at(&self, index: usize) -> &NavNode {
        &self.nodes[index]
    }

    /// Layout the grid was built with
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.config.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.config.height
    }

    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.config.cell_size
    }

    #[must_use]
    pub fn origin(&self) -> Vec3 {
        self.config.origin
    }

    /// Total number of cells
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a built grid
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check whether a coordinate lies inside the grid
    #[must_use]
    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.z >= 0
            && (coord.x as usize) < self.config.width
            && (coord.z as usize) < self.config.height
    }

    /// Get the node at a coordinate
    #[must_use]
    pub fn node(&self, coord: GridCoord) -> Option<&NavNode> {
        self.index_of(coord).map(|i| &self.nodes[i])
    }

    /// All nodes, row by row
    pub fn nodes(&self) -> impl Iterator<Item = &NavNode> {
        self.nodes.iter()
    }

    /// Nodes that are blocked or have no ground
    pub fn obstacles(&self) -> impl Iterator<Item = &NavNode> {
        self.obstacles.iter().filter_map(|&coord| self.node(coord))
    }

    /// Number of cells an agent may enter
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.walkable).count()
    }

    /// The 8-connected neighbours of a cell, without wrap-around
    #[must_use]
    pub fn neighbors(&self, coord: GridCoord) -> SmallVec<[&NavNode; 8]> {
        MOORE_OFFSETS
            .iter()
            .filter_map(|&(dx, dz)| self.node(coord.offset(dx, dz)))
            .collect()
    }

    /// Map a world position to the nearest cell.
    ///
    /// Each axis rounds half up, so a point midway between two cells belongs
    /// to the one with the larger index. The result may lie outside the grid.
    #[must_use]
    pub fn world_to_cell(&self, position: Vec3) -> GridCoord {
        let local = (position - self.config.origin) / self.config.cell_size;
        GridCoord::new(
            (local.x + 0.5).floor() as i32,
            (local.z + 0.5).floor() as i32,
        )
    }

    /// Like [`world_to_cell`](Self::world_to_cell) but only for positions
    /// that land inside the grid
    #[must_use]
    pub fn cell(&self, position: Vec3) -> Option<GridCoord> {
        let coord = self.world_to_cell(position);
        self.contains(coord).then_some(coord)
    }

    /// World position of a cell
    #[must_use]
    pub fn cell_to_world(&self, coord: GridCoord) -> Vec3 {
        Self::position_of(&self.config, coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::sampling::{FlatGround, SurfaceHit, SurfaceId};

    fn open_grid(width: usize, height: usize) -> NavGrid {
        let floor = FlatGround::new(0.0);
        NavGrid::build(
            &GridConfig::new(Vec3::ZERO, width, height, 1.0),
            &floor,
            &floor,
            &floor,
        )
        .unwrap()
    }

    #[test]
    fn test_build_is_dense() {
        let grid = open_grid(4, 3);
        assert_eq!(grid.len(), 12);
        for z in 0..3 {
            for x in 0..4 {
                let coord = GridCoord::new(x, z);
                let node = grid.node(coord).unwrap();
                assert_eq!(node.coord(), coord);
                assert_eq!(node.position, Vec3::new(x as f32, 0.0, z as f32));
                assert!(node.walkable);
                assert!((node.extra_cost - 40.0).abs() < f32::EPSILON);
            }
        }
        assert_eq!(grid.obstacles().count(), 0);
    }

    #[test]
    fn test_missing_ground_is_stored_and_blocked() {
        // Ground only for x < 2
        let ground = |origin: Vec3, _dir: Vec3| {
            (origin.x < 1.5).then_some(SurfaceHit {
                point: Vec3::new(origin.x, 0.0, origin.z),
                surface: SurfaceId(1),
            })
        };
        let grid = NavGrid::build(
            &GridConfig::new(Vec3::ZERO, 4, 2, 1.0),
            &ground,
            &FlatGround::new(0.0),
            &FlatGround::new(0.0),
        )
        .unwrap();

        assert_eq!(grid.len(), 8);
        let gap = grid.node(GridCoord::new(3, 1)).unwrap();
        assert!(!gap.has_ground);
        assert!(!gap.walkable);
        assert!(gap.hit_point.is_none());
        assert_eq!(grid.obstacles().count(), 4);
        assert_eq!(grid.walkable_count(), 4);
    }

    #[test]
    fn test_obstacles_and_cost_annotations() {
        let ground = |origin: Vec3, _dir: Vec3| {
            Some(SurfaceHit {
                point: Vec3::new(origin.x, 0.0, origin.z),
                surface: SurfaceId(if origin.z > 0.5 { 2 } else { 1 }),
            })
        };
        let pillar = |origin: Vec3, _dir: Vec3| origin.x.abs() < 0.1 && origin.z.abs() < 0.1;
        let costs = |surface: SurfaceId| (surface == SurfaceId(2)).then_some(3.0);

        let grid = NavGrid::build(
            &GridConfig::new(Vec3::ZERO, 2, 2, 1.0),
            &ground,
            &pillar,
            &costs,
        )
        .unwrap();

        let blocked = grid.node(GridCoord::new(0, 0)).unwrap();
        assert!(blocked.has_ground);
        assert!(!blocked.walkable);
        assert_eq!(grid.obstacles().count(), 1);

        assert!((grid.node(GridCoord::new(1, 0)).unwrap().extra_cost - 40.0).abs() < 1e-6);
        assert!((grid.node(GridCoord::new(1, 1)).unwrap().extra_cost - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_layout_rejected() {
        let floor = FlatGround::new(0.0);
        let result = NavGrid::build(
            &GridConfig::new(Vec3::ZERO, 0, 0, 1.0),
            &floor,
            &floor,
            &floor,
        );
        assert!(matches!(result, Err(NavError::Configuration(_))));
    }

    #[test]
    fn test_neighbors_corner_and_center() {
        let grid = open_grid(3, 3);

        let corner: Vec<_> = grid
            .neighbors(GridCoord::new(0, 0))
            .iter()
            .map(|n| n.coord())
            .collect();
        assert_eq!(
            corner,
            vec![GridCoord::new(1, 0), GridCoord::new(1, 1), GridCoord::new(0, 1)]
        );

        let center = grid.neighbors(GridCoord::new(1, 1));
        assert_eq!(center.len(), 8);
        assert!(center.iter().all(|n| n.coord() != GridCoord::new(1, 1)));
    }

    #[test]
    fn test_world_to_cell_rounding() {
        let grid = open_grid(5, 5);

        // Exact centres
        assert_eq!(grid.world_to_cell(Vec3::new(2.0, 7.0, 3.0)), GridCoord::new(2, 3));
        // Midpoints round half up
        assert_eq!(grid.world_to_cell(Vec3::new(1.5, 0.0, 2.5)), GridCoord::new(2, 3));
        assert_eq!(grid.world_to_cell(Vec3::new(-0.5, 0.0, 0.49)), GridCoord::new(0, 0));
        // Out of range is reported, not clamped
        assert_eq!(grid.world_to_cell(Vec3::new(-0.6, 0.0, 9.0)), GridCoord::new(-1, 9));
        assert_eq!(grid.cell(Vec3::new(-0.6, 0.0, 0.0)), None);
        assert_eq!(grid.cell(Vec3::new(4.4, 0.0, 0.0)), Some(GridCoord::new(4, 0)));
    }

    #[test]
    fn test_offset_origin_and_cell_size() {
        let floor = FlatGround::new(0.0);
        let grid = NavGrid::build(
            &GridConfig::new(Vec3::new(-10.0, 0.0, 5.0), 10, 10, 2.0),
            &floor,
            &floor,
            &floor,
        )
        .unwrap();

        let coord = GridCoord::new(3, 4);
        let world = grid.cell_to_world(coord);
        assert_eq!(world, Vec3::new(-4.0, 0.0, 13.0));
        assert_eq!(grid.world_to_cell(world), coord);
        assert_eq!(grid.world_to_cell(world + Vec3::new(0.9, 0.0, -0.9)), coord);
    }

    #[test]
    fn test_rebuild_replaces_cells() {
        let mut grid = open_grid(3, 3);
        assert_eq!(grid.walkable_count(), 9);

        let wall = |origin: Vec3, _dir: Vec3| (origin.x - 1.0).abs() < 0.1;
        let floor = FlatGround::new(0.0);
        grid.rebuild(&floor, &wall, &floor).unwrap();

        assert_eq!(grid.walkable_count(), 6);
        assert_eq!(grid.obstacles().count(), 3);
    }
}
