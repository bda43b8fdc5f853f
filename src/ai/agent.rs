//! Path-following agents
//!
//! An agent walks its current path one waypoint at a time. Each tick it
//! seeks the next waypoint, pushes away from crowding neighbours, turns away
//! from whatever its forward probe hits, then integrates its velocity. Once
//! the path is used up the agent is idle and asks for a new goal.

use glam::Vec3;
use rand_chacha::ChaCha8Rng;

use super::AgentId;
use super::goals::{GoalMarkers, pick_goal};
use super::sensing::{FlockQuery, ProbeQuery};
use super::steering::{Avoidance, Seek, Separation, SteeringBehavior};
use crate::core::SteeringConfig;
use crate::ecs::Transform;
use crate::error::{NavError, NoPath};
use crate::nav::{NavGrid, SearchTrace, find_path, find_path_traced};

/// Everything an agent borrows from the simulation for one tick
pub struct AgentContext<'a> {
    pub grid: &'a NavGrid,
    pub flock: &'a dyn FlockQuery,
    pub probe: &'a dyn ProbeQuery,
    pub goals: &'a dyn GoalMarkers,
    /// Tag of the markers new goals are drawn from
    pub goal_tag: &'a str,
    pub rng: &'a mut ChaCha8Rng,
    /// The agent frozen by selection, if any
    pub selected: Option<AgentId>,
    /// Path searches still allowed this tick
    pub search_budget: &'a mut usize,
    /// Receives search progress when debugging
    pub trace: Option<&'a mut dyn SearchTrace>,
}

/// What happened to an agent during one tick
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStatus {
    /// Selected, nothing was updated
    Frozen,
    /// Idle and waiting for the retry delay or the search budget
    Idle,
    /// Walking toward waypoint `cursor`
    Moving { cursor: usize },
    /// Reached waypoint `index` and moved on to the next
    WaypointReached { index: usize },
    /// Reached the last waypoint
    PathCompleted,
    /// Picked a goal and got a path to it
    PathAssigned {
        goal: Vec3,
        waypoints: usize,
        expanded: usize,
    },
    /// Picked a goal but no path leads there
    PathFailed { goal: Vec3, reason: NoPath },
    /// There was no goal to pick
    GoalFailed(NavError),
}

/// Per-agent motion state
#[derive(Debug, Clone)]
pub struct SteeringAgent {
    /// Current velocity
    pub velocity: Vec3,
    config: SteeringConfig,
    path: Option<Vec<Vec3>>,
    /// Index of the next unvisited waypoint
    cursor: usize,
    /// Seconds left before an idle agent may try another goal
    retry_timer: f32,
}

impl SteeringAgent {
    /// Create an agent already moving along `forward` at full speed
    #[must_use]
    pub fn new(config: SteeringConfig, forward: Vec3) -> Self {
        Self {
            velocity: forward.normalize_or_zero() * config.max_speed,
            config,
            path: None,
            cursor: 0,
            retry_timer: 0.0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SteeringConfig {
        &self.config
    }

    /// Replace the current path and start from its first waypoint
    pub fn set_path(&mut self, waypoints: Vec<Vec3>) {
        self.path = Some(waypoints);
        self.cursor = 0;
    }

    /// Drop the current path
    pub fn clear_path(&mut self) {
        self.path = None;
        self.cursor = 0;
    }

    #[must_use]
    pub fn path(&self) -> Option<&[Vec3]> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The waypoint currently being walked to
    #[must_use]
    pub fn current_waypoint(&self) -> Option<Vec3> {
        self.path.as_ref()?.get(self.cursor).copied()
    }

    /// No waypoints left to walk
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.current_waypoint().is_none()
    }

    /// Advance the agent by one tick of `dt` seconds.
    pub fn advance(
        &mut self,
        id: AgentId,
        transform: &mut Transform,
        dt: f32,
        ctx: &mut AgentContext<'_>,
    ) -> AgentStatus {
        if ctx.selected == Some(id) {
            return AgentStatus::Frozen;
        }

        self.retry_timer = (self.retry_timer - dt).max(0.0);

        let Some(waypoint) = self.current_waypoint() else {
            return self.request_goal(transform.position, ctx);
        };

        let position = transform.position;
        let target = Vec3::new(waypoint.x, position.y, waypoint.z);
        let max_speed = self.config.max_speed;

        // Path following
        self.velocity = Seek::new(target, max_speed, self.config.max_steer_force)
            .calculate(position, self.velocity)
            .apply(self.velocity, max_speed);

        // Separation
        let neighbors: Vec<Vec3> = ctx
            .flock
            .neighbors(position, self.config.neighbor_radius, id)
            .into_iter()
            .map(|n| n.position)
            .collect();
        self.velocity = Separation::new(
            &neighbors,
            self.config.separation_distance,
            self.config.separation_weight,
        )
        .calculate(position, self.velocity)
        .apply(self.velocity, max_speed);

        // Avoidance
        let forward = transform.forward();
        if let Some(hit) = ctx
            .probe
            .probe(id, position, forward, self.config.avoid_distance)
        {
            self.velocity = Avoidance::new(forward, hit.normal, max_speed, self.config.avoid_strength)
                .calculate(position, self.velocity)
                .apply(self.velocity, max_speed);
        }

        transform.translate(self.velocity * dt);
        if self.velocity != Vec3::ZERO {
            transform.turn_towards(self.velocity, dt * max_speed);
        }

        // Long ticks can step clean over the arrival circle, so test the
        // whole segment swept this tick
        if distance_to_segment(target, position, transform.position) < self.config.arrival_radius {
            let index = self.cursor;
            self.cursor += 1;
            if self.is_idle() {
                AgentStatus::PathCompleted
            } else {
                AgentStatus::WaypointReached { index }
            }
        } else {
            AgentStatus::Moving {
                cursor: self.cursor,
            }
        }
    }

    /// Pick a random goal and plan a path to it. No motion happens on the
    /// tick this runs.
    fn request_goal(&mut self, position: Vec3, ctx: &mut AgentContext<'_>) -> AgentStatus {
        if self.retry_timer > 0.0 || *ctx.search_budget == 0 {
            return AgentStatus::Idle;
        }

        let Some(goal) = pick_goal(ctx.goals.goal_markers(ctx.goal_tag), &mut *ctx.rng) else {
            self.retry_timer = self.config.goal_retry_delay;
            return AgentStatus::GoalFailed(NavError::MissingGoals(ctx.goal_tag.to_string()));
        };

        *ctx.search_budget -= 1;
        let result = match ctx.trace.as_deref_mut() {
            Some(trace) => find_path_traced(ctx.grid, position, goal, trace),
            None => find_path(ctx.grid, position, goal),
        };

        match result {
            Ok(path) => {
                let waypoints = path.len();
                let expanded = path.expanded;
                self.set_path(path.waypoints);
                AgentStatus::PathAssigned {
                    goal,
                    waypoints,
                    expanded,
                }
            }
            Err(reason) => {
                self.clear_path();
                self.retry_timer = self.config.goal_retry_delay;
                AgentStatus::PathFailed { goal, reason }
            }
        }
    }
}

/// Distance from `point` to the segment `[from, to]`
fn distance_to_segment(point: Vec3, from: Vec3, to: Vec3) -> f32 {
    let along = to - from;
    let length_sq = along.length_squared();
    if length_sq <= f32::EPSILON {
        return point.distance(from);
    }
    let t = ((point - from).dot(along) / length_sq).clamp(0.0, 1.0);
    point.distance(from + along * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::goals::GoalBoard;
    use crate::ai::sensing::{FlockSnapshot, OpenSpace, ProbeHit};
    use crate::core::GridConfig;
    use crate::nav::{FlatGround, GridCoord};
    use rand::SeedableRng;

    struct Fixture {
        grid: NavGrid,
        goals: GoalBoard,
        rng: ChaCha8Rng,
        budget: usize,
    }

    impl Fixture {
        fn new(goals: &[Vec3]) -> Self {
            let floor = FlatGround::new(0.0);
            let grid = NavGrid::build(
                &GridConfig::new(Vec3::ZERO, 10, 10, 1.0),
                &floor,
                &floor,
                &floor,
            )
            .unwrap();
            let mut board = GoalBoard::new();
            for goal in goals {
                board.add("Waypoint", *goal);
            }
            Self {
                grid,
                goals: board,
                rng: ChaCha8Rng::seed_from_u64(1),
                budget: 100,
            }
        }

        fn context<'a>(
            &'a mut self,
            flock: &'a dyn FlockQuery,
            probe: &'a dyn ProbeQuery,
            selected: Option<AgentId>,
        ) -> AgentContext<'a> {
            AgentContext {
                grid: &self.grid,
                flock,
                probe,
                goals: &self.goals,
                goal_tag: "Waypoint",
                rng: &mut self.rng,
                selected,
                search_budget: &mut self.budget,
                trace: None,
            }
        }
    }

    fn ids(count: usize) -> Vec<AgentId> {
        let mut world = hecs::World::new();
        (0..count).map(|_| world.spawn(())).collect()
    }

    fn run_until_complete(
        agent: &mut SteeringAgent,
        id: AgentId,
        transform: &mut Transform,
        ctx: &mut AgentContext<'_>,
    ) -> bool {
        for _ in 0..2000 {
            if agent.advance(id, transform, 1.0 / 60.0, ctx) == AgentStatus::PathCompleted {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_idle_tick_only_selects_goal() {
        let mut fixture = Fixture::new(&[Vec3::new(5.0, 0.0, 5.0)]);
        let id = ids(1)[0];
        let mut agent = SteeringAgent::new(SteeringConfig::default(), Vec3::NEG_Z);
        let mut transform = Transform::from_position(Vec3::new(1.0, 0.5, 1.0));
        let velocity_before = agent.velocity;

        let mut ctx = fixture.context(&OpenSpace, &OpenSpace, None);
        let status = agent.advance(id, &mut transform, 0.1, &mut ctx);

        assert!(matches!(status, AgentStatus::PathAssigned { waypoints: 5, .. }));
        assert_eq!(transform.position, Vec3::new(1.0, 0.5, 1.0));
        assert_eq!(agent.velocity, velocity_before);
        assert_eq!(agent.cursor(), 0);
        assert_eq!(agent.path().map(<[Vec3]>::len), Some(5));
    }

    #[test]
    fn test_walks_path_to_goal() {
        let goal = Vec3::new(6.0, 0.0, 3.0);
        let mut fixture = Fixture::new(&[goal]);
        let id = ids(1)[0];
        let mut agent = SteeringAgent::new(SteeringConfig::default(), Vec3::NEG_Z);
        let mut transform = Transform::from_position(Vec3::new(1.0, 0.0, 1.0));

        let mut ctx = fixture.context(&OpenSpace, &OpenSpace, None);
        assert!(run_until_complete(&mut agent, id, &mut transform, &mut ctx));

        assert!(agent.is_idle());
        assert!(transform.position.distance(goal) < 0.1);
        assert_eq!(ctx.grid.world_to_cell(transform.position), GridCoord::new(6, 3));
    }

    #[test]
    fn test_coarse_ticks_still_reach_waypoints() {
        let id = ids(1)[0];
        for dt in [1.0 / 60.0, 1.0 / 30.0, 0.05, 0.1, 0.25] {
            let mut fixture = Fixture::new(&[]);
            let mut agent = SteeringAgent::new(SteeringConfig::default(), Vec3::NEG_Z);
            agent.set_path(vec![Vec3::new(2.0, 0.0, 1.0)]);
            let mut transform = Transform::from_position(Vec3::ZERO);

            let mut ctx = fixture.context(&OpenSpace, &OpenSpace, None);
            let completed = (0..1000)
                .any(|_| agent.advance(id, &mut transform, dt, &mut ctx) == AgentStatus::PathCompleted);

            assert!(completed, "dt {dt}: stuck at {}", transform.position);
            assert!(agent.is_idle());
        }
    }

    #[test]
    fn test_coarse_ticks_walk_diagonal_path() {
        let goal = Vec3::new(7.0, 0.0, 4.0);
        let mut fixture = Fixture::new(&[goal]);
        let id = ids(1)[0];
        let mut agent = SteeringAgent::new(SteeringConfig::default(), Vec3::NEG_Z);
        let mut transform = Transform::from_position(Vec3::new(1.0, 0.0, 1.0));

        let mut ctx = fixture.context(&OpenSpace, &OpenSpace, None);
        let mut reached = Vec::new();
        let mut completed = false;
        for _ in 0..1000 {
            match agent.advance(id, &mut transform, 0.1, &mut ctx) {
                AgentStatus::WaypointReached { index } => reached.push(index),
                AgentStatus::PathCompleted => {
                    completed = true;
                    break;
                }
                _ => {}
            }
        }

        assert!(completed, "stuck at {}", transform.position);
        // Every intermediate waypoint is visited in order
        let waypoints = agent.path().map_or(0, <[Vec3]>::len);
        assert_eq!(reached, (0..waypoints - 1).collect::<Vec<_>>());
    }

    #[test]
    fn test_distance_to_segment() {
        let from = Vec3::ZERO;
        let to = Vec3::new(2.0, 0.0, 0.0);
        assert!((distance_to_segment(Vec3::new(1.0, 0.0, 0.05), from, to) - 0.05).abs() < 1e-6);
        assert!((distance_to_segment(Vec3::new(3.0, 0.0, 0.0), from, to) - 1.0).abs() < 1e-6);
        assert!((distance_to_segment(Vec3::new(-1.0, 0.0, 0.0), from, to) - 1.0).abs() < 1e-6);
        assert!((distance_to_segment(Vec3::Z, from, from) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_speed_never_exceeds_cap() {
        let mut fixture = Fixture::new(&[Vec3::new(9.0, 0.0, 9.0)]);
        let agent_ids = ids(2);
        let mut agent = SteeringAgent::new(SteeringConfig::default(), Vec3::X);
        let mut transform = Transform::from_position(Vec3::ZERO);
        let crowd = FlockSnapshot::from_agents([(agent_ids[1], Vec3::new(0.2, 0.0, 0.2))], 5.0);

        let mut ctx = fixture.context(&crowd, &OpenSpace, None);
        for _ in 0..120 {
            agent.advance(agent_ids[0], &mut transform, 1.0 / 60.0, &mut ctx);
            assert!(agent.velocity.length() <= agent.config().max_speed + 1e-4);
        }
    }

    #[test]
    fn test_separation_pushes_away_from_neighbor() {
        let mut fixture = Fixture::new(&[]);
        let agent_ids = ids(2);
        let config = SteeringConfig::default();
        let mut agent = SteeringAgent::new(config, Vec3::NEG_Z);
        agent.velocity = Vec3::ZERO;
        // Waypoint straight ahead along +X
        agent.set_path(vec![Vec3::new(5.0, 0.0, 0.0)]);
        let mut transform = Transform::from_position(Vec3::ZERO);

        let alone = {
            let mut a = agent.clone();
            let mut t = transform;
            let mut ctx = fixture.context(&OpenSpace, &OpenSpace, None);
            a.advance(agent_ids[0], &mut t, 0.1, &mut ctx);
            a.velocity
        };

        let crowd = FlockSnapshot::from_agents([(agent_ids[1], Vec3::new(0.0, 0.0, 0.5))], 5.0);
        let mut ctx = fixture.context(&crowd, &OpenSpace, None);
        agent.advance(agent_ids[0], &mut transform, 0.1, &mut ctx);

        // The neighbour sits on +Z, so the agent drifts toward -Z
        assert!(agent.velocity.z < alone.z - 0.5);
    }

    #[test]
    fn test_avoidance_turns_away_from_probe_hit() {
        let mut fixture = Fixture::new(&[]);
        let id = ids(1)[0];
        let config = SteeringConfig {
            max_steer_force: 0.0,
            ..SteeringConfig::default()
        };
        // Facing -Z (identity) and moving that way
        let mut agent = SteeringAgent::new(config, Vec3::NEG_Z);
        agent.set_path(vec![Vec3::new(0.0, 0.0, -9.0)]);
        let mut transform = Transform::from_position(Vec3::ZERO);

        let wall = |origin: Vec3, direction: Vec3, max: f32| {
            (direction.z < 0.0 && max >= 0.5).then_some(ProbeHit {
                point: origin + Vec3::new(0.0, 0.0, -0.5),
                normal: Vec3::Z,
                distance: 0.5,
            })
        };
        let mut ctx = fixture.context(&OpenSpace, &wall, None);
        agent.advance(id, &mut transform, 0.1, &mut ctx);

        assert!(agent.velocity.z > 0.0, "velocity {}", agent.velocity);
        assert!(transform.position.z > 0.0);
    }

    #[test]
    fn test_selected_agent_is_frozen() {
        let mut fixture = Fixture::new(&[Vec3::new(5.0, 0.0, 5.0)]);
        let id = ids(1)[0];
        let mut agent = SteeringAgent::new(SteeringConfig::default(), Vec3::NEG_Z);
        agent.set_path(vec![Vec3::new(3.0, 0.0, 0.0)]);
        let mut transform = Transform::from_position(Vec3::ZERO);

        let mut ctx = fixture.context(&OpenSpace, &OpenSpace, Some(id));
        for _ in 0..10 {
            assert_eq!(agent.advance(id, &mut transform, 0.1, &mut ctx), AgentStatus::Frozen);
        }
        assert_eq!(transform.position, Vec3::ZERO);
        assert_eq!(agent.cursor(), 0);
    }

    #[test]
    fn test_missing_goals_back_off() {
        let mut fixture = Fixture::new(&[]);
        let id = ids(1)[0];
        let mut agent = SteeringAgent::new(SteeringConfig::default(), Vec3::NEG_Z);
        let mut transform = Transform::from_position(Vec3::ZERO);

        let mut ctx = fixture.context(&OpenSpace, &OpenSpace, None);
        let status = agent.advance(id, &mut transform, 0.1, &mut ctx);
        assert_eq!(
            status,
            AgentStatus::GoalFailed(NavError::MissingGoals("Waypoint".to_string()))
        );

        // Waits out the retry delay before trying again
        assert_eq!(agent.advance(id, &mut transform, 0.5, &mut ctx), AgentStatus::Idle);
        assert!(matches!(
            agent.advance(id, &mut transform, 0.6, &mut ctx),
            AgentStatus::GoalFailed(_)
        ));
    }

    #[test]
    fn test_unreachable_goal_leaves_agent_idle() {
        let mut fixture = Fixture::new(&[Vec3::new(50.0, 0.0, 50.0)]);
        let id = ids(1)[0];
        let mut agent = SteeringAgent::new(SteeringConfig::default(), Vec3::NEG_Z);
        let mut transform = Transform::from_position(Vec3::ZERO);

        let mut ctx = fixture.context(&OpenSpace, &OpenSpace, None);
        let status = agent.advance(id, &mut transform, 0.1, &mut ctx);
        assert!(matches!(
            status,
            AgentStatus::PathFailed {
                reason: NoPath::OutOfBounds(_),
                ..
            }
        ));
        assert!(agent.is_idle());
        assert!(agent.path().is_none());
        assert_eq!(agent.advance(id, &mut transform, 0.1, &mut ctx), AgentStatus::Idle);
    }

    #[test]
    fn test_search_budget_defers_goal_selection() {
        let mut fixture = Fixture::new(&[Vec3::new(5.0, 0.0, 5.0)]);
        fixture.budget = 0;
        let id = ids(1)[0];
        let mut agent = SteeringAgent::new(SteeringConfig::default(), Vec3::NEG_Z);
        let mut transform = Transform::from_position(Vec3::ZERO);

        let mut ctx = fixture.context(&OpenSpace, &OpenSpace, None);
        assert_eq!(agent.advance(id, &mut transform, 0.1, &mut ctx), AgentStatus::Idle);
        assert!(agent.path().is_none());
    }

    #[test]
    fn test_new_path_resets_cursor() {
        let mut agent = SteeringAgent::new(SteeringConfig::default(), Vec3::X);
        agent.set_path(vec![Vec3::ZERO, Vec3::X]);
        agent.cursor = 1;

        agent.set_path(vec![Vec3::Z]);
        assert_eq!(agent.cursor(), 0);
        assert_eq!(agent.current_waypoint(), Some(Vec3::Z));
    }
}
