//! Simulation root
//!
//! Owns the navigation grid, the physics world, the agents and everything
//! they share, and advances all of it one tick at a time.

use std::time::Instant;

use glam::Vec3;
use hecs::World;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::config::SimulationConfig;
use super::debug::{DebugInfo, draw_grid};
use super::events::{EventQueue, NavEvent};
use crate::ai::{AgentContext, AgentId, AgentStatus, FlockSnapshot, GoalBoard, SteeringAgent};
use crate::ecs::{Name, Transform};
use crate::error::{NavError, NoPath};
use crate::nav::{NavGrid, Path, SearchTrace};
use crate::physics::Physics;

/// A running navigation simulation
pub struct Simulation {
    config: SimulationConfig,
    grid: NavGrid,
    physics: Physics,
    world: World,
    goals: GoalBoard,
    rng: ChaCha8Rng,
    /// The agent frozen for inspection
    selected: Option<AgentId>,
    events: EventQueue,
    debug: DebugInfo,
}

impl Simulation {
    /// Build the grid from `physics` and set up an empty simulation.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Configuration`] if the grid layout is invalid.
    pub fn new(config: SimulationConfig, mut physics: Physics) -> Result<Self, NavError> {
        physics.refresh_queries();
        let grid = NavGrid::build(&config.grid, &physics, &physics, &physics)?;

        let mut sim = Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            debug: DebugInfo::new(config.debug),
            config,
            grid,
            physics,
            world: World::new(),
            goals: GoalBoard::new(),
            selected: None,
            events: EventQueue::new(),
        };
        if sim.debug.enabled {
            sim.draw_grid(false);
        }

        info!("Simulation ready (seed {})", sim.config.seed);
        Ok(sim)
    }

    /// Resample the grid from the current physics scene.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Configuration`] if the grid layout is invalid. The
    /// previous grid is kept in that case.
    pub fn regenerate_grid(&mut self) -> Result<(), NavError> {
        self.physics.refresh_queries();
        self.grid
            .rebuild(&self.physics, &self.physics, &self.physics)?;

        self.events.push(NavEvent::GridRebuilt {
            width: self.grid.width(),
            height: self.grid.height(),
            obstacles: self.grid.obstacles().count(),
        });
        if self.debug.enabled {
            self.draw_grid(false);
        }
        Ok(())
    }

    /// Draw the grid into the debug lines
    pub fn draw_grid(&mut self, show_rays: bool) {
        draw_grid(&self.grid, &mut self.debug.lines, show_rays);
    }

    /// Spawn an idle agent at `position`. It picks its first goal on the
    /// next tick.
    pub fn spawn_agent(&mut self, name: impl Into<String>, position: Vec3) -> AgentId {
        let transform = Transform::from_position(position);
        let agent = SteeringAgent::new(self.config.steering, transform.forward());
        let id = self.world.spawn((Name::new(name), transform, agent));

        self.physics
            .add_agent_body(id, position, self.config.agent_radius);
        debug!("Spawned agent {id:?} at {position}");
        id
    }

    /// Remove an agent. Returns `false` if it did not exist.
    pub fn despawn_agent(&mut self, id: AgentId) -> bool {
        if self.world.despawn(id).is_err() {
            return false;
        }
        self.physics.remove_agent(id);
        if self.selected == Some(id) {
            self.select(None);
        }
        true
    }

    /// Add a goal marker under the configured goal tag
    pub fn add_goal_marker(&mut self, position: Vec3) {
        self.goals.add(self.config.goal_tag.as_str(), position);
    }

    /// Freeze `agent` for inspection, or release the current selection with
    /// `None`. At most one agent is selected at a time.
    pub fn select(&mut self, agent: Option<AgentId>) {
        if self.selected == agent {
            return;
        }
        self.selected = agent;
        self.events.push(NavEvent::SelectionChanged { agent });
        info!("Selected agent: {agent:?}");
    }

    /// Select the first agent hit by a ray. A miss clears the selection.
    pub fn select_by_ray(&mut self, origin: Vec3, direction: Vec3) -> Option<AgentId> {
        let picked = self.physics.pick_agent(origin, direction);
        self.select(picked);
        picked
    }

    /// Plan a path on the current grid
    ///
    /// # Errors
    ///
    /// Returns [`NoPath`] if no path connects the two points.
    pub fn find_path(&self, start: Vec3, goal: Vec3) -> Result<Path, NoPath> {
        crate::nav::find_path(&self.grid, start, goal)
    }

    /// Advance every agent by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        let started = Instant::now();
        self.events.swap();
        self.debug.lines.age(dt);
        if self.debug.enabled {
            // Grid markers last a single tick
            self.draw_grid(false);
        }

        let flock = FlockSnapshot::from_agents(
            self.world
                .query::<(&Transform, &SteeringAgent)>()
                .iter()
                .map(|(id, (transform, _))| (id, transform.position)),
            self.config.steering.neighbor_radius,
        );

        let mut budget = self.config.max_searches_per_tick;
        let mut outcomes = Vec::new();
        {
            let trace = if self.debug.enabled {
                Some(&mut self.debug.lines as &mut dyn SearchTrace)
            } else {
                None
            };
            let mut ctx = AgentContext {
                grid: &self.grid,
                flock: &flock,
                probe: &self.physics,
                goals: &self.goals,
                goal_tag: &self.config.goal_tag,
                rng: &mut self.rng,
                selected: self.selected,
                search_budget: &mut budget,
                trace,
            };

            for (id, (transform, agent)) in self
                .world
                .query_mut::<(&mut Transform, &mut SteeringAgent)>()
            {
                let status = agent.advance(id, transform, dt, &mut ctx);
                outcomes.push((id, *transform, status));
            }
        }

        let mut searches = 0;
        for (id, transform, status) in outcomes {
            self.physics
                .set_agent_position(id, transform.position, transform.rotation);

            match status {
                AgentStatus::PathAssigned {
                    goal,
                    waypoints,
                    expanded,
                } => {
                    searches += 1;
                    self.debug.stats.record_search(expanded, true);
                    debug!("Agent {id:?} heading to {goal} over {waypoints} waypoints");
                    self.events.push(NavEvent::PathAssigned {
                        agent: id,
                        goal,
                        waypoints,
                    });
                }
                AgentStatus::PathFailed { goal, reason } => {
                    searches += 1;
                    self.debug.stats.record_search(reason.expanded(), false);
                    debug!("Agent {id:?} has no path to {goal}: {reason}");
                    self.events.push(NavEvent::PathFailed {
                        agent: id,
                        goal,
                        reason,
                    });
                }
                AgentStatus::GoalFailed(error) => {
                    warn!("Agent {id:?} cannot pick a goal: {error}");
                    if let NavError::MissingGoals(tag) = error {
                        self.events.push(NavEvent::GoalsMissing { agent: id, tag });
                    }
                }
                AgentStatus::WaypointReached { index } => {
                    self.events
                        .push(NavEvent::WaypointReached { agent: id, index });
                }
                AgentStatus::PathCompleted => {
                    self.events.push(NavEvent::PathCompleted { agent: id });
                }
                AgentStatus::Frozen | AgentStatus::Idle | AgentStatus::Moving { .. } => {}
            }
        }

        self.physics.step(dt);
        self.debug.stats.record_tick(started.elapsed(), searches);
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &NavGrid {
        &self.grid
    }

    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    /// Mutable physics access. Call [`Simulation::regenerate_grid`] after
    /// changing static geometry.
    pub fn physics_mut(&mut self) -> &mut Physics {
        &mut self.physics
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn goals(&self) -> &GoalBoard {
        &self.goals
    }

    pub fn goals_mut(&mut self) -> &mut GoalBoard {
        &mut self.goals
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn debug(&self) -> &DebugInfo {
        &self.debug
    }

    pub fn debug_mut(&mut self) -> &mut DebugInfo {
        &mut self.debug
    }

    pub fn selected(&self) -> Option<AgentId> {
        self.selected
    }

    /// Current transform of an agent
    pub fn transform(&self, id: AgentId) -> Option<Transform> {
        self.world.get::<&Transform>(id).ok().map(|t| *t)
    }

    pub fn agent_count(&self) -> usize {
        self.world.query::<&SteeringAgent>().iter().count()
    }
}
