//! Physics world using rapier3d
//!
//! Holds the static environment (ground slabs, obstacles) and one kinematic
//! body per agent, and answers the ray queries the navigation grid and the
//! agents need.

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;
use rustc_hash::FxHashMap;

use crate::ai::{AgentId, ProbeHit, ProbeQuery};
use crate::nav::{CostAnnotations, GroundQuery, ObstacleQuery, SurfaceHit, SurfaceId};

/// Collision group of walkable ground
pub const GROUND_GROUP: Group = Group::GROUP_1;
/// Collision group of static obstacles
pub const OBSTACLE_GROUP: Group = Group::GROUP_2;
/// Collision group of agent bodies
pub const AGENT_GROUP: Group = Group::GROUP_3;

/// Handle to a rigid body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyHandle(pub rapier3d::dynamics::RigidBodyHandle);

/// Handle to a collider in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub rapier3d::geometry::ColliderHandle);

impl ColliderHandle {
    /// The surface id ground hits on this collider report
    #[must_use]
    pub fn surface_id(self) -> SurfaceId {
        let (index, generation) = self.0.into_raw_parts();
        SurfaceId((u64::from(generation) << 32) | u64::from(index))
    }

    fn from_surface_id(surface: SurfaceId) -> Self {
        let index = (surface.0 & u64::from(u32::MAX)) as u32;
        let generation = (surface.0 >> 32) as u32;
        Self(rapier3d::geometry::ColliderHandle::from_raw_parts(index, generation))
    }
}

/// Body and collider of one agent
#[derive(Debug, Clone, Copy)]
struct AgentBody {
    body: RigidBodyHandle,
    collider: ColliderHandle,
}

/// Convert glam Quat to rapier3d UnitQuaternion
fn quat_to_rapier(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

/// Convert rapier3d UnitQuaternion to glam Quat
fn rapier_to_quat(uq: &UnitQuaternion<f32>) -> Quat {
    let q = uq.quaternion();
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

fn to_vector(v: Vec3) -> Vector<f32> {
    vector![v.x, v.y, v.z]
}

fn to_ray(origin: Vec3, direction: Vec3) -> Ray {
    let direction = direction.normalize_or_zero();
    Ray::new(point![origin.x, origin.y, origin.z], to_vector(direction))
}

/// Query filter matching colliders that belong to any of `groups`
fn group_filter(groups: Group) -> QueryFilter<'static> {
    QueryFilter::new().groups(InteractionGroups::new(Group::ALL, groups))
}

/// Physics world manager
pub struct Physics {
    /// Gravity vector
    pub gravity: Vec3,
    /// Physics pipeline
    pipeline: PhysicsPipeline,
    /// Island manager
    island_manager: IslandManager,
    /// Broad phase
    broad_phase: DefaultBroadPhase,
    /// Narrow phase
    narrow_phase: NarrowPhase,
    /// Rigid body set
    rigid_body_set: RigidBodySet,
    /// Collider set
    collider_set: ColliderSet,
    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,
    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,
    /// CCD solver
    ccd_solver: CCDSolver,
    /// Query pipeline for raycasting
    query_pipeline: QueryPipeline,
    /// Integration parameters
    integration_parameters: IntegrationParameters,
    /// Traversal penalties of annotated ground colliders
    surface_costs: FxHashMap<rapier3d::geometry::ColliderHandle, f32>,
    /// Kinematic bodies of agents
    agents: FxHashMap<AgentId, AgentBody>,
}

impl Physics {
    /// Create a new physics world with default gravity
    pub fn new() -> Self {
        Self::with_gravity(Vec3::new(0.0, -9.81, 0.0))
    }

    /// Create a new physics world with custom gravity
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            surface_costs: FxHashMap::default(),
            agents: FxHashMap::default(),
        }
    }

    /// Step the physics simulation
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        self.pipeline.step(
            &to_vector(self.gravity),
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Make colliders added since the last step visible to ray queries
    pub fn refresh_queries(&mut self) {
        self.step(self.integration_parameters.dt);
    }

    /// Create a static rigid body (doesn't move)
    fn create_static_body(&mut self, position: Vec3, rotation: Quat) -> RigidBodyHandle {
        let isometry = Isometry::from_parts(
            Translation3::new(position.x, position.y, position.z),
            quat_to_rapier(rotation),
        );
        let body = RigidBodyBuilder::fixed().position(isometry).build();

        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    /// Create a kinematic rigid body (controlled directly)
    fn create_kinematic_body(&mut self, position: Vec3, rotation: Quat) -> RigidBodyHandle {
        let isometry = Isometry::from_parts(
            Translation3::new(position.x, position.y, position.z),
            quat_to_rapier(rotation),
        );
        let body = RigidBodyBuilder::kinematic_position_based()
            .position(isometry)
            .build();

        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    fn attach(&mut self, body: RigidBodyHandle, collider: Collider) -> ColliderHandle {
        ColliderHandle(self.collider_set.insert_with_parent(
            collider,
            body.0,
            &mut self.rigid_body_set,
        ))
    }

    /// Add a box of walkable ground. `extra_cost` annotates the surface
    /// with a traversal penalty; unannotated ground gets the grid default.
    pub fn add_ground(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        extra_cost: Option<f32>,
    ) -> ColliderHandle {
        let body = self.create_static_body(center, Quat::IDENTITY);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .collision_groups(InteractionGroups::new(GROUND_GROUP, Group::ALL))
            .build();
        let handle = self.attach(body, collider);

        if let Some(cost) = extra_cost {
            self.surface_costs.insert(handle.0, cost);
        }
        handle
    }

    /// Add a static obstacle box
    pub fn add_obstacle(&mut self, center: Vec3, half_extents: Vec3) -> ColliderHandle {
        let body = self.create_static_body(center, Quat::IDENTITY);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .collision_groups(InteractionGroups::new(OBSTACLE_GROUP, Group::ALL))
            .build();
        self.attach(body, collider)
    }

    /// Give an agent a kinematic ball body, replacing any previous one
    pub fn add_agent_body(&mut self, agent: AgentId, position: Vec3, radius: f32) -> ColliderHandle {
        self.remove_agent(agent);

        let body = self.create_kinematic_body(position, Quat::IDENTITY);
        let collider = ColliderBuilder::ball(radius)
            .collision_groups(InteractionGroups::new(AGENT_GROUP, Group::ALL))
            .build();
        let collider = self.attach(body, collider);

        self.agents.insert(agent, AgentBody { body, collider });
        collider
    }

    /// Move an agent body to `position` on the next step
    pub fn set_agent_position(&mut self, agent: AgentId, position: Vec3, rotation: Quat) {
        let Some(handles) = self.agents.get(&agent) else {
            return;
        };
        if let Some(rb) = self.rigid_body_set.get_mut(handles.body.0) {
            rb.set_next_kinematic_translation(to_vector(position));
            rb.set_next_kinematic_rotation(quat_to_rapier(rotation));
        }
    }

    /// Remove an agent body, if it has one
    pub fn remove_agent(&mut self, agent: AgentId) {
        if let Some(handles) = self.agents.remove(&agent) {
            self.remove_body(handles.body);
        }
    }

    /// Collider of an agent's body
    pub fn agent_collider(&self, agent: AgentId) -> Option<ColliderHandle> {
        self.agents.get(&agent).map(|handles| handles.collider)
    }

    /// Agent whose body is hit first along a ray
    pub fn pick_agent(&self, origin: Vec3, direction: Vec3) -> Option<AgentId> {
        let hit = self.raycast(origin, direction, f32::MAX, AGENT_GROUP)?;
        self.agents
            .iter()
            .find(|(_, handles)| handles.collider == hit.collider)
            .map(|(agent, _)| *agent)
    }

    /// Number of agent bodies
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Get the position of a rigid body
    pub fn get_position(&self, body: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(body.0).map(|rb| {
            let pos = rb.translation();
            Vec3::new(pos.x, pos.y, pos.z)
        })
    }

    /// Get the rotation of a rigid body
    pub fn get_rotation(&self, body: RigidBodyHandle) -> Option<Quat> {
        self.rigid_body_set
            .get(body.0)
            .map(|rb| rapier_to_quat(rb.rotation()))
    }

    /// Position of an agent's body
    pub fn agent_position(&self, agent: AgentId) -> Option<Vec3> {
        self.get_position(self.agents.get(&agent)?.body)
    }

    /// Rotation of an agent's body
    pub fn agent_rotation(&self, agent: AgentId) -> Option<Quat> {
        self.get_rotation(self.agents.get(&agent)?.body)
    }

    /// Cast a ray and return the first hit on a collider in `groups`
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        groups: Group,
    ) -> Option<RaycastHit> {
        self.raycast_filtered(origin, direction, max_distance, group_filter(groups))
    }

    fn raycast_filtered(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<RaycastHit> {
        let ray = to_ray(origin, direction);

        self.query_pipeline
            .cast_ray_and_get_normal(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                filter,
            )
            .map(|(handle, intersection)| {
                let point = ray.point_at(intersection.time_of_impact);
                let normal = intersection.normal;
                RaycastHit {
                    collider: ColliderHandle(handle),
                    point: Vec3::new(point.x, point.y, point.z),
                    normal: Vec3::new(normal.x, normal.y, normal.z),
                    distance: intersection.time_of_impact,
                }
            })
    }

    /// Remove a rigid body and its colliders
    fn remove_body(&mut self, body: RigidBodyHandle) {
        if let Some(removed) = self.rigid_body_set.remove(
            body.0,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        ) {
            for collider in removed.colliders() {
                self.surface_costs.remove(collider);
            }
        }
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}

impl GroundQuery for Physics {
    fn ground(&self, origin: Vec3, direction: Vec3) -> Option<SurfaceHit> {
        let ray = to_ray(origin, direction);
        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                f32::MAX,
                true,
                group_filter(GROUND_GROUP),
            )
            .map(|(handle, distance)| {
                let point = ray.point_at(distance);
                SurfaceHit {
                    point: Vec3::new(point.x, point.y, point.z),
                    surface: ColliderHandle(handle).surface_id(),
                }
            })
    }
}

impl ObstacleQuery for Physics {
    fn obstructed(&self, origin: Vec3, direction: Vec3) -> bool {
        let ray = to_ray(origin, direction);
        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                f32::MAX,
                true,
                group_filter(OBSTACLE_GROUP),
            )
            .is_some()
    }
}

impl CostAnnotations for Physics {
    fn extra_cost(&self, surface: SurfaceId) -> Option<f32> {
        let handle = ColliderHandle::from_surface_id(surface);
        self.surface_costs.get(&handle.0).copied()
    }
}

impl ProbeQuery for Physics {
    fn probe(
        &self,
        agent: AgentId,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<ProbeHit> {
        let mut filter = group_filter(OBSTACLE_GROUP | AGENT_GROUP);
        if let Some(own) = self.agent_collider(agent) {
            filter = filter.exclude_collider(own.0);
        }

        self.raycast_filtered(origin, direction, max_distance, filter)
            .map(|hit| ProbeHit {
                point: hit.point,
                normal: hit.normal,
                distance: hit.distance,
            })
    }
}

/// Result of a raycast
#[derive(Debug, Clone)]
pub struct RaycastHit {
    /// The collider that was hit
    pub collider: ColliderHandle,
    /// The point of intersection
    pub point: Vec3,
    /// Surface normal at the hit
    pub normal: Vec3,
    /// Distance from ray origin
    pub distance: f32,
}
