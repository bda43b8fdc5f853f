//! AI and navigation module
//!
//! Path-following agents, steering behaviors, goal selection and the
//! queries agents use to sense their surroundings.

mod agent;
mod goals;
mod sensing;
mod steering;

/// Agents are ECS entities
pub type AgentId = hecs::Entity;

pub use agent::{AgentContext, AgentStatus, SteeringAgent};
pub use goals::{GoalBoard, GoalMarkers, pick_goal};
pub use sensing::{FlockQuery, FlockSnapshot, Neighbor, OpenSpace, ProbeHit, ProbeQuery};
pub use steering::{
    Avoidance, Seek, Separation, SteeringBehavior, SteeringOutput, reflect,
};
