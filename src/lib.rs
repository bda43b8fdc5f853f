//! Grid navigation and multi-agent steering
//!
//! This crate provides:
//! - A navigation grid sampled from the environment with ray casts
//! - A* pathfinding over that grid
//! - Path-following agents with separation and obstacle avoidance
//! - A headless simulation driving agents stored in a hecs world, with
//!   rapier3d answering the ray queries

pub mod ai;
pub mod core;
pub mod ecs;
pub mod error;
pub mod nav;
pub mod physics;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::ai::{AgentId, AgentStatus, FlockQuery, GoalMarkers, ProbeQuery, SteeringAgent};
    pub use crate::core::{
        DebugInfo, EventQueue, GridConfig, NavEvent, Simulation, SimulationConfig, SteeringConfig,
        TickStats,
    };
    pub use crate::ecs::{Name, Transform};
    pub use crate::error::{NavError, NoPath};
    pub use crate::nav::{GridCoord, NavGrid, NavNode, Path, find_path};
    pub use crate::physics::Physics;
    pub use glam::{Quat, Vec3};
}
