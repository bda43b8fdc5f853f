//! Physics simulation module
//!
//! Built on top of rapier3d

mod world;

pub use world::{
    AGENT_GROUP, ColliderHandle, GROUND_GROUP, OBSTACLE_GROUP, Physics, RaycastHit,
    RigidBodyHandle,
};
