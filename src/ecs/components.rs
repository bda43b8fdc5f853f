//! Common ECS components

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Transform component for position and facing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in world space
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
}

impl Transform {
    /// Create a new transform at the origin
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Get the forward direction (negative Z in local space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Get the right direction (positive X in local space)
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Translate by a delta
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Upright rotation whose forward points along `direction` on the XZ
    /// plane. `None` if the direction has no horizontal part.
    pub fn facing(direction: Vec3) -> Option<Quat> {
        if direction.x == 0.0 && direction.z == 0.0 {
            return None;
        }
        Some(Quat::from_rotation_y(f32::atan2(-direction.x, -direction.z)))
    }

    /// Turn toward `direction` by interpolation factor `t`, clamped to 0..=1
    pub fn turn_towards(&mut self, direction: Vec3, t: f32) {
        if let Some(target) = Self::facing(direction) {
            self.rotation = self.rotation.slerp(target, t.clamp(0.0, 1.0));
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Name component for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}
