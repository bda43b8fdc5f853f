//! Environment sampling interfaces consumed while building a grid
//!
//! The grid never talks to a physics engine directly. It casts rays through
//! these traits, so tests can describe a world with a couple of closures and
//! the simulation can plug in [`Physics`](crate::physics::Physics).

use glam::Vec3;

/// Opaque handle of a sampled surface, used to look up cost annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// Ground ray hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Point of intersection
    pub point: Vec3,
    /// Surface that was hit
    pub surface: SurfaceId,
}

/// Finds the ground along a ray
pub trait GroundQuery {
    fn ground(&self, origin: Vec3, direction: Vec3) -> Option<SurfaceHit>;
}

/// Reports whether anything obstructs a ray
pub trait ObstacleQuery {
    fn obstructed(&self, origin: Vec3, direction: Vec3) -> bool;
}

/// Per-surface traversal penalty
pub trait CostAnnotations {
    fn extra_cost(&self, surface: SurfaceId) -> Option<f32>;
}

impl<F> GroundQuery for F
where
    F: Fn(Vec3, Vec3) -> Option<SurfaceHit>,
{
    fn ground(&self, origin: Vec3, direction: Vec3) -> Option<SurfaceHit> {
        self(origin, direction)
    }
}

impl<F> ObstacleQuery for F
where
    F: Fn(Vec3, Vec3) -> bool,
{
    fn obstructed(&self, origin: Vec3, direction: Vec3) -> bool {
        self(origin, direction)
    }
}

impl<F> CostAnnotations for F
where
    F: Fn(SurfaceId) -> Option<f32>,
{
    fn extra_cost(&self, surface: SurfaceId) -> Option<f32> {
        self(surface)
    }
}

/// An endless, unannotated floor at a fixed height
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGround {
    pub height: f32,
}

impl FlatGround {
    #[must_use]
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl GroundQuery for FlatGround {
    fn ground(&self, origin: Vec3, direction: Vec3) -> Option<SurfaceHit> {
        // Only rays pointing down can reach a floor below their origin
        if direction.y >= 0.0 || origin.y < self.height {
            return None;
        }
        let t = (self.height - origin.y) / direction.y;
        Some(SurfaceHit {
            point: origin + direction * t,
            surface: SurfaceId(0),
        })
    }
}

impl ObstacleQuery for FlatGround {
    fn obstructed(&self, _origin: Vec3, _direction: Vec3) -> bool {
        false
    }
}

impl CostAnnotations for FlatGround {
    fn extra_cost(&self, _surface: SurfaceId) -> Option<f32> {
        None
    }
}
