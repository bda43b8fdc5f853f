//! What an agent can sense around it each tick
//!
//! Two queries: nearby agents for separation, and a forward probe for
//! avoidance. [`FlockSnapshot`] answers the first from a spatial hash of
//! agent positions captured at the start of a tick, so every agent sees the
//! same world regardless of update order.

use glam::Vec3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::AgentId;

/// Another agent seen by a neighbour query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: AgentId,
    pub position: Vec3,
}

/// "Who is near me"
pub trait FlockQuery {
    /// Agents within `radius` of `center`, never including `exclude`
    fn neighbors(&self, center: Vec3, radius: f32, exclude: AgentId) -> Vec<Neighbor>;
}

/// Forward probe hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    /// Point of intersection
    pub point: Vec3,
    /// Surface normal at the hit
    pub normal: Vec3,
    /// Distance from probe origin
    pub distance: f32,
}

/// Casts an avoidance probe on behalf of an agent
pub trait ProbeQuery {
    /// First hit along `direction` within `max_distance`, ignoring the
    /// agent's own body
    fn probe(
        &self,
        agent: AgentId,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<ProbeHit>;
}

impl<F> ProbeQuery for F
where
    F: Fn(Vec3, Vec3, f32) -> Option<ProbeHit>,
{
    fn probe(
        &self,
        _agent: AgentId,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<ProbeHit> {
        self(origin, direction, max_distance)
    }
}

/// A world with nothing to bump into
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSpace;

impl ProbeQuery for OpenSpace {
    fn probe(&self, _agent: AgentId, _origin: Vec3, _direction: Vec3, _max: f32) -> Option<ProbeHit> {
        None
    }
}

impl FlockQuery for OpenSpace {
    fn neighbors(&self, _center: Vec3, _radius: f32, _exclude: AgentId) -> Vec<Neighbor> {
        Vec::new()
    }
}

/// Spatial hash of agent positions on the XZ plane
#[derive(Debug, Clone)]
pub struct FlockSnapshot {
    bucket_size: f32,
    buckets: FxHashMap<(i32, i32), SmallVec<[Neighbor; 4]>>,
    len: usize,
}

impl FlockSnapshot {
    /// Create an empty snapshot. `bucket_size` should be about the query
    /// radius; non-positive sizes fall back to 1.
    #[must_use]
    pub fn new(bucket_size: f32) -> Self {
        let bucket_size = if bucket_size.is_finite() && bucket_size > 0.0 {
            bucket_size
        } else {
            1.0
        };
        Self {
            bucket_size,
            buckets: FxHashMap::default(),
            len: 0,
        }
    }

    /// Capture a set of agent positions
    #[must_use]
    pub fn from_agents(agents: impl IntoIterator<Item = (AgentId, Vec3)>, bucket_size: f32) -> Self {
        let mut snapshot = Self::new(bucket_size);
        for (id, position) in agents {
            snapshot.insert(id, position);
        }
        snapshot
    }

    fn bucket(&self, position: Vec3) -> (i32, i32) {
        (
            (position.x / self.bucket_size).floor() as i32,
            (position.z / self.bucket_size).floor() as i32,
        )
    }

    /// Add an agent
    pub fn insert(&mut self, id: AgentId, position: Vec3) {
        let key = self.bucket(position);
        self.buckets
            .entry(key)
            .or_default()
            .push(Neighbor { id, position });
        self.len += 1;
    }

    /// Number of agents captured
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FlockQuery for FlockSnapshot {
    fn neighbors(&self, center: Vec3, radius: f32, exclude: AgentId) -> Vec<Neighbor> {
        let mut result = Vec::new();
        if radius <= 0.0 {
            return result;
        }

        let reach = (radius / self.bucket_size).ceil() as i32;
        let (cx, cz) = self.bucket(center);
        let radius_sq = radius * radius;

        for bx in cx - reach..=cx + reach {
            for bz in cz - reach..=cz + reach {
                let Some(bucket) = self.buckets.get(&(bx, bz)) else {
                    continue;
                };
                result.extend(bucket.iter().filter(|n| {
                    n.id != exclude && n.position.distance_squared(center) <= radius_sq
                }));
            }
        }

        result
    }
}
