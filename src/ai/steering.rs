//! Steering behaviors for agent movement
//!
//! Every behavior produces a velocity change. The agent adds the changes one
//! after another, clamping the running velocity to its speed cap after each.

use glam::Vec3;

/// Output from a steering behavior
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringOutput {
    /// Velocity change
    pub linear: Vec3,
}

impl SteeringOutput {
    /// Zero steering
    pub const ZERO: Self = Self { linear: Vec3::ZERO };

    /// Add this change to `velocity` and clamp to `max_speed`
    #[must_use]
    pub fn apply(self, velocity: Vec3, max_speed: f32) -> Vec3 {
        (velocity + self.linear).clamp_length_max(max_speed)
    }
}

/// Trait for steering behaviors
pub trait SteeringBehavior {
    /// Calculate steering based on agent state
    fn calculate(&self, position: Vec3, velocity: Vec3) -> SteeringOutput;
}

/// Steer so that velocity turns toward `desired`, changing by at most
/// `max_force`
fn steer_towards(desired: Vec3, velocity: Vec3, max_force: f32) -> SteeringOutput {
    SteeringOutput {
        linear: (desired - velocity).clamp_length_max(max_force),
    }
}

/// Mirror `direction` about a surface with the given normal
#[must_use]
pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Seek behavior - head for a target at full speed
#[derive(Debug, Clone)]
pub struct Seek {
    /// Target position
    pub target: Vec3,
    /// Maximum speed
    pub max_speed: f32,
    /// Maximum velocity change per tick
    pub max_force: f32,
}

impl Seek {
    /// Create a new seek behavior
    #[must_use]
    pub fn new(target: Vec3, max_speed: f32, max_force: f32) -> Self {
        Self {
            target,
            max_speed,
            max_force,
        }
    }
}

impl SteeringBehavior for Seek {
    fn calculate(&self, position: Vec3, velocity: Vec3) -> SteeringOutput {
        let desired = (self.target - position).normalize_or_zero() * self.max_speed;
        steer_towards(desired, velocity, self.max_force)
    }
}

/// Separation behavior - push away from crowding neighbours.
///
/// Neighbours closer than `distance` repel with a strength inversely
/// proportional to their distance. The sum is averaged over every neighbour
/// given, including those too far away to repel.
#[derive(Debug, Clone)]
pub struct Separation<'a> {
    /// Positions of nearby agents, excluding the agent itself
    pub neighbors: &'a [Vec3],
    /// Repulsion range
    pub distance: f32,
    /// Scale of the averaged repulsion
    pub weight: f32,
}

impl<'a> Separation<'a> {
    /// Create a new separation behavior
    #[must_use]
    pub fn new(neighbors: &'a [Vec3], distance: f32, weight: f32) -> Self {
        Self {
            neighbors,
            distance,
            weight,
        }
    }
}

impl SteeringBehavior for Separation<'_> {
    fn calculate(&self, position: Vec3, _velocity: Vec3) -> SteeringOutput {
        if self.neighbors.is_empty() {
            return SteeringOutput::ZERO;
        }

        let mut push = Vec3::ZERO;
        for &neighbor in self.neighbors {
            let offset = neighbor - position;
            let distance = offset.length();
            // Coincident agents have no direction to push along
            if distance < self.distance && distance > f32::EPSILON {
                push -= offset / distance / distance;
            }
        }

        SteeringOutput {
            linear: push / self.neighbors.len() as f32 * self.weight,
        }
    }
}

/// Avoidance behavior - turn away from whatever the forward probe hit
#[derive(Debug, Clone)]
pub struct Avoidance {
    /// Direction the probe was cast along
    pub forward: Vec3,
    /// Surface normal at the hit
    pub normal: Vec3,
    /// Maximum speed
    pub max_speed: f32,
    /// Maximum velocity change per tick
    pub strength: f32,
}

impl Avoidance {
    /// Create a new avoidance behavior
    #[must_use]
    pub fn new(forward: Vec3, normal: Vec3, max_speed: f32, strength: f32) -> Self {
        Self {
            forward,
            normal,
            max_speed,
            strength,
        }
    }

    /// Direction the agent should head in instead
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        reflect(self.forward, self.normal)
    }
}

impl SteeringBehavior for Avoidance {
    fn calculate(&self, _position: Vec3, velocity: Vec3) -> SteeringOutput {
        let desired = self.direction().normalize_or_zero() * self.max_speed;
        steer_towards(desired, velocity, self.strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek() {
        let seek = Seek::new(Vec3::new(10.0, 0.0, 0.0), 5.0, 10.0);
        let output = seek.calculate(Vec3::ZERO, Vec3::ZERO);

        assert!(output.linear.x > 0.0);
        assert!((output.linear.length() - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_seek_force_is_clamped() {
        let seek = Seek::new(Vec3::new(10.0, 0.0, 0.0), 5.0, 2.0);
        // Moving away at full speed, the desired change is 10 units
        let output = seek.calculate(Vec3::ZERO, Vec3::new(-5.0, 0.0, 0.0));

        assert!((output.linear.length() - 2.0).abs() < 0.01);
        assert!(output.linear.x > 0.0);
    }

    #[test]
    fn test_apply_clamps_speed() {
        let output = SteeringOutput {
            linear: Vec3::new(4.0, 0.0, 0.0),
        };
        let velocity = output.apply(Vec3::new(3.0, 0.0, 0.0), 5.0);
        assert!((velocity.length() - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_separation_pushes_away() {
        let neighbors = [Vec3::new(0.5, 0.0, 0.0)];
        let output = Separation::new(&neighbors, 1.0, 3.0).calculate(Vec3::ZERO, Vec3::ZERO);

        // -normalize(offset) / |offset| = (-2, 0, 0), averaged over 1, times 3
        assert!((output.linear - Vec3::new(-6.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_separation_averages_over_all_neighbors() {
        let neighbors = [Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, 0.0, 4.0)];
        let output = Separation::new(&neighbors, 1.0, 1.0).calculate(Vec3::ZERO, Vec3::ZERO);

        // Only the first neighbour repels, but both count toward the average
        assert!((output.linear - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_separation_degenerate_cases() {
        let none: [Vec3; 0] = [];
        let output = Separation::new(&none, 1.0, 3.0).calculate(Vec3::ZERO, Vec3::X);
        assert_eq!(output, SteeringOutput::ZERO);

        let coincident = [Vec3::ZERO];
        let output = Separation::new(&coincident, 1.0, 3.0).calculate(Vec3::ZERO, Vec3::X);
        assert!(output.linear.is_finite());
        assert_eq!(output.linear, Vec3::ZERO);
    }

    #[test]
    fn test_reflect() {
        let reflected = reflect(Vec3::new(1.0, 0.0, -1.0), Vec3::Z);
        assert!((reflected - Vec3::new(1.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_avoidance_turns_from_wall() {
        // Heading into a wall facing -Z
        let avoid = Avoidance::new(Vec3::NEG_Z, Vec3::Z, 5.0, 100.0);
        let output = avoid.calculate(Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0));
        let velocity = output.apply(Vec3::new(0.0, 0.0, -5.0), 5.0);

        assert!(velocity.z > 4.9);
    }
}
