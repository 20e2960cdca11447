use std::f32::consts::PI;

use crate::geometry;
use crate::ids::ParticleId;
use crate::particle::Particle;

/// How aggressively a soft body's area-pressure correction chases its
/// `desired_area` each pass.
pub const AREA_PRESSURE: f32 = 0.01;

/// A closed polygon of particles that resists changes to its enclosed area
/// by displacing each vertex along its local outward normal. This is a soft,
/// iterative pressure model, not a strict invariant.
#[derive(Clone, Debug)]
pub struct SoftBody {
    pub vertices: Vec<ParticleId>,
    pub desired_area: f32,
}

impl SoftBody {
    /// `radius` is the radius of the circle the body approximates;
    /// `desired_area` is derived from it as `pi * r^2`.
    pub fn new(vertices: Vec<ParticleId>, radius: f32) -> Self {
        Self {
            vertices,
            desired_area: PI * radius * radius,
        }
    }

    pub fn apply(&self, particles: &mut [Particle]) {
        let n = self.vertices.len();
        if n < 3 {
            return;
        }

        let positions: Vec<_> = self
            .vertices
            .iter()
            .map(|id| particles[id.index()].position)
            .collect();
        let current_area = geometry::area(&positions);
        let error = self.desired_area - current_area;
        let push = AREA_PRESSURE * error / (2.0 * n as f32);

        for i in 0..n {
            let id = self.vertices[i];
            if particles[id.index()].fixed {
                continue;
            }
            let prev = positions[(i + n - 1) % n];
            let next = positions[(i + 1) % n];
            let normal = geometry::outward_normal(prev, next);
            particles[id.index()].position += normal * push;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ParticleId;
    use glam::Vec2;

    fn square(half: f32) -> Vec<Particle> {
        vec![
            Particle::new(Vec2::new(-half, -half), 1.0),
            Particle::new(Vec2::new(half, -half), 1.0),
            Particle::new(Vec2::new(half, half), 1.0),
            Particle::new(Vec2::new(-half, half), 1.0),
        ]
    }

    #[test]
    fn expands_towards_desired_area() {
        let mut particles = square(1.0);
        let ids: Vec<_> = (0..4).map(|i| ParticleId(i)).collect();
        // current area = 4, desired is a much bigger circle's area.
        let body = SoftBody::new(ids, 5.0);
        let before = geometry::area(
            &particles
                .iter()
                .map(|p| p.position)
                .collect::<Vec<_>>(),
        );
        for _ in 0..50 {
            body.apply(&mut particles);
        }
        let after = geometry::area(
            &particles
                .iter()
                .map(|p| p.position)
                .collect::<Vec<_>>(),
        );
        assert!(after > before);
    }
}
