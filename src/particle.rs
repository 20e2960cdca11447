use glam::Vec2;

use crate::ids::BodyId;

/// Mild per-substep velocity damping applied during integration.
pub const DAMPING: f32 = 0.9999;

/// Coefficient mapping speed to the colour-cycling sinusoids in
/// [`Particle::update_colour`].
const COLOUR_COEFFICIENT: f32 = 0.0015;

/// A single Verlet-integrated point mass with a collision radius.
///
/// Velocity is never stored directly: it is implicit in
/// `position - prev_position`, which is what makes position-projection
/// (collisions, constraints) a simple matter of writing `position` without
/// having to separately patch up a velocity field.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub prev_position: Vec2,
    pub acceleration: Vec2,
    /// Zero marks a massless marker particle; see spec's scene variants.
    pub radius: f32,
    pub colour: [u8; 3],
    pub fixed: bool,
    pub body_id: Option<BodyId>,
}

impl Particle {
    pub fn new(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            prev_position: position,
            acceleration: Vec2::ZERO,
            radius,
            colour: [255, 0, 0],
            fixed: false,
            body_id: None,
        }
    }

    pub fn new_fixed(position: Vec2, radius: f32) -> Self {
        Self {
            fixed: true,
            ..Self::new(position, radius)
        }
    }

    /// Advances `position` by one substep of length `dt` and zeroes the
    /// accumulated acceleration. No-op for fixed particles: their position
    /// must remain bit-identical across every substep.
    pub fn integrate(&mut self, dt: f32) {
        if self.fixed {
            return;
        }
        let displacement = (self.position - self.prev_position) * DAMPING;
        self.prev_position = self.position;
        self.position += displacement + self.acceleration * dt * dt;
        self.acceleration = Vec2::ZERO;
    }

    pub fn velocity(&self, dt: f32) -> Vec2 {
        (self.position - self.prev_position) / dt
    }

    pub fn set_velocity(&mut self, velocity: Vec2, dt: f32) {
        self.prev_position = self.position - velocity * dt;
    }

    pub fn accelerate(&mut self, acceleration: Vec2) {
        self.acceleration += acceleration;
    }

    /// Maps speed through three sinusoids offset by a third of a turn each,
    /// squares the result and scales to a byte per channel.
    pub fn update_colour(&mut self, dt: f32) {
        use std::f32::consts::PI;

        let speed = self.velocity(dt).length();
        let theta = COLOUR_COEFFICIENT * speed;
        let r = theta.sin();
        let g = (theta + 2.0 / 3.0 * PI).sin();
        let b = (theta + 4.0 / 3.0 * PI).sin();
        self.colour = [
            (255.0 * r * r) as u8,
            (255.0 * g * g) as u8,
            (255.0 * b * b) as u8,
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_particle_never_moves() {
        let mut p = Particle::new_fixed(Vec2::new(1.0, 2.0), 5.0);
        p.accelerate(Vec2::new(100.0, -100.0));
        p.integrate(1.0 / 60.0);
        assert_eq!(p.position, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn set_velocity_round_trips() {
        let mut p = Particle::new(Vec2::ZERO, 1.0);
        let dt = 1.0 / 60.0;
        let v = Vec2::new(3.0, -4.0);
        p.set_velocity(v, dt);
        assert!((p.velocity(dt) - v).length() < 1e-5);
    }

    #[test]
    fn undriven_integration_damps_by_damping_squared() {
        let dt = 1.0 / 60.0;
        let mut p = Particle::new(Vec2::ZERO, 1.0);
        p.set_velocity(Vec2::new(10.0, 0.0), dt);
        let v0 = p.velocity(dt);
        p.integrate(dt);
        p.integrate(dt);
        let v2 = p.velocity(dt);
        let expected = v0 * DAMPING * DAMPING;
        assert!((v2 - expected).length() < 1e-3);
    }
}
