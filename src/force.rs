//! Per-spec §9, the source's solver grew an accretive pile of boolean force
//! flags (attractor, repellor, speed-up, slow-down, reverse). The public
//! setters the driver/input layer calls still match spec.md §6's contract
//! (`set_attractor`, `set_repellor`, ...), but internally the solver turns
//! those flags into this small list of force contributors and the
//! integration pass simply iterates over it — adding a new force becomes a
//! data change instead of another `if` branch wired through every call site.

use glam::Vec2;

#[derive(Clone, Copy, Debug)]
pub enum Force {
    /// Constant acceleration added to every non-fixed particle.
    Gravity(Vec2),
    /// Radial force toward (`strength` > 0) or away from (`strength` < 0)
    /// `center`. Attractor and repellor are the same contributor with
    /// opposite sign, per spec.md §9's note that both should be symmetric
    /// and configurable.
    Radial { center: Vec2, strength: f32 },
    /// Scales the particle's implicit velocity by `factor` this substep.
    /// Used for the speed-up/slow-down input modifiers.
    VelocityScale(f32),
    /// Negates the particle's implicit velocity this substep.
    VelocityReverse,
}

pub const ATTRACTOR_STRENGTH: f32 = 2000.0;
pub const REPELLOR_STRENGTH: f32 = 2000.0;
pub const SPEED_UP_FACTOR: f32 = 1.1;
pub const SLOW_DOWN_FACTOR: f32 = 0.9;

impl Force {
    /// Applies this contributor to one particle for one substep of length
    /// `dt`. `Gravity`/`Radial` accumulate acceleration (consumed at
    /// integration time); `VelocityScale`/`VelocityReverse` act immediately
    /// by rewriting `prev_position`, since there is no stored velocity field
    /// to scale directly.
    pub fn apply(&self, particle: &mut crate::particle::Particle, dt: f32) {
        use crate::particle::Particle;
        match *self {
            Force::Gravity(g) => particle.accelerate(g),
            Force::Radial { center, strength } => {
                let displacement = center - particle.position;
                let distance = displacement.length();
                if distance > 0.0 {
                    particle.accelerate(displacement / distance * strength);
                }
            }
            Force::VelocityScale(factor) => {
                let v = particle.velocity(dt) * factor;
                Particle::set_velocity(particle, v, dt);
            }
            Force::VelocityReverse => {
                let v = -particle.velocity(dt);
                Particle::set_velocity(particle, v, dt);
            }
        }
    }
}
