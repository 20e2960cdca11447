use tracing::warn;

use crate::ids::ParticleId;
use crate::particle::Particle;

/// A hard distance rule between two particles, enforced by direct position
/// projection (no force, no velocity change).
#[derive(Clone, Debug)]
pub struct Constraint {
    pub a: ParticleId,
    pub b: ParticleId,
    pub target_distance: f32,
    /// True for edges internal to a rigid/soft body; the renderer uses this
    /// to skip drawing them. The solver itself treats every constraint the
    /// same regardless of this flag.
    pub in_body: bool,
}

impl Constraint {
    pub fn new(a: ParticleId, b: ParticleId, target_distance: f32) -> Self {
        Self {
            a,
            b,
            target_distance,
            in_body: false,
        }
    }

    /// Applies one Jakobsen correction pass. Particles are indexed directly
    /// rather than borrowed simultaneously, since reading both positions up
    /// front and then writing each particle through its own short-lived
    /// borrow avoids needing unstable `get_many_mut`.
    pub fn apply(&self, particles: &mut [Particle]) {
        let (ia, ib) = (self.a.index(), self.b.index());
        if ia == ib {
            warn!("constraint references identical particle index {ia}");
            return;
        }
        let (pos_a, fixed_a) = {
            let p = &particles[ia];
            (p.position, p.fixed)
        };
        let (pos_b, fixed_b) = {
            let p = &particles[ib];
            (p.position, p.fixed)
        };
        if fixed_a && fixed_b {
            return;
        }

        let d = pos_a - pos_b;
        let len = d.length();
        if len <= 0.0 {
            return;
        }
        let n = d / len;
        let err = self.target_distance - len;

        if fixed_a && !fixed_b {
            particles[ib].position -= err * n;
        } else if !fixed_a && fixed_b {
            particles[ia].position += err * n;
        } else {
            particles[ia].position += 0.5 * err * n;
            particles[ib].position -= 0.5 * err * n;
        }
    }
}

/// A soft, force-based distance rule: Hooke spring plus velocity damping,
/// distributed by the same fixed-vs-free rule as [`Constraint`].
#[derive(Clone, Debug)]
pub struct Spring {
    pub a: ParticleId,
    pub b: ParticleId,
    pub target_distance: f32,
    pub spring_constant: f32,
    pub damping: f32,
    pub in_body: bool,
}

pub const DEFAULT_SPRING_CONSTANT: f32 = 0.5;
pub const DEFAULT_SPRING_DAMPING: f32 = 0.9;

impl Spring {
    pub fn new(a: ParticleId, b: ParticleId, target_distance: f32) -> Self {
        Self {
            a,
            b,
            target_distance,
            spring_constant: DEFAULT_SPRING_CONSTANT,
            damping: DEFAULT_SPRING_DAMPING,
            in_body: false,
        }
    }

    pub fn apply(&self, particles: &mut [Particle], dt: f32) {
        let (ia, ib) = (self.a.index(), self.b.index());
        if ia == ib {
            warn!("spring references identical particle index {ia}");
            return;
        }
        let (pos_a, vel_a, fixed_a) = {
            let p = &particles[ia];
            (p.position, p.velocity(dt), p.fixed)
        };
        let (pos_b, vel_b, fixed_b) = {
            let p = &particles[ib];
            (p.position, p.velocity(dt), p.fixed)
        };
        if fixed_a && fixed_b {
            return;
        }

        let axis = pos_a - pos_b;
        let len = axis.length();
        if len <= 0.0 {
            return;
        }
        let n = axis / len;
        let spring_term = self.spring_constant * (len - self.target_distance);
        let damping_term = self.damping * (vel_a - vel_b).dot(n);
        let displacement = (spring_term + damping_term) * n;

        if fixed_a && !fixed_b {
            particles[ib].position += displacement;
        } else if !fixed_a && fixed_b {
            particles[ia].position -= displacement;
        } else {
            particles[ia].position -= 0.5 * displacement;
            particles[ib].position += 0.5 * displacement;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn particle_at(x: f32, y: f32) -> Particle {
        Particle::new(Vec2::new(x, y), 1.0)
    }

    #[test]
    fn converges_towards_target_distance() {
        let mut particles = vec![particle_at(0.0, 0.0), particle_at(5.0, 0.0)];
        let constraint = Constraint::new(ParticleId(0), ParticleId(1), 10.0);
        for _ in 0..10 {
            constraint.apply(&mut particles);
        }
        let len = (particles[0].position - particles[1].position).length();
        assert!((len - 10.0).abs() < 1e-3, "len was {len}");
    }

    #[test]
    fn fixed_anchor_never_moves() {
        let mut particles = vec![particle_at(0.0, 0.0), particle_at(5.0, 0.0)];
        particles[0].fixed = true;
        let constraint = Constraint::new(ParticleId(0), ParticleId(1), 10.0);
        for _ in 0..20 {
            constraint.apply(&mut particles);
        }
        assert_eq!(particles[0].position, Vec2::new(0.0, 0.0));
    }
}
