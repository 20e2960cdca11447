use std::sync::Arc;

use glam::Vec2;
use tracing::{instrument, trace};

use crate::constraint::{Constraint, Spring};
use crate::force::Force;
use crate::grid::Grid;
use crate::ids::{BodyId, ConstraintId, ParticleId, SoftBodyId, SpringId};
use crate::particle::Particle;
use crate::soft_body::SoftBody;
use crate::task_pool::TaskPool;

pub const DEFAULT_SUBSTEPS: u32 = 8;
pub const JAKOBSEN_ITERATIONS: u32 = 10;
pub const MARGIN: f32 = 2.0;
pub const GRAVITY_CONST: f32 = 1000.0;
pub const RESPONSE_COEF: f32 = 0.5;
pub const BORDER_RESPONSE_COEF: f32 = 0.2;
const BORDER_COEF: f32 = BORDER_RESPONSE_COEF * RESPONSE_COEF;

/// Selects the collision resolution strategy. `Naive` and `Cellular` exist
/// only for benchmarking against `Threaded`, per spec.md §6.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverKind {
    Naive,
    Cellular,
    Threaded,
}

/// Read-only view of a particle, handed to a renderer.
#[derive(Clone, Copy, Debug)]
pub struct ParticleView {
    pub position: Vec2,
    pub radius: f32,
    pub colour: [u8; 3],
    pub hidden: bool,
}

/// Read-only view of a constraint or spring edge.
#[derive(Clone, Copy, Debug)]
pub struct EdgeView {
    pub a: Vec2,
    pub b: Vec2,
    pub in_body: bool,
}

/// Read-only view of a soft body's outline.
#[derive(Clone, Debug)]
pub struct SoftBodyView {
    pub vertices: Vec<Vec2>,
    pub colours: Vec<[u8; 3]>,
}

/// Owns every particle, constraint, spring and soft body in the simulation,
/// plus the spatial grid used to accelerate collisions. The solver is the
/// only thing that ever dereferences a [`ParticleId`]/[`ConstraintId`]/etc.
pub struct Solver {
    particles: Vec<Particle>,
    constraints: Vec<Constraint>,
    springs: Vec<Spring>,
    soft_bodies: Vec<SoftBody>,

    grid: Arc<Grid>,
    world_size: Vec2,

    pub substeps: u32,
    pub frame_dt: f32,
    pub time: f32,
    pub resolver: ResolverKind,

    attractor_active: bool,
    repellor_active: bool,
    speed_up_active: bool,
    slow_down_active: bool,
    reverse_active: bool,
    pub gravity_on: bool,
    pub speed_colouring: bool,

    next_body: u32,
    task_pool: Arc<TaskPool>,
}

/// Hand-written rather than `#[derive(Clone)]`: the grid is wrapped in an
/// `Arc` so worker closures can share it read-only during a threaded
/// collision batch, but `rebuild_grid` relies on `Arc::get_mut` to reclaim
/// exclusive access between substeps. A derived clone would just bump that
/// `Arc`'s refcount, so a solver snapshot kept alongside its original (e.g.
/// in a benchmark that clones a fixture solver per iteration) would make
/// every subsequent `step()` panic on the very first grid rebuild. Cloning
/// the grid's contents into a fresh `Arc` gives each clone its own
/// refcount-1 grid instead.
impl Clone for Solver {
    fn clone(&self) -> Self {
        Self {
            particles: self.particles.clone(),
            constraints: self.constraints.clone(),
            springs: self.springs.clone(),
            soft_bodies: self.soft_bodies.clone(),
            grid: Arc::new((*self.grid).clone()),
            world_size: self.world_size,
            substeps: self.substeps,
            frame_dt: self.frame_dt,
            time: self.time,
            resolver: self.resolver,
            attractor_active: self.attractor_active,
            repellor_active: self.repellor_active,
            speed_up_active: self.speed_up_active,
            slow_down_active: self.slow_down_active,
            reverse_active: self.reverse_active,
            gravity_on: self.gravity_on,
            speed_colouring: self.speed_colouring,
            next_body: self.next_body,
            task_pool: Arc::clone(&self.task_pool),
        }
    }
}

impl Solver {
    pub fn new(
        world_size: Vec2,
        max_radius: f32,
        substeps: u32,
        framerate: u32,
        resolver: ResolverKind,
        gravity_on: bool,
        speed_colouring: bool,
        task_pool: Arc<TaskPool>,
    ) -> Self {
        let cell_size = (max_radius * 2.0).max(1.0);
        Self {
            particles: Vec::new(),
            constraints: Vec::new(),
            springs: Vec::new(),
            soft_bodies: Vec::new(),
            grid: Arc::new(Grid::new(world_size, cell_size)),
            world_size,
            substeps,
            frame_dt: 1.0 / framerate as f32,
            time: 0.0,
            resolver,
            attractor_active: false,
            repellor_active: false,
            speed_up_active: false,
            slow_down_active: false,
            reverse_active: false,
            gravity_on,
            speed_colouring,
            next_body: 0,
            task_pool,
        }
    }

    pub fn step_dt(&self) -> f32 {
        self.frame_dt / self.substeps as f32
    }

    // ---- scene-builder contract (spec.md §6) ----

    pub fn add_particle(&mut self, position: Vec2, radius: f32, fixed: bool) -> ParticleId {
        let id = ParticleId(self.particles.len() as u32);
        self.particles.push(if fixed {
            Particle::new_fixed(position, radius)
        } else {
            Particle::new(position, radius)
        });
        id
    }

    pub fn add_constraint(
        &mut self,
        a: ParticleId,
        b: ParticleId,
        target_distance: f32,
    ) -> ConstraintId {
        let id = ConstraintId(self.constraints.len() as u32);
        self.constraints.push(Constraint::new(a, b, target_distance));
        id
    }

    pub fn add_constraint_in_body(
        &mut self,
        a: ParticleId,
        b: ParticleId,
        target_distance: f32,
    ) -> ConstraintId {
        let id = self.add_constraint(a, b, target_distance);
        self.constraints[id.index()].in_body = true;
        id
    }

    pub fn add_spring(
        &mut self,
        a: ParticleId,
        b: ParticleId,
        target_distance: f32,
        spring_constant: f32,
        damping: f32,
    ) -> SpringId {
        let id = SpringId(self.springs.len() as u32);
        let mut spring = Spring::new(a, b, target_distance);
        spring.spring_constant = spring_constant;
        spring.damping = damping;
        self.springs.push(spring);
        id
    }

    pub fn add_soft_body(&mut self, vertices: &[ParticleId], radius: f32) -> SoftBodyId {
        let id = SoftBodyId(self.soft_bodies.len() as u32);
        self.soft_bodies.push(SoftBody::new(vertices.to_vec(), radius));
        id
    }

    pub fn new_body_tag(&mut self) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        id
    }

    pub fn assign_body(&mut self, particle: ParticleId, body: BodyId) {
        self.particles[particle.index()].body_id = Some(body);
    }

    /// Must only be called between substeps — mutating a particle's implicit
    /// velocity mid-substep would be observed inconsistently by collisions
    /// and constraints that already ran this substep.
    pub fn set_velocity(&mut self, particle: ParticleId, velocity: Vec2) {
        let dt = self.step_dt();
        self.particles[particle.index()].set_velocity(velocity, dt);
    }

    // ---- input-layer contract (spec.md §6) ----

    pub fn set_attractor(&mut self, active: bool) {
        self.attractor_active = active;
    }

    pub fn set_repellor(&mut self, active: bool) {
        self.repellor_active = active;
    }

    pub fn set_speed_up(&mut self, active: bool) {
        self.speed_up_active = active;
    }

    pub fn set_slow_down(&mut self, active: bool) {
        self.slow_down_active = active;
    }

    pub fn set_reverse(&mut self, active: bool) {
        self.reverse_active = active;
    }

    // ---- renderer contract (spec.md §6) ----

    pub fn particle_views(&self) -> impl Iterator<Item = ParticleView> + '_ {
        self.particles.iter().map(|p| ParticleView {
            position: p.position,
            radius: p.radius,
            colour: p.colour,
            hidden: p.radius <= 0.0,
        })
    }

    pub fn constraint_views(&self) -> impl Iterator<Item = EdgeView> + '_ {
        self.constraints.iter().map(|c| EdgeView {
            a: self.particles[c.a.index()].position,
            b: self.particles[c.b.index()].position,
            in_body: c.in_body,
        })
    }

    pub fn spring_views(&self) -> impl Iterator<Item = EdgeView> + '_ {
        self.springs.iter().map(|s| EdgeView {
            a: self.particles[s.a.index()].position,
            b: self.particles[s.b.index()].position,
            in_body: s.in_body,
        })
    }

    pub fn soft_body_views(&self) -> impl Iterator<Item = SoftBodyView> + '_ {
        self.soft_bodies.iter().map(|body| SoftBodyView {
            vertices: body
                .vertices
                .iter()
                .map(|id| self.particles[id.index()].position)
                .collect(),
            colours: body
                .vertices
                .iter()
                .map(|id| self.particles[id.index()].colour)
                .collect(),
        })
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    // ---- the step pipeline (spec.md §4.6) ----

    #[instrument(level = "trace", skip_all)]
    pub fn step(&mut self) {
        self.time += self.frame_dt;
        let dt = self.step_dt();
        for substep in 0..self.substeps {
            trace!(substep, "substep start");
            self.rebuild_grid();
            self.resolve_collisions();
            self.relax_constraints();
            self.integrate(dt);
        }
    }

    #[instrument(level = "trace", skip_all)]
    fn rebuild_grid(&mut self) {
        let grid = Arc::get_mut(&mut self.grid)
            .expect("no outstanding grid references between substeps");
        grid.clear();
        for (idx, particle) in self.particles.iter().enumerate() {
            let p = particle.position;
            if p.x > 1.0
                && p.x < self.world_size.x - 1.0
                && p.y > 1.0
                && p.y < self.world_size.y - 1.0
            {
                grid.add_object(p, idx as u32);
            }
        }
    }

    fn resolve_pair(particles: &mut [Particle], i: usize, j: usize) {
        if i == j {
            return;
        }
        let (pos_i, radius_i, fixed_i, body_i) = {
            let p = &particles[i];
            (p.position, p.radius, p.fixed, p.body_id)
        };
        let (pos_j, radius_j, fixed_j, body_j) = {
            let p = &particles[j];
            (p.position, p.radius, p.fixed, p.body_id)
        };

        if let (Some(bi), Some(bj)) = (body_i, body_j) {
            if bi == bj {
                return;
            }
        }
        if fixed_i && fixed_j {
            return;
        }

        let d = pos_i - pos_j;
        let d2 = d.length_squared();
        let r = radius_i + radius_j;
        if d2 >= r * r {
            return;
        }
        let len = d2.sqrt();
        if len <= 0.0 {
            return;
        }
        let n = d / len;
        let delta = RESPONSE_COEF * (len - r);

        // Members of a body are treated as uniformly heavy for the purposes
        // of mass ratios, so a lone free particle doesn't fling a dense
        // constraint network around on contact.
        const BODY_MASS_RADIUS: f32 = 20.0;
        let eff_radius_i = if body_i.is_some() { BODY_MASS_RADIUS } else { radius_i };
        let eff_radius_j = if body_j.is_some() { BODY_MASS_RADIUS } else { radius_j };
        let m_i = eff_radius_i.powi(3);
        let m_j = eff_radius_j.powi(3);
        let mu_i = m_j / (m_i + m_j);
        let mu_j = m_i / (m_i + m_j);

        if fixed_i {
            particles[j].position += n * (mu_j * delta);
        } else if fixed_j {
            particles[i].position -= n * (mu_i * delta);
        } else {
            particles[i].position -= n * (0.5 * mu_i * delta);
            particles[j].position += n * (0.5 * mu_j * delta);
        }
    }

    #[instrument(level = "trace", skip_all)]
    fn resolve_collisions(&mut self) {
        match self.resolver {
            ResolverKind::Naive => self.resolve_collisions_naive(),
            ResolverKind::Cellular => self.resolve_collisions_cellular(),
            ResolverKind::Threaded => self.resolve_collisions_threaded(),
        }
    }

    fn resolve_collisions_naive(&mut self) {
        let n = self.particles.len();
        for i in 0..n {
            for j in (i + 1)..n {
                Self::resolve_pair(&mut self.particles, i, j);
            }
        }
    }

    fn sweep_cell_range(grid: &Grid, particles: &mut [Particle], start: usize, end: usize) {
        for idx in start..end.min(grid.len()) {
            let cell = grid.cell(idx);
            if cell.is_empty() {
                continue;
            }
            let ids: Vec<u32> = cell.ids().to_vec();
            let neighbours: Vec<usize> = grid.neighbourhood(idx).collect();
            for &id in &ids {
                for &n_idx in &neighbours {
                    let neighbour_ids: Vec<u32> = grid.cell(n_idx).ids().to_vec();
                    for other in neighbour_ids {
                        if other != id {
                            Self::resolve_pair(particles, id as usize, other as usize);
                        }
                    }
                }
            }
        }
    }

    fn resolve_collisions_cellular(&mut self) {
        let grid = Arc::clone(&self.grid);
        Self::sweep_cell_range(&grid, &mut self.particles, 0, grid.len());
    }

    /// Partitions the grid into vertical stripes and dispatches two batches
    /// (even columns, then odd columns) with a barrier between them. Cells
    /// in non-adjacent stripes never share a 3x3 neighbourhood, so no two
    /// workers in the same batch can touch the same particle — see spec.md
    /// §4.5. The particle vector is shared across worker closures through a
    /// raw pointer: the disjointness that makes this sound is a property of
    /// the grid partition (each particle lives in exactly one cell, and
    /// cells are split into disjoint column stripes within a batch), not
    /// something the borrow checker can see through a `TaskPool` job that
    /// must be `'static`.
    #[instrument(level = "trace", skip_all)]
    fn resolve_collisions_threaded(&mut self) {
        let grid = Arc::clone(&self.grid);
        let thread_count = self.task_pool.thread_count as i32;
        // Same-batch stripes are `2 * stripe_width` columns apart and each
        // reads one column into its neighbour on either side, so they stay
        // disjoint only when `stripe_width >= 2` (a gap of exactly one
        // unread column between them). A `.max(1)` floor would let stripe 0
        // and stripe 2 both touch the column between them whenever the grid
        // is narrow relative to the thread count (default config: width
        // 1200, max_radius 12 -> grid width 50 -> stripe_width 1 at just 13
        // threads) — two workers in the same batch racing on the same
        // particles. Any columns beyond `2 * thread_count * stripe_width`
        // fall to the trailing sequential pass below, same as before.
        let stripe_width = (grid.width / (2 * thread_count)).max(2);

        let particles = ParticlesPtr::new(&mut self.particles);

        let run_stripe = {
            let grid = Arc::clone(&grid);
            move |col_start: i32, col_end: i32| {
                let start = (col_start * grid.height).max(0) as usize;
                let end = (col_end * grid.height).max(0) as usize;
                // Safety: disjoint stripes within a batch touch disjoint
                // particle ids; see the invariant documented above.
                let slice = unsafe { particles.as_mut_slice() };
                Solver::sweep_cell_range(&grid, slice, start, end);
            }
        };

        for (batch_parity, _) in [(0, ()), (1, ())] {
            for t in 0..thread_count {
                let col_start = (2 * t + batch_parity) * stripe_width;
                let col_end = (col_start + stripe_width).min(grid.width);
                if col_start >= grid.width {
                    continue;
                }
                let run_stripe = run_stripe.clone();
                self.task_pool
                    .enqueue(move || run_stripe(col_start, col_end));
            }
            self.task_pool.complete_all();
        }

        // Leftover columns beyond 2*thread_count stripes.
        let covered = 2 * thread_count * stripe_width;
        if covered < grid.width {
            run_stripe(covered, grid.width);
        }
    }

    #[instrument(level = "trace", skip_all)]
    fn relax_constraints(&mut self) {
        let dt = self.step_dt();
        for _ in 0..JAKOBSEN_ITERATIONS {
            for constraint in &self.constraints {
                constraint.apply(&mut self.particles);
            }
            for spring in &self.springs {
                spring.apply(&mut self.particles, dt);
            }
            for body in &self.soft_bodies {
                body.apply(&mut self.particles);
            }
        }
    }

    fn active_forces(&self) -> Vec<Force> {
        let mut forces = Vec::new();
        if self.gravity_on {
            forces.push(Force::Gravity(Vec2::new(0.0, GRAVITY_CONST)));
        }
        let center = 0.5 * self.world_size;
        if self.attractor_active {
            forces.push(Force::Radial {
                center,
                strength: crate::force::ATTRACTOR_STRENGTH,
            });
        }
        if self.repellor_active {
            forces.push(Force::Radial {
                center,
                strength: -crate::force::REPELLOR_STRENGTH,
            });
        }
        if self.speed_up_active {
            forces.push(Force::VelocityScale(crate::force::SPEED_UP_FACTOR));
        }
        if self.slow_down_active {
            forces.push(Force::VelocityScale(crate::force::SLOW_DOWN_FACTOR));
        }
        if self.reverse_active {
            forces.push(Force::VelocityReverse);
        }
        forces
    }

    #[instrument(level = "trace", skip_all)]
    fn integrate(&mut self, dt: f32) {
        let forces = self.active_forces();
        let world_size = self.world_size;
        let speed_colouring = self.speed_colouring;

        let particles = ParticlesPtr::new(&mut self.particles);
        let particle_count = self.particles.len() as u32;
        let forces = Arc::new(forces);

        self.task_pool.dispatch(particle_count, move |start, end| {
            let forces = Arc::clone(&forces);
            // Safety: each dispatch batch owns a disjoint, contiguous index
            // range of the particle vector.
            let slice = unsafe { particles.as_mut_slice() };
            for idx in start..end {
                let particle = &mut slice[idx as usize];
                if particle.fixed {
                    continue;
                }
                for force in forces.iter() {
                    force.apply(particle, dt);
                }
                particle.integrate(dt);
                if speed_colouring {
                    particle.update_colour(dt);
                }
                apply_border_reflection(particle, world_size);
            }
        });
    }
}

fn apply_border_reflection(particle: &mut Particle, world_size: Vec2) {
    if particle.fixed {
        return;
    }
    let margin = MARGIN + particle.radius;
    let mut correction = Vec2::ZERO;

    if particle.position.x > world_size.x - margin {
        correction.x = particle.position.x - world_size.x + margin;
    } else if particle.position.x < margin {
        correction.x = -(margin - particle.position.x);
    }
    if particle.position.y > world_size.y - margin {
        correction.y = particle.position.y - world_size.y + margin;
    } else if particle.position.y < margin {
        correction.y = -(margin - particle.position.y);
    }

    particle.position -= correction * BORDER_COEF;
}

/// Raw-pointer handle into the particle vector, used to share mutable access
/// across worker closures whose disjointness is enforced by the caller
/// rather than by the type system (see `resolve_collisions_threaded` and
/// `integrate`). Never exposed outside this module.
#[derive(Clone, Copy)]
struct ParticlesPtr {
    ptr: *mut Particle,
    len: usize,
}

unsafe impl Send for ParticlesPtr {}
unsafe impl Sync for ParticlesPtr {}

impl ParticlesPtr {
    fn new(particles: &mut [Particle]) -> Self {
        Self {
            ptr: particles.as_mut_ptr(),
            len: particles.len(),
        }
    }

    /// # Safety
    /// The caller must guarantee that no two live slices from the same
    /// `ParticlesPtr` are used to access overlapping indices concurrently.
    unsafe fn as_mut_slice(&self) -> &mut [Particle] {
        std::slice::from_raw_parts_mut(self.ptr, self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver(resolver: ResolverKind) -> Solver {
        let pool = Arc::new(TaskPool::new(2).unwrap());
        Solver::new(
            Vec2::new(800.0, 600.0),
            10.0,
            DEFAULT_SUBSTEPS,
            60,
            resolver,
            true,
            false,
            pool,
        )
    }

    #[test]
    fn fixed_particle_bit_identical_across_a_full_step() {
        let mut s = solver(ResolverKind::Threaded);
        let anchor = s.add_particle(Vec2::new(400.0, 300.0), 10.0, true);
        let before = s.particle_views().next().unwrap().position;
        let _ = anchor;
        s.step();
        let after = s.particle_views().next().unwrap().position;
        assert_eq!(before, after);
    }

    #[test]
    fn two_touching_particles_separate() {
        let mut s = solver(ResolverKind::Threaded);
        s.gravity_on = false;
        s.add_particle(Vec2::new(100.0, 500.0), 10.0, false);
        s.add_particle(Vec2::new(119.0, 500.0), 10.0, false);
        s.step();
        let views: Vec<_> = s.particle_views().collect();
        let dist = (views[0].position - views[1].position).length();
        assert!(dist >= 20.0 - 1e-3, "distance was {dist}");
    }

    #[test]
    fn fixed_anchor_rope_holds_first_particle_in_place() {
        let mut s = solver(ResolverKind::Threaded);
        let n = 20;
        let mut ids = Vec::new();
        for i in 0..n {
            let fixed = i == 0;
            let id = s.add_particle(Vec2::new(400.0, 50.0 + i as f32 * 10.0), 4.0, fixed);
            ids.push(id);
        }
        for i in 0..n - 1 {
            s.add_constraint(ids[i], ids[i + 1], 10.0);
        }
        let anchor_pos = s.particle_views().next().unwrap().position;
        for _ in 0..200 {
            s.step();
        }
        let after = s.particle_views().next().unwrap().position;
        assert_eq!(anchor_pos, after);

        for i in 0..n - 1 {
            let a = s.particles[ids[i].index()].position;
            let b = s.particles[ids[i + 1].index()].position;
            let len = (a - b).length();
            assert!((len - 10.0).abs() / 10.0 < 0.5, "segment length {len}");
        }
    }

    #[test]
    fn clone_kept_alongside_original_can_both_step() {
        let mut original = solver(ResolverKind::Threaded);
        original.add_particle(Vec2::new(400.0, 100.0), 10.0, false);
        let mut clone = original.clone();
        // Both solvers must independently reclaim exclusive grid access on
        // `rebuild_grid`; a shallow `Arc`-bumping clone would panic here.
        original.step();
        clone.step();
    }

    #[test]
    fn grid_overflow_does_not_crash_or_produce_nan() {
        let mut s = solver(ResolverKind::Threaded);
        for i in 0..12 {
            s.add_particle(Vec2::new(400.0 + i as f32 * 0.1, 300.0), 10.0, false);
        }
        s.step();
        for view in s.particle_views() {
            assert!(view.position.is_finite());
        }
    }

    #[test]
    fn threaded_resolver_stays_race_free_with_a_narrow_grid_and_many_threads() {
        // Default-shaped config (width 1200, max_radius 12 -> grid width 50)
        // with enough threads that `grid.width / (2 * thread_count)` would
        // floor to 1 without the `.max(2)` clamp, letting same-batch stripes
        // overlap. This can't directly observe a data race, but with the
        // fix every stripe stays disjoint and the resolver should still
        // separate overlapping particles cleanly with no NaN.
        let pool = Arc::new(TaskPool::new(16).unwrap());
        let mut s = Solver::new(
            Vec2::new(1200.0, 800.0),
            12.0,
            DEFAULT_SUBSTEPS,
            60,
            ResolverKind::Threaded,
            false,
            false,
            pool,
        );
        for i in 0..40 {
            s.add_particle(Vec2::new(100.0 + i as f32 * 11.0, 400.0), 12.0, false);
        }
        for _ in 0..5 {
            s.step();
        }
        for view in s.particle_views() {
            assert!(view.position.is_finite());
        }
    }

    #[test]
    fn naive_and_threaded_resolvers_separate_an_overlapping_pair_similarly() {
        let positions = [Vec2::new(100.0, 100.0), Vec2::new(115.0, 100.0)];
        let mut naive = solver(ResolverKind::Naive);
        naive.gravity_on = false;
        let mut threaded = solver(ResolverKind::Threaded);
        threaded.gravity_on = false;
        for p in positions {
            naive.add_particle(p, 10.0, false);
            threaded.add_particle(p, 10.0, false);
        }
        naive.step();
        threaded.step();
        let naive_views: Vec<_> = naive.particle_views().collect();
        let threaded_views: Vec<_> = threaded.particle_views().collect();
        for (a, b) in naive_views.iter().zip(threaded_views.iter()) {
            assert!((a.position - b.position).length() < 1.0);
        }
    }
}
