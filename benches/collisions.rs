use std::iter::repeat_with;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use rand::Rng;
use substep::solver::{ResolverKind, Solver};
use substep::task_pool::TaskPool;

fn init_solver(num_particles: usize, resolver: ResolverKind) -> Solver {
    let pool = Arc::new(TaskPool::new(4).unwrap());
    let mut solver = Solver::new(
        Vec2::new(2000.0, 2000.0),
        10.0,
        8,
        60,
        resolver,
        true,
        false,
        pool,
    );
    let mut rng = rand::thread_rng();
    for pos in repeat_with(|| {
        Vec2::new(rng.gen_range(0.0..2000.0), rng.gen_range(0.0..2000.0))
    })
    .take(num_particles)
    {
        solver.add_particle(pos, 10.0, false);
    }
    solver
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver_step");
    for num_particles in [64, 256, 1024, 4096] {
        for resolver in [ResolverKind::Naive, ResolverKind::Cellular, ResolverKind::Threaded] {
            let initial = init_solver(num_particles, resolver);
            group.bench_with_input(
                BenchmarkId::new(format!("{resolver:?}"), num_particles),
                &num_particles,
                |b, _| {
                    b.iter(|| {
                        let mut solver = initial.clone();
                        solver.step();
                        black_box(solver.particle_count());
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
