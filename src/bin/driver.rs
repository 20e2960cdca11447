//! Headless driver binary: wires a [`Config`], a [`TaskPool`], a [`Solver`]
//! and a demo scene together and runs the fixed-timestep loop spec.md §2
//! describes. Rendering and window/keyboard capture are out of scope (spec.md
//! §1 Non-goals), so this loop plays the part the reference crate's
//! macroquad examples give to `loop { update(); render(); next_frame().await }`
//! minus the render/await half — it just steps the solver and logs.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use substep::config::Config;
use substep::input::{InputSource, NoInput};
use substep::solver::Solver;
use substep::task_pool::TaskPool;
use substep::{scene, SubstepError};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn setup_logging() {
    let fmt_layer = fmt::layer().compact();
    let filter_layer = EnvFilter::from_default_env();
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter_layer)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    setup_logging();

    let config = Config::parse();
    config.validate().map_err(SubstepError::from)?;

    let scene = scene::lookup(&config.demo)
        .ok_or_else(|| eyre!("unknown demo scene '{}'", config.demo))?;

    let pool = Arc::new(TaskPool::new(config.thread_count()).map_err(SubstepError::from)?);
    let mut solver = Solver::new(
        config.world_size(),
        config.max_radius,
        config.substeps,
        config.framerate,
        config.resolver.into(),
        !config.no_gravity,
        config.speed_colouring,
        pool,
    );
    scene.build(&mut solver);
    info!(
        demo = scene.name(),
        particles = solver.particle_count(),
        "scene built"
    );

    let mut input = NoInput;
    let frame_dt = 1.0 / config.framerate as f32;
    let mut frame: u64 = 0;
    let mut accumulator = 0.0f32;
    let mut last = Instant::now();

    loop {
        if config.frame_limit != 0 && frame >= config.frame_limit {
            break;
        }

        let now = Instant::now();
        accumulator += (now - last).as_secs_f32();
        last = now;

        // Cap the catch-up work a slow host can be asked to do in one pass,
        // the same safety valve a fixed-timestep loop needs regardless of
        // whether anything gets drawn.
        const MAX_CATCHUP: f32 = 0.25;
        if accumulator > MAX_CATCHUP {
            accumulator = MAX_CATCHUP;
        }

        while accumulator >= frame_dt {
            input.poll().apply(&mut solver);
            solver.step();
            accumulator -= frame_dt;
            frame += 1;

            if frame % config.framerate as u64 == 0 {
                info!(
                    frame,
                    time = solver.time,
                    particles = solver.particle_count(),
                    "tick"
                );
            }

            if config.frame_limit != 0 && frame >= config.frame_limit {
                break;
            }
        }
    }

    info!(frame, "driver exiting");
    Ok(())
}
