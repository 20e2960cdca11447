//! Driver configuration: every item spec.md §6 lists as part of the CLI/
//! config surface (window extents, spawn radius range, object cap, framerate,
//! substeps, thread count, resolver choice, force/colouring toggles, demo
//! name), parsed with `clap` the way the workspace's other binaries do.

use thiserror::Error;

use crate::solver::ResolverKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("window width and height must both be positive")]
    EmptyWorld,
    #[error("min_radius ({min}) must be <= max_radius ({max})")]
    InvertedRadiusRange { min: f32, max: f32 },
    #[error("substeps must be at least 1")]
    ZeroSubsteps,
    #[error("framerate must be at least 1")]
    ZeroFramerate,
    #[error("unknown demo scene '{0}', see --list-demos")]
    UnknownDemo(String),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ResolverArg {
    Naive,
    Cellular,
    Threaded,
}

impl From<ResolverArg> for ResolverKind {
    fn from(value: ResolverArg) -> Self {
        match value {
            ResolverArg::Naive => ResolverKind::Naive,
            ResolverArg::Cellular => ResolverKind::Cellular,
            ResolverArg::Threaded => ResolverKind::Threaded,
        }
    }
}

/// Headless driver configuration, parsed from the command line.
#[derive(Debug, clap::Parser)]
#[command(name = "substep-driver", about = "Runs a substep physics demo headlessly")]
pub struct Config {
    /// World width in simulation units.
    #[arg(long, default_value_t = 1200.0)]
    pub width: f32,

    /// World height in simulation units.
    #[arg(long, default_value_t = 800.0)]
    pub height: f32,

    /// Smallest radius a spawned particle may have.
    #[arg(long, default_value_t = 3.0)]
    pub min_radius: f32,

    /// Largest radius a spawned particle may have — also sets the grid's
    /// cell size (`2 * max_radius`), per spec.md §4.4.
    #[arg(long, default_value_t = 12.0)]
    pub max_radius: f32,

    /// Hard cap on the number of live particles, per spec.md §6.
    #[arg(long, default_value_t = 20_000)]
    pub max_objects: usize,

    /// Target updates per second for the fixed-timestep loop.
    #[arg(long, default_value_t = 60)]
    pub framerate: u32,

    /// Verlet substeps per frame, per spec.md §2.
    #[arg(long, default_value_t = crate::solver::DEFAULT_SUBSTEPS)]
    pub substeps: u32,

    /// Worker thread count for the task pool. Defaults to the number of
    /// available cores.
    #[arg(long)]
    pub threads: Option<usize>,

    /// Collision resolution strategy.
    #[arg(long, value_enum, default_value_t = ResolverArg::Threaded)]
    pub resolver: ResolverArg,

    /// Disable gravity.
    #[arg(long)]
    pub no_gravity: bool,

    /// Enable speed-based particle colouring.
    #[arg(long)]
    pub speed_colouring: bool,

    /// Name of the built-in demo scene to run (see `scene::names`).
    #[arg(long, default_value = "single-free-fall")]
    pub demo: String,

    /// How many frames to simulate before exiting. `0` means run forever.
    #[arg(long, default_value_t = 0)]
    pub frame_limit: u64,
}

// clap's `default_value_t` requires `Display` to render the default in
// `--help` output.
impl std::fmt::Display for ResolverArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResolverArg::Naive => "naive",
            ResolverArg::Cellular => "cellular",
            ResolverArg::Threaded => "threaded",
        };
        write!(f, "{s}")
    }
}

impl Config {
    /// Validates cross-field invariants clap's declarative parsing can't
    /// express (spec.md §6), and resolves the requested demo name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ConfigError::EmptyWorld);
        }
        if self.min_radius > self.max_radius {
            return Err(ConfigError::InvertedRadiusRange {
                min: self.min_radius,
                max: self.max_radius,
            });
        }
        if self.substeps == 0 {
            return Err(ConfigError::ZeroSubsteps);
        }
        if self.framerate == 0 {
            return Err(ConfigError::ZeroFramerate);
        }
        if crate::scene::lookup(&self.demo).is_none() {
            return Err(ConfigError::UnknownDemo(self.demo.clone()));
        }
        Ok(())
    }

    pub fn world_size(&self) -> glam::Vec2 {
        glam::Vec2::new(self.width, self.height)
    }

    pub fn thread_count(&self) -> usize {
        self.threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_validate_cleanly() {
        let cfg = Config::parse_from(["substep-driver"]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn inverted_radius_range_is_rejected() {
        let mut cfg = Config::parse_from(["substep-driver"]);
        cfg.min_radius = 50.0;
        cfg.max_radius = 1.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvertedRadiusRange { .. })
        ));
    }

    #[test]
    fn unknown_demo_is_rejected() {
        let mut cfg = Config::parse_from(["substep-driver"]);
        cfg.demo = "does-not-exist".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::UnknownDemo(_))));
    }
}
