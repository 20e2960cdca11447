//! `substep` — a real-time, position-based (Verlet) 2D physics kernel.
//!
//! The crate is organized the way the reference physics kernel this was
//! grown from organizes itself: small single-purpose modules for the math
//! primitives and simulated objects, a `grid` module for the spatial
//! acceleration structure, a `task_pool` module for the parallelism, and a
//! `solver` module that owns everything and exposes the scene-builder /
//! input / renderer contracts spec.md §6 describes. `scene`, `config` and
//! `error` are the ambient layers a headless driver binary needs and the
//! reference crate's own `examples/`/`scenarios` modules foreshadow.

pub mod config;
pub mod constraint;
pub mod error;
pub mod force;
pub mod geometry;
pub mod grid;
pub mod ids;
pub mod input;
pub mod particle;
pub mod scene;
pub mod soft_body;
pub mod solver;
pub mod task_pool;

pub use config::Config;
pub use error::SubstepError;
pub use ids::{BodyId, ConstraintId, ParticleId, SoftBodyId, SpringId};
pub use solver::{EdgeView, ParticleView, ResolverKind, Solver, SoftBodyView};
pub use task_pool::TaskPool;
