//! Crate-level error type. The simulation kernel itself has no fallible hot
//! path (spec.md §7) — only the boundary surfaces (config parsing, task pool
//! startup) can fail, so this simply unifies their typed errors for callers
//! that want one `Result` to propagate with `?`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::task_pool::PoolError;

#[derive(Debug, Error)]
pub enum SubstepError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}
