use crate::config::ConfigError;
use thiserror::Error;

/// Errors raised while setting up a planner session. Nothing in the
/// per-tick query path returns an error; out-of-range input is clamped and
/// "no site" is an ordinary `None`.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("map must have a non-zero size, got {width}x{height}")]
    EmptyMap { width: u32, height: u32 },
    #[error("{grid} downsample factor must be at least 1")]
    ZeroDownsample { grid: &'static str },
    #[error("{width}x{height} cell grid exceeds the {max} cell limit per axis")]
    GridTooLarge { width: u32, height: u32, max: u32 },
    #[error("cache box size must be at least 1")]
    ZeroBoxSize,
    #[error(transparent)]
    Config(#[from] ConfigError),
}
