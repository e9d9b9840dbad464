//! Planner tuning, loadable from JSON.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::constants::*;
use crate::scoring::DefenseScore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// World units per base coverage cell.
    pub coverage_downsample: u32,
    /// World units per placement cell.
    pub placement_downsample: u32,
    /// Placement cells per cache box side.
    pub cache_box_size: u32,
    /// Cells added to a defense radius when invalidating cached sums.
    pub invalidation_margin: u32,
    /// Weights of the default site score.
    pub score: DefenseScore,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            coverage_downsample: DEFAULT_COVERAGE_DOWNSAMPLE,
            placement_downsample: DEFAULT_PLACEMENT_DOWNSAMPLE,
            cache_box_size: DEFAULT_CACHE_BOX_SIZE,
            invalidation_margin: DEFAULT_INVALIDATION_MARGIN,
            score: DefenseScore::default(),
        }
    }
}

impl PlannerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        PlannerConfig::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.coverage_downsample == 0 {
            return Err(ConfigError::Invalid("coverage_downsample must be at least 1"));
        }
        if self.placement_downsample == 0 {
            return Err(ConfigError::Invalid("placement_downsample must be at least 1"));
        }
        if self.cache_box_size == 0 {
            return Err(ConfigError::Invalid("cache_box_size must be at least 1"));
        }
        let weights = [self.score.distance_weight, self.score.factory_weight];
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(ConfigError::Invalid("score weights must be finite"));
        }
        if weights.iter().any(|w| *w < 0.0) {
            return Err(ConfigError::Invalid("score weights must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read planner config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse planner config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid planner config: {0}")]
    Invalid(&'static str),
}
