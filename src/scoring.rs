//! Site scoring formulas.
//!
//! The site search prunes whole boxes by scoring a box's most favourable
//! inputs, so every formula must be monotone in each input: never
//! decreasing in `sum` and `weighted_height`, never increasing in
//! `distance`, `threat` and `factory_distance`. Inputs are non-negative
//! except `weighted_height`.

use crate::constants::*;
use serde::{Deserialize, Serialize};

/// Everything a formula gets to see about one candidate cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScoreInputs {
    /// Chokepoint disk-sum at the cell.
    pub sum: f32,
    /// World distance from the builder.
    pub distance: f32,
    /// Terrain height already multiplied by the request's height weight.
    pub weighted_height: f32,
    /// Threat at the cell relative to the map average.
    pub threat: f32,
    /// World distance to the nearest friendly factory.
    pub factory_distance: f32,
}

pub trait SiteScore {
    fn score(&self, inputs: &ScoreInputs) -> f32;
}

impl<F: Fn(&ScoreInputs) -> f32> SiteScore for F {
    fn score(&self, inputs: &ScoreInputs) -> f32 {
        self(inputs)
    }
}

/// `sum / (1 + threat) + weighted_height - distance_weight * distance
///  - factory_weight * factory_distance`
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseScore {
    pub distance_weight: f32,
    pub factory_weight: f32,
}

impl Default for DefenseScore {
    fn default() -> Self {
        DefenseScore {
            distance_weight: DEFAULT_DISTANCE_WEIGHT,
            factory_weight: 0.0,
        }
    }
}

impl SiteScore for DefenseScore {
    fn score(&self, inputs: &ScoreInputs) -> f32 {
        inputs.sum / (1.0 + inputs.threat) + inputs.weighted_height
            - self.distance_weight * inputs.distance
            - self.factory_weight * inputs.factory_distance
    }
}
