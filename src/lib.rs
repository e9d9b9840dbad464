//! Coverage accounting and cached best-site search for RTS building placement.
//!
//! A [`PlannerSession`] owns, for one AI side, the coverage counters of every
//! sensor/jammer/shield kind, the build mask and the chokepoint weights with
//! their box cache. The host feeds it structure lifecycle events and asks it
//! where to build next; terrain, threat and placement legality come from the
//! host through the traits in [`map_data`].

pub mod analysis;
pub mod box_cache;
pub mod build_mask;
pub mod choke;
pub mod config;
pub mod constants;
pub mod coverage;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod location;
pub mod map_data;
pub mod planner;
pub mod scoring;
pub mod search;

pub use config::{ConfigError, PlannerConfig};
pub use coverage::CoverageKind;
pub use error::PlannerError;
pub use location::*;
pub use map_data::*;
pub use planner::{PlacedStructure, PlannerBuilder, PlannerSession};
pub use scoring::{DefenseScore, ScoreInputs, SiteScore};
pub use search::{
    NullObserver, PhaseTimer, SearchObserver, SearchPhase, SearchStats, SiteFilter, SiteRequest,
};
