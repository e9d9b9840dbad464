//! Services the planner consumes from the host game.
//!
//! Each concern is its own trait so hosts and tests can supply them
//! separately; [`MapDataSource`] bundles the per-map ones for call sites
//! that need all of them.

use crate::coverage::CoverageKind;
use crate::location::*;

/// Terrain elevation.
pub trait Terrain {
    fn height_at(&self, x: f32, z: f32) -> f32;

    fn height_at_pos(&self, pos: WorldPos) -> f32 {
        self.height_at(pos.x, pos.z)
    }
}

/// Enemy threat estimate.
pub trait ThreatMap {
    fn threat_at(&self, pos: WorldPos) -> f32;

    fn average_threat(&self) -> f32;

    /// Lower bound of [`ThreatMap::threat_at`] over the whole map. Used for
    /// the optimistic bound of a search box, so it must never exceed any real
    /// threat value. The default assumes threat is never negative.
    fn minimum_threat(&self) -> f32 {
        0.0
    }
}

/// Authoritative placement legality (collision, slope, ...).
pub trait BuildValidity {
    fn can_build_at(&self, structure: StructureType, pos: WorldPos) -> bool;
}

/// Distance from a point to the closest friendly factory.
pub trait FactoryProximity {
    fn distance_to_nearest(&self, x: f32, z: f32) -> f32;
}

/// Static per-structure-type metadata.
pub trait UnitCatalog {
    /// Effective range in world units: sensor radius for sensors, weapon
    /// range for defenses.
    fn max_range(&self, structure: StructureType) -> f32;

    /// The coverage grid the structure counts towards, if it is a sensor,
    /// jammer, shield or anti-nuke.
    fn coverage_kind(&self, structure: StructureType) -> Option<CoverageKind>;

    /// Whether the structure is a static defense that devalues nearby
    /// chokepoints.
    fn is_defense(&self, _structure: StructureType) -> bool {
        false
    }

    fn footprint(&self, _structure: StructureType) -> Footprint {
        Footprint::square(16.0)
    }
}

/// All per-map services at once.
pub trait MapDataSource: Terrain + ThreatMap + BuildValidity + FactoryProximity {}

impl<T: Terrain + ThreatMap + BuildValidity + FactoryProximity> MapDataSource for T {}
