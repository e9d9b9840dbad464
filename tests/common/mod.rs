#![allow(dead_code)]

use rts_site_planner::*;

pub const RADAR: StructureType = StructureType(1);
pub const SONAR: StructureType = StructureType(2);
pub const TURRET: StructureType = StructureType(3);
pub const ARTILLERY: StructureType = StructureType(4);
pub const ANTI_NUKE: StructureType = StructureType(5);
/// Range too short to span a single placement cell.
pub const MINE: StructureType = StructureType(6);
/// Radar defense whose catalog range is unbounded.
pub const BEACON: StructureType = StructureType(7);

/// Rolling hills with a sea along the bottom edge, threat bands, and a
/// sprinkling of unbuildable cells. Everything is a pure function of the
/// position so two instances always agree.
pub struct TestWorld {
    pub width: f32,
    pub height: f32,
    pub factory: WorldPos,
}

impl TestWorld {
    pub fn new(width: u32, height: u32) -> Self {
        TestWorld {
            width: width as f32,
            height: height as f32,
            factory: WorldPos::new(width as f32 * 0.25, height as f32 * 0.25),
        }
    }
}

impl Terrain for TestWorld {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        let hills = (x * 0.02).sin() * 30.0 + (z * 0.035).cos() * 20.0;
        if z > self.height * 0.8 {
            hills - 80.0
        } else {
            hills
        }
    }
}

impl ThreatMap for TestWorld {
    fn threat_at(&self, pos: WorldPos) -> f32 {
        1.0 + ((pos.x as u32 / 64 + pos.z as u32 / 48) % 5) as f32
    }

    fn average_threat(&self) -> f32 {
        3.0
    }

    fn minimum_threat(&self) -> f32 {
        1.0
    }
}

impl BuildValidity for TestWorld {
    fn can_build_at(&self, _structure: StructureType, pos: WorldPos) -> bool {
        let cx = pos.x as u32 / 16;
        let cz = pos.z as u32 / 16;
        (cx * 7 + cz * 3) % 11 != 0
    }
}

impl FactoryProximity for TestWorld {
    fn distance_to_nearest(&self, x: f32, z: f32) -> f32 {
        self.factory.distance_to(WorldPos::new(x, z))
    }
}

pub struct TestCatalog;

impl UnitCatalog for TestCatalog {
    fn max_range(&self, structure: StructureType) -> f32 {
        match structure {
            RADAR => 96.0,
            SONAR => 80.0,
            TURRET => 64.0,
            ARTILLERY => 120.0,
            ANTI_NUKE => 400.0,
            MINE => 6.0,
            BEACON => f32::INFINITY,
            _ => 0.0,
        }
    }

    fn coverage_kind(&self, structure: StructureType) -> Option<CoverageKind> {
        match structure {
            RADAR | BEACON => Some(CoverageKind::Radar),
            SONAR => Some(CoverageKind::Sonar),
            ANTI_NUKE => Some(CoverageKind::AntiNuke),
            _ => None,
        }
    }

    fn is_defense(&self, structure: StructureType) -> bool {
        matches!(structure, TURRET | ARTILLERY | MINE | BEACON)
    }

    fn footprint(&self, structure: StructureType) -> Footprint {
        match structure {
            ANTI_NUKE => Footprint::new(48.0, 32.0),
            _ => Footprint::square(16.0),
        }
    }
}

pub fn small_config() -> PlannerConfig {
    PlannerConfig {
        coverage_downsample: 8,
        placement_downsample: 8,
        cache_box_size: 6,
        ..PlannerConfig::default()
    }
}

pub fn session(width: u32, height: u32) -> (PlannerSession, TestWorld) {
    let world = TestWorld::new(width, height);
    let session = PlannerBuilder::new(width, height)
        .config(small_config())
        .build(&world)
        .expect("valid test configuration");
    (session, world)
}
