//! Per-kind coverage counting for sensors, jammers, shields and anti-nukes.
//!
//! Each kind gets its own coarse grid of counters. A counter is the number
//! of live structures of that kind whose footprint disk covers the cell, so
//! a zero counter means "nothing of this kind sees here yet".

use crate::constants::*;
use crate::geometry::*;
use crate::grid::GridArray;
use crate::location::*;
use crate::map_data::Terrain;
use log::*;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum CoverageKind {
    Radar,
    Sonar,
    RJammer,
    SJammer,
    AntiNuke,
    Shield,
}

/// Static properties of a coverage kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KindTraits {
    pub name: &'static str,
    /// Coverage cells of this kind are this many base coverage cells wide.
    pub downsample_multiplier: u32,
    /// The structure only works (and can only be placed) in water.
    pub water_only: bool,
}

const KIND_TABLE: [KindTraits; 6] = [
    KindTraits {
        name: "radar",
        downsample_multiplier: 1,
        water_only: false,
    },
    KindTraits {
        name: "sonar",
        downsample_multiplier: 1,
        water_only: true,
    },
    KindTraits {
        name: "radar_jammer",
        downsample_multiplier: 1,
        water_only: false,
    },
    KindTraits {
        name: "sonar_jammer",
        downsample_multiplier: 1,
        water_only: true,
    },
    // Anti-nuke ranges are an order of magnitude larger than sensor ranges.
    KindTraits {
        name: "anti_nuke",
        downsample_multiplier: 2,
        water_only: false,
    },
    KindTraits {
        name: "shield",
        downsample_multiplier: 1,
        water_only: false,
    },
];

impl CoverageKind {
    pub const ALL: [CoverageKind; 6] = [
        CoverageKind::Radar,
        CoverageKind::Sonar,
        CoverageKind::RJammer,
        CoverageKind::SJammer,
        CoverageKind::AntiNuke,
        CoverageKind::Shield,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn traits(self) -> &'static KindTraits {
        &KIND_TABLE[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.traits().name
    }

    pub fn is_water_only(self) -> bool {
        self.traits().water_only
    }
}

/// Coverage counters for one kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoverageAccumulator {
    kind: CoverageKind,
    geometry: GridGeometry,
    counts: GridArray<u32>,
}

impl CoverageAccumulator {
    /// Create an empty accumulator, sizing its grid from the base coverage
    /// geometry and the kind's downsample multiplier.
    pub fn new(kind: CoverageKind, base: &GridGeometry) -> Self {
        let geometry = base.coarsened(kind.traits().downsample_multiplier);
        CoverageAccumulator {
            kind,
            geometry,
            counts: geometry.new_array(0),
        }
    }

    pub fn kind(&self) -> CoverageKind {
        self.kind
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn counts(&self) -> &GridArray<u32> {
        &self.counts
    }

    /// Counter of a single cell.
    pub fn count(&self, cell: Cell) -> u32 {
        *self.counts.at(cell)
    }

    /// Count one more structure covering the disk around `center`.
    pub fn add(&mut self, center: WorldPos, radius_cells: i32) {
        if radius_cells <= 0 {
            return;
        }
        let disk = Disk::new(self.geometry.clamp_radius(radius_cells as u32));
        let center = self.geometry.clamp_cell(center);
        let counts = &mut self.counts;
        disk.for_each_cell(center, counts.width(), counts.height(), |cell| {
            let count = counts.at_mut(cell);
            *count = count.saturating_add(1);
        });
    }

    /// Undo an [`add`](Self::add) with the same arguments. Counters that are
    /// already zero stay at zero.
    pub fn remove(&mut self, center: WorldPos, radius_cells: i32) {
        if radius_cells <= 0 {
            return;
        }
        let disk = Disk::new(self.geometry.clamp_radius(radius_cells as u32));
        let center = self.geometry.clamp_cell(center);
        let counts = &mut self.counts;
        let mut underflows = 0usize;
        disk.for_each_cell(center, counts.width(), counts.height(), |cell| {
            let count = counts.at_mut(cell);
            if *count == 0 {
                underflows += 1;
            } else {
                *count -= 1;
            }
        });

        if underflows > 0 {
            warn!(
                "{} coverage: remove at ({}, {}) radius {} hit {} uncovered cells",
                self.kind.name(),
                center.x(),
                center.y(),
                radius_cells,
                underflows
            );
        }
    }

    /// Whether this kind can exist at a point with the given terrain height.
    pub fn accepts_height(&self, height: f32) -> bool {
        !self.kind.is_water_only() || height <= WATER_LEVEL
    }

    /// Coverage counter at `pos`. Returns [`UNCOVERABLE`] off the map, and
    /// on dry land for water-only kinds.
    pub fn query<T: Terrain + ?Sized>(&self, pos: WorldPos, terrain: &T) -> u32 {
        let cell = match self.geometry.cell_of(pos) {
            Some(cell) => cell,
            None => return UNCOVERABLE,
        };

        if self.kind.is_water_only() && !self.accepts_height(terrain.height_at_pos(pos)) {
            return UNCOVERABLE;
        }

        self.count(cell)
    }

    /// Best uncovered cell within `max_dist_cells` (square search) of the
    /// builder, scored `height / 10 - manhattan_distance / 2`. Returns
    /// `None` when the best score is not positive.
    ///
    /// Water-only kinds (sonar, sonar jammer) are scored by depth instead,
    /// `-height / 10 - manhattan_distance / 2`, so deeper water wins. Their
    /// candidates all sit at or below the water level, where the land
    /// formula could never turn positive.
    pub fn next_site<T: Terrain + ?Sized>(
        &self,
        builder: WorldPos,
        max_dist_cells: i32,
        terrain: &T,
    ) -> Option<WorldPos> {
        let builder_cell = self.geometry.clamp_cell(builder);
        let rect = self
            .geometry
            .rect_around(builder_cell, max_dist_cells.max(0) as u32);

        let mut best: Option<(Cell, f32)> = None;

        for cell in rect.cells() {
            if self.count(cell) != 0 {
                continue;
            }

            let center = self.geometry.cell_center(cell);
            let height = terrain.height_at_pos(center);
            if !self.accepts_height(height) {
                continue;
            }

            let elevation = if self.kind.is_water_only() {
                -height
            } else {
                height
            };
            let score = elevation / 10.0 - builder_cell.manhattan_to(cell) as f32 / 2.0;

            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((cell, score));
            }
        }

        match best {
            Some((cell, score)) if score > 0.0 => {
                trace!(
                    "{} next site ({}, {}) score {}",
                    self.kind.name(),
                    cell.x(),
                    cell.y(),
                    score
                );
                Some(self.geometry.cell_center(cell))
            }
            _ => None,
        }
    }
}

/// One accumulator per coverage kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoverageSet {
    layers: Vec<CoverageAccumulator>,
}

impl CoverageSet {
    pub fn new(base: &GridGeometry) -> Self {
        CoverageSet {
            layers: CoverageKind::ALL
                .iter()
                .map(|kind| CoverageAccumulator::new(*kind, base))
                .collect(),
        }
    }

    pub fn get(&self, kind: CoverageKind) -> &CoverageAccumulator {
        &self.layers[kind.index()]
    }

    pub fn get_mut(&mut self, kind: CoverageKind) -> &mut CoverageAccumulator {
        &mut self.layers[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CoverageAccumulator> {
        self.layers.iter()
    }
}
