//! Public API for the site planner.
//!
//! `PlannerBuilder` configures a session once per map; the resulting
//! `PlannerSession` owns every grid for one AI side and is fed structure
//! lifecycle events as the game runs.

use crate::build_mask::BuildMask;
use crate::choke::{ChokeLayer, ChokeWeightGrid};
use crate::config::PlannerConfig;
use crate::coverage::*;
use crate::error::PlannerError;
use crate::geometry::*;
use crate::grid::GridArray;
use crate::location::*;
use crate::map_data::*;
use crate::scoring::SiteScore;
use crate::search::*;
use fnv::FnvHashMap;
use log::*;
use serde::{Deserialize, Serialize};

/// Everything a structure contributed to the session when it was added, so
/// its removal undoes exactly that.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedStructure {
    pub structure: StructureType,
    pub pos: WorldPos,
    /// Coverage kind and radius in that kind's cells.
    pub coverage: Option<(CoverageKind, i32)>,
    /// Choke weight disk radius in placement cells, if it is a defense.
    pub defense_radius: Option<i32>,
    pub footprint: Footprint,
}

/// Fluent configuration for a [`PlannerSession`].
pub struct PlannerBuilder {
    map_width: u32,
    map_height: u32,
    config: PlannerConfig,
    formula: Option<Box<dyn SiteScore + Send>>,
    observer: Option<Box<dyn SearchObserver + Send>>,
}

impl PlannerBuilder {
    /// Map size in world units.
    pub fn new(map_width: u32, map_height: u32) -> Self {
        PlannerBuilder {
            map_width,
            map_height,
            config: PlannerConfig::default(),
            formula: None,
            observer: None,
        }
    }

    pub fn config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the configured [`DefenseScore`](crate::scoring::DefenseScore).
    pub fn scoring<S: SiteScore + Send + 'static>(mut self, formula: S) -> Self {
        self.formula = Some(Box::new(formula));
        self
    }

    pub fn observer<O: SearchObserver + Send + 'static>(mut self, observer: O) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Validate the configuration, size every grid and analyze `terrain`.
    pub fn build<T: Terrain + ?Sized>(self, terrain: &T) -> Result<PlannerSession, PlannerError> {
        let config = self.config;
        config.validate()?;

        let geometry = MapGeometry::new(
            self.map_width,
            self.map_height,
            config.coverage_downsample,
            config.placement_downsample,
        )?;
        let choke = ChokeWeightGrid::new(
            &geometry.placement,
            config.cache_box_size,
            config.invalidation_margin,
        )?;

        let mut planner = SitePlanner::new(&geometry.placement, config.cache_box_size, terrain);
        let formula = self
            .formula
            .unwrap_or_else(|| Box::new(config.score) as Box<dyn SiteScore + Send>);
        planner.set_formula(formula);
        if let Some(observer) = self.observer {
            planner.set_observer(observer);
        }

        debug!(
            "planner session for {}x{} map: coverage {}x{}, placement {}x{}, {} cache boxes",
            self.map_width,
            self.map_height,
            geometry.coverage.width(),
            geometry.coverage.height(),
            geometry.placement.width(),
            geometry.placement.height(),
            choke.cache().box_count()
        );

        Ok(PlannerSession {
            coverage: CoverageSet::new(&geometry.coverage),
            mask: BuildMask::new(&geometry.placement),
            geometry,
            choke,
            planner,
            placed: FnvHashMap::default(),
            config,
        })
    }
}

/// Serializable view of a session's incremental state.
#[derive(Serialize)]
pub struct SessionSnapshot<'a> {
    pub geometry: MapGeometry,
    pub coverage: &'a CoverageSet,
    pub mask: &'a BuildMask,
    /// Sorted by unit id.
    pub placed: Vec<(UnitId, PlacedStructure)>,
}

/// All planner state for one AI side.
pub struct PlannerSession {
    config: PlannerConfig,
    geometry: MapGeometry,
    coverage: CoverageSet,
    mask: BuildMask,
    choke: ChokeWeightGrid,
    planner: SitePlanner,
    placed: FnvHashMap<UnitId, PlacedStructure>,
}

impl PlannerSession {
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn geometry(&self) -> &MapGeometry {
        &self.geometry
    }

    pub fn coverage(&self) -> &CoverageSet {
        &self.coverage
    }

    pub fn mask(&self) -> &BuildMask {
        &self.mask
    }

    pub fn choke(&self) -> &ChokeWeightGrid {
        &self.choke
    }

    pub fn choke_mut(&mut self) -> &mut ChokeWeightGrid {
        &mut self.choke
    }

    pub fn planner(&self) -> &SitePlanner {
        &self.planner
    }

    pub fn last_search_stats(&self) -> &SearchStats {
        self.planner.last_stats()
    }

    //
    // Structure lifecycle.
    //

    /// Record a newly built structure and apply its coverage, choke weight
    /// and build mask effects. Returns `false` (and changes nothing) if the
    /// unit is already registered.
    pub fn structure_added<C: UnitCatalog + ?Sized>(
        &mut self,
        unit: UnitId,
        structure: StructureType,
        pos: WorldPos,
        catalog: &C,
    ) -> bool {
        if self.placed.contains_key(&unit) {
            warn!("unit {:?} added twice, ignoring", unit);
            return false;
        }

        let range = catalog.max_range(structure);
        let coverage = catalog.coverage_kind(structure).map(|kind| {
            let radius = self.coverage.get(kind).geometry().radius_cells(range);
            (kind, radius)
        });
        let defense_radius = if catalog.is_defense(structure) {
            Some(self.geometry.placement.radius_cells(range))
        } else {
            None
        };

        let placed = PlacedStructure {
            structure,
            pos,
            coverage,
            defense_radius,
            footprint: catalog.footprint(structure),
        };
        self.apply(&placed);
        self.placed.insert(unit, placed);
        true
    }

    /// Undo everything [`structure_added`](Self::structure_added) did for
    /// `unit`, using the arguments recorded then. Unknown units are ignored.
    pub fn structure_removed(&mut self, unit: UnitId) -> Option<PlacedStructure> {
        match self.placed.remove(&unit) {
            Some(placed) => {
                self.revert(&placed);
                Some(placed)
            }
            None => {
                debug!("unit {:?} removed but was never added", unit);
                None
            }
        }
    }

    pub fn placed(&self, unit: UnitId) -> Option<&PlacedStructure> {
        self.placed.get(&unit)
    }

    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }

    fn apply(&mut self, placed: &PlacedStructure) {
        if let Some((kind, radius)) = placed.coverage {
            self.coverage.get_mut(kind).add(placed.pos, radius);
        }
        if let Some(radius) = placed.defense_radius {
            self.choke.apply_defense_placed(placed.pos, radius);
        }
        self.mask.mark(placed.pos, placed.footprint);
    }

    fn revert(&mut self, placed: &PlacedStructure) {
        if let Some((kind, radius)) = placed.coverage {
            self.coverage.get_mut(kind).remove(placed.pos, radius);
        }
        if let Some(radius) = placed.defense_radius {
            self.choke.apply_defense_removed(placed.pos, radius);
        }
        self.mask.unmark(placed.pos, placed.footprint);
    }

    //
    // Coverage.
    //

    /// Count a footprint of `range` world units for `kind`. Returns the
    /// radius used, in cells of the kind's grid.
    pub fn add_coverage(&mut self, pos: WorldPos, kind: CoverageKind, range: f32) -> i32 {
        let layer = self.coverage.get_mut(kind);
        let radius = layer.geometry().radius_cells(range);
        layer.add(pos, radius);
        radius
    }

    pub fn remove_coverage(&mut self, pos: WorldPos, kind: CoverageKind, range: f32) -> i32 {
        let layer = self.coverage.get_mut(kind);
        let radius = layer.geometry().radius_cells(range);
        layer.remove(pos, radius);
        radius
    }

    pub fn query_coverage<T: Terrain + ?Sized>(
        &self,
        pos: WorldPos,
        kind: CoverageKind,
        terrain: &T,
    ) -> u32 {
        self.coverage.get(kind).query(pos, terrain)
    }

    /// Nearby uncovered spot for another structure of `kind`, searching
    /// `max_dist` world units around the builder.
    pub fn next_coverage_site<T: Terrain + ?Sized>(
        &self,
        builder: WorldPos,
        max_dist: f32,
        kind: CoverageKind,
        terrain: &T,
    ) -> Option<WorldPos> {
        let layer = self.coverage.get(kind);
        let max_dist_cells = layer.geometry().radius_cells(max_dist);
        layer.next_site(builder, max_dist_cells, terrain)
    }

    //
    // Chokepoint weights.
    //

    pub fn apply_defense_placed(&mut self, pos: WorldPos, radius_cells: i32) {
        self.choke.apply_defense_placed(pos, radius_cells);
    }

    pub fn apply_defense_removed(&mut self, pos: WorldPos, radius_cells: i32) {
        self.choke.apply_defense_removed(pos, radius_cells);
    }

    pub fn replace_choke_weights(&mut self, weights: GridArray<f32>) {
        self.choke.replace_weights(weights);
    }

    pub fn rebuild_choke_weights(&mut self, layers: &[ChokeLayer]) {
        self.choke.rebuild_from_layers(layers);
    }

    //
    // Build mask.
    //

    pub fn mark(&mut self, pos: WorldPos, footprint: Footprint) {
        self.mask.mark(pos, footprint);
    }

    pub fn unmark(&mut self, pos: WorldPos, footprint: Footprint) {
        self.mask.unmark(pos, footprint);
    }

    //
    // Site search.
    //

    /// Search radius for `structure`, in placement cells.
    pub fn search_radius<C: UnitCatalog + ?Sized>(
        &self,
        structure: StructureType,
        catalog: &C,
    ) -> i32 {
        self.geometry
            .placement
            .radius_cells(catalog.max_range(structure))
    }

    pub fn find_best_site<D: MapDataSource + ?Sized, C: UnitCatalog + ?Sized>(
        &mut self,
        request: &SiteRequest,
        data: &D,
        catalog: &C,
    ) -> Option<WorldPos> {
        let radius = self.search_radius(request.structure, catalog);
        self.planner.find_best_site(
            request,
            radius,
            &mut self.choke,
            &self.mask,
            &self.coverage,
            data,
        )
    }

    /// [`find_best_site`](Self::find_best_site) without the cache or
    /// pruning. Slow; meant for cross-checking.
    pub fn find_best_site_exhaustive<D: MapDataSource + ?Sized, C: UnitCatalog + ?Sized>(
        &self,
        request: &SiteRequest,
        data: &D,
        catalog: &C,
    ) -> Option<WorldPos> {
        let radius = self.search_radius(request.structure, catalog);
        self.planner.find_best_site_exhaustive(
            request,
            radius,
            &self.choke,
            &self.mask,
            &self.coverage,
            data,
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        let mut placed: Vec<_> = self.placed.iter().map(|(id, p)| (*id, *p)).collect();
        placed.sort_by_key(|(id, _)| id.0);
        SessionSnapshot {
            geometry: self.geometry,
            coverage: &self.coverage,
            mask: &self.mask,
            placed,
        }
    }
}
