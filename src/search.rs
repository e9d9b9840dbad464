//! Best-site search over the cached chokepoint sums.
//!
//! Every cache box gets an optimistic score built from the most favourable
//! value each scoring input can take inside it. A box whose bound cannot
//! beat the best cell found so far is skipped without looking at its cells;
//! the rest are scanned cell by cell. Boxes are visited in row-major order
//! and the best is only replaced on a strictly greater score, so the result
//! is the same as scoring every cell in that order.

use crate::analysis::TerrainAnalysis;
use crate::box_cache::{naive_sum_map, CacheBox};
use crate::build_mask::BuildMask;
use crate::choke::ChokeWeightGrid;
use crate::coverage::*;
use crate::geometry::*;
use crate::location::*;
use crate::map_data::{MapDataSource, Terrain};
use crate::scoring::*;
use bitflags::bitflags;
use fnv::FnvHashMap;
use log::*;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

bitflags! {
    /// Per-cell filters applied by a search.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SiteFilter: u8 {
        /// Skip cells under the build mask.
        const MASK = 1;
        /// Skip cells the request's coverage kind already covers.
        const COVERAGE = 2;
        /// Ask the build-validity service about every candidate.
        const BUILD_VALIDITY = 4;
    }
}

impl Default for SiteFilter {
    fn default() -> Self {
        SiteFilter::all()
    }
}

/// What to place and from where.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SiteRequest {
    pub structure: StructureType,
    pub builder: WorldPos,
    /// Multiplier applied to terrain height. Negative values prefer low ground.
    pub height_weight: f32,
    /// Reject cells this kind already covers.
    pub coverage_filter: Option<CoverageKind>,
    pub filters: SiteFilter,
}

impl SiteRequest {
    pub fn new(structure: StructureType, builder: WorldPos) -> Self {
        SiteRequest {
            structure,
            builder,
            height_weight: 0.0,
            coverage_filter: None,
            filters: SiteFilter::default(),
        }
    }

    pub fn height_weight(mut self, height_weight: f32) -> Self {
        self.height_weight = height_weight;
        self
    }

    pub fn coverage_filter(mut self, kind: CoverageKind) -> Self {
        self.coverage_filter = Some(kind);
        self
    }

    pub fn filters(mut self, filters: SiteFilter) -> Self {
        self.filters = filters;
        self
    }
}

/// Counters for one search.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SearchStats {
    pub radius: u32,
    pub boxes_total: usize,
    pub boxes_pruned: usize,
    pub boxes_scanned: usize,
    /// Boxes whose sums had to be recomputed before the scan.
    pub boxes_refreshed: usize,
    pub cells_evaluated: u64,
    pub cells_rejected: u64,
    pub best_score: Option<f32>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SearchPhase {
    CacheRefresh,
    Seed,
    Scan,
}

/// Hooks called by [`SitePlanner::find_best_site`]. All methods default to
/// doing nothing.
pub trait SearchObserver {
    fn phase_started(&mut self, _phase: SearchPhase) {}

    fn phase_finished(&mut self, _phase: SearchPhase) {}

    fn search_finished(&mut self, _stats: &SearchStats) {}
}

pub struct NullObserver;

impl SearchObserver for NullObserver {}

#[derive(Debug, Default)]
struct PhaseTotals {
    totals: FnvHashMap<SearchPhase, Duration>,
    running: Option<(SearchPhase, Instant)>,
    searches: u64,
}

/// Accumulates wall time per search phase.
///
/// Clones share the same totals, so keep one handle and give a clone to the
/// planner.
#[derive(Clone, Debug, Default)]
pub struct PhaseTimer {
    inner: Arc<Mutex<PhaseTotals>>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        PhaseTimer::default()
    }

    fn with_totals<R>(&self, f: impl FnOnce(&mut PhaseTotals) -> R) -> R {
        let mut totals = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut totals)
    }

    pub fn total(&self, phase: SearchPhase) -> Duration {
        self.with_totals(|t| t.totals.get(&phase).copied().unwrap_or_default())
    }

    /// Number of searches that ran to completion.
    pub fn searches(&self) -> u64 {
        self.with_totals(|t| t.searches)
    }

    pub fn reset(&self) {
        self.with_totals(|t| *t = PhaseTotals::default());
    }
}

impl SearchObserver for PhaseTimer {
    fn phase_started(&mut self, phase: SearchPhase) {
        self.with_totals(|t| t.running = Some((phase, Instant::now())));
    }

    fn phase_finished(&mut self, phase: SearchPhase) {
        self.with_totals(|t| {
            if let Some((running, started)) = t.running.take() {
                if running == phase {
                    *t.totals.entry(phase).or_default() += started.elapsed();
                }
            }
        });
    }

    fn search_finished(&mut self, _stats: &SearchStats) {
        self.with_totals(|t| t.searches += 1);
    }
}

/// Threat relative to the map average, never negative.
fn relative_threat(threat: f32, average: f32) -> f32 {
    let relative = if average > 0.0 {
        threat / average
    } else {
        threat
    };
    relative.max(0.0)
}

/// Everything needed to score a cell or bound a box for one request.
struct ScoreContext<'a, D: ?Sized> {
    geometry: &'a GridGeometry,
    analysis: &'a TerrainAnalysis,
    formula: &'a dyn SiteScore,
    request: &'a SiteRequest,
    data: &'a D,
    builder: WorldPos,
    average_threat: f32,
    lowest_threat: f32,
}

impl<'a, D: MapDataSource + ?Sized> ScoreContext<'a, D> {
    fn new(
        geometry: &'a GridGeometry,
        analysis: &'a TerrainAnalysis,
        formula: &'a dyn SiteScore,
        request: &'a SiteRequest,
        data: &'a D,
    ) -> Self {
        let average_threat = data.average_threat();
        ScoreContext {
            geometry,
            analysis,
            formula,
            request,
            data,
            builder: geometry.clamp_world(request.builder),
            average_threat,
            lowest_threat: relative_threat(data.minimum_threat(), average_threat),
        }
    }

    fn builder_cell(&self) -> Cell {
        self.geometry.clamp_cell(self.builder)
    }

    fn score(&self, cell: Cell, sum: f32) -> f32 {
        let center = self.geometry.cell_center(cell);
        let inputs = ScoreInputs {
            sum,
            distance: self.builder.distance_to(center),
            weighted_height: self.analysis.height(cell) * self.request.height_weight,
            threat: relative_threat(self.data.threat_at(center), self.average_threat),
            factory_distance: self.data.distance_to_nearest(center.x, center.z).max(0.0),
        };
        self.formula.score(&inputs)
    }

    /// No cell of a clean box scores above this.
    fn bound(&self, cache_box: &CacheBox, bx: u32, by: u32) -> f32 {
        let rect = cache_box.rect();
        let low = self
            .geometry
            .cell_center(Cell::from_coords(rect.min_x, rect.min_y));
        let high = self
            .geometry
            .cell_center(Cell::from_coords(rect.max_x, rect.max_y));
        let nearest = WorldPos::new(
            self.builder.x.clamp(low.x, high.x),
            self.builder.z.clamp(low.z, high.z),
        );

        let inputs = ScoreInputs {
            sum: cache_box.max_value(),
            distance: self.builder.distance_to(nearest),
            weighted_height: self
                .analysis
                .best_weighted_height(bx, by, self.request.height_weight),
            threat: self.lowest_threat,
            factory_distance: 0.0,
        };
        self.formula.score(&inputs)
    }

    fn passes_filters(&self, cell: Cell, mask: &BuildMask, coverage: &CoverageSet) -> bool {
        let filters = self.request.filters;
        if filters.contains(SiteFilter::MASK) && mask.is_masked(cell) {
            return false;
        }

        let center = self.geometry.cell_center(cell);
        if filters.contains(SiteFilter::COVERAGE) {
            if let Some(kind) = self.request.coverage_filter {
                if coverage.get(kind).query(center, self.data) > 0 {
                    return false;
                }
            }
        }

        !filters.contains(SiteFilter::BUILD_VALIDITY)
            || self.data.can_build_at(self.request.structure, center)
    }

    /// Score of a cell that passes the filters. NaN scores count as rejected.
    fn evaluate(
        &self,
        cell: Cell,
        sum: f32,
        mask: &BuildMask,
        coverage: &CoverageSet,
        stats: &mut SearchStats,
    ) -> Option<f32> {
        if !self.passes_filters(cell, mask, coverage) {
            stats.cells_rejected += 1;
            return None;
        }
        let score = self.score(cell, sum);
        if score.is_nan() {
            stats.cells_rejected += 1;
            return None;
        }
        stats.cells_evaluated += 1;
        Some(score)
    }
}

fn consider(best: &mut Option<(Cell, f32)>, cell: Cell, score: f32) {
    if best.map(|(_, s)| score > s).unwrap_or(true) {
        *best = Some((cell, score));
    }
}

/// Site search for one session.
pub struct SitePlanner {
    geometry: GridGeometry,
    analysis: TerrainAnalysis,
    formula: Box<dyn SiteScore + Send>,
    observer: Box<dyn SearchObserver + Send>,
    last_stats: SearchStats,
}

impl SitePlanner {
    /// Analyze the terrain under the placement grid. Scores with the
    /// default [`DefenseScore`] and reports to nobody.
    pub fn new<T: Terrain + ?Sized>(geometry: &GridGeometry, box_size: u32, terrain: &T) -> Self {
        SitePlanner {
            geometry: *geometry,
            analysis: TerrainAnalysis::new(geometry, box_size, terrain),
            formula: Box::new(DefenseScore::default()),
            observer: Box::new(NullObserver),
            last_stats: SearchStats::default(),
        }
    }

    pub fn set_formula(&mut self, formula: Box<dyn SiteScore + Send>) {
        self.formula = formula;
    }

    pub fn set_observer(&mut self, observer: Box<dyn SearchObserver + Send>) {
        self.observer = observer;
    }

    pub fn analysis(&self) -> &TerrainAnalysis {
        &self.analysis
    }

    /// Counters of the most recent pruned search.
    pub fn last_stats(&self) -> &SearchStats {
        &self.last_stats
    }

    /// Best site for `request` using the box cache and pruning. Returns the
    /// centre of the winning placement cell, or `None` when the radius is
    /// not positive or no cell passes the filters.
    pub fn find_best_site<D: MapDataSource + ?Sized>(
        &mut self,
        request: &SiteRequest,
        radius_cells: i32,
        choke: &mut ChokeWeightGrid,
        mask: &BuildMask,
        coverage: &CoverageSet,
        data: &D,
    ) -> Option<WorldPos> {
        if radius_cells <= 0 {
            trace!(
                "no site search for structure {:?}: radius {} cells",
                request.structure,
                radius_cells
            );
            return None;
        }

        let radius = self.geometry.clamp_radius(radius_cells as u32);
        let mut stats = SearchStats {
            radius,
            boxes_total: choke.cache().box_count(),
            ..SearchStats::default()
        };

        self.observer.phase_started(SearchPhase::CacheRefresh);
        choke.set_radius(radius);
        stats.boxes_refreshed = choke.refresh();
        self.observer.phase_finished(SearchPhase::CacheRefresh);

        let context = ScoreContext::new(
            &self.geometry,
            &self.analysis,
            &*self.formula,
            request,
            data,
        );

        self.observer.phase_started(SearchPhase::Seed);
        let seed = context.builder_cell();
        let mut best = None;
        if let Some(score) = context.evaluate(seed, choke.cached_sum(seed), mask, coverage, &mut stats)
        {
            consider(&mut best, seed, score);
        }
        self.observer.phase_finished(SearchPhase::Seed);

        self.observer.phase_started(SearchPhase::Scan);
        let cache = choke.cache();
        for by in 0..cache.boxes_high() {
            for bx in 0..cache.boxes_wide() {
                let cache_box = cache.peek_box(bx, by);
                if let Some((_, best_score)) = best {
                    if context.bound(cache_box, bx, by) <= best_score {
                        stats.boxes_pruned += 1;
                        continue;
                    }
                }

                stats.boxes_scanned += 1;
                for cell in cache_box.rect().cells() {
                    if cell == seed {
                        continue;
                    }
                    if let Some(score) =
                        context.evaluate(cell, cache.cached_sum(cell), mask, coverage, &mut stats)
                    {
                        consider(&mut best, cell, score);
                    }
                }
            }
        }
        self.observer.phase_finished(SearchPhase::Scan);

        stats.best_score = best.map(|(_, score)| score);
        debug!(
            "site search r={}: {}/{} boxes pruned, {} refreshed, {} cells scored, {} rejected, best {:?}",
            stats.radius,
            stats.boxes_pruned,
            stats.boxes_total,
            stats.boxes_refreshed,
            stats.cells_evaluated,
            stats.cells_rejected,
            best
        );
        self.observer.search_finished(&stats);
        self.last_stats = stats;

        best.map(|(cell, _)| self.geometry.cell_center(cell))
    }

    /// Reference search: scores every cell from a freshly computed sum map,
    /// in the same order as [`find_best_site`](Self::find_best_site), and
    /// leaves the cache alone.
    pub fn find_best_site_exhaustive<D: MapDataSource + ?Sized>(
        &self,
        request: &SiteRequest,
        radius_cells: i32,
        choke: &ChokeWeightGrid,
        mask: &BuildMask,
        coverage: &CoverageSet,
        data: &D,
    ) -> Option<WorldPos> {
        if radius_cells <= 0 {
            return None;
        }

        let sums = naive_sum_map(choke.weights(), self.geometry.clamp_radius(radius_cells as u32));
        let context = ScoreContext::new(
            &self.geometry,
            &self.analysis,
            &*self.formula,
            request,
            data,
        );
        let mut stats = SearchStats::default();

        let seed = context.builder_cell();
        let mut best = None;
        if let Some(score) = context.evaluate(seed, *sums.at(seed), mask, coverage, &mut stats) {
            consider(&mut best, seed, score);
        }

        let cache = choke.cache();
        for by in 0..cache.boxes_high() {
            for bx in 0..cache.boxes_wide() {
                for cell in cache.peek_box(bx, by).rect().cells() {
                    if cell == seed {
                        continue;
                    }
                    if let Some(score) =
                        context.evaluate(cell, *sums.at(cell), mask, coverage, &mut stats)
                    {
                        consider(&mut best, cell, score);
                    }
                }
            }
        }

        best.map(|(cell, _)| self.geometry.cell_center(cell))
    }

    /// Exact, unfiltered score of one cell for `request` given its sum.
    pub fn cell_score<D: MapDataSource + ?Sized>(
        &self,
        request: &SiteRequest,
        cell: Cell,
        sum: f32,
        data: &D,
    ) -> f32 {
        ScoreContext::new(&self.geometry, &self.analysis, &*self.formula, request, data)
            .score(cell, sum)
    }

    /// Optimistic score of box `(bx, by)`. The box must be clean.
    pub fn box_bound<D: MapDataSource + ?Sized>(
        &self,
        request: &SiteRequest,
        choke: &ChokeWeightGrid,
        bx: u32,
        by: u32,
        data: &D,
    ) -> f32 {
        let cache_box = choke.cache().peek_box(bx, by);
        debug_assert!(!cache_box.is_dirty());
        ScoreContext::new(&self.geometry, &self.analysis, &*self.formula, request, data)
            .bound(cache_box, bx, by)
    }
}
