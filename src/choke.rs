//! Chokepoint weights and the box cache built on top of them.
//!
//! The weight grid is private: every write goes through a method here that
//! also invalidates the affected cache boxes before returning, so a cached
//! sum can never outlive the weights it was computed from.

use crate::box_cache::*;
use crate::constants::*;
use crate::error::PlannerError;
use crate::geometry::*;
use crate::grid::GridArray;
use crate::location::*;
use log::*;

#[derive(Clone, Debug)]
pub struct ChokeWeightGrid {
    geometry: GridGeometry,
    weights: GridArray<f32>,
    cache: BoxCache,
    invalidation_margin: u32,
}

/// One input map for [`ChokeWeightGrid::rebuild_from_layers`], e.g. the
/// chokepoint density for one movement type, weighted by how much of the
/// enemy army moves that way.
pub struct ChokeLayer<'a> {
    pub values: &'a GridArray<f32>,
    pub share: f32,
}

impl ChokeWeightGrid {
    /// All cells start at weight 1.
    pub fn new(
        geometry: &GridGeometry,
        box_size: u32,
        invalidation_margin: u32,
    ) -> Result<Self, PlannerError> {
        Ok(ChokeWeightGrid {
            geometry: *geometry,
            weights: geometry.new_array(1.0),
            cache: BoxCache::new(geometry, box_size)?,
            invalidation_margin,
        })
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn weights(&self) -> &GridArray<f32> {
        &self.weights
    }

    pub fn weight(&self, cell: Cell) -> f32 {
        *self.weights.at(cell)
    }

    pub fn cache(&self) -> &BoxCache {
        &self.cache
    }

    /// Halve the weights within `radius_cells` of a newly placed defense.
    pub fn apply_defense_placed(&mut self, pos: WorldPos, radius_cells: i32) {
        self.scale_disk(pos, radius_cells, DEFENSE_PLACED_FACTOR);
    }

    /// Undo [`apply_defense_placed`](Self::apply_defense_placed) for a lost defense.
    pub fn apply_defense_removed(&mut self, pos: WorldPos, radius_cells: i32) {
        self.scale_disk(pos, radius_cells, DEFENSE_REMOVED_FACTOR);
    }

    fn scale_disk(&mut self, pos: WorldPos, radius_cells: i32, factor: f32) {
        if radius_cells <= 0 {
            return;
        }

        let radius = self.geometry.clamp_radius(radius_cells as u32);
        let center = self.geometry.clamp_cell(pos);
        let weights = &mut self.weights;
        Disk::new(radius).for_each_cell(center, weights.width(), weights.height(), |cell| {
            *weights.at_mut(cell) *= factor;
        });

        let marked = self
            .cache
            .invalidate(center, radius + self.invalidation_margin);
        debug!(
            "choke weights x{} around ({}, {}) radius {}, {} boxes dirtied",
            factor,
            center.x(),
            center.y(),
            radius,
            marked
        );
    }

    /// Swap in a new weight grid. Negative weights are clamped to zero.
    pub fn replace_weights(&mut self, weights: GridArray<f32>) {
        debug_assert_eq!(weights.width(), self.geometry.width());
        debug_assert_eq!(weights.height(), self.geometry.height());

        self.weights = weights.map(|w| if *w > 0.0 { *w } else { 0.0 });
        self.cache.invalidate_all();
    }

    /// Recompute every weight as `CHOKE_FLOOR + Σ layer · share / Σ share`.
    /// Layers with a zero share contribute nothing.
    pub fn rebuild_from_layers(&mut self, layers: &[ChokeLayer]) {
        let total_share: f32 = layers.iter().map(|l| l.share.max(0.0)).sum();

        let mut weights = self.geometry.new_array(CHOKE_FLOOR);
        if total_share > 0.0 {
            for layer in layers {
                let share = layer.share.max(0.0) / total_share;
                if share == 0.0 {
                    continue;
                }
                debug_assert_eq!(layer.values.width(), weights.width());
                debug_assert_eq!(layer.values.height(), weights.height());
                for ((x, y), value) in layer.values.iter() {
                    *weights.get_mut(x, y) += value.max(0.0) * share;
                }
            }
        }

        debug!(
            "rebuilt choke weights from {} layers (total share {})",
            layers.len(),
            total_share
        );
        self.weights = weights;
        self.cache.invalidate_all();
    }

    pub fn set_radius(&mut self, radius: u32) -> bool {
        self.cache.set_radius(radius)
    }

    pub fn radius(&self) -> u32 {
        self.cache.radius()
    }

    /// Bring every dirty box up to date. Returns the number recomputed.
    pub fn refresh(&mut self) -> usize {
        self.cache.refresh(&self.weights)
    }

    pub fn sum_map(&mut self) -> &GridArray<f32> {
        self.cache.sum_map(&self.weights)
    }

    pub fn sum_at(&mut self, cell: Cell) -> f32 {
        self.cache.sum_at(cell, &self.weights)
    }

    pub fn cached_sum(&self, cell: Cell) -> f32 {
        self.cache.cached_sum(cell)
    }

    pub fn best_cache_point(&mut self, bx: u32, by: u32) -> CacheBox {
        self.cache.best_cache_point(bx, by, &self.weights)
    }

    pub fn best_spot(&mut self) -> Option<(Cell, f32)> {
        self.cache.best_spot(&self.weights)
    }

    /// The reference sum map for the active radius, bypassing the cache.
    pub fn naive_sum_map(&self) -> GridArray<f32> {
        naive_sum_map(&self.weights, self.cache.radius())
    }
}
