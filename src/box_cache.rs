//! Box cache over the disk-sum ("sum map") of the choke weights.
//!
//! The placement grid is tiled into `box_size x box_size` boxes (the last
//! row/column of boxes may be narrower). For the active radius `R`, each
//! cell's sum map value is the sum of the weights within `R` cells of it.
//! Sums are recomputed one box at a time, only for boxes that are dirty, and
//! each box remembers its largest sum. That maximum is what lets the site
//! search discard a whole box without looking at its cells.
//!
//! Invalidation is lazy: [`BoxCache::invalidate`] only flips dirty flags,
//! and the work happens on the next read that touches the box.

use crate::error::PlannerError;
use crate::geometry::*;
use crate::grid::GridArray;
use crate::location::*;
use log::*;

/// Cached state of one box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CacheBox {
    origin: Cell,
    width: u32,
    height: u32,
    radius: u32,
    dirty: bool,
    max_value: f32,
    best: Cell,
}

impl CacheBox {
    fn new(origin: Cell, width: u32, height: u32) -> Self {
        CacheBox {
            origin,
            width,
            height,
            radius: 0,
            dirty: true,
            max_value: f32::NEG_INFINITY,
            best: origin,
        }
    }

    /// Top-left cell of the box.
    pub fn origin(&self) -> Cell {
        self.origin
    }

    pub fn rect(&self) -> CellRect {
        CellRect {
            min_x: self.origin.x() as u32,
            min_y: self.origin.y() as u32,
            max_x: self.origin.x() as u32 + self.width - 1,
            max_y: self.origin.y() as u32 + self.height - 1,
        }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        let rect = self.rect();
        (rect.min_x..=rect.max_x).contains(&(cell.x() as u32))
            && (rect.min_y..=rect.max_y).contains(&(cell.y() as u32))
    }

    /// Radius the cached sums were computed for.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Largest sum map value in the box. Only meaningful when clean.
    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    /// First cell (row-major) holding [`max_value`](Self::max_value).
    pub fn best_cell(&self) -> Cell {
        self.best
    }

    /// Squared distance, in cells, from `center` to the nearest cell of the box.
    fn distance_sq_from(&self, center: Cell) -> u64 {
        let rect = self.rect();
        let nearest_x = (center.x() as u32).clamp(rect.min_x, rect.max_x);
        let nearest_y = (center.y() as u32).clamp(rect.min_y, rect.max_y);
        center.distance_sq_to(Cell::from_coords(nearest_x, nearest_y))
    }
}

#[derive(Clone, Debug)]
pub struct BoxCache {
    box_size: u32,
    boxes_wide: u32,
    boxes_high: u32,
    boxes: Vec<CacheBox>,
    radius: u32,
    disk: Disk,
    sums: GridArray<f32>,
    refreshes: u64,
}

impl BoxCache {
    /// Tile `geometry` into boxes. Every box starts dirty with radius 0.
    pub fn new(geometry: &GridGeometry, box_size: u32) -> Result<Self, PlannerError> {
        if box_size == 0 {
            return Err(PlannerError::ZeroBoxSize);
        }

        let width = geometry.width();
        let height = geometry.height();
        let boxes_wide = width.div_ceil(box_size);
        let boxes_high = height.div_ceil(box_size);

        let mut boxes = Vec::with_capacity((boxes_wide * boxes_high) as usize);
        for by in 0..boxes_high {
            for bx in 0..boxes_wide {
                let x0 = bx * box_size;
                let y0 = by * box_size;
                boxes.push(CacheBox::new(
                    Cell::from_coords(x0, y0),
                    box_size.min(width - x0),
                    box_size.min(height - y0),
                ));
            }
        }

        Ok(BoxCache {
            box_size,
            boxes_wide,
            boxes_high,
            boxes,
            radius: 0,
            disk: Disk::new(0),
            sums: geometry.new_array(0.0),
            refreshes: 0,
        })
    }

    pub fn box_size(&self) -> u32 {
        self.box_size
    }

    pub fn boxes_wide(&self) -> u32 {
        self.boxes_wide
    }

    pub fn boxes_high(&self) -> u32 {
        self.boxes_high
    }

    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Number of box recomputations performed so far.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    pub fn dirty_boxes(&self) -> usize {
        self.boxes.iter().filter(|b| b.dirty).count()
    }

    #[inline]
    fn box_index(&self, bx: u32, by: u32) -> usize {
        debug_assert!(bx < self.boxes_wide && by < self.boxes_high);
        (by * self.boxes_wide + bx) as usize
    }

    /// Box coordinates of the box holding `cell`.
    pub fn box_of(&self, cell: Cell) -> (u32, u32) {
        (
            cell.x() as u32 / self.box_size,
            cell.y() as u32 / self.box_size,
        )
    }

    /// Current state of a box without refreshing it.
    pub fn peek_box(&self, bx: u32, by: u32) -> &CacheBox {
        &self.boxes[self.box_index(bx, by)]
    }

    /// Switch the active radius. A different radius dirties every box.
    /// Returns whether the radius changed.
    pub fn set_radius(&mut self, radius: u32) -> bool {
        let radius = radius.min(max_disk_radius(self.sums.width(), self.sums.height()));
        if radius == self.radius {
            return false;
        }

        debug!("box cache radius {} -> {}", self.radius, radius);
        self.radius = radius;
        self.disk = Disk::new(radius);
        self.invalidate_all();
        true
    }

    pub fn invalidate_all(&mut self) {
        for b in self.boxes.iter_mut() {
            b.dirty = true;
        }
    }

    /// Dirty every box holding a cell within `radius + R` of `center`,
    /// where `R` is the active radius: a weight change inside the edit disk
    /// can move any sum up to `R` cells away from it. Returns the number of
    /// boxes that became dirty.
    pub fn invalidate(&mut self, center: Cell, radius: u32) -> usize {
        let reach = radius as u64 + self.radius as u64;
        let reach_sq = reach * reach;

        let cx = center.x() as u64;
        let cy = center.y() as u64;
        let size = self.box_size as u64;
        let bx_start = (cx.saturating_sub(reach) / size) as u32;
        let by_start = (cy.saturating_sub(reach) / size) as u32;
        let bx_end = (((cx + reach) / size) as u32).min(self.boxes_wide - 1);
        let by_end = (((cy + reach) / size) as u32).min(self.boxes_high - 1);

        let mut marked = 0;
        for by in by_start..=by_end {
            for bx in bx_start..=bx_end {
                let index = self.box_index(bx, by);
                let b = &mut self.boxes[index];
                if !b.dirty && b.distance_sq_from(center) <= reach_sq {
                    b.dirty = true;
                    marked += 1;
                }
            }
        }

        trace!(
            "invalidated {} boxes around ({}, {}) reach {}",
            marked,
            center.x(),
            center.y(),
            reach
        );
        marked
    }

    fn refresh_box(&mut self, index: usize, weights: &GridArray<f32>) {
        let mut cache_box = self.boxes[index];
        let mut max_value = f32::NEG_INFINITY;
        let mut best = cache_box.origin;

        for cell in cache_box.rect().cells() {
            let sum = self.disk.sum_at(weights, cell.x() as u32, cell.y() as u32);
            *self.sums.at_mut(cell) = sum;
            if sum > max_value {
                max_value = sum;
                best = cell;
            }
        }

        cache_box.radius = self.radius;
        cache_box.dirty = false;
        cache_box.max_value = max_value;
        cache_box.best = best;
        self.boxes[index] = cache_box;
        self.refreshes += 1;
    }

    /// Recompute every dirty box.
    pub fn refresh(&mut self, weights: &GridArray<f32>) -> usize {
        let mut refreshed = 0;
        for index in 0..self.boxes.len() {
            if self.boxes[index].dirty {
                self.refresh_box(index, weights);
                refreshed += 1;
            }
        }
        if refreshed > 0 {
            trace!("refreshed {} of {} boxes", refreshed, self.boxes.len());
        }
        refreshed
    }

    /// The full sum map for the active radius.
    pub fn sum_map(&mut self, weights: &GridArray<f32>) -> &GridArray<f32> {
        self.refresh(weights);
        &self.sums
    }

    /// The box at `(bx, by)`, recomputed first if it is dirty.
    pub fn best_cache_point(&mut self, bx: u32, by: u32, weights: &GridArray<f32>) -> CacheBox {
        let index = self.box_index(bx, by);
        if self.boxes[index].dirty {
            self.refresh_box(index, weights);
        }
        self.boxes[index]
    }

    /// Sum map value of one cell, refreshing only its box.
    pub fn sum_at(&mut self, cell: Cell, weights: &GridArray<f32>) -> f32 {
        let (bx, by) = self.box_of(cell);
        self.best_cache_point(bx, by, weights);
        *self.sums.at(cell)
    }

    /// Sum map value of a cell whose box is known to be clean.
    #[inline]
    pub fn cached_sum(&self, cell: Cell) -> f32 {
        debug_assert!({
            let (bx, by) = self.box_of(cell);
            !self.peek_box(bx, by).dirty
        });
        *self.sums.at(cell)
    }

    /// Cell with the largest sum on the whole grid (first in box order on ties).
    pub fn best_spot(&mut self, weights: &GridArray<f32>) -> Option<(Cell, f32)> {
        self.refresh(weights);
        let mut best: Option<(Cell, f32)> = None;
        for b in &self.boxes {
            if best.map(|(_, v)| b.max_value > v).unwrap_or(true) {
                best = Some((b.best, b.max_value));
            }
        }
        best
    }
}

/// Reference sum map: the direct O(R²) disk sum at every cell.
pub fn naive_sum_map(weights: &GridArray<f32>, radius: u32) -> GridArray<f32> {
    let disk = Disk::new(radius.min(max_disk_radius(weights.width(), weights.height())));
    let mut sums = GridArray::new(weights.width(), weights.height(), 0.0f32);
    for y in 0..weights.height() {
        for x in 0..weights.width() {
            sums.set(x as usize, y as usize, disk.sum_at(weights, x, y));
        }
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(width: u32, height: u32) -> GridGeometry {
        GridGeometry::new(width, height, 1).unwrap()
    }

    fn ramp(width: u32, height: u32) -> GridArray<f32> {
        let mut weights = GridArray::new(width, height, 0.0f32);
        for y in 0..height {
            for x in 0..width {
                weights.set(x as usize, y as usize, ((x * 7 + y * 13) % 11) as f32 * 0.25);
            }
        }
        weights
    }

    #[test]
    fn boxes_cover_the_whole_grid() {
        let cache = BoxCache::new(&geometry(20, 13), 8).unwrap();
        assert_eq!((cache.boxes_wide(), cache.boxes_high()), (3, 2));
        let edge = cache.peek_box(2, 1);
        assert_eq!(
            edge.rect(),
            CellRect {
                min_x: 16,
                min_y: 8,
                max_x: 19,
                max_y: 12
            }
        );
        let covered: u32 = (0..2)
            .flat_map(|by| (0..3).map(move |bx| (bx, by)))
            .map(|(bx, by)| {
                let r = cache.peek_box(bx, by).rect();
                (r.max_x - r.min_x + 1) * (r.max_y - r.min_y + 1)
            })
            .sum();
        assert_eq!(covered, 20 * 13);
    }

    #[test]
    fn zero_box_size_is_rejected() {
        assert!(matches!(
            BoxCache::new(&geometry(8, 8), 0),
            Err(PlannerError::ZeroBoxSize)
        ));
    }

    #[test]
    fn uniform_weights_sum_to_disk_area() {
        let weights = GridArray::new(16, 16, 1.0f32);
        let mut cache = BoxCache::new(&geometry(16, 16), 4).unwrap();
        cache.set_radius(2);
        let sums = cache.sum_map(&weights);
        assert_eq!(*sums.get(8, 8), 13.0);
        assert_eq!(*sums.get(2, 2), 13.0);
        // Corner loses everything off the grid.
        assert_eq!(*sums.get(0, 0), 6.0);
    }

    #[test]
    fn sum_map_matches_naive_after_radius_change() {
        let weights = ramp(23, 17);
        let mut cache = BoxCache::new(&geometry(23, 17), 5).unwrap();
        for radius in [0u32, 3, 1, 6, 3] {
            cache.set_radius(radius);
            assert_eq!(cache.sum_map(&weights), &naive_sum_map(&weights, radius));
        }
    }

    #[test]
    fn radius_is_capped_to_the_grid() {
        let mut cache = BoxCache::new(&geometry(12, 9), 4).unwrap();
        let weights = GridArray::new(12, 9, 1.0f32);
        assert!(cache.set_radius(u32::MAX));
        assert_eq!(cache.radius(), 21);
        assert!(!cache.set_radius(1_000_000));
        assert!(cache.sum_map(&weights).as_slice().iter().all(|s| *s == 108.0));
        assert_eq!(naive_sum_map(&weights, u32::MAX), *cache.sum_map(&weights));
    }

    #[test]
    fn same_radius_keeps_cache_clean() {
        let weights = ramp(16, 16);
        let mut cache = BoxCache::new(&geometry(16, 16), 4).unwrap();
        assert!(cache.set_radius(3));
        cache.sum_map(&weights);
        assert_eq!(cache.dirty_boxes(), 0);
        assert!(!cache.set_radius(3));
        assert_eq!(cache.dirty_boxes(), 0);
        assert!(cache.set_radius(4));
        assert_eq!(cache.dirty_boxes(), 16);
    }

    #[test]
    fn invalidate_only_touches_boxes_in_reach() {
        let weights = ramp(32, 32);
        let mut cache = BoxCache::new(&geometry(32, 32), 8).unwrap();
        cache.set_radius(2);
        cache.sum_map(&weights);

        // Reach 3 from (1, 1) stays inside the first box.
        let marked = cache.invalidate(Cell::new(1, 1), 1);
        assert_eq!(marked, 1);
        assert!(cache.peek_box(0, 0).is_dirty());
        assert!(!cache.peek_box(1, 0).is_dirty());

        // Reach 4 from (7, 7) touches the three neighbours of the corner.
        cache.sum_map(&weights);
        let marked = cache.invalidate(Cell::new(7, 7), 2);
        assert_eq!(marked, 4);
        assert!(cache.peek_box(1, 1).is_dirty());
        assert!(!cache.peek_box(2, 2).is_dirty());
    }

    #[test]
    fn invalidate_uses_true_distance_not_bounding_square() {
        let weights = ramp(32, 32);
        let mut cache = BoxCache::new(&geometry(32, 32), 8).unwrap();
        cache.set_radius(1);
        cache.sum_map(&weights);

        // (12, 12) to the nearest cell of box (2, 2) at (16, 16) is ~5.66 cells.
        // A reach of 5 is inside the bounding square but outside the circle.
        cache.invalidate(Cell::new(12, 12), 4);
        assert!(!cache.peek_box(2, 2).is_dirty());
        assert!(cache.peek_box(2, 1).is_dirty());
    }

    #[test]
    fn stale_weights_are_picked_up_after_invalidate() {
        let mut weights = ramp(24, 24);
        let mut cache = BoxCache::new(&geometry(24, 24), 6).unwrap();
        cache.set_radius(3);
        cache.sum_map(&weights);

        weights.set(10, 10, 100.0);
        cache.invalidate(Cell::new(10, 10), 0);
        assert_eq!(cache.sum_map(&weights), &naive_sum_map(&weights, 3));
    }

    #[test]
    fn best_cache_point_reports_box_maximum() {
        let mut weights = GridArray::new(16, 16, 0.0f32);
        weights.set(5, 2, 4.0);
        let mut cache = BoxCache::new(&geometry(16, 16), 8).unwrap();
        cache.set_radius(0);

        let b = cache.best_cache_point(0, 0, &weights);
        assert!(!b.is_dirty());
        assert_eq!(b.max_value(), 4.0);
        assert_eq!(b.best_cell(), Cell::new(5, 2));
        assert_eq!(b.radius(), 0);
        // Other boxes were not touched.
        assert!(cache.peek_box(1, 1).is_dirty());
    }

    #[test]
    fn best_spot_finds_global_peak() {
        let mut weights = GridArray::new(20, 20, 0.0f32);
        weights.set(17, 14, 3.0);
        for (x, y) in [(16, 14), (18, 14), (17, 13), (17, 15)] {
            weights.set(x, y, 1.0);
        }
        let mut cache = BoxCache::new(&geometry(20, 20), 8).unwrap();
        cache.set_radius(1);
        let (cell, value) = cache.best_spot(&weights).unwrap();
        assert_eq!(cell, Cell::new(17, 14));
        assert_eq!(value, 7.0);
    }

    #[test]
    fn sum_at_refreshes_a_single_box() {
        let weights = GridArray::new(16, 16, 1.0f32);
        let mut cache = BoxCache::new(&geometry(16, 16), 4).unwrap();
        cache.set_radius(1);
        assert_eq!(cache.sum_at(Cell::new(5, 5), &weights), 5.0);
        assert_eq!(cache.dirty_boxes(), 15);
        assert_eq!(cache.refresh_count(), 1);
    }
}
