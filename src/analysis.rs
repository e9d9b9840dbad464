//! One-time terrain pre-computation for the site search.
//!
//! Terrain does not change during a session, so the height of every
//! placement cell and the height range of every cache box are sampled once
//! up front instead of asking the terrain service on every search.

use crate::geometry::*;
use crate::grid::GridArray;
use crate::location::*;
use crate::map_data::Terrain;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TerrainAnalysis {
    /// Height at the centre of each placement cell.
    heights: GridArray<f32>,
    box_size: u32,
    box_min: GridArray<f32>,
    box_max: GridArray<f32>,
}

impl TerrainAnalysis {
    pub fn new<T: Terrain + ?Sized>(geometry: &GridGeometry, box_size: u32, terrain: &T) -> Self {
        let box_size = box_size.max(1);
        let heights = {
            let mut heights = geometry.new_array(0.0f32);
            for y in 0..geometry.height() {
                for x in 0..geometry.width() {
                    let center = geometry.cell_center(Cell::from_coords(x, y));
                    heights.set(x as usize, y as usize, terrain.height_at_pos(center));
                }
            }
            heights
        };

        let boxes_wide = geometry.width().div_ceil(box_size);
        let boxes_high = geometry.height().div_ceil(box_size);
        let mut box_min = GridArray::new(boxes_wide, boxes_high, f32::INFINITY);
        let mut box_max = GridArray::new(boxes_wide, boxes_high, f32::NEG_INFINITY);

        for ((x, y), height) in heights.iter() {
            let bx = x / box_size as usize;
            let by = y / box_size as usize;
            let low = box_min.get_mut(bx, by);
            *low = low.min(*height);
            let high = box_max.get_mut(bx, by);
            *high = high.max(*height);
        }

        TerrainAnalysis {
            heights,
            box_size,
            box_min,
            box_max,
        }
    }

    pub fn box_size(&self) -> u32 {
        self.box_size
    }

    pub fn heights(&self) -> &GridArray<f32> {
        &self.heights
    }

    #[inline]
    pub fn height(&self, cell: Cell) -> f32 {
        *self.heights.at(cell)
    }

    /// `(lowest, highest)` cell height inside box `(bx, by)`.
    pub fn box_height_range(&self, bx: u32, by: u32) -> (f32, f32) {
        (
            *self.box_min.get(bx as usize, by as usize),
            *self.box_max.get(bx as usize, by as usize),
        )
    }

    /// Largest `height * weight` any cell in the box can reach.
    pub fn best_weighted_height(&self, bx: u32, by: u32, weight: f32) -> f32 {
        let (low, high) = self.box_height_range(bx, by);
        if weight >= 0.0 {
            high * weight
        } else {
            low * weight
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slope;

    impl Terrain for Slope {
        fn height_at(&self, x: f32, z: f32) -> f32 {
            x - z
        }
    }

    #[test]
    fn box_ranges_bound_every_cell() {
        let geometry = GridGeometry::new(100, 60, 4).unwrap();
        let analysis = TerrainAnalysis::new(&geometry, 8, &Slope);

        for ((x, y), height) in analysis.heights().iter() {
            let (bx, by) = (x as u32 / 8, y as u32 / 8);
            let (low, high) = analysis.box_height_range(bx, by);
            assert!(low <= *height && *height <= high);
            for weight in [-0.5f32, 0.0, 0.2, 1.0] {
                assert!(weight * height <= analysis.best_weighted_height(bx, by, weight));
            }
        }
    }

    #[test]
    fn heights_are_sampled_at_cell_centres() {
        let geometry = GridGeometry::new(64, 64, 4).unwrap();
        let analysis = TerrainAnalysis::new(&geometry, 8, &Slope);
        assert_eq!(analysis.height(Cell::new(3, 1)), 14.0 - 6.0);
        assert_eq!(analysis.box_height_range(0, 0), (2.0 - 30.0, 30.0 - 2.0));
    }
}
