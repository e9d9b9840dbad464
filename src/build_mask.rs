//! Reference-counted "do not build here" marks on the placement grid.

use crate::geometry::*;
use crate::grid::GridArray;
use crate::location::*;
use log::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildMask {
    geometry: GridGeometry,
    counts: GridArray<u32>,
}

impl BuildMask {
    pub fn new(geometry: &GridGeometry) -> Self {
        BuildMask {
            geometry: *geometry,
            counts: geometry.new_array(0),
        }
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Mask every placement cell under `footprint` centred at `pos`.
    pub fn mark(&mut self, pos: WorldPos, footprint: Footprint) {
        if let Some(rect) = self.geometry.footprint_rect(pos, footprint) {
            for cell in rect.cells() {
                let count = self.counts.at_mut(cell);
                *count = count.saturating_add(1);
            }
        }
    }

    /// Release a [`mark`](Self::mark) with the same arguments. Never goes
    /// below zero.
    pub fn unmark(&mut self, pos: WorldPos, footprint: Footprint) {
        if let Some(rect) = self.geometry.footprint_rect(pos, footprint) {
            let mut underflows = 0usize;
            for cell in rect.cells() {
                let count = self.counts.at_mut(cell);
                if *count == 0 {
                    underflows += 1;
                } else {
                    *count -= 1;
                }
            }
            if underflows > 0 {
                debug!(
                    "unmark at ({}, {}) released {} cells that were not marked",
                    pos.x, pos.z, underflows
                );
            }
        }
    }

    pub fn count(&self, cell: Cell) -> u32 {
        *self.counts.at(cell)
    }

    #[inline]
    pub fn is_masked(&self, cell: Cell) -> bool {
        *self.counts.at(cell) > 0
    }

    pub fn masked_cells(&self) -> usize {
        self.counts.as_slice().iter().filter(|c| **c > 0).count()
    }
}
