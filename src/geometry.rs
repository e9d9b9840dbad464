//! World/grid coordinate conversion and the integer disk shape.
//!
//! The map is measured in world units. Each coarse grid divides it into
//! square cells of `downsample` world units; a partial cell at the far edge
//! still counts, so the cells always cover the whole map.

use crate::constants::MAX_GRID_EXTENT;
use crate::error::PlannerError;
use crate::grid::GridArray;
use crate::location::*;
use serde::{Deserialize, Serialize};

/// One coarse grid laid over the map.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridGeometry {
    map_width: u32,
    map_height: u32,
    downsample: u32,
    width: u32,
    height: u32,
}

/// Inclusive cell rectangle, already clipped to a grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl CellRect {
    pub fn cells(self) -> impl Iterator<Item = Cell> {
        itertools::iproduct!(self.min_y..=self.max_y, self.min_x..=self.max_x)
            .map(|(y, x)| Cell::from_coords(x, y))
    }
}

impl GridGeometry {
    pub fn new(map_width: u32, map_height: u32, downsample: u32) -> Result<Self, PlannerError> {
        if map_width == 0 || map_height == 0 {
            return Err(PlannerError::EmptyMap {
                width: map_width,
                height: map_height,
            });
        }
        if downsample == 0 {
            return Err(PlannerError::ZeroDownsample { grid: "grid" });
        }

        let width = map_width.div_ceil(downsample);
        let height = map_height.div_ceil(downsample);
        if width > MAX_GRID_EXTENT || height > MAX_GRID_EXTENT {
            return Err(PlannerError::GridTooLarge {
                width,
                height,
                max: MAX_GRID_EXTENT,
            });
        }

        Ok(GridGeometry {
            map_width,
            map_height,
            downsample,
            width,
            height,
        })
    }

    /// The same map seen through cells `multiplier` times larger.
    pub fn coarsened(&self, multiplier: u32) -> Self {
        let downsample = self.downsample * multiplier.max(1);
        GridGeometry {
            downsample,
            width: self.map_width.div_ceil(downsample),
            height: self.map_height.div_ceil(downsample),
            ..*self
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn downsample(&self) -> u32 {
        self.downsample
    }

    pub fn map_width(&self) -> u32 {
        self.map_width
    }

    pub fn map_height(&self) -> u32 {
        self.map_height
    }

    /// World units per cell.
    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.downsample as f32
    }

    pub fn new_array<T: Clone>(&self, initial: T) -> GridArray<T> {
        GridArray::new(self.width, self.height, initial)
    }

    pub fn contains_world(&self, pos: WorldPos) -> bool {
        pos.x >= 0.0
            && pos.z >= 0.0
            && pos.x < self.map_width as f32
            && pos.z < self.map_height as f32
    }

    /// The cell containing `pos`, or `None` off the map.
    pub fn cell_of(&self, pos: WorldPos) -> Option<Cell> {
        if self.contains_world(pos) {
            Some(self.clamp_cell(pos))
        } else {
            None
        }
    }

    /// The cell containing `pos`, with off-map positions moved to the
    /// nearest edge cell.
    pub fn clamp_cell(&self, pos: WorldPos) -> Cell {
        let cell_size = self.cell_size();
        let x = ((pos.x / cell_size).floor() as i64).clamp(0, self.width as i64 - 1);
        let y = ((pos.z / cell_size).floor() as i64).clamp(0, self.height as i64 - 1);
        Cell::from_coords(x as u32, y as u32)
    }

    /// Clamp a world position into the map rectangle.
    pub fn clamp_world(&self, pos: WorldPos) -> WorldPos {
        let x = if pos.x.is_nan() { 0.0 } else { pos.x };
        let z = if pos.z.is_nan() { 0.0 } else { pos.z };
        WorldPos::new(
            x.clamp(0.0, self.map_width as f32),
            z.clamp(0.0, self.map_height as f32),
        )
    }

    pub fn cell_center(&self, cell: Cell) -> WorldPos {
        let cell_size = self.cell_size();
        WorldPos::new(
            (cell.x() as f32 + 0.5) * cell_size,
            (cell.y() as f32 + 0.5) * cell_size,
        )
    }

    /// Square of cells within `radius` cells of `center` on both axes,
    /// clipped to the grid. Each axis is clipped against its own extent.
    pub fn rect_around(&self, center: Cell, radius: u32) -> CellRect {
        let r = radius as i64;
        let cx = center.x() as i64;
        let cy = center.y() as i64;
        CellRect {
            min_x: (cx - r).max(0) as u32,
            min_y: (cy - r).max(0) as u32,
            max_x: (cx + r).min(self.width as i64 - 1) as u32,
            max_y: (cy + r).min(self.height as i64 - 1) as u32,
        }
    }

    /// Cells overlapped by a footprint rectangle centred at `pos`, or `None`
    /// when the rectangle misses the map entirely.
    pub fn footprint_rect(&self, pos: WorldPos, footprint: Footprint) -> Option<CellRect> {
        let half_w = footprint.width.max(0.0) * 0.5;
        let half_d = footprint.depth.max(0.0) * 0.5;
        let cell_size = self.cell_size();

        let min_x = ((pos.x - half_w) / cell_size).floor() as i64;
        let min_y = ((pos.z - half_d) / cell_size).floor() as i64;
        // A rectangle ending exactly on a cell edge does not reach into the next cell.
        let max_x = (((pos.x + half_w) / cell_size).ceil() as i64 - 1).max(min_x);
        let max_y = (((pos.z + half_d) / cell_size).ceil() as i64 - 1).max(min_y);

        if max_x < 0 || max_y < 0 || min_x >= self.width as i64 || min_y >= self.height as i64 {
            return None;
        }

        Some(CellRect {
            min_x: min_x.max(0) as u32,
            min_y: min_y.max(0) as u32,
            max_x: max_x.min(self.width as i64 - 1) as u32,
            max_y: max_y.min(self.height as i64 - 1) as u32,
        })
    }

    /// Convert a world-unit radius to whole cells, rounding down and capped
    /// at [`max_radius`](Self::max_radius).
    pub fn radius_cells(&self, world_radius: f32) -> i32 {
        if world_radius.is_nan() || world_radius <= 0.0 {
            return 0;
        }
        (world_radius / self.cell_size())
            .floor()
            .min(self.max_radius() as f32) as i32
    }

    /// Smallest radius whose disk reaches every cell from any centre.
    pub fn max_radius(&self) -> u32 {
        max_disk_radius(self.width, self.height)
    }

    pub fn clamp_radius(&self, radius: u32) -> u32 {
        radius.min(self.max_radius())
    }
}

/// The coverage grid and placement grid of one map.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapGeometry {
    pub coverage: GridGeometry,
    pub placement: GridGeometry,
}

impl MapGeometry {
    pub fn new(
        map_width: u32,
        map_height: u32,
        coverage_downsample: u32,
        placement_downsample: u32,
    ) -> Result<Self, PlannerError> {
        if coverage_downsample == 0 {
            return Err(PlannerError::ZeroDownsample { grid: "coverage" });
        }
        if placement_downsample == 0 {
            return Err(PlannerError::ZeroDownsample { grid: "placement" });
        }

        Ok(MapGeometry {
            coverage: GridGeometry::new(map_width, map_height, coverage_downsample)?,
            placement: GridGeometry::new(map_width, map_height, placement_downsample)?,
        })
    }
}

/// Radius past which a disk on a `width` x `height` grid reaches no further
/// cells. No two cells are more than `width + height` apart.
pub fn max_disk_radius(width: u32, height: u32) -> u32 {
    width.saturating_add(height)
}

/// Integer disk: every `(dx, dy)` with `dx² + dy² <= r²`.
///
/// Stored as the half-width of each row, so sweeps walk whole row spans.
/// All circular footprints in the crate go through this type, which keeps
/// add and remove of the same footprint touching identical cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Disk {
    radius: u32,
    extents: Vec<u32>,
}

impl Disk {
    pub fn new(radius: u32) -> Self {
        let r = radius as i64;
        let extents = (-r..=r)
            .map(|dy| integer_sqrt((r * r - dy * dy) as u64) as u32)
            .collect();
        Disk { radius, extents }
    }

    #[inline]
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Half-width of the row at vertical offset `dy`.
    #[inline]
    pub fn extent(&self, dy: i64) -> u32 {
        self.extents[(dy + self.radius as i64) as usize]
    }

    /// `(dy, half_width)` for each row, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = (i64, u32)> + '_ {
        let r = self.radius as i64;
        self.extents
            .iter()
            .enumerate()
            .map(move |(i, e)| (i as i64 - r, *e))
    }

    /// Number of cells in an unclipped disk.
    pub fn area(&self) -> usize {
        self.extents.iter().map(|e| (2 * e + 1) as usize).sum()
    }

    /// Visit every grid cell of the disk centred at `center`, clipped to a
    /// `width` x `height` grid, in row-major order.
    pub fn for_each_cell<F: FnMut(Cell)>(&self, center: Cell, width: u32, height: u32, mut f: F) {
        let r = self.radius as i64;
        let cx = center.x() as i64;
        let cy = center.y() as i64;
        let first = (-r).max(-cy);
        let last = r.min(height as i64 - 1 - cy);
        for dy in first..=last {
            let extent = self.extent(dy);
            let y = cy + dy;
            let x_start = (cx - extent as i64).max(0);
            let x_end = (cx + extent as i64).min(width as i64 - 1);
            for x in x_start..=x_end {
                f(Cell::from_coords(x as u32, y as u32));
            }
        }
    }

    /// Direct sum of `values` over the disk centred at `(x, y)`.
    pub fn sum_at(&self, values: &GridArray<f32>, x: u32, y: u32) -> f32 {
        let mut total = 0.0f32;
        self.for_each_cell(Cell::from_coords(x, y), values.width(), values.height(), |c| {
            total += *values.at(c);
        });
        total
    }
}

fn integer_sqrt(value: u64) -> u64 {
    let mut root = (value as f64).sqrt() as u64;
    while root * root > value {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= value {
        root += 1;
    }
    root
}
