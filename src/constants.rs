/// World units per coverage cell for the base coverage grid.
pub const DEFAULT_COVERAGE_DOWNSAMPLE: u32 = 8;

/// World units per placement cell (the grid the spot finder works on).
pub const DEFAULT_PLACEMENT_DOWNSAMPLE: u32 = 16;

/// Side length, in placement cells, of one cache box.
pub const DEFAULT_CACHE_BOX_SIZE: u32 = 8;

/// Extra cells added to a defense radius when invalidating the box cache,
/// covering the rounding of world radii down to whole cells.
pub const DEFAULT_INVALIDATION_MARGIN: u32 = 1;

/// Largest number of cells a grid may have along either axis. Cell
/// coordinates are packed into 16 bits each.
pub const MAX_GRID_EXTENT: u32 = u16::MAX as u32 + 1;

/// Terrain at or below this height counts as water.
pub const WATER_LEVEL: f32 = 0.0;

/// Returned by coverage queries for points a coverage kind can never cover
/// (off the map, or dry land for water-only sensors).
pub const UNCOVERABLE: u32 = u32::MAX;

/// Choke weights are multiplied by this inside the disk of a new defense.
pub const DEFENSE_PLACED_FACTOR: f32 = 0.5;

/// Exact inverse of [`DEFENSE_PLACED_FACTOR`].
pub const DEFENSE_REMOVED_FACTOR: f32 = 2.0;

/// Baseline choke weight every cell keeps after a rebuild from layers, so
/// no cell is ever worth exactly nothing.
pub const CHOKE_FLOOR: f32 = 0.00001;

/// Default penalty per world unit of distance between builder and site.
pub const DEFAULT_DISTANCE_WEIGHT: f32 = 0.001;
