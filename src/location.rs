use serde::*;

/// Integer cell coordinate on one of the coarse grids.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct Cell {
    packed: u32,
}

impl Cell {
    pub fn new(x: u16, y: u16) -> Self {
        Cell {
            packed: ((x as u32) << 16) | (y as u32),
        }
    }

    pub fn from_coords(x: u32, y: u32) -> Self {
        Cell::new(x as u16, y as u16)
    }

    #[inline]
    pub fn x(self) -> u16 {
        ((self.packed >> 16) & 0xFFFF) as u16
    }

    #[inline]
    pub fn y(self) -> u16 {
        (self.packed & 0xFFFF) as u16
    }

    #[inline]
    pub fn packed_repr(self) -> u32 {
        self.packed
    }

    #[inline]
    pub fn from_packed(packed: u32) -> Self {
        Cell { packed }
    }

    /// Squared euclidean distance in cells.
    pub fn distance_sq_to(self, other: Self) -> u64 {
        let dx = self.x() as i64 - other.x() as i64;
        let dy = self.y() as i64 - other.y() as i64;

        (dx * dx + dy * dy) as u64
    }

    pub fn manhattan_to(self, other: Self) -> u32 {
        let dx = (self.x() as i32 - other.x() as i32).unsigned_abs();
        let dy = (self.y() as i32 - other.y() as i32).unsigned_abs();

        dx + dy
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.packed_repr().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u32::deserialize(deserializer).map(Cell::from_packed)
    }
}

/// A point on the map plane, in world units. `z` is the second horizontal
/// axis; elevation is always looked up through the terrain service.
#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub z: f32,
}

impl WorldPos {
    pub fn new(x: f32, z: f32) -> Self {
        WorldPos { x, z }
    }

    pub fn distance_to(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;

        (dx * dx + dz * dz).sqrt()
    }
}

/// Size of a structure on the ground, in world units.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Footprint {
    pub width: f32,
    pub depth: f32,
}

impl Footprint {
    pub fn new(width: f32, depth: f32) -> Self {
        Footprint { width, depth }
    }

    pub fn square(side: f32) -> Self {
        Footprint {
            width: side,
            depth: side,
        }
    }
}

/// Identifier of a structure type in the unit catalog.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct StructureType(pub u32);

/// Identifier of one live unit (an instance of a structure type).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct UnitId(pub u32);
