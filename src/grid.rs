use crate::location::*;
use serde::{Deserialize, Serialize};

/// A flat, row-major 2D array sized to one of the coarse grids.
///
/// Accessors are bounds-checked in debug builds only; callers clip
/// coordinates before indexing.
#[derive(Clone, Debug, PartialEq)]
pub struct GridArray<T: Clone> {
    width: u32,
    height: u32,
    data: Vec<T>,
}

impl<T: Clone> GridArray<T> {
    pub fn new(width: u32, height: u32, initial: T) -> Self {
        GridArray {
            width,
            height,
            data: vec![initial; (width as usize) * (height as usize)],
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
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(
            x < self.width as usize && y < self.height as usize,
            "grid access ({}, {}) outside {}x{}",
            x,
            y,
            self.width,
            self.height
        );
        y * (self.width as usize) + x
    }

    /// True if the signed coordinate lies on the grid.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        let index = self.index(x, y);
        &self.data[index]
    }

    #[inline]
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let index = self.index(x, y);
        &mut self.data[index]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        *self.get_mut(x, y) = value;
    }

    #[inline]
    pub fn at(&self, cell: Cell) -> &T {
        self.get(cell.x() as usize, cell.y() as usize)
    }

    #[inline]
    pub fn at_mut(&mut self, cell: Cell) -> &mut T {
        self.get_mut(cell.x() as usize, cell.y() as usize)
    }

    pub fn fill(&mut self, value: T) {
        for v in self.data.iter_mut() {
            *v = value.clone();
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let width = self.width as usize;
        self.data.iter().enumerate().map(move |(i, v)| {
            let x = i % width;
            let y = i / width;
            ((x, y), v)
        })
    }

    pub fn map<U: Clone, F: Fn(&T) -> U>(&self, f: F) -> GridArray<U> {
        GridArray {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

#[derive(Serialize)]
struct GridRef<'a, T> {
    width: u32,
    height: u32,
    data: &'a [T],
}

#[derive(Deserialize)]
struct GridOwned<T> {
    width: u32,
    height: u32,
    data: Vec<T>,
}

impl<T: Clone + Serialize> Serialize for GridArray<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        GridRef {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
        .serialize(serializer)
    }
}

impl<'de, T: Clone + Deserialize<'de>> Deserialize<'de> for GridArray<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = GridOwned::<T>::deserialize(deserializer)?;
        if raw.data.len() != (raw.width as usize) * (raw.height as usize) {
            return Err(serde::de::Error::custom("Invalid grid array size"));
        }
        Ok(GridArray {
            width: raw.width,
            height: raw.height,
            data: raw.data,
        })
    }
}
