//! Cost volume access and geometric helpers

use optnet_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::capacity::Capacity;

/// Point with real-valued coordinates (voxel units)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn offset(self, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

/// Read-only 3D cost array consumed by the graph builder
///
/// Dimensions are `[nx, ny, nz]`; `cost` is only called with in-range indices.
pub trait CostVolume: Sync {
    type Cost: Capacity;

    fn dims(&self) -> [usize; 3];

    fn cost(&self, x: usize, y: usize, z: usize) -> Self::Cost;
}

/// Dense owned volume, x varies fastest
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    dims: [usize; 3],
    data: Vec<T>,
}

impl<T: Capacity> Volume<T> {
    pub fn from_vec(dims: [usize; 3], data: Vec<T>) -> Result<Self> {
        let expected = dims[0] * dims[1] * dims[2];
        if data.len() != expected {
            return Err(Error::Configuration(format!(
                "volume data has {} values, dims {:?} need {}",
                data.len(),
                dims,
                expected
            )));
        }
        Ok(Self { dims, data })
    }

    pub fn from_fn(dims: [usize; 3], mut f: impl FnMut(usize, usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    data.push(f(x, y, z));
                }
            }
        }
        Self { dims, data }
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.dims[1] + y) * self.dims[0] + x
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<T> {
        if x < self.dims[0] && y < self.dims[1] && z < self.dims[2] {
            Some(self.data[self.index(x, y, z)])
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T: Capacity> CostVolume for Volume<T> {
    type Cost = T;

    fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline(always)]
    fn cost(&self, x: usize, y: usize, z: usize) -> T {
        self.data[self.index(x, y, z)]
    }
}
