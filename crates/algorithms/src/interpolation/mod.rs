//! Spatial interpolation
//!
//! - `KdTree`: nearest-site queries in 3-D
//! - `Tetrahedralization`: incremental 3-D Delaunay mesh
//! - `ScatteredInterpolant`: linear (barycentric) interpolation over a
//!   tetrahedralized site set padded with far-away corner sites
//! - `interp1_clamped`: 1-D linear table lookup

mod delaunay;
mod kdtree;
mod scattered;
mod table;

pub use delaunay::Tetrahedralization;
pub use kdtree::{KdTree, NearestResult};
pub use scattered::{BoundInterpolant, Location, ScatteredInterpolant, CORNER_EXTENT};
pub use table::interp1_clamped;

use lira_core::Coordinate;

/// A point in interpolation space: (lon, lat, depth / 25).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Site {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance to another site
    #[inline]
    pub fn dist_sq(&self, other: &Site) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Largest absolute coordinate
    #[inline]
    pub(crate) fn magnitude(&self) -> f64 {
        self.x.abs().max(self.y.abs()).max(self.z.abs())
    }

    #[inline]
    pub(crate) fn coord(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }
}

impl From<Coordinate> for Site {
    /// Position of a coordinate in interpolation space (depth scaled).
    fn from(c: Coordinate) -> Self {
        let [x, y, z] = c.scaled();
        Self { x, y, z }
    }
}
