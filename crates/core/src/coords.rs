//! Query and grid-site coordinates

use serde::{Deserialize, Serialize};

/// Depth is divided by this factor before any distance-based operation so
/// that metres of depth and degrees of longitude/latitude are commensurate.
pub const DEPTH_SCALE: f64 = 25.0;

/// A location in the ocean: longitude (°E), latitude (°N), depth (m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
    pub depth: f64,
}

impl Coordinate {
    /// Create a coordinate, wrapping longitude into [0, 360).
    pub fn new(lon: f64, lat: f64, depth: f64) -> Self {
        Self {
            lon: wrap_longitude(lon),
            lat,
            depth,
        }
    }

    /// A coordinate is usable only when every component is finite.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite() && self.depth.is_finite()
    }

    /// Interpolation-space position: (lon, lat, depth / [`DEPTH_SCALE`]).
    #[inline]
    pub fn scaled(&self) -> [f64; 3] {
        [self.lon, self.lat, self.depth / DEPTH_SCALE]
    }
}

/// Wrap a longitude into [0, 360). NaN stays NaN.
pub fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(360.0);
    // rem_euclid of a tiny negative number rounds up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
