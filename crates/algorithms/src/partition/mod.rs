//! Ocean basin partition
//!
//! Coefficients vary smoothly within a basin but not across land
//! barriers, so interpolation is done separately on each side. A location
//! is Atlantic/Arctic when it lies in (or on the edge of) any of the named
//! polygons below, and Indo-Pacific otherwise.
//!
//! Polygon vertices are (longitude °E, latitude °N). Longitudes run from
//! -1 to 361 so that wrapped longitudes near 0/360 fall inside.

use std::sync::OnceLock;

use geo::{Intersects, LineString, Point, Polygon};
use lira_core::Coordinate;

use crate::maybe_rayon::*;

/// One of the two interpolation regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    AtlanticArctic,
    IndoPacific,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::AtlanticArctic, Region::IndoPacific];

    pub fn index(self) -> usize {
        match self {
            Region::AtlanticArctic => 0,
            Region::IndoPacific => 1,
        }
    }

    pub fn from_flag(atlantic_arctic: bool) -> Self {
        if atlantic_arctic {
            Region::AtlanticArctic
        } else {
            Region::IndoPacific
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::AtlanticArctic => write!(f, "Atlantic/Arctic"),
            Region::IndoPacific => write!(f, "Indo-Pacific"),
        }
    }
}

/// A named boundary of the Atlantic/Arctic region
#[derive(Debug, Clone)]
pub struct NamedPolygon {
    pub name: &'static str,
    pub polygon: Polygon<f64>,
}

const BOUNDARIES: [(&str, &[(f64, f64)]); 5] = [
    (
        "North Atlantic",
        &[(300.0, 0.0), (260.0, 20.0), (240.0, 67.0), (260.0, 40.0), (361.0, 40.0), (361.0, 0.0), (298.0, 0.0)],
    ),
    (
        "South Atlantic",
        &[(298.0, 0.0), (292.0, -40.01), (361.0, -40.01), (361.0, 0.0), (298.0, 0.0)],
    ),
    (
        "North Atlantic east of 0°",
        &[(-1.0, 50.0), (40.0, 50.0), (40.0, 0.0), (-1.0, 0.0), (-1.0, 50.0)],
    ),
    (
        "South Atlantic east of 0°",
        &[(-1.0, 0.0), (20.0, 0.0), (20.0, -40.0), (-1.0, -40.0), (-1.0, 0.0)],
    ),
    (
        "Arctic",
        &[
            (361.0, 40.0),
            (361.0, 91.0),
            (-1.0, 91.0),
            (-1.0, 50.0),
            (40.0, 50.0),
            (40.0, 40.0),
            (104.0, 40.0),
            (104.0, 67.0),
            (240.0, 67.0),
            (280.0, 40.0),
            (361.0, 40.0),
        ],
    ),
];

/// The polygons making up the Atlantic/Arctic region, built on first use.
pub fn atlantic_arctic_polygons() -> &'static [NamedPolygon] {
    static POLYGONS: OnceLock<Vec<NamedPolygon>> = OnceLock::new();
    POLYGONS.get_or_init(|| {
        BOUNDARIES
            .iter()
            .map(|&(name, ring)| NamedPolygon {
                name,
                polygon: Polygon::new(LineString::from(ring.to_vec()), vec![]),
            })
            .collect()
    })
}

/// Region of a (longitude, latitude) pair. Longitude must already be
/// wrapped into [0, 360).
pub fn classify(lon: f64, lat: f64) -> Region {
    let p = Point::new(lon, lat);
    let inside = atlantic_arctic_polygons().iter().any(|np| np.polygon.intersects(&p));
    Region::from_flag(inside)
}

/// Row indices split by region.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    members: [Vec<usize>; 2],
}

impl Partition {
    /// Classify coordinates; rows with non-finite components are left out.
    pub fn of_coordinates(coordinates: &[Coordinate]) -> Self {
        let regions: Vec<Option<Region>> = coordinates
            .into_par_iter()
            .map(|c| c.is_valid().then(|| classify(c.lon, c.lat)))
            .collect();
        Self::from_regions(regions)
    }

    /// Split rows by precomputed Atlantic/Arctic flags.
    pub fn from_flags(flags: &[bool]) -> Self {
        Self::from_regions(flags.iter().map(|&f| Some(Region::from_flag(f))))
    }

    fn from_regions(regions: impl IntoIterator<Item = Option<Region>>) -> Self {
        let mut members: [Vec<usize>; 2] = Default::default();
        for (i, region) in regions.into_iter().enumerate() {
            if let Some(r) = region {
                members[r.index()].push(i);
            }
        }
        Self { members }
    }

    /// Rows belonging to `region`, in increasing order
    pub fn members(&self, region: Region) -> &[usize] {
        &self.members[region.index()]
    }

    /// Number of classified rows
    pub fn len(&self) -> usize {
        self.members.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
