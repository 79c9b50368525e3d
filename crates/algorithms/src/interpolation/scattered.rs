//! Linear scattered interpolation in 3-D
//!
//! Sites are tetrahedralized together with the eight corners of a cube
//! of half-width [`CORNER_EXTENT`]. The corners carry the mean of the
//! supplied values, so a query anywhere inside the cube gets a weighted
//! blend of real sites and that mean instead of falling off the hull.
//!
//! Geometry and values are split: a [`ScatteredInterpolant`] is built once
//! per site set, then bound to any number of value vectors over the same
//! sites. Locating queries once and reusing the [`Location`] for every
//! value vector avoids repeating the walk.

use lira_core::{Error, Result};

use super::delaunay::{xorshift, Tetrahedralization, CORNER_COUNT};
use super::kdtree::KdTree;
use super::Site;
use crate::maybe_rayon::*;

/// Half-width of the synthetic bounding cube
pub const CORNER_EXTENT: f64 = 1e10;

/// Where a query falls in the mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Location {
    /// Inside a tetrahedron; weights sum to one
    Inside { vertices: [usize; 4], weights: [f64; 4] },
    /// Beyond the bounding cube
    Outside,
    /// Non-finite query coordinates
    Invalid,
}

/// Tetrahedralized site set, ready to be bound to values.
#[derive(Debug, Clone)]
pub struct ScatteredInterpolant {
    mesh: Tetrahedralization,
    /// Mesh vertex of every input site
    vertex_of_site: Vec<usize>,
    /// Nearest-vertex index used to start point location
    tree: KdTree,
}

impl ScatteredInterpolant {
    /// Tetrahedralize `sites`. Every site must be finite and strictly
    /// inside the bounding cube. Coincident sites share one vertex.
    pub fn new(sites: &[Site]) -> Result<Self> {
        if let Some((i, s)) = sites
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite() || s.magnitude() >= CORNER_EXTENT)
        {
            return Err(Error::InvalidParameter {
                name: "site",
                value: format!("#{} ({}, {}, {})", i, s.x, s.y, s.z),
                reason: format!("coordinates must be finite and within ±{CORNER_EXTENT:e}"),
            });
        }

        let mut mesh = Tetrahedralization::new(CORNER_EXTENT);
        let mut vertex_of_site = vec![0; sites.len()];
        for i in insertion_order(sites) {
            vertex_of_site[i] = mesh.insert(sites[i])?;
        }

        let tree = KdTree::build(mesh.points());
        tracing::debug!(
            sites = sites.len(),
            vertices = mesh.vertex_count(),
            tetrahedra = mesh.tetrahedron_count(),
            replaced = mesh.removed_count(),
            "tetrahedralized sites"
        );

        Ok(Self {
            mesh,
            vertex_of_site,
            tree,
        })
    }

    /// Number of input sites, duplicates included
    pub fn site_count(&self) -> usize {
        self.vertex_of_site.len()
    }

    /// Number of distinct mesh vertices, corners included
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn tetrahedron_count(&self) -> usize {
        self.mesh.tetrahedron_count()
    }

    pub fn locate_one(&self, q: &Site) -> Location {
        if !q.is_finite() {
            return Location::Invalid;
        }
        if q.magnitude() > CORNER_EXTENT {
            return Location::Outside;
        }

        let hint = self.tree.nearest(q).map(|r| r.index);
        match self.mesh.locate(q, hint) {
            Some(t) => {
                let (vertices, weights) = self.mesh.barycentric(t, q);
                Location::Inside { vertices, weights }
            }
            None => Location::Outside,
        }
    }

    /// Locate many queries (in parallel when the `parallel` feature is on).
    pub fn locate(&self, queries: &[Site]) -> Vec<Location> {
        queries.into_par_iter().map(|q| self.locate_one(q)).collect()
    }

    /// Attach one value per input site.
    ///
    /// Values of coincident sites are averaged. Corners take the mean of
    /// the finite values (NaN if there are none).
    pub fn with_values(&self, values: &[f64]) -> Result<BoundInterpolant<'_>> {
        if values.len() != self.site_count() {
            return Err(Error::ShapeMismatch {
                what: "site values",
                expected: self.site_count().to_string(),
                actual: values.len().to_string(),
            });
        }

        let (sum, count) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        let mean = if count > 0 { sum / count as f64 } else { f64::NAN };

        let n = self.vertex_count();
        let mut sums = vec![0.0; n];
        let mut hits = vec![0usize; n];
        for (&v, &value) in self.vertex_of_site.iter().zip(values) {
            sums[v] += value;
            hits[v] += 1;
        }

        let vertex_values = (0..n)
            .map(|v| match (v < CORNER_COUNT, hits[v]) {
                (true, _) => mean,
                (false, 0) => f64::NAN,
                (false, h) => sums[v] / h as f64,
            })
            .collect();

        Ok(BoundInterpolant {
            interpolant: self,
            vertex_values,
            mean,
        })
    }
}

/// Smallest round of the insertion order
const FIRST_ROUND: usize = 64;

/// Biased randomized insertion order.
///
/// Indices are shuffled, split into rounds of doubling size, and each
/// round is sorted along a Morton curve. Shuffling keeps cavities small
/// on regular grids; the curve keeps consecutive sites close so the
/// locating walk stays short.
///
/// Reference:
/// Amenta, N., Choi, S., Rote, G. (2003). Incremental constructions con BRIO. SoCG '03.
fn insertion_order(sites: &[Site]) -> Vec<usize> {
    let n = sites.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = 0x2545_F491_4F6C_DD1D_u64;
    for i in (1..n).rev() {
        rng = xorshift(rng);
        order.swap(i, (rng % (i as u64 + 1)) as usize);
    }

    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for s in sites {
        for axis in 0..3 {
            lo[axis] = lo[axis].min(s.coord(axis));
            hi[axis] = hi[axis].max(s.coord(axis));
        }
    }
    let key = |s: &Site| {
        (0..3).fold(0u64, |k, axis| {
            let span = hi[axis] - lo[axis];
            let cell = if span > 0.0 {
                ((s.coord(axis) - lo[axis]) / span * MORTON_MAX) as u64
            } else {
                0
            };
            k | (spread_bits(cell) << axis)
        })
    };

    let mut bounds = vec![n];
    let mut m = n;
    while m > FIRST_ROUND {
        m /= 2;
        bounds.push(m);
    }
    bounds.push(0);
    bounds.reverse();
    for w in bounds.windows(2) {
        order[w[0]..w[1]].sort_by_cached_key(|&i| key(&sites[i]));
    }
    order
}

/// Largest cell index per axis (21 bits)
const MORTON_MAX: f64 = 2_097_151.0;

/// Spread the low 21 bits of `v` so that two zero bits separate each one.
fn spread_bits(v: u64) -> u64 {
    let mut v = v & 0x1f_ffff;
    v = (v | v << 32) & 0x001f_0000_0000_ffff;
    v = (v | v << 16) & 0x001f_0000_ff00_00ff;
    v = (v | v << 8) & 0x100f_00f0_0f00_f00f;
    v = (v | v << 4) & 0x10c3_0c30_c30c_30c3;
    v = (v | v << 2) & 0x1249_2492_4924_9249;
    v
}

/// A [`ScatteredInterpolant`] with values attached.
#[derive(Debug, Clone)]
pub struct BoundInterpolant<'a> {
    interpolant: &'a ScatteredInterpolant,
    vertex_values: Vec<f64>,
    mean: f64,
}

impl BoundInterpolant<'_> {
    /// Value carried by the corner vertices
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn value_at(&self, q: &Site) -> f64 {
        self.evaluate_located(&self.interpolant.locate_one(q))
    }

    pub fn evaluate(&self, queries: &[Site]) -> Vec<f64> {
        queries.into_par_iter().map(|q| self.value_at(q)).collect()
    }

    /// Interpolate at a previously located query.
    ///
    /// Vertices with zero weight are skipped, so a NaN value only spreads
    /// to queries that actually depend on it.
    pub fn evaluate_located(&self, location: &Location) -> f64 {
        match location {
            Location::Inside { vertices, weights } => vertices
                .iter()
                .zip(weights)
                .filter(|(_, &w)| w != 0.0)
                .map(|(&v, &w)| w * self.vertex_values[v])
                .sum(),
            Location::Outside => self.mean,
            Location::Invalid => f64::NAN,
        }
    }
}
