//! Input normalization
//!
//! Reorders caller columns into the seven canonical slots, fills default
//! uncertainties and flags values that look like missing-data sentinels.

use ndarray::Array2;

use lira_core::params::SLOT_COUNT;
use lira_core::{Coordinate, Error, Param, Result, Warning};

use super::EstimateInput;

/// Measurements after reordering into canonical slots.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub coordinates: Vec<Coordinate>,
    /// Shape (n, SLOT_COUNT); NaN where a slot was not supplied
    pub values: Array2<f64>,
    /// Shape (n, SLOT_COUNT)
    pub uncertainties: Array2<f64>,
    /// True where the caller gave the uncertainty; false for defaults
    pub uncertainty_given: Array2<bool>,
    /// Which slots the caller supplied
    pub supplied: [bool; SLOT_COUNT],
    pub warnings: Vec<Warning>,
}

impl Normalized {
    pub fn rows(&self) -> usize {
        self.coordinates.len()
    }

    pub fn has(&self, param: Param) -> bool {
        self.supplied[param.slot()]
    }
}

/// Values at or below this look like a missing-data marker
const SENTINEL_FLOOR: f64 = -999.0;
/// Magnitudes at or above this look like a missing-data marker
const SENTINEL_MAGNITUDE: f64 = 10_000.0;

fn looks_like_sentinel(v: f64) -> bool {
    v.is_finite() && (v <= SENTINEL_FLOOR || v.abs() >= SENTINEL_MAGNITUDE)
}

pub fn normalize(input: &EstimateInput) -> Result<Normalized> {
    let coords = &input.coordinates;
    let meas = &input.measurements;
    let (n, k) = meas.dim();

    if coords.ncols() != 3 {
        return Err(Error::ShapeMismatch {
            what: "coordinates",
            expected: "3 columns (lon, lat, depth)".into(),
            actual: format!("{} columns", coords.ncols()),
        });
    }
    if coords.nrows() != n {
        return Err(Error::ShapeMismatch {
            what: "coordinate rows",
            expected: format!("{n} (one per measurement row)"),
            actual: coords.nrows().to_string(),
        });
    }
    if input.params.len() != k {
        return Err(Error::ShapeMismatch {
            what: "parameter ids",
            expected: format!("{k} (one per measurement column)"),
            actual: input.params.len().to_string(),
        });
    }

    let mut supplied = [false; SLOT_COUNT];
    for &p in &input.params {
        if std::mem::replace(&mut supplied[p.slot()], true) {
            return Err(Error::InvalidParameter {
                name: "parameter ids",
                value: p.to_string(),
                reason: "each parameter may be supplied at most once".into(),
            });
        }
    }

    let given_uncertainty = match &input.uncertainties {
        None => None,
        Some(u) if u.dim() == (n, k) => Some((u, false)),
        Some(u) if u.dim() == (1, k) => Some((u, true)),
        Some(u) => {
            return Err(Error::ShapeMismatch {
                what: "measurement uncertainties",
                expected: format!("({n}, {k}) or (1, {k})"),
                actual: format!("{:?}", u.dim()),
            })
        }
    };

    let mut values = Array2::from_elem((n, SLOT_COUNT), f64::NAN);
    let mut uncertainties = Array2::from_shape_fn((n, SLOT_COUNT), |(_, s)| Param::ALL[s].default_uncertainty());
    let mut uncertainty_given = Array2::from_elem((n, SLOT_COUNT), false);
    let mut warnings = Vec::new();

    for (col, &p) in input.params.iter().enumerate() {
        let slot = p.slot();
        values.column_mut(slot).assign(&meas.column(col));

        if let Some((u, broadcast)) = given_uncertainty {
            let default = p.default_uncertainty();
            for row in 0..n {
                let v = u[[if broadcast { 0 } else { row }, col]];
                uncertainties[[row, slot]] = if v.is_nan() { default } else { v };
                uncertainty_given[[row, slot]] = !v.is_nan();
            }
        }

        if let Some(&value) = meas.column(col).iter().find(|v| looks_like_sentinel(**v)) {
            tracing::warn!(param = %p, value, "measurement looks like a missing-data sentinel; use NaN instead");
            warnings.push(Warning::SuspiciousSentinelValue { param: p, value });
        }
    }

    let coordinates = coords
        .rows()
        .into_iter()
        .map(|r| Coordinate::new(r[0], r[1], r[2]))
        .collect();

    Ok(Normalized {
        coordinates,
        values,
        uncertainties,
        uncertainty_given,
        supplied,
        warnings,
    })
}
