//! Precomputed regression coefficient field
//!
//! The dataset is loaded once and shared read-only between estimation
//! calls (wrap it in an `Arc`).

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis};

use crate::coords::Coordinate;
use crate::error::{Error, Result};
use crate::params::{Equation, CHANNEL_COUNT, EQUATION_COUNT};

/// Salinity-indexed model error, one column per equation.
#[derive(Debug, Clone)]
pub struct ModelErrorTable {
    salinity: Vec<f64>,
    /// Shape (salinity.len(), EQUATION_COUNT)
    errors: Array2<f64>,
}

impl ModelErrorTable {
    /// Build a table. `salinity` must be finite and strictly increasing,
    /// `errors` must have one row per salinity and one column per equation.
    pub fn new(salinity: Vec<f64>, errors: Array2<f64>) -> Result<Self> {
        if salinity.is_empty() {
            return Err(Error::InvalidParameter {
                name: "model error salinity",
                value: "[]".into(),
                reason: "at least one salinity is required".into(),
            });
        }
        if errors.dim() != (salinity.len(), EQUATION_COUNT) {
            return Err(Error::shape(
                "model error table",
                format!("({}, {})", salinity.len(), EQUATION_COUNT),
                format!("{:?}", errors.dim()),
            ));
        }
        if salinity.iter().any(|s| !s.is_finite()) || salinity.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidParameter {
                name: "model error salinity",
                value: format!("{salinity:?}"),
                reason: "must be finite and strictly increasing".into(),
            });
        }
        Ok(Self { salinity, errors })
    }

    pub fn salinity(&self) -> &[f64] {
        &self.salinity
    }

    /// Model error column of one equation, aligned with [`Self::salinity`].
    pub fn column(&self, equation: Equation) -> ArrayView1<'_, f64> {
        self.errors.column(equation.index())
    }

    pub fn errors(&self) -> ArrayView2<'_, f64> {
        self.errors.view()
    }
}

/// Coefficient grid: site locations, per-site coefficients for every
/// equation and channel, optional region flags and the model-error table.
///
/// Channels follow the layout `[intercept, S, θ, N, AOU, Si]`; channels of
/// predictors an equation does not use are ignored.
#[derive(Debug, Clone)]
pub struct CoefficientDataset {
    /// Shape (n_sites, 3): lon (°E), lat (°N), depth (m)
    sites: Array2<f64>,
    /// Shape (n_sites, EQUATION_COUNT, CHANNEL_COUNT)
    coefficients: Array3<f64>,
    /// `true` where a site belongs to the Atlantic/Arctic region
    atlantic_arctic: Option<Vec<bool>>,
    model_error: ModelErrorTable,
}

impl CoefficientDataset {
    pub fn new(sites: Array2<f64>, coefficients: Array3<f64>, model_error: ModelErrorTable) -> Result<Self> {
        let n = sites.nrows();
        if sites.ncols() != 3 {
            return Err(Error::shape("site coordinates", "3 columns", format!("{} columns", sites.ncols())));
        }
        if n == 0 {
            return Err(Error::InvalidParameter {
                name: "sites",
                value: "0".into(),
                reason: "the coefficient grid has no sites".into(),
            });
        }
        if coefficients.dim() != (n, EQUATION_COUNT, CHANNEL_COUNT) {
            return Err(Error::shape(
                "coefficients",
                format!("({n}, {EQUATION_COUNT}, {CHANNEL_COUNT})"),
                format!("{:?}", coefficients.dim()),
            ));
        }

        Ok(Self {
            sites,
            coefficients,
            atlantic_arctic: None,
            model_error,
        })
    }

    /// Attach precomputed region flags (one per site).
    pub fn with_region_flags(mut self, atlantic_arctic: Vec<bool>) -> Result<Self> {
        if atlantic_arctic.len() != self.len() {
            return Err(Error::shape("region flags", self.len(), atlantic_arctic.len()));
        }
        self.atlantic_arctic = Some(atlantic_arctic);
        Ok(self)
    }

    /// Number of grid sites
    pub fn len(&self) -> usize {
        self.sites.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.nrows() == 0
    }

    pub fn sites(&self) -> ArrayView2<'_, f64> {
        self.sites.view()
    }

    /// Location of site `i`, longitude wrapped into [0, 360).
    pub fn site(&self, i: usize) -> Coordinate {
        let row = self.sites.row(i);
        Coordinate::new(row[0], row[1], row[2])
    }

    pub fn region_flags(&self) -> Option<&[bool]> {
        self.atlantic_arctic.as_deref()
    }

    /// Coefficient values of one equation and channel over all sites.
    pub fn channel(&self, equation: Equation, channel: usize) -> ArrayView1<'_, f64> {
        self.coefficients
            .index_axis(Axis(1), equation.index())
            .index_axis_move(Axis(1), channel)
    }

    pub fn coefficients(&self) -> &Array3<f64> {
        &self.coefficients
    }

    pub fn model_error(&self) -> &ModelErrorTable {
        &self.model_error
    }
}
