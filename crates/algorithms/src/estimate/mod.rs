//! Total alkalinity estimation
//!
//! Pipeline for one call:
//!
//! 1. normalize caller columns into canonical slots
//! 2. check that every requested equation can be satisfied
//! 3. derive θ, AOU and per-kg concentrations where needed
//! 4. split query rows by region and locate them in that region's mesh
//! 5. per equation: interpolate local coefficients, evaluate the
//!    regression and propagate uncertainty
//!
//! The grid partition and both regional meshes are built once per
//! [`Estimator`] and reused across calls.

mod derived;
mod evaluator;
mod normalize;
mod requirements;

use std::sync::Arc;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use lira_core::{Algorithm, CoefficientDataset, Eos80, Equation, Error, Param, Result, SeawaterProperties, Warning};

use self::evaluator::{evaluate_equation, EquationColumns, LocatedRows, RegionalInterpolant};
use crate::interpolation::Site;
use crate::maybe_rayon::*;
use crate::partition::{Partition, Region};

/// Parameters for an estimation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateParams {
    /// Equations to evaluate; output columns follow this order
    pub equations: Vec<Equation>,
    /// Concentrations are per kilogram of seawater (`false`: per litre)
    pub molality: bool,
    /// Uncertainty added in quadrature to every estimate (µmol/kg)
    pub baseline_uncertainty: f64,
}

impl Default for EstimateParams {
    fn default() -> Self {
        Self {
            equations: Equation::all().collect(),
            molality: true,
            baseline_uncertainty: 2.0,
        }
    }
}

impl EstimateParams {
    /// Parameters for a subset of equations, given by number.
    pub fn for_equations(numbers: &[u8]) -> Result<Self> {
        let equations = numbers.iter().map(|&n| Equation::new(n)).collect::<Result<_>>()?;
        Ok(Self {
            equations,
            ..Self::default()
        })
    }

    fn validate(&self) -> Result<()> {
        if !self.baseline_uncertainty.is_finite() || self.baseline_uncertainty < 0.0 {
            return Err(Error::InvalidParameter {
                name: "baseline_uncertainty",
                value: self.baseline_uncertainty.to_string(),
                reason: "must be finite and non-negative".into(),
            });
        }
        Ok(())
    }
}

/// Query locations and measurements
#[derive(Debug, Clone)]
pub struct EstimateInput {
    /// Shape (n, 3): longitude (°E), latitude (°N), depth (m)
    pub coordinates: Array2<f64>,
    /// Shape (n, k), one column per entry of `params`; NaN marks missing
    pub measurements: Array2<f64>,
    /// Parameter measured in each column
    pub params: Vec<Param>,
    /// Shape (n, k) or (1, k); `None` uses the default uncertainties
    pub uncertainties: Option<Array2<f64>>,
}

impl EstimateInput {
    pub fn new(coordinates: Array2<f64>, measurements: Array2<f64>, params: Vec<Param>) -> Self {
        Self {
            coordinates,
            measurements,
            params,
            uncertainties: None,
        }
    }

    pub fn with_uncertainties(mut self, uncertainties: Array2<f64>) -> Self {
        self.uncertainties = Some(uncertainties);
        self
    }
}

/// Estimates and uncertainties, one column per requested equation.
#[derive(Debug, Clone)]
pub struct EstimateOutput {
    /// Shape (n, equations.len()), µmol/kg
    pub estimates: Array2<f64>,
    /// Shape (n, equations.len()), µmol/kg
    pub uncertainties: Array2<f64>,
    pub equations: Vec<Equation>,
    pub warnings: Vec<Warning>,
}

impl EstimateOutput {
    /// Output column of `equation`, if it was requested
    pub fn column_of(&self, equation: Equation) -> Option<usize> {
        self.equations.iter().position(|&e| e == equation)
    }
}

/// Reusable estimator over one coefficient dataset.
///
/// Construction partitions the grid sites and tetrahedralizes each region,
/// which is the expensive part; [`Estimator::estimate`] only locates
/// queries and evaluates.
#[derive(Debug, Clone)]
pub struct Estimator<W = Eos80> {
    dataset: Arc<CoefficientDataset>,
    /// Indexed by [`Region::index`]
    regions: Vec<RegionalInterpolant>,
    seawater: W,
}

impl Estimator<Eos80> {
    pub fn new(dataset: Arc<CoefficientDataset>) -> Result<Self> {
        Self::with_seawater(dataset, Eos80)
    }
}

impl<W: SeawaterProperties> Estimator<W> {
    /// Build an estimator with a custom seawater-properties implementation.
    pub fn with_seawater(dataset: Arc<CoefficientDataset>, seawater: W) -> Result<Self> {
        let partition = match dataset.region_flags() {
            Some(flags) => Partition::from_flags(flags),
            None => {
                let sites: Vec<_> = (0..dataset.len()).map(|i| dataset.site(i)).collect();
                Partition::of_coordinates(&sites)
            }
        };

        let regions = Region::ALL
            .into_par_iter()
            .map(|r| RegionalInterpolant::build(&dataset, r, partition.members(r)))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            sites = dataset.len(),
            atlantic_arctic = regions[Region::AtlanticArctic.index()].site_count(),
            indo_pacific = regions[Region::IndoPacific.index()].site_count(),
            "estimator ready"
        );

        Ok(Self {
            dataset,
            regions,
            seawater,
        })
    }

    pub fn dataset(&self) -> &CoefficientDataset {
        &self.dataset
    }

    /// Estimate total alkalinity for every input row and requested equation.
    ///
    /// Rows with a non-finite coordinate, or missing a predictor an
    /// equation uses, get NaN for that equation. Errors are raised before
    /// any interpolation.
    pub fn estimate(&self, input: &EstimateInput, params: &EstimateParams) -> Result<EstimateOutput> {
        params.validate()?;
        let mut norm = normalize::normalize(input)?;
        let req = requirements::resolve(&params.equations, &norm.supplied, params.molality)?;
        derived::fill(&self.seawater, &mut norm, &req);

        let n = norm.rows();
        let partition = Partition::of_coordinates(&norm.coordinates);
        let located: Vec<LocatedRows<'_>> = self
            .regions
            .iter()
            .map(|regional| {
                let rows = partition.members(regional.region());
                let queries: Vec<Site> = rows.iter().map(|&i| Site::from(norm.coordinates[i])).collect();
                LocatedRows {
                    rows,
                    locations: regional.locate(&queries),
                }
            })
            .collect();

        tracing::debug!(
            rows = n,
            valid = partition.len(),
            equations = params.equations.len(),
            "estimating"
        );

        let columns = params
            .equations
            .as_slice()
            .into_par_iter()
            .map(|&eq| {
                evaluate_equation(
                    &self.dataset,
                    &self.regions,
                    &located,
                    &norm,
                    eq,
                    params.baseline_uncertainty,
                )
            })
            .collect::<Result<Vec<EquationColumns>>>()?;

        let e = params.equations.len();
        let mut estimates = Array2::from_elem((n, e), f64::NAN);
        let mut uncertainties = Array2::from_elem((n, e), f64::NAN);
        for (j, col) in columns.into_iter().enumerate() {
            estimates.column_mut(j).assign(&ArrayView1::from(&col.estimates));
            uncertainties.column_mut(j).assign(&ArrayView1::from(&col.uncertainties));
        }

        Ok(EstimateOutput {
            estimates,
            uncertainties,
            equations: params.equations.clone(),
            warnings: norm.warnings,
        })
    }
}

impl<W: SeawaterProperties> Algorithm for Estimator<W> {
    type Input = EstimateInput;
    type Output = EstimateOutput;
    type Params = EstimateParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "LocallyInterpolatedAlkalinity"
    }

    fn description(&self) -> &'static str {
        "Estimate total alkalinity from locally interpolated regression coefficients"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        self.estimate(&input, &params)
    }
}

/// One-shot estimation: builds an [`Estimator`] and runs a single call.
///
/// Prefer keeping an [`Estimator`] around when estimating repeatedly
/// against the same dataset.
pub fn estimate(
    dataset: Arc<CoefficientDataset>,
    input: &EstimateInput,
    params: &EstimateParams,
) -> Result<EstimateOutput> {
    Estimator::new(dataset)?.estimate(input, params)
}
