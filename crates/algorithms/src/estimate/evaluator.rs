//! Per-equation evaluation and uncertainty propagation

use lira_core::{CoefficientDataset, Equation, Param, Result};

use super::normalize::Normalized;
use crate::interpolation::{interp1_clamped, Location, ScatteredInterpolant, Site};
use crate::partition::Region;

/// Scattered interpolant over the grid sites of one region.
#[derive(Debug, Clone)]
pub(crate) struct RegionalInterpolant {
    region: Region,
    /// Dataset rows of the sites, aligned with the interpolant's sites
    sites: Vec<usize>,
    interpolant: ScatteredInterpolant,
}

impl RegionalInterpolant {
    pub fn build(dataset: &CoefficientDataset, region: Region, members: &[usize]) -> Result<Self> {
        let (sites, skipped): (Vec<usize>, Vec<usize>) =
            members.iter().partition(|&&i| dataset.site(i).is_valid());
        if !skipped.is_empty() {
            tracing::warn!(%region, count = skipped.len(), "skipping grid sites with non-finite coordinates");
        }

        let positions: Vec<Site> = sites.iter().map(|&i| Site::from(dataset.site(i))).collect();
        let interpolant = ScatteredInterpolant::new(&positions)?;
        tracing::debug!(
            %region,
            sites = sites.len(),
            vertices = interpolant.vertex_count(),
            "built regional interpolant"
        );

        Ok(Self {
            region,
            sites,
            interpolant,
        })
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub fn locate(&self, queries: &[Site]) -> Vec<Location> {
        self.interpolant.locate(queries)
    }

    fn channel_values(&self, dataset: &CoefficientDataset, equation: Equation, channel: usize) -> Vec<f64> {
        let column = dataset.channel(equation, channel);
        self.sites.iter().map(|&i| column[i]).collect()
    }
}

/// Query rows of one region with their mesh locations
#[derive(Debug, Clone)]
pub(crate) struct LocatedRows<'a> {
    pub rows: &'a [usize],
    pub locations: Vec<Location>,
}

/// Estimates and uncertainties of one equation for all `n` input rows.
pub(crate) struct EquationColumns {
    pub estimates: Vec<f64>,
    pub uncertainties: Vec<f64>,
}

pub(crate) fn evaluate_equation(
    dataset: &CoefficientDataset,
    regions: &[RegionalInterpolant],
    located: &[LocatedRows<'_>],
    norm: &Normalized,
    equation: Equation,
    baseline: f64,
) -> Result<EquationColumns> {
    let n = norm.rows();
    let mut estimates = vec![f64::NAN; n];
    let mut uncertainties = vec![f64::NAN; n];

    // (channel, slot) of every predictor; channel 0 is the intercept
    let predictors: Vec<(usize, usize)> = equation
        .predictors()
        .filter_map(|p| p.channel().map(|ch| (ch, p.slot())))
        .collect();

    let table = dataset.model_error();
    let salinity = Param::Salinity.slot();

    for (regional, at) in regions.iter().zip(located) {
        if at.rows.is_empty() {
            continue;
        }

        let mut local = Vec::with_capacity(predictors.len() + 1);
        for ch in std::iter::once(0).chain(predictors.iter().map(|&(ch, _)| ch)) {
            let bound = regional
                .interpolant
                .with_values(&regional.channel_values(dataset, equation, ch))?;
            let coefs: Vec<f64> = at.locations.iter().map(|l| bound.evaluate_located(l)).collect();
            local.push(coefs);
        }

        for (j, &row) in at.rows.iter().enumerate() {
            let mut estimate = local[0][j];
            let mut variance = baseline * baseline;
            for (k, &(_, slot)) in predictors.iter().enumerate() {
                let c = local[k + 1][j];
                estimate += c * norm.values[[row, slot]];
                let cu = c * norm.uncertainties[[row, slot]];
                variance += cu * cu;
            }

            let model_error = interp1_clamped(table.salinity(), table.column(equation), norm.values[[row, salinity]]);
            variance += model_error * model_error;

            estimates[row] = estimate;
            uncertainties[row] = if estimate.is_nan() { f64::NAN } else { variance.sqrt() };
        }
    }

    Ok(EquationColumns {
        estimates,
        uncertainties,
    })
}
