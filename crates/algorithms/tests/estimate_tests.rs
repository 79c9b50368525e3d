//! End-to-end estimation against a synthetic coefficient grid.
//!
//! The grid covers the globe every 30° at three depths. Unless a test says
//! otherwise every equation carries the same constant coefficients
//! `[500, 50, -2, 1, 0.05, 0.3]` (intercept, S, θ, N, AOU, Si), so the
//! interpolated coefficients are known exactly at any location and
//! estimates can be checked by hand.

use std::sync::Arc;

use approx::assert_relative_eq;
use lira_algorithms::estimate::{estimate, EstimateInput, EstimateParams, Estimator};
use lira_core::params::{CHANNEL_COUNT, EQUATION_COUNT};
use lira_core::{
    Algorithm, CoefficientDataset, Eos80, Equation, Error, ModelErrorTable, Param, SeawaterProperties, Warning,
};
use ndarray::{array, Array2, Array3};

// ── Fixtures ───────────────────────────────────────────────────────────

const COEFFICIENTS: [f64; CHANNEL_COUNT] = [500.0, 50.0, -2.0, 1.0, 0.05, 0.3];

fn grid_sites() -> Array2<f64> {
    let mut rows = Vec::new();
    for lon in (0..360).step_by(30) {
        for lat in (-60..=60).step_by(30) {
            for depth in [0.0, 1000.0, 3000.0] {
                rows.extend([lon as f64, lat as f64, depth]);
            }
        }
    }
    Array2::from_shape_vec((rows.len() / 3, 3), rows).unwrap()
}

fn model_error() -> ModelErrorTable {
    let mut errors = Array2::zeros((3, EQUATION_COUNT));
    for e in 0..EQUATION_COUNT {
        errors[[0, e]] = 3.0;
        errors[[1, e]] = 2.0;
        errors[[2, e]] = 4.0;
    }
    ModelErrorTable::new(vec![30.0, 35.0, 40.0], errors).unwrap()
}

fn constant_dataset() -> Arc<CoefficientDataset> {
    let sites = grid_sites();
    let n = sites.nrows();
    let coefficients = Array3::from_shape_fn((n, EQUATION_COUNT, CHANNEL_COUNT), |(_, _, c)| COEFFICIENTS[c]);
    Arc::new(CoefficientDataset::new(sites, coefficients, model_error()).unwrap())
}

/// Intercept varies linearly with position; all other channels are zero.
fn linear_intercept_dataset() -> Arc<CoefficientDataset> {
    let sites = grid_sites();
    let n = sites.nrows();
    let coefficients = Array3::from_shape_fn((n, EQUATION_COUNT, CHANNEL_COUNT), |(i, _, c)| {
        if c == 0 {
            sites[[i, 0]] + 2.0 * sites[[i, 1]] + sites[[i, 2]] / 25.0
        } else {
            0.0
        }
    });
    Arc::new(CoefficientDataset::new(sites, coefficients, model_error()).unwrap())
}

fn all_predictors() -> Vec<Param> {
    Param::PREDICTORS.to_vec()
}

fn eq(n: u8) -> Equation {
    Equation::new(n).unwrap()
}

/// Hand-evaluated regression with the constant coefficients
fn expected_estimate(equation: Equation, x: &[f64; 5]) -> f64 {
    COEFFICIENTS[0]
        + equation
            .predictors()
            .map(|p| COEFFICIENTS[p.slot() + 1] * x[p.slot()])
            .sum::<f64>()
}

// ── Partial availability ───────────────────────────────────────────────

#[test]
fn test_missing_nitrate_only_affects_equations_using_it() {
    let input = EstimateInput::new(
        array![[330.0, 30.0, 500.0]],
        array![[35.0, 10.0, f64::NAN, 150.0, 20.0]],
        all_predictors(),
    );
    let params = EstimateParams::for_equations(&[1, 3]).unwrap();
    let out = estimate(constant_dataset(), &input, &params).unwrap();

    assert_eq!(out.estimates.dim(), (1, 2));
    assert!(out.estimates[[0, 0]].is_nan());
    assert!(out.uncertainties[[0, 0]].is_nan());

    assert_relative_eq!(out.estimates[[0, 1]], 2243.5, epsilon = 1e-6);
    let variance = (50.0f64 * 0.003).powi(2)
        + (2.0f64 * 0.003).powi(2)
        + (0.05f64 * 1.0).powi(2)
        + (0.3f64 * 1.0).powi(2)
        + 2.0f64.powi(2)
        + 2.0f64.powi(2);
    assert_relative_eq!(out.uncertainties[[0, 1]], variance.sqrt(), epsilon = 1e-9);
}

// ── Missing data ───────────────────────────────────────────────────────

#[test]
fn test_missing_coordinate_row_is_all_nan() {
    let input = EstimateInput::new(
        array![[330.0, 30.0, 500.0], [200.0, f64::NAN, 500.0], [200.0, 0.0, 100.0]],
        array![
            [35.0, 10.0, 5.0, 150.0, 20.0],
            [35.0, 10.0, 5.0, 150.0, 20.0],
            [34.0, 12.0, 8.0, 100.0, 40.0]
        ],
        all_predictors(),
    );
    let out = estimate(constant_dataset(), &input, &EstimateParams::default()).unwrap();

    assert_eq!(out.estimates.dim(), (3, 16));
    assert!(out.estimates.row(1).iter().all(|v| v.is_nan()));
    assert!(out.uncertainties.row(1).iter().all(|v| v.is_nan()));
    assert!(out.estimates.row(0).iter().all(|v| v.is_finite()));
    assert!(out.estimates.row(2).iter().all(|v| v.is_finite()));
}

#[test]
fn test_every_equation_matches_hand_evaluation() {
    let x = [34.0, 12.0, 8.0, 100.0, 40.0];
    let input = EstimateInput::new(array![[200.0, 0.0, 100.0]], array![x], all_predictors());
    let out = estimate(constant_dataset(), &input, &EstimateParams::default()).unwrap();

    for (j, &e) in out.equations.iter().enumerate() {
        assert_relative_eq!(out.estimates[[0, j]], expected_estimate(e, &x), epsilon = 1e-6);
    }
}

#[test]
fn test_columns_follow_requested_order() {
    let x = [35.0, 10.0, 5.0, 150.0, 20.0];
    let input = EstimateInput::new(array![[330.0, 30.0, 500.0]], array![x], all_predictors());
    let params = EstimateParams::for_equations(&[16, 1, 8]).unwrap();
    let out = estimate(constant_dataset(), &input, &params).unwrap();

    assert_eq!(out.equations, vec![eq(16), eq(1), eq(8)]);
    assert_eq!(out.column_of(eq(8)), Some(2));
    assert_eq!(out.column_of(eq(2)), None);
    assert_relative_eq!(out.estimates[[0, 0]], expected_estimate(eq(16), &x), epsilon = 1e-6);
    assert_relative_eq!(out.estimates[[0, 1]], expected_estimate(eq(1), &x), epsilon = 1e-6);
}

// ── Uncertainty ────────────────────────────────────────────────────────

#[test]
fn test_uncertainty_grows_with_each_input_uncertainty() {
    let dataset = constant_dataset();
    let estimator = Estimator::new(dataset).unwrap();
    let params = EstimateParams::for_equations(&[1]).unwrap();
    let base = [0.003, 0.003, 1.0, 1.0, 1.0];

    let run = |u: [f64; 5]| {
        let input = EstimateInput::new(
            array![[330.0, 30.0, 500.0]],
            array![[35.0, 10.0, 5.0, 150.0, 20.0]],
            all_predictors(),
        )
        .with_uncertainties(Array2::from_shape_vec((1, 5), u.to_vec()).unwrap());
        estimator.estimate(&input, &params).unwrap().uncertainties[[0, 0]]
    };

    let reference = run(base);
    for k in 0..5 {
        let mut previous = reference;
        for scale in [2.0, 5.0, 50.0] {
            let mut u = base;
            u[k] *= scale;
            let current = run(u);
            assert!(current >= previous, "slot {k}: {current} < {previous}");
            previous = current;
        }
    }
}

#[test]
fn test_model_error_follows_salinity() {
    let estimator = Estimator::new(constant_dataset()).unwrap();
    let mut params = EstimateParams::for_equations(&[16]).unwrap();
    params.baseline_uncertainty = 0.0;

    let input = EstimateInput::new(
        array![[200.0, 0.0, 100.0], [200.0, 0.0, 100.0], [200.0, 0.0, 100.0]],
        array![[30.0], [37.5], [45.0]],
        vec![Param::Salinity],
    )
    .with_uncertainties(array![[0.0]]);
    let out = estimator.estimate(&input, &params).unwrap();

    // Interpolated between 35 and 40, clamped beyond 40
    assert_relative_eq!(out.uncertainties[[0, 0]], 3.0, epsilon = 1e-12);
    assert_relative_eq!(out.uncertainties[[1, 0]], 3.0, epsilon = 1e-12);
    assert_relative_eq!(out.uncertainties[[2, 0]], 4.0, epsilon = 1e-12);
}

// ── Interpolation through the pipeline ─────────────────────────────────

#[test]
fn test_exact_at_grid_sites() {
    let dataset = linear_intercept_dataset();
    let estimator = Estimator::new(dataset).unwrap();
    let params = EstimateParams::for_equations(&[16]).unwrap();

    let sites = [[180.0, 0.0, 1000.0], [330.0, 30.0, 0.0], [90.0, -30.0, 3000.0]];
    for s in sites {
        let input = EstimateInput::new(array![s], array![[0.0]], vec![Param::Salinity]);
        let out = estimator.estimate(&input, &params).unwrap();
        let expected = s[0] + 2.0 * s[1] + s[2] / 25.0;
        assert_relative_eq!(out.estimates[[0, 0]], expected, epsilon = 1e-6);
    }
}

#[test]
fn test_far_field_tends_to_regional_mean() {
    let dataset = linear_intercept_dataset();
    let estimator = Estimator::new(dataset.clone()).unwrap();
    let params = EstimateParams::for_equations(&[16]).unwrap();

    // Scaled depths 9e9 .. 9.999e9, each ten times closer to the corner cube face
    let scaled = [9.0e9, 9.9e9, 9.99e9, 9.999e9];
    let coords = Array2::from_shape_fn((scaled.len(), 3), |(i, j)| [180.0, 0.0, scaled[i] * 25.0][j]);
    let input = EstimateInput::new(coords, Array2::zeros((scaled.len(), 1)), vec![Param::Salinity]);
    let out = estimator.estimate(&input, &params).unwrap();

    let intercepts = dataset.channel(eq(16), 0);
    let pacific: Vec<f64> = (0..dataset.len())
        .filter(|&i| {
            let s = dataset.site(i);
            lira_algorithms::partition::classify(s.lon, s.lat) == lira_algorithms::partition::Region::IndoPacific
        })
        .map(|i| intercepts[i])
        .collect();
    let mean = pacific.iter().sum::<f64>() / pacific.len() as f64;
    let (lo, hi) = pacific
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), &v| (a.min(v), b.max(v)));

    // The weight left on grid sites is at most the remaining distance to
    // the corner face over the depth of the cube below the deepest site.
    let deepest = 3000.0 / 25.0;
    let errors: Vec<f64> = out.estimates.column(0).iter().map(|v| (v - mean).abs()).collect();
    for (z, err) in scaled.iter().zip(&errors) {
        let site_weight = (1e10 - z) / (1e10 - deepest);
        assert!(
            *err <= site_weight * (hi - lo) + 1e-6 * (hi - lo),
            "error {err} at scaled depth {z} exceeds {}",
            site_weight * (hi - lo)
        );
    }
    assert!(errors[3] < errors[0]);
    assert!(errors[3] < 1e-3 * (hi - lo));
}

// ── Derived quantities ─────────────────────────────────────────────────

#[test]
fn test_derived_theta_and_aou_match_direct_input() {
    let coords = array![[330.0, 30.0, 1000.0]];
    let (s, t, o2) = (35.0, 10.0, 200.0);
    let params = EstimateParams::for_equations(&[7, 15]).unwrap();
    let estimator = Estimator::new(constant_dataset()).unwrap();

    let derived = estimator
        .estimate(
            &EstimateInput::new(
                coords.clone(),
                array![[s, t, o2]],
                vec![Param::Salinity, Param::Temperature, Param::Oxygen],
            ),
            &params,
        )
        .unwrap();

    let sw = Eos80;
    let p = sw.pressure(1000.0, 30.0);
    let theta = sw.potential_temperature(s, t, p, 0.0);
    let aou = sw.oxygen_saturation(s, theta) - o2;
    let direct = estimator
        .estimate(
            &EstimateInput::new(
                coords,
                array![[s, theta, aou]],
                vec![Param::Salinity, Param::PotentialTemperature, Param::Aou],
            ),
            &params,
        )
        .unwrap();

    for j in 0..2 {
        assert_relative_eq!(derived.estimates[[0, j]], direct.estimates[[0, j]], epsilon = 1e-9);
        assert_relative_eq!(derived.uncertainties[[0, j]], direct.uncertainties[[0, j]], epsilon = 1e-9);
    }
}

#[test]
fn test_molar_inputs_match_preconverted_inputs() {
    let coords = array![[200.0, 0.0, 2000.0]];
    let (s, theta, n, aou, si) = (34.7, 3.0, 30.0, 120.0, 100.0);
    let estimator = Estimator::new(constant_dataset()).unwrap();

    let sw = Eos80;
    let p = sw.pressure(2000.0, 0.0);
    let t = sw.in_situ_temperature(s, theta, p, 0.0);
    let factor = sw.density(s, t, p) / 1000.0;

    let per_kg = estimator
        .estimate(
            &EstimateInput::new(coords.clone(), array![[s, theta, n, aou, si]], all_predictors()),
            &EstimateParams::default(),
        )
        .unwrap();

    let molar_params = EstimateParams {
        molality: false,
        ..EstimateParams::default()
    };
    let molar = estimator
        .estimate(
            &EstimateInput::new(
                coords,
                array![[s, theta, n * factor, aou * factor, si * factor]],
                all_predictors(),
            ),
            &molar_params,
        )
        .unwrap();

    for j in 0..EQUATION_COUNT {
        assert_relative_eq!(molar.estimates[[0, j]], per_kg.estimates[[0, j]], epsilon = 1e-8);
        assert_relative_eq!(molar.uncertainties[[0, j]], per_kg.uncertainties[[0, j]], epsilon = 1e-9);
    }
}

#[test]
fn test_molar_uncertainties_match_preconverted_uncertainties() {
    let coords = array![[200.0, 0.0, 2000.0]];
    let (s, theta, n, aou, si) = (34.7, 3.0, 30.0, 120.0, 100.0);
    let (un, uaou, usi) = (2.0, 4.0, 3.0);
    let estimator = Estimator::new(constant_dataset()).unwrap();

    let sw = Eos80;
    let p = sw.pressure(2000.0, 0.0);
    let t = sw.in_situ_temperature(s, theta, p, 0.0);
    let factor = sw.density(s, t, p) / 1000.0;

    let per_kg = estimator
        .estimate(
            &EstimateInput::new(coords.clone(), array![[s, theta, n, aou, si]], all_predictors())
                .with_uncertainties(array![[f64::NAN, f64::NAN, un, uaou, usi]]),
            &EstimateParams::default(),
        )
        .unwrap();

    let molar_params = EstimateParams {
        molality: false,
        ..EstimateParams::default()
    };
    let molar = estimator
        .estimate(
            &EstimateInput::new(
                coords,
                array![[s, theta, n * factor, aou * factor, si * factor]],
                all_predictors(),
            )
            .with_uncertainties(array![[f64::NAN, f64::NAN, un * factor, uaou * factor, usi * factor]]),
            &molar_params,
        )
        .unwrap();

    for j in 0..EQUATION_COUNT {
        assert_relative_eq!(molar.uncertainties[[0, j]], per_kg.uncertainties[[0, j]], epsilon = 1e-9);
    }
}

// ── Errors and warnings ────────────────────────────────────────────────

#[test]
fn test_missing_required_parameter() {
    let input = EstimateInput::new(
        array![[330.0, 30.0, 500.0]],
        array![[35.0, 10.0]],
        vec![Param::Salinity, Param::PotentialTemperature],
    );
    let params = EstimateParams::for_equations(&[8, 7]).unwrap();
    match estimate(constant_dataset(), &input, &params) {
        Err(Error::MissingRequiredParameter { equation, param }) => {
            assert_eq!(equation, 7);
            assert_eq!(param, Param::Aou);
        }
        other => panic!("expected MissingRequiredParameter, got {other:?}"),
    }
}

#[test]
fn test_shape_mismatch() {
    let input = EstimateInput::new(array![[330.0, 30.0, 500.0]], array![[35.0, 10.0]], vec![Param::Salinity]);
    assert!(matches!(
        estimate(constant_dataset(), &input, &EstimateParams::default()),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_invalid_equations() {
    assert!(matches!(EstimateParams::for_equations(&[17]), Err(Error::InvalidParameter { .. })));
    assert!(matches!(EstimateParams::for_equations(&[0]), Err(Error::InvalidParameter { .. })));

    let input = EstimateInput::new(array![[330.0, 30.0, 500.0]], array![[35.0]], vec![Param::Salinity]);
    let empty = EstimateParams {
        equations: vec![],
        ..EstimateParams::default()
    };
    assert!(matches!(
        estimate(constant_dataset(), &input, &empty),
        Err(Error::InvalidParameter { .. })
    ));
}

#[test]
fn test_sentinel_values_warn_but_compute() {
    let input = EstimateInput::new(
        array![[330.0, 30.0, 500.0], [200.0, 0.0, 100.0]],
        array![[35.0, -999.0], [35.0, 10.0]],
        vec![Param::Salinity, Param::PotentialTemperature],
    );
    let params = EstimateParams::for_equations(&[8]).unwrap();
    let out = estimate(constant_dataset(), &input, &params).unwrap();

    assert_eq!(
        out.warnings,
        vec![Warning::SuspiciousSentinelValue {
            param: Param::PotentialTemperature,
            value: -999.0
        }]
    );
    assert_relative_eq!(
        out.estimates[[0, 0]],
        expected_estimate(eq(8), &[35.0, -999.0, 0.0, 0.0, 0.0]),
        epsilon = 1e-6
    );
}

// ── Configuration and reuse ────────────────────────────────────────────

#[test]
fn test_params_from_json() {
    let params: EstimateParams = serde_json::from_str(r#"{"equations": [3, 1], "molality": false}"#).unwrap();
    assert_eq!(params.equations, vec![eq(3), eq(1)]);
    assert!(!params.molality);
    assert_eq!(params.baseline_uncertainty, 2.0);

    assert!(serde_json::from_str::<EstimateParams>(r#"{"equations": [42]}"#).is_err());
}

#[test]
fn test_region_flags_from_dataset() {
    let sites = grid_sites();
    let n = sites.nrows();
    // Every site flagged Atlantic/Arctic: Indo-Pacific queries have no sites
    let coefficients = Array3::from_shape_fn((n, EQUATION_COUNT, CHANNEL_COUNT), |(_, _, c)| COEFFICIENTS[c]);
    let dataset = CoefficientDataset::new(sites, coefficients, model_error())
        .unwrap()
        .with_region_flags(vec![true; n])
        .unwrap();
    let estimator = Estimator::new(Arc::new(dataset)).unwrap();

    let input = EstimateInput::new(
        array![[330.0, 30.0, 500.0], [200.0, 0.0, 100.0]],
        array![[35.0], [35.0]],
        vec![Param::Salinity],
    );
    let out = estimator
        .estimate(&input, &EstimateParams::for_equations(&[16]).unwrap())
        .unwrap();
    assert_relative_eq!(out.estimates[[0, 0]], 500.0 + 50.0 * 35.0, epsilon = 1e-6);
    assert!(out.estimates[[1, 0]].is_nan());
}

#[test]
fn test_algorithm_trait_defaults() {
    let estimator = Estimator::new(constant_dataset()).unwrap();
    let input = EstimateInput::new(
        array![[330.0, 30.0, 500.0]],
        array![[35.0, 10.0, 5.0, 150.0, 20.0]],
        all_predictors(),
    );
    let out = estimator.execute_default(input).unwrap();
    assert_eq!(out.equations.len(), EQUATION_COUNT);
    assert!(!estimator.name().is_empty());
}

#[test]
fn test_dataset_loaded_from_json() {
    let dataset = constant_dataset();
    let tmp = tempfile::NamedTempFile::new().unwrap();
    lira_core::io::write_dataset(&dataset, tmp.path()).unwrap();
    let loaded = Arc::new(lira_core::io::read_dataset(tmp.path()).unwrap());

    let input = EstimateInput::new(array![[330.0, 30.0, 500.0]], array![[35.0]], vec![Param::Salinity]);
    let params = EstimateParams::for_equations(&[16]).unwrap();
    let a = estimate(dataset, &input, &params).unwrap();
    let b = estimate(loaded, &input, &params).unwrap();
    assert_relative_eq!(a.estimates[[0, 0]], b.estimates[[0, 0]], epsilon = 1e-9);
}
