//! Derived quantities: θ, molar-to-molal conversion and AOU
//!
//! Derived θ inherits the temperature uncertainty and derived AOU the
//! oxygen uncertainty, without adding any derivation error. Default
//! uncertainties are already per kilogram; only uncertainties the caller
//! gave per litre are converted.

use lira_core::{Param, SeawaterProperties};

use super::normalize::Normalized;
use super::requirements::Requirements;

/// Slots given per litre in molar inputs
const CONCENTRATIONS: [Param; 4] = [Param::Nitrate, Param::Aou, Param::Silicate, Param::Oxygen];

pub fn fill<W: SeawaterProperties + ?Sized>(seawater: &W, norm: &mut Normalized, req: &Requirements) {
    if !(req.derive_theta || req.derive_aou || req.convert_molar) {
        return;
    }

    let s = Param::Salinity.slot();
    let theta = Param::PotentialTemperature.slot();
    let t = Param::Temperature.slot();
    let o2 = Param::Oxygen.slot();
    let aou = Param::Aou.slot();
    let has_temperature = norm.has(Param::Temperature);

    let rows = norm
        .values
        .outer_iter_mut()
        .zip(norm.uncertainties.outer_iter_mut())
        .zip(norm.uncertainty_given.outer_iter())
        .zip(&norm.coordinates);

    for (((mut v, mut u), given), c) in rows {
        let p = seawater.pressure(c.depth, c.lat);

        if req.derive_theta {
            v[theta] = seawater.potential_temperature(v[s], v[t], p, 0.0);
            u[theta] = u[t];
        }

        // Conversion comes first so that AOU is derived from per-kg oxygen
        if req.convert_molar {
            let in_situ = if has_temperature {
                v[t]
            } else {
                seawater.in_situ_temperature(v[s], v[theta], p, 0.0)
            };
            let factor = seawater.density(v[s], in_situ, p) / 1000.0;
            for param in CONCENTRATIONS {
                let slot = param.slot();
                v[slot] /= factor;
                if given[slot] {
                    u[slot] /= factor;
                }
            }
        }

        if req.derive_aou {
            v[aou] = seawater.oxygen_saturation(v[s], v[theta]) - v[o2];
            u[aou] = u[o2];
        }
    }

    tracing::debug!(
        rows = norm.rows(),
        derive_theta = req.derive_theta,
        derive_aou = req.derive_aou,
        convert_molar = req.convert_molar,
        "filled derived quantities"
    );
}
