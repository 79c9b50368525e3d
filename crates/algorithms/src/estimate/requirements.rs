//! Which predictors the requested equations need, and how to get them
//!
//! Potential temperature can be derived from temperature, and AOU from
//! oxygen once a temperature of either kind is known. Every check runs
//! before any interpolation so that a call fails fast on insufficient input.

use lira_core::params::SLOT_COUNT;
use lira_core::{Equation, Error, Param, Result};

/// Derivations the filler has to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Requirements {
    /// Derive θ from temperature
    pub derive_theta: bool,
    /// Derive AOU from oxygen saturation minus oxygen
    pub derive_aou: bool,
    /// Convert molar concentrations to per-kilogram units
    pub convert_molar: bool,
}

pub fn resolve(equations: &[Equation], supplied: &[bool; SLOT_COUNT], molality: bool) -> Result<Requirements> {
    let Some(first) = equations.first() else {
        return Err(Error::InvalidParameter {
            name: "equations",
            value: "[]".into(),
            reason: "at least one equation is required".into(),
        });
    };

    let has = |p: Param| supplied[p.slot()];
    let theta_available = has(Param::PotentialTemperature) || has(Param::Temperature);
    let aou_available = has(Param::Aou) || (has(Param::Oxygen) && theta_available);

    for &eq in equations {
        for p in eq.predictors() {
            let available = match p {
                Param::PotentialTemperature => theta_available,
                Param::Aou => aou_available,
                _ => has(p),
            };
            if !available {
                return Err(Error::MissingRequiredParameter {
                    equation: eq.number(),
                    param: p,
                });
            }
        }
    }

    let needs = |p: Param| equations.iter().any(|eq| eq.uses(p));
    let derive_aou = needs(Param::Aou) && !has(Param::Aou);
    // AOU derivation and density both need θ
    let needs_theta = needs(Param::PotentialTemperature) || derive_aou || !molality;

    if needs_theta && !theta_available {
        return Err(Error::MissingRequiredParameter {
            equation: first.number(),
            param: Param::PotentialTemperature,
        });
    }

    Ok(Requirements {
        derive_theta: needs_theta && !has(Param::PotentialTemperature),
        derive_aou,
        convert_molar: !molality,
    })
}
