//! Canonical measurement slots and the regression equation table
//!
//! Measurements are reordered into seven fixed slots regardless of the
//! caller's column order. The first five slots are the regression
//! predictors; oxygen and temperature only feed derived quantities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of canonical measurement slots
pub const SLOT_COUNT: usize = 7;
/// Number of regression predictors (S, θ, N, AOU, Si)
pub const PREDICTOR_COUNT: usize = 5;
/// Number of coefficient channels per equation (intercept + predictors)
pub const CHANNEL_COUNT: usize = PREDICTOR_COUNT + 1;
/// Number of regression equations
pub const EQUATION_COUNT: usize = 16;

/// Default measurement uncertainties, indexed by slot.
///
/// Salinity (PSS-78), temperatures (°C) and concentrations (µmol/kg).
pub const DEFAULT_UNCERTAINTIES: [f64; SLOT_COUNT] = [0.003, 0.003, 1.0, 1.0, 1.0, 1.0, 0.003];

/// A canonical measurement slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Param {
    Salinity,
    PotentialTemperature,
    Nitrate,
    Aou,
    Silicate,
    Oxygen,
    Temperature,
}

impl Param {
    /// All slots in canonical order
    pub const ALL: [Param; SLOT_COUNT] = [
        Param::Salinity,
        Param::PotentialTemperature,
        Param::Nitrate,
        Param::Aou,
        Param::Silicate,
        Param::Oxygen,
        Param::Temperature,
    ];

    /// The regression predictors in canonical order
    pub const PREDICTORS: [Param; PREDICTOR_COUNT] = [
        Param::Salinity,
        Param::PotentialTemperature,
        Param::Nitrate,
        Param::Aou,
        Param::Silicate,
    ];

    /// Position of this parameter in the canonical layout
    #[inline]
    pub fn slot(self) -> usize {
        self as usize
    }

    /// Parameter from its 1-based integer id (1 = salinity ... 7 = temperature)
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1..=7 => Ok(Self::ALL[(id - 1) as usize]),
            _ => Err(Error::InvalidParameter {
                name: "parameter id",
                value: id.to_string(),
                reason: "must be between 1 and 7".into(),
            }),
        }
    }

    /// 1-based integer id
    pub fn id(self) -> u8 {
        self.slot() as u8 + 1
    }

    /// Coefficient channel of this parameter, if it is a predictor
    pub fn channel(self) -> Option<usize> {
        let slot = self.slot();
        (slot < PREDICTOR_COUNT).then_some(slot + 1)
    }

    pub fn default_uncertainty(self) -> f64 {
        DEFAULT_UNCERTAINTIES[self.slot()]
    }

    pub fn name(self) -> &'static str {
        match self {
            Param::Salinity => "salinity",
            Param::PotentialTemperature => "potential temperature",
            Param::Nitrate => "nitrate",
            Param::Aou => "AOU",
            Param::Silicate => "silicate",
            Param::Oxygen => "oxygen",
            Param::Temperature => "temperature",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Predictor membership of each equation: S, θ, N, AOU, Si.
const MEMBERSHIP: [[bool; PREDICTOR_COUNT]; EQUATION_COUNT] = [
    [true, true, true, true, true],
    [true, true, true, false, true],
    [true, true, false, true, true],
    [true, true, false, false, true],
    [true, true, true, true, false],
    [true, true, true, false, false],
    [true, true, false, true, false],
    [true, true, false, false, false],
    [true, false, true, true, true],
    [true, false, true, false, true],
    [true, false, false, true, true],
    [true, false, false, false, true],
    [true, false, true, true, false],
    [true, false, true, false, false],
    [true, false, false, true, false],
    [true, false, false, false, false],
];

/// One of the 16 regression equations, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Equation(u8);

impl Equation {
    pub fn new(number: u8) -> Result<Self> {
        if (1..=EQUATION_COUNT as u8).contains(&number) {
            Ok(Self(number))
        } else {
            Err(Error::InvalidParameter {
                name: "equation",
                value: number.to_string(),
                reason: format!("must be between 1 and {EQUATION_COUNT}"),
            })
        }
    }

    /// All equations in ascending order
    pub fn all() -> impl Iterator<Item = Equation> {
        (1..=EQUATION_COUNT as u8).map(Equation)
    }

    #[inline]
    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index into per-equation tables
    #[inline]
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Whether `param` is a predictor of this equation
    pub fn uses(self, param: Param) -> bool {
        param.slot() < PREDICTOR_COUNT && MEMBERSHIP[self.index()][param.slot()]
    }

    /// Predictors of this equation in canonical order
    pub fn predictors(self) -> impl Iterator<Item = Param> {
        let row = MEMBERSHIP[self.index()];
        Param::PREDICTORS
            .into_iter()
            .filter(move |p| row[p.slot()])
    }
}

impl TryFrom<u8> for Equation {
    type Error = Error;

    fn try_from(number: u8) -> Result<Self> {
        Equation::new(number)
    }
}

impl From<Equation> for u8 {
    fn from(eq: Equation) -> u8 {
        eq.0
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
