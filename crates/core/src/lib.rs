//! # LIRA Core
//!
//! Core types for locally interpolated regression estimates of seawater
//! total alkalinity.
//!
//! This crate provides:
//! - `Param` and `Equation`: canonical measurement slots and the 16
//!   predictor combinations
//! - `Coordinate`: query/grid locations and depth scaling
//! - `CoefficientDataset`: the precomputed coefficient field
//! - `SeawaterProperties`: pressure, potential temperature, density and
//!   oxygen solubility (EOS-80 implementation in `Eos80`)
//! - I/O for the JSON dataset format

pub mod coords;
pub mod dataset;
pub mod error;
pub mod io;
pub mod params;
pub mod seawater;

pub use coords::{Coordinate, DEPTH_SCALE};
pub use dataset::{CoefficientDataset, ModelErrorTable};
pub use error::{Error, Result, Warning};
pub use params::{Equation, Param};
pub use seawater::{Eos80, SeawaterProperties};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::coords::Coordinate;
    pub use crate::dataset::{CoefficientDataset, ModelErrorTable};
    pub use crate::error::{Error, Result, Warning};
    pub use crate::params::{Equation, Param};
    pub use crate::seawater::{Eos80, SeawaterProperties};
    pub use crate::Algorithm;
}

/// Core trait for the computations in LIRA.
///
/// Algorithms are deterministic functions of their input and parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
