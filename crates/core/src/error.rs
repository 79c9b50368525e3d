//! Error and warning types for LIRA

use std::fmt;

use thiserror::Error;

use crate::params::Param;

/// Main error type for LIRA operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Equation {equation} requires {param}, which was neither supplied nor derivable")]
    MissingRequiredParameter { equation: u8, param: Param },

    #[error("Coefficient dataset unavailable: {0}")]
    DatasetUnavailable(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Error {
    pub(crate) fn shape(what: &'static str, expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Error::ShapeMismatch {
            what,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Result type alias for LIRA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal conditions detected while estimating.
///
/// Warnings never stop the computation; they are returned alongside the
/// estimates and logged through `tracing`.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A measurement column holds a value that looks like a missing-data
    /// sentinel (e.g. `-999`, `-9999`, `1e10`) instead of NaN. The value is
    /// used as given.
    SuspiciousSentinelValue { param: Param, value: f64 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SuspiciousSentinelValue { param, value } => write!(
                f,
                "{param} contains {value}, which looks like a missing-data sentinel; use NaN for missing values"
            ),
        }
    }
}
