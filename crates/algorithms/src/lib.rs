//! # LIRA Algorithms
//!
//! Regional interpolation and total alkalinity estimation.
//!
//! ## Modules
//!
//! - **interpolation**: k-d tree, 3-D Delaunay tetrahedralization, scattered
//!   linear interpolation with far-field corners, 1-D table lookup
//! - **partition**: Atlantic/Arctic vs Indo-Pacific classification
//! - **estimate**: the estimation pipeline and [`estimate::Estimator`]

pub mod estimate;
pub mod interpolation;
pub(crate) mod maybe_rayon;
pub mod partition;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::estimate::{estimate, EstimateInput, EstimateOutput, EstimateParams, Estimator};
    pub use crate::interpolation::{BoundInterpolant, Location, ScatteredInterpolant, Site};
    pub use crate::partition::{classify, Partition, Region};
    pub use lira_core::prelude::*;
}
