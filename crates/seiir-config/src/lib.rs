//! Seiir Config
//!
//! This crate contains the serializable stage specifications for the seiir
//! pipeline. A specification describes one run of one stage (ODE fit, holdout
//! split, regression, forecast): where its inputs live, where its outputs go,
//! how many draws it covers, and its stage parameters.
//!
//! Specifications can be loaded from:
//! - YAML files (`.yaml` / `.yml`)
//! - JSON files (`.json`)
//!
//! A specification is validated once when loaded and is immutable afterwards.
//! Later stages never embed an earlier stage's configuration; they hold the
//! earlier stage's output root and load its specification file from there
//! (see [`Specification::from_version_root`]).

mod columns;
mod error;
mod fit;
mod forecast;
mod holdout;
mod regression;
mod spec;
mod workflow;

pub use columns::{DRAW_COLUMN, InfectionColumns};
pub use error::SpecError;
pub use fit::{FitData, FitParameters, FitSpecification};
pub use forecast::{ForecastData, ForecastSpecification};
pub use holdout::{HoldoutData, HoldoutParameters, HoldoutSpecification};
pub use regression::{
  CovariateSpecification, RegressionData, RegressionParameters, RegressionSpecification,
};
pub use spec::Specification;
pub use workflow::WorkflowSettings;

/// Identifier of a geographic unit. Partitions every artifact.
pub type LocationId = u32;

/// Identifier of one stochastic replicate, `0..n_draws`.
pub type DrawId = u32;
