//! Seiir Paths
//!
//! Canonical artifact layout for every pipeline stage. Key computation is a
//! pure function of (stage, location id, draw id, artifact kind); the same
//! inputs always produce the same key. Keys are relative to the stage's
//! output root, which is the root of the stage's [`Store`].
//!
//! Each stage's paths type implements [`StageLayout`], whose
//! [`make_dirs`](StageLayout::make_dirs) creates the per-location directory
//! structure exactly once per run.
//!
//! [`Store`]: seiir_artifact::Store

mod covariate;
mod error;
mod forecast;
mod infection;
mod layout;
mod parameters;
mod regression;

pub use covariate::CovariatePaths;
pub use error::PathsError;
pub use forecast::ForecastPaths;
pub use infection::{DrawFile, FitPaths, HoldoutPaths, InfectionPaths};
pub use layout::StageLayout;
pub use parameters::ParameterPaths;
pub use regression::RegressionPaths;
