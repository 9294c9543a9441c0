//! Seiir Executor
//!
//! Stage drivers wiring specifications, artifact layouts and the task engine
//! together:
//!
//! - [`HoldoutSplitter`] splits one location's infectionator draws into train
//!   and validation partitions (the `split` command), and
//!   [`HoldoutStage`] fans that out as one task per (location, draw).
//! - [`SpliceInputs`] splices every draw of one location's history with its
//!   forecast into a single per-location file (the `splice` command).
//! - [`RegressionStage`] and [`ForecastStage`] prepare their output roots and
//!   dispatch the external modeling programs as a task graph.
//!
//! Every stage records its own specification in its output root and refuses
//! to run into an output root that already holds a previous run.

mod error;
mod forecast;
mod holdout;
mod regression;
mod splice;
mod split;
mod stage;

pub use error::ExecutorError;
pub use forecast::ForecastStage;
pub use holdout::HoldoutStage;
pub use regression::RegressionStage;
pub use splice::SpliceInputs;
pub use split::{DrawOutcome, HoldoutSplitter, SplitReport};
pub use stage::ensure_success;
