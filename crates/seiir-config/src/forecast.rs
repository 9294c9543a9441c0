use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SpecError;
use crate::spec::{Specification, require_path};
use crate::workflow::WorkflowSettings;

/// Specification of a beta forecast run.
///
/// The draw count is not repeated here; it comes from the referenced
/// regression specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSpecification {
  pub data: ForecastData,
  #[serde(default)]
  pub workflow: WorkflowSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastData {
  /// Output root of the regression this forecast reads.
  pub regression_version: PathBuf,
  pub covariate_version: PathBuf,
  pub output_root: PathBuf,
}

impl ForecastSpecification {
  pub const DEFAULT_PROGRAM: &'static str = "beta_forecast";
}

impl Specification for ForecastSpecification {
  const FILE_NAME: &'static str = "forecast_specification.yaml";

  fn validate(&self) -> Result<(), SpecError> {
    require_path("data.regression_version", &self.data.regression_version)?;
    require_path("data.covariate_version", &self.data.covariate_version)?;
    require_path("data.output_root", &self.data.output_root)
  }

  fn output_root(&self) -> &Path {
    &self.data.output_root
  }
}
