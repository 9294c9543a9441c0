use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SpecError;
use crate::spec::{Specification, require_draws, require_path};
use crate::workflow::WorkflowSettings;

/// Specification of a beta regression run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSpecification {
  pub data: RegressionData,
  pub parameters: RegressionParameters,
  /// Covariates keyed by name. Their settings are handed to the regression
  /// program untouched; the pipeline only uses the names.
  #[serde(default)]
  pub covariates: BTreeMap<String, CovariateSpecification>,
  #[serde(default)]
  pub workflow: WorkflowSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionData {
  /// Output root of the ODE fit this regression reads.
  pub ode_fit_version: PathBuf,
  pub covariate_version: PathBuf,
  pub output_root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionParameters {
  pub n_draws: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CovariateSpecification {
  #[serde(default)]
  pub order: u32,
  #[serde(default)]
  pub use_re: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gprior: Option<[f64; 2]>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bounds: Option<[f64; 2]>,
}

impl RegressionSpecification {
  pub const DEFAULT_PROGRAM: &'static str = "beta_regression";
}

impl Specification for RegressionSpecification {
  const FILE_NAME: &'static str = "regression_specification.yaml";

  fn validate(&self) -> Result<(), SpecError> {
    require_path("data.ode_fit_version", &self.data.ode_fit_version)?;
    require_path("data.covariate_version", &self.data.covariate_version)?;
    require_path("data.output_root", &self.data.output_root)?;
    require_draws("parameters.n_draws", self.parameters.n_draws)?;

    for (name, covariate) in &self.covariates {
      if let Some([lower, upper]) = covariate.bounds
        && lower > upper
      {
        return Err(SpecError::Invalid(format!(
          "covariate '{name}' has inverted bounds [{lower}, {upper}]"
        )));
      }
    }
    Ok(())
  }

  fn output_root(&self) -> &Path {
    &self.data.output_root
  }
}
