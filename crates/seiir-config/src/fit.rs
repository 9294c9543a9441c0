use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::columns::InfectionColumns;
use crate::error::SpecError;
use crate::spec::{Specification, require_draws, require_path};

/// Specification of an ODE fit run.
///
/// The fit itself happens outside this pipeline; later stages only read the
/// fit's output root, draw count and the column names of its infection
/// inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSpecification {
  pub data: FitData,
  pub parameters: FitParameters,
  #[serde(default)]
  pub columns: InfectionColumns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitData {
  /// Root of the infectionator outputs the fit consumed.
  pub infection_version: PathBuf,
  pub output_root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitParameters {
  pub n_draws: u32,
}

impl Specification for FitSpecification {
  const FILE_NAME: &'static str = "fit_specification.yaml";

  fn validate(&self) -> Result<(), SpecError> {
    require_path("data.infection_version", &self.data.infection_version)?;
    require_path("data.output_root", &self.data.output_root)?;
    require_draws("parameters.n_draws", self.parameters.n_draws)
  }

  fn output_root(&self) -> &Path {
    &self.data.output_root
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_columns_default_and_override() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join(FitSpecification::FILE_NAME),
      "data:\n  infection_version: /in\n  output_root: /fit\nparameters:\n  n_draws: 2\ncolumns:\n  date: day\n",
    )
    .unwrap();

    let spec = FitSpecification::from_version_root(dir.path()).unwrap();
    assert_eq!(spec.columns.date, "day");
    assert_eq!(spec.columns.lag, "i_d_lag");
  }
}
