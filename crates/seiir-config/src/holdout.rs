use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::columns::InfectionColumns;
use crate::error::SpecError;
use crate::spec::{Specification, require_draws, require_path};
use crate::workflow::WorkflowSettings;

/// Specification of a holdout split run: copies an infectionator output into
/// train and validation partitions for every location and draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutSpecification {
  pub data: HoldoutData,
  pub parameters: HoldoutParameters,
  #[serde(default)]
  pub columns: InfectionColumns,
  #[serde(default)]
  pub workflow: WorkflowSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutData {
  pub infection_version: PathBuf,
  /// Directory of per-draw parameter files (`params_draw_<draw>.csv`).
  pub parameter_version: PathBuf,
  pub output_root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutParameters {
  /// Trailing days withheld from training.
  pub time_holdout: u32,
  pub n_draws: u32,
}

impl Specification for HoldoutSpecification {
  const FILE_NAME: &'static str = "holdout_specification.yaml";

  fn validate(&self) -> Result<(), SpecError> {
    require_path("data.infection_version", &self.data.infection_version)?;
    require_path("data.parameter_version", &self.data.parameter_version)?;
    require_path("data.output_root", &self.data.output_root)?;
    require_draws("parameters.n_draws", self.parameters.n_draws)?;

    if self.data.output_root == self.data.infection_version {
      return Err(SpecError::Invalid(
        "data.output_root must differ from data.infection_version".to_string(),
      ));
    }
    Ok(())
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
    let path = dir.path().join("holdout.yaml");
    std::fs::write(
      &path,
      r#"
data:
  infection_version: /in
  parameter_version: /params
  output_root: /out
parameters:
  time_holdout: 10
  n_draws: 3
columns:
  lag: lag_days
"#,
    )
    .unwrap();

    let spec = HoldoutSpecification::from_path(&path).unwrap();
    assert_eq!(spec.columns.lag, "lag_days");
    assert_eq!(spec.columns.date, "date");
    assert_eq!(spec.columns.observed_deaths, "obs_deaths");
    assert_eq!(spec.parameters.time_holdout, 10);
  }

  #[test]
  fn test_output_must_differ_from_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("holdout.yaml");
    std::fs::write(
      &path,
      r#"
data:
  infection_version: /same
  parameter_version: /params
  output_root: /same
parameters:
  time_holdout: 10
  n_draws: 3
"#,
    )
    .unwrap();

    assert!(matches!(
      HoldoutSpecification::from_path(&path),
      Err(SpecError::Invalid(_))
    ));
  }
}
