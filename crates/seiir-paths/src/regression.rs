use std::sync::Arc;

use seiir_artifact::{Store, join_key};
use seiir_config::{DrawId, LocationId};

use crate::error::PathsError;
use crate::layout::{StageLayout, location_containers};

/// Output root of a beta regression.
///
/// ```text
/// {root}/
/// ├── regression_specification.yaml
/// ├── info/                              covariate metadata copied at launch
/// ├── beta/{location_id}/regression_draw_{draw_id}.csv
/// ├── coefficients/coefficients_draw_{draw_id}.csv
/// └── parameters/params_draw_{draw_id}.csv
/// ```
#[derive(Clone)]
pub struct RegressionPaths {
  store: Arc<dyn Store>,
}

impl RegressionPaths {
  pub const INFO_DIR: &'static str = "info";
  pub const BETA_DIR: &'static str = "beta";
  pub const COEFFICIENT_DIR: &'static str = "coefficients";
  pub const PARAMETER_DIR: &'static str = "parameters";

  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &Arc<dyn Store> {
    &self.store
  }

  pub fn info_file(file_name: &str) -> String {
    join_key([Self::INFO_DIR, file_name])
  }

  pub fn beta_file(location_id: LocationId, draw_id: DrawId) -> String {
    join_key([
      Self::BETA_DIR,
      &location_id.to_string(),
      &format!("regression_draw_{draw_id}.csv"),
    ])
  }

  /// Locations the regression was set up for, ascending.
  pub async fn location_ids(&self) -> Result<Vec<LocationId>, PathsError> {
    location_containers(self.store.as_ref(), Self::BETA_DIR).await
  }
}

impl StageLayout for RegressionPaths {
  fn store(&self) -> &dyn Store {
    self.store.as_ref()
  }

  fn run_dirs(&self) -> Vec<String> {
    vec![
      Self::INFO_DIR.to_string(),
      Self::COEFFICIENT_DIR.to_string(),
      Self::PARAMETER_DIR.to_string(),
    ]
  }

  fn location_dirs(&self, location_id: LocationId) -> Vec<String> {
    vec![join_key([Self::BETA_DIR, &location_id.to_string()])]
  }
}
