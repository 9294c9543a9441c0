use std::sync::Arc;

use seiir_artifact::{Store, join_key};
use seiir_config::{DrawId, LocationId};

use crate::layout::StageLayout;

/// Output root of a beta forecast.
///
/// ```text
/// {root}/
/// ├── forecast_specification.yaml
/// ├── component_draws/{location_id}/draw_{draw_id}.csv   per-draw forecasts
/// └── spliced/{location_id}.csv                          all draws, history + forecast
/// ```
#[derive(Clone)]
pub struct ForecastPaths {
  store: Arc<dyn Store>,
}

impl ForecastPaths {
  pub const COMPONENT_DIR: &'static str = "component_draws";
  pub const SPLICED_DIR: &'static str = "spliced";

  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &Arc<dyn Store> {
    &self.store
  }

  pub fn component_draw_file(location_id: LocationId, draw_id: DrawId) -> String {
    join_key([
      Self::COMPONENT_DIR,
      &location_id.to_string(),
      &format!("draw_{draw_id}.csv"),
    ])
  }

  pub fn spliced_file(location_id: LocationId) -> String {
    join_key([Self::SPLICED_DIR, &format!("{location_id}.csv")])
  }
}

impl StageLayout for ForecastPaths {
  fn store(&self) -> &dyn Store {
    self.store.as_ref()
  }

  fn run_dirs(&self) -> Vec<String> {
    vec![Self::SPLICED_DIR.to_string()]
  }

  fn location_dirs(&self, location_id: LocationId) -> Vec<String> {
    vec![join_key([Self::COMPONENT_DIR, &location_id.to_string()])]
  }
}
