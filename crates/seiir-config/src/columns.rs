use serde::{Deserialize, Serialize};

/// Column added to spliced output to tell draws apart.
pub const DRAW_COLUMN: &str = "draw";

/// Column names of an infectionator time series.
///
/// Resolved from configuration so readers never hardcode the literals.
/// Missing fields fall back to the names the infectionator writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfectionColumns {
  pub date: String,
  pub observed_deaths: String,
  pub observed_cases: String,
  pub lag: String,
}

impl Default for InfectionColumns {
  fn default() -> Self {
    Self {
      date: "date".to_string(),
      observed_deaths: "obs_deaths".to_string(),
      observed_cases: "obs_infecs".to_string(),
      lag: "i_d_lag".to_string(),
    }
  }
}
