use std::sync::Arc;

use bytes::Bytes;
use seiir_artifact::{Error as ArtifactError, Store};
use seiir_config::DrawId;

/// Directory of per-draw parameter tables, one `params_draw_<draw>.csv` each.
#[derive(Clone)]
pub struct ParameterPaths {
  store: Arc<dyn Store>,
}

impl ParameterPaths {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  pub fn draw_params(draw_id: DrawId) -> String {
    format!("params_draw_{draw_id}.csv")
  }

  /// Raw parameter table for a draw, or `None` if the draw has no file.
  pub async fn read_draw_params(&self, draw_id: DrawId) -> Result<Option<Bytes>, ArtifactError> {
    match self.store.read(&Self::draw_params(draw_id)).await {
      Ok(data) => Ok(Some(data)),
      Err(ArtifactError::NotFound(_)) => Ok(None),
      Err(e) => Err(e),
    }
  }
}
