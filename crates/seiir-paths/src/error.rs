use seiir_config::LocationId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathsError {
  #[error("no folder found for location {location_id}")]
  NoLocationFolder { location_id: LocationId },

  #[error("more than one folder found for location {location_id}: {folders:?}")]
  AmbiguousLocationFolder {
    location_id: LocationId,
    folders: Vec<String>,
  },

  #[error("output for location {location_id} already exists at '{key}'")]
  Conflict { location_id: LocationId, key: String },

  #[error("run directory '{key}' already exists")]
  RunConflict { key: String },

  #[error(transparent)]
  Artifact(#[from] seiir_artifact::Error),
}

impl PathsError {
  /// Whether the error stems from an inconsistent input layout rather than
  /// from storage.
  pub fn is_configuration(&self) -> bool {
    matches!(
      self,
      PathsError::NoLocationFolder { .. } | PathsError::AmbiguousLocationFolder { .. }
    )
  }

  /// Whether the error is a refusal to reuse existing output.
  pub fn is_conflict(&self) -> bool {
    matches!(
      self,
      PathsError::Conflict { .. } | PathsError::RunConflict { .. }
    )
  }
}
