use seiir_config::{DrawId, LocationId, SpecError};
use seiir_engine::EngineError;
use seiir_paths::PathsError;
use seiir_series::SeriesError;
use seiir_workflow::WorkflowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
  #[error("location {location_id}, draw {draw_id}: invalid series")]
  Series {
    location_id: LocationId,
    draw_id: DrawId,
    #[source]
    source: SeriesError,
  },

  #[error("location {location_id}, draw {draw_id}: missing input '{key}'")]
  MissingInput {
    location_id: LocationId,
    draw_id: DrawId,
    key: String,
  },

  #[error("location {location_id}: storage error")]
  LocationArtifact {
    location_id: LocationId,
    #[source]
    source: seiir_artifact::Error,
  },

  #[error("specification already recorded at '{0}', refusing to reuse the output root")]
  SpecificationExists(String),

  #[error("workflow '{workflow}': {failed} task(s) failed, {blocked} blocked")]
  TasksFailed {
    workflow: String,
    failed: usize,
    blocked: usize,
  },

  #[error(transparent)]
  Spec(#[from] SpecError),

  #[error(transparent)]
  Paths(#[from] PathsError),

  #[error(transparent)]
  Artifact(#[from] seiir_artifact::Error),

  #[error(transparent)]
  Workflow(#[from] WorkflowError),

  #[error(transparent)]
  Engine(#[from] EngineError),
}

impl ExecutorError {
  pub(crate) fn series(location_id: LocationId, draw_id: DrawId) -> impl FnOnce(SeriesError) -> Self {
    move |source| ExecutorError::Series {
      location_id,
      draw_id,
      source,
    }
  }

  pub(crate) fn artifact(location_id: LocationId) -> impl FnOnce(seiir_artifact::Error) -> Self {
    move |source| ExecutorError::LocationArtifact {
      location_id,
      source,
    }
  }

  /// Inputs or configuration are inconsistent: ambiguous or missing lag,
  /// unresolvable location folder, malformed specification reference.
  pub fn is_configuration(&self) -> bool {
    match self {
      ExecutorError::Series { source, .. } => source.is_configuration(),
      ExecutorError::Paths(e) => e.is_configuration(),
      ExecutorError::Spec(_) => true,
      _ => false,
    }
  }

  /// A stage refused to write into output left by an earlier run.
  pub fn is_conflict(&self) -> bool {
    match self {
      ExecutorError::Paths(e) => e.is_conflict(),
      ExecutorError::SpecificationExists(_) => true,
      _ => false,
    }
  }
}
