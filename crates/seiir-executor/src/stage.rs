//! Plumbing shared by the stage orchestrators.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use seiir_artifact::{Error as ArtifactError, FsStore, Store};
use seiir_config::{Specification, WorkflowSettings};
use seiir_engine::{EngineConfig, ExecutionReport, LocalEngine, TaskAction, dispatch};
use seiir_workflow::{TaskId, TaskStatus, Workflow};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::ExecutorError;

pub(crate) fn fs_store(root: &Path) -> Arc<dyn Store> {
  Arc::new(FsStore::new(root))
}

/// Write a stage's specification into its own output root, once.
pub(crate) async fn record_specification<S: Specification>(
  store: &dyn Store,
  spec: &S,
) -> Result<(), ExecutorError> {
  let yaml = spec.to_yaml()?;
  match store.write_atomic(S::FILE_NAME, Bytes::from(yaml)).await {
    Ok(()) => {
      info!(file = S::FILE_NAME, "recorded specification");
      Ok(())
    }
    Err(ArtifactError::AlreadyExists(key)) => Err(ExecutorError::SpecificationExists(key)),
    Err(e) => Err(e.into()),
  }
}

/// Run a workflow on the local engine.
pub(crate) async fn run_workflow(
  workflow: &Workflow,
  actions: HashMap<TaskId, Arc<dyn TaskAction>>,
  settings: &WorkflowSettings,
  cancel: CancellationToken,
) -> Result<ExecutionReport, ExecutorError> {
  let mut engine = LocalEngine::new(
    workflow.name.clone(),
    EngineConfig {
      max_concurrency: settings.max_concurrency,
    },
  );
  Ok(dispatch(&mut engine, workflow, actions, cancel).await?)
}

/// Turn a report with failed or blocked tasks into an error, logging each
/// failure with the location and draw it belongs to.
pub fn ensure_success(
  workflow: &str,
  report: ExecutionReport,
) -> Result<ExecutionReport, ExecutorError> {
  if report.is_success() {
    return Ok(report);
  }
  for record in report.with_status(TaskStatus::Failed) {
    error!(
      task_id = %record.node.task_id,
      location_id = ?record.node.location_id,
      draw_id = ?record.node.draw_id,
      error = record.detail.as_deref().unwrap_or_default(),
      "task failed"
    );
  }
  Err(ExecutorError::TasksFailed {
    workflow: workflow.to_string(),
    failed: report.count(TaskStatus::Failed),
    blocked: report.count(TaskStatus::Blocked),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use seiir_artifact::InMemoryStore;
  use seiir_config::{FitData, FitParameters, FitSpecification, InfectionColumns};

  #[tokio::test]
  async fn test_record_specification_once() {
    let store = InMemoryStore::new();
    let spec = FitSpecification {
      data: FitData {
        infection_version: "/inputs/infections".into(),
        output_root: "/outputs/fit".into(),
      },
      parameters: FitParameters { n_draws: 3 },
      columns: InfectionColumns::default(),
    };

    record_specification(&store, &spec).await.unwrap();
    let recorded = store.read(FitSpecification::FILE_NAME).await.unwrap();
    assert!(std::str::from_utf8(&recorded).unwrap().contains("n_draws: 3"));

    let err = record_specification(&store, &spec).await.unwrap_err();
    assert!(err.is_conflict());
  }
}
