//! Beta forecast stage.
//!
//! One external forecast task per (location, draw), then one in-process
//! splice task per location that waits on every forecast task of that
//! location. A failed forecast draw blocks only its own location's splice.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use seiir_artifact::Store;
use seiir_config::{
  FitSpecification, ForecastSpecification, LocationId, RegressionSpecification, Specification,
  WorkflowSettings,
};
use seiir_engine::{CommandAction, ExecutionReport, FnAction, TaskAction, TaskError, TaskOutcome};
use seiir_paths::{ForecastPaths, RegressionPaths, StageLayout};
use seiir_workflow::{DependencyScope, Stage, TaskId, TaskNode, WorkflowBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::ExecutorError;
use crate::splice::SpliceInputs;
use crate::stage::{fs_store, record_specification, run_workflow};

pub struct ForecastStage {
  spec: ForecastSpecification,
  regression: RegressionPaths,
  output: ForecastPaths,
  splice: SpliceInputs,
}

impl ForecastStage {
  pub const WORKFLOW: &'static str = "forecast";

  pub fn new(
    spec: ForecastSpecification,
    regression: Arc<dyn Store>,
    output: Arc<dyn Store>,
    splice: SpliceInputs,
  ) -> Self {
    Self {
      spec,
      regression: RegressionPaths::new(regression),
      output: ForecastPaths::new(output),
      splice,
    }
  }

  /// Follow the regression reference down to the infection history the
  /// splice tasks read.
  pub fn from_specification(spec: ForecastSpecification) -> Result<Self, ExecutorError> {
    let regression = RegressionSpecification::from_version_root(&spec.data.regression_version)?;
    let fit = FitSpecification::from_version_root(&regression.data.ode_fit_version)?;

    let output = fs_store(&spec.data.output_root);
    let splice = SpliceInputs::new(
      fs_store(&fit.data.infection_version),
      output.clone(),
      fit.columns,
      regression.parameters.n_draws,
    );
    let regression_store = fs_store(&spec.data.regression_version);
    Ok(Self::new(spec, regression_store, output, splice))
  }

  pub fn settings(&self) -> &WorkflowSettings {
    &self.spec.workflow
  }

  fn command(&self, location_id: LocationId, draw_id: u32) -> CommandAction {
    CommandAction::new(
      self
        .spec
        .workflow
        .program_or(ForecastSpecification::DEFAULT_PROGRAM),
    )
    .args([
      "--location-id".to_string(),
      location_id.to_string(),
      "--draw-id".to_string(),
      draw_id.to_string(),
      "--forecast-version".to_string(),
      self.spec.data.output_root.display().to_string(),
    ])
  }

  fn splice_action(&self, location_id: LocationId) -> FnAction {
    let splice = self.splice.clone();
    FnAction::new(move |_| {
      let splice = splice.clone();
      async move {
        splice
          .splice_location(location_id)
          .await
          .map_err(TaskError::action)?;
        Ok(TaskOutcome::Completed)
      }
      .boxed()
    })
  }

  /// Set up the output root and run forecasts followed by per-location
  /// splicing.
  #[instrument(name = "forecast", skip_all, fields(output_root = %self.spec.data.output_root.display()))]
  pub async fn run(&self, cancel: CancellationToken) -> Result<ExecutionReport, ExecutorError> {
    let location_ids = self.regression.location_ids().await?;
    let n_draws = self.splice.n_draws();
    info!(locations = location_ids.len(), n_draws, "preparing forecast");

    self.output.make_dirs(&location_ids).await?;
    record_specification(self.output.store().as_ref(), &self.spec).await?;

    let mut builder = WorkflowBuilder::new(Self::WORKFLOW);
    let mut actions: HashMap<TaskId, Arc<dyn TaskAction>> = HashMap::new();
    for &location_id in &location_ids {
      for draw_id in 0..n_draws {
        let task_id = builder.add_task(TaskNode::unit(Stage::Forecast, location_id, draw_id))?;
        actions.insert(task_id, Arc::new(self.command(location_id, draw_id)));
      }
      let task_id = builder.add_task(TaskNode::location(Stage::Splice, location_id))?;
      actions.insert(task_id, Arc::new(self.splice_action(location_id)));
    }
    let edges = builder.depend_on_stage(Stage::Forecast, Stage::Splice, DependencyScope::SameLocation);
    info!(edges, "linked splice tasks to forecast draws");

    let workflow = builder.build()?;
    run_workflow(&workflow, actions, &self.spec.workflow, cancel).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bytes::Bytes;
  use seiir_artifact::InMemoryStore;
  use seiir_config::{ForecastData, InfectionColumns};
  use seiir_workflow::TaskStatus;

  fn spec(program: &str) -> ForecastSpecification {
    ForecastSpecification {
      data: ForecastData {
        regression_version: "/runs/regression".into(),
        covariate_version: "/inputs/covariates".into(),
        output_root: "/runs/forecast".into(),
      },
      workflow: WorkflowSettings {
        max_concurrency: 4,
        program: Some(program.to_string()),
      },
    }
  }

  /// Two regression locations, infection history for both, no component
  /// forecasts: the external command is expected to produce those.
  async fn stage(program: &str, n_draws: u32) -> (ForecastStage, Arc<dyn Store>) {
    let regression = InMemoryStore::new();
    let infection = InMemoryStore::new();
    for location_id in [102, 523] {
      regression
        .write_atomic(&RegressionPaths::beta_file(location_id, 0), Bytes::new())
        .await
        .unwrap();
      for draw_id in 0..n_draws {
        infection
          .write_atomic(
            &format!("place_{location_id}/draw{draw_id:04}_prepped.csv"),
            Bytes::from_static(b"date,deaths\n2020-05-01,1\n"),
          )
          .await
          .unwrap();
      }
    }
    let output: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let splice = SpliceInputs::new(
      Arc::new(infection),
      output.clone(),
      InfectionColumns::default(),
      n_draws,
    );
    (
      ForecastStage::new(spec(program), Arc::new(regression), output.clone(), splice),
      output,
    )
  }

  #[tokio::test]
  async fn test_command_arguments() {
    let (stage, _) = stage("/opt/bin/forecast", 1).await;
    let command = stage.command(523, 4);
    assert_eq!(command.program(), "/opt/bin/forecast");
    assert_eq!(
      command.get_args(),
      &[
        "--location-id",
        "523",
        "--draw-id",
        "4",
        "--forecast-version",
        "/runs/forecast"
      ]
    );
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_failed_forecasts_block_splice() {
    let (stage, output) = stage("false", 2).await;

    let report = stage.run(CancellationToken::new()).await.unwrap();
    assert_eq!(report.count(TaskStatus::Failed), 4);
    assert_eq!(report.count(TaskStatus::Blocked), 2);
    assert!(!output.exists(&ForecastPaths::spliced_file(102)).await.unwrap());
    assert!(output.exists(ForecastSpecification::FILE_NAME).await.unwrap());
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_splice_fails_without_component_draws() {
    let (stage, _) = stage("true", 1).await;

    let report = stage.run(CancellationToken::new()).await.unwrap();
    assert_eq!(report.count(TaskStatus::Done), 2);
    assert_eq!(report.count(TaskStatus::Failed), 2);
    let splice = report.status(&TaskNode::location(Stage::Splice, 102).task_id);
    assert_eq!(splice, Some(TaskStatus::Failed));
  }
}
