//! Beta regression stage: one external regression task per draw.

use std::collections::HashMap;
use std::sync::Arc;

use seiir_artifact::{Store, WriteOutcome};
use seiir_config::{FitSpecification, RegressionSpecification, Specification, WorkflowSettings};
use seiir_engine::{CommandAction, ExecutionReport, TaskAction};
use seiir_paths::{CovariatePaths, FitPaths, RegressionPaths, StageLayout};
use seiir_workflow::{Stage, TaskId, TaskNode, WorkflowBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::ExecutorError;
use crate::stage::{fs_store, record_specification, run_workflow};

pub struct RegressionStage {
  spec: RegressionSpecification,
  fit: FitPaths,
  covariates: CovariatePaths,
  output: RegressionPaths,
}

impl RegressionStage {
  pub const WORKFLOW: &'static str = "regression";

  /// Build the stage against explicit stores.
  ///
  /// Fails when the regression asks for more draws than the fit produced.
  pub fn new(
    spec: RegressionSpecification,
    fit: &FitSpecification,
    fit_store: Arc<dyn Store>,
    covariate_store: Arc<dyn Store>,
    output_store: Arc<dyn Store>,
  ) -> Result<Self, ExecutorError> {
    if spec.parameters.n_draws > fit.parameters.n_draws {
      return Err(ExecutorError::Spec(seiir_config::SpecError::Invalid(format!(
        "regression asks for {} draws but the ODE fit at '{}' has {}",
        spec.parameters.n_draws,
        spec.data.ode_fit_version.display(),
        fit.parameters.n_draws
      ))));
    }
    Ok(Self {
      spec,
      fit: FitPaths::new(fit_store),
      covariates: CovariatePaths::new(covariate_store),
      output: RegressionPaths::new(output_store),
    })
  }

  /// Resolve the referenced ODE fit and open every root on the filesystem.
  pub fn from_specification(spec: RegressionSpecification) -> Result<Self, ExecutorError> {
    let fit = FitSpecification::from_version_root(&spec.data.ode_fit_version)?;
    let fit_store = fs_store(&spec.data.ode_fit_version);
    let covariate_store = fs_store(&spec.data.covariate_version);
    let output_store = fs_store(&spec.data.output_root);
    Self::new(spec, &fit, fit_store, covariate_store, output_store)
  }

  pub fn settings(&self) -> &WorkflowSettings {
    &self.spec.workflow
  }

  /// Copy each covariate's metadata files into the run's `info/` directory.
  async fn copy_covariate_info(&self) -> Result<usize, ExecutorError> {
    let mut copied = 0;
    for covariate in self.spec.covariates.keys() {
      for key in self.covariates.info_files(covariate).await? {
        let file_name = key.rsplit('/').next().unwrap_or(&key);
        let data = self.covariates.store().read(&key).await?;
        let target = RegressionPaths::info_file(file_name);
        match self.output.store().write_if_absent(&target, data).await? {
          WriteOutcome::Written => copied += 1,
          WriteOutcome::AlreadyExists => warn!(key = %target, "output already exists"),
        }
      }
    }
    Ok(copied)
  }

  fn command(&self, draw_id: u32) -> CommandAction {
    CommandAction::new(
      self
        .spec
        .workflow
        .program_or(RegressionSpecification::DEFAULT_PROGRAM),
    )
    .arg("--draw-id")
    .arg(draw_id.to_string())
    .arg("--regression-version")
    .arg(self.spec.data.output_root.display().to_string())
  }

  /// Set up the output root, then run the regression program once per draw.
  #[instrument(name = "regression", skip_all, fields(output_root = %self.spec.data.output_root.display()))]
  pub async fn run(&self, cancel: CancellationToken) -> Result<ExecutionReport, ExecutorError> {
    let location_ids = self.fit.location_ids().await?;
    info!(
      locations = location_ids.len(),
      n_draws = self.spec.parameters.n_draws,
      "preparing regression"
    );

    self.output.make_dirs(&location_ids).await?;
    let copied = self.copy_covariate_info().await?;
    info!(files = copied, "copied covariate metadata");
    record_specification(self.output.store().as_ref(), &self.spec).await?;

    let mut builder = WorkflowBuilder::new(Self::WORKFLOW);
    let mut actions: HashMap<TaskId, Arc<dyn TaskAction>> = HashMap::new();
    for draw_id in 0..self.spec.parameters.n_draws {
      let task_id = builder.add_task(TaskNode::draw(Stage::Regression, draw_id))?;
      actions.insert(task_id, Arc::new(self.command(draw_id)));
    }

    let workflow = builder.build()?;
    run_workflow(&workflow, actions, &self.spec.workflow, cancel).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bytes::Bytes;
  use seiir_artifact::InMemoryStore;
  use seiir_config::{
    CovariateSpecification, FitData, FitParameters, InfectionColumns, RegressionData,
    RegressionParameters,
  };
  use std::collections::BTreeMap;

  fn fit(n_draws: u32) -> FitSpecification {
    FitSpecification {
      data: FitData {
        infection_version: "/inputs/infections".into(),
        output_root: "/runs/fit".into(),
      },
      parameters: FitParameters { n_draws },
      columns: InfectionColumns::default(),
    }
  }

  fn spec(n_draws: u32, program: &str) -> RegressionSpecification {
    RegressionSpecification {
      data: RegressionData {
        ode_fit_version: "/runs/fit".into(),
        covariate_version: "/inputs/covariates".into(),
        output_root: "/runs/regression".into(),
      },
      parameters: RegressionParameters { n_draws },
      covariates: BTreeMap::from([("mobility".to_string(), CovariateSpecification::default())]),
      workflow: WorkflowSettings {
        max_concurrency: 2,
        program: Some(program.to_string()),
      },
    }
  }

  async fn stores() -> (Arc<dyn Store>, Arc<dyn Store>, Arc<dyn Store>) {
    let fit_store = InMemoryStore::new();
    for location_id in [102, 523] {
      fit_store
        .write_atomic(&FitPaths::beta_fit_file(location_id, 0), Bytes::new())
        .await
        .unwrap();
    }
    let covariates = InMemoryStore::new();
    covariates
      .write_atomic(
        "mobility/mobility_info.csv",
        Bytes::from_static(b"location_id,value\n102,0.5\n"),
      )
      .await
      .unwrap();
    (
      Arc::new(fit_store),
      Arc::new(covariates),
      Arc::new(InMemoryStore::new()),
    )
  }

  #[tokio::test]
  async fn test_more_draws_than_fit_rejected() {
    let (fit_store, covariates, output) = stores().await;
    let err = RegressionStage::new(spec(5, "true"), &fit(3), fit_store, covariates, output)
      .err()
      .unwrap();
    assert!(err.is_configuration());
  }

  #[test]
  fn test_command_arguments() {
    let stage = RegressionStage {
      spec: spec(2, "/opt/bin/regress"),
      fit: FitPaths::new(Arc::new(InMemoryStore::new())),
      covariates: CovariatePaths::new(Arc::new(InMemoryStore::new())),
      output: RegressionPaths::new(Arc::new(InMemoryStore::new())),
    };
    let command = stage.command(1);
    assert_eq!(command.program(), "/opt/bin/regress");
    assert_eq!(
      command.get_args(),
      &["--draw-id", "1", "--regression-version", "/runs/regression"]
    );
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_run_sets_up_output_root() {
    let (fit_store, covariates, output) = stores().await;
    let stage =
      RegressionStage::new(spec(3, "true"), &fit(3), fit_store, covariates, output.clone()).unwrap();

    let report = stage.run(CancellationToken::new()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.tasks.len(), 3);

    let paths = RegressionPaths::new(output.clone());
    assert_eq!(paths.location_ids().await.unwrap(), vec![102, 523]);
    assert!(output.exists("info/mobility_info.csv").await.unwrap());
    assert!(output.exists(RegressionSpecification::FILE_NAME).await.unwrap());

    let err = stage.run(CancellationToken::new()).await.unwrap_err();
    assert!(err.is_conflict());
  }
}
