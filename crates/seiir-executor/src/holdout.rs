//! Holdout stage: one split task per (location, draw).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::FutureExt;
use seiir_config::{HoldoutSpecification, WorkflowSettings};
use seiir_engine::{ExecutionReport, FnAction, TaskAction, TaskError, TaskOutcome};
use seiir_paths::StageLayout;
use seiir_workflow::{Stage, TaskId, TaskNode, WorkflowBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::ExecutorError;
use crate::split::{DrawOutcome, HoldoutSplitter};
use crate::stage::{record_specification, run_workflow};

/// Splits every location of an infectionator output.
pub struct HoldoutStage {
  spec: HoldoutSpecification,
  splitter: HoldoutSplitter,
}

impl HoldoutStage {
  pub const WORKFLOW: &'static str = "holdout";

  pub fn new(spec: HoldoutSpecification, splitter: HoldoutSplitter) -> Self {
    Self { spec, splitter }
  }

  pub fn from_specification(spec: HoldoutSpecification) -> Self {
    let splitter = HoldoutSplitter::from_specification(&spec);
    Self::new(spec, splitter)
  }

  pub fn settings(&self) -> &WorkflowSettings {
    &self.spec.workflow
  }

  /// Create every location folder, record the specification, then split
  /// each (location, draw) as its own task.
  ///
  /// Draws without a parameter file finish as skipped, not failed.
  #[instrument(name = "holdout", skip_all, fields(output_root = %self.spec.data.output_root.display()))]
  pub async fn run(&self, cancel: CancellationToken) -> Result<ExecutionReport, ExecutorError> {
    let folders = self.splitter.input().location_folders().await?;
    let location_ids: Vec<_> = folders.keys().copied().collect();
    info!(locations = location_ids.len(), n_draws = self.spec.parameters.n_draws, "preparing holdout");

    let layout = self.splitter.layout(folders.clone());
    layout.make_dirs(&location_ids).await?;
    record_specification(self.splitter.output().as_ref(), &self.spec).await?;

    let mut builder = WorkflowBuilder::new(Self::WORKFLOW);
    let mut actions: HashMap<TaskId, Arc<dyn TaskAction>> = HashMap::new();
    for (&location_id, folder) in &folders {
      let mut files: BTreeMap<_, _> = self
        .splitter
        .input()
        .draw_files(folder)
        .await?
        .into_iter()
        .map(|file| (file.draw_id, file))
        .collect();
      for draw_id in 0..self.spec.parameters.n_draws {
        let task_id = builder.add_task(TaskNode::unit(Stage::Holdout, location_id, draw_id))?;
        let splitter = self.splitter.clone();
        let folder = folder.clone();
        let file = files.remove(&draw_id);
        let action = FnAction::new(move |_| {
          let splitter = splitter.clone();
          let folder = folder.clone();
          let file = file.clone();
          async move {
            let Some(file) = file else {
              return Ok(TaskOutcome::skipped("no input file for draw"));
            };
            match splitter
              .split_draw(location_id, &folder, &file)
              .await
              .map_err(TaskError::action)?
            {
              DrawOutcome::Written => Ok(TaskOutcome::Completed),
              DrawOutcome::Skipped => Ok(TaskOutcome::skipped("no parameters for draw")),
              DrawOutcome::AlreadyExists => Ok(TaskOutcome::skipped("output already present")),
            }
          }
          .boxed()
        });
        actions.insert(task_id, Arc::new(action));
      }
    }

    let workflow = builder.build()?;
    run_workflow(&workflow, actions, &self.spec.workflow, cancel).await
  }
}
