use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use seiir_workflow::{TaskId, TaskNode, TaskStatus, Workflow};
use tokio_util::sync::CancellationToken;

use crate::action::TaskAction;
use crate::error::EngineError;

/// Final state of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
  pub node: TaskNode,
  pub status: TaskStatus,
  /// Skip reason, failure message or the upstream task that blocked it.
  pub detail: Option<String>,
}

/// Outcome of a whole execution, keyed by task id.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
  pub execution_id: String,
  pub tasks: BTreeMap<TaskId, TaskRecord>,
}

impl ExecutionReport {
  pub fn status(&self, task_id: &TaskId) -> Option<TaskStatus> {
    self.tasks.get(task_id).map(|r| r.status)
  }

  pub fn count(&self, status: TaskStatus) -> usize {
    self.tasks.values().filter(|r| r.status == status).count()
  }

  pub fn with_status(&self, status: TaskStatus) -> impl Iterator<Item = &TaskRecord> {
    self.tasks.values().filter(move |r| r.status == status)
  }

  /// True when no task failed or was blocked.
  pub fn is_success(&self) -> bool {
    self.count(TaskStatus::Failed) == 0 && self.count(TaskStatus::Blocked) == 0
  }
}

/// The interface stage drivers dispatch work through.
///
/// Tasks are submitted in dependency order: every id in `deps` must have been
/// submitted before. `await_completion` runs everything submitted so far and
/// returns once every task is terminal. Retries are left to the engine; the
/// local engine does not retry.
#[async_trait]
pub trait TaskEngine: Send {
  fn submit(
    &mut self,
    node: TaskNode,
    deps: Vec<TaskId>,
    action: Arc<dyn TaskAction>,
  ) -> Result<(), EngineError>;

  async fn await_completion(
    &mut self,
    cancel: CancellationToken,
  ) -> Result<ExecutionReport, EngineError>;
}

/// Submit a workflow to an engine in dependency order and wait for it.
///
/// `actions` must hold one action per task in the workflow.
pub async fn dispatch<E>(
  engine: &mut E,
  workflow: &Workflow,
  mut actions: HashMap<TaskId, Arc<dyn TaskAction>>,
  cancel: CancellationToken,
) -> Result<ExecutionReport, EngineError>
where
  E: TaskEngine + ?Sized,
{
  let graph = workflow.graph();
  for node in workflow.dispatch_order()? {
    let action = actions
      .remove(&node.task_id)
      .ok_or_else(|| EngineError::MissingAction(node.task_id.clone()))?;
    let deps = graph.upstream(&node.task_id).to_vec();
    engine.submit(node.clone(), deps, action)?;
  }
  engine.await_completion(cancel).await
}
