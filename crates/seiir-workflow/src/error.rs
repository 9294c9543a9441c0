use thiserror::Error;

use crate::node::TaskId;
use crate::status::TaskStatus;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("task not found: {0}")]
  TaskNotFound(TaskId),

  #[error("duplicate task: {0}")]
  DuplicateTask(TaskId),

  #[error("edge references unknown task: from={from}, to={to}")]
  InvalidEdge { from: TaskId, to: TaskId },

  #[error("task {0} depends on itself")]
  SelfDependency(TaskId),

  #[error("dependency cycle through tasks {0:?}")]
  Cycle(Vec<TaskId>),

  #[error("invalid status transition for {task_id}: {from} -> {to}")]
  InvalidTransition {
    task_id: TaskId,
    from: TaskStatus,
    to: TaskStatus,
  },
}
