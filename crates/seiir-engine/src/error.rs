use std::process::ExitStatus;

use seiir_workflow::{TaskId, WorkflowError};
use thiserror::Error;

/// Errors raised by the engine itself, as opposed to by a task.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("task {0} submitted twice")]
  DuplicateTask(TaskId),

  #[error("task {task_id} depends on {dependency}, which was not submitted before it")]
  UnknownDependency { task_id: TaskId, dependency: TaskId },

  #[error("no action registered for task {0}")]
  MissingAction(TaskId),

  #[error("execution cancelled")]
  Cancelled,

  #[error(transparent)]
  Workflow(#[from] WorkflowError),
}

/// Why a task failed.
#[derive(Debug, Error)]
pub enum TaskError {
  #[error("failed to start '{program}'")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("'{program}' exited with {status}")]
  CommandFailed { program: String, status: ExitStatus },

  #[error("task cancelled")]
  Cancelled,

  #[error("task panicked: {0}")]
  Panicked(String),

  #[error(transparent)]
  Action(Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
  /// Wrap an error raised by in-process task code.
  pub fn action(error: impl std::error::Error + Send + Sync + 'static) -> Self {
    TaskError::Action(Box::new(error))
  }
}
