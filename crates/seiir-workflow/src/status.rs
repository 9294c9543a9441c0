use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::node::TaskId;

/// Lifecycle of a task.
///
/// ```text
/// Pending ──► Running ──► Done | Skipped | Failed
///    └──────► Blocked
/// ```
///
/// `Blocked` marks a task that never ran because something upstream failed.
/// `Skipped` is a normal completion (a draw without parameters) and does not
/// hold back downstream tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  Pending,
  Running,
  Done,
  Skipped,
  Failed,
  Blocked,
}

impl TaskStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      TaskStatus::Done | TaskStatus::Skipped | TaskStatus::Failed | TaskStatus::Blocked
    )
  }

  /// Whether a downstream task may start once this one is terminal.
  pub fn satisfies_dependents(&self) -> bool {
    matches!(self, TaskStatus::Done | TaskStatus::Skipped)
  }

  pub fn can_transition_to(&self, next: TaskStatus) -> bool {
    use TaskStatus::*;
    matches!(
      (self, next),
      (Pending, Running)
        | (Pending, Blocked)
        | (Running, Done)
        | (Running, Skipped)
        | (Running, Failed)
    )
  }

  /// Move to `next`, rejecting transitions the lifecycle does not allow.
  pub fn transition(&mut self, task_id: &TaskId, next: TaskStatus) -> Result<(), WorkflowError> {
    if !self.can_transition_to(next) {
      return Err(WorkflowError::InvalidTransition {
        task_id: task_id.clone(),
        from: *self,
        to: next,
      });
    }
    *self = next;
    Ok(())
  }
}

impl fmt::Display for TaskStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      TaskStatus::Pending => "pending",
      TaskStatus::Running => "running",
      TaskStatus::Done => "done",
      TaskStatus::Skipped => "skipped",
      TaskStatus::Failed => "failed",
      TaskStatus::Blocked => "blocked",
    };
    f.write_str(name)
  }
}
