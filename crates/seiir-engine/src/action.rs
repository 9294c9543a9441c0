use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TaskError;

/// How a task that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
  Completed,
  /// Nothing to do for this unit; downstream tasks still run.
  Skipped { reason: String },
}

impl TaskOutcome {
  pub fn skipped(reason: impl Into<String>) -> Self {
    TaskOutcome::Skipped {
      reason: reason.into(),
    }
  }
}

/// The work a task performs.
#[async_trait]
pub trait TaskAction: Send + Sync {
  async fn run(&self, cancel: CancellationToken) -> Result<TaskOutcome, TaskError>;
}

type ActionFn =
  dyn Fn(CancellationToken) -> BoxFuture<'static, Result<TaskOutcome, TaskError>> + Send + Sync;

/// An in-process action built from a closure returning a boxed future.
pub struct FnAction {
  f: Box<ActionFn>,
}

impl FnAction {
  pub fn new<F>(f: F) -> Self
  where
    F: Fn(CancellationToken) -> BoxFuture<'static, Result<TaskOutcome, TaskError>>
      + Send
      + Sync
      + 'static,
  {
    Self { f: Box::new(f) }
  }
}

impl fmt::Debug for FnAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FnAction").finish_non_exhaustive()
  }
}

#[async_trait]
impl TaskAction for FnAction {
  async fn run(&self, cancel: CancellationToken) -> Result<TaskOutcome, TaskError> {
    (self.f)(cancel).await
  }
}

/// Runs an external program. A non-zero exit status fails the task.
///
/// The child inherits stdout and stderr, and is killed if the task is
/// cancelled.
#[derive(Debug, Clone)]
pub struct CommandAction {
  program: String,
  args: Vec<String>,
}

impl CommandAction {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  pub fn get_args(&self) -> &[String] {
    &self.args
  }
}

#[async_trait]
impl TaskAction for CommandAction {
  async fn run(&self, cancel: CancellationToken) -> Result<TaskOutcome, TaskError> {
    let mut command = Command::new(&self.program);
    command.args(&self.args).kill_on_drop(true);

    debug!(program = %self.program, args = ?self.args, "spawning command");
    let mut child = command.spawn().map_err(|source| TaskError::Spawn {
      program: self.program.clone(),
      source,
    })?;

    let status = tokio::select! {
      status = child.wait() => status.map_err(|source| TaskError::Spawn {
        program: self.program.clone(),
        source,
      })?,
      _ = cancel.cancelled() => {
        // Dropping the child kills it
        return Err(TaskError::Cancelled);
      }
    };

    if status.success() {
      Ok(TaskOutcome::Completed)
    } else {
      Err(TaskError::CommandFailed {
        program: self.program.clone(),
        status,
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use futures::FutureExt;

  #[tokio::test]
  async fn test_fn_action() {
    let action = FnAction::new(|_| async { Ok(TaskOutcome::skipped("no parameters")) }.boxed());
    let outcome = action.run(CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, TaskOutcome::skipped("no parameters"));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_command_success() {
    let action = CommandAction::new("sh").args(["-c", "exit 0"]);
    let outcome = action.run(CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, TaskOutcome::Completed);
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_command_non_zero_exit() {
    let action = CommandAction::new("sh").args(["-c", "exit 3"]);
    let err = action.run(CancellationToken::new()).await.unwrap_err();
    match err {
      TaskError::CommandFailed { program, status } => {
        assert_eq!(program, "sh");
        assert_eq!(status.code(), Some(3));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn test_command_not_found() {
    let action = CommandAction::new("seiir-no-such-program");
    let err = action.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, TaskError::Spawn { .. }));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_command_cancelled() {
    let action = CommandAction::new("sleep").arg("30");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = action.run(cancel).await.unwrap_err();
    assert!(matches!(err, TaskError::Cancelled));
  }
}
