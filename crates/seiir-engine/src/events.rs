//! Execution events and notifiers for observability.
//!
//! Events are emitted while a workflow runs so callers can report progress
//! or collect per-task outcomes without polling the engine.

use seiir_workflow::TaskId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// Workflow execution has started.
  WorkflowStarted {
    execution_id: String,
    workflow: String,
    tasks: usize,
  },

  /// A task has started running.
  TaskStarted {
    execution_id: String,
    task_id: TaskId,
  },

  /// A task has completed and written its outputs.
  TaskCompleted {
    execution_id: String,
    task_id: TaskId,
  },

  /// A task finished without producing outputs, on purpose.
  TaskSkipped {
    execution_id: String,
    task_id: TaskId,
    reason: String,
  },

  /// A task has failed.
  TaskFailed {
    execution_id: String,
    task_id: TaskId,
    error: String,
  },

  /// A task was not run because an upstream task failed.
  TaskBlocked {
    execution_id: String,
    task_id: TaskId,
    upstream: TaskId,
  },

  /// Every task has reached a terminal status.
  WorkflowCompleted {
    execution_id: String,
    failed: usize,
  },
}

/// Trait for receiving execution events.
///
/// The engine calls `notify` for each event; implementations decide what to
/// do with them.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls the engine; volume is a few
  // events per task.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
