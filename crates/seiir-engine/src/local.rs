//! In-process engine running tasks on the tokio runtime.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use seiir_workflow::{TaskId, TaskNode, TaskStatus};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::action::{TaskAction, TaskOutcome};
use crate::engine::{ExecutionReport, TaskEngine, TaskRecord};
use crate::error::{EngineError, TaskError};
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};

/// Configuration for the local engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Upper bound on tasks running at once. Zero is treated as one.
  pub max_concurrency: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { max_concurrency: 8 }
  }
}

struct Submitted {
  node: TaskNode,
  deps: Vec<usize>,
  action: Arc<dyn TaskAction>,
}

/// Runs submitted tasks as tokio tasks once their dependencies are done.
///
/// A failed task blocks every task downstream of it, transitively; tasks
/// that do not depend on it keep running. Tasks are not retried.
///
/// Generic over `N: ExecutionNotifier`. Use `LocalEngine::new()` for an
/// engine with no-op notifications, or `LocalEngine::with_notifier()` to
/// observe events.
pub struct LocalEngine<N: ExecutionNotifier = NoopNotifier> {
  name: String,
  config: EngineConfig,
  notifier: N,
  tasks: Vec<Submitted>,
  index: HashMap<TaskId, usize>,
}

impl LocalEngine<NoopNotifier> {
  pub fn new(name: impl Into<String>, config: EngineConfig) -> Self {
    Self::with_notifier(name, config, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> LocalEngine<N> {
  pub fn with_notifier(name: impl Into<String>, config: EngineConfig, notifier: N) -> Self {
    Self {
      name: name.into(),
      config,
      notifier,
      tasks: Vec::new(),
      index: HashMap::new(),
    }
  }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic".to_string()
  }
}

/// Mutable state of one execution.
///
/// Each task counts its unfinished dependencies; a task enters `ready` when
/// the count reaches zero, and a failure walks only the failed task's
/// dependents.
struct Execution<'a, N: ExecutionNotifier> {
  execution_id: String,
  notifier: &'a N,
  tasks: Vec<Submitted>,
  dependents: Vec<Vec<usize>>,
  remaining: Vec<usize>,
  ready: VecDeque<usize>,
  status: Vec<TaskStatus>,
  detail: Vec<Option<String>>,
}

impl<'a, N: ExecutionNotifier> Execution<'a, N> {
  fn new(tasks: Vec<Submitted>, notifier: &'a N) -> Self {
    let count = tasks.len();
    let mut dependents = vec![Vec::new(); count];
    for (i, task) in tasks.iter().enumerate() {
      for &dep in &task.deps {
        dependents[dep].push(i);
      }
    }
    let remaining: Vec<usize> = tasks.iter().map(|task| task.deps.len()).collect();
    let ready = (0..count).filter(|&i| remaining[i] == 0).collect();
    Self {
      execution_id: uuid::Uuid::new_v4().to_string(),
      notifier,
      tasks,
      dependents,
      remaining,
      ready,
      status: vec![TaskStatus::Pending; count],
      detail: vec![None; count],
    }
  }

  fn task_id(&self, i: usize) -> &TaskId {
    &self.tasks[i].node.task_id
  }

  fn transition(&mut self, i: usize, next: TaskStatus) -> Result<(), EngineError> {
    let task_id = self.tasks[i].node.task_id.clone();
    self.status[i].transition(&task_id, next)?;
    Ok(())
  }

  /// Next task whose dependencies have all finished without failing.
  fn next_ready(&mut self) -> Option<usize> {
    while let Some(i) = self.ready.pop_front() {
      if self.status[i] == TaskStatus::Pending {
        return Some(i);
      }
    }
    None
  }

  /// Let dependents of a finished task move towards ready, or block them
  /// transitively when it failed.
  fn release(&mut self, i: usize) -> Result<(), EngineError> {
    if !self.status[i].satisfies_dependents() {
      return self.block_downstream(i);
    }
    for j in std::mem::take(&mut self.dependents[i]) {
      self.remaining[j] -= 1;
      if self.remaining[j] == 0 && self.status[j] == TaskStatus::Pending {
        self.ready.push_back(j);
      }
    }
    Ok(())
  }

  /// Mark every pending task downstream of `failed` as blocked.
  fn block_downstream(&mut self, failed: usize) -> Result<(), EngineError> {
    let mut stack = vec![failed];
    while let Some(upstream) = stack.pop() {
      for j in std::mem::take(&mut self.dependents[upstream]) {
        if self.status[j] != TaskStatus::Pending {
          continue;
        }
        self.transition(j, TaskStatus::Blocked)?;
        let upstream_id = self.task_id(upstream).clone();
        warn!(
          execution_id = %self.execution_id,
          task_id = %self.task_id(j),
          upstream = %upstream_id,
          "task_blocked"
        );
        self.detail[j] = Some(format!("blocked by {upstream_id}"));
        self.notifier.notify(ExecutionEvent::TaskBlocked {
          execution_id: self.execution_id.clone(),
          task_id: self.task_id(j).clone(),
          upstream: upstream_id,
        });
        stack.push(j);
      }
    }
    Ok(())
  }

  fn finish(&mut self, i: usize, result: Result<TaskOutcome, TaskError>) -> Result<(), EngineError> {
    let task_id = self.task_id(i).clone();
    let execution_id = self.execution_id.clone();
    match result {
      Ok(TaskOutcome::Completed) => {
        self.transition(i, TaskStatus::Done)?;
        info!(execution_id = %execution_id, task_id = %task_id, "task_completed");
        self.notifier.notify(ExecutionEvent::TaskCompleted {
          execution_id,
          task_id,
        });
      }
      Ok(TaskOutcome::Skipped { reason }) => {
        self.transition(i, TaskStatus::Skipped)?;
        info!(execution_id = %execution_id, task_id = %task_id, reason = %reason, "task_skipped");
        self.detail[i] = Some(reason.clone());
        self.notifier.notify(ExecutionEvent::TaskSkipped {
          execution_id,
          task_id,
          reason,
        });
      }
      Err(e) => {
        self.transition(i, TaskStatus::Failed)?;
        error!(execution_id = %execution_id, task_id = %task_id, error = %e, "task_failed");
        self.detail[i] = Some(e.to_string());
        self.notifier.notify(ExecutionEvent::TaskFailed {
          execution_id,
          task_id,
          error: e.to_string(),
        });
      }
    }
    self.release(i)
  }

  fn into_report(self) -> ExecutionReport {
    let tasks = self
      .tasks
      .into_iter()
      .zip(self.status)
      .zip(self.detail)
      .map(|((task, status), detail)| {
        (
          task.node.task_id.clone(),
          TaskRecord {
            node: task.node,
            status,
            detail,
          },
        )
      })
      .collect::<BTreeMap<_, _>>();
    ExecutionReport {
      execution_id: self.execution_id,
      tasks,
    }
  }
}

#[async_trait]
impl<N: ExecutionNotifier> TaskEngine for LocalEngine<N> {
  fn submit(
    &mut self,
    node: TaskNode,
    deps: Vec<TaskId>,
    action: Arc<dyn TaskAction>,
  ) -> Result<(), EngineError> {
    if self.index.contains_key(&node.task_id) {
      return Err(EngineError::DuplicateTask(node.task_id));
    }
    let deps = deps
      .into_iter()
      .map(|dep| {
        self
          .index
          .get(&dep)
          .copied()
          .ok_or_else(|| EngineError::UnknownDependency {
            task_id: node.task_id.clone(),
            dependency: dep,
          })
      })
      .collect::<Result<Vec<_>, _>>()?;

    self.index.insert(node.task_id.clone(), self.tasks.len());
    self.tasks.push(Submitted { node, deps, action });
    Ok(())
  }

  #[instrument(name = "workflow_execute", skip(self, cancel), fields(workflow = %self.name))]
  async fn await_completion(
    &mut self,
    cancel: CancellationToken,
  ) -> Result<ExecutionReport, EngineError> {
    let tasks = std::mem::take(&mut self.tasks);
    self.index.clear();

    let count = tasks.len();
    let mut execution = Execution::new(tasks, &self.notifier);
    let limit = self.config.max_concurrency.max(1);

    info!(
      execution_id = %execution.execution_id,
      workflow = %self.name,
      tasks = count,
      max_concurrency = limit,
      "workflow_started"
    );
    self.notifier.notify(ExecutionEvent::WorkflowStarted {
      execution_id: execution.execution_id.clone(),
      workflow: self.name.clone(),
      tasks: count,
    });

    let mut running: JoinSet<(usize, Result<TaskOutcome, TaskError>)> = JoinSet::new();
    loop {
      if cancel.is_cancelled() {
        running.abort_all();
        warn!(execution_id = %execution.execution_id, "workflow cancelled");
        return Err(EngineError::Cancelled);
      }

      while running.len() < limit {
        let Some(i) = execution.next_ready() else {
          break;
        };
        execution.transition(i, TaskStatus::Running)?;
        info!(
          execution_id = %execution.execution_id,
          task_id = %execution.task_id(i),
          "task_started"
        );
        self.notifier.notify(ExecutionEvent::TaskStarted {
          execution_id: execution.execution_id.clone(),
          task_id: execution.task_id(i).clone(),
        });

        let action = execution.tasks[i].action.clone();
        let task_cancel = cancel.child_token();
        running.spawn(async move {
          let result = AssertUnwindSafe(action.run(task_cancel))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload))));
          (i, result)
        });
      }

      if running.is_empty() {
        break;
      }

      let joined = tokio::select! {
        joined = running.join_next() => joined,
        _ = cancel.cancelled() => {
          running.abort_all();
          warn!(execution_id = %execution.execution_id, "workflow cancelled during task execution");
          return Err(EngineError::Cancelled);
        }
      };

      match joined {
        Some(Ok((i, result))) => execution.finish(i, result)?,
        Some(Err(e)) => {
          // Panics are caught inside the task, so this is an abort.
          error!(execution_id = %execution.execution_id, error = %e, "task join error");
          return Err(EngineError::Cancelled);
        }
        None => break,
      }
    }

    let failed = execution.status.iter().filter(|s| **s == TaskStatus::Failed).count();
    info!(
      execution_id = %execution.execution_id,
      failed,
      blocked = execution.status.iter().filter(|s| **s == TaskStatus::Blocked).count(),
      "workflow_completed"
    );
    self.notifier.notify(ExecutionEvent::WorkflowCompleted {
      execution_id: execution.execution_id.clone(),
      failed,
    });

    Ok(execution.into_report())
  }
}
