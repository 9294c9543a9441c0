use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::node::{Stage, TaskId, TaskNode};

/// A validated task graph ready for dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub name: String,
  pub nodes: Vec<TaskNode>,
  /// `(upstream, downstream)` pairs.
  pub edges: Vec<(TaskId, TaskId)>,
}

impl Workflow {
  /// Build the graph structure for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.nodes, &self.edges)
  }

  /// Nodes in dispatch order: every node follows its upstream nodes.
  pub fn dispatch_order(&self) -> Result<Vec<&TaskNode>, WorkflowError> {
    let index: HashMap<&TaskId, &TaskNode> =
      self.nodes.iter().map(|n| (&n.task_id, n)).collect();
    self
      .graph()
      .topological_order()?
      .into_iter()
      .map(|id| {
        index
          .get(&id)
          .copied()
          .ok_or(WorkflowError::TaskNotFound(id))
      })
      .collect()
  }
}

/// Which tasks of an upstream stage a downstream task waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyScope {
  /// Every upstream task.
  All,
  /// Upstream tasks for the same location.
  SameLocation,
  /// Upstream tasks for the same location and draw.
  SameUnit,
}

impl DependencyScope {
  fn matches(&self, upstream: &TaskNode, downstream: &TaskNode) -> bool {
    match self {
      DependencyScope::All => true,
      DependencyScope::SameLocation => downstream.same_location(upstream),
      DependencyScope::SameUnit => {
        downstream.same_location(upstream) && downstream.same_draw(upstream)
      }
    }
  }
}

/// Builder for [`Workflow`].
///
/// ```ignore
/// let mut builder = WorkflowBuilder::new("beta_forecast");
/// for location_id in locations {
///   for draw_id in 0..n_draws {
///     builder.add_task(TaskNode::unit(Stage::Forecast, location_id, draw_id))?;
///   }
///   builder.add_task(TaskNode::location(Stage::Splice, location_id))?;
/// }
/// builder.depend_on_stage(Stage::Forecast, Stage::Splice, DependencyScope::SameLocation);
/// let workflow = builder.build()?;
/// ```
#[derive(Debug, Default)]
pub struct WorkflowBuilder {
  name: String,
  nodes: Vec<TaskNode>,
  ids: HashSet<TaskId>,
  edges: Vec<(TaskId, TaskId)>,
}

impl WorkflowBuilder {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  /// Add a task, rejecting a second task for the same unit.
  pub fn add_task(&mut self, node: TaskNode) -> Result<TaskId, WorkflowError> {
    if !self.ids.insert(node.task_id.clone()) {
      return Err(WorkflowError::DuplicateTask(node.task_id));
    }
    let task_id = node.task_id.clone();
    self.nodes.push(node);
    Ok(task_id)
  }

  /// Make `downstream` wait for `upstream`.
  pub fn add_dependency(&mut self, upstream: &TaskId, downstream: &TaskId) -> &mut Self {
    let edge = (upstream.clone(), downstream.clone());
    if !self.edges.contains(&edge) {
      self.edges.push(edge);
    }
    self
  }

  /// Wire every task of `downstream` to the tasks of `upstream` selected by
  /// `scope`. Returns the number of edges added.
  pub fn depend_on_stage(
    &mut self,
    upstream: Stage,
    downstream: Stage,
    scope: DependencyScope,
  ) -> usize {
    let mut added = 0;
    for to in self.nodes.iter().filter(|n| n.stage == downstream) {
      for from in self.nodes.iter().filter(|n| n.stage == upstream) {
        if scope.matches(from, to) {
          let edge = (from.task_id.clone(), to.task_id.clone());
          if !self.edges.contains(&edge) {
            self.edges.push(edge);
            added += 1;
          }
        }
      }
    }
    added
  }

  /// Validate edges and acyclicity.
  pub fn build(self) -> Result<Workflow, WorkflowError> {
    for (from, to) in &self.edges {
      if !self.ids.contains(from) || !self.ids.contains(to) {
        return Err(WorkflowError::InvalidEdge {
          from: from.clone(),
          to: to.clone(),
        });
      }
      if from == to {
        return Err(WorkflowError::SelfDependency(from.clone()));
      }
    }

    let workflow = Workflow {
      name: self.name,
      nodes: self.nodes,
      edges: self.edges,
    };
    workflow.graph().topological_order()?;
    Ok(workflow)
  }
}
