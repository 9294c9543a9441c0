use std::collections::{HashMap, VecDeque};

use crate::error::WorkflowError;
use crate::node::{TaskId, TaskNode};

/// Graph structure for traversal and analysis.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Task ids in insertion order.
  order: Vec<TaskId>,
  /// Adjacency list: task_id -> list of downstream task_ids.
  adjacency: HashMap<TaskId, Vec<TaskId>>,
  /// Reverse adjacency: task_id -> list of upstream task_ids.
  reverse_adjacency: HashMap<TaskId, Vec<TaskId>>,
  /// Tasks with no incoming edges.
  entry_points: Vec<TaskId>,
}

impl Graph {
  /// Build a graph from nodes and `(upstream, downstream)` edges.
  pub fn new(nodes: &[TaskNode], edges: &[(TaskId, TaskId)]) -> Self {
    let mut adjacency: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    let mut reverse_adjacency: HashMap<TaskId, Vec<TaskId>> = HashMap::new();

    // Initialize all nodes
    for node in nodes {
      adjacency.entry(node.task_id.clone()).or_default();
      reverse_adjacency.entry(node.task_id.clone()).or_default();
    }

    for (from, to) in edges {
      adjacency.entry(from.clone()).or_default().push(to.clone());
      reverse_adjacency
        .entry(to.clone())
        .or_default()
        .push(from.clone());
    }

    let order: Vec<TaskId> = nodes.iter().map(|n| n.task_id.clone()).collect();
    let entry_points = order
      .iter()
      .filter(|id| reverse_adjacency.get(*id).is_none_or(|v| v.is_empty()))
      .cloned()
      .collect();

    Self {
      order,
      adjacency,
      reverse_adjacency,
      entry_points,
    }
  }

  /// Tasks with no incoming edges.
  pub fn entry_points(&self) -> &[TaskId] {
    &self.entry_points
  }

  /// Tasks that read this task's output.
  pub fn downstream(&self, task_id: &TaskId) -> &[TaskId] {
    self
      .adjacency
      .get(task_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Tasks whose output this task reads.
  pub fn upstream(&self, task_id: &TaskId) -> &[TaskId] {
    self
      .reverse_adjacency
      .get(task_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Tasks ordered so every task follows all of its upstream tasks.
  ///
  /// Ties keep insertion order. Fails with the tasks left over when the
  /// graph has a cycle.
  pub fn topological_order(&self) -> Result<Vec<TaskId>, WorkflowError> {
    let mut in_degree: HashMap<&TaskId, usize> = self
      .order
      .iter()
      .map(|id| (id, self.upstream(id).len()))
      .collect();
    let mut ready: VecDeque<&TaskId> = self.entry_points.iter().collect();
    let mut sorted = Vec::with_capacity(self.order.len());

    while let Some(id) = ready.pop_front() {
      sorted.push(id.clone());
      for next in self.downstream(id) {
        if let Some(degree) = in_degree.get_mut(next) {
          *degree -= 1;
          if *degree == 0 {
            ready.push_back(next);
          }
        }
      }
    }

    if sorted.len() != self.order.len() {
      let stuck = self
        .order
        .iter()
        .filter(|id| in_degree.get(id).is_some_and(|d| *d > 0))
        .cloned()
        .collect();
      return Err(WorkflowError::Cycle(stuck));
    }
    Ok(sorted)
  }
}
