use std::fmt;

use seiir_config::{DrawId, LocationId};
use serde::{Deserialize, Serialize};

/// Pipeline phase a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Holdout,
  Regression,
  Forecast,
  Splice,
}

impl Stage {
  pub fn as_str(&self) -> &'static str {
    match self {
      Stage::Holdout => "holdout",
      Stage::Regression => "regression",
      Stage::Forecast => "forecast",
      Stage::Splice => "splice",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Unique id of a task within a workflow.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TaskId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for TaskId {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}

/// One unit of work: a stage applied to a location, a draw, or both.
///
/// The id is derived from the coordinates, so two nodes for the same unit
/// always collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNode {
  pub task_id: TaskId,
  pub stage: Stage,
  pub location_id: Option<LocationId>,
  pub draw_id: Option<DrawId>,
}

impl TaskNode {
  fn with_coordinates(stage: Stage, location_id: Option<LocationId>, draw_id: Option<DrawId>) -> Self {
    let mut id = stage.as_str().to_string();
    if let Some(location_id) = location_id {
      id.push_str(&format!("_l{location_id}"));
    }
    if let Some(draw_id) = draw_id {
      id.push_str(&format!("_d{draw_id}"));
    }
    Self {
      task_id: TaskId(id),
      stage,
      location_id,
      draw_id,
    }
  }

  /// A task for one (location, draw) cell.
  pub fn unit(stage: Stage, location_id: LocationId, draw_id: DrawId) -> Self {
    Self::with_coordinates(stage, Some(location_id), Some(draw_id))
  }

  /// A task covering every draw of one location.
  pub fn location(stage: Stage, location_id: LocationId) -> Self {
    Self::with_coordinates(stage, Some(location_id), None)
  }

  /// A task covering every location of one draw.
  pub fn draw(stage: Stage, draw_id: DrawId) -> Self {
    Self::with_coordinates(stage, None, Some(draw_id))
  }

  /// Whether both nodes share a location, treating a missing location as a
  /// wildcard.
  pub fn same_location(&self, other: &TaskNode) -> bool {
    match (self.location_id, other.location_id) {
      (Some(a), Some(b)) => a == b,
      _ => true,
    }
  }

  /// Whether both nodes share a draw, treating a missing draw as a wildcard.
  pub fn same_draw(&self, other: &TaskNode) -> bool {
    match (self.draw_id, other.draw_id) {
      (Some(a), Some(b)) => a == b,
      _ => true,
    }
  }
}
