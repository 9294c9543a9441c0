use serde::{Deserialize, Serialize};

/// How a stage's task graph is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
  /// Upper bound on tasks running at once.
  #[serde(default = "default_max_concurrency")]
  pub max_concurrency: usize,

  /// External program invoked for each modeling task, if the stage has one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub program: Option<String>,
}

fn default_max_concurrency() -> usize {
  8
}

impl Default for WorkflowSettings {
  fn default() -> Self {
    Self {
      max_concurrency: default_max_concurrency(),
      program: None,
    }
  }
}

impl WorkflowSettings {
  /// The configured program, or the stage's default executable.
  pub fn program_or<'a>(&'a self, default: &'a str) -> &'a str {
    self.program.as_deref().unwrap_or(default)
  }
}
