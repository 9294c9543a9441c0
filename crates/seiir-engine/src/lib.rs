//! Seiir Engine
//!
//! Executes a [`Workflow`](seiir_workflow::Workflow) through the minimal
//! task-engine interface the stage drivers depend on:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TaskEngine                           │
//! │  - submit(node, deps, action)                               │
//! │  - await_completion(cancel) → ExecutionReport               │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       LocalEngine                           │
//! │  - tokio tasks, bounded by max_concurrency                  │
//! │  - failed tasks block their downstream tasks only           │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TaskAction                           │
//! │  - in-process closure (FnAction) or external process        │
//! │    (CommandAction)                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any other scheduler can implement [`TaskEngine`]; ordering logic stays in
//! [`dispatch`].

mod action;
mod engine;
mod error;
mod events;
mod local;

pub use action::{CommandAction, FnAction, TaskAction, TaskOutcome};
pub use engine::{ExecutionReport, TaskEngine, TaskRecord, dispatch};
pub use error::{EngineError, TaskError};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use local::{EngineConfig, LocalEngine};
