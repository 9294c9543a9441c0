//! Seiir Workflow
//!
//! This crate provides the task graph a stage is dispatched as. Every unit of
//! work is a [`TaskNode`] identified by stage, location and draw. Tasks of
//! one stage are independent of each other; a stage as a whole depends on
//! the stage that produces its inputs.
//!
//! A [`Workflow`] is built through [`WorkflowBuilder`], which validates that
//! task ids are unique, that every edge references a known task and that the
//! graph is acyclic. Execution lives in `seiir-engine`.

mod error;
mod graph;
mod node;
mod status;
mod workflow;

pub use error::WorkflowError;
pub use graph::Graph;
pub use node::{Stage, TaskId, TaskNode};
pub use status::TaskStatus;
pub use workflow::{DependencyScope, Workflow, WorkflowBuilder};
