//! Workflow definition: named collection of steps forming a DAG, with
//! validation (cycle detection, dependency completeness) and a topological
//! order computed once at validation time.

mod definition;
mod topology;

pub use definition::{WorkflowBuilder, WorkflowDefinition};
