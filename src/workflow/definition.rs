//! The workflow definition builder and the frozen, validated workflow it
//! produces.

use std::collections::{BTreeSet, HashMap};

use crate::agent::Agent;
use crate::error::{Result, WorkflowError};
use crate::step::{IntoAfter, StepDefinition};

use super::topology::{detect_cycle, topological_order};

/// Block-scoped builder for a workflow definition. Collects steps in
/// insertion order; `build()` runs validation and freezes the result.
pub struct WorkflowBuilder {
    name: String,
    steps: Vec<StepDefinition>,
}

impl WorkflowBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step bound to agent class `A`. `after` accepts a single
    /// step name or a collection of them (see `IntoAfter`).
    pub fn step<A>(
        mut self,
        name: impl Into<String>,
        after: impl IntoAfter,
        retries: Option<u32>,
    ) -> Self
    where
        A: Agent + Default + 'static,
    {
        self.steps
            .push(StepDefinition::new::<A>(name, after.into_after(), retries));
        self
    }

    /// Run `validate!` and freeze the workflow.
    pub fn build(self) -> Result<WorkflowDefinition> {
        let after_by_name: HashMap<String, Vec<String>> = self
            .steps
            .iter()
            .map(|s| (s.name.clone(), s.after.iter().cloned().collect()))
            .collect();

        // 1. every `after` entry must name an existing step.
        for step in &self.steps {
            for dep in &step.after {
                if !after_by_name.contains_key(dep) {
                    return Err(WorkflowError::MissingDependency {
                        step: step.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // 2. the dependency graph must be acyclic.
        detect_cycle(&after_by_name)?;

        // 3. compute a topological order via Kahn's algorithm.
        let sorted_steps = topological_order(&after_by_name);

        let insertion_order: Vec<String> = self.steps.iter().map(|s| s.name.clone()).collect();
        let steps: HashMap<String, StepDefinition> = self
            .steps
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();

        Ok(WorkflowDefinition {
            name: self.name,
            steps,
            insertion_order,
            sorted_steps,
        })
    }
}

/// A named, validated, frozen collection of steps forming a DAG.
///
/// Immutable after construction: there is no mutation API. Multiple
/// executors may share one `WorkflowDefinition` (it is typically wrapped in
/// an `Arc` by the caller).
#[derive(Debug)]
pub struct WorkflowDefinition {
    pub name: String,
    steps: HashMap<String, StepDefinition>,
    insertion_order: Vec<String>,
    sorted_steps: Vec<String>,
}

impl WorkflowDefinition {
    /// Entry point: `define(name) { builder }`. Builds via a closure over
    /// `WorkflowBuilder` rather than a block, then validates and freezes.
    pub fn define(
        name: impl Into<String>,
        f: impl FnOnce(WorkflowBuilder) -> WorkflowBuilder,
    ) -> Result<Self> {
        let builder = WorkflowBuilder::new(name);
        f(builder).build()
    }

    pub fn step(&self, name: &str) -> Option<&StepDefinition> {
        self.steps.get(name)
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepDefinition> {
        self.insertion_order.iter().map(|n| &self.steps[n])
    }

    /// Step names in the order they were declared (insertion order,
    /// preserved but not semantic).
    pub fn step_names(&self) -> &[String] {
        &self.insertion_order
    }

    /// A topologically valid order computed at validation time. Execution
    /// itself uses ready-set computation, not this order.
    pub fn sorted_steps(&self) -> &[String] {
        &self.sorted_steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Direct upstreams of `name`, or an empty set if `name` is unknown.
    pub fn after(&self, name: &str) -> BTreeSet<String> {
        self.steps
            .get(name)
            .map(|s| s.after.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Record;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct TextValue {
        text: String,
    }

    impl Record for TextValue {
        fn schema_name() -> &'static str {
            "TextValue"
        }
    }

    #[derive(Default)]
    struct PassThrough;

    impl Agent for PassThrough {
        type Input = TextValue;
        type Output = TextValue;

        async fn call(&self, input: Self::Input) -> Result<Self::Output> {
            Ok(input)
        }
    }

    #[test]
    fn missing_dependency_is_rejected() {
        let err = WorkflowDefinition::define("bad", |b| {
            b.step::<PassThrough>("a", ["nonexistent"], None)
        })
        .unwrap_err();
        assert!(matches!(err, WorkflowError::MissingDependency { .. }));
    }

    #[test]
    fn cycle_is_rejected() {
        let err = WorkflowDefinition::define("cycle", |b| {
            b.step::<PassThrough>("a", ["b"], None)
                .step::<PassThrough>("b", ["a"], None)
        })
        .unwrap_err();
        assert!(matches!(err, WorkflowError::CircularDependency { .. }));
    }

    #[test]
    fn valid_linear_chain_builds_and_sorts() {
        let wf = WorkflowDefinition::define("linear", |b| {
            b.step::<PassThrough>("a", [] as [&str; 0], None)
                .step::<PassThrough>("b", "a", None)
                .step::<PassThrough>("c", "b", None)
        })
        .unwrap();

        assert_eq!(wf.len(), 3);
        let order = wf.sorted_steps();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn diamond_preserves_insertion_order() {
        let wf = WorkflowDefinition::define("diamond", |b| {
            b.step::<PassThrough>("root", [] as [&str; 0], None)
                .step::<PassThrough>("left", "root", None)
                .step::<PassThrough>("right", "root", None)
                .step::<PassThrough>("join", ["left", "right"], None)
        })
        .unwrap();

        assert_eq!(
            wf.step_names(),
            &["root".to_string(), "left".to_string(), "right".to_string(), "join".to_string()]
        );
    }
}
