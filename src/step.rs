//! Step definitions: a name, an agent class, upstream dependencies, and an
//! optional per-step retry override.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::agent::{Agent, AgentExecutor, StepExecutor};

/// A step definition, immutable once the workflow that owns it has been
/// validated.
///
/// `factory` constructs a fresh agent instance via the agent class's nullary
/// default (`Agent + Default`), used when the executor has no explicit
/// agent override for this step.
pub struct StepDefinition {
    pub name: String,
    pub after: BTreeSet<String>,
    pub retries: Option<u32>,
    pub(crate) agent_class: &'static str,
    pub(crate) factory: Arc<dyn Fn() -> Box<dyn StepExecutor> + Send + Sync>,
}

impl std::fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDefinition")
            .field("name", &self.name)
            .field("after", &self.after)
            .field("retries", &self.retries)
            .field("agent_class", &self.agent_class)
            .finish()
    }
}

impl StepDefinition {
    pub fn new<A>(name: impl Into<String>, after: BTreeSet<String>, retries: Option<u32>) -> Self
    where
        A: Agent + Default + 'static,
    {
        Self {
            name: name.into(),
            after,
            retries,
            agent_class: std::any::type_name::<A>(),
            factory: Arc::new(|| Box::new(AgentExecutor::new(A::default())) as Box<dyn StepExecutor>),
        }
    }

    /// Instantiate a fresh agent for this step via its nullary default.
    pub fn build_executor(&self) -> Box<dyn StepExecutor> {
        (self.factory)()
    }
}

/// Accepts either a single upstream step name or a set of them, normalized
/// to a `BTreeSet<String>`.
pub trait IntoAfter {
    fn into_after(self) -> BTreeSet<String>;
}

impl IntoAfter for &str {
    fn into_after(self) -> BTreeSet<String> {
        BTreeSet::from([self.to_string()])
    }
}

impl IntoAfter for String {
    fn into_after(self) -> BTreeSet<String> {
        BTreeSet::from([self])
    }
}

impl<T: Into<String>, const N: usize> IntoAfter for [T; N] {
    fn into_after(self) -> BTreeSet<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<String>> IntoAfter for Vec<T> {
    fn into_after(self) -> BTreeSet<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl IntoAfter for BTreeSet<String> {
    fn into_after(self) -> BTreeSet<String> {
        self
    }
}
