//! The agent contract: a typed `call(input) -> output` operation plus the
//! executor that validates schemas and times the call.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};
use crate::schema::{Record, SchemaValue};

/// An agent class: a typed unit of computation with declared input and
/// output schemas (the associated `Input`/`Output` types) and a `call`
/// operation.
///
/// `model`/`provider` are informational passthroughs; the core never
/// interprets them.
pub trait Agent: Send + Sync + 'static {
    type Input: Record;
    type Output: Record;

    /// Informational model name, if any. Not interpreted by the core.
    fn model(&self) -> Option<&str> {
        None
    }

    /// Informational provider name, if any. Not interpreted by the core.
    fn provider(&self) -> Option<&str> {
        None
    }

    fn call(
        &self,
        input: Self::Input,
    ) -> impl std::future::Future<Output = Result<Self::Output>> + Send;
}

/// Result of executing a single agent: its output, the agent class that
/// produced it, and the wall time of the `call` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub output: SchemaValue,
    pub agent_class: String,
    pub duration: Duration,
}

/// Wraps a typed `Agent` and enforces its contract: validate the incoming
/// value against `Input`, time the call, and tag the result with the
/// declared output schema.
///
/// The executor never catches or retries here; retries are the workflow
/// executor's responsibility.
pub struct AgentExecutor<A: Agent> {
    agent: A,
}

impl<A: Agent> AgentExecutor<A> {
    pub fn new(agent: A) -> Self {
        Self { agent }
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub async fn execute(&self, input: &SchemaValue) -> Result<AgentResult> {
        let typed_input: A::Input = input.as_record().ok_or_else(|| WorkflowError::InvalidInput {
            agent_class: agent_class_name::<A>(),
            expected: A::Input::schema_name().to_string(),
            actual: input.schema_name().to_string(),
        })?;

        let start = Instant::now();
        let output = self.agent.call(typed_input).await?;
        let duration = start.elapsed();

        let output_value = SchemaValue::from_record(&output).map_err(|e| match e {
            WorkflowError::Serialization(inner) => WorkflowError::InvalidOutput {
                agent_class: agent_class_name::<A>(),
                expected: A::Output::schema_name().to_string(),
                actual: inner.to_string(),
            },
            other => other,
        })?;

        Ok(AgentResult {
            output: output_value,
            agent_class: agent_class_name::<A>(),
            duration,
        })
    }
}

fn agent_class_name<A: Agent>() -> String {
    std::any::type_name::<A>().to_string()
}

/// Object-safe seam used by the workflow executor to hold heterogeneously
/// typed agents in a single `HashMap`. A single DAG mixes agents with
/// unrelated `Input`/`Output` types, which `Agent`'s associated types
/// cannot express directly; `StepExecutor` erases that difference behind a
/// schema-tagged `SchemaValue`.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(&self, input: SchemaValue) -> Result<AgentResult>;
    fn input_schema_name(&self) -> &'static str;
    fn output_schema_name(&self) -> &'static str;
    fn agent_class(&self) -> &'static str;
}

#[async_trait]
impl<A: Agent> StepExecutor for AgentExecutor<A> {
    async fn execute(&self, input: SchemaValue) -> Result<AgentResult> {
        AgentExecutor::execute(self, &input).await
    }

    fn input_schema_name(&self) -> &'static str {
        A::Input::schema_name()
    }

    fn output_schema_name(&self) -> &'static str {
        A::Output::schema_name()
    }

    fn agent_class(&self) -> &'static str {
        std::any::type_name::<A>()
    }
}
