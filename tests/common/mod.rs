//! Shared agent fixtures for whole-crate scenario tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Barrier;
use waveflow::{Agent, MergedInput, Record, Result, WorkflowError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
}

impl Record for TextValue {
    fn schema_name() -> &'static str {
        "TextValue"
    }
}

#[derive(Default)]
pub struct PassThrough;

impl Agent for PassThrough {
    type Input = TextValue;
    type Output = TextValue;

    async fn call(&self, input: Self::Input) -> Result<Self::Output> {
        Ok(input)
    }
}

#[derive(Default)]
pub struct Append;

impl Agent for Append {
    type Input = TextValue;
    type Output = TextValue;

    async fn call(&self, input: Self::Input) -> Result<Self::Output> {
        Ok(TextValue {
            text: format!("{}:appended", input.text),
        })
    }
}

#[derive(Default)]
pub struct Upper;

impl Agent for Upper {
    type Input = TextValue;
    type Output = TextValue;

    async fn call(&self, input: Self::Input) -> Result<Self::Output> {
        Ok(TextValue {
            text: input.text.to_uppercase(),
        })
    }
}

/// Emits `"<k1>=<v1>,<k2>=<v2>"` sorted by upstream step name.
#[derive(Default)]
pub struct Merge;

impl Agent for Merge {
    type Input = MergedInput;
    type Output = TextValue;

    async fn call(&self, input: Self::Input) -> Result<Self::Output> {
        let mut pairs: Vec<(String, String)> = input
            .outputs
            .iter()
            .map(|(k, v)| {
                let value: TextValue = v.as_record().expect("Merge's upstreams always emit TextValue");
                (k.clone(), value.text)
            })
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let text = pairs
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        Ok(TextValue { text })
    }
}

#[derive(Default)]
pub struct AlwaysFails;

impl Agent for AlwaysFails {
    type Input = TextValue;
    type Output = TextValue;

    async fn call(&self, _input: Self::Input) -> Result<Self::Output> {
        Err(WorkflowError::Agent {
            message: "intentional failure".into(),
            error_class: "RuntimeError".into(),
        })
    }
}

/// Fails exactly `fail_count` times, then succeeds. Used for the
/// exponential-backoff and per-step-override retry scenarios.
pub struct FlakyAgent {
    pub remaining_failures: AtomicU32,
}

impl FlakyAgent {
    pub fn failing(times: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(times),
        }
    }
}

impl Default for FlakyAgent {
    /// Never actually invoked: steps built with `FlakyAgent` are always
    /// given an explicit instance via `WorkflowExecutor::with_agent`. The
    /// `Agent + Default` bound on `WorkflowBuilder::step` still requires a
    /// default to exist.
    fn default() -> Self {
        Self::failing(0)
    }
}

impl Agent for FlakyAgent {
    type Input = TextValue;
    type Output = TextValue;

    async fn call(&self, input: Self::Input) -> Result<Self::Output> {
        if self.remaining_failures.fetch_sub(1, Ordering::SeqCst) > 0 {
            return Err(WorkflowError::Agent {
                message: "not yet".into(),
                error_class: "RuntimeError".into(),
            });
        }
        Ok(input)
    }
}

/// Blocks on a shared barrier until every expected participant has entered
/// `call`, proving two steps in the same wave ran concurrently.
pub struct BarrierAgent {
    pub barrier: Arc<Barrier>,
}

impl Agent for BarrierAgent {
    type Input = TextValue;
    type Output = TextValue;

    async fn call(&self, input: Self::Input) -> Result<Self::Output> {
        self.barrier.wait().await;
        Ok(input)
    }
}

pub fn text_input(text: &str) -> waveflow::SchemaValue {
    waveflow::SchemaValue::from_record(&TextValue { text: text.into() }).unwrap()
}
