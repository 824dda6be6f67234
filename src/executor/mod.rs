//! The workflow executor: wave-based parallel scheduling, input assembly,
//! retries, and durable state transitions.

mod retry;

pub use retry::{RealSleeper, Sleeper};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::agent::{AgentResult, StepExecutor};
use crate::error::{Result, WorkflowError};
use crate::run_store::{RunDir, RunStatus, RunStore};
use crate::schema::{MergedInput, SchemaValue};
use crate::workflow::WorkflowDefinition;

/// Outcome of a full `run()` invocation: always returned as data, never
/// propagated as an `Err` for a single step's failure — `run()` only
/// returns `Err` when the run itself cannot be set up (e.g. the run store
/// fails to create the run directory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub success: bool,
    pub step_results: HashMap<String, AgentResult>,
    pub failed_step: Option<String>,
    pub error: Option<String>,
    pub error_details: Option<String>,
    pub duration: f64,
}

/// Drives one `WorkflowDefinition` to completion: computes ready sets wave
/// by wave, spawns a worker per ready step, applies each step's retry
/// policy, and persists transitions through an optional run store.
pub struct WorkflowExecutor {
    definition: Arc<WorkflowDefinition>,
    global_retries: u32,
    agents: HashMap<String, Arc<dyn StepExecutor>>,
    run_store: Option<RunStore>,
    sleeper: Arc<dyn Sleeper>,
}

impl WorkflowExecutor {
    pub fn new(definition: Arc<WorkflowDefinition>) -> Self {
        Self {
            definition,
            global_retries: 0,
            agents: HashMap::new(),
            run_store: None,
            sleeper: Arc::new(RealSleeper),
        }
    }

    /// Build an executor from a loaded `WorkflowExecutorConfig`: seeds the
    /// default retry count and attaches a run store rooted at
    /// `config.run_store_dir`. Still just convenience over the constructor
    /// parameters below — `with_agent`/`with_sleeper` remain available on
    /// the result.
    pub fn from_config(definition: Arc<WorkflowDefinition>, config: &crate::config::WorkflowExecutorConfig) -> Self {
        Self::new(definition)
            .with_retries(config.default_retries)
            .with_run_store(RunStore::new(&config.run_store_dir))
    }

    /// The default retry count applied to steps without a per-step
    /// override.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.global_retries = retries;
        self
    }

    /// Override the agent instance used for a given step, bypassing its
    /// nullary default (a dependency-injection hook).
    pub fn with_agent(mut self, step_name: impl Into<String>, executor: Arc<dyn StepExecutor>) -> Self {
        self.agents.insert(step_name.into(), executor);
        self
    }

    /// Attach a run store; every `run()` call then persists state
    /// transitions through it.
    pub fn with_run_store(mut self, run_store: RunStore) -> Self {
        self.run_store = Some(run_store);
        self
    }

    /// Substitute the retry backoff sleep, for deterministic tests.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn executor_for(&self, step_name: &str) -> Arc<dyn StepExecutor> {
        if let Some(agent) = self.agents.get(step_name) {
            return agent.clone();
        }
        let step = self
            .definition
            .step(step_name)
            .expect("step name drawn from the definition's own step set");
        Arc::from(step.build_executor())
    }

    fn effective_retries(&self, step_name: &str) -> u32 {
        self.definition
            .step(step_name)
            .and_then(|s| s.retries)
            .unwrap_or(self.global_retries)
    }

    /// Execute the workflow from `initial_input`.
    pub async fn run(&self, initial_input: SchemaValue) -> Result<WorkflowResult> {
        let start = Instant::now();
        let step_names = self.definition.step_names().to_vec();
        let run_id = uuid::Uuid::new_v4();

        info!(%run_id, workflow = %self.definition.name, steps = step_names.len(), "starting workflow run");

        let run_dir = match &self.run_store {
            Some(store) => {
                let dir = store.create_run(&self.definition.name, &step_names, serde_json::json!({}))?;
                dir.update_run_status(RunStatus::InProgress)?;
                Some(dir)
            }
            None => None,
        };

        let mut remaining: HashSet<String> = step_names.iter().cloned().collect();
        let mut completed: HashSet<String> = HashSet::new();
        let mut step_results: HashMap<String, AgentResult> = HashMap::new();
        let mut failed_step: Option<String> = None;
        let mut error_message: Option<String> = None;
        let mut error_details: Option<String> = None;

        while !remaining.is_empty() && failed_step.is_none() {
            let ready: Vec<String> = remaining
                .iter()
                .filter(|name| {
                    self.definition
                        .after(name)
                        .iter()
                        .all(|dep| completed.contains(dep))
                })
                .cloned()
                .collect();

            if ready.is_empty() {
                warn!("scheduling stalled with no ready steps and no failure; stopping");
                break;
            }

            debug!(wave = ?ready, "scheduling wave");

            let (tx, mut rx) = mpsc::channel::<(String, Result<AgentResult>)>(ready.len());
            let mut handles = Vec::with_capacity(ready.len());

            for name in &ready {
                let input = self.assemble_input(name, &initial_input, &step_results)?;
                let executor = self.executor_for(name);
                let retries = self.effective_retries(name);
                let run_dir = run_dir.clone();
                let sleeper = self.sleeper.clone();
                let tx = tx.clone();
                let name = name.clone();

                handles.push(tokio::spawn(async move {
                    let outcome = run_step(run_dir, &name, executor, input, retries, sleeper.as_ref()).await;
                    let _ = tx.send((name, outcome)).await;
                }));
            }
            drop(tx);

            let mut wave_failure: Option<(String, WorkflowError)> = None;
            for _ in 0..ready.len() {
                let Some((name, outcome)) = rx.recv().await else {
                    break;
                };
                match outcome {
                    Ok(result) => {
                        remaining.remove(&name);
                        completed.insert(name.clone());
                        step_results.insert(name, result);
                    }
                    Err(err) => {
                        remaining.remove(&name);
                        if wave_failure.is_none() {
                            wave_failure = Some((name, err));
                        } else {
                            debug!(step = %name, "additional failure in the same wave discarded");
                        }
                    }
                }
            }

            for handle in handles {
                let _ = handle.await;
            }

            if let Some((name, err)) = wave_failure {
                warn!(step = %name, error = %err, "step failed, short-circuiting remaining waves");
                error_message = Some(format!("Step :{name} failed: {err}"));
                error_details = Some(err.error_details());
                failed_step = Some(name);
            }
        }

        let duration = start.elapsed().as_secs_f64();
        let success = failed_step.is_none();

        if let Some(dir) = &run_dir {
            dir.update_run_status(if success {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            })?;
        }

        info!(%run_id, workflow = %self.definition.name, success, duration, "workflow run finished");

        Ok(WorkflowResult {
            success,
            step_results,
            failed_step,
            error: error_message,
            error_details,
            duration,
        })
    }

    /// Assemble a step's input from its upstreams' outputs: the initial
    /// input for a source step, the sole upstream's output for a
    /// single-dependency step, or a `MergedInput` for a step with two or
    /// more upstreams.
    fn assemble_input(
        &self,
        step_name: &str,
        initial_input: &SchemaValue,
        step_results: &HashMap<String, AgentResult>,
    ) -> Result<SchemaValue> {
        let after = self.definition.after(step_name);
        match after.len() {
            0 => Ok(initial_input.clone()),
            1 => {
                let dep = after.iter().next().expect("checked len == 1");
                Ok(step_results[dep].output.clone())
            }
            _ => {
                let outputs = after
                    .iter()
                    .map(|dep| (dep.clone(), step_results[dep].output.clone()))
                    .collect();
                SchemaValue::from_record(&MergedInput { outputs })
            }
        }
    }
}

/// Body of a single wave worker: mark in-progress, persist the input,
/// execute with retries, and persist the outcome.
async fn run_step(
    run_dir: Option<RunDir>,
    name: &str,
    executor: Arc<dyn StepExecutor>,
    input: SchemaValue,
    retries: u32,
    sleeper: &dyn Sleeper,
) -> Result<AgentResult> {
    if let Some(dir) = &run_dir {
        dir.mark_step_in_progress(name)?;
        dir.step_store(name)?.write_input(&input)?;
    }

    match retry::retry_with_backoff(executor.as_ref(), &input, retries, sleeper).await {
        Ok(result) => {
            if let Some(dir) = &run_dir {
                dir.step_store(name)?.write_output(&result.output)?;
                dir.mark_step_completed(name, result.duration)?;
            }
            Ok(result)
        }
        Err(err) => {
            if let Some(dir) = &run_dir {
                dir.mark_step_failed(name, &err)?;
            }
            Err(err)
        }
    }
}
