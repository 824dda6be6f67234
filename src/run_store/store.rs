//! Durable run store: on-disk layout, per-step status transitions, and
//! resume planning.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use tracing::debug;

use crate::error::{Result, WorkflowError};
use crate::schema::SchemaValue;

use super::manifest::{RunMetadata, RunStatus};
use super::status::{RetryRecord, StepStatus, StepStatusState};

const METADATA_FILE: &str = "metadata.json";
const STEPS_DIR: &str = "steps";
const INPUT_FILE: &str = "input.json";
const OUTPUT_FILE: &str = "output.json";
const STATUS_FILE: &str = "status.json";

/// Creates and opens run directories under a shared base directory.
#[derive(Debug, Clone)]
pub struct RunStore {
    base_dir: PathBuf,
}

impl RunStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create `<base_dir>/<workflow_name>_<YYYYMMDD>_<HHMMSS>/`, a
    /// `steps/<step_name>/` subdirectory per step, `metadata.json` (status
    /// `pending`), and a `status.json` (status `pending`, `retry_count: 0`)
    /// per step directory.
    pub fn create_run(
        &self,
        workflow_name: &str,
        step_names: &[String],
        config: serde_json::Value,
    ) -> Result<RunDir> {
        let now = Local::now();
        let dir_name = format!("{workflow_name}_{}", now.format("%Y%m%d_%H%M%S"));
        let path = self.base_dir.join(dir_name);

        fs::create_dir_all(&path)?;
        for name in step_names {
            fs::create_dir_all(path.join(STEPS_DIR).join(name))?;
        }

        let run = RunDir { path };

        let metadata = RunMetadata {
            workflow_name: workflow_name.to_string(),
            status: RunStatus::Pending,
            steps: step_names.to_vec(),
            created_at: now,
            updated_at: now,
            config,
        };
        run.write_metadata(&metadata)?;

        for name in step_names {
            run.write_step_status(name, &StepStatus::initial())?;
        }

        debug!(run_dir = %run.path.display(), steps = step_names.len(), "created run directory");
        Ok(run)
    }

    /// Open an existing run directory by path, without creating anything.
    pub fn open(&self, path: impl Into<PathBuf>) -> RunDir {
        RunDir { path: path.into() }
    }
}

/// A handle onto a single run's directory.
#[derive(Debug, Clone)]
pub struct RunDir {
    path: PathBuf,
}

impl RunDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn step_dir(&self, step_name: &str) -> PathBuf {
        self.path.join(STEPS_DIR).join(step_name)
    }

    /// Returns a handle for reading/writing a step's `input.json`,
    /// `output.json`, `status.json`. Fails with `RunNotFound` if the step
    /// directory does not exist.
    pub fn step_store(&self, step_name: &str) -> Result<StepStore> {
        let dir = self.step_dir(step_name);
        if !dir.is_dir() {
            return Err(WorkflowError::RunNotFound {
                path: dir.display().to_string(),
            });
        }
        Ok(StepStore { dir })
    }

    pub fn write_metadata(&self, metadata: &RunMetadata) -> Result<()> {
        write_json_pretty(&self.path.join(METADATA_FILE), metadata)
    }

    pub fn read_metadata(&self) -> Result<RunMetadata> {
        read_json(&self.path.join(METADATA_FILE))
    }

    fn write_step_status(&self, step_name: &str, status: &StepStatus) -> Result<()> {
        write_json_pretty(&self.step_dir(step_name).join(STATUS_FILE), status)
    }

    fn read_step_status(&self, step_name: &str) -> Result<StepStatus> {
        read_json(&self.step_dir(step_name).join(STATUS_FILE))
    }

    /// Load every step's current status, keyed by step name.
    pub fn load_step_statuses(&self) -> Result<HashMap<String, StepStatus>> {
        let metadata = self.read_metadata()?;
        metadata
            .steps
            .iter()
            .map(|name| Ok((name.clone(), self.read_step_status(name)?)))
            .collect()
    }

    /// Load a step's persisted output, if it completed.
    pub fn load_step_output(&self, step_name: &str) -> Result<Option<SchemaValue>> {
        let path = self.step_dir(step_name).join(OUTPUT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_json(&path)?))
    }

    /// Load a step's persisted input, if it started.
    pub fn load_step_input(&self, step_name: &str) -> Result<Option<SchemaValue>> {
        let path = self.step_dir(step_name).join(INPUT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_json(&path)?))
    }

    /// Mark a step `in_progress`: loads the current status, sets
    /// `started_at = now`, preserving `retry_count` and prior retries.
    pub fn mark_step_in_progress(&self, step_name: &str) -> Result<()> {
        let mut status = self.read_step_status(step_name)?;
        status.status = StepStatusState::InProgress;
        status.started_at = Some(Local::now());
        self.write_step_status(step_name, &status)
    }

    /// Mark a step `completed` with the measured duration, preserving
    /// `started_at`, `retry_count`, and prior retries.
    pub fn mark_step_completed(&self, step_name: &str, duration: Duration) -> Result<()> {
        let mut status = self.read_step_status(step_name)?;
        status.status = StepStatusState::Completed;
        status.completed_at = Some(Local::now());
        status.duration = Some(duration.as_secs_f64());
        self.write_step_status(step_name, &status)
    }

    /// Mark a step `failed`: preserves `started_at`, appends a retry
    /// record, increments `retry_count`, and records the error.
    pub fn mark_step_failed(&self, step_name: &str, error: &WorkflowError) -> Result<()> {
        let mut status = self.read_step_status(step_name)?;
        let message = error.to_string();
        let error_class = error.error_class();

        status.retries.push(RetryRecord {
            error: message.clone(),
            error_class: error_class.clone(),
            timestamp: Local::now(),
        });
        status.retry_count += 1;
        status.status = StepStatusState::Failed;
        status.error = Some(message);
        status.error_class = Some(error_class);

        self.write_step_status(step_name, &status)
    }

    /// Rewrite `metadata.json` with a new run status, preserving everything
    /// else and bumping `updated_at`.
    pub fn update_run_status(&self, status: RunStatus) -> Result<()> {
        let mut metadata = self.read_metadata()?;
        metadata.status = status;
        metadata.updated_at = Local::now();
        self.write_metadata(&metadata)
    }

    /// Compute a resume plan: which steps already completed, which step (if
    /// any) should be re-run first, and which steps remain pending.
    pub fn resume_plan(&self) -> Result<ResumePlan> {
        let metadata = self.read_metadata()?;
        let statuses = self.load_step_statuses()?;

        let mut completed = Vec::new();
        let mut resume_step = None;
        let mut pending = Vec::new();

        for name in &metadata.steps {
            let status = &statuses[name];
            match status.status {
                StepStatusState::Completed => completed.push(name.clone()),
                StepStatusState::InProgress | StepStatusState::Failed
                    if resume_step.is_none() =>
                {
                    resume_step = Some(name.clone());
                }
                _ => pending.push(name.clone()),
            }
        }

        Ok(ResumePlan {
            completed,
            resume_step,
            pending,
        })
    }
}

/// A handle for reading/writing a single step's persisted input, output,
/// and status.
#[derive(Debug, Clone)]
pub struct StepStore {
    dir: PathBuf,
}

impl StepStore {
    pub fn write_input(&self, input: &SchemaValue) -> Result<()> {
        write_json_pretty(&self.dir.join(INPUT_FILE), input)
    }

    pub fn write_output(&self, output: &SchemaValue) -> Result<()> {
        write_json_pretty(&self.dir.join(OUTPUT_FILE), output)
    }

    pub fn read_status(&self) -> Result<StepStatus> {
        read_json(&self.dir.join(STATUS_FILE))
    }
}

/// Result of `resume_plan`: completed steps (in definition order), the
/// first step to resume (the first non-completed step whose status is
/// `in_progress` or `failed`), and all remaining non-completed steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePlan {
    pub completed: Vec<String>,
    pub resume_step: Option<String>,
    pub pending: Vec<String>,
}

fn write_json_pretty<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(WorkflowError::RunNotFound {
            path: path.display().to_string(),
        });
    }
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
