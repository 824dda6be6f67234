use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Status written to each step's `status.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepStatus {
    pub status: StepStatusState,
    pub retry_count: u32,
    pub error: Option<String>,
    pub error_class: Option<String>,
    pub started_at: Option<DateTime<Local>>,
    pub completed_at: Option<DateTime<Local>>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub retries: Vec<RetryRecord>,
}

impl StepStatus {
    /// The status written by `create_run` for every step directory.
    pub fn initial() -> Self {
        Self {
            status: StepStatusState::Pending,
            retry_count: 0,
            error: None,
            error_class: None,
            started_at: None,
            completed_at: None,
            duration: None,
            retries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatusState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// One entry in a step's retry history: the error raised, a coarse class
/// tag, and when it happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryRecord {
    pub error: String,
    pub error_class: String,
    pub timestamp: DateTime<Local>,
}
