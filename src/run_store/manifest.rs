use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Top-level metadata written to `metadata.json` for every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub workflow_name: String,
    pub status: RunStatus,
    pub steps: Vec<String>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
    #[serde(default = "serde_json::Value::default")]
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_roundtrips_through_json() {
        for status in [
            RunStatus::Pending,
            RunStatus::InProgress,
            RunStatus::Completed,
            RunStatus::Failed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            let back: RunStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn run_status_uses_snake_case() {
        let json = serde_json::to_string(&RunStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
