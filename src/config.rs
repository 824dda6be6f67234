//! Optional TOML-loadable executor configuration.
//!
//! This is additive convenience over the constructor parameters: a caller
//! may always build a `WorkflowExecutor` with explicit values instead of
//! loading a config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Executor-wide knobs otherwise supplied as constructor arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WorkflowExecutorConfig {
    /// Default retry count applied to steps without a per-step override.
    pub default_retries: u32,
    /// Base directory under which run directories are created, if a run
    /// store is attached.
    pub run_store_dir: PathBuf,
}

impl Default for WorkflowExecutorConfig {
    fn default() -> Self {
        Self {
            default_retries: 0,
            run_store_dir: PathBuf::from("./runs"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load configuration from `path`. A missing file yields the defaults; any
/// other I/O error or parse failure is reported.
pub fn load_config(path: impl AsRef<Path>) -> Result<WorkflowExecutorConfig, ConfigError> {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file found, using defaults");
            return Ok(WorkflowExecutorConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<WorkflowExecutorConfig, ConfigError> {
    Ok(toml::from_str(contents)?)
}
