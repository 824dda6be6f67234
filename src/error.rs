use thiserror::Error;

/// Top-level error type for the waveflow library.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A step's `after` set names a step that does not exist in the workflow.
    #[error("step '{step}' depends on unknown step '{dependency}'")]
    MissingDependency { step: String, dependency: String },

    /// The dependency graph contains a cycle.
    #[error("circular dependency detected, closed by step '{step}'")]
    CircularDependency { step: String },

    /// An agent's `execute` was called with a value that does not match its
    /// declared input schema.
    #[error("invalid input for agent '{agent_class}': expected '{expected}', got '{actual}'")]
    InvalidInput {
        agent_class: String,
        expected: String,
        actual: String,
    },

    /// An agent's `call` returned a value that does not match its declared
    /// output schema.
    #[error("invalid output for agent '{agent_class}': expected '{expected}', got '{actual}'")]
    InvalidOutput {
        agent_class: String,
        expected: String,
        actual: String,
    },

    /// A run store operation referenced a run or step directory that does
    /// not exist.
    #[error("run not found: {path}")]
    RunNotFound { path: String },

    /// An agent's `call` raised an error. Carries the message and a coarse
    /// class tag, mirroring a source-language exception's class name.
    #[error("{message}")]
    Agent { message: String, error_class: String },

    /// Wraps `std::io::Error` raised by the run store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wraps `serde_json::Error` raised during (de)serialization.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    /// A coarse class tag for this error, used for `status.json::error_class`
    /// and for the structured log fields emitted around a step failure.
    pub fn error_class(&self) -> String {
        match self {
            WorkflowError::MissingDependency { .. } => "MissingDependencyError".to_string(),
            WorkflowError::CircularDependency { .. } => "CircularDependencyError".to_string(),
            WorkflowError::InvalidInput { .. } => "InvalidInputError".to_string(),
            WorkflowError::InvalidOutput { .. } => "InvalidOutputError".to_string(),
            WorkflowError::RunNotFound { .. } => "RunNotFoundError".to_string(),
            WorkflowError::Agent { error_class, .. } => error_class.clone(),
            WorkflowError::Io(_) => "IoError".to_string(),
            WorkflowError::Serialization(_) => "SerializationError".to_string(),
        }
    }

    /// Render up to five causal frames (this error plus its `source()` chain)
    /// joined by newlines. This port's nearest equivalent to "first 5
    /// backtrace frames", since Rust does not expose a per-error backtrace
    /// as a stable, capturable value the way an interpreter stack trace is.
    pub fn error_details(&self) -> String {
        use std::error::Error as _;

        let mut frames = vec![self.to_string()];
        let mut source = self.source();
        while let Some(err) = source {
            frames.push(err.to_string());
            source = err.source();
        }
        frames.truncate(5);
        frames.join("\n")
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, WorkflowError>;
