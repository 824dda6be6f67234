pub mod agent;
pub mod config;
pub mod error;
pub mod executor;
pub mod run_store;
pub mod schema;
pub mod step;
pub mod workflow;

pub use agent::{Agent, AgentExecutor, AgentResult, StepExecutor};
pub use error::{Result, WorkflowError};
pub use executor::{RealSleeper, Sleeper, WorkflowExecutor, WorkflowResult};
pub use run_store::{
    ResumePlan, RetryRecord, RunDir, RunMetadata, RunStatus, RunStore, StepStatus, StepStatusState, StepStore,
};
pub use schema::{MergedInput, Record, SchemaValue};
pub use step::StepDefinition;
pub use workflow::{WorkflowBuilder, WorkflowDefinition};

use tracing::info;

/// Initialise a default tracing subscriber for the library consumer.
///
/// Call this once at program start. Uses `RUST_LOG` env var for filtering,
/// defaulting to `info` level.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).init();

    info!("waveflow tracing initialised");
}
