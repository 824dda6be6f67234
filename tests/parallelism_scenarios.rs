//! Two independent steps must run concurrently within a wave.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{BarrierAgent, PassThrough};
use tokio::sync::Barrier;
use waveflow::{AgentExecutor, StepExecutor, WorkflowDefinition, WorkflowExecutor};

#[tokio::test]
async fn independent_steps_run_concurrently() {
    let definition = WorkflowDefinition::define("parallel", |b| {
        b.step::<PassThrough>("a", [] as [&str; 0], None)
            .step::<PassThrough>("b", [] as [&str; 0], None)
    })
    .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let executor = WorkflowExecutor::new(Arc::new(definition))
        .with_agent(
            "a",
            Arc::new(AgentExecutor::new(BarrierAgent {
                barrier: barrier.clone(),
            })) as Arc<dyn StepExecutor>,
        )
        .with_agent(
            "b",
            Arc::new(AgentExecutor::new(BarrierAgent { barrier })) as Arc<dyn StepExecutor>,
        );

    // Each agent blocks on the barrier until both have entered `call`; if
    // the executor ran them one at a time rather than concurrently, this
    // would deadlock and the timeout would fire.
    let result = tokio::time::timeout(Duration::from_secs(5), executor.run(common::text_input("hi")))
        .await
        .expect("both steps should have unblocked each other via the shared barrier")
        .unwrap();

    assert!(result.success);
}
