//! Retry policy with exponential backoff and an injectable sleep seam.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::agent::StepExecutor;
use crate::error::Result;
use crate::schema::SchemaValue;

/// Interposable sleep used between retry attempts. Production code uses
/// `RealSleeper`; tests substitute a recording implementation so the suite
/// never actually waits on wall-clock backoff.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps for real, via `tokio::time::sleep`.
#[derive(Debug, Default)]
pub struct RealSleeper;

#[async_trait]
impl Sleeper for RealSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs `executor.execute(input)` up to `retries + 1` times. On failure,
/// waits `2^(attempt - 1)` seconds (1, 2, 4, 8, ...) before retrying. The
/// error from the final, non-retried attempt is propagated untouched.
pub async fn retry_with_backoff(
    executor: &dyn StepExecutor,
    input: &SchemaValue,
    retries: u32,
    sleeper: &dyn Sleeper,
) -> Result<crate::agent::AgentResult> {
    let mut attempt = 0u32;
    loop {
        match executor.execute(input.clone()).await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempt += 1;
                if attempt > retries {
                    return Err(err);
                }
                let backoff = Duration::from_secs(2u64.pow(attempt - 1));
                warn!(
                    attempt,
                    backoff_secs = backoff.as_secs(),
                    error = %err,
                    "step attempt failed, retrying after backoff"
                );
                sleeper.sleep(backoff).await;
            }
        }
    }
}
