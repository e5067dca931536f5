//! Bounded polling with exponential backoff and cancellation.
//!
//! Used to wait for an SSM command invocation to reach a terminal status.
//! Every wait has a hard timeout and observes a cancellation token, so a
//! hung instance can no longer stall the batch forever.

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::SsmBatchError;

/// Configuration for a polling wait.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay before the first check
    pub initial_delay: Duration,
    /// Cap for the exponentially growing delay
    pub max_delay: Duration,
    /// Total time after which the wait gives up
    pub timeout: Duration,
    /// Growth factor between consecutive delays
    pub factor: f32,
    /// Randomize delays so many waits do not poll in lockstep
    pub jitter: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
            factor: 1.5,
            jitter: true,
        }
    }
}

/// Unbounded delay sequence: `initial_delay`, growing by `factor`, capped at `max_delay`
fn delay_schedule(config: &PollConfig) -> ExponentialBackoff {
    let mut builder = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(config.factor)
        .without_max_times();
    if config.jitter {
        builder = builder.with_jitter();
    }
    builder.build()
}

/// Poll `check` until it yields a value, the timeout elapses, or `cancel` fires.
///
/// The first check runs after `initial_delay`; later delays grow by `factor`
/// up to `max_delay`. A check error ends the wait immediately.
///
/// # Returns
/// * `Ok(T)` - the value produced by the first successful check
/// * `Err(SsmBatchError::Timeout)` - no value within `timeout`
/// * `Err(SsmBatchError::Cancelled)` - `cancel` fired while waiting
pub async fn poll_until<T, F, Fut>(
    config: &PollConfig,
    cancel: &CancellationToken,
    mut check: F,
    resource_name: &str,
) -> Result<T, SsmBatchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, SsmBatchError>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    let mut delays = delay_schedule(config);

    loop {
        let remaining = config.timeout.saturating_sub(start.elapsed());
        let delay = delays.next().unwrap_or(config.max_delay).min(remaining);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return Err(SsmBatchError::Cancelled),
        }

        attempts += 1;
        if let Some(value) = check().await? {
            debug!(resource = %resource_name, attempts, "Wait finished");
            return Ok(value);
        }

        if start.elapsed() >= config.timeout {
            return Err(SsmBatchError::Timeout(config.timeout));
        }

        debug!(
            resource = %resource_name,
            attempt = attempts,
            elapsed_ms = start.elapsed().as_millis(),
            "Not ready yet"
        );
    }
}
