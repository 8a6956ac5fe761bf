//! # RetryExecutor: bounded retry with backoff for one operation.
//!
//! Runs a caller-supplied async operation up to `max_retries + 1` times:
//!
//! ```text
//! loop {
//!   ├─► run operation
//!   │     ├─ Ok            ─► return value
//!   │     ├─ Err(fatal)    ─► return RetryError::Fatal (original error inside)
//!   │     └─ Err(retryable):
//!   │          ├─ attempts exhausted ─► RetryError::Exhausted { last error }
//!   │          ├─ delay = spread(backoff.delay(attempt))
//!   │          └─ sleep(delay)  (raced against cancellation)
//!   └─ cancellation during sleep ─► RetryError::Interrupted
//! }
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially**; the attempt counter is monotonic.
//! - Fatal errors abort immediately without consuming further retries.
//! - Each attempt emits one structured log line (operation, attempt, delay).
//! - Cancellation is honored only at the backoff sleep (the executor never
//!   preempts a running operation).

use std::future::Future;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RetryConfig;
use crate::error::{ConfigError, OperationError, RetryError};
use crate::policies::{BackoffPolicy, spread};

/// Executes operations under a bounded retry-with-backoff discipline.
///
/// The executor is stateless between calls; per-call state (attempt counter,
/// current delay) lives on the stack of [`execute`](RetryExecutor::execute).
#[derive(Clone, Debug)]
pub struct RetryExecutor {
    max_retries: u32,
    backoff: BackoffPolicy,
}

impl RetryExecutor {
    /// Creates an executor from a validated [`RetryConfig`].
    pub fn new(cfg: &RetryConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            max_retries: cfg.max_retries,
            backoff: cfg.backoff(),
        })
    }

    /// Creates an executor with the default configuration
    /// (3 retries, 1s base, ×2.0, 10s cap).
    pub fn with_defaults() -> Self {
        Self::new(&RetryConfig::default()).expect("default retry config is valid")
    }

    /// Runs `operation` until it succeeds, fails fatally, exhausts its
    /// attempt budget, or `cancel` fires during a backoff sleep.
    ///
    /// `operation` is invoked once per attempt and must produce a fresh
    /// future each time. `name` identifies the operation in logs and in the
    /// [`RetryError::Exhausted`] payload.
    pub async fn execute<T, F, Fut>(
        &self,
        name: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        let mut failed: u32 = 0;

        loop {
            debug!(
                operation = name,
                attempt = failed + 1,
                budget = self.max_retries + 1,
                "executing operation"
            );

            match operation().await {
                Ok(value) => {
                    if failed > 0 {
                        info!(operation = name, retries = failed, "operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    error!(operation = name, error = %err, "non-retryable error, aborting");
                    return Err(RetryError::Fatal(err));
                }
                Err(err) => {
                    failed += 1;
                    if failed > self.max_retries {
                        error!(
                            operation = name,
                            attempts = failed,
                            error = %err,
                            "retries exhausted"
                        );
                        return Err(RetryError::Exhausted {
                            operation: name.to_string(),
                            attempts: failed,
                            source: err,
                        });
                    }

                    let delay = spread(self.backoff.delay(failed - 1));
                    warn!(
                        operation = name,
                        attempt = failed,
                        budget = self.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, backing off"
                    );

                    let sleep = time::sleep(delay);
                    tokio::pin!(sleep);
                    select! {
                        _ = &mut sleep => {}
                        _ = cancel.cancelled() => {
                            warn!(operation = name, "cancelled during backoff");
                            return Err(RetryError::Interrupted);
                        }
                    }
                }
            }
        }
    }
}
