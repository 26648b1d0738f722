//! # Retry Executor
//!
//! Runs an async operation until it succeeds, its failure category gives up,
//! or the cancellation token fires. Backoff sleeps race the token, so a
//! cancel request never waits out a five-minute throttle delay.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error_classifier::{ErrorCategory, RetryDecision, RetryPolicy};
use crate::error::{ResubmitError, ResubmitResult};

/// Handed to the `on_retry` callback before each backoff sleep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryNotice {
    /// The attempt that just failed (1-based)
    pub attempt: u32,
    pub category: ErrorCategory,
    pub delay: Duration,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation` under the retry policy.
    ///
    /// `on_retry` is called synchronously before every sleep and must not
    /// block. A failure observed after cancellation is reported as
    /// [`ResubmitError::Cancelled`]; a success that lands after cancellation
    /// is still returned because its remote side effect already happened.
    pub async fn execute_with_retry<T, F, Fut, R>(
        &self,
        mut operation: F,
        mut on_retry: R,
        cancel: &CancellationToken,
    ) -> ResubmitResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ResubmitResult<T>>,
        R: FnMut(&RetryNotice),
    {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ResubmitError::Cancelled);
            }

            attempt = attempt.saturating_add(1);
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if cancel.is_cancelled() {
                debug!(attempt, error = %error, "Discarding failure observed after cancellation");
                return Err(ResubmitError::Cancelled);
            }

            match self.policy.decide(&error, attempt) {
                RetryDecision::GiveUp { category } => {
                    if category != ErrorCategory::Cancelled {
                        warn!(
                            attempt,
                            category = %category,
                            error = %error,
                            "Giving up after failed attempt"
                        );
                    }
                    return Err(error);
                }
                RetryDecision::Retry { category, delay } => {
                    debug!(
                        attempt,
                        category = %category,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying after backoff"
                    );

                    on_retry(&RetryNotice {
                        attempt,
                        category,
                        delay,
                        error: error.to_string(),
                    });

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(ResubmitError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}
