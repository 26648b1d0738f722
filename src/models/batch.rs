//! Batch options, per-run outcomes, aggregated results and progress events.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::workflow::RunIdentifier;
use crate::resilience::ErrorCategory;

/// Caller-selected scheduling and protocol for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Process runs one at a time in input order
    pub sequential: bool,
    /// Replay captured payloads through the trigger's callback URL
    pub use_callback_url: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcomeStatus {
    Success,
    Error,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: RunIdentifier,
    pub status: RunOutcomeStatus,
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn success(run_id: impl Into<RunIdentifier>) -> Self {
        Self {
            run_id: run_id.into(),
            status: RunOutcomeStatus::Success,
            error: None,
        }
    }

    pub fn failed(run_id: impl Into<RunIdentifier>, error: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            status: RunOutcomeStatus::Error,
            error: Some(error.into()),
        }
    }

    pub fn cancelled(run_id: impl Into<RunIdentifier>) -> Self {
        Self {
            run_id: run_id.into(),
            status: RunOutcomeStatus::Cancelled,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub run_id: RunIdentifier,
    pub error: String,
}

/// Aggregate of one batch call
///
/// Every requested run lands in exactly one of `success_count`,
/// `failed_count` or `skipped_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    /// Runs never started, or abandoned in flight, because of cancellation
    pub skipped_count: usize,
    pub cancelled: bool,
    /// Failures in the order they were reported
    pub errors: Vec<RunError>,
    pub elapsed_ms: u64,
}

impl BatchResult {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &RunOutcome) {
        match outcome.status {
            RunOutcomeStatus::Success => self.success_count += 1,
            RunOutcomeStatus::Error => {
                self.failed_count += 1;
                self.errors.push(RunError {
                    run_id: outcome.run_id.clone(),
                    error: outcome.error.clone().unwrap_or_default(),
                });
            }
            RunOutcomeStatus::Cancelled => {
                self.skipped_count += 1;
                self.cancelled = true;
            }
        }
    }

    pub fn processed(&self) -> usize {
        self.success_count + self.failed_count + self.skipped_count
    }

    /// Accounting invariant: each requested run counted exactly once
    pub fn is_consistent(&self) -> bool {
        self.processed() == self.total && self.errors.len() == self.failed_count
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Prefetching,
    Retrying,
    Success,
    Error,
    Cancelled,
}

/// One state transition streamed to the caller while a batch runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Absent for batch-level transitions such as prefetching
    pub run_id: Option<RunIdentifier>,
    pub status: ProgressStatus,
    /// Completed runs so far; never decreases within a batch
    pub current: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_reason: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
}

impl ProgressEvent {
    pub fn prefetching(total: usize) -> Self {
        Self {
            run_id: None,
            status: ProgressStatus::Prefetching,
            current: 0,
            total,
            error: None,
            retry_attempt: None,
            retry_reason: None,
            retry_delay_ms: None,
        }
    }

    pub fn for_outcome(outcome: &RunOutcome, current: usize, total: usize) -> Self {
        let status = match outcome.status {
            RunOutcomeStatus::Success => ProgressStatus::Success,
            RunOutcomeStatus::Error => ProgressStatus::Error,
            RunOutcomeStatus::Cancelled => ProgressStatus::Cancelled,
        };
        Self {
            run_id: Some(outcome.run_id.clone()),
            status,
            current,
            total,
            error: outcome.error.clone(),
            retry_attempt: None,
            retry_reason: None,
            retry_delay_ms: None,
        }
    }

    pub fn retrying(
        run_id: &str,
        current: usize,
        total: usize,
        attempt: u32,
        reason: ErrorCategory,
        delay: Duration,
        error: String,
    ) -> Self {
        Self {
            run_id: Some(run_id.to_string()),
            status: ProgressStatus::Retrying,
            current,
            total,
            error: Some(error),
            retry_attempt: Some(attempt),
            retry_reason: Some(reason),
            retry_delay_ms: Some(delay.as_millis() as u64),
        }
    }
}
