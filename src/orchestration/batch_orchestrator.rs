//! # Batch Orchestrator
//!
//! Drives a list of run identifiers through one resubmission protocol,
//! wrapped in the [`RetryExecutor`], and aggregates a [`BatchResult`].
//!
//! ## Scheduling
//!
//! - **Sequential**: one run at a time in input order. A run's outcome is
//!   reported before the next run starts.
//! - **Concurrent**: fixed-width chunks awaited with `join_all`. Runs start
//!   in chunk order and may report in any order within a chunk. The next
//!   chunk starts only after the whole previous chunk has finished.
//!
//! ## Cancellation
//!
//! The token is checked before each run starts and threaded into every
//! retry loop. Runs that never started, or whose in-flight failure landed
//! after cancellation, are counted as skipped. A batch never returns an
//! error because of a single run; only setup failures surface as `Err`.

use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::progress::ProgressSender;
use crate::cache::TriggerMetadataCache;
use crate::client::WorkflowManagementApi;
use crate::config::ResubmitConfig;
use crate::error::{ResubmitError, ResubmitResult};
use crate::logging::{log_batch_operation, log_run_operation};
use crate::models::{
    BatchOptions, BatchResult, ProgressEvent, RunIdentifier, RunOutcome, RunOutcomeStatus,
    WorkflowReference,
};
use crate::protocols::{protocol_for, ProtocolKind, ResubmissionProtocol};
use crate::resilience::{RetryExecutor, RetryPolicy};

/// State shared by every run of one batch
struct BatchRun<'a> {
    batch_id: String,
    workflow: &'a WorkflowReference,
    protocol: Arc<dyn ResubmissionProtocol>,
    cancel: &'a CancellationToken,
    progress: &'a ProgressSender,
    total: usize,
    completed: AtomicUsize,
    result: Mutex<BatchResult>,
}

impl BatchRun<'_> {
    fn current(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Count the outcome once and report it with the new completed count
    fn finish(&self, outcome: RunOutcome) {
        let mut result = self.result.lock();
        result.record(&outcome);
        let current = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.progress
            .emit(ProgressEvent::for_outcome(&outcome, current, self.total));
        drop(result);

        let status = match outcome.status {
            RunOutcomeStatus::Success => "success",
            RunOutcomeStatus::Error => "error",
            RunOutcomeStatus::Cancelled => "cancelled",
        };
        log_run_operation(
            "resubmit_run",
            &self.batch_id,
            &outcome.run_id,
            status,
            outcome.error.as_deref(),
        );
    }
}

pub struct BatchOrchestrator {
    api: Arc<dyn WorkflowManagementApi>,
    cache: Arc<TriggerMetadataCache>,
    executor: RetryExecutor,
    batch_width: usize,
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("cache", &self.cache)
            .field("executor", &self.executor)
            .field("batch_width", &self.batch_width)
            .finish()
    }
}

impl BatchOrchestrator {
    pub fn new(
        api: Arc<dyn WorkflowManagementApi>,
        cache: Arc<TriggerMetadataCache>,
        executor: RetryExecutor,
        batch_width: usize,
    ) -> Self {
        Self {
            api,
            cache,
            executor,
            batch_width: batch_width.max(1),
        }
    }

    /// Orchestrator with a fresh cache and the configured retry policy
    pub fn from_config(api: Arc<dyn WorkflowManagementApi>, config: &ResubmitConfig) -> Self {
        let cache = Arc::new(TriggerMetadataCache::new(Arc::clone(&api)));
        Self::new(
            api,
            cache,
            RetryExecutor::new(RetryPolicy::new(config.retry.clone())),
            config.batch.concurrent_batch_width,
        )
    }

    pub fn cache(&self) -> &Arc<TriggerMetadataCache> {
        &self.cache
    }

    pub fn batch_width(&self) -> usize {
        self.batch_width
    }

    /// Resubmit `run_ids` and report every outcome.
    ///
    /// Duplicate identifiers are dropped, first occurrence wins. Returns
    /// `Err` only for setup failures: an invalid workflow reference, a blank
    /// run identifier, or callback replay requested for a non-HTTP trigger.
    pub async fn run_batch(
        &self,
        workflow: &WorkflowReference,
        run_ids: &[RunIdentifier],
        options: BatchOptions,
        cancel: &CancellationToken,
        progress: &ProgressSender,
    ) -> ResubmitResult<BatchResult> {
        let started = Instant::now();
        workflow.validate()?;
        let run_ids = dedup_run_ids(run_ids)?;
        let total = run_ids.len();
        if total == 0 {
            return Ok(BatchResult::new(0));
        }

        let kind = ProtocolKind::for_options(&options);
        let batch_id = Uuid::new_v4().to_string();
        let workflow_label = workflow.to_string();
        log_batch_operation(
            "resubmit_batch",
            &batch_id,
            &workflow_label,
            total,
            "started",
            Some(&format!("protocol={kind} sequential={}", options.sequential)),
        );

        match kind {
            ProtocolKind::CallbackReplay => {
                self.ensure_replay_supported(workflow, &run_ids[0]).await?;
                if !cancel.is_cancelled() {
                    progress.emit(ProgressEvent::prefetching(total));
                    match self
                        .cache
                        .bulk_prefetch_inputs_links(workflow, &run_ids, cancel)
                        .await
                    {
                        Ok(cached) => {
                            debug!(batch_id = %batch_id, cached, total, "Prefetch complete")
                        }
                        Err(ResubmitError::Cancelled) => {
                            debug!(batch_id = %batch_id, "Prefetch stopped by cancellation")
                        }
                        Err(error) => warn!(
                            batch_id = %batch_id,
                            error = %error,
                            "Prefetch failed, runs will resolve inputs links individually"
                        ),
                    }
                }
            }
            ProtocolKind::StandardResubmit => {
                self.warm_trigger_name(workflow, &run_ids[0], cancel).await;
            }
        }

        let batch = BatchRun {
            batch_id,
            workflow,
            protocol: protocol_for(kind, Arc::clone(&self.api), Arc::clone(&self.cache)),
            cancel,
            progress,
            total,
            completed: AtomicUsize::new(0),
            result: Mutex::new(BatchResult::new(total)),
        };

        if options.sequential {
            for run_id in &run_ids {
                self.process_run(&batch, run_id).await;
            }
        } else {
            for chunk in run_ids.chunks(self.batch_width) {
                let run_futures: Vec<_> = chunk
                    .iter()
                    .map(|run_id| self.process_run(&batch, run_id))
                    .collect();
                join_all(run_futures).await;
            }
        }

        self.cache.clear_inputs_links();

        let batch_id = batch.batch_id;
        let mut result = batch.result.into_inner();
        result.cancelled |= cancel.is_cancelled();
        result.elapsed_ms = started.elapsed().as_millis() as u64;

        let status = if result.cancelled {
            "cancelled"
        } else if result.failed_count > 0 {
            "completed_with_errors"
        } else {
            "completed"
        };
        log_batch_operation(
            "resubmit_batch",
            &batch_id,
            &workflow_label,
            total,
            status,
            Some(&format!(
                "success={} failed={} skipped={} elapsed_ms={}",
                result.success_count, result.failed_count, result.skipped_count, result.elapsed_ms
            )),
        );

        Ok(result)
    }

    async fn process_run(&self, batch: &BatchRun<'_>, run_id: &str) {
        if batch.cancel.is_cancelled() {
            batch.finish(RunOutcome::cancelled(run_id));
            return;
        }

        let attempt = self
            .executor
            .execute_with_retry(
                || batch.protocol.execute(batch.workflow, run_id),
                |notice| {
                    batch.progress.emit(ProgressEvent::retrying(
                        run_id,
                        batch.current(),
                        batch.total,
                        notice.attempt,
                        notice.category,
                        notice.delay,
                        notice.error.clone(),
                    ))
                },
                batch.cancel,
            )
            .await;

        let outcome = match attempt {
            Ok(()) => RunOutcome::success(run_id),
            Err(ResubmitError::Cancelled) => RunOutcome::cancelled(run_id),
            Err(error) => RunOutcome::failed(run_id, error.to_string()),
        };
        batch.finish(outcome);
    }

    /// Resolve the trigger name once so concurrent runs read it from the cache.
    ///
    /// A failure is left for each run to surface through its own retries.
    async fn warm_trigger_name(
        &self,
        workflow: &WorkflowReference,
        sample_run_id: &str,
        cancel: &CancellationToken,
    ) {
        if cancel.is_cancelled() {
            return;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            result = self.cache.resolve_trigger_name(workflow, sample_run_id) => {
                if let Err(error) = result {
                    debug!(workflow = %workflow, error = %error, "Trigger name lookup failed");
                }
            }
        }
    }

    /// Reject callback replay for triggers without a callback URL
    ///
    /// Discovery failures here are not fatal; each run then surfaces its own
    /// failure through the protocol.
    async fn ensure_replay_supported(
        &self,
        workflow: &WorkflowReference,
        sample_run_id: &str,
    ) -> ResubmitResult<()> {
        if let Err(error) = self
            .cache
            .resolve_trigger_name(workflow, sample_run_id)
            .await
        {
            debug!(workflow = %workflow, error = %error, "Trigger name lookup failed");
        }

        match self.cache.resolve_trigger_type(workflow).await {
            Ok(trigger_type) if !trigger_type.supports_callback_replay() => {
                Err(ResubmitError::InvalidInput(format!(
                    "callback replay needs an HTTP trigger, {workflow} has a {trigger_type} trigger"
                )))
            }
            Ok(_) => Ok(()),
            Err(error) => {
                warn!(workflow = %workflow, error = %error, "Could not classify trigger");
                Ok(())
            }
        }
    }

    /// Start a batch on the runtime with its own cancellation token
    pub fn spawn_batch(
        self: &Arc<Self>,
        workflow: WorkflowReference,
        run_ids: Vec<RunIdentifier>,
        options: BatchOptions,
        progress: ProgressSender,
    ) -> BatchHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let orchestrator = Arc::clone(self);
        let join = tokio::spawn(async move {
            orchestrator
                .run_batch(&workflow, &run_ids, options, &token, &progress)
                .await
        });
        BatchHandle { cancel, join }
    }
}

/// Running batch started by [`BatchOrchestrator::spawn_batch`]
#[derive(Debug)]
pub struct BatchHandle {
    cancel: CancellationToken,
    join: JoinHandle<ResubmitResult<BatchResult>>,
}

impl BatchHandle {
    /// Stop starting new runs; cannot be undone
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn wait(self) -> ResubmitResult<BatchResult> {
        self.join
            .await
            .map_err(|e| ResubmitError::transient(format!("batch task failed: {e}")))?
    }
}

fn dedup_run_ids(run_ids: &[RunIdentifier]) -> ResubmitResult<Vec<RunIdentifier>> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(run_ids.len());
    for run_id in run_ids {
        if run_id.trim().is_empty() {
            return Err(ResubmitError::InvalidInput(
                "run identifiers must not be blank".to_string(),
            ));
        }
        if seen.insert(run_id.as_str()) {
            unique.push(run_id.clone());
        }
    }

    if unique.len() < run_ids.len() {
        debug!(
            requested = run_ids.len(),
            unique = unique.len(),
            "Dropped duplicate run identifiers"
        );
    }
    Ok(unique)
}
