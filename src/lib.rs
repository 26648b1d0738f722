#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Resubmit Core Rust
//!
//! Run resubmission engine for hosted workflow apps.
//!
//! ## Overview
//!
//! Resubmits previously executed workflow runs against a rate-limited remote
//! management API at batch scale. Failures are classified and retried with
//! per-category backoff, trigger discovery is cached across a batch, and a
//! caller-held cancellation token stops a batch mid-flight without losing
//! the outcomes already reported.
//!
//! ## Module Organization
//!
//! - [`discovery`] - Time-windowed run search over the paginated run listing
//! - [`cache`] - Trigger metadata and per-run inputs links
//! - [`resilience`] - Error classification, backoff policy and the retry loop
//! - [`protocols`] - Standard resubmit and callback replay
//! - [`orchestration`] - Batch scheduling, cancellation and progress
//! - [`client`] - Collaborator traits and the `reqwest` management client
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resubmit_core::client::{ArmWorkflowClient, EnvTokenProvider};
//! use resubmit_core::discovery::{RunSearchPaginator, RunSearchQuery};
//! use resubmit_core::models::{BatchOptions, RunStatus, WorkflowReference};
//! use resubmit_core::orchestration::{BatchOrchestrator, ProgressSender};
//! use resubmit_core::ResubmitConfig;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), resubmit_core::ResubmitError> {
//! let config = ResubmitConfig::load(None)?;
//! let api = Arc::new(ArmWorkflowClient::new(
//!     config.api.clone(),
//!     Arc::new(EnvTokenProvider::new("RESUBMIT_TOKEN")),
//! )?);
//! let workflow = WorkflowReference::new("sub", "rg", "app", "orders");
//!
//! let end = chrono::Utc::now();
//! let query = RunSearchQuery::new(end - chrono::Duration::hours(6), end)
//!     .with_statuses([RunStatus::Failed]);
//! let runs = RunSearchPaginator::new(api.clone(), config.search.page_delay())
//!     .search_chronological(&workflow, &query)
//!     .await?;
//!
//! let run_ids: Vec<String> = runs.into_iter().map(|run| run.name).collect();
//! let orchestrator = BatchOrchestrator::from_config(api, &config);
//! let result = orchestrator
//!     .run_batch(
//!         &workflow,
//!         &run_ids,
//!         BatchOptions { sequential: true, use_callback_url: false },
//!         &CancellationToken::new(),
//!         &ProgressSender::disabled(),
//!     )
//!     .await?;
//! println!("{} resubmitted, {} failed", result.success_count, result.failed_count);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod protocols;
pub mod resilience;

pub use cache::{CacheStats, TriggerMetadataCache};
pub use client::{ArmWorkflowClient, TokenProvider, WorkflowManagementApi};
pub use config::ResubmitConfig;
pub use discovery::{RunSearchPaginator, RunSearchQuery};
pub use error::{ResubmitError, ResubmitResult};
pub use models::{
    BatchOptions, BatchResult, ProgressEvent, ProgressStatus, RunIdentifier, RunOutcome,
    TriggerType, WorkflowReference, WorkflowRun,
};
pub use orchestration::{BatchHandle, BatchOrchestrator, ProgressSender};
pub use protocols::{CallbackReplay, ProtocolKind, ResubmissionProtocol, StandardResubmit};
pub use resilience::{ErrorCategory, RetryExecutor, RetryPolicy};
