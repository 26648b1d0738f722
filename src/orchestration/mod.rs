//! # Batch Orchestration
//!
//! [`BatchOrchestrator`] schedules a batch of runs through one resubmission
//! protocol and streams [`crate::models::ProgressEvent`]s through a
//! [`ProgressSender`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use resubmit_core::client::{ArmWorkflowClient, EnvTokenProvider};
//! use resubmit_core::config::ResubmitConfig;
//! use resubmit_core::models::{BatchOptions, WorkflowReference};
//! use resubmit_core::orchestration::{BatchOrchestrator, ProgressSender};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), resubmit_core::ResubmitError> {
//! let config = ResubmitConfig::default();
//! let api = Arc::new(ArmWorkflowClient::new(
//!     config.api.clone(),
//!     Arc::new(EnvTokenProvider::new("RESUBMIT_TOKEN")),
//! )?);
//! let orchestrator = Arc::new(BatchOrchestrator::from_config(api, &config));
//!
//! let (progress, mut events) = ProgressSender::channel();
//! let handle = orchestrator.spawn_batch(
//!     WorkflowReference::new("sub", "rg", "app", "orders"),
//!     vec!["08585".to_string(), "08586".to_string()],
//!     BatchOptions { sequential: true, use_callback_url: false },
//!     progress,
//! );
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?} {}/{}", event.status, event.current, event.total);
//! }
//! let result = handle.wait().await?;
//! assert!(result.is_consistent());
//! # Ok(())
//! # }
//! ```

pub mod batch_orchestrator;
pub mod progress;

pub use batch_orchestrator::{BatchHandle, BatchOrchestrator};
pub use progress::{ProgressReceiver, ProgressSender};
