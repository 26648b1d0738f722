//! # Remote Client Layer
//!
//! Collaborator traits, wire types and the production `reqwest` client for
//! the workflow management API.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use resubmit_core::client::{ArmWorkflowClient, StaticTokenProvider, WorkflowManagementApi};
//! use resubmit_core::config::ApiConfig;
//! use resubmit_core::models::WorkflowReference;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), resubmit_core::ResubmitError> {
//! let client = ArmWorkflowClient::new(
//!     ApiConfig::default(),
//!     Arc::new(StaticTokenProvider::new("eyJ0eXAi...")),
//! )?;
//! let workflow = WorkflowReference::new("sub", "rg", "app", "orders");
//! let page = client.list_runs_page(&workflow, None).await?;
//! println!("{} runs on the first page", page.items.len());
//! # Ok(())
//! # }
//! ```

pub mod arm_client;
pub mod responses;
pub mod token;
pub mod traits;

pub use arm_client::{error_from_response, parse_retry_after, ArmWorkflowClient};
pub use token::{EnvTokenProvider, StaticTokenProvider};
pub use traits::{
    Page, ReplayRequest, RunDetail, TokenProvider, TriggerDefinition, TriggerHistory,
    WorkflowManagementApi,
};
