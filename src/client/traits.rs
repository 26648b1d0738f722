//! # Remote Collaborator Traits
//!
//! The engine reaches the outside world only through these two traits:
//! [`TokenProvider`] for bearer credentials and [`WorkflowManagementApi`] for
//! every remote call. Production code uses [`super::ArmWorkflowClient`];
//! tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ResubmitResult;
use crate::models::{CallbackUrl, RunIdentifier, WorkflowReference, WorkflowRun};

/// Supplies a bearer credential on demand
///
/// Sign-in is the provider's business; the engine only asks for a token
/// before every authenticated request.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a bearer token for `scope`, or `NotAuthenticated`
    async fn get_token(&self, scope: &str) -> ResubmitResult<String>;
}

/// One page of a remote listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_link: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_link: None,
        }
    }
}

/// Detail record of a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDetail {
    pub run: WorkflowRun,
    pub trigger_name: Option<String>,
}

/// Trigger as listed on the workflow definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerDefinition {
    pub name: String,
    /// Explicit type field, when the service reports one
    pub trigger_type: Option<String>,
}

/// Remote record of the event that started one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerHistory {
    pub name: String,
    pub run_name: Option<RunIdentifier>,
    pub inputs_link: Option<String>,
    pub outputs_link: Option<String>,
}

impl TriggerHistory {
    /// Run this history entry belongs to
    pub fn run_id(&self) -> &str {
        self.run_name.as_deref().unwrap_or(&self.name)
    }

    /// Link to the captured payload: inputs preferred, outputs otherwise
    pub fn payload_link(&self) -> Option<&str> {
        self.inputs_link
            .as_deref()
            .or(self.outputs_link.as_deref())
    }
}

/// Fully derived replay request, sent without a bearer header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRequest {
    pub method: String,
    pub url: String,
    pub content_type: String,
    pub body: Option<Vec<u8>>,
}

/// Every remote operation the engine performs
#[async_trait]
pub trait WorkflowManagementApi: Send + Sync {
    /// One page of runs, newest first; `next_link` continues a listing
    async fn list_runs_page(
        &self,
        workflow: &WorkflowReference,
        next_link: Option<&str>,
    ) -> ResubmitResult<Page<WorkflowRun>>;

    async fn get_run(
        &self,
        workflow: &WorkflowReference,
        run_id: &str,
    ) -> ResubmitResult<RunDetail>;

    async fn list_triggers(
        &self,
        workflow: &WorkflowReference,
    ) -> ResubmitResult<Vec<TriggerDefinition>>;

    async fn list_callback_url(
        &self,
        workflow: &WorkflowReference,
        trigger_name: &str,
    ) -> ResubmitResult<CallbackUrl>;

    async fn list_trigger_histories_page(
        &self,
        workflow: &WorkflowReference,
        trigger_name: &str,
        next_link: Option<&str>,
    ) -> ResubmitResult<Page<TriggerHistory>>;

    async fn get_trigger_history(
        &self,
        workflow: &WorkflowReference,
        trigger_name: &str,
        run_id: &str,
    ) -> ResubmitResult<TriggerHistory>;

    /// Bodyless re-invocation; not idempotent at the server
    async fn resubmit(
        &self,
        workflow: &WorkflowReference,
        trigger_name: &str,
        run_id: &str,
    ) -> ResubmitResult<()>;

    /// Fetch a pre-authorized content link without a bearer header
    async fn fetch_content(&self, uri: &str) -> ResubmitResult<Value>;

    /// Send a replay to a query-signed callback URL; returns the HTTP status
    async fn send_replay(&self, request: &ReplayRequest) -> ResubmitResult<u16>;
}
