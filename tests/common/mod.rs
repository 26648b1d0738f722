//! Shared test fixtures: an in-memory [`WorkflowManagementApi`] with call
//! tracking and scripted failures.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use resubmit_core::client::{
    Page, ReplayRequest, RunDetail, TriggerDefinition, TriggerHistory, WorkflowManagementApi,
};
use resubmit_core::models::{CallbackUrl, RunStatus, WorkflowReference, WorkflowRun};
use resubmit_core::{ResubmitError, ResubmitResult};

pub const TRIGGER_NAME: &str = "manual";
pub const CALLBACK_URL: &str =
    "https://app.example.net/api/orders/triggers/manual/invoke?api-version=2022-05-01&sig=abc";

pub fn workflow() -> WorkflowReference {
    WorkflowReference::new("sub-1", "rg-1", "app-1", "orders")
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn run_at(name: &str, offset_minutes: i64, status: RunStatus) -> WorkflowRun {
    WorkflowRun {
        id: format!("/runs/{name}"),
        name: name.to_string(),
        status,
        start_time: base_time() + ChronoDuration::minutes(offset_minutes),
        end_time: None,
    }
}

pub fn run_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("run-{i:03}")).collect()
}

pub fn history(run_id: &str, inputs: Option<&str>, outputs: Option<&str>) -> TriggerHistory {
    TriggerHistory {
        name: format!("hist-{run_id}"),
        run_name: Some(run_id.to_string()),
        inputs_link: inputs.map(str::to_string),
        outputs_link: outputs.map(str::to_string),
    }
}

pub fn inputs_uri(run_id: &str) -> String {
    format!("https://blob.example.net/inputs/{run_id}?sig=xyz")
}

pub fn throttled() -> ResubmitError {
    ResubmitError::from_http_response(429, Some(Duration::from_secs(3)), "Too Many Requests")
}

pub fn not_found_404() -> ResubmitError {
    ResubmitError::from_http_response(404, None, "run not found")
}

pub fn server_error() -> ResubmitError {
    ResubmitError::from_http_response(503, None, "")
}

/// Every call the mock has served
#[derive(Debug, Default, Clone)]
pub struct MockCalls {
    pub list_runs_pages: usize,
    pub get_run: usize,
    pub list_triggers: usize,
    pub list_callback_url: usize,
    pub list_histories_pages: usize,
    pub get_history: usize,
    /// Run ids in the order resubmit was invoked
    pub resubmits: Vec<String>,
    pub fetched_content: Vec<String>,
    pub replays: Vec<ReplayRequest>,
    pub max_in_flight: usize,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub run_pages: Vec<Vec<WorkflowRun>>,
    pub list_runs_error: Option<ResubmitError>,
    pub trigger_name: Option<String>,
    pub triggers: Vec<TriggerDefinition>,
    pub callback_url: Option<CallbackUrl>,
    pub histories: Vec<TriggerHistory>,
    pub history_page_size: usize,
    pub list_histories_error: Option<ResubmitError>,
    pub contents: HashMap<String, Value>,
    /// Failures returned, in order, before a run's operation succeeds
    pub scripted_failures: HashMap<String, VecDeque<ResubmitError>>,
    /// Failure returned on every attempt for a run
    pub persistent_failures: HashMap<String, ResubmitError>,
    pub operation_delay: Option<Duration>,
    /// Latency of the run detail lookup used for trigger discovery
    pub discovery_delay: Option<Duration>,
    /// Cancel the token once this many resubmits or replays were issued
    pub cancel_after: Option<(usize, CancellationToken)>,
    /// Cancel the token once this many history pages were served
    pub cancel_after_history_pages: Option<(usize, CancellationToken)>,
    pub in_flight: usize,
    pub calls: MockCalls,
}

/// In-memory workflow management API
#[derive(Debug, Clone, Default)]
pub struct MockWorkflowApi {
    state: Arc<Mutex<MockState>>,
}

impl MockWorkflowApi {
    /// An HTTP-triggered workflow with a callback URL and no runs
    pub fn new() -> Self {
        let api = Self::default();
        {
            let mut state = api.state.lock();
            state.trigger_name = Some(TRIGGER_NAME.to_string());
            state.triggers = vec![TriggerDefinition {
                name: TRIGGER_NAME.to_string(),
                trigger_type: Some("Request".to_string()),
            }];
            state.callback_url = Some(CallbackUrl {
                value: CALLBACK_URL.to_string(),
                method: Some("POST".to_string()),
            });
            state.history_page_size = 2;
        }
        api
    }

    pub fn arc(&self) -> Arc<dyn WorkflowManagementApi> {
        Arc::new(self.clone())
    }

    pub fn with_run_pages(self, pages: Vec<Vec<WorkflowRun>>) -> Self {
        self.state.lock().run_pages = pages;
        self
    }

    pub fn with_trigger(self, name: &str, trigger_type: Option<&str>) -> Self {
        {
            let mut state = self.state.lock();
            state.trigger_name = Some(name.to_string());
            state.triggers = vec![TriggerDefinition {
                name: name.to_string(),
                trigger_type: trigger_type.map(str::to_string),
            }];
        }
        self
    }

    pub fn with_triggers(self, triggers: Vec<TriggerDefinition>) -> Self {
        self.state.lock().triggers = triggers;
        self
    }

    pub fn without_trigger_name(self) -> Self {
        self.state.lock().trigger_name = None;
        self
    }

    /// Histories with an inputs link and an envelope for every run
    pub fn with_payloads(self, run_ids: &[String], envelope: Value) -> Self {
        {
            let mut state = self.state.lock();
            for run_id in run_ids {
                let uri = inputs_uri(run_id);
                state.histories.push(history(run_id, Some(&uri), None));
                state.contents.insert(uri, envelope.clone());
            }
        }
        self
    }

    pub fn with_histories(self, histories: Vec<TriggerHistory>) -> Self {
        self.state.lock().histories = histories;
        self
    }

    pub fn with_history_page_size(self, size: usize) -> Self {
        self.state.lock().history_page_size = size.max(1);
        self
    }

    pub fn fail_with(self, run_id: &str, errors: Vec<ResubmitError>) -> Self {
        self.state
            .lock()
            .scripted_failures
            .insert(run_id.to_string(), errors.into());
        self
    }

    pub fn always_fail(self, run_id: &str, error: ResubmitError) -> Self {
        self.state
            .lock()
            .persistent_failures
            .insert(run_id.to_string(), error);
        self
    }

    pub fn fail_listing(self, error: ResubmitError) -> Self {
        self.state.lock().list_runs_error = Some(error);
        self
    }

    pub fn fail_history_listing(self, error: ResubmitError) -> Self {
        self.state.lock().list_histories_error = Some(error);
        self
    }

    pub fn with_operation_delay(self, delay: Duration) -> Self {
        self.state.lock().operation_delay = Some(delay);
        self
    }

    pub fn with_discovery_delay(self, delay: Duration) -> Self {
        self.state.lock().discovery_delay = Some(delay);
        self
    }

    pub fn cancel_after_history_pages(self, pages: usize, token: CancellationToken) -> Self {
        self.state.lock().cancel_after_history_pages = Some((pages, token));
        self
    }

    pub fn cancel_after(self, operations: usize, token: CancellationToken) -> Self {
        self.state.lock().cancel_after = Some((operations, token));
        self
    }

    pub fn calls(&self) -> MockCalls {
        self.state.lock().calls.clone()
    }

    /// Shared body of resubmit and replay: delay, script, cancellation hook
    async fn run_operation(&self, run_id: &str) -> ResubmitResult<()> {
        let delay = {
            let mut state = self.state.lock();
            state.in_flight += 1;
            state.calls.max_in_flight = state.calls.max_in_flight.max(state.in_flight);
            state.operation_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.in_flight -= 1;

        let issued = state.calls.resubmits.len() + state.calls.replays.len();
        if let Some((after, token)) = &state.cancel_after {
            if issued >= *after {
                token.cancel();
            }
        }

        if let Some(error) = state.persistent_failures.get(run_id) {
            return Err(error.clone());
        }
        match state
            .scripted_failures
            .get_mut(run_id)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn page_index(next_link: Option<&str>) -> usize {
    next_link
        .and_then(|link| link.rsplit('=').next())
        .and_then(|index| index.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl WorkflowManagementApi for MockWorkflowApi {
    async fn list_runs_page(
        &self,
        _workflow: &WorkflowReference,
        next_link: Option<&str>,
    ) -> ResubmitResult<Page<WorkflowRun>> {
        let mut state = self.state.lock();
        state.calls.list_runs_pages += 1;
        if let Some(error) = &state.list_runs_error {
            return Err(error.clone());
        }

        let index = page_index(next_link);
        let items = state.run_pages.get(index).cloned().unwrap_or_default();
        let next_link = (index + 1 < state.run_pages.len())
            .then(|| format!("https://mock/runs?page={}", index + 1));
        Ok(Page { items, next_link })
    }

    async fn get_run(
        &self,
        _workflow: &WorkflowReference,
        run_id: &str,
    ) -> ResubmitResult<RunDetail> {
        let delay = {
            let mut state = self.state.lock();
            state.calls.get_run += 1;
            state.discovery_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        Ok(RunDetail {
            run: WorkflowRun {
                id: format!("/runs/{run_id}"),
                name: run_id.to_string(),
                status: RunStatus::Failed,
                start_time: base_time(),
                end_time: None,
            },
            trigger_name: state.trigger_name.clone(),
        })
    }

    async fn list_triggers(
        &self,
        _workflow: &WorkflowReference,
    ) -> ResubmitResult<Vec<TriggerDefinition>> {
        let mut state = self.state.lock();
        state.calls.list_triggers += 1;
        Ok(state.triggers.clone())
    }

    async fn list_callback_url(
        &self,
        workflow: &WorkflowReference,
        trigger_name: &str,
    ) -> ResubmitResult<CallbackUrl> {
        let mut state = self.state.lock();
        state.calls.list_callback_url += 1;
        state.callback_url.clone().ok_or_else(|| {
            ResubmitError::not_found(format!("{workflow} trigger {trigger_name} has no callback"))
        })
    }

    async fn list_trigger_histories_page(
        &self,
        _workflow: &WorkflowReference,
        _trigger_name: &str,
        next_link: Option<&str>,
    ) -> ResubmitResult<Page<TriggerHistory>> {
        let mut state = self.state.lock();
        state.calls.list_histories_pages += 1;
        if let Some((after, token)) = &state.cancel_after_history_pages {
            if state.calls.list_histories_pages >= *after {
                token.cancel();
            }
        }
        if let Some(error) = &state.list_histories_error {
            return Err(error.clone());
        }

        let index = page_index(next_link);
        let size = state.history_page_size.max(1);
        let items: Vec<TriggerHistory> = state
            .histories
            .iter()
            .skip(index * size)
            .take(size)
            .cloned()
            .collect();
        let next_link = ((index + 1) * size < state.histories.len())
            .then(|| format!("https://mock/histories?page={}", index + 1));
        Ok(Page { items, next_link })
    }

    async fn get_trigger_history(
        &self,
        _workflow: &WorkflowReference,
        _trigger_name: &str,
        run_id: &str,
    ) -> ResubmitResult<TriggerHistory> {
        let mut state = self.state.lock();
        state.calls.get_history += 1;
        state
            .histories
            .iter()
            .find(|h| h.run_id() == run_id)
            .cloned()
            .ok_or_else(|| ResubmitError::from_http_response(404, None, "history not found"))
    }

    async fn resubmit(
        &self,
        _workflow: &WorkflowReference,
        _trigger_name: &str,
        run_id: &str,
    ) -> ResubmitResult<()> {
        self.state
            .lock()
            .calls
            .resubmits
            .push(run_id.to_string());
        self.run_operation(run_id).await
    }

    async fn fetch_content(&self, uri: &str) -> ResubmitResult<Value> {
        let mut state = self.state.lock();
        state.calls.fetched_content.push(uri.to_string());
        state
            .contents
            .get(uri)
            .cloned()
            .ok_or_else(|| ResubmitError::from_http_response(404, None, "blob not found"))
    }

    async fn send_replay(&self, request: &ReplayRequest) -> ResubmitResult<u16> {
        let run_id = {
            let mut state = self.state.lock();
            state.calls.replays.push(request.clone());
            // Replays carry no run id; recover it from the fetched inputs link
            state
                .calls
                .fetched_content
                .last()
                .and_then(|uri| uri.split('/').last())
                .and_then(|tail| tail.split('?').next())
                .unwrap_or_default()
                .to_string()
        };
        self.run_operation(&run_id).await.map(|()| 202)
    }
}
