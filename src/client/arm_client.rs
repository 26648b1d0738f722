//! # Management API Client
//!
//! `reqwest` implementation of [`WorkflowManagementApi`] against the
//! workflow host runtime's management surface.
//!
//! The management client attaches a freshly requested bearer token to every
//! call. The unauthenticated client talks to pre-signed content links and
//! query-signed callback URLs and never carries an `Authorization` header.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::responses::{
    CallbackUrlResponse, ListResponse, RunResource, TriggerHistoryResource, TriggerResource,
};
use super::traits::{
    Page, ReplayRequest, RunDetail, TokenProvider, TriggerDefinition, TriggerHistory,
    WorkflowManagementApi,
};
use crate::config::ApiConfig;
use crate::error::{ResubmitError, ResubmitResult};
use crate::models::{CallbackUrl, WorkflowReference, WorkflowRun};

#[derive(Clone)]
pub struct ArmWorkflowClient {
    management: Client,
    unauthenticated: Client,
    base_url: Url,
    config: ApiConfig,
    token_provider: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for ArmWorkflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmWorkflowClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.config.api_version)
            .field("management_timeout_secs", &self.config.management_timeout_secs)
            .field("replay_timeout_secs", &self.config.replay_timeout_secs)
            .finish()
    }
}

impl ArmWorkflowClient {
    /// Create a client; fails on a malformed base URL
    pub fn new(config: ApiConfig, token_provider: Arc<dyn TokenProvider>) -> ResubmitResult<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            ResubmitError::configuration(format!("Invalid base URL '{}': {e}", config.base_url))
        })?;

        let user_agent = format!("resubmit-core/{}", env!("CARGO_PKG_VERSION"));
        let management = Client::builder()
            .timeout(config.management_timeout())
            .user_agent(user_agent.clone())
            .build()
            .map_err(|e| {
                ResubmitError::configuration(format!("Failed to create HTTP client: {e}"))
            })?;
        let unauthenticated = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ResubmitError::configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        info!(
            base_url = %base_url,
            api_version = %config.api_version,
            "Created workflow management client"
        );

        Ok(Self {
            management,
            unauthenticated,
            base_url,
            config,
            token_provider,
        })
    }

    /// Absolute management URL for `workflow` plus `suffix`, with api-version
    fn workflow_url(&self, workflow: &WorkflowReference, suffix: &str) -> ResubmitResult<Url> {
        let relative = format!("{}{}", workflow.management_path(), suffix);
        let mut url = self.base_url.join(&relative).map_err(|e| {
            ResubmitError::InvalidInput(format!("Failed to construct URL for {workflow}: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version);
        Ok(url)
    }

    fn continuation_url(&self, next_link: &str) -> ResubmitResult<Url> {
        Url::parse(next_link)
            .map_err(|e| ResubmitError::InvalidInput(format!("Invalid nextLink '{next_link}': {e}")))
    }

    /// Request builder carrying a bearer token obtained just now
    async fn authorized(&self, method: Method, url: Url) -> ResubmitResult<RequestBuilder> {
        let token = self.token_provider.get_token(&self.config.scope).await?;
        Ok(self.management.request(method, url).bearer_auth(token))
    }

    async fn send_json<T>(&self, request: RequestBuilder, operation: &str) -> ResubmitResult<T>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await?;
        if !response.status().is_success() {
            let error = error_from_response(response).await;
            debug!(operation, error = %error, "Management call failed");
            return Err(error);
        }

        response.json::<T>().await.map_err(|e| {
            error!(operation, error = %e, "Failed to parse management response");
            ResubmitError::Serialization(format!("Failed to parse {operation} response: {e}"))
        })
    }
}

#[async_trait]
impl WorkflowManagementApi for ArmWorkflowClient {
    async fn list_runs_page(
        &self,
        workflow: &WorkflowReference,
        next_link: Option<&str>,
    ) -> ResubmitResult<Page<WorkflowRun>> {
        let url = match next_link {
            Some(link) => self.continuation_url(link)?,
            None => self.workflow_url(workflow, "/runs")?,
        };
        let request = self.authorized(Method::GET, url).await?;
        let response: ListResponse<RunResource> = self.send_json(request, "list runs").await?;
        Ok(response.into_page(RunResource::into_run))
    }

    async fn get_run(
        &self,
        workflow: &WorkflowReference,
        run_id: &str,
    ) -> ResubmitResult<RunDetail> {
        let url = self.workflow_url(workflow, &format!("/runs/{run_id}"))?;
        let request = self.authorized(Method::GET, url).await?;
        let resource: RunResource = self.send_json(request, "get run").await?;
        Ok(resource.into_detail())
    }

    async fn list_triggers(
        &self,
        workflow: &WorkflowReference,
    ) -> ResubmitResult<Vec<TriggerDefinition>> {
        let url = self.workflow_url(workflow, "/triggers")?;
        let request = self.authorized(Method::GET, url).await?;
        let response: ListResponse<TriggerResource> =
            self.send_json(request, "list triggers").await?;
        Ok(response.into_page(TriggerDefinition::from).items)
    }

    async fn list_callback_url(
        &self,
        workflow: &WorkflowReference,
        trigger_name: &str,
    ) -> ResubmitResult<CallbackUrl> {
        let url = self.workflow_url(
            workflow,
            &format!("/triggers/{trigger_name}/listCallbackUrl"),
        )?;
        let request = self.authorized(Method::POST, url).await?;
        let response: CallbackUrlResponse = self.send_json(request, "list callback url").await?;
        response.into_callback_url().ok_or_else(|| {
            ResubmitError::not_found(format!(
                "trigger '{trigger_name}' of {workflow} has no callback URL"
            ))
        })
    }

    async fn list_trigger_histories_page(
        &self,
        workflow: &WorkflowReference,
        trigger_name: &str,
        next_link: Option<&str>,
    ) -> ResubmitResult<Page<TriggerHistory>> {
        let url = match next_link {
            Some(link) => self.continuation_url(link)?,
            None => self.workflow_url(workflow, &format!("/triggers/{trigger_name}/histories"))?,
        };
        let request = self.authorized(Method::GET, url).await?;
        let response: ListResponse<TriggerHistoryResource> =
            self.send_json(request, "list trigger histories").await?;
        Ok(response.into_page(TriggerHistory::from))
    }

    async fn get_trigger_history(
        &self,
        workflow: &WorkflowReference,
        trigger_name: &str,
        run_id: &str,
    ) -> ResubmitResult<TriggerHistory> {
        let url = self.workflow_url(
            workflow,
            &format!("/triggers/{trigger_name}/histories/{run_id}"),
        )?;
        let request = self.authorized(Method::GET, url).await?;
        let resource: TriggerHistoryResource =
            self.send_json(request, "get trigger history").await?;
        Ok(resource.into())
    }

    async fn resubmit(
        &self,
        workflow: &WorkflowReference,
        trigger_name: &str,
        run_id: &str,
    ) -> ResubmitResult<()> {
        let url = self.workflow_url(
            workflow,
            &format!("/triggers/{trigger_name}/histories/{run_id}/resubmit"),
        )?;
        let response = self.authorized(Method::POST, url).await?.send().await?;
        if response.status().is_success() {
            debug!(workflow = %workflow, run_id, "Resubmit accepted");
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn fetch_content(&self, uri: &str) -> ResubmitResult<Value> {
        let response = self
            .unauthenticated
            .get(uri)
            .timeout(self.config.management_timeout())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        response.json::<Value>().await.map_err(|e| {
            ResubmitError::Serialization(format!("Captured payload is not valid JSON: {e}"))
        })
    }

    async fn send_replay(&self, request: &ReplayRequest) -> ResubmitResult<u16> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| {
                ResubmitError::InvalidInput(format!("Invalid replay method '{}': {e}", request.method))
            })?;

        let mut builder = self
            .unauthenticated
            .request(method, &request.url)
            .timeout(self.config.replay_timeout());
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, request.content_type.as_str())
                .body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Classify a non-success response, honoring `Retry-After`
pub async fn error_from_response(response: Response) -> ResubmitError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_retry_after(value, Utc::now()));
    let body = response.text().await.unwrap_or_default();
    ResubmitError::from_http_response(status, retry_after, &body)
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP date
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    if let Ok(seconds) = value.parse::<f64>() {
        // Negative, non-finite and out-of-range values fall back to computed backoff
        return Duration::try_from_secs_f64(seconds).ok();
    }

    let when = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((when - now).to_std().unwrap_or(Duration::ZERO))
}
