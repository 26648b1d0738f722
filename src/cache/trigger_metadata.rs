//! # Trigger Metadata Cache
//!
//! Amortizes discovery calls across a batch. Per workflow it remembers the
//! trigger name, its classified type and its signed callback URL; per run it
//! remembers the signed link to the captured trigger payload.
//!
//! Every cached value is a deterministic function of its key, so concurrent
//! tasks racing to fill the same entry converge on the same value and
//! last-write-wins is harmless. Guards are never held across an await.
//!
//! Observing a different [`WorkflowReference`] than the previous call drops
//! everything cached for the old one.

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::WorkflowManagementApi;
use crate::error::{ResubmitError, ResubmitResult};
use crate::models::{
    CallbackUrl, InputsLinkEntry, RunIdentifier, TriggerMetadata, TriggerType, WorkflowReference,
};

/// Hit/miss counters; a miss is one remote discovery call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inputs_links: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counters {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct TriggerMetadataCache {
    api: Arc<dyn WorkflowManagementApi>,
    trigger_names: DashMap<WorkflowReference, String>,
    trigger_types: DashMap<WorkflowReference, TriggerType>,
    callback_urls: DashMap<(WorkflowReference, String), CallbackUrl>,
    inputs_links: DashMap<(WorkflowReference, RunIdentifier), String>,
    active_workflow: Mutex<Option<WorkflowReference>>,
    counters: Counters,
}

impl std::fmt::Debug for TriggerMetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerMetadataCache")
            .field("trigger_names", &self.trigger_names.len())
            .field("callback_urls", &self.callback_urls.len())
            .field("inputs_links", &self.inputs_links.len())
            .finish()
    }
}

impl TriggerMetadataCache {
    pub fn new(api: Arc<dyn WorkflowManagementApi>) -> Self {
        Self {
            api,
            trigger_names: DashMap::new(),
            trigger_types: DashMap::new(),
            callback_urls: DashMap::new(),
            inputs_links: DashMap::new(),
            active_workflow: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    /// Drop cached data when the caller switches to another workflow
    fn observe(&self, workflow: &WorkflowReference) {
        let mut active = self.active_workflow.lock();
        match active.as_ref() {
            Some(current) if current == workflow => {}
            Some(previous) => {
                debug!(from = %previous, to = %workflow, "Workflow switched, clearing trigger cache");
                self.clear_maps();
                *active = Some(workflow.clone());
            }
            None => *active = Some(workflow.clone()),
        }
    }

    /// Trigger name of the workflow, discovered from one run's detail record
    pub async fn resolve_trigger_name(
        &self,
        workflow: &WorkflowReference,
        sample_run_id: &str,
    ) -> ResubmitResult<String> {
        self.observe(workflow);
        if let Some(name) = self.trigger_names.get(workflow).map(|n| n.clone()) {
            self.counters.hit();
            return Ok(name);
        }

        self.counters.miss();
        let detail = self.api.get_run(workflow, sample_run_id).await?;
        let name = detail.trigger_name.ok_or_else(|| {
            ResubmitError::not_found(format!(
                "run {sample_run_id} of {workflow} does not name a trigger"
            ))
        })?;

        debug!(workflow = %workflow, trigger = %name, "Resolved trigger name");
        self.trigger_names.insert(workflow.clone(), name.clone());
        Ok(name)
    }

    /// Classified trigger type; only `Http` allows callback replay
    pub async fn resolve_trigger_type(
        &self,
        workflow: &WorkflowReference,
    ) -> ResubmitResult<TriggerType> {
        self.observe(workflow);
        if let Some(trigger_type) = self.trigger_types.get(workflow).map(|t| *t) {
            self.counters.hit();
            return Ok(trigger_type);
        }

        self.counters.miss();
        let triggers = self.api.list_triggers(workflow).await?;
        let known_name = self.trigger_names.get(workflow).map(|n| n.clone());
        let matched = known_name.and_then(|name| triggers.iter().find(|t| t.name == name));
        let definition = matched.or_else(|| triggers.first()).ok_or_else(|| {
            ResubmitError::not_found(format!("workflow {workflow} has no triggers"))
        })?;

        let trigger_type =
            TriggerType::classify(definition.trigger_type.as_deref(), &definition.name);
        // A first-trigger guess on a multi-trigger workflow is not cached
        let unambiguous = matched.is_some() || triggers.len() == 1;
        debug!(
            workflow = %workflow,
            trigger = %definition.name,
            trigger_type = %trigger_type,
            cached = unambiguous,
            "Classified trigger"
        );
        if unambiguous {
            self.trigger_types.insert(workflow.clone(), trigger_type);
        }
        Ok(trigger_type)
    }

    /// Signed callback URL of `trigger_name`, fetched once
    pub async fn resolve_callback_url(
        &self,
        workflow: &WorkflowReference,
        trigger_name: &str,
    ) -> ResubmitResult<CallbackUrl> {
        self.observe(workflow);
        let key = (workflow.clone(), trigger_name.to_string());
        if let Some(url) = self.callback_urls.get(&key).map(|u| u.clone()) {
            self.counters.hit();
            return Ok(url);
        }

        self.counters.miss();
        let url = self.api.list_callback_url(workflow, trigger_name).await?;
        self.callback_urls.insert(key, url.clone());
        Ok(url)
    }

    /// Payload link for one run, from the cache or a single history lookup
    pub async fn resolve_inputs_link(
        &self,
        workflow: &WorkflowReference,
        trigger_name: &str,
        run_id: &str,
    ) -> ResubmitResult<String> {
        self.observe(workflow);
        let key = (workflow.clone(), run_id.to_string());
        if let Some(uri) = self.inputs_links.get(&key).map(|u| u.clone()) {
            self.counters.hit();
            return Ok(uri);
        }

        self.counters.miss();
        let history = self
            .api
            .get_trigger_history(workflow, trigger_name, run_id)
            .await?;
        let uri = history.payload_link().map(str::to_string).ok_or_else(|| {
            ResubmitError::not_found(format!(
                "run {run_id} of {workflow} has no inputs or outputs link"
            ))
        })?;
        self.inputs_links.insert(key, uri.clone());
        Ok(uri)
    }

    /// Walk the trigger history once and cache payload links for `run_ids`.
    ///
    /// Resolves the trigger name and callback URL as a side effect. Stops as
    /// soon as every requested run is resolved or the listing ends. Returns
    /// how many of the requested runs now have a cached link. Fails with
    /// `Cancelled` once `cancel` fires; links cached so far are kept.
    pub async fn bulk_prefetch_inputs_links(
        &self,
        workflow: &WorkflowReference,
        run_ids: &[RunIdentifier],
        cancel: &CancellationToken,
    ) -> ResubmitResult<usize> {
        let Some(sample) = run_ids.first() else {
            return Ok(0);
        };

        let trigger_name =
            until_cancelled(cancel, self.resolve_trigger_name(workflow, sample)).await?;
        until_cancelled(cancel, self.resolve_callback_url(workflow, &trigger_name)).await?;

        let mut wanted: HashSet<&str> = run_ids
            .iter()
            .map(String::as_str)
            .filter(|id| {
                !self
                    .inputs_links
                    .contains_key(&(workflow.clone(), id.to_string()))
            })
            .collect();

        let mut next_link: Option<String> = None;
        let mut pages = 0usize;
        while !wanted.is_empty() {
            if cancel.is_cancelled() {
                debug!(workflow = %workflow, pages, "Prefetch cancelled between pages");
                return Err(ResubmitError::Cancelled);
            }
            let page = until_cancelled(
                cancel,
                self.api
                    .list_trigger_histories_page(workflow, &trigger_name, next_link.as_deref()),
            )
            .await?;
            pages += 1;

            for history in &page.items {
                let run_id = history.run_id();
                if !wanted.contains(run_id) {
                    continue;
                }
                if let Some(link) = history.payload_link() {
                    wanted.remove(run_id);
                    self.inputs_links
                        .insert((workflow.clone(), run_id.to_string()), link.to_string());
                }
            }

            match page.next_link {
                Some(link) => next_link = Some(link),
                None => break,
            }
        }

        let cached = run_ids
            .iter()
            .filter(|id| {
                self.inputs_links
                    .contains_key(&(workflow.clone(), (*id).clone()))
            })
            .count();

        info!(
            workflow = %workflow,
            requested = run_ids.len(),
            cached,
            pages,
            "Prefetched trigger inputs links"
        );
        Ok(cached)
    }

    /// Drop batch-scoped payload links; trigger metadata survives
    pub fn clear_inputs_links(&self) {
        self.inputs_links.clear();
    }

    /// Drop everything
    pub fn clear(&self) {
        self.clear_maps();
        *self.active_workflow.lock() = None;
    }

    fn clear_maps(&self) {
        self.trigger_names.clear();
        self.trigger_types.clear();
        self.callback_urls.clear();
        self.inputs_links.clear();
    }

    /// What is currently known about `workflow`, without remote calls
    pub fn metadata(&self, workflow: &WorkflowReference) -> TriggerMetadata {
        let trigger_name = self.trigger_names.get(workflow).map(|n| n.clone());
        let callback_url = trigger_name.as_ref().and_then(|name| {
            self.callback_urls
                .get(&(workflow.clone(), name.clone()))
                .map(|u| u.clone())
        });
        TriggerMetadata {
            trigger_name,
            trigger_type: self.trigger_types.get(workflow).map(|t| *t),
            callback_url,
        }
    }

    pub fn cached_inputs_link(
        &self,
        workflow: &WorkflowReference,
        run_id: &str,
    ) -> Option<InputsLinkEntry> {
        self.inputs_links
            .get(&(workflow.clone(), run_id.to_string()))
            .map(|uri| InputsLinkEntry {
                run_id: run_id.to_string(),
                uri: uri.clone(),
            })
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            inputs_links: self.inputs_links.len(),
        }
    }
}

/// Race a discovery call against the batch token
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = ResubmitResult<T>>,
) -> ResubmitResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ResubmitError::Cancelled),
        result = operation => result,
    }
}
