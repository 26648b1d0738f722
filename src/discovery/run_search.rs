//! # Run Search Paginator
//!
//! Walks the remote run listing (newest first) and yields the runs whose
//! start time falls inside a window and whose status matches a filter.
//! The first run older than the window ends pagination: no further pages
//! are requested. Remote failures propagate immediately; discovery is not
//! retried.

use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::client::WorkflowManagementApi;
use crate::error::{ResubmitError, ResubmitResult};
use crate::models::{RunStatus, WorkflowReference, WorkflowRun};

/// Inclusive start-time window plus an optional status filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSearchQuery {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Empty means every status
    pub statuses: HashSet<RunStatus>,
}

impl RunSearchQuery {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
            statuses: HashSet::new(),
        }
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = RunStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn validate(&self) -> ResubmitResult<()> {
        if self.start_time > self.end_time {
            return Err(ResubmitError::InvalidInput(format!(
                "search window start {} is after end {}",
                self.start_time, self.end_time
            )));
        }
        Ok(())
    }

    fn matches_status(&self, status: RunStatus) -> bool {
        self.statuses.is_empty() || self.statuses.contains(&status)
    }
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

#[derive(Clone)]
pub struct RunSearchPaginator {
    api: Arc<dyn WorkflowManagementApi>,
    page_delay: Duration,
}

impl RunSearchPaginator {
    pub fn new(api: Arc<dyn WorkflowManagementApi>, page_delay: Duration) -> Self {
        Self { api, page_delay }
    }

    /// Lazily stream matching runs; each call starts a fresh listing
    pub fn stream<'a>(
        &'a self,
        workflow: &'a WorkflowReference,
        query: &'a RunSearchQuery,
    ) -> impl Stream<Item = ResubmitResult<WorkflowRun>> + Send + 'a {
        stream::try_unfold(Cursor::Start, move |cursor| {
            self.fetch_page(workflow, query, cursor)
        })
        .map_ok(|runs| stream::iter(runs.into_iter().map(Ok::<_, ResubmitError>)))
        .try_flatten()
    }

    async fn fetch_page(
        &self,
        workflow: &WorkflowReference,
        query: &RunSearchQuery,
        cursor: Cursor,
    ) -> ResubmitResult<Option<(Vec<WorkflowRun>, Cursor)>> {
        let next_link = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(link) => {
                tokio::time::sleep(self.page_delay).await;
                Some(link)
            }
        };

        let page = self
            .api
            .list_runs_page(workflow, next_link.as_deref())
            .await?;

        let mut reached_older_runs = false;
        let mut matched = Vec::new();
        for run in page.items {
            if run.start_time < query.start_time {
                reached_older_runs = true;
                break;
            }
            if run.start_time <= query.end_time && query.matches_status(run.status) {
                matched.push(run);
            }
        }

        debug!(
            workflow = %workflow,
            matched = matched.len(),
            reached_older_runs,
            has_next = page.next_link.is_some(),
            "Fetched run page"
        );

        let next = match page.next_link {
            Some(link) if !reached_older_runs => Cursor::Next(link),
            _ => Cursor::Done,
        };
        Ok(Some((matched, next)))
    }

    /// Collect all matching runs, newest first
    pub async fn search(
        &self,
        workflow: &WorkflowReference,
        query: &RunSearchQuery,
    ) -> ResubmitResult<Vec<WorkflowRun>> {
        query.validate()?;
        self.stream(workflow, query).try_collect().await
    }

    /// Collect matching runs oldest first, the order sequential replay needs
    pub async fn search_chronological(
        &self,
        workflow: &WorkflowReference,
        query: &RunSearchQuery,
    ) -> ResubmitResult<Vec<WorkflowRun>> {
        let mut runs = self.search(workflow, query).await?;
        runs.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.name.cmp(&b.name)));
        Ok(runs)
    }

    /// Count matches without keeping them
    pub async fn count(
        &self,
        workflow: &WorkflowReference,
        query: &RunSearchQuery,
    ) -> ResubmitResult<usize> {
        query.validate()?;
        self.stream(workflow, query)
            .try_fold(0usize, |count, _| async move { Ok(count + 1) })
            .await
    }
}
