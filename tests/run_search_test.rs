//! Run search pagination against an in-memory run listing.

mod common;

use common::*;
use futures::TryStreamExt;
use std::time::Duration;

use resubmit_core::discovery::{RunSearchPaginator, RunSearchQuery};
use resubmit_core::models::RunStatus;
use resubmit_core::ResubmitError;

fn window(from_minutes: i64, to_minutes: i64) -> RunSearchQuery {
    RunSearchQuery::new(
        base_time() + chrono::Duration::minutes(from_minutes),
        base_time() + chrono::Duration::minutes(to_minutes),
    )
}

#[tokio::test]
async fn test_only_runs_inside_window_are_yielded() {
    let api = MockWorkflowApi::new().with_run_pages(vec![vec![
        run_at("t+8", 8, RunStatus::Failed),
        run_at("t+2", 2, RunStatus::Failed),
        run_at("t-5", -5, RunStatus::Failed),
        run_at("t-10", -10, RunStatus::Failed),
    ]]);
    let paginator = RunSearchPaginator::new(api.arc(), Duration::ZERO);

    let runs = paginator.search(&workflow(), &window(0, 5)).await.unwrap();

    let names: Vec<&str> = runs.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["t+2"]);
}

#[tokio::test(start_paused = true)]
async fn test_older_run_stops_pagination() {
    let api = MockWorkflowApi::new().with_run_pages(vec![
        vec![run_at("a", 30, RunStatus::Failed), run_at("b", 20, RunStatus::Succeeded)],
        vec![run_at("c", 10, RunStatus::Failed), run_at("d", -1, RunStatus::Failed)],
        vec![run_at("e", -20, RunStatus::Failed)],
    ]);
    let paginator = RunSearchPaginator::new(api.arc(), Duration::from_millis(300));

    let runs = paginator.search(&workflow(), &window(0, 60)).await.unwrap();

    let names: Vec<&str> = runs.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(api.calls().list_runs_pages, 2);
}

#[tokio::test(start_paused = true)]
async fn test_status_filter_and_chronological_order() {
    let api = MockWorkflowApi::new().with_run_pages(vec![
        vec![run_at("late", 40, RunStatus::Failed), run_at("ok", 35, RunStatus::Succeeded)],
        vec![run_at("early", 5, RunStatus::Failed), run_at("running", 1, RunStatus::Running)],
    ]);
    let paginator = RunSearchPaginator::new(api.arc(), Duration::from_millis(300));
    let query = window(0, 60).with_statuses([RunStatus::Failed]);

    let newest_first = paginator.search(&workflow(), &query).await.unwrap();
    assert_eq!(
        newest_first.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["late", "early"]
    );

    let oldest_first = paginator
        .search_chronological(&workflow(), &query)
        .await
        .unwrap();
    assert_eq!(
        oldest_first.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["early", "late"]
    );

    assert_eq!(paginator.count(&workflow(), &query).await.unwrap(), 2);
}

#[tokio::test]
async fn test_stream_is_restartable() {
    let api = MockWorkflowApi::new().with_run_pages(vec![vec![
        run_at("a", 3, RunStatus::Failed),
        run_at("b", 2, RunStatus::Failed),
    ]]);
    let paginator = RunSearchPaginator::new(api.arc(), Duration::ZERO);
    let query = window(0, 5);
    let reference = workflow();

    let first: Vec<_> = paginator
        .stream(&reference, &query)
        .try_collect()
        .await
        .unwrap();
    let second: Vec<_> = paginator
        .stream(&reference, &query)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(api.calls().list_runs_pages, 2);
}

#[tokio::test]
async fn test_listing_failure_propagates_without_retry() {
    let api = MockWorkflowApi::new().fail_listing(throttled());
    let paginator = RunSearchPaginator::new(api.arc(), Duration::ZERO);

    let result = paginator.search(&workflow(), &window(0, 5)).await;

    assert!(matches!(result, Err(ResubmitError::RateLimited { .. })));
    assert_eq!(api.calls().list_runs_pages, 1);
}

#[tokio::test]
async fn test_inverted_window_is_rejected() {
    let api = MockWorkflowApi::new();
    let paginator = RunSearchPaginator::new(api.arc(), Duration::ZERO);

    let result = paginator.search(&workflow(), &window(5, 0)).await;

    assert!(matches!(result, Err(ResubmitError::InvalidInput(_))));
    assert_eq!(api.calls().list_runs_pages, 0);
}
