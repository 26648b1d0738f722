//! Layered configuration loading from files and environment overrides.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use resubmit_core::{ResubmitConfig, ResubmitError};

fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_yaml_file_overrides_defaults() {
    let file = yaml_file(
        r#"
api:
  base_url: "https://management.example.com"
  replay_timeout_secs: 45
batch:
  concurrent_batch_width: 3
retry:
  permanent_max_attempts: 2
"#,
    );

    let config =
        ResubmitConfig::load_from_sources(file.path().to_str(), Some(HashMap::new())).unwrap();

    assert_eq!(config.api.base_url, "https://management.example.com");
    assert_eq!(config.api.replay_timeout(), Duration::from_secs(45));
    assert_eq!(config.api.management_timeout(), Duration::from_secs(30));
    assert_eq!(config.batch.concurrent_batch_width, 3);
    assert_eq!(config.retry.permanent_max_attempts, 2);
    assert_eq!(config.retry.base_delay_ms, 1_000);
}

#[test]
fn test_environment_wins_over_file() {
    let file = yaml_file("search:\n  page_delay_ms: 100\n");
    let env = HashMap::from([(
        "RESUBMIT__SEARCH__PAGE_DELAY_MS".to_string(),
        "750".to_string(),
    )]);

    let config = ResubmitConfig::load_from_sources(file.path().to_str(), Some(env)).unwrap();

    assert_eq!(config.search.page_delay(), Duration::from_millis(750));
}

#[test]
fn test_invalid_file_values_are_rejected() {
    let file = yaml_file("batch:\n  concurrent_batch_width: 0\n");

    let result = ResubmitConfig::load_from_sources(file.path().to_str(), Some(HashMap::new()));

    assert!(matches!(result, Err(ResubmitError::Configuration(_))));
}

#[test]
fn test_environment_specific_overlay() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(
        dir.path().join("resubmit.yaml"),
        "batch:\n  concurrent_batch_width: 6\nsearch:\n  page_delay_ms: 200\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("resubmit.production.yaml"),
        "batch:\n  concurrent_batch_width: 2\n",
    )
    .unwrap();

    let production = ResubmitConfig::load_for_environment(dir.path(), "production").unwrap();
    assert_eq!(production.batch.concurrent_batch_width, 2);
    assert_eq!(production.search.page_delay_ms, 200);

    let staging = ResubmitConfig::load_for_environment(dir.path(), "staging").unwrap();
    assert_eq!(staging.batch.concurrent_batch_width, 6);
}
