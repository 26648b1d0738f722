//! # Resubmission Configuration
//!
//! Typed settings for the remote API client, retry policy, batch scheduling
//! and run search. Defaults mirror [`crate::constants`]; files and
//! `RESUBMIT__*` environment variables override them (see [`loader`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use resubmit_core::config::ResubmitConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ResubmitConfig::load(Some("config/resubmit.yaml"))?;
//! println!("batch width: {}", config.batch.concurrent_batch_width);
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{api, batch, retry, search, timeouts};
use crate::error::{ResubmitError, ResubmitResult};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResubmitConfig {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub batch: BatchConfig,
    pub search: SearchConfig,
}

/// Remote management API settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_version: String,
    pub scope: String,
    pub management_timeout_secs: u64,
    pub replay_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: api::MANAGEMENT_BASE_URL.to_string(),
            api_version: api::API_VERSION.to_string(),
            scope: api::MANAGEMENT_SCOPE.to_string(),
            management_timeout_secs: timeouts::MANAGEMENT_TIMEOUT_SECS,
            replay_timeout_secs: timeouts::REPLAY_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    pub fn management_timeout(&self) -> Duration {
        Duration::from_secs(self.management_timeout_secs)
    }

    pub fn replay_timeout(&self) -> Duration {
        Duration::from_secs(self.replay_timeout_secs)
    }
}

/// Backoff settings per error category
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub rate_limit_max_delay_ms: u64,
    pub permanent_max_delay_ms: u64,
    pub permanent_max_attempts: u32,
    pub transient_max_delay_ms: u64,
    /// `None` retries transient failures until cancelled
    pub transient_max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: retry::BASE_DELAY_MS,
            rate_limit_max_delay_ms: retry::RATE_LIMIT_MAX_DELAY_MS,
            permanent_max_delay_ms: retry::PERMANENT_MAX_DELAY_MS,
            permanent_max_attempts: retry::PERMANENT_MAX_ATTEMPTS,
            transient_max_delay_ms: retry::TRANSIENT_MAX_DELAY_MS,
            transient_max_attempts: Some(retry::TRANSIENT_MAX_ATTEMPTS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    pub concurrent_batch_width: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrent_batch_width: batch::CONCURRENT_BATCH_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub page_delay_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: search::PAGE_DELAY_MS,
        }
    }
}

impl SearchConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl ResubmitConfig {
    /// Reject settings that would stall or disable the engine
    pub fn validate(&self) -> ResubmitResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ResubmitError::configuration("api.base_url must not be empty"));
        }
        if self.api.management_timeout_secs == 0 || self.api.replay_timeout_secs == 0 {
            return Err(ResubmitError::configuration(
                "api timeouts must be greater than 0",
            ));
        }
        if self.batch.concurrent_batch_width == 0 {
            return Err(ResubmitError::configuration(
                "batch.concurrent_batch_width must be greater than 0",
            ));
        }
        if self.retry.permanent_max_attempts == 0 {
            return Err(ResubmitError::configuration(
                "retry.permanent_max_attempts must be greater than 0",
            ));
        }
        if self.retry.transient_max_attempts == Some(0) {
            return Err(ResubmitError::configuration(
                "retry.transient_max_attempts must be greater than 0 when set",
            ));
        }

        let caps = [
            ("rate_limit_max_delay_ms", self.retry.rate_limit_max_delay_ms),
            ("permanent_max_delay_ms", self.retry.permanent_max_delay_ms),
            ("transient_max_delay_ms", self.retry.transient_max_delay_ms),
        ];
        for (name, cap) in caps {
            if cap < self.retry.base_delay_ms {
                return Err(ResubmitError::configuration(format!(
                    "retry.{name} ({cap}) must not be below retry.base_delay_ms ({})",
                    self.retry.base_delay_ms
                )));
            }
        }
        Ok(())
    }
}
