//! # Error Classification
//!
//! Maps a [`ResubmitError`] to the backoff policy that governs it.
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ ResubmitError   │────▶│ RetryPolicy     │────▶│ RetryDecision   │
//! │ + attempt       │     │ (per category)  │     │ retry / give up │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! | Category    | Attempts            | Delay                                   |
//! |-------------|---------------------|-----------------------------------------|
//! | RateLimited | unbounded           | `Retry-After`, else 1s×2^(n−1) ≤ 5 min  |
//! | Permanent   | 5                   | 1s×2^(n−1) ≤ 10s                        |
//! | Transient   | 5 (configurable)    | 1s×2^(n−1) ≤ 60s                        |
//! | Fatal       | 1                   | none                                    |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{contains_throttling_indicator, ResubmitError};

/// Backoff family an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Throttled by the remote API - retry for as long as it takes
    RateLimited,
    /// Client error - a few attempts, then give up
    Permanent,
    /// Server, network or timeout failure
    Transient,
    /// Never worth another attempt (missing trigger, no credential, bad input)
    Fatal,
    /// Cancellation observed - short-circuits every policy
    Cancelled,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::RateLimited => write!(f, "Rate Limited"),
            ErrorCategory::Permanent => write!(f, "Permanent"),
            ErrorCategory::Transient => write!(f, "Transient"),
            ErrorCategory::Fatal => write!(f, "Fatal"),
            ErrorCategory::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Classify an error; throttling text wins over the carried status
pub fn classify(error: &ResubmitError) -> ErrorCategory {
    match error {
        ResubmitError::Cancelled => ErrorCategory::Cancelled,
        ResubmitError::RateLimited { .. } => ErrorCategory::RateLimited,
        ResubmitError::Permanent { message, .. } => {
            if contains_throttling_indicator(message) {
                ErrorCategory::RateLimited
            } else {
                ErrorCategory::Permanent
            }
        }
        ResubmitError::Transient { message, .. } => {
            if contains_throttling_indicator(message) {
                ErrorCategory::RateLimited
            } else {
                ErrorCategory::Transient
            }
        }
        ResubmitError::NotAuthenticated(_)
        | ResubmitError::NotFound(_)
        | ResubmitError::Configuration(_)
        | ResubmitError::InvalidInput(_)
        | ResubmitError::Serialization(_) => ErrorCategory::Fatal,
    }
}

/// What the executor should do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry {
        category: ErrorCategory,
        delay: Duration,
    },
    GiveUp {
        category: ErrorCategory,
    },
}

/// Per-category retry limits and delays
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Decide what follows failed attempt number `attempt` (1-based)
    pub fn decide(&self, error: &ResubmitError, attempt: u32) -> RetryDecision {
        let category = classify(error);
        let base = Duration::from_millis(self.config.base_delay_ms);

        match category {
            ErrorCategory::RateLimited => {
                let server_hint = match error {
                    ResubmitError::RateLimited { retry_after, .. } => *retry_after,
                    _ => None,
                };
                let delay = server_hint.unwrap_or_else(|| {
                    exponential_delay(
                        base,
                        attempt,
                        Duration::from_millis(self.config.rate_limit_max_delay_ms),
                    )
                });
                RetryDecision::Retry { category, delay }
            }
            ErrorCategory::Permanent => {
                if attempt >= self.config.permanent_max_attempts {
                    RetryDecision::GiveUp { category }
                } else {
                    RetryDecision::Retry {
                        category,
                        delay: exponential_delay(
                            base,
                            attempt,
                            Duration::from_millis(self.config.permanent_max_delay_ms),
                        ),
                    }
                }
            }
            ErrorCategory::Transient => match self.config.transient_max_attempts {
                Some(limit) if attempt >= limit => RetryDecision::GiveUp { category },
                _ => RetryDecision::Retry {
                    category,
                    delay: exponential_delay(
                        base,
                        attempt,
                        Duration::from_millis(self.config.transient_max_delay_ms),
                    ),
                },
            },
            ErrorCategory::Fatal | ErrorCategory::Cancelled => RetryDecision::GiveUp { category },
        }
    }
}

/// `base × 2^(attempt−1)`, saturating, capped at `cap`
pub fn exponential_delay(base: Duration, attempt: u32, cap: Duration) -> Duration {
    let factor = 2u64
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    let millis = (base.as_millis() as u64).saturating_mul(factor);
    Duration::from_millis(millis).min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permanent(status: u16) -> ResubmitError {
        ResubmitError::Permanent {
            status,
            message: format!("HTTP {status}"),
        }
    }

    #[test]
    fn test_exponential_delay_growth_and_cap() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(10);
        assert_eq!(exponential_delay(base, 1, cap), Duration::from_secs(1));
        assert_eq!(exponential_delay(base, 2, cap), Duration::from_secs(2));
        assert_eq!(exponential_delay(base, 4, cap), Duration::from_secs(8));
        assert_eq!(exponential_delay(base, 5, cap), cap);
        assert_eq!(exponential_delay(base, 200, cap), cap);
    }

    #[test]
    fn test_retry_after_preferred_over_backoff() {
        let policy = RetryPolicy::default();
        let error = ResubmitError::RateLimited {
            message: "HTTP 429".to_string(),
            retry_after: Some(Duration::from_secs(3)),
        };

        assert_eq!(
            policy.decide(&error, 7),
            RetryDecision::Retry {
                category: ErrorCategory::RateLimited,
                delay: Duration::from_millis(3000),
            }
        );
    }

    #[test]
    fn test_rate_limit_is_unbounded_and_capped_at_five_minutes() {
        let policy = RetryPolicy::default();
        let error = ResubmitError::RateLimited {
            message: "HTTP 429".to_string(),
            retry_after: None,
        };

        match policy.decide(&error, 1_000) {
            RetryDecision::Retry { delay, .. } => assert_eq!(delay, Duration::from_secs(300)),
            other => panic!("Expected retry, got {other:?}"),
        }
    }

    #[test]
    fn test_permanent_gives_up_on_fifth_attempt() {
        let policy = RetryPolicy::default();
        let error = permanent(404);

        for attempt in 1..5 {
            assert!(matches!(
                policy.decide(&error, attempt),
                RetryDecision::Retry {
                    category: ErrorCategory::Permanent,
                    ..
                }
            ));
        }
        assert_eq!(
            policy.decide(&error, 5),
            RetryDecision::GiveUp {
                category: ErrorCategory::Permanent
            }
        );
    }

    #[test]
    fn test_transient_limit_is_configurable() {
        let error = ResubmitError::transient("connection reset");

        let bounded = RetryPolicy::default();
        assert!(matches!(
            bounded.decide(&error, 5),
            RetryDecision::GiveUp { .. }
        ));

        let unbounded = RetryPolicy::new(RetryConfig {
            transient_max_attempts: None,
            ..RetryConfig::default()
        });
        match unbounded.decide(&error, 50) {
            RetryDecision::Retry { delay, .. } => assert_eq!(delay, Duration::from_secs(60)),
            other => panic!("Expected retry, got {other:?}"),
        }
    }

    #[test]
    fn test_throttle_text_reclassifies() {
        let error = ResubmitError::Permanent {
            status: 400,
            message: "Request was throttled".to_string(),
        };
        assert_eq!(classify(&error), ErrorCategory::RateLimited);
    }

    #[test]
    fn test_fatal_and_cancelled_never_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.decide(&ResubmitError::not_found("inputs link"), 1),
            RetryDecision::GiveUp {
                category: ErrorCategory::Fatal
            }
        );
        assert_eq!(
            policy.decide(&ResubmitError::Cancelled, 1),
            RetryDecision::GiveUp {
                category: ErrorCategory::Cancelled
            }
        );
    }
}
