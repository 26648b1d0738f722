//! # Error Taxonomy
//!
//! Every failure the resubmission engine can observe is expressed as one
//! [`ResubmitError`] variant. The variant is the classification: retry
//! decisions never inspect ad hoc fields on a loosely typed error.

use std::time::Duration;
use thiserror::Error;

use crate::constants::retry::THROTTLING_INDICATORS;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResubmitError {
    /// No bearer credential could be obtained for an authenticated call
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// A trigger, callback URL or inputs link does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote API throttled the request
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// A client error (4xx) that is not a throttle
    #[error("Permanent failure: {message}")]
    Permanent { status: u16, message: String },

    /// Server errors, network failures and timeouts
    #[error("Transient failure: {message}")]
    Transient {
        status: Option<u16>,
        message: String,
    },

    /// The batch cancellation signal was observed
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type ResubmitResult<T> = Result<T, ResubmitError>;

impl ResubmitError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            status: None,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Build an error from a non-success HTTP response.
    ///
    /// 429 and any body carrying a throttling indicator become `RateLimited`,
    /// remaining 4xx become `Permanent`, everything else is `Transient`.
    pub fn from_http_response(status: u16, retry_after: Option<Duration>, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {}", body.trim())
        };

        if status == 429 || contains_throttling_indicator(body) {
            Self::RateLimited {
                message,
                retry_after,
            }
        } else if (400..500).contains(&status) {
            Self::Permanent { status, message }
        } else {
            Self::Transient {
                status: Some(status),
                message,
            }
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Permanent { status, .. } => Some(*status),
            Self::Transient { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Case-insensitive check for the phrases throttled responses carry
pub fn contains_throttling_indicator(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    THROTTLING_INDICATORS
        .iter()
        .any(|indicator| lowered.contains(indicator))
}

impl From<reqwest::Error> for ResubmitError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return Self::from_http_response(status.as_u16(), None, &error.to_string());
        }
        if error.is_decode() {
            return Self::Serialization(error.to_string());
        }
        // Timeouts, connect failures and body errors are all worth another attempt
        Self::Transient {
            status: None,
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for ResubmitError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization error: {error}"))
    }
}

impl From<config::ConfigError> for ResubmitError {
    fn from(error: config::ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}
