//! # Resilience Module
//!
//! Failure classification and the retry loop that wraps every resubmission.
//! The remote management API enforces a low request quota over a rolling
//! window; the backoff policies here are the only defense against exceeding
//! it, since batch scheduling bounds concurrency but does not meter requests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use resubmit_core::resilience::{RetryExecutor, RetryPolicy};
//! use resubmit_core::ResubmitError;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), ResubmitError> {
//! let executor = RetryExecutor::new(RetryPolicy::default());
//! let cancel = CancellationToken::new();
//!
//! let value = executor
//!     .execute_with_retry(
//!         || async { Ok::<_, ResubmitError>(42) },
//!         |notice| println!("retry #{} in {:?}", notice.attempt, notice.delay),
//!         &cancel,
//!     )
//!     .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod error_classifier;
pub mod retry_executor;

pub use error_classifier::{classify, exponential_delay, ErrorCategory, RetryDecision, RetryPolicy};
pub use retry_executor::{RetryExecutor, RetryNotice};
