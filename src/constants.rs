//! # System Constants
//!
//! Operational boundaries of the resubmission engine: remote API coordinates,
//! timeouts, retry bases and caps, and scheduling widths. Configuration
//! defaults in [`crate::config`] are derived from these values.

/// Remote management API coordinates
pub mod api {
    /// Management endpoint root
    pub const MANAGEMENT_BASE_URL: &str = "https://management.azure.com";

    /// api-version understood by the workflow host runtime
    pub const API_VERSION: &str = "2018-11-01";

    /// OAuth scope requested from the token provider
    pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

    /// Host runtime segment between the site and the workflow name
    pub const WORKFLOW_RUNTIME_PATH: &str =
        "hostruntime/runtime/webhooks/workflow/api/management/workflows";

    pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
}

/// Network timeouts
pub mod timeouts {
    /// Management API calls and the signed payload fetch
    pub const MANAGEMENT_TIMEOUT_SECS: u64 = 30;

    /// Outbound replay request; target workflows may be slow to accept
    pub const REPLAY_TIMEOUT_SECS: u64 = 120;
}

/// Backoff policy per classification
pub mod retry {
    pub const BASE_DELAY_MS: u64 = 1_000;

    /// RateLimited cap (5 minutes); attempts are unbounded
    pub const RATE_LIMIT_MAX_DELAY_MS: u64 = 300_000;

    pub const PERMANENT_MAX_DELAY_MS: u64 = 10_000;
    pub const PERMANENT_MAX_ATTEMPTS: u32 = 5;

    pub const TRANSIENT_MAX_DELAY_MS: u64 = 60_000;
    pub const TRANSIENT_MAX_ATTEMPTS: u32 = 5;

    /// Lower-cased fragments that mark an error as a throttle
    pub const THROTTLING_INDICATORS: &[&str] = &[
        "throttl",
        "too many requests",
        "rate limit",
        "ratelimit",
    ];
}

/// Batch scheduling
pub mod batch {
    /// Runs started together in concurrent mode
    pub const CONCURRENT_BATCH_WIDTH: usize = 10;
}

/// Run search pagination
pub mod search {
    pub const PAGE_DELAY_MS: u64 = 300;
}
