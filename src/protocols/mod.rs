//! # Resubmission Protocols
//!
//! Two ways to re-run a past workflow run. [`StandardResubmit`] asks the
//! management API to resubmit the recorded trigger firing; the new run is
//! linked to the original. [`CallbackReplay`] re-sends the captured trigger
//! payload to the trigger's public callback URL, which starts an unrelated
//! new run. Callers must not treat the two outcomes as equivalent.
//!
//! Neither protocol retries; retries belong to the
//! [`crate::resilience::RetryExecutor`] wrapped around them.

pub mod callback_replay;
pub mod envelope;
pub mod standard;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::cache::TriggerMetadataCache;
use crate::client::WorkflowManagementApi;
use crate::error::ResubmitResult;
use crate::models::{BatchOptions, WorkflowReference};

pub use callback_replay::CallbackReplay;
pub use envelope::{join_relative_path, ReplayEnvelope};
pub use standard::StandardResubmit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    StandardResubmit,
    CallbackReplay,
}

impl ProtocolKind {
    pub fn for_options(options: &BatchOptions) -> Self {
        if options.use_callback_url {
            ProtocolKind::CallbackReplay
        } else {
            ProtocolKind::StandardResubmit
        }
    }

    /// Whether the remote side records the new run as a resubmission
    pub fn links_original_run(&self) -> bool {
        matches!(self, ProtocolKind::StandardResubmit)
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::StandardResubmit => f.write_str("standard_resubmit"),
            ProtocolKind::CallbackReplay => f.write_str("callback_replay"),
        }
    }
}

/// One attempt at re-running a single run
#[async_trait]
pub trait ResubmissionProtocol: Send + Sync {
    fn kind(&self) -> ProtocolKind;

    async fn execute(&self, workflow: &WorkflowReference, run_id: &str) -> ResubmitResult<()>;
}

/// Build the protocol selected by `kind`
pub fn protocol_for(
    kind: ProtocolKind,
    api: Arc<dyn WorkflowManagementApi>,
    cache: Arc<TriggerMetadataCache>,
) -> Arc<dyn ResubmissionProtocol> {
    match kind {
        ProtocolKind::StandardResubmit => Arc::new(StandardResubmit::new(api, cache)),
        ProtocolKind::CallbackReplay => Arc::new(CallbackReplay::new(api, cache)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_selection() {
        let standard = BatchOptions::default();
        assert_eq!(
            ProtocolKind::for_options(&standard),
            ProtocolKind::StandardResubmit
        );

        let replay = BatchOptions {
            sequential: true,
            use_callback_url: true,
        };
        assert_eq!(
            ProtocolKind::for_options(&replay),
            ProtocolKind::CallbackReplay
        );
        assert!(!ProtocolKind::CallbackReplay.links_original_run());
        assert_eq!(ProtocolKind::CallbackReplay.to_string(), "callback_replay");
    }
}
