//! Callback replay: send the run's captured trigger payload to the trigger's
//! signed callback URL. The workflow records a brand new run, not a
//! resubmission of the old one.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::envelope::ReplayEnvelope;
use super::{ProtocolKind, ResubmissionProtocol};
use crate::cache::TriggerMetadataCache;
use crate::client::{ReplayRequest, WorkflowManagementApi};
use crate::error::ResubmitResult;
use crate::models::WorkflowReference;

#[derive(Clone)]
pub struct CallbackReplay {
    api: Arc<dyn WorkflowManagementApi>,
    cache: Arc<TriggerMetadataCache>,
}

impl CallbackReplay {
    pub fn new(api: Arc<dyn WorkflowManagementApi>, cache: Arc<TriggerMetadataCache>) -> Self {
        Self { api, cache }
    }

    /// Resolve everything a replay needs without sending it
    pub async fn build_request(
        &self,
        workflow: &WorkflowReference,
        run_id: &str,
    ) -> ResubmitResult<ReplayRequest> {
        let trigger_name = self.cache.resolve_trigger_name(workflow, run_id).await?;
        let callback = self
            .cache
            .resolve_callback_url(workflow, &trigger_name)
            .await?;
        let inputs_link = self
            .cache
            .resolve_inputs_link(workflow, &trigger_name, run_id)
            .await?;

        let envelope = self.api.fetch_content(&inputs_link).await?;
        ReplayEnvelope::parse(&envelope)?.into_request(&callback.value)
    }
}

#[async_trait]
impl ResubmissionProtocol for CallbackReplay {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::CallbackReplay
    }

    #[instrument(skip(self, workflow), fields(workflow = %workflow))]
    async fn execute(&self, workflow: &WorkflowReference, run_id: &str) -> ResubmitResult<()> {
        let request = self.build_request(workflow, run_id).await?;
        let status = self.api.send_replay(&request).await?;
        debug!(
            run_id,
            method = %request.method,
            content_type = %request.content_type,
            status,
            "Replayed trigger payload"
        );
        Ok(())
    }
}
