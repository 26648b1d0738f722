//! Standard resubmit: ask the management API to re-run a recorded trigger
//! firing. The new run is linked to the original as a resubmission.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{ProtocolKind, ResubmissionProtocol};
use crate::cache::TriggerMetadataCache;
use crate::client::WorkflowManagementApi;
use crate::error::ResubmitResult;
use crate::models::WorkflowReference;

#[derive(Clone)]
pub struct StandardResubmit {
    api: Arc<dyn WorkflowManagementApi>,
    cache: Arc<TriggerMetadataCache>,
}

impl StandardResubmit {
    pub fn new(api: Arc<dyn WorkflowManagementApi>, cache: Arc<TriggerMetadataCache>) -> Self {
        Self { api, cache }
    }
}

#[async_trait]
impl ResubmissionProtocol for StandardResubmit {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::StandardResubmit
    }

    #[instrument(skip(self, workflow), fields(workflow = %workflow))]
    async fn execute(&self, workflow: &WorkflowReference, run_id: &str) -> ResubmitResult<()> {
        let trigger_name = self.cache.resolve_trigger_name(workflow, run_id).await?;
        self.api.resubmit(workflow, &trigger_name, run_id).await?;
        debug!(run_id, trigger = %trigger_name, "Resubmitted trigger history");
        Ok(())
    }
}
