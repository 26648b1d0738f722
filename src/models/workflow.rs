//! Workflow identity and run records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::api::WORKFLOW_RUNTIME_PATH;
use crate::error::{ResubmitError, ResubmitResult};

/// Opaque run identifier, unique within one workflow
pub type RunIdentifier = String;

/// Immutable coordinates of the target workflow
///
/// Used as the root of every trigger-cache key, so two references compare
/// equal only when all four parts match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowReference {
    pub subscription_id: String,
    pub resource_group: String,
    pub app_name: String,
    pub workflow_name: String,
}

impl WorkflowReference {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        app_name: impl Into<String>,
        workflow_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            app_name: app_name.into(),
            workflow_name: workflow_name.into(),
        }
    }

    /// Reject references with blank parts before any remote call is made
    pub fn validate(&self) -> ResubmitResult<()> {
        let parts = [
            ("subscription_id", &self.subscription_id),
            ("resource_group", &self.resource_group),
            ("app_name", &self.app_name),
            ("workflow_name", &self.workflow_name),
        ];

        for (field, value) in parts {
            if value.trim().is_empty() {
                return Err(ResubmitError::InvalidInput(format!(
                    "workflow reference field '{field}' must not be empty"
                )));
            }
            if value.contains('/') {
                return Err(ResubmitError::InvalidInput(format!(
                    "workflow reference field '{field}' must not contain '/'"
                )));
            }
        }
        Ok(())
    }

    /// Management path of the workflow, relative to the API root
    pub fn management_path(&self) -> String {
        format!(
            "subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/sites/{}/{}/{}",
            self.subscription_id,
            self.resource_group,
            self.app_name,
            WORKFLOW_RUNTIME_PATH,
            self.workflow_name
        )
    }
}

impl fmt::Display for WorkflowReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.workflow_name)
    }
}

/// Terminal or in-progress state of a run as reported by the remote listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    Succeeded,
    Failed,
    Cancelled,
    Running,
    Waiting,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "Succeeded",
            RunStatus::Failed => "Failed",
            RunStatus::Cancelled => "Cancelled",
            RunStatus::Running => "Running",
            RunStatus::Waiting => "Waiting",
            RunStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = ResubmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "succeeded" => Ok(RunStatus::Succeeded),
            "failed" => Ok(RunStatus::Failed),
            "cancelled" | "canceled" => Ok(RunStatus::Cancelled),
            "running" => Ok(RunStatus::Running),
            "waiting" => Ok(RunStatus::Waiting),
            "unknown" => Ok(RunStatus::Unknown),
            other => Err(ResubmitError::InvalidInput(format!(
                "unknown run status '{other}'"
            ))),
        }
    }
}

/// One run returned by the run search; read-only downstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: String,
    pub name: RunIdentifier,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}
