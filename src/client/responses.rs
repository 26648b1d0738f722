//! Wire shapes of the management API responses and their conversion into
//! the crate's domain types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::traits::{Page, RunDetail, TriggerDefinition, TriggerHistory};
use crate::models::{CallbackUrl, RunStatus, WorkflowRun};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    pub next_link: Option<String>,
}

impl<T> ListResponse<T> {
    pub fn into_page<U>(self, convert: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.value.into_iter().map(convert).collect(),
            next_link: self.next_link.filter(|link| !link.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NamedReference {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentLink {
    pub uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunResource {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub properties: RunProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProperties {
    #[serde(default = "unknown_status")]
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub trigger: Option<NamedReference>,
}

fn unknown_status() -> RunStatus {
    RunStatus::Unknown
}

impl RunResource {
    pub fn into_run(self) -> WorkflowRun {
        WorkflowRun {
            id: self.id,
            name: self.name,
            status: self.properties.status,
            start_time: self.properties.start_time,
            end_time: self.properties.end_time,
        }
    }

    pub fn into_detail(self) -> RunDetail {
        let trigger_name = self
            .properties
            .trigger
            .as_ref()
            .and_then(|t| t.name.clone())
            .filter(|name| !name.is_empty());
        RunDetail {
            run: self.into_run(),
            trigger_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TriggerResource {
    pub name: String,
    pub kind: Option<String>,
    pub properties: Option<TriggerProperties>,
}

#[derive(Debug, Deserialize)]
pub struct TriggerProperties {
    #[serde(rename = "type")]
    pub trigger_type: Option<String>,
    pub kind: Option<String>,
}

impl From<TriggerResource> for TriggerDefinition {
    fn from(resource: TriggerResource) -> Self {
        let properties = resource.properties.as_ref();
        let trigger_type = properties
            .and_then(|p| p.trigger_type.clone())
            .or_else(|| properties.and_then(|p| p.kind.clone()))
            .or(resource.kind);
        TriggerDefinition {
            name: resource.name,
            trigger_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackUrlResponse {
    pub value: Option<String>,
    pub method: Option<String>,
}

impl CallbackUrlResponse {
    pub fn into_callback_url(self) -> Option<CallbackUrl> {
        let value = self.value.filter(|v| !v.is_empty())?;
        Some(CallbackUrl {
            value,
            method: self.method,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct TriggerHistoryResource {
    pub name: String,
    pub properties: Option<TriggerHistoryProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerHistoryProperties {
    pub inputs_link: Option<ContentLink>,
    pub outputs_link: Option<ContentLink>,
    pub run: Option<NamedReference>,
}

impl From<TriggerHistoryResource> for TriggerHistory {
    fn from(resource: TriggerHistoryResource) -> Self {
        let properties = resource.properties;
        let link = |l: Option<ContentLink>| l.and_then(|l| l.uri).filter(|u| !u.is_empty());
        let (inputs_link, outputs_link, run_name) = match properties {
            Some(p) => (
                link(p.inputs_link),
                link(p.outputs_link),
                p.run.and_then(|r| r.name),
            ),
            None => (None, None, None),
        };
        TriggerHistory {
            name: resource.name,
            run_name,
            inputs_link,
            outputs_link,
        }
    }
}
