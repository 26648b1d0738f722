//! Trigger classification and the metadata cached per workflow.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a workflow's runs are started
///
/// Only [`TriggerType::Http`] triggers expose a callback URL, so only they
/// can be driven by callback replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Http,
    Recurrence,
    Other,
    Unknown,
}

impl TriggerType {
    /// Classify from the explicit type field, falling back to the trigger name
    pub fn classify(explicit_type: Option<&str>, trigger_name: &str) -> Self {
        match explicit_type.map(str::trim).filter(|t| !t.is_empty()) {
            Some(explicit) => Self::from_explicit_type(explicit),
            None => Self::from_name(trigger_name),
        }
    }

    fn from_explicit_type(explicit: &str) -> Self {
        match explicit.to_ascii_lowercase().as_str() {
            "request" | "http" | "httpwebhook" | "manual" => TriggerType::Http,
            "recurrence" | "schedule" | "slidingwindow" => TriggerType::Recurrence,
            _ => TriggerType::Other,
        }
    }

    fn from_name(trigger_name: &str) -> Self {
        let name = trigger_name.to_ascii_lowercase();
        if ["request", "http", "manual"]
            .iter()
            .any(|hint| name.contains(hint))
        {
            TriggerType::Http
        } else if ["recurrence", "schedule"]
            .iter()
            .any(|hint| name.contains(hint))
        {
            TriggerType::Recurrence
        } else {
            TriggerType::Unknown
        }
    }

    pub fn supports_callback_replay(&self) -> bool {
        matches!(self, TriggerType::Http)
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TriggerType::Http => "http",
            TriggerType::Recurrence => "recurrence",
            TriggerType::Other => "other",
            TriggerType::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Signed public URL of a trigger; carries its own query authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackUrl {
    pub value: String,
    pub method: Option<String>,
}

/// Snapshot of what the cache currently knows about one workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriggerMetadata {
    pub trigger_name: Option<String>,
    pub trigger_type: Option<TriggerType>,
    pub callback_url: Option<CallbackUrl>,
}

/// Signed link to the payload originally captured for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputsLinkEntry {
    pub run_id: String,
    pub uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_type_wins_over_name() {
        assert_eq!(
            TriggerType::classify(Some("Request"), "nightly_schedule"),
            TriggerType::Http
        );
        assert_eq!(
            TriggerType::classify(Some("Recurrence"), "manual"),
            TriggerType::Recurrence
        );
        assert_eq!(
            TriggerType::classify(Some("ApiConnection"), "manual"),
            TriggerType::Other
        );
    }

    #[test]
    fn test_name_heuristic() {
        assert_eq!(TriggerType::classify(None, "manual"), TriggerType::Http);
        assert_eq!(
            TriggerType::classify(Some(""), "When_a_HTTP_request_is_received"),
            TriggerType::Http
        );
        assert_eq!(
            TriggerType::classify(None, "Recurrence"),
            TriggerType::Recurrence
        );
        assert_eq!(
            TriggerType::classify(None, "daily_schedule"),
            TriggerType::Recurrence
        );
        assert_eq!(
            TriggerType::classify(None, "When_a_blob_is_added"),
            TriggerType::Unknown
        );
    }

    #[test]
    fn test_only_http_supports_replay() {
        assert!(TriggerType::Http.supports_callback_replay());
        assert!(!TriggerType::Recurrence.supports_callback_replay());
        assert!(!TriggerType::Unknown.supports_callback_replay());
    }
}
