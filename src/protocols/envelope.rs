//! # Trigger Input Envelope
//!
//! The captured trigger payload of an HTTP-triggered run is a JSON envelope:
//!
//! ```json
//! {
//!   "method": "POST",
//!   "relativePath": "orders/42",
//!   "headers": { "Content-Type": "application/xml" },
//!   "body": { "$content": "<a/>", "$content-type": "application/xml" }
//! }
//! ```
//!
//! [`ReplayEnvelope::parse`] extracts the parts a replay needs and
//! [`ReplayEnvelope::into_request`] turns them into a [`ReplayRequest`]
//! aimed at a signed callback URL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Url;
use serde_json::Value;

use crate::client::ReplayRequest;
use crate::constants::api::DEFAULT_CONTENT_TYPE;
use crate::error::{ResubmitError, ResubmitResult};

const CONTENT_KEY: &str = "$content";
const CONTENT_TYPE_KEY: &str = "$content-type";
const DEFAULT_METHOD: &str = "POST";

/// Replay-relevant parts of a captured trigger envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEnvelope {
    pub method: String,
    pub relative_path: Option<String>,
    pub content_type: String,
    pub body: Option<Vec<u8>>,
}

impl ReplayEnvelope {
    pub fn parse(envelope: &Value) -> ResubmitResult<Self> {
        let object = envelope.as_object().ok_or_else(|| {
            ResubmitError::Serialization("trigger inputs envelope is not a JSON object".to_string())
        })?;

        let method = object
            .get("method")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_METHOD)
            .to_ascii_uppercase();

        let relative_path = object
            .get("relativePath")
            .and_then(Value::as_str)
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let header_content_type = object
            .get("headers")
            .and_then(Value::as_object)
            .and_then(|headers| {
                headers
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                    .and_then(|(_, value)| value.as_str())
            });

        let (body, wrapped_content_type) = match object.get("body") {
            None | Some(Value::Null) => (None, None),
            Some(body) => unwrap_body(body)?,
        };

        let content_type = wrapped_content_type
            .as_deref()
            .or(header_content_type)
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        Ok(Self {
            method,
            relative_path,
            content_type,
            body,
        })
    }

    /// Aim the envelope at `callback_url`, appending the relative path
    pub fn into_request(self, callback_url: &str) -> ResubmitResult<ReplayRequest> {
        let url = match &self.relative_path {
            Some(path) => join_relative_path(callback_url, path)?,
            None => callback_url.to_string(),
        };

        Ok(ReplayRequest {
            method: self.method,
            url,
            content_type: self.content_type,
            body: self.body,
        })
    }
}

/// Body bytes plus the content type of an out-of-line `$content` wrapper
fn unwrap_body(body: &Value) -> ResubmitResult<(Option<Vec<u8>>, Option<String>)> {
    if let Some(wrapper) = body.as_object() {
        if let Some(content) = wrapper.get(CONTENT_KEY) {
            let content_type = wrapper
                .get(CONTENT_TYPE_KEY)
                .and_then(Value::as_str)
                .map(str::to_string);
            let bytes = match content {
                Value::Null => None,
                Value::String(text) => Some(decode_content(text)),
                other => Some(serde_json::to_vec(other)?),
            };
            return Ok((bytes, content_type));
        }
    }

    let bytes = match body {
        Value::String(text) => text.as_bytes().to_vec(),
        other => serde_json::to_vec(other)?,
    };
    Ok((Some(bytes), None))
}

/// Base64 text that decodes to UTF-8 is decoded; anything else is verbatim
fn decode_content(text: &str) -> Vec<u8> {
    match STANDARD.decode(text.trim()) {
        Ok(decoded) if std::str::from_utf8(&decoded).is_ok() => decoded,
        _ => text.as_bytes().to_vec(),
    }
}

/// Append `relative_path` to the URL path with one `/`, keeping the query
pub fn join_relative_path(callback_url: &str, relative_path: &str) -> ResubmitResult<String> {
    let mut url = Url::parse(callback_url).map_err(|e| {
        ResubmitError::InvalidInput(format!("invalid callback URL: {e}"))
    })?;

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        relative_path.trim_start_matches('/')
    );
    url.set_path(&joined);
    Ok(url.to_string())
}
